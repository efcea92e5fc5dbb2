//! Push button debouncer with short/long press classification.
//!
//! The button is wired active-high: a raw level of `true` means pressed.
//! Edges closer together than the debounce window are dropped outright and do
//! not move the window. A press held past the long-press threshold is reported
//! by [`ButtonDebouncer::poll`] from the periodic tick, so it fires even while
//! the button is still down. If the tick misses it (for example because the
//! release lands in the same period), the release edge reports it instead.

use crate::config::MeterConfig;
use crate::time::Millis;

use super::InputEvent;

/// Debounced push button state.
#[derive(Clone, Debug)]
pub struct ButtonDebouncer {
    debounce_ms: u32,
    long_press_ms: u32,
    pressed: bool,
    pressed_at: Millis,
    long_press_handled: bool,
    last_edge: Option<Millis>,
}

impl ButtonDebouncer {
    #[must_use]
    pub const fn new(config: &MeterConfig) -> Self {
        Self {
            debounce_ms: config.button_debounce_ms,
            long_press_ms: config.long_press_ms,
            pressed: false,
            pressed_at: Millis::ZERO,
            long_press_handled: false,
            last_edge: None,
        }
    }

    /// Handles a raw edge with the sampled pin level.
    pub fn on_edge(&mut self, pressed: bool, now: Millis) -> Option<InputEvent> {
        // Edges of one input arrive in time order, so plain wrapping applies.
        if let Some(last) = self.last_edge
            && now.elapsed_since(last) < self.debounce_ms
        {
            return None;
        }
        self.last_edge = Some(now);

        if pressed == self.pressed {
            return None;
        }
        self.pressed = pressed;

        if pressed {
            self.pressed_at = now;
            self.long_press_handled = false;
            return None;
        }

        if self.long_press_handled {
            return None;
        }

        let held = now.elapsed_since(self.pressed_at);
        if held < self.long_press_ms {
            Some(InputEvent::ShortPress)
        } else {
            self.long_press_handled = true;
            Some(InputEvent::LongPress)
        }
    }

    /// Reports a long press once the button has been held long enough.
    pub fn poll(&mut self, now: Millis) -> Option<InputEvent> {
        if !self.pressed || self.long_press_handled {
            return None;
        }

        if now.saturating_elapsed_since(self.pressed_at) >= self.long_press_ms {
            self.long_press_handled = true;
            Some(InputEvent::LongPress)
        } else {
            None
        }
    }

    /// Debounced level.
    #[must_use]
    pub const fn is_pressed(&self) -> bool {
        self.pressed
    }

    #[must_use]
    pub const fn long_press_handled(&self) -> bool {
        self.long_press_handled
    }
}

impl Default for ButtonDebouncer {
    fn default() -> Self {
        Self::new(&MeterConfig::DEFAULT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ms: u32) -> Millis {
        Millis::new(ms)
    }

    #[test]
    fn quick_tap_is_a_short_press() {
        let mut button = ButtonDebouncer::default();
        assert_eq!(button.on_edge(true, at(100)), None);
        assert!(button.is_pressed());
        assert_eq!(button.on_edge(false, at(250)), Some(InputEvent::ShortPress));
        assert!(!button.is_pressed());
    }

    #[test]
    fn bounce_inside_window_only_keeps_first_edge() {
        let mut button = ButtonDebouncer::default();
        assert_eq!(button.on_edge(true, at(1_000)), None);
        // Bounces at +5 and +15 are ignored and do not extend the window.
        assert_eq!(button.on_edge(false, at(1_005)), None);
        assert_eq!(button.on_edge(true, at(1_015)), None);
        assert!(button.is_pressed());

        // +20 is outside the window measured from the first edge.
        assert_eq!(button.on_edge(false, at(1_020)), Some(InputEvent::ShortPress));
    }

    #[test]
    fn repeated_level_is_not_informative() {
        let mut button = ButtonDebouncer::default();
        assert_eq!(button.on_edge(false, at(100)), None);
        assert_eq!(button.on_edge(true, at(200)), None);
        assert_eq!(button.on_edge(true, at(300)), None);
        assert_eq!(button.on_edge(false, at(400)), Some(InputEvent::ShortPress));
    }

    #[test]
    fn poll_fires_long_press_once_while_held() {
        let mut button = ButtonDebouncer::default();
        button.on_edge(true, at(0));
        assert_eq!(button.poll(at(1_999)), None);
        assert_eq!(button.poll(at(2_000)), Some(InputEvent::LongPress));
        assert_eq!(button.poll(at(2_100)), None);
        assert!(button.long_press_handled());

        // Release after a handled long press emits nothing.
        assert_eq!(button.on_edge(false, at(2_500)), None);
    }

    #[test]
    fn release_reports_long_press_missed_by_poll() {
        let mut button = ButtonDebouncer::default();
        button.on_edge(true, at(0));
        assert_eq!(button.on_edge(false, at(2_050)), Some(InputEvent::LongPress));
        assert_eq!(button.poll(at(2_100)), None);
    }

    #[test]
    fn new_press_rearms_long_press() {
        let mut button = ButtonDebouncer::default();
        button.on_edge(true, at(0));
        assert_eq!(button.poll(at(2_000)), Some(InputEvent::LongPress));
        button.on_edge(false, at(2_100));

        button.on_edge(true, at(3_000));
        assert!(!button.long_press_handled());
        assert_eq!(button.poll(at(5_000)), Some(InputEvent::LongPress));
    }

    #[test]
    fn edges_after_long_idle_are_accepted() {
        let mut button = ButtonDebouncer::default();
        button.on_edge(true, at(0));
        assert_eq!(button.on_edge(false, at(100)), Some(InputEvent::ShortPress));

        let later = 100 + (1_u32 << 31) + 1_000;
        assert_eq!(button.on_edge(true, at(later)), None);
        assert!(button.is_pressed());
        assert_eq!(button.on_edge(false, at(later + 150)), Some(InputEvent::ShortPress));
        assert_eq!(button.on_edge(true, at(later + 60_000)), None);
        assert!(button.is_pressed());
    }

    #[test]
    fn debounce_spans_counter_wrap() {
        let mut button = ButtonDebouncer::default();
        button.on_edge(true, at(u32::MAX - 10));
        assert_eq!(button.on_edge(false, at(5)), None);
        assert_eq!(button.on_edge(false, at(10)), Some(InputEvent::ShortPress));
    }

    #[test]
    fn poll_with_stale_timestamp_does_not_fire() {
        let mut button = ButtonDebouncer::default();
        button.on_edge(true, at(10_000));
        // A poll carrying a clock reading from before the press.
        assert_eq!(button.poll(at(9_990)), None);
        assert!(!button.long_press_handled());
    }
}
