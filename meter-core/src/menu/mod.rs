//! Menu state machine driven by the rotary encoder and the push button.
//!
//! Navigation wraps the selection on list screens. Presses are resolved through
//! the transition tables in [`table`]. The tick checks the idle timeout and asks
//! [`MenuController::take_render`] whether the screen needs redrawing.

pub mod table;

use crate::config::MeterConfig;
use crate::input::{Direction, InputEvent};
use crate::measurement::Quantity;
use crate::time::Millis;

use self::table::{Action, EventKind, NextSelection, Target};

/// Visible rows on list screens.
pub const VISIBLE_ITEMS: u8 = 3;

/// Screens of the on-device menu.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Screen {
    PowerMeter,
    Main,
    Peaks,
    Graphics,
    GraphicsSelect,
    Settings,
    Reset,
    About,
}

impl Screen {
    pub const ALL: [Screen; 8] = [
        Screen::PowerMeter,
        Screen::Main,
        Screen::Peaks,
        Screen::Graphics,
        Screen::GraphicsSelect,
        Screen::Settings,
        Screen::Reset,
        Screen::About,
    ];

    /// Number of selectable items; zero for screens without a list.
    #[must_use]
    pub const fn item_count(self) -> u8 {
        match self {
            Screen::Main => 5,
            Screen::GraphicsSelect => 4,
            Screen::Settings => 2,
            Screen::Reset => 3,
            Screen::PowerMeter | Screen::Peaks | Screen::Graphics | Screen::About => 0,
        }
    }

    /// Live screens are redrawn on every tick.
    #[must_use]
    pub const fn is_live(self) -> bool {
        matches!(self, Screen::PowerMeter | Screen::Graphics)
    }

    /// List screens that show a three-row scroll window.
    #[must_use]
    pub const fn scrolls(self) -> bool {
        matches!(self, Screen::Main | Screen::GraphicsSelect)
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Screen::PowerMeter => "power-meter",
            Screen::Main => "main",
            Screen::Peaks => "peaks",
            Screen::Graphics => "graphics",
            Screen::GraphicsSelect => "graphics-select",
            Screen::Settings => "settings",
            Screen::Reset => "reset",
            Screen::About => "about",
        }
    }
}

impl core::fmt::Display for Screen {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Measurement side effect requested by a menu transition.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MenuEffect {
    None,
    ResetPeaks,
    ResetEnergy,
}

/// Rows of a list screen currently on the display.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ScrollWindow {
    pub first: u8,
    pub len: u8,
    pub more_above: bool,
    pub more_below: bool,
}

impl ScrollWindow {
    /// Computes the window for `selection` within `item_count` items.
    #[must_use]
    pub fn around(selection: u8, item_count: u8) -> Self {
        let len = item_count.min(VISIBLE_ITEMS);
        let first = selection.saturating_sub(1).min(item_count - len);
        Self {
            first,
            len,
            more_above: first > 0,
            more_below: first + len < item_count,
        }
    }

    /// Item indices in display order.
    pub fn items(&self) -> core::ops::Range<u8> {
        self.first..self.first + self.len
    }
}

/// Current screen, selection and idle bookkeeping.
#[derive(Clone, Debug)]
pub struct MenuController {
    idle_timeout_ms: u32,
    screen: Screen,
    selection: u8,
    graph: Quantity,
    last_activity: Millis,
    dirty: bool,
}

impl MenuController {
    /// Starts on the power meter screen with a pending redraw.
    #[must_use]
    pub const fn new(config: &MeterConfig) -> Self {
        Self {
            idle_timeout_ms: config.idle_timeout_ms,
            screen: Screen::PowerMeter,
            selection: 0,
            graph: Quantity::Voltage,
            last_activity: Millis::ZERO,
            dirty: true,
        }
    }

    /// Dispatches a decoded input event.
    pub fn handle(&mut self, event: InputEvent, now: Millis) -> MenuEffect {
        match event {
            InputEvent::Navigate(direction) => {
                self.navigate(direction, now);
                MenuEffect::None
            }
            InputEvent::ShortPress => self.press(EventKind::ShortPress, now),
            InputEvent::LongPress => self.press(EventKind::LongPress, now),
        }
    }

    /// Moves the selection one step with wrap-around.
    ///
    /// Returns `false` on screens without items, which ignore navigation.
    pub fn navigate(&mut self, direction: Direction, now: Millis) -> bool {
        let count = self.screen.item_count();
        if count == 0 {
            return false;
        }

        let step = match direction {
            Direction::Clockwise => 1,
            Direction::CounterClockwise => count - 1,
        };
        self.selection = (self.selection % count + step) % count;
        self.touch(now);
        true
    }

    pub fn short_press(&mut self, now: Millis) -> MenuEffect {
        self.press(EventKind::ShortPress, now)
    }

    pub fn long_press(&mut self, now: Millis) -> MenuEffect {
        self.press(EventKind::LongPress, now)
    }

    fn press(&mut self, kind: EventKind, now: Millis) -> MenuEffect {
        let Some(row) = table::lookup(kind, self.screen, self.selection) else {
            return MenuEffect::None;
        };

        let effect = match row.action {
            Action::None => MenuEffect::None,
            Action::ResetPeaks => MenuEffect::ResetPeaks,
            Action::ResetEnergy => MenuEffect::ResetEnergy,
            Action::SelectGraph => {
                self.graph = Quantity::from_index(self.selection);
                MenuEffect::None
            }
        };

        if let Target::Go(screen, next) = row.target {
            self.screen = screen;
            self.selection = match next {
                NextSelection::Fixed(index) => index,
                NextSelection::GraphQuantity => self.graph.index(),
            };
            self.touch(now);
        }

        effect
    }

    /// Falls back to the power meter after a period without input.
    ///
    /// Returns `true` when the timeout fired.
    pub fn check_idle(&mut self, now: Millis) -> bool {
        if self.screen == Screen::PowerMeter {
            return false;
        }
        if now.saturating_elapsed_since(self.last_activity) <= self.idle_timeout_ms {
            return false;
        }

        self.screen = Screen::PowerMeter;
        self.selection = 0;
        self.dirty = true;
        true
    }

    /// Reports whether the display should be redrawn this tick and clears the
    /// dirty flag.
    pub fn take_render(&mut self) -> bool {
        let dirty = core::mem::replace(&mut self.dirty, false);
        dirty || self.screen.is_live()
    }

    /// Scroll window for list screens that scroll.
    #[must_use]
    pub fn scroll_window(&self) -> Option<ScrollWindow> {
        self.screen
            .scrolls()
            .then(|| ScrollWindow::around(self.selection, self.screen.item_count()))
    }

    #[must_use]
    pub const fn screen(&self) -> Screen {
        self.screen
    }

    #[must_use]
    pub const fn selection(&self) -> u8 {
        self.selection
    }

    /// Quantity shown on the graphics screen.
    #[must_use]
    pub const fn graph(&self) -> Quantity {
        self.graph
    }

    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[must_use]
    pub const fn last_activity(&self) -> Millis {
        self.last_activity
    }

    fn touch(&mut self, now: Millis) {
        self.last_activity = now;
        self.dirty = true;
    }
}

impl Default for MenuController {
    fn default() -> Self {
        Self::new(&MeterConfig::DEFAULT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CW: InputEvent = InputEvent::Navigate(Direction::Clockwise);
    const CCW: InputEvent = InputEvent::Navigate(Direction::CounterClockwise);

    fn at(ms: u32) -> Millis {
        Millis::new(ms)
    }

    fn menu_on(screen: Screen) -> MenuController {
        let mut menu = MenuController::default();
        menu.screen = screen;
        menu.selection = 0;
        menu
    }

    #[test]
    fn starts_home_and_dirty() {
        let mut menu = MenuController::default();
        assert_eq!(menu.screen(), Screen::PowerMeter);
        assert!(menu.is_dirty());
        assert!(menu.take_render());
        assert!(!menu.is_dirty());
        // Live screen keeps rendering.
        assert!(menu.take_render());
    }

    #[test]
    fn navigation_wraps_both_ends_on_every_list() {
        for screen in Screen::ALL {
            let count = screen.item_count();
            if count == 0 {
                continue;
            }

            let mut menu = menu_on(screen);
            for _ in 0..count {
                menu.handle(CW, at(10));
            }
            assert_eq!(menu.selection(), 0, "{screen:?} forward wrap");

            menu.handle(CCW, at(20));
            assert_eq!(menu.selection(), count - 1, "{screen:?} backward wrap");
        }
    }

    #[test]
    fn itemless_screens_ignore_navigation() {
        let mut menu = menu_on(Screen::Peaks);
        menu.take_render();
        assert!(!menu.navigate(Direction::Clockwise, at(500)));
        assert_eq!(menu.selection(), 0);
        assert!(!menu.is_dirty());
        assert_eq!(menu.last_activity(), Millis::ZERO);
    }

    #[test]
    fn long_press_toggles_between_home_and_menu() {
        let mut menu = MenuController::default();
        menu.handle(InputEvent::LongPress, at(100));
        assert_eq!((menu.screen(), menu.selection()), (Screen::Main, 0));

        menu.handle(CW, at(200));
        menu.handle(InputEvent::ShortPress, at(300));
        assert_eq!(menu.screen(), Screen::Peaks);

        menu.handle(InputEvent::LongPress, at(400));
        assert_eq!((menu.screen(), menu.selection()), (Screen::PowerMeter, 0));
    }

    #[test]
    fn short_press_on_home_is_a_no_op() {
        let mut menu = MenuController::default();
        menu.take_render();
        assert_eq!(menu.short_press(at(50)), MenuEffect::None);
        assert_eq!(menu.screen(), Screen::PowerMeter);
        assert!(!menu.is_dirty());
    }

    #[test]
    fn graphics_returns_to_picker_on_selected_quantity() {
        let mut menu = menu_on(Screen::GraphicsSelect);
        menu.handle(CW, at(0));
        menu.handle(CW, at(0));
        menu.handle(InputEvent::ShortPress, at(0));
        assert_eq!(menu.screen(), Screen::Graphics);
        assert_eq!(menu.graph(), Quantity::Power);

        menu.handle(InputEvent::ShortPress, at(0));
        assert_eq!((menu.screen(), menu.selection()), (Screen::GraphicsSelect, 2));
    }

    #[test]
    fn back_entries_restore_parent_selection() {
        let mut menu = menu_on(Screen::Peaks);
        menu.short_press(at(0));
        assert_eq!((menu.screen(), menu.selection()), (Screen::Main, 1));

        let mut menu = menu_on(Screen::GraphicsSelect);
        menu.selection = 3;
        menu.short_press(at(0));
        assert_eq!((menu.screen(), menu.selection()), (Screen::Main, 2));

        let mut menu = menu_on(Screen::Settings);
        menu.selection = 1;
        menu.short_press(at(0));
        assert_eq!((menu.screen(), menu.selection()), (Screen::Main, 2));

        let mut menu = menu_on(Screen::About);
        menu.short_press(at(0));
        assert_eq!((menu.screen(), menu.selection()), (Screen::Settings, 0));
    }

    #[test]
    fn reset_entries_report_effects() {
        for (selection, effect) in [
            (0, MenuEffect::ResetPeaks),
            (1, MenuEffect::ResetEnergy),
            (2, MenuEffect::None),
        ] {
            let mut menu = menu_on(Screen::Reset);
            menu.selection = selection;
            assert_eq!(menu.short_press(at(0)), effect);
            assert_eq!((menu.screen(), menu.selection()), (Screen::Main, 3));
        }
    }

    #[test]
    fn idle_timeout_needs_strictly_more_than_window() {
        let mut menu = MenuController::default();
        menu.handle(InputEvent::LongPress, at(1_000));
        menu.take_render();

        assert!(!menu.check_idle(at(31_000)));
        assert_eq!(menu.screen(), Screen::Main);

        assert!(menu.check_idle(at(31_001)));
        assert_eq!((menu.screen(), menu.selection()), (Screen::PowerMeter, 0));
        assert!(menu.is_dirty());
        assert!(!menu.check_idle(at(90_000)));
    }

    #[test]
    fn activity_defers_idle_timeout() {
        let mut menu = MenuController::default();
        menu.handle(InputEvent::LongPress, at(0));
        menu.handle(CW, at(20_000));
        assert!(!menu.check_idle(at(45_000)));
        assert!(menu.check_idle(at(50_001)));
    }

    #[test]
    fn idle_check_ignores_stale_clock() {
        let mut menu = MenuController::default();
        menu.handle(InputEvent::LongPress, at(5_000));
        assert!(!menu.check_idle(at(4_990)));
        assert_eq!(menu.screen(), Screen::Main);
    }

    #[test]
    fn scroll_window_tracks_selection() {
        let cases = [
            (0, 0, false, true),
            (1, 0, false, true),
            (2, 1, true, true),
            (3, 2, true, false),
            (4, 2, true, false),
        ];
        for (selection, first, above, below) in cases {
            let window = ScrollWindow::around(selection, 5);
            assert_eq!(window.first, first, "selection {selection}");
            assert_eq!(window.len, 3);
            assert_eq!(window.more_above, above);
            assert_eq!(window.more_below, below);
        }

        let picker = ScrollWindow::around(3, 4);
        assert_eq!(picker.items(), 1..4);
        assert!(picker.more_above && !picker.more_below);
    }

    #[test]
    fn only_list_screens_scroll() {
        let mut menu = menu_on(Screen::Reset);
        assert_eq!(menu.scroll_window(), None);
        menu.screen = Screen::Main;
        assert!(menu.scroll_window().is_some());
    }
}
