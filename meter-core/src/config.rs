//! Timing and scaling constants for the power meter.
//!
//! The defaults match the reference board: a 100 ms measurement tick, a
//! 200 ms graph history cadence, 20 ms / 5 ms debounce windows for the button
//! and encoder, a two second long press and a thirty second menu timeout.

/// Period of the measurement tick.
pub const TICK_PERIOD_MS: u32 = 100;
/// Cadence at which the graph history advances.
pub const HISTORY_PERIOD_MS: u32 = 200;
/// Minimum spacing between accepted push button edges.
pub const BUTTON_DEBOUNCE_MS: u32 = 20;
/// Minimum spacing between accepted rotary encoder edges.
pub const ROTARY_DEBOUNCE_MS: u32 = 5;
/// Hold time after which a press counts as a long press.
pub const LONG_PRESS_MS: u32 = 2_000;
/// Inactivity after which any menu screen falls back to the power meter.
pub const IDLE_TIMEOUT_MS: u32 = 30_000;
/// Integration steps must be strictly shorter than this to count.
pub const MAX_INTEGRATION_STEP_MS: u32 = 1_000;

/// Largest code returned by the 12-bit converter.
pub const ADC_FULL_SCALE: u16 = 4_095;
/// Voltage represented by a full-scale code on the voltage potentiometer.
pub const VOLTAGE_FULL_SCALE: f32 = 30.0;
/// Current represented by a full-scale code on the current potentiometer.
pub const CURRENT_FULL_SCALE: f32 = 5.0;
/// Largest power the meter can report.
pub const POWER_FULL_SCALE: f32 = VOLTAGE_FULL_SCALE * CURRENT_FULL_SCALE;

/// Runtime view of the timing constants.
///
/// Firmware always runs with [`MeterConfig::DEFAULT`]; the emulator and tests
/// override individual windows through the `with_*` helpers.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MeterConfig {
    pub tick_period_ms: u32,
    pub history_period_ms: u32,
    pub button_debounce_ms: u32,
    pub rotary_debounce_ms: u32,
    pub long_press_ms: u32,
    pub idle_timeout_ms: u32,
    pub max_integration_step_ms: u32,
}

impl MeterConfig {
    /// Reference board timings.
    pub const DEFAULT: Self = Self {
        tick_period_ms: TICK_PERIOD_MS,
        history_period_ms: HISTORY_PERIOD_MS,
        button_debounce_ms: BUTTON_DEBOUNCE_MS,
        rotary_debounce_ms: ROTARY_DEBOUNCE_MS,
        long_press_ms: LONG_PRESS_MS,
        idle_timeout_ms: IDLE_TIMEOUT_MS,
        max_integration_step_ms: MAX_INTEGRATION_STEP_MS,
    };

    /// Overrides the measurement tick period.
    #[must_use]
    pub const fn with_tick_period_ms(mut self, value: u32) -> Self {
        self.tick_period_ms = value;
        self
    }

    /// Overrides the menu inactivity timeout.
    #[must_use]
    pub const fn with_idle_timeout_ms(mut self, value: u32) -> Self {
        self.idle_timeout_ms = value;
        self
    }
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
