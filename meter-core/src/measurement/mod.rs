//! Measurement pipeline: code conversion, energy integration and peak tracking.
//!
//! Only the tick context mutates the pipeline. Menu actions that reset peaks or
//! energy are applied by [`crate::shared::SharedMeter`] inside the same
//! critical section as the tick, so the pipeline itself carries no locking.

pub mod history;

use crate::config::{
    ADC_FULL_SCALE, CURRENT_FULL_SCALE, MeterConfig, POWER_FULL_SCALE, VOLTAGE_FULL_SCALE,
};

pub use history::{HISTORY_CAPACITY, HistoryRing};

const MILLIS_PER_HOUR: f32 = 3_600_000.0;

/// Raw converter codes captured for one tick.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RawSample {
    pub voltage: u16,
    pub current: u16,
}

impl RawSample {
    /// Bundles the two channel codes.
    #[must_use]
    pub const fn new(voltage: u16, current: u16) -> Self {
        Self { voltage, current }
    }
}

/// Converted electrical quantities for one tick.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Measurement {
    pub voltage: f32,
    pub current: f32,
    pub power: f32,
}

impl Measurement {
    /// Converts a raw sample and derives power.
    #[must_use]
    pub fn from_raw(sample: RawSample) -> Self {
        let voltage = convert_voltage(sample.voltage);
        let current = convert_current(sample.current);
        Self {
            voltage,
            current,
            power: voltage * current,
        }
    }

    /// Returns the value for the requested quantity.
    #[must_use]
    pub const fn get(&self, quantity: Quantity) -> f32 {
        match quantity {
            Quantity::Voltage => self.voltage,
            Quantity::Current => self.current,
            Quantity::Power => self.power,
        }
    }
}

/// Electrical quantity selectable for plotting.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Quantity {
    Voltage,
    Current,
    Power,
}

impl Quantity {
    /// Quantities in menu order.
    pub const ALL: [Quantity; 3] = [Quantity::Voltage, Quantity::Current, Quantity::Power];

    /// Maps a menu index onto a quantity, clamping out-of-range indices to power.
    #[must_use]
    pub const fn from_index(index: u8) -> Self {
        match index {
            0 => Quantity::Voltage,
            1 => Quantity::Current,
            _ => Quantity::Power,
        }
    }

    /// Menu index of the quantity.
    #[must_use]
    pub const fn index(self) -> u8 {
        match self {
            Quantity::Voltage => 0,
            Quantity::Current => 1,
            Quantity::Power => 2,
        }
    }

    /// Value at the top of the plot.
    #[must_use]
    pub const fn full_scale(self) -> f32 {
        match self {
            Quantity::Voltage => VOLTAGE_FULL_SCALE,
            Quantity::Current => CURRENT_FULL_SCALE,
            Quantity::Power => POWER_FULL_SCALE,
        }
    }

    /// Unit suffix used on the display.
    #[must_use]
    pub const fn unit(self) -> &'static str {
        match self {
            Quantity::Voltage => "V",
            Quantity::Current => "A",
            Quantity::Power => "W",
        }
    }

    /// Fractional digits shown for the quantity.
    #[must_use]
    pub const fn decimals(self) -> u8 {
        match self {
            Quantity::Current => 2,
            Quantity::Voltage | Quantity::Power => 1,
        }
    }

    /// Single-letter symbol used in compact readouts.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Quantity::Voltage => "V",
            Quantity::Current => "I",
            Quantity::Power => "P",
        }
    }

    /// Human readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Quantity::Voltage => "Voltage",
            Quantity::Current => "Current",
            Quantity::Power => "Power",
        }
    }
}

/// Converts a voltage-channel code to volts.
///
/// Codes above the converter's full scale are clamped.
#[must_use]
pub fn convert_voltage(raw: u16) -> f32 {
    scale(raw, VOLTAGE_FULL_SCALE)
}

/// Converts a current-channel code to amps.
#[must_use]
pub fn convert_current(raw: u16) -> f32 {
    scale(raw, CURRENT_FULL_SCALE)
}

fn scale(raw: u16, full_scale: f32) -> f32 {
    f32::from(raw.min(ADC_FULL_SCALE)) * full_scale / f32::from(ADC_FULL_SCALE)
}

/// Running energy total in watt-hours.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct EnergyAccumulator {
    watt_hours: f32,
    max_step_ms: u32,
}

impl EnergyAccumulator {
    /// Creates an empty accumulator that rejects steps of `max_step_ms` or longer.
    #[must_use]
    pub const fn new(max_step_ms: u32) -> Self {
        Self {
            watt_hours: 0.0,
            max_step_ms,
        }
    }

    /// Adds `power * dt` to the total.
    ///
    /// Returns `false` without touching the total when `dt_ms` is zero or not
    /// strictly below the configured maximum step.
    pub fn integrate(&mut self, power: f32, dt_ms: u32) -> bool {
        if dt_ms == 0 || dt_ms >= self.max_step_ms || power.is_nan() || power < 0.0 {
            return false;
        }

        #[allow(clippy::cast_precision_loss)]
        let dt = dt_ms as f32;
        self.watt_hours += power * dt / MILLIS_PER_HOUR;
        true
    }

    /// Current total in watt-hours.
    #[must_use]
    pub const fn watt_hours(&self) -> f32 {
        self.watt_hours
    }

    /// Clears the total.
    pub fn reset(&mut self) {
        self.watt_hours = 0.0;
    }
}

/// Independent high-watermarks for each quantity.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct PeakTracker {
    pub voltage: f32,
    pub current: f32,
    pub power: f32,
}

impl PeakTracker {
    /// Creates a tracker with every peak at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            voltage: 0.0,
            current: 0.0,
            power: 0.0,
        }
    }

    /// Raises each peak that the sample exceeds.
    pub fn update(&mut self, sample: &Measurement) {
        self.voltage = self.voltage.max(sample.voltage);
        self.current = self.current.max(sample.current);
        self.power = self.power.max(sample.power);
    }

    /// Zeroes all three peaks.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Returns the peak for the requested quantity.
    #[must_use]
    pub const fn get(&self, quantity: Quantity) -> f32 {
        match quantity {
            Quantity::Voltage => self.voltage,
            Quantity::Current => self.current,
            Quantity::Power => self.power,
        }
    }
}

/// Result of processing one tick's sample.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ProcessedSample {
    pub measurement: Measurement,
    pub integrated: bool,
}

/// Converts samples, integrates energy and tracks peaks.
#[derive(Clone, Debug)]
pub struct MeasurementPipeline {
    latest: Measurement,
    energy: EnergyAccumulator,
    peaks: PeakTracker,
}

impl MeasurementPipeline {
    /// Creates a pipeline with zeroed totals.
    #[must_use]
    pub const fn new(config: &MeterConfig) -> Self {
        Self {
            latest: Measurement {
                voltage: 0.0,
                current: 0.0,
                power: 0.0,
            },
            energy: EnergyAccumulator::new(config.max_integration_step_ms),
            peaks: PeakTracker::new(),
        }
    }

    /// Runs one tick: convert, integrate over `dt_ms`, update peaks.
    pub fn process(&mut self, sample: RawSample, dt_ms: u32) -> ProcessedSample {
        let measurement = Measurement::from_raw(sample);
        let integrated = self.energy.integrate(measurement.power, dt_ms);
        self.peaks.update(&measurement);
        self.latest = measurement;

        ProcessedSample {
            measurement,
            integrated,
        }
    }

    /// Most recent measurement.
    #[must_use]
    pub const fn latest(&self) -> &Measurement {
        &self.latest
    }

    /// Accumulated energy in watt-hours.
    #[must_use]
    pub const fn energy_wh(&self) -> f32 {
        self.energy.watt_hours()
    }

    #[must_use]
    pub const fn peaks(&self) -> &PeakTracker {
        &self.peaks
    }

    pub fn reset_peaks(&mut self) {
        self.peaks.reset();
    }

    pub fn reset_energy(&mut self) {
        self.energy.reset();
    }
}
