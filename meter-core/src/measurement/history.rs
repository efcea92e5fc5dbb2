//! Fixed-size plot history for the three measured quantities.

use super::{Measurement, Quantity};

/// Samples retained per quantity.
pub const HISTORY_CAPACITY: usize = 64;

/// Three parallel ring buffers sharing one write cursor.
///
/// The cursor always points at the oldest slot, so walking forward from it
/// yields samples in chronological order. Slots that were never written read
/// as zero.
#[derive(Clone, Debug)]
pub struct HistoryRing {
    voltage: [f32; HISTORY_CAPACITY],
    current: [f32; HISTORY_CAPACITY],
    power: [f32; HISTORY_CAPACITY],
    cursor: usize,
}

impl HistoryRing {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            voltage: [0.0; HISTORY_CAPACITY],
            current: [0.0; HISTORY_CAPACITY],
            power: [0.0; HISTORY_CAPACITY],
            cursor: 0,
        }
    }

    /// Stores one measurement and advances the shared cursor.
    pub fn push(&mut self, sample: &Measurement) {
        let slot = self.cursor % HISTORY_CAPACITY;
        self.voltage[slot] = sample.voltage;
        self.current[slot] = sample.current;
        self.power[slot] = sample.power;
        self.cursor = (slot + 1) % HISTORY_CAPACITY;
    }

    /// Index of the next slot to be written.
    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// Iterates one quantity from oldest to newest.
    pub fn oldest_first(&self, quantity: Quantity) -> impl Iterator<Item = f32> + '_ {
        let buffer = self.buffer(quantity);
        let start = self.cursor;
        (0..HISTORY_CAPACITY).map(move |offset| buffer[(start + offset) % HISTORY_CAPACITY])
    }

    const fn buffer(&self, quantity: Quantity) -> &[f32; HISTORY_CAPACITY] {
        match quantity {
            Quantity::Voltage => &self.voltage,
            Quantity::Current => &self.current,
            Quantity::Power => &self.power,
        }
    }
}

impl Default for HistoryRing {
    fn default() -> Self {
        Self::new()
    }
}
