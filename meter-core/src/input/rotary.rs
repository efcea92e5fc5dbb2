//! Quadrature decoder for the rotary encoder.
//!
//! Both edges of both channels feed [`QuadratureDecoder::on_edge`]. One detent
//! walks the full Gray cycle, i.e. four accepted transitions in the same
//! direction, before a navigation step is reported.

use crate::config::MeterConfig;
use crate::time::Millis;

use super::Direction;

/// Two-bit quadrature phase with channel A in the high bit.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Phase(u8);

impl Phase {
    #[must_use]
    pub const fn from_levels(channel_a: bool, channel_b: bool) -> Self {
        let high = if channel_a { 0b10 } else { 0 };
        let low = if channel_b { 0b01 } else { 0 };
        Self(high | low)
    }

    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn channel_a(self) -> bool {
        self.0 & 0b10 != 0
    }

    #[must_use]
    pub const fn channel_b(self) -> bool {
        self.0 & 0b01 != 0
    }
}

/// Clockwise order of the four phases.
pub const CLOCKWISE_CYCLE: [Phase; 4] = [Phase(0b00), Phase(0b10), Phase(0b11), Phase(0b01)];

/// Accumulator step for `[old][new]` phase pairs.
///
/// Clockwise neighbours in 00 -> 10 -> 11 -> 01 -> 00 score +1, the reverse
/// pairs score -1, and diagonal jumps (a missed edge) score 0.
const TRANSITIONS: [[i8; 4]; 4] = [
    //  00  01  10  11
    [0, -1, 1, 0],  // from 00
    [1, 0, 0, -1],  // from 01
    [-1, 0, 0, 1],  // from 10
    [0, 1, -1, 0],  // from 11
];

const DETENT_THRESHOLD: i8 = 3;

/// Classifies a phase change.
#[must_use]
pub const fn classify(old: Phase, new: Phase) -> i8 {
    TRANSITIONS[(old.0 & 0b11) as usize][(new.0 & 0b11) as usize]
}

/// Time-gated quadrature decoder with a detent accumulator.
#[derive(Clone, Debug)]
pub struct QuadratureDecoder {
    debounce_ms: u32,
    phase: Phase,
    accumulator: i8,
    position: u8,
    last_edge: Option<Millis>,
}

impl QuadratureDecoder {
    #[must_use]
    pub const fn new(config: &MeterConfig) -> Self {
        Self {
            debounce_ms: config.rotary_debounce_ms,
            phase: Phase(0),
            accumulator: 0,
            position: 0,
            last_edge: None,
        }
    }

    /// Aligns the stored phase with the pins before the first edge.
    pub fn seed(&mut self, phase: Phase) {
        self.phase = phase;
        self.accumulator = 0;
    }

    /// Handles a raw edge on either channel with both levels sampled.
    pub fn on_edge(&mut self, phase: Phase, now: Millis) -> Option<Direction> {
        // Edges of one input arrive in time order, so plain wrapping applies.
        if let Some(last) = self.last_edge
            && now.elapsed_since(last) < self.debounce_ms
        {
            return None;
        }
        self.last_edge = Some(now);

        if phase == self.phase {
            return None;
        }

        let step = classify(self.phase, phase);
        self.phase = phase;
        self.accumulator += step;

        if self.accumulator > DETENT_THRESHOLD {
            self.accumulator = 0;
            self.position = self.position.wrapping_add(1);
            Some(Direction::Clockwise)
        } else if self.accumulator < -DETENT_THRESHOLD {
            self.accumulator = 0;
            self.position = self.position.wrapping_sub(1);
            Some(Direction::CounterClockwise)
        } else {
            None
        }
    }

    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub const fn accumulator(&self) -> i8 {
        self.accumulator
    }

    /// Detent counter, wrapping at `u8` bounds.
    #[must_use]
    pub const fn position(&self) -> u8 {
        self.position
    }
}

impl Default for QuadratureDecoder {
    fn default() -> Self {
        Self::new(&MeterConfig::DEFAULT)
    }
}
