//! Millisecond timestamps shared by every trigger context.
//!
//! The board counts time as a free-running 32-bit millisecond tick, so all
//! arithmetic wraps. A handler can be preempted between reading the clock and
//! entering its critical section, which means a stored timestamp may be a few
//! milliseconds *newer* than the `now` another context observes.
//! [`Millis::saturating_elapsed_since`] treats such inversions as zero elapsed
//! time instead of a near-`u32::MAX` interval.

use core::ops::Add;

/// Wrapping millisecond timestamp.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Millis(u32);

impl Millis {
    /// Timestamp at the origin of the tick counter.
    pub const ZERO: Self = Self(0);

    /// Wraps a raw millisecond count.
    #[must_use]
    pub const fn new(millis: u32) -> Self {
        Self(millis)
    }

    /// Truncates a 64-bit millisecond count to the wrapping 32-bit domain.
    #[must_use]
    pub const fn from_u64(millis: u64) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        Self(millis as u32)
    }

    /// Returns the raw millisecond count.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Milliseconds from `earlier` to `self` with wrapping arithmetic.
    #[must_use]
    pub const fn elapsed_since(self, earlier: Self) -> u32 {
        self.0.wrapping_sub(earlier.0)
    }

    /// Like [`Self::elapsed_since`] but reports zero when `earlier` is
    /// actually later than `self`.
    #[must_use]
    pub const fn saturating_elapsed_since(self, earlier: Self) -> u32 {
        let delta = self.0.wrapping_sub(earlier.0);
        if delta > i32::MAX as u32 { 0 } else { delta }
    }
}

impl Add<u32> for Millis {
    type Output = Self;

    fn add(self, rhs: u32) -> Self::Output {
        Self(self.0.wrapping_add(rhs))
    }
}

impl From<u32> for Millis {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_wraps_across_counter_overflow() {
        let before = Millis::new(u32::MAX - 4);
        let after = before + 10;
        assert_eq!(after.as_u32(), 5);
        assert_eq!(after.elapsed_since(before), 10);
    }

    #[test]
    fn saturating_elapsed_clamps_inverted_timestamps() {
        let now = Millis::new(1_000);
        let newer = Millis::new(1_003);
        assert_eq!(now.saturating_elapsed_since(newer), 0);
        assert_eq!(newer.saturating_elapsed_since(now), 3);
    }
}
