//! Periodic tick bookkeeping and the sampling seam.
//!
//! The tick is the highest-priority context. Each pass acquires both channels,
//! derives the integration step from the previous pass and decides whether the
//! graph history advances. The first pass has no predecessor and reports a
//! zero step, which the energy accumulator ignores.

use core::fmt;

use crate::config::MeterConfig;
use crate::display::Frame;
use crate::measurement::{Measurement, RawSample};
use crate::time::Millis;

/// Analog inputs sampled on every tick.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Channel {
    /// Potentiometer standing in for the voltage sensor.
    Voltage,
    /// Potentiometer standing in for the current sensor.
    Current,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Voltage => f.write_str("voltage"),
            Channel::Current => f.write_str("current"),
        }
    }
}

/// Fatal acquisition failures.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SampleError {
    /// Conversion did not complete in time.
    Timeout(Channel),
    /// The converter reported a code outside its 12-bit range.
    Overrun(Channel),
}

impl SampleError {
    /// Channel the failure was observed on.
    #[must_use]
    pub const fn channel(self) -> Channel {
        match self {
            SampleError::Timeout(channel) | SampleError::Overrun(channel) => channel,
        }
    }
}

impl fmt::Display for SampleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleError::Timeout(channel) => write!(f, "adc timeout ({channel})"),
            SampleError::Overrun(channel) => write!(f, "adc overrun ({channel})"),
        }
    }
}

/// Synchronous source of 12-bit converter codes.
pub trait SampleSource {
    /// Reads one code from `channel`.
    ///
    /// # Errors
    ///
    /// Returns a [`SampleError`] when the conversion fails; callers treat this
    /// as fatal.
    fn acquire(&mut self, channel: Channel) -> Result<u16, SampleError>;
}

/// Reads the voltage channel then the current channel.
///
/// # Errors
///
/// Propagates the first acquisition failure.
pub fn acquire_sample<S>(source: &mut S) -> Result<RawSample, SampleError>
where
    S: SampleSource + ?Sized,
{
    let voltage = acquire_checked(source, Channel::Voltage)?;
    let current = acquire_checked(source, Channel::Current)?;
    Ok(RawSample::new(voltage, current))
}

fn acquire_checked<S>(source: &mut S, channel: Channel) -> Result<u16, SampleError>
where
    S: SampleSource + ?Sized,
{
    check_code(channel, source.acquire(channel)?)
}

/// Rejects codes outside the converter's 12-bit range.
///
/// # Errors
///
/// Returns [`SampleError::Overrun`] for codes above full scale.
pub const fn check_code(channel: Channel, code: u16) -> Result<u16, SampleError> {
    if code > crate::config::ADC_FULL_SCALE {
        return Err(SampleError::Overrun(channel));
    }
    Ok(code)
}

/// Integration step and history cadence tracking for the tick.
#[derive(Clone, Debug)]
pub struct TickScheduler {
    history_period_ms: u32,
    last_tick: Option<Millis>,
    last_history: Option<Millis>,
}

impl TickScheduler {
    #[must_use]
    pub const fn new(config: &MeterConfig) -> Self {
        Self {
            history_period_ms: config.history_period_ms,
            last_tick: None,
            last_history: None,
        }
    }

    /// Starts a tick and returns the elapsed milliseconds since the previous one.
    ///
    /// Returns zero on the first tick.
    pub fn begin_tick(&mut self, now: Millis) -> u32 {
        let dt = self
            .last_tick
            .map_or(0, |previous| now.saturating_elapsed_since(previous));
        self.last_tick = Some(now);
        dt
    }

    /// Returns `true` when the graph history should record this tick.
    pub fn history_due(&mut self, now: Millis) -> bool {
        let due = self
            .last_history
            .is_none_or(|previous| now.saturating_elapsed_since(previous) >= self.history_period_ms);
        if due {
            self.last_history = Some(now);
        }
        due
    }
}

impl Default for TickScheduler {
    fn default() -> Self {
        Self::new(&MeterConfig::DEFAULT)
    }
}

/// Outcome of one tick.
#[derive(Clone, Debug, PartialEq)]
pub struct TickReport {
    pub measurement: Measurement,
    /// Step used for integration, zero on the first tick.
    pub dt_ms: u32,
    pub integrated: bool,
    pub history_recorded: bool,
    /// Frame to hand to the renderer, when the screen needs redrawing.
    pub frame: Option<Frame>,
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Codes {
        voltage: Result<u16, SampleError>,
        current: Result<u16, SampleError>,
        reads: usize,
    }

    impl SampleSource for Codes {
        fn acquire(&mut self, channel: Channel) -> Result<u16, SampleError> {
            self.reads += 1;
            match channel {
                Channel::Voltage => self.voltage,
                Channel::Current => self.current,
            }
        }
    }

    #[test]
    fn acquires_both_channels() {
        let mut source = Codes {
            voltage: Ok(2_048),
            current: Ok(819),
            reads: 0,
        };
        assert_eq!(acquire_sample(&mut source), Ok(RawSample::new(2_048, 819)));
        assert_eq!(source.reads, 2);
    }

    #[test]
    fn first_failure_stops_acquisition() {
        let mut source = Codes {
            voltage: Err(SampleError::Timeout(Channel::Voltage)),
            current: Ok(0),
            reads: 0,
        };
        assert_eq!(
            acquire_sample(&mut source),
            Err(SampleError::Timeout(Channel::Voltage))
        );
        assert_eq!(source.reads, 1);
    }

    #[test]
    fn out_of_range_code_is_an_overrun() {
        let mut source = Codes {
            voltage: Ok(100),
            current: Ok(4_096),
            reads: 0,
        };
        let error = acquire_sample(&mut source).unwrap_err();
        assert_eq!(error, SampleError::Overrun(Channel::Current));
        assert_eq!(error.channel(), Channel::Current);
    }

    #[test]
    fn first_tick_reports_zero_step() {
        let mut scheduler = TickScheduler::default();
        assert_eq!(scheduler.begin_tick(Millis::new(5_000)), 0);
        assert_eq!(scheduler.begin_tick(Millis::new(5_100)), 100);
        assert_eq!(scheduler.begin_tick(Millis::new(7_100)), 2_000);
    }

    #[test]
    fn history_advances_on_its_own_cadence() {
        let mut scheduler = TickScheduler::default();
        let due: heapless::Vec<bool, 6> = (0..6)
            .map(|tick| scheduler.history_due(Millis::new(tick * 100)))
            .collect();
        assert_eq!(due.as_slice(), &[true, false, true, false, true, false]);
    }
}
