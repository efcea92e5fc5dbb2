#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Log mirrors for the shared meter.
//!
//! `meter-core` only records structured telemetry. This module drains those
//! records to defmt on target and to stdout on host, and owns the handful of
//! firmware-side log lines (boot, ADC faults, display errors).

use meter_core::scheduler::{SampleError, TickReport};
use meter_core::shared::SharedMeter;
use meter_core::telemetry::{EventId, TelemetryRecord};

/// Forwards telemetry records that have not been logged yet.
pub struct TelemetryMirror {
    last_logged: Option<EventId>,
}

impl TelemetryMirror {
    pub const fn new() -> Self {
        Self { last_logged: None }
    }

    /// Logs every record newer than the previous drain and returns how many
    /// were emitted.
    pub fn drain(&mut self, meter: &SharedMeter) -> usize {
        let fresh = meter.telemetry_since(self.last_logged);
        for record in &fresh {
            emit_record(record);
        }
        if let Some(last) = fresh.last() {
            self.last_logged = Some(last.id);
        }
        fresh.len()
    }
}

impl Default for TelemetryMirror {
    fn default() -> Self {
        Self::new()
    }
}

/// Logs the tick summary at trace level.
pub fn log_tick(report: &TickReport) {
    emit_tick(
        report.dt_ms,
        report.integrated,
        report.history_recorded,
        report.frame.is_some(),
    );
}

#[cfg(target_os = "none")]
pub fn log_boot(tick_period_ms: u32) {
    defmt::info!("tick: meter online, period={}ms", tick_period_ms);
}

#[cfg(not(target_os = "none"))]
pub fn log_boot(tick_period_ms: u32) {
    println!("tick: meter online, period={tick_period_ms}ms");
}

#[cfg(target_os = "none")]
pub fn log_sample_error(error: SampleError) {
    defmt::error!("adc: {}", defmt::Display2Format(&error));
}

#[cfg(not(target_os = "none"))]
pub fn log_sample_error(error: SampleError) {
    println!("adc: {error}");
}

#[cfg(target_os = "none")]
pub fn log_render_error(context: &'static str) {
    defmt::warn!("display: {} failed, retrying next tick", context);
}

#[cfg(not(target_os = "none"))]
pub fn log_render_error(context: &'static str) {
    println!("display: {context} failed, retrying next tick");
}

#[cfg(target_os = "none")]
fn emit_record(record: &TelemetryRecord) {
    defmt::info!(
        "{=str}: {}",
        record.event.subsystem(),
        defmt::Display2Format(record)
    );
}

#[cfg(not(target_os = "none"))]
fn emit_record(record: &TelemetryRecord) {
    println!("{}", record_line(record));
}

#[cfg(not(target_os = "none"))]
fn record_line(record: &TelemetryRecord) -> String {
    format!("{}: {record}", record.event.subsystem())
}

#[cfg(target_os = "none")]
fn emit_tick(dt_ms: u32, integrated: bool, history: bool, rendered: bool) {
    defmt::trace!(
        "tick: dt={}ms integrated={} history={} rendered={}",
        dt_ms,
        integrated,
        history,
        rendered
    );
}

#[cfg(not(target_os = "none"))]
fn emit_tick(dt_ms: u32, integrated: bool, history: bool, rendered: bool) {
    println!("tick: dt={dt_ms}ms integrated={integrated} history={history} rendered={rendered}");
}

#[cfg(test)]
mod tests {
    use meter_core::measurement::RawSample;
    use meter_core::telemetry::TelemetryEventKind;
    use meter_core::time::Millis;

    use super::*;

    #[test]
    fn mirror_forwards_each_record_once() {
        let meter = SharedMeter::default();
        let mut mirror = TelemetryMirror::new();
        assert_eq!(mirror.drain(&meter), 0);

        meter.on_button_edge(true, Millis::new(0));
        meter.on_button_edge(false, Millis::new(100));
        // Short press on the home screen stays put.
        assert_eq!(mirror.drain(&meter), 1);
        assert_eq!(mirror.drain(&meter), 0);

        meter.tick(RawSample::default(), Millis::new(200));
        meter.tick(RawSample::default(), Millis::new(1_700));
        assert_eq!(mirror.drain(&meter), 1);
    }

    #[test]
    fn skipped_integration_logs_under_tick() {
        let meter = SharedMeter::default();
        meter.tick(RawSample::default(), Millis::new(0));
        meter.tick(RawSample::default(), Millis::new(5_000));

        let records = meter.telemetry_since(None);
        let skipped = records
            .iter()
            .find(|record| record.event == TelemetryEventKind::IntegrationSkipped)
            .expect("a 5 s gap is outside the integration window");
        assert!(record_line(skipped).starts_with("tick: "));

        meter.on_button_edge(true, Millis::new(5_100));
        meter.on_button_edge(false, Millis::new(5_200));
        let press = meter.telemetry_since(Some(skipped.id));
        let line = record_line(&press[0]);
        assert!(line.starts_with("input: "));
        assert!(line.contains("short-press"));
    }
}
