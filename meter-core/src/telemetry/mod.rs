//! Structured event log shared by firmware and host targets.
//!
//! The core crate never logs directly. Instead the shared meter records what
//! happened (input events, screen changes, resets, idle timeouts, dropped
//! integration steps) into a fixed ring that the firmware mirrors to defmt and
//! the emulator writes into its transcripts.

use core::fmt;

use heapless::{HistoryBuf, OldestOrdered};

use crate::input::Direction;
use crate::measurement::Quantity;
use crate::menu::Screen;
use crate::time::Millis;

/// Identifier assigned to each record, wrapping on overflow.
pub type EventId = u32;

/// Total number of telemetry entries retained in memory.
pub const TELEMETRY_RING_CAPACITY: usize = 32;

/// Discriminated telemetry events.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TelemetryEventKind {
    Navigated(Direction),
    ShortPress,
    LongPress,
    ScreenChanged { from: Screen, to: Screen },
    GraphSelected(Quantity),
    PeaksReset,
    EnergyReset,
    IdleTimeout,
    IntegrationSkipped,
}

impl fmt::Display for TelemetryEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryEventKind::Navigated(Direction::Clockwise) => f.write_str("navigate +1"),
            TelemetryEventKind::Navigated(Direction::CounterClockwise) => {
                f.write_str("navigate -1")
            }
            TelemetryEventKind::ShortPress => f.write_str("short-press"),
            TelemetryEventKind::LongPress => f.write_str("long-press"),
            TelemetryEventKind::ScreenChanged { from, to } => {
                write!(f, "screen {from} -> {to}")
            }
            TelemetryEventKind::GraphSelected(quantity) => {
                write!(f, "graph {}", quantity.label())
            }
            TelemetryEventKind::PeaksReset => f.write_str("peaks-reset"),
            TelemetryEventKind::EnergyReset => f.write_str("energy-reset"),
            TelemetryEventKind::IdleTimeout => f.write_str("idle-timeout"),
            TelemetryEventKind::IntegrationSkipped => f.write_str("integration-skipped"),
        }
    }
}

impl TelemetryEventKind {
    /// Log prefix of the context that produces the event.
    #[must_use]
    pub const fn subsystem(self) -> &'static str {
        match self {
            TelemetryEventKind::Navigated(_)
            | TelemetryEventKind::ShortPress
            | TelemetryEventKind::LongPress => "input",
            TelemetryEventKind::IntegrationSkipped => "tick",
            TelemetryEventKind::ScreenChanged { .. }
            | TelemetryEventKind::GraphSelected(_)
            | TelemetryEventKind::PeaksReset
            | TelemetryEventKind::EnergyReset
            | TelemetryEventKind::IdleTimeout => "menu",
        }
    }
}

/// Extra detail attached to a record.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TelemetryPayload {
    None,
    /// Menu selection after the event.
    Selection(u8),
    /// Tick step that was rejected by the integrator.
    Step { dt_ms: u32 },
}

impl fmt::Display for TelemetryPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryPayload::None => Ok(()),
            TelemetryPayload::Selection(selection) => write!(f, " sel={selection}"),
            TelemetryPayload::Step { dt_ms } => write!(f, " dt={dt_ms}ms"),
        }
    }
}

/// Telemetry record stored in the ring buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TelemetryRecord {
    pub id: EventId,
    pub timestamp: Millis,
    pub event: TelemetryEventKind,
    pub details: TelemetryPayload,
}

impl fmt::Display for TelemetryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} @{}ms {}{}",
            self.id,
            self.timestamp.as_u32(),
            self.event,
            self.details
        )
    }
}

/// Records telemetry events into a fixed-size ring buffer.
pub struct TelemetryRecorder<const CAPACITY: usize = TELEMETRY_RING_CAPACITY> {
    ring: HistoryBuf<TelemetryRecord, CAPACITY>,
    next_event_id: EventId,
}

impl<const CAPACITY: usize> TelemetryRecorder<CAPACITY> {
    /// Creates a new telemetry recorder with an empty history.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            next_event_id: 0,
        }
    }

    /// Returns an iterator over the recorded telemetry in chronological order.
    pub fn oldest_first(&self) -> OldestOrdered<'_, TelemetryRecord> {
        self.ring.oldest_ordered()
    }

    /// Records newer than `after`, oldest first; everything when `after` is `None`.
    ///
    /// Records already evicted from the ring are silently skipped.
    pub fn since(&self, after: Option<EventId>) -> impl Iterator<Item = &TelemetryRecord> + '_ {
        self.oldest_first().filter(move |record| match after {
            None => true,
            Some(last) => is_newer(record.id, last),
        })
    }

    /// Returns the most recent telemetry record, if available.
    pub fn latest(&self) -> Option<&TelemetryRecord> {
        self.ring.recent()
    }

    /// Returns the number of records currently stored.
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Returns `true` when no telemetry records are stored.
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Records an arbitrary telemetry event with the supplied payload.
    pub fn record(
        &mut self,
        event: TelemetryEventKind,
        payload: TelemetryPayload,
        timestamp: Millis,
    ) -> EventId {
        let id = self.next_event_id;
        self.next_event_id = self.next_event_id.wrapping_add(1);

        self.ring.write(TelemetryRecord {
            id,
            timestamp,
            event,
            details: payload,
        });

        id
    }

    /// Records a screen change together with the selection it landed on.
    pub fn record_screen_change(
        &mut self,
        from: Screen,
        to: Screen,
        selection: u8,
        timestamp: Millis,
    ) -> EventId {
        self.record(
            TelemetryEventKind::ScreenChanged { from, to },
            TelemetryPayload::Selection(selection),
            timestamp,
        )
    }

    /// Records a tick whose step fell outside the integration window.
    pub fn record_skipped_step(&mut self, dt_ms: u32, timestamp: Millis) -> EventId {
        self.record(
            TelemetryEventKind::IntegrationSkipped,
            TelemetryPayload::Step { dt_ms },
            timestamp,
        )
    }
}

impl<const CAPACITY: usize> Default for TelemetryRecorder<CAPACITY> {
    fn default() -> Self {
        Self::new()
    }
}

fn is_newer(id: EventId, reference: EventId) -> bool {
    let delta = id.wrapping_sub(reference);
    delta != 0 && delta <= EventId::MAX / 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_increase_and_wrap() {
        let mut recorder = TelemetryRecorder::<4>::new();
        recorder.next_event_id = EventId::MAX;
        let first = recorder.record(
            TelemetryEventKind::ShortPress,
            TelemetryPayload::None,
            Millis::new(1),
        );
        let second = recorder.record(
            TelemetryEventKind::LongPress,
            TelemetryPayload::None,
            Millis::new(2),
        );
        assert_eq!(first, EventId::MAX);
        assert_eq!(second, 0);

        let newer: heapless::Vec<EventId, 4> =
            recorder.since(Some(first)).map(|record| record.id).collect();
        assert_eq!(newer.as_slice(), &[0]);
    }

    #[test]
    fn ring_keeps_most_recent_records() {
        let mut recorder = TelemetryRecorder::<3>::new();
        for tick in 0..5 {
            recorder.record_skipped_step(1_500, Millis::new(tick * 100));
        }
        assert_eq!(recorder.len(), 3);

        let ids: heapless::Vec<EventId, 3> =
            recorder.oldest_first().map(|record| record.id).collect();
        assert_eq!(ids.as_slice(), &[2, 3, 4]);
        assert_eq!(recorder.latest().map(|record| record.id), Some(4));
    }

    #[test]
    fn since_filters_already_seen_records() {
        let mut recorder = TelemetryRecorder::<8>::new();
        assert!(recorder.is_empty());
        let seen = recorder.record_screen_change(Screen::PowerMeter, Screen::Main, 0, Millis::new(10));
        recorder.record(
            TelemetryEventKind::Navigated(Direction::Clockwise),
            TelemetryPayload::Selection(1),
            Millis::new(20),
        );

        assert_eq!(recorder.since(None).count(), 2);
        let fresh: heapless::Vec<TelemetryEventKind, 8> =
            recorder.since(Some(seen)).map(|record| record.event).collect();
        assert_eq!(
            fresh.as_slice(),
            &[TelemetryEventKind::Navigated(Direction::Clockwise)]
        );
    }

    #[test]
    fn events_map_to_their_log_subsystem() {
        assert_eq!(TelemetryEventKind::IntegrationSkipped.subsystem(), "tick");
        assert_eq!(TelemetryEventKind::LongPress.subsystem(), "input");
        assert_eq!(
            TelemetryEventKind::Navigated(Direction::CounterClockwise).subsystem(),
            "input"
        );
        assert_eq!(TelemetryEventKind::IdleTimeout.subsystem(), "menu");
        assert_eq!(TelemetryEventKind::EnergyReset.subsystem(), "menu");
    }

    #[test]
    fn records_render_for_transcripts() {
        use core::fmt::Write;

        let record = TelemetryRecord {
            id: 7,
            timestamp: Millis::new(1_200),
            event: TelemetryEventKind::ScreenChanged {
                from: Screen::Main,
                to: Screen::Reset,
            },
            details: TelemetryPayload::Selection(0),
        };
        let mut text: heapless::String<64> = heapless::String::new();
        write!(text, "{record}").unwrap();
        assert_eq!(text.as_str(), "#7 @1200ms screen main -> reset sel=0");
    }
}
