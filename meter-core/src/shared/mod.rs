//! Meter state shared between the tick and the two input edge handlers.
//!
//! Every piece of state sits in its own `critical_section::Mutex` so each
//! read-modify-write happens with interrupts masked. Field ownership:
//!
//! | field      | writers                                  | readers        |
//! |------------|------------------------------------------|----------------|
//! | `pipeline` | tick; button/rotary via menu resets      | tick           |
//! | `history`  | tick                                     | tick           |
//! | `menu`     | tick (long press, idle); button; rotary  | all three      |
//! | `button`   | button edge; tick (long-press poll)      | tick           |
//! | `rotary`   | rotary edge                              | rotary edge    |
//! | `position` | rotary edge (atomic store)               | tick           |
//! | `scheduler`| tick                                     | tick           |
//! | `telemetry`| all three                                | log mirrors    |
//!
//! The rotary decoder is locked only for the edge itself; the menu lock is
//! taken separately when an edge completes a detent. The position counter is
//! published through an atomic so the tick can read it without touching the
//! decoder.

use core::cell::RefCell;

use critical_section::{CriticalSection, Mutex};
use heapless::Vec;
use portable_atomic::{AtomicU8, Ordering};

use crate::config::MeterConfig;
use crate::display::{MeterView, compose};
use crate::input::{ButtonDebouncer, Direction, InputEvent, Phase, QuadratureDecoder};
use crate::measurement::{HistoryRing, MeasurementPipeline, RawSample};
use crate::menu::{MenuController, MenuEffect, Screen};
use crate::scheduler::{SampleError, SampleSource, TickReport, TickScheduler, acquire_sample};
use crate::telemetry::{
    EventId, TELEMETRY_RING_CAPACITY, TelemetryEventKind, TelemetryPayload, TelemetryRecord,
    TelemetryRecorder,
};
use crate::time::Millis;

/// Process-wide meter state.
pub struct SharedMeter {
    config: MeterConfig,
    pipeline: Mutex<RefCell<MeasurementPipeline>>,
    history: Mutex<RefCell<HistoryRing>>,
    menu: Mutex<RefCell<MenuController>>,
    button: Mutex<RefCell<ButtonDebouncer>>,
    rotary: Mutex<RefCell<QuadratureDecoder>>,
    scheduler: Mutex<RefCell<TickScheduler>>,
    telemetry: Mutex<RefCell<TelemetryRecorder>>,
    position: AtomicU8,
}

impl SharedMeter {
    /// Builds the initial state; usable in a `static` initializer.
    #[must_use]
    pub const fn new(config: &MeterConfig) -> Self {
        Self {
            config: *config,
            pipeline: Mutex::new(RefCell::new(MeasurementPipeline::new(config))),
            history: Mutex::new(RefCell::new(HistoryRing::new())),
            menu: Mutex::new(RefCell::new(MenuController::new(config))),
            button: Mutex::new(RefCell::new(ButtonDebouncer::new(config))),
            rotary: Mutex::new(RefCell::new(QuadratureDecoder::new(config))),
            scheduler: Mutex::new(RefCell::new(TickScheduler::new(config))),
            telemetry: Mutex::new(RefCell::new(TelemetryRecorder::new())),
            position: AtomicU8::new(0),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &MeterConfig {
        &self.config
    }

    /// Aligns the decoder with the encoder pins sampled at boot.
    pub fn seed_rotary(&self, phase: Phase) {
        critical_section::with(|cs| self.rotary.borrow_ref_mut(cs).seed(phase));
    }

    /// Button edge handler entry point. `pressed` is the sampled pin level.
    pub fn on_button_edge(&self, pressed: bool, now: Millis) -> Option<InputEvent> {
        critical_section::with(|cs| {
            let event = self.button.borrow_ref_mut(cs).on_edge(pressed, now);
            if let Some(event) = event {
                self.dispatch(cs, event, now);
            }
            event
        })
    }

    /// Rotary edge handler entry point with both channel levels sampled.
    pub fn on_rotary_edge(&self, phase: Phase, now: Millis) -> Option<Direction> {
        let direction = critical_section::with(|cs| {
            let mut rotary = self.rotary.borrow_ref_mut(cs);
            let direction = rotary.on_edge(phase, now);
            self.position.store(rotary.position(), Ordering::Release);
            direction
        });

        if let Some(direction) = direction {
            critical_section::with(|cs| {
                self.dispatch(cs, InputEvent::Navigate(direction), now);
            });
        }
        direction
    }

    /// Samples `source` and runs one tick.
    ///
    /// # Errors
    ///
    /// Returns the acquisition failure without touching any state.
    pub fn tick_from<S>(&self, source: &mut S, now: Millis) -> Result<TickReport, SampleError>
    where
        S: SampleSource + ?Sized,
    {
        let sample = acquire_sample(source)?;
        Ok(self.tick(sample, now))
    }

    /// Periodic tick: integrate, record history, poll the long press, check
    /// the idle timeout and compose a frame when the screen needs it.
    pub fn tick(&self, sample: RawSample, now: Millis) -> TickReport {
        critical_section::with(|cs| {
            let (dt_ms, history_recorded) = {
                let mut scheduler = self.scheduler.borrow_ref_mut(cs);
                (scheduler.begin_tick(now), scheduler.history_due(now))
            };

            let processed = self.pipeline.borrow_ref_mut(cs).process(sample, dt_ms);
            if !processed.integrated && dt_ms != 0 {
                self.telemetry
                    .borrow_ref_mut(cs)
                    .record_skipped_step(dt_ms, now);
            }
            if history_recorded {
                self.history.borrow_ref_mut(cs).push(&processed.measurement);
            }

            let held = self.button.borrow_ref_mut(cs).poll(now);
            if let Some(event) = held {
                self.dispatch(cs, event, now);
            }

            self.check_idle(cs, now);

            let render = self.menu.borrow_ref_mut(cs).take_render();
            let frame = render.then(|| {
                let menu = self.menu.borrow_ref(cs);
                let pipeline = self.pipeline.borrow_ref(cs);
                let history = self.history.borrow_ref(cs);
                compose(&MeterView {
                    menu: &menu,
                    pipeline: &pipeline,
                    history: &history,
                    position: self.position.load(Ordering::Acquire),
                    switch_pressed: self.button.borrow_ref(cs).is_pressed(),
                })
            });

            TickReport {
                measurement: processed.measurement,
                dt_ms,
                integrated: processed.integrated,
                history_recorded,
                frame,
            }
        })
    }

    /// Runs `f` against the menu state.
    pub fn with_menu<R>(&self, f: impl FnOnce(&MenuController) -> R) -> R {
        critical_section::with(|cs| f(&self.menu.borrow_ref(cs)))
    }

    /// Runs `f` against the measurement pipeline.
    pub fn with_pipeline<R>(&self, f: impl FnOnce(&MeasurementPipeline) -> R) -> R {
        critical_section::with(|cs| f(&self.pipeline.borrow_ref(cs)))
    }

    /// Rotary detent counter as last published by the edge handler.
    pub fn position(&self) -> u8 {
        self.position.load(Ordering::Acquire)
    }

    /// Debounced push button level.
    pub fn switch_pressed(&self) -> bool {
        critical_section::with(|cs| self.button.borrow_ref(cs).is_pressed())
    }

    /// Copies out the telemetry recorded after `after`, oldest first.
    pub fn telemetry_since(
        &self,
        after: Option<EventId>,
    ) -> Vec<TelemetryRecord, TELEMETRY_RING_CAPACITY> {
        critical_section::with(|cs| {
            self.telemetry
                .borrow_ref(cs)
                .since(after)
                .copied()
                .collect()
        })
    }

    fn dispatch(&self, cs: CriticalSection<'_>, event: InputEvent, now: Millis) {
        let mut menu = self.menu.borrow_ref_mut(cs);
        let mut telemetry = self.telemetry.borrow_ref_mut(cs);

        let from = menu.screen();
        let effect = menu.handle(event, now);
        let to = menu.screen();

        let kind = match event {
            InputEvent::Navigate(direction) => TelemetryEventKind::Navigated(direction),
            InputEvent::ShortPress => TelemetryEventKind::ShortPress,
            InputEvent::LongPress => TelemetryEventKind::LongPress,
        };
        telemetry.record(kind, TelemetryPayload::Selection(menu.selection()), now);

        if from != to {
            telemetry.record_screen_change(from, to, menu.selection(), now);
            if to == Screen::Graphics && from == Screen::GraphicsSelect {
                telemetry.record(
                    TelemetryEventKind::GraphSelected(menu.graph()),
                    TelemetryPayload::None,
                    now,
                );
            }
        }

        match effect {
            MenuEffect::None => {}
            MenuEffect::ResetPeaks => {
                self.pipeline.borrow_ref_mut(cs).reset_peaks();
                telemetry.record(TelemetryEventKind::PeaksReset, TelemetryPayload::None, now);
            }
            MenuEffect::ResetEnergy => {
                self.pipeline.borrow_ref_mut(cs).reset_energy();
                telemetry.record(TelemetryEventKind::EnergyReset, TelemetryPayload::None, now);
            }
        }
    }

    fn check_idle(&self, cs: CriticalSection<'_>, now: Millis) {
        let mut menu = self.menu.borrow_ref_mut(cs);
        let from = menu.screen();
        if menu.check_idle(now) {
            let mut telemetry = self.telemetry.borrow_ref_mut(cs);
            telemetry.record(TelemetryEventKind::IdleTimeout, TelemetryPayload::None, now);
            telemetry.record_screen_change(from, menu.screen(), menu.selection(), now);
        }
    }
}

impl Default for SharedMeter {
    fn default() -> Self {
        Self::new(&MeterConfig::DEFAULT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Direction;
    use crate::scheduler::Channel;

    const DETENT_CW: [Phase; 4] = [
        Phase::from_levels(true, false),
        Phase::from_levels(true, true),
        Phase::from_levels(false, true),
        Phase::from_levels(false, false),
    ];

    fn turn_cw(meter: &SharedMeter, start: u32) -> Option<Direction> {
        let mut last = None;
        for (step, phase) in (0_u32..).zip(DETENT_CW) {
            last = meter.on_rotary_edge(phase, Millis::new(start + step * 10));
        }
        last
    }

    fn tap(meter: &SharedMeter, at: u32) {
        meter.on_button_edge(true, Millis::new(at));
        meter.on_button_edge(false, Millis::new(at + 100));
    }

    #[test]
    fn first_tick_renders_home_without_integrating() {
        let meter = SharedMeter::default();
        let report = meter.tick(RawSample::new(2_048, 819), Millis::new(0));
        assert_eq!(report.dt_ms, 0);
        assert!(!report.integrated);
        assert!(report.history_recorded);
        let frame = report.frame.expect("home screen is live");
        assert!(frame.find("V:15.0V").is_some());
    }

    #[test]
    fn detent_publishes_position_and_moves_menu() {
        let meter = SharedMeter::default();
        tap(&meter, 0);
        meter.on_button_edge(true, Millis::new(1_000));
        meter.tick(RawSample::default(), Millis::new(3_000));
        assert_eq!(meter.with_menu(MenuController::screen), Screen::Main);

        assert_eq!(turn_cw(&meter, 4_000), Some(Direction::Clockwise));
        assert_eq!(meter.position(), 1);
        assert_eq!(meter.with_menu(MenuController::selection), 1);
    }

    #[test]
    fn long_press_fires_from_tick_while_held() {
        let meter = SharedMeter::default();
        meter.on_button_edge(true, Millis::new(0));
        assert!(meter.switch_pressed());

        meter.tick(RawSample::default(), Millis::new(1_900));
        assert_eq!(meter.with_menu(MenuController::screen), Screen::PowerMeter);

        meter.tick(RawSample::default(), Millis::new(2_000));
        assert_eq!(meter.with_menu(MenuController::screen), Screen::Main);

        // Releasing afterwards does not trigger a second action.
        assert_eq!(meter.on_button_edge(false, Millis::new(2_500)), None);
        assert_eq!(meter.with_menu(MenuController::screen), Screen::Main);
    }

    #[test]
    fn reset_menu_clears_measurements() {
        let meter = SharedMeter::default();
        meter.tick(RawSample::new(4_095, 4_095), Millis::new(0));
        meter.tick(RawSample::new(4_095, 4_095), Millis::new(100));
        assert!(meter.with_pipeline(MeasurementPipeline::energy_wh) > 0.0);

        meter.on_button_edge(true, Millis::new(200));
        meter.tick(RawSample::default(), Millis::new(2_200));
        meter.on_button_edge(false, Millis::new(2_300));
        for detent in 0..4 {
            turn_cw(&meter, 3_000 + detent * 100);
        }
        tap(&meter, 4_000);
        assert_eq!(meter.with_menu(MenuController::screen), Screen::Reset);

        turn_cw(&meter, 5_000);
        tap(&meter, 6_000);
        assert_eq!(
            meter.with_menu(|menu| (menu.screen(), menu.selection())),
            (Screen::Main, 3)
        );
        assert!(meter.with_pipeline(MeasurementPipeline::energy_wh).abs() < f32::EPSILON);
        assert!(meter.with_pipeline(|pipeline| pipeline.peaks().power) > 100.0);

        let events: Vec<TelemetryEventKind, TELEMETRY_RING_CAPACITY> = meter
            .telemetry_since(None)
            .iter()
            .map(|record| record.event)
            .collect();
        assert!(events.contains(&TelemetryEventKind::EnergyReset));
        assert!(!events.contains(&TelemetryEventKind::PeaksReset));
    }

    #[test]
    fn stalled_tick_is_logged_and_skipped() {
        let meter = SharedMeter::default();
        meter.tick(RawSample::new(4_095, 4_095), Millis::new(0));
        let report = meter.tick(RawSample::new(4_095, 4_095), Millis::new(1_500));
        assert!(!report.integrated);

        let latest = meter.telemetry_since(None).last().copied();
        assert_eq!(
            latest.map(|record| (record.event, record.details)),
            Some((
                TelemetryEventKind::IntegrationSkipped,
                TelemetryPayload::Step { dt_ms: 1_500 }
            ))
        );
    }

    #[test]
    fn non_live_screen_renders_only_when_dirty() {
        let meter = SharedMeter::default();
        meter.on_button_edge(true, Millis::new(0));
        let opened = meter.tick(RawSample::default(), Millis::new(2_000));
        assert!(opened.frame.is_some_and(|frame| frame.find("MENU").is_some()));
        meter.on_button_edge(false, Millis::new(2_100));

        assert!(meter.tick(RawSample::default(), Millis::new(2_200)).frame.is_none());
        assert!(meter.tick(RawSample::default(), Millis::new(2_300)).frame.is_none());

        turn_cw(&meter, 2_400);
        assert!(meter.tick(RawSample::default(), Millis::new(2_500)).frame.is_some());
    }

    #[test]
    fn graphics_screen_renders_every_tick() {
        let meter = SharedMeter::default();
        meter.on_button_edge(true, Millis::new(0));
        meter.tick(RawSample::default(), Millis::new(2_000));
        meter.on_button_edge(false, Millis::new(2_100));
        turn_cw(&meter, 2_200);
        turn_cw(&meter, 2_300);
        tap(&meter, 2_400);
        tap(&meter, 2_600);
        assert_eq!(meter.with_menu(MenuController::screen), Screen::Graphics);
        meter.tick(RawSample::new(2_048, 819), Millis::new(2_700));

        for step in 1..=5_u32 {
            assert!(!meter.with_menu(MenuController::is_dirty));
            let report = meter.tick(RawSample::new(2_048, 819), Millis::new(2_700 + step * 100));
            let frame = report.frame.expect("graphics is a live screen");
            assert!(frame.find("Voltage 15.0V").is_some());
            assert!(frame.plot.is_some());
        }
    }

    #[test]
    fn failed_acquisition_leaves_state_untouched() {
        struct Broken;

        impl SampleSource for Broken {
            fn acquire(&mut self, channel: Channel) -> Result<u16, SampleError> {
                Err(SampleError::Timeout(channel))
            }
        }

        let meter = SharedMeter::default();
        let error = meter.tick_from(&mut Broken, Millis::new(0)).unwrap_err();
        assert_eq!(error, SampleError::Timeout(Channel::Voltage));
        assert!(meter.telemetry_since(None).is_empty());
        assert!(meter.with_menu(MenuController::is_dirty));
    }
}
