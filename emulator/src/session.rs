use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use meter_core::config::{ADC_FULL_SCALE, MeterConfig};
use meter_core::display::{Frame, PLOT_HEIGHT, Renderer};
use meter_core::input::{Direction, Phase};
use meter_core::menu::Screen;
use meter_core::scheduler::{Channel, SampleError, SampleSource, TickReport};
use meter_core::shared::SharedMeter;
use meter_core::telemetry::EventId;
use meter_core::time::Millis;

/// Spacing between simulated encoder edges, just outside the debounce window.
const EDGE_SPACING_MS: u32 = 6;
/// How long a tap keeps the button down.
const TAP_HOLD_MS: u32 = 120;
/// Quiet time before every button edge, longer than the debounce window.
const BUTTON_GAP_MS: u32 = 25;
/// Potentiometer codes moved per key press.
pub const POT_STEP: i16 = 64;

const TEXT_COLUMNS: usize = 22;
const TEXT_ROWS: usize = 4;
const PLOT_ROWS: usize = 6;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TranscriptProfile {
    Interactive,
    Navigation,
    Reset,
    Idle,
}

impl TranscriptProfile {
    pub fn log_path(self) -> &'static str {
        match self {
            TranscriptProfile::Interactive => "transcripts/emulator-interactive.log",
            TranscriptProfile::Navigation => "transcripts/emulator-navigation.log",
            TranscriptProfile::Reset => "transcripts/emulator-reset.log",
            TranscriptProfile::Idle => "transcripts/emulator-idle.log",
        }
    }

    pub fn header(self) -> &'static str {
        match self {
            TranscriptProfile::Interactive => "Power Meter Emulator interactive transcript",
            TranscriptProfile::Navigation => "Power Meter Emulator menu navigation transcript",
            TranscriptProfile::Reset => "Power Meter Emulator peak and energy reset transcript",
            TranscriptProfile::Idle => "Power Meter Emulator idle timeout transcript",
        }
    }

    pub fn from_tag(tag: &str) -> Result<Self, String> {
        if tag.eq_ignore_ascii_case("interactive") {
            Ok(Self::Interactive)
        } else if tag.eq_ignore_ascii_case("navigation") {
            Ok(Self::Navigation)
        } else if tag.eq_ignore_ascii_case("reset") {
            Ok(Self::Reset)
        } else if tag.eq_ignore_ascii_case("idle") {
            Ok(Self::Idle)
        } else {
            Err(format!("Unknown transcript profile `{tag}`"))
        }
    }
}

/// Simulated potentiometers feeding both converter channels.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Pots {
    pub voltage: u16,
    pub current: u16,
}

impl Pots {
    /// Mid-scale voltage (15 V) and one fifth of the current range (1 A).
    pub const fn new() -> Self {
        Self {
            voltage: 2_048,
            current: 819,
        }
    }

    /// Moves one pot by `delta` codes, clamped to the converter range.
    pub fn adjust(&mut self, channel: Channel, delta: i16) {
        let code = match channel {
            Channel::Voltage => &mut self.voltage,
            Channel::Current => &mut self.current,
        };
        *code = code.saturating_add_signed(delta).min(ADC_FULL_SCALE);
    }
}

impl Default for Pots {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleSource for Pots {
    fn acquire(&mut self, channel: Channel) -> Result<u16, SampleError> {
        Ok(match channel {
            Channel::Voltage => self.voltage,
            Channel::Current => self.current,
        })
    }
}

/// One meter plus the simulated board around it.
///
/// Time is simulated: ticks advance the clock by the configured period and
/// input gestures advance it by their own duration, so transcripts are
/// reproducible.
pub struct Session {
    meter: SharedMeter,
    pots: Pots,
    clock: u32,
    encoder: Phase,
    button_down: bool,
    screen: TextRenderer,
    transcript: TranscriptLogger,
    last_logged: Option<EventId>,
}

impl Session {
    pub fn new(profile: TranscriptProfile, config: MeterConfig) -> io::Result<Self> {
        let transcript = TranscriptLogger::create(profile)?;
        Ok(Self::with_transcript(config, transcript))
    }

    /// Session whose transcript goes to `writer` instead of a file.
    pub fn with_writer(config: MeterConfig, writer: Box<dyn Write>) -> Self {
        Self::with_transcript(config, TranscriptLogger::new(writer))
    }

    fn with_transcript(config: MeterConfig, transcript: TranscriptLogger) -> Self {
        let meter = SharedMeter::new(&config);
        let encoder = Phase::from_levels(false, false);
        meter.seed_rotary(encoder);

        let mut screen = TextRenderer::new();
        let _ = screen.render(&Frame::splash());

        Self {
            meter,
            pots: Pots::new(),
            clock: 0,
            encoder,
            button_down: false,
            screen,
            transcript,
            last_logged: None,
        }
    }

    pub fn now(&self) -> u32 {
        self.clock
    }

    pub fn meter(&self) -> &SharedMeter {
        &self.meter
    }

    pub fn pots(&self) -> Pots {
        self.pots
    }

    pub fn button_down(&self) -> bool {
        self.button_down
    }

    pub fn screen(&self) -> Screen {
        self.meter.with_menu(|menu| menu.screen())
    }

    pub fn selection(&self) -> u8 {
        self.meter.with_menu(|menu| menu.selection())
    }

    /// Text rows of the most recently rendered frame.
    pub fn display(&self) -> &[String] {
        self.screen.rows()
    }

    /// Advances the clock by one tick period and runs the tick.
    pub fn tick(&mut self) -> io::Result<TickReport> {
        self.clock = self
            .clock
            .wrapping_add(self.meter.config().tick_period_ms);
        let report = self
            .meter
            .tick_from(&mut self.pots, Millis::new(self.clock))
            .map_err(|error| io::Error::other(error.to_string()))?;

        if let Some(frame) = &report.frame {
            let before = self.screen.rows().to_vec();
            let _ = self.screen.render(frame);
            if self.screen.rows() != before.as_slice() {
                let rows = self.screen.rows().to_vec();
                self.transcript.log_frame(self.clock, &rows)?;
            }
        }
        self.flush_telemetry()?;
        Ok(report)
    }

    pub fn run_ticks(&mut self, count: usize) -> io::Result<()> {
        for _ in 0..count {
            self.tick()?;
        }
        Ok(())
    }

    /// One detent: four debounced phase edges.
    pub fn turn(&mut self, direction: Direction) -> io::Result<()> {
        let label = match direction {
            Direction::Clockwise => "turn cw",
            Direction::CounterClockwise => "turn ccw",
        };
        self.transcript
            .append_line(self.clock, TranscriptRole::Host, label)?;

        let cycle = match direction {
            Direction::Clockwise => [(true, false), (true, true), (false, true), (false, false)],
            Direction::CounterClockwise => {
                [(false, true), (true, true), (true, false), (false, false)]
            }
        };
        for (a, b) in cycle {
            self.clock = self.clock.wrapping_add(EDGE_SPACING_MS);
            self.encoder = Phase::from_levels(a, b);
            self.meter
                .on_rotary_edge(self.encoder, Millis::new(self.clock));
        }
        self.flush_telemetry()
    }

    /// Press and release well under the long-press threshold.
    pub fn tap(&mut self) -> io::Result<()> {
        self.transcript
            .append_line(self.clock, TranscriptRole::Host, "tap")?;
        self.set_button(true);
        self.clock = self.clock.wrapping_add(TAP_HOLD_MS);
        self.set_button(false);
        self.flush_telemetry()
    }

    /// Holds the button through enough ticks for the long press to fire.
    pub fn long_press(&mut self) -> io::Result<()> {
        self.transcript
            .append_line(self.clock, TranscriptRole::Host, "hold")?;
        self.set_button(true);
        let config = *self.meter.config();
        let ticks = config.long_press_ms.div_ceil(config.tick_period_ms) + 1;
        for _ in 0..ticks {
            self.tick()?;
        }
        self.set_button(false);
        self.flush_telemetry()
    }

    /// Toggles a held press; used by the interactive `h` key.
    pub fn toggle_hold(&mut self) -> io::Result<()> {
        let label = if self.button_down { "release" } else { "press" };
        self.transcript
            .append_line(self.clock, TranscriptRole::Host, label)?;
        self.set_button(!self.button_down);
        self.flush_telemetry()
    }

    pub fn adjust_pot(&mut self, channel: Channel, delta: i16) -> io::Result<()> {
        self.pots.adjust(channel, delta);
        let code = match channel {
            Channel::Voltage => self.pots.voltage,
            Channel::Current => self.pots.current,
        };
        let line = format!("pot {channel} -> {code}");
        self.transcript
            .append_line(self.clock, TranscriptRole::Host, &line)
    }

    /// Replays the scripted gestures of a transcript profile.
    pub fn play(&mut self, profile: TranscriptProfile) -> io::Result<()> {
        match profile {
            TranscriptProfile::Navigation => self.play_navigation(),
            TranscriptProfile::Reset => self.play_reset(),
            TranscriptProfile::Idle => self.play_idle(),
            TranscriptProfile::Interactive => Ok(()),
        }
    }

    fn play_navigation(&mut self) -> io::Result<()> {
        self.long_press()?;
        self.turn(Direction::Clockwise)?;
        self.turn(Direction::Clockwise)?;
        self.tap()?;
        self.turn(Direction::Clockwise)?;
        self.tap()?;
        self.run_ticks(20)?;

        // Back out through the selector, then visit Settings > About.
        self.tap()?;
        self.turn(Direction::Clockwise)?;
        self.turn(Direction::Clockwise)?;
        self.tap()?;
        self.turn(Direction::Clockwise)?;
        self.tap()?;
        self.tap()?;
        self.run_ticks(2)?;
        self.tap()?;
        self.turn(Direction::Clockwise)?;
        self.tap()?;
        self.long_press()
    }

    fn play_reset(&mut self) -> io::Result<()> {
        self.adjust_pot(Channel::Voltage, 16 * POT_STEP)?;
        self.adjust_pot(Channel::Current, 32 * POT_STEP)?;
        self.run_ticks(30)?;
        self.adjust_pot(Channel::Voltage, -16 * POT_STEP)?;
        self.adjust_pot(Channel::Current, -32 * POT_STEP)?;
        self.run_ticks(5)?;

        // Peaks, then Reset > Reset peaks, then Reset > Reset energy.
        self.long_press()?;
        self.turn(Direction::Clockwise)?;
        self.tap()?;
        self.run_ticks(1)?;
        self.tap()?;

        for _ in 0..3 {
            self.turn(Direction::Clockwise)?;
        }
        self.tap()?;
        self.tap()?;
        self.run_ticks(1)?;

        self.turn(Direction::Clockwise)?;
        self.tap()?;
        self.turn(Direction::Clockwise)?;
        self.tap()?;
        self.run_ticks(1)?;
        self.long_press()?;
        self.run_ticks(10)
    }

    fn play_idle(&mut self) -> io::Result<()> {
        self.long_press()?;
        self.turn(Direction::CounterClockwise)?;
        self.turn(Direction::CounterClockwise)?;
        self.tap()?;
        let config = *self.meter.config();
        let idle_ticks = config.idle_timeout_ms / config.tick_period_ms;
        self.run_ticks(usize::try_from(idle_ticks).unwrap_or(usize::MAX) + 2)
    }

    fn set_button(&mut self, pressed: bool) {
        self.clock = self.clock.wrapping_add(BUTTON_GAP_MS);
        self.button_down = pressed;
        self.meter.on_button_edge(pressed, Millis::new(self.clock));
    }

    fn flush_telemetry(&mut self) -> io::Result<()> {
        let fresh = self.meter.telemetry_since(self.last_logged);
        for record in &fresh {
            let line = format!("{}: {record}", record.event.subsystem());
            self.transcript
                .append_line(record.timestamp.as_u32(), TranscriptRole::Emulator, &line)?;
        }
        if let Some(last) = fresh.last() {
            self.last_logged = Some(last.id);
        }
        Ok(())
    }
}

/// Character-cell rendition of the 128x32 panel.
///
/// Text lands on a 22x4 grid (6x8 pixel cells); the plot is drawn below it
/// as a 64-column strip of `*`.
pub struct TextRenderer {
    rows: Vec<String>,
}

impl TextRenderer {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn rows(&self) -> &[String] {
        &self.rows
    }
}

impl Default for TextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for TextRenderer {
    type Error = std::convert::Infallible;

    fn render(&mut self, frame: &Frame) -> Result<(), Self::Error> {
        let mut grid = vec![vec![' '; TEXT_COLUMNS]; TEXT_ROWS];
        for line in &frame.lines {
            let row = (usize::from(line.y) / 8).min(TEXT_ROWS - 1);
            let column = usize::from(line.x) / 6;
            for (cell, glyph) in grid[row].iter_mut().skip(column).zip(line.text.chars()) {
                *cell = glyph;
            }
        }

        self.rows.clear();
        self.rows.extend(
            grid.into_iter()
                .map(|cells| cells.into_iter().collect::<String>().trim_end().to_string()),
        );

        if let Some(plot) = &frame.plot {
            let mut strip = vec![vec![' '; plot.points.len()]; PLOT_ROWS];
            for (column, height) in plot.points.iter().enumerate() {
                let depth = usize::from(PLOT_HEIGHT - 1 - (*height).min(PLOT_HEIGHT - 1));
                let row = depth * PLOT_ROWS / usize::from(PLOT_HEIGHT);
                strip[row][column] = '*';
            }
            self.rows
                .extend(strip.into_iter().map(|cells| cells.into_iter().collect()));
        }
        Ok(())
    }
}

struct TranscriptLogger {
    writer: BufWriter<Box<dyn Write>>,
}

impl TranscriptLogger {
    fn create(profile: TranscriptProfile) -> io::Result<Self> {
        let path = Path::new(profile.log_path());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut logger = Self::new(Box::new(file));
        logger.write_header(profile)?;
        Ok(logger)
    }

    fn new(writer: Box<dyn Write>) -> Self {
        Self {
            writer: BufWriter::new(writer),
        }
    }

    fn write_header(&mut self, profile: TranscriptProfile) -> io::Result<()> {
        writeln!(self.writer, "# {}", profile.header())?;
        writeln!(self.writer, "# Timestamps are simulated milliseconds since boot")?;
        writeln!(self.writer)?;
        self.writer.flush()
    }

    fn append_line(&mut self, at_ms: u32, role: TranscriptRole, line: &str) -> io::Result<()> {
        writeln!(self.writer, "[+{at_ms:>6} ms] {} {line}", role.prefix())?;
        self.writer.flush()
    }

    fn log_frame(&mut self, at_ms: u32, rows: &[String]) -> io::Result<()> {
        self.append_line(at_ms, TranscriptRole::Emulator, "frame")?;
        for row in rows {
            writeln!(self.writer, "           | {row}")?;
        }
        self.writer.flush()
    }
}

enum TranscriptRole {
    Host,
    Emulator,
}

impl TranscriptRole {
    fn prefix(&self) -> &'static str {
        match self {
            TranscriptRole::Host => "HOST>",
            TranscriptRole::Emulator => "EMU <",
        }
    }
}
