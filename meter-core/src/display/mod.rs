//! Display content model for the 128x32 panel.
//!
//! [`compose`] turns the meter state into a [`Frame`]: positioned text lines
//! plus an optional plot. Pixel work happens behind the [`Renderer`] trait,
//! which the firmware implements over the SSD1306 driver and the emulator over
//! the terminal.

pub mod format;

use core::fmt::{self, Write};

use heapless::{String, Vec};

use crate::measurement::{HISTORY_CAPACITY, HistoryRing, MeasurementPipeline, Quantity};
use crate::menu::{MenuController, Screen};

pub use format::{Energy, Fixed};

/// Panel width in pixels.
pub const WIDTH: u32 = 128;
/// Panel height in pixels.
pub const HEIGHT: u32 = 32;
/// Maximum characters per text line.
pub const LINE_CAPACITY: usize = 24;
/// Maximum text lines per frame.
pub const MAX_LINES: usize = 8;
/// First pixel row of the plot area.
pub const PLOT_TOP: u8 = 10;
/// Height of the plot area in pixels.
pub const PLOT_HEIGHT: u8 = 22;
/// Horizontal pixels per plotted sample.
pub const PLOT_STEP: u8 = 2;

const ROW_PITCH: u8 = 8;
const INDICATOR_X: u8 = 122;

const MAIN_ITEMS: [&str; 5] = ["Power meter", "Peaks", "Graphics", "Settings", "Reset"];
const GRAPH_ITEMS: [&str; 4] = ["Voltage", "Current", "Power", "Back"];
const SETTINGS_ITEMS: [&str; 2] = ["About", "Back"];
const RESET_ITEMS: [&str; 3] = ["Reset peaks", "Reset energy", "Cancel"];

/// Firmware banner shown on the splash and about screens.
pub const BANNER: &str = "Power Meter v1.0";

/// Glyph sizes available to text lines.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Font {
    /// Roughly 6x8 pixels.
    Small,
    /// Roughly 7x10 pixels.
    Medium,
}

/// Text drawn with its top-left corner at (`x`, `y`).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TextLine {
    pub x: u8,
    pub y: u8,
    pub font: Font,
    pub text: String<LINE_CAPACITY>,
}

/// History trace for the graphics screen.
///
/// `points` are pixel heights above the bottom of the plot area, oldest first.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Plot {
    pub quantity: Quantity,
    pub points: [u8; HISTORY_CAPACITY],
}

impl Plot {
    /// Scales the history of `quantity` into the plot area.
    #[must_use]
    pub fn from_history(history: &HistoryRing, quantity: Quantity) -> Self {
        let mut points = [0; HISTORY_CAPACITY];
        let full_scale = quantity.full_scale();
        for (point, value) in points.iter_mut().zip(history.oldest_first(quantity)) {
            let ratio = (value / full_scale).clamp(0.0, 1.0);
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let height = (ratio * f32::from(PLOT_HEIGHT - 1)) as u8;
            *point = height;
        }
        Self { quantity, points }
    }
}

/// Complete content of one display refresh.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Frame {
    pub lines: Vec<TextLine, MAX_LINES>,
    pub plot: Option<Plot>,
}

impl Frame {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            lines: Vec::new(),
            plot: None,
        }
    }

    /// Appends a formatted text line.
    ///
    /// Text beyond [`LINE_CAPACITY`] and lines beyond [`MAX_LINES`] are dropped.
    pub fn text(&mut self, x: u8, y: u8, font: Font, args: fmt::Arguments<'_>) {
        let mut text = String::new();
        let _ = text.write_fmt(args);
        let _ = self.lines.push(TextLine { x, y, font, text });
    }

    /// Returns the first line whose text contains `needle`.
    #[must_use]
    pub fn find(&self, needle: &str) -> Option<&TextLine> {
        self.lines.iter().find(|line| line.text.contains(needle))
    }

    /// Banner shown while the hardware comes up.
    #[must_use]
    pub fn splash() -> Self {
        let mut frame = Self::new();
        frame.text(0, 0, Font::Medium, format_args!("{BANNER}"));
        frame.text(0, 16, Font::Small, format_args!("Initializing..."));
        frame
    }

    /// Screen left up after a sensor acquisition failure.
    #[must_use]
    pub fn fault(reason: &str) -> Self {
        let mut frame = Self::new();
        frame.text(0, 0, Font::Medium, format_args!("SENSOR FAULT"));
        frame.text(0, 16, Font::Small, format_args!("{reason}"));
        frame.text(0, 24, Font::Small, format_args!("System halted"));
        frame
    }
}

/// Everything [`compose`] reads, borrowed for the duration of one call.
#[derive(Copy, Clone, Debug)]
pub struct MeterView<'a> {
    pub menu: &'a MenuController,
    pub pipeline: &'a MeasurementPipeline,
    pub history: &'a HistoryRing,
    /// Rotary detent counter.
    pub position: u8,
    /// Debounced push button level.
    pub switch_pressed: bool,
}

/// Builds the frame for the current screen.
#[must_use]
pub fn compose(view: &MeterView<'_>) -> Frame {
    let mut frame = Frame::new();
    match view.menu.screen() {
        Screen::PowerMeter => power_meter(&mut frame, view),
        Screen::Main => list(&mut frame, view.menu, "MENU", &MAIN_ITEMS),
        Screen::GraphicsSelect => list(&mut frame, view.menu, "GRAPHICS", &GRAPH_ITEMS),
        Screen::Settings => list(&mut frame, view.menu, "SETTINGS", &SETTINGS_ITEMS),
        Screen::Reset => list(&mut frame, view.menu, "RESET", &RESET_ITEMS),
        Screen::Peaks => peaks(&mut frame, view.pipeline),
        Screen::Graphics => graphics(&mut frame, view),
        Screen::About => about(&mut frame),
    }
    frame
}

fn power_meter(frame: &mut Frame, view: &MeterView<'_>) {
    let latest = view.pipeline.latest();
    frame.text(
        0,
        0,
        Font::Medium,
        format_args!(
            "V:{}V  I:{}A",
            Fixed::new(latest.voltage, 1),
            Fixed::new(latest.current, 2)
        ),
    );
    frame.text(
        0,
        11,
        Font::Medium,
        format_args!(
            "P:{}W E:{}",
            Fixed::new(latest.power, 1),
            Energy(view.pipeline.energy_wh())
        ),
    );
    frame.text(
        0,
        22,
        Font::Small,
        format_args!(
            "ROT:{:03} SWITCH:{}",
            view.position,
            if view.switch_pressed { "ON " } else { "OFF" }
        ),
    );
}

fn list(frame: &mut Frame, menu: &MenuController, title: &str, items: &[&str]) {
    frame.text(0, 0, Font::Small, format_args!("{title}"));

    let (visible, above, below) = match menu.scroll_window() {
        Some(window) => (window.items(), window.more_above, window.more_below),
        None => (0..u8::try_from(items.len()).unwrap_or(u8::MAX), false, false),
    };

    let mut y = ROW_PITCH;
    for index in visible {
        let Some(label) = items.get(usize::from(index)) else {
            break;
        };
        let marker = if index == menu.selection() { '>' } else { ' ' };
        frame.text(0, y, Font::Small, format_args!("{marker} {label}"));
        y += ROW_PITCH;
    }

    if above {
        frame.text(INDICATOR_X, ROW_PITCH, Font::Small, format_args!("^"));
    }
    if below {
        frame.text(INDICATOR_X, ROW_PITCH * 3, Font::Small, format_args!("v"));
    }
}

fn peaks(frame: &mut Frame, pipeline: &MeasurementPipeline) {
    frame.text(0, 0, Font::Small, format_args!("PEAKS"));
    let peaks = pipeline.peaks();
    let mut y = ROW_PITCH;
    for quantity in Quantity::ALL {
        frame.text(
            0,
            y,
            Font::Small,
            format_args!(
                "{}max: {}{}",
                quantity.symbol(),
                Fixed::new(peaks.get(quantity), quantity.decimals()),
                quantity.unit()
            ),
        );
        y += ROW_PITCH;
    }
}

fn graphics(frame: &mut Frame, view: &MeterView<'_>) {
    let quantity = view.menu.graph();
    let value = view.pipeline.latest().get(quantity);
    frame.text(
        0,
        0,
        Font::Small,
        format_args!(
            "{} {}{}",
            quantity.label(),
            Fixed::new(value, quantity.decimals()),
            quantity.unit()
        ),
    );
    frame.plot = Some(Plot::from_history(view.history, quantity));
}

fn about(frame: &mut Frame) {
    frame.text(0, 0, Font::Small, format_args!("{BANNER}"));
    frame.text(0, 8, Font::Small, format_args!("Turn: move"));
    frame.text(0, 16, Font::Small, format_args!("Press: select"));
    frame.text(0, 24, Font::Small, format_args!("Hold: home"));
}

/// Output device that draws a [`Frame`].
pub trait Renderer {
    type Error;

    /// Clears the surface, draws the frame and flushes it.
    ///
    /// # Errors
    ///
    /// Returns the device error when the frame cannot be pushed to the panel.
    fn render(&mut self, frame: &Frame) -> Result<(), Self::Error>;
}
