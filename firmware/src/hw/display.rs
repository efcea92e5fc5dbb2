//! SSD1306 128x32 panel behind the core [`Renderer`] trait.

use embedded_graphics::mono_font::ascii::{FONT_5X8, FONT_6X10};
use embedded_graphics::mono_font::{MonoTextStyle, MonoTextStyleBuilder};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Line, PrimitiveStyle};
use embedded_graphics::text::{Baseline, Text};
use meter_core::display::{Font, Frame, PLOT_HEIGHT, PLOT_STEP, PLOT_TOP, Plot, Renderer};
use ssd1306::I2CDisplayInterface;
use ssd1306::Ssd1306;
use ssd1306::mode::BufferedGraphicsMode;
use ssd1306::prelude::*;

/// Concrete buffered driver, generic over the I2C bus.
pub type Panel<I2C> =
    Ssd1306<I2CInterface<I2C>, DisplaySize128x32, BufferedGraphicsMode<DisplaySize128x32>>;

/// Stage at which a refresh failed.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RenderError {
    Init,
    Draw,
    Flush,
}

impl RenderError {
    pub const fn label(self) -> &'static str {
        match self {
            RenderError::Init => "init",
            RenderError::Draw => "draw",
            RenderError::Flush => "flush",
        }
    }
}

pub struct OledRenderer<I2C> {
    panel: Panel<I2C>,
}

impl<I2C> OledRenderer<I2C>
where
    I2C: embedded_hal::i2c::I2c,
{
    /// Brings the panel up and blanks it.
    pub fn new(i2c: I2C) -> Result<Self, RenderError> {
        let interface = I2CDisplayInterface::new(i2c);
        let mut panel = Ssd1306::new(interface, DisplaySize128x32, DisplayRotation::Rotate0)
            .into_buffered_graphics_mode();
        panel.init().map_err(|_| RenderError::Init)?;
        panel.clear_buffer();
        panel.flush().map_err(|_| RenderError::Flush)?;
        Ok(Self { panel })
    }

    fn draw_plot(&mut self, plot: &Plot) -> Result<(), RenderError> {
        let stroke = PrimitiveStyle::with_stroke(BinaryColor::On, 1);
        let mut previous: Option<Point> = None;
        for (x, height) in (0_i32..).step_by(usize::from(PLOT_STEP)).zip(plot.points) {
            let point = Point::new(x, plot_row(height));
            if let Some(start) = previous {
                Line::new(start, point)
                    .into_styled(stroke)
                    .draw(&mut self.panel)
                    .map_err(|_| RenderError::Draw)?;
            }
            previous = Some(point);
        }
        Ok(())
    }
}

impl<I2C> Renderer for OledRenderer<I2C>
where
    I2C: embedded_hal::i2c::I2c,
{
    type Error = RenderError;

    fn render(&mut self, frame: &Frame) -> Result<(), Self::Error> {
        self.panel.clear_buffer();
        for line in &frame.lines {
            let origin = Point::new(i32::from(line.x), i32::from(line.y));
            Text::with_baseline(line.text.as_str(), origin, text_style(line.font), Baseline::Top)
                .draw(&mut self.panel)
                .map_err(|_| RenderError::Draw)?;
        }
        if let Some(plot) = &frame.plot {
            self.draw_plot(plot)?;
        }
        self.panel.flush().map_err(|_| RenderError::Flush)
    }
}

fn text_style(font: Font) -> MonoTextStyle<'static, BinaryColor> {
    let glyphs = match font {
        Font::Small => &FONT_5X8,
        Font::Medium => &FONT_6X10,
    };
    MonoTextStyleBuilder::new()
        .font(glyphs)
        .text_color(BinaryColor::On)
        .build()
}

// Heights grow upwards from the bottom edge of the plot area.
fn plot_row(height: u8) -> i32 {
    i32::from(PLOT_TOP) + i32::from(PLOT_HEIGHT) - 1 - i32::from(height.min(PLOT_HEIGHT - 1))
}
