use embassy_stm32::i2c::I2c;
use embassy_stm32::mode::Blocking;
use embassy_time::{Duration, Ticker};
use meter_core::display::Renderer;

use super::{METER, now};
use crate::fault;
use crate::hw::PotentiometerAdc;
use crate::hw::display::OledRenderer;
use crate::telemetry::{self, TelemetryMirror};

pub type BoardRenderer = OledRenderer<I2c<'static, Blocking>>;

/// Samples, updates the shared meter and redraws on a fixed cadence.
///
/// The frame is composed inside the meter's critical section; the I2C
/// transfer happens afterwards with interrupts enabled.
#[embassy_executor::task]
pub async fn run(mut adc: PotentiometerAdc<'static>, mut renderer: Option<BoardRenderer>) -> ! {
    let period = Duration::from_millis(u64::from(METER.config().tick_period_ms));
    let mut ticker = Ticker::every(period);
    let mut mirror = TelemetryMirror::new();

    loop {
        let sample = match adc.sample().await {
            Ok(sample) => sample,
            Err(error) => fault::halt(renderer.as_mut(), error),
        };

        let report = METER.tick(sample, now());
        telemetry::log_tick(&report);

        if let (Some(frame), Some(panel)) = (report.frame.as_ref(), renderer.as_mut())
            && let Err(error) = panel.render(frame)
        {
            telemetry::log_render_error(error.label());
        }

        mirror.drain(&METER);
        ticker.next().await;
    }
}
