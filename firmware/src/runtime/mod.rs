use cortex_m::interrupt;
use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32 as hal;
use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::Pull;
use embassy_stm32::i2c::{self, I2c};
use embassy_stm32::time::Hertz;
use embassy_time::Instant;
use meter_core::config::MeterConfig;
use meter_core::display::{Frame, Renderer};
use meter_core::input::Phase;
use meter_core::shared::SharedMeter;
use meter_core::time::Millis;

use crate::hw::PotentiometerAdc;
use crate::hw::display::OledRenderer;
use crate::telemetry;

mod button_task;
mod rotary_task;
mod tick_task;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

pub(super) static METER: SharedMeter = SharedMeter::new(&MeterConfig::DEFAULT);

/// Milliseconds since boot on the meter's wrapping clock.
fn now() -> Millis {
    Millis::from_u64(Instant::now().as_millis())
}

#[embassy_executor::main]
pub async fn main(spawner: Spawner) {
    let config = hal::Config::default();
    let hal::Peripherals {
        ADC1,
        PC0,
        PC1,
        PA0,
        PA1,
        PA4,
        EXTI0,
        EXTI1,
        EXTI4,
        I2C1,
        PB8,
        PB9,
        ..
    } = hal::init(config);

    let mut i2c_config = i2c::Config::default();
    i2c_config.frequency = Hertz::khz(400);
    let bus = I2c::new_blocking(I2C1, PB8, PB9, i2c_config);
    let mut renderer = match OledRenderer::new(bus) {
        Ok(renderer) => Some(renderer),
        Err(error) => {
            telemetry::log_render_error(error.label());
            None
        }
    };
    if let Some(panel) = renderer.as_mut()
        && let Err(error) = panel.render(&Frame::splash())
    {
        telemetry::log_render_error(error.label());
    }

    let encoder_a = ExtiInput::new(PA0, EXTI0, Pull::Up);
    let encoder_b = ExtiInput::new(PA1, EXTI1, Pull::Up);
    METER.seed_rotary(Phase::from_levels(encoder_a.is_high(), encoder_b.is_high()));
    let button = ExtiInput::new(PA4, EXTI4, Pull::Down);

    let adc = PotentiometerAdc::new(ADC1, PC0, PC1);
    telemetry::log_boot(METER.config().tick_period_ms);

    spawner
        .spawn(button_task::run(button))
        .expect("failed to spawn button task");
    spawner
        .spawn(rotary_task::run(encoder_a, encoder_b))
        .expect("failed to spawn rotary task");
    spawner
        .spawn(tick_task::run(adc, renderer))
        .expect("failed to spawn tick task");

    core::future::pending::<()>().await;
}
