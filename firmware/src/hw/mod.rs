//! Board wiring for the STM32L053R8 training board.
//!
//! | signal          | pin        | notes                                   |
//! |-----------------|------------|-----------------------------------------|
//! | voltage pot     | PC0 (IN10) | 0..3.3 V mapped to 0..30 V              |
//! | current pot     | PC1 (IN11) | 0..3.3 V mapped to 0..5 A               |
//! | encoder A       | PA0        | EXTI0, both edges, pull-up              |
//! | encoder B       | PA1        | EXTI1, both edges, pull-up              |
//! | push button     | PA4        | EXTI4, both edges, pull-down, high = on |
//! | SSD1306 SCL/SDA | PB8 / PB9  | I2C1, 400 kHz                           |

pub mod display;

use embassy_stm32::adc::{self, Adc, AdcChannel, AnyAdcChannel, SampleTime};
use embassy_stm32::peripherals::ADC1;
use embassy_stm32::{Peri, bind_interrupts, peripherals};
use embassy_time::{Duration, with_timeout};
use meter_core::measurement::RawSample;
use meter_core::scheduler::{Channel, SampleError, check_code};

bind_interrupts!(pub struct AdcIrqs {
    ADC1_COMP => adc::InterruptHandler<ADC1>;
});

/// Upper bound on a single conversion, well inside one tick.
const CONVERSION_TIMEOUT: Duration = Duration::from_millis(5);

/// Both potentiometers behind the single on-chip converter.
pub struct PotentiometerAdc<'d> {
    adc: Adc<'d, ADC1>,
    voltage: AnyAdcChannel<ADC1>,
    current: AnyAdcChannel<ADC1>,
}

impl<'d> PotentiometerAdc<'d> {
    pub fn new(
        adc: Peri<'d, ADC1>,
        voltage: Peri<'d, peripherals::PC0>,
        current: Peri<'d, peripherals::PC1>,
    ) -> Self {
        let mut adc = Adc::new(adc, AdcIrqs);
        adc.set_sample_time(SampleTime::CYCLES79_5);
        Self {
            adc,
            voltage: voltage.degrade_adc(),
            current: current.degrade_adc(),
        }
    }

    /// Converts the voltage channel, then the current channel.
    pub async fn sample(&mut self) -> Result<RawSample, SampleError> {
        let voltage = self.read(Channel::Voltage).await?;
        let current = self.read(Channel::Current).await?;
        Ok(RawSample::new(voltage, current))
    }

    async fn read(&mut self, channel: Channel) -> Result<u16, SampleError> {
        let pin = match channel {
            Channel::Voltage => &mut self.voltage,
            Channel::Current => &mut self.current,
        };
        let code = with_timeout(CONVERSION_TIMEOUT, self.adc.read(pin))
            .await
            .map_err(|_| SampleError::Timeout(channel))?;
        check_code(channel, code)
    }
}
