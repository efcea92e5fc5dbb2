use embassy_stm32::exti::ExtiInput;

use super::{METER, now};

/// Forwards both edges of the push button; debouncing happens in the core.
#[embassy_executor::task]
pub async fn run(mut button: ExtiInput<'static>) -> ! {
    loop {
        button.wait_for_any_edge().await;
        METER.on_button_edge(button.is_high(), now());
    }
}
