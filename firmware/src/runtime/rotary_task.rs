use embassy_futures::select::select;
use embassy_stm32::exti::ExtiInput;
use meter_core::input::Phase;

use super::{METER, now};

/// Samples both encoder channels whenever either of them changes.
#[embassy_executor::task]
pub async fn run(mut channel_a: ExtiInput<'static>, mut channel_b: ExtiInput<'static>) -> ! {
    loop {
        select(channel_a.wait_for_any_edge(), channel_b.wait_for_any_edge()).await;
        let phase = Phase::from_levels(channel_a.is_high(), channel_b.is_high());
        METER.on_rotary_edge(phase, now());
    }
}
