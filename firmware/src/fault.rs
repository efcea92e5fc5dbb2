//! Terminal handling for sensor acquisition failures.

use core::fmt::Write;

use heapless::String;
use meter_core::display::{Frame, LINE_CAPACITY, Renderer};
use meter_core::scheduler::SampleError;

use crate::telemetry;

/// Logs `error`, leaves the fault screen up when possible and parks the core.
pub fn halt<R>(renderer: Option<&mut R>, error: SampleError) -> !
where
    R: Renderer,
{
    telemetry::log_sample_error(error);

    if let Some(renderer) = renderer {
        let mut reason: String<LINE_CAPACITY> = String::new();
        let _ = write!(reason, "{error}");
        if renderer.render(&Frame::fault(&reason)).is_err() {
            telemetry::log_render_error("fault screen");
        }
    }

    cortex_m::interrupt::disable();
    loop {
        cortex_m::asm::wfi();
    }
}
