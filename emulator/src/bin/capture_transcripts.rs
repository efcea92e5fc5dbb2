use std::io;

#[allow(dead_code)]
#[path = "../session.rs"]
mod session;

use meter_core::config::MeterConfig;
use session::{Session, TranscriptProfile};

fn main() -> io::Result<()> {
    for profile in [
        TranscriptProfile::Navigation,
        TranscriptProfile::Reset,
        TranscriptProfile::Idle,
    ] {
        let mut session = Session::new(profile, MeterConfig::DEFAULT)?;
        session.run_ticks(5)?;
        session.play(profile)?;
    }
    Ok(())
}
