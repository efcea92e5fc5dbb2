#![no_std]

// Shared logic for the power meter training board.
//
// Everything here stays portable across the MCU firmware and the host
// emulator: no allocation, no standard library, and the hardware seams
// (sampling, rendering) are expressed as traits the other crates implement.

pub mod config;
pub mod display;
pub mod input;
pub mod measurement;
pub mod menu;
pub mod scheduler;
pub mod shared;
pub mod telemetry;
pub mod time;
