//! Debounced decoders for the board's digital inputs.
//!
//! Each decoder is written by exactly one edge context. The push button's
//! long-press poll is the one exception: the tick also calls
//! [`ButtonDebouncer::poll`], so callers must hold the button state behind a
//! critical section shared with the edge handler.

pub mod button;
pub mod rotary;

pub use button::ButtonDebouncer;
pub use rotary::{Phase, QuadratureDecoder};

/// Rotation sense of one encoder detent.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Direction {
    Clockwise,
    CounterClockwise,
}

/// Discrete events delivered to the menu controller.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum InputEvent {
    Navigate(Direction),
    ShortPress,
    LongPress,
}
