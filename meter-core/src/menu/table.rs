//! Fixed button transition tables for the menu.
//!
//! Every screen has one row per event kind, optionally refined by the current
//! selection. Rows are searched in order and the first match wins, so a
//! `SelectionMatch::Any` row after specific rows acts as the fallback.

use super::Screen;

use self::Action as A;
use self::SelectionMatch::{Any, Is};

/// Button event classes that drive transitions.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum EventKind {
    ShortPress,
    LongPress,
}

/// Selection filter for a transition row.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SelectionMatch {
    Any,
    Is(u8),
}

impl SelectionMatch {
    const fn matches(self, selection: u8) -> bool {
        match self {
            SelectionMatch::Any => true,
            SelectionMatch::Is(expected) => expected == selection,
        }
    }
}

/// Selection applied after entering the target screen.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum NextSelection {
    Fixed(u8),
    /// Index of the graph quantity currently selected.
    GraphQuantity,
}

/// Where a transition leads.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Target {
    Stay,
    Go(Screen, NextSelection),
}

/// Side effect performed with a transition.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Action {
    None,
    ResetPeaks,
    ResetEnergy,
    /// Store the current selection as the plotted quantity.
    SelectGraph,
}

/// One row of a transition table.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Transition {
    pub from: Screen,
    pub selection: SelectionMatch,
    pub target: Target,
    pub action: Action,
}

impl Transition {
    const fn new(from: Screen, selection: SelectionMatch, target: Target, action: Action) -> Self {
        Self {
            from,
            selection,
            target,
            action,
        }
    }

    const fn go(from: Screen, selection: SelectionMatch, to: Screen, next: u8) -> Self {
        Self::new(
            from,
            selection,
            Target::Go(to, NextSelection::Fixed(next)),
            Action::None,
        )
    }
}

/// Transitions taken on a short press.
pub const SHORT_PRESS: [Transition; 20] = [
    // The home screen ignores taps.
    Transition::new(Screen::PowerMeter, Any, Target::Stay, A::None),
    // Main menu entries.
    Transition::go(Screen::Main, Is(0), Screen::PowerMeter, 0),
    Transition::go(Screen::Main, Is(1), Screen::Peaks, 0),
    Transition::go(Screen::Main, Is(2), Screen::GraphicsSelect, 0),
    Transition::go(Screen::Main, Is(3), Screen::Settings, 0),
    Transition::go(Screen::Main, Is(4), Screen::Reset, 0),
    Transition::go(Screen::Peaks, Any, Screen::Main, 1),
    // Plot quantity picker: three quantities then "back".
    Transition::new(
        Screen::GraphicsSelect,
        Is(0),
        Target::Go(Screen::Graphics, NextSelection::Fixed(0)),
        A::SelectGraph,
    ),
    Transition::new(
        Screen::GraphicsSelect,
        Is(1),
        Target::Go(Screen::Graphics, NextSelection::Fixed(0)),
        A::SelectGraph,
    ),
    Transition::new(
        Screen::GraphicsSelect,
        Is(2),
        Target::Go(Screen::Graphics, NextSelection::Fixed(0)),
        A::SelectGraph,
    ),
    Transition::go(Screen::GraphicsSelect, Is(3), Screen::Main, 2),
    Transition::new(
        Screen::Graphics,
        Any,
        Target::Go(Screen::GraphicsSelect, NextSelection::GraphQuantity),
        A::None,
    ),
    Transition::go(Screen::Settings, Is(0), Screen::About, 0),
    Transition::go(Screen::Settings, Is(1), Screen::Main, 2),
    // Reset confirmations return to the "Reset" entry of the main menu.
    Transition::new(
        Screen::Reset,
        Is(0),
        Target::Go(Screen::Main, NextSelection::Fixed(3)),
        A::ResetPeaks,
    ),
    Transition::new(
        Screen::Reset,
        Is(1),
        Target::Go(Screen::Main, NextSelection::Fixed(3)),
        A::ResetEnergy,
    ),
    Transition::go(Screen::Reset, Is(2), Screen::Main, 3),
    Transition::go(Screen::About, Any, Screen::Settings, 0),
    // Unreachable selections fall back to staying put.
    Transition::new(Screen::Main, Any, Target::Stay, A::None),
    Transition::new(Screen::GraphicsSelect, Any, Target::Stay, A::None),
];

/// Transitions taken on a long press: open the menu from home, go home otherwise.
pub const LONG_PRESS: [Transition; 8] = [
    Transition::go(Screen::PowerMeter, Any, Screen::Main, 0),
    Transition::go(Screen::Main, Any, Screen::PowerMeter, 0),
    Transition::go(Screen::Peaks, Any, Screen::PowerMeter, 0),
    Transition::go(Screen::Graphics, Any, Screen::PowerMeter, 0),
    Transition::go(Screen::GraphicsSelect, Any, Screen::PowerMeter, 0),
    Transition::go(Screen::Settings, Any, Screen::PowerMeter, 0),
    Transition::go(Screen::Reset, Any, Screen::PowerMeter, 0),
    Transition::go(Screen::About, Any, Screen::PowerMeter, 0),
];

/// Returns the table for an event kind.
#[must_use]
pub const fn table(kind: EventKind) -> &'static [Transition] {
    match kind {
        EventKind::ShortPress => &SHORT_PRESS,
        EventKind::LongPress => &LONG_PRESS,
    }
}

/// Finds the first row matching `screen` and `selection`.
#[must_use]
pub fn lookup(kind: EventKind, screen: Screen, selection: u8) -> Option<&'static Transition> {
    table(kind)
        .iter()
        .find(|row| row.from == screen && row.selection.matches(selection))
}
