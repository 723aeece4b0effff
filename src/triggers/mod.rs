//! Input-driven detectors. Each one is a small state machine that knows
//! nothing about the DOM; `hunt::EggHunt` feeds them and `web` binds them to
//! real listeners.

pub mod birthday;
pub mod clicks;
pub mod konami;
pub mod terminal;

pub use birthday::{CalendarDay, Clock, FixedClock, birthday_greeting, is_match};
pub use clicks::{BurstSettings, BurstStep, ClickBurst, ScheduledReset};
pub use konami::{KONAMI_SEQUENCE, KonamiDetector};
pub use terminal::{Command, EntryKind, Terminal, TerminalAction, TerminalEntry};

/// Keys that toggle the terminal (`KeyboardEvent.key`).
pub const TERMINAL_TOGGLE_KEYS: [&str; 2] = ["`", "~"];

pub fn is_terminal_toggle(key: &str) -> bool {
    TERMINAL_TOGGLE_KEYS.contains(&key)
}
