//! Composition root for the egg hunt.
//!
//! `EggHunt` owns the single instance of every detector and routes raw input
//! to them, turning firings into manager calls. Hosts own exactly one per
//! page; the browser binding in `web` wraps it in `Rc<RefCell<_>>`.

use std::rc::Rc;

use crate::config::EggConfig;
use crate::eggs::{self, AchievementManager};
use crate::triggers::{
    BurstSettings, ClickBurst, Clock, KonamiDetector, ScheduledReset, Terminal, TerminalAction,
    birthday_greeting, is_terminal_toggle,
};

/// Host-side response to a key press.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeyOutcome {
    /// The key was used as a shortcut; suppress the browser default.
    pub prevent_default: bool,
    pub konami: bool,
    /// `Some(open)` when the terminal visibility changed.
    pub terminal: Option<bool>,
}

/// Host-side response to a logo click.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ClickOutcome {
    pub fired: bool,
    /// Deliver `EggHunt::click_reset(epoch)` after `after_ms`.
    pub schedule: Option<ScheduledReset>,
}

pub struct EggHunt {
    config: EggConfig,
    manager: Rc<AchievementManager>,
    konami: KonamiDetector,
    clicks: ClickBurst,
    terminal: Terminal,
    terminal_open: bool,
}

impl EggHunt {
    pub fn new(config: EggConfig, manager: Rc<AchievementManager>) -> Self {
        let clicks = ClickBurst::new(BurstSettings {
            threshold: config.click_threshold,
            window_ms: config.click_window_ms,
            display_ms: config.click_display_ms,
        });
        let terminal = Terminal::new(config.owner.clone());
        Self {
            config,
            manager,
            konami: KonamiDetector::new(),
            clicks,
            terminal,
            terminal_open: false,
        }
    }

    pub fn manager(&self) -> &Rc<AchievementManager> {
        &self.manager
    }

    pub fn config(&self) -> &EggConfig {
        &self.config
    }

    /// `code` is `KeyboardEvent.code`, `key` is `KeyboardEvent.key`.
    pub fn key_down(&mut self, code: &str, key: &str) -> KeyOutcome {
        let mut outcome = KeyOutcome::default();
        if self.konami.feed(code) {
            outcome.konami = true;
            self.manager.discover(eggs::KONAMI_CODE);
        }
        if is_terminal_toggle(key) {
            outcome.prevent_default = true;
            outcome.terminal = Some(self.toggle_terminal());
        } else if key == "Escape" && self.terminal_open {
            self.close_terminal();
            outcome.terminal = Some(false);
        }
        outcome
    }

    pub fn logo_click(&mut self) -> ClickOutcome {
        let step = self.clicks.click();
        if step.fired {
            self.manager.discover(eggs::LOGO_CLICKS);
        }
        ClickOutcome {
            fired: step.fired,
            schedule: step.schedule,
        }
    }

    pub fn click_reset(&mut self, epoch: u64) {
        self.clicks.reset(epoch);
    }

    pub fn click_burst(&self) -> &ClickBurst {
        &self.clicks
    }

    /// Returns the new visibility. Opening discovers the terminal egg.
    pub fn toggle_terminal(&mut self) -> bool {
        self.terminal_open = !self.terminal_open;
        if self.terminal_open {
            self.manager.discover(eggs::TERMINAL);
        }
        self.terminal_open
    }

    pub fn close_terminal(&mut self) {
        self.terminal_open = false;
    }

    pub fn is_terminal_open(&self) -> bool {
        self.terminal_open
    }

    pub fn terminal(&self) -> &Terminal {
        &self.terminal
    }

    pub fn terminal_mut(&mut self) -> &mut Terminal {
        &mut self.terminal
    }

    pub fn submit_command(&mut self, line: &str) -> TerminalAction {
        let action = self.terminal.execute(line, &self.manager);
        if action == TerminalAction::Close {
            self.close_terminal();
        }
        action
    }

    pub fn birthday_greeting(&self, clock: &dyn Clock) -> Option<String> {
        let b = &self.config.birthday;
        birthday_greeting(&b.name, b.month, b.day, clock)
    }

    pub fn konami_cursor(&self) -> usize {
        self.konami.cursor()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::EventBus;
    use crate::eggs::store::{KeyedStore, MemoryBackend};
    use crate::triggers::{CalendarDay, FixedClock, KONAMI_SEQUENCE};

    fn hunt() -> EggHunt {
        let store = KeyedStore::new(MemoryBackend::new(), "t");
        let manager = AchievementManager::new(Box::new(store), Rc::new(EventBus::new()));
        EggHunt::new(EggConfig::default(), Rc::new(manager))
    }

    #[test]
    fn test_konami_keys_discover_without_preventing_default() {
        let mut h = hunt();
        let mut fired = 0;
        for code in KONAMI_SEQUENCE {
            let out = h.key_down(code, "x");
            assert!(!out.prevent_default);
            fired += out.konami as u32;
        }
        assert_eq!(fired, 1);
        assert!(h.manager().get(eggs::KONAMI_CODE).unwrap().discovered);
    }

    #[test]
    fn test_backtick_toggles_terminal_and_escape_closes() {
        let mut h = hunt();
        let out = h.key_down("Backquote", "`");
        assert_eq!(out.terminal, Some(true));
        assert!(out.prevent_default);
        assert!(h.manager().get(eggs::TERMINAL).unwrap().discovered);

        assert_eq!(h.key_down("Escape", "Escape").terminal, Some(false));
        assert_eq!(h.key_down("Escape", "Escape").terminal, None);
        assert_eq!(h.key_down("Backquote", "~").terminal, Some(true));
        assert_eq!(h.key_down("Backquote", "`").terminal, Some(false));
    }

    #[test]
    fn test_logo_burst_discovers_once() {
        let mut h = hunt();
        let outcomes: Vec<_> = (0..5).map(|_| h.logo_click()).collect();
        assert_eq!(outcomes.iter().filter(|o| o.fired).count(), 1);
        assert!(h.manager().get(eggs::LOGO_CLICKS).unwrap().discovered);
        let display = outcomes[4].schedule.unwrap();
        h.click_reset(display.epoch);
        assert_eq!(h.click_burst().state().count, 0);
    }

    #[test]
    fn test_exit_command_closes_terminal() {
        let mut h = hunt();
        h.toggle_terminal();
        assert_eq!(h.submit_command("EXIT"), TerminalAction::Close);
        assert!(!h.is_terminal_open());
    }

    #[test]
    fn test_birthday_uses_configured_day() {
        let h = hunt();
        let dec14 = FixedClock(CalendarDay { month: 12, day: 14 });
        let dec15 = FixedClock(CalendarDay { month: 12, day: 15 });
        assert!(h.birthday_greeting(&dec14).is_some());
        assert!(h.birthday_greeting(&dec15).is_none());
    }
}
