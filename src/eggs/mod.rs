//! Achievement registry and the manager that owns discovery state.
//!
//! The registry is a closed, static catalog. The manager merges it with
//! whatever the [`DiscoveryStore`] holds and announces changes on the
//! [`EventBus`]. Every detector and every UI widget goes through the manager;
//! nothing else writes to the store.

pub mod store;

use std::collections::BTreeMap;
use std::rc::Rc;

use serde::Serialize;

use crate::bus::{EggEvent, EventBus};
use store::{DiscoveryState, DiscoveryStore};

// --- Registry ----------------------------------------------------------------

/// Static achievement definition. `hint` is always shown; `name` and
/// `description` are meant to stay hidden until discovery.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Achievement {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub hint: &'static str,
}

pub const KONAMI_CODE: &str = "konami_code";
pub const TERMINAL: &str = "terminal";
pub const LOGO_CLICKS: &str = "logo_clicks";
pub const MATRIX: &str = "matrix";
pub const SURPRISE: &str = "surprise";

/// All achievements, in display order.
pub static EASTER_EGGS: [Achievement; 5] = [
    Achievement {
        id: KONAMI_CODE,
        name: "Konami Code",
        description: "You unlocked developer mode by entering the Konami Code!",
        hint: "A legendary cheat code from the 80s that starts with a double ascent, followed by a descent...",
    },
    Achievement {
        id: TERMINAL,
        name: "Terminal Access",
        description: "You found the hidden terminal!",
        hint: "Between 'Tab' and 'Esc' lies the gateway to a developer's world.",
    },
    Achievement {
        id: LOGO_CLICKS,
        name: "Curious Clicker",
        description: "You found the secret by clicking the logo multiple times!",
        hint: "A familiar name at the top might reward those who touch it more than once or twice.",
    },
    Achievement {
        id: MATRIX,
        name: "The Matrix",
        description: "You entered the Matrix!",
        hint: "This 2000s movie involves hackers in a digital world. Type its title to step into a virtual illusion.",
    },
    Achievement {
        id: SURPRISE,
        name: "Surprise Party",
        description: "You triggered the surprise animation!",
        hint: "Birthdays have these, and so do parties. This word holds the key.",
    },
];

pub fn achievement(id: &str) -> Option<&'static Achievement> {
    EASTER_EGGS.iter().find(|a| a.id == id)
}

// --- Manager -----------------------------------------------------------------

/// An achievement merged with its discovery flag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EggStatus {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub hint: &'static str,
    pub discovered: bool,
}

impl EggStatus {
    fn new(a: &'static Achievement, discovered: bool) -> Self {
        Self {
            id: a.id,
            name: a.name,
            description: a.description,
            hint: a.hint,
            discovered,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct EggStats {
    pub discovered: usize,
    pub total: usize,
}

pub struct AchievementManager {
    store: Box<dyn DiscoveryStore>,
    bus: Rc<EventBus>,
}

impl AchievementManager {
    pub fn new(store: Box<dyn DiscoveryStore>, bus: Rc<EventBus>) -> Self {
        Self { store, bus }
    }

    pub fn bus(&self) -> &Rc<EventBus> {
        &self.bus
    }

    /// Current state; unreadable storage reads as "nothing discovered".
    fn load(&self) -> DiscoveryState {
        match self.store.load() {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(store = self.store.name(), error = %e, "ignoring unreadable discovery state");
                DiscoveryState::new()
            }
        }
    }

    /// Every registry entry with its discovered flag.
    pub fn all(&self) -> BTreeMap<&'static str, EggStatus> {
        let state = self.load();
        EASTER_EGGS
            .iter()
            .map(|a| (a.id, EggStatus::new(a, state.is_discovered(a.id))))
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<EggStatus> {
        let a = achievement(id)?;
        Some(EggStatus::new(a, self.load().is_discovered(a.id)))
    }

    /// Marks `id` discovered. Unknown ids are rejected with `false`.
    ///
    /// Re-discovering an id returns `true` but neither rewrites storage nor
    /// publishes again.
    pub fn discover(&self, id: &str) -> bool {
        let Some(a) = achievement(id) else {
            tracing::debug!(id, "discover called with unknown achievement id");
            return false;
        };
        let mut state = self.load();
        if !state.mark(a.id) {
            return true;
        }
        if let Err(e) = self.store.save(&state) {
            tracing::warn!(store = self.store.name(), id = a.id, error = %e, "failed to persist discovery");
        }
        tracing::info!(id = a.id, egg = a.name, "easter egg discovered");
        self.bus.publish(&EggEvent::AchievementDiscovered {
            id: a.id.to_string(),
        });
        true
    }

    pub fn stats(&self) -> EggStats {
        let state = self.load();
        let discovered = EASTER_EGGS
            .iter()
            .filter(|a| state.is_discovered(a.id))
            .count();
        EggStats {
            discovered,
            total: EASTER_EGGS.len(),
        }
    }

    pub fn is_complete(&self) -> bool {
        let s = self.stats();
        s.total > 0 && s.discovered == s.total
    }

    pub fn reset(&self) {
        if let Err(e) = self.store.clear() {
            tracing::warn!(store = self.store.name(), error = %e, "failed to clear discovery state");
        }
        tracing::info!("easter eggs reset");
        self.bus.publish(&EggEvent::AchievementsReset);
    }
}
