//! Portfolio easter eggs core crate.
//!
//! Tracks which of the site's hidden eggs a visitor has found, detects the
//! inputs that unlock them (Konami code, logo burst, hidden terminal, secret
//! commands) and drives canvas animations for the visualization components.
//! The core is plain Rust and tested natively; `web` binds it to the DOM.

use wasm_bindgen::prelude::*;

pub mod anim;
pub mod bus;
pub mod config;
pub mod eggs;
pub mod hunt;
pub mod logging;
pub mod triggers;
pub mod web;

pub use anim::{AnimationLoop, Extent, FrameScheduler, ManualFrames, Surface};
pub use bus::{EggEvent, EventBus, SubscriptionId};
pub use config::EggConfig;
pub use eggs::{AchievementManager, EASTER_EGGS, EggStats, EggStatus};
pub use hunt::EggHunt;
pub use web::{CanvasLoop, EasterEggs};

// Optional small allocator for size (feature gated)
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn wasm_start() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
    logging::init_console(tracing::Level::INFO);
}

/// Build the hunt, attach its page listeners and log the birthday greeting
/// if today is the day.
#[wasm_bindgen]
pub fn start_easter_eggs(config_json: Option<String>) -> Result<EasterEggs, JsValue> {
    let mut eggs = EasterEggs::new(config_json)?;
    eggs.attach()?;
    if let Some(greeting) = eggs.birthday_greeting() {
        tracing::info!("{greeting}");
    }
    Ok(eggs)
}
