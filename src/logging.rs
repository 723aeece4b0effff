//! Routes `tracing` events to the browser console.

use std::fmt::Write as _;

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

/// Collects `message` plus `key=value` pairs for the other fields.
#[derive(Default)]
struct LineVisitor {
    message: String,
    fields: String,
}

impl Visit for LineVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            let _ = write!(self.fields, " {}={value:?}", field.name());
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={value}", field.name());
        }
    }
}

pub(crate) fn format_event(event: &Event<'_>) -> String {
    let mut visitor = LineVisitor::default();
    event.record(&mut visitor);
    format!(
        "[{}] {}{}",
        event.metadata().target(),
        visitor.message,
        visitor.fields
    )
}

/// `tracing` layer writing to `console.warn` / `console.log`.
pub struct ConsoleLayer {
    max_level: Level,
}

impl ConsoleLayer {
    pub fn new(max_level: Level) -> Self {
        Self { max_level }
    }
}

impl<S: Subscriber> Layer<S> for ConsoleLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let level = *event.metadata().level();
        if level > self.max_level {
            return;
        }
        let line = wasm_bindgen::JsValue::from_str(&format_event(event));
        match level {
            Level::ERROR => web_sys::console::error_1(&line),
            Level::WARN => web_sys::console::warn_1(&line),
            _ => web_sys::console::log_1(&line),
        }
    }
}

/// Installs the console layer as the global subscriber. Later calls are
/// no-ops.
pub fn init_console(max_level: Level) {
    let _ = tracing_subscriber::registry()
        .with(ConsoleLayer::new(max_level))
        .try_init();
}
