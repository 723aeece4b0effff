//! In-process typed publish/subscribe.
//!
//! Delivery is synchronous and in registration order. `publish` walks a
//! snapshot of the subscriber list, so a handler may subscribe or unsubscribe
//! (itself included) without disturbing the current delivery.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use serde_json::{Value, json};

/// Events carried on the bus.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EggEvent {
    AchievementDiscovered { id: String },
    AchievementsReset,
    /// A hidden terminal command ran; decorative animations key off this.
    SecretCommandTriggered { command: String },
}

impl EggEvent {
    /// Wire name used when forwarding to JavaScript.
    pub fn name(&self) -> &'static str {
        match self {
            EggEvent::AchievementDiscovered { .. } => "achievement-discovered",
            EggEvent::AchievementsReset => "achievements-reset",
            EggEvent::SecretCommandTriggered { .. } => "secret-command-triggered",
        }
    }

    pub fn detail(&self) -> Value {
        match self {
            EggEvent::AchievementDiscovered { id } => json!({ "id": id }),
            EggEvent::AchievementsReset => json!({}),
            EggEvent::SecretCommandTriggered { command } => json!({ "command": command }),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn as_u64(self) -> u64 {
        self.0
    }

    pub fn from_u64(raw: u64) -> Self {
        Self(raw)
    }
}

type Handler = Rc<dyn Fn(&EggEvent)>;

#[derive(Default)]
pub struct EventBus {
    next_id: Cell<u64>,
    subscribers: RefCell<Vec<(SubscriptionId, Handler)>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, handler: impl Fn(&EggEvent) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.subscribers.borrow_mut().push((id, Rc::new(handler)));
        id
    }

    /// Returns false if the id was not (or no longer) subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subs = self.subscribers.borrow_mut();
        let before = subs.len();
        subs.retain(|(sid, _)| *sid != id);
        subs.len() != before
    }

    pub fn publish(&self, event: &EggEvent) {
        let snapshot: Vec<Handler> = self
            .subscribers
            .borrow()
            .iter()
            .map(|(_, h)| Rc::clone(h))
            .collect();
        tracing::trace!(event = event.name(), subscribers = snapshot.len(), "publish");
        for handler in snapshot {
            handler(event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder(bus: &EventBus, tag: &'static str, log: &Rc<RefCell<Vec<String>>>) -> SubscriptionId {
        let log = Rc::clone(log);
        bus.subscribe(move |e| log.borrow_mut().push(format!("{tag}:{}", e.name())))
    }

    #[test]
    fn test_delivers_in_registration_order() {
        let bus = EventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        recorder(&bus, "a", &log);
        recorder(&bus, "b", &log);
        bus.publish(&EggEvent::AchievementsReset);
        assert_eq!(*log.borrow(), vec!["a:achievements-reset", "b:achievements-reset"]);
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let bus = EventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let id = recorder(&bus, "a", &log);
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.publish(&EggEvent::AchievementsReset);
        assert!(log.borrow().is_empty());
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_handler_may_unsubscribe_itself_during_publish() {
        let bus = Rc::new(EventBus::new());
        let hits = Rc::new(Cell::new(0));
        let own_id = Rc::new(Cell::new(None));
        let id = {
            let inner_bus = Rc::clone(&bus);
            let hits = Rc::clone(&hits);
            let own_id = Rc::clone(&own_id);
            bus.subscribe(move |_| {
                hits.set(hits.get() + 1);
                if let Some(id) = own_id.get() {
                    inner_bus.unsubscribe(id);
                }
            })
        };
        own_id.set(Some(id));
        bus.publish(&EggEvent::AchievementsReset);
        bus.publish(&EggEvent::AchievementsReset);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_event_payloads() {
        let e = EggEvent::AchievementDiscovered { id: "matrix".into() };
        assert_eq!(e.detail(), json!({ "id": "matrix" }));
        let e = EggEvent::SecretCommandTriggered { command: "surprise".into() };
        assert_eq!(e.name(), "secret-command-triggered");
        assert_eq!(e.detail()["command"], "surprise");
        assert_eq!(EggEvent::AchievementsReset.detail(), json!({}));
    }
}
