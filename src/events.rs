use crate::content::{Content, Project};
use anyhow::{anyhow, Result};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// What the scene tells the page shell
#[derive(Debug, Clone, PartialEq)]
pub enum GalleryEvent {
    ShowProject(Project),
    ShowAbout,
    ShowContact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ShowProject,
    ShowAbout,
    ShowContact,
}

impl EventKind {
    pub const ALL: [EventKind; 3] = [EventKind::ShowProject, EventKind::ShowAbout, EventKind::ShowContact];

    /// Name of the shell callback
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::ShowProject => "showProject",
            EventKind::ShowAbout => "showAbout",
            EventKind::ShowContact => "showContact",
        }
    }
}

impl GalleryEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            GalleryEvent::ShowProject(_) => EventKind::ShowProject,
            GalleryEvent::ShowAbout => EventKind::ShowAbout,
            GalleryEvent::ShowContact => EventKind::ShowContact,
        }
    }

    pub fn from_content(content: &Content) -> Option<GalleryEvent> {
        match content {
            Content::About => Some(GalleryEvent::ShowAbout),
            Content::Contact => Some(GalleryEvent::ShowContact),
            Content::Project(project) => Some(GalleryEvent::ShowProject(project.clone())),
            Content::Empty => None,
        }
    }
}

pub type Handler = Box<dyn FnMut(&GalleryEvent)>;

/// Handle returned by `subscribe`, hand it back to `unsubscribe`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription {
    kind: EventKind,
    id: u64,
}

#[derive(Default)]
struct Registry {
    handlers: HashMap<EventKind, (u64, Option<Handler>)>,
    next_id: u64,
}

/// In-process publish / subscribe between the scene and the page shell
/// - at most one subscriber per event kind
/// - cheap to clone, clones share the registry
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Rc<RefCell<Registry>>,
}

impl EventBus {
    pub fn new() -> Self {
        EventBus::default()
    }

    pub fn subscribe(&self, kind: EventKind, handler: Handler) -> Result<Subscription> {
        let mut registry = self.registry.borrow_mut();
        if registry.handlers.contains_key(&kind) {
            return Err(anyhow!("'{}' already has a subscriber", kind.name()));
        }
        registry.next_id += 1;
        let id = registry.next_id;
        registry.handlers.insert(kind, (id, Some(handler)));
        Ok(Subscription { kind, id })
    }

    /// Returns false when the subscription was already gone
    pub fn unsubscribe(&self, subscription: &Subscription) -> bool {
        let mut registry = self.registry.borrow_mut();
        match registry.handlers.get(&subscription.kind) {
            Some((id, _)) if *id == subscription.id => {
                registry.handlers.remove(&subscription.kind);
                true
            }
            _ => false,
        }
    }

    pub fn clear(&self) {
        self.registry.borrow_mut().handlers.clear();
    }

    pub fn has_subscriber(&self, kind: EventKind) -> bool {
        self.registry.borrow().handlers.contains_key(&kind)
    }

    /// Deliver to the kind's subscriber, returns whether anyone got it
    /// - the handler runs with the registry unlocked, so it may
    /// unsubscribe or subscribe other kinds from inside the call
    pub fn publish(&self, event: &GalleryEvent) -> bool {
        let kind = event.kind();
        let taken = {
            let mut registry = self.registry.borrow_mut();
            registry
                .handlers
                .get_mut(&kind)
                .and_then(|(id, handler)| handler.take().map(|handler| (*id, handler)))
        };
        let Some((id, mut handler)) = taken else {
            log!("No subscriber for '{}', event dropped", kind.name());
            return false;
        };
        handler(event);
        // put it back unless it unsubscribed itself meanwhile
        if let Some((current, slot)) = self.registry.borrow_mut().handlers.get_mut(&kind) {
            if *current == id && slot.is_none() {
                *slot = Some(handler);
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn counter(bus: &EventBus, kind: EventKind) -> (Rc<Cell<u32>>, Subscription) {
        let count = Rc::new(Cell::new(0));
        let seen = count.clone();
        let subscription = bus
            .subscribe(kind, Box::new(move |_| seen.set(seen.get() + 1)))
            .expect("first subscriber");
        (count, subscription)
    }

    #[test]
    fn one_subscriber_per_kind() {
        let bus = EventBus::new();
        let (_, _subscription) = counter(&bus, EventKind::ShowAbout);
        assert!(bus.subscribe(EventKind::ShowAbout, Box::new(|_| {})).is_err());
        assert!(bus.subscribe(EventKind::ShowContact, Box::new(|_| {})).is_ok());
    }

    #[test]
    fn publish_reaches_only_matching_kind() {
        let bus = EventBus::new();
        let (about, _a) = counter(&bus, EventKind::ShowAbout);
        let (contact, _c) = counter(&bus, EventKind::ShowContact);
        assert!(bus.publish(&GalleryEvent::ShowAbout));
        assert_eq!(about.get(), 1);
        assert_eq!(contact.get(), 0);
    }

    #[test]
    fn unsubscribed_handlers_stop_receiving() {
        let bus = EventBus::new();
        let (about, subscription) = counter(&bus, EventKind::ShowAbout);
        assert!(bus.unsubscribe(&subscription));
        assert!(!bus.unsubscribe(&subscription));
        assert!(!bus.publish(&GalleryEvent::ShowAbout));
        assert_eq!(about.get(), 0);
        // the slot is free again
        assert!(bus.subscribe(EventKind::ShowAbout, Box::new(|_| {})).is_ok());
    }

    #[test]
    fn stale_subscription_cannot_remove_newer_one() {
        let bus = EventBus::new();
        let (_, old) = counter(&bus, EventKind::ShowContact);
        bus.unsubscribe(&old);
        let (contact, _new) = counter(&bus, EventKind::ShowContact);
        assert!(!bus.unsubscribe(&old));
        bus.publish(&GalleryEvent::ShowContact);
        assert_eq!(contact.get(), 1);
    }

    #[test]
    fn handler_may_unsubscribe_itself() {
        let bus = EventBus::new();
        let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let inner_bus = bus.clone();
        let inner_slot = slot.clone();
        let subscription = bus
            .subscribe(
                EventKind::ShowAbout,
                Box::new(move |_| {
                    if let Some(subscription) = inner_slot.borrow().as_ref() {
                        inner_bus.unsubscribe(subscription);
                    }
                }),
            )
            .expect("subscribe");
        *slot.borrow_mut() = Some(subscription);
        assert!(bus.publish(&GalleryEvent::ShowAbout));
        assert!(!bus.has_subscriber(EventKind::ShowAbout));
    }

    #[test]
    fn clear_drops_everything() {
        let bus = EventBus::new();
        for kind in EventKind::ALL {
            bus.subscribe(kind, Box::new(|_| {})).expect("subscribe");
        }
        bus.clear();
        assert!(EventKind::ALL.iter().all(|kind| !bus.has_subscriber(*kind)));
    }
}
