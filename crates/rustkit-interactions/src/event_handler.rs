//! Consumer event handlers that stop propagation unless asked not to.

use std::cell::Cell;
use std::ops::Deref;
use std::rc::Rc;

use rustkit_dom::{DomEvent, EventListenerCallback};
use tracing::error;

/// A native event as seen by a consumer handler.
///
/// Propagation is stopped once the handler returns; call
/// [`continue_propagation`](Self::continue_propagation) to let the event
/// reach ancestors.
pub struct BaseEvent<'a> {
    native: &'a DomEvent,
    continue_propagation: Cell<bool>,
}

impl<'a> BaseEvent<'a> {
    pub fn new(native: &'a DomEvent) -> Self {
        Self {
            native,
            continue_propagation: Cell::new(false),
        }
    }

    pub fn native(&self) -> &'a DomEvent {
        self.native
    }

    pub fn prevent_default(&self) {
        self.native.event().prevent_default();
    }

    pub fn is_default_prevented(&self) -> bool {
        self.native.event().default_prevented()
    }

    /// Stopping is already the default; this only reports the misuse.
    pub fn stop_propagation(&self) {
        error!(
            event_type = self.native.event_type(),
            "stop_propagation is the default behavior; use continue_propagation to let the event through"
        );
    }

    pub fn continue_propagation(&self) {
        self.continue_propagation.set(true);
    }

    pub fn should_stop_propagation(&self) -> bool {
        !self.continue_propagation.get()
    }
}

impl Deref for BaseEvent<'_> {
    type Target = DomEvent;

    fn deref(&self) -> &DomEvent {
        self.native
    }
}

/// Consumer handler receiving a [`BaseEvent`].
pub type BaseEventHandler = Rc<dyn Fn(&BaseEvent<'_>)>;

/// Wrap a consumer handler into a native listener. Each invocation starts
/// with propagation stopped; the decision never carries over to the next
/// event.
pub fn create_event_handler(handler: Option<BaseEventHandler>) -> Option<EventListenerCallback> {
    let handler = handler?;
    Some(Rc::new(move |native: &DomEvent| {
        let event = BaseEvent::new(native);
        handler(&event);
        if event.should_stop_propagation() {
            native.event().stop_propagation();
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustkit_dom::{KeyboardEventData, Modifiers};

    fn keydown() -> DomEvent {
        DomEvent::keyboard("keydown", KeyboardEventData::key("a"))
    }

    #[test]
    fn test_none_handler() {
        assert!(create_event_handler(None).is_none());
    }

    #[test]
    fn test_stops_by_default() {
        let listener = create_event_handler(Some(Rc::new(|_: &BaseEvent<'_>| {}))).unwrap();
        let event = keydown();
        listener(&event);
        assert!(event.event().propagation_stopped());
    }

    #[test]
    fn test_decision_is_per_invocation() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let listener = create_event_handler(Some(Rc::new(move |e: &BaseEvent<'_>| {
            counter.set(counter.get() + 1);
            if counter.get() == 1 {
                e.continue_propagation();
            }
        })))
        .unwrap();

        let first = keydown();
        listener(&first);
        assert!(!first.event().propagation_stopped());

        let second = keydown();
        listener(&second);
        assert!(second.event().propagation_stopped());
    }

    #[test]
    fn test_stop_propagation_is_inert_and_prevent_default_passes_through() {
        let listener = create_event_handler(Some(Rc::new(|e: &BaseEvent<'_>| {
            e.stop_propagation();
            e.continue_propagation();
            e.prevent_default();
            assert!(e.is_default_prevented());
            assert_eq!(e.modifiers(), Modifiers::default());
        })))
        .unwrap();
        let event = keydown();
        listener(&event);
        assert!(!event.event().propagation_stopped());
        assert!(event.event().default_prevented());
    }
}
