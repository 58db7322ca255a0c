//! Key handlers for an element, with propagation stopped unless the handler
//! continues it.

use std::rc::Rc;

use rustkit_dom::{Document, EventListenerCallback, NodeId};

use crate::config::DisabledFlag;
use crate::event_handler::{create_event_handler, BaseEvent, BaseEventHandler};
use crate::global_listeners::Binding;
use crate::pointer::NativeEventType;
use crate::InteractionError;

#[derive(Clone, Default)]
pub struct KeyboardCallbacks {
    pub on_key_down: Option<BaseEventHandler>,
    pub on_key_up: Option<BaseEventHandler>,
    pub is_disabled: DisabledFlag,
}

impl KeyboardCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_key_down(mut self, f: impl Fn(&BaseEvent<'_>) + 'static) -> Self {
        self.on_key_down = Some(Rc::new(f));
        self
    }

    pub fn on_key_up(mut self, f: impl Fn(&BaseEvent<'_>) + 'static) -> Self {
        self.on_key_up = Some(Rc::new(f));
        self
    }

    pub fn with_disabled(mut self, flag: DisabledFlag) -> Self {
        self.is_disabled = flag;
        self
    }
}

pub struct KeyboardController {
    document: Document,
    callbacks: KeyboardCallbacks,
}

impl KeyboardController {
    pub fn new(document: &Document, callbacks: KeyboardCallbacks) -> Self {
        Self {
            document: document.clone(),
            callbacks,
        }
    }

    /// Wrapped handlers. A disabled controller installs nothing.
    pub fn handlers(&self) -> Vec<(NativeEventType, EventListenerCallback)> {
        if self.callbacks.is_disabled.get() {
            return Vec::new();
        }

        let mut handlers = Vec::new();
        if let Some(handler) = create_event_handler(self.guarded(&self.callbacks.on_key_down)) {
            handlers.push((NativeEventType::KeyDown, handler));
        }
        if let Some(handler) = create_event_handler(self.guarded(&self.callbacks.on_key_up)) {
            handlers.push((NativeEventType::KeyUp, handler));
        }
        handlers
    }

    pub fn bind(&self, node: NodeId) -> Result<Binding, InteractionError> {
        Binding::new(&self.document, node, self.handlers())
    }

    /// Let events through untouched once the flag turns on after binding.
    fn guarded(&self, handler: &Option<BaseEventHandler>) -> Option<BaseEventHandler> {
        let handler = handler.clone()?;
        let disabled = self.callbacks.is_disabled.clone();
        Some(Rc::new(move |event: &BaseEvent<'_>| {
            if disabled.get() {
                event.continue_propagation();
                return;
            }
            handler(event);
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustkit_dom::{AddEventListenerOptions, DomEvent, EventTargetId, KeyboardEventData};
    use std::cell::Cell;

    fn page() -> (Document, NodeId, Rc<Cell<u32>>) {
        let doc = Document::parse_html("<html><body><div id='t'>keys</div></body></html>").unwrap();
        let node = doc.get_element_by_id("t").unwrap();
        let reached = Rc::new(Cell::new(0));
        let counter = reached.clone();
        doc.add_event_listener(
            EventTargetId::Document,
            "keydown",
            Rc::new(move |_| counter.set(counter.get() + 1)),
            AddEventListenerOptions::default(),
        );
        (doc, node, reached)
    }

    #[test]
    fn test_key_down_stops_by_default() {
        let (doc, node, reached) = page();
        let seen = Rc::new(Cell::new(0));
        let counter = seen.clone();
        let controller = KeyboardController::new(
            &doc,
            KeyboardCallbacks::new().on_key_down(move |_| counter.set(counter.get() + 1)),
        );
        let binding = controller.bind(node).unwrap();
        assert_eq!(binding.len(), 1);

        doc.dispatch(node, &DomEvent::keyboard("keydown", KeyboardEventData::key("a")));
        assert_eq!(seen.get(), 1);
        assert_eq!(reached.get(), 0);
    }

    #[test]
    fn test_continue_propagation_per_event() {
        let (doc, node, reached) = page();
        let controller = KeyboardController::new(
            &doc,
            KeyboardCallbacks::new().on_key_down(|e| {
                if e.keyboard_data().map(|k| k.key == "Tab").unwrap_or(false) {
                    e.continue_propagation();
                }
            }),
        );
        let _binding = controller.bind(node).unwrap();

        doc.dispatch(node, &DomEvent::keyboard("keydown", KeyboardEventData::key("Tab")));
        doc.dispatch(node, &DomEvent::keyboard("keydown", KeyboardEventData::key("a")));
        assert_eq!(reached.get(), 1);
    }

    #[test]
    fn test_disabled_installs_nothing() {
        let (doc, node, _) = page();
        let controller = KeyboardController::new(
            &doc,
            KeyboardCallbacks::new()
                .on_key_down(|_| {})
                .with_disabled(DisabledFlag::new(true)),
        );
        assert!(controller.bind(node).unwrap().is_empty());
    }
}
