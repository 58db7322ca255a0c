//! # Global listeners
//!
//! Scoped bookkeeping for listeners a gesture registers on the window, the
//! document or other elements while it is in progress. Every registration
//! returns a [`ListenerKey`]; removal is idempotent and dropping the scope
//! removes whatever is left.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use rustkit_dom::{
    AddEventListenerOptions, Document, DomEvent, EventListenerCallback, EventTargetId, ListenerId,
    NodeId,
};
use tracing::trace;

use crate::pointer::NativeEventType;
use crate::InteractionError;

/// Handle to one registration in a [`GlobalListeners`] scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerKey(u64);

/// A batch of listener registrations owned by one gesture or consumer.
pub struct GlobalListeners {
    document: Document,
    entries: Rc<RefCell<BTreeMap<ListenerKey, ListenerId>>>,
    next_key: Cell<u64>,
}

impl GlobalListeners {
    pub fn new(document: &Document) -> Self {
        Self {
            document: document.clone(),
            entries: Rc::new(RefCell::new(BTreeMap::new())),
            next_key: Cell::new(1),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Register `handler`. A `once` registration forgets its key after it
    /// fires.
    pub fn add(
        &self,
        target: EventTargetId,
        event_type: &str,
        handler: EventListenerCallback,
        options: AddEventListenerOptions,
    ) -> ListenerKey {
        let key = ListenerKey(self.next_key.get());
        self.next_key.set(key.0 + 1);

        let callback: EventListenerCallback = if options.once {
            let entries = Rc::downgrade(&self.entries);
            Rc::new(move |event: &DomEvent| {
                if let Some(entries) = entries.upgrade() {
                    entries.borrow_mut().remove(&key);
                }
                handler(event);
            })
        } else {
            handler
        };

        let id = self
            .document
            .add_event_listener(target, event_type, callback, options);
        self.entries.borrow_mut().insert(key, id);
        trace!(?target, event_type, key = key.0, "global listener added");
        key
    }

    /// Remove one registration. Returns false if it is already gone.
    pub fn remove(&self, key: ListenerKey) -> bool {
        let removed = self.entries.borrow_mut().remove(&key);
        match removed {
            Some(id) => self.document.remove_event_listener(id),
            None => false,
        }
    }

    /// Remove every registration in the scope.
    pub fn remove_all(&self) {
        let drained = std::mem::take(&mut *self.entries.borrow_mut());
        if drained.is_empty() {
            return;
        }
        trace!(count = drained.len(), "removing global listeners");
        for id in drained.into_values() {
            self.document.remove_event_listener(id);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl Drop for GlobalListeners {
    fn drop(&mut self) {
        self.remove_all();
    }
}

/// Element listeners registered by a controller's `bind`. Dropping the
/// binding detaches them.
pub struct Binding {
    node: NodeId,
    listeners: GlobalListeners,
}

impl Binding {
    /// Register `handlers` on `node`.
    pub fn new<I>(document: &Document, node: NodeId, handlers: I) -> Result<Self, InteractionError>
    where
        I: IntoIterator<Item = (NativeEventType, EventListenerCallback)>,
    {
        document.element(node)?;
        let listeners = GlobalListeners::new(document);
        for (event_type, handler) in handlers {
            listeners.add(
                EventTargetId::Node(node),
                event_type.as_str(),
                handler,
                AddEventListenerOptions::default(),
            );
        }
        Ok(Self { node, listeners })
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Number of element listeners installed.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Detach now rather than at drop.
    pub fn unbind(self) {
        self.listeners.remove_all();
    }
}
