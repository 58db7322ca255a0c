//! # Interaction modality
//!
//! Classifies the user's most recent input method as keyboard, pointer or
//! virtual (assistive technology and programmatic focus). Focus rings are
//! shown unless the last input came from a pointer.
//!
//! The tracker is an explicit service: create one, [`attach`] it to each
//! page, and hand clones to whatever needs to query or subscribe. State is
//! shared by all clones and all attached pages.
//!
//! [`attach`]: ModalityTracker::attach

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use rustkit_dom::{
    AddEventListenerOptions, Document, DocumentId, DomEvent, EventListenerCallback, EventTargetId,
    NodeId,
};
use tracing::{debug, trace};

use crate::config::Platform;
use crate::global_listeners::GlobalListeners;
use crate::pointer::{is_virtual_click, NativeInput, PointerType};
use crate::InteractionError;

/// Coarse input method classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modality {
    Keyboard,
    Pointer,
    Virtual,
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Modality::Keyboard => "keyboard",
            Modality::Pointer => "pointer",
            Modality::Virtual => "virtual",
        };
        f.write_str(name)
    }
}

/// Keys that show focus rings even while typing in a text field.
const FOCUS_VISIBLE_INPUT_KEYS: &[&str] = &["Tab", "Escape"];

/// A modality notification.
pub struct ModalityChange<'a> {
    pub modality: Modality,
    /// The native event behind the change, absent for manual overrides.
    pub event: Option<&'a DomEvent>,
    pub document: Option<&'a Document>,
}

impl ModalityChange<'_> {
    /// Whether this is typing into a text field, which should not turn
    /// focus rings on.
    pub fn is_text_entry(&self, is_text_input: bool) -> bool {
        let Some(event) = self.event else {
            return false;
        };
        let Some(keyboard) = event.keyboard_data() else {
            return false;
        };
        if self.modality != Modality::Keyboard {
            return false;
        }

        let target_is_text = is_text_input
            || match (self.document, event.event().target_node()) {
                (Some(document), Some(target)) => document
                    .node(target)
                    .map(|n| n.is_text_editable())
                    .unwrap_or(false),
                _ => false,
            };

        target_is_text && !FOCUS_VISIBLE_INPUT_KEYS.contains(&keyboard.key.as_str())
    }
}

/// Subscriber callback.
pub type ModalityHandler = Rc<dyn Fn(&ModalityChange<'_>)>;

#[derive(Debug)]
struct ModalityState {
    modality: Option<Modality>,
    pointer_type: PointerType,
    has_event_before_focus: bool,
    has_blurred_window_recently: bool,
}

impl Default for ModalityState {
    fn default() -> Self {
        Self {
            modality: None,
            pointer_type: PointerType::Keyboard,
            has_event_before_focus: false,
            has_blurred_window_recently: false,
        }
    }
}

struct TrackerInner {
    platform: Platform,
    state: RefCell<ModalityState>,
    /// Depth of `ignore_focus_events` scopes.
    ignore_focus: Cell<u32>,
    handlers: RefCell<Vec<(u64, ModalityHandler)>>,
    next_handler: Cell<u64>,
    attachments: RefCell<HashMap<DocumentId, GlobalListeners>>,
}

/// Page-wide input modality service.
#[derive(Clone)]
pub struct ModalityTracker {
    inner: Rc<TrackerInner>,
}

/// Keeps a subscriber registered until dropped.
pub struct ModalitySubscription {
    tracker: Weak<TrackerInner>,
    id: u64,
}

impl Drop for ModalitySubscription {
    fn drop(&mut self) {
        if let Some(inner) = self.tracker.upgrade() {
            inner.handlers.borrow_mut().retain(|(id, _)| *id != self.id);
        }
    }
}

impl ModalityTracker {
    pub fn new(platform: Platform) -> Self {
        Self {
            inner: Rc::new(TrackerInner {
                platform,
                state: RefCell::new(ModalityState::default()),
                ignore_focus: Cell::new(0),
                handlers: RefCell::new(Vec::new()),
                next_handler: Cell::new(1),
                attachments: RefCell::new(HashMap::new()),
            }),
        }
    }

    /// Start tracking input on `document`. Attaching twice is a no-op.
    pub fn attach(&self, document: &Document) {
        if self.is_attached(document) {
            return;
        }

        let listeners = GlobalListeners::new(document);
        let capture = AddEventListenerOptions::capture();

        let on_keyboard = self.listener(document, |tracker, doc, event| {
            tracker.handle_keyboard_event(doc, event)
        });
        listeners.add(EventTargetId::Document, "keydown", on_keyboard.clone(), capture);
        listeners.add(EventTargetId::Document, "keyup", on_keyboard, capture);

        let on_click = self.listener(document, |tracker, doc, event| {
            tracker.handle_click_event(doc, event)
        });
        listeners.add(EventTargetId::Document, "click", on_click, capture);

        let on_pointer = self.listener(document, |tracker, doc, event| {
            tracker.handle_pointer_event(doc, event)
        });
        let pointer_types: [&str; 3] = if self.inner.platform.pointer_events {
            ["pointerdown", "pointermove", "pointerup"]
        } else {
            ["mousedown", "mousemove", "mouseup"]
        };
        for event_type in pointer_types {
            listeners.add(EventTargetId::Document, event_type, on_pointer.clone(), capture);
        }

        let on_focus = self.listener(document, |tracker, doc, event| {
            tracker.handle_focus_event(doc, event)
        });
        listeners.add(EventTargetId::Window, "focus", on_focus, capture);

        let on_blur = self.listener(document, |tracker, _, _| tracker.handle_window_blur());
        listeners.add(
            EventTargetId::Window,
            "blur",
            on_blur,
            AddEventListenerOptions::default(),
        );

        let on_unload = self.listener(document, |tracker, doc, _| {
            if let Err(err) = tracker.detach(doc) {
                debug!(error = %err, "detach on unload skipped");
            }
        });
        listeners.add(
            EventTargetId::Window,
            "beforeunload",
            on_unload,
            AddEventListenerOptions::once(),
        );

        debug!(document = document.id().raw(), "modality tracking attached");
        self.inner
            .attachments
            .borrow_mut()
            .insert(document.id(), listeners);
    }

    /// Stop tracking input on `document`.
    pub fn detach(&self, document: &Document) -> Result<(), InteractionError> {
        let removed = self.inner.attachments.borrow_mut().remove(&document.id());
        match removed {
            Some(listeners) => {
                listeners.remove_all();
                debug!(document = document.id().raw(), "modality tracking detached");
                Ok(())
            }
            None => Err(InteractionError::NotAttached(document.id())),
        }
    }

    pub fn is_attached(&self, document: &Document) -> bool {
        self.inner
            .attachments
            .borrow()
            .contains_key(&document.id())
    }

    fn listener<F>(&self, document: &Document, handle: F) -> EventListenerCallback
    where
        F: Fn(&ModalityTracker, &Document, &DomEvent) + 'static,
    {
        let tracker = Rc::downgrade(&self.inner);
        let document = document.downgrade();
        Rc::new(move |event: &DomEvent| {
            let (Some(inner), Some(document)) = (tracker.upgrade(), document.upgrade()) else {
                return;
            };
            handle(&ModalityTracker { inner }, &document, event);
        })
    }

    // ==================== Queries ====================

    /// Focus rings are visible unless the last input was a pointer.
    pub fn is_focus_visible(&self) -> bool {
        self.inner.state.borrow().modality != Some(Modality::Pointer)
    }

    pub fn interaction_modality(&self) -> Option<Modality> {
        self.inner.state.borrow().modality
    }

    /// Override the modality, e.g. from tests or after a custom input.
    pub fn set_interaction_modality(&self, modality: Modality) {
        self.inner.state.borrow_mut().modality = Some(modality);
        self.trigger_change_handlers(modality, None, None);
    }

    /// The last concrete input device.
    pub fn pointer_type(&self) -> PointerType {
        self.inner.state.borrow().pointer_type
    }

    // ==================== Focus Notifications ====================

    /// Report that a focus move is about to happen as a direct consequence
    /// of physical input, so the following focus event is not taken for
    /// assistive technology.
    pub fn notify_programmatic_focus(&self) {
        self.inner.state.borrow_mut().has_event_before_focus = true;
    }

    /// Run `f` with focus events ignored by the classifier.
    pub fn ignore_focus_events<R>(&self, f: impl FnOnce() -> R) -> R {
        struct Guard<'a>(&'a Cell<u32>);
        impl Drop for Guard<'_> {
            fn drop(&mut self) {
                self.0.set(self.0.get().saturating_sub(1));
            }
        }

        self.inner.ignore_focus.set(self.inner.ignore_focus.get() + 1);
        let _guard = Guard(&self.inner.ignore_focus);
        f()
    }

    /// Focus `node` without changing the current modality.
    pub fn focus_without_modality_change(&self, document: &Document, node: NodeId) -> bool {
        self.ignore_focus_events(|| match document.focus(node) {
            Ok(focused) => focused,
            Err(err) => {
                debug!(error = %err, "focus skipped");
                false
            }
        })
    }

    fn is_ignoring_focus(&self) -> bool {
        self.inner.ignore_focus.get() > 0
    }

    // ==================== Subscriptions ====================

    /// Call `handler` on every modality change until the subscription drops.
    pub fn subscribe(&self, handler: ModalityHandler) -> ModalitySubscription {
        let id = self.inner.next_handler.get();
        self.inner.next_handler.set(id + 1);
        self.inner.handlers.borrow_mut().push((id, handler));
        ModalitySubscription {
            tracker: Rc::downgrade(&self.inner),
            id,
        }
    }

    /// Call `handler` with the current focus visibility whenever it may
    /// have changed, skipping keystrokes that only type into a text field.
    pub fn focus_visible_listener(
        &self,
        handler: Rc<dyn Fn(bool)>,
        is_text_input: bool,
    ) -> ModalitySubscription {
        let tracker = Rc::downgrade(&self.inner);
        self.subscribe(Rc::new(move |change: &ModalityChange<'_>| {
            if change.is_text_entry(is_text_input) {
                return;
            }
            if let Some(inner) = tracker.upgrade() {
                handler(ModalityTracker { inner }.is_focus_visible());
            }
        }))
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.handlers.borrow().len()
    }

    fn trigger_change_handlers(
        &self,
        modality: Modality,
        event: Option<&DomEvent>,
        document: Option<&Document>,
    ) {
        trace!(%modality, "modality change");
        let handlers: Vec<_> = self
            .inner
            .handlers
            .borrow()
            .iter()
            .map(|(_, h)| h.clone())
            .collect();
        let change = ModalityChange {
            modality,
            event,
            document,
        };
        for handler in handlers {
            handler(&change);
        }
    }

    // ==================== Native Handlers ====================

    fn is_valid_key(&self, event: &DomEvent) -> bool {
        let Some(data) = event.keyboard_data() else {
            return false;
        };
        let m = data.modifiers;
        !(m.meta
            || (!self.inner.platform.is_mac() && m.alt)
            || m.ctrl
            || matches!(data.key.as_str(), "Control" | "Shift" | "Meta"))
    }

    fn handle_keyboard_event(&self, document: &Document, event: &DomEvent) {
        self.inner.state.borrow_mut().has_event_before_focus = true;
        if self.is_valid_key(event) {
            {
                let mut state = self.inner.state.borrow_mut();
                state.modality = Some(Modality::Keyboard);
                state.pointer_type = PointerType::Keyboard;
            }
            self.trigger_change_handlers(Modality::Keyboard, Some(event), Some(document));
        }
    }

    fn handle_pointer_event(&self, document: &Document, event: &DomEvent) {
        let pointer_type = match NativeInput::classify(event) {
            NativeInput::Pointer(data) => PointerType::from(data.pointer_type),
            _ => PointerType::Mouse,
        };
        let is_down = matches!(event.event_type(), "pointerdown" | "mousedown");
        let changed = {
            let mut state = self.inner.state.borrow_mut();
            let changed = state.modality != Some(Modality::Pointer);
            state.modality = Some(Modality::Pointer);
            state.pointer_type = pointer_type;
            if is_down {
                state.has_event_before_focus = true;
            }
            changed
        };
        // moves and releases only notify when they switch the modality
        if is_down || changed {
            self.trigger_change_handlers(Modality::Pointer, Some(event), Some(document));
        }
    }

    fn handle_click_event(&self, document: &Document, event: &DomEvent) {
        if is_virtual_click(event, &self.inner.platform) {
            {
                let mut state = self.inner.state.borrow_mut();
                state.has_event_before_focus = true;
                state.modality = Some(Modality::Virtual);
                state.pointer_type = PointerType::Virtual;
            }
            self.trigger_change_handlers(Modality::Virtual, Some(event), Some(document));
        }
    }

    fn handle_focus_event(&self, document: &Document, event: &DomEvent) {
        let base = event.event();
        // window and document focus is not an element focus
        if base.target_node().is_none() || self.is_ignoring_focus() || !base.is_trusted {
            return;
        }

        let became_virtual = {
            let mut state = self.inner.state.borrow_mut();
            let virtual_focus = !state.has_event_before_focus && !state.has_blurred_window_recently;
            if virtual_focus {
                state.modality = Some(Modality::Virtual);
                state.pointer_type = PointerType::Virtual;
            }
            state.has_event_before_focus = false;
            state.has_blurred_window_recently = false;
            virtual_focus
        };

        if became_virtual {
            self.trigger_change_handlers(Modality::Virtual, Some(event), Some(document));
        }
    }

    fn handle_window_blur(&self) {
        if self.is_ignoring_focus() {
            return;
        }
        let mut state = self.inner.state.borrow_mut();
        state.has_event_before_focus = false;
        state.has_blurred_window_recently = true;
    }
}

impl Default for ModalityTracker {
    fn default() -> Self {
        Self::new(Platform::default())
    }
}

impl fmt::Debug for ModalityTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModalityTracker")
            .field("state", &*self.inner.state.borrow())
            .field("attached", &self.inner.attachments.borrow().len())
            .finish()
    }
}
