//! # Hover
//!
//! Hover start/end for pointer devices that can hover. Touch never hovers,
//! and the compatibility mouse events browsers emit right after a touch are
//! ignored for a short window so a tap does not leave an element hovered.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use std::time::Duration;

use rustkit_dom::{
    AddEventListenerOptions, Document, DocumentId, DomEvent, EventListenerCallback,
    EventTargetId, NodeId, PointerType as DomPointerType, TimerId,
};
use tracing::trace;

use crate::config::DisabledFlag;
use crate::context::Interactions;
use crate::events::{HoverEvent, HoverEventType};
use crate::global_listeners::{Binding, GlobalListeners};
use crate::pointer::{NativeEventType, PointerType};
use crate::InteractionError;

// ==================== Emulated Mouse Guard ====================

struct EmulatedMouseInner {
    window: Duration,
    ignoring: Cell<bool>,
    timer: Cell<Option<(DocumentId, TimerId)>>,
    tracked: RefCell<HashMap<DocumentId, GlobalListeners>>,
}

/// Page-wide flag raised after every touch release, while browsers replay
/// the touch as mouse events.
#[derive(Clone)]
pub(crate) struct EmulatedMouse {
    inner: Rc<EmulatedMouseInner>,
}

impl EmulatedMouse {
    pub(crate) fn new(window: Duration) -> Self {
        Self {
            inner: Rc::new(EmulatedMouseInner {
                window,
                ignoring: Cell::new(false),
                timer: Cell::new(None),
                tracked: RefCell::new(HashMap::new()),
            }),
        }
    }

    /// Watch `document` for touch releases. Idempotent.
    pub(crate) fn track(&self, document: &Document) {
        if self.inner.tracked.borrow().contains_key(&document.id()) {
            return;
        }

        let listeners = GlobalListeners::new(document);
        let weak_document = document.downgrade();
        let guard = Rc::downgrade(&self.inner);
        let on_pointer_up: EventListenerCallback = Rc::new(move |event: &DomEvent| {
            let is_touch = event
                .pointer_data()
                .map(|p| p.pointer_type == DomPointerType::Touch)
                .unwrap_or(false);
            if is_touch {
                arm(&guard, &weak_document);
            }
        });
        listeners.add(
            EventTargetId::Document,
            "pointerup",
            on_pointer_up,
            AddEventListenerOptions::default(),
        );

        let weak_document = document.downgrade();
        let guard = Rc::downgrade(&self.inner);
        listeners.add(
            EventTargetId::Document,
            "touchend",
            Rc::new(move |_: &DomEvent| arm(&guard, &weak_document)),
            AddEventListenerOptions::default(),
        );

        self.inner.tracked.borrow_mut().insert(document.id(), listeners);
    }

    pub(crate) fn is_ignoring(&self) -> bool {
        self.inner.ignoring.get()
    }
}

fn arm(guard: &Weak<EmulatedMouseInner>, document: &rustkit_dom::WeakDocument) {
    let (Some(inner), Some(document)) = (guard.upgrade(), document.upgrade()) else {
        return;
    };

    inner.ignoring.set(true);
    if let Some((owner, timer)) = inner.timer.take() {
        if owner == document.id() {
            document.clear_timeout(timer);
        }
    }

    let weak = Rc::downgrade(&inner);
    let timer = document.set_timeout(
        move || {
            if let Some(inner) = weak.upgrade() {
                inner.ignoring.set(false);
                inner.timer.set(None);
            }
        },
        inner.window,
    );
    inner.timer.set(Some((document.id(), timer)));
    trace!("ignoring emulated mouse events");
}

// ==================== Hover Controller ====================

/// Consumer callbacks for hover.
#[derive(Clone, Default)]
pub struct HoverCallbacks {
    pub on_hover_start: Option<Rc<dyn Fn(&HoverEvent)>>,
    pub on_hover_end: Option<Rc<dyn Fn(&HoverEvent)>>,
    pub on_hover_change: Option<Rc<dyn Fn(bool)>>,
}

impl HoverCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_hover_start(mut self, f: impl Fn(&HoverEvent) + 'static) -> Self {
        self.on_hover_start = Some(Rc::new(f));
        self
    }

    pub fn on_hover_end(mut self, f: impl Fn(&HoverEvent) + 'static) -> Self {
        self.on_hover_end = Some(Rc::new(f));
        self
    }

    pub fn on_hover_change(mut self, f: impl Fn(bool) + 'static) -> Self {
        self.on_hover_change = Some(Rc::new(f));
        self
    }
}

#[derive(Debug, Default)]
struct HoverState {
    is_hovered: bool,
    /// Set by a touchstart on the element; eats the next mouseenter.
    ignore_emulated_mouse_events: bool,
    pointer_type: Option<PointerType>,
    target: Option<NodeId>,
}

struct HoverInner {
    document: Document,
    ctx: Interactions,
    callbacks: HoverCallbacks,
    disabled: DisabledFlag,
    state: RefCell<HoverState>,
    this: Weak<HoverInner>,
}

/// Hover tracking for one element.
pub struct HoverController {
    inner: Rc<HoverInner>,
}

impl HoverController {
    pub fn new(
        document: &Document,
        ctx: &Interactions,
        callbacks: HoverCallbacks,
        disabled: DisabledFlag,
    ) -> Self {
        ctx.emulated_mouse().track(document);
        let inner = Rc::new_cyclic(|this| HoverInner {
            document: document.clone(),
            ctx: ctx.clone(),
            callbacks,
            disabled,
            state: RefCell::new(HoverState::default()),
            this: this.clone(),
        });
        Self { inner }
    }

    pub fn handlers(&self) -> Vec<(NativeEventType, EventListenerCallback)> {
        let inner = &self.inner;
        if inner.ctx.platform().pointer_events {
            vec![
                (NativeEventType::PointerEnter, inner.handler(HoverInner::on_pointer_enter)),
                (NativeEventType::PointerLeave, inner.handler(HoverInner::on_pointer_leave)),
            ]
        } else {
            vec![
                (NativeEventType::TouchStart, inner.handler(HoverInner::on_touch_start)),
                (NativeEventType::MouseEnter, inner.handler(HoverInner::on_mouse_enter)),
                (NativeEventType::MouseLeave, inner.handler(HoverInner::on_mouse_leave)),
            ]
        }
    }

    pub fn bind(&self, node: NodeId) -> Result<Binding, InteractionError> {
        Binding::new(&self.inner.document, node, self.handlers())
    }

    pub fn is_hovered(&self) -> bool {
        self.inner.state.borrow().is_hovered
    }

    /// Disabling ends a hover in progress.
    pub fn set_disabled(&self, disabled: bool) {
        self.inner.disabled.set(disabled);
        if disabled {
            self.inner.trigger_hover_end();
        }
    }

    pub fn dispose(&self) {
        self.inner.trigger_hover_end();
    }
}

impl HoverInner {
    fn handler(&self, handle: fn(&HoverInner, &DomEvent)) -> EventListenerCallback {
        let this = self.this.clone();
        Rc::new(move |event: &DomEvent| {
            if let Some(inner) = this.upgrade() {
                handle(&inner, event);
            }
        })
    }

    fn event_element(&self, event: &DomEvent) -> Option<NodeId> {
        let base = event.event();
        let current = base.current_target_node()?;
        let target = base.target_node()?;
        self.document.contains(current, target).then_some(current)
    }

    fn trigger_hover_start(&self, event: &DomEvent, pointer_type: PointerType) {
        if self.disabled.get() || pointer_type == PointerType::Touch {
            return;
        }
        let Some(element) = self.event_element(event) else {
            return;
        };
        {
            let mut state = self.state.borrow_mut();
            if state.is_hovered {
                return;
            }
            state.is_hovered = true;
            state.pointer_type = Some(pointer_type);
            state.target = Some(element);
        }

        if let Some(on_hover_start) = &self.callbacks.on_hover_start {
            on_hover_start(&HoverEvent {
                event_type: HoverEventType::HoverStart,
                pointer_type,
                target: element,
            });
        }
        if let Some(on_hover_change) = &self.callbacks.on_hover_change {
            on_hover_change(true);
        }
    }

    fn trigger_hover_end(&self) {
        let ended = {
            let mut state = self.state.borrow_mut();
            if !state.is_hovered {
                return;
            }
            state.is_hovered = false;
            (state.target.take(), state.pointer_type.take())
        };

        if let (Some(target), Some(pointer_type)) = ended {
            if let Some(on_hover_end) = &self.callbacks.on_hover_end {
                on_hover_end(&HoverEvent {
                    event_type: HoverEventType::HoverEnd,
                    pointer_type,
                    target,
                });
            }
        }
        if let Some(on_hover_change) = &self.callbacks.on_hover_change {
            on_hover_change(false);
        }
    }

    fn on_pointer_enter(&self, event: &DomEvent) {
        let Some(data) = event.pointer_data() else {
            return;
        };
        let pointer_type = PointerType::from(data.pointer_type);
        if self.ctx.emulated_mouse().is_ignoring() && pointer_type == PointerType::Mouse {
            return;
        }
        self.trigger_hover_start(event, pointer_type);
    }

    fn on_pointer_leave(&self, event: &DomEvent) {
        if !self.disabled.get() && self.event_element(event).is_some() {
            self.trigger_hover_end();
        }
    }

    fn on_touch_start(&self, _event: &DomEvent) {
        self.state.borrow_mut().ignore_emulated_mouse_events = true;
    }

    fn on_mouse_enter(&self, event: &DomEvent) {
        let ignore_local =
            std::mem::take(&mut self.state.borrow_mut().ignore_emulated_mouse_events);
        if !ignore_local && !self.ctx.emulated_mouse().is_ignoring() {
            self.trigger_hover_start(event, PointerType::Mouse);
        }
    }

    fn on_mouse_leave(&self, event: &DomEvent) {
        if !self.disabled.get() && self.event_element(event).is_some() {
            self.trigger_hover_end();
        }
    }
}
