//! # Move gestures
//!
//! Drag deltas for sliders, splitters and similar controls, from a pointer
//! (or legacy mouse/touch) held down on the element, or from arrow keys.
//!
//! Positions are page coordinates. `movestart` is delayed until the first
//! non-zero delta and `moveend` only fires if something moved, so a plain
//! click on the element produces no events at all.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use rustkit_dom::{
    AddEventListenerOptions, Document, DomEvent, EventListenerCallback, EventTargetId,
    Modifiers, NodeId, Touch,
};
use tracing::trace;

use crate::context::Interactions;
use crate::events::{MoveEvent, MoveEventType};
use crate::global_listeners::{Binding, GlobalListeners};
use crate::pointer::{touch_by_identifier, NativeEventType, PointerType};
use crate::InteractionError;

pub type MoveHandler = Rc<dyn Fn(&MoveEvent)>;

#[derive(Clone, Default)]
pub struct MoveCallbacks {
    pub on_move_start: Option<MoveHandler>,
    pub on_move: Option<MoveHandler>,
    pub on_move_end: Option<MoveHandler>,
}

impl MoveCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_move_start(mut self, f: impl Fn(&MoveEvent) + 'static) -> Self {
        self.on_move_start = Some(Rc::new(f));
        self
    }

    pub fn on_move(mut self, f: impl Fn(&MoveEvent) + 'static) -> Self {
        self.on_move = Some(Rc::new(f));
        self
    }

    pub fn on_move_end(mut self, f: impl Fn(&MoveEvent) + 'static) -> Self {
        self.on_move_end = Some(Rc::new(f));
        self
    }
}

#[derive(Debug, Default)]
struct MoveState {
    did_move: bool,
    last_position: Option<(f64, f64)>,
    /// Pointer id or touch identifier of the active drag.
    id: Option<i64>,
    /// A legacy mouse drag is in progress; mice carry no id.
    mouse_active: bool,
    element: Option<NodeId>,
}

struct MoveInner {
    document: Document,
    ctx: Interactions,
    callbacks: MoveCallbacks,
    state: RefCell<MoveState>,
    listeners: GlobalListeners,
    this: Weak<MoveInner>,
}

/// Move gesture controller for one element.
pub struct MoveController {
    inner: Rc<MoveInner>,
}

impl MoveController {
    pub fn new(document: &Document, ctx: &Interactions, callbacks: MoveCallbacks) -> Self {
        let inner = Rc::new_cyclic(|this| MoveInner {
            document: document.clone(),
            ctx: ctx.clone(),
            callbacks,
            state: RefCell::new(MoveState::default()),
            listeners: GlobalListeners::new(document),
            this: this.clone(),
        });
        Self { inner }
    }

    pub fn handlers(&self) -> Vec<(NativeEventType, EventListenerCallback)> {
        let inner = &self.inner;
        let mut handlers = vec![(NativeEventType::KeyDown, inner.handler(MoveInner::on_key_down))];
        if inner.ctx.platform().pointer_events {
            handlers.push((NativeEventType::PointerDown, inner.handler(MoveInner::on_pointer_down)));
        } else {
            handlers.push((NativeEventType::MouseDown, inner.handler(MoveInner::on_mouse_down)));
            handlers.push((NativeEventType::TouchStart, inner.handler(MoveInner::on_touch_start)));
        }
        handlers
    }

    pub fn bind(&self, node: NodeId) -> Result<Binding, InteractionError> {
        Binding::new(&self.inner.document, node, self.handlers())
    }

    /// Whether a pointer, mouse or touch drag is in progress.
    pub fn is_moving(&self) -> bool {
        self.inner.state.borrow().is_dragging()
    }

    pub fn dispose(&self) {
        self.inner.listeners.remove_all();
        let element = self.inner.state.borrow_mut().element.take();
        self.inner
            .ctx
            .text_selection()
            .restore(&self.inner.document, element);
    }
}

impl Drop for MoveController {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl MoveState {
    fn is_dragging(&self) -> bool {
        self.id.is_some() || self.mouse_active
    }
}

fn page_position(event: &DomEvent) -> Option<(f64, f64)> {
    event.mouse_data().map(|m| (m.page_x, m.page_y))
}

fn touch_position(touch: &Touch) -> (f64, f64) {
    (touch.page_x, touch.page_y)
}

impl MoveInner {
    fn handler(&self, handle: fn(&MoveInner, &DomEvent)) -> EventListenerCallback {
        let this = self.this.clone();
        Rc::new(move |event: &DomEvent| {
            if let Some(inner) = this.upgrade() {
                handle(&inner, event);
            }
        })
    }

    fn add_global(&self, event_type: &str, handle: fn(&MoveInner, &DomEvent)) {
        self.listeners.add(
            EventTargetId::Window,
            event_type,
            self.handler(handle),
            AddEventListenerOptions::default(),
        );
    }

    fn emit(&self, handler: &Option<MoveHandler>, event: MoveEvent) {
        if let Some(handler) = handler {
            handler(&event);
        }
    }

    // ==================== Lifecycle ====================

    fn start(&self, element: NodeId) {
        self.ctx
            .text_selection()
            .disable(&self.document, Some(element));
        let mut state = self.state.borrow_mut();
        state.did_move = false;
        state.element = Some(element);
    }

    fn move_by(&self, pointer_type: PointerType, delta_x: f64, delta_y: f64, modifiers: Modifiers) {
        if delta_x == 0.0 && delta_y == 0.0 {
            return;
        }

        let first = !std::mem::replace(&mut self.state.borrow_mut().did_move, true);
        if first {
            self.emit(
                &self.callbacks.on_move_start,
                MoveEvent::new(MoveEventType::MoveStart, pointer_type, modifiers),
            );
        }
        trace!(delta_x, delta_y, "move");
        self.emit(
            &self.callbacks.on_move,
            MoveEvent::new(MoveEventType::Move, pointer_type, modifiers).with_delta(delta_x, delta_y),
        );
    }

    /// Move to `position`, reporting the delta from the last one.
    fn move_to(&self, pointer_type: PointerType, position: (f64, f64), modifiers: Modifiers) {
        let last = self.state.borrow_mut().last_position.replace(position);
        if let Some((last_x, last_y)) = last {
            self.move_by(pointer_type, position.0 - last_x, position.1 - last_y, modifiers);
        }
    }

    fn end(&self, pointer_type: PointerType, modifiers: Modifiers) {
        let (did_move, element) = {
            let mut state = self.state.borrow_mut();
            state.last_position = None;
            (state.did_move, state.element.take())
        };
        self.ctx.text_selection().restore(&self.document, element);
        if did_move {
            self.emit(
                &self.callbacks.on_move_end,
                MoveEvent::new(MoveEventType::MoveEnd, pointer_type, modifiers),
            );
        }
    }

    fn begin_drag(&self, event: &DomEvent, position: (f64, f64), id: Option<i64>) {
        let Some(element) = event.event().current_target_node() else {
            return;
        };
        self.start(element);
        event.event().stop_propagation();
        event.event().prevent_default();
        let mut state = self.state.borrow_mut();
        state.last_position = Some(position);
        state.id = id;
    }

    // ==================== Pointer Events ====================

    fn on_pointer_down(&self, event: &DomEvent) {
        let Some(data) = event.pointer_data() else {
            return;
        };
        if data.mouse.button != 0 || self.state.borrow().is_dragging() {
            return;
        }

        self.begin_drag(
            event,
            (data.mouse.page_x, data.mouse.page_y),
            Some(i64::from(data.pointer_id)),
        );
        self.add_global("pointermove", Self::on_pointer_move);
        self.add_global("pointerup", Self::on_pointer_up);
        self.add_global("pointercancel", Self::on_pointer_up);
    }

    fn is_active_pointer(&self, event: &DomEvent) -> Option<PointerType> {
        let data = event.pointer_data()?;
        (self.state.borrow().id == Some(i64::from(data.pointer_id)))
            .then(|| PointerType::from(data.pointer_type))
    }

    fn on_pointer_move(&self, event: &DomEvent) {
        if let (Some(pointer_type), Some(position)) =
            (self.is_active_pointer(event), page_position(event))
        {
            self.move_to(pointer_type, position, event.modifiers());
        }
    }

    fn on_pointer_up(&self, event: &DomEvent) {
        if let Some(pointer_type) = self.is_active_pointer(event) {
            self.end(pointer_type, event.modifiers());
            self.state.borrow_mut().id = None;
            self.listeners.remove_all();
        }
    }

    // ==================== Legacy Mouse ====================

    fn on_mouse_down(&self, event: &DomEvent) {
        let Some(data) = event.mouse_data() else {
            return;
        };
        if data.button != 0 || self.state.borrow().is_dragging() {
            return;
        }

        self.begin_drag(event, (data.page_x, data.page_y), None);
        self.state.borrow_mut().mouse_active = true;
        self.add_global("mousemove", Self::on_mouse_move);
        self.add_global("mouseup", Self::on_mouse_up);
    }

    fn on_mouse_move(&self, event: &DomEvent) {
        if let Some(position) = page_position(event) {
            self.move_to(PointerType::Mouse, position, event.modifiers());
        }
    }

    fn on_mouse_up(&self, event: &DomEvent) {
        if event.mouse_data().map(|m| m.button) == Some(0) {
            self.end(PointerType::Mouse, event.modifiers());
            self.state.borrow_mut().mouse_active = false;
            self.listeners.remove_all();
        }
    }

    // ==================== Legacy Touch ====================

    fn on_touch_start(&self, event: &DomEvent) {
        let Some(data) = event.touch_data() else {
            return;
        };
        let Some(touch) = data.changed_touches.first() else {
            return;
        };
        // one finger at a time
        if self.state.borrow().is_dragging() {
            return;
        }

        self.begin_drag(event, touch_position(touch), Some(touch.identifier));
        self.add_global("touchmove", Self::on_touch_move);
        self.add_global("touchend", Self::on_touch_end);
        self.add_global("touchcancel", Self::on_touch_end);
    }

    fn active_touch<'a>(&self, event: &'a DomEvent) -> Option<&'a Touch> {
        let id = self.state.borrow().id?;
        touch_by_identifier(&event.touch_data()?.changed_touches, id)
    }

    fn on_touch_move(&self, event: &DomEvent) {
        if let Some(touch) = self.active_touch(event) {
            self.move_to(PointerType::Touch, touch_position(touch), event.modifiers());
        }
    }

    fn on_touch_end(&self, event: &DomEvent) {
        if self.active_touch(event).is_some() {
            self.end(PointerType::Touch, event.modifiers());
            self.state.borrow_mut().id = None;
            self.listeners.remove_all();
        }
    }

    // ==================== Keyboard ====================

    fn on_key_down(&self, event: &DomEvent) {
        let Some(data) = event.keyboard_data() else {
            return;
        };
        let Some(element) = event.event().current_target_node() else {
            return;
        };
        let (delta_x, delta_y) = match data.key.as_str() {
            "Left" | "ArrowLeft" => (-1.0, 0.0),
            "Right" | "ArrowRight" => (1.0, 0.0),
            "Up" | "ArrowUp" => (0.0, -1.0),
            "Down" | "ArrowDown" => (0.0, 1.0),
            _ => return,
        };

        event.event().prevent_default();
        event.event().stop_propagation();
        self.start(element);
        self.move_by(PointerType::Keyboard, delta_x, delta_y, data.modifiers);
        self.end(PointerType::Keyboard, data.modifiers);
    }
}
