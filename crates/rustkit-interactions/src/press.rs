//! # Press gestures
//!
//! Per-element state machine turning pointer, mouse, touch, keyboard and
//! virtual clicks into one press lifecycle:
//!
//! ```text
//! pressstart -> [pressup] -> pressend -> [press]
//! ```
//!
//! Where `press` fires depends on the device: mouse presses complete at the
//! native `click`, touch and pen at the document `pointerup` over the
//! target, keyboard presses at the `keyup` inside the original target, and
//! virtual clicks run the whole sequence inside the `click` handler.
//!
//! Every native event the controller handles has its propagation stopped
//! unless all press events produced from it called `continue_propagation`.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use rustkit_dom::{
    AddEventListenerOptions, ButtonType, Document, DomEvent, EventListenerCallback,
    EventTargetId, InputType, KeyboardEventData, Modifiers, Node, NodeId, TimerId, Touch,
};
use tracing::{debug, trace, warn};

use crate::config::DisabledFlag;
use crate::context::Interactions;
use crate::events::{PressEvent, PressEventType};
use crate::global_listeners::{Binding, GlobalListeners};
use crate::pointer::{
    is_over_target, is_virtual_click, is_virtual_pointer_event, touch_by_identifier,
    touch_contact_rect, NativeEventType, NativeInput, PointerType,
};
use crate::InteractionError;

/// Consumer callback for press events.
pub type PressHandler = Rc<dyn Fn(&PressEvent)>;

/// Consumer callbacks for a press.
#[derive(Clone, Default)]
pub struct PressCallbacks {
    pub on_press_start: Option<PressHandler>,
    pub on_press_end: Option<PressHandler>,
    pub on_press_up: Option<PressHandler>,
    pub on_press: Option<PressHandler>,
    pub on_press_change: Option<Rc<dyn Fn(bool)>>,
    /// Raw primary-button clicks on the element.
    pub on_click: Option<Rc<dyn Fn(&DomEvent)>>,
}

impl PressCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_press_start(mut self, f: impl Fn(&PressEvent) + 'static) -> Self {
        self.on_press_start = Some(Rc::new(f));
        self
    }

    pub fn on_press_end(mut self, f: impl Fn(&PressEvent) + 'static) -> Self {
        self.on_press_end = Some(Rc::new(f));
        self
    }

    pub fn on_press_up(mut self, f: impl Fn(&PressEvent) + 'static) -> Self {
        self.on_press_up = Some(Rc::new(f));
        self
    }

    pub fn on_press(mut self, f: impl Fn(&PressEvent) + 'static) -> Self {
        self.on_press = Some(Rc::new(f));
        self
    }

    pub fn on_press_change(mut self, f: impl Fn(bool) + 'static) -> Self {
        self.on_press_change = Some(Rc::new(f));
        self
    }

    pub fn on_click(mut self, f: impl Fn(&DomEvent) + 'static) -> Self {
        self.on_click = Some(Rc::new(f));
        self
    }
}

/// Behavior switches for a press.
#[derive(Debug, Clone, Default)]
pub struct PressOptions {
    pub is_disabled: DisabledFlag,
    /// Keep focus where it is when the element is pressed.
    pub prevent_focus_on_press: bool,
    /// Cancel the press when the pointer leaves the element.
    pub should_cancel_on_pointer_exit: bool,
    /// Leave text selection enabled during the press.
    pub allow_text_selection_on_press: bool,
}

impl PressOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_disabled(mut self, flag: DisabledFlag) -> Self {
        self.is_disabled = flag;
        self
    }

    pub fn with_prevent_focus_on_press(mut self, prevent: bool) -> Self {
        self.prevent_focus_on_press = prevent;
        self
    }

    pub fn with_cancel_on_pointer_exit(mut self, cancel: bool) -> Self {
        self.should_cancel_on_pointer_exit = cancel;
        self
    }

    pub fn with_text_selection(mut self, allow: bool) -> Self {
        self.allow_text_selection_on_press = allow;
        self
    }
}

/// The native listeners a press needs on its element, by event type.
pub struct PressHandlers {
    entries: Vec<(NativeEventType, EventListenerCallback)>,
}

impl PressHandlers {
    pub fn get(&self, event_type: NativeEventType) -> Option<&EventListenerCallback> {
        self.entries
            .iter()
            .find(|(t, _)| *t == event_type)
            .map(|(_, h)| h)
    }

    pub fn event_types(&self) -> Vec<NativeEventType> {
        self.entries.iter().map(|(t, _)| *t).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for PressHandlers {
    type Item = (NativeEventType, EventListenerCallback);
    type IntoIter = std::vec::IntoIter<Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[derive(Debug, Default)]
struct PressState {
    is_pressed: bool,
    ignore_emulated_mouse_events: bool,
    ignore_click_after_press: bool,
    did_fire_press_start: bool,
    is_triggering_event: bool,
    active_pointer_id: Option<i64>,
    target: Option<NodeId>,
    is_over_target: bool,
    pointer_type: Option<PointerType>,
    /// Keys pressed while Meta is held (macOS drops their keyup).
    meta_key_events: Option<HashMap<String, KeyboardEventData>>,
    click_timeout: Option<TimerId>,
}

/// What a press event is built from.
struct PressSource {
    target: NodeId,
    client: Option<(f64, f64)>,
    modifiers: Modifiers,
    key: Option<String>,
}

impl PressSource {
    fn from_event(target: NodeId, event: &DomEvent) -> Self {
        let input = NativeInput::classify(event);
        Self {
            target,
            client: input.client_point(),
            modifiers: input.modifiers(),
            key: event.keyboard_data().map(|k| k.key.clone()),
        }
    }

    fn from_touch(target: NodeId, touch: Option<&Touch>, event: &DomEvent) -> Self {
        Self {
            target,
            client: touch.map(|t| (t.client_x, t.client_y)),
            modifiers: event.modifiers(),
            key: None,
        }
    }

    fn bare(target: NodeId) -> Self {
        Self {
            target,
            client: None,
            modifiers: Modifiers::default(),
            key: None,
        }
    }
}

/// How the press events produced from one native event voted on its
/// propagation. Ordered so that joining two votes takes the maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Propagation {
    /// No press event was produced; the native event is left alone.
    Untouched,
    /// The lifecycle step ran without a callback to ask.
    Unasked,
    /// Every delivered press event called `continue_propagation`.
    Continue,
    /// At least one delivered press event did not.
    Stop,
}

impl Propagation {
    fn record(self, event: &PressEvent) -> Self {
        let vote = if event.should_stop_propagation() {
            Propagation::Stop
        } else {
            Propagation::Continue
        };
        self.join(vote)
    }

    fn join(self, other: Self) -> Self {
        self.max(other)
    }

    fn should_stop(self) -> bool {
        matches!(self, Propagation::Unasked | Propagation::Stop)
    }
}

struct PressInner {
    document: Document,
    ctx: Interactions,
    callbacks: PressCallbacks,
    options: PressOptions,
    state: RefCell<PressState>,
    /// Visual pressed state reported to the owner.
    pressed: Cell<bool>,
    listeners: GlobalListeners,
    this: Weak<PressInner>,
}

/// Press gesture controller for one element.
pub struct PressController {
    inner: Rc<PressInner>,
}

impl PressController {
    pub fn new(
        document: &Document,
        ctx: &Interactions,
        callbacks: PressCallbacks,
        options: PressOptions,
    ) -> Self {
        let inner = Rc::new_cyclic(|this| PressInner {
            document: document.clone(),
            ctx: ctx.clone(),
            callbacks,
            options,
            state: RefCell::new(PressState::default()),
            pressed: Cell::new(false),
            listeners: GlobalListeners::new(document),
            this: this.clone(),
        });
        Self { inner }
    }

    /// Listeners to install on the element, for the platform's event family.
    pub fn handlers(&self) -> PressHandlers {
        let inner = &self.inner;
        let mut entries = Vec::new();
        let mut add = |event_type: NativeEventType, handle: fn(&PressInner, &DomEvent)| {
            entries.push((event_type, inner.element_handler(handle)));
        };

        add(NativeEventType::KeyDown, PressInner::on_key_down);
        add(NativeEventType::Click, PressInner::on_click);
        add(NativeEventType::DragStart, PressInner::on_drag_start);

        if inner.ctx.platform().pointer_events {
            add(NativeEventType::PointerDown, PressInner::on_pointer_down);
            add(NativeEventType::MouseDown, PressInner::on_pointer_family_mouse_down);
            add(NativeEventType::PointerUp, PressInner::on_pointer_up);
            add(NativeEventType::PointerEnter, PressInner::on_pointer_enter);
            add(NativeEventType::PointerLeave, PressInner::on_pointer_leave);
        } else {
            add(NativeEventType::MouseDown, PressInner::on_mouse_down);
            add(NativeEventType::MouseEnter, PressInner::on_mouse_enter);
            add(NativeEventType::MouseLeave, PressInner::on_mouse_leave);
            add(NativeEventType::MouseUp, PressInner::on_mouse_up);
            add(NativeEventType::TouchStart, PressInner::on_touch_start);
            add(NativeEventType::TouchMove, PressInner::on_touch_move);
            add(NativeEventType::TouchEnd, PressInner::on_touch_end);
            add(NativeEventType::TouchCancel, PressInner::on_touch_cancel);
        }

        PressHandlers { entries }
    }

    /// Install [`handlers`](Self::handlers) on `node`.
    pub fn bind(&self, node: NodeId) -> Result<Binding, InteractionError> {
        Binding::new(&self.inner.document, node, self.handlers())
    }

    /// Whether the element should render as pressed.
    pub fn is_pressed(&self) -> bool {
        self.inner.pressed.get()
    }

    /// Cancel the press in progress, if any. Safe to call repeatedly.
    pub fn cancel(&self) {
        self.inner.cancel(None);
    }

    /// Number of document/window listeners held by the press in progress.
    pub fn active_listener_count(&self) -> usize {
        self.inner.listeners.len()
    }

    /// Release global listeners, timers and text selection.
    pub fn dispose(&self) {
        self.inner.dispose();
    }
}

impl Drop for PressController {
    fn drop(&mut self) {
        self.inner.dispose();
    }
}

impl fmt::Debug for PressController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PressController")
            .field("state", &*self.inner.state.borrow())
            .field("pressed", &self.inner.pressed.get())
            .finish()
    }
}

impl PressInner {
    fn element_handler(&self, handle: fn(&PressInner, &DomEvent)) -> EventListenerCallback {
        let this = self.this.clone();
        Rc::new(move |event: &DomEvent| {
            if let Some(inner) = this.upgrade() {
                handle(&inner, event);
            }
        })
    }

    fn add_global(
        &self,
        target: EventTargetId,
        event_type: &str,
        options: AddEventListenerOptions,
        handle: impl Fn(&PressInner, &DomEvent) + 'static,
    ) {
        let this = self.this.clone();
        self.listeners.add(
            target,
            event_type,
            Rc::new(move |event: &DomEvent| {
                if let Some(inner) = this.upgrade() {
                    handle(&inner, event);
                }
            }),
            options,
        );
    }

    fn is_disabled(&self) -> bool {
        self.options.is_disabled.get()
    }

    /// The element this listener is attached to, if the event came from
    /// inside it.
    fn event_element(&self, event: &DomEvent) -> Option<NodeId> {
        let base = event.event();
        let current = base.current_target_node()?;
        let target = base.target_node()?;
        self.document.contains(current, target).then_some(current)
    }

    fn should_prevent_default(&self, element: NodeId) -> bool {
        !self
            .document
            .node(element)
            .map(|n| n.has_attribute("draggable"))
            .unwrap_or(false)
    }

    fn focus_target(&self, element: NodeId) {
        if !self.is_disabled() && !self.options.prevent_focus_on_press {
            self.ctx
                .tracker()
                .focus_without_modality_change(&self.document, element);
        }
    }

    fn disable_selection(&self, element: NodeId) {
        if !self.options.allow_text_selection_on_press {
            self.ctx
                .text_selection()
                .disable(&self.document, Some(element));
        }
    }

    fn restore_selection(&self, element: Option<NodeId>) {
        if !self.options.allow_text_selection_on_press {
            self.ctx.text_selection().restore(&self.document, element);
        }
    }

    fn press_event(
        &self,
        event_type: PressEventType,
        pointer_type: PointerType,
        source: &PressSource,
    ) -> PressEvent {
        PressEvent::new(
            event_type,
            pointer_type,
            source.target,
            self.document.bounding_rect(source.target),
            source.client,
            source.modifiers,
            source.key.clone(),
        )
    }

    // ==================== Lifecycle ====================

    fn trigger_press_start(&self, source: &PressSource, pointer_type: PointerType) -> Propagation {
        if self.is_disabled() || self.state.borrow().did_fire_press_start {
            return Propagation::Untouched;
        }

        trace!(%pointer_type, "pressstart");
        let mut propagation = Propagation::Unasked;
        self.state.borrow_mut().is_triggering_event = true;
        if let Some(on_press_start) = &self.callbacks.on_press_start {
            let event = self.press_event(PressEventType::PressStart, pointer_type, source);
            on_press_start(&event);
            propagation = propagation.record(&event);
        }
        if let Some(on_press_change) = &self.callbacks.on_press_change {
            on_press_change(true);
        }

        {
            let mut state = self.state.borrow_mut();
            state.is_triggering_event = false;
            state.did_fire_press_start = true;
        }
        self.pressed.set(true);
        propagation
    }

    fn trigger_press_end(
        &self,
        source: &PressSource,
        pointer_type: PointerType,
        was_pressed: bool,
    ) -> Propagation {
        {
            let mut state = self.state.borrow_mut();
            if !state.did_fire_press_start {
                return Propagation::Untouched;
            }
            state.ignore_click_after_press = true;
            state.did_fire_press_start = false;
            state.is_triggering_event = true;
        }

        trace!(%pointer_type, was_pressed, "pressend");
        let mut propagation = Propagation::Unasked;
        if let Some(on_press_end) = &self.callbacks.on_press_end {
            let event = self.press_event(PressEventType::PressEnd, pointer_type, source);
            on_press_end(&event);
            propagation = propagation.record(&event);
        }
        if let Some(on_press_change) = &self.callbacks.on_press_change {
            on_press_change(false);
        }
        self.pressed.set(false);

        if was_pressed && !self.is_disabled() {
            if let Some(on_press) = &self.callbacks.on_press {
                let event = self.press_event(PressEventType::Press, pointer_type, source);
                on_press(&event);
                propagation = propagation.record(&event);
            }
        }

        self.state.borrow_mut().is_triggering_event = false;
        propagation
    }

    fn trigger_press_up(&self, source: &PressSource, pointer_type: PointerType) -> Propagation {
        if self.is_disabled() {
            return Propagation::Untouched;
        }

        let Some(on_press_up) = &self.callbacks.on_press_up else {
            return Propagation::Unasked;
        };
        self.state.borrow_mut().is_triggering_event = true;
        let event = self.press_event(PressEventType::PressUp, pointer_type, source);
        on_press_up(&event);
        self.state.borrow_mut().is_triggering_event = false;
        Propagation::Unasked.record(&event)
    }

    fn trigger_click(&self, event: &DomEvent) {
        if self.is_disabled() {
            return;
        }
        if let Some(on_click) = &self.callbacks.on_click {
            on_click(event);
        }
    }

    fn cancel(&self, event: Option<&DomEvent>) {
        let (target, pointer_type) = {
            let state = self.state.borrow();
            if !state.is_pressed {
                return;
            }
            (state.target, state.pointer_type)
        };

        debug!(?target, "press cancelled");
        // a no-op unless pressstart fired and was not yet ended
        if let (Some(target), Some(pointer_type)) = (target, pointer_type) {
            let source = match event {
                Some(event) => PressSource::from_event(target, event),
                None => PressSource::bare(target),
            };
            self.trigger_press_end(&source, pointer_type, false);
        }

        self.reset_press();
        self.listeners.remove_all();
        self.restore_selection(target);
    }

    fn cancel_on_pointer_exit(&self, event: &DomEvent) {
        if self.options.should_cancel_on_pointer_exit {
            self.cancel(Some(event));
        }
    }

    fn reset_press(&self) {
        let timeout = {
            let mut state = self.state.borrow_mut();
            state.is_pressed = false;
            state.is_over_target = false;
            state.active_pointer_id = None;
            state.pointer_type = None;
            state.click_timeout.take()
        };
        if let Some(timeout) = timeout {
            self.document.clear_timeout(timeout);
        }
    }

    fn dispose(&self) {
        let target = self.state.borrow().target;
        let timeout = self.state.borrow_mut().click_timeout.take();
        if let Some(timeout) = timeout {
            self.document.clear_timeout(timeout);
        }
        self.listeners.remove_all();
        self.restore_selection(target);
    }

    // ==================== Pointer Events ====================

    fn on_pointer_down(&self, event: &DomEvent) {
        let Some(data) = event.pointer_data() else {
            return;
        };
        if data.mouse.button != 0 {
            return;
        }
        let Some(element) = self.event_element(event) else {
            return;
        };

        if is_virtual_pointer_event(data, &self.ctx.platform()) {
            // screen readers send these before a click; let the click handle it
            self.state.borrow_mut().pointer_type = Some(PointerType::Virtual);
            return;
        }

        if self.should_prevent_default(element) {
            event.event().prevent_default();
        }

        let pointer_type = PointerType::from(data.pointer_type);
        let starts = {
            let mut state = self.state.borrow_mut();
            state.pointer_type = Some(pointer_type);
            if state.is_pressed {
                false
            } else {
                state.is_pressed = true;
                state.is_over_target = true;
                state.active_pointer_id = Some(i64::from(data.pointer_id));
                state.target = Some(element);
                true
            }
        };

        let mut should_stop_propagation = true;
        if starts {
            self.focus_target(element);
            self.disable_selection(element);
            should_stop_propagation = self
                .trigger_press_start(&PressSource::from_event(element, event), pointer_type)
                .should_stop();

            // implicit capture would keep enter/leave from firing
            if let Some(target) = event.event().target_node() {
                self.document.release_pointer_capture(target, data.pointer_id);
            }

            let options = AddEventListenerOptions::default();
            self.add_global(EventTargetId::Document, "pointerup", options, Self::on_global_pointer_up);
            self.add_global(EventTargetId::Document, "pointercancel", options, |inner, event| {
                inner.cancel(Some(event))
            });
        }

        if should_stop_propagation {
            event.event().stop_propagation();
        }
    }

    /// With pointer events available, the compatibility mousedown only
    /// needs its default and propagation suppressed.
    fn on_pointer_family_mouse_down(&self, event: &DomEvent) {
        let Some(data) = event.mouse_data() else {
            return;
        };
        let Some(element) = self.event_element(event) else {
            return;
        };
        if data.button == 0 {
            if self.should_prevent_default(element) {
                event.event().prevent_default();
            }
            event.event().stop_propagation();
        }
    }

    fn on_pointer_up(&self, event: &DomEvent) {
        let Some(data) = event.pointer_data() else {
            return;
        };
        let Some(element) = self.event_element(event) else {
            return;
        };
        let recorded = self.state.borrow().pointer_type;
        // iOS sends zero-sized pointerups, so trust the type seen at pointerdown
        if recorded == Some(PointerType::Virtual) {
            return;
        }

        if data.mouse.button == 0 && is_over_target(event, &self.document.bounding_rect(element)) {
            let pointer_type = recorded.unwrap_or_else(|| PointerType::from(data.pointer_type));
            self.trigger_press_up(&PressSource::from_event(element, event), pointer_type);
        }
    }

    fn on_pointer_enter(&self, event: &DomEvent) {
        let Some(data) = event.pointer_data() else {
            return;
        };
        let entered = {
            let mut state = self.state.borrow_mut();
            match (state.target, state.pointer_type) {
                (Some(target), Some(pointer_type))
                    if state.active_pointer_id == Some(i64::from(data.pointer_id))
                        && !state.is_over_target =>
                {
                    state.is_over_target = true;
                    Some((target, pointer_type))
                }
                _ => None,
            }
        };

        if let Some((target, pointer_type)) = entered {
            self.trigger_press_start(&PressSource::from_event(target, event), pointer_type);
        }
    }

    fn on_pointer_leave(&self, event: &DomEvent) {
        let Some(data) = event.pointer_data() else {
            return;
        };
        let left = {
            let mut state = self.state.borrow_mut();
            match (state.target, state.pointer_type) {
                (Some(target), Some(pointer_type))
                    if state.active_pointer_id == Some(i64::from(data.pointer_id))
                        && state.is_over_target =>
                {
                    state.is_over_target = false;
                    Some((target, pointer_type))
                }
                _ => None,
            }
        };

        if let Some((target, pointer_type)) = left {
            self.trigger_press_end(&PressSource::from_event(target, event), pointer_type, false);
            self.cancel_on_pointer_exit(event);
        }
    }

    fn on_global_pointer_up(&self, event: &DomEvent) {
        let Some(data) = event.pointer_data() else {
            return;
        };
        let (target, pointer_type, was_over) = {
            let state = self.state.borrow();
            if state.active_pointer_id != Some(i64::from(data.pointer_id))
                || !state.is_pressed
                || data.mouse.button != 0
            {
                return;
            }
            match (state.target, state.pointer_type) {
                (Some(target), Some(pointer_type)) => (target, pointer_type, state.is_over_target),
                _ => return,
            }
        };

        let over = is_over_target(event, &self.document.bounding_rect(target));
        if over && pointer_type == PointerType::Mouse {
            // the click that follows completes a mouse press
            self.schedule_click_timeout();
            return;
        }

        let source = PressSource::from_event(target, event);
        if over {
            self.trigger_press_end(&source, pointer_type, true);
        } else if was_over {
            self.trigger_press_end(&source, pointer_type, false);
        }

        self.reset_press();
        self.listeners.remove_all();
        self.restore_selection(Some(target));
    }

    fn schedule_click_timeout(&self) {
        let this = self.this.clone();
        let id = self.document.set_timeout(
            move || {
                if let Some(inner) = this.upgrade() {
                    inner.on_click_timeout();
                }
            },
            self.ctx.config().click_timeout,
        );
        let previous = self.state.borrow_mut().click_timeout.replace(id);
        if let Some(previous) = previous {
            self.document.clear_timeout(previous);
        }
    }

    /// No click arrived after a mouse pointerup over the target.
    fn on_click_timeout(&self) {
        let pending = {
            let mut state = self.state.borrow_mut();
            state.click_timeout = None;
            match (state.is_pressed, state.target, state.pointer_type) {
                (true, Some(target), Some(pointer_type)) => Some((target, pointer_type)),
                _ => None,
            }
        };

        if let Some((target, pointer_type)) = pending {
            debug!("click did not follow pointerup, completing press");
            self.trigger_press_end(&PressSource::bare(target), pointer_type, true);
            self.cancel(None);
        }
    }

    // ==================== Click ====================

    fn on_click(&self, event: &DomEvent) {
        let Some(data) = event.mouse_data() else {
            return;
        };
        let Some(element) = self.event_element(event) else {
            return;
        };
        if data.button != 0 || self.state.borrow().is_triggering_event {
            return;
        }

        if self.is_disabled() {
            event.event().prevent_default();
        }

        let (ignore_click, ignore_emulated, is_pressed, recorded) = {
            let state = self.state.borrow();
            (
                state.ignore_click_after_press,
                state.ignore_emulated_mouse_events,
                state.is_pressed,
                state.pointer_type,
            )
        };

        let mut should_stop_propagation = true;
        let platform = self.ctx.platform();
        if !ignore_click
            && !ignore_emulated
            && !is_pressed
            && (recorded == Some(PointerType::Virtual) || is_virtual_click(event, &platform))
        {
            // VoiceOver on iOS does not move focus itself
            self.focus_target(element);
            let source = PressSource::from_event(element, event);
            let start = self.trigger_press_start(&source, PointerType::Virtual);
            let up = self.trigger_press_up(&source, PointerType::Virtual);
            let end = self.trigger_press_end(&source, PointerType::Virtual, true);
            should_stop_propagation = start.join(up).join(end).should_stop();
        } else if is_pressed && recorded != Some(PointerType::Keyboard) {
            let pointer_type = recorded
                .or_else(|| event.pointer_data().map(|p| PointerType::from(p.pointer_type)))
                .unwrap_or(PointerType::Virtual);
            let was_pressed = !event.event().default_prevented();
            should_stop_propagation = self
                .trigger_press_end(&PressSource::from_event(element, event), pointer_type, was_pressed)
                .should_stop();
            self.state.borrow_mut().is_over_target = false;
            self.cancel(Some(event));
        }

        self.trigger_click(event);

        {
            let mut state = self.state.borrow_mut();
            state.ignore_emulated_mouse_events = false;
            state.ignore_click_after_press = false;
        }
        if should_stop_propagation {
            event.event().stop_propagation();
        }
    }

    fn on_drag_start(&self, event: &DomEvent) {
        if self.event_element(event).is_some() {
            self.cancel(Some(event));
        }
    }

    // ==================== Keyboard ====================

    fn on_key_down(&self, event: &DomEvent) {
        let Some(data) = event.keyboard_data() else {
            return;
        };
        let Some(current) = event.event().current_target_node() else {
            return;
        };
        let element = self.event_element(event);

        if element.is_some() && self.is_valid_keyboard_event(data, current) {
            let target_node = event.event().target_node().and_then(|t| self.document.node(t));
            if target_node
                .map(|n| should_prevent_default_keyboard(&n, &data.key))
                .unwrap_or(true)
            {
                event.event().prevent_default();
            }

            let starts = {
                let mut state = self.state.borrow_mut();
                // repeats may come from a press that began on another element
                if !state.is_pressed && !data.repeat {
                    state.target = Some(current);
                    state.is_pressed = true;
                    state.is_over_target = true;
                    state.pointer_type = Some(PointerType::Keyboard);
                    true
                } else {
                    false
                }
            };

            let mut should_stop_propagation = true;
            if starts {
                should_stop_propagation = self
                    .trigger_press_start(&PressSource::from_event(current, event), PointerType::Keyboard)
                    .should_stop();

                // focus may move before keyup, so listen on the document;
                // capture runs before children can stop the event
                self.add_global(
                    EventTargetId::Document,
                    "keyup",
                    AddEventListenerOptions::capture(),
                    move |inner, event| {
                        let up = inner.on_global_key_up_press_up(event, current);
                        let end = inner.on_global_key_up(event);
                        if up.join(end).should_stop() {
                            event.event().stop_propagation();
                        }
                    },
                );
            }

            if should_stop_propagation {
                event.event().stop_propagation();
            }

            if data.modifiers.meta && self.ctx.platform().is_mac() {
                if let Some(events) = self.state.borrow_mut().meta_key_events.as_mut() {
                    events.insert(data.key.clone(), data.clone());
                }
            }
        } else if data.key == "Meta" {
            self.state.borrow_mut().meta_key_events = Some(HashMap::new());
        }
    }

    fn on_global_key_up_press_up(&self, event: &DomEvent, original_target: NodeId) -> Propagation {
        let Some(data) = event.keyboard_data() else {
            return Propagation::Untouched;
        };
        let inside = event
            .event()
            .target_node()
            .map(|t| self.document.contains(original_target, t))
            .unwrap_or(false);
        let target = self.state.borrow().target;
        match target {
            Some(target)
                if inside && !data.repeat && self.is_valid_keyboard_event(data, original_target) =>
            {
                self.trigger_press_up(&PressSource::from_event(target, event), PointerType::Keyboard)
            }
            _ => Propagation::Untouched,
        }
    }

    fn on_global_key_up(&self, event: &DomEvent) -> Propagation {
        let Some(data) = event.keyboard_data() else {
            return Propagation::Untouched;
        };
        let (is_pressed, target) = {
            let state = self.state.borrow();
            (state.is_pressed, state.target)
        };

        match target {
            Some(target) if is_pressed && self.is_valid_keyboard_event(data, target) => {
                let event_target = event.event().target_node();
                if event_target
                    .and_then(|t| self.document.node(t))
                    .map(|n| should_prevent_default_keyboard(&n, &data.key))
                    .unwrap_or(true)
                {
                    event.event().prevent_default();
                }

                let inside = event_target
                    .map(|t| self.document.contains(target, t))
                    .unwrap_or(false);
                let propagation = self.trigger_press_end(
                    &PressSource::from_event(target, event),
                    PointerType::Keyboard,
                    inside,
                );
                self.listeners.remove_all();

                // keydown's preventDefault suppressed the native navigation
                let is_link = self
                    .document
                    .node(target)
                    .map(|n| n.is_anchor_link())
                    .unwrap_or(false);
                if data.key == "Enter" && is_link && inside && event.event().claim_link_activation()
                {
                    if let Err(err) = self.document.activate_link(target, data.modifiers) {
                        warn!(error = %err, "link activation failed");
                    }
                }

                let mut state = self.state.borrow_mut();
                state.is_pressed = false;
                state.is_over_target = false;
                if let Some(events) = state.meta_key_events.as_mut() {
                    events.remove(&data.key);
                }
                propagation
            }
            _ if data.key == "Meta" => {
                let pending = {
                    let mut state = self.state.borrow_mut();
                    match state.meta_key_events.take() {
                        Some(events) if !events.is_empty() => Some(events),
                        other => {
                            state.meta_key_events = other;
                            None
                        }
                    }
                };
                if let (Some(events), Some(target)) = (pending, target) {
                    for data in events.into_values() {
                        self.document
                            .dispatch(target, &DomEvent::synthetic_keyboard("keyup", data));
                    }
                }
                Propagation::Untouched
            }
            _ => Propagation::Untouched,
        }
    }

    fn is_valid_keyboard_event(&self, data: &KeyboardEventData, element: NodeId) -> bool {
        self.document
            .node(element)
            .map(|node| is_valid_keyboard_event(data, &node))
            .unwrap_or(false)
    }

    // ==================== Legacy Mouse ====================

    fn on_mouse_down(&self, event: &DomEvent) {
        let Some(data) = event.mouse_data() else {
            return;
        };
        if data.button != 0 {
            return;
        }
        let Some(element) = self.event_element(event) else {
            return;
        };

        if self.should_prevent_default(element) {
            event.event().prevent_default();
        }

        if self.state.borrow().ignore_emulated_mouse_events {
            event.event().stop_propagation();
            return;
        }

        let pointer_type = if is_virtual_click(event, &self.ctx.platform()) {
            PointerType::Virtual
        } else {
            PointerType::Mouse
        };
        {
            let mut state = self.state.borrow_mut();
            state.is_pressed = true;
            state.is_over_target = true;
            state.target = Some(element);
            state.pointer_type = Some(pointer_type);
        }

        self.focus_target(element);
        self.disable_selection(element);
        if self
            .trigger_press_start(&PressSource::from_event(element, event), pointer_type)
            .should_stop()
        {
            event.event().stop_propagation();
        }

        self.add_global(
            EventTargetId::Document,
            "mouseup",
            AddEventListenerOptions::default(),
            Self::on_global_mouse_up,
        );
    }

    fn on_mouse_enter(&self, event: &DomEvent) {
        if self.event_element(event).is_none() {
            return;
        }
        let entered = {
            let mut state = self.state.borrow_mut();
            match (state.target, state.pointer_type) {
                (Some(target), Some(pointer_type))
                    if state.is_pressed && !state.ignore_emulated_mouse_events =>
                {
                    state.is_over_target = true;
                    Some((target, pointer_type))
                }
                _ => None,
            }
        };

        let mut should_stop_propagation = true;
        if let Some((target, pointer_type)) = entered {
            should_stop_propagation = self
                .trigger_press_start(&PressSource::from_event(target, event), pointer_type)
                .should_stop();
        }
        if should_stop_propagation {
            event.event().stop_propagation();
        }
    }

    fn on_mouse_leave(&self, event: &DomEvent) {
        if self.event_element(event).is_none() {
            return;
        }
        let left = {
            let mut state = self.state.borrow_mut();
            match (state.target, state.pointer_type) {
                (Some(target), Some(pointer_type))
                    if state.is_pressed && !state.ignore_emulated_mouse_events =>
                {
                    state.is_over_target = false;
                    Some((target, pointer_type))
                }
                _ => None,
            }
        };

        let mut should_stop_propagation = true;
        if let Some((target, pointer_type)) = left {
            should_stop_propagation = self
                .trigger_press_end(&PressSource::from_event(target, event), pointer_type, false)
                .should_stop();
            self.cancel_on_pointer_exit(event);
        }
        if should_stop_propagation {
            event.event().stop_propagation();
        }
    }

    fn on_mouse_up(&self, event: &DomEvent) {
        let Some(data) = event.mouse_data() else {
            return;
        };
        let Some(element) = self.event_element(event) else {
            return;
        };
        let (ignore_emulated, recorded) = {
            let state = self.state.borrow();
            (state.ignore_emulated_mouse_events, state.pointer_type)
        };
        if !ignore_emulated && data.button == 0 {
            self.trigger_press_up(
                &PressSource::from_event(element, event),
                recorded.unwrap_or(PointerType::Mouse),
            );
        }
    }

    fn on_global_mouse_up(&self, event: &DomEvent) {
        let Some(data) = event.mouse_data() else {
            return;
        };
        if data.button != 0 {
            return;
        }

        let (ignore_emulated, target, pointer_type, was_over) = {
            let mut state = self.state.borrow_mut();
            state.is_pressed = false;
            let snapshot = (
                state.ignore_emulated_mouse_events,
                state.target,
                state.pointer_type,
                state.is_over_target,
            );
            state.ignore_emulated_mouse_events = false;
            snapshot
        };
        self.listeners.remove_all();
        self.restore_selection(target);

        if ignore_emulated {
            return;
        }

        if let (Some(target), Some(pointer_type)) = (target, pointer_type) {
            let source = PressSource::from_event(target, event);
            if is_over_target(event, &self.document.bounding_rect(target)) {
                self.trigger_press_end(&source, pointer_type, true);
            } else if was_over {
                self.trigger_press_end(&source, pointer_type, false);
            }
        }
        self.state.borrow_mut().is_over_target = false;
    }

    // ==================== Legacy Touch ====================

    fn on_touch_start(&self, event: &DomEvent) {
        let Some(data) = event.touch_data() else {
            return;
        };
        let Some(element) = self.event_element(event) else {
            return;
        };
        let Some(touch) = data.target_touches.first() else {
            return;
        };

        {
            let mut state = self.state.borrow_mut();
            state.active_pointer_id = Some(touch.identifier);
            state.ignore_emulated_mouse_events = true;
            state.is_over_target = true;
            state.is_pressed = true;
            state.target = Some(element);
            state.pointer_type = Some(PointerType::Touch);
        }

        self.focus_target(element);
        self.disable_selection(element);
        let source = PressSource::from_touch(element, Some(touch), event);
        if self.trigger_press_start(&source, PointerType::Touch).should_stop() {
            event.event().stop_propagation();
        }

        self.add_global(
            EventTargetId::Window,
            "scroll",
            AddEventListenerOptions::capture(),
            Self::on_scroll,
        );
    }

    fn active_touch<'a>(&self, event: &'a DomEvent) -> Option<&'a Touch> {
        let id = self.state.borrow().active_pointer_id?;
        touch_by_identifier(&event.touch_data()?.changed_touches, id)
    }

    fn touch_is_over(&self, touch: Option<&Touch>, element: NodeId) -> bool {
        touch
            .map(|t| {
                self.document
                    .bounding_rect(element)
                    .intersects(&touch_contact_rect(t))
            })
            .unwrap_or(false)
    }

    fn on_touch_move(&self, event: &DomEvent) {
        let Some(element) = self.event_element(event) else {
            return;
        };
        let (is_pressed, target, pointer_type, was_over) = {
            let state = self.state.borrow();
            (state.is_pressed, state.target, state.pointer_type, state.is_over_target)
        };
        if !is_pressed {
            event.event().stop_propagation();
            return;
        }
        let (Some(target), Some(pointer_type)) = (target, pointer_type) else {
            return;
        };

        let touch = self.active_touch(event);
        let source = PressSource::from_touch(target, touch, event);
        let mut should_stop_propagation = true;
        if self.touch_is_over(touch, element) {
            if !was_over {
                self.state.borrow_mut().is_over_target = true;
                should_stop_propagation =
                    self.trigger_press_start(&source, pointer_type).should_stop();
            }
        } else if was_over {
            self.state.borrow_mut().is_over_target = false;
            should_stop_propagation = self
                .trigger_press_end(&source, pointer_type, false)
                .should_stop();
            self.cancel_on_pointer_exit(event);
        }

        if should_stop_propagation {
            event.event().stop_propagation();
        }
    }

    fn on_touch_end(&self, event: &DomEvent) {
        let Some(element) = self.event_element(event) else {
            return;
        };
        let (is_pressed, target, pointer_type, was_over) = {
            let state = self.state.borrow();
            (state.is_pressed, state.target, state.pointer_type, state.is_over_target)
        };
        if !is_pressed {
            event.event().stop_propagation();
            return;
        }

        let mut should_stop_propagation = true;
        if let (Some(target), Some(pointer_type)) = (target, pointer_type) {
            let touch = self.active_touch(event);
            let source = PressSource::from_touch(target, touch, event);
            if self.touch_is_over(touch, element) {
                let up = self.trigger_press_up(&source, pointer_type);
                let end = self.trigger_press_end(&source, pointer_type, true);
                should_stop_propagation = up.join(end).should_stop();
            } else if was_over {
                should_stop_propagation = self
                    .trigger_press_end(&source, pointer_type, false)
                    .should_stop();
            }
        }
        if should_stop_propagation {
            event.event().stop_propagation();
        }

        {
            let mut state = self.state.borrow_mut();
            state.is_pressed = false;
            state.active_pointer_id = None;
            state.is_over_target = false;
            state.ignore_emulated_mouse_events = true;
        }
        self.restore_selection(target);
        self.listeners.remove_all();
    }

    fn on_touch_cancel(&self, event: &DomEvent) {
        if self.event_element(event).is_none() {
            return;
        }
        event.event().stop_propagation();
        self.cancel(Some(event));
    }

    fn on_scroll(&self, event: &DomEvent) {
        let (is_pressed, target) = {
            let state = self.state.borrow();
            (state.is_pressed, state.target)
        };
        let Some(target) = target else {
            return;
        };
        let scrolled_ancestor = match event.event().target() {
            Some(EventTargetId::Node(node)) => self.document.contains(node, target),
            Some(_) => true,
            None => false,
        };
        if is_pressed && scrolled_ancestor {
            self.cancel(None);
        }
    }
}

/// Only Space toggles checkboxes and radios; other non-text inputs take
/// both keys.
fn is_valid_input_key(input: InputType, key: &str) -> bool {
    if input.is_checkable() {
        key == " "
    } else {
        input.is_non_text()
    }
}

/// Enter or Space on an element that does not consume the key as text.
/// Links only respond to Enter.
pub(crate) fn is_valid_keyboard_event(data: &KeyboardEventData, element: &Node) -> bool {
    let is_activation_key =
        matches!(data.key.as_str(), "Enter" | " " | "Spacebar") || data.code == "Space";
    if !is_activation_key {
        return false;
    }

    if let Some(input) = element.input_type() {
        if !is_valid_input_key(input, &data.key) {
            return false;
        }
    }
    if element.is_textarea() || element.is_content_editable() {
        return false;
    }

    let role = element.role();
    let is_link = role.as_deref() == Some("link") || (role.is_none() && element.is_anchor_link());
    !(is_link && data.key != "Enter")
}

/// Keep native activation for inputs, submit/reset buttons and links.
fn should_prevent_default_keyboard(target: &Node, key: &str) -> bool {
    if let Some(input) = target.input_type() {
        return !is_valid_input_key(input, key);
    }
    if let Some(button) = target.button_type() {
        return button == ButtonType::Button;
    }
    !target.is_anchor_link()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{InteractionConfig, Platform};

    const PAGE: &str = r#"<html><body>
        <div id="div" role="button">div</div>
        <button id="submit">submit</button>
        <button id="plain" type="button">plain</button>
        <input id="check" type="checkbox">
        <input id="text" type="text">
        <textarea id="area"></textarea>
        <a id="link" href="/x">link</a>
        <span id="fake-link" role="link">fake</span>
    </body></html>"#;

    fn node(doc: &Document, id: &str) -> Rc<Node> {
        doc.node(doc.get_element_by_id(id).unwrap()).unwrap()
    }

    #[test]
    fn test_valid_keyboard_event() {
        let doc = Document::parse_html(PAGE).unwrap();
        let enter = KeyboardEventData::key("Enter");
        let space = KeyboardEventData::key(" ");
        let legacy_space = KeyboardEventData::key("Spacebar");
        let a = KeyboardEventData::key("a");

        assert!(is_valid_keyboard_event(&enter, &node(&doc, "div")));
        assert!(is_valid_keyboard_event(&legacy_space, &node(&doc, "div")));
        assert!(!is_valid_keyboard_event(&a, &node(&doc, "div")));

        assert!(is_valid_keyboard_event(&space, &node(&doc, "check")));
        assert!(!is_valid_keyboard_event(&enter, &node(&doc, "check")));
        assert!(!is_valid_keyboard_event(&enter, &node(&doc, "text")));
        assert!(!is_valid_keyboard_event(&space, &node(&doc, "area")));

        assert!(is_valid_keyboard_event(&enter, &node(&doc, "link")));
        assert!(!is_valid_keyboard_event(&space, &node(&doc, "link")));
        assert!(!is_valid_keyboard_event(&space, &node(&doc, "fake-link")));
    }

    #[test]
    fn test_prevent_default_keyboard() {
        let doc = Document::parse_html(PAGE).unwrap();
        assert!(should_prevent_default_keyboard(&node(&doc, "div"), "Enter"));
        assert!(!should_prevent_default_keyboard(&node(&doc, "submit"), "Enter"));
        assert!(should_prevent_default_keyboard(&node(&doc, "plain"), " "));
        assert!(!should_prevent_default_keyboard(&node(&doc, "check"), " "));
        assert!(should_prevent_default_keyboard(&node(&doc, "check"), "Enter"));
        assert!(!should_prevent_default_keyboard(&node(&doc, "link"), "Enter"));
    }

    #[test]
    fn test_handler_sets_follow_platform() {
        let doc = Document::parse_html(PAGE).unwrap();
        let pointer = Interactions::default();
        let controller = PressController::new(&doc, &pointer, PressCallbacks::new(), PressOptions::new());
        let types = controller.handlers().event_types();
        assert!(types.contains(&NativeEventType::PointerDown));
        assert!(!types.contains(&NativeEventType::TouchStart));

        let legacy = Interactions::new(
            InteractionConfig::new().with_platform(Platform::default().with_pointer_events(false)),
        )
        .unwrap();
        let controller = PressController::new(&doc, &legacy, PressCallbacks::new(), PressOptions::new());
        let handlers = controller.handlers();
        assert!(handlers.get(NativeEventType::TouchStart).is_some());
        assert!(handlers.get(NativeEventType::PointerDown).is_none());
        assert_eq!(handlers.len(), 11);
    }

    #[test]
    fn test_cancel_without_press_is_noop() {
        let doc = Document::parse_html(PAGE).unwrap();
        let ctx = Interactions::default();
        let ended = Rc::new(Cell::new(0));
        let counter = ended.clone();
        let controller = PressController::new(
            &doc,
            &ctx,
            PressCallbacks::new().on_press_end(move |_| counter.set(counter.get() + 1)),
            PressOptions::new(),
        );
        controller.cancel();
        controller.cancel();
        assert_eq!(ended.get(), 0);
        assert!(!controller.is_pressed());
    }
}
