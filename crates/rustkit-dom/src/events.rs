//! # DOM Events
//!
//! DOM event types and dispatch mechanism implementing the DOM Events spec.
//! Supports capture and bubble phases, stopPropagation, preventDefault, and
//! listener removal while an event is in flight.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::trace;

use crate::NodeId;

/// Unique identifier for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventId(u64);

impl EventId {
    /// Create a new unique EventId.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

/// Event phases as per the DOM spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EventPhase {
    /// No event is being processed.
    None = 0,
    /// Event is propagating through target's ancestors (capture).
    Capturing = 1,
    /// Event has arrived at the event target.
    AtTarget = 2,
    /// Event is propagating back up through ancestors (bubble).
    Bubbling = 3,
}

/// Anything listeners can be attached to: the window, the document, or a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTargetId {
    Window,
    Document,
    Node(NodeId),
}

impl EventTargetId {
    /// The node behind this target, if it is one.
    pub fn node(&self) -> Option<NodeId> {
        match self {
            EventTargetId::Node(id) => Some(*id),
            _ => None,
        }
    }
}

impl From<NodeId> for EventTargetId {
    fn from(id: NodeId) -> Self {
        EventTargetId::Node(id)
    }
}

/// Returns `(bubbles, cancelable)` for the event types the engine produces.
pub fn event_flags(event_type: &str) -> (bool, bool) {
    match event_type {
        "pointerenter" | "pointerleave" | "mouseenter" | "mouseleave" => (false, false),
        "focus" | "blur" => (false, false),
        "focusin" | "focusout" => (true, false),
        "scroll" | "beforeunload" | "load" => (false, false),
        "pointercancel" | "touchcancel" => (true, false),
        "pointermove" | "pointerup" | "pointerdown" => (true, true),
        _ => (true, true),
    }
}

/// Common event interface for all DOM events.
#[derive(Debug, Clone)]
pub struct Event {
    /// Unique ID for this event.
    pub id: EventId,
    /// Event type (e.g., "click", "keydown").
    pub event_type: String,
    /// Whether the event bubbles.
    pub bubbles: bool,
    /// Whether the event is cancelable.
    pub cancelable: bool,
    /// Whether the event is trusted (dispatched by the browser).
    pub is_trusted: bool,
    /// Current phase.
    phase: Cell<EventPhase>,
    /// Where the event was dispatched.
    target: Cell<Option<EventTargetId>>,
    /// The target currently running listeners.
    current_target: Cell<Option<EventTargetId>>,
    /// Propagation path, target first.
    path: RefCell<Vec<EventTargetId>>,
    /// Whether stopPropagation was called.
    propagation_stopped: Cell<bool>,
    /// Whether stopImmediatePropagation was called.
    immediate_propagation_stopped: Cell<bool>,
    /// Whether preventDefault was called.
    default_prevented: Cell<bool>,
    /// Whether some handler already opened the link this event activates.
    link_activated: Cell<bool>,
}

impl Event {
    /// Create a new untrusted event.
    pub fn new(event_type: &str, bubbles: bool, cancelable: bool) -> Self {
        Self {
            id: EventId::new(),
            event_type: event_type.to_string(),
            bubbles,
            cancelable,
            is_trusted: false,
            phase: Cell::new(EventPhase::None),
            target: Cell::new(None),
            current_target: Cell::new(None),
            path: RefCell::new(Vec::new()),
            propagation_stopped: Cell::new(false),
            immediate_propagation_stopped: Cell::new(false),
            default_prevented: Cell::new(false),
            link_activated: Cell::new(false),
        }
    }

    /// Create a trusted event (from the browser).
    pub fn new_trusted(event_type: &str, bubbles: bool, cancelable: bool) -> Self {
        let mut event = Self::new(event_type, bubbles, cancelable);
        event.is_trusted = true;
        event
    }

    /// Get the current phase.
    pub fn phase(&self) -> EventPhase {
        self.phase.get()
    }

    /// Get the target.
    pub fn target(&self) -> Option<EventTargetId> {
        self.target.get()
    }

    /// Get the target node, if the event was dispatched at a node.
    pub fn target_node(&self) -> Option<NodeId> {
        self.target.get().and_then(|t| t.node())
    }

    /// Get the current target.
    pub fn current_target(&self) -> Option<EventTargetId> {
        self.current_target.get()
    }

    /// Get the current target node, if listeners on a node are running.
    pub fn current_target_node(&self) -> Option<NodeId> {
        self.current_target.get().and_then(|t| t.node())
    }

    /// The propagation path, target first, window last.
    pub fn composed_path(&self) -> Vec<EventTargetId> {
        self.path.borrow().clone()
    }

    /// Stop propagation of the event.
    pub fn stop_propagation(&self) {
        self.propagation_stopped.set(true);
    }

    /// Stop immediate propagation of the event.
    pub fn stop_immediate_propagation(&self) {
        self.propagation_stopped.set(true);
        self.immediate_propagation_stopped.set(true);
    }

    /// Prevent the default action.
    pub fn prevent_default(&self) {
        if self.cancelable {
            self.default_prevented.set(true);
        }
    }

    /// Check if propagation is stopped.
    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped.get()
    }

    /// Check if immediate propagation is stopped.
    pub fn immediate_propagation_stopped(&self) -> bool {
        self.immediate_propagation_stopped.get()
    }

    /// Check if the default action was prevented.
    pub fn default_prevented(&self) -> bool {
        self.default_prevented.get()
    }

    /// Claim the link activation for this event. Returns false if another
    /// handler already claimed it.
    pub fn claim_link_activation(&self) -> bool {
        !self.link_activated.replace(true)
    }

    pub(crate) fn set_phase(&self, phase: EventPhase) {
        self.phase.set(phase);
    }

    pub(crate) fn set_target(&self, target: EventTargetId) {
        self.target.set(Some(target));
    }

    pub(crate) fn set_current_target(&self, target: Option<EventTargetId>) {
        self.current_target.set(target);
    }

    pub(crate) fn set_path(&self, path: Vec<EventTargetId>) {
        *self.path.borrow_mut() = path;
    }
}

/// Keyboard modifier keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    /// Windows/Command key.
    pub meta: bool,
}

impl Modifiers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn with_alt(mut self) -> Self {
        self.alt = true;
        self
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn with_meta(mut self) -> Self {
        self.meta = true;
        self
    }

    /// Check if any modifier is pressed.
    pub fn any(&self) -> bool {
        self.ctrl || self.alt || self.shift || self.meta
    }
}

/// Mouse event data.
#[derive(Debug, Clone, Default)]
pub struct MouseEventData {
    /// X coordinate relative to the viewport.
    pub client_x: f64,
    /// Y coordinate relative to the viewport.
    pub client_y: f64,
    /// X coordinate relative to the page.
    pub page_x: f64,
    /// Y coordinate relative to the page.
    pub page_y: f64,
    /// Which mouse button triggered the event.
    pub button: i16,
    /// Currently pressed buttons bitmask.
    pub buttons: u16,
    /// Click count; zero for clicks synthesized by assistive technology.
    pub detail: u32,
    /// Modifier keys held during the event.
    pub modifiers: Modifiers,
    /// Related target (for enter/leave events).
    pub related_target: Option<NodeId>,
}

impl MouseEventData {
    /// Primary-button data at a viewport position (page == client, detail 1).
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            client_x: x,
            client_y: y,
            page_x: x,
            page_y: y,
            buttons: 1,
            detail: 1,
            ..Default::default()
        }
    }

    pub fn with_button(mut self, button: i16) -> Self {
        self.button = button;
        self
    }

    pub fn with_buttons(mut self, buttons: u16) -> Self {
        self.buttons = buttons;
        self
    }

    pub fn with_detail(mut self, detail: u32) -> Self {
        self.detail = detail;
        self
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Set a page position that differs from the viewport position (scrolled page).
    pub fn with_page(mut self, page_x: f64, page_y: f64) -> Self {
        self.page_x = page_x;
        self.page_y = page_y;
        self
    }
}

/// Pointer device type as reported by `PointerEvent.pointerType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerType {
    #[default]
    Mouse,
    Pen,
    Touch,
    Unknown,
}

impl std::fmt::Display for PointerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PointerType::Mouse => write!(f, "mouse"),
            PointerType::Pen => write!(f, "pen"),
            PointerType::Touch => write!(f, "touch"),
            PointerType::Unknown => write!(f, ""),
        }
    }
}

/// Pointer event data (modern unified input API).
#[derive(Debug, Clone)]
pub struct PointerEventData {
    /// The mouse-compatible part of the event.
    pub mouse: MouseEventData,
    /// Unique pointer identifier.
    pub pointer_id: i32,
    /// Width of the contact geometry.
    pub width: f64,
    /// Height of the contact geometry.
    pub height: f64,
    /// Normalized pressure (0.0 - 1.0).
    pub pressure: f32,
    /// Pointer type.
    pub pointer_type: PointerType,
    /// Whether this is the primary pointer.
    pub is_primary: bool,
}

impl PointerEventData {
    /// A mouse pointer (id 1) at a viewport position.
    pub fn mouse(x: f64, y: f64) -> Self {
        Self {
            mouse: MouseEventData::at(x, y).with_detail(0),
            pointer_id: 1,
            width: 1.0,
            height: 1.0,
            pressure: 0.5,
            pointer_type: PointerType::Mouse,
            is_primary: true,
        }
    }

    /// A touch contact at a viewport position.
    pub fn touch(pointer_id: i32, x: f64, y: f64) -> Self {
        Self {
            mouse: MouseEventData::at(x, y).with_detail(0),
            pointer_id,
            width: 20.0,
            height: 20.0,
            pressure: 0.5,
            pointer_type: PointerType::Touch,
            is_primary: true,
        }
    }

    /// A pen contact at a viewport position.
    pub fn pen(pointer_id: i32, x: f64, y: f64) -> Self {
        Self {
            pointer_type: PointerType::Pen,
            width: 1.0,
            height: 1.0,
            ..Self::touch(pointer_id, x, y)
        }
    }

    /// Screen readers on some platforms report zero-sized pointers.
    pub fn zero_sized(mut self) -> Self {
        self.width = 0.0;
        self.height = 0.0;
        self
    }

    pub fn with_button(mut self, button: i16) -> Self {
        self.mouse.button = button;
        self
    }

    pub fn with_pressure(mut self, pressure: f32) -> Self {
        self.pressure = pressure;
        self
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.mouse.modifiers = modifiers;
        self
    }

    pub fn with_page(mut self, page_x: f64, page_y: f64) -> Self {
        self.mouse.page_x = page_x;
        self.mouse.page_y = page_y;
        self
    }
}

/// A single touch point.
#[derive(Debug, Clone, Default)]
pub struct Touch {
    /// Unique identifier for the touch.
    pub identifier: i64,
    /// Target element.
    pub target: Option<NodeId>,
    /// X coordinate relative to viewport.
    pub client_x: f64,
    /// Y coordinate relative to viewport.
    pub client_y: f64,
    /// X coordinate relative to page.
    pub page_x: f64,
    /// Y coordinate relative to page.
    pub page_y: f64,
    /// Radius of the touch area (X).
    pub radius_x: f64,
    /// Radius of the touch area (Y).
    pub radius_y: f64,
    /// Force of the touch (0.0 - 1.0).
    pub force: f32,
}

impl Touch {
    /// A touch point at a viewport position with a small contact radius.
    pub fn at(identifier: i64, x: f64, y: f64) -> Self {
        Self {
            identifier,
            client_x: x,
            client_y: y,
            page_x: x,
            page_y: y,
            radius_x: 2.0,
            radius_y: 2.0,
            force: 0.5,
            ..Default::default()
        }
    }
}

/// Touch event data with list of active touches.
#[derive(Debug, Clone, Default)]
pub struct TouchEventData {
    /// List of all touches currently on the surface.
    pub touches: Vec<Touch>,
    /// Touches that have changed since last event.
    pub changed_touches: Vec<Touch>,
    /// Touches that started on the target element.
    pub target_touches: Vec<Touch>,
    /// Modifier keys.
    pub modifiers: Modifiers,
}

impl TouchEventData {
    /// An event whose only changed touch is `touch`, also listed as active
    /// and target touch.
    pub fn single(touch: Touch) -> Self {
        Self {
            touches: vec![touch.clone()],
            changed_touches: vec![touch.clone()],
            target_touches: vec![touch],
            modifiers: Modifiers::default(),
        }
    }

    /// An event for a touch that has left the surface.
    pub fn ended(touch: Touch) -> Self {
        Self {
            touches: Vec::new(),
            changed_touches: vec![touch],
            target_touches: Vec::new(),
            modifiers: Modifiers::default(),
        }
    }
}

/// Keyboard event data.
#[derive(Debug, Clone, Default)]
pub struct KeyboardEventData {
    /// The key value.
    pub key: String,
    /// The key code.
    pub code: String,
    /// Whether this is a repeat event.
    pub repeat: bool,
    /// Modifier keys held during the event.
    pub modifiers: Modifiers,
    /// The location of the key.
    pub location: u32,
}

impl KeyboardEventData {
    /// Data for a key value, deriving `code` for common keys.
    pub fn key(key: &str) -> Self {
        let code = match key {
            " " => "Space".to_string(),
            "Enter" | "Escape" | "Tab" | "Backspace" | "ArrowUp" | "ArrowDown" | "ArrowLeft"
            | "ArrowRight" => key.to_string(),
            "Shift" => "ShiftLeft".to_string(),
            "Control" => "ControlLeft".to_string(),
            "Alt" => "AltLeft".to_string(),
            "Meta" => "MetaLeft".to_string(),
            k if k.len() == 1 && k.chars().all(|c| c.is_ascii_alphabetic()) => {
                format!("Key{}", k.to_ascii_uppercase())
            }
            k if k.len() == 1 && k.chars().all(|c| c.is_ascii_digit()) => format!("Digit{k}"),
            _ => String::new(),
        };
        Self {
            key: key.to_string(),
            code,
            ..Default::default()
        }
    }

    pub fn with_repeat(mut self, repeat: bool) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

/// Focus event data.
#[derive(Debug, Clone, Default)]
pub struct FocusEventData {
    /// The related target (element losing/gaining focus).
    pub related_target: Option<NodeId>,
}

/// DOM event with type-specific data.
#[derive(Debug, Clone)]
pub enum DomEvent {
    /// Generic event.
    Generic(Event),
    /// Mouse event (also click, dragstart, contextmenu).
    Mouse(Event, MouseEventData),
    /// Pointer event.
    Pointer(Event, PointerEventData),
    /// Touch event.
    Touch(Event, TouchEventData),
    /// Keyboard event.
    Keyboard(Event, KeyboardEventData),
    /// Focus event.
    Focus(Event, FocusEventData),
}

impl DomEvent {
    /// Get the base event.
    pub fn event(&self) -> &Event {
        match self {
            DomEvent::Generic(e) => e,
            DomEvent::Mouse(e, _) => e,
            DomEvent::Pointer(e, _) => e,
            DomEvent::Touch(e, _) => e,
            DomEvent::Keyboard(e, _) => e,
            DomEvent::Focus(e, _) => e,
        }
    }

    /// The event type string.
    pub fn event_type(&self) -> &str {
        &self.event().event_type
    }

    /// Mouse-compatible data, including the mouse part of pointer events.
    pub fn mouse_data(&self) -> Option<&MouseEventData> {
        match self {
            DomEvent::Mouse(_, data) => Some(data),
            DomEvent::Pointer(_, data) => Some(&data.mouse),
            _ => None,
        }
    }

    pub fn pointer_data(&self) -> Option<&PointerEventData> {
        match self {
            DomEvent::Pointer(_, data) => Some(data),
            _ => None,
        }
    }

    pub fn touch_data(&self) -> Option<&TouchEventData> {
        match self {
            DomEvent::Touch(_, data) => Some(data),
            _ => None,
        }
    }

    pub fn keyboard_data(&self) -> Option<&KeyboardEventData> {
        match self {
            DomEvent::Keyboard(_, data) => Some(data),
            _ => None,
        }
    }

    /// Modifier keys, or none for events that carry no modifier state.
    pub fn modifiers(&self) -> Modifiers {
        match self {
            DomEvent::Mouse(_, data) => data.modifiers,
            DomEvent::Pointer(_, data) => data.mouse.modifiers,
            DomEvent::Touch(_, data) => data.modifiers,
            DomEvent::Keyboard(_, data) => data.modifiers,
            DomEvent::Generic(_) | DomEvent::Focus(..) => Modifiers::default(),
        }
    }

    /// Create a trusted generic event.
    pub fn generic(event_type: &str) -> Self {
        let (bubbles, cancelable) = event_flags(event_type);
        DomEvent::Generic(Event::new_trusted(event_type, bubbles, cancelable))
    }

    /// Create a trusted mouse event.
    pub fn mouse(event_type: &str, data: MouseEventData) -> Self {
        let (bubbles, cancelable) = event_flags(event_type);
        DomEvent::Mouse(Event::new_trusted(event_type, bubbles, cancelable), data)
    }

    /// Create a trusted pointer event.
    pub fn pointer(event_type: &str, data: PointerEventData) -> Self {
        let (bubbles, cancelable) = event_flags(event_type);
        DomEvent::Pointer(Event::new_trusted(event_type, bubbles, cancelable), data)
    }

    /// Create an untrusted pointer event, as dispatched by script.
    pub fn synthetic_pointer(event_type: &str, data: PointerEventData) -> Self {
        let (bubbles, cancelable) = event_flags(event_type);
        DomEvent::Pointer(Event::new(event_type, bubbles, cancelable), data)
    }

    /// Create a trusted touch event.
    pub fn touch(event_type: &str, data: TouchEventData) -> Self {
        let (bubbles, cancelable) = event_flags(event_type);
        DomEvent::Touch(Event::new_trusted(event_type, bubbles, cancelable), data)
    }

    /// Create a trusted keyboard event.
    pub fn keyboard(event_type: &str, data: KeyboardEventData) -> Self {
        DomEvent::Keyboard(Event::new_trusted(event_type, true, true), data)
    }

    /// Create an untrusted keyboard event, as dispatched by script.
    pub fn synthetic_keyboard(event_type: &str, data: KeyboardEventData) -> Self {
        DomEvent::Keyboard(Event::new(event_type, true, true), data)
    }

    /// Create a focus event.
    pub fn focus(event_type: &str, data: FocusEventData) -> Self {
        // focus/blur don't bubble, focusin/focusout do
        let (bubbles, cancelable) = event_flags(event_type);
        DomEvent::Focus(Event::new_trusted(event_type, bubbles, cancelable), data)
    }
}

/// Options for adding an event listener.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddEventListenerOptions {
    /// If true, the listener is invoked during capture phase.
    pub capture: bool,
    /// If true, the listener is automatically removed after first invocation.
    pub once: bool,
    /// If true, indicates that the listener will never call preventDefault.
    pub passive: bool,
}

impl AddEventListenerOptions {
    /// Capture-phase listener.
    pub fn capture() -> Self {
        Self {
            capture: true,
            ..Default::default()
        }
    }

    /// Listener removed after its first invocation.
    pub fn once() -> Self {
        Self {
            once: true,
            ..Default::default()
        }
    }
}

/// An event listener callback.
pub type EventListenerCallback = Rc<dyn Fn(&DomEvent) + 'static>;

/// Handle to a registered listener, used for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId {
    pub target: EventTargetId,
    pub(crate) raw: u64,
}

/// A registered event listener.
struct EventListener {
    id: u64,
    event_type: String,
    callback: EventListenerCallback,
    options: AddEventListenerOptions,
    removed: Rc<Cell<bool>>,
}

/// Event target mixin - manages event listeners for one target.
#[derive(Default)]
pub struct EventTarget {
    listeners: RefCell<Vec<EventListener>>,
}

impl EventTarget {
    /// Create a new event target.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_event_listener(
        &self,
        id: u64,
        event_type: &str,
        callback: EventListenerCallback,
        options: AddEventListenerOptions,
    ) {
        self.listeners.borrow_mut().push(EventListener {
            id,
            event_type: event_type.to_string(),
            callback,
            options,
            removed: Rc::new(Cell::new(false)),
        });
    }

    /// Remove a listener by id. Listeners removed mid-dispatch do not fire.
    pub(crate) fn remove_listener(&self, id: u64) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        match listeners.iter().position(|l| l.id == id) {
            Some(index) => {
                let listener = listeners.remove(index);
                listener.removed.set(true);
                true
            }
            None => false,
        }
    }

    /// Check if there are any listeners for an event type.
    pub fn has_listeners(&self, event_type: &str) -> bool {
        self.listener_count(event_type) > 0
    }

    /// Number of listeners for an event type.
    pub fn listener_count(&self, event_type: &str) -> usize {
        self.listeners
            .borrow()
            .iter()
            .filter(|l| l.event_type == event_type)
            .count()
    }

    /// Total number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.borrow().is_empty()
    }

    /// Invoke listeners for an event in the given phase.
    ///
    /// Listeners are snapshotted first so callbacks may add or remove
    /// listeners (including themselves) without invalidating the iteration.
    pub fn invoke_listeners(&self, event: &DomEvent, phase: EventPhase) {
        let snapshot: Vec<_> = {
            let listeners = self.listeners.borrow();
            listeners
                .iter()
                .filter(|l| l.event_type == event.event_type())
                .filter(|l| match phase {
                    EventPhase::Capturing => l.options.capture,
                    EventPhase::AtTarget => true,
                    EventPhase::Bubbling => !l.options.capture,
                    EventPhase::None => false,
                })
                .map(|l| (l.id, l.callback.clone(), l.removed.clone(), l.options.once))
                .collect()
        };

        for (id, callback, removed, once) in snapshot {
            if removed.get() {
                continue;
            }
            if once {
                self.remove_listener(id);
            }
            callback(event);

            if event.event().immediate_propagation_stopped() {
                break;
            }
        }
    }
}

impl std::fmt::Debug for EventTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventTarget")
            .field("listener_count", &self.listeners.borrow().len())
            .finish()
    }
}

/// Event dispatcher for propagating events along a target path.
pub struct EventDispatcher;

impl EventDispatcher {
    /// Dispatch an event along `path`, ordered from the window down to the
    /// target (last element). Returns true if the event was not prevented.
    pub fn dispatch(event: &DomEvent, path: &[(EventTargetId, Rc<EventTarget>)]) -> bool {
        let base = event.event();
        let Some((target_id, target)) = path.last() else {
            return !base.default_prevented();
        };

        base.set_target(*target_id);
        base.set_path(path.iter().rev().map(|(id, _)| *id).collect());
        trace!(event_type = %base.event_type, node = ?target_id, "dispatch");

        let ancestors = &path[..path.len() - 1];

        // Capture phase (window to target, excluding target)
        base.set_phase(EventPhase::Capturing);
        for (id, node) in ancestors {
            if base.propagation_stopped() {
                break;
            }
            base.set_current_target(Some(*id));
            node.invoke_listeners(event, EventPhase::Capturing);
        }

        // At target phase
        if !base.propagation_stopped() {
            base.set_phase(EventPhase::AtTarget);
            base.set_current_target(Some(*target_id));
            target.invoke_listeners(event, EventPhase::AtTarget);
        }

        // Bubble phase (target to window, excluding target)
        if base.bubbles && !base.propagation_stopped() {
            base.set_phase(EventPhase::Bubbling);
            for (id, node) in ancestors.iter().rev() {
                if base.propagation_stopped() {
                    break;
                }
                base.set_current_target(Some(*id));
                node.invoke_listeners(event, EventPhase::Bubbling);
            }
        }

        base.set_phase(EventPhase::None);
        base.set_current_target(None);

        !base.default_prevented()
    }
}
