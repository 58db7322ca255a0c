//! Gesture events delivered to consumer callbacks.

use std::cell::Cell;
use std::fmt;

use rustkit_dom::{Modifiers, NodeId, Rect};

use crate::pointer::PointerType;

/// Press lifecycle step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressEventType {
    PressStart,
    PressUp,
    PressEnd,
    Press,
}

impl fmt::Display for PressEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PressEventType::PressStart => "pressstart",
            PressEventType::PressUp => "pressup",
            PressEventType::PressEnd => "pressend",
            PressEventType::Press => "press",
        };
        f.write_str(name)
    }
}

/// One step of a press gesture.
#[derive(Debug, Clone)]
pub struct PressEvent {
    pub event_type: PressEventType,
    pub pointer_type: PointerType,
    /// Element the press is attached to.
    pub target: NodeId,
    pub modifiers: Modifiers,
    /// Position relative to the target's bounding rect.
    pub x: f64,
    pub y: f64,
    /// Key that drove a keyboard press.
    pub key: Option<String>,
    should_stop_propagation: Cell<bool>,
}

impl PressEvent {
    /// Build an event for `target`. Without client coordinates the position
    /// is the center of `rect`.
    pub fn new(
        event_type: PressEventType,
        pointer_type: PointerType,
        target: NodeId,
        rect: Rect,
        client: Option<(f64, f64)>,
        modifiers: Modifiers,
        key: Option<String>,
    ) -> Self {
        let (x, y) = match client {
            Some((client_x, client_y)) => (client_x - rect.left(), client_y - rect.top()),
            None => (rect.width / 2.0, rect.height / 2.0),
        };
        Self {
            event_type,
            pointer_type,
            target,
            modifiers,
            x,
            y,
            key,
            should_stop_propagation: Cell::new(true),
        }
    }

    /// Let the native event that produced this press keep propagating.
    /// Propagation continues only if every press event produced by that
    /// native event asks for it.
    pub fn continue_propagation(&self) {
        self.should_stop_propagation.set(false);
    }

    pub fn should_stop_propagation(&self) -> bool {
        self.should_stop_propagation.get()
    }
}

/// Long press lifecycle step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LongPressEventType {
    LongPressStart,
    LongPressEnd,
    LongPress,
}

impl fmt::Display for LongPressEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LongPressEventType::LongPressStart => "longpressstart",
            LongPressEventType::LongPressEnd => "longpressend",
            LongPressEventType::LongPress => "longpress",
        };
        f.write_str(name)
    }
}

/// A long press event carries the fields of the press it came from.
#[derive(Debug, Clone)]
pub struct LongPressEvent {
    pub event_type: LongPressEventType,
    pub pointer_type: PointerType,
    pub target: NodeId,
    pub modifiers: Modifiers,
    pub x: f64,
    pub y: f64,
}

impl LongPressEvent {
    pub fn from_press(event_type: LongPressEventType, press: &PressEvent) -> Self {
        Self {
            event_type,
            pointer_type: press.pointer_type,
            target: press.target,
            modifiers: press.modifiers,
            x: press.x,
            y: press.y,
        }
    }
}

/// Move lifecycle step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveEventType {
    MoveStart,
    Move,
    MoveEnd,
}

impl fmt::Display for MoveEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MoveEventType::MoveStart => "movestart",
            MoveEventType::Move => "move",
            MoveEventType::MoveEnd => "moveend",
        };
        f.write_str(name)
    }
}

/// Move gesture event. Deltas are zero except on [`MoveEventType::Move`].
#[derive(Debug, Clone, PartialEq)]
pub struct MoveEvent {
    pub event_type: MoveEventType,
    pub pointer_type: PointerType,
    pub delta_x: f64,
    pub delta_y: f64,
    pub modifiers: Modifiers,
}

impl MoveEvent {
    pub fn new(event_type: MoveEventType, pointer_type: PointerType, modifiers: Modifiers) -> Self {
        Self {
            event_type,
            pointer_type,
            delta_x: 0.0,
            delta_y: 0.0,
            modifiers,
        }
    }

    pub fn with_delta(mut self, delta_x: f64, delta_y: f64) -> Self {
        self.delta_x = delta_x;
        self.delta_y = delta_y;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoverEventType {
    HoverStart,
    HoverEnd,
}

/// Hover start or end.
#[derive(Debug, Clone, PartialEq)]
pub struct HoverEvent {
    pub event_type: HoverEventType,
    pub pointer_type: PointerType,
    pub target: NodeId,
}
