//! # Long press
//!
//! A press held past a threshold. Built on [`PressController`]: mouse and
//! touch presses arm a timer at `pressstart`; if it fires before `pressend`
//! the underlying press is cancelled (so no `press` follows) and
//! `longpress` is emitted. Keyboard and virtual presses never start a long
//! press.
//!
//! On touch devices the browser's own long-press context menu is suppressed
//! for the duration of the gesture plus a short grace period.

use std::cell::Cell;
use std::rc::{Rc, Weak};
use std::time::Duration;

use rustkit_dom::{
    AddEventListenerOptions, Document, DomEvent, EventTargetId, NodeId, PointerEventData,
    TimerId,
};
use tracing::debug;

use crate::config::DisabledFlag;
use crate::context::Interactions;
use crate::events::{LongPressEvent, LongPressEventType, PressEvent};
use crate::global_listeners::{Binding, GlobalListeners};
use crate::pointer::PointerType;
use crate::press::{PressCallbacks, PressController, PressHandlers, PressOptions};
use crate::InteractionError;

pub type LongPressHandler = Rc<dyn Fn(&LongPressEvent)>;

#[derive(Clone, Default)]
pub struct LongPressCallbacks {
    pub on_long_press_start: Option<LongPressHandler>,
    pub on_long_press_end: Option<LongPressHandler>,
    pub on_long_press: Option<LongPressHandler>,
}

impl LongPressCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_long_press_start(mut self, f: impl Fn(&LongPressEvent) + 'static) -> Self {
        self.on_long_press_start = Some(Rc::new(f));
        self
    }

    pub fn on_long_press_end(mut self, f: impl Fn(&LongPressEvent) + 'static) -> Self {
        self.on_long_press_end = Some(Rc::new(f));
        self
    }

    pub fn on_long_press(mut self, f: impl Fn(&LongPressEvent) + 'static) -> Self {
        self.on_long_press = Some(Rc::new(f));
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct LongPressOptions {
    pub is_disabled: DisabledFlag,
    /// Overrides the configured threshold.
    pub threshold: Option<Duration>,
    /// Describes the long-press action to assistive technology.
    pub accessibility_description: Option<String>,
}

impl LongPressOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_disabled(mut self, flag: DisabledFlag) -> Self {
        self.is_disabled = flag;
        self
    }

    pub fn with_threshold(mut self, threshold: Duration) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn with_accessibility_description(mut self, description: impl Into<String>) -> Self {
        self.accessibility_description = Some(description.into());
        self
    }
}

struct LongPressInner {
    document: Document,
    ctx: Interactions,
    callbacks: LongPressCallbacks,
    options: LongPressOptions,
    timer: Cell<Option<TimerId>>,
    listeners: GlobalListeners,
    press: PressController,
    this: Weak<LongPressInner>,
}

/// Long press gesture controller for one element.
pub struct LongPressController {
    inner: Rc<LongPressInner>,
}

impl LongPressController {
    pub fn new(
        document: &Document,
        ctx: &Interactions,
        callbacks: LongPressCallbacks,
        options: LongPressOptions,
    ) -> Self {
        let inner = Rc::new_cyclic(|this: &Weak<LongPressInner>| {
            let on_start = this.clone();
            let on_end = this.clone();
            let press_callbacks = PressCallbacks::new()
                .on_press_start(move |event| {
                    if let Some(inner) = on_start.upgrade() {
                        inner.on_press_start(event);
                    }
                })
                .on_press_end(move |event| {
                    if let Some(inner) = on_end.upgrade() {
                        inner.on_press_end(event);
                    }
                });
            let press_options = PressOptions::new().with_disabled(options.is_disabled.clone());

            LongPressInner {
                document: document.clone(),
                ctx: ctx.clone(),
                callbacks,
                press: PressController::new(document, ctx, press_callbacks, press_options),
                options,
                timer: Cell::new(None),
                listeners: GlobalListeners::new(document),
                this: this.clone(),
            }
        });
        Self { inner }
    }

    pub fn handlers(&self) -> PressHandlers {
        self.inner.press.handlers()
    }

    pub fn bind(&self, node: NodeId) -> Result<Binding, InteractionError> {
        self.inner.press.bind(node)
    }

    pub fn is_pressed(&self) -> bool {
        self.inner.press.is_pressed()
    }

    /// Description to expose while a long-press action is available.
    pub fn accessibility_description(&self) -> Option<&str> {
        let available =
            self.inner.callbacks.on_long_press.is_some() && !self.inner.options.is_disabled.get();
        if available {
            self.inner.options.accessibility_description.as_deref()
        } else {
            None
        }
    }

    pub fn dispose(&self) {
        self.inner.clear_timer();
        self.inner.listeners.remove_all();
        self.inner.press.dispose();
    }
}

impl Drop for LongPressController {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn is_long_press_pointer(pointer_type: PointerType) -> bool {
    matches!(pointer_type, PointerType::Mouse | PointerType::Touch)
}

impl LongPressInner {
    fn threshold(&self) -> Duration {
        self.options
            .threshold
            .unwrap_or(self.ctx.config().long_press_threshold)
    }

    fn emit(&self, handler: &Option<LongPressHandler>, event_type: LongPressEventType, press: &PressEvent) {
        if let Some(handler) = handler {
            handler(&LongPressEvent::from_press(event_type, press));
        }
    }

    fn clear_timer(&self) {
        if let Some(timer) = self.timer.take() {
            self.document.clear_timeout(timer);
        }
    }

    fn on_press_start(&self, event: &PressEvent) {
        event.continue_propagation();
        if !is_long_press_pointer(event.pointer_type) {
            return;
        }

        self.emit(
            &self.callbacks.on_long_press_start,
            LongPressEventType::LongPressStart,
            event,
        );

        let this = self.this.clone();
        let press = event.clone();
        self.clear_timer();
        let timer = self.document.set_timeout(
            move || {
                if let Some(inner) = this.upgrade() {
                    inner.on_threshold(&press);
                }
            },
            self.threshold(),
        );
        self.timer.set(Some(timer));

        if event.pointer_type == PointerType::Touch {
            self.suppress_context_menu(event.target);
        }
    }

    fn on_press_end(&self, event: &PressEvent) {
        self.clear_timer();
        if is_long_press_pointer(event.pointer_type) {
            self.emit(
                &self.callbacks.on_long_press_end,
                LongPressEventType::LongPressEnd,
                event,
            );
        }
    }

    fn on_threshold(&self, press: &PressEvent) {
        self.timer.set(None);
        debug!(node = press.target.raw(), "long press threshold reached");

        // pressend and longpressend fire from the cancel, with no press
        self.press.cancel();
        let rect = self.document.bounding_rect(press.target);
        let mut pointer = PointerEventData::mouse(rect.left() + press.x, rect.top() + press.y);
        pointer.pointer_type = match press.pointer_type {
            PointerType::Touch => rustkit_dom::PointerType::Touch,
            _ => rustkit_dom::PointerType::Mouse,
        };
        self.document.dispatch(
            press.target,
            &DomEvent::synthetic_pointer("pointercancel", pointer),
        );

        if self.document.active_element() != Some(press.target) {
            self.ctx
                .tracker()
                .focus_without_modality_change(&self.document, press.target);
        }

        self.emit(&self.callbacks.on_long_press, LongPressEventType::LongPress, press);
    }

    /// Block the native context menu on `target` until shortly after the
    /// finger lifts.
    fn suppress_context_menu(&self, target: NodeId) {
        let key = self.listeners.add(
            EventTargetId::Node(target),
            "contextmenu",
            Rc::new(|event: &DomEvent| event.event().prevent_default()),
            AddEventListenerOptions::once(),
        );

        let this = self.this.clone();
        let grace = self.ctx.config().context_menu_grace;
        self.listeners.add(
            EventTargetId::Window,
            "pointerup",
            Rc::new(move |_: &DomEvent| {
                let Some(inner) = this.upgrade() else {
                    return;
                };
                let listeners = inner.this.clone();
                // the menu can still open right after the pointerup
                inner.document.set_timeout(
                    move || {
                        if let Some(inner) = listeners.upgrade() {
                            inner.listeners.remove(key);
                        }
                    },
                    grace,
                );
            }),
            AddEventListenerOptions::once(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessibility_description() {
        let doc = Document::new();
        let ctx = Interactions::default();
        let flag = DisabledFlag::default();

        let without_handler = LongPressController::new(
            &doc,
            &ctx,
            LongPressCallbacks::new(),
            LongPressOptions::new().with_accessibility_description("Long press to open menu"),
        );
        assert_eq!(without_handler.accessibility_description(), None);

        let controller = LongPressController::new(
            &doc,
            &ctx,
            LongPressCallbacks::new().on_long_press(|_| {}),
            LongPressOptions::new()
                .with_disabled(flag.clone())
                .with_accessibility_description("Long press to open menu"),
        );
        assert_eq!(
            controller.accessibility_description(),
            Some("Long press to open menu")
        );

        flag.set(true);
        assert_eq!(controller.accessibility_description(), None);
    }

    #[test]
    fn test_only_mouse_and_touch_arm() {
        assert!(is_long_press_pointer(PointerType::Mouse));
        assert!(is_long_press_pointer(PointerType::Touch));
        assert!(!is_long_press_pointer(PointerType::Keyboard));
        assert!(!is_long_press_pointer(PointerType::Virtual));
        assert!(!is_long_press_pointer(PointerType::Pen));
    }
}
