//! # Normalized input
//!
//! Boundary classification of native events. Gesture code matches on
//! [`NativeInput`] instead of probing which event family it was handed, and
//! uses the helpers here for contact geometry and virtual-input heuristics.

use std::fmt;
use std::str::FromStr;

use rustkit_dom::{
    DomEvent, KeyboardEventData, Modifiers, MouseEventData, PointerEventData, Rect, Touch,
    TouchEventData,
};

use crate::config::Platform;
use crate::InteractionError;

/// Device that produced a gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerType {
    Mouse,
    Pen,
    Touch,
    Keyboard,
    /// Assistive technology or a programmatic `click()`.
    Virtual,
}

impl From<rustkit_dom::PointerType> for PointerType {
    fn from(pointer_type: rustkit_dom::PointerType) -> Self {
        match pointer_type {
            rustkit_dom::PointerType::Pen => PointerType::Pen,
            rustkit_dom::PointerType::Touch => PointerType::Touch,
            rustkit_dom::PointerType::Mouse | rustkit_dom::PointerType::Unknown => {
                PointerType::Mouse
            }
        }
    }
}

impl fmt::Display for PointerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PointerType::Mouse => "mouse",
            PointerType::Pen => "pen",
            PointerType::Touch => "touch",
            PointerType::Keyboard => "keyboard",
            PointerType::Virtual => "virtual",
        };
        f.write_str(name)
    }
}

macro_rules! native_event_types {
    ($($variant:ident => $name:literal),* $(,)?) => {
        /// Native event types the engine listens for.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum NativeEventType {
            $($variant),*
        }

        impl NativeEventType {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(NativeEventType::$variant => $name),*
                }
            }
        }

        impl FromStr for NativeEventType {
            type Err = InteractionError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(NativeEventType::$variant),)*
                    other => Err(InteractionError::UnknownEventType(other.to_string())),
                }
            }
        }
    };
}

native_event_types! {
    PointerDown => "pointerdown",
    PointerUp => "pointerup",
    PointerMove => "pointermove",
    PointerCancel => "pointercancel",
    PointerEnter => "pointerenter",
    PointerLeave => "pointerleave",
    MouseDown => "mousedown",
    MouseUp => "mouseup",
    MouseMove => "mousemove",
    MouseEnter => "mouseenter",
    MouseLeave => "mouseleave",
    TouchStart => "touchstart",
    TouchMove => "touchmove",
    TouchEnd => "touchend",
    TouchCancel => "touchcancel",
    KeyDown => "keydown",
    KeyUp => "keyup",
    Click => "click",
    DragStart => "dragstart",
    ContextMenu => "contextmenu",
    Focus => "focus",
    Blur => "blur",
    Scroll => "scroll",
    BeforeUnload => "beforeunload",
}

impl fmt::Display for NativeEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A native event reduced to the family it belongs to.
#[derive(Debug, Clone, Copy)]
pub enum NativeInput<'a> {
    Pointer(&'a PointerEventData),
    Mouse(&'a MouseEventData),
    Touch(&'a TouchEventData),
    Keyboard(&'a KeyboardEventData),
    Focus,
    Other,
}

impl<'a> NativeInput<'a> {
    pub fn classify(event: &'a DomEvent) -> Self {
        match event {
            DomEvent::Pointer(_, data) => NativeInput::Pointer(data),
            DomEvent::Mouse(_, data) => NativeInput::Mouse(data),
            DomEvent::Touch(_, data) => NativeInput::Touch(data),
            DomEvent::Keyboard(_, data) => NativeInput::Keyboard(data),
            DomEvent::Focus(..) => NativeInput::Focus,
            DomEvent::Generic(_) => NativeInput::Other,
        }
    }

    pub fn modifiers(&self) -> Modifiers {
        match self {
            NativeInput::Pointer(data) => data.mouse.modifiers,
            NativeInput::Mouse(data) => data.modifiers,
            NativeInput::Touch(data) => data.modifiers,
            NativeInput::Keyboard(data) => data.modifiers,
            NativeInput::Focus | NativeInput::Other => Modifiers::default(),
        }
    }

    /// Viewport coordinates, when the event carries a single position.
    /// Touch events report the first changed touch.
    pub fn client_point(&self) -> Option<(f64, f64)> {
        match self {
            NativeInput::Pointer(data) => Some((data.mouse.client_x, data.mouse.client_y)),
            NativeInput::Mouse(data) => Some((data.client_x, data.client_y)),
            NativeInput::Touch(data) => data
                .changed_touches
                .first()
                .map(|t| (t.client_x, t.client_y)),
            _ => None,
        }
    }

    /// Primary button check for pointer and mouse events.
    pub fn button(&self) -> Option<i16> {
        match self {
            NativeInput::Pointer(data) => Some(data.mouse.button),
            NativeInput::Mouse(data) => Some(data.button),
            _ => None,
        }
    }
}

/// Find a touch by identifier.
pub fn touch_by_identifier(touches: &[Touch], identifier: i64) -> Option<&Touch> {
    touches.iter().find(|t| t.identifier == identifier)
}

/// The area covered by a pointer contact.
pub fn pointer_contact_rect(data: &PointerEventData) -> Rect {
    contact_rect(
        data.mouse.client_x,
        data.mouse.client_y,
        data.width / 2.0,
        data.height / 2.0,
    )
}

/// The area covered by a touch point.
pub fn touch_contact_rect(touch: &Touch) -> Rect {
    contact_rect(touch.client_x, touch.client_y, touch.radius_x, touch.radius_y)
}

fn contact_rect(x: f64, y: f64, offset_x: f64, offset_y: f64) -> Rect {
    Rect::new(x - offset_x, y - offset_y, offset_x * 2.0, offset_y * 2.0)
}

/// Whether the contact area of `event` overlaps `target`.
pub fn is_over_target(event: &DomEvent, target: &Rect) -> bool {
    match NativeInput::classify(event) {
        NativeInput::Pointer(data) => target.intersects(&pointer_contact_rect(data)),
        NativeInput::Mouse(data) => target.contains_point(data.client_x, data.client_y),
        NativeInput::Touch(data) => data
            .changed_touches
            .first()
            .map(|t| target.intersects(&touch_contact_rect(t)))
            .unwrap_or(false),
        _ => false,
    }
}

/// Whether a click was produced by assistive technology or `element.click()`
/// rather than a physical pointer. Best effort: no browser exposes a
/// reliable signal.
pub fn is_virtual_click(event: &DomEvent, platform: &Platform) -> bool {
    let Some(mouse) = event.mouse_data() else {
        return false;
    };

    // TalkBack reports a pointer type, so detail alone is not enough there
    if platform.is_android() && event.pointer_data().is_some() {
        return event.event_type() == "click" && mouse.buttons == 1;
    }

    mouse.detail == 0 && event.pointer_data().is_none()
}

/// Whether a pointer event was synthesized by a screen reader.
pub fn is_virtual_pointer_event(data: &PointerEventData, platform: &Platform) -> bool {
    (!platform.is_android() && data.width == 0.0 && data.height == 0.0)
        || (data.width == 1.0
            && data.height == 1.0
            && data.pressure == 0.0
            && data.mouse.detail == 0
            && data.pointer_type == rustkit_dom::PointerType::Mouse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Os;

    #[test]
    fn test_native_event_type_round_trip() {
        assert_eq!(
            "pointerdown".parse::<NativeEventType>().unwrap(),
            NativeEventType::PointerDown
        );
        assert_eq!(NativeEventType::DragStart.as_str(), "dragstart");
        assert!(matches!(
            "wheel".parse::<NativeEventType>(),
            Err(InteractionError::UnknownEventType(_))
        ));
    }

    #[test]
    fn test_virtual_click() {
        let platform = Platform::default();
        let real = DomEvent::mouse("click", MouseEventData::at(5.0, 5.0));
        assert!(!is_virtual_click(&real, &platform));

        let virtual_click = DomEvent::mouse("click", MouseEventData::at(0.0, 0.0).with_detail(0));
        assert!(is_virtual_click(&virtual_click, &platform));

        let key = DomEvent::keyboard("keydown", KeyboardEventData::key("Enter"));
        assert!(!is_virtual_click(&key, &platform));
    }

    #[test]
    fn test_virtual_click_android() {
        let android = Platform::new(Os::Android);
        let talkback = DomEvent::pointer("click", PointerEventData::touch(1, 0.0, 0.0));
        assert!(is_virtual_click(&talkback, &android));

        let mut data = PointerEventData::touch(1, 0.0, 0.0);
        data.mouse.buttons = 0;
        let tap = DomEvent::pointer("click", data);
        assert!(!is_virtual_click(&tap, &android));
    }

    #[test]
    fn test_virtual_pointer_event() {
        let platform = Platform::default();
        assert!(!is_virtual_pointer_event(&PointerEventData::mouse(1.0, 1.0), &platform));
        assert!(is_virtual_pointer_event(
            &PointerEventData::mouse(1.0, 1.0).zero_sized(),
            &platform
        ));
        assert!(is_virtual_pointer_event(
            &PointerEventData::mouse(1.0, 1.0).with_pressure(0.0),
            &platform
        ));
        assert!(!is_virtual_pointer_event(
            &PointerEventData::touch(2, 1.0, 1.0).zero_sized(),
            &Platform::new(Os::Android)
        ));
    }

    #[test]
    fn test_contact_geometry() {
        let target = Rect::new(0.0, 0.0, 100.0, 50.0);
        let inside = DomEvent::pointer("pointerup", PointerEventData::mouse(10.0, 10.0));
        assert!(is_over_target(&inside, &target));

        // a wide touch just outside the edge still overlaps
        let edge = DomEvent::pointer("pointerup", PointerEventData::touch(1, 105.0, 10.0));
        assert!(is_over_target(&edge, &target));

        let outside = DomEvent::pointer("pointerup", PointerEventData::mouse(150.0, 10.0));
        assert!(!is_over_target(&outside, &target));
    }

    #[test]
    fn test_touch_lookup() {
        let touches = vec![Touch::at(3, 0.0, 0.0), Touch::at(9, 1.0, 1.0)];
        assert_eq!(touch_by_identifier(&touches, 9).map(|t| t.client_x), Some(1.0));
        assert!(touch_by_identifier(&touches, 4).is_none());
    }
}
