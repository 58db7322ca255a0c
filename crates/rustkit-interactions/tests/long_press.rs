//! Long press thresholds and interplay with plain presses on the same element.

mod common;

use std::time::Duration;

use common::{interactions, Page, Recorder};
use rustkit_dom::{DomEvent, KeyboardEventData, MouseEventData, PointerEventData};
use rustkit_interactions::{
    LongPressController, LongPressOptions, PressController, PressOptions,
};

#[test]
fn test_long_press_after_threshold() {
    let page = Page::new();
    let ctx = interactions();
    let recorder = Recorder::new();
    let long_press = LongPressController::new(
        &page.doc,
        &ctx,
        recorder.long_press_callbacks(),
        LongPressOptions::new(),
    );
    let _long_binding = long_press.bind(page.button).unwrap();

    let plain = Recorder::new();
    let press = PressController::new(&page.doc, &ctx, plain.press_callbacks(), PressOptions::new());
    let _press_binding = press.bind(page.button).unwrap();

    page.pointer_press(page.button, 20.0, 20.0);
    assert_eq!(recorder.entries(), vec!["longpressstart:mouse"]);

    page.doc.advance_time(Duration::from_millis(500));
    assert_eq!(
        recorder.entries(),
        vec!["longpressstart:mouse", "longpressend:mouse", "longpress:mouse"]
    );
    // the pointercancel dispatched at the target ended the sibling press too
    assert!(!press.is_pressed());
    assert!(plain.contains("pressend:mouse"));

    page.pointer_release(page.button, 20.0, 20.0);
    assert!(!plain.contains("press:"));
    assert_eq!(page.doc.active_element(), Some(page.button));
}

#[test]
fn test_short_press_is_not_long() {
    let page = Page::new();
    let ctx = interactions();
    let recorder = Recorder::new();
    let long_press = LongPressController::new(
        &page.doc,
        &ctx,
        recorder.long_press_callbacks(),
        LongPressOptions::new(),
    );
    let _binding = long_press.bind(page.button).unwrap();

    page.pointer_press(page.button, 20.0, 20.0);
    page.doc.advance_time(Duration::from_millis(300));
    page.pointer_release(page.button, 20.0, 20.0);
    page.doc.advance_time(Duration::from_millis(500));

    assert_eq!(
        recorder.entries(),
        vec!["longpressstart:mouse", "longpressend:mouse"]
    );
    assert_eq!(page.doc.pending_timers(), 0);
}

#[test]
fn test_custom_threshold() {
    let page = Page::new();
    let ctx = interactions();
    let recorder = Recorder::new();
    let long_press = LongPressController::new(
        &page.doc,
        &ctx,
        recorder.long_press_callbacks(),
        LongPressOptions::new().with_threshold(Duration::from_millis(800)),
    );
    let _binding = long_press.bind(page.button).unwrap();

    page.pointer_press(page.button, 20.0, 20.0);
    page.doc.advance_time(Duration::from_millis(600));
    assert!(!recorder.contains("longpress:"));
    page.doc.advance_time(Duration::from_millis(200));
    assert!(recorder.contains("longpress:mouse"));
}

#[test]
fn test_keyboard_never_long_presses() {
    let page = Page::new();
    let ctx = interactions();
    let recorder = Recorder::new();
    let long_press = LongPressController::new(
        &page.doc,
        &ctx,
        recorder.long_press_callbacks(),
        LongPressOptions::new(),
    );
    let _binding = long_press.bind(page.button).unwrap();

    page.key(page.button, "keydown", KeyboardEventData::key("Enter"));
    page.doc.advance_time(Duration::from_millis(1000));
    page.key(page.button, "keyup", KeyboardEventData::key("Enter"));

    assert!(recorder.entries().is_empty());
}

#[test]
fn test_touch_long_press_blocks_context_menu() {
    let page = Page::new();
    let ctx = interactions();
    let recorder = Recorder::new();
    let long_press = LongPressController::new(
        &page.doc,
        &ctx,
        recorder.long_press_callbacks(),
        LongPressOptions::new(),
    );
    let _binding = long_press.bind(page.button).unwrap();

    page.pointer(page.button, "pointerdown", PointerEventData::touch(5, 20.0, 20.0));
    page.doc.advance_time(Duration::from_millis(500));
    assert!(recorder.contains("longpress:touch"));

    let menu = DomEvent::mouse("contextmenu", MouseEventData::at(20.0, 20.0));
    page.doc.dispatch(page.button, &menu);
    assert!(menu.event().default_prevented());

    // only the first context menu of the gesture is blocked
    let second = DomEvent::mouse("contextmenu", MouseEventData::at(20.0, 20.0));
    page.doc.dispatch(page.button, &second);
    assert!(!second.event().default_prevented());
}

#[test]
fn test_context_menu_guard_expires_after_release() {
    let page = Page::new();
    let ctx = interactions();
    let recorder = Recorder::new();
    let long_press = LongPressController::new(
        &page.doc,
        &ctx,
        recorder.long_press_callbacks(),
        LongPressOptions::new(),
    );
    let _binding = long_press.bind(page.button).unwrap();

    page.pointer(page.button, "pointerdown", PointerEventData::touch(5, 20.0, 20.0));
    page.pointer(page.button, "pointerup", PointerEventData::touch(5, 20.0, 20.0));
    page.doc.advance_time(Duration::from_millis(30));

    let menu = DomEvent::mouse("contextmenu", MouseEventData::at(20.0, 20.0));
    page.doc.dispatch(page.button, &menu);
    assert!(!menu.event().default_prevented());
}
