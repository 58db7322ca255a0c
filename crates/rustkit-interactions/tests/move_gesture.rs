//! Move gestures from pointers, legacy touch and arrow keys.

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::{interactions, Page};
use rustkit_dom::{
    DomEvent, KeyboardEventData, MouseEventData, PointerEventData, Touch, TouchEventData,
};
use rustkit_interactions::{
    InteractionConfig, Interactions, MoveCallbacks, MoveController, MoveEvent, MoveEventType,
    Platform, PointerType,
};

fn recorder() -> (Rc<RefCell<Vec<MoveEvent>>>, MoveCallbacks) {
    let log = Rc::new(RefCell::new(Vec::new()));
    let (start, moved, end) = (log.clone(), log.clone(), log.clone());
    let callbacks = MoveCallbacks::new()
        .on_move_start(move |e| start.borrow_mut().push(e.clone()))
        .on_move(move |e| moved.borrow_mut().push(e.clone()))
        .on_move_end(move |e| end.borrow_mut().push(e.clone()));
    (log, callbacks)
}

fn types(log: &Rc<RefCell<Vec<MoveEvent>>>) -> Vec<MoveEventType> {
    log.borrow().iter().map(|e| e.event_type).collect()
}

#[test]
fn test_pointer_drag_reports_deltas() {
    let page = Page::new();
    let ctx = interactions();
    let (log, callbacks) = recorder();
    let controller = MoveController::new(&page.doc, &ctx, callbacks);
    let _binding = controller.bind(page.button).unwrap();

    page.pointer(page.button, "pointerdown", PointerEventData::mouse(20.0, 20.0));
    assert!(controller.is_moving());
    assert_eq!(page.doc.style_property(page.button, "user-select"), "none");
    page.pointer(page.outside, "pointermove", PointerEventData::mouse(25.0, 18.0));
    page.pointer(page.outside, "pointermove", PointerEventData::mouse(25.0, 18.0));
    page.pointer(page.outside, "pointermove", PointerEventData::mouse(30.0, 18.0));
    page.pointer(page.outside, "pointerup", PointerEventData::mouse(30.0, 18.0));

    assert_eq!(
        types(&log),
        vec![
            MoveEventType::MoveStart,
            MoveEventType::Move,
            MoveEventType::Move,
            MoveEventType::MoveEnd,
        ]
    );
    let log = log.borrow();
    assert_eq!((log[1].delta_x, log[1].delta_y), (5.0, -2.0));
    assert_eq!((log[2].delta_x, log[2].delta_y), (5.0, 0.0));
    assert!(log.iter().all(|e| e.pointer_type == PointerType::Mouse));
    assert!(!controller.is_moving());
    assert_eq!(page.doc.style_property(page.button, "user-select"), "");
}

#[test]
fn test_click_without_motion_is_silent() {
    let page = Page::new();
    let ctx = interactions();
    let (log, callbacks) = recorder();
    let controller = MoveController::new(&page.doc, &ctx, callbacks);
    let _binding = controller.bind(page.button).unwrap();

    page.pointer(page.button, "pointerdown", PointerEventData::mouse(20.0, 20.0));
    page.pointer(page.button, "pointerup", PointerEventData::mouse(20.0, 20.0));
    assert!(log.borrow().is_empty());
}

#[test]
fn test_other_pointer_is_ignored() {
    let page = Page::new();
    let ctx = interactions();
    let (log, callbacks) = recorder();
    let controller = MoveController::new(&page.doc, &ctx, callbacks);
    let _binding = controller.bind(page.button).unwrap();

    page.pointer(page.button, "pointerdown", PointerEventData::touch(1, 20.0, 20.0));
    page.pointer(page.outside, "pointermove", PointerEventData::touch(2, 40.0, 40.0));
    page.pointer(page.outside, "pointerup", PointerEventData::touch(2, 40.0, 40.0));
    assert!(log.borrow().is_empty());
    assert!(controller.is_moving());

    page.pointer(page.outside, "pointercancel", PointerEventData::touch(1, 20.0, 20.0));
    assert!(!controller.is_moving());
}

#[test]
fn test_arrow_up_is_atomic() {
    let page = Page::new();
    let ctx = interactions();
    let (log, callbacks) = recorder();
    let controller = MoveController::new(&page.doc, &ctx, callbacks);
    let _binding = controller.bind(page.button).unwrap();

    let event = DomEvent::keyboard("keydown", KeyboardEventData::key("ArrowUp"));
    page.doc.dispatch(page.button, &event);

    assert!(event.event().default_prevented());
    assert_eq!(
        types(&log),
        vec![MoveEventType::MoveStart, MoveEventType::Move, MoveEventType::MoveEnd]
    );
    assert_eq!((log.borrow()[1].delta_x, log.borrow()[1].delta_y), (0.0, -1.0));
    assert!(log.borrow().iter().all(|e| e.pointer_type == PointerType::Keyboard));
}

#[test]
fn test_legacy_touch_tracks_one_finger() {
    let page = Page::new();
    let config = InteractionConfig::new()
        .with_platform(Platform::default().with_pointer_events(false));
    let ctx = Interactions::new(config).unwrap();
    let (log, callbacks) = recorder();
    let controller = MoveController::new(&page.doc, &ctx, callbacks);
    let _binding = controller.bind(page.button).unwrap();

    let first = Touch::at(1, 20.0, 20.0);
    page.doc
        .dispatch(page.button, &DomEvent::touch("touchstart", TouchEventData::single(first)));
    // a second finger does not take over
    page.doc.dispatch(
        page.button,
        &DomEvent::touch("touchstart", TouchEventData::single(Touch::at(2, 50.0, 50.0))),
    );
    page.doc.dispatch(
        page.button,
        &DomEvent::touch("touchmove", TouchEventData::single(Touch::at(1, 23.0, 24.0))),
    );
    page.doc.dispatch(
        page.button,
        &DomEvent::touch("touchend", TouchEventData::ended(Touch::at(1, 23.0, 24.0))),
    );

    assert_eq!(
        types(&log),
        vec![MoveEventType::MoveStart, MoveEventType::Move, MoveEventType::MoveEnd]
    );
    assert_eq!((log.borrow()[1].delta_x, log.borrow()[1].delta_y), (3.0, 4.0));
    assert!(log.borrow().iter().all(|e| e.pointer_type == PointerType::Touch));
}

#[test]
fn test_legacy_mouse_second_mousedown_is_ignored() {
    let page = Page::new();
    let config = InteractionConfig::new()
        .with_platform(Platform::default().with_pointer_events(false));
    let ctx = Interactions::new(config).unwrap();
    let (log, callbacks) = recorder();
    let controller = MoveController::new(&page.doc, &ctx, callbacks);
    let _binding = controller.bind(page.button).unwrap();

    page.mouse(page.button, "mousedown", MouseEventData::at(20.0, 20.0));
    let listeners = page.doc.total_listener_count();
    page.mouse(page.button, "mousedown", MouseEventData::at(20.0, 20.0));
    assert_eq!(page.doc.total_listener_count(), listeners);
    assert!(controller.is_moving());

    page.mouse(page.outside, "mousemove", MouseEventData::at(26.0, 20.0));
    page.mouse(page.outside, "mouseup", MouseEventData::at(26.0, 20.0));

    assert_eq!(
        types(&log),
        vec![MoveEventType::MoveStart, MoveEventType::Move, MoveEventType::MoveEnd]
    );
    assert!(!controller.is_moving());
}
