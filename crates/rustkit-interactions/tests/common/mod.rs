//! Shared page fixture and event recorders for the integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use rustkit_dom::{
    Document, DomEvent, KeyboardEventData, MouseEventData, NodeId, PointerEventData, Rect,
};
use rustkit_interactions::{Interactions, LongPressCallbacks, PressCallbacks};
use tracing_subscriber::EnvFilter;

pub const PAGE: &str = r#"<!DOCTYPE html>
<html>
<body>
    <div id="parent">
        <div id="button" role="button" tabindex="0">Press me</div>
    </div>
    <a id="link" href="/next">Next</a>
    <div id="outside">Elsewhere</div>
</body>
</html>"#;

pub struct Page {
    pub doc: Document,
    pub parent: NodeId,
    pub button: NodeId,
    pub link: NodeId,
    pub outside: NodeId,
}

impl Page {
    pub fn new() -> Self {
        init_tracing();
        let doc = Document::parse_html(PAGE).expect("fixture parses");
        let id = |name: &str| doc.get_element_by_id(name).expect("fixture element");
        let page = Self {
            parent: id("parent"),
            button: id("button"),
            link: id("link"),
            outside: id("outside"),
            doc: doc.clone(),
        };
        doc.set_bounding_rect(page.parent, Rect::new(0.0, 0.0, 200.0, 60.0)).unwrap();
        doc.set_bounding_rect(page.button, Rect::new(10.0, 10.0, 100.0, 40.0)).unwrap();
        doc.set_bounding_rect(page.link, Rect::new(10.0, 100.0, 100.0, 20.0)).unwrap();
        doc.set_bounding_rect(page.outside, Rect::new(10.0, 300.0, 100.0, 40.0)).unwrap();
        page
    }

    pub fn pointer(&self, node: NodeId, event_type: &str, data: PointerEventData) -> bool {
        self.doc.dispatch(node, &DomEvent::pointer(event_type, data))
    }

    pub fn mouse(&self, node: NodeId, event_type: &str, data: MouseEventData) -> bool {
        self.doc.dispatch(node, &DomEvent::mouse(event_type, data))
    }

    pub fn key(&self, node: NodeId, event_type: &str, data: KeyboardEventData) -> bool {
        self.doc.dispatch(node, &DomEvent::keyboard(event_type, data))
    }

    /// The full browser sequence for a primary mouse click at (x, y).
    pub fn mouse_click(&self, node: NodeId, x: f64, y: f64) {
        self.pointer_press(node, x, y);
        self.pointer_release(node, x, y);
    }

    pub fn pointer_press(&self, node: NodeId, x: f64, y: f64) {
        self.pointer(node, "pointerdown", PointerEventData::mouse(x, y));
        self.mouse(node, "mousedown", MouseEventData::at(x, y));
    }

    pub fn pointer_release(&self, node: NodeId, x: f64, y: f64) {
        self.pointer(node, "pointerup", PointerEventData::mouse(x, y));
        self.mouse(node, "mouseup", MouseEventData::at(x, y));
        self.mouse(node, "click", MouseEventData::at(x, y));
    }
}

/// Records callbacks as `"<event>:<pointer type>"` strings.
#[derive(Clone, Default)]
pub struct Recorder {
    log: Rc<RefCell<Vec<String>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.log.borrow_mut().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.log.borrow().clone()
    }

    pub fn clear(&self) {
        self.log.borrow_mut().clear();
    }

    pub fn contains(&self, prefix: &str) -> bool {
        self.log.borrow().iter().any(|e| e.starts_with(prefix))
    }

    pub fn press_callbacks(&self) -> PressCallbacks {
        let (start, end, up, press, change, click) = (
            self.clone(),
            self.clone(),
            self.clone(),
            self.clone(),
            self.clone(),
            self.clone(),
        );
        PressCallbacks::new()
            .on_press_start(move |e| start.push(format!("pressstart:{}", e.pointer_type)))
            .on_press_end(move |e| end.push(format!("pressend:{}", e.pointer_type)))
            .on_press_up(move |e| up.push(format!("pressup:{}", e.pointer_type)))
            .on_press(move |e| press.push(format!("press:{}", e.pointer_type)))
            .on_press_change(move |pressed| change.push(format!("presschange:{pressed}")))
            .on_click(move |_| click.push("click"))
    }

    pub fn long_press_callbacks(&self) -> LongPressCallbacks {
        let (start, end, long) = (self.clone(), self.clone(), self.clone());
        LongPressCallbacks::new()
            .on_long_press_start(move |e| start.push(format!("longpressstart:{}", e.pointer_type)))
            .on_long_press_end(move |e| end.push(format!("longpressend:{}", e.pointer_type)))
            .on_long_press(move |e| long.push(format!("longpress:{}", e.pointer_type)))
    }
}

/// Route gesture traces to the test writer; `RUST_LOG=rustkit_interactions=trace`
/// shows them for a failing test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn interactions() -> Interactions {
    Interactions::default()
}
