//! # RustKit DOM
//!
//! In-memory page model for the RustKit interaction engine.
//! Uses html5ever for HTML parsing and constructs a traversable DOM tree.
//!
//! ## Design Goals
//!
//! 1. **Spec-compliant parsing**: html5ever implements the HTML5 parsing algorithm
//! 2. **Event dispatch**: DOM Events with capture/bubble phases over window,
//!    document and nodes
//! 3. **Platform surface**: focus, pointer capture, bounding rects, inline
//!    styles, link activation and timers, the operations gesture code needs
//!    from a browser
//!
//! [`Document`] is a cheap handle; clones share the same page.

pub mod element;
pub mod events;
pub mod timers;

pub use element::{ButtonType, InputType};
pub use events::{
    event_flags, AddEventListenerOptions, DomEvent, Event, EventDispatcher, EventId,
    EventListenerCallback, EventPhase, EventTarget, EventTargetId, FocusEventData,
    KeyboardEventData, ListenerId, Modifiers, MouseEventData, PointerEventData, PointerType,
    Touch, TouchEventData,
};
pub use timers::{TimerId, TimerQueue};

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use rustkit_common::RustKitError;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, trace, warn};
use url::Url;

/// Base URL used to resolve links when the page has none.
pub const DEFAULT_BASE_URL: &str = "http://localhost/";

/// Errors that can occur in DOM operations.
#[derive(Error, Debug)]
pub enum DomError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl From<DomError> for RustKitError {
    fn from(err: DomError) -> Self {
        RustKitError::dom_with_source(err.to_string(), err)
    }
}

/// Unique identifier for a DOM node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Create a new NodeId.
    pub fn new(id: usize) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> usize {
        self.0
    }
}

/// Unique identifier for a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentId(u64);

impl DocumentId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Type of DOM node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeType {
    Document,
    DocumentType { name: String },
    Element { tag_name: String, namespace: String },
    Text(String),
    Comment(String),
}

/// Border box of an element in viewport coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn left(&self) -> f64 {
        self.x
    }

    pub fn top(&self) -> f64 {
        self.y
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Check if a point is inside (edges inclusive).
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.left() && x <= self.right() && y >= self.top() && y <= self.bottom()
    }

    /// Check if two rectangles overlap. Touching edges count.
    pub fn intersects(&self, other: &Rect) -> bool {
        !(self.left() > other.right()
            || other.left() > self.right()
            || self.top() > other.bottom()
            || other.top() > self.bottom())
    }
}

/// A DOM node.
#[derive(Debug)]
pub struct Node {
    /// Unique ID for this node.
    pub id: NodeId,
    /// Node type and associated data.
    pub node_type: NodeType,
    attributes: RefCell<HashMap<String, String>>,
    /// Inline style declarations.
    style: RefCell<BTreeMap<String, String>>,
    rect: Cell<Rect>,
    /// Parent node (weak reference to avoid cycles).
    parent: RefCell<Option<Weak<Node>>>,
    /// Child nodes.
    children: RefCell<Vec<Rc<Node>>>,
}

impl Node {
    /// Create a new node.
    pub fn new(id: NodeId, node_type: NodeType) -> Rc<Self> {
        Rc::new(Self {
            id,
            node_type,
            attributes: RefCell::new(HashMap::new()),
            style: RefCell::new(BTreeMap::new()),
            rect: Cell::new(Rect::default()),
            parent: RefCell::new(None),
            children: RefCell::new(Vec::new()),
        })
    }

    /// Get the tag name for element nodes.
    pub fn tag_name(&self) -> Option<&str> {
        match &self.node_type {
            NodeType::Element { tag_name, .. } => Some(tag_name),
            _ => None,
        }
    }

    /// Get an attribute value.
    pub fn get_attribute(&self, name: &str) -> Option<String> {
        self.attributes.borrow().get(name).cloned()
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.borrow().contains_key(name)
    }

    fn set_attribute(&self, name: &str, value: &str) {
        self.attributes
            .borrow_mut()
            .insert(name.to_string(), value.to_string());
    }

    /// Inline style property, empty when unset.
    pub fn style_property(&self, name: &str) -> String {
        self.style.borrow().get(name).cloned().unwrap_or_default()
    }

    /// Get the text content.
    pub fn text_content(&self) -> String {
        let mut result = String::new();
        self.collect_text(&mut result);
        result
    }

    fn collect_text(&self, result: &mut String) {
        match &self.node_type {
            NodeType::Text(text) => result.push_str(text),
            _ => {
                for child in self.children.borrow().iter() {
                    child.collect_text(result);
                }
            }
        }
    }

    /// Get parent node.
    pub fn parent(&self) -> Option<Rc<Node>> {
        self.parent.borrow().as_ref().and_then(|w| w.upgrade())
    }

    /// Get child nodes.
    pub fn children(&self) -> Vec<Rc<Node>> {
        self.children.borrow().clone()
    }

    /// Check if this is an element node.
    pub fn is_element(&self) -> bool {
        matches!(self.node_type, NodeType::Element { .. })
    }

    /// Append a child node.
    pub fn append_child(self: &Rc<Self>, child: Rc<Node>) {
        *child.parent.borrow_mut() = Some(Rc::downgrade(self));
        self.children.borrow_mut().push(child);
    }
}

/// A navigation started by activating a link.
#[derive(Debug, Clone, PartialEq)]
pub struct Navigation {
    pub url: Url,
    /// Modifiers held during activation (e.g. meta opens a new tab).
    pub modifiers: Modifiers,
}

struct DocumentInner {
    id: DocumentId,
    /// Root node of the document.
    root: Rc<Node>,
    /// All nodes indexed by ID.
    nodes: RefCell<HashMap<NodeId, Rc<Node>>>,
    /// Elements indexed by ID attribute.
    elements_by_id: RefCell<HashMap<String, NodeId>>,
    /// Next node ID.
    next_id: Cell<usize>,
    /// Listener lists per target, created on first use.
    targets: RefCell<HashMap<EventTargetId, Rc<EventTarget>>>,
    next_listener_id: Cell<u64>,
    active_element: Cell<Option<NodeId>>,
    pointer_captures: RefCell<HashMap<i32, NodeId>>,
    timers: TimerQueue,
    url: RefCell<Option<Url>>,
    navigations: RefCell<Vec<Navigation>>,
}

/// A DOM document together with its window.
#[derive(Clone)]
pub struct Document {
    inner: Rc<DocumentInner>,
}

/// Non-owning handle to a [`Document`], used by listeners that must not keep
/// the page alive.
#[derive(Clone)]
pub struct WeakDocument {
    inner: Weak<DocumentInner>,
}

impl WeakDocument {
    pub fn upgrade(&self) -> Option<Document> {
        self.inner.upgrade().map(|inner| Document { inner })
    }
}

impl Document {
    /// Create a new empty document.
    pub fn new() -> Self {
        let root = Node::new(NodeId::new(0), NodeType::Document);
        let mut nodes = HashMap::new();
        nodes.insert(NodeId::new(0), root.clone());

        Self {
            inner: Rc::new(DocumentInner {
                id: DocumentId::next(),
                root,
                nodes: RefCell::new(nodes),
                elements_by_id: RefCell::new(HashMap::new()),
                next_id: Cell::new(1),
                targets: RefCell::new(HashMap::new()),
                next_listener_id: Cell::new(1),
                active_element: Cell::new(None),
                pointer_captures: RefCell::new(HashMap::new()),
                timers: TimerQueue::new(),
                url: RefCell::new(None),
                navigations: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Parse HTML and create a document.
    pub fn parse_html(html: &str) -> Result<Self, DomError> {
        debug!(len = html.len(), "Parsing HTML");

        let dom = parse_document(RcDom::default(), Default::default())
            .from_utf8()
            .read_from(&mut html.as_bytes())
            .map_err(|e| DomError::ParseError(e.to_string()))?;

        let doc = Document::new();
        doc.convert_rcdom(&dom.document, &doc.inner.root.clone());

        debug!(node_count = doc.inner.nodes.borrow().len(), "HTML parsed");
        Ok(doc)
    }

    fn convert_rcdom(&self, handle: &Handle, parent: &Rc<Node>) {
        for child_handle in handle.children.borrow().iter() {
            let mut attributes = Vec::new();
            let node_type = match &child_handle.data {
                NodeData::Document | NodeData::ProcessingInstruction { .. } => continue,
                NodeData::Doctype { name, .. } => NodeType::DocumentType {
                    name: name.to_string(),
                },
                NodeData::Element { name, attrs, .. } => {
                    for attr in attrs.borrow().iter() {
                        attributes.push((attr.name.local.to_string(), attr.value.to_string()));
                    }
                    NodeType::Element {
                        tag_name: name.local.to_string(),
                        namespace: name.ns.to_string(),
                    }
                }
                NodeData::Text { contents } => NodeType::Text(contents.borrow().to_string()),
                NodeData::Comment { contents } => NodeType::Comment(contents.to_string()),
            };

            let node = self.insert_node(node_type);
            for (name, value) in attributes {
                self.apply_attribute(&node, &name, &value);
            }
            parent.append_child(node.clone());

            // Recurse for children
            self.convert_rcdom(child_handle, &node);
        }
    }

    fn insert_node(&self, node_type: NodeType) -> Rc<Node> {
        let id = NodeId::new(self.inner.next_id.get());
        self.inner.next_id.set(id.raw() + 1);
        let node = Node::new(id, node_type);
        self.inner.nodes.borrow_mut().insert(id, node.clone());
        node
    }

    fn apply_attribute(&self, node: &Rc<Node>, name: &str, value: &str) {
        if name == "id" {
            self.inner
                .elements_by_id
                .borrow_mut()
                .insert(value.to_string(), node.id);
        }
        node.set_attribute(name, value);
    }

    /// Identity of this page.
    pub fn id(&self) -> DocumentId {
        self.inner.id
    }

    pub fn downgrade(&self) -> WeakDocument {
        WeakDocument {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Get the document root.
    pub fn root(&self) -> Rc<Node> {
        self.inner.root.clone()
    }

    /// Get a node by ID.
    pub fn node(&self, id: NodeId) -> Option<Rc<Node>> {
        self.inner.nodes.borrow().get(&id).cloned()
    }

    /// Get an element by ID, failing for unknown or non-element nodes.
    pub fn element(&self, id: NodeId) -> Result<Rc<Node>, DomError> {
        self.node(id)
            .filter(|n| n.is_element())
            .ok_or(DomError::NodeNotFound(id))
    }

    /// Get the document element (<html>).
    pub fn document_element(&self) -> Option<NodeId> {
        self.inner
            .root
            .children()
            .into_iter()
            .find(|n| n.tag_name() == Some("html"))
            .map(|n| n.id)
    }

    /// Get the <body> element.
    pub fn body(&self) -> Option<NodeId> {
        self.node(self.document_element()?)?
            .children()
            .into_iter()
            .find(|n| n.tag_name() == Some("body"))
            .map(|n| n.id)
    }

    /// Get element by ID attribute.
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.inner.elements_by_id.borrow().get(id).copied()
    }

    /// Create a detached element.
    pub fn create_element(&self, tag_name: &str) -> NodeId {
        self.insert_node(NodeType::Element {
            tag_name: tag_name.to_ascii_lowercase(),
            namespace: "http://www.w3.org/1999/xhtml".to_string(),
        })
        .id
    }

    pub fn append_child(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        let parent_node = self.node(parent).ok_or(DomError::NodeNotFound(parent))?;
        let child_node = self.node(child).ok_or(DomError::NodeNotFound(child))?;
        if child_node.parent().is_some() {
            return Err(DomError::InvalidOperation(format!(
                "{child:?} already has a parent"
            )));
        }
        if self.contains(child, parent) {
            return Err(DomError::InvalidOperation(
                "cannot append an ancestor".to_string(),
            ));
        }
        parent_node.append_child(child_node);
        Ok(())
    }

    /// `ancestor.contains(node)`: true when equal or a descendant.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.node(node);
        while let Some(n) = current {
            if n.id == ancestor {
                return true;
            }
            current = n.parent();
        }
        false
    }

    pub fn get_attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.node(node)?.get_attribute(name)
    }

    pub fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let element = self.element(node)?;
        self.apply_attribute(&element, name, value);
        Ok(())
    }

    /// Set the layout box reported by `getBoundingClientRect`.
    pub fn set_bounding_rect(&self, node: NodeId, rect: Rect) -> Result<(), DomError> {
        self.element(node)?.rect.set(rect);
        Ok(())
    }

    /// `getBoundingClientRect`; empty for unknown nodes.
    pub fn bounding_rect(&self, node: NodeId) -> Rect {
        self.node(node).map(|n| n.rect.get()).unwrap_or_default()
    }

    /// Inline style property, empty when unset.
    pub fn style_property(&self, node: NodeId, name: &str) -> String {
        self.node(node)
            .map(|n| n.style_property(name))
            .unwrap_or_default()
    }

    /// Set an inline style property; an empty value removes it.
    pub fn set_style_property(&self, node: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let element = self.element(node)?;
        let mut style = element.style.borrow_mut();
        if value.is_empty() {
            style.remove(name);
        } else {
            style.insert(name.to_string(), value.to_string());
        }
        trace!(node = node.raw(), name, value, "style set");
        Ok(())
    }

    // ==================== Event Listeners ====================

    fn target(&self, id: EventTargetId) -> Rc<EventTarget> {
        self.inner
            .targets
            .borrow_mut()
            .entry(id)
            .or_insert_with(|| Rc::new(EventTarget::new()))
            .clone()
    }

    /// Register a listener on the window, the document, or a node.
    pub fn add_event_listener(
        &self,
        target: EventTargetId,
        event_type: &str,
        callback: EventListenerCallback,
        options: AddEventListenerOptions,
    ) -> ListenerId {
        let raw = self.inner.next_listener_id.get();
        self.inner.next_listener_id.set(raw + 1);
        self.target(target)
            .add_event_listener(raw, event_type, callback, options);
        trace!(?target, event_type, listener = raw, "listener added");
        ListenerId { target, raw }
    }

    /// Remove a listener. Returns false if it was already removed.
    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        let target = self.inner.targets.borrow().get(&id.target).cloned();
        let removed = target.map(|t| t.remove_listener(id.raw)).unwrap_or(false);
        if removed {
            trace!(event_target = ?id.target, listener = id.raw, "listener removed");
        }
        removed
    }

    /// Listeners of a given type on a target.
    pub fn listener_count(&self, target: EventTargetId, event_type: &str) -> usize {
        self.inner
            .targets
            .borrow()
            .get(&target)
            .map(|t| t.listener_count(event_type))
            .unwrap_or(0)
    }

    /// Listeners registered anywhere on the page.
    pub fn total_listener_count(&self) -> usize {
        self.inner.targets.borrow().values().map(|t| t.len()).sum()
    }

    fn event_path(&self, target: EventTargetId) -> Option<Vec<EventTargetId>> {
        let mut path = match target {
            EventTargetId::Window => return Some(vec![EventTargetId::Window]),
            EventTargetId::Document => {
                return Some(vec![EventTargetId::Window, EventTargetId::Document])
            }
            EventTargetId::Node(id) => {
                let mut chain = Vec::new();
                let mut current = Some(self.node(id)?);
                while let Some(node) = current {
                    if node.id == self.inner.root.id {
                        chain.push(EventTargetId::Document);
                        chain.push(EventTargetId::Window);
                        break;
                    }
                    chain.push(EventTargetId::Node(node.id));
                    current = node.parent();
                }
                chain
            }
        };
        path.reverse();
        Some(path)
    }

    /// Dispatch an event at a target. Returns false if a listener called
    /// `preventDefault`.
    pub fn dispatch(&self, target: impl Into<EventTargetId>, event: &DomEvent) -> bool {
        let target = target.into();
        let Some(ids) = self.event_path(target) else {
            warn!(?target, event_type = event.event_type(), "dispatch to unknown node");
            return true;
        };
        let path: Vec<_> = ids.into_iter().map(|id| (id, self.target(id))).collect();
        EventDispatcher::dispatch(event, &path)
    }

    // ==================== Focus ====================

    /// `document.activeElement`, if an element has focus.
    pub fn active_element(&self) -> Option<NodeId> {
        self.inner.active_element.get()
    }

    /// Move focus to `node`, firing blur on the previous element and focus on
    /// the new one. Returns false when the node cannot take focus or already
    /// has it.
    pub fn focus(&self, node: NodeId) -> Result<bool, DomError> {
        let element = self.element(node)?;
        if !element.is_focusable() {
            return Ok(false);
        }
        let previous = self.inner.active_element.get();
        if previous == Some(node) {
            return Ok(false);
        }

        self.inner.active_element.set(Some(node));
        debug!(node = node.raw(), "focus");
        if let Some(prev) = previous {
            self.dispatch(
                prev,
                &DomEvent::focus("blur", FocusEventData { related_target: Some(node) }),
            );
        }
        self.dispatch(
            node,
            &DomEvent::focus("focus", FocusEventData { related_target: previous }),
        );
        Ok(true)
    }

    /// Blur the active element, if any.
    pub fn blur(&self) {
        if let Some(prev) = self.inner.active_element.take() {
            self.dispatch(prev, &DomEvent::focus("blur", FocusEventData::default()));
        }
    }

    /// The window loses focus (e.g. the user switches apps).
    pub fn blur_window(&self) {
        self.dispatch(
            EventTargetId::Window,
            &DomEvent::focus("blur", FocusEventData::default()),
        );
    }

    /// The window regains focus; the active element is refocused.
    pub fn focus_window(&self) {
        self.dispatch(
            EventTargetId::Window,
            &DomEvent::focus("focus", FocusEventData::default()),
        );
        if let Some(active) = self.inner.active_element.get() {
            self.dispatch(active, &DomEvent::focus("focus", FocusEventData::default()));
        }
    }

    // ==================== Pointer Capture ====================

    pub fn set_pointer_capture(&self, node: NodeId, pointer_id: i32) -> Result<(), DomError> {
        self.element(node)?;
        self.inner
            .pointer_captures
            .borrow_mut()
            .insert(pointer_id, node);
        Ok(())
    }

    pub fn has_pointer_capture(&self, node: NodeId, pointer_id: i32) -> bool {
        self.inner.pointer_captures.borrow().get(&pointer_id) == Some(&node)
    }

    /// Release capture held by `node`. Returns false if it held none.
    pub fn release_pointer_capture(&self, node: NodeId, pointer_id: i32) -> bool {
        let mut captures = self.inner.pointer_captures.borrow_mut();
        if captures.get(&pointer_id) == Some(&node) {
            captures.remove(&pointer_id);
            true
        } else {
            false
        }
    }

    // ==================== Navigation ====================

    /// Set the page URL used to resolve relative links.
    pub fn set_url(&self, url: &str) -> Result<(), DomError> {
        *self.inner.url.borrow_mut() = Some(Url::parse(url)?);
        Ok(())
    }

    pub fn url(&self) -> Result<Url, DomError> {
        match self.inner.url.borrow().clone() {
            Some(url) => Ok(url),
            None => Ok(Url::parse(DEFAULT_BASE_URL)?),
        }
    }

    /// Follow the link on an anchor element without dispatching a click.
    pub fn activate_link(&self, node: NodeId, modifiers: Modifiers) -> Result<Url, DomError> {
        let element = self.element(node)?;
        let href = element
            .get_attribute("href")
            .filter(|_| element.is_anchor_link())
            .ok_or_else(|| DomError::InvalidOperation(format!("{node:?} is not a link")))?;
        let url = self.url()?.join(&href)?;
        debug!(%url, "link activated");
        self.inner.navigations.borrow_mut().push(Navigation {
            url: url.clone(),
            modifiers,
        });
        Ok(url)
    }

    /// Navigations started so far, oldest first.
    pub fn navigations(&self) -> Vec<Navigation> {
        self.inner.navigations.borrow().clone()
    }

    /// Fire `beforeunload` at the window.
    pub fn unload(&self) {
        self.dispatch(EventTargetId::Window, &DomEvent::generic("beforeunload"));
    }

    // ==================== Timers ====================

    pub fn set_timeout<F>(&self, callback: F, delay: Duration) -> TimerId
    where
        F: FnOnce() + 'static,
    {
        self.inner.timers.set_timeout(callback, delay)
    }

    pub fn clear_timeout(&self, id: TimerId) -> bool {
        self.inner.timers.clear_timeout(id)
    }

    /// Advance the virtual clock, firing due timers. Returns how many fired.
    pub fn advance_time(&self, by: Duration) -> usize {
        self.inner.timers.advance(by)
    }

    pub fn now(&self) -> Duration {
        self.inner.timers.now()
    }

    pub fn pending_timers(&self) -> usize {
        self.inner.timers.pending()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("id", &self.inner.id)
            .field("nodes", &self.inner.nodes.borrow().len())
            .field("listeners", &self.total_listener_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Test</title></head>
<body><div id="outer"><button id="btn">Press</button></div><a id="link" href="/next">go</a></body>
</html>"#;

    fn recorder(log: &Rc<RefCell<Vec<String>>>, label: &str) -> EventListenerCallback {
        let log = log.clone();
        let label = label.to_string();
        Rc::new(move |e: &DomEvent| {
            log.borrow_mut().push(format!("{label}:{}", e.event_type()))
        })
    }

    #[test]
    fn test_parse_simple_html() {
        let doc = Document::parse_html(PAGE).unwrap();
        assert!(doc.document_element().is_some());
        assert!(doc.body().is_some());

        let btn = doc.get_element_by_id("btn").unwrap();
        let node = doc.node(btn).unwrap();
        assert_eq!(node.tag_name(), Some("button"));
        assert_eq!(node.text_content(), "Press");
    }

    #[test]
    fn test_contains() {
        let doc = Document::parse_html(PAGE).unwrap();
        let outer = doc.get_element_by_id("outer").unwrap();
        let btn = doc.get_element_by_id("btn").unwrap();
        assert!(doc.contains(outer, btn));
        assert!(doc.contains(btn, btn));
        assert!(!doc.contains(btn, outer));
    }

    #[test]
    fn test_create_and_append() {
        let doc = Document::parse_html(PAGE).unwrap();
        let body = doc.body().unwrap();
        let span = doc.create_element("SPAN");
        doc.append_child(body, span).unwrap();
        assert!(doc.contains(body, span));
        assert!(doc.append_child(body, span).is_err());
        assert!(doc.append_child(span, body).is_err());
    }

    #[test]
    fn test_dispatch_path_includes_window_and_document() {
        let doc = Document::parse_html(PAGE).unwrap();
        let btn = doc.get_element_by_id("btn").unwrap();
        let outer = doc.get_element_by_id("outer").unwrap();
        let log = Rc::new(RefCell::new(Vec::new()));

        doc.add_event_listener(EventTargetId::Window, "click", recorder(&log, "window"), AddEventListenerOptions::capture());
        doc.add_event_listener(EventTargetId::Document, "click", recorder(&log, "document"), AddEventListenerOptions::default());
        doc.add_event_listener(outer.into(), "click", recorder(&log, "outer"), AddEventListenerOptions::default());
        doc.add_event_listener(btn.into(), "click", recorder(&log, "btn"), AddEventListenerOptions::default());

        let event = DomEvent::mouse("click", MouseEventData::at(5.0, 5.0));
        assert!(doc.dispatch(btn, &event));
        assert_eq!(
            *log.borrow(),
            vec!["window:click", "btn:click", "outer:click", "document:click"]
        );
        assert_eq!(event.event().composed_path().last(), Some(&EventTargetId::Window));
    }

    #[test]
    fn test_remove_listener_is_idempotent() {
        let doc = Document::parse_html(PAGE).unwrap();
        let log = Rc::new(RefCell::new(Vec::new()));
        let id = doc.add_event_listener(EventTargetId::Document, "keyup", recorder(&log, "doc"), AddEventListenerOptions::default());
        assert_eq!(doc.listener_count(EventTargetId::Document, "keyup"), 1);
        assert!(doc.remove_event_listener(id));
        assert!(!doc.remove_event_listener(id));
        assert_eq!(doc.total_listener_count(), 0);
    }

    #[test]
    fn test_focus_fires_blur_then_focus() {
        let doc = Document::parse_html(PAGE).unwrap();
        let btn = doc.get_element_by_id("btn").unwrap();
        let link = doc.get_element_by_id("link").unwrap();
        let outer = doc.get_element_by_id("outer").unwrap();
        let log = Rc::new(RefCell::new(Vec::new()));
        doc.add_event_listener(btn.into(), "blur", recorder(&log, "btn"), AddEventListenerOptions::default());
        doc.add_event_listener(link.into(), "focus", recorder(&log, "link"), AddEventListenerOptions::default());

        assert!(doc.focus(btn).unwrap());
        assert!(!doc.focus(btn).unwrap());
        assert!(doc.focus(link).unwrap());
        assert!(!doc.focus(outer).unwrap());
        assert_eq!(doc.active_element(), Some(link));
        assert_eq!(*log.borrow(), vec!["btn:blur", "link:focus"]);
    }

    #[test]
    fn test_pointer_capture() {
        let doc = Document::parse_html(PAGE).unwrap();
        let btn = doc.get_element_by_id("btn").unwrap();
        let outer = doc.get_element_by_id("outer").unwrap();
        doc.set_pointer_capture(btn, 3).unwrap();
        assert!(doc.has_pointer_capture(btn, 3));
        assert!(!doc.release_pointer_capture(outer, 3));
        assert!(doc.release_pointer_capture(btn, 3));
        assert!(!doc.has_pointer_capture(btn, 3));
    }

    #[test]
    fn test_style_and_rect() {
        let doc = Document::parse_html(PAGE).unwrap();
        let btn = doc.get_element_by_id("btn").unwrap();
        doc.set_style_property(btn, "user-select", "none").unwrap();
        assert_eq!(doc.style_property(btn, "user-select"), "none");
        doc.set_style_property(btn, "user-select", "").unwrap();
        assert_eq!(doc.style_property(btn, "user-select"), "");

        doc.set_bounding_rect(btn, Rect::new(10.0, 10.0, 100.0, 40.0)).unwrap();
        assert!(doc.bounding_rect(btn).contains_point(50.0, 20.0));
        assert!(Rect::new(0.0, 0.0, 10.0, 10.0).intersects(&Rect::new(10.0, 10.0, 5.0, 5.0)));
    }

    #[test]
    fn test_activate_link() {
        let doc = Document::parse_html(PAGE).unwrap();
        doc.set_url("https://example.com/start").unwrap();
        let link = doc.get_element_by_id("link").unwrap();
        let btn = doc.get_element_by_id("btn").unwrap();

        let url = doc.activate_link(link, Modifiers::new().with_meta()).unwrap();
        assert_eq!(url.as_str(), "https://example.com/next");
        assert!(doc.navigations()[0].modifiers.meta);
        assert!(matches!(
            doc.activate_link(btn, Modifiers::default()),
            Err(DomError::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_dom_error_converts() {
        let err: RustKitError = DomError::NodeNotFound(NodeId::new(99)).into();
        assert_eq!(err.category(), "dom");
    }

    #[test]
    fn test_weak_document() {
        let doc = Document::new();
        let weak = doc.downgrade();
        assert!(weak.upgrade().is_some());
        drop(doc);
        assert!(weak.upgrade().is_none());
    }
}
