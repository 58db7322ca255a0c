//! # Text selection
//!
//! Disables text selection while a press or drag is in progress.
//!
//! On most platforms the pressed element's inline `user-select` is set to
//! `none` and put back afterwards, unless something else changed it in the
//! meantime. iOS ignores `user-select` on individual elements, so there the
//! whole document element is switched with `-webkit-user-select` and restored
//! after a delay, once the tap's own selection handling has settled.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use rustkit_dom::{Document, DocumentId, NodeId};
use tracing::{debug, warn};

use crate::config::Platform;

const USER_SELECT: &str = "user-select";
const WEBKIT_USER_SELECT: &str = "-webkit-user-select";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum IosState {
    #[default]
    Default,
    Disabled,
    Restoring,
}

#[derive(Debug, Default)]
struct IosDocument {
    state: IosState,
    saved_user_select: String,
}

#[derive(Debug, Default)]
struct SelectionState {
    ios: HashMap<DocumentId, IosDocument>,
    /// Inline `user-select` of each element before it was disabled.
    saved: HashMap<(DocumentId, NodeId), String>,
}

/// Shared text-selection switch for every document the engine touches.
#[derive(Clone)]
pub struct TextSelection {
    platform: Platform,
    restore_delay: Duration,
    state: Rc<RefCell<SelectionState>>,
}

impl TextSelection {
    pub fn new(platform: Platform, restore_delay: Duration) -> Self {
        Self {
            platform,
            restore_delay,
            state: Rc::new(RefCell::new(SelectionState::default())),
        }
    }

    /// Disable selection for `target` (or the whole page on iOS).
    pub fn disable(&self, document: &Document, target: Option<NodeId>) {
        if self.platform.is_ios() {
            let Some(root) = document.document_element() else {
                return;
            };
            let mut state = self.state.borrow_mut();
            let entry = state.ios.entry(document.id()).or_default();
            if entry.state == IosState::Default {
                entry.saved_user_select = document.style_property(root, WEBKIT_USER_SELECT);
                set_style(document, root, WEBKIT_USER_SELECT, "none");
            }
            entry.state = IosState::Disabled;
            debug!("text selection disabled on document");
            return;
        }

        let Some(node) = target else {
            return;
        };
        let current = document.style_property(node, USER_SELECT);
        self.state
            .borrow_mut()
            .saved
            .entry((document.id(), node))
            .or_insert(current);
        set_style(document, node, USER_SELECT, "none");
    }

    /// Undo [`disable`](Self::disable).
    pub fn restore(&self, document: &Document, target: Option<NodeId>) {
        if self.platform.is_ios() {
            {
                let mut state = self.state.borrow_mut();
                let Some(entry) = state.ios.get_mut(&document.id()) else {
                    return;
                };
                if entry.state != IosState::Disabled {
                    return;
                }
                entry.state = IosState::Restoring;
            }

            let selection = self.clone();
            let weak_document = document.downgrade();
            document.set_timeout(
                move || {
                    if let Some(document) = weak_document.upgrade() {
                        selection.finish_ios_restore(&document);
                    }
                },
                self.restore_delay,
            );
            return;
        }

        let Some(node) = target else {
            return;
        };
        let saved = self.state.borrow_mut().saved.remove(&(document.id(), node));
        if let Some(saved) = saved {
            if document.style_property(node, USER_SELECT) == "none" {
                set_style(document, node, USER_SELECT, &saved);
            }
        }
    }

    fn finish_ios_restore(&self, document: &Document) {
        let saved = {
            let mut state = self.state.borrow_mut();
            let Some(entry) = state.ios.get_mut(&document.id()) else {
                return;
            };
            // a new press may have disabled selection again meanwhile
            if entry.state != IosState::Restoring {
                return;
            }
            entry.state = IosState::Default;
            std::mem::take(&mut entry.saved_user_select)
        };

        if let Some(root) = document.document_element() {
            if document.style_property(root, WEBKIT_USER_SELECT) == "none" {
                set_style(document, root, WEBKIT_USER_SELECT, &saved);
            }
        }
        debug!("text selection restored on document");
    }

    /// Whether `target` currently has selection disabled by this helper.
    pub fn is_disabled(&self, document: &Document, target: NodeId) -> bool {
        let state = self.state.borrow();
        if self.platform.is_ios() {
            return state
                .ios
                .get(&document.id())
                .map(|d| d.state != IosState::Default)
                .unwrap_or(false);
        }
        state.saved.contains_key(&(document.id(), target))
    }
}

fn set_style(document: &Document, node: NodeId, name: &str, value: &str) {
    if let Err(err) = document.set_style_property(node, name, value) {
        warn!(error = %err, name, "could not update selection style");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Os;

    fn page() -> (Document, NodeId) {
        let doc = Document::parse_html("<html><body><div id='t'>text</div></body></html>").unwrap();
        let node = doc.get_element_by_id("t").unwrap();
        (doc, node)
    }

    #[test]
    fn test_disable_and_restore_element() {
        let (doc, node) = page();
        doc.set_style_property(node, "user-select", "text").unwrap();
        let selection = TextSelection::new(Platform::default(), Duration::from_millis(300));

        selection.disable(&doc, Some(node));
        assert_eq!(doc.style_property(node, "user-select"), "none");
        assert!(selection.is_disabled(&doc, node));

        selection.restore(&doc, Some(node));
        assert_eq!(doc.style_property(node, "user-select"), "text");
        assert!(!selection.is_disabled(&doc, node));
    }

    #[test]
    fn test_restore_keeps_foreign_changes() {
        let (doc, node) = page();
        let selection = TextSelection::new(Platform::default(), Duration::from_millis(300));
        selection.disable(&doc, Some(node));
        doc.set_style_property(node, "user-select", "all").unwrap();
        selection.restore(&doc, Some(node));
        assert_eq!(doc.style_property(node, "user-select"), "all");
    }

    #[test]
    fn test_double_disable_keeps_original() {
        let (doc, node) = page();
        let selection = TextSelection::new(Platform::default(), Duration::from_millis(300));
        selection.disable(&doc, Some(node));
        selection.disable(&doc, Some(node));
        selection.restore(&doc, Some(node));
        assert_eq!(doc.style_property(node, "user-select"), "");
    }

    #[test]
    fn test_ios_restores_after_delay() {
        let (doc, node) = page();
        let root = doc.document_element().unwrap();
        let selection = TextSelection::new(Platform::new(Os::Ios), Duration::from_millis(300));

        selection.disable(&doc, Some(node));
        assert_eq!(doc.style_property(root, "-webkit-user-select"), "none");
        assert_eq!(doc.style_property(node, "user-select"), "");

        selection.restore(&doc, Some(node));
        assert_eq!(doc.style_property(root, "-webkit-user-select"), "none");
        doc.advance_time(Duration::from_millis(300));
        assert_eq!(doc.style_property(root, "-webkit-user-select"), "");
        assert!(!selection.is_disabled(&doc, node));
    }

    #[test]
    fn test_ios_press_during_restore_wins() {
        let (doc, node) = page();
        let root = doc.document_element().unwrap();
        let selection = TextSelection::new(Platform::new(Os::Ios), Duration::from_millis(300));

        selection.disable(&doc, Some(node));
        selection.restore(&doc, Some(node));
        doc.advance_time(Duration::from_millis(100));
        selection.disable(&doc, Some(node));
        doc.advance_time(Duration::from_millis(300));
        assert_eq!(doc.style_property(root, "-webkit-user-select"), "none");
    }
}
