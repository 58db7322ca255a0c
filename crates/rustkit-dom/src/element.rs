//! # Element metadata
//!
//! Tag- and attribute-derived facts about elements that interaction code
//! needs: input types, link-ness, roles, focusability, editability and
//! drag support.

use crate::{Node, NodeType};

/// Input element types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputType {
    #[default]
    Text,
    Password,
    Email,
    Url,
    Tel,
    Number,
    Search,
    Hidden,
    Submit,
    Button,
    Reset,
    Checkbox,
    Radio,
    File,
    Image,
    Color,
    Date,
    Time,
    Range,
}

impl InputType {
    /// Parse input type from an attribute value (case-insensitive).
    /// Unknown values fall back to `Text`, as browsers do.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "password" => InputType::Password,
            "email" => InputType::Email,
            "url" => InputType::Url,
            "tel" => InputType::Tel,
            "number" => InputType::Number,
            "search" => InputType::Search,
            "hidden" => InputType::Hidden,
            "submit" => InputType::Submit,
            "button" => InputType::Button,
            "reset" => InputType::Reset,
            "checkbox" => InputType::Checkbox,
            "radio" => InputType::Radio,
            "file" => InputType::File,
            "image" => InputType::Image,
            "color" => InputType::Color,
            "date" => InputType::Date,
            "time" => InputType::Time,
            "range" => InputType::Range,
            _ => InputType::Text,
        }
    }

    /// Check if this input type accepts typed text.
    pub fn is_text_input(&self) -> bool {
        !self.is_non_text()
    }

    /// Inputs activated like buttons rather than typed into.
    pub fn is_non_text(&self) -> bool {
        matches!(
            self,
            InputType::Checkbox
                | InputType::Radio
                | InputType::Range
                | InputType::Color
                | InputType::File
                | InputType::Image
                | InputType::Button
                | InputType::Submit
                | InputType::Reset
        )
    }

    /// Check if this is a checkable input.
    pub fn is_checkable(&self) -> bool {
        matches!(self, InputType::Checkbox | InputType::Radio)
    }
}

/// `type` attribute of a `<button>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ButtonType {
    #[default]
    Submit,
    Reset,
    Button,
}

impl Node {
    /// Tag name lowercased, or empty for non-elements.
    fn local_name(&self) -> String {
        self.tag_name().map(|t| t.to_ascii_lowercase()).unwrap_or_default()
    }

    /// `<input>` type, or `None` for other elements.
    pub fn input_type(&self) -> Option<InputType> {
        if self.local_name() != "input" {
            return None;
        }
        Some(
            self.get_attribute("type")
                .map(|t| InputType::from_str(&t))
                .unwrap_or_default(),
        )
    }

    /// `<button>` type, or `None` for other elements.
    pub fn button_type(&self) -> Option<ButtonType> {
        if self.local_name() != "button" {
            return None;
        }
        let kind = match self.get_attribute("type").as_deref().map(str::to_ascii_lowercase) {
            Some(t) if t == "reset" => ButtonType::Reset,
            Some(t) if t == "button" => ButtonType::Button,
            _ => ButtonType::Submit,
        };
        Some(kind)
    }

    pub fn is_textarea(&self) -> bool {
        self.local_name() == "textarea"
    }

    /// An `<a>` with an `href`.
    pub fn is_anchor_link(&self) -> bool {
        self.local_name() == "a" && self.has_attribute("href")
    }

    /// Explicit ARIA role, if any.
    pub fn role(&self) -> Option<String> {
        self.get_attribute("role")
    }

    /// Whether the element, or an ancestor, is `contenteditable`.
    pub fn is_content_editable(&self) -> bool {
        match self.get_attribute("contenteditable").as_deref() {
            Some("false") => false,
            Some(_) => true,
            None => self
                .parent()
                .map(|p| p.is_content_editable())
                .unwrap_or(false),
        }
    }

    /// Whether a drag can start on this element.
    pub fn is_draggable(&self) -> bool {
        match self.get_attribute("draggable").as_deref() {
            Some("true") => true,
            Some(_) => false,
            // images and links are draggable by default
            None => self.local_name() == "img" || self.is_anchor_link(),
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.has_attribute("disabled")
    }

    /// Whether typing into the element edits text.
    pub fn is_text_editable(&self) -> bool {
        self.input_type().map(|t| t.is_text_input()).unwrap_or(false)
            || self.is_textarea()
            || self.is_content_editable()
    }

    /// Whether `focus()` can move focus here.
    pub fn is_focusable(&self) -> bool {
        if !matches!(self.node_type, NodeType::Element { .. }) || self.is_disabled() {
            return false;
        }
        if self.has_attribute("tabindex") || self.is_content_editable() {
            return true;
        }
        match self.local_name().as_str() {
            "button" | "select" | "textarea" => true,
            "input" => self.input_type() != Some(InputType::Hidden),
            "a" => self.is_anchor_link(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::Document;

    #[test]
    fn test_input_type_from_str() {
        use super::InputType;
        assert_eq!(InputType::from_str("CHECKBOX"), InputType::Checkbox);
        assert_eq!(InputType::from_str("bogus"), InputType::Text);
        assert!(InputType::Email.is_text_input());
        assert!(!InputType::Submit.is_text_input());
        assert!(InputType::Radio.is_checkable());
    }

    #[test]
    fn test_element_classification() {
        let doc = Document::parse_html(
            r#"<html><body>
                <a id="link" href="/next">next</a>
                <a id="bare">bare</a>
                <button id="btn">ok</button>
                <button id="reset" type="reset">reset</button>
                <input id="check" type="checkbox">
                <div id="editor" contenteditable><span id="inner">x</span></div>
                <div id="plain" role="button">x</div>
            </body></html>"#,
        )
        .unwrap();

        let get = |id: &str| doc.node(doc.get_element_by_id(id).unwrap()).unwrap();

        assert!(get("link").is_anchor_link());
        assert!(get("link").is_draggable());
        assert!(!get("bare").is_anchor_link());
        assert!(!get("bare").is_focusable());
        assert_eq!(get("btn").button_type(), Some(super::ButtonType::Submit));
        assert_eq!(get("reset").button_type(), Some(super::ButtonType::Reset));
        assert_eq!(get("check").input_type(), Some(super::InputType::Checkbox));
        assert!(!get("check").is_text_editable());
        assert!(get("inner").is_content_editable());
        assert!(get("inner").is_text_editable());
        assert_eq!(get("plain").role().as_deref(), Some("button"));
        assert!(!get("plain").is_focusable());
    }
}
