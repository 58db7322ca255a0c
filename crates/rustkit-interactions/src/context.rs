//! Shared services every controller is created from.

use std::fmt;
use std::rc::Rc;

use rustkit_dom::Document;

use crate::config::{InteractionConfig, Platform};
use crate::hover::EmulatedMouse;
use crate::modality::ModalityTracker;
use crate::text_selection::TextSelection;
use crate::InteractionError;

/// Configuration plus the page-wide services (modality tracking, text
/// selection, emulated mouse suppression). Clones share state.
#[derive(Clone)]
pub struct Interactions {
    config: Rc<InteractionConfig>,
    tracker: ModalityTracker,
    selection: TextSelection,
    emulated_mouse: EmulatedMouse,
}

impl Interactions {
    pub fn new(config: InteractionConfig) -> Result<Self, InteractionError> {
        config.validate()?;
        Ok(Self::from_valid(config))
    }

    fn from_valid(config: InteractionConfig) -> Self {
        Self {
            tracker: ModalityTracker::new(config.platform),
            selection: TextSelection::new(config.platform, config.ios_selection_restore_delay),
            emulated_mouse: EmulatedMouse::new(config.emulated_mouse_window),
            config: Rc::new(config),
        }
    }

    pub fn config(&self) -> &InteractionConfig {
        &self.config
    }

    pub fn platform(&self) -> Platform {
        self.config.platform
    }

    pub fn tracker(&self) -> &ModalityTracker {
        &self.tracker
    }

    pub fn text_selection(&self) -> &TextSelection {
        &self.selection
    }

    pub(crate) fn emulated_mouse(&self) -> &EmulatedMouse {
        &self.emulated_mouse
    }

    /// Start modality tracking on a page.
    pub fn attach(&self, document: &Document) {
        self.tracker.attach(document);
    }

    pub fn detach(&self, document: &Document) -> Result<(), InteractionError> {
        self.tracker.detach(document)
    }
}

impl Default for Interactions {
    fn default() -> Self {
        Self::from_valid(InteractionConfig::default())
    }
}

impl fmt::Debug for Interactions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interactions")
            .field("config", &self.config)
            .field("tracker", &self.tracker)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_rejects_invalid_config() {
        let config = InteractionConfig::new().with_long_press_threshold(Duration::ZERO);
        assert!(Interactions::new(config).is_err());
    }

    #[test]
    fn test_clones_share_tracker() {
        let ctx = Interactions::default();
        let copy = ctx.clone();
        copy.tracker().set_interaction_modality(crate::Modality::Virtual);
        assert_eq!(
            ctx.tracker().interaction_modality(),
            Some(crate::Modality::Virtual)
        );
    }
}
