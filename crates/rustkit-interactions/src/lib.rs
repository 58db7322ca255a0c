//! # RustKit Interactions
//!
//! Turns device-specific input (pointer, mouse, touch, keyboard and
//! assistive-technology clicks) into device-independent gestures.
//!
//! ## Components
//!
//! - [`PressController`]: press lifecycle (`pressstart`, `pressup`,
//!   `pressend`, `press`) for one element
//! - [`LongPressController`]: long-press refinement layered on a press
//! - [`MoveController`]: drag deltas from pointer, mouse, touch or arrow keys
//! - [`ModalityTracker`]: page-wide keyboard/pointer/virtual classification
//!   that drives focus-ring visibility
//! - [`HoverController`] and [`KeyboardController`]: thin element bindings
//!   sharing the same plumbing
//!
//! All of them share an [`Interactions`] context and run on the page's
//! single thread. Element listeners are registered through [`Binding`]s and
//! gesture-scoped document/window listeners through [`GlobalListeners`];
//! both are removed deterministically on drop.

use rustkit_common::RustKitError;
use rustkit_dom::{DocumentId, DomError};
use thiserror::Error;

pub mod config;
pub mod context;
pub mod event_handler;
pub mod events;
pub mod global_listeners;
pub mod hover;
pub mod keyboard;
pub mod long_press;
pub mod modality;
pub mod move_gesture;
pub mod pointer;
pub mod press;
pub mod text_selection;

pub use config::{DisabledFlag, InteractionConfig, Os, Platform};
pub use context::Interactions;
pub use event_handler::{create_event_handler, BaseEvent, BaseEventHandler};
pub use events::{
    HoverEvent, HoverEventType, LongPressEvent, LongPressEventType, MoveEvent, MoveEventType,
    PressEvent, PressEventType,
};
pub use global_listeners::{Binding, GlobalListeners, ListenerKey};
pub use hover::{HoverCallbacks, HoverController};
pub use keyboard::{KeyboardCallbacks, KeyboardController};
pub use long_press::{LongPressCallbacks, LongPressController, LongPressOptions};
pub use modality::{
    Modality, ModalityChange, ModalityHandler, ModalitySubscription, ModalityTracker,
};
pub use move_gesture::{MoveCallbacks, MoveController};
pub use pointer::{NativeEventType, NativeInput, PointerType};
pub use press::{PressCallbacks, PressController, PressHandlers, PressOptions};
pub use text_selection::TextSelection;

/// Errors raised at the engine's boundary.
///
/// Gesture handling itself never fails: operations on a gesture that is not
/// in progress are no-ops.
#[derive(Error, Debug)]
pub enum InteractionError {
    #[error("Unknown event type: {0}")]
    UnknownEventType(String),

    #[error("Modality tracking is not attached to document {0:?}")]
    NotAttached(DocumentId),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Dom(#[from] DomError),
}

impl From<InteractionError> for RustKitError {
    fn from(err: InteractionError) -> Self {
        match err {
            InteractionError::InvalidConfig(message) => RustKitError::config(message),
            InteractionError::Dom(dom) => dom.into(),
            other => RustKitError::interaction_with_source(other.to_string(), other),
        }
    }
}
