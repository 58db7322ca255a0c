//! Engine configuration: platform facts and gesture timings.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use crate::InteractionError;

/// Default long-press threshold.
pub const DEFAULT_LONG_PRESS_THRESHOLD: Duration = Duration::from_millis(500);
/// How long a touch long press keeps suppressing `contextmenu` after release.
pub const DEFAULT_CONTEXT_MENU_GRACE: Duration = Duration::from_millis(30);
/// Delay before iOS text selection is restored after a press.
pub const DEFAULT_IOS_SELECTION_RESTORE_DELAY: Duration = Duration::from_millis(300);
/// Window after a touch during which emulated mouse events are ignored for hover.
pub const DEFAULT_EMULATED_MOUSE_WINDOW: Duration = Duration::from_millis(50);
/// How long a mouse press waits for the `click` that follows `pointerup`.
pub const DEFAULT_CLICK_TIMEOUT: Duration = Duration::from_millis(80);

/// Operating system the page runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Os {
    Windows,
    MacOs,
    #[default]
    Linux,
    Ios,
    Android,
}

/// Platform facts that change how input must be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    pub os: Os,
    /// Whether the page delivers unified pointer events. When false the
    /// legacy mouse and touch families are used.
    pub pointer_events: bool,
}

impl Platform {
    pub fn new(os: Os) -> Self {
        Self {
            os,
            pointer_events: true,
        }
    }

    pub fn with_pointer_events(mut self, pointer_events: bool) -> Self {
        self.pointer_events = pointer_events;
        self
    }

    pub fn is_mac(&self) -> bool {
        self.os == Os::MacOs
    }

    pub fn is_ios(&self) -> bool {
        self.os == Os::Ios
    }

    pub fn is_android(&self) -> bool {
        self.os == Os::Android
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::new(Os::default())
    }
}

/// Interaction engine configuration.
#[derive(Debug, Clone)]
pub struct InteractionConfig {
    pub platform: Platform,
    pub long_press_threshold: Duration,
    pub context_menu_grace: Duration,
    pub ios_selection_restore_delay: Duration,
    pub emulated_mouse_window: Duration,
    pub click_timeout: Duration,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            platform: Platform::default(),
            long_press_threshold: DEFAULT_LONG_PRESS_THRESHOLD,
            context_menu_grace: DEFAULT_CONTEXT_MENU_GRACE,
            ios_selection_restore_delay: DEFAULT_IOS_SELECTION_RESTORE_DELAY,
            emulated_mouse_window: DEFAULT_EMULATED_MOUSE_WINDOW,
            click_timeout: DEFAULT_CLICK_TIMEOUT,
        }
    }
}

impl InteractionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn with_long_press_threshold(mut self, threshold: Duration) -> Self {
        self.long_press_threshold = threshold;
        self
    }

    pub fn with_context_menu_grace(mut self, grace: Duration) -> Self {
        self.context_menu_grace = grace;
        self
    }

    pub fn with_ios_selection_restore_delay(mut self, delay: Duration) -> Self {
        self.ios_selection_restore_delay = delay;
        self
    }

    pub fn with_click_timeout(mut self, timeout: Duration) -> Self {
        self.click_timeout = timeout;
        self
    }

    /// Reject configurations no gesture can work with.
    pub fn validate(&self) -> Result<(), InteractionError> {
        if self.long_press_threshold.is_zero() {
            return Err(InteractionError::InvalidConfig(
                "long_press_threshold must be non-zero".to_string(),
            ));
        }
        if self.click_timeout.is_zero() {
            return Err(InteractionError::InvalidConfig(
                "click_timeout must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Live `isDisabled` flag shared between a controller and its owner.
#[derive(Debug, Clone, Default)]
pub struct DisabledFlag(Rc<Cell<bool>>);

impl DisabledFlag {
    pub fn new(disabled: bool) -> Self {
        Self(Rc::new(Cell::new(disabled)))
    }

    pub fn get(&self) -> bool {
        self.0.get()
    }

    pub fn set(&self, disabled: bool) {
        self.0.set(disabled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = InteractionConfig::default();
        assert_eq!(config.long_press_threshold, Duration::from_millis(500));
        assert_eq!(config.context_menu_grace, Duration::from_millis(30));
        assert!(config.platform.pointer_events);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let config = InteractionConfig::new().with_long_press_threshold(Duration::ZERO);
        assert!(matches!(
            config.validate(),
            Err(InteractionError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_platform() {
        let mac = Platform::new(Os::MacOs).with_pointer_events(false);
        assert!(mac.is_mac());
        assert!(!mac.pointer_events);
        assert!(!mac.is_ios());
    }

    #[test]
    fn test_disabled_flag_is_shared() {
        let flag = DisabledFlag::default();
        let copy = flag.clone();
        copy.set(true);
        assert!(flag.get());
    }
}
