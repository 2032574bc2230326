#[cfg(target_os = "macos")]
mod macos;
#[cfg(target_os = "macos")]
pub use macos::*;

#[cfg(not(target_os = "macos"))]
mod unsupported;
#[cfg(not(target_os = "macos"))]
pub use unsupported::*;

use anyhow::Result;
use thiserror::Error;

/// Only the AX bridge produces the coded variants.
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("no focused element (AXError {0})")]
    NoFocusedElement(i32),
    #[error("focused element has no readable text value (AXError {0})")]
    NoTextValue(i32),
    #[error("focused element text is empty")]
    EmptyText,
    #[error("writing the element value was denied (AXError {0})")]
    WriteDenied(i32),
    #[error("accessibility permission not granted")]
    PermissionDenied,
    #[error("accessibility is not supported on this platform")]
    Unsupported,
}

/// Snapshot of an element's value at capture time. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceText(String);

impl SourceText {
    pub fn new(text: impl Into<String>) -> Result<Self, AccessError> {
        let text = text.into();
        if text.is_empty() {
            return Err(AccessError::EmptyText);
        }
        Ok(Self(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn char_count(&self) -> usize {
        self.0.chars().count()
    }
}

/// The element that was focused when the hotkey fired, together with its text.
///
/// The handle is held across the translation round-trip and written back to
/// even if focus has moved elsewhere in the meantime.
pub struct CapturedField<E> {
    pub element: E,
    pub text: SourceText,
}

/// Reads and writes the focused input control through the OS accessibility layer.
///
/// Both calls must be made on the UI thread.
pub trait AccessibilityBridge: Send + Sync + 'static {
    /// Opaque handle to one UI element, owned for a single pipeline run.
    type Element: Send + 'static;

    fn focused_element(&self) -> Result<Self::Element, AccessError>;
    fn read_text(&self, element: &Self::Element) -> Result<String, AccessError>;
    fn set_text(&self, element: &Self::Element, text: &str) -> Result<(), AccessError>;
    fn is_accessibility_granted(&self) -> bool;
    fn request_accessibility(&self) -> Result<()>;

    /// Resolves the focused element fresh and snapshots its text.
    fn get_focused_text(&self) -> Result<CapturedField<Self::Element>, AccessError> {
        let element = self.focused_element()?;
        let text = SourceText::new(self.read_text(&element)?)?;
        Ok(CapturedField { element, text })
    }
}

pub fn system_accessibility() -> SystemAccessibility {
    SystemAccessibility::new()
}
