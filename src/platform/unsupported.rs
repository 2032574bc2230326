use anyhow::Result;

use super::{AccessError, AccessibilityBridge};

/// Bridge for platforms without an accessibility backend. Every call fails.
pub struct SystemAccessibility;

impl SystemAccessibility {
    pub fn new() -> Self {
        Self
    }
}

impl AccessibilityBridge for SystemAccessibility {
    type Element = ();

    fn focused_element(&self) -> Result<(), AccessError> {
        Err(AccessError::Unsupported)
    }

    fn read_text(&self, _element: &()) -> Result<String, AccessError> {
        Err(AccessError::Unsupported)
    }

    fn set_text(&self, _element: &(), _text: &str) -> Result<(), AccessError> {
        Err(AccessError::Unsupported)
    }

    fn is_accessibility_granted(&self) -> bool {
        false
    }

    fn request_accessibility(&self) -> Result<()> {
        anyhow::bail!("Accessibility permission is only available on macOS")
    }
}
