use std::ptr;

use anyhow::Result;
use core_foundation::base::{CFType, CFTypeRef, TCFType};
use core_foundation::string::{CFString, CFStringRef};

use super::{AccessError, AccessibilityBridge};

type AXUIElementRef = CFTypeRef;
type AXError = i32;

#[link(name = "ApplicationServices", kind = "framework")]
extern "C" {
    fn AXIsProcessTrusted() -> bool;
    fn AXUIElementCreateSystemWide() -> AXUIElementRef;
    fn AXUIElementCopyAttributeValue(
        element: AXUIElementRef,
        attribute: CFStringRef,
        value: *mut CFTypeRef,
    ) -> AXError;
    fn AXUIElementSetAttributeValue(
        element: AXUIElementRef,
        attribute: CFStringRef,
        value: CFTypeRef,
    ) -> AXError;
}

const K_AX_ERROR_SUCCESS: AXError = 0;
const K_AX_ERROR_FAILURE: AXError = -25200;
const K_AX_ERROR_ATTRIBUTE_UNSUPPORTED: AXError = -25205;
const K_AX_ERROR_API_DISABLED: AXError = -25211;
const K_AX_ERROR_NO_VALUE: AXError = -25212;

const K_AX_FOCUSED_UI_ELEMENT_ATTRIBUTE: &str = "AXFocusedUIElement";
const K_AX_VALUE_ATTRIBUTE: &str = "AXValue";

/// Retained `AXUIElementRef`.
pub struct AxElement(CFType);

// AXUIElement is a CF object; retain/release is thread safe and the AX calls
// themselves are only made from the main thread.
unsafe impl Send for AxElement {}

impl AxElement {
    fn as_ref(&self) -> AXUIElementRef {
        self.0.as_CFTypeRef()
    }
}

fn copy_attribute(element: AXUIElementRef, attribute: &str) -> Result<CFType, AXError> {
    let attribute = CFString::new(attribute);
    let mut value: CFTypeRef = ptr::null();
    let err = unsafe {
        AXUIElementCopyAttributeValue(element, attribute.as_concrete_TypeRef(), &mut value)
    };
    if err != K_AX_ERROR_SUCCESS {
        return Err(err);
    }
    if value.is_null() {
        return Err(K_AX_ERROR_NO_VALUE);
    }
    Ok(unsafe { CFType::wrap_under_create_rule(value) })
}

pub struct SystemAccessibility;

impl SystemAccessibility {
    pub fn new() -> Self {
        Self
    }
}

impl AccessibilityBridge for SystemAccessibility {
    type Element = AxElement;

    fn focused_element(&self) -> Result<AxElement, AccessError> {
        let system_wide = unsafe { AXUIElementCreateSystemWide() };
        if system_wide.is_null() {
            return Err(AccessError::NoFocusedElement(K_AX_ERROR_FAILURE));
        }
        let system_wide = unsafe { CFType::wrap_under_create_rule(system_wide) };

        copy_attribute(system_wide.as_CFTypeRef(), K_AX_FOCUSED_UI_ELEMENT_ATTRIBUTE)
            .map(AxElement)
            .map_err(|err| match err {
                K_AX_ERROR_API_DISABLED => AccessError::PermissionDenied,
                other => AccessError::NoFocusedElement(other),
            })
    }

    fn read_text(&self, element: &AxElement) -> Result<String, AccessError> {
        let value = copy_attribute(element.as_ref(), K_AX_VALUE_ATTRIBUTE).map_err(|err| match err {
            K_AX_ERROR_API_DISABLED => AccessError::PermissionDenied,
            other => AccessError::NoTextValue(other),
        })?;
        // Sliders, checkboxes and friends expose non-string values.
        value
            .downcast_into::<CFString>()
            .map(|s| s.to_string())
            .ok_or(AccessError::NoTextValue(K_AX_ERROR_ATTRIBUTE_UNSUPPORTED))
    }

    fn set_text(&self, element: &AxElement, text: &str) -> Result<(), AccessError> {
        let attribute = CFString::new(K_AX_VALUE_ATTRIBUTE);
        let value = CFString::new(text);
        let err = unsafe {
            AXUIElementSetAttributeValue(
                element.as_ref(),
                attribute.as_concrete_TypeRef(),
                value.as_CFTypeRef(),
            )
        };
        match err {
            K_AX_ERROR_SUCCESS => Ok(()),
            K_AX_ERROR_API_DISABLED => Err(AccessError::PermissionDenied),
            other => Err(AccessError::WriteDenied(other)),
        }
    }

    fn is_accessibility_granted(&self) -> bool {
        unsafe { AXIsProcessTrusted() }
    }

    fn request_accessibility(&self) -> Result<()> {
        std::process::Command::new("open")
            .arg("x-apple.systempreferences:com.apple.preference.security?Privacy_Accessibility")
            .spawn()?;
        Ok(())
    }
}

/// Whether this process is the active application, i.e. key events are
/// being delivered to our own windows.
#[allow(unused_unsafe)]
pub fn is_own_app_active() -> bool {
    use objc2_app_kit::NSRunningApplication;
    unsafe { NSRunningApplication::currentApplication().isActive() }
}
