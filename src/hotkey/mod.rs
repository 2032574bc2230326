#[cfg(target_os = "macos")]
mod event_tap;

use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tauri::{AppHandle, Manager};

use crate::diagnostics::DiagnosticsLog;
use crate::pipeline::TranslationPipeline;
use crate::platform::AccessibilityBridge;
use crate::state::AppState;

#[cfg(target_os = "macos")]
pub const HOTKEY_LABEL: &str = "Cmd+Shift+E";
#[cfg(not(target_os = "macos"))]
pub const HOTKEY_LABEL: &str = "Ctrl+Shift+E";

/// Virtual key code of "E" on an ANSI layout.
pub const KEY_CODE_E: u16 = 14;

const CG_FLAG_SHIFT: u64 = 1 << 17;
const CG_FLAG_CONTROL: u64 = 1 << 18;
const CG_FLAG_ALTERNATE: u64 = 1 << 19;
const CG_FLAG_COMMAND: u64 = 1 << 20;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifierFlags {
    /// Command on macOS, Control elsewhere.
    pub primary: bool,
    pub shift: bool,
    pub alt: bool,
    pub control: bool,
}

impl ModifierFlags {
    #[cfg_attr(not(target_os = "macos"), allow(dead_code))]
    pub fn from_cg_flags(flags: u64) -> Self {
        Self {
            primary: flags & CG_FLAG_COMMAND != 0,
            shift: flags & CG_FLAG_SHIFT != 0,
            alt: flags & CG_FLAG_ALTERNATE != 0,
            control: flags & CG_FLAG_CONTROL != 0,
        }
    }

    /// Decodes the modifier state of a webview key event. The primary
    /// modifier is the Meta key on macOS and Control everywhere else.
    pub fn from_key_press(press: &KeyPress) -> Self {
        Self {
            primary: if cfg!(target_os = "macos") {
                press.meta_key
            } else {
                press.ctrl_key
            },
            shift: press.shift_key,
            alt: press.alt_key,
            control: press.ctrl_key,
        }
    }

    fn contains(&self, other: &ModifierFlags) -> bool {
        (!other.primary || self.primary)
            && (!other.shift || self.shift)
            && (!other.alt || self.alt)
            && (!other.control || self.control)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotkeyCombo {
    pub modifiers: ModifierFlags,
    /// macOS virtual key code, as seen by the event tap.
    #[cfg_attr(not(target_os = "macos"), allow(dead_code))]
    pub key_code: u16,
    /// `KeyboardEvent.code` of the same physical key.
    pub dom_code: &'static str,
}

impl HotkeyCombo {
    pub const TRANSLATE: Self = Self {
        modifiers: ModifierFlags {
            primary: true,
            shift: true,
            alt: false,
            control: false,
        },
        key_code: KEY_CODE_E,
        dom_code: "KeyE",
    };

    /// Extra modifiers held on top of the combination still match.
    #[cfg_attr(not(target_os = "macos"), allow(dead_code))]
    pub fn matches(&self, pressed: ModifierFlags, key_code: u16) -> bool {
        key_code == self.key_code && pressed.contains(&self.modifiers)
    }

    pub fn matches_key_press(&self, press: &KeyPress) -> bool {
        press.code == self.dom_code && ModifierFlags::from_key_press(press).contains(&self.modifiers)
    }

    /// What the settings window needs to recognise the combination before
    /// the default action of the key event runs.
    pub fn binding(&self) -> HotkeyBinding {
        HotkeyBinding {
            code: self.dom_code,
            primary: if cfg!(target_os = "macos") { "metaKey" } else { "ctrlKey" },
            shift: self.modifiers.shift,
            alt: self.modifiers.alt,
        }
    }
}

/// Key-down event as reported by the webview.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPress {
    pub code: String,
    #[serde(default)]
    pub shift_key: bool,
    #[serde(default)]
    pub meta_key: bool,
    #[serde(default)]
    pub ctrl_key: bool,
    #[serde(default)]
    pub alt_key: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HotkeyBinding {
    pub code: &'static str,
    /// Name of the `KeyboardEvent` flag holding the primary modifier.
    pub primary: &'static str,
    pub shift: bool,
    pub alt: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeySource {
    /// System-wide observer; sees key presses meant for other applications.
    Global,
    /// Key presses delivered to our own window.
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyDisposition {
    Propagate,
    Suppress,
}

impl HotkeySource {
    /// The global observer cannot swallow events bound for other apps.
    pub fn disposition(self) -> KeyDisposition {
        match self {
            HotkeySource::Global => KeyDisposition::Propagate,
            HotkeySource::Local => KeyDisposition::Suppress,
        }
    }

    fn log_message(self) -> &'static str {
        match self {
            HotkeySource::Global => "Hotkey pressed",
            HotkeySource::Local => "Local hotkey pressed",
        }
    }
}

pub fn handle_hotkey(app_handle: &AppHandle, source: HotkeySource) -> KeyDisposition {
    let state = app_handle.state::<AppState>();
    dispatch_hotkey(&state.pipeline, &state.diagnostics, source)
}

/// Starts one pipeline run per key-down. No debouncing: a press while a
/// previous run is still translating starts another run.
pub fn dispatch_hotkey<B: AccessibilityBridge>(
    pipeline: &Arc<TranslationPipeline<B>>,
    diagnostics: &DiagnosticsLog,
    source: HotkeySource,
) -> KeyDisposition {
    diagnostics.log(source.log_message());
    pipeline.spawn();
    source.disposition()
}

pub fn register_global_hotkey(app_handle: &AppHandle) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        event_tap::start_key_tap(app_handle)
    }
    #[cfg(not(target_os = "macos"))]
    {
        use tauri_plugin_global_shortcut::GlobalShortcutExt;
        app_handle.global_shortcut().register(global_shortcut())?;
        Ok(())
    }
}

pub fn unregister_global_hotkey() {
    #[cfg(target_os = "macos")]
    event_tap::stop_key_tap();
}

#[cfg(not(target_os = "macos"))]
fn global_shortcut() -> tauri_plugin_global_shortcut::Shortcut {
    use tauri_plugin_global_shortcut::{Code, Modifiers, Shortcut};
    Shortcut::new(Some(Modifiers::CONTROL | Modifiers::SHIFT), Code::KeyE)
}

#[cfg(not(target_os = "macos"))]
pub fn global_shortcut_plugin() -> tauri::plugin::TauriPlugin<tauri::Wry> {
    use tauri_plugin_global_shortcut::ShortcutState;
    tauri_plugin_global_shortcut::Builder::new()
        .with_handler(|app, shortcut, event| {
            // Only act on key press, ignore release
            if event.state() == ShortcutState::Pressed && *shortcut == global_shortcut() {
                handle_hotkey(app, HotkeySource::Global);
            }
        })
        .build()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::pipeline::testing::{FakeDesktop, Harness, ScriptedTranslator};

    fn flags(bits: u64) -> ModifierFlags {
        ModifierFlags::from_cg_flags(bits)
    }

    #[test]
    fn cmd_shift_e_matches() {
        let pressed = flags(CG_FLAG_COMMAND | CG_FLAG_SHIFT);
        assert!(HotkeyCombo::TRANSLATE.matches(pressed, KEY_CODE_E));
    }

    #[test]
    fn extra_modifiers_still_match() {
        let pressed = flags(CG_FLAG_COMMAND | CG_FLAG_SHIFT | CG_FLAG_ALTERNATE | CG_FLAG_CONTROL);
        assert!(HotkeyCombo::TRANSLATE.matches(pressed, KEY_CODE_E));
    }

    #[test]
    fn missing_modifier_or_other_key_does_not_match() {
        assert!(!HotkeyCombo::TRANSLATE.matches(flags(CG_FLAG_COMMAND), KEY_CODE_E));
        assert!(!HotkeyCombo::TRANSLATE.matches(flags(CG_FLAG_SHIFT), KEY_CODE_E));
        assert!(!HotkeyCombo::TRANSLATE.matches(flags(CG_FLAG_CONTROL | CG_FLAG_SHIFT), KEY_CODE_E));
        assert!(!HotkeyCombo::TRANSLATE.matches(flags(CG_FLAG_COMMAND | CG_FLAG_SHIFT), 15));
    }

    #[test]
    fn cg_flags_decode_device_independent_bits() {
        // Caps lock and device-dependent bits are ignored.
        let decoded = flags(CG_FLAG_SHIFT | (1 << 16) | 0x0100);
        assert_eq!(
            decoded,
            ModifierFlags {
                shift: true,
                ..ModifierFlags::default()
            }
        );
    }

    fn primary_shift_e() -> KeyPress {
        KeyPress {
            code: "KeyE".into(),
            shift_key: true,
            meta_key: cfg!(target_os = "macos"),
            ctrl_key: !cfg!(target_os = "macos"),
            ..KeyPress::default()
        }
    }

    #[test]
    fn window_key_press_with_primary_modifier_matches() {
        assert!(HotkeyCombo::TRANSLATE.matches_key_press(&primary_shift_e()));

        let with_alt = KeyPress {
            alt_key: true,
            ..primary_shift_e()
        };
        assert!(HotkeyCombo::TRANSLATE.matches_key_press(&with_alt));
    }

    #[test]
    fn window_key_press_with_secondary_modifier_does_not_match() {
        // Control on macOS, Meta elsewhere.
        let secondary = KeyPress {
            meta_key: !cfg!(target_os = "macos"),
            ctrl_key: cfg!(target_os = "macos"),
            ..primary_shift_e()
        };
        assert!(!HotkeyCombo::TRANSLATE.matches_key_press(&secondary));

        let no_shift = KeyPress {
            shift_key: false,
            ..primary_shift_e()
        };
        assert!(!HotkeyCombo::TRANSLATE.matches_key_press(&no_shift));

        let other_key = KeyPress {
            code: "KeyR".into(),
            ..primary_shift_e()
        };
        assert!(!HotkeyCombo::TRANSLATE.matches_key_press(&other_key));
    }

    #[test]
    fn key_press_decodes_webview_payload() {
        let press: KeyPress = serde_json::from_value(serde_json::json!({
            "code": "KeyE",
            "shiftKey": true,
            "metaKey": true,
            "ctrlKey": false,
            "altKey": false,
        }))
        .unwrap();

        assert_eq!(
            press,
            KeyPress {
                code: "KeyE".into(),
                shift_key: true,
                meta_key: true,
                ..KeyPress::default()
            }
        );
    }

    #[test]
    fn binding_names_the_platform_primary_flag() {
        let binding = HotkeyCombo::TRANSLATE.binding();
        assert_eq!(binding.code, "KeyE");
        assert!(binding.shift);
        assert!(!binding.alt);
        let expected = if cfg!(target_os = "macos") { "metaKey" } else { "ctrlKey" };
        assert_eq!(binding.primary, expected);
    }

    #[test]
    fn disposition_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(KeyDisposition::Suppress).unwrap(),
            serde_json::json!("suppress")
        );
    }

    async fn wait_for_idle_after(h: &Harness, calls: usize) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while h.translator.calls() < calls || h.pipeline.active_runs() > 0 {
            assert!(tokio::time::Instant::now() < deadline, "runs did not finish");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test]
    async fn every_press_starts_its_own_run() {
        let h = Harness::new(
            FakeDesktop::with_focused_text(Some("hello")),
            ScriptedTranslator::replying(Ok("HELLO")),
        );

        let first = dispatch_hotkey(&h.pipeline, &h.diagnostics, HotkeySource::Local);
        let second = dispatch_hotkey(&h.pipeline, &h.diagnostics, HotkeySource::Local);
        wait_for_idle_after(&h, 2).await;

        assert_eq!(first, KeyDisposition::Suppress);
        assert_eq!(second, KeyDisposition::Suppress);
        assert_eq!(h.translator.calls(), 2);
        let lines = h.log_lines();
        assert_eq!(
            lines.iter().filter(|l| l.ends_with("] Local hotkey pressed")).count(),
            2
        );

        let global = dispatch_hotkey(&h.pipeline, &h.diagnostics, HotkeySource::Global);
        wait_for_idle_after(&h, 3).await;

        assert_eq!(global, KeyDisposition::Propagate);
        assert_eq!(h.translator.calls(), 3);
        assert!(h.log_lines().iter().any(|l| l.ends_with("] Hotkey pressed")));
    }

    #[test]
    fn only_local_observer_suppresses() {
        assert_eq!(HotkeySource::Global.disposition(), KeyDisposition::Propagate);
        assert_eq!(HotkeySource::Local.disposition(), KeyDisposition::Suppress);
    }

    #[test]
    fn sources_log_distinct_messages() {
        assert_eq!(HotkeySource::Global.log_message(), "Hotkey pressed");
        assert_eq!(HotkeySource::Local.log_message(), "Local hotkey pressed");
    }
}
