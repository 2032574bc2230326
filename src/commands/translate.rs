use tauri::{AppHandle, Manager};

use crate::hotkey::{self, HotkeyBinding, HotkeyCombo, HotkeySource, KeyDisposition, KeyPress};
use crate::state::AppState;

/// Local observer: the settings window forwards key-downs that look like the
/// hotkey. Only a press matching the combination starts a run.
#[tauri::command]
pub fn local_hotkey(app_handle: AppHandle, press: KeyPress) -> KeyDisposition {
    if !HotkeyCombo::TRANSLATE.matches_key_press(&press) {
        return KeyDisposition::Propagate;
    }
    hotkey::handle_hotkey(&app_handle, HotkeySource::Local)
}

#[tauri::command]
pub fn get_hotkey_binding() -> HotkeyBinding {
    HotkeyCombo::TRANSLATE.binding()
}

/// Runs the pipeline without a key press, e.g. from the tray menu.
#[tauri::command]
pub fn translate_focused(app_handle: AppHandle) {
    let state = app_handle.state::<AppState>();
    state.diagnostics.log("Manual translation requested");
    state.pipeline.spawn();
}

/// Number of translations currently waiting on the service.
#[tauri::command]
pub fn get_active_translations(app_handle: AppHandle) -> usize {
    app_handle.state::<AppState>().pipeline.active_runs()
}
