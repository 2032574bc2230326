use tauri::{AppHandle, Manager};

use crate::config::Settings;
use crate::platform::AccessibilityBridge;
use crate::state::AppState;

#[tauri::command]
pub fn get_settings(app_handle: AppHandle) -> Settings {
    app_handle.state::<AppState>().config.settings()
}

#[tauri::command]
pub fn set_endpoint(app_handle: AppHandle, url: String) -> Result<String, String> {
    let state = app_handle.state::<AppState>();
    match state.config.set_endpoint(&url) {
        Ok(endpoint) => {
            state
                .diagnostics
                .log(format!("API URL saved: {}", endpoint.as_str()));
            Ok(endpoint.as_str().to_string())
        }
        Err(e) => {
            state.diagnostics.log(format!("Failed to save API URL: {}", e));
            Err(e.to_string())
        }
    }
}

#[tauri::command]
pub fn set_single_flight(app_handle: AppHandle, enabled: bool) -> Result<(), String> {
    let state = app_handle.state::<AppState>();
    state
        .config
        .set_single_flight(enabled)
        .map_err(|e| e.to_string())?;
    tracing::info!("Single-flight translation set to {}", enabled);
    Ok(())
}

#[tauri::command]
pub fn check_accessibility_permission(app_handle: AppHandle) -> bool {
    let state = app_handle.state::<AppState>();
    state.pipeline.bridge().is_accessibility_granted()
}

#[tauri::command]
pub fn request_accessibility_permission(app_handle: AppHandle) -> Result<(), String> {
    let state = app_handle.state::<AppState>();
    state
        .pipeline
        .bridge()
        .request_accessibility()
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub fn get_log_path(app_handle: AppHandle) -> String {
    let state = app_handle.state::<AppState>();
    state.diagnostics.path().display().to_string()
}

#[tauri::command]
pub fn get_app_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
