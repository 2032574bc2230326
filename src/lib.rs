mod commands;
mod config;
mod diagnostics;
mod hotkey;
mod persistence;
mod pipeline;
mod platform;
mod state;
mod translate;
mod ui_thread;

use std::sync::Arc;

use diagnostics::DiagnosticsLog;
use platform::AccessibilityBridge;
use state::AppState;
use tauri::{
    menu::{Menu, MenuItem, PredefinedMenuItem},
    tray::{MouseButton, MouseButtonState, TrayIconBuilder, TrayIconEvent},
    App, AppHandle, Emitter, Manager,
};
use tauri_plugin_opener::OpenerExt;
use tracing_subscriber::EnvFilter;

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("Starting TextFieldTrans v{}", env!("CARGO_PKG_VERSION"));

    let diagnostics = Arc::new(DiagnosticsLog::at_default_location());
    tracing::info!("Writing diagnostics to {}", diagnostics.path().display());

    let builder = tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .plugin(tauri_plugin_store::Builder::new().build());
    #[cfg(not(target_os = "macos"))]
    let builder = builder.plugin(hotkey::global_shortcut_plugin());

    let setup_diagnostics = diagnostics.clone();
    let app = builder
        .invoke_handler(tauri::generate_handler![
            commands::translate::local_hotkey,
            commands::translate::get_hotkey_binding,
            commands::translate::translate_focused,
            commands::translate::get_active_translations,
            commands::settings::get_settings,
            commands::settings::set_endpoint,
            commands::settings::set_single_flight,
            commands::settings::check_accessibility_permission,
            commands::settings::request_accessibility_permission,
            commands::settings::get_log_path,
            commands::settings::get_app_version,
        ])
        .setup(move |app| {
            #[cfg(target_os = "macos")]
            {
                use objc2_app_kit::NSApplication;
                use objc2_app_kit::NSApplicationActivationPolicy;
                let mtm = unsafe { objc2::MainThreadMarker::new_unchecked() };
                let ns_app = NSApplication::sharedApplication(mtm);
                ns_app.setActivationPolicy(NSApplicationActivationPolicy::Accessory);
            }

            let diagnostics = setup_diagnostics;
            diagnostics.log("Application did finish launching");

            let config = persistence::load_config(app.handle());
            let endpoint = config.endpoint();
            if !endpoint.is_empty() {
                diagnostics.log(format!("Loaded saved API URL: {}", endpoint.as_str()));
            }
            app.manage(AppState::new(app.handle(), config, diagnostics.clone()));

            build_tray(app)?;

            // Registration failure leaves the app running without a global hotkey
            match hotkey::register_global_hotkey(app.handle()) {
                Ok(()) => tracing::info!("Global hotkey {} registered", hotkey::HOTKEY_LABEL),
                Err(e) => diagnostics.log(format!(
                    "Failed to register global hotkey {}: {}",
                    hotkey::HOTKEY_LABEL,
                    e
                )),
            }

            if let Some(window) = app.get_webview_window("main") {
                let w = window.clone();
                window.on_window_event(move |event| {
                    if let tauri::WindowEvent::CloseRequested { api, .. } = event {
                        api.prevent_close();
                        let _ = w.hide();
                    }
                });
            }

            let accessibility_ok = app
                .state::<AppState>()
                .pipeline
                .bridge()
                .is_accessibility_granted();
            if !accessibility_ok {
                diagnostics.log("Accessibility permission not granted; text fields cannot be read");
                let _ = app.emit(
                    "permission-missing",
                    serde_json::json!({ "permission": "accessibility" }),
                );
            }

            tracing::info!("App setup complete");

            Ok(())
        })
        .build(tauri::generate_context!())
        .expect("error while building tauri application");

    app.run(move |_app_handle, event| {
        if let tauri::RunEvent::Exit = event {
            hotkey::unregister_global_hotkey();
            diagnostics.log("Application will terminate");
        }
    });
}

fn show_settings_window(app: &AppHandle) {
    if let Some(window) = app.get_webview_window("main") {
        let _ = window.show();
        let _ = window.set_focus();
    }
}

fn build_tray(app: &App) -> tauri::Result<()> {
    let hotkey_label = MenuItem::with_id(
        app,
        "hotkey_label",
        format!("Translate field: {}", hotkey::HOTKEY_LABEL),
        false,
        None::<&str>,
    )?;
    let translate_now = MenuItem::with_id(
        app,
        "translate_now",
        "Translate Focused Field",
        true,
        None::<&str>,
    )?;
    let show_settings = MenuItem::with_id(
        app,
        "show_settings",
        "Preferences...",
        true,
        Some("CmdOrCtrl+,"),
    )?;
    let open_log = MenuItem::with_id(app, "open_log", "Open Log File", true, None::<&str>)?;
    let quit = MenuItem::with_id(app, "quit", "Quit", true, Some("CmdOrCtrl+Q"))?;

    let separator1 = PredefinedMenuItem::separator(app)?;
    let separator2 = PredefinedMenuItem::separator(app)?;

    let menu = Menu::with_items(
        app,
        &[
            &hotkey_label,
            &translate_now,
            &separator1,
            &show_settings,
            &open_log,
            &separator2,
            &quit,
        ],
    )?;

    let mut tray = TrayIconBuilder::new()
        .menu(&menu)
        .tooltip("TextFieldTrans")
        .on_menu_event(|app, event| match event.id.as_ref() {
            "translate_now" => {
                commands::translate::translate_focused(app.clone());
            }
            "show_settings" => show_settings_window(app),
            "open_log" => {
                let state = app.state::<AppState>();
                let path = state.diagnostics.path().display().to_string();
                if let Err(e) = app.opener().open_path(path, None::<&str>) {
                    tracing::warn!("Failed to open log file: {}", e);
                }
            }
            "quit" => {
                app.exit(0);
            }
            _ => {}
        })
        .on_tray_icon_event(|tray, event| {
            if let TrayIconEvent::Click {
                button: MouseButton::Left,
                button_state: MouseButtonState::Up,
                ..
            } = event
            {
                show_settings_window(tray.app_handle());
            }
        });
    if let Some(icon) = app.default_window_icon() {
        tray = tray.icon(icon.clone()).icon_as_template(true);
    }
    tray.build(app)?;

    Ok(())
}
