use std::sync::Arc;

use tauri::AppHandle;

use crate::config::ConfigStore;
use crate::diagnostics::DiagnosticsLog;
use crate::pipeline::TranslationPipeline;
use crate::platform::SystemAccessibility;
use crate::translate::HttpTranslator;
use crate::ui_thread::MainThreadExecutor;

pub type AppPipeline = TranslationPipeline<SystemAccessibility>;

pub struct AppState {
    pub config: Arc<ConfigStore>,
    pub diagnostics: Arc<DiagnosticsLog>,
    pub pipeline: Arc<AppPipeline>,
}

impl AppState {
    pub fn new(app_handle: &AppHandle, config: ConfigStore, diagnostics: Arc<DiagnosticsLog>) -> Self {
        let config = Arc::new(config);
        let pipeline = Arc::new(TranslationPipeline::new(
            Arc::new(crate::platform::system_accessibility()),
            Arc::new(HttpTranslator::new()),
            Arc::new(MainThreadExecutor::new(app_handle.clone())),
            config.clone(),
            diagnostics.clone(),
        ));
        Self {
            config,
            diagnostics,
            pipeline,
        }
    }
}
