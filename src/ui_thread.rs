//! Hand-off onto the UI execution context.
//!
//! Accessibility reads and writes must happen on the main thread, while the
//! pipeline itself runs on the async runtime. `on_ui` bridges the two and
//! hands the job's return value back to the awaiting task.

use anyhow::Result;
use tauri::{AppHandle, Runtime};
use thiserror::Error;
use tokio::sync::oneshot;

pub type UiJob = Box<dyn FnOnce() + Send + 'static>;

pub trait UiExecutor: Send + Sync {
    fn dispatch(&self, job: UiJob) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UiDispatchError {
    #[error("could not schedule work on the UI thread: {0}")]
    Rejected(String),
    #[error("UI thread dropped the job before running it")]
    Dropped,
}

/// Runs `f` on the UI thread and waits for its result.
pub async fn on_ui<F, T>(ui: &dyn UiExecutor, f: F) -> Result<T, UiDispatchError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    ui.dispatch(Box::new(move || {
        let _ = tx.send(f());
    }))
    .map_err(|e| UiDispatchError::Rejected(e.to_string()))?;
    rx.await.map_err(|_| UiDispatchError::Dropped)
}

/// The application's main thread, reached through the Tauri event loop.
pub struct MainThreadExecutor<R: Runtime> {
    app_handle: AppHandle<R>,
}

impl<R: Runtime> MainThreadExecutor<R> {
    pub fn new(app_handle: AppHandle<R>) -> Self {
        Self { app_handle }
    }
}

impl<R: Runtime> UiExecutor for MainThreadExecutor<R> {
    fn dispatch(&self, job: UiJob) -> Result<()> {
        self.app_handle.run_on_main_thread(job)?;
        Ok(())
    }
}
