//! Capture, translate, replace.
//!
//! A run moves `Idle -> Capturing -> Translating -> Replacing -> Idle` and
//! drops back to `Idle` as soon as a step fails. Runs share nothing but the
//! configuration: by default overlapping hotkey presses race each other and
//! the last write wins. With `single_flight` enabled a press that arrives
//! while a run is in flight is turned away instead.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::config::ConfigStore;
use crate::diagnostics::DiagnosticsLog;
use crate::platform::{AccessError, AccessibilityBridge};
use crate::translate::{TranslateError, Translator};
use crate::ui_thread::{on_ui, UiExecutor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Idle,
    Capturing,
    Translating,
    Replacing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Replaced,
    CaptureFailed(AccessError),
    TranslateFailed(TranslateError),
    WriteFailed(AccessError),
    Busy,
    DispatchFailed(String),
}

/// Counts a run as active until it is dropped.
struct ActiveRun<'a>(&'a AtomicUsize);

impl<'a> ActiveRun<'a> {
    /// Only succeeds when no other run is active.
    fn exclusive(active: &'a AtomicUsize) -> Option<Self> {
        active
            .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(active))
    }

    fn shared(active: &'a AtomicUsize) -> Self {
        active.fetch_add(1, Ordering::AcqRel);
        Self(active)
    }
}

impl Drop for ActiveRun<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

pub struct TranslationPipeline<B: AccessibilityBridge> {
    bridge: Arc<B>,
    translator: Arc<dyn Translator>,
    ui: Arc<dyn UiExecutor>,
    config: Arc<ConfigStore>,
    diagnostics: Arc<DiagnosticsLog>,
    active_runs: AtomicUsize,
    run_counter: AtomicU64,
}

impl<B: AccessibilityBridge> TranslationPipeline<B> {
    pub fn new(
        bridge: Arc<B>,
        translator: Arc<dyn Translator>,
        ui: Arc<dyn UiExecutor>,
        config: Arc<ConfigStore>,
        diagnostics: Arc<DiagnosticsLog>,
    ) -> Self {
        Self {
            bridge,
            translator,
            ui,
            config,
            diagnostics,
            active_runs: AtomicUsize::new(0),
            run_counter: AtomicU64::new(0),
        }
    }

    pub fn bridge(&self) -> &B {
        &self.bridge
    }

    pub fn active_runs(&self) -> usize {
        self.active_runs.load(Ordering::Acquire)
    }

    /// Fire-and-forget run on the async runtime. Safe to call from any thread.
    pub fn spawn(self: &Arc<Self>) {
        let pipeline = Arc::clone(self);
        tauri::async_runtime::spawn(async move {
            let outcome = pipeline.run().await;
            tracing::debug!("Pipeline finished: {:?}", outcome);
        });
    }

    pub async fn run(&self) -> RunOutcome {
        let run = self.run_counter.fetch_add(1, Ordering::Relaxed) + 1;

        let _active = if self.config.single_flight() {
            match ActiveRun::exclusive(&self.active_runs) {
                Some(active) => active,
                None => {
                    self.log(run, "translation already in progress, ignoring hotkey");
                    return RunOutcome::Busy;
                }
            }
        } else {
            ActiveRun::shared(&self.active_runs)
        };

        self.enter(run, PipelineStage::Capturing);
        let bridge = Arc::clone(&self.bridge);
        let captured = match on_ui(self.ui.as_ref(), move || bridge.get_focused_text()).await {
            Ok(Ok(captured)) => captured,
            Ok(Err(e)) => {
                self.log(run, &format!("could not read the focused text: {}", e));
                return self.finish(run, RunOutcome::CaptureFailed(e));
            }
            Err(e) => {
                self.log(run, &e.to_string());
                return self.finish(run, RunOutcome::DispatchFailed(e.to_string()));
            }
        };
        self.log(
            run,
            &format!("captured {} characters from the focused field", captured.text.char_count()),
        );

        self.enter(run, PipelineStage::Translating);
        let endpoint = self.config.endpoint();
        let translated = match self.translator.translate(&captured.text, &endpoint).await {
            Ok(translated) => translated,
            Err(e) => {
                self.log(run, &format!("{}; kept original text", e));
                return self.finish(run, RunOutcome::TranslateFailed(e));
            }
        };

        self.enter(run, PipelineStage::Replacing);
        let bridge = Arc::clone(&self.bridge);
        let element = captured.element;
        let written = on_ui(self.ui.as_ref(), move || bridge.set_text(&element, &translated)).await;
        let outcome = match written {
            Ok(Ok(())) => {
                self.log(run, "replaced text");
                RunOutcome::Replaced
            }
            Ok(Err(e)) => {
                self.log(run, &format!("failed to replace text: {}", e));
                RunOutcome::WriteFailed(e)
            }
            Err(e) => {
                self.log(run, &e.to_string());
                RunOutcome::DispatchFailed(e.to_string())
            }
        };
        self.finish(run, outcome)
    }

    fn enter(&self, run: u64, stage: PipelineStage) {
        tracing::debug!("Run #{} -> {:?}", run, stage);
    }

    fn finish(&self, run: u64, outcome: RunOutcome) -> RunOutcome {
        self.enter(run, PipelineStage::Idle);
        outcome
    }

    fn log(&self, run: u64, message: &str) {
        self.diagnostics.log(format!("Run #{}: {}", run, message));
    }
}
