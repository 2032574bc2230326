use std::sync::Arc;

use anyhow::Result;
use serde_json::Value;
use tauri::{AppHandle, Runtime};
use tauri_plugin_store::{Store, StoreExt};

use crate::config::{ConfigStore, SettingsBackend};

const STORE_FILE: &str = "settings.json";

/// Settings backed by the store plugin's `settings.json`. Every write is
/// flushed to disk immediately.
pub struct StoreBackend<R: Runtime> {
    store: Option<Arc<Store<R>>>,
}

impl<R: Runtime> StoreBackend<R> {
    pub fn open(app_handle: &AppHandle<R>) -> Self {
        let store = match app_handle.store(STORE_FILE) {
            Ok(s) => Some(s),
            Err(e) => {
                tracing::warn!("Failed to open settings store: {}. Using defaults.", e);
                None
            }
        };
        Self { store }
    }
}

impl<R: Runtime> SettingsBackend for StoreBackend<R> {
    fn get(&self, key: &str) -> Option<Value> {
        self.store.as_ref()?.get(key)
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let store = self
            .store
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Settings store is not available"))?;
        store.set(key, value);
        store.save()?;
        Ok(())
    }
}

pub fn load_config<R: Runtime>(app_handle: &AppHandle<R>) -> ConfigStore {
    let config = ConfigStore::load(Box::new(StoreBackend::open(app_handle)));
    if config.endpoint().is_empty() {
        tracing::info!("No stored API URL found");
    }
    config
}
