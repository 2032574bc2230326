use std::sync::RwLock;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::translate::TranslateError;

pub const ENDPOINT_KEY: &str = "APIURL";
pub const SINGLE_FLIGHT_KEY: &str = "single_flight";

/// Translation service URL as typed by the user. Only validated when a
/// translation is attempted, so an invalid value can still be stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EndpointConfig(String);

impl EndpointConfig {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn url(&self) -> Result<Url, TranslateError> {
        if self.0.is_empty() {
            return Err(TranslateError::InvalidEndpoint("API URL is empty".to_string()));
        }
        let url = Url::parse(&self.0)
            .map_err(|e| TranslateError::InvalidEndpoint(format!("{}: {}", self.0, e)))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(TranslateError::InvalidEndpoint(format!(
                "{}: unsupported scheme '{}'",
                self.0, other
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub endpoint: EndpointConfig,
    /// Reject a hotkey press while another translation is still running.
    pub single_flight: bool,
}

/// Key-value storage the settings are persisted to.
pub trait SettingsBackend: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&self, key: &str, value: Value) -> Result<()>;
}

pub struct ConfigStore {
    settings: RwLock<Settings>,
    backend: Box<dyn SettingsBackend>,
}

impl ConfigStore {
    pub fn load(backend: Box<dyn SettingsBackend>) -> Self {
        let endpoint = match backend.get(ENDPOINT_KEY) {
            Some(Value::String(url)) => EndpointConfig::new(url),
            Some(other) => {
                tracing::warn!("Ignoring non-string stored API URL: {}", other);
                EndpointConfig::default()
            }
            None => EndpointConfig::default(),
        };
        let single_flight = backend
            .get(SINGLE_FLIGHT_KEY)
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        Self {
            settings: RwLock::new(Settings {
                endpoint,
                single_flight,
            }),
            backend,
        }
    }

    pub fn settings(&self) -> Settings {
        self.read().clone()
    }

    pub fn endpoint(&self) -> EndpointConfig {
        self.read().endpoint.clone()
    }

    pub fn single_flight(&self) -> bool {
        self.read().single_flight
    }

    /// Trims, stores and persists a new endpoint. Returns what was stored.
    pub fn set_endpoint(&self, raw: &str) -> Result<EndpointConfig> {
        let endpoint = EndpointConfig::new(raw);
        self.write().endpoint = endpoint.clone();
        self.backend
            .set(ENDPOINT_KEY, Value::String(endpoint.as_str().to_string()))?;
        Ok(endpoint)
    }

    pub fn set_single_flight(&self, enabled: bool) -> Result<()> {
        self.write().single_flight = enabled;
        self.backend.set(SINGLE_FLIGHT_KEY, Value::Bool(enabled))
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Settings> {
        self.settings.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Settings> {
        self.settings.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use super::*;

    /// In-memory backend sharing its map so tests can inspect what was persisted.
    #[derive(Clone, Default)]
    pub struct MemoryBackend {
        pub values: Arc<Mutex<HashMap<String, Value>>>,
    }

    impl MemoryBackend {
        pub fn with(key: &str, value: Value) -> Self {
            let backend = Self::default();
            backend.values.lock().unwrap().insert(key.to_string(), value);
            backend
        }
    }

    impl SettingsBackend for MemoryBackend {
        fn get(&self, key: &str) -> Option<Value> {
            self.values.lock().unwrap().get(key).cloned()
        }

        fn set(&self, key: &str, value: Value) -> Result<()> {
            self.values.lock().unwrap().insert(key.to_string(), value);
            Ok(())
        }
    }

    pub fn store_with_endpoint(url: &str) -> ConfigStore {
        ConfigStore::load(Box::new(MemoryBackend::with(
            ENDPOINT_KEY,
            Value::String(url.to_string()),
        )))
    }
}
