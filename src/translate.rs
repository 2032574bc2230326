use async_trait::async_trait;
use thiserror::Error;

use crate::config::EndpointConfig;
use crate::platform::SourceText;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslateError {
    #[error("invalid API URL: {0}")]
    InvalidEndpoint(String),
    #[error("translation request failed: {0}")]
    NetworkError(String),
    #[error("translation service returned an empty response")]
    EmptyResponse,
}

#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(
        &self,
        text: &SourceText,
        endpoint: &EndpointConfig,
    ) -> Result<String, TranslateError>;
}

/// POSTs `text=<urlencoded>` to the configured endpoint; the whole response
/// body is the translation.
pub struct HttpTranslator {
    client: reqwest::Client,
}

impl HttpTranslator {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpTranslator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Translator for HttpTranslator {
    async fn translate(
        &self,
        text: &SourceText,
        endpoint: &EndpointConfig,
    ) -> Result<String, TranslateError> {
        let url = endpoint.url()?;

        // HTTP status is not inspected: any body the server sends back is the
        // translation, only transport failures count as errors.
        let response = self
            .client
            .post(url)
            .form(&[("text", text.as_str())])
            .send()
            .await
            .map_err(|e| TranslateError::NetworkError(e.to_string()))?;

        tracing::debug!("Translation endpoint answered {}", response.status());

        let body = response
            .bytes()
            .await
            .map_err(|e| TranslateError::NetworkError(e.to_string()))?;

        decode_body(&body)
    }
}

fn decode_body(body: &[u8]) -> Result<String, TranslateError> {
    let text = std::str::from_utf8(body).map_err(|_| TranslateError::EmptyResponse)?;
    if text.trim().is_empty() {
        return Err(TranslateError::EmptyResponse);
    }
    Ok(text.to_string())
}
