use std::fmt;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use site_logging::{site_debug, site_warn};

use crate::types::CompletionResponse;
use crate::{CompletionError, CompletionRequest, FailureKind};

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4";

#[derive(Clone)]
pub struct CompletionSettings {
    pub endpoint: String,
    pub model: String,
    /// Bearer credential. Only ever held server-side.
    pub api_key: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_bytes: u64,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_bytes: 1024 * 1024,
        }
    }
}

impl fmt::Debug for CompletionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionSettings")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_deref().map(site_logging::redact))
            .field("connect_timeout", &self.connect_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("max_bytes", &self.max_bytes)
            .finish()
    }
}

#[async_trait::async_trait]
pub trait Completer: Send + Sync {
    /// Sends `text` as a single-message conversation and returns the reply text.
    async fn complete(&self, text: &str) -> Result<String, CompletionError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestCompleter {
    settings: CompletionSettings,
    endpoint: reqwest::Url,
    client: reqwest::Client,
}

impl ReqwestCompleter {
    pub fn new(settings: CompletionSettings) -> Result<Self, CompletionError> {
        let endpoint = reqwest::Url::parse(&settings.endpoint)
            .map_err(|err| CompletionError::new(FailureKind::InvalidEndpoint, err.to_string()))?;

        // Never follow redirects: the bearer header must only reach the configured host.
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|err| CompletionError::new(FailureKind::Network, err.to_string()))?;

        Ok(Self {
            settings,
            endpoint,
            client,
        })
    }

    fn api_key(&self) -> Result<&str, CompletionError> {
        self.settings
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                CompletionError::new(FailureKind::MissingCredential, "no api key configured")
            })
    }
}

#[async_trait::async_trait]
impl Completer for ReqwestCompleter {
    async fn complete(&self, text: &str) -> Result<String, CompletionError> {
        let api_key = self.api_key()?;
        let request = CompletionRequest::single(&self.settings.model, text);
        let body = serde_json::to_vec(&request)
            .map_err(|err| CompletionError::new(FailureKind::Network, err.to_string()))?;

        site_debug!(
            "Completion request model={} text_len={}",
            self.settings.model,
            text.len()
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(api_key)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            site_warn!("Completion endpoint returned {}", status);
            return Err(CompletionError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let max_bytes = self.settings.max_bytes;
        if let Some(content_len) = response.content_length() {
            if content_len > max_bytes {
                return Err(CompletionError::new(
                    FailureKind::TooLarge {
                        max_bytes,
                        actual: Some(content_len),
                    },
                    "response too large",
                ));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > max_bytes {
                return Err(CompletionError::new(
                    FailureKind::TooLarge {
                        max_bytes,
                        actual: Some(next_len),
                    },
                    "response too large",
                ));
            }
            bytes.extend_from_slice(&chunk);
        }

        extract_reply(&bytes)
    }
}

/// Pulls `choices[0].message.content` out of a completion response body.
pub fn extract_reply(body: &[u8]) -> Result<String, CompletionError> {
    let parsed: CompletionResponse = serde_json::from_slice(body)
        .map_err(|err| CompletionError::new(FailureKind::MalformedResponse, err.to_string()))?;

    let choices = parsed.choices.ok_or_else(|| {
        CompletionError::new(FailureKind::MissingCompletion, "response has no choices")
    })?;

    choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .ok_or_else(|| {
            CompletionError::new(
                FailureKind::MissingCompletion,
                "first choice has no message content",
            )
        })
}

fn map_reqwest_error(err: reqwest::Error) -> CompletionError {
    if err.is_timeout() {
        return CompletionError::new(FailureKind::Timeout, err.to_string());
    }
    CompletionError::new(FailureKind::Network, err.to_string())
}
