use std::fs;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use portfolio_core::{default_projects, ProjectRecord};
use portfolio_engine::{CompletionSettings, DEFAULT_ENDPOINT, DEFAULT_MODEL};
use serde::{Deserialize, Serialize};
use site_logging::{site_info, site_warn};

const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: ron::error::SpannedError,
    },
}

/// Site configuration, read from a RON file.
///
/// The completion credential is deliberately absent: only the name of the
/// environment variable holding it is configured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub bind: SocketAddr,
    pub owner_name: String,
    pub tagline: String,
    pub completion: CompletionConfig,
    pub session_ttl_secs: u64,
    pub max_sessions: usize,
    pub projects: Option<Vec<ProjectRecord>>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from((Ipv4Addr::LOCALHOST, 8080)),
            owner_name: "Venu".to_string(),
            tagline: "AI & Automation Developer".to_string(),
            completion: CompletionConfig::default(),
            session_ttl_secs: 30 * 60,
            max_sessions: 1024,
            projects: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key_env: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub max_response_bytes: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        let settings = CompletionSettings::default();
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            connect_timeout_secs: settings.connect_timeout.as_secs(),
            request_timeout_secs: settings.request_timeout.as_secs(),
            max_response_bytes: settings.max_bytes,
        }
    }
}

impl SiteConfig {
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    /// Configured projects, or the built-in list.
    pub fn projects(&self) -> Vec<ProjectRecord> {
        self.projects.clone().unwrap_or_else(default_projects)
    }

    /// Builds client settings, resolving the credential through `lookup_env`.
    pub fn completion_settings<F>(&self, lookup_env: F) -> CompletionSettings
    where
        F: Fn(&str) -> Option<String>,
    {
        let completion = &self.completion;
        let api_key = lookup_env(&completion.api_key_env).filter(|key| !key.trim().is_empty());
        if api_key.is_none() {
            site_warn!(
                "No completion credential in ${}; chat replies will fail",
                completion.api_key_env
            );
        }
        CompletionSettings {
            endpoint: completion.endpoint.clone(),
            model: completion.model.clone(),
            api_key,
            connect_timeout: Duration::from_secs(completion.connect_timeout_secs),
            request_timeout: Duration::from_secs(completion.request_timeout_secs),
            max_bytes: completion.max_response_bytes,
        }
    }
}

/// Loads the config file; a missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<SiteConfig, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            site_info!("No config at {:?}; using defaults", path);
            return Ok(SiteConfig::default());
        }
        Err(err) => {
            return Err(ConfigError::Io {
                path: path.display().to_string(),
                source: err,
            });
        }
    };

    let config: SiteConfig = ron::from_str(&content).map_err(|err| ConfigError::Parse {
        path: path.display().to_string(),
        source: err,
    })?;

    site_info!("Loaded config from {:?}", path);
    Ok(config)
}
