//! Application configuration
//!
//! `AppConfig` is built once (from YAML, environment, or code) and installed
//! into a [`SharedContext`](crate::context::SharedContext). It is never
//! mutated afterwards.

use crate::error::OrchestratorResult;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

pub const ENV_API_URL: &str = "INTELVIEW_API_URL";
pub const ENV_IMAGE_URL: &str = "INTELVIEW_IMAGE_URL";
pub const ENV_GRAPH_URL: &str = "INTELVIEW_GRAPH_URL";
pub const ENV_GRAPH_USER: &str = "INTELVIEW_GRAPH_USER";
pub const ENV_GRAPH_PASSWORD: &str = "INTELVIEW_GRAPH_PASSWORD";

/// Top-level configuration consumed by the orchestrators
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the REST API. Absent means "not ready".
    pub api_base_url: Option<String>,
    /// Base URL for entity images
    pub image_base_url: Option<String>,
    /// Optional direct graph database connection
    pub graph: Option<GraphConfig>,
    /// Debounce, limits and timeouts
    pub timing: TimingConfig,
}

/// Graph database connection (HTTP transaction endpoint + basic auth)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphConfig {
    pub url: String,
    pub username: String,
    pub password: String,
    #[serde(default = "default_database")]
    pub database: String,
}

fn default_database() -> String {
    "neo4j".to_string()
}

impl GraphConfig {
    /// Connection to `url` with empty credentials and the default database
    pub fn with_url(url: &str) -> Self {
        Self {
            url: url.to_string(),
            username: String::new(),
            password: String::new(),
            database: default_database(),
        }
    }
}

/// Timing and sizing knobs for the suggestion fetcher and profile loader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Quiet period after the last keystroke before a suggestion request
    pub debounce_ms: u64,
    /// Queries shorter than this show the default list instead
    pub min_query_len: usize,
    /// Cap on suggestion candidates
    pub max_suggestions: usize,
    /// Cap on the default/recent preview list
    pub default_preview_limit: usize,
    /// Profile request budget; 0 disables the timeout
    pub request_timeout_ms: u64,
    /// Transport-level timeout for the HTTP client
    pub http_timeout_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            min_query_len: 3,
            max_suggestions: 50,
            default_preview_limit: 10,
            request_timeout_ms: 30_000,
            http_timeout_ms: 30_000,
        }
    }
}

impl TimingConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_ms > 0).then(|| Duration::from_millis(self.request_timeout_ms))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }
}

impl AppConfig {
    /// Config pointing at a REST API, defaults elsewhere
    pub fn with_api(api_base_url: &str) -> Self {
        Self {
            api_base_url: Some(api_base_url.to_string()),
            ..Self::default()
        }
        .normalized()
    }

    /// Parse a YAML document
    pub fn from_yaml_str(yaml: &str) -> OrchestratorResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        Ok(config.normalized())
    }

    /// Load a YAML file from disk
    pub fn load(path: impl AsRef<Path>) -> OrchestratorResult<Self> {
        let path = path.as_ref();
        debug!("Loading configuration from {:?}", path);
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Overlay environment variables on top of the current values
    pub fn apply_env(self) -> Self {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    fn apply_vars(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = var(ENV_API_URL) {
            self.api_base_url = Some(url);
        }
        if let Some(url) = var(ENV_IMAGE_URL) {
            self.image_base_url = Some(url);
        }
        if let Some(url) = var(ENV_GRAPH_URL) {
            self.graph.get_or_insert_with(|| GraphConfig::with_url("")).url = url;
        }
        if let Some(graph) = self.graph.as_mut() {
            if let Some(user) = var(ENV_GRAPH_USER) {
                graph.username = user;
            }
            if let Some(password) = var(ENV_GRAPH_PASSWORD) {
                graph.password = password;
            }
        }
        self.normalized()
    }

    /// Trim trailing slashes and treat blank URLs as absent
    pub fn normalized(mut self) -> Self {
        self.api_base_url = clean_url(self.api_base_url);
        self.image_base_url = clean_url(self.image_base_url);
        if let Some(graph) = self.graph.as_mut() {
            graph.url = graph.url.trim().trim_end_matches('/').to_string();
        }
        self
    }
}

fn clean_url(url: Option<String>) -> Option<String> {
    url.map(|u| u.trim().trim_end_matches('/').to_string())
        .filter(|u| !u.is_empty())
}
