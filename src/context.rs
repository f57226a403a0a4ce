//! Shared, set-once context
//!
//! Holds the process-wide configuration (API base URL, image base URL, graph
//! connection) and the shared country list. A top-level owner installs the
//! configuration once; orchestrators only read it. The context is "ready"
//! once a data source is configured. Readiness is broadcast on
//! a watch channel so orchestrators created before install can wait for it.

use crate::backend::Backend;
use crate::config::{AppConfig, GraphConfig, TimingConfig};
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::normalize::normalize_labels;
use std::sync::{Arc, OnceLock};
use tokio::sync::{watch, OnceCell};
use tracing::{debug, info, warn};

pub struct SharedContext {
    config: OnceLock<Arc<AppConfig>>,
    countries: OnceCell<Vec<String>>,
    ready: watch::Sender<bool>,
}

impl SharedContext {
    /// Empty context; everything reports "not ready" until `install`
    pub fn new() -> Self {
        let (ready, _) = watch::channel(false);
        Self {
            config: OnceLock::new(),
            countries: OnceCell::new(),
            ready,
        }
    }

    /// Context with a configuration already installed
    pub fn with_config(config: AppConfig) -> Self {
        let context = Self::new();
        // A fresh context cannot already hold a config
        let _ = context.install(config);
        context
    }

    /// Install the configuration. Only the first call wins.
    pub fn install(&self, config: AppConfig) -> OrchestratorResult<()> {
        let config = Arc::new(config.normalized());
        let ready = config.api_base_url.is_some()
            || config.graph.as_ref().is_some_and(|g| !g.url.is_empty());
        self.config
            .set(config)
            .map_err(|_| OrchestratorError::AlreadyInstalled)?;
        info!("Shared context installed (ready: {})", ready);
        self.ready.send_replace(ready);
        Ok(())
    }

    pub fn api_base_url(&self) -> Option<&str> {
        self.config.get().and_then(|c| c.api_base_url.as_deref())
    }

    pub fn image_base_url(&self) -> Option<&str> {
        self.config.get().and_then(|c| c.image_base_url.as_deref())
    }

    pub fn graph(&self) -> Option<&GraphConfig> {
        self.config.get().and_then(|c| c.graph.as_ref())
    }

    /// Timing knobs, falling back to defaults before install
    pub fn timing(&self) -> TimingConfig {
        self.config
            .get()
            .map(|c| c.timing.clone())
            .unwrap_or_default()
    }

    /// True once a data source (API base URL or graph connection) is available
    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.ready.subscribe()
    }

    /// Resolve when the context becomes ready
    pub async fn wait_ready(&self) {
        let mut rx = self.subscribe();
        // The sender lives as long as `self`, so this cannot fail while borrowed
        let _ = rx.wait_for(|ready| *ready).await;
    }

    /// The shared country list, if it has been loaded
    pub fn countries(&self) -> Option<&[String]> {
        self.countries.get().map(Vec::as_slice)
    }

    /// Load the shared country list once. Failures are not cached, so a
    /// later call can try again; they degrade to an empty list.
    pub async fn load_countries(&self, backend: &dyn Backend) -> Vec<String> {
        if !self.is_ready() {
            debug!("Country list requested before context is ready");
            return Vec::new();
        }

        let loaded = self
            .countries
            .get_or_try_init(|| async {
                let raw = backend.fetch_countries().await?;
                let mut countries = normalize_labels(&raw);
                countries.sort();
                info!("Loaded {} countries", countries.len());
                Ok::<_, OrchestratorError>(countries)
            })
            .await;

        match loaded {
            Ok(countries) => countries.clone(),
            Err(e) => {
                warn!("Failed to load country list: {}", e);
                Vec::new()
            }
        }
    }
}

impl Default for SharedContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_not_ready_until_install() {
        let context = SharedContext::new();
        assert!(!context.is_ready());
        assert!(context.api_base_url().is_none());
        assert_eq!(context.timing(), TimingConfig::default());

        context.install(AppConfig::with_api("http://api.local/")).unwrap();
        assert!(context.is_ready());
        assert_eq!(context.api_base_url(), Some("http://api.local"));
    }

    #[test]
    fn test_install_is_set_once() {
        let context = SharedContext::with_config(AppConfig::with_api("http://a"));
        let second = context.install(AppConfig::with_api("http://b"));
        assert!(matches!(second, Err(OrchestratorError::AlreadyInstalled)));
        assert_eq!(context.api_base_url(), Some("http://a"));
    }

    #[test]
    fn test_config_without_api_is_not_ready() {
        let context = SharedContext::with_config(AppConfig::default());
        assert!(!context.is_ready());
    }

    #[tokio::test]
    async fn test_wait_ready_wakes_on_install() {
        let context = Arc::new(SharedContext::new());
        let waiter = {
            let context = Arc::clone(&context);
            tokio::spawn(async move { context.wait_ready().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        context.install(AppConfig::with_api("http://api.local")).unwrap();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake")
            .unwrap();
    }
}
