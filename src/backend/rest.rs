//! RestBackend: HTTP client for the dashboard's REST API
//!
//! Reads the API base URL from the shared context at call time, so a backend
//! can be created before the configuration is installed.

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use crate::backend::Backend;
use crate::context::SharedContext;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::kinds::{EntityKind, ListMethod};
use crate::model::FilterMap;

/// Characters left unescaped in query values
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

fn encode(value: &str) -> String {
    utf8_percent_encode(value, QUERY_VALUE).to_string()
}

/// `?k=v&k=v2` from key/value pairs; empty when there are none
pub fn query_string<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    let encoded: Vec<String> = pairs
        .into_iter()
        .map(|(key, value)| format!("{}={}", encode(key), encode(value)))
        .collect();
    if encoded.is_empty() {
        String::new()
    } else {
        format!("?{}", encoded.join("&"))
    }
}

/// Filters as repeated pairs; keys with no values are omitted
fn filter_pairs(filters: &FilterMap) -> Vec<(&str, &str)> {
    filters
        .iter()
        .flat_map(|(key, values)| values.iter().map(move |v| (key.as_str(), v.as_str())))
        .collect()
}

/// JSON body for POST list requests; keys with no values are omitted
pub fn filter_body(filters: &FilterMap) -> Value {
    let filters: serde_json::Map<String, Value> = filters
        .iter()
        .filter(|(_, values)| !values.is_empty())
        .map(|(key, values)| (key.clone(), json!(values)))
        .collect();
    json!({ "filters": filters })
}

pub struct RestBackend {
    context: Arc<SharedContext>,
    http_client: Client,
}

impl RestBackend {
    pub fn new(context: Arc<SharedContext>) -> Self {
        Self {
            context,
            http_client: Client::new(),
        }
    }

    fn base_url(&self) -> OrchestratorResult<&str> {
        self.context.api_base_url().ok_or(OrchestratorError::NotReady)
    }

    fn url(&self, endpoint: &str) -> OrchestratorResult<String> {
        Ok(format!("{}/{}", self.base_url()?, endpoint.trim_start_matches('/')))
    }

    async fn send(&self, request: RequestBuilder, url: &str) -> OrchestratorResult<Value> {
        let response = request
            .timeout(self.context.timing().http_timeout())
            .send()
            .await?;

        if response.status().is_success() {
            let body: Value = response.json().await?;
            Ok(body)
        } else {
            Err(OrchestratorError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            })
        }
    }

    async fn get_json(&self, url: String) -> OrchestratorResult<Value> {
        debug!("GET {}", url);
        self.send(self.http_client.get(&url), &url).await
    }
}

#[async_trait]
impl Backend for RestBackend {
    async fn fetch_list(&self, kind: &EntityKind, filters: &FilterMap) -> OrchestratorResult<Value> {
        let url = self.url(&kind.list_endpoint)?;
        match kind.list_method {
            ListMethod::Get => {
                let url = format!("{}{}", url, query_string(filter_pairs(filters)));
                self.get_json(url).await
            }
            ListMethod::Post => {
                debug!("POST {}", url);
                let request = self.http_client.post(&url).json(&filter_body(filters));
                self.send(request, &url).await
            }
        }
    }

    async fn fetch_profile(&self, kind: &EntityKind, id: &str) -> OrchestratorResult<Value> {
        let url = self.url(&kind.profile_endpoint)?;
        self.get_json(format!("{}{}", url, query_string([("id", id)]))).await
    }

    async fn fetch_suggestions(&self, kind: &EntityKind, text: &str) -> OrchestratorResult<Value> {
        let url = self.url(&kind.suggestion_endpoint)?;
        self.get_json(format!("{}{}", url, query_string([("q", text)]))).await
    }

    async fn fetch_countries(&self) -> OrchestratorResult<Value> {
        let url = self.url("countries")?;
        self.get_json(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn test_query_string_encoding() {
        assert_eq!(query_string(Vec::<(&str, &str)>::new()), "");
        assert_eq!(query_string([("q", "Abra")]), "?q=Abra");
        assert_eq!(query_string([("q", "T-72 B3&x")]), "?q=T-72%20B3%26x");
    }

    #[test]
    fn test_filter_pairs_repeat_keys() {
        let mut filters = FilterMap::new();
        filters.insert("type".to_string(), vec!["tank".to_string(), "ifv".to_string()]);
        filters.insert("role".to_string(), vec![]);
        assert_eq!(
            query_string(filter_pairs(&filters)),
            "?type=tank&type=ifv"
        );
    }

    #[test]
    fn test_filter_body_omits_empty() {
        let mut filters = FilterMap::new();
        filters.insert("branch".to_string(), vec!["navy".to_string()]);
        filters.insert("echelon".to_string(), vec![]);
        assert_eq!(filter_body(&filters), json!({"filters": {"branch": ["navy"]}}));
    }

    #[tokio::test]
    async fn test_not_ready_without_base_url() {
        let backend = RestBackend::new(Arc::new(SharedContext::new()));
        let result = backend.fetch_profile(&EntityKind::equipment(), "eq-1").await;
        assert!(matches!(result, Err(OrchestratorError::NotReady)));
    }

    #[test]
    fn test_url_joins_endpoint() {
        let context = Arc::new(SharedContext::with_config(AppConfig::with_api("http://api.local/")));
        let backend = RestBackend::new(context);
        assert_eq!(
            backend.url(&EntityKind::military_group().profile_endpoint).unwrap(),
            "http://api.local/military-groups/profile"
        );
    }
}
