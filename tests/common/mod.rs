//! Shared test fixtures: a scripted in-memory backend

#![allow(dead_code)]

use async_trait::async_trait;
use intelview::{
    AppConfig, Backend, EntityKind, FilterMap, OrchestratorError, OrchestratorResult,
    SharedContext,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    List(FilterMap),
    Profile(String),
    Suggest(String),
    Countries,
}

/// Backend answering from fixed data after configurable delays. Failure
/// flags are read when a call starts.
#[derive(Default)]
pub struct ScriptedBackend {
    calls: Mutex<Vec<Call>>,
    list_items: Mutex<Vec<(String, String)>>,
    list_delay: Mutex<Duration>,
    profile_delay: Mutex<Duration>,
    suggest_delays: Mutex<HashMap<String, Duration>>,
    fail_list: AtomicBool,
    fail_profile: AtomicBool,
    fail_suggest: AtomicBool,
    fail_countries: AtomicBool,
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Backend whose list endpoint returns `count` equipment rows
    pub fn with_items(count: usize) -> Arc<Self> {
        let backend = Self::default();
        *backend.list_items.lock().unwrap() = (0..count)
            .map(|i| (format!("eq-{}", i), format!("Abrams variant {}", i)))
            .collect();
        Arc::new(backend)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn suggest_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Suggest(q) => Some(q),
                _ => None,
            })
            .collect()
    }

    pub fn profile_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Profile(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn list_calls(&self) -> Vec<FilterMap> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::List(filters) => Some(filters),
                _ => None,
            })
            .collect()
    }

    pub fn set_list_delay(&self, delay: Duration) {
        *self.list_delay.lock().unwrap() = delay;
    }

    pub fn set_profile_delay(&self, delay: Duration) {
        *self.profile_delay.lock().unwrap() = delay;
    }

    pub fn set_suggest_delay(&self, query: &str, delay: Duration) {
        self.suggest_delays
            .lock()
            .unwrap()
            .insert(query.to_string(), delay);
    }

    pub fn fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    pub fn fail_profile(&self, fail: bool) {
        self.fail_profile.store(fail, Ordering::SeqCst);
    }

    pub fn fail_suggest(&self, fail: bool) {
        self.fail_suggest.store(fail, Ordering::SeqCst);
    }

    pub fn fail_countries(&self, fail: bool) {
        self.fail_countries.store(fail, Ordering::SeqCst);
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

fn transport_error() -> OrchestratorError {
    OrchestratorError::Status {
        status: 503,
        url: "http://test".to_string(),
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn fetch_list(&self, _kind: &EntityKind, filters: &FilterMap) -> OrchestratorResult<Value> {
        self.record(Call::List(filters.clone()));
        let fail = self.fail_list.load(Ordering::SeqCst);
        let delay = *self.list_delay.lock().unwrap();
        tokio::time::sleep(delay).await;
        if fail {
            return Err(transport_error());
        }
        let rows: Vec<Value> = self
            .list_items
            .lock()
            .unwrap()
            .iter()
            .map(|(id, name)| json!([id, name]))
            .collect();
        Ok(json!({ "resultRows": rows }))
    }

    async fn fetch_profile(&self, _kind: &EntityKind, id: &str) -> OrchestratorResult<Value> {
        self.record(Call::Profile(id.to_string()));
        let fail = self.fail_profile.load(Ordering::SeqCst);
        let delay = *self.profile_delay.lock().unwrap();
        tokio::time::sleep(delay).await;
        if fail {
            return Err(transport_error());
        }
        Ok(json!({
            "result": {
                "equipment": {
                    "properties": {
                        "id": id,
                        "name": format!("Profile {}", id),
                        "operators": [{"name": "Germany"}, {"name": "Germany"}, {"name": "Poland"}]
                    }
                }
            }
        }))
    }

    async fn fetch_suggestions(&self, _kind: &EntityKind, text: &str) -> OrchestratorResult<Value> {
        self.record(Call::Suggest(text.to_string()));
        let fail = self.fail_suggest.load(Ordering::SeqCst);
        let delay = self
            .suggest_delays
            .lock()
            .unwrap()
            .get(text)
            .copied()
            .unwrap_or_default();
        tokio::time::sleep(delay).await;
        if fail {
            return Err(transport_error());
        }
        Ok(json!({
            "titles": [format!("{} match", text), "Bradley"],
            "events": [format!("{} exercise", text)]
        }))
    }

    async fn fetch_countries(&self) -> OrchestratorResult<Value> {
        self.record(Call::Countries);
        if self.fail_countries.load(Ordering::SeqCst) {
            return Err(transport_error());
        }
        Ok(json!({ "result": ["Syria", "Iraq", "Syria"] }))
    }
}

pub fn ready_context() -> Arc<SharedContext> {
    Arc::new(SharedContext::with_config(AppConfig::with_api("http://test")))
}

pub fn labels(items: &[intelview::EntitySummary]) -> Vec<String> {
    items.iter().map(|s| s.label.clone()).collect()
}
