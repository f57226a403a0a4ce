//! Backend trait: the data sources the orchestrator fetches from
//!
//! Implemented by:
//! - `RestBackend`: REST endpoints under the configured API base URL
//! - `GraphBackend`: Cypher over a graph database's HTTP transaction endpoint
//!
//! Backends return raw JSON. Shape differences are left to the normalizer.

pub mod graph;
pub mod rest;

use crate::error::OrchestratorResult;
use crate::kinds::EntityKind;
use crate::model::FilterMap;
use async_trait::async_trait;
use serde_json::Value;

pub use graph::GraphBackend;
pub use rest::RestBackend;

#[async_trait]
pub trait Backend: Send + Sync {
    /// Entity list, filtered by the non-empty entries of `filters`
    async fn fetch_list(&self, kind: &EntityKind, filters: &FilterMap) -> OrchestratorResult<Value>;

    /// Full profile payload for one entity
    async fn fetch_profile(&self, kind: &EntityKind, id: &str) -> OrchestratorResult<Value>;

    /// Search suggestions for a partial query
    async fn fetch_suggestions(&self, kind: &EntityKind, text: &str) -> OrchestratorResult<Value>;

    /// Shared country list
    async fn fetch_countries(&self) -> OrchestratorResult<Value>;
}
