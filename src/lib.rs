//! Intelview: entity-profile data orchestration
//!
//! The client-side core of an intelligence-analysis dashboard: everything
//! between the rendering layer and the backend APIs for the entity views
//! (equipment, organizations, installations, military groups, NSAG actors).
//!
//! # Architecture
//!
//! - **`backend`**: `Backend` trait with `RestBackend` (REST API) and
//!   `GraphBackend` (graph database HTTP transaction endpoint)
//! - **`normalize`**: pure mapping of heterogeneous payloads onto
//!   `EntityProfile` / `EntitySummary`
//! - **`suggest`**: debounced suggestion fetching with generation tokens
//! - **`profile`**: selection-keyed profile loading with identity guards
//! - **`orchestrator`**: one generic `EntityOrchestrator` per entity kind
//! - **`kinds`**: `EntityKind` builder and the five presets
//! - **`config` / `context`**: immutable configuration, installed once into
//!   a `SharedContext`
//! - **`images`**: image URL resolution for profiles
//!
//! # Example
//!
//! ```no_run
//! use intelview::{AppConfig, EntityKind, EntityOrchestrator, RestBackend, SharedContext};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let context = Arc::new(SharedContext::with_config(AppConfig::with_api("http://localhost:5000/api")));
//!     let backend = Arc::new(RestBackend::new(Arc::clone(&context)));
//!     let equipment = EntityOrchestrator::new(EntityKind::equipment(), context, backend);
//!
//!     equipment.start();
//!     equipment.search("Abr");
//!     equipment.select_by_id("eq-1");
//!
//!     let view = equipment.settled().await;
//!     println!("{} suggestions", view.search.candidates.len());
//! }
//! ```

#![warn(clippy::all)]

pub mod backend;
pub mod config;
pub mod context;
pub mod debounce;
pub mod error;
pub mod images;
pub mod kinds;
pub mod model;
pub mod normalize;
pub mod notify;
pub mod orchestrator;
pub mod profile;
pub mod suggest;

// Re-export main types for convenience
pub use backend::{Backend, GraphBackend, RestBackend};
pub use config::{AppConfig, GraphConfig, TimingConfig};
pub use context::SharedContext;
pub use error::{OrchestratorError, OrchestratorResult};
pub use images::ImageResolver;
pub use kinds::{EntityKind, EntityKindBuilder, ListMethod};
pub use model::{
    EntityProfile, EntitySummary, FilterMap, ListSnapshot, ListStatus, SearchSnapshot,
    SearchStatus, SelectionSnapshot, SelectionStatus,
};
pub use normalize::{normalize_list, normalize_profile, normalize_suggestions};
pub use orchestrator::{EntityOrchestrator, OrchestratorView};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
