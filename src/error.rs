//! Error types for the orchestration layer
//!
//! Backends and configuration loading return these errors. The orchestrator
//! absorbs them into its state instead of handing them to callers.

use thiserror::Error;

/// Errors raised by backends, configuration and intent validation
#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// Required configuration (API base URL, graph connection) not installed yet
    #[error("Context not ready")]
    NotReady,

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("Request to {url} returned status {status}")]
    Status { status: u16, url: String },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid or incomplete configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// YAML configuration could not be parsed
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A request exceeded its time budget
    #[error("Request timed out")]
    Timeout,

    /// Entity kind name did not resolve to a preset
    #[error("Unknown entity kind: {0}")]
    UnknownKind(String),

    /// Filter key is not declared by the entity kind
    #[error("Unknown filter '{key}' for entity kind {kind}")]
    UnknownFilter { kind: String, key: String },

    /// Graph database reported statement errors
    #[error("Graph error: {0}")]
    Graph(String),

    /// The shared context was already installed
    #[error("Context already installed")]
    AlreadyInstalled,
}

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
