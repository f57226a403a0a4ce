//! GraphBackend: direct graph database access
//!
//! Runs the entity kind's Cypher templates against the database's HTTP
//! transaction endpoint (`/db/{database}/tx/commit`) with basic auth, and
//! reshapes the row sets into the payloads the REST API returns:
//! lists become `{columns, resultRows}`, profiles become `{result: [row]}`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::debug;

use crate::backend::rest::filter_body;
use crate::backend::Backend;
use crate::config::GraphConfig;
use crate::context::SharedContext;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::kinds::EntityKind;
use crate::model::FilterMap;

const COUNTRY_QUERY: &str = "MATCH (c:Country) RETURN c.name AS name ORDER BY name";

#[derive(Serialize)]
struct Statement<'a> {
    statement: &'a str,
    parameters: Value,
}

#[derive(Serialize)]
struct CommitRequest<'a> {
    statements: Vec<Statement<'a>>,
}

#[derive(Deserialize)]
struct CommitResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    #[serde(default)]
    errors: Vec<StatementError>,
}

#[derive(Deserialize)]
struct StatementResult {
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    data: Vec<RowData>,
}

#[derive(Deserialize)]
struct RowData {
    #[serde(default)]
    row: Vec<Value>,
}

#[derive(Deserialize)]
struct StatementError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// Tabular result of one statement
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl RowSet {
    /// `{columns, resultRows}` list payload
    pub fn into_list_payload(self) -> Value {
        json!({ "columns": self.columns, "resultRows": self.rows })
    }

    /// `{result: [rowObject, ...]}` profile payload
    pub fn into_profile_payload(self) -> Value {
        let rows: Vec<Value> = self
            .rows
            .into_iter()
            .map(|cells| {
                let row: Map<String, Value> = self.columns.iter().cloned().zip(cells).collect();
                Value::Object(row)
            })
            .collect();
        json!({ "result": rows })
    }
}

pub struct GraphBackend {
    context: Arc<SharedContext>,
    http_client: Client,
}

impl GraphBackend {
    pub fn new(context: Arc<SharedContext>) -> Self {
        Self {
            context,
            http_client: Client::new(),
        }
    }

    fn connection(&self) -> OrchestratorResult<&GraphConfig> {
        self.context
            .graph()
            .filter(|graph| !graph.url.is_empty())
            .ok_or(OrchestratorError::NotReady)
    }

    /// Execute one statement and return its rows
    pub async fn run(&self, statement: &str, parameters: Value) -> OrchestratorResult<RowSet> {
        let graph = self.connection()?;
        let url = format!("{}/db/{}/tx/commit", graph.url, graph.database);
        debug!("Graph statement on {}: {}", url, statement);

        let body = CommitRequest {
            statements: vec![Statement { statement, parameters }],
        };
        let response = self
            .http_client
            .post(&url)
            .basic_auth(&graph.username, Some(&graph.password))
            .timeout(self.context.timing().http_timeout())
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(OrchestratorError::Status {
                status: response.status().as_u16(),
                url,
            });
        }

        let result: CommitResponse = response.json().await?;
        parse_commit(result)
    }

    fn template<'a>(&self, kind: &'a EntityKind, query: Option<&'a String>) -> OrchestratorResult<&'a str> {
        query
            .map(String::as_str)
            .ok_or_else(|| OrchestratorError::Config(format!("No graph query configured for {}", kind.name)))
    }
}

fn parse_commit(response: CommitResponse) -> OrchestratorResult<RowSet> {
    if let Some(error) = response.errors.first() {
        return Err(OrchestratorError::Graph(format!("{}: {}", error.code, error.message)));
    }
    let result = response.results.into_iter().next().unwrap_or(StatementResult {
        columns: Vec::new(),
        data: Vec::new(),
    });
    Ok(RowSet {
        columns: result.columns,
        rows: result.data.into_iter().map(|d| d.row).collect(),
    })
}

#[async_trait]
impl Backend for GraphBackend {
    async fn fetch_list(&self, kind: &EntityKind, filters: &FilterMap) -> OrchestratorResult<Value> {
        let statement = self.template(kind, kind.list_query.as_ref())?;
        let rows = self.run(statement, filter_body(filters)).await?;
        Ok(rows.into_list_payload())
    }

    async fn fetch_profile(&self, kind: &EntityKind, id: &str) -> OrchestratorResult<Value> {
        let statement = self.template(kind, kind.profile_query.as_ref())?;
        let rows = self.run(statement, json!({ "id": id })).await?;
        Ok(rows.into_profile_payload())
    }

    async fn fetch_suggestions(&self, kind: &EntityKind, _text: &str) -> OrchestratorResult<Value> {
        // Matching happens client side, against the unfiltered list
        self.fetch_list(kind, &FilterMap::new()).await
    }

    async fn fetch_countries(&self) -> OrchestratorResult<Value> {
        let rows = self.run(COUNTRY_QUERY, json!({})).await?;
        Ok(rows.into_list_payload())
    }
}
