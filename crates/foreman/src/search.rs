//! Web search tool client.
//!
//! The planning model may request a search for a pinout or technical diagram
//! mid-conversation. The search backend is an external collaborator; missing
//! configuration, transport failures, and empty result sets all degrade to an
//! explicit error payload in the tool result instead of failing the pipeline.

use async_trait::async_trait;
use foreman_common::wire::{FunctionSpec, ToolDefinition};
use foreman_common::ForemanConfig;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{info, warn};

use crate::orchestrator::tool_loop::ToolHandler;

/// Capability name advertised to the model.
pub const WEB_SEARCH_TOOL: &str = "web_search";

/// Per-search timeout, well under the model-call ceiling.
const SEARCH_TIMEOUT_SECS: u64 = 10;

/// Best search result for a query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub url: String,
    pub title: String,
    pub snippet: String,
}

/// Search client errors; all of them end up inside a degraded tool payload.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("search not available - API key not configured")]
    NotConfigured,

    #[error("search API error: {0}")]
    Network(String),

    #[error("no results found")]
    NoResults,
}

/// Client for a Serper-style search endpoint.
pub struct SearchClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl SearchClient {
    pub fn new(config: &ForemanConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(SEARCH_TIMEOUT_SECS))
            .user_agent(concat!("foreman/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            endpoint: config.search_url.clone(),
            api_key: config.search_api_key.clone(),
        })
    }

    /// Run a query and return the first organic result.
    pub async fn search(&self, query: &str) -> Result<SearchHit, SearchError> {
        let api_key = self.api_key.as_deref().ok_or(SearchError::NotConfigured)?;

        info!("Web search requested for: {}", query);

        let payload = json!({ "q": query, "num": 3, "gl": "us" });
        let response = self
            .http
            .post(&self.endpoint)
            .header("X-API-KEY", api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| SearchError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SearchError::Network(format!("HTTP {}", response.status())));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SearchError::Network(e.to_string()))?;

        let best = body
            .get("organic")
            .and_then(|v| v.as_array())
            .and_then(|results| results.first())
            .ok_or(SearchError::NoResults)?;

        let hit = SearchHit {
            url: str_field(best, "link"),
            title: str_field(best, "title"),
            snippet: str_field(best, "snippet"),
        };

        info!("Search successful - found: {}", hit.title);
        Ok(hit)
    }
}

fn str_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

/// Degraded tool payload carrying the failure reason; shape mirrors a hit so
/// the model can always read `url` and `snippet`.
pub fn degraded_payload(reason: &str) -> String {
    json!({ "error": reason, "url": "", "snippet": "" }).to_string()
}

#[async_trait]
impl ToolHandler for SearchClient {
    fn name(&self) -> &str {
        WEB_SEARCH_TOOL
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            kind: "function".to_string(),
            function: FunctionSpec {
                name: WEB_SEARCH_TOOL.to_string(),
                description: "Search the web for technical diagrams, pinout guides, or \
                              component documentation. Use when the plan references specific \
                              pins, connectors, or fittings that need a visual reference."
                    .to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "Search query, e.g. 'Raspberry Pi 4 GPIO pinout diagram'"
                        }
                    },
                    "required": ["query"],
                    "additionalProperties": false
                }),
            },
        }
    }

    async fn invoke(&self, arguments: &str) -> String {
        let query = match serde_json::from_str::<Value>(arguments) {
            Ok(args) => match args.get("query").and_then(|q| q.as_str()) {
                Some(q) if !q.trim().is_empty() => q.to_string(),
                _ => {
                    warn!("web_search called without a query argument");
                    return degraded_payload("missing query argument");
                }
            },
            Err(e) => {
                warn!("web_search arguments did not parse: {}", e);
                return degraded_payload("invalid arguments");
            }
        };

        match self.search(&query).await {
            Ok(hit) => serde_json::to_string(&hit)
                .unwrap_or_else(|e| degraded_payload(&format!("result encoding failed: {}", e))),
            Err(e) => {
                warn!("Web search degraded: {}", e);
                degraded_payload(&e.to_string())
            }
        }
    }
}
