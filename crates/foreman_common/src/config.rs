//! Foreman Configuration
//!
//! One explicit configuration struct, constructed at process start and passed
//! by reference into each component constructor. Nothing in the engine reads
//! configuration through a global. `from_env()` is the seam to whatever loads
//! the environment (dotenv, systemd unit, container runtime) - that loading
//! itself is outside the engine.

use serde::{Deserialize, Serialize};

/// Minimum accepted base64 image payload length, in characters.
pub const MIN_IMAGE_PAYLOAD_CHARS: usize = 100;

/// Maximum accepted goal length, in characters.
pub const MAX_GOAL_CHARS: usize = 500;

/// How the pipeline reaches a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineMode {
    /// Separate identify-then-plan calls; no tool use.
    TwoStage,
    /// One multimodal call that may run the tool loop.
    Combined,
}

impl Default for PipelineMode {
    fn default() -> Self {
        Self::Combined
    }
}

/// Engine configuration.
///
/// Defaults mirror the reference deployment: an OpenAI-compatible chat
/// endpoint, a Serper-style search endpoint, 60s per-call ceiling, three
/// attempts with 1s exponential backoff, ten tool-loop rounds, six-step plans.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForemanConfig {
    /// Bearer token for the chat endpoint.
    pub api_key: String,
    /// Chat-completions endpoint URL.
    pub chat_url: String,
    /// Model used for calls that carry an image.
    pub vision_model: String,
    /// Model used for text-only planning calls.
    pub text_model: String,
    /// Search endpoint URL.
    pub search_url: String,
    /// Search API key; absent means search degrades to an explicit
    /// "unavailable" tool result.
    #[serde(default)]
    pub search_api_key: Option<String>,
    /// Per-outbound-call timeout ceiling, seconds.
    pub api_timeout_secs: u64,
    /// Total attempts per remote call (first try included).
    pub max_retries: u32,
    /// Base backoff delay in milliseconds; doubled per retry.
    pub retry_base_delay_ms: u64,
    /// Maximum tool-loop rounds before the request fails.
    pub max_tool_iterations: usize,
    /// Steps per plan. The deployment picks one canonical count (5 or 6).
    pub plan_length: usize,
    /// Pipeline shape.
    #[serde(default)]
    pub mode: PipelineMode,
    /// Whether combined mode may run the tool loop.
    pub tool_use: bool,
}

impl Default for ForemanConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            chat_url: "https://api.openai.com/v1/chat/completions".to_string(),
            vision_model: "gpt-4o".to_string(),
            text_model: "gpt-4o-mini".to_string(),
            search_url: "https://google.serper.dev/search".to_string(),
            search_api_key: None,
            api_timeout_secs: 60,
            max_retries: 3,
            retry_base_delay_ms: 1000,
            max_tool_iterations: 10,
            plan_length: 6,
            mode: PipelineMode::Combined,
            tool_use: true,
        }
    }
}

impl ForemanConfig {
    /// Build from environment variables, falling back to defaults.
    ///
    /// Recognized: FOREMAN_API_KEY, FOREMAN_CHAT_URL, FOREMAN_VISION_MODEL,
    /// FOREMAN_TEXT_MODEL, FOREMAN_SEARCH_URL, FOREMAN_SEARCH_API_KEY,
    /// FOREMAN_API_TIMEOUT, FOREMAN_MAX_RETRIES, FOREMAN_PLAN_LENGTH,
    /// FOREMAN_MODE (two_stage|combined), FOREMAN_TOOL_USE (0|1).
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("FOREMAN_API_KEY") {
            config.api_key = v;
        }
        if let Ok(v) = std::env::var("FOREMAN_CHAT_URL") {
            config.chat_url = v;
        }
        if let Ok(v) = std::env::var("FOREMAN_VISION_MODEL") {
            config.vision_model = v;
        }
        if let Ok(v) = std::env::var("FOREMAN_TEXT_MODEL") {
            config.text_model = v;
        }
        if let Ok(v) = std::env::var("FOREMAN_SEARCH_URL") {
            config.search_url = v;
        }
        if let Ok(v) = std::env::var("FOREMAN_SEARCH_API_KEY") {
            if !v.is_empty() {
                config.search_api_key = Some(v);
            }
        }
        if let Ok(v) = std::env::var("FOREMAN_API_TIMEOUT") {
            if let Ok(n) = v.parse() {
                config.api_timeout_secs = n;
            }
        }
        if let Ok(v) = std::env::var("FOREMAN_MAX_RETRIES") {
            if let Ok(n) = v.parse() {
                config.max_retries = n;
            }
        }
        if let Ok(v) = std::env::var("FOREMAN_PLAN_LENGTH") {
            if let Ok(n) = v.parse() {
                config.plan_length = n;
            }
        }
        if let Ok(v) = std::env::var("FOREMAN_MODE") {
            match v.as_str() {
                "two_stage" => config.mode = PipelineMode::TwoStage,
                "combined" => config.mode = PipelineMode::Combined,
                _ => {}
            }
        }
        if let Ok(v) = std::env::var("FOREMAN_TOOL_USE") {
            config.tool_use = v != "0" && !v.eq_ignore_ascii_case("false");
        }

        config
    }

    /// True when the configured plan length is one of the supported counts.
    pub fn plan_length_is_valid(&self) -> bool {
        self.plan_length == 5 || self.plan_length == 6
    }
}
