//! Error taxonomy for the orchestration engine.
//!
//! Every failure the engine can surface is one of these variants. Components
//! propagate the class unchanged; nothing downgrades an error or returns a
//! partially valid result. The caller-facing status mapping lives here so the
//! front door does not re-classify.

use thiserror::Error;

/// Bound on excerpt length when embedding model output in an error.
pub const SNIPPET_LEN: usize = 160;

#[derive(Error, Debug)]
pub enum ForemanError {
    #[error("Invalid goal: {0}")]
    InvalidGoal(String),

    #[error("Invalid base64 image data: {0}")]
    InvalidImageData(String),

    #[error("Upstream rejected the request ({status}): {detail}")]
    UpstreamClientError { status: u16, detail: String },

    #[error("Upstream server error ({status}): {detail}")]
    UpstreamServerError { status: u16, detail: String },

    #[error("Upstream timeout during {operation}")]
    UpstreamTimeout { operation: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Tool loop did not converge within {iterations} iterations")]
    ToolLoopExceeded { iterations: usize },

    #[error("Malformed model output: {detail} (snippet: {snippet})")]
    MalformedModelOutput { detail: String, snippet: String },

    #[error("Schema validation failed at {field}: expected {constraint}")]
    SchemaValidationFailed { field: String, constraint: String },
}

impl ForemanError {
    /// Build a MalformedModelOutput carrying a bounded excerpt of the text.
    pub fn malformed(detail: impl Into<String>, raw: &str) -> Self {
        Self::MalformedModelOutput {
            detail: detail.into(),
            snippet: snippet(raw),
        }
    }

    /// Build a SchemaValidationFailed naming the offending field.
    pub fn schema(field: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self::SchemaValidationFailed {
            field: field.into(),
            constraint: constraint.into(),
        }
    }

    /// True for failure classes the invoker is allowed to retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::UpstreamServerError { .. } | Self::UpstreamTimeout { .. } | Self::Network(_)
        )
    }

    /// Caller-facing HTTP status for this class.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidGoal(_) | Self::InvalidImageData(_) => 400,
            Self::UpstreamClientError { .. } => 503,
            Self::UpstreamServerError { .. } | Self::Network(_) => 503,
            Self::UpstreamTimeout { .. } => 504,
            Self::ToolLoopExceeded { .. } => 502,
            Self::MalformedModelOutput { .. } | Self::SchemaValidationFailed { .. } => 502,
        }
    }
}

/// Bounded excerpt of model output for diagnostics.
pub fn snippet(raw: &str) -> String {
    if raw.len() <= SNIPPET_LEN {
        raw.to_string()
    } else {
        let mut end = SNIPPET_LEN;
        while !raw.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &raw[..end])
    }
}
