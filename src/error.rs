//! Error types for esmig.
//!
//! Expected outcomes such as "index already exists" are not errors; they are
//! returned as status enums by the operations in [`crate::es`]. Everything in
//! here aborts the current migration step.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MigrateError>;

#[derive(Error, Debug)]
pub enum MigrateError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("credentials rejected by {endpoint}")]
    Unauthorized { endpoint: String },

    #[error("credential resolution failed: {0}")]
    Credentials(String),

    #[error("engine returned HTTP {status} ({error_type}): {reason}")]
    Engine {
        status: u16,
        error_type: String,
        reason: String,
        /// Raw response body, kept verbatim for the operator.
        body: String,
    },

    #[error(
        "reindex {source_index} -> {dest_index} incomplete: {failures} failures, \
         {version_conflicts} version conflicts, timed out: {timed_out}"
    )]
    Reindex {
        source_index: String,
        dest_index: String,
        failures: usize,
        version_conflicts: u64,
        sample_ids: Vec<String>,
        timed_out: bool,
        body: String,
    },

    #[error("alias conflict on '{alias}': {message}")]
    AliasConflict {
        alias: String,
        message: String,
        body: String,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("missing configuration: {0}")]
    MissingConfig(String),

    #[error("validation failed: {0}")]
    ValidationFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),
}

impl MigrateError {
    /// Stable machine-readable code for robot output.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Connection(_) => "connection_error",
            Self::Unauthorized { .. } => "unauthorized",
            Self::Credentials(_) => "credentials_error",
            Self::Engine { .. } => "engine_error",
            Self::Reindex { .. } => "reindex_error",
            Self::AliasConflict { .. } => "alias_conflict",
            Self::Config(_) => "config_error",
            Self::MissingConfig(_) => "missing_config",
            Self::ValidationFailed(_) => "validation_failed",
            Self::Io(_) => "io_error",
            Self::Serialization(_) => "serialization_error",
            Self::Http(_) => "http_error",
        }
    }

    /// Raw engine diagnostic, when the error carries one.
    pub fn engine_body(&self) -> Option<&str> {
        match self {
            Self::Engine { body, .. }
            | Self::Reindex { body, .. }
            | Self::AliasConflict { body, .. } => Some(body.as_str()),
            _ => None,
        }
        .filter(|body| !body.is_empty())
    }

    /// Build an [`MigrateError::Engine`] from a status code and raw body.
    ///
    /// Elasticsearch errors look like
    /// `{"error":{"type":"...","reason":"..."},"status":400}`; anything else
    /// keeps the body as the reason.
    pub fn from_engine_response(status: u16, body: String) -> Self {
        let parsed: Option<serde_json::Value> = serde_json::from_str(&body).ok();
        let error = parsed.as_ref().and_then(|value| value.get("error"));
        let error_type = error
            .and_then(|err| err.get("type"))
            .and_then(|t| t.as_str())
            .unwrap_or("unknown")
            .to_string();
        let reason = error
            .and_then(|err| err.get("reason").and_then(|r| r.as_str()).or_else(|| err.as_str()))
            .map(ToString::to_string)
            .unwrap_or_else(|| body.trim().to_string());
        Self::Engine {
            status,
            error_type,
            reason,
            body,
        }
    }
}
