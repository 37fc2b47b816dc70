// ── Core error types ──
//
// Errors surfaced by resource CRUD entry points. Transport failures from
// octodeploy-api are translated into domain variants so callers never
// match on raw HTTP details. Configuration problems carry the offending
// attribute name.

use thiserror::Error;

use crate::diagnostics::Diagnostics;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Configuration errors ─────────────────────────────────────────
    #[error("Invalid value for \"{field}\": {reason}")]
    Validation { field: String, reason: String },

    #[error("Unsupported {field} \"{value}\"")]
    UnsupportedVariant { field: String, value: String },

    #[error("{0}")]
    Diagnostics(Diagnostics),

    #[error("Unknown resource type: {name}")]
    UnknownResourceType { name: String },

    #[error("Provider configuration error: {message}")]
    Config { message: String },

    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to Octopus server at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Request to Octopus server timed out")]
    Timeout,

    // ── API errors ───────────────────────────────────────────────────
    #[error("Entity not found: {entity_type} with id {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    #[error("API error: {message}")]
    Api {
        message: String,
        /// Per-field messages from the server's `Errors` array.
        details: Vec<String>,
        status: Option<u16>,
    },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    pub(crate) fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn unsupported(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::UnsupportedVariant {
            field: field.into(),
            value: value.into(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<octodeploy_api::Error> for CoreError {
    fn from(err: octodeploy_api::Error) -> Self {
        match err {
            octodeploy_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            octodeploy_api::Error::InvalidApiKey => CoreError::AuthenticationFailed {
                message: "Invalid API key".into(),
            },
            octodeploy_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        details: Vec::new(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            octodeploy_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            octodeploy_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            octodeploy_api::Error::Api {
                status: 404,
                message,
                ..
            } => CoreError::NotFound {
                entity_type: "resource".into(),
                identifier: message,
            },
            octodeploy_api::Error::Api {
                status,
                message,
                details,
            } => CoreError::Api {
                message,
                details,
                status: Some(status),
            },
            octodeploy_api::Error::Deserialization { message, body: _ } => CoreError::Api {
                message: format!("Unexpected response from server: {message}"),
                details: Vec::new(),
                status: None,
            },
        }
    }
}
