//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with help
//! text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use octodeploy_config::ConfigError;
use octodeploy_core::{CoreError, Diagnostics};

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to Octopus server at {url}")]
    #[diagnostic(
        code(octodeploy::connection_failed),
        help(
            "Check that the server is reachable: {reason}\n\
             Self-signed certificate? Try --insecure or set ca_cert in your profile."
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out")]
    #[diagnostic(
        code(octodeploy::timeout),
        help("Increase the timeout with --timeout or check server responsiveness.")
    )]
    Timeout,

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(octodeploy::auth_failed),
        help(
            "Verify the API key. Create one under your Octopus profile > My API Keys.\n\
             Store it with: octodeploy config set-key"
        )
    )]
    AuthFailed { message: String },

    #[error("No API key configured for profile '{profile}'")]
    #[diagnostic(
        code(octodeploy::no_credentials),
        help(
            "Configure one with: octodeploy config init\n\
             Or set the OCTOPUS_APIKEY environment variable."
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{entity_type} '{identifier}' not found")]
    #[diagnostic(code(octodeploy::not_found))]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    #[error("Unknown resource type '{name}'")]
    #[diagnostic(
        code(octodeploy::unknown_type),
        help("Run: octodeploy resources to list registered types")
    )]
    UnknownType { name: String },

    #[error(
        "API error{}: {message}{}",
        status.map(|s| format!(" ({s})")).unwrap_or_default(),
        details.iter().map(|d| format!("\n  - {d}")).collect::<String>()
    )]
    #[diagnostic(code(octodeploy::api_error))]
    Api {
        message: String,
        details: Vec<String>,
        status: Option<u16>,
    },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Configuration is invalid ({} error(s))", .0.errors().count())]
    #[diagnostic(code(octodeploy::invalid_config))]
    Invalid(Diagnostics),

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(octodeploy::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("No Octopus server configured")]
    #[diagnostic(
        code(octodeploy::no_config),
        help(
            "Create a profile with: octodeploy config init\n\
             Or pass --address and --api-key. Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(octodeploy::profile_not_found),
        help("Available profiles: {available}")
    )]
    ProfileNotFound { name: String, available: String },

    #[error(transparent)]
    #[diagnostic(code(octodeploy::config))]
    Config(ConfigError),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error("Cannot read {path}: {source}")]
    #[diagnostic(code(octodeploy::io))]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    #[diagnostic(code(octodeploy::json), help("Check the JSON file contents and try again."))]
    Json(#[from] serde_json::Error),

    #[error("Cannot render YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout => exit_code::TIMEOUT,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::UnknownType { .. }
            | Self::Invalid(_)
            | Self::Validation { .. }
            | Self::NoConfig { .. }
            | Self::ProfileNotFound { .. }
            | Self::ReadFile { .. }
            | Self::Json(_) => exit_code::USAGE,
            Self::Config(ConfigError::NoCredentials { .. }) => exit_code::AUTH,
            _ => exit_code::GENERAL,
        }
    }
}

// ── Conversions ──────────────────────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => Self::ConnectionFailed { url, reason },
            CoreError::Timeout => Self::Timeout,
            CoreError::AuthenticationFailed { message } => Self::AuthFailed { message },
            CoreError::NotFound {
                entity_type,
                identifier,
            } => Self::NotFound {
                entity_type,
                identifier,
            },
            CoreError::UnknownResourceType { name } => Self::UnknownType { name },
            CoreError::Diagnostics(diags) => Self::Invalid(diags),
            CoreError::Validation { field, reason } => Self::Validation { field, reason },
            CoreError::UnsupportedVariant { field, value } => Self::Validation {
                reason: format!("unsupported value \"{value}\""),
                field,
            },
            CoreError::Config { message } => Self::Validation {
                field: "provider".into(),
                reason: message,
            },
            CoreError::Api {
                message,
                details,
                status,
            } => Self::Api {
                message,
                details,
                status,
            },
            CoreError::Serialization(e) => Self::Json(e),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => Self::NoCredentials { profile },
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(other),
        }
    }
}
