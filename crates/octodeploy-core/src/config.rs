// ── Provider connection configuration ──
//
// Describes how to reach an Octopus server. Carries credentials and
// transport tuning but never touches disk; octodeploy-config or the
// caller builds one and hands it to `OctopusProvider::configure`.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store.
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed development servers).
    DangerAcceptInvalid,
}

/// Provider-level settings (`address`, `api_key`, `space_id`).
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Server URL (e.g., `https://octopus.example.com`).
    pub address: Url,
    pub api_key: SecretString,
    /// Default space for every resource that doesn't set `space_id`.
    pub space_id: Option<String>,
    pub tls: TlsVerification,
    pub timeout: Duration,
}

impl ProviderConfig {
    pub fn new(address: Url, api_key: SecretString) -> Self {
        Self {
            address,
            api_key,
            space_id: None,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
        }
    }
}
