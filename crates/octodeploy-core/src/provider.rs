// ── Provider ──
//
// The registry a host talks to: provider configuration schema, every
// resource and data-source schema, name lookups, and construction of
// the API client from a `ProviderConfig`.

use std::collections::BTreeMap;
use std::sync::Arc;

use octodeploy_api::{OctopusClient, TlsMode, TransportConfig};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::{ProviderConfig, TlsVerification};
use crate::data_sources::{DeploymentTargetsDataSource, EnvironmentsDataSource};
use crate::error::CoreError;
use crate::resource::{DynDataSource, DynResource};
use crate::resources::{
    AzureCloudServiceTarget, AzureServiceFabricClusterTarget, AzureWebAppTarget, CloudRegionTarget,
    DeploymentProcessResource, EnvironmentResource, KubernetesClusterTarget,
    ListeningTentacleTarget, MachinePolicyResource, OfflinePackageDropTarget,
    PollingTentacleTarget, ProjectTriggerResource, SshConnectionTarget, VariableResource,
};
use crate::schema::{Attribute, Block, Schema};

/// Builds a name → handler map from a list of handler values.
macro_rules! registry {
    ($kind:ident; $($handler:expr),+ $(,)?) => {{
        let mut map: BTreeMap<&'static str, Arc<dyn $kind>> = BTreeMap::new();
        $(
            let handler: Arc<dyn $kind> = Arc::new($handler);
            map.insert(handler.type_name(), handler);
        )+
        map
    }};
}

/// Every schema the provider exposes, keyed by type name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderSchema {
    pub provider: Schema,
    pub resources: BTreeMap<&'static str, Schema>,
    pub data_sources: BTreeMap<&'static str, Schema>,
}

pub struct OctopusProvider {
    resources: BTreeMap<&'static str, Arc<dyn DynResource>>,
    data_sources: BTreeMap<&'static str, Arc<dyn DynDataSource>>,
}

impl Default for OctopusProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl OctopusProvider {
    pub fn new() -> Self {
        let resources = registry![DynResource;
            EnvironmentResource,
            MachinePolicyResource,
            DeploymentProcessResource,
            VariableResource,
            ProjectTriggerResource,
            KubernetesClusterTarget::new(),
            SshConnectionTarget::new(),
            ListeningTentacleTarget::new(),
            PollingTentacleTarget::new(),
            CloudRegionTarget::new(),
            OfflinePackageDropTarget::new(),
            AzureCloudServiceTarget::new(),
            AzureServiceFabricClusterTarget::new(),
            AzureWebAppTarget::new(),
        ];
        let data_sources = registry![DynDataSource;
            EnvironmentsDataSource,
            DeploymentTargetsDataSource,
        ];
        debug!(
            resources = resources.len(),
            data_sources = data_sources.len(),
            "provider registry built"
        );
        Self {
            resources,
            data_sources,
        }
    }

    /// Provider-level configuration block.
    pub fn config_schema() -> Schema {
        Schema::new(
            Block::new()
                .attr(
                    "address",
                    Attribute::string()
                        .required()
                        .description("The endpoint of the Octopus REST API."),
                )
                .attr(
                    "api_key",
                    Attribute::string()
                        .required()
                        .sensitive()
                        .description("The API key to use with the Octopus REST API."),
                )
                .attr(
                    "space_id",
                    Attribute::string()
                        .description("The space ID to target when a resource does not set one."),
                ),
        )
    }

    pub fn schema(&self) -> ProviderSchema {
        ProviderSchema {
            provider: Self::config_schema(),
            resources: self
                .resources
                .iter()
                .map(|(name, r)| (*name, r.schema()))
                .collect(),
            data_sources: self
                .data_sources
                .iter()
                .map(|(name, d)| (*name, d.schema()))
                .collect(),
        }
    }

    pub fn resource_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.resources.keys().copied()
    }

    pub fn data_source_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.data_sources.keys().copied()
    }

    pub fn resource(&self, name: &str) -> Result<Arc<dyn DynResource>, CoreError> {
        self.resources
            .get(name)
            .cloned()
            .ok_or_else(|| CoreError::UnknownResourceType { name: name.into() })
    }

    pub fn data_source(&self, name: &str) -> Result<Arc<dyn DynDataSource>, CoreError> {
        self.data_sources
            .get(name)
            .cloned()
            .ok_or_else(|| CoreError::UnknownResourceType { name: name.into() })
    }

    /// Build the API client every CRUD call runs against.
    pub fn configure(config: &ProviderConfig) -> Result<OctopusClient, CoreError> {
        let transport = TransportConfig {
            tls: match &config.tls {
                TlsVerification::SystemDefaults => TlsMode::System,
                TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
                TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
            },
            timeout: config.timeout,
        };
        info!(
            address = %config.address,
            space = config.space_id.as_deref().unwrap_or("default"),
            "configuring Octopus client"
        );
        Ok(OctopusClient::from_api_key(
            config.address.as_str(),
            &config.api_key,
            &transport,
            config.space_id.clone(),
        )?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use secrecy::SecretString;
    use url::Url;

    use super::*;

    #[test]
    fn registers_every_deployment_target_style() {
        let provider = OctopusProvider::new();
        let targets: Vec<_> = provider
            .resource_names()
            .filter(|n| n.ends_with("_deployment_target"))
            .collect();
        assert_eq!(targets.len(), 9);
        assert!(provider.resource("octopusdeploy_variable").is_ok());
        assert_eq!(
            provider.data_source_names().collect::<Vec<_>>(),
            vec!["octopusdeploy_deployment_targets", "octopusdeploy_environments"]
        );
    }

    #[test]
    fn unknown_names_are_reported() {
        let provider = OctopusProvider::new();
        match provider.resource("octopusdeploy_feed") {
            Err(CoreError::UnknownResourceType { name }) => assert_eq!(name, "octopusdeploy_feed"),
            Err(other) => panic!("unexpected error {other}"),
            Ok(_) => panic!("octopusdeploy_feed should not be registered"),
        }
        assert!(provider.data_source("octopusdeploy_environment").is_err());
    }

    #[test]
    fn schema_marks_api_key_sensitive() {
        let schema = OctopusProvider::new().schema();
        assert!(schema.provider.block.attribute("api_key").unwrap().sensitive);
        let json = serde_json::to_value(&schema).unwrap();
        assert!(json["resources"]["octopusdeploy_deployment_process"].is_object());
    }

    #[test]
    fn configure_builds_client_for_default_space() {
        let mut config = ProviderConfig::new(
            Url::parse("https://octopus.example.com").unwrap(),
            SecretString::from("API-KEY".to_owned()),
        );
        config.space_id = Some("Spaces-2".into());
        let client = OctopusProvider::configure(&config).unwrap();
        assert_eq!(client.space_id(), Some("Spaces-2"));
    }
}
