// ── Deployment targets ──
//
// Every deployment target resource shares the machine fields (name,
// environments, roles, tenancy, status) and differs only in its endpoint.
// `TargetVariant` describes one communication style; the generic
// `DeploymentTargetResource` supplies schema, CRUD and the common
// expand/flatten around it.

mod azure;
mod cloud_region;
mod kubernetes;
mod offline_drop;
mod ssh;
mod tentacle;

use std::marker::PhantomData;

use async_trait::async_trait;
use octodeploy_api::OctopusClient;
use octodeploy_api::models::{DeploymentTarget, Endpoint, TenantedDeploymentMode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use strum::VariantNames;
use tracing::{debug, info};

use crate::diagnostics::Diagnostics;
use crate::error::CoreError;
use crate::resource::{OrAbsent, Resource, require_id};
use crate::schema::{Attribute, Block, Schema, Validator};

pub use azure::{AzureCloudService, AzureServiceFabricCluster, AzureWebApp};
pub use cloud_region::CloudRegion;
pub use kubernetes::KubernetesCluster;
pub use offline_drop::OfflinePackageDrop;
pub use ssh::SshConnection;
pub use tentacle::{ListeningTentacle, PollingTentacle};

// ── Variant seam ─────────────────────────────────────────────────────

/// One endpoint communication style.
pub trait TargetVariant: Send + Sync + 'static {
    const TYPE_NAME: &'static str;
    /// Wire value of `Endpoint.CommunicationStyle`.
    const COMMUNICATION_STYLE: &'static str;
    const DESCRIPTION: &'static str;

    type Fields: Serialize + DeserializeOwned + Clone + Send + Sync;

    /// Add the variant's attributes and blocks to the common block.
    fn describe(block: Block) -> Block;

    fn expand(common: &TargetCommon, fields: &Self::Fields) -> Result<Endpoint, CoreError>;

    /// `prior` supplies values the server never echoes back.
    fn flatten(
        common: &mut TargetCommon,
        endpoint: Endpoint,
        prior: Option<&Self::Fields>,
    ) -> Result<Self::Fields, CoreError>;

    fn validate(_fields: &Self::Fields, _diags: &mut Diagnostics) {}
}

/// Error for a server-side endpoint of a different style than expected.
pub(crate) fn style_mismatch(endpoint: &Endpoint) -> CoreError {
    CoreError::unsupported("communication_style", endpoint.communication_style())
}

// ── Model ────────────────────────────────────────────────────────────

/// Machine fields shared by every target type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetCommon {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub environments: Vec<String>,
    pub roles: Vec<String>,
    #[serde(default)]
    pub machine_policy_id: Option<String>,
    #[serde(default)]
    pub is_disabled: bool,
    #[serde(default)]
    pub thumbprint: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub tenanted_deployment_participation: TenantedDeploymentMode,
    #[serde(default)]
    pub tenants: Vec<String>,
    #[serde(default)]
    pub tenant_tags: Vec<String>,
    #[serde(default)]
    pub space_id: Option<String>,

    #[serde(default)]
    pub has_latest_calamari: bool,
    #[serde(default)]
    pub health_status: Option<String>,
    #[serde(default)]
    pub is_in_process: bool,
    #[serde(default)]
    pub operating_system: Option<String>,
    #[serde(default)]
    pub shell_name: Option<String>,
    #[serde(default)]
    pub shell_version: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub status_summary: Option<String>,
}

/// Configuration and state of a deployment target resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetModel<F> {
    #[serde(flatten)]
    pub common: TargetCommon,
    #[serde(flatten)]
    pub endpoint: F,
}

pub(crate) fn common_block(description: &'static str) -> Block {
    Block::new()
        .description(description)
        .id()
        .attr(
            "name",
            Attribute::string()
                .required()
                .validate(Validator::NonEmpty)
                .description("The name of this deployment target."),
        )
        .attr(
            "environments",
            Attribute::string_list()
                .required()
                .validate(Validator::NonEmpty)
                .description("A list of environment IDs this deployment target can be deployed to."),
        )
        .attr(
            "roles",
            Attribute::string_list()
                .required()
                .validate(Validator::NonEmpty)
                .description("A list of target roles associated with this deployment target."),
        )
        .attr("machine_policy_id", Attribute::string().optional_computed())
        .attr("is_disabled", Attribute::bool().default(false))
        .attr("thumbprint", Attribute::string().optional_computed())
        .attr("uri", Attribute::string().optional_computed())
        .attr(
            "tenanted_deployment_participation",
            Attribute::string()
                .default(TenantedDeploymentMode::Untenanted.to_string())
                .one_of(TenantedDeploymentMode::VARIANTS)
                .description("The tenanted deployment mode of this deployment target."),
        )
        .attr(
            "tenants",
            Attribute::string_list().description("A list of tenant IDs associated with this target."),
        )
        .attr(
            "tenant_tags",
            Attribute::string_list()
                .description("A list of tenant tags associated with this target."),
        )
        .space_id()
        .attr("has_latest_calamari", Attribute::bool().computed())
        .attr("health_status", Attribute::string().computed())
        .attr("is_in_process", Attribute::bool().computed())
        .attr("operating_system", Attribute::string().computed())
        .attr("shell_name", Attribute::string().computed())
        .attr("shell_version", Attribute::string().computed())
        .attr("status", Attribute::string().computed())
        .attr("status_summary", Attribute::string().computed())
}

// ── Expand / flatten ─────────────────────────────────────────────────

pub fn expand<V: TargetVariant>(model: &TargetModel<V::Fields>) -> Result<DeploymentTarget, CoreError> {
    let common = &model.common;
    let endpoint = V::expand(common, &model.endpoint)?;

    let mut target = DeploymentTarget::new(common.name.clone(), endpoint);
    target.id.clone_from(&common.id);
    target.environment_ids.clone_from(&common.environments);
    target.roles.clone_from(&common.roles);
    target.machine_policy_id.clone_from(&common.machine_policy_id);
    target.is_disabled = common.is_disabled;
    target.thumbprint.clone_from(&common.thumbprint);
    target.uri.clone_from(&common.uri);
    target.tenanted_deployment_participation = common.tenanted_deployment_participation;
    target.tenant_ids.clone_from(&common.tenants);
    target.tenant_tags.clone_from(&common.tenant_tags);
    target.space_id.clone_from(&common.space_id);
    Ok(target)
}

/// Split a target into its machine fields and its endpoint.
pub(crate) fn split(target: DeploymentTarget) -> (TargetCommon, Endpoint) {
    let DeploymentTarget {
        id,
        name,
        endpoint,
        environment_ids,
        roles,
        machine_policy_id,
        is_disabled,
        thumbprint,
        uri,
        tenanted_deployment_participation,
        tenant_ids,
        tenant_tags,
        space_id,
        has_latest_calamari,
        health_status,
        is_in_process,
        operating_system,
        shell_name,
        shell_version,
        status,
        status_summary,
    } = target;

    let common = TargetCommon {
        id,
        name,
        environments: environment_ids,
        roles,
        machine_policy_id,
        is_disabled,
        thumbprint,
        uri,
        tenanted_deployment_participation,
        tenants: tenant_ids,
        tenant_tags,
        space_id,
        has_latest_calamari,
        health_status,
        is_in_process,
        operating_system,
        shell_name,
        shell_version,
        status,
        status_summary,
    };
    (common, endpoint)
}

pub fn flatten<V: TargetVariant>(
    target: DeploymentTarget,
    prior: Option<&V::Fields>,
) -> Result<TargetModel<V::Fields>, CoreError> {
    let (mut common, endpoint) = split(target);
    let endpoint = V::flatten(&mut common, endpoint, prior)?;
    Ok(TargetModel { common, endpoint })
}

// ── Resource ─────────────────────────────────────────────────────────

/// A deployment target resource for the communication style `V`.
pub struct DeploymentTargetResource<V>(PhantomData<fn() -> V>);

impl<V> DeploymentTargetResource<V> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<V> Default for DeploymentTargetResource<V> {
    fn default() -> Self {
        Self::new()
    }
}

pub type KubernetesClusterTarget = DeploymentTargetResource<KubernetesCluster>;
pub type SshConnectionTarget = DeploymentTargetResource<SshConnection>;
pub type ListeningTentacleTarget = DeploymentTargetResource<ListeningTentacle>;
pub type PollingTentacleTarget = DeploymentTargetResource<PollingTentacle>;
pub type CloudRegionTarget = DeploymentTargetResource<CloudRegion>;
pub type OfflinePackageDropTarget = DeploymentTargetResource<OfflinePackageDrop>;
pub type AzureCloudServiceTarget = DeploymentTargetResource<AzureCloudService>;
pub type AzureServiceFabricClusterTarget = DeploymentTargetResource<AzureServiceFabricCluster>;
pub type AzureWebAppTarget = DeploymentTargetResource<AzureWebApp>;

pub fn schema<V: TargetVariant>() -> Schema {
    Schema::new(V::describe(common_block(V::DESCRIPTION)))
}

#[async_trait]
impl<V: TargetVariant> Resource for DeploymentTargetResource<V> {
    type Model = TargetModel<V::Fields>;

    fn type_name(&self) -> &'static str {
        V::TYPE_NAME
    }

    fn schema(&self) -> Schema {
        schema::<V>()
    }

    fn validate(&self, model: &Self::Model, diags: &mut Diagnostics) {
        V::validate(&model.endpoint, diags);
    }

    async fn create(
        &self,
        client: &OctopusClient,
        planned: Self::Model,
    ) -> Result<Self::Model, CoreError> {
        info!(
            name = %planned.common.name,
            style = V::COMMUNICATION_STYLE,
            "creating deployment target"
        );
        let target = expand::<V>(&planned)?;
        let created = client
            .create_deployment_target(planned.common.space_id.as_deref(), &target)
            .await?;
        debug!(id = ?created.id, "deployment target created");
        flatten::<V>(created, Some(&planned.endpoint))
    }

    async fn read(
        &self,
        client: &OctopusClient,
        state: Self::Model,
    ) -> Result<Option<Self::Model>, CoreError> {
        let id = require_id(state.common.id.as_deref(), V::TYPE_NAME)?;
        let found = client
            .get_deployment_target(state.common.space_id.as_deref(), id)
            .await
            .or_absent()?;
        match found {
            Some(target) => flatten::<V>(target, Some(&state.endpoint)).map(Some),
            None => Ok(None),
        }
    }

    async fn update(
        &self,
        client: &OctopusClient,
        state: Self::Model,
        mut planned: Self::Model,
    ) -> Result<Self::Model, CoreError> {
        let id = require_id(state.common.id.as_deref(), V::TYPE_NAME)?;
        info!(id, style = V::COMMUNICATION_STYLE, "updating deployment target");
        planned.common.id.clone_from(&state.common.id);
        if planned.common.space_id.is_none() {
            planned.common.space_id.clone_from(&state.common.space_id);
        }
        if planned.common.machine_policy_id.is_none() {
            planned
                .common
                .machine_policy_id
                .clone_from(&state.common.machine_policy_id);
        }

        let target = expand::<V>(&planned)?;
        let updated = client
            .update_deployment_target(planned.common.space_id.as_deref(), id, &target)
            .await?;
        flatten::<V>(updated, Some(&planned.endpoint))
    }

    async fn delete(&self, client: &OctopusClient, state: Self::Model) -> Result<(), CoreError> {
        let id = require_id(state.common.id.as_deref(), V::TYPE_NAME)?;
        info!(id, "deleting deployment target");
        client
            .delete_deployment_target(state.common.space_id.as_deref(), id)
            .await
            .or_absent()?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::TargetCommon;

    /// Minimal common fields for variant tests.
    pub fn common(name: &str) -> TargetCommon {
        TargetCommon {
            id: Some("Machines-1".into()),
            name: name.into(),
            environments: vec!["Environments-1".into()],
            roles: vec!["web".into()],
            machine_policy_id: Some("MachinePolicies-1".into()),
            space_id: Some("Spaces-1".into()),
            ..TargetCommon::default()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use octodeploy_api::models::CloudRegionEndpoint;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn flatten_rejects_other_communication_style() {
        let target = DeploymentTarget::new("web-01", Endpoint::CloudRegion(CloudRegionEndpoint::default()));
        let err = flatten::<SshConnection>(target, None).unwrap_err();
        assert!(matches!(
            err,
            CoreError::UnsupportedVariant { ref field, ref value }
                if field == "communication_style" && value == "None"
        ));
    }

    #[test]
    fn common_fields_map_to_machine_fields() {
        let model = TargetModel {
            common: TargetCommon {
                tenants: vec!["Tenants-1".into()],
                tenanted_deployment_participation: TenantedDeploymentMode::TenantedOrUntenanted,
                ..test_support::common("region")
            },
            endpoint: cloud_region::CloudRegionFields::default(),
        };
        let target = expand::<CloudRegion>(&model).unwrap();
        assert_eq!(target.environment_ids, vec!["Environments-1"]);
        assert_eq!(target.tenant_ids, vec!["Tenants-1"]);
        assert_eq!(target.endpoint.communication_style(), "None");
        assert_eq!(flatten::<CloudRegion>(target, None).unwrap(), model);
    }

    #[test]
    fn schema_rejects_computed_status_and_empty_roles() {
        let diags = schema::<CloudRegion>().validate(&json!({
            "name": "region",
            "environments": ["Environments-1"],
            "roles": [],
            "health_status": "Healthy"
        }));
        let paths: Vec<_> = diags.errors().filter_map(|d| d.attribute.clone()).collect();
        assert_eq!(paths, vec!["roles", "health_status"]);
    }

    #[test]
    fn participation_defaults_to_untenanted() {
        let mut config = json!({ "name": "a", "environments": ["e"], "roles": ["r"] });
        schema::<CloudRegion>().apply_defaults(&mut config);
        assert_eq!(config["tenanted_deployment_participation"], "Untenanted");
        assert_eq!(config["is_disabled"], false);
    }
}
