// octopusdeploy_deployment_targets

use async_trait::async_trait;
use octodeploy_api::OctopusClient;
use octodeploy_api::models::Endpoint;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{PAGE_SIZE, base_query, lookup_id, paging_block};
use crate::error::CoreError;
use crate::resource::DataSource;
use crate::resources::deployment_target::{self, TargetCommon};
use crate::schema::{AttrType, Attribute, Schema};

pub const TYPE_NAME: &str = "octopusdeploy_deployment_targets";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeploymentTargetsModel {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub ids: Vec<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub partial_name: Option<String>,
    #[serde(default)]
    pub environments: Vec<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub health_statuses: Vec<String>,
    #[serde(default)]
    pub communication_styles: Vec<String>,
    #[serde(default)]
    pub is_disabled: Option<bool>,
    #[serde(default)]
    pub tenants: Vec<String>,
    #[serde(default)]
    pub tenant_tags: Vec<String>,
    #[serde(default)]
    pub thumbprint: Option<String>,
    #[serde(default)]
    pub skip: u32,
    #[serde(default)]
    pub take: Option<u32>,
    #[serde(default)]
    pub space_id: Option<String>,
    #[serde(default)]
    pub deployment_targets: Vec<DeploymentTargetSummary>,
}

/// One matched target: the machine fields plus where it is reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentTargetSummary {
    #[serde(flatten)]
    pub common: TargetCommon,
    pub communication_style: String,
    #[serde(default)]
    pub endpoint_uri: Option<String>,
}

const HEALTH_STATUSES: &[&str] = &["HasWarnings", "Healthy", "Unavailable", "Unhealthy", "Unknown"];

const COMMUNICATION_STYLES: &[&str] = &[
    "AzureCloudService",
    "AzureServiceFabricCluster",
    "AzureWebApp",
    "Kubernetes",
    "None",
    "OfflineDrop",
    "Ssh",
    "TentacleActive",
    "TentaclePassive",
];

pub fn schema() -> Schema {
    let item = deployment_target::common_block("")
        .attr("communication_style", Attribute::string().computed())
        .attr("endpoint_uri", Attribute::string().computed())
        .object_type();

    Schema::new(
        paging_block("Provides information about existing deployment targets.")
            .attr("environments", Attribute::string_list())
            .attr("roles", Attribute::string_list())
            .attr(
                "health_statuses",
                Attribute::string_list().validate(crate::schema::Validator::EachOneOf(HEALTH_STATUSES)),
            )
            .attr(
                "communication_styles",
                Attribute::string_list()
                    .validate(crate::schema::Validator::EachOneOf(COMMUNICATION_STYLES)),
            )
            .attr("is_disabled", Attribute::bool())
            .attr("tenants", Attribute::string_list())
            .attr("tenant_tags", Attribute::string_list())
            .attr("thumbprint", Attribute::string())
            .attr(
                "deployment_targets",
                Attribute::new(AttrType::list_of(item))
                    .computed()
                    .description("A list of deployment targets that match the filter(s)."),
            ),
    )
}

/// Address the server connects to, when the endpoint has one.
fn endpoint_uri(endpoint: &Endpoint) -> Option<String> {
    match endpoint {
        Endpoint::ListeningTentacle(t) | Endpoint::PollingTentacle(t) => Some(t.uri.clone()),
        Endpoint::Ssh(ssh) => Some(ssh.host.clone()),
        Endpoint::Kubernetes(k8s) => Some(k8s.cluster_url.clone()),
        Endpoint::AzureServiceFabricCluster(sf) => Some(sf.connection_endpoint.clone()),
        _ => None,
    }
}

fn summarize(target: octodeploy_api::models::DeploymentTarget) -> DeploymentTargetSummary {
    let (common, endpoint) = deployment_target::split(target);
    DeploymentTargetSummary {
        communication_style: endpoint.communication_style().to_owned(),
        endpoint_uri: endpoint_uri(&endpoint).or_else(|| common.uri.clone()),
        common,
    }
}

pub struct DeploymentTargetsDataSource;

#[async_trait]
impl DataSource for DeploymentTargetsDataSource {
    type Model = DeploymentTargetsModel;

    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        schema()
    }

    async fn read(
        &self,
        client: &OctopusClient,
        mut config: DeploymentTargetsModel,
    ) -> Result<DeploymentTargetsModel, CoreError> {
        let space = config.space_id.as_deref();
        let query = base_query(&config.ids, config.name.as_deref(), config.partial_name.as_deref())
            .list("environmentIds", &config.environments)
            .list("roles", &config.roles)
            .list("healthStatuses", &config.health_statuses)
            .list("commStyles", &config.communication_styles)
            .opt("isDisabled", config.is_disabled)
            .list("tenantIds", &config.tenants)
            .list("tenantTags", &config.tenant_tags)
            .opt("thumbprint", config.thumbprint.as_deref());

        let found = match config.take {
            Some(take) => {
                let query = query.skip(Some(config.skip)).take(Some(take));
                client.list_deployment_targets(space, &query).await?.items
            }
            None => {
                let mut all = client
                    .paginate_all(&query, PAGE_SIZE, |q| async move {
                        client.list_deployment_targets(space, &q).await
                    })
                    .await?;
                let skip = usize::try_from(config.skip).unwrap_or(usize::MAX);
                all.drain(..all.len().min(skip));
                all
            }
        };
        debug!(count = found.len(), "deployment targets found");

        config.deployment_targets = found
            .into_iter()
            .filter(|t| {
                config
                    .name
                    .as_ref()
                    .is_none_or(|name| t.name.eq_ignore_ascii_case(name))
            })
            .map(summarize)
            .collect();
        config.id = Some(lookup_id("DeploymentTargets"));
        Ok(config)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use octodeploy_api::models::{DeploymentTarget, TentacleEndpoint};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn summary_carries_style_and_endpoint_address() {
        let endpoint: TentacleEndpoint = serde_json::from_value(json!({
            "Uri": "https://web01:10933/",
            "Thumbprint": "ABC"
        }))
        .unwrap();
        let mut target = DeploymentTarget::new("web01", Endpoint::ListeningTentacle(endpoint));
        target.id = Some("Machines-1".into());
        target.roles = vec!["web".into()];

        let summary = summarize(target);
        assert_eq!(summary.communication_style, "TentaclePassive");
        assert_eq!(summary.endpoint_uri.as_deref(), Some("https://web01:10933/"));
        assert_eq!(summary.common.roles, vec!["web".to_owned()]);

        let state = serde_json::to_value(&summary).unwrap();
        assert_eq!(state["name"], "web01");
        assert_eq!(state["communication_style"], "TentaclePassive");
    }

    #[test]
    fn unknown_communication_style_filter_is_rejected() {
        let diags = schema().validate(&json!({ "communication_styles": ["Carrier pigeon"] }));
        assert_eq!(
            diags.errors().next().and_then(|d| d.attribute.as_deref()),
            Some("communication_styles[0]")
        );
    }
}
