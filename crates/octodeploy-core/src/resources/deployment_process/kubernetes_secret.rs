// deploy_kubernetes_secret_action

use std::collections::BTreeMap;

use octodeploy_api::models::DeploymentAction;
use serde::{Deserialize, Serialize};

use super::action::{
    ActionBlock, ActionCommon, DEPLOY_KUBERNETES_SECRET, common_block, set, set_bool, take,
    take_bool,
};
use crate::error::CoreError;
use crate::schema::{Attribute, Block, Validator};

const SECRET_NAME: &str = "Octopus.Action.KubernetesContainers.SecretName";
const SECRET_VALUES: &str = "Octopus.Action.KubernetesContainers.SecretValues";
const STATUS_CHECK: &str = "Octopus.Action.Kubernetes.ResourceStatusCheck";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployKubernetesSecretAction {
    #[serde(flatten)]
    pub common: ActionCommon,
    pub secret_name: String,
    pub secret_values: BTreeMap<String, String>,
    #[serde(default = "status_check_by_default")]
    pub kubernetes_object_status_check_enabled: bool,
}

fn status_check_by_default() -> bool {
    true
}

impl ActionBlock for DeployKubernetesSecretAction {
    fn schema() -> Block {
        common_block()
            .attr(
                "secret_name",
                Attribute::string()
                    .required()
                    .validate(Validator::NonEmpty)
                    .description("The name of the secret resource."),
            )
            .attr("secret_values", Attribute::string_map().required())
            .attr(
                "kubernetes_object_status_check_enabled",
                Attribute::bool()
                    .default(true)
                    .description("Whether to wait for the secret to be created in the cluster."),
            )
    }

    fn common(&self) -> &ActionCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut ActionCommon {
        &mut self.common
    }

    fn expand(&self) -> Result<DeploymentAction, CoreError> {
        let mut action = self.common.expand(DEPLOY_KUBERNETES_SECRET, &[]);
        let props = &mut action.properties;
        set(props, SECRET_NAME, self.secret_name.clone());
        set(props, SECRET_VALUES, serde_json::to_string(&self.secret_values)?);
        set_bool(props, STATUS_CHECK, self.kubernetes_object_status_check_enabled);
        Ok(action)
    }

    fn flatten(mut action: DeploymentAction, _prior: Option<&Self>) -> Result<Self, CoreError> {
        let props = &mut action.properties;
        let secret_name = take(props, SECRET_NAME).unwrap_or_default();
        let secret_values = match take(props, SECRET_VALUES) {
            Some(raw) if !raw.trim().is_empty() => serde_json::from_str(&raw).map_err(|e| {
                CoreError::validation("secret_values", format!("not a JSON object of strings: {e}"))
            })?,
            _ => BTreeMap::new(),
        };
        let kubernetes_object_status_check_enabled =
            take_bool(props, STATUS_CHECK).unwrap_or_else(status_check_by_default);

        Ok(Self {
            common: ActionCommon::flatten(action, &[]),
            secret_name,
            secret_values,
            kubernetes_object_status_check_enabled,
        })
    }
}
