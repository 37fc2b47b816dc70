// ── Deployment actions ──
//
// Attributes every action block shares, and the `ActionBlock` seam the
// dedicated blocks (run script, windows service, terraform...) implement.
// Dedicated attributes live in the action's property bag; flatten removes
// every key an attribute owns so `properties` only holds the rest.

use std::collections::BTreeMap;

use octodeploy_api::models::{ContainerImage, DeploymentAction, PropertyValue, Properties};
use serde::{Deserialize, Serialize};

use super::package::{
    NamedPackage, PrimaryPackage, expand_named, expand_primary, flatten_packages,
    package_list_block, primary_package_block,
};
use crate::convert::{bool_str, join_csv, non_empty, parse_bool, split_csv};
use crate::diagnostics::{Diagnostics, join_path};
use crate::error::CoreError;
use crate::schema::{Attribute, Block, NestedBlock, Validator};

// ── Action types ─────────────────────────────────────────────────────

pub const RUN_SCRIPT: &str = "Octopus.Script";
pub const RUN_KUBECTL_SCRIPT: &str = "Octopus.KubernetesRunScript";
pub const DEPLOY_PACKAGE: &str = "Octopus.TentaclePackage";
pub const DEPLOY_WINDOWS_SERVICE: &str = "Octopus.WindowsService";
pub const DEPLOY_KUBERNETES_SECRET: &str = "Octopus.KubernetesDeploySecret";
pub const TERRAFORM_APPLY: &str = "Octopus.TerraformApply";
pub const MANUAL_INTERVENTION: &str = "Octopus.Manual";

/// Action types with a dedicated block, and that block's name.
pub const DEDICATED_BLOCKS: &[(&str, &str)] = &[
    (RUN_SCRIPT, "run_script_action"),
    (RUN_KUBECTL_SCRIPT, "run_kubectl_script_action"),
    (DEPLOY_PACKAGE, "deploy_package_action"),
    (DEPLOY_WINDOWS_SERVICE, "deploy_windows_service_action"),
    (DEPLOY_KUBERNETES_SECRET, "deploy_kubernetes_secret_action"),
    (TERRAFORM_APPLY, "apply_terraform_template_action"),
    (MANUAL_INTERVENTION, "manual_intervention_action"),
];

// ── Property keys ────────────────────────────────────────────────────

pub(crate) const RUN_ON_SERVER: &str = "Octopus.Action.RunOnServer";
pub(crate) const ENABLED_FEATURES: &str = "Octopus.Action.EnabledFeatures";
pub(crate) const TEMPLATE_ID: &str = "Octopus.Action.Template.Id";
pub(crate) const TEMPLATE_VERSION: &str = "Octopus.Action.Template.Version";

pub const DEFAULT_SORT_ORDER: i64 = -1;

/// Remove a property, returning its text.
pub(crate) fn take(properties: &mut Properties, key: &str) -> Option<String> {
    match properties.remove(key) {
        Some(PropertyValue::Text(value)) => Some(value),
        Some(PropertyValue::Sensitive(_)) | None => None,
    }
}

/// Remove a property, treating absent or empty as `None`.
pub(crate) fn take_non_empty(properties: &mut Properties, key: &str) -> Option<String> {
    take(properties, key).filter(|v| !v.is_empty())
}

pub(crate) fn take_bool(properties: &mut Properties, key: &str) -> Option<bool> {
    take(properties, key).map(|v| parse_bool(&v))
}

pub(crate) fn set(properties: &mut Properties, key: &str, value: impl Into<String>) {
    properties.insert(key.to_owned(), PropertyValue::Text(value.into()));
}

pub(crate) fn set_opt(properties: &mut Properties, key: &str, value: Option<&String>) {
    if let Some(value) = value {
        set(properties, key, value.clone());
    }
}

pub(crate) fn set_bool(properties: &mut Properties, key: &str, value: bool) {
    set(properties, key, bool_str(value));
}

// ── Common model ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionContainer {
    #[serde(default)]
    pub feed_id: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionTemplate {
    pub id: String,
    #[serde(default)]
    pub version: Option<String>,
}

/// Attributes shared by every action block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCommon {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub is_disabled: bool,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub channels: Vec<String>,
    #[serde(default)]
    pub environments: Vec<String>,
    #[serde(default)]
    pub excluded_environments: Vec<String>,
    #[serde(default)]
    pub tenant_tags: Vec<String>,
    #[serde(default)]
    pub container: Option<ActionContainer>,
    #[serde(default)]
    pub can_be_used_for_project_versioning: bool,
    #[serde(default = "default_sort_order")]
    pub sort_order: i64,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub action_template: Option<ActionTemplate>,
    #[serde(default)]
    pub run_on_server: bool,
    #[serde(default)]
    pub worker_pool_id: Option<String>,
    #[serde(default)]
    pub worker_pool_variable: Option<String>,
    #[serde(default)]
    pub primary_package: Option<PrimaryPackage>,
    #[serde(default)]
    pub package: Vec<NamedPackage>,
}

fn default_sort_order() -> i64 {
    DEFAULT_SORT_ORDER
}

impl ActionCommon {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            is_disabled: false,
            is_required: false,
            notes: None,
            condition: None,
            channels: Vec::new(),
            environments: Vec::new(),
            excluded_environments: Vec::new(),
            tenant_tags: Vec::new(),
            container: None,
            can_be_used_for_project_versioning: false,
            sort_order: DEFAULT_SORT_ORDER,
            properties: BTreeMap::new(),
            features: Vec::new(),
            action_template: None,
            run_on_server: false,
            worker_pool_id: None,
            worker_pool_variable: None,
            primary_package: None,
            package: Vec::new(),
        }
    }

    /// Build the API action of `action_type`. `implied_features` are
    /// enabled on top of the configured ones.
    pub(crate) fn expand(&self, action_type: &str, implied_features: &[&str]) -> DeploymentAction {
        let mut action = DeploymentAction::new(self.name.clone(), action_type);
        action.id.clone_from(&self.id);
        action.is_disabled = self.is_disabled;
        action.is_required = self.is_required;
        action.notes.clone_from(&self.notes);
        action.condition.clone_from(&self.condition);
        action.channels.clone_from(&self.channels);
        action.environments.clone_from(&self.environments);
        action.excluded_environments.clone_from(&self.excluded_environments);
        action.tenant_tags.clone_from(&self.tenant_tags);
        action.container = self.container.as_ref().map(|c| ContainerImage {
            feed_id: c.feed_id.clone(),
            image: c.image.clone(),
        });
        action.can_be_used_for_project_versioning = self.can_be_used_for_project_versioning;
        action.worker_pool_id.clone_from(&self.worker_pool_id);
        action.worker_pool_variable.clone_from(&self.worker_pool_variable);

        for (key, value) in &self.properties {
            set(&mut action.properties, key, value.clone());
        }
        set_bool(&mut action.properties, RUN_ON_SERVER, self.run_on_server);

        let mut features = self.features.clone();
        for feature in implied_features {
            if !features.iter().any(|f| f == feature) {
                features.push((*feature).to_owned());
            }
        }
        if !features.is_empty() {
            set(&mut action.properties, ENABLED_FEATURES, join_csv(&features));
        }

        if let Some(template) = &self.action_template {
            set(&mut action.properties, TEMPLATE_ID, template.id.clone());
            set_opt(&mut action.properties, TEMPLATE_VERSION, template.version.as_ref());
        }

        if let Some(primary) = &self.primary_package {
            expand_primary(primary, &mut action);
        }
        action.packages.extend(self.package.iter().map(expand_named));
        action
    }

    /// Inverse of [`ActionCommon::expand`]. Dedicated blocks must take
    /// their own properties out of `action` first; whatever text
    /// properties remain end up in `properties`.
    pub(crate) fn flatten(mut action: DeploymentAction, implied_features: &[&str]) -> Self {
        let props = &mut action.properties;
        let run_on_server = take_bool(props, RUN_ON_SERVER).unwrap_or(false);
        let features = take(props, ENABLED_FEATURES)
            .map(|raw| {
                split_csv(&raw)
                    .into_iter()
                    .filter(|f| !implied_features.contains(&f.as_str()))
                    .collect()
            })
            .unwrap_or_default();
        let action_template = take(props, TEMPLATE_ID).map(|id| ActionTemplate {
            id,
            version: take_non_empty(props, TEMPLATE_VERSION),
        });
        let (primary_package, package) = flatten_packages(action.packages, props);

        let properties = action
            .properties
            .into_iter()
            .filter_map(|(key, value)| match value {
                PropertyValue::Text(text) => Some((key, text)),
                PropertyValue::Sensitive(_) => None,
            })
            .collect();

        Self {
            id: action.id,
            name: action.name,
            is_disabled: action.is_disabled,
            is_required: action.is_required,
            notes: non_empty(action.notes.as_deref()),
            condition: non_empty(action.condition.as_deref()),
            channels: action.channels,
            environments: action.environments,
            excluded_environments: action.excluded_environments,
            tenant_tags: action.tenant_tags,
            container: action
                .container
                .filter(|c| c.feed_id.is_some() || c.image.is_some())
                .map(|c| ActionContainer {
                    feed_id: c.feed_id,
                    image: c.image,
                }),
            can_be_used_for_project_versioning: action.can_be_used_for_project_versioning,
            sort_order: DEFAULT_SORT_ORDER,
            properties,
            features,
            action_template,
            run_on_server,
            worker_pool_id: non_empty(action.worker_pool_id.as_deref()),
            worker_pool_variable: non_empty(action.worker_pool_variable.as_deref()),
            primary_package,
            package,
        }
    }

    /// Checks shared by every block; `path` is the block's attribute path.
    pub(crate) fn validate(&self, path: &str, diags: &mut Diagnostics) {
        if self.properties.contains_key(RUN_ON_SERVER) {
            diags.warning(
                join_path(path, "properties"),
                format!("{RUN_ON_SERVER} is managed by run_on_server; the property value is overwritten"),
            );
        }
        if self.worker_pool_id.is_some() && self.worker_pool_variable.is_some() {
            diags.error(
                join_path(path, "worker_pool_variable"),
                "worker_pool_id and worker_pool_variable cannot both be set",
            );
        }
    }
}

/// Common action attributes and blocks, added to a dedicated block.
pub(crate) fn common_block() -> Block {
    Block::new()
        .attr("id", Attribute::string().computed())
        .attr(
            "name",
            Attribute::string()
                .required()
                .validate(Validator::NonEmpty)
                .description("The name of the action."),
        )
        .attr("is_disabled", Attribute::bool().default(false))
        .attr("is_required", Attribute::bool().default(false))
        .attr("notes", Attribute::string())
        .attr("condition", Attribute::string())
        .attr("channels", Attribute::string_list())
        .attr("environments", Attribute::string_list())
        .attr(
            "excluded_environments",
            Attribute::string_list().conflicts_with(&["environments"]),
        )
        .attr("tenant_tags", Attribute::string_list())
        .attr(
            "can_be_used_for_project_versioning",
            Attribute::bool().default(false),
        )
        .attr(
            "sort_order",
            Attribute::int()
                .default(DEFAULT_SORT_ORDER)
                .description("Position of the action within its step; lower runs first."),
        )
        .attr("properties", Attribute::string_map())
        .attr(
            "features",
            Attribute::string_list().description("Octopus features enabled on this action."),
        )
        .attr(
            "run_on_server",
            Attribute::bool()
                .default(false)
                .description("Whether this step runs on a worker or on the target."),
        )
        .attr("worker_pool_id", Attribute::string())
        .attr("worker_pool_variable", Attribute::string())
        .block(
            "container",
            NestedBlock::single(
                Block::new()
                    .attr("feed_id", Attribute::string())
                    .attr("image", Attribute::string()),
            ),
        )
        .block(
            "action_template",
            NestedBlock::single(
                Block::new()
                    .attr("id", Attribute::string().required())
                    .attr("version", Attribute::string()),
            ),
        )
        .block("primary_package", primary_package_block())
        .block("package", package_list_block())
}

// ── Block seam ───────────────────────────────────────────────────────

/// A dedicated action block with its own attributes.
pub(crate) trait ActionBlock: Sized {
    fn schema() -> Block;

    fn common(&self) -> &ActionCommon;
    fn common_mut(&mut self) -> &mut ActionCommon;

    fn expand(&self) -> Result<DeploymentAction, CoreError>;

    /// `prior` is the configured block of the same name, for values the
    /// server does not echo back.
    fn flatten(action: DeploymentAction, prior: Option<&Self>) -> Result<Self, CoreError>;

    fn validate(&self, path: &str, diags: &mut Diagnostics) {
        self.common().validate(path, diags);
    }
}

// ── Generic action ───────────────────────────────────────────────────

/// `action` block: any action type without a dedicated block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenericAction {
    #[serde(flatten)]
    pub common: ActionCommon,
    pub action_type: String,
}

impl ActionBlock for GenericAction {
    fn schema() -> Block {
        common_block().attr(
            "action_type",
            Attribute::string()
                .required()
                .validate(Validator::NonEmpty)
                .description("The type of action, e.g. Octopus.AzurePowerShell."),
        )
    }

    fn common(&self) -> &ActionCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut ActionCommon {
        &mut self.common
    }

    fn expand(&self) -> Result<DeploymentAction, CoreError> {
        Ok(self.common.expand(&self.action_type, &[]))
    }

    fn flatten(action: DeploymentAction, _prior: Option<&Self>) -> Result<Self, CoreError> {
        let action_type = action.action_type.clone();
        Ok(Self {
            common: ActionCommon::flatten(action, &[]),
            action_type,
        })
    }

    fn validate(&self, path: &str, diags: &mut Diagnostics) {
        self.common.validate(path, diags);
        if let Some((_, block)) = DEDICATED_BLOCKS
            .iter()
            .find(|(action_type, _)| *action_type == self.action_type)
        {
            diags.warning(
                join_path(path, "action_type"),
                format!(
                    "{} has a dedicated block; prefer {block} over a generic action",
                    self.action_type
                ),
            );
        }
    }
}
