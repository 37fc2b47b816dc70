use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, VariantNames};

use super::ContainerImage;

// ── Property values ──────────────────────────────────────────────────

/// Write-only secret as the server models it: reads return only
/// `HasValue`, writes carry `NewValue`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SensitiveValue {
    #[serde(default)]
    pub has_value: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<String>,
}

impl SensitiveValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            has_value: true,
            new_value: Some(value.into()),
        }
    }
}

/// Value of a step or action property: plain text, or a sensitive value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Text(String),
    Sensitive(SensitiveValue),
}

impl PropertyValue {
    /// Plain text content; `None` for sensitive values.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Sensitive(_) => None,
        }
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

pub type Properties = BTreeMap<String, PropertyValue>;

// ── Deployment process ───────────────────────────────────────────────

/// Deployment process of a project:
/// `GET /api/{space}/deploymentprocesses/{id}`.
///
/// Updates must carry the current `Version`; the server rejects stale ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeploymentProcess {
    pub id: String,
    pub project_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_id: Option<String>,
    #[serde(default)]
    pub version: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_snapshot_id: Option<String>,
    #[serde(default)]
    pub steps: Vec<DeploymentStep>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeploymentStep {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub condition: StepCondition,
    #[serde(default)]
    pub start_trigger: StartTrigger,
    #[serde(default)]
    pub package_requirement: PackageRequirement,
    #[serde(default)]
    pub properties: Properties,
    #[serde(default)]
    pub actions: Vec<DeploymentAction>,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, VariantNames,
)]
pub enum StepCondition {
    Always,
    Failure,
    #[default]
    Success,
    Variable,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, VariantNames,
)]
pub enum StartTrigger {
    #[default]
    StartAfterPrevious,
    StartWithPrevious,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, VariantNames,
)]
pub enum PackageRequirement {
    #[default]
    LetOctopusDecide,
    BeforePackageAcquisition,
    AfterPackageAcquisition,
}

// ── Actions ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeploymentAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub action_type: String,
    #[serde(default)]
    pub is_disabled: bool,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default)]
    pub channels: Vec<String>,
    #[serde(default)]
    pub environments: Vec<String>,
    #[serde(default)]
    pub excluded_environments: Vec<String>,
    #[serde(default)]
    pub tenant_tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<ContainerImage>,
    #[serde(default)]
    pub can_be_used_for_project_versioning: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_pool_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_pool_variable: Option<String>,
    #[serde(default)]
    pub packages: Vec<PackageReference>,
    #[serde(default)]
    pub properties: Properties,
}

impl DeploymentAction {
    pub fn new(name: impl Into<String>, action_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            action_type: action_type.into(),
            ..Self::default()
        }
    }

    /// Text value of a property, if present and not sensitive.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(PropertyValue::as_text)
    }
}

/// Package referenced by an action. The primary package has an empty name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PackageReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    pub package_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feed_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acquisition_location: Option<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl PackageReference {
    pub fn is_primary(&self) -> bool {
        self.name.is_empty()
    }
}
