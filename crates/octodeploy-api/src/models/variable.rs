use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, VariantNames};

// ── Variable set ─────────────────────────────────────────────────────

/// Variable set owned by a project or library set:
/// `GET /api/{space}/variables/variableset-{owner}`.
///
/// The set is replaced wholesale on `PUT`, so callers read, modify and
/// write it back with the version they read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VariableSet {
    pub id: String,
    pub owner_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_id: Option<String>,
    #[serde(default)]
    pub version: i32,
    #[serde(default)]
    pub variables: Vec<Variable>,
}

impl VariableSet {
    /// Variable-set id for an owner (`variableset-Projects-1`).
    pub fn id_for_owner(owner_id: &str) -> String {
        format!("variableset-{owner_id}")
    }

    pub fn find(&self, variable_id: &str) -> Option<&Variable> {
        self.variables
            .iter()
            .find(|v| v.id.as_deref() == Some(variable_id))
    }
}

// ── Variable ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Variable {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "Type", default)]
    pub variable_type: VariableType,
    #[serde(default = "default_true")]
    pub is_editable: bool,
    #[serde(default)]
    pub is_sensitive: bool,
    #[serde(default)]
    pub scope: VariableScope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<VariablePromptOptions>,
}

fn default_true() -> bool {
    true
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, VariantNames,
)]
pub enum VariableType {
    #[default]
    String,
    Sensitive,
    Certificate,
    AmazonWebServicesAccount,
    AzureAccount,
    GoogleCloudAccount,
    WorkerPool,
}

/// Scope restrictions. The wire keys are singular (`Environment`, `Role`...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableScope {
    #[serde(rename = "Action", default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<String>,
    #[serde(rename = "Channel", default, skip_serializing_if = "Vec::is_empty")]
    pub channels: Vec<String>,
    #[serde(rename = "Environment", default, skip_serializing_if = "Vec::is_empty")]
    pub environments: Vec<String>,
    #[serde(rename = "Machine", default, skip_serializing_if = "Vec::is_empty")]
    pub machines: Vec<String>,
    #[serde(rename = "ProcessOwner", default, skip_serializing_if = "Vec::is_empty")]
    pub processes: Vec<String>,
    #[serde(rename = "Role", default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
    #[serde(rename = "TenantTag", default, skip_serializing_if = "Vec::is_empty")]
    pub tenant_tags: Vec<String>,
}

impl VariableScope {
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
            && self.channels.is_empty()
            && self.environments.is_empty()
            && self.machines.is_empty()
            && self.processes.is_empty()
            && self.roles.is_empty()
            && self.tenant_tags.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VariablePromptOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
}
