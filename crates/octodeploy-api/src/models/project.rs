use serde::{Deserialize, Serialize};

/// Project, as far as the deployment process and variable resources
/// need it. Unmodeled fields are ignored on read; projects are never
/// written by this client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub space_id: Option<String>,
    #[serde(default)]
    pub deployment_process_id: Option<String>,
    #[serde(default)]
    pub variable_set_id: Option<String>,
}
