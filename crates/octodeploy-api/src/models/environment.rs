use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

// ── Environment ──────────────────────────────────────────────────────

/// Deployment environment: `GET /api/{space}/environments/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Environment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub allow_dynamic_infrastructure: bool,
    #[serde(default)]
    pub use_guided_failure: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_id: Option<String>,
    #[serde(default)]
    pub extension_settings: Vec<ExtensionSettings>,
}

// ── Extension settings ───────────────────────────────────────────────

/// Per-extension environment settings, keyed on the wire by `ExtensionId`
/// with the payload under `Values`.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtensionSettings {
    /// `jira-integration`
    Jira { environment_type: String },
    /// `jiraservicemanagement-integration`
    JiraServiceManagement { change_controlled: bool },
    /// `servicenow-integration`
    ServiceNow { change_controlled: bool },
    /// Any extension this client does not model; round-tripped untouched.
    Other { extension_id: String, values: Value },
}

pub const JIRA_EXTENSION_ID: &str = "jira-integration";
pub const JSM_EXTENSION_ID: &str = "jiraservicemanagement-integration";
pub const SERVICENOW_EXTENSION_ID: &str = "servicenow-integration";

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawExtensionSettings {
    extension_id: String,
    #[serde(default)]
    values: Value,
}

#[derive(Serialize, Deserialize)]
struct JiraValues {
    #[serde(rename = "JiraEnvironmentType", default)]
    environment_type: String,
}

#[derive(Serialize, Deserialize)]
struct JsmValues {
    #[serde(rename = "JsmChangeControlled", default)]
    change_controlled: bool,
}

#[derive(Serialize, Deserialize)]
struct ServiceNowValues {
    #[serde(rename = "ServiceNowChangeControlled", default)]
    change_controlled: bool,
}

impl ExtensionSettings {
    pub fn extension_id(&self) -> &str {
        match self {
            Self::Jira { .. } => JIRA_EXTENSION_ID,
            Self::JiraServiceManagement { .. } => JSM_EXTENSION_ID,
            Self::ServiceNow { .. } => SERVICENOW_EXTENSION_ID,
            Self::Other { extension_id, .. } => extension_id,
        }
    }

    fn values(&self) -> Result<Value, serde_json::Error> {
        match self {
            Self::Jira { environment_type } => serde_json::to_value(JiraValues {
                environment_type: environment_type.clone(),
            }),
            Self::JiraServiceManagement { change_controlled } => {
                serde_json::to_value(JsmValues {
                    change_controlled: *change_controlled,
                })
            }
            Self::ServiceNow { change_controlled } => serde_json::to_value(ServiceNowValues {
                change_controlled: *change_controlled,
            }),
            Self::Other { values, .. } => Ok(values.clone()),
        }
    }
}

impl Serialize for ExtensionSettings {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let values = self.values().map_err(serde::ser::Error::custom)?;
        RawExtensionSettings {
            extension_id: self.extension_id().to_owned(),
            values,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ExtensionSettings {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error as _;

        let raw = RawExtensionSettings::deserialize(deserializer)?;
        let settings = match raw.extension_id.as_str() {
            JIRA_EXTENSION_ID => {
                let v: JiraValues = serde_json::from_value(raw.values).map_err(D::Error::custom)?;
                Self::Jira {
                    environment_type: v.environment_type,
                }
            }
            JSM_EXTENSION_ID => {
                let v: JsmValues = serde_json::from_value(raw.values).map_err(D::Error::custom)?;
                Self::JiraServiceManagement {
                    change_controlled: v.change_controlled,
                }
            }
            SERVICENOW_EXTENSION_ID => {
                let v: ServiceNowValues =
                    serde_json::from_value(raw.values).map_err(D::Error::custom)?;
                Self::ServiceNow {
                    change_controlled: v.change_controlled,
                }
            }
            _ => Self::Other {
                extension_id: raw.extension_id,
                values: raw.values,
            },
        };
        Ok(settings)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_known_and_unknown_extensions() {
        let env: Environment = serde_json::from_value(json!({
            "Id": "Environments-1",
            "Name": "Production",
            "SortOrder": 3,
            "ExtensionSettings": [
                { "ExtensionId": "jira-integration", "Values": { "JiraEnvironmentType": "production" } },
                { "ExtensionId": "servicenow-integration", "Values": { "ServiceNowChangeControlled": true } },
                { "ExtensionId": "acme-audit", "Values": { "Level": 2 } }
            ]
        }))
        .unwrap();

        assert_eq!(
            env.extension_settings,
            vec![
                ExtensionSettings::Jira {
                    environment_type: "production".into()
                },
                ExtensionSettings::ServiceNow {
                    change_controlled: true
                },
                ExtensionSettings::Other {
                    extension_id: "acme-audit".into(),
                    values: json!({ "Level": 2 })
                },
            ]
        );
    }

    #[test]
    fn encodes_extension_values_under_their_id() {
        let value = serde_json::to_value(ExtensionSettings::JiraServiceManagement {
            change_controlled: true,
        })
        .unwrap();
        assert_eq!(
            value,
            json!({
                "ExtensionId": "jiraservicemanagement-integration",
                "Values": { "JsmChangeControlled": true }
            })
        );
    }
}
