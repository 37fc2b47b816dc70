use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Project trigger: `GET /api/{space}/projecttriggers/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProjectTrigger {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub is_disabled: bool,
    pub project_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_id: Option<String>,
    pub filter: TriggerFilter,
    pub action: TriggerAction,
}

/// What fires the trigger, discriminated by `FilterType`.
///
/// Only machine filters are modeled field by field; schedule filters
/// keep their payload as-is, and unknown types (feed, git...) land in
/// [`Self::Other`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "FilterType", remote = "Self")]
pub enum TriggerFilter {
    #[serde(rename = "MachineFilter", rename_all = "PascalCase")]
    Machine {
        #[serde(default)]
        environment_ids: Vec<String>,
        #[serde(default)]
        roles: Vec<String>,
        #[serde(default)]
        event_groups: Vec<String>,
        #[serde(default)]
        event_categories: Vec<String>,
    },
    CronExpressionSchedule {
        #[serde(flatten)]
        fields: Map<String, Value>,
    },
    OnceDailySchedule {
        #[serde(flatten)]
        fields: Map<String, Value>,
    },
    DaysPerMonthSchedule {
        #[serde(flatten)]
        fields: Map<String, Value>,
    },
    ContinuousDailySchedule {
        #[serde(flatten)]
        fields: Map<String, Value>,
    },
    #[serde(skip)]
    Other { filter_type: String, raw: Value },
}

const FILTER_TYPE: &str = "FilterType";
const ACTION_TYPE: &str = "ActionType";

const KNOWN_FILTER_TYPES: &[&str] = &[
    "MachineFilter",
    "CronExpressionSchedule",
    "OnceDailySchedule",
    "DaysPerMonthSchedule",
    "ContinuousDailySchedule",
];

const KNOWN_ACTION_TYPES: &[&str] = &["AutoDeploy", "DeployLatestRelease", "DeployNewRelease"];

impl TriggerFilter {
    pub fn filter_type(&self) -> &str {
        match self {
            Self::Machine { .. } => "MachineFilter",
            Self::CronExpressionSchedule { .. } => "CronExpressionSchedule",
            Self::OnceDailySchedule { .. } => "OnceDailySchedule",
            Self::DaysPerMonthSchedule { .. } => "DaysPerMonthSchedule",
            Self::ContinuousDailySchedule { .. } => "ContinuousDailySchedule",
            Self::Other { filter_type, .. } => filter_type,
        }
    }
}

impl Serialize for TriggerFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Other { raw, .. } => {
                super::with_tag(raw, FILTER_TYPE, self.filter_type()).serialize(serializer)
            }
            known => Self::serialize(known, serializer),
        }
    }
}

impl<'de> Deserialize<'de> for TriggerFilter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        let kind = super::tag_of::<D::Error>(&raw, FILTER_TYPE)?;
        if KNOWN_FILTER_TYPES.contains(&kind.as_str()) {
            Self::deserialize(raw).map_err(D::Error::custom)
        } else {
            Ok(Self::Other {
                filter_type: kind,
                raw,
            })
        }
    }
}

/// What the trigger does, discriminated by `ActionType`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "ActionType", remote = "Self")]
pub enum TriggerAction {
    #[serde(rename_all = "PascalCase")]
    AutoDeploy {
        #[serde(default)]
        should_redeploy_when_machine_has_been_deployed_to: bool,
    },
    DeployLatestRelease {
        #[serde(flatten)]
        fields: Map<String, Value>,
    },
    DeployNewRelease {
        #[serde(flatten)]
        fields: Map<String, Value>,
    },
    #[serde(skip)]
    Other { action_type: String, raw: Value },
}

impl TriggerAction {
    pub fn action_type(&self) -> &str {
        match self {
            Self::AutoDeploy { .. } => "AutoDeploy",
            Self::DeployLatestRelease { .. } => "DeployLatestRelease",
            Self::DeployNewRelease { .. } => "DeployNewRelease",
            Self::Other { action_type, .. } => action_type,
        }
    }
}

impl Serialize for TriggerAction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Other { raw, .. } => {
                super::with_tag(raw, ACTION_TYPE, self.action_type()).serialize(serializer)
            }
            known => Self::serialize(known, serializer),
        }
    }
}

impl<'de> Deserialize<'de> for TriggerAction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        let kind = super::tag_of::<D::Error>(&raw, ACTION_TYPE)?;
        if KNOWN_ACTION_TYPES.contains(&kind.as_str()) {
            Self::deserialize(raw).map_err(D::Error::custom)
        } else {
            Ok(Self::Other {
                action_type: kind,
                raw,
            })
        }
    }
}
