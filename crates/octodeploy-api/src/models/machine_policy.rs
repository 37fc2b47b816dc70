use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, VariantNames};

use crate::timespan;

/// Machine policy: `GET /api/{space}/machinepolicies/{id}`.
///
/// Every duration is a `TimeSpan` string on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MachinePolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_id: Option<String>,
    #[serde(with = "timespan")]
    pub connection_connect_timeout: Duration,
    pub connection_retry_count_limit: i32,
    #[serde(with = "timespan")]
    pub connection_retry_sleep_interval: Duration,
    #[serde(with = "timespan")]
    pub connection_retry_time_limit: Duration,
    #[serde(with = "timespan")]
    pub polling_request_maximum_message_processing_timeout: Duration,
    #[serde(with = "timespan")]
    pub polling_request_queue_timeout: Duration,
    #[serde(default)]
    pub machine_cleanup_policy: MachineCleanupPolicy,
    #[serde(default)]
    pub machine_connectivity_policy: MachineConnectivityPolicy,
    #[serde(default)]
    pub machine_health_check_policy: MachineHealthCheckPolicy,
    #[serde(default)]
    pub machine_update_policy: MachineUpdatePolicy,
}

impl MachinePolicy {
    /// A policy carrying the server's own defaults.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: None,
            is_default: false,
            space_id: None,
            connection_connect_timeout: Duration::from_secs(60),
            connection_retry_count_limit: 5,
            connection_retry_sleep_interval: Duration::from_secs(1),
            connection_retry_time_limit: Duration::from_secs(300),
            polling_request_maximum_message_processing_timeout: Duration::from_secs(600),
            polling_request_queue_timeout: Duration::from_secs(120),
            machine_cleanup_policy: MachineCleanupPolicy::default(),
            machine_connectivity_policy: MachineConnectivityPolicy::default(),
            machine_health_check_policy: MachineHealthCheckPolicy::default(),
            machine_update_policy: MachineUpdatePolicy::default(),
        }
    }
}

// ── Cleanup ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MachineCleanupPolicy {
    #[serde(default)]
    pub delete_machines_behavior: DeleteMachinesBehavior,
    #[serde(rename = "DeleteMachinesElapsedTimeSpan", with = "timespan")]
    pub delete_machines_elapsed_timespan: Duration,
}

impl Default for MachineCleanupPolicy {
    fn default() -> Self {
        Self {
            delete_machines_behavior: DeleteMachinesBehavior::default(),
            delete_machines_elapsed_timespan: Duration::from_secs(86_400),
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, VariantNames,
)]
pub enum DeleteMachinesBehavior {
    #[default]
    DoNotDelete,
    DeleteUnavailableMachines,
}

// ── Connectivity ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MachineConnectivityPolicy {
    #[serde(default)]
    pub machine_connectivity_behavior: MachineConnectivityBehavior,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, VariantNames,
)]
pub enum MachineConnectivityBehavior {
    #[default]
    ExpectedToBeOnline,
    MayBeOfflineAndCanBeSkipped,
}

// ── Health check ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MachineHealthCheckPolicy {
    #[serde(
        default,
        with = "timespan::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub health_check_interval: Option<Duration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check_cron: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check_cron_timezone: Option<String>,
    #[serde(default)]
    pub health_check_type: HealthCheckType,
    #[serde(default)]
    pub bash_health_check_policy: ScriptPolicy,
    #[serde(rename = "PowerShellHealthCheckPolicy", default)]
    pub powershell_health_check_policy: ScriptPolicy,
}

impl Default for MachineHealthCheckPolicy {
    fn default() -> Self {
        Self {
            health_check_interval: Some(Duration::from_secs(3_600)),
            health_check_cron: None,
            health_check_cron_timezone: None,
            health_check_type: HealthCheckType::default(),
            bash_health_check_policy: ScriptPolicy::default(),
            powershell_health_check_policy: ScriptPolicy::default(),
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, VariantNames,
)]
pub enum HealthCheckType {
    #[default]
    RunScript,
    OnlyConnectivity,
}

/// Health-check script for one shell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScriptPolicy {
    #[serde(default = "default_run_type")]
    pub run_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_body: Option<String>,
}

impl Default for ScriptPolicy {
    fn default() -> Self {
        Self {
            run_type: default_run_type(),
            script_body: None,
        }
    }
}

fn default_run_type() -> String {
    "Inline".to_owned()
}

// ── Updates ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MachineUpdatePolicy {
    #[serde(default)]
    pub calamari_update_behavior: CalamariUpdateBehavior,
    #[serde(default)]
    pub tentacle_update_behavior: TentacleUpdateBehavior,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tentacle_update_account_id: Option<String>,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, VariantNames,
)]
pub enum CalamariUpdateBehavior {
    #[default]
    UpdateOnDeployment,
    UpdateOnNewMachine,
    UpdateAlways,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, VariantNames,
)]
pub enum TentacleUpdateBehavior {
    #[default]
    NeverUpdate,
    Update,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn durations_travel_as_timespans() {
        let policy = MachinePolicy::new("Default");
        let value = serde_json::to_value(&policy).unwrap();

        assert_eq!(value["ConnectionConnectTimeout"], "00:01:00");
        assert_eq!(value["PollingRequestMaximumMessageProcessingTimeout"], "00:10:00");
        assert_eq!(
            value["MachineCleanupPolicy"],
            json!({
                "DeleteMachinesBehavior": "DoNotDelete",
                "DeleteMachinesElapsedTimeSpan": "1.00:00:00"
            })
        );

        let back: MachinePolicy = serde_json::from_value(value).unwrap();
        assert_eq!(back, policy);
    }
}
