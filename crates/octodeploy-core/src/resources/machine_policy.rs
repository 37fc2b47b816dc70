// ── Machine policies ──
//
// Durations are human-readable in configuration (`1m`, `90s`) and
// TimeSpans on the wire. Flatten keeps the configured spelling whenever
// it still denotes the server's value, so `60s` does not drift to `1m`.

use async_trait::async_trait;
use octodeploy_api::OctopusClient;
use octodeploy_api::models::{
    CalamariUpdateBehavior, DeleteMachinesBehavior, HealthCheckType, MachineCleanupPolicy,
    MachineConnectivityBehavior, MachineConnectivityPolicy, MachineHealthCheckPolicy,
    MachinePolicy, MachineUpdatePolicy, ScriptPolicy, TentacleUpdateBehavior,
};
use serde::{Deserialize, Serialize};
use strum::VariantNames;
use tracing::info;

use crate::convert::{format_duration, non_empty, parse_duration};
use crate::error::CoreError;
use crate::resource::{OrAbsent, Resource, require_id};
use crate::schema::{Attribute, Block, NestedBlock, Schema, Validator};

pub const TYPE_NAME: &str = "octopusdeploy_machine_policy";

const SCRIPT_RUN_TYPES: &[&str] = &["Inline", "OnlyConnectivity"];

// ── Model ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachinePolicyModel {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub space_id: Option<String>,
    pub connection_connect_timeout: String,
    pub connection_retry_count_limit: i32,
    pub connection_retry_sleep_interval: String,
    pub connection_retry_time_limit: String,
    pub polling_request_maximum_message_processing_timeout: String,
    pub polling_request_queue_timeout: String,
    #[serde(default)]
    pub machine_cleanup_policy: Option<CleanupPolicy>,
    #[serde(default)]
    pub machine_connectivity_policy: Option<ConnectivityPolicy>,
    #[serde(default)]
    pub machine_health_check_policy: Option<HealthCheckPolicy>,
    #[serde(default)]
    pub machine_update_policy: Option<UpdatePolicy>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupPolicy {
    pub delete_machines_behavior: DeleteMachinesBehavior,
    pub delete_machines_elapsed_timespan: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectivityPolicy {
    pub machine_connectivity_behavior: MachineConnectivityBehavior,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckPolicy {
    #[serde(default)]
    pub health_check_interval: Option<String>,
    #[serde(default)]
    pub health_check_cron: Option<String>,
    #[serde(default)]
    pub health_check_cron_timezone: Option<String>,
    pub health_check_type: HealthCheckType,
    #[serde(default)]
    pub bash_health_check_policy: Option<HealthCheckScript>,
    #[serde(default)]
    pub powershell_health_check_policy: Option<HealthCheckScript>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckScript {
    pub run_type: String,
    #[serde(default)]
    pub script_body: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatePolicy {
    pub calamari_update_behavior: CalamariUpdateBehavior,
    pub tentacle_update_behavior: TentacleUpdateBehavior,
    #[serde(default)]
    pub tentacle_update_account_id: Option<String>,
}

// ── Schema ───────────────────────────────────────────────────────────

fn duration(default: &'static str) -> Attribute {
    Attribute::string()
        .default(default)
        .validate(Validator::Duration)
}

fn script_block() -> NestedBlock {
    NestedBlock::single(
        Block::new()
            .attr(
                "run_type",
                Attribute::string().default("Inline").one_of(SCRIPT_RUN_TYPES),
            )
            .attr("script_body", Attribute::string()),
    )
}

pub fn schema() -> Schema {
    Schema::new(
        Block::new()
            .description("Manages a machine policy in Octopus Deploy.")
            .id()
            .attr(
                "name",
                Attribute::string()
                    .required()
                    .validate(Validator::NonEmpty),
            )
            .attr("description", Attribute::string())
            .attr("is_default", Attribute::bool().computed())
            .space_id()
            .attr("connection_connect_timeout", duration("1m"))
            .attr(
                "connection_retry_count_limit",
                Attribute::int().default(5).validate(Validator::Range(0, 100)),
            )
            .attr("connection_retry_sleep_interval", duration("1s"))
            .attr("connection_retry_time_limit", duration("5m"))
            .attr(
                "polling_request_maximum_message_processing_timeout",
                duration("10m"),
            )
            .attr("polling_request_queue_timeout", duration("2m"))
            .block(
                "machine_cleanup_policy",
                NestedBlock::single(
                    Block::new()
                        .attr(
                            "delete_machines_behavior",
                            Attribute::string()
                                .default(DeleteMachinesBehavior::DoNotDelete.to_string())
                                .one_of(DeleteMachinesBehavior::VARIANTS),
                        )
                        .attr("delete_machines_elapsed_timespan", duration("1d")),
                ),
            )
            .block(
                "machine_connectivity_policy",
                NestedBlock::single(Block::new().attr(
                    "machine_connectivity_behavior",
                    Attribute::string()
                        .default(MachineConnectivityBehavior::ExpectedToBeOnline.to_string())
                        .one_of(MachineConnectivityBehavior::VARIANTS),
                )),
            )
            .block(
                "machine_health_check_policy",
                NestedBlock::single(
                    Block::new()
                        .attr(
                            "health_check_interval",
                            Attribute::string()
                                .validate(Validator::Duration)
                                .conflicts_with(&["health_check_cron"]),
                        )
                        .attr("health_check_cron", Attribute::string())
                        .attr("health_check_cron_timezone", Attribute::string())
                        .attr(
                            "health_check_type",
                            Attribute::string()
                                .default(HealthCheckType::RunScript.to_string())
                                .one_of(HealthCheckType::VARIANTS),
                        )
                        .block("bash_health_check_policy", script_block())
                        .block("powershell_health_check_policy", script_block()),
                ),
            )
            .block(
                "machine_update_policy",
                NestedBlock::single(
                    Block::new()
                        .attr(
                            "calamari_update_behavior",
                            Attribute::string()
                                .default(CalamariUpdateBehavior::UpdateOnDeployment.to_string())
                                .one_of(CalamariUpdateBehavior::VARIANTS),
                        )
                        .attr(
                            "tentacle_update_behavior",
                            Attribute::string()
                                .default(TentacleUpdateBehavior::NeverUpdate.to_string())
                                .one_of(TentacleUpdateBehavior::VARIANTS),
                        )
                        .attr("tentacle_update_account_id", Attribute::string()),
                ),
            ),
    )
}

// ── Expand / flatten ─────────────────────────────────────────────────

fn expand_script(script: Option<&HealthCheckScript>) -> ScriptPolicy {
    script.map_or_else(ScriptPolicy::default, |s| ScriptPolicy {
        run_type: s.run_type.clone(),
        script_body: s.script_body.clone(),
    })
}

pub fn expand(model: &MachinePolicyModel) -> Result<MachinePolicy, CoreError> {
    let mut policy = MachinePolicy::new(model.name.clone());
    policy.id.clone_from(&model.id);
    policy.description.clone_from(&model.description);
    policy.is_default = model.is_default;
    policy.space_id.clone_from(&model.space_id);
    policy.connection_connect_timeout =
        parse_duration("connection_connect_timeout", &model.connection_connect_timeout)?;
    policy.connection_retry_count_limit = model.connection_retry_count_limit;
    policy.connection_retry_sleep_interval = parse_duration(
        "connection_retry_sleep_interval",
        &model.connection_retry_sleep_interval,
    )?;
    policy.connection_retry_time_limit =
        parse_duration("connection_retry_time_limit", &model.connection_retry_time_limit)?;
    policy.polling_request_maximum_message_processing_timeout = parse_duration(
        "polling_request_maximum_message_processing_timeout",
        &model.polling_request_maximum_message_processing_timeout,
    )?;
    policy.polling_request_queue_timeout = parse_duration(
        "polling_request_queue_timeout",
        &model.polling_request_queue_timeout,
    )?;

    if let Some(cleanup) = &model.machine_cleanup_policy {
        policy.machine_cleanup_policy = MachineCleanupPolicy {
            delete_machines_behavior: cleanup.delete_machines_behavior,
            delete_machines_elapsed_timespan: parse_duration(
                "machine_cleanup_policy.delete_machines_elapsed_timespan",
                &cleanup.delete_machines_elapsed_timespan,
            )?,
        };
    }
    if let Some(connectivity) = &model.machine_connectivity_policy {
        policy.machine_connectivity_policy = MachineConnectivityPolicy {
            machine_connectivity_behavior: connectivity.machine_connectivity_behavior,
        };
    }
    if let Some(health) = &model.machine_health_check_policy {
        let interval = match &health.health_check_interval {
            Some(raw) => Some(parse_duration(
                "machine_health_check_policy.health_check_interval",
                raw,
            )?),
            None if health.health_check_cron.is_some() => None,
            None => MachineHealthCheckPolicy::default().health_check_interval,
        };
        policy.machine_health_check_policy = MachineHealthCheckPolicy {
            health_check_interval: interval,
            health_check_cron: health.health_check_cron.clone(),
            health_check_cron_timezone: health.health_check_cron_timezone.clone(),
            health_check_type: health.health_check_type,
            bash_health_check_policy: expand_script(health.bash_health_check_policy.as_ref()),
            powershell_health_check_policy: expand_script(
                health.powershell_health_check_policy.as_ref(),
            ),
        };
    }
    if let Some(update) = &model.machine_update_policy {
        policy.machine_update_policy = MachineUpdatePolicy {
            calamari_update_behavior: update.calamari_update_behavior,
            tentacle_update_behavior: update.tentacle_update_behavior,
            tentacle_update_account_id: update.tentacle_update_account_id.clone(),
        };
    }
    Ok(policy)
}

fn flatten_script(script: ScriptPolicy) -> HealthCheckScript {
    HealthCheckScript {
        run_type: script.run_type,
        script_body: non_empty(script.script_body.as_deref()),
    }
}

/// `prior` supplies the configured duration spellings.
pub fn flatten(policy: MachinePolicy, prior: Option<&MachinePolicyModel>) -> MachinePolicyModel {
    let health = policy.machine_health_check_policy;
    let prior_health = prior.and_then(|p| p.machine_health_check_policy.as_ref());
    let prior_cleanup = prior.and_then(|p| p.machine_cleanup_policy.as_ref());

    MachinePolicyModel {
        id: policy.id,
        name: policy.name,
        description: non_empty(policy.description.as_deref()),
        is_default: policy.is_default,
        space_id: policy.space_id,
        connection_connect_timeout: format_duration(
            policy.connection_connect_timeout,
            prior.map(|p| p.connection_connect_timeout.as_str()),
        ),
        connection_retry_count_limit: policy.connection_retry_count_limit,
        connection_retry_sleep_interval: format_duration(
            policy.connection_retry_sleep_interval,
            prior.map(|p| p.connection_retry_sleep_interval.as_str()),
        ),
        connection_retry_time_limit: format_duration(
            policy.connection_retry_time_limit,
            prior.map(|p| p.connection_retry_time_limit.as_str()),
        ),
        polling_request_maximum_message_processing_timeout: format_duration(
            policy.polling_request_maximum_message_processing_timeout,
            prior.map(|p| p.polling_request_maximum_message_processing_timeout.as_str()),
        ),
        polling_request_queue_timeout: format_duration(
            policy.polling_request_queue_timeout,
            prior.map(|p| p.polling_request_queue_timeout.as_str()),
        ),
        machine_cleanup_policy: Some(CleanupPolicy {
            delete_machines_behavior: policy.machine_cleanup_policy.delete_machines_behavior,
            delete_machines_elapsed_timespan: format_duration(
                policy.machine_cleanup_policy.delete_machines_elapsed_timespan,
                prior_cleanup.map(|c| c.delete_machines_elapsed_timespan.as_str()),
            ),
        }),
        machine_connectivity_policy: Some(ConnectivityPolicy {
            machine_connectivity_behavior: policy
                .machine_connectivity_policy
                .machine_connectivity_behavior,
        }),
        machine_health_check_policy: Some(HealthCheckPolicy {
            health_check_interval: health.health_check_interval.map(|d| {
                format_duration(
                    d,
                    prior_health.and_then(|h| h.health_check_interval.as_deref()),
                )
            }),
            health_check_cron: non_empty(health.health_check_cron.as_deref()),
            health_check_cron_timezone: non_empty(health.health_check_cron_timezone.as_deref()),
            health_check_type: health.health_check_type,
            bash_health_check_policy: Some(flatten_script(health.bash_health_check_policy)),
            powershell_health_check_policy: Some(flatten_script(
                health.powershell_health_check_policy,
            )),
        }),
        machine_update_policy: Some(UpdatePolicy {
            calamari_update_behavior: policy.machine_update_policy.calamari_update_behavior,
            tentacle_update_behavior: policy.machine_update_policy.tentacle_update_behavior,
            tentacle_update_account_id: policy.machine_update_policy.tentacle_update_account_id,
        }),
    }
}

// ── CRUD ─────────────────────────────────────────────────────────────

pub struct MachinePolicyResource;

#[async_trait]
impl Resource for MachinePolicyResource {
    type Model = MachinePolicyModel;

    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        schema()
    }

    async fn create(
        &self,
        client: &OctopusClient,
        planned: MachinePolicyModel,
    ) -> Result<MachinePolicyModel, CoreError> {
        info!(name = %planned.name, "creating machine policy");
        let policy = expand(&planned)?;
        let created = client
            .create_machine_policy(planned.space_id.as_deref(), &policy)
            .await?;
        Ok(flatten(created, Some(&planned)))
    }

    async fn read(
        &self,
        client: &OctopusClient,
        state: MachinePolicyModel,
    ) -> Result<Option<MachinePolicyModel>, CoreError> {
        let id = require_id(state.id.as_deref(), TYPE_NAME)?;
        let found = client
            .get_machine_policy(state.space_id.as_deref(), id)
            .await
            .or_absent()?;
        Ok(found.map(|policy| flatten(policy, Some(&state))))
    }

    async fn update(
        &self,
        client: &OctopusClient,
        state: MachinePolicyModel,
        mut planned: MachinePolicyModel,
    ) -> Result<MachinePolicyModel, CoreError> {
        let id = require_id(state.id.as_deref(), TYPE_NAME)?;
        info!(id, "updating machine policy");
        planned.id.clone_from(&state.id);
        planned.is_default = state.is_default;
        if planned.space_id.is_none() {
            planned.space_id.clone_from(&state.space_id);
        }

        let policy = expand(&planned)?;
        let updated = client
            .update_machine_policy(planned.space_id.as_deref(), id, &policy)
            .await?;
        Ok(flatten(updated, Some(&planned)))
    }

    async fn delete(
        &self,
        client: &OctopusClient,
        state: MachinePolicyModel,
    ) -> Result<(), CoreError> {
        let id = require_id(state.id.as_deref(), TYPE_NAME)?;
        info!(id, "deleting machine policy");
        client
            .delete_machine_policy(state.space_id.as_deref(), id)
            .await
            .or_absent()?;
        Ok(())
    }
}
