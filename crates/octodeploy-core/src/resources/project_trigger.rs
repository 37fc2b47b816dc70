// octopusdeploy_project_deployment_target_trigger
//
// Auto-deploy trigger fired by deployment target events. Only the
// machine-filter/auto-deploy shape is managed here; scheduled triggers
// read back as an unsupported variant.

use async_trait::async_trait;
use octodeploy_api::OctopusClient;
use octodeploy_api::models::{ProjectTrigger, TriggerAction, TriggerFilter};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::convert::non_empty;
use crate::error::CoreError;
use crate::resource::{OrAbsent, Resource, require_id};
use crate::schema::{Attribute, Block, Schema, Validator};

pub const TYPE_NAME: &str = "octopusdeploy_project_deployment_target_trigger";

pub const EVENT_GROUPS: &[&str] = &[
    "Machine",
    "MachineCritical",
    "MachineAvailableForDeployment",
    "MachineUnavailableForDeployment",
    "MachineHealthChanged",
];

pub const EVENT_CATEGORIES: &[&str] = &[
    "MachineCleanupFailed",
    "MachineAdded",
    "MachineDeploymentRelatedPropertyWasUpdated",
    "MachineDisabled",
    "MachineEnabled",
    "MachineHealthy",
    "MachineUnavailable",
    "MachineUnhealthy",
    "MachineHasWarnings",
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectTriggerModel {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub project_id: String,
    #[serde(default)]
    pub should_redeploy: bool,
    #[serde(default)]
    pub event_groups: Vec<String>,
    #[serde(default)]
    pub event_categories: Vec<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub environment_ids: Vec<String>,
    #[serde(default)]
    pub is_disabled: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub space_id: Option<String>,
}

pub fn schema() -> Schema {
    Schema::new(
        Block::new()
            .description("Automatically deploys a project when deployment target events occur.")
            .id()
            .attr(
                "name",
                Attribute::string()
                    .required()
                    .validate(Validator::NonEmpty),
            )
            .attr(
                "project_id",
                Attribute::string()
                    .required()
                    .validate(Validator::NonEmpty)
                    .description("The project this trigger deploys."),
            )
            .attr(
                "should_redeploy",
                Attribute::bool()
                    .default(false)
                    .description("Redeploy even when the target is already up to date."),
            )
            .attr(
                "event_groups",
                Attribute::string_list().validate(Validator::EachOneOf(EVENT_GROUPS)),
            )
            .attr(
                "event_categories",
                Attribute::string_list().validate(Validator::EachOneOf(EVENT_CATEGORIES)),
            )
            .attr("roles", Attribute::string_list())
            .attr("environment_ids", Attribute::string_list())
            .attr("is_disabled", Attribute::bool().default(false))
            .attr("description", Attribute::string())
            .space_id(),
    )
}

pub fn expand(model: &ProjectTriggerModel) -> ProjectTrigger {
    ProjectTrigger {
        id: model.id.clone(),
        name: model.name.clone(),
        description: model.description.clone(),
        is_disabled: model.is_disabled,
        project_id: model.project_id.clone(),
        space_id: model.space_id.clone(),
        filter: TriggerFilter::Machine {
            environment_ids: model.environment_ids.clone(),
            roles: model.roles.clone(),
            event_groups: model.event_groups.clone(),
            event_categories: model.event_categories.clone(),
        },
        action: TriggerAction::AutoDeploy {
            should_redeploy_when_machine_has_been_deployed_to: model.should_redeploy,
        },
    }
}

pub fn flatten(trigger: ProjectTrigger) -> Result<ProjectTriggerModel, CoreError> {
    let (environment_ids, roles, event_groups, event_categories) = match trigger.filter {
        TriggerFilter::Machine {
            environment_ids,
            roles,
            event_groups,
            event_categories,
        } => (environment_ids, roles, event_groups, event_categories),
        other => return Err(CoreError::unsupported("filter", other.filter_type())),
    };
    let should_redeploy = match trigger.action {
        TriggerAction::AutoDeploy {
            should_redeploy_when_machine_has_been_deployed_to,
        } => should_redeploy_when_machine_has_been_deployed_to,
        other => return Err(CoreError::unsupported("action", other.action_type())),
    };

    Ok(ProjectTriggerModel {
        id: trigger.id,
        name: trigger.name,
        project_id: trigger.project_id,
        should_redeploy,
        event_groups,
        event_categories,
        roles,
        environment_ids,
        is_disabled: trigger.is_disabled,
        description: non_empty(trigger.description.as_deref()),
        space_id: trigger.space_id,
    })
}

pub struct ProjectTriggerResource;

#[async_trait]
impl Resource for ProjectTriggerResource {
    type Model = ProjectTriggerModel;

    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        schema()
    }

    async fn create(
        &self,
        client: &OctopusClient,
        planned: ProjectTriggerModel,
    ) -> Result<ProjectTriggerModel, CoreError> {
        info!(name = %planned.name, project = %planned.project_id, "creating project trigger");
        let created = client
            .create_project_trigger(planned.space_id.as_deref(), &expand(&planned))
            .await?;
        flatten(created)
    }

    async fn read(
        &self,
        client: &OctopusClient,
        state: ProjectTriggerModel,
    ) -> Result<Option<ProjectTriggerModel>, CoreError> {
        let id = require_id(state.id.as_deref(), TYPE_NAME)?;
        client
            .get_project_trigger(state.space_id.as_deref(), id)
            .await
            .or_absent()?
            .map(flatten)
            .transpose()
    }

    async fn update(
        &self,
        client: &OctopusClient,
        state: ProjectTriggerModel,
        mut planned: ProjectTriggerModel,
    ) -> Result<ProjectTriggerModel, CoreError> {
        let id = require_id(state.id.as_deref(), TYPE_NAME)?;
        info!(id, "updating project trigger");
        planned.id = state.id.clone();
        planned.space_id = planned.space_id.or(state.space_id);

        let updated = client
            .update_project_trigger(planned.space_id.as_deref(), id, &expand(&planned))
            .await?;
        flatten(updated)
    }

    async fn delete(
        &self,
        client: &OctopusClient,
        state: ProjectTriggerModel,
    ) -> Result<(), CoreError> {
        let id = require_id(state.id.as_deref(), TYPE_NAME)?;
        info!(id, "deleting project trigger");
        client
            .delete_project_trigger(state.space_id.as_deref(), id)
            .await
            .or_absent()?;
        Ok(())
    }
}
