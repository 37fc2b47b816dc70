// ── octopusdeploy_deployment_process ──
//
// A project's deployment process. Octopus creates the process together
// with its project, so this resource never POSTs or DELETEs: create
// adopts the project's process and replaces its steps, delete replaces
// them with nothing. Every PUT carries the version last read from the
// server.

pub mod action;
pub mod kubernetes_secret;
pub mod manual;
pub mod package;
pub mod script;
pub mod step;
pub mod terraform;
pub mod windows_service;

use async_trait::async_trait;
use octodeploy_api::OctopusClient;
use octodeploy_api::models::DeploymentProcess;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub use action::{ActionCommon, GenericAction};
pub use kubernetes_secret::DeployKubernetesSecretAction;
pub use manual::ManualInterventionAction;
pub use package::{DeployPackageAction, NamedPackage, PrimaryPackage};
pub use script::{RunKubectlScriptAction, RunScriptAction, ScriptFields};
pub use step::StepModel;
pub use terraform::ApplyTerraformTemplateAction;
pub use windows_service::DeployWindowsServiceAction;

use crate::diagnostics::{Diagnostics, index_path};
use crate::error::CoreError;
use crate::resource::{OrAbsent, Resource, require_id};
use crate::schema::{Attribute, Block, Schema, Validator};

pub const TYPE_NAME: &str = "octopusdeploy_deployment_process";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentProcessModel {
    #[serde(default)]
    pub id: Option<String>,
    pub project_id: String,
    #[serde(default)]
    pub space_id: Option<String>,
    #[serde(default)]
    pub version: Option<i32>,
    #[serde(default)]
    pub last_snapshot_id: Option<String>,
    #[serde(default)]
    pub step: Vec<StepModel>,
}

pub fn schema() -> Schema {
    Schema::new(
        Block::new()
            .description("Manages the deployment process of a project.")
            .id()
            .attr(
                "project_id",
                Attribute::string()
                    .required()
                    .validate(Validator::NonEmpty)
                    .description("The project that owns this deployment process."),
            )
            .space_id()
            .attr(
                "version",
                Attribute::int()
                    .computed()
                    .description("Server-side version, bumped on every change."),
            )
            .attr("last_snapshot_id", Attribute::string().computed())
            .block("step", step::step_block()),
    )
}

// ── Expand / flatten ─────────────────────────────────────────────────

/// Build the process to PUT over `current`, keeping its id and version.
pub fn expand(
    model: &DeploymentProcessModel,
    current: &DeploymentProcess,
) -> Result<DeploymentProcess, CoreError> {
    let steps = model
        .step
        .iter()
        .map(step::expand)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(DeploymentProcess {
        id: current.id.clone(),
        project_id: model.project_id.clone(),
        space_id: current.space_id.clone().or_else(|| model.space_id.clone()),
        version: current.version,
        last_snapshot_id: current.last_snapshot_id.clone(),
        steps,
    })
}

/// `prior` supplies write-only values and is matched to steps by name.
pub fn flatten(
    process: DeploymentProcess,
    prior: Option<&DeploymentProcessModel>,
) -> Result<DeploymentProcessModel, CoreError> {
    let step = process
        .steps
        .into_iter()
        .map(|s| {
            let prior_step = prior.and_then(|p| p.step.iter().find(|ps| ps.name == s.name));
            step::flatten(s, prior_step)
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(DeploymentProcessModel {
        id: Some(process.id),
        project_id: process.project_id,
        space_id: process
            .space_id
            .or_else(|| prior.and_then(|p| p.space_id.clone())),
        version: Some(process.version),
        last_snapshot_id: process.last_snapshot_id,
        step,
    })
}

// ── CRUD ─────────────────────────────────────────────────────────────

pub struct DeploymentProcessResource;

#[async_trait]
impl Resource for DeploymentProcessResource {
    type Model = DeploymentProcessModel;

    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        schema()
    }

    fn validate(&self, model: &DeploymentProcessModel, diags: &mut Diagnostics) {
        for (i, step) in model.step.iter().enumerate() {
            step::validate(step, &index_path("step", i), diags);
        }
    }

    async fn create(
        &self,
        client: &OctopusClient,
        planned: DeploymentProcessModel,
    ) -> Result<DeploymentProcessModel, CoreError> {
        let space = planned.space_id.as_deref();
        let project = client.get_project(space, &planned.project_id).await?;
        let process_id = project.deployment_process_id.ok_or_else(|| {
            CoreError::validation(
                "project_id",
                format!("project {} has no database-backed deployment process", project.id),
            )
        })?;
        let current = client.get_deployment_process(space, &process_id).await?;
        info!(
            id = %current.id,
            project = %planned.project_id,
            steps = planned.step.len(),
            "creating deployment process"
        );

        let updated = client
            .update_deployment_process(space, &expand(&planned, &current)?)
            .await?;
        flatten(updated, Some(&planned))
    }

    async fn read(
        &self,
        client: &OctopusClient,
        state: DeploymentProcessModel,
    ) -> Result<Option<DeploymentProcessModel>, CoreError> {
        let id = require_id(state.id.as_deref(), TYPE_NAME)?;
        let found = client
            .get_deployment_process(state.space_id.as_deref(), id)
            .await
            .or_absent()?;
        found.map(|p| flatten(p, Some(&state))).transpose()
    }

    async fn update(
        &self,
        client: &OctopusClient,
        state: DeploymentProcessModel,
        mut planned: DeploymentProcessModel,
    ) -> Result<DeploymentProcessModel, CoreError> {
        let id = require_id(state.id.as_deref(), TYPE_NAME)?;
        planned.space_id = planned.space_id.or(state.space_id.clone());
        let current = client
            .get_deployment_process(planned.space_id.as_deref(), id)
            .await?;
        info!(id, version = current.version, "updating deployment process");

        let updated = client
            .update_deployment_process(planned.space_id.as_deref(), &expand(&planned, &current)?)
            .await?;
        flatten(updated, Some(&planned))
    }

    async fn delete(
        &self,
        client: &OctopusClient,
        state: DeploymentProcessModel,
    ) -> Result<(), CoreError> {
        let id = require_id(state.id.as_deref(), TYPE_NAME)?;
        let space = state.space_id.as_deref();
        let Some(mut current) = client.get_deployment_process(space, id).await.or_absent()? else {
            debug!(id, "deployment process already gone");
            return Ok(());
        };
        info!(id, "clearing deployment process steps");
        current.steps.clear();
        client
            .update_deployment_process(space, &current)
            .await
            .or_absent()?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use octodeploy_api::models::{DeploymentAction, DeploymentStep, StepCondition};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn current() -> DeploymentProcess {
        DeploymentProcess {
            id: "deploymentprocess-Projects-1".into(),
            project_id: "Projects-1".into(),
            space_id: Some("Spaces-1".into()),
            version: 7,
            last_snapshot_id: None,
            steps: Vec::new(),
        }
    }

    #[test]
    fn expand_keeps_server_id_and_version() {
        let model: DeploymentProcessModel = serde_json::from_value(json!({
            "project_id": "Projects-1",
            "step": [{
                "name": "Hello",
                "run_script_action": [{ "name": "Hello", "script_body": "echo hi" }]
            }]
        }))
        .unwrap();
        let process = expand(&model, &current()).unwrap();
        assert_eq!(process.id, "deploymentprocess-Projects-1");
        assert_eq!(process.version, 7);
        assert_eq!(process.steps[0].actions[0].action_type, "Octopus.Script");
    }

    #[test]
    fn run_on_server_property_flattens_to_bool() {
        let mut action = DeploymentAction::new("Hello", "Octopus.Script");
        action
            .properties
            .insert("Octopus.Action.RunOnServer".into(), "True".into());
        action
            .properties
            .insert("Octopus.Action.Script.ScriptBody".into(), "echo hi".into());
        let mut process = current();
        process.steps.push(DeploymentStep {
            name: "Hello".into(),
            condition: StepCondition::Always,
            actions: vec![action],
            ..DeploymentStep::default()
        });

        let model = flatten(process, None).unwrap();
        assert_eq!(model.version, Some(7));
        let step = &model.step[0];
        assert_eq!(step.condition, StepCondition::Always);
        assert!(step.run_script_action[0].common.run_on_server);
        assert!(step.run_script_action[0].common.properties.is_empty());
    }

    #[test]
    fn schema_validation_reports_nested_paths() {
        let diags = schema().validate(&json!({
            "project_id": "Projects-1",
            "step": [{
                "name": "Deploy",
                "deploy_windows_service_action": [{
                    "name": "svc",
                    "executable_path": "svc.exe",
                    "service_name": "svc",
                    "start_mode": "sometimes",
                    "primary_package": { "package_id": "svc" }
                }]
            }]
        }));
        assert_eq!(
            diags.errors().next().and_then(|d| d.attribute.as_deref()),
            Some("step[0].deploy_windows_service_action[0].start_mode")
        );
    }

    #[test]
    fn variable_condition_needs_expression() {
        let model: DeploymentProcessModel = serde_json::from_value(json!({
            "project_id": "Projects-1",
            "step": [{
                "name": "Maybe",
                "condition": "Variable",
                "manual_intervention_action": [{ "name": "Ask", "instructions": "ok?" }]
            }]
        }))
        .unwrap();
        let mut diags = Diagnostics::new();
        Resource::validate(&DeploymentProcessResource, &model, &mut diags);
        assert_eq!(
            diags.errors().next().and_then(|d| d.attribute.as_deref()),
            Some("step[0].condition_expression")
        );
    }
}
