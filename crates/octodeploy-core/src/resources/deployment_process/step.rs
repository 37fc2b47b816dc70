// Deployment steps: step-level attributes plus one list per action block.
//
// Expand merges every action block of a step and orders the result by
// `sort_order` (stable, so equal orders keep block declaration order).
// Flatten dispatches each action on its type and records its position.

use std::collections::BTreeMap;

use octodeploy_api::models::{
    DeploymentAction, DeploymentStep, PackageRequirement, Properties, PropertyValue, StartTrigger,
    StepCondition,
};
use serde::{Deserialize, Serialize};
use strum::VariantNames;

use super::action::{
    self, ActionBlock, DEPLOY_KUBERNETES_SECRET, DEPLOY_PACKAGE, DEPLOY_WINDOWS_SERVICE,
    GenericAction, MANUAL_INTERVENTION, RUN_KUBECTL_SCRIPT, RUN_SCRIPT, TERRAFORM_APPLY, set,
    take, take_non_empty,
};
use super::kubernetes_secret::DeployKubernetesSecretAction;
use super::manual::ManualInterventionAction;
use super::package::DeployPackageAction;
use super::script::{RunKubectlScriptAction, RunScriptAction};
use super::terraform::ApplyTerraformTemplateAction;
use super::windows_service::DeployWindowsServiceAction;
use crate::convert::{join_csv, split_csv};
use crate::diagnostics::{Diagnostics, index_path, join_path};
use crate::error::CoreError;
use crate::schema::{Attribute, Block, NestedBlock, Validator};

const CONDITION_EXPRESSION: &str = "Octopus.Step.ConditionVariableExpression";
const TARGET_ROLES: &str = "Octopus.Action.TargetRoles";
const MAX_PARALLELISM: &str = "Octopus.Action.MaxParallelism";

/// Names of the action list blocks, in declaration order.
pub const ACTION_BLOCKS: &[&str] = &[
    "action",
    "run_script_action",
    "run_kubectl_script_action",
    "deploy_package_action",
    "deploy_windows_service_action",
    "deploy_kubernetes_secret_action",
    "apply_terraform_template_action",
    "manual_intervention_action",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepModel {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub condition: StepCondition,
    #[serde(default)]
    pub condition_expression: Option<String>,
    #[serde(default)]
    pub package_requirement: PackageRequirement,
    #[serde(default)]
    pub start_trigger: StartTrigger,
    #[serde(default)]
    pub target_roles: Vec<String>,
    /// Maximum number of targets deployed to in parallel.
    #[serde(default)]
    pub window_size: Option<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,

    #[serde(default)]
    pub action: Vec<GenericAction>,
    #[serde(default)]
    pub run_script_action: Vec<RunScriptAction>,
    #[serde(default)]
    pub run_kubectl_script_action: Vec<RunKubectlScriptAction>,
    #[serde(default)]
    pub deploy_package_action: Vec<DeployPackageAction>,
    #[serde(default)]
    pub deploy_windows_service_action: Vec<DeployWindowsServiceAction>,
    #[serde(default)]
    pub deploy_kubernetes_secret_action: Vec<DeployKubernetesSecretAction>,
    #[serde(default)]
    pub apply_terraform_template_action: Vec<ApplyTerraformTemplateAction>,
    #[serde(default)]
    pub manual_intervention_action: Vec<ManualInterventionAction>,
}

impl StepModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            condition: StepCondition::default(),
            condition_expression: None,
            package_requirement: PackageRequirement::default(),
            start_trigger: StartTrigger::default(),
            target_roles: Vec::new(),
            window_size: None,
            properties: BTreeMap::new(),
            action: Vec::new(),
            run_script_action: Vec::new(),
            run_kubectl_script_action: Vec::new(),
            deploy_package_action: Vec::new(),
            deploy_windows_service_action: Vec::new(),
            deploy_kubernetes_secret_action: Vec::new(),
            apply_terraform_template_action: Vec::new(),
            manual_intervention_action: Vec::new(),
        }
    }

    pub fn action_count(&self) -> usize {
        self.action.len()
            + self.run_script_action.len()
            + self.run_kubectl_script_action.len()
            + self.deploy_package_action.len()
            + self.deploy_windows_service_action.len()
            + self.deploy_kubernetes_secret_action.len()
            + self.apply_terraform_template_action.len()
            + self.manual_intervention_action.len()
    }
}

// ── Schema ───────────────────────────────────────────────────────────

pub(crate) fn step_block() -> NestedBlock {
    NestedBlock::list(
        Block::new()
            .attr("id", Attribute::string().computed())
            .attr(
                "name",
                Attribute::string()
                    .required()
                    .validate(Validator::NonEmpty)
                    .description("The name of the step."),
            )
            .attr(
                "condition",
                Attribute::string()
                    .default(StepCondition::Success.to_string())
                    .one_of(StepCondition::VARIANTS)
                    .description("When to run the step."),
            )
            .attr(
                "condition_expression",
                Attribute::string().description("Variable expression evaluated when condition is Variable."),
            )
            .attr(
                "package_requirement",
                Attribute::string()
                    .default(PackageRequirement::LetOctopusDecide.to_string())
                    .one_of(PackageRequirement::VARIANTS),
            )
            .attr(
                "start_trigger",
                Attribute::string()
                    .default(StartTrigger::StartAfterPrevious.to_string())
                    .one_of(StartTrigger::VARIANTS),
            )
            .attr(
                "target_roles",
                Attribute::string_list().description("Roles of the targets this step deploys to."),
            )
            .attr("window_size", Attribute::string())
            .attr("properties", Attribute::string_map())
            .block("action", NestedBlock::list(GenericAction::schema()))
            .block("run_script_action", NestedBlock::list(RunScriptAction::schema()))
            .block(
                "run_kubectl_script_action",
                NestedBlock::list(RunKubectlScriptAction::schema()),
            )
            .block(
                "deploy_package_action",
                NestedBlock::list(DeployPackageAction::schema()),
            )
            .block(
                "deploy_windows_service_action",
                NestedBlock::list(DeployWindowsServiceAction::schema()),
            )
            .block(
                "deploy_kubernetes_secret_action",
                NestedBlock::list(DeployKubernetesSecretAction::schema()),
            )
            .block(
                "apply_terraform_template_action",
                NestedBlock::list(ApplyTerraformTemplateAction::schema()),
            )
            .block(
                "manual_intervention_action",
                NestedBlock::list(ManualInterventionAction::schema()),
            ),
    )
}

// ── Expand ───────────────────────────────────────────────────────────

fn collect<A: ActionBlock>(
    blocks: &[A],
    out: &mut Vec<(i64, DeploymentAction)>,
) -> Result<(), CoreError> {
    for block in blocks {
        out.push((block.common().sort_order, block.expand()?));
    }
    Ok(())
}

pub fn expand(step: &StepModel) -> Result<DeploymentStep, CoreError> {
    let mut ordered = Vec::with_capacity(step.action_count());
    collect(&step.action, &mut ordered)?;
    collect(&step.run_script_action, &mut ordered)?;
    collect(&step.run_kubectl_script_action, &mut ordered)?;
    collect(&step.deploy_package_action, &mut ordered)?;
    collect(&step.deploy_windows_service_action, &mut ordered)?;
    collect(&step.deploy_kubernetes_secret_action, &mut ordered)?;
    collect(&step.apply_terraform_template_action, &mut ordered)?;
    collect(&step.manual_intervention_action, &mut ordered)?;
    ordered.sort_by_key(|(order, _)| *order);

    let mut properties: Properties = step
        .properties
        .iter()
        .map(|(key, value)| (key.clone(), PropertyValue::Text(value.clone())))
        .collect();
    if !step.target_roles.is_empty() {
        set(&mut properties, TARGET_ROLES, join_csv(&step.target_roles));
    }
    if let Some(window) = &step.window_size {
        set(&mut properties, MAX_PARALLELISM, window.clone());
    }
    if let Some(expression) = &step.condition_expression {
        set(&mut properties, CONDITION_EXPRESSION, expression.clone());
    }

    Ok(DeploymentStep {
        id: step.id.clone(),
        name: step.name.clone(),
        condition: step.condition,
        start_trigger: step.start_trigger,
        package_requirement: step.package_requirement,
        properties,
        actions: ordered.into_iter().map(|(_, action)| action).collect(),
    })
}

// ── Flatten ──────────────────────────────────────────────────────────

/// Flatten `action` into `out`. The prior block is matched by action name.
fn flatten_into<A: ActionBlock>(
    out: &mut Vec<A>,
    action: DeploymentAction,
    prior: &[A],
    sort_order: i64,
) -> Result<(), CoreError> {
    let prior = prior.iter().find(|p| p.common().name == action.name);
    let mut block = A::flatten(action, prior)?;
    block.common_mut().sort_order = sort_order;
    out.push(block);
    Ok(())
}

pub fn flatten(step: DeploymentStep, prior: Option<&StepModel>) -> Result<StepModel, CoreError> {
    let mut properties = step.properties;
    let mut model = StepModel::new(step.name);
    model.id = step.id;
    model.condition = step.condition;
    model.package_requirement = step.package_requirement;
    model.start_trigger = step.start_trigger;
    model.target_roles = take(&mut properties, TARGET_ROLES)
        .map(|raw| split_csv(&raw))
        .unwrap_or_default();
    model.window_size = take_non_empty(&mut properties, MAX_PARALLELISM);
    model.condition_expression = take_non_empty(&mut properties, CONDITION_EXPRESSION);
    model.properties = properties
        .into_iter()
        .filter_map(|(key, value)| match value {
            PropertyValue::Text(text) => Some((key, text)),
            PropertyValue::Sensitive(_) => None,
        })
        .collect();

    let empty = StepModel::new("");
    let prior = prior.unwrap_or(&empty);
    for (position, action) in step.actions.into_iter().enumerate() {
        let sort_order = i64::try_from(position + 1).unwrap_or(i64::MAX);
        match action.action_type.as_str() {
            RUN_SCRIPT => flatten_into(
                &mut model.run_script_action,
                action,
                &prior.run_script_action,
                sort_order,
            )?,
            RUN_KUBECTL_SCRIPT => flatten_into(
                &mut model.run_kubectl_script_action,
                action,
                &prior.run_kubectl_script_action,
                sort_order,
            )?,
            DEPLOY_PACKAGE => flatten_into(
                &mut model.deploy_package_action,
                action,
                &prior.deploy_package_action,
                sort_order,
            )?,
            DEPLOY_WINDOWS_SERVICE => flatten_into(
                &mut model.deploy_windows_service_action,
                action,
                &prior.deploy_windows_service_action,
                sort_order,
            )?,
            DEPLOY_KUBERNETES_SECRET => flatten_into(
                &mut model.deploy_kubernetes_secret_action,
                action,
                &prior.deploy_kubernetes_secret_action,
                sort_order,
            )?,
            TERRAFORM_APPLY => flatten_into(
                &mut model.apply_terraform_template_action,
                action,
                &prior.apply_terraform_template_action,
                sort_order,
            )?,
            MANUAL_INTERVENTION => flatten_into(
                &mut model.manual_intervention_action,
                action,
                &prior.manual_intervention_action,
                sort_order,
            )?,
            _ => flatten_into(&mut model.action, action, &prior.action, sort_order)?,
        }
    }
    Ok(model)
}

// ── Validation ───────────────────────────────────────────────────────

fn validate_blocks<A: ActionBlock>(blocks: &[A], path: &str, name: &str, diags: &mut Diagnostics) {
    let list_path = join_path(path, name);
    for (i, block) in blocks.iter().enumerate() {
        block.validate(&index_path(&list_path, i), diags);
    }
}

/// Cross-field checks for one step; `path` is e.g. `step[2]`.
pub(crate) fn validate(step: &StepModel, path: &str, diags: &mut Diagnostics) {
    if step.action_count() == 0 {
        diags.error_with_detail(
            path,
            "Step has no actions",
            format!("add one of [{}]", ACTION_BLOCKS.join(", ")),
        );
    }
    if step.condition == StepCondition::Variable && step.condition_expression.is_none() {
        diags.error(
            join_path(path, "condition_expression"),
            "condition Variable requires condition_expression",
        );
    }
    if step.properties.contains_key(action::RUN_ON_SERVER) {
        diags.warning(
            join_path(path, "properties"),
            "run_on_server is an action attribute; the step property is ignored by Octopus",
        );
    }

    validate_blocks(&step.action, path, "action", diags);
    validate_blocks(&step.run_script_action, path, "run_script_action", diags);
    validate_blocks(&step.run_kubectl_script_action, path, "run_kubectl_script_action", diags);
    validate_blocks(&step.deploy_package_action, path, "deploy_package_action", diags);
    validate_blocks(
        &step.deploy_windows_service_action,
        path,
        "deploy_windows_service_action",
        diags,
    );
    validate_blocks(
        &step.deploy_kubernetes_secret_action,
        path,
        "deploy_kubernetes_secret_action",
        diags,
    );
    validate_blocks(
        &step.apply_terraform_template_action,
        path,
        "apply_terraform_template_action",
        diags,
    );
    validate_blocks(
        &step.manual_intervention_action,
        path,
        "manual_intervention_action",
        diags,
    );
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn step() -> StepModel {
        serde_json::from_value(json!({
            "name": "Deploy",
            "target_roles": ["web", "api"],
            "window_size": "2",
            "run_script_action": [
                { "name": "second", "sort_order": 2, "script_body": "echo 2", "script_source": "Inline" }
            ],
            "manual_intervention_action": [
                { "name": "first", "sort_order": 1, "instructions": "approve" }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn actions_are_ordered_by_sort_order() {
        let expanded = expand(&step()).unwrap();
        let names: Vec<_> = expanded.actions.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["first", "second"]);
        assert_eq!(expanded.condition, StepCondition::Success);
    }

    #[test]
    fn equal_sort_orders_keep_declaration_order() {
        let mut step = StepModel::new("Deploy");
        step.run_script_action = step_actions(&["a", "b"]);
        let expanded = expand(&step).unwrap();
        let names: Vec<_> = expanded.actions.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
    }

    fn step_actions(names: &[&str]) -> Vec<RunScriptAction> {
        names
            .iter()
            .map(|name| {
                serde_json::from_value(json!({ "name": name, "script_body": "true" })).unwrap()
            })
            .collect()
    }

    #[test]
    fn step_properties_map_to_attributes() {
        let expanded = expand(&step()).unwrap();
        assert_eq!(
            expanded.properties.get(TARGET_ROLES),
            Some(&PropertyValue::Text("web,api".into()))
        );
        assert_eq!(
            expanded.properties.get(MAX_PARALLELISM),
            Some(&PropertyValue::Text("2".into()))
        );

        let back = flatten(expanded, None).unwrap();
        assert_eq!(back.target_roles, ["web", "api"]);
        assert_eq!(back.window_size.as_deref(), Some("2"));
        assert!(back.properties.is_empty());
    }

    #[test]
    fn flatten_dispatches_on_type_and_numbers_positions() {
        let original = step();
        let back = flatten(expand(&original).unwrap(), Some(&original)).unwrap();
        assert_eq!(back.manual_intervention_action.len(), 1);
        assert_eq!(back.run_script_action.len(), 1);
        assert_eq!(back.manual_intervention_action[0].common.sort_order, 1);
        assert_eq!(back.run_script_action[0].common.sort_order, 2);
        assert_eq!(back, original);
    }

    #[test]
    fn unknown_action_types_become_generic_actions() {
        let step = DeploymentStep {
            name: "Notify".into(),
            actions: vec![DeploymentAction::new("Mail", "Octopus.Email")],
            ..DeploymentStep::default()
        };
        let back = flatten(step, None).unwrap();
        assert_eq!(back.action.len(), 1);
        assert_eq!(back.action[0].action_type, "Octopus.Email");
    }

    #[test]
    fn step_without_actions_is_an_error() {
        let mut diags = Diagnostics::new();
        validate(&StepModel::new("Empty"), "step[0]", &mut diags);
        assert_eq!(
            diags.errors().next().and_then(|d| d.attribute.as_deref()),
            Some("step[0]")
        );
    }

    #[test]
    fn nested_action_errors_carry_their_path() {
        let mut step = StepModel::new("Deploy");
        step.deploy_package_action = vec![
            serde_json::from_value(json!({ "name": "no package" })).unwrap(),
        ];
        let mut diags = Diagnostics::new();
        validate(&step, "step[3]", &mut diags);
        assert_eq!(
            diags.errors().next().and_then(|d| d.attribute.as_deref()),
            Some("step[3].deploy_package_action[0].primary_package")
        );
    }
}
