// manual_intervention_action

use octodeploy_api::models::DeploymentAction;
use serde::{Deserialize, Serialize};

use super::action::{
    ActionBlock, ActionCommon, MANUAL_INTERVENTION, common_block, set, set_bool, take, take_bool,
};
use crate::convert::{join_csv, split_csv};
use crate::error::CoreError;
use crate::schema::{Attribute, Block, Validator};

const INSTRUCTIONS: &str = "Octopus.Action.Manual.Instructions";
const RESPONSIBLE_TEAMS: &str = "Octopus.Action.Manual.ResponsibleTeamIds";
const BLOCK_DEPLOYMENTS: &str = "Octopus.Action.Manual.BlockConcurrentDeployments";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualInterventionAction {
    #[serde(flatten)]
    pub common: ActionCommon,
    pub instructions: String,
    #[serde(default)]
    pub responsible_teams: Vec<String>,
    #[serde(default)]
    pub block_deployments: bool,
}

impl ActionBlock for ManualInterventionAction {
    fn schema() -> Block {
        common_block()
            .attr(
                "instructions",
                Attribute::string()
                    .required()
                    .validate(Validator::NonEmpty)
                    .description("The instructions for the user to follow."),
            )
            .attr(
                "responsible_teams",
                Attribute::string_list().description("Teams allowed to submit the intervention."),
            )
            .attr(
                "block_deployments",
                Attribute::bool()
                    .default(false)
                    .description("Prevent other deployments while awaiting intervention."),
            )
    }

    fn common(&self) -> &ActionCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut ActionCommon {
        &mut self.common
    }

    fn expand(&self) -> Result<DeploymentAction, CoreError> {
        let mut action = self.common.expand(MANUAL_INTERVENTION, &[]);
        let props = &mut action.properties;
        set(props, INSTRUCTIONS, self.instructions.clone());
        if !self.responsible_teams.is_empty() {
            set(props, RESPONSIBLE_TEAMS, join_csv(&self.responsible_teams));
        }
        set_bool(props, BLOCK_DEPLOYMENTS, self.block_deployments);
        Ok(action)
    }

    fn flatten(mut action: DeploymentAction, _prior: Option<&Self>) -> Result<Self, CoreError> {
        let props = &mut action.properties;
        let instructions = take(props, INSTRUCTIONS).unwrap_or_default();
        let responsible_teams = take(props, RESPONSIBLE_TEAMS)
            .map(|raw| split_csv(&raw))
            .unwrap_or_default();
        let block_deployments = take_bool(props, BLOCK_DEPLOYMENTS).unwrap_or(false);
        Ok(Self {
            common: ActionCommon::flatten(action, &[]),
            instructions,
            responsible_teams,
            block_deployments,
        })
    }
}
