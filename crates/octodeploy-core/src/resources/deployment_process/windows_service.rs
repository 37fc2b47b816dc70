// deploy_windows_service_action: deploys the primary package and installs
// or reconfigures a Windows service from it.

use octodeploy_api::models::{DeploymentAction, PropertyValue, SensitiveValue};
use serde::{Deserialize, Serialize};

use super::action::{
    ActionBlock, ActionCommon, DEPLOY_WINDOWS_SERVICE, common_block, set, set_bool, set_opt, take,
    take_bool, take_non_empty,
};
use super::package::primary_package_block;
use crate::diagnostics::{Diagnostics, join_path};
use crate::error::CoreError;
use crate::schema::{Attribute, Block, Validator};

const FEATURE: &str = "Octopus.Features.WindowsService";

const ARGUMENTS: &str = "Octopus.Action.WindowsService.Arguments";
const CREATE_OR_UPDATE: &str = "Octopus.Action.WindowsService.CreateOrUpdateService";
const CUSTOM_ACCOUNT_NAME: &str = "Octopus.Action.WindowsService.CustomAccountName";
const CUSTOM_ACCOUNT_PASSWORD: &str = "Octopus.Action.WindowsService.CustomAccountPassword";
const DEPENDENCIES: &str = "Octopus.Action.WindowsService.Dependencies";
const DESCRIPTION: &str = "Octopus.Action.WindowsService.Description";
const DISPLAY_NAME: &str = "Octopus.Action.WindowsService.DisplayName";
const EXECUTABLE_PATH: &str = "Octopus.Action.WindowsService.ExecutablePath";
const SERVICE_ACCOUNT: &str = "Octopus.Action.WindowsService.ServiceAccount";
const SERVICE_NAME: &str = "Octopus.Action.WindowsService.ServiceName";
const START_MODE: &str = "Octopus.Action.WindowsService.StartMode";

pub const DEFAULT_SERVICE_ACCOUNT: &str = "LocalSystem";
pub const DEFAULT_START_MODE: &str = "auto";
const START_MODES: &[&str] = &["auto", "delayed-auto", "demand", "disabled", "unchanged"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployWindowsServiceAction {
    #[serde(flatten)]
    pub common: ActionCommon,
    pub executable_path: String,
    pub service_name: String,
    #[serde(default)]
    pub arguments: Option<String>,
    #[serde(default)]
    pub create_or_update_service: Option<bool>,
    #[serde(default)]
    pub custom_account_name: Option<String>,
    #[serde(default)]
    pub custom_account_password: Option<String>,
    /// Forward-slash separated service names.
    #[serde(default)]
    pub dependencies: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default = "default_service_account")]
    pub service_account: String,
    #[serde(default = "default_start_mode")]
    pub start_mode: String,
}

fn default_service_account() -> String {
    DEFAULT_SERVICE_ACCOUNT.to_owned()
}

fn default_start_mode() -> String {
    DEFAULT_START_MODE.to_owned()
}

impl ActionBlock for DeployWindowsServiceAction {
    fn schema() -> Block {
        common_block()
            .attr(
                "executable_path",
                Attribute::string()
                    .required()
                    .validate(Validator::NonEmpty)
                    .description("The path to the executable relative to the package installation directory."),
            )
            .attr(
                "service_name",
                Attribute::string()
                    .required()
                    .validate(Validator::NonEmpty)
                    .description("The name of the service."),
            )
            .attr(
                "arguments",
                Attribute::string()
                    .description("Command line arguments passed to the service when it starts."),
            )
            .attr("create_or_update_service", Attribute::bool().optional_computed())
            .attr("custom_account_name", Attribute::string())
            .attr(
                "custom_account_password",
                Attribute::string().sensitive(),
            )
            .attr("dependencies", Attribute::string())
            .attr("description", Attribute::string())
            .attr("display_name", Attribute::string())
            .attr(
                "service_account",
                Attribute::string()
                    .default(DEFAULT_SERVICE_ACCOUNT)
                    .description("Built-in account the service runs under, `_CUSTOM`, or an expression."),
            )
            .attr(
                "start_mode",
                Attribute::string().default(DEFAULT_START_MODE).one_of(START_MODES),
            )
            .block("primary_package", primary_package_block().required())
    }

    fn common(&self) -> &ActionCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut ActionCommon {
        &mut self.common
    }

    fn expand(&self) -> Result<DeploymentAction, CoreError> {
        let mut action = self.common.expand(DEPLOY_WINDOWS_SERVICE, &[FEATURE]);
        let props = &mut action.properties;
        set(props, EXECUTABLE_PATH, self.executable_path.clone());
        set(props, SERVICE_NAME, self.service_name.clone());
        set(props, SERVICE_ACCOUNT, self.service_account.clone());
        set(props, START_MODE, self.start_mode.clone());
        set_opt(props, ARGUMENTS, self.arguments.as_ref());
        set_opt(props, CUSTOM_ACCOUNT_NAME, self.custom_account_name.as_ref());
        set_opt(props, DEPENDENCIES, self.dependencies.as_ref());
        set_opt(props, DESCRIPTION, self.description.as_ref());
        set_opt(props, DISPLAY_NAME, self.display_name.as_ref());
        if let Some(create) = self.create_or_update_service {
            set_bool(props, CREATE_OR_UPDATE, create);
        }
        if let Some(password) = &self.custom_account_password {
            props.insert(
                CUSTOM_ACCOUNT_PASSWORD.to_owned(),
                PropertyValue::Sensitive(SensitiveValue::new(password.clone())),
            );
        }
        Ok(action)
    }

    fn flatten(mut action: DeploymentAction, prior: Option<&Self>) -> Result<Self, CoreError> {
        let props = &mut action.properties;
        // The server only reports whether a password is set.
        let has_password = matches!(
            props.remove(CUSTOM_ACCOUNT_PASSWORD),
            Some(PropertyValue::Sensitive(SensitiveValue { has_value: true, .. }))
        );
        let custom_account_password = if has_password {
            prior.and_then(|p| p.custom_account_password.clone())
        } else {
            None
        };

        let executable_path = take(props, EXECUTABLE_PATH).unwrap_or_default();
        let service_name = take(props, SERVICE_NAME).unwrap_or_default();
        let arguments = take_non_empty(props, ARGUMENTS);
        let create_or_update_service = take_bool(props, CREATE_OR_UPDATE);
        let custom_account_name = take_non_empty(props, CUSTOM_ACCOUNT_NAME);
        let dependencies = take_non_empty(props, DEPENDENCIES);
        let description = take_non_empty(props, DESCRIPTION);
        let display_name = take_non_empty(props, DISPLAY_NAME);
        let service_account = take_non_empty(props, SERVICE_ACCOUNT).unwrap_or_else(default_service_account);
        let start_mode = take_non_empty(props, START_MODE).unwrap_or_else(default_start_mode);

        Ok(Self {
            common: ActionCommon::flatten(action, &[FEATURE]),
            executable_path,
            service_name,
            arguments,
            create_or_update_service,
            custom_account_name,
            custom_account_password,
            dependencies,
            description,
            display_name,
            service_account,
            start_mode,
        })
    }

    fn validate(&self, path: &str, diags: &mut Diagnostics) {
        self.common.validate(path, diags);
        if self.common.primary_package.is_none() {
            diags.error(
                join_path(path, "primary_package"),
                "a Windows service action requires primary_package",
            );
        }
        if self.service_account == "_CUSTOM" && self.custom_account_name.is_none() {
            diags.error(
                join_path(path, "custom_account_name"),
                "service_account _CUSTOM requires custom_account_name",
            );
        }
    }
}
