// apply_terraform_template_action
//
// The template is either inline (`inline_template`) or read from the
// primary package (`template` block), recorded as `ScriptSource`
// Inline/Package. Cloud credentials come from at most one account block.

use octodeploy_api::models::{DeploymentAction, Properties};
use serde::{Deserialize, Serialize};

use super::action::{
    ActionBlock, ActionCommon, TERRAFORM_APPLY, common_block, set, set_bool, set_opt, take,
    take_bool, take_non_empty,
};
use super::script::{SCRIPT_SOURCE, SOURCE_INLINE, SOURCE_PACKAGE};
use crate::diagnostics::{Diagnostics, join_path};
use crate::error::CoreError;
use crate::schema::{Attribute, Block, NestedBlock};

// ── Property keys ────────────────────────────────────────────────────

const TEMPLATE: &str = "Octopus.Action.Terraform.Template";
const TEMPLATE_PARAMETERS: &str = "Octopus.Action.Terraform.TemplateParameters";
const TEMPLATE_DIRECTORY: &str = "Octopus.Action.Terraform.TemplateDirectory";
const VAR_FILES: &str = "Octopus.Action.Terraform.VarFiles";
const RUN_FILE_SUBSTITUTION: &str = "Octopus.Action.Terraform.RunAutomaticFileSubstitution";
const FILE_SUBSTITUTION: &str = "Octopus.Action.Terraform.FileSubstitution";

const ALLOW_PLUGIN_DOWNLOADS: &str = "Octopus.Action.Terraform.AllowPluginDownloads";
const APPLY_PARAMS: &str = "Octopus.Action.Terraform.AdditionalActionParams";
const INIT_PARAMS: &str = "Octopus.Action.Terraform.AdditionalInitParams";
const PLUGINS_DIRECTORY: &str = "Octopus.Action.Terraform.PluginsDirectory";
const WORKSPACE: &str = "Octopus.Action.Terraform.Workspace";

const MANAGED_ACCOUNT: &str = "Octopus.Action.Terraform.ManagedAccount";
const AWS_REGION: &str = "Octopus.Action.Aws.Region";
const AWS_ASSUME_ROLE: &str = "Octopus.Action.Aws.AssumeRole";
const AWS_ROLE_ARN: &str = "Octopus.Action.Aws.AssumedRoleArn";
const AWS_EXTERNAL_ID: &str = "Octopus.Action.Aws.AssumeRoleExternalId";
const AWS_SESSION_NAME: &str = "Octopus.Action.Aws.AssumedRoleSession";
const AWS_SESSION_DURATION: &str = "Octopus.Action.Aws.AssumeRoleSessionDurationSeconds";
const AWS_VARIABLE: &str = "Octopus.Action.AwsAccount.Variable";
const AWS_INSTANCE_ROLE: &str = "Octopus.Action.AwsAccount.UseInstanceRole";

const AZURE_ENABLED: &str = "Octopus.Action.Terraform.AzureAccount";
const AZURE_VARIABLE: &str = "Octopus.Action.AzureAccount.Variable";

const GOOGLE_ENABLED: &str = "Octopus.Action.Terraform.GoogleCloudAccount";
const GOOGLE_VARIABLE: &str = "Octopus.Action.GoogleCloudAccount.Variable";
const GOOGLE_VM_ACCOUNT: &str = "Octopus.Action.GoogleCloud.UseVMServiceAccount";
const GOOGLE_IMPERSONATE: &str = "Octopus.Action.GoogleCloud.ImpersonateServiceAccount";
const GOOGLE_EMAILS: &str = "Octopus.Action.GoogleCloud.ServiceAccountEmails";
const GOOGLE_PROJECT: &str = "Octopus.Action.GoogleCloud.Project";
const GOOGLE_REGION: &str = "Octopus.Action.GoogleCloud.Region";
const GOOGLE_ZONE: &str = "Octopus.Action.GoogleCloud.Zone";

const AWS_MANAGED: &str = "AWS";
const ACCOUNT_BLOCKS: &[&str] = &["aws_account", "azure_account", "google_cloud_account"];

// ── Model ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvancedOptions {
    #[serde(default = "allow_by_default")]
    pub allow_additional_plugin_downloads: bool,
    #[serde(default)]
    pub apply_parameters: Option<String>,
    #[serde(default)]
    pub init_parameters: Option<String>,
    #[serde(default)]
    pub plugin_cache_directory: Option<String>,
    #[serde(default)]
    pub workspace: Option<String>,
}

fn allow_by_default() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsAccount {
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub variable: Option<String>,
    #[serde(default)]
    pub use_instance_role: bool,
    #[serde(default)]
    pub role: Option<AwsRole>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsRole {
    #[serde(default)]
    pub arn: Option<String>,
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub role_session_name: Option<String>,
    /// Seconds.
    #[serde(default)]
    pub session_duration: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AzureAccount {
    #[serde(default)]
    pub variable: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoogleCloudAccount {
    #[serde(default)]
    pub variable: Option<String>,
    #[serde(default)]
    pub use_vm_service_account: bool,
    #[serde(default)]
    pub impersonate_service_account: bool,
    #[serde(default)]
    pub service_account_emails: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub zone: Option<String>,
}

/// Template read from the primary package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackagedTemplate {
    #[serde(default)]
    pub directory: Option<String>,
    #[serde(default)]
    pub additional_variable_files: Option<String>,
    #[serde(default)]
    pub run_automatic_file_substitution: bool,
    #[serde(default)]
    pub target_files: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyTerraformTemplateAction {
    #[serde(flatten)]
    pub common: ActionCommon,
    pub advanced_options: AdvancedOptions,
    #[serde(default)]
    pub aws_account: Option<AwsAccount>,
    #[serde(default)]
    pub azure_account: Option<AzureAccount>,
    #[serde(default)]
    pub google_cloud_account: Option<GoogleCloudAccount>,
    #[serde(default)]
    pub template: Option<PackagedTemplate>,
    #[serde(default)]
    pub inline_template: Option<String>,
    #[serde(default)]
    pub template_parameters: Option<String>,
}

// ── Schema ───────────────────────────────────────────────────────────

fn advanced_options_block() -> Block {
    Block::new()
        .attr(
            "allow_additional_plugin_downloads",
            Attribute::bool().default(true),
        )
        .attr(
            "apply_parameters",
            Attribute::string().description("Additional parameters passed to `terraform apply`."),
        )
        .attr(
            "init_parameters",
            Attribute::string().description("Additional parameters passed to `terraform init`."),
        )
        .attr("plugin_cache_directory", Attribute::string())
        .attr("workspace", Attribute::string())
}

fn aws_account_block() -> Block {
    Block::new()
        .attr("region", Attribute::string())
        .attr("variable", Attribute::string())
        .attr("use_instance_role", Attribute::bool().default(false))
        .block(
            "role",
            NestedBlock::single(
                Block::new()
                    .attr("arn", Attribute::string())
                    .attr("external_id", Attribute::string())
                    .attr("role_session_name", Attribute::string())
                    .attr(
                        "session_duration",
                        Attribute::int().description("Session duration in seconds."),
                    ),
            ),
        )
}

fn google_cloud_account_block() -> Block {
    Block::new()
        .attr("variable", Attribute::string())
        .attr("use_vm_service_account", Attribute::bool().default(false))
        .attr("impersonate_service_account", Attribute::bool().default(false))
        .attr("service_account_emails", Attribute::string())
        .attr("project", Attribute::string())
        .attr("region", Attribute::string())
        .attr("zone", Attribute::string())
}

fn template_block() -> Block {
    Block::new()
        .attr(
            "directory",
            Attribute::string().description("Relative path of the template inside the package."),
        )
        .attr("additional_variable_files", Attribute::string())
        .attr(
            "run_automatic_file_substitution",
            Attribute::bool().default(false),
        )
        .attr("target_files", Attribute::string())
}

// ── Expand / flatten ─────────────────────────────────────────────────

fn expand_aws(aws: &AwsAccount, props: &mut Properties) {
    set(props, MANAGED_ACCOUNT, AWS_MANAGED);
    set_opt(props, AWS_REGION, aws.region.as_ref());
    set_opt(props, AWS_VARIABLE, aws.variable.as_ref());
    set_bool(props, AWS_INSTANCE_ROLE, aws.use_instance_role);
    if let Some(role) = &aws.role {
        set_bool(props, AWS_ASSUME_ROLE, true);
        set_opt(props, AWS_ROLE_ARN, role.arn.as_ref());
        set_opt(props, AWS_EXTERNAL_ID, role.external_id.as_ref());
        set_opt(props, AWS_SESSION_NAME, role.role_session_name.as_ref());
        if let Some(seconds) = role.session_duration {
            set(props, AWS_SESSION_DURATION, seconds.to_string());
        }
    }
}

fn flatten_aws(props: &mut Properties) -> Result<Option<AwsAccount>, CoreError> {
    let managed = take(props, MANAGED_ACCOUNT);
    let assume_role = take_bool(props, AWS_ASSUME_ROLE).unwrap_or(false);
    let region = take_non_empty(props, AWS_REGION);
    let variable = take_non_empty(props, AWS_VARIABLE);
    let use_instance_role = take_bool(props, AWS_INSTANCE_ROLE).unwrap_or(false);
    let arn = take_non_empty(props, AWS_ROLE_ARN);
    let external_id = take_non_empty(props, AWS_EXTERNAL_ID);
    let role_session_name = take_non_empty(props, AWS_SESSION_NAME);
    let session_duration = take_non_empty(props, AWS_SESSION_DURATION)
        .map(|raw| {
            raw.parse::<i64>().map_err(|_| {
                CoreError::validation("aws_account.role.session_duration", format!("not a number: {raw:?}"))
            })
        })
        .transpose()?;

    if managed.as_deref() != Some(AWS_MANAGED) {
        return Ok(None);
    }
    let role = assume_role.then_some(AwsRole {
        arn,
        external_id,
        role_session_name,
        session_duration,
    });
    Ok(Some(AwsAccount {
        region,
        variable,
        use_instance_role,
        role,
    }))
}

fn expand_google(google: &GoogleCloudAccount, props: &mut Properties) {
    set_bool(props, GOOGLE_ENABLED, true);
    set_opt(props, GOOGLE_VARIABLE, google.variable.as_ref());
    set_bool(props, GOOGLE_VM_ACCOUNT, google.use_vm_service_account);
    set_bool(props, GOOGLE_IMPERSONATE, google.impersonate_service_account);
    set_opt(props, GOOGLE_EMAILS, google.service_account_emails.as_ref());
    set_opt(props, GOOGLE_PROJECT, google.project.as_ref());
    set_opt(props, GOOGLE_REGION, google.region.as_ref());
    set_opt(props, GOOGLE_ZONE, google.zone.as_ref());
}

fn flatten_google(props: &mut Properties) -> Option<GoogleCloudAccount> {
    let enabled = take_bool(props, GOOGLE_ENABLED).unwrap_or(false);
    let account = GoogleCloudAccount {
        variable: take_non_empty(props, GOOGLE_VARIABLE),
        use_vm_service_account: take_bool(props, GOOGLE_VM_ACCOUNT).unwrap_or(false),
        impersonate_service_account: take_bool(props, GOOGLE_IMPERSONATE).unwrap_or(false),
        service_account_emails: take_non_empty(props, GOOGLE_EMAILS),
        project: take_non_empty(props, GOOGLE_PROJECT),
        region: take_non_empty(props, GOOGLE_REGION),
        zone: take_non_empty(props, GOOGLE_ZONE),
    };
    enabled.then_some(account)
}

impl ActionBlock for ApplyTerraformTemplateAction {
    fn schema() -> Block {
        common_block()
            .block(
                "advanced_options",
                NestedBlock::single(advanced_options_block()).required(),
            )
            .block("aws_account", NestedBlock::single(aws_account_block()))
            .block(
                "azure_account",
                NestedBlock::single(Block::new().attr("variable", Attribute::string())),
            )
            .block(
                "google_cloud_account",
                NestedBlock::single(google_cloud_account_block()),
            )
            .block("template", NestedBlock::single(template_block()))
            .attr(
                "inline_template",
                Attribute::string()
                    .conflicts_with(&["primary_package"])
                    .description("Terraform template source, used when no primary package is set."),
            )
            .attr(
                "template_parameters",
                Attribute::string().description("JSON object of template variable values."),
            )
    }

    fn common(&self) -> &ActionCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut ActionCommon {
        &mut self.common
    }

    fn expand(&self) -> Result<DeploymentAction, CoreError> {
        let mut action = self.common.expand(TERRAFORM_APPLY, &[]);
        let props = &mut action.properties;

        let source = if self.common.primary_package.is_some() {
            SOURCE_PACKAGE
        } else {
            SOURCE_INLINE
        };
        set(props, SCRIPT_SOURCE, source);
        set_opt(props, TEMPLATE, self.inline_template.as_ref());
        set_opt(props, TEMPLATE_PARAMETERS, self.template_parameters.as_ref());

        if let Some(template) = &self.template {
            set_opt(props, TEMPLATE_DIRECTORY, template.directory.as_ref());
            set_opt(props, VAR_FILES, template.additional_variable_files.as_ref());
            set_bool(props, RUN_FILE_SUBSTITUTION, template.run_automatic_file_substitution);
            set_opt(props, FILE_SUBSTITUTION, template.target_files.as_ref());
        }

        let options = &self.advanced_options;
        set_bool(props, ALLOW_PLUGIN_DOWNLOADS, options.allow_additional_plugin_downloads);
        set_opt(props, APPLY_PARAMS, options.apply_parameters.as_ref());
        set_opt(props, INIT_PARAMS, options.init_parameters.as_ref());
        set_opt(props, PLUGINS_DIRECTORY, options.plugin_cache_directory.as_ref());
        set_opt(props, WORKSPACE, options.workspace.as_ref());

        if let Some(aws) = &self.aws_account {
            expand_aws(aws, props);
        }
        if let Some(azure) = &self.azure_account {
            set_bool(props, AZURE_ENABLED, true);
            set_opt(props, AZURE_VARIABLE, azure.variable.as_ref());
        }
        if let Some(google) = &self.google_cloud_account {
            expand_google(google, props);
        }
        Ok(action)
    }

    fn flatten(mut action: DeploymentAction, _prior: Option<&Self>) -> Result<Self, CoreError> {
        let props = &mut action.properties;

        let packaged = take(props, SCRIPT_SOURCE).as_deref() == Some(SOURCE_PACKAGE);
        let template = PackagedTemplate {
            directory: take_non_empty(props, TEMPLATE_DIRECTORY),
            additional_variable_files: take_non_empty(props, VAR_FILES),
            run_automatic_file_substitution: take_bool(props, RUN_FILE_SUBSTITUTION)
                .unwrap_or(false),
            target_files: take_non_empty(props, FILE_SUBSTITUTION),
        };
        let inline_template = take(props, TEMPLATE);
        let template_parameters = take_non_empty(props, TEMPLATE_PARAMETERS);

        let advanced_options = AdvancedOptions {
            allow_additional_plugin_downloads: take_bool(props, ALLOW_PLUGIN_DOWNLOADS)
                .unwrap_or_else(allow_by_default),
            apply_parameters: take_non_empty(props, APPLY_PARAMS),
            init_parameters: take_non_empty(props, INIT_PARAMS),
            plugin_cache_directory: take_non_empty(props, PLUGINS_DIRECTORY),
            workspace: take_non_empty(props, WORKSPACE),
        };

        let aws_account = flatten_aws(props)?;
        let azure_enabled = take_bool(props, AZURE_ENABLED).unwrap_or(false);
        let azure_variable = take_non_empty(props, AZURE_VARIABLE);
        let azure_account = azure_enabled.then_some(AzureAccount {
            variable: azure_variable,
        });
        let google_cloud_account = flatten_google(props);

        Ok(Self {
            common: ActionCommon::flatten(action, &[]),
            advanced_options,
            aws_account,
            azure_account,
            google_cloud_account,
            template: packaged.then_some(template),
            inline_template: if packaged { None } else { inline_template },
            template_parameters,
        })
    }

    fn validate(&self, path: &str, diags: &mut Diagnostics) {
        self.common.validate(path, diags);

        let accounts = [
            self.aws_account.is_some(),
            self.azure_account.is_some(),
            self.google_cloud_account.is_some(),
        ];
        if accounts.iter().filter(|set| **set).count() > 1 {
            diags.error(
                join_path(path, ACCOUNT_BLOCKS[0]),
                format!("only one of [{}] may be specified", ACCOUNT_BLOCKS.join(", ")),
            );
        }

        match (&self.common.primary_package, &self.inline_template) {
            (None, None) => diags.error(
                join_path(path, "inline_template"),
                "inline_template is required when no primary_package is set",
            ),
            (None, Some(_)) if self.template.is_some() => diags.error(
                join_path(path, "template"),
                "template describes a packaged template and requires primary_package",
            ),
            _ => {}
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn inline() -> ApplyTerraformTemplateAction {
        serde_json::from_value(json!({
            "name": "Apply",
            "run_on_server": true,
            "advanced_options": { "workspace": "prod" },
            "inline_template": "resource \"null_resource\" \"x\" {}",
            "template_parameters": "{}"
        }))
        .unwrap()
    }

    #[test]
    fn inline_template_uses_inline_source() {
        let block = inline();
        assert!(block.advanced_options.allow_additional_plugin_downloads);

        let action = block.expand().unwrap();
        assert_eq!(action.action_type, "Octopus.TerraformApply");
        assert_eq!(action.property(SCRIPT_SOURCE), Some("Inline"));
        assert_eq!(action.property(WORKSPACE), Some("prod"));
        assert_eq!(action.property(ALLOW_PLUGIN_DOWNLOADS), Some("True"));
        assert_eq!(ApplyTerraformTemplateAction::flatten(action, None).unwrap(), block);
    }

    #[test]
    fn aws_role_round_trips() {
        let mut block = inline();
        block.aws_account = Some(AwsAccount {
            region: Some("us-east-1".into()),
            variable: Some("Aws.Account".into()),
            use_instance_role: false,
            role: Some(AwsRole {
                arn: Some("arn:aws:iam::1:role/deploy".into()),
                session_duration: Some(3600),
                ..AwsRole::default()
            }),
        });

        let action = block.expand().unwrap();
        assert_eq!(action.property(MANAGED_ACCOUNT), Some("AWS"));
        assert_eq!(action.property(AWS_ASSUME_ROLE), Some("True"));
        assert_eq!(action.property(AWS_SESSION_DURATION), Some("3600"));

        let back = ApplyTerraformTemplateAction::flatten(action, None).unwrap();
        assert!(back.common.properties.is_empty());
        assert_eq!(back, block);
    }

    #[test]
    fn packaged_template_flattens_template_block() {
        let block: ApplyTerraformTemplateAction = serde_json::from_value(json!({
            "name": "Apply",
            "advanced_options": {},
            "primary_package": { "package_id": "infra" },
            "template": { "directory": "envs/prod", "run_automatic_file_substitution": true },
            "google_cloud_account": { "variable": "Gcp", "project": "shop" }
        }))
        .unwrap();

        let action = block.expand().unwrap();
        assert_eq!(action.property(SCRIPT_SOURCE), Some("Package"));
        assert_eq!(action.property(GOOGLE_ENABLED), Some("True"));
        assert_eq!(ApplyTerraformTemplateAction::flatten(action, None).unwrap(), block);
    }

    #[test]
    fn two_account_blocks_are_rejected() {
        let mut block = inline();
        block.aws_account = Some(AwsAccount::default());
        block.azure_account = Some(AzureAccount::default());
        let mut diags = Diagnostics::new();
        block.validate("step[0].apply_terraform_template_action[0]", &mut diags);
        assert_eq!(
            diags.errors().next().and_then(|d| d.attribute.as_deref()),
            Some("step[0].apply_terraform_template_action[0].aws_account")
        );
    }

    #[test]
    fn missing_template_is_rejected() {
        let mut block = inline();
        block.inline_template = None;
        let mut diags = Diagnostics::new();
        block.validate("a", &mut diags);
        assert!(diags.has_errors());
    }
}
