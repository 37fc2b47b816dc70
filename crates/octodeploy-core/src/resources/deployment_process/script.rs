// run_script_action and run_kubectl_script_action.

use octodeploy_api::models::DeploymentAction;
use serde::{Deserialize, Serialize};

use super::action::{
    ActionBlock, ActionCommon, RUN_KUBECTL_SCRIPT, RUN_SCRIPT, common_block, set, set_opt, take,
    take_non_empty,
};
use crate::diagnostics::{Diagnostics, join_path};
use crate::error::CoreError;
use crate::schema::{Attribute, Block};

const SCRIPT_BODY: &str = "Octopus.Action.Script.ScriptBody";
const SCRIPT_FILE_NAME: &str = "Octopus.Action.Script.ScriptFileName";
const SCRIPT_PARAMETERS: &str = "Octopus.Action.Script.ScriptParameters";
pub(crate) const SCRIPT_SOURCE: &str = "Octopus.Action.Script.ScriptSource";
const SYNTAX: &str = "Octopus.Action.Script.Syntax";
const SUBSTITUTE_TARGET_FILES: &str = "Octopus.Action.SubstituteInFiles.TargetFiles";
const SUBSTITUTE_ENABLED: &str = "Octopus.Action.SubstituteInFiles.Enabled";
pub(crate) const SUBSTITUTE_FEATURE: &str = "Octopus.Features.SubstituteInFiles";
const KUBERNETES_NAMESPACE: &str = "Octopus.Action.KubernetesContainers.Namespace";

pub(crate) const SOURCE_INLINE: &str = "Inline";
pub(crate) const SOURCE_PACKAGE: &str = "Package";
const SCRIPT_SOURCES: &[&str] = &[SOURCE_INLINE, SOURCE_PACKAGE];
const SCRIPT_SYNTAXES: &[&str] = &["Bash", "CSharp", "FSharp", "PowerShell", "Python"];

/// Script attributes shared by both script blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptFields {
    #[serde(default)]
    pub script_body: Option<String>,
    #[serde(default)]
    pub script_file_name: Option<String>,
    #[serde(default)]
    pub script_parameters: Option<String>,
    #[serde(default)]
    pub script_source: Option<String>,
    #[serde(default)]
    pub script_syntax: Option<String>,
    /// Newline-separated file globs to run variable substitution on.
    #[serde(default)]
    pub variable_substitution_in_files: Option<String>,
}

impl ScriptFields {
    fn describe(block: Block) -> Block {
        block
            .attr("script_body", Attribute::string())
            .attr(
                "script_file_name",
                Attribute::string().description("The script file name in the package."),
            )
            .attr(
                "script_parameters",
                Attribute::string().description("Parameters passed to the script."),
            )
            .attr(
                "script_source",
                Attribute::string()
                    .optional_computed()
                    .one_of(SCRIPT_SOURCES),
            )
            .attr(
                "script_syntax",
                Attribute::string()
                    .optional_computed()
                    .one_of(SCRIPT_SYNTAXES),
            )
            .attr(
                "variable_substitution_in_files",
                Attribute::string().description(
                    "A newline-separated list of file names to transform, relative to the package contents.",
                ),
            )
    }

    /// Features to enable on top of the configured ones.
    fn implied_features(&self) -> &'static [&'static str] {
        if self.variable_substitution_in_files.is_some() {
            &[SUBSTITUTE_FEATURE]
        } else {
            &[]
        }
    }

    fn expand(&self, common: &ActionCommon, action_type: &str) -> DeploymentAction {
        let mut action = common.expand(action_type, self.implied_features());
        let props = &mut action.properties;

        let source = self.script_source.clone().unwrap_or_else(|| {
            if self.script_body.is_none() && common.primary_package.is_some() {
                SOURCE_PACKAGE.to_owned()
            } else {
                SOURCE_INLINE.to_owned()
            }
        });
        set(props, SCRIPT_SOURCE, source);
        set_opt(props, SCRIPT_BODY, self.script_body.as_ref());
        set_opt(props, SCRIPT_FILE_NAME, self.script_file_name.as_ref());
        set_opt(props, SCRIPT_PARAMETERS, self.script_parameters.as_ref());
        set_opt(props, SYNTAX, self.script_syntax.as_ref());
        if let Some(files) = &self.variable_substitution_in_files {
            set(props, SUBSTITUTE_TARGET_FILES, files.clone());
            set(props, SUBSTITUTE_ENABLED, "True");
        }
        action
    }

    /// Take the script properties out of `action`, returning the fields
    /// and the features they imply.
    fn flatten(action: &mut DeploymentAction) -> (Self, &'static [&'static str]) {
        let props = &mut action.properties;
        take(props, SUBSTITUTE_ENABLED);
        let fields = Self {
            script_body: take(props, SCRIPT_BODY),
            script_file_name: take_non_empty(props, SCRIPT_FILE_NAME),
            script_parameters: take_non_empty(props, SCRIPT_PARAMETERS),
            script_source: take_non_empty(props, SCRIPT_SOURCE),
            script_syntax: take_non_empty(props, SYNTAX),
            variable_substitution_in_files: take(props, SUBSTITUTE_TARGET_FILES),
        };
        let implied = fields.implied_features();
        (fields, implied)
    }

    fn validate(&self, common: &ActionCommon, path: &str, diags: &mut Diagnostics) {
        match self.script_source.as_deref() {
            Some(SOURCE_PACKAGE) if common.primary_package.is_none() => diags.error(
                join_path(path, "primary_package"),
                "a script sourced from a package requires primary_package",
            ),
            Some(SOURCE_INLINE) | None if self.script_body.is_none() && common.primary_package.is_none() => {
                diags.error(
                    join_path(path, "script_body"),
                    "an inline script requires script_body",
                );
            }
            _ => {}
        }
    }
}

// ── run_script_action ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunScriptAction {
    #[serde(flatten)]
    pub common: ActionCommon,
    #[serde(flatten)]
    pub script: ScriptFields,
}

impl ActionBlock for RunScriptAction {
    fn schema() -> Block {
        ScriptFields::describe(common_block())
    }

    fn common(&self) -> &ActionCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut ActionCommon {
        &mut self.common
    }

    fn expand(&self) -> Result<DeploymentAction, CoreError> {
        Ok(self.script.expand(&self.common, RUN_SCRIPT))
    }

    fn flatten(mut action: DeploymentAction, _prior: Option<&Self>) -> Result<Self, CoreError> {
        let (script, implied) = ScriptFields::flatten(&mut action);
        Ok(Self {
            common: ActionCommon::flatten(action, implied),
            script,
        })
    }

    fn validate(&self, path: &str, diags: &mut Diagnostics) {
        self.common.validate(path, diags);
        self.script.validate(&self.common, path, diags);
    }
}

// ── run_kubectl_script_action ────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunKubectlScriptAction {
    #[serde(flatten)]
    pub common: ActionCommon,
    #[serde(flatten)]
    pub script: ScriptFields,
    #[serde(default)]
    pub namespace: Option<String>,
}

impl ActionBlock for RunKubectlScriptAction {
    fn schema() -> Block {
        ScriptFields::describe(common_block()).attr(
            "namespace",
            Attribute::string().description("The Kubernetes namespace to run kubectl against."),
        )
    }

    fn common(&self) -> &ActionCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut ActionCommon {
        &mut self.common
    }

    fn expand(&self) -> Result<DeploymentAction, CoreError> {
        let mut action = self.script.expand(&self.common, RUN_KUBECTL_SCRIPT);
        set_opt(&mut action.properties, KUBERNETES_NAMESPACE, self.namespace.as_ref());
        Ok(action)
    }

    fn flatten(mut action: DeploymentAction, _prior: Option<&Self>) -> Result<Self, CoreError> {
        let namespace = take_non_empty(&mut action.properties, KUBERNETES_NAMESPACE);
        let (script, implied) = ScriptFields::flatten(&mut action);
        Ok(Self {
            common: ActionCommon::flatten(action, implied),
            script,
            namespace,
        })
    }

    fn validate(&self, path: &str, diags: &mut Diagnostics) {
        self.common.validate(path, diags);
        self.script.validate(&self.common, path, diags);
    }
}
