// ── octopusdeploy_variable ──
//
// A single variable inside its owner's variable set. Octopus only
// accepts whole-set writes, so every mutation reads the set, edits one
// entry and PUTs it back with the version it read. A process-wide lock
// serializes those round trips; two concurrent writers would otherwise
// race on the version and one would lose.

use std::collections::BTreeSet;

use async_trait::async_trait;
use octodeploy_api::OctopusClient;
use octodeploy_api::models::{Variable, VariablePromptOptions, VariableScope, VariableSet, VariableType};
use serde::{Deserialize, Serialize};
use strum::VariantNames;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::convert::non_empty;
use crate::diagnostics::Diagnostics;
use crate::error::CoreError;
use crate::resource::{OrAbsent, Resource, require_id};
use crate::schema::{Attribute, Block, NestedBlock, Schema, Validator};

pub const TYPE_NAME: &str = "octopusdeploy_variable";

static VARIABLE_SET_LOCK: Mutex<()> = Mutex::const_new(());

// ── Model ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableModel {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(rename = "type")]
    pub variable_type: VariableType,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub sensitive_value: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "editable_by_default")]
    pub is_editable: bool,
    #[serde(default)]
    pub is_sensitive: bool,
    #[serde(default)]
    pub scope: Option<ScopeModel>,
    #[serde(default)]
    pub prompt: Option<PromptModel>,
    #[serde(default)]
    pub space_id: Option<String>,
}

fn editable_by_default() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeModel {
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default)]
    pub channels: Vec<String>,
    #[serde(default)]
    pub environments: Vec<String>,
    #[serde(default)]
    pub machines: Vec<String>,
    #[serde(default)]
    pub processes: Vec<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub tenant_tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptModel {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_required: bool,
}

impl VariableModel {
    /// Owning project or library variable set.
    pub fn owner(&self) -> Result<&str, CoreError> {
        self.project_id
            .as_deref()
            .or(self.owner_id.as_deref())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| CoreError::validation("owner_id", "one of project_id or owner_id must be set"))
    }
}

/// Import ids take the form `OwnerID:VariableID`.
fn import_state(import_id: &str) -> Result<VariableModel, CoreError> {
    let (owner, id) = match import_id.split_once(':') {
        Some((owner, id)) if !owner.is_empty() && !id.is_empty() && !id.contains(':') => (owner, id),
        _ => {
            return Err(CoreError::validation(
                "id",
                format!(
                    "{TYPE_NAME} import id must be OwnerID:VariableID \
                     (e.g. Projects-62:0906031f-68ba-4a15-afaa-657c1564e07b), got {import_id:?}"
                ),
            ));
        }
    };
    Ok(VariableModel {
        id: Some(id.to_owned()),
        name: String::new(),
        owner_id: Some(owner.to_owned()),
        project_id: None,
        variable_type: VariableType::default(),
        value: None,
        sensitive_value: None,
        description: None,
        is_editable: true,
        is_sensitive: false,
        scope: None,
        prompt: None,
        space_id: None,
    })
}

// ── Schema ───────────────────────────────────────────────────────────

const SCOPE_FIELDS: &[&str] = &[
    "actions",
    "channels",
    "environments",
    "machines",
    "processes",
    "roles",
    "tenant_tags",
];

pub fn schema() -> Schema {
    let mut scope = Block::new();
    for &field in SCOPE_FIELDS {
        scope = scope.attr(field, Attribute::string_list());
    }

    Schema::new(
        Block::new()
            .description("Manages a variable in a project or library variable set.")
            .id()
            .attr(
                "name",
                Attribute::string()
                    .required()
                    .validate(Validator::NonEmpty)
                    .description("The name of this variable."),
            )
            .attr(
                "owner_id",
                Attribute::string().description("The library variable set or project that owns this variable."),
            )
            .attr("project_id", Attribute::string())
            .exactly_one_of(&["owner_id", "project_id"])
            .attr(
                "type",
                Attribute::string()
                    .required()
                    .one_of(VariableType::VARIANTS)
                    .description("The type of variable represented by this resource."),
            )
            .attr("value", Attribute::string())
            .attr(
                "sensitive_value",
                Attribute::string().sensitive().conflicts_with(&["value"]),
            )
            .attr("description", Attribute::string())
            .attr("is_editable", Attribute::bool().default(true))
            .attr(
                "is_sensitive",
                Attribute::bool()
                    .default(false)
                    .description("Must be true exactly when type is Sensitive."),
            )
            .space_id()
            .block("scope", NestedBlock::single(scope))
            .block(
                "prompt",
                NestedBlock::single(
                    Block::new()
                        .attr("label", Attribute::string())
                        .attr("description", Attribute::string())
                        .attr("is_required", Attribute::bool().default(false)),
                ),
            ),
    )
}

// ── Expand / flatten ─────────────────────────────────────────────────

pub fn expand(model: &VariableModel) -> Variable {
    let value = if model.is_sensitive {
        model.sensitive_value.clone()
    } else {
        model.value.clone()
    };
    let scope = model.scope.clone().unwrap_or_default();
    Variable {
        id: model.id.clone(),
        name: model.name.clone(),
        value,
        description: model.description.clone(),
        variable_type: model.variable_type,
        is_editable: model.is_editable,
        is_sensitive: model.is_sensitive,
        scope: VariableScope {
            actions: scope.actions,
            channels: scope.channels,
            environments: scope.environments,
            machines: scope.machines,
            processes: scope.processes,
            roles: scope.roles,
            tenant_tags: scope.tenant_tags,
        },
        prompt: model.prompt.as_ref().map(|p| VariablePromptOptions {
            label: p.label.clone(),
            description: p.description.clone(),
            required: p.is_required,
        }),
    }
}

/// `prior` supplies the owner and the write-only sensitive value.
pub fn flatten(variable: Variable, prior: &VariableModel) -> VariableModel {
    let scope = (!variable.scope.is_empty()).then(|| ScopeModel {
        actions: variable.scope.actions,
        channels: variable.scope.channels,
        environments: variable.scope.environments,
        machines: variable.scope.machines,
        processes: variable.scope.processes,
        roles: variable.scope.roles,
        tenant_tags: variable.scope.tenant_tags,
    });
    let (value, sensitive_value) = if variable.is_sensitive {
        (None, prior.sensitive_value.clone())
    } else {
        (variable.value, None)
    };

    VariableModel {
        id: variable.id,
        name: variable.name,
        owner_id: prior.owner_id.clone(),
        project_id: prior.project_id.clone(),
        variable_type: variable.variable_type,
        value,
        sensitive_value,
        description: non_empty(variable.description.as_deref()),
        is_editable: variable.is_editable,
        is_sensitive: variable.is_sensitive,
        scope,
        prompt: variable.prompt.map(|p| PromptModel {
            label: p.label,
            description: p.description,
            is_required: p.required,
        }),
        space_id: prior.space_id.clone(),
    }
}

fn same_members(a: &[String], b: &[String]) -> bool {
    a.iter().collect::<BTreeSet<_>>() == b.iter().collect::<BTreeSet<_>>()
}

fn same_scope(a: &VariableScope, b: &VariableScope) -> bool {
    same_members(&a.actions, &b.actions)
        && same_members(&a.channels, &b.channels)
        && same_members(&a.environments, &b.environments)
        && same_members(&a.machines, &b.machines)
        && same_members(&a.processes, &b.processes)
        && same_members(&a.roles, &b.roles)
        && same_members(&a.tenant_tags, &b.tenant_tags)
}

/// Find the written variable in the set the server returned: by id
/// first, then by name, type and scope.
fn locate<'a>(set: &'a VariableSet, written: &Variable) -> Option<&'a Variable> {
    written
        .id
        .as_deref()
        .and_then(|id| set.find(id))
        .or_else(|| {
            set.variables.iter().find(|v| {
                v.name == written.name
                    && v.variable_type == written.variable_type
                    && v.is_sensitive == written.is_sensitive
                    && (v.is_sensitive || v.value == written.value)
                    && same_scope(&v.scope, &written.scope)
            })
        })
}

// ── CRUD ─────────────────────────────────────────────────────────────

pub struct VariableResource;

impl VariableResource {
    /// Read-modify-write of the owner's set under the process-wide lock.
    /// `edit` reports whether it changed the set; unchanged sets are not
    /// written back. Returns the set as the server saved it.
    async fn modify_set<F>(
        client: &OctopusClient,
        model: &VariableModel,
        edit: F,
    ) -> Result<Option<VariableSet>, CoreError>
    where
        F: FnOnce(&mut VariableSet) -> Result<bool, CoreError> + Send,
    {
        let owner = model.owner()?;
        let space = model.space_id.as_deref();
        let set_id = VariableSet::id_for_owner(owner);

        let _guard = VARIABLE_SET_LOCK.lock().await;
        let mut set = client.get_variable_set(space, &set_id).await?;
        if !edit(&mut set)? {
            return Ok(None);
        }
        debug!(set = %set_id, version = set.version, "writing variable set");
        Ok(Some(client.update_variable_set(space, &set).await?))
    }

    fn located(saved: Option<VariableSet>, written: &Variable) -> Result<Variable, CoreError> {
        saved
            .as_ref()
            .and_then(|set| locate(set, written))
            .cloned()
            .ok_or_else(|| CoreError::NotFound {
                entity_type: "variable".into(),
                identifier: written.name.clone(),
            })
    }
}

#[async_trait]
impl Resource for VariableResource {
    type Model = VariableModel;

    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        schema()
    }

    fn import(&self, id: &str) -> Result<VariableModel, CoreError> {
        import_state(id)
    }

    fn validate(&self, model: &VariableModel, diags: &mut Diagnostics) {
        let sensitive_type = model.variable_type == VariableType::Sensitive;
        if model.is_sensitive && !sensitive_type {
            diags.error("type", "when is_sensitive is true, type must be Sensitive");
        }
        if !model.is_sensitive && sensitive_type {
            diags.error("is_sensitive", "when type is Sensitive, is_sensitive must be true");
        }
        if sensitive_type && model.value.is_some() {
            diags.error("value", "sensitive variables take their value from sensitive_value");
        }
        if !sensitive_type && model.sensitive_value.is_some() {
            diags.error("sensitive_value", "sensitive_value requires type Sensitive");
        }
    }

    async fn create(
        &self,
        client: &OctopusClient,
        planned: VariableModel,
    ) -> Result<VariableModel, CoreError> {
        let mut variable = expand(&planned);
        variable.id = Some(Uuid::new_v4().to_string());
        info!(name = %planned.name, owner = planned.owner()?, "creating variable");

        let pushed = variable.clone();
        let saved = Self::modify_set(client, &planned, move |set| {
            set.variables.push(pushed);
            Ok(true)
        })
        .await?;
        Ok(flatten(Self::located(saved, &variable)?, &planned))
    }

    async fn read(
        &self,
        client: &OctopusClient,
        state: VariableModel,
    ) -> Result<Option<VariableModel>, CoreError> {
        let id = require_id(state.id.as_deref(), TYPE_NAME)?;
        let set_id = VariableSet::id_for_owner(state.owner()?);
        let Some(set) = client
            .get_variable_set(state.space_id.as_deref(), &set_id)
            .await
            .or_absent()?
        else {
            return Ok(None);
        };
        Ok(set.find(id).cloned().map(|v| flatten(v, &state)))
    }

    async fn update(
        &self,
        client: &OctopusClient,
        state: VariableModel,
        mut planned: VariableModel,
    ) -> Result<VariableModel, CoreError> {
        let id = require_id(state.id.as_deref(), TYPE_NAME)?.to_owned();
        planned.id = Some(id.clone());
        planned.space_id = planned.space_id.or(state.space_id);
        info!(id, "updating variable");

        let variable = expand(&planned);
        let replacement = variable.clone();
        let saved = Self::modify_set(client, &planned, move |set| {
            let slot = set
                .variables
                .iter_mut()
                .find(|v| v.id.as_deref() == Some(id.as_str()))
                .ok_or_else(|| CoreError::NotFound {
                    entity_type: "variable".into(),
                    identifier: id.clone(),
                })?;
            *slot = replacement;
            Ok(true)
        })
        .await?;
        Ok(flatten(Self::located(saved, &variable)?, &planned))
    }

    async fn delete(&self, client: &OctopusClient, state: VariableModel) -> Result<(), CoreError> {
        let id = require_id(state.id.as_deref(), TYPE_NAME)?.to_owned();
        info!(id, "deleting variable");

        let result = Self::modify_set(client, &state, |set| {
            let before = set.variables.len();
            set.variables.retain(|v| v.id.as_deref() != Some(id.as_str()));
            if set.variables.len() == before {
                debug!(id, "variable already gone");
                return Ok(false);
            }
            Ok(true)
        })
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(CoreError::NotFound { .. }) => {
                debug!("variable set already gone");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn model(config: serde_json::Value) -> VariableModel {
        serde_json::from_value(config).unwrap()
    }

    #[test]
    fn sensitive_value_is_write_only() {
        let planned = model(json!({
            "name": "Db.Password",
            "project_id": "Projects-1",
            "type": "Sensitive",
            "is_sensitive": true,
            "sensitive_value": "hunter2"
        }));
        let mut variable = expand(&planned);
        assert_eq!(variable.value.as_deref(), Some("hunter2"));

        // The server never returns the value.
        variable.value = None;
        let state = flatten(variable, &planned);
        assert_eq!(state.sensitive_value.as_deref(), Some("hunter2"));
        assert_eq!(state.value, None);
        assert_eq!(state.project_id.as_deref(), Some("Projects-1"));
    }

    #[test]
    fn scope_round_trips_and_empty_scope_is_absent() {
        let planned = model(json!({
            "name": "Url",
            "owner_id": "LibraryVariableSets-1",
            "type": "String",
            "value": "https://shop",
            "scope": { "environments": ["Environments-1"], "roles": ["web"] }
        }));
        let wire = serde_json::to_value(expand(&planned)).unwrap();
        assert_eq!(
            wire["Scope"],
            json!({ "Environment": ["Environments-1"], "Role": ["web"] })
        );
        assert_eq!(flatten(expand(&planned), &planned), planned);

        let mut unscoped = planned.clone();
        unscoped.scope = None;
        assert_eq!(flatten(expand(&unscoped), &unscoped).scope, None);
    }

    #[test]
    fn sensitivity_must_match_type() {
        let mut diags = Diagnostics::new();
        Resource::validate(
            &VariableResource,
            &model(json!({ "name": "x", "owner_id": "o", "type": "String", "is_sensitive": true })),
            &mut diags,
        );
        assert_eq!(diags.errors().next().and_then(|d| d.attribute.as_deref()), Some("type"));

        let mut diags = Diagnostics::new();
        Resource::validate(
            &VariableResource,
            &model(json!({ "name": "x", "owner_id": "o", "type": "Sensitive" })),
            &mut diags,
        );
        assert_eq!(
            diags.errors().next().and_then(|d| d.attribute.as_deref()),
            Some("is_sensitive")
        );
    }

    #[test]
    fn owner_and_project_are_exclusive() {
        let diags = schema().validate(&json!({
            "name": "x",
            "owner_id": "a",
            "project_id": "b",
            "type": "String"
        }));
        assert!(diags.has_errors());

        let diags = schema().validate(&json!({ "name": "x", "type": "String" }));
        assert!(diags.has_errors());
    }

    #[test]
    fn import_id_splits_owner_and_variable() {
        let state = import_state("Projects-62:0906031f-68ba-4a15-afaa-657c1564e07b").unwrap();
        assert_eq!(state.owner_id.as_deref(), Some("Projects-62"));
        assert_eq!(state.id.as_deref(), Some("0906031f-68ba-4a15-afaa-657c1564e07b"));

        for bad in ["Projects-62", ":x", "a:b:c"] {
            assert!(import_state(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn locate_falls_back_to_name_type_and_scope() {
        let planned = model(json!({
            "name": "Url",
            "owner_id": "Projects-1",
            "type": "String",
            "value": "https://shop",
            "scope": { "roles": ["web", "api"] }
        }));
        let mut written = expand(&planned);
        written.id = Some("client-side".into());

        let mut stored = expand(&planned);
        stored.id = Some("server-side".into());
        stored.scope.roles = vec!["api".into(), "web".into()];
        let set = VariableSet {
            id: "variableset-Projects-1".into(),
            owner_id: "Projects-1".into(),
            variables: vec![stored],
            ..VariableSet::default()
        };

        assert_eq!(
            locate(&set, &written).and_then(|v| v.id.as_deref()),
            Some("server-side")
        );
    }
}
