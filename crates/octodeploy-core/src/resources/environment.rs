// octopusdeploy_environment

use async_trait::async_trait;
use octodeploy_api::OctopusClient;
use octodeploy_api::models::{Environment, ExtensionSettings};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::convert::non_empty;
use crate::error::CoreError;
use crate::resource::{OrAbsent, Resource, require_id};
use crate::schema::{Attribute, Block, NestedBlock, Schema};

pub const TYPE_NAME: &str = "octopusdeploy_environment";

const JIRA_ENVIRONMENT_TYPES: &[&str] =
    &["development", "production", "staging", "testing", "unmapped"];

// ── Model ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentModel {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub allow_dynamic_infrastructure: bool,
    #[serde(default)]
    pub use_guided_failure: bool,
    #[serde(default)]
    pub sort_order: Option<i32>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub space_id: Option<String>,
    #[serde(default)]
    pub jira_extension_settings: Option<JiraExtensionSettings>,
    #[serde(default)]
    pub jira_service_management_extension_settings: Option<ChangeControlSettings>,
    #[serde(default)]
    pub servicenow_extension_settings: Option<ChangeControlSettings>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JiraExtensionSettings {
    pub environment_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeControlSettings {
    pub is_enabled: bool,
}

pub fn schema() -> Schema {
    Schema::new(
        Block::new()
            .description("Manages an environment in Octopus Deploy.")
            .id()
            .attr(
                "name",
                Attribute::string()
                    .required()
                    .validate(crate::schema::Validator::NonEmpty)
                    .description("The name of this environment."),
            )
            .attr(
                "description",
                Attribute::string().description("A user-friendly description of this environment."),
            )
            .attr(
                "allow_dynamic_infrastructure",
                Attribute::bool().default(false),
            )
            .attr("use_guided_failure", Attribute::bool().default(false))
            .attr(
                "sort_order",
                Attribute::int()
                    .optional_computed()
                    .description("The order used by Octopus when displaying environments."),
            )
            .attr("slug", Attribute::string().computed())
            .space_id()
            .block(
                "jira_extension_settings",
                NestedBlock::single(
                    Block::new().attr(
                        "environment_type",
                        Attribute::string()
                            .required()
                            .one_of(JIRA_ENVIRONMENT_TYPES)
                            .description("The Jira environment type of this Octopus environment."),
                    ),
                ),
            )
            .block(
                "jira_service_management_extension_settings",
                NestedBlock::single(Block::new().attr(
                    "is_enabled",
                    Attribute::bool()
                        .required()
                        .description("Whether the JSM extension is enabled for this environment."),
                )),
            )
            .block(
                "servicenow_extension_settings",
                NestedBlock::single(Block::new().attr(
                    "is_enabled",
                    Attribute::bool()
                        .required()
                        .description("Whether the ServiceNow extension is enabled for this environment."),
                )),
            ),
    )
}

// ── Expand / flatten ─────────────────────────────────────────────────

pub fn expand(model: &EnvironmentModel) -> Environment {
    let mut extension_settings = Vec::new();
    if let Some(jira) = &model.jira_extension_settings {
        extension_settings.push(ExtensionSettings::Jira {
            environment_type: jira.environment_type.clone(),
        });
    }
    if let Some(jsm) = &model.jira_service_management_extension_settings {
        extension_settings.push(ExtensionSettings::JiraServiceManagement {
            change_controlled: jsm.is_enabled,
        });
    }
    if let Some(snow) = &model.servicenow_extension_settings {
        extension_settings.push(ExtensionSettings::ServiceNow {
            change_controlled: snow.is_enabled,
        });
    }

    Environment {
        id: model.id.clone(),
        name: model.name.clone(),
        description: model.description.clone(),
        allow_dynamic_infrastructure: model.allow_dynamic_infrastructure,
        use_guided_failure: model.use_guided_failure,
        sort_order: model.sort_order,
        slug: model.slug.clone(),
        space_id: model.space_id.clone(),
        extension_settings,
    }
}

pub fn flatten(environment: Environment) -> EnvironmentModel {
    let mut model = EnvironmentModel {
        id: environment.id,
        name: environment.name,
        description: non_empty(environment.description.as_deref()),
        allow_dynamic_infrastructure: environment.allow_dynamic_infrastructure,
        use_guided_failure: environment.use_guided_failure,
        sort_order: environment.sort_order,
        slug: environment.slug,
        space_id: environment.space_id,
        ..EnvironmentModel::default()
    };

    for settings in environment.extension_settings {
        match settings {
            ExtensionSettings::Jira { environment_type } => {
                model.jira_extension_settings = Some(JiraExtensionSettings { environment_type });
            }
            ExtensionSettings::JiraServiceManagement { change_controlled } => {
                model.jira_service_management_extension_settings = Some(ChangeControlSettings {
                    is_enabled: change_controlled,
                });
            }
            ExtensionSettings::ServiceNow { change_controlled } => {
                model.servicenow_extension_settings = Some(ChangeControlSettings {
                    is_enabled: change_controlled,
                });
            }
            ExtensionSettings::Other { .. } => {}
        }
    }

    model
}

// ── CRUD ─────────────────────────────────────────────────────────────

pub struct EnvironmentResource;

#[async_trait]
impl Resource for EnvironmentResource {
    type Model = EnvironmentModel;

    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        schema()
    }

    async fn create(
        &self,
        client: &OctopusClient,
        planned: EnvironmentModel,
    ) -> Result<EnvironmentModel, CoreError> {
        info!(name = %planned.name, "creating environment");
        let created = client
            .create_environment(planned.space_id.as_deref(), &expand(&planned))
            .await?;
        Ok(flatten(created))
    }

    async fn read(
        &self,
        client: &OctopusClient,
        state: EnvironmentModel,
    ) -> Result<Option<EnvironmentModel>, CoreError> {
        let id = require_id(state.id.as_deref(), TYPE_NAME)?;
        let found = client
            .get_environment(state.space_id.as_deref(), id)
            .await
            .or_absent()?;
        Ok(found.map(flatten))
    }

    async fn update(
        &self,
        client: &OctopusClient,
        state: EnvironmentModel,
        mut planned: EnvironmentModel,
    ) -> Result<EnvironmentModel, CoreError> {
        let id = require_id(state.id.as_deref(), TYPE_NAME)?;
        info!(id, "updating environment");
        planned.id = state.id.clone();
        planned.slug = planned.slug.or(state.slug);
        planned.sort_order = planned.sort_order.or(state.sort_order);
        planned.space_id = planned.space_id.or(state.space_id);

        let updated = client
            .update_environment(planned.space_id.as_deref(), id, &expand(&planned))
            .await?;
        Ok(flatten(updated))
    }

    async fn delete(&self, client: &OctopusClient, state: EnvironmentModel) -> Result<(), CoreError> {
        let id = require_id(state.id.as_deref(), TYPE_NAME)?;
        info!(id, "deleting environment");
        client
            .delete_environment(state.space_id.as_deref(), id)
            .await
            .or_absent()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn sample() -> EnvironmentModel {
        EnvironmentModel {
            id: Some("Environments-1".into()),
            name: "Production".into(),
            description: Some("Live traffic".into()),
            allow_dynamic_infrastructure: true,
            use_guided_failure: false,
            sort_order: Some(4),
            slug: Some("production".into()),
            space_id: Some("Spaces-1".into()),
            jira_extension_settings: Some(JiraExtensionSettings {
                environment_type: "production".into(),
            }),
            jira_service_management_extension_settings: None,
            servicenow_extension_settings: Some(ChangeControlSettings { is_enabled: true }),
        }
    }

    #[test]
    fn expand_then_flatten_is_identity() {
        let model = sample();
        assert_eq!(flatten(expand(&model)), model);
    }

    #[test]
    fn expand_emits_one_extension_per_block() {
        let env = expand(&sample());
        assert_eq!(
            env.extension_settings,
            vec![
                ExtensionSettings::Jira {
                    environment_type: "production".into()
                },
                ExtensionSettings::ServiceNow {
                    change_controlled: true
                },
            ]
        );
    }

    #[test]
    fn flatten_drops_empty_description_and_unknown_extensions() {
        let model = flatten(Environment {
            name: "Dev".into(),
            description: Some(String::new()),
            extension_settings: vec![ExtensionSettings::Other {
                extension_id: "acme".into(),
                values: serde_json::Value::Null,
            }],
            ..Environment::default()
        });
        assert_eq!(model.description, None);
        assert_eq!(model.jira_extension_settings, None);
    }

    #[test]
    fn schema_rejects_unknown_jira_type() {
        let diags = schema().validate(&serde_json::json!({
            "name": "Dev",
            "jira_extension_settings": { "environment_type": "qa" }
        }));
        assert!(diags.has_errors());
        assert_eq!(
            diags.errors().next().and_then(|d| d.attribute.as_deref()),
            Some("jira_extension_settings.environment_type")
        );
    }
}
