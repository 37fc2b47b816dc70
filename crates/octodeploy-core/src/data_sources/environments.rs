// octopusdeploy_environments

use async_trait::async_trait;
use octodeploy_api::OctopusClient;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{PAGE_SIZE, base_query, lookup_id, paging_block};
use crate::error::CoreError;
use crate::resource::DataSource;
use crate::resources::environment::{self, EnvironmentModel};
use crate::schema::{AttrType, Attribute, Schema};

pub const TYPE_NAME: &str = "octopusdeploy_environments";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentsModel {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub ids: Vec<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub partial_name: Option<String>,
    #[serde(default)]
    pub skip: u32,
    #[serde(default)]
    pub take: Option<u32>,
    #[serde(default)]
    pub space_id: Option<String>,
    #[serde(default)]
    pub environments: Vec<EnvironmentModel>,
}

pub fn schema() -> Schema {
    let item = environment::schema().block.object_type();
    Schema::new(
        paging_block("Provides information about existing environments.").attr(
            "environments",
            Attribute::new(AttrType::list_of(item))
                .computed()
                .description("A list of environments that match the filter(s)."),
        ),
    )
}

pub struct EnvironmentsDataSource;

#[async_trait]
impl DataSource for EnvironmentsDataSource {
    type Model = EnvironmentsModel;

    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        schema()
    }

    async fn read(
        &self,
        client: &OctopusClient,
        mut config: EnvironmentsModel,
    ) -> Result<EnvironmentsModel, CoreError> {
        let space = config.space_id.as_deref();
        let query = base_query(&config.ids, config.name.as_deref(), config.partial_name.as_deref());

        let found = match config.take {
            Some(take) => {
                let query = query.skip(Some(config.skip)).take(Some(take));
                client.list_environments(space, &query).await?.items
            }
            None => {
                let mut all = client
                    .paginate_all(&query, PAGE_SIZE, |q| async move {
                        client.list_environments(space, &q).await
                    })
                    .await?;
                let skip = usize::try_from(config.skip).unwrap_or(usize::MAX);
                all.drain(..all.len().min(skip));
                all
            }
        };
        debug!(count = found.len(), "environments found");

        // The server matches `name` as a substring; narrow to the exact name,
        // ignoring case.
        config.environments = found
            .into_iter()
            .filter(|e| {
                config
                    .name
                    .as_ref()
                    .is_none_or(|name| e.name.eq_ignore_ascii_case(name))
            })
            .map(environment::flatten)
            .collect();
        config.id = Some(lookup_id("Environments"));
        Ok(config)
    }
}
