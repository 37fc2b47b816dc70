// Environment endpoints: /api/{space}/environments

use tracing::debug;

use crate::client::{OctopusClient, Query};
use crate::error::Error;
use crate::models::{Environment, Page};

impl OctopusClient {
    /// One page of environments.
    ///
    /// `GET /api/{space}/environments?ids=&name=&partialName=&skip=&take=`
    pub async fn list_environments(
        &self,
        space_id: Option<&str>,
        query: &Query,
    ) -> Result<Page<Environment>, Error> {
        let path = self.scoped(space_id, "environments");
        self.get_with_params(&path, query).await
    }

    /// `GET /api/{space}/environments/{id}`
    pub async fn get_environment(
        &self,
        space_id: Option<&str>,
        id: &str,
    ) -> Result<Environment, Error> {
        let path = self.scoped(space_id, &format!("environments/{id}"));
        self.get(&path).await
    }

    /// `POST /api/{space}/environments`
    pub async fn create_environment(
        &self,
        space_id: Option<&str>,
        environment: &Environment,
    ) -> Result<Environment, Error> {
        debug!(name = %environment.name, "creating environment");
        let path = self.scoped(space_id, "environments");
        self.post(&path, environment).await
    }

    /// `PUT /api/{space}/environments/{id}`
    pub async fn update_environment(
        &self,
        space_id: Option<&str>,
        id: &str,
        environment: &Environment,
    ) -> Result<Environment, Error> {
        debug!(id, "updating environment");
        let path = self.scoped(space_id, &format!("environments/{id}"));
        self.put(&path, environment).await
    }

    /// `DELETE /api/{space}/environments/{id}`
    pub async fn delete_environment(&self, space_id: Option<&str>, id: &str) -> Result<(), Error> {
        debug!(id, "deleting environment");
        let path = self.scoped(space_id, &format!("environments/{id}"));
        self.delete(&path).await
    }
}
