// Deployment target endpoints: /api/{space}/machines

use tracing::debug;

use crate::client::{OctopusClient, Query};
use crate::error::Error;
use crate::models::{DeploymentTarget, Page};

impl OctopusClient {
    /// One page of deployment targets.
    ///
    /// `GET /api/{space}/machines` with any of `ids`, `name`, `partialName`,
    /// `environmentIds`, `roles`, `healthStatuses`, `commStyles`,
    /// `isDisabled`, `tenantIds`, `tenantTags`, `thumbprint`, `skip`, `take`.
    pub async fn list_deployment_targets(
        &self,
        space_id: Option<&str>,
        query: &Query,
    ) -> Result<Page<DeploymentTarget>, Error> {
        let path = self.scoped(space_id, "machines");
        self.get_with_params(&path, query).await
    }

    /// `GET /api/{space}/machines/{id}`
    pub async fn get_deployment_target(
        &self,
        space_id: Option<&str>,
        id: &str,
    ) -> Result<DeploymentTarget, Error> {
        let path = self.scoped(space_id, &format!("machines/{id}"));
        self.get(&path).await
    }

    /// `POST /api/{space}/machines`
    pub async fn create_deployment_target(
        &self,
        space_id: Option<&str>,
        target: &DeploymentTarget,
    ) -> Result<DeploymentTarget, Error> {
        debug!(
            name = %target.name,
            style = target.endpoint.communication_style(),
            "creating deployment target"
        );
        let path = self.scoped(space_id, "machines");
        self.post(&path, target).await
    }

    /// `PUT /api/{space}/machines/{id}`
    pub async fn update_deployment_target(
        &self,
        space_id: Option<&str>,
        id: &str,
        target: &DeploymentTarget,
    ) -> Result<DeploymentTarget, Error> {
        debug!(id, "updating deployment target");
        let path = self.scoped(space_id, &format!("machines/{id}"));
        self.put(&path, target).await
    }

    /// `DELETE /api/{space}/machines/{id}`
    pub async fn delete_deployment_target(
        &self,
        space_id: Option<&str>,
        id: &str,
    ) -> Result<(), Error> {
        debug!(id, "deleting deployment target");
        let path = self.scoped(space_id, &format!("machines/{id}"));
        self.delete(&path).await
    }
}
