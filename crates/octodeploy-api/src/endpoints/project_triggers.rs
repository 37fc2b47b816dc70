// Project trigger endpoints: /api/{space}/projecttriggers

use tracing::debug;

use crate::client::OctopusClient;
use crate::error::Error;
use crate::models::ProjectTrigger;

impl OctopusClient {
    /// `GET /api/{space}/projecttriggers/{id}`
    pub async fn get_project_trigger(
        &self,
        space_id: Option<&str>,
        id: &str,
    ) -> Result<ProjectTrigger, Error> {
        let path = self.scoped(space_id, &format!("projecttriggers/{id}"));
        self.get(&path).await
    }

    /// `POST /api/{space}/projecttriggers`
    pub async fn create_project_trigger(
        &self,
        space_id: Option<&str>,
        trigger: &ProjectTrigger,
    ) -> Result<ProjectTrigger, Error> {
        debug!(name = %trigger.name, project = %trigger.project_id, "creating project trigger");
        let path = self.scoped(space_id, "projecttriggers");
        self.post(&path, trigger).await
    }

    /// `PUT /api/{space}/projecttriggers/{id}`
    pub async fn update_project_trigger(
        &self,
        space_id: Option<&str>,
        id: &str,
        trigger: &ProjectTrigger,
    ) -> Result<ProjectTrigger, Error> {
        debug!(id, "updating project trigger");
        let path = self.scoped(space_id, &format!("projecttriggers/{id}"));
        self.put(&path, trigger).await
    }

    /// `DELETE /api/{space}/projecttriggers/{id}`
    pub async fn delete_project_trigger(
        &self,
        space_id: Option<&str>,
        id: &str,
    ) -> Result<(), Error> {
        debug!(id, "deleting project trigger");
        let path = self.scoped(space_id, &format!("projecttriggers/{id}"));
        self.delete(&path).await
    }
}
