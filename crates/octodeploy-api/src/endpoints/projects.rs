// Project endpoints (read-only): /api/{space}/projects

use crate::client::OctopusClient;
use crate::error::Error;
use crate::models::Project;

impl OctopusClient {
    /// `GET /api/{space}/projects/{id}`
    pub async fn get_project(&self, space_id: Option<&str>, id: &str) -> Result<Project, Error> {
        let path = self.scoped(space_id, &format!("projects/{id}"));
        self.get(&path).await
    }
}
