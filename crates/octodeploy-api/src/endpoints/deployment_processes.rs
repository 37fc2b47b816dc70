// Deployment process endpoints: /api/{space}/deploymentprocesses
//
// Processes are created and deleted together with their project; this
// collection only supports reading and replacing.

use tracing::debug;

use crate::client::OctopusClient;
use crate::error::Error;
use crate::models::DeploymentProcess;

impl OctopusClient {
    /// `GET /api/{space}/deploymentprocesses/{id}`
    pub async fn get_deployment_process(
        &self,
        space_id: Option<&str>,
        id: &str,
    ) -> Result<DeploymentProcess, Error> {
        let path = self.scoped(space_id, &format!("deploymentprocesses/{id}"));
        self.get(&path).await
    }

    /// Replace the whole process.
    ///
    /// `PUT /api/{space}/deploymentprocesses/{id}`; `process.version` must
    /// match the server's current version.
    pub async fn update_deployment_process(
        &self,
        space_id: Option<&str>,
        process: &DeploymentProcess,
    ) -> Result<DeploymentProcess, Error> {
        debug!(
            id = %process.id,
            version = process.version,
            steps = process.steps.len(),
            "updating deployment process"
        );
        let path = self.scoped(space_id, &format!("deploymentprocesses/{}", process.id));
        self.put(&path, process).await
    }
}
