// Machine policy endpoints: /api/{space}/machinepolicies

use tracing::debug;

use crate::client::OctopusClient;
use crate::error::Error;
use crate::models::MachinePolicy;

impl OctopusClient {
    /// `GET /api/{space}/machinepolicies/{id}`
    pub async fn get_machine_policy(
        &self,
        space_id: Option<&str>,
        id: &str,
    ) -> Result<MachinePolicy, Error> {
        let path = self.scoped(space_id, &format!("machinepolicies/{id}"));
        self.get(&path).await
    }

    /// `POST /api/{space}/machinepolicies`
    pub async fn create_machine_policy(
        &self,
        space_id: Option<&str>,
        policy: &MachinePolicy,
    ) -> Result<MachinePolicy, Error> {
        debug!(name = %policy.name, "creating machine policy");
        let path = self.scoped(space_id, "machinepolicies");
        self.post(&path, policy).await
    }

    /// `PUT /api/{space}/machinepolicies/{id}`
    pub async fn update_machine_policy(
        &self,
        space_id: Option<&str>,
        id: &str,
        policy: &MachinePolicy,
    ) -> Result<MachinePolicy, Error> {
        debug!(id, "updating machine policy");
        let path = self.scoped(space_id, &format!("machinepolicies/{id}"));
        self.put(&path, policy).await
    }

    /// `DELETE /api/{space}/machinepolicies/{id}`
    pub async fn delete_machine_policy(
        &self,
        space_id: Option<&str>,
        id: &str,
    ) -> Result<(), Error> {
        debug!(id, "deleting machine policy");
        let path = self.scoped(space_id, &format!("machinepolicies/{id}"));
        self.delete(&path).await
    }
}
