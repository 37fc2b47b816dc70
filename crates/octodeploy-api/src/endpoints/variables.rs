// Variable set endpoints: /api/{space}/variables

use tracing::debug;

use crate::client::OctopusClient;
use crate::error::Error;
use crate::models::VariableSet;

impl OctopusClient {
    /// `GET /api/{space}/variables/{id}` (`variableset-{owner}`)
    pub async fn get_variable_set(
        &self,
        space_id: Option<&str>,
        id: &str,
    ) -> Result<VariableSet, Error> {
        let path = self.scoped(space_id, &format!("variables/{id}"));
        self.get(&path).await
    }

    /// Replace every variable in the set.
    ///
    /// `PUT /api/{space}/variables/{id}`
    pub async fn update_variable_set(
        &self,
        space_id: Option<&str>,
        set: &VariableSet,
    ) -> Result<VariableSet, Error> {
        debug!(
            id = %set.id,
            version = set.version,
            variables = set.variables.len(),
            "updating variable set"
        );
        let path = self.scoped(space_id, &format!("variables/{}", set.id));
        self.put(&path, set).await
    }
}
