// ── Resource traits ──
//
// `Resource` and `DataSource` are the typed seams every Octopus resource
// implements: a schema, a model the configuration deserializes into, and
// async CRUD against the API client. `DynResource`/`DynDataSource` erase
// the model type so the provider registry can hold every resource behind
// one JSON-in, JSON-out interface.

use async_trait::async_trait;
use octodeploy_api::OctopusClient;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::diagnostics::Diagnostics;
use crate::error::CoreError;
use crate::schema::Schema;

/// A managed Octopus object with create/read/update/delete semantics.
#[async_trait]
pub trait Resource: Send + Sync {
    /// Configuration and state shape.
    type Model: Serialize + DeserializeOwned + Send + Sync;

    /// Registered name, e.g. `octopusdeploy_environment`.
    fn type_name(&self) -> &'static str;

    fn schema(&self) -> Schema;

    /// Cross-field checks the schema cannot express. Push errors or
    /// warnings onto `diags`.
    fn validate(&self, _model: &Self::Model, _diags: &mut Diagnostics) {}

    /// State that adopts an existing object from its import id; `read`
    /// fills in the rest. Defaults to the id with schema placeholders.
    fn import(&self, id: &str) -> Result<Self::Model, CoreError> {
        let mut state = serde_json::json!({ "id": id });
        Resource::schema(self).block.fill_required(&mut state);
        decode_state(Resource::type_name(self), state)
    }

    async fn create(
        &self,
        client: &OctopusClient,
        planned: Self::Model,
    ) -> Result<Self::Model, CoreError>;

    /// Refresh from the server. `Ok(None)` means the object no longer exists.
    async fn read(
        &self,
        client: &OctopusClient,
        state: Self::Model,
    ) -> Result<Option<Self::Model>, CoreError>;

    async fn update(
        &self,
        client: &OctopusClient,
        state: Self::Model,
        planned: Self::Model,
    ) -> Result<Self::Model, CoreError>;

    /// Remove the object. Deleting something already gone succeeds.
    async fn delete(&self, client: &OctopusClient, state: Self::Model) -> Result<(), CoreError>;
}

/// A read-only lookup.
#[async_trait]
pub trait DataSource: Send + Sync {
    type Model: Serialize + DeserializeOwned + Send + Sync;

    fn type_name(&self) -> &'static str;

    fn schema(&self) -> Schema;

    async fn read(
        &self,
        client: &OctopusClient,
        config: Self::Model,
    ) -> Result<Self::Model, CoreError>;
}

// ── Type-erased views ────────────────────────────────────────────────

/// New state plus any warnings produced while planning it.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyResult {
    pub state: Value,
    pub diagnostics: Diagnostics,
}

/// [`Resource`] over raw JSON configuration and state.
#[async_trait]
pub trait DynResource: Send + Sync {
    fn type_name(&self) -> &'static str;
    fn schema(&self) -> Schema;

    /// Schema and cross-field validation of a configuration object.
    fn validate(&self, config: &Value) -> Diagnostics;

    async fn create(&self, client: &OctopusClient, config: Value)
    -> Result<ApplyResult, CoreError>;
    async fn read(&self, client: &OctopusClient, state: Value) -> Result<Option<Value>, CoreError>;
    async fn update(
        &self,
        client: &OctopusClient,
        state: Value,
        config: Value,
    ) -> Result<ApplyResult, CoreError>;
    async fn delete(&self, client: &OctopusClient, state: Value) -> Result<(), CoreError>;

    /// Adopt an existing object: build its import state and read it back.
    async fn import(&self, client: &OctopusClient, id: &str) -> Result<Value, CoreError>;
}

/// Validate, default and deserialize a configuration object.
fn plan<R: Resource + ?Sized>(
    resource: &R,
    config: &Value,
) -> Result<(R::Model, Diagnostics), CoreError> {
    let schema = resource.schema();
    let mut diags = schema.validate(config);
    if diags.has_errors() {
        return Err(CoreError::Diagnostics(diags));
    }

    let mut config = config.clone();
    schema.apply_defaults(&mut config);
    let model: R::Model = serde_json::from_value(config)
        .map_err(|e| CoreError::validation(resource.type_name(), e.to_string()))?;

    resource.validate(&model, &mut diags);
    if diags.has_errors() {
        return Err(CoreError::Diagnostics(diags));
    }
    for warning in diags.warnings() {
        warn!(resource = resource.type_name(), "{warning}");
    }
    Ok((model, diags))
}

fn decode_state<M: DeserializeOwned>(type_name: &str, state: Value) -> Result<M, CoreError> {
    serde_json::from_value(state)
        .map_err(|e| CoreError::validation(type_name, format!("unreadable state: {e}")))
}

#[async_trait]
impl<R: Resource> DynResource for R {
    fn type_name(&self) -> &'static str {
        Resource::type_name(self)
    }

    fn schema(&self) -> Schema {
        Resource::schema(self)
    }

    fn validate(&self, config: &Value) -> Diagnostics {
        match plan(self, config) {
            Ok((_, diags)) | Err(CoreError::Diagnostics(diags)) => diags,
            Err(e) => {
                let mut diags = Diagnostics::new();
                diags.error("", e.to_string());
                diags
            }
        }
    }

    async fn create(
        &self,
        client: &OctopusClient,
        config: Value,
    ) -> Result<ApplyResult, CoreError> {
        let (planned, diagnostics) = plan(self, &config)?;
        debug!(resource = Resource::type_name(self), "create");
        let created = Resource::create(self, client, planned).await?;
        Ok(ApplyResult {
            state: serde_json::to_value(created)?,
            diagnostics,
        })
    }

    async fn read(&self, client: &OctopusClient, state: Value) -> Result<Option<Value>, CoreError> {
        let state: R::Model = decode_state(Resource::type_name(self), state)?;
        debug!(resource = Resource::type_name(self), "read");
        match Resource::read(self, client, state).await? {
            Some(model) => Ok(Some(serde_json::to_value(model)?)),
            None => Ok(None),
        }
    }

    async fn update(
        &self,
        client: &OctopusClient,
        state: Value,
        config: Value,
    ) -> Result<ApplyResult, CoreError> {
        let prior: R::Model = decode_state(Resource::type_name(self), state)?;
        let (planned, diagnostics) = plan(self, &config)?;
        debug!(resource = Resource::type_name(self), "update");
        let updated = Resource::update(self, client, prior, planned).await?;
        Ok(ApplyResult {
            state: serde_json::to_value(updated)?,
            diagnostics,
        })
    }

    async fn delete(&self, client: &OctopusClient, state: Value) -> Result<(), CoreError> {
        let state: R::Model = decode_state(Resource::type_name(self), state)?;
        debug!(resource = Resource::type_name(self), "delete");
        Resource::delete(self, client, state).await
    }

    async fn import(&self, client: &OctopusClient, id: &str) -> Result<Value, CoreError> {
        let state = Resource::import(self, id)?;
        debug!(resource = Resource::type_name(self), id, "import");
        match Resource::read(self, client, state).await? {
            Some(model) => Ok(serde_json::to_value(model)?),
            None => Err(CoreError::NotFound {
                entity_type: Resource::type_name(self).to_owned(),
                identifier: id.to_owned(),
            }),
        }
    }
}

/// [`DataSource`] over raw JSON.
#[async_trait]
pub trait DynDataSource: Send + Sync {
    fn type_name(&self) -> &'static str;
    fn schema(&self) -> Schema;
    fn validate(&self, config: &Value) -> Diagnostics;
    async fn read(&self, client: &OctopusClient, config: Value) -> Result<Value, CoreError>;
}

#[async_trait]
impl<D: DataSource> DynDataSource for D {
    fn type_name(&self) -> &'static str {
        DataSource::type_name(self)
    }

    fn schema(&self) -> Schema {
        DataSource::schema(self)
    }

    fn validate(&self, config: &Value) -> Diagnostics {
        DataSource::schema(self).validate(config)
    }

    async fn read(&self, client: &OctopusClient, config: Value) -> Result<Value, CoreError> {
        let schema = DataSource::schema(self);
        let diags = schema.validate(&config);
        if diags.has_errors() {
            return Err(CoreError::Diagnostics(diags));
        }
        let mut config = config;
        schema.apply_defaults(&mut config);
        let model: D::Model = serde_json::from_value(config)
            .map_err(|e| CoreError::validation(DataSource::type_name(self), e.to_string()))?;

        debug!(data_source = DataSource::type_name(self), "read");
        let result = DataSource::read(self, client, model).await?;
        Ok(serde_json::to_value(result)?)
    }
}

// ── Not-found handling ───────────────────────────────────────────────

/// Turns a 404 from the API into `None`.
pub(crate) trait OrAbsent<T> {
    fn or_absent(self) -> Result<Option<T>, octodeploy_api::Error>;
}

impl<T> OrAbsent<T> for Result<T, octodeploy_api::Error> {
    fn or_absent(self) -> Result<Option<T>, octodeploy_api::Error> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Id of a model that must already exist on the server.
pub(crate) fn require_id<'a>(id: Option<&'a str>, type_name: &str) -> Result<&'a str, CoreError> {
    id.filter(|s| !s.is_empty())
        .ok_or_else(|| CoreError::validation("id", format!("{type_name} state has no id")))
}
