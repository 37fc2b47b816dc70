// octodeploy-core: Octopus Deploy resources as declarative schemas with
// expand/flatten mappings and CRUD entry points.

pub mod config;
pub mod convert;
pub mod data_sources;
pub mod diagnostics;
pub mod error;
pub mod provider;
pub mod resource;
pub mod resources;
pub mod schema;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{ProviderConfig, TlsVerification};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::CoreError;
pub use provider::{OctopusProvider, ProviderSchema};
pub use resource::{ApplyResult, DataSource, DynDataSource, DynResource, Resource};
pub use schema::{AttrType, Attribute, Block, NestedBlock, Nesting, Presence, Schema, Validator};
