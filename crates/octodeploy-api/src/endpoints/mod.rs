//! Endpoint methods on [`OctopusClient`](crate::OctopusClient), one module
//! per REST collection.
//!
//! Every space-scoped method takes `space_id: Option<&str>`; `None` uses the
//! client's default space.

mod deployment_processes;
mod environments;
mod machine_policies;
mod machines;
mod project_triggers;
mod projects;
mod variables;
