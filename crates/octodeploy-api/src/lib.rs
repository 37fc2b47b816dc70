// octodeploy-api: Async Rust client for the Octopus Deploy REST API

pub mod client;
pub mod endpoints;
pub mod error;
pub mod models;
pub mod timespan;
pub mod transport;

pub use client::{OctopusClient, Query};
pub use error::Error;
pub use transport::{TlsMode, TransportConfig};
