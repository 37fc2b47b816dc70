//! Request and response types for the Octopus REST API.
//!
//! All field names are PascalCase on the wire. Closed sets of variants
//! (communication styles, authentication types, trigger filters) are
//! Rust enums tagged by the discriminator property the server uses.
//! Discriminator values this client does not know decode to an `Other`
//! variant that keeps the raw payload.

use serde_json::Value;

mod deployment_process;
mod environment;
mod machine;
mod machine_policy;
mod page;
mod project;
mod trigger;
mod variable;

pub use deployment_process::*;
pub use environment::*;
pub use machine::*;
pub use machine_policy::*;
pub use page::*;
pub use project::*;
pub use trigger::*;
pub use variable::*;

/// Read the string discriminator `tag` from a raw payload.
fn tag_of<E: serde::de::Error>(raw: &Value, tag: &'static str) -> Result<String, E> {
    raw.get(tag)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| E::missing_field(tag))
}

/// `payload` with `tag` set to `value`; non-object payloads pass through.
fn with_tag(payload: &Value, tag: &str, value: &str) -> Value {
    let mut payload = payload.clone();
    if let Value::Object(map) = &mut payload {
        map.insert(tag.to_owned(), Value::String(value.to_owned()));
    }
    payload
}
