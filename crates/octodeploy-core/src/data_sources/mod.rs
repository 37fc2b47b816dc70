// ── Data sources ──
//
// Read-only lookups over Octopus collections. Each one turns its filter
// attributes into a query, fetches either one page (`take` set) or every
// page, and flattens the items into the matching resource's state shape.

pub mod deployment_targets;
pub mod environments;

use std::time::SystemTime;

use octodeploy_api::Query;

pub use deployment_targets::{DeploymentTargetsDataSource, DeploymentTargetsModel};
pub use environments::{EnvironmentsDataSource, EnvironmentsModel};

use crate::schema::{Attribute, Block, Validator};

/// Page size used when collecting every page.
const PAGE_SIZE: u32 = 100;

/// Filter attributes every collection lookup accepts.
fn paging_block(description: &'static str) -> Block {
    Block::new()
        .description(description)
        .id()
        .attr(
            "ids",
            Attribute::string_list().description("Only return items with these IDs."),
        )
        .attr(
            "name",
            Attribute::string().description("Only return items with exactly this name."),
        )
        .attr(
            "partial_name",
            Attribute::string().description("Only return items whose name contains this text."),
        )
        .attr(
            "skip",
            Attribute::int()
                .default(0)
                .validate(Validator::Range(0, i64::from(u32::MAX))),
        )
        .attr(
            "take",
            Attribute::int()
                .validate(Validator::Range(1, i64::from(u32::MAX)))
                .description("Maximum number of items to return; every page when omitted."),
        )
        .space_id()
}

/// Query carrying the shared filters.
fn base_query(ids: &[String], name: Option<&str>, partial_name: Option<&str>) -> Query {
    Query::new()
        .list("ids", ids)
        .opt("name", name)
        .opt("partialName", partial_name)
}

/// Lookups have no server-side identity; each read gets a fresh one.
fn lookup_id(prefix: &str) -> String {
    format!("{prefix} {}", humantime::format_rfc3339_seconds(SystemTime::now()))
}
