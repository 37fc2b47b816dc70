// Package references of an action. The primary package is the unnamed
// reference and is mirrored into `Octopus.Action.Package.*` properties.

use std::collections::BTreeMap;

use octodeploy_api::models::{DeploymentAction, PackageReference, Properties};
use serde::{Deserialize, Serialize};

use super::action::{ActionBlock, ActionCommon, DEPLOY_PACKAGE, common_block, take};
use crate::convert::parse_bool;
use crate::diagnostics::{Diagnostics, join_path};
use crate::error::CoreError;
use crate::schema::{Attribute, Block, NestedBlock, Validator};

pub const BUILTIN_FEED: &str = "feeds-builtin";
const SERVER: &str = "Server";
const ACQUISITION_LOCATIONS: &[&str] = &["Server", "ExecutionTarget", "NotAcquired"];

pub(crate) const PACKAGE_ID: &str = "Octopus.Action.Package.PackageId";
pub(crate) const FEED_ID: &str = "Octopus.Action.Package.FeedId";
pub(crate) const DOWNLOAD_ON_TENTACLE: &str = "Octopus.Action.Package.DownloadOnTentacle";
const EXTRACT: &str = "Extract";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryPackage {
    pub package_id: String,
    #[serde(default = "builtin_feed")]
    pub feed_id: String,
    #[serde(default = "server")]
    pub acquisition_location: String,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedPackage {
    pub name: String,
    pub package_id: String,
    #[serde(default = "builtin_feed")]
    pub feed_id: String,
    #[serde(default = "server")]
    pub acquisition_location: String,
    #[serde(default = "extract_by_default")]
    pub extract_during_deployment: bool,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

fn builtin_feed() -> String {
    BUILTIN_FEED.to_owned()
}

fn server() -> String {
    SERVER.to_owned()
}

fn extract_by_default() -> bool {
    true
}

// ── Schema ───────────────────────────────────────────────────────────

fn package_block() -> Block {
    Block::new()
        .attr(
            "package_id",
            Attribute::string()
                .required()
                .validate(Validator::NonEmpty)
                .description("The ID of the package."),
        )
        .attr("feed_id", Attribute::string().default(BUILTIN_FEED))
        .attr(
            "acquisition_location",
            Attribute::string()
                .default(SERVER)
                .one_of(ACQUISITION_LOCATIONS),
        )
        .attr("properties", Attribute::string_map())
}

pub(crate) fn primary_package_block() -> NestedBlock {
    NestedBlock::single(package_block())
}

pub(crate) fn package_list_block() -> NestedBlock {
    NestedBlock::list(
        package_block()
            .attr("name", Attribute::string().required())
            .attr(
                "extract_during_deployment",
                Attribute::bool().default(true),
            ),
    )
}

// ── Expand / flatten ─────────────────────────────────────────────────

pub(crate) fn expand_primary(package: &PrimaryPackage, action: &mut DeploymentAction) {
    let download = if package.acquisition_location == SERVER {
        "False".to_owned()
    } else {
        package.acquisition_location.clone()
    };
    action
        .properties
        .insert(PACKAGE_ID.into(), package.package_id.clone().into());
    action
        .properties
        .insert(FEED_ID.into(), package.feed_id.clone().into());
    action
        .properties
        .insert(DOWNLOAD_ON_TENTACLE.into(), download.into());

    action.packages.push(PackageReference {
        id: None,
        name: String::new(),
        package_id: package.package_id.clone(),
        feed_id: Some(package.feed_id.clone()),
        acquisition_location: Some(package.acquisition_location.clone()),
        properties: package.properties.clone(),
    });
}

pub(crate) fn expand_named(package: &NamedPackage) -> PackageReference {
    let mut properties = package.properties.clone();
    properties.insert(EXTRACT.into(), package.extract_during_deployment.to_string());
    PackageReference {
        id: None,
        name: package.name.clone(),
        package_id: package.package_id.clone(),
        feed_id: Some(package.feed_id.clone()),
        acquisition_location: Some(package.acquisition_location.clone()),
        properties,
    }
}

/// Split package references into the primary package and the named ones,
/// removing the primary package's mirror properties.
pub(crate) fn flatten_packages(
    packages: Vec<PackageReference>,
    properties: &mut Properties,
) -> (Option<PrimaryPackage>, Vec<NamedPackage>) {
    let mut primary = None;
    let mut named = Vec::new();

    for reference in packages {
        let feed_id = reference.feed_id.unwrap_or_else(builtin_feed);
        let acquisition_location = reference.acquisition_location.unwrap_or_else(server);
        if reference.name.is_empty() {
            primary = Some(PrimaryPackage {
                package_id: reference.package_id,
                feed_id,
                acquisition_location,
                properties: reference.properties,
            });
        } else {
            let mut props = reference.properties;
            let extract = props.remove(EXTRACT).is_none_or(|v| parse_bool(&v));
            named.push(NamedPackage {
                name: reference.name,
                package_id: reference.package_id,
                feed_id,
                acquisition_location,
                extract_during_deployment: extract,
                properties: props,
            });
        }
    }

    if primary.is_some() {
        take(properties, PACKAGE_ID);
        take(properties, FEED_ID);
        take(properties, DOWNLOAD_ON_TENTACLE);
    }
    (primary, named)
}

// ── deploy_package_action ────────────────────────────────────────────

/// Deploys the primary package to the step's targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployPackageAction {
    #[serde(flatten)]
    pub common: ActionCommon,
}

impl ActionBlock for DeployPackageAction {
    fn schema() -> Block {
        common_block().block("primary_package", primary_package_block().required())
    }

    fn common(&self) -> &ActionCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut ActionCommon {
        &mut self.common
    }

    fn expand(&self) -> Result<DeploymentAction, CoreError> {
        Ok(self.common.expand(DEPLOY_PACKAGE, &[]))
    }

    fn flatten(action: DeploymentAction, _prior: Option<&Self>) -> Result<Self, CoreError> {
        Ok(Self {
            common: ActionCommon::flatten(action, &[]),
        })
    }

    fn validate(&self, path: &str, diags: &mut Diagnostics) {
        self.common.validate(path, diags);
        if self.common.primary_package.is_none() {
            diags.error(
                join_path(path, "primary_package"),
                "a package deployment requires primary_package",
            );
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn primary_package_sets_mirror_properties() {
        let mut action = DeploymentAction::new("Deploy", "Octopus.TentaclePackage");
        expand_primary(
            &PrimaryPackage {
                package_id: "Shop.Web".into(),
                feed_id: BUILTIN_FEED.into(),
                acquisition_location: "ExecutionTarget".into(),
                properties: BTreeMap::new(),
            },
            &mut action,
        );

        assert_eq!(action.property(PACKAGE_ID), Some("Shop.Web"));
        assert_eq!(action.property(FEED_ID), Some("feeds-builtin"));
        assert_eq!(action.property(DOWNLOAD_ON_TENTACLE), Some("ExecutionTarget"));
        assert!(action.packages[0].is_primary());
    }

    #[test]
    fn server_acquisition_downloads_on_server() {
        let mut action = DeploymentAction::new("Deploy", "Octopus.TentaclePackage");
        expand_primary(
            &PrimaryPackage {
                package_id: "Shop.Web".into(),
                feed_id: BUILTIN_FEED.into(),
                acquisition_location: SERVER.into(),
                properties: BTreeMap::new(),
            },
            &mut action,
        );
        assert_eq!(action.property(DOWNLOAD_ON_TENTACLE), Some("False"));
    }

    #[test]
    fn named_package_carries_extract_flag() {
        let named = NamedPackage {
            name: "tools".into(),
            package_id: "Shop.Tools".into(),
            feed_id: "Feeds-2".into(),
            acquisition_location: SERVER.into(),
            extract_during_deployment: false,
            properties: BTreeMap::from([("SelectionMode".into(), "immediate".into())]),
        };
        let reference = expand_named(&named);
        assert_eq!(reference.properties.get("Extract").map(String::as_str), Some("false"));

        let mut props = Properties::new();
        let (primary, back) = flatten_packages(vec![reference], &mut props);
        assert_eq!(primary, None);
        assert_eq!(back, vec![named]);
    }

    #[test]
    fn deploy_package_action_round_trips() {
        let mut common = ActionCommon::new("Deploy web");
        common.primary_package = Some(PrimaryPackage {
            package_id: "Shop.Web".into(),
            feed_id: BUILTIN_FEED.into(),
            acquisition_location: SERVER.into(),
            properties: BTreeMap::from([("SelectionMode".into(), "immediate".into())]),
        });
        let block = DeployPackageAction { common };

        let action = block.expand().unwrap();
        assert_eq!(action.action_type, "Octopus.TentaclePackage");
        let back = DeployPackageAction::flatten(action, None).unwrap();
        assert!(back.common.properties.is_empty());
        assert_eq!(back, block);
    }
}
