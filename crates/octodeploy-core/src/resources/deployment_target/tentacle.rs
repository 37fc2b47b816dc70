// Listening (TentaclePassive) and polling (TentacleActive) tentacles share
// one endpoint shape and differ only in the style and thumbprint rules.

use octodeploy_api::models::{Endpoint, TentacleEndpoint, TentacleVersionDetails};
use serde::{Deserialize, Serialize};

use super::{TargetCommon, TargetVariant, style_mismatch};
use crate::error::CoreError;
use crate::schema::{AttrType, Attribute, Block, Validator};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TentacleFields {
    pub tentacle_url: String,
    #[serde(default)]
    pub certificate_signature_algorithm: Option<String>,
    #[serde(default)]
    pub proxy_id: Option<String>,
    #[serde(default)]
    pub tentacle_version_details: Option<VersionDetails>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionDetails {
    pub upgrade_locked: bool,
    pub version: Option<String>,
    pub upgrade_suggested: bool,
    pub upgrade_required: bool,
    pub upgrade_available: bool,
}

fn version_details_type() -> AttrType {
    AttrType::object([
        ("upgrade_locked", AttrType::Bool),
        ("version", AttrType::String),
        ("upgrade_suggested", AttrType::Bool),
        ("upgrade_required", AttrType::Bool),
        ("upgrade_available", AttrType::Bool),
    ])
}

fn describe_tentacle(block: Block) -> Block {
    block
        .attr(
            "tentacle_url",
            Attribute::string()
                .required()
                .validate(Validator::NonEmpty)
                .description("The URL of the tentacle."),
        )
        .attr("certificate_signature_algorithm", Attribute::string())
        .attr(
            "tentacle_version_details",
            Attribute::new(version_details_type()).computed(),
        )
}

fn tentacle_endpoint(common: &TargetCommon, fields: &TentacleFields) -> TentacleEndpoint {
    TentacleEndpoint {
        uri: fields.tentacle_url.clone(),
        thumbprint: common.thumbprint.clone(),
        proxy_id: fields.proxy_id.clone(),
        certificate_signature_algorithm: fields.certificate_signature_algorithm.clone(),
        tentacle_version_details: None,
    }
}

fn flatten_tentacle(common: &mut TargetCommon, endpoint: TentacleEndpoint) -> TentacleFields {
    if common.thumbprint.is_none() {
        common.thumbprint = endpoint.thumbprint;
    }
    TentacleFields {
        tentacle_url: endpoint.uri,
        certificate_signature_algorithm: endpoint.certificate_signature_algorithm,
        proxy_id: endpoint.proxy_id,
        tentacle_version_details: endpoint.tentacle_version_details.map(
            |TentacleVersionDetails {
                 upgrade_locked,
                 version,
                 upgrade_suggested,
                 upgrade_required,
                 upgrade_available,
             }| VersionDetails {
                upgrade_locked,
                version,
                upgrade_suggested,
                upgrade_required,
                upgrade_available,
            },
        ),
    }
}

// ── Listening ────────────────────────────────────────────────────────

/// Tentacle that Octopus connects to.
pub struct ListeningTentacle;

impl TargetVariant for ListeningTentacle {
    const TYPE_NAME: &'static str = "octopusdeploy_listening_tentacle_deployment_target";
    const COMMUNICATION_STYLE: &'static str = "TentaclePassive";
    const DESCRIPTION: &'static str =
        "Manages a listening tentacle deployment target in Octopus Deploy.";

    type Fields = TentacleFields;

    fn describe(block: Block) -> Block {
        describe_tentacle(block)
            .attr(
                "thumbprint",
                Attribute::string()
                    .required()
                    .description("The thumbprint of the tentacle's certificate."),
            )
            .attr("proxy_id", Attribute::string())
    }

    fn expand(common: &TargetCommon, fields: &TentacleFields) -> Result<Endpoint, CoreError> {
        Ok(Endpoint::ListeningTentacle(tentacle_endpoint(common, fields)))
    }

    fn flatten(
        common: &mut TargetCommon,
        endpoint: Endpoint,
        _prior: Option<&TentacleFields>,
    ) -> Result<TentacleFields, CoreError> {
        match endpoint {
            Endpoint::ListeningTentacle(e) => Ok(flatten_tentacle(common, e)),
            other => Err(style_mismatch(&other)),
        }
    }
}

// ── Polling ──────────────────────────────────────────────────────────

/// Tentacle that polls Octopus for work.
pub struct PollingTentacle;

impl TargetVariant for PollingTentacle {
    const TYPE_NAME: &'static str = "octopusdeploy_polling_tentacle_deployment_target";
    const COMMUNICATION_STYLE: &'static str = "TentacleActive";
    const DESCRIPTION: &'static str =
        "Manages a polling tentacle deployment target in Octopus Deploy.";

    type Fields = TentacleFields;

    fn describe(block: Block) -> Block {
        describe_tentacle(block)
    }

    fn expand(common: &TargetCommon, fields: &TentacleFields) -> Result<Endpoint, CoreError> {
        Ok(Endpoint::PollingTentacle(tentacle_endpoint(common, fields)))
    }

    fn flatten(
        common: &mut TargetCommon,
        endpoint: Endpoint,
        _prior: Option<&TentacleFields>,
    ) -> Result<TentacleFields, CoreError> {
        match endpoint {
            Endpoint::PollingTentacle(e) => Ok(flatten_tentacle(common, e)),
            other => Err(style_mismatch(&other)),
        }
    }
}
