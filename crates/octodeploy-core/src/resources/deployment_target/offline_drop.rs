use octodeploy_api::models::{Endpoint, OfflineDropDestination, OfflineDropEndpoint};
use serde::{Deserialize, Serialize};

use super::{TargetCommon, TargetVariant, style_mismatch};
use crate::diagnostics::Diagnostics;
use crate::error::CoreError;
use crate::schema::{Attribute, Block, NestedBlock};

const DESTINATION_TYPES: &[&str] = &["Artifact", "FileSystem"];

/// Offline package drop target.
pub struct OfflinePackageDrop;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfflineDropFields {
    pub applications_directory: String,
    pub working_directory: String,
    pub destination: Destination,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    pub destination_type: String,
    #[serde(default)]
    pub drop_folder_path: Option<String>,
}

impl TargetVariant for OfflinePackageDrop {
    const TYPE_NAME: &'static str = "octopusdeploy_offline_package_drop_deployment_target";
    const COMMUNICATION_STYLE: &'static str = "OfflineDrop";
    const DESCRIPTION: &'static str =
        "Manages an offline package drop deployment target in Octopus Deploy.";

    type Fields = OfflineDropFields;

    fn describe(block: Block) -> Block {
        block
            .attr("applications_directory", Attribute::string().required())
            .attr("working_directory", Attribute::string().required())
            .block(
                "destination",
                NestedBlock::single(
                    Block::new()
                        .attr(
                            "destination_type",
                            Attribute::string()
                                .default("Artifact")
                                .one_of(DESTINATION_TYPES),
                        )
                        .attr(
                            "drop_folder_path",
                            Attribute::string()
                                .description("Folder packages are written to for FileSystem drops."),
                        ),
                )
                .required(),
            )
    }

    fn validate(fields: &OfflineDropFields, diags: &mut Diagnostics) {
        let destination = &fields.destination;
        if destination.destination_type == "FileSystem" && destination.drop_folder_path.is_none() {
            diags.error(
                "destination.drop_folder_path",
                "drop_folder_path is required when destination_type is FileSystem",
            );
        }
    }

    fn expand(_common: &TargetCommon, fields: &OfflineDropFields) -> Result<Endpoint, CoreError> {
        Ok(Endpoint::OfflineDrop(OfflineDropEndpoint {
            applications_directory: fields.applications_directory.clone(),
            working_directory: fields.working_directory.clone(),
            destination: OfflineDropDestination {
                destination_type: fields.destination.destination_type.clone(),
                drop_folder_path: fields.destination.drop_folder_path.clone(),
            },
        }))
    }

    fn flatten(
        _common: &mut TargetCommon,
        endpoint: Endpoint,
        _prior: Option<&OfflineDropFields>,
    ) -> Result<OfflineDropFields, CoreError> {
        match endpoint {
            Endpoint::OfflineDrop(e) => Ok(OfflineDropFields {
                applications_directory: e.applications_directory,
                working_directory: e.working_directory,
                destination: Destination {
                    destination_type: e.destination.destination_type,
                    drop_folder_path: e.destination.drop_folder_path,
                },
            }),
            other => Err(style_mismatch(&other)),
        }
    }
}
