use octodeploy_api::models::{CloudRegionEndpoint, Endpoint};
use serde::{Deserialize, Serialize};

use super::{TargetCommon, TargetVariant, style_mismatch};
use crate::error::CoreError;
use crate::schema::{Attribute, Block};

/// Cloud region target (`CommunicationStyle: None`).
pub struct CloudRegion;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudRegionFields {
    #[serde(default)]
    pub default_worker_pool_id: Option<String>,
}

impl TargetVariant for CloudRegion {
    const TYPE_NAME: &'static str = "octopusdeploy_cloud_region_deployment_target";
    const COMMUNICATION_STYLE: &'static str = "None";
    const DESCRIPTION: &'static str = "Manages a cloud region deployment target in Octopus Deploy.";

    type Fields = CloudRegionFields;

    fn describe(block: Block) -> Block {
        block.attr(
            "default_worker_pool_id",
            Attribute::string().description("The worker pool used for steps targeting this region."),
        )
    }

    fn expand(_common: &TargetCommon, fields: &CloudRegionFields) -> Result<Endpoint, CoreError> {
        Ok(Endpoint::CloudRegion(CloudRegionEndpoint {
            default_worker_pool_id: fields.default_worker_pool_id.clone(),
        }))
    }

    fn flatten(
        _common: &mut TargetCommon,
        endpoint: Endpoint,
        _prior: Option<&CloudRegionFields>,
    ) -> Result<CloudRegionFields, CoreError> {
        match endpoint {
            Endpoint::CloudRegion(e) => Ok(CloudRegionFields {
                default_worker_pool_id: e.default_worker_pool_id,
            }),
            other => Err(style_mismatch(&other)),
        }
    }
}
