// Azure cloud service, service fabric and web app targets.

use octodeploy_api::models::{
    AzureCloudServiceEndpoint, AzureServiceFabricEndpoint, AzureWebAppEndpoint, Endpoint,
    SensitiveValue,
};
use serde::{Deserialize, Serialize};

use super::{TargetCommon, TargetVariant, style_mismatch};
use crate::diagnostics::Diagnostics;
use crate::error::CoreError;
use crate::schema::{Attribute, Block};

// ── Cloud service ────────────────────────────────────────────────────

pub struct AzureCloudService;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AzureCloudServiceFields {
    pub account_id: String,
    pub cloud_service_name: String,
    pub storage_account_name: String,
    #[serde(default)]
    pub slot: Option<String>,
    #[serde(default)]
    pub swap_if_possible: bool,
    #[serde(default)]
    pub use_current_instance_count: bool,
    #[serde(default)]
    pub default_worker_pool_id: Option<String>,
}

impl TargetVariant for AzureCloudService {
    const TYPE_NAME: &'static str = "octopusdeploy_azure_cloud_service_deployment_target";
    const COMMUNICATION_STYLE: &'static str = "AzureCloudService";
    const DESCRIPTION: &'static str =
        "Manages an Azure cloud service deployment target in Octopus Deploy.";

    type Fields = AzureCloudServiceFields;

    fn describe(block: Block) -> Block {
        block
            .attr("account_id", Attribute::string().required())
            .attr("cloud_service_name", Attribute::string().required())
            .attr("storage_account_name", Attribute::string().required())
            .attr("slot", Attribute::string())
            .attr("swap_if_possible", Attribute::bool().default(false))
            .attr("use_current_instance_count", Attribute::bool().default(false))
            .attr("default_worker_pool_id", Attribute::string())
    }

    fn expand(
        _common: &TargetCommon,
        fields: &AzureCloudServiceFields,
    ) -> Result<Endpoint, CoreError> {
        Ok(Endpoint::AzureCloudService(AzureCloudServiceEndpoint {
            account_id: fields.account_id.clone(),
            cloud_service_name: fields.cloud_service_name.clone(),
            storage_account_name: fields.storage_account_name.clone(),
            slot: fields.slot.clone(),
            swap_if_possible: fields.swap_if_possible,
            use_current_instance_count: fields.use_current_instance_count,
            default_worker_pool_id: fields.default_worker_pool_id.clone(),
        }))
    }

    fn flatten(
        _common: &mut TargetCommon,
        endpoint: Endpoint,
        _prior: Option<&AzureCloudServiceFields>,
    ) -> Result<AzureCloudServiceFields, CoreError> {
        match endpoint {
            Endpoint::AzureCloudService(e) => Ok(AzureCloudServiceFields {
                account_id: e.account_id,
                cloud_service_name: e.cloud_service_name,
                storage_account_name: e.storage_account_name,
                slot: e.slot,
                swap_if_possible: e.swap_if_possible,
                use_current_instance_count: e.use_current_instance_count,
                default_worker_pool_id: e.default_worker_pool_id,
            }),
            other => Err(style_mismatch(&other)),
        }
    }
}

// ── Service fabric ───────────────────────────────────────────────────

const SECURITY_MODES: &[&str] = &["Unsecure", "SecureClientCertificate", "SecureAzureAD"];
const AAD_CREDENTIAL_TYPES: &[&str] = &["ClientCredential", "UserCredential"];

pub struct AzureServiceFabricCluster;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AzureServiceFabricFields {
    pub connection_endpoint: String,
    #[serde(default)]
    pub security_mode: Option<String>,
    #[serde(default)]
    pub server_certificate_thumbprint: Option<String>,
    #[serde(default)]
    pub client_certificate_variable: Option<String>,
    #[serde(default)]
    pub certificate_store_location: Option<String>,
    #[serde(default)]
    pub certificate_store_name: Option<String>,
    #[serde(default)]
    pub aad_credential_type: Option<String>,
    #[serde(default)]
    pub aad_client_credential_secret: Option<String>,
    #[serde(default)]
    pub aad_user_credential_username: Option<String>,
    #[serde(default)]
    pub aad_user_credential_password: Option<String>,
}

impl TargetVariant for AzureServiceFabricCluster {
    const TYPE_NAME: &'static str = "octopusdeploy_azure_service_fabric_cluster_deployment_target";
    const COMMUNICATION_STYLE: &'static str = "AzureServiceFabricCluster";
    const DESCRIPTION: &'static str =
        "Manages an Azure service fabric cluster deployment target in Octopus Deploy.";

    type Fields = AzureServiceFabricFields;

    fn describe(block: Block) -> Block {
        block
            .attr("connection_endpoint", Attribute::string().required())
            .attr("security_mode", Attribute::string().one_of(SECURITY_MODES))
            .attr("server_certificate_thumbprint", Attribute::string())
            .attr("client_certificate_variable", Attribute::string())
            .attr("certificate_store_location", Attribute::string())
            .attr("certificate_store_name", Attribute::string())
            .attr(
                "aad_credential_type",
                Attribute::string().one_of(AAD_CREDENTIAL_TYPES),
            )
            .attr("aad_client_credential_secret", Attribute::string())
            .attr("aad_user_credential_username", Attribute::string())
            .attr("aad_user_credential_password", Attribute::string().sensitive())
    }

    fn validate(fields: &AzureServiceFabricFields, diags: &mut Diagnostics) {
        match fields.security_mode.as_deref() {
            Some("SecureClientCertificate") if fields.client_certificate_variable.is_none() => {
                diags.error(
                    "client_certificate_variable",
                    "client_certificate_variable is required for SecureClientCertificate",
                );
            }
            Some("SecureAzureAD") if fields.aad_credential_type.is_none() => {
                diags.error(
                    "aad_credential_type",
                    "aad_credential_type is required for SecureAzureAD",
                );
            }
            _ => {}
        }
    }

    fn expand(
        _common: &TargetCommon,
        fields: &AzureServiceFabricFields,
    ) -> Result<Endpoint, CoreError> {
        Ok(Endpoint::AzureServiceFabricCluster(AzureServiceFabricEndpoint {
            connection_endpoint: fields.connection_endpoint.clone(),
            security_mode: fields.security_mode.clone(),
            server_cert_thumbprint: fields.server_certificate_thumbprint.clone(),
            client_certificate_variable: fields.client_certificate_variable.clone(),
            certificate_store_location: fields.certificate_store_location.clone(),
            certificate_store_name: fields.certificate_store_name.clone(),
            aad_credential_type: fields.aad_credential_type.clone(),
            aad_client_credential_secret: fields.aad_client_credential_secret.clone(),
            aad_user_credential_username: fields.aad_user_credential_username.clone(),
            aad_user_credential_password: fields
                .aad_user_credential_password
                .as_deref()
                .map(SensitiveValue::new),
        }))
    }

    fn flatten(
        _common: &mut TargetCommon,
        endpoint: Endpoint,
        prior: Option<&AzureServiceFabricFields>,
    ) -> Result<AzureServiceFabricFields, CoreError> {
        match endpoint {
            Endpoint::AzureServiceFabricCluster(e) => Ok(AzureServiceFabricFields {
                connection_endpoint: e.connection_endpoint,
                security_mode: e.security_mode,
                server_certificate_thumbprint: e.server_cert_thumbprint,
                client_certificate_variable: e.client_certificate_variable,
                certificate_store_location: e.certificate_store_location,
                certificate_store_name: e.certificate_store_name,
                aad_credential_type: e.aad_credential_type,
                aad_client_credential_secret: e.aad_client_credential_secret,
                aad_user_credential_username: e.aad_user_credential_username,
                // The server only reports HasValue; keep what was configured.
                aad_user_credential_password: prior
                    .and_then(|p| p.aad_user_credential_password.clone()),
            }),
            other => Err(style_mismatch(&other)),
        }
    }
}

// ── Web app ──────────────────────────────────────────────────────────

pub struct AzureWebApp;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AzureWebAppFields {
    pub account_id: String,
    pub resource_group_name: String,
    pub web_app_name: String,
    #[serde(default)]
    pub web_app_slot_name: Option<String>,
    #[serde(default)]
    pub default_worker_pool_id: Option<String>,
}

impl TargetVariant for AzureWebApp {
    const TYPE_NAME: &'static str = "octopusdeploy_azure_web_app_deployment_target";
    const COMMUNICATION_STYLE: &'static str = "AzureWebApp";
    const DESCRIPTION: &'static str =
        "Manages an Azure web app deployment target in Octopus Deploy.";

    type Fields = AzureWebAppFields;

    fn describe(block: Block) -> Block {
        block
            .attr("account_id", Attribute::string().required())
            .attr("resource_group_name", Attribute::string().required())
            .attr("web_app_name", Attribute::string().required())
            .attr("web_app_slot_name", Attribute::string())
            .attr("default_worker_pool_id", Attribute::string())
    }

    fn expand(_common: &TargetCommon, fields: &AzureWebAppFields) -> Result<Endpoint, CoreError> {
        Ok(Endpoint::AzureWebApp(AzureWebAppEndpoint {
            account_id: fields.account_id.clone(),
            resource_group_name: fields.resource_group_name.clone(),
            web_app_name: fields.web_app_name.clone(),
            web_app_slot_name: fields.web_app_slot_name.clone(),
            default_worker_pool_id: fields.default_worker_pool_id.clone(),
        }))
    }

    fn flatten(
        _common: &mut TargetCommon,
        endpoint: Endpoint,
        _prior: Option<&AzureWebAppFields>,
    ) -> Result<AzureWebAppFields, CoreError> {
        match endpoint {
            Endpoint::AzureWebApp(e) => Ok(AzureWebAppFields {
                account_id: e.account_id,
                resource_group_name: e.resource_group_name,
                web_app_name: e.web_app_name,
                web_app_slot_name: e.web_app_slot_name,
                default_worker_pool_id: e.default_worker_pool_id,
            }),
            other => Err(style_mismatch(&other)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::resources::deployment_target::{TargetModel, expand, flatten, test_support};

    fn fabric() -> AzureServiceFabricFields {
        AzureServiceFabricFields {
            connection_endpoint: "sf.example:19000".into(),
            security_mode: Some("SecureAzureAD".into()),
            server_certificate_thumbprint: Some("AB12".into()),
            client_certificate_variable: None,
            certificate_store_location: None,
            certificate_store_name: None,
            aad_credential_type: Some("UserCredential".into()),
            aad_client_credential_secret: None,
            aad_user_credential_username: Some("deployer".into()),
            aad_user_credential_password: Some("hunter2".into()),
        }
    }

    #[test]
    fn fabric_password_is_sent_as_sensitive_value() {
        let model = TargetModel {
            common: test_support::common("fabric"),
            endpoint: fabric(),
        };
        let target = expand::<AzureServiceFabricCluster>(&model).unwrap();
        let Endpoint::AzureServiceFabricCluster(e) = &target.endpoint else {
            panic!("unexpected endpoint {:?}", target.endpoint);
        };
        assert_eq!(e.server_cert_thumbprint.as_deref(), Some("AB12"));
        assert_eq!(
            e.aad_user_credential_password,
            Some(SensitiveValue::new("hunter2"))
        );
    }

    #[test]
    fn fabric_flatten_keeps_prior_password() {
        let model = TargetModel {
            common: test_support::common("fabric"),
            endpoint: fabric(),
        };
        let mut target = expand::<AzureServiceFabricCluster>(&model).unwrap();
        // What the server echoes back.
        if let Endpoint::AzureServiceFabricCluster(e) = &mut target.endpoint {
            e.aad_user_credential_password = Some(SensitiveValue {
                has_value: true,
                new_value: None,
            });
        }

        let with_prior =
            flatten::<AzureServiceFabricCluster>(target.clone(), Some(&model.endpoint)).unwrap();
        assert_eq!(with_prior, model);

        let imported = flatten::<AzureServiceFabricCluster>(target, None).unwrap();
        assert_eq!(imported.endpoint.aad_user_credential_password, None);
    }

    #[test]
    fn secure_azure_ad_requires_credential_type() {
        let mut diags = Diagnostics::new();
        let fields = AzureServiceFabricFields {
            aad_credential_type: None,
            ..fabric()
        };
        AzureServiceFabricCluster::validate(&fields, &mut diags);
        assert_eq!(
            diags.errors().next().and_then(|d| d.attribute.as_deref()),
            Some("aad_credential_type")
        );
    }

    #[test]
    fn web_app_round_trip() {
        let model = TargetModel {
            common: test_support::common("web"),
            endpoint: AzureWebAppFields {
                account_id: "Accounts-2".into(),
                resource_group_name: "rg-web".into(),
                web_app_name: "shop".into(),
                web_app_slot_name: Some("staging".into()),
                default_worker_pool_id: None,
            },
        };
        let target = expand::<AzureWebApp>(&model).unwrap();
        assert_eq!(target.endpoint.communication_style(), "AzureWebApp");
        assert_eq!(flatten::<AzureWebApp>(target, None).unwrap(), model);
    }
}
