use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use strum::{Display, EnumString, VariantNames};

use super::SensitiveValue;

// ── Deployment target ────────────────────────────────────────────────

/// Deployment target (a "machine" in the REST API):
/// `GET /api/{space}/machines/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeploymentTarget {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub endpoint: Endpoint,
    #[serde(default)]
    pub environment_ids: Vec<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_policy_id: Option<String>,
    #[serde(default)]
    pub is_disabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbprint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default)]
    pub tenanted_deployment_participation: TenantedDeploymentMode,
    #[serde(default)]
    pub tenant_ids: Vec<String>,
    #[serde(default)]
    pub tenant_tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_id: Option<String>,

    // Server-maintained status; ignored on write.
    #[serde(default)]
    pub has_latest_calamari: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_status: Option<String>,
    #[serde(default)]
    pub is_in_process: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operating_system: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_summary: Option<String>,
}

impl DeploymentTarget {
    /// A new target with the given endpoint and no server-side state.
    pub fn new(name: impl Into<String>, endpoint: Endpoint) -> Self {
        Self {
            id: None,
            name: name.into(),
            endpoint,
            environment_ids: Vec::new(),
            roles: Vec::new(),
            machine_policy_id: None,
            is_disabled: false,
            thumbprint: None,
            uri: None,
            tenanted_deployment_participation: TenantedDeploymentMode::default(),
            tenant_ids: Vec::new(),
            tenant_tags: Vec::new(),
            space_id: None,
            has_latest_calamari: false,
            health_status: None,
            is_in_process: false,
            operating_system: None,
            shell_name: None,
            shell_version: None,
            status: None,
            status_summary: None,
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, VariantNames,
)]
pub enum TenantedDeploymentMode {
    #[default]
    Untenanted,
    TenantedOrUntenanted,
    Tenanted,
}

// ── Endpoints ────────────────────────────────────────────────────────

/// Communication style of a deployment target, discriminated on the wire
/// by `Endpoint.CommunicationStyle`.
#[derive(Debug, Clone, PartialEq)]
pub enum Endpoint {
    AzureCloudService(AzureCloudServiceEndpoint),
    AzureServiceFabricCluster(AzureServiceFabricEndpoint),
    AzureWebApp(AzureWebAppEndpoint),
    Kubernetes(KubernetesEndpoint),
    /// Cloud region targets (`CommunicationStyle: "None"`).
    CloudRegion(CloudRegionEndpoint),
    OfflineDrop(OfflineDropEndpoint),
    Ssh(SshEndpoint),
    /// Polling tentacle (`TentacleActive`).
    PollingTentacle(TentacleEndpoint),
    /// Listening tentacle (`TentaclePassive`).
    ListeningTentacle(TentacleEndpoint),
    /// A style this client does not model (step-package targets, ECS...).
    Other {
        communication_style: String,
        raw: Value,
    },
}

const COMMUNICATION_STYLE: &str = "CommunicationStyle";

impl Endpoint {
    /// Wire value of the `CommunicationStyle` discriminator.
    pub fn communication_style(&self) -> &str {
        match self {
            Self::AzureCloudService(_) => "AzureCloudService",
            Self::AzureServiceFabricCluster(_) => "AzureServiceFabricCluster",
            Self::AzureWebApp(_) => "AzureWebApp",
            Self::Kubernetes(_) => "Kubernetes",
            Self::CloudRegion(_) => "None",
            Self::OfflineDrop(_) => "OfflineDrop",
            Self::Ssh(_) => "Ssh",
            Self::PollingTentacle(_) => "TentacleActive",
            Self::ListeningTentacle(_) => "TentaclePassive",
            Self::Other {
                communication_style,
                ..
            } => communication_style,
        }
    }

    fn payload(&self) -> Result<Value, serde_json::Error> {
        match self {
            Self::AzureCloudService(e) => serde_json::to_value(e),
            Self::AzureServiceFabricCluster(e) => serde_json::to_value(e),
            Self::AzureWebApp(e) => serde_json::to_value(e),
            Self::Kubernetes(e) => serde_json::to_value(e),
            Self::CloudRegion(e) => serde_json::to_value(e),
            Self::OfflineDrop(e) => serde_json::to_value(e),
            Self::Ssh(e) => serde_json::to_value(e),
            Self::PollingTentacle(e) | Self::ListeningTentacle(e) => serde_json::to_value(e),
            Self::Other { raw, .. } => Ok(raw.clone()),
        }
    }
}

impl Serialize for Endpoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let payload = self.payload().map_err(serde::ser::Error::custom)?;
        super::with_tag(&payload, COMMUNICATION_STYLE, self.communication_style())
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Endpoint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        fn variant<T: serde::de::DeserializeOwned, E: serde::de::Error>(
            raw: Value,
        ) -> Result<T, E> {
            serde_json::from_value(raw).map_err(E::custom)
        }

        let raw = Value::deserialize(deserializer)?;
        let style = super::tag_of::<D::Error>(&raw, COMMUNICATION_STYLE)?;

        Ok(match style.as_str() {
            "AzureCloudService" => Self::AzureCloudService(variant(raw)?),
            "AzureServiceFabricCluster" => Self::AzureServiceFabricCluster(variant(raw)?),
            "AzureWebApp" => Self::AzureWebApp(variant(raw)?),
            "Kubernetes" => Self::Kubernetes(variant(raw)?),
            "None" => Self::CloudRegion(variant(raw)?),
            "OfflineDrop" => Self::OfflineDrop(variant(raw)?),
            "Ssh" => Self::Ssh(variant(raw)?),
            "TentacleActive" => Self::PollingTentacle(variant(raw)?),
            "TentaclePassive" => Self::ListeningTentacle(variant(raw)?),
            _ => Self::Other {
                communication_style: style,
                raw,
            },
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AzureCloudServiceEndpoint {
    pub account_id: String,
    pub cloud_service_name: String,
    pub storage_account_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<String>,
    #[serde(default)]
    pub swap_if_possible: bool,
    #[serde(default)]
    pub use_current_instance_count: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_worker_pool_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AzureServiceFabricEndpoint {
    pub connection_endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_cert_thumbprint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_certificate_variable: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_store_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_store_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aad_credential_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aad_client_credential_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aad_user_credential_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aad_user_credential_password: Option<SensitiveValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AzureWebAppEndpoint {
    pub account_id: String,
    pub resource_group_name: String,
    pub web_app_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_app_slot_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_worker_pool_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KubernetesEndpoint {
    pub cluster_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_certificate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_certificate_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default)]
    pub skip_tls_verification: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_worker_pool_id: Option<String>,
    #[serde(default)]
    pub running_in_container: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<ContainerImage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication: Option<KubernetesAuthentication>,
}

/// Container image reference (`{Image, FeedId}`), shared by Kubernetes
/// endpoints and deployment actions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerImage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feed_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Kubernetes cluster authentication, discriminated by `AuthenticationType`.
///
/// Types this client does not model decode to [`Self::Other`] with the
/// payload kept as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "AuthenticationType", remote = "Self")]
pub enum KubernetesAuthentication {
    #[serde(rename_all = "PascalCase")]
    KubernetesAws {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        account_id: Option<String>,
        cluster_name: String,
        #[serde(default)]
        assume_role: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        assumed_role_arn: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        assumed_role_session: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        assume_role_session_duration_seconds: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        assume_role_external_id: Option<String>,
        #[serde(default)]
        use_instance_role: bool,
    },
    #[serde(rename_all = "PascalCase")]
    KubernetesAzure {
        account_id: String,
        cluster_name: String,
        cluster_resource_group: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        admin_login: Option<String>,
    },
    #[serde(rename_all = "PascalCase")]
    KubernetesCertificate { client_certificate: String },
    #[serde(rename_all = "PascalCase")]
    KubernetesGoogleCloud {
        account_id: String,
        cluster_name: String,
        project: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        region: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        zone: Option<String>,
        #[serde(default)]
        impersonate_service_account: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        service_account_emails: Option<String>,
        #[serde(default)]
        use_vm_service_account: bool,
    },
    #[serde(rename_all = "PascalCase")]
    KubernetesStandard { account_id: String },
    #[serde(rename_all = "PascalCase")]
    KubernetesPodService { token_path: String },
    /// No credentials; the cluster is reached anonymously.
    #[serde(rename = "None")]
    Anonymous,
    #[serde(skip)]
    Other {
        authentication_type: String,
        raw: Value,
    },
}

const AUTHENTICATION_TYPE: &str = "AuthenticationType";

const KNOWN_AUTHENTICATION_TYPES: &[&str] = &[
    "KubernetesAws",
    "KubernetesAzure",
    "KubernetesCertificate",
    "KubernetesGoogleCloud",
    "KubernetesStandard",
    "KubernetesPodService",
    "None",
];

impl KubernetesAuthentication {
    /// Wire value of the `AuthenticationType` discriminator.
    pub fn authentication_type(&self) -> &str {
        match self {
            Self::KubernetesAws { .. } => "KubernetesAws",
            Self::KubernetesAzure { .. } => "KubernetesAzure",
            Self::KubernetesCertificate { .. } => "KubernetesCertificate",
            Self::KubernetesGoogleCloud { .. } => "KubernetesGoogleCloud",
            Self::KubernetesStandard { .. } => "KubernetesStandard",
            Self::KubernetesPodService { .. } => "KubernetesPodService",
            Self::Anonymous => "None",
            Self::Other {
                authentication_type,
                ..
            } => authentication_type,
        }
    }
}

impl Serialize for KubernetesAuthentication {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Other { raw, .. } => {
                super::with_tag(raw, AUTHENTICATION_TYPE, self.authentication_type())
                    .serialize(serializer)
            }
            known => Self::serialize(known, serializer),
        }
    }
}

impl<'de> Deserialize<'de> for KubernetesAuthentication {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        let kind = super::tag_of::<D::Error>(&raw, AUTHENTICATION_TYPE)?;
        if KNOWN_AUTHENTICATION_TYPES.contains(&kind.as_str()) {
            Self::deserialize(raw).map_err(D::Error::custom)
        } else {
            Ok(Self::Other {
                authentication_type: kind,
                raw,
            })
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CloudRegionEndpoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_worker_pool_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OfflineDropEndpoint {
    pub applications_directory: String,
    pub working_directory: String,
    #[serde(default)]
    pub destination: OfflineDropDestination,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OfflineDropDestination {
    #[serde(default = "default_destination_type")]
    pub destination_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drop_folder_path: Option<String>,
}

fn default_destination_type() -> String {
    "Artifact".to_owned()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SshEndpoint {
    pub account_id: String,
    pub host: String,
    pub port: u16,
    pub fingerprint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dot_net_core_platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_id: Option<String>,
}

/// Shared shape of listening and polling tentacle endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TentacleEndpoint {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbprint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_signature_algorithm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tentacle_version_details: Option<TentacleVersionDetails>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TentacleVersionDetails {
    #[serde(default)]
    pub upgrade_locked: bool,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub upgrade_suggested: bool,
    #[serde(default)]
    pub upgrade_required: bool,
    #[serde(default)]
    pub upgrade_available: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn kubernetes_endpoint_carries_style_and_auth_tags() {
        let endpoint = Endpoint::Kubernetes(KubernetesEndpoint {
            cluster_url: "https://example:443".into(),
            namespace: Some("prod".into()),
            skip_tls_verification: true,
            authentication: Some(KubernetesAuthentication::KubernetesPodService {
                token_path: "/var/run/token".into(),
            }),
            ..KubernetesEndpoint::default()
        });

        let value = serde_json::to_value(&endpoint).unwrap();
        assert_eq!(value["CommunicationStyle"], "Kubernetes");
        assert_eq!(value["ClusterUrl"], "https://example:443");
        assert_eq!(value["Namespace"], "prod");
        assert_eq!(value["SkipTlsVerification"], true);
        assert_eq!(
            value["Authentication"],
            json!({ "AuthenticationType": "KubernetesPodService", "TokenPath": "/var/run/token" })
        );

        let back: Endpoint = serde_json::from_value(value).unwrap();
        assert_eq!(back, endpoint);
    }

    #[test]
    fn unknown_style_is_preserved() {
        let raw = json!({ "CommunicationStyle": "StepPackage", "Foo": 1 });
        let endpoint: Endpoint = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(endpoint.communication_style(), "StepPackage");
        assert_eq!(serde_json::to_value(&endpoint).unwrap(), raw);
    }

    #[test]
    fn unknown_authentication_type_is_preserved() {
        let raw = json!({
            "CommunicationStyle": "Kubernetes",
            "ClusterUrl": "https://aks:443",
            "Authentication": { "AuthenticationType": "KubernetesAzureOidc", "Audience": "api://x" }
        });
        let endpoint: Endpoint = serde_json::from_value(raw.clone()).unwrap();
        let Endpoint::Kubernetes(k8s) = &endpoint else {
            panic!("unexpected endpoint {endpoint:?}");
        };
        let auth = k8s.authentication.as_ref().unwrap();
        assert_eq!(auth.authentication_type(), "KubernetesAzureOidc");
        assert!(matches!(auth, KubernetesAuthentication::Other { .. }));
        assert_eq!(
            serde_json::to_value(&endpoint).unwrap()["Authentication"],
            raw["Authentication"]
        );
    }

    #[test]
    fn known_authentication_still_rejects_bad_payload() {
        let result = serde_json::from_value::<KubernetesAuthentication>(json!({
            "AuthenticationType": "KubernetesCertificate"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn cloud_region_uses_none_style() {
        let endpoint: Endpoint = serde_json::from_value(json!({
            "CommunicationStyle": "None",
            "DefaultWorkerPoolId": "WorkerPools-1"
        }))
        .unwrap();
        assert_eq!(
            endpoint,
            Endpoint::CloudRegion(CloudRegionEndpoint {
                default_worker_pool_id: Some("WorkerPools-1".into())
            })
        );
    }

    #[test]
    fn missing_style_is_an_error() {
        let result = serde_json::from_value::<Endpoint>(json!({ "Uri": "https://x" }));
        assert!(result.is_err());
    }
}
