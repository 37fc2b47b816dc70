// ── Kubernetes cluster targets ──
//
// Authentication is a closed set of variants on the wire
// (`AuthenticationType`) and one optional block per variant in
// configuration. Exactly one block is set; flatten populates exactly the
// block matching the discriminator.

use octodeploy_api::models::{ContainerImage, Endpoint, KubernetesAuthentication, KubernetesEndpoint};
use serde::{Deserialize, Serialize};

use super::{TargetCommon, TargetVariant, style_mismatch};
use crate::error::CoreError;
use crate::schema::{Attribute, Block, NestedBlock, Validator};

const AUTHENTICATION_BLOCKS: &[&str] = &[
    "authentication",
    "aws_account_authentication",
    "azure_service_principal_authentication",
    "certificate_authentication",
    "gcp_account_authentication",
    "pod_authentication",
];

pub struct KubernetesCluster;

// ── Model ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KubernetesFields {
    pub cluster_url: String,
    #[serde(default)]
    pub cluster_certificate: Option<String>,
    #[serde(default)]
    pub cluster_certificate_path: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub skip_tls_verification: bool,
    #[serde(default)]
    pub proxy_id: Option<String>,
    #[serde(default)]
    pub default_worker_pool_id: Option<String>,
    #[serde(default)]
    pub running_in_container: bool,
    #[serde(default)]
    pub container: Option<Container>,

    #[serde(default)]
    pub authentication: Option<AccountAuthentication>,
    #[serde(default)]
    pub aws_account_authentication: Option<AwsAuthentication>,
    #[serde(default)]
    pub azure_service_principal_authentication: Option<AzureAuthentication>,
    #[serde(default)]
    pub certificate_authentication: Option<CertificateAuthentication>,
    #[serde(default)]
    pub gcp_account_authentication: Option<GcpAuthentication>,
    #[serde(default)]
    pub pod_authentication: Option<PodAuthentication>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    #[serde(default)]
    pub feed_id: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

/// Token or username/password account; no account means anonymous access.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountAuthentication {
    #[serde(default)]
    pub account_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsAuthentication {
    #[serde(default)]
    pub account_id: Option<String>,
    pub cluster_name: String,
    #[serde(default)]
    pub assume_role: bool,
    #[serde(default)]
    pub assumed_role_arn: Option<String>,
    #[serde(default)]
    pub assumed_role_session: Option<String>,
    #[serde(default)]
    pub assume_role_session_duration: Option<i64>,
    #[serde(default)]
    pub assume_role_external_id: Option<String>,
    #[serde(default)]
    pub use_instance_role: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AzureAuthentication {
    pub account_id: String,
    pub cluster_name: String,
    pub cluster_resource_group: String,
    #[serde(default)]
    pub admin_login: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateAuthentication {
    pub client_certificate: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GcpAuthentication {
    pub account_id: String,
    pub cluster_name: String,
    pub project: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub zone: Option<String>,
    #[serde(default)]
    pub impersonate_service_account: bool,
    #[serde(default)]
    pub service_account_emails: Option<String>,
    #[serde(default)]
    pub use_vm_service_account: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodAuthentication {
    pub token_path: String,
}

// ── Schema ───────────────────────────────────────────────────────────

fn authentication_blocks(block: Block) -> Block {
    block
        .block(
            "authentication",
            NestedBlock::single(Block::new().attr("account_id", Attribute::string())),
        )
        .block(
            "aws_account_authentication",
            NestedBlock::single(
                Block::new()
                    .attr("account_id", Attribute::string())
                    .attr("cluster_name", Attribute::string().required())
                    .attr("assume_role", Attribute::bool().default(false))
                    .attr("assumed_role_arn", Attribute::string())
                    .attr("assumed_role_session", Attribute::string())
                    .attr(
                        "assume_role_session_duration",
                        Attribute::int()
                            .validate(Validator::Range(900, 43_200))
                            .description("Session duration in seconds."),
                    )
                    .attr("assume_role_external_id", Attribute::string())
                    .attr("use_instance_role", Attribute::bool().default(false)),
            ),
        )
        .block(
            "azure_service_principal_authentication",
            NestedBlock::single(
                Block::new()
                    .attr("account_id", Attribute::string().required())
                    .attr("cluster_name", Attribute::string().required())
                    .attr("cluster_resource_group", Attribute::string().required())
                    .attr("admin_login", Attribute::string()),
            ),
        )
        .block(
            "certificate_authentication",
            NestedBlock::single(
                Block::new().attr("client_certificate", Attribute::string().required()),
            ),
        )
        .block(
            "gcp_account_authentication",
            NestedBlock::single(
                Block::new()
                    .attr("account_id", Attribute::string().required())
                    .attr("cluster_name", Attribute::string().required())
                    .attr("project", Attribute::string().required())
                    .attr("region", Attribute::string())
                    .attr("zone", Attribute::string())
                    .attr(
                        "impersonate_service_account",
                        Attribute::bool().default(false),
                    )
                    .attr("service_account_emails", Attribute::string())
                    .attr("use_vm_service_account", Attribute::bool().default(false)),
            ),
        )
        .block(
            "pod_authentication",
            NestedBlock::single(Block::new().attr(
                "token_path",
                Attribute::string()
                    .required()
                    .description("Path to the service account token inside the pod."),
            )),
        )
        .exactly_one_of(AUTHENTICATION_BLOCKS)
}

// ── Authentication mapping ───────────────────────────────────────────

fn expand_authentication(fields: &KubernetesFields) -> Result<KubernetesAuthentication, CoreError> {
    if let Some(auth) = &fields.authentication {
        return Ok(match &auth.account_id {
            Some(account_id) => KubernetesAuthentication::KubernetesStandard {
                account_id: account_id.clone(),
            },
            None => KubernetesAuthentication::Anonymous,
        });
    }
    if let Some(aws) = &fields.aws_account_authentication {
        return Ok(KubernetesAuthentication::KubernetesAws {
            account_id: aws.account_id.clone(),
            cluster_name: aws.cluster_name.clone(),
            assume_role: aws.assume_role,
            assumed_role_arn: aws.assumed_role_arn.clone(),
            assumed_role_session: aws.assumed_role_session.clone(),
            assume_role_session_duration_seconds: aws.assume_role_session_duration,
            assume_role_external_id: aws.assume_role_external_id.clone(),
            use_instance_role: aws.use_instance_role,
        });
    }
    if let Some(azure) = &fields.azure_service_principal_authentication {
        return Ok(KubernetesAuthentication::KubernetesAzure {
            account_id: azure.account_id.clone(),
            cluster_name: azure.cluster_name.clone(),
            cluster_resource_group: azure.cluster_resource_group.clone(),
            admin_login: azure.admin_login.clone(),
        });
    }
    if let Some(cert) = &fields.certificate_authentication {
        return Ok(KubernetesAuthentication::KubernetesCertificate {
            client_certificate: cert.client_certificate.clone(),
        });
    }
    if let Some(gcp) = &fields.gcp_account_authentication {
        return Ok(KubernetesAuthentication::KubernetesGoogleCloud {
            account_id: gcp.account_id.clone(),
            cluster_name: gcp.cluster_name.clone(),
            project: gcp.project.clone(),
            region: gcp.region.clone(),
            zone: gcp.zone.clone(),
            impersonate_service_account: gcp.impersonate_service_account,
            service_account_emails: gcp.service_account_emails.clone(),
            use_vm_service_account: gcp.use_vm_service_account,
        });
    }
    if let Some(pod) = &fields.pod_authentication {
        return Ok(KubernetesAuthentication::KubernetesPodService {
            token_path: pod.token_path.clone(),
        });
    }
    Err(CoreError::validation(
        "authentication",
        format!("exactly one of [{}] must be specified", AUTHENTICATION_BLOCKS.join(", ")),
    ))
}

/// Set the single block matching `auth` on `fields`.
fn flatten_authentication(
    fields: &mut KubernetesFields,
    auth: KubernetesAuthentication,
) -> Result<(), CoreError> {
    match auth {
        KubernetesAuthentication::KubernetesStandard { account_id } => {
            fields.authentication = Some(AccountAuthentication {
                account_id: Some(account_id),
            });
        }
        KubernetesAuthentication::Anonymous => {
            fields.authentication = Some(AccountAuthentication::default());
        }
        KubernetesAuthentication::KubernetesAws {
            account_id,
            cluster_name,
            assume_role,
            assumed_role_arn,
            assumed_role_session,
            assume_role_session_duration_seconds,
            assume_role_external_id,
            use_instance_role,
        } => {
            fields.aws_account_authentication = Some(AwsAuthentication {
                account_id,
                cluster_name,
                assume_role,
                assumed_role_arn,
                assumed_role_session,
                assume_role_session_duration: assume_role_session_duration_seconds,
                assume_role_external_id,
                use_instance_role,
            });
        }
        KubernetesAuthentication::KubernetesAzure {
            account_id,
            cluster_name,
            cluster_resource_group,
            admin_login,
        } => {
            fields.azure_service_principal_authentication = Some(AzureAuthentication {
                account_id,
                cluster_name,
                cluster_resource_group,
                admin_login,
            });
        }
        KubernetesAuthentication::KubernetesCertificate { client_certificate } => {
            fields.certificate_authentication =
                Some(CertificateAuthentication { client_certificate });
        }
        KubernetesAuthentication::KubernetesGoogleCloud {
            account_id,
            cluster_name,
            project,
            region,
            zone,
            impersonate_service_account,
            service_account_emails,
            use_vm_service_account,
        } => {
            fields.gcp_account_authentication = Some(GcpAuthentication {
                account_id,
                cluster_name,
                project,
                region,
                zone,
                impersonate_service_account,
                service_account_emails,
                use_vm_service_account,
            });
        }
        KubernetesAuthentication::KubernetesPodService { token_path } => {
            fields.pod_authentication = Some(PodAuthentication { token_path });
        }
        KubernetesAuthentication::Other {
            authentication_type,
            ..
        } => return Err(CoreError::unsupported("authentication_type", authentication_type)),
    }
    Ok(())
}

// ── Variant ──────────────────────────────────────────────────────────

impl TargetVariant for KubernetesCluster {
    const TYPE_NAME: &'static str = "octopusdeploy_kubernetes_cluster_deployment_target";
    const COMMUNICATION_STYLE: &'static str = "Kubernetes";
    const DESCRIPTION: &'static str =
        "Manages a Kubernetes cluster deployment target in Octopus Deploy.";

    type Fields = KubernetesFields;

    fn describe(block: Block) -> Block {
        let block = block
            .attr(
                "cluster_url",
                Attribute::string()
                    .required()
                    .validate(Validator::NonEmpty)
                    .description("The URL of the Kubernetes API server."),
            )
            .attr("cluster_certificate", Attribute::string())
            .attr("cluster_certificate_path", Attribute::string())
            .attr("namespace", Attribute::string())
            .attr("skip_tls_verification", Attribute::bool().default(false))
            .attr("proxy_id", Attribute::string())
            .attr("default_worker_pool_id", Attribute::string())
            .attr("running_in_container", Attribute::bool().default(false))
            .block(
                "container",
                NestedBlock::single(
                    Block::new()
                        .attr("feed_id", Attribute::string())
                        .attr("image", Attribute::string()),
                ),
            );
        authentication_blocks(block)
    }

    fn expand(_common: &TargetCommon, fields: &KubernetesFields) -> Result<Endpoint, CoreError> {
        Ok(Endpoint::Kubernetes(KubernetesEndpoint {
            cluster_url: fields.cluster_url.clone(),
            cluster_certificate: fields.cluster_certificate.clone(),
            cluster_certificate_path: fields.cluster_certificate_path.clone(),
            namespace: fields.namespace.clone(),
            skip_tls_verification: fields.skip_tls_verification,
            proxy_id: fields.proxy_id.clone(),
            default_worker_pool_id: fields.default_worker_pool_id.clone(),
            running_in_container: fields.running_in_container,
            container: fields.container.as_ref().map(|c| ContainerImage {
                feed_id: c.feed_id.clone(),
                image: c.image.clone(),
            }),
            authentication: Some(expand_authentication(fields)?),
        }))
    }

    fn flatten(
        _common: &mut TargetCommon,
        endpoint: Endpoint,
        _prior: Option<&KubernetesFields>,
    ) -> Result<KubernetesFields, CoreError> {
        let e = match endpoint {
            Endpoint::Kubernetes(e) => e,
            other => return Err(style_mismatch(&other)),
        };

        let mut fields = KubernetesFields {
            cluster_url: e.cluster_url,
            cluster_certificate: e.cluster_certificate,
            cluster_certificate_path: e.cluster_certificate_path,
            namespace: e.namespace,
            skip_tls_verification: e.skip_tls_verification,
            proxy_id: e.proxy_id,
            default_worker_pool_id: e.default_worker_pool_id,
            running_in_container: e.running_in_container,
            container: e.container.map(|c| Container {
                feed_id: c.feed_id,
                image: c.image,
            }),
            ..KubernetesFields::default()
        };
        flatten_authentication(
            &mut fields,
            e.authentication.unwrap_or(KubernetesAuthentication::Anonymous),
        )?;
        Ok(fields)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::resources::deployment_target::{TargetModel, expand, flatten, schema, test_support};

    fn populated_blocks(fields: &KubernetesFields) -> Vec<&'static str> {
        let value = serde_json::to_value(fields).unwrap();
        AUTHENTICATION_BLOCKS
            .iter()
            .copied()
            .filter(|name| !value[*name].is_null())
            .collect()
    }

    fn cluster(fields: KubernetesFields) -> TargetModel<KubernetesFields> {
        TargetModel {
            common: test_support::common("k8s"),
            endpoint: KubernetesFields {
                cluster_url: "https://example:443".into(),
                ..fields
            },
        }
    }

    #[test]
    fn expand_keeps_cluster_fields_verbatim() {
        let model = cluster(KubernetesFields {
            namespace: Some("prod".into()),
            skip_tls_verification: true,
            authentication: Some(AccountAuthentication {
                account_id: Some("Accounts-1".into()),
            }),
            ..KubernetesFields::default()
        });

        let target = expand::<KubernetesCluster>(&model).unwrap();
        assert_eq!(target.endpoint.communication_style(), "Kubernetes");
        let Endpoint::Kubernetes(e) = &target.endpoint else {
            panic!("unexpected endpoint {:?}", target.endpoint);
        };
        assert_eq!(e.cluster_url, "https://example:443");
        assert_eq!(e.namespace.as_deref(), Some("prod"));
        assert!(e.skip_tls_verification);

        let wire = serde_json::to_value(&target.endpoint).unwrap();
        assert_eq!(wire["CommunicationStyle"], "Kubernetes");
        assert_eq!(wire["Authentication"]["AuthenticationType"], "KubernetesStandard");
    }

    #[test]
    fn every_authentication_variant_flattens_to_one_block() {
        let variants = [
            KubernetesAuthentication::KubernetesAws {
                account_id: None,
                cluster_name: "eks".into(),
                assume_role: true,
                assumed_role_arn: Some("arn:aws:iam::1:role/deploy".into()),
                assumed_role_session: None,
                assume_role_session_duration_seconds: Some(3600),
                assume_role_external_id: None,
                use_instance_role: true,
            },
            KubernetesAuthentication::KubernetesAzure {
                account_id: "Accounts-2".into(),
                cluster_name: "aks".into(),
                cluster_resource_group: "rg".into(),
                admin_login: None,
            },
            KubernetesAuthentication::KubernetesCertificate {
                client_certificate: "Certificates-1".into(),
            },
            KubernetesAuthentication::KubernetesGoogleCloud {
                account_id: "Accounts-3".into(),
                cluster_name: "gke".into(),
                project: "shop".into(),
                region: None,
                zone: Some("europe-west1-b".into()),
                impersonate_service_account: false,
                service_account_emails: None,
                use_vm_service_account: false,
            },
            KubernetesAuthentication::KubernetesStandard {
                account_id: "Accounts-4".into(),
            },
            KubernetesAuthentication::KubernetesPodService {
                token_path: "/var/run/secrets/token".into(),
            },
            KubernetesAuthentication::Anonymous,
        ];
        let expected = [
            "aws_account_authentication",
            "azure_service_principal_authentication",
            "certificate_authentication",
            "gcp_account_authentication",
            "authentication",
            "pod_authentication",
            "authentication",
        ];

        for (auth, block) in variants.into_iter().zip(expected) {
            let endpoint = Endpoint::Kubernetes(KubernetesEndpoint {
                cluster_url: "https://example:443".into(),
                authentication: Some(auth.clone()),
                ..KubernetesEndpoint::default()
            });
            let mut common = test_support::common("k8s");
            let fields = KubernetesCluster::flatten(&mut common, endpoint, None).unwrap();
            assert_eq!(populated_blocks(&fields), vec![block], "{auth:?}");

            let Endpoint::Kubernetes(back) = KubernetesCluster::expand(&common, &fields).unwrap()
            else {
                panic!("expected a Kubernetes endpoint");
            };
            assert_eq!(back.authentication, Some(auth));
        }
    }

    #[test]
    fn unknown_authentication_type_is_unsupported() {
        let endpoint: Endpoint = serde_json::from_value(json!({
            "CommunicationStyle": "Kubernetes",
            "ClusterUrl": "https://aks:443",
            "Authentication": { "AuthenticationType": "KubernetesAzureOidc" }
        }))
        .unwrap();
        let mut common = test_support::common("k8s");

        let err = KubernetesCluster::flatten(&mut common, endpoint, None).unwrap_err();
        assert!(
            matches!(
                &err,
                CoreError::UnsupportedVariant { field, value }
                    if field == "authentication_type" && value == "KubernetesAzureOidc"
            ),
            "{err:?}"
        );
    }

    #[test]
    fn round_trip_with_container_and_pod_auth() {
        let model = cluster(KubernetesFields {
            running_in_container: true,
            container: Some(Container {
                feed_id: Some("Feeds-1".into()),
                image: Some("octopusdeploy/worker-tools:6".into()),
            }),
            pod_authentication: Some(PodAuthentication {
                token_path: "/var/run/secrets/token".into(),
            }),
            ..KubernetesFields::default()
        });
        let target = expand::<KubernetesCluster>(&model).unwrap();
        assert_eq!(flatten::<KubernetesCluster>(target, None).unwrap(), model);
    }

    #[test]
    fn schema_requires_exactly_one_authentication_block() {
        let base = json!({
            "name": "k8s",
            "environments": ["Environments-1"],
            "roles": ["k8s"],
            "cluster_url": "https://example:443"
        });
        let k8s = schema::<KubernetesCluster>();

        let none = k8s.validate(&base);
        assert!(none.has_errors());

        let mut two = base.clone();
        two["authentication"] = json!({});
        two["pod_authentication"] = json!({ "token_path": "/t" });
        assert!(k8s.validate(&two).has_errors());

        let mut one = base;
        one["certificate_authentication"] = json!({ "client_certificate": "Certificates-1" });
        let diags = k8s.validate(&one);
        assert!(!diags.has_errors(), "{diags}");
    }
}
