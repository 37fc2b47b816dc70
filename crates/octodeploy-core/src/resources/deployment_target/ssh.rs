use octodeploy_api::models::{Endpoint, SshEndpoint};
use serde::{Deserialize, Serialize};

use super::{TargetCommon, TargetVariant, style_mismatch};
use crate::error::CoreError;
use crate::schema::{Attribute, Block, Validator};

pub const DEFAULT_SSH_PORT: u16 = 22;

const DOT_NET_CORE_PLATFORMS: &[&str] = &["linux-x64", "linux-arm", "linux-arm64", "osx-x64"];

/// SSH connection target.
pub struct SshConnection;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshFields {
    pub account_id: String,
    pub host: String,
    pub fingerprint: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub dot_net_core_platform: Option<String>,
    #[serde(default)]
    pub proxy_id: Option<String>,
}

fn default_port() -> u16 {
    DEFAULT_SSH_PORT
}

impl TargetVariant for SshConnection {
    const TYPE_NAME: &'static str = "octopusdeploy_ssh_connection_deployment_target";
    const COMMUNICATION_STYLE: &'static str = "Ssh";
    const DESCRIPTION: &'static str =
        "Manages an SSH connection deployment target in Octopus Deploy.";

    type Fields = SshFields;

    fn describe(block: Block) -> Block {
        block
            .attr(
                "account_id",
                Attribute::string()
                    .required()
                    .description("The account used to authenticate the SSH connection."),
            )
            .attr(
                "host",
                Attribute::string()
                    .required()
                    .validate(Validator::NonEmpty)
                    .description("The hostname or IP address of the target."),
            )
            .attr(
                "fingerprint",
                Attribute::string()
                    .required()
                    .description("The host key fingerprint of the target."),
            )
            .attr(
                "port",
                Attribute::int()
                    .default(DEFAULT_SSH_PORT)
                    .validate(Validator::Range(1, 65535)),
            )
            .attr(
                "dot_net_core_platform",
                Attribute::string()
                    .one_of(DOT_NET_CORE_PLATFORMS)
                    .description("The self-contained Calamari platform; leave unset for Mono."),
            )
            .attr("proxy_id", Attribute::string())
    }

    fn expand(_common: &TargetCommon, fields: &SshFields) -> Result<Endpoint, CoreError> {
        Ok(Endpoint::Ssh(SshEndpoint {
            account_id: fields.account_id.clone(),
            host: fields.host.clone(),
            port: fields.port,
            fingerprint: fields.fingerprint.clone(),
            dot_net_core_platform: fields.dot_net_core_platform.clone(),
            proxy_id: fields.proxy_id.clone(),
        }))
    }

    fn flatten(
        _common: &mut TargetCommon,
        endpoint: Endpoint,
        _prior: Option<&SshFields>,
    ) -> Result<SshFields, CoreError> {
        match endpoint {
            Endpoint::Ssh(e) => Ok(SshFields {
                account_id: e.account_id,
                host: e.host,
                fingerprint: e.fingerprint,
                port: e.port,
                dot_net_core_platform: e.dot_net_core_platform,
                proxy_id: e.proxy_id,
            }),
            other => Err(style_mismatch(&other)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::resources::deployment_target::{TargetModel, expand, flatten, schema, test_support};

    #[test]
    fn port_defaults_to_22() {
        let mut config = json!({
            "name": "ssh-01",
            "environments": ["Environments-1"],
            "roles": ["linux"],
            "account_id": "Accounts-1",
            "host": "10.0.0.4",
            "fingerprint": "SHA256:abc"
        });
        let schema = schema::<SshConnection>();
        assert!(!schema.validate(&config).has_errors());
        schema.apply_defaults(&mut config);

        let model: TargetModel<SshFields> = serde_json::from_value(config).unwrap();
        assert_eq!(model.endpoint.port, 22);
        assert_eq!(model.common.name, "ssh-01");
    }

    #[test]
    fn ssh_round_trip() {
        let model = TargetModel {
            common: test_support::common("ssh-01"),
            endpoint: SshFields {
                account_id: "Accounts-1".into(),
                host: "build.internal".into(),
                fingerprint: "SHA256:abc".into(),
                port: 2222,
                dot_net_core_platform: Some("linux-x64".into()),
                proxy_id: None,
            },
        };
        let target = expand::<SshConnection>(&model).unwrap();
        assert_eq!(target.endpoint.communication_style(), "Ssh");
        assert_eq!(flatten::<SshConnection>(target, None).unwrap(), model);
    }

    #[test]
    fn port_out_of_range_is_rejected() {
        let diags = schema::<SshConnection>().validate(&json!({
            "name": "ssh-01",
            "environments": ["Environments-1"],
            "roles": ["linux"],
            "account_id": "Accounts-1",
            "host": "h",
            "fingerprint": "f",
            "port": 70000
        }));
        assert_eq!(
            diags.errors().next().and_then(|d| d.attribute.as_deref()),
            Some("port")
        );
    }
}
