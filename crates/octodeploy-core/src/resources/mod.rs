// ── Managed resources ──
//
// One module per Octopus object type. Each exposes `TYPE_NAME`, a
// `schema()`, `expand`/`flatten` between the configuration model and the
// API DTO, and a `Resource` implementation.

pub mod deployment_process;
pub mod deployment_target;
pub mod environment;
pub mod machine_policy;
pub mod project_trigger;
pub mod variable;

pub use deployment_process::DeploymentProcessResource;
pub use deployment_target::{
    AzureCloudServiceTarget, AzureServiceFabricClusterTarget, AzureWebAppTarget,
    CloudRegionTarget, DeploymentTargetResource, KubernetesClusterTarget, ListeningTentacleTarget,
    OfflinePackageDropTarget, PollingTentacleTarget, SshConnectionTarget,
};
pub use environment::EnvironmentResource;
pub use machine_policy::MachinePolicyResource;
pub use project_trigger::ProjectTriggerResource;
pub use variable::VariableResource;
