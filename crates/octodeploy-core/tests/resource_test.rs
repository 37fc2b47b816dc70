#![allow(clippy::unwrap_used)]
// CRUD shims driven through the provider registry against a mock server.

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use octodeploy_api::{OctopusClient, TransportConfig};
use octodeploy_core::{CoreError, OctopusProvider};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, OctopusClient) {
    let server = MockServer::start().await;
    let key: secrecy::SecretString = "API-TESTKEY".to_string().into();
    let client = OctopusClient::from_api_key(
        &server.uri(),
        &key,
        &TransportConfig::default(),
        Some("Spaces-1".into()),
    )
    .unwrap();
    (server, client)
}

fn not_found() -> ResponseTemplate {
    ResponseTemplate::new(404).set_body_json(json!({
        "ErrorMessage": "The resource you requested was not found."
    }))
}

fn assert_unsupported(err: &CoreError, expected_field: &str, expected_value: &str) {
    assert!(
        matches!(
            err,
            CoreError::UnsupportedVariant { field, value }
                if field == expected_field && value == expected_value
        ),
        "unexpected error {err:?}"
    );
}

// ── Environments ────────────────────────────────────────────────────

#[tokio::test]
async fn test_environment_create_sends_defaults() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/Spaces-1/environments"))
        .and(body_partial_json(json!({
            "Name": "Staging",
            "AllowDynamicInfrastructure": false,
            "UseGuidedFailure": false
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "Id": "Environments-3",
            "Name": "Staging",
            "Slug": "staging",
            "SortOrder": 2,
            "SpaceId": "Spaces-1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = OctopusProvider::new();
    let result = provider
        .resource("octopusdeploy_environment")
        .unwrap()
        .create(&client, json!({ "name": "Staging" }))
        .await
        .unwrap();

    assert_eq!(result.state["id"], "Environments-3");
    assert_eq!(result.state["slug"], "staging");
    assert_eq!(result.state["sort_order"], 2);
    assert!(result.diagnostics.is_empty());
}

#[tokio::test]
async fn test_read_of_deleted_environment_clears_state() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/Spaces-1/environments/Environments-9"))
        .respond_with(not_found())
        .mount(&server)
        .await;

    let state = OctopusProvider::new()
        .resource("octopusdeploy_environment")
        .unwrap()
        .read(&client, json!({ "id": "Environments-9", "name": "Gone" }))
        .await
        .unwrap();
    assert_eq!(state, None);
}

#[tokio::test]
async fn test_delete_of_missing_target_succeeds() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/api/Spaces-1/machines/Machines-9"))
        .respond_with(not_found())
        .expect(1)
        .mount(&server)
        .await;

    OctopusProvider::new()
        .resource("octopusdeploy_cloud_region_deployment_target")
        .unwrap()
        .delete(
            &client,
            json!({
                "id": "Machines-9",
                "name": "eu-west",
                "environments": ["Environments-1"],
                "roles": ["web"]
            }),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_invalid_config_never_reaches_server() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let err = OctopusProvider::new()
        .resource("octopusdeploy_environment")
        .unwrap()
        .create(
            &client,
            json!({ "name": "Prod", "jira_extension_settings": { "environment_type": "qa" } }),
        )
        .await
        .unwrap_err();

    match err {
        CoreError::Diagnostics(diags) => assert_eq!(
            diags.errors().next().and_then(|d| d.attribute.as_deref()),
            Some("jira_extension_settings.environment_type")
        ),
        other => panic!("expected diagnostics, got {other:?}"),
    }
}

// ── Deployment targets ──────────────────────────────────────────────

#[tokio::test]
async fn test_kubernetes_target_with_unknown_auth_is_unsupported() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/Spaces-1/machines/Machines-5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Id": "Machines-5",
            "Name": "aks",
            "EnvironmentIds": ["Environments-1"],
            "Roles": ["k8s"],
            "Endpoint": {
                "CommunicationStyle": "Kubernetes",
                "ClusterUrl": "https://aks:443",
                "Authentication": { "AuthenticationType": "KubernetesAzureOidc" }
            }
        })))
        .mount(&server)
        .await;

    let err = OctopusProvider::new()
        .resource("octopusdeploy_kubernetes_cluster_deployment_target")
        .unwrap()
        .read(
            &client,
            json!({
                "id": "Machines-5",
                "name": "aks",
                "environments": ["Environments-1"],
                "roles": ["k8s"],
                "cluster_url": "https://aks:443"
            }),
        )
        .await
        .unwrap_err();
    assert_unsupported(&err, "authentication_type", "KubernetesAzureOidc");
}

#[tokio::test]
async fn test_target_with_unknown_communication_style_is_unsupported() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/Spaces-1/machines/Machines-6"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Id": "Machines-6",
            "Name": "ecs",
            "EnvironmentIds": ["Environments-1"],
            "Roles": ["web"],
            "Endpoint": { "CommunicationStyle": "StepPackage", "DeploymentTargetTypeId": "aws-ecs-target" }
        })))
        .mount(&server)
        .await;

    let err = OctopusProvider::new()
        .resource("octopusdeploy_listening_tentacle_deployment_target")
        .unwrap()
        .read(
            &client,
            json!({
                "id": "Machines-6",
                "name": "ecs",
                "environments": ["Environments-1"],
                "roles": ["web"],
                "tentacle_url": "https://web-01:10933/"
            }),
        )
        .await
        .unwrap_err();
    assert_unsupported(&err, "communication_style", "StepPackage");
}

// ── Deployment process ──────────────────────────────────────────────

#[tokio::test]
async fn test_deployment_process_create_adopts_project_process() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/Spaces-1/projects/Projects-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Id": "Projects-1",
            "Name": "Shop",
            "DeploymentProcessId": "deploymentprocess-Projects-1"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/Spaces-1/deploymentprocesses/deploymentprocess-Projects-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Id": "deploymentprocess-Projects-1",
            "ProjectId": "Projects-1",
            "Version": 3,
            "Steps": []
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/Spaces-1/deploymentprocesses/deploymentprocess-Projects-1"))
        .and(body_partial_json(json!({ "Version": 3 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Id": "deploymentprocess-Projects-1",
            "ProjectId": "Projects-1",
            "Version": 4,
            "Steps": [{
                "Id": "Steps-1",
                "Name": "Hello",
                "Condition": "Success",
                "StartTrigger": "StartAfterPrevious",
                "PackageRequirement": "LetOctopusDecide",
                "Properties": {},
                "Actions": [{
                    "Id": "Actions-1",
                    "Name": "Hello",
                    "ActionType": "Octopus.Script",
                    "Properties": {
                        "Octopus.Action.RunOnServer": "true",
                        "Octopus.Action.Script.ScriptSource": "Inline",
                        "Octopus.Action.Script.ScriptBody": "echo hi",
                        "Octopus.Action.Script.Syntax": "Bash"
                    }
                }]
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = OctopusProvider::new()
        .resource("octopusdeploy_deployment_process")
        .unwrap()
        .create(
            &client,
            json!({
                "project_id": "Projects-1",
                "step": [{
                    "name": "Hello",
                    "run_script_action": [{
                        "name": "Hello",
                        "run_on_server": true,
                        "script_body": "echo hi",
                        "script_syntax": "Bash"
                    }]
                }]
            }),
        )
        .await
        .unwrap();

    let state = result.state;
    assert_eq!(state["id"], "deploymentprocess-Projects-1");
    assert_eq!(state["version"], 4);
    let action = &state["step"][0]["run_script_action"][0];
    assert_eq!(action["id"], "Actions-1");
    assert_eq!(action["run_on_server"], true);
    assert_eq!(action["script_body"], "echo hi");
    assert_eq!(action["sort_order"], 1);
}

#[tokio::test]
async fn test_deployment_process_delete_clears_steps() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/Spaces-1/deploymentprocesses/deploymentprocess-Projects-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Id": "deploymentprocess-Projects-1",
            "ProjectId": "Projects-1",
            "Version": 8,
            "Steps": [{ "Name": "Hello", "Actions": [] }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/Spaces-1/deploymentprocesses/deploymentprocess-Projects-1"))
        .and(body_partial_json(json!({ "Version": 8, "Steps": [] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Id": "deploymentprocess-Projects-1",
            "ProjectId": "Projects-1",
            "Version": 9,
            "Steps": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    OctopusProvider::new()
        .resource("octopusdeploy_deployment_process")
        .unwrap()
        .delete(
            &client,
            json!({ "id": "deploymentprocess-Projects-1", "project_id": "Projects-1" }),
        )
        .await
        .unwrap();
}

// ── Variables ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_variable_create_locates_server_copy() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/Spaces-1/variables/variableset-Projects-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Id": "variableset-Projects-1",
            "OwnerId": "Projects-1",
            "Version": 2,
            "Variables": []
        })))
        .expect(1)
        .mount(&server)
        .await;
    // The server assigns its own id; the variable is found by name, type and scope.
    Mock::given(method("PUT"))
        .and(path("/api/Spaces-1/variables/variableset-Projects-1"))
        .and(body_partial_json(json!({ "Version": 2 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Id": "variableset-Projects-1",
            "OwnerId": "Projects-1",
            "Version": 3,
            "Variables": [{
                "Id": "8d0d3e4c-server",
                "Name": "Shop.Url",
                "Value": "https://shop.example.com",
                "Type": "String",
                "IsSensitive": false,
                "Scope": { "Environment": ["Environments-1"] }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = OctopusProvider::new()
        .resource("octopusdeploy_variable")
        .unwrap()
        .create(
            &client,
            json!({
                "name": "Shop.Url",
                "project_id": "Projects-1",
                "type": "String",
                "value": "https://shop.example.com",
                "scope": { "environments": ["Environments-1"] }
            }),
        )
        .await
        .unwrap();

    assert_eq!(result.state["id"], "8d0d3e4c-server");
    assert_eq!(result.state["project_id"], "Projects-1");
    assert_eq!(result.state["scope"]["environments"], json!(["Environments-1"]));
}

#[tokio::test]
async fn test_variable_read_of_removed_variable_clears_state() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/Spaces-1/variables/variableset-LibraryVariableSets-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Id": "variableset-LibraryVariableSets-1",
            "OwnerId": "LibraryVariableSets-1",
            "Version": 5,
            "Variables": [{ "Id": "other", "Name": "Other", "Type": "String" }]
        })))
        .mount(&server)
        .await;

    let state = OctopusProvider::new()
        .resource("octopusdeploy_variable")
        .unwrap()
        .read(
            &client,
            json!({
                "id": "gone",
                "name": "Removed",
                "owner_id": "LibraryVariableSets-1",
                "type": "String"
            }),
        )
        .await
        .unwrap();
    assert_eq!(state, None);
}

#[tokio::test]
async fn test_variable_delete_writes_set_without_variable() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/Spaces-1/variables/variableset-Projects-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Id": "variableset-Projects-1",
            "OwnerId": "Projects-1",
            "Version": 6,
            "Variables": [
                { "Id": "keep", "Name": "Keep", "Type": "String" },
                { "Id": "drop", "Name": "Drop", "Type": "String" }
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/Spaces-1/variables/variableset-Projects-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Id": "variableset-Projects-1",
            "OwnerId": "Projects-1",
            "Version": 7,
            "Variables": [{ "Id": "keep", "Name": "Keep", "Type": "String" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    OctopusProvider::new()
        .resource("octopusdeploy_variable")
        .unwrap()
        .delete(
            &client,
            json!({ "id": "drop", "name": "Drop", "project_id": "Projects-1", "type": "String" }),
        )
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let put = requests
        .iter()
        .find(|r| r.method == wiremock::http::Method::PUT)
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&put.body).unwrap();
    let ids: Vec<_> = body["Variables"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["Id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["keep"]);
}

// ── Triggers ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_scheduled_trigger_read_is_unsupported() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/Spaces-1/projecttriggers/ProjectTriggers-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Id": "ProjectTriggers-2",
            "Name": "nightly",
            "ProjectId": "Projects-1",
            "Filter": { "FilterType": "OnceDailySchedule", "StartTime": "2024-01-01T02:00:00" },
            "Action": { "ActionType": "DeployLatestRelease" }
        })))
        .mount(&server)
        .await;

    let err = OctopusProvider::new()
        .resource("octopusdeploy_project_deployment_target_trigger")
        .unwrap()
        .read(
            &client,
            json!({ "id": "ProjectTriggers-2", "name": "nightly", "project_id": "Projects-1" }),
        )
        .await
        .unwrap_err();
    assert!(
        matches!(err, CoreError::UnsupportedVariant { ref field, .. } if field == "filter"),
        "unexpected error {err:?}"
    );
}

#[tokio::test]
async fn test_feed_trigger_read_is_unsupported() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/Spaces-1/projecttriggers/ProjectTriggers-3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Id": "ProjectTriggers-3",
            "Name": "on-package",
            "ProjectId": "Projects-1",
            "Filter": { "FilterType": "FeedFilter", "Packages": [] },
            "Action": { "ActionType": "CreateRelease", "ChannelId": "Channels-1" }
        })))
        .mount(&server)
        .await;

    let err = OctopusProvider::new()
        .resource("octopusdeploy_project_deployment_target_trigger")
        .unwrap()
        .read(
            &client,
            json!({ "id": "ProjectTriggers-3", "name": "on-package", "project_id": "Projects-1" }),
        )
        .await
        .unwrap_err();
    assert_unsupported(&err, "filter", "FeedFilter");
}

#[tokio::test]
async fn test_machine_trigger_with_unknown_action_is_unsupported() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/Spaces-1/projecttriggers/ProjectTriggers-4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Id": "ProjectTriggers-4",
            "Name": "runbook-on-new-machine",
            "ProjectId": "Projects-1",
            "Filter": {
                "FilterType": "MachineFilter",
                "EnvironmentIds": ["Environments-1"],
                "EventGroups": ["Machine"]
            },
            "Action": { "ActionType": "RunRunbook", "RunbookId": "Runbooks-1" }
        })))
        .mount(&server)
        .await;

    let err = OctopusProvider::new()
        .resource("octopusdeploy_project_deployment_target_trigger")
        .unwrap()
        .read(
            &client,
            json!({
                "id": "ProjectTriggers-4",
                "name": "runbook-on-new-machine",
                "project_id": "Projects-1"
            }),
        )
        .await
        .unwrap_err();
    assert_unsupported(&err, "action", "RunRunbook");
}

// ── Data sources ────────────────────────────────────────────────────

#[tokio::test]
async fn test_environments_lookup_filters_exact_name() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/Spaces-1/environments"))
        .and(query_param("name", "Prod"))
        .and(query_param("take", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ItemsPerPage": 10,
            "TotalResults": 2,
            "Items": [
                { "Id": "Environments-1", "Name": "Prod" },
                { "Id": "Environments-2", "Name": "Prod-DR" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let state = OctopusProvider::new()
        .data_source("octopusdeploy_environments")
        .unwrap()
        .read(&client, json!({ "name": "Prod", "take": 10 }))
        .await
        .unwrap();

    let found = state["environments"].as_array().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["id"], "Environments-1");
    assert!(state["id"].as_str().unwrap().starts_with("Environments "));
}

#[tokio::test]
async fn test_environments_lookup_ignores_name_case() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/Spaces-1/environments"))
        .and(query_param("name", "production"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ItemsPerPage": 10,
            "TotalResults": 2,
            "Items": [
                { "Id": "Environments-1", "Name": "Production" },
                { "Id": "Environments-2", "Name": "Production-EU" }
            ]
        })))
        .mount(&server)
        .await;

    let state = OctopusProvider::new()
        .data_source("octopusdeploy_environments")
        .unwrap()
        .read(&client, json!({ "name": "production", "take": 10 }))
        .await
        .unwrap();

    let found = state["environments"].as_array().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["name"], "Production");
}

#[tokio::test]
async fn test_deployment_targets_lookup_tolerates_unknown_auth() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/Spaces-1/machines"))
        .and(query_param("take", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ItemsPerPage": 10,
            "TotalResults": 2,
            "Items": [
                {
                    "Id": "Machines-1",
                    "Name": "WEB-01",
                    "EnvironmentIds": ["Environments-1"],
                    "Roles": ["web"],
                    "Endpoint": { "CommunicationStyle": "TentaclePassive", "Uri": "https://web-01:10933/" }
                },
                {
                    "Id": "Machines-5",
                    "Name": "aks",
                    "EnvironmentIds": ["Environments-1"],
                    "Roles": ["k8s"],
                    "Endpoint": {
                        "CommunicationStyle": "Kubernetes",
                        "ClusterUrl": "https://aks:443",
                        "Authentication": { "AuthenticationType": "KubernetesAzureOidc" }
                    }
                }
            ]
        })))
        .mount(&server)
        .await;

    let state = OctopusProvider::new()
        .data_source("octopusdeploy_deployment_targets")
        .unwrap()
        .read(&client, json!({ "take": 10 }))
        .await
        .unwrap();

    let found = state["deployment_targets"].as_array().unwrap();
    assert_eq!(found.len(), 2);
    assert_eq!(found[1]["communication_style"], "Kubernetes");
    assert_eq!(found[1]["endpoint_uri"], "https://aks:443");

    // Exact-name filtering folds case.
    let named = OctopusProvider::new()
        .data_source("octopusdeploy_deployment_targets")
        .unwrap()
        .read(&client, json!({ "name": "web-01", "take": 10 }))
        .await
        .unwrap();
    let named = named["deployment_targets"].as_array().unwrap();
    assert_eq!(named.len(), 1);
    assert_eq!(named[0]["id"], "Machines-1");
}

// ── Import ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_import_environment_reads_by_id() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/Spaces-1/environments/Environments-7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Id": "Environments-7",
            "Name": "UAT",
            "SortOrder": 3,
            "UseGuidedFailure": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let state = OctopusProvider::new()
        .resource("octopusdeploy_environment")
        .unwrap()
        .import(&client, "Environments-7")
        .await
        .unwrap();
    assert_eq!(state["id"], "Environments-7");
    assert_eq!(state["name"], "UAT");
    assert_eq!(state["use_guided_failure"], true);
}

#[tokio::test]
async fn test_import_kubernetes_target_fills_required_fields_from_server() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/Spaces-1/machines/Machines-8"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Id": "Machines-8",
            "Name": "eks",
            "EnvironmentIds": ["Environments-2"],
            "Roles": ["k8s"],
            "Endpoint": {
                "CommunicationStyle": "Kubernetes",
                "ClusterUrl": "https://eks:443",
                "Authentication": { "AuthenticationType": "KubernetesStandard", "AccountId": "Accounts-1" }
            }
        })))
        .mount(&server)
        .await;

    let state = OctopusProvider::new()
        .resource("octopusdeploy_kubernetes_cluster_deployment_target")
        .unwrap()
        .import(&client, "Machines-8")
        .await
        .unwrap();
    assert_eq!(state["name"], "eks");
    assert_eq!(state["cluster_url"], "https://eks:443");
    assert_eq!(state["environments"], json!(["Environments-2"]));
    assert_eq!(state["authentication"]["account_id"], "Accounts-1");
}

#[tokio::test]
async fn test_import_of_missing_object_is_not_found() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/Spaces-1/machinepolicies/MachinePolicies-9"))
        .respond_with(not_found())
        .mount(&server)
        .await;

    let err = OctopusProvider::new()
        .resource("octopusdeploy_machine_policy")
        .unwrap()
        .import(&client, "MachinePolicies-9")
        .await
        .unwrap_err();
    assert!(
        matches!(&err, CoreError::NotFound { identifier, .. } if identifier == "MachinePolicies-9"),
        "unexpected error {err:?}"
    );
}
