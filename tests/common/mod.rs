//! Fake Resource Manager for integration tests
//!
//! [`FakeDisks`] mounts a stateful `Microsoft.Compute/disks` endpoint on a
//! wiremock server: PUT stores the request body and starts an async
//! operation, GET echoes the stored disk back the way ARM would (id, name,
//! provisioning state, server-assigned size).

#![allow(dead_code)]

use azdisk::azure::{AzureClient, AzureCredentials, AzureHttpClient, PollOptions};
use azdisk::resource::DiskResourceHandler;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{bearer_token, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const SUBSCRIPTION: &str = "00000000-0000-0000-0000-000000000000";
pub const TOKEN: &str = "test-token";
pub const RESOURCE_GROUP: &str = "acctestRG";
pub const OPERATION_PATH: &str = "/providers/Microsoft.Compute/locations/westeurope/operations/op-1";

/// Size ARM assigns when the request leaves `diskSizeGB` unset
pub const SERVER_ASSIGNED_SIZE_GB: u64 = 128;

pub fn disk_id(name: &str) -> String {
    format!(
        "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Compute/disks/{}",
        SUBSCRIPTION, RESOURCE_GROUP, name
    )
}

pub fn not_found() -> ResponseTemplate {
    ResponseTemplate::new(404).set_body_json(json!({
        "error": {
            "code": "ResourceNotFound",
            "message": "The Resource 'Microsoft.Compute/disks/missing' under resource group 'acctestRG' was not found."
        }
    }))
}

pub fn operation_status(status: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "status": status }))
}

/// Short intervals so polling tests finish quickly
pub fn fast_poll() -> PollOptions {
    PollOptions {
        initial_interval: Duration::from_millis(5),
        max_interval: Duration::from_millis(20),
        multiplier: 2,
    }
}

pub fn client(server: &MockServer) -> AzureClient {
    AzureClient::new(
        AzureCredentials::from_static(TOKEN),
        AzureHttpClient::new().expect("http client"),
        SUBSCRIPTION,
        &server.uri(),
    )
    .expect("client")
}

pub fn handler(server: &MockServer) -> DiskResourceHandler {
    DiskResourceHandler::new(client(server)).with_poll_options(fast_poll())
}

/// Disk storage shared by the PUT and GET responders
#[derive(Clone, Default)]
pub struct FakeDisks {
    stored: Arc<Mutex<Option<Value>>>,
}

impl FakeDisks {
    /// Pretend `body` already exists remotely
    pub fn seeded(body: Value) -> Self {
        Self {
            stored: Arc::new(Mutex::new(Some(body))),
        }
    }

    /// Body of the last accepted PUT
    pub fn last_request(&self) -> Option<Value> {
        self.stored.lock().expect("lock").clone()
    }

    /// Mount PUT/GET for disk `name` plus a succeeding async operation
    pub async fn mount(&self, server: &MockServer, name: &str) {
        let disk_path = disk_id(name);

        Mock::given(method("PUT"))
            .and(path(disk_path.as_str()))
            .and(bearer_token(TOKEN))
            .respond_with(PutDisk {
                stored: self.stored.clone(),
            })
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path(disk_path.as_str()))
            .and(bearer_token(TOKEN))
            .respond_with(GetDisk {
                stored: self.stored.clone(),
                id: disk_path.clone(),
                name: name.to_string(),
            })
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path(OPERATION_PATH))
            .respond_with(operation_status("Succeeded"))
            .mount(server)
            .await;
    }
}

struct PutDisk {
    stored: Arc<Mutex<Option<Value>>>,
}

impl Respond for PutDisk {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let Ok(body) = serde_json::from_slice::<Value>(&request.body) else {
            return ResponseTemplate::new(400).set_body_json(json!({
                "error": {"code": "InvalidRequestContent", "message": "bad json"}
            }));
        };

        *self.stored.lock().expect("lock") = Some(body.clone());

        let mut accepted = body;
        accepted["properties"]["provisioningState"] = json!("Creating");
        ResponseTemplate::new(201)
            .insert_header("Azure-AsyncOperation", OPERATION_PATH)
            .set_body_json(accepted)
    }
}

struct GetDisk {
    stored: Arc<Mutex<Option<Value>>>,
    id: String,
    name: String,
}

impl Respond for GetDisk {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let Some(mut disk) = self.stored.lock().expect("lock").clone() else {
            return not_found();
        };

        disk["id"] = json!(self.id);
        disk["name"] = json!(self.name);
        disk["properties"]["provisioningState"] = json!("Succeeded");
        disk["properties"]["timeCreated"] = json!("2019-10-01T12:00:00.0000000+00:00");
        if disk["properties"].get("diskSizeGB").is_none() {
            disk["properties"]["diskSizeGB"] = json!(SERVER_ASSIGNED_SIZE_GB);
        }

        ResponseTemplate::new(200).set_body_json(disk)
    }
}
