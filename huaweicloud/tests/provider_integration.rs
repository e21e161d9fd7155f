#![allow(clippy::disallowed_methods)]

use huaweicloud::HuaweiCloudProvider;
use mockito::{Matcher, Server};
use serde_json::json;
use std::time::Duration;
use tfplug::provider::{ConfigureProviderRequest, Provider};
use tfplug::resource::{
    ConfigureResourceRequest, CreateResourceRequest, DeleteResourceRequest,
    ImportResourceStateRequest, ReadResourceRequest, Resource, ResourceWithConfigure,
    ResourceWithImportState,
};
use tfplug::types::{AttributePath, DynamicValue};
use tfplug::Context;

async fn configured_resource(server_url: &str, type_name: &str) -> Box<dyn ResourceWithConfigure> {
    let mut provider = HuaweiCloudProvider::new().with_poll_interval(Duration::from_millis(10));
    let response = provider
        .configure(
            Context::new(),
            ConfigureProviderRequest {
                terraform_version: "1.9.0".to_string(),
                config: DynamicValue::from(json!({
                    "region": "cn-north-4",
                    "project_id": "p1",
                    "token": "tok",
                    "max_retries": 0,
                    "endpoints": { "vpc": server_url, "ecs": server_url },
                })),
            },
        )
        .await;
    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);

    let factory = provider.resources()[type_name];
    let mut resource = factory();
    let configured = resource
        .configure(
            Context::new(),
            ConfigureResourceRequest {
                provider_data: response.provider_data,
            },
        )
        .await;
    assert!(configured.diagnostics.is_empty());
    resource
}

fn vpc_body(status: &str) -> String {
    json!({
        "vpc": {
            "id": "vpc-1",
            "name": "vpc-a",
            "cidr": "192.168.0.0/16",
            "description": "",
            "status": status
        }
    })
    .to_string()
}

#[tokio::test]
async fn vpc_lifecycle_through_provider() {
    let mut server = Server::new_async().await;
    let resource = configured_resource(&server.url(), "huaweicloud_vpc").await;

    let create = server
        .mock("POST", "/v1/p1/vpcs")
        .match_header("x-auth-token", "tok")
        .match_body(Matcher::PartialJson(json!({ "vpc": { "name": "vpc-a" } })))
        .with_body(vpc_body("CREATING"))
        .create_async()
        .await;
    let creating = server
        .mock("GET", "/v1/p1/vpcs/vpc-1")
        .with_body(vpc_body("CREATING"))
        .expect(1)
        .create_async()
        .await;
    let _ok = server
        .mock("GET", "/v1/p1/vpcs/vpc-1")
        .with_body(vpc_body("OK"))
        .create_async()
        .await;

    let config = DynamicValue::from(json!({
        "name": "vpc-a",
        "cidr": "192.168.0.0/16",
        "description": null,
        "timeouts": null
    }));
    let created = resource
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: "huaweicloud_vpc".to_string(),
                planned_state: config.clone(),
                config,
            },
        )
        .await;
    assert!(created.diagnostics.is_empty(), "{:?}", created.diagnostics);
    assert_eq!(
        created.new_state.get_string(&AttributePath::new("status")).unwrap(),
        "OK"
    );
    create.assert_async().await;
    creating.assert_async().await;

    let read = resource
        .read(
            Context::new(),
            ReadResourceRequest {
                type_name: "huaweicloud_vpc".to_string(),
                current_state: created.new_state.clone(),
            },
        )
        .await;
    assert!(read.diagnostics.is_empty());
    assert!(read.new_state.is_some());

    let delete = server
        .mock("DELETE", "/v1/p1/vpcs/vpc-1")
        .with_status(204)
        .create_async()
        .await;
    let _gone = server
        .mock("GET", "/v1/p1/vpcs/vpc-1")
        .with_status(404)
        .create_async()
        .await;

    let deleted = resource
        .delete(
            Context::new(),
            DeleteResourceRequest {
                type_name: "huaweicloud_vpc".to_string(),
                prior_state: created.new_state.clone(),
            },
        )
        .await;
    assert!(deleted.diagnostics.is_empty(), "{:?}", deleted.diagnostics);
    delete.assert_async().await;

    let read = resource
        .read(
            Context::new(),
            ReadResourceRequest {
                type_name: "huaweicloud_vpc".to_string(),
                current_state: created.new_state,
            },
        )
        .await;
    assert!(read.diagnostics.is_empty());
    assert!(read.new_state.is_none());
}

#[tokio::test]
async fn eip_association_import_through_provider() {
    let server = Server::new_async().await;
    let resource = configured_resource(&server.url(), "huaweicloud_compute_eip_associate").await;
    let importer = resource.as_import_state().unwrap();

    let response = importer
        .import_state(
            Context::new(),
            ImportResourceStateRequest {
                type_name: "huaweicloud_compute_eip_associate".to_string(),
                id: "10.0.0.5/inst-123/192.168.1.4".to_string(),
            },
        )
        .await;
    assert!(response.diagnostics.is_empty());
    let state = &response.imported_resources[0].state;
    assert_eq!(
        state.get_string(&AttributePath::new("instance_id")).unwrap(),
        "inst-123"
    );
    assert_eq!(
        state.get_string(&AttributePath::new("fixed_ip")).unwrap(),
        "192.168.1.4"
    );

    let response = importer
        .import_state(
            Context::new(),
            ImportResourceStateRequest {
                type_name: "huaweicloud_compute_eip_associate".to_string(),
                id: "10.0.0.5".to_string(),
            },
        )
        .await;
    assert!(response.imported_resources.is_empty());
    assert!(response.diagnostics[0]
        .detail
        .contains("invalid format specified for ID (10.0.0.5)"));
}

#[tokio::test]
async fn unconfigured_factory_resource_reports_error() {
    let provider = HuaweiCloudProvider::new();
    let resource = provider.resources()["huaweicloud_vpc_subnet"]();
    let response = resource
        .delete(
            Context::new(),
            DeleteResourceRequest {
                type_name: "huaweicloud_vpc_subnet".to_string(),
                prior_state: DynamicValue::from(json!({ "id": "sub-1", "vpc_id": "vpc-1" })),
            },
        )
        .await;
    assert_eq!(response.diagnostics[0].summary, "Provider not configured");
}
