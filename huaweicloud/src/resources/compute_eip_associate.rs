//! huaweicloud_compute_eip_associate
//!
//! Binds an elastic public IP to one network interface of an ECS
//! instance. The ID is `<public_ip>/<instance_id>/<fixed_ip>`; IDs written
//! before the fixed IP was tracked have only the first two parts.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tfplug::context::Context;
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceMetadataRequest, ResourceMetadataResponse,
    ResourceSchemaRequest, ResourceSchemaResponse, ResourceWithConfigure,
    ResourceWithImportState, UpdateResourceRequest, UpdateResourceResponse,
    ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::timeouts::{Operation, Timeouts};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tracing::{debug, info};

use super::common::{
    api_error, id_attribute, id_error, not_configured, optional_string, provider_data_from,
    reconcile_error, region_attribute, required_string, set_string, timeouts,
};
use crate::api::ecs::InterfaceAttachment;
use crate::api::vpc::PublicIp;
use crate::api::{ApiError, Client};
use crate::composite_id::IdFormat;
use crate::mutator::{check_deleted, ReadOutcome};
use crate::reconcile::{OperationDescriptor, Refresh, StatusProber, DELETED};
use crate::HuaweiCloudProviderData;

pub(crate) const ASSOCIATION_ID: IdFormat =
    IdFormat::with_optional(&["public_ip", "instance_id", "fixed_ip"], 2);

const BIND_DELAY: Duration = Duration::from_secs(2);
const BIND_POLL_INTERVAL: Duration = Duration::from_secs(3);

#[derive(Default)]
pub struct ComputeEipAssociateResource {
    provider_data: Option<HuaweiCloudProviderData>,
}

/// What the association looks like remotely
struct Association {
    public_ip: PublicIp,
    port: InterfaceAttachment,
    fixed_ip: String,
}

impl ComputeEipAssociateResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn data(&self) -> Result<&HuaweiCloudProviderData, Diagnostic> {
        self.provider_data.as_ref().ok_or_else(not_configured)
    }

    fn client(
        data: &HuaweiCloudProviderData,
        state: &DynamicValue,
    ) -> Result<Arc<Client>, Diagnostic> {
        data.client_for(optional_string(state, "region").as_deref())
            .map_err(|e| api_error("Error creating HuaweiCloud client", &e))
    }

    async fn associate(
        &self,
        ctx: &Context,
        request: &CreateResourceRequest,
        state: &mut DynamicValue,
    ) -> Result<(), Diagnostic> {
        let data = self.data()?;
        let client = Self::client(data, &request.config)?;
        let timeouts = timeouts(Timeouts::default(), &request.config)?;
        let public_ip = required_string(&request.config, "public_ip")?;
        let instance_id = required_string(&request.config, "instance_id")?;
        let wanted_fixed_ip = optional_string(&request.config, "fixed_ip");

        let _lock = data.locks.lock(&public_ip).await;

        let eip = client
            .vpc()
            .find_public_ip(&public_ip)
            .await
            .map_err(|e| api_error(format!("Error fetching EIP {}", public_ip), &e))?;
        let interfaces = client
            .ecs()
            .list_interfaces(&instance_id)
            .await
            .map_err(|e| {
                api_error(
                    format!("Error fetching network interfaces of instance {}", instance_id),
                    &e,
                )
            })?;

        let port = pick_port(&interfaces, wanted_fixed_ip.as_deref()).ok_or_else(|| {
            Diagnostic::error(
                "No matching network interface",
                match &wanted_fixed_ip {
                    Some(ip) => format!("instance {} has no port with address {}", instance_id, ip),
                    None => format!("instance {} has no network interface", instance_id),
                },
            )
        })?;
        let fixed_ip = wanted_fixed_ip
            .or_else(|| port.first_ipv4().map(str::to_string))
            .unwrap_or_default();

        info!(
            "binding EIP {} to port {} of instance {}",
            public_ip, port.port_id, instance_id
        );
        client
            .vpc()
            .set_public_ip_port(&eip.id, Some(&port.port_id))
            .await
            .map_err(|e| api_error(format!("Error binding EIP {}", public_ip), &e))?;

        let id = ASSOCIATION_ID
            .encode(&[public_ip.as_str(), instance_id.as_str(), fixed_ip.as_str()])
            .map_err(|e| id_error(&e))?;
        set_string(state, "id", id);
        set_string(state, "fixed_ip", fixed_ip);
        set_string(state, "port_id", &port.port_id);
        set_string(state, "region", &client.config().region);

        let descriptor = OperationDescriptor::new(&eip.id)
            .pending(["DOWN", "PENDING_UPDATE", "BINDING"])
            .target(["ACTIVE"])
            .error(["BIND_ERROR", "ERROR"]);
        let mut prober = public_ip_prober(client.clone(), &eip.id);
        data.reconciler(
            timeouts.effective(Operation::Create, ctx),
            BIND_DELAY,
            BIND_POLL_INTERVAL,
        )
        .wait(&descriptor, &mut prober)
        .await
        .map_err(|e| {
            reconcile_error(
                format!("Error waiting for EIP {} to be bound", public_ip),
                &e,
            )
        })?;
        Ok(())
    }

    /// `Gone` when the EIP or the instance no longer exists, or the EIP is
    /// bound somewhere else
    async fn lookup(
        client: &Client,
        public_ip: &str,
        instance_id: &str,
        fixed_ip: &str,
    ) -> Result<ReadOutcome<Association>, ApiError> {
        let eip = match check_deleted(public_ip, client.vpc().find_public_ip(public_ip).await)? {
            ReadOutcome::Found(eip) => eip,
            ReadOutcome::Gone => return Ok(ReadOutcome::Gone),
        };
        let Some(bound_port) = eip.port_id.clone() else {
            debug!("EIP {} is not bound", public_ip);
            return Ok(ReadOutcome::Gone);
        };

        let interfaces =
            match check_deleted(instance_id, client.ecs().list_interfaces(instance_id).await)? {
                ReadOutcome::Found(interfaces) => interfaces,
                ReadOutcome::Gone => return Ok(ReadOutcome::Gone),
            };

        let port = interfaces
            .into_iter()
            .find(|iface| iface.port_id == bound_port)
            .filter(|iface| fixed_ip.is_empty() || iface.has_address(fixed_ip));
        match port {
            Some(port) => {
                let fixed_ip = if fixed_ip.is_empty() {
                    eip.private_ip_address
                        .clone()
                        .or_else(|| port.first_ipv4().map(str::to_string))
                        .unwrap_or_default()
                } else {
                    fixed_ip.to_string()
                };
                Ok(ReadOutcome::Found(Association {
                    public_ip: eip,
                    port,
                    fixed_ip,
                }))
            }
            None => {
                debug!(
                    "EIP {} is bound to port {}, not to instance {}",
                    public_ip, bound_port, instance_id
                );
                Ok(ReadOutcome::Gone)
            }
        }
    }

    async fn disassociate(
        &self,
        ctx: &Context,
        request: &DeleteResourceRequest,
    ) -> Result<(), Diagnostic> {
        let data = self.data()?;
        let client = Self::client(data, &request.prior_state)?;
        let timeouts = timeouts(Timeouts::default(), &request.prior_state)?;
        let id = required_string(&request.prior_state, "id")?;
        let parts = ASSOCIATION_ID.decode(&id).map_err(|e| id_error(&e))?;
        let public_ip = &parts[0];

        let _lock = data.locks.lock(public_ip).await;

        // only unbind while the EIP still points at this instance
        let eip = match Self::lookup(&client, public_ip, &parts[1], &parts[2])
            .await
            .map_err(|e| api_error(format!("Error fetching EIP {}", public_ip), &e))?
        {
            ReadOutcome::Found(association) => association.public_ip,
            ReadOutcome::Gone => return Ok(()),
        };

        info!("unbinding EIP {}", public_ip);
        match client.vpc().set_public_ip_port(&eip.id, None).await {
            Ok(_) => {}
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(api_error(format!("Error unbinding EIP {}", public_ip), &e)),
        }

        let descriptor = OperationDescriptor::new(&eip.id)
            .pending(["ACTIVE", "PENDING_UPDATE", "BINDING"])
            .target(["DOWN", DELETED])
            .error(["ERROR"]);
        let mut prober = public_ip_prober(client.clone(), &eip.id);
        data.reconciler(
            timeouts.effective(Operation::Delete, ctx),
            BIND_DELAY,
            BIND_POLL_INTERVAL,
        )
        .wait(&descriptor, &mut prober)
        .await
        .map_err(|e| {
            reconcile_error(
                format!("Error waiting for EIP {} to be unbound", public_ip),
                &e,
            )
        })?;
        Ok(())
    }
}

/// The port holding `fixed_ip`, or the first port when none is asked for
fn pick_port(
    interfaces: &[InterfaceAttachment],
    fixed_ip: Option<&str>,
) -> Option<InterfaceAttachment> {
    match fixed_ip {
        Some(ip) => interfaces.iter().find(|iface| iface.has_address(ip)),
        None => interfaces.first(),
    }
    .cloned()
}

fn public_ip_prober(client: Arc<Client>, id: &str) -> impl Refresh<Object = PublicIp> {
    StatusProber::new(id, move |id: String| {
        let client = client.clone();
        async move {
            let eip = client.vpc().get_public_ip(&id).await?;
            let status = eip.status.clone();
            Ok::<_, ApiError>((eip, status))
        }
    })
}

#[async_trait]
impl Resource for ComputeEipAssociateResource {
    fn type_name(&self) -> &str {
        "huaweicloud_compute_eip_associate"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ResourceMetadataRequest,
    ) -> ResourceMetadataResponse {
        ResourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Associates an EIP with a network interface of an ECS instance")
            .attribute(id_attribute())
            .attribute(region_attribute())
            .attribute(
                AttributeBuilder::new("public_ip", AttributeType::String)
                    .description("The EIP address to bind")
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("instance_id", AttributeType::String)
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("fixed_ip", AttributeType::String)
                    .description("Private address of the port to bind; defaults to the first port")
                    .optional()
                    .computed()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("port_id", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(Timeouts::schema_attribute())
            .build();

        ResourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = vec![];
        if let Some(ip) = optional_string(&request.config, "public_ip") {
            if ip.parse::<std::net::IpAddr>().is_err() {
                diagnostics.push(
                    Diagnostic::error("Invalid public_ip", format!("{:?} is not an IP address", ip))
                        .with_attribute(AttributePath::new("public_ip")),
                );
            }
        }
        if let Err(diag) = timeouts(Timeouts::default(), &request.config) {
            diagnostics.push(diag);
        }
        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let mut new_state = request.planned_state.clone();
        let diagnostics = match self.associate(&ctx, &request, &mut new_state).await {
            Ok(()) => vec![],
            Err(diag) => vec![diag],
        };
        CreateResourceResponse {
            new_state,
            diagnostics,
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let lookup = async {
            let data = self.data()?;
            let client = Self::client(data, &request.current_state)?;
            let id = required_string(&request.current_state, "id")?;
            let parts = ASSOCIATION_ID.decode(&id).map_err(|e| id_error(&e))?;
            let outcome = Self::lookup(&client, &parts[0], &parts[1], &parts[2])
                .await
                .map_err(|e| api_error(format!("Error reading EIP association {}", id), &e))?;
            Ok::<_, Diagnostic>((parts, outcome, client.config().region.clone()))
        };

        match lookup.await {
            Ok((parts, ReadOutcome::Found(association), region)) => {
                let mut new_state = request.current_state.clone();
                set_string(&mut new_state, "public_ip", &association.public_ip.public_ip_address);
                set_string(&mut new_state, "instance_id", &parts[1]);
                set_string(&mut new_state, "fixed_ip", &association.fixed_ip);
                set_string(&mut new_state, "port_id", &association.port.port_id);
                set_string(&mut new_state, "region", region);
                ReadResourceResponse {
                    new_state: Some(new_state),
                    diagnostics: vec![],
                }
            }
            Ok((_, ReadOutcome::Gone, _)) => ReadResourceResponse {
                new_state: None,
                diagnostics: vec![],
            },
            Err(diag) => ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![diag],
            },
        }
    }

    /// Every argument forces replacement, so only `timeouts` can change
    async fn update(
        &self,
        _ctx: Context,
        request: UpdateResourceRequest,
    ) -> UpdateResourceResponse {
        UpdateResourceResponse {
            new_state: request.planned_state,
            diagnostics: vec![],
        }
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let diagnostics = match self.disassociate(&ctx, &request).await {
            Ok(()) => vec![],
            Err(diag) => vec![diag],
        };
        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for ComputeEipAssociateResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];
        match provider_data_from(request) {
            Ok(data) => self.provider_data = Some(data),
            Err(diag) => diagnostics.push(diag),
        }
        ConfigureResourceResponse { diagnostics }
    }

    fn as_import_state(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }
}

#[async_trait]
impl ResourceWithImportState for ComputeEipAssociateResource {
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let parts = match ASSOCIATION_ID.decode(&request.id) {
            Ok(parts) => parts,
            Err(e) => return ImportResourceStateResponse::failed(id_error(&e)),
        };

        let mut state = DynamicValue::object();
        set_string(&mut state, "id", &request.id);
        set_string(&mut state, "public_ip", &parts[0]);
        set_string(&mut state, "instance_id", &parts[1]);
        if !parts[2].is_empty() {
            set_string(&mut state, "fixed_ip", &parts[2]);
        }

        ImportResourceStateResponse::imported(request.type_name, state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::RetryConfig;
    use crate::config::{Credentials, ProviderConfig, Service};
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn configured(server_url: &str) -> ComputeEipAssociateResource {
        let config = ProviderConfig::new("cn-north-4", "p1", Credentials::Token("tok".into()))
            .with_endpoint(Service::Vpc, server_url)
            .with_endpoint(Service::Ecs, server_url);
        let client = Client::with_retry_config(
            config,
            RetryConfig {
                max_retries: 0,
                ..Default::default()
            },
        )
        .unwrap();
        ComputeEipAssociateResource {
            provider_data: Some(
                HuaweiCloudProviderData::new(client).with_poll_interval(Duration::from_millis(10)),
            ),
        }
    }

    fn eip_list(status: &str, port_id: Option<&str>) -> String {
        json!({
            "publicips": [{
                "id": "eip-1",
                "status": status,
                "public_ip_address": "10.0.0.5",
                "port_id": port_id,
                "private_ip_address": port_id.map(|_| "192.168.1.4")
            }]
        })
        .to_string()
    }

    fn eip_body(status: &str, port_id: Option<&str>) -> String {
        json!({
            "publicip": {
                "id": "eip-1",
                "status": status,
                "public_ip_address": "10.0.0.5",
                "port_id": port_id
            }
        })
        .to_string()
    }

    fn interfaces_body() -> String {
        json!({
            "interfaceAttachments": [
                {
                    "port_id": "port-a",
                    "net_id": "net-1",
                    "port_state": "ACTIVE",
                    "fixed_ips": [{ "ip_address": "192.168.1.3", "subnet_id": "s-1" }]
                },
                {
                    "port_id": "port-b",
                    "net_id": "net-1",
                    "port_state": "ACTIVE",
                    "fixed_ips": [{ "ip_address": "192.168.1.4", "subnet_id": "s-1" }]
                }
            ]
        })
        .to_string()
    }

    async fn mock_lookups(
        server: &mut mockito::ServerGuard,
        list_body: String,
    ) -> Vec<mockito::Mock> {
        vec![
            server
                .mock("GET", "/v1/p1/publicips")
                .match_query(Matcher::UrlEncoded(
                    "public_ip_address".into(),
                    "10.0.0.5".into(),
                ))
                .with_body(list_body)
                .create_async()
                .await,
            server
                .mock("GET", "/v2.1/p1/servers/inst-123/os-interface")
                .with_body(interfaces_body())
                .create_async()
                .await,
        ]
    }

    #[test]
    fn picks_port_by_fixed_ip() {
        let body: serde_json::Value = serde_json::from_str(&interfaces_body()).unwrap();
        let interfaces: Vec<InterfaceAttachment> =
            serde_json::from_value(body["interfaceAttachments"].clone()).unwrap();
        assert_eq!(
            pick_port(&interfaces, Some("192.168.1.4")).unwrap().port_id,
            "port-b"
        );
        assert_eq!(pick_port(&interfaces, None).unwrap().port_id, "port-a");
        assert!(pick_port(&interfaces, Some("192.168.9.9")).is_none());
    }

    #[tokio::test]
    async fn test_create_binds_requested_port() {
        let mut server = Server::new_async().await;
        let _lookups = mock_lookups(&mut server, eip_list("DOWN", None)).await;
        let bind = server
            .mock("PUT", "/v1/p1/publicips/eip-1")
            .match_body(Matcher::Json(json!({ "publicip": { "port_id": "port-b" } })))
            .with_body(eip_body("PENDING_UPDATE", Some("port-b")))
            .create_async()
            .await;
        let _status = server
            .mock("GET", "/v1/p1/publicips/eip-1")
            .with_body(eip_body("ACTIVE", Some("port-b")))
            .create_async()
            .await;

        let config = DynamicValue::from(json!({
            "public_ip": "10.0.0.5",
            "instance_id": "inst-123",
            "fixed_ip": "192.168.1.4"
        }));
        let response = configured(&server.url())
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "huaweicloud_compute_eip_associate".to_string(),
                    planned_state: config.clone(),
                    config,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        let state = response.new_state;
        assert_eq!(
            state.get_string(&AttributePath::new("id")).unwrap(),
            "10.0.0.5/inst-123/192.168.1.4"
        );
        assert_eq!(state.get_string(&AttributePath::new("port_id")).unwrap(), "port-b");
        bind.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_bind_error_is_terminal() {
        let mut server = Server::new_async().await;
        let _lookups = mock_lookups(&mut server, eip_list("DOWN", None)).await;
        let _bind = server
            .mock("PUT", "/v1/p1/publicips/eip-1")
            .with_body(eip_body("BINDING", Some("port-a")))
            .create_async()
            .await;
        let _status = server
            .mock("GET", "/v1/p1/publicips/eip-1")
            .with_body(eip_body("BIND_ERROR", Some("port-a")))
            .create_async()
            .await;

        let config = DynamicValue::from(json!({
            "public_ip": "10.0.0.5",
            "instance_id": "inst-123"
        }));
        let response = configured(&server.url())
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "huaweicloud_compute_eip_associate".to_string(),
                    planned_state: config.clone(),
                    config,
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0].detail.contains("BIND_ERROR"));
        // the binding request went out, so the association stays tracked
        assert_eq!(
            response.new_state.get_string(&AttributePath::new("id")).unwrap(),
            "10.0.0.5/inst-123/192.168.1.3"
        );
        assert_eq!(
            response.new_state.get_string(&AttributePath::new("port_id")).unwrap(),
            "port-a"
        );
    }

    #[tokio::test]
    async fn test_read_legacy_id() {
        let mut server = Server::new_async().await;
        let _lookups = mock_lookups(&mut server, eip_list("ACTIVE", Some("port-b"))).await;

        let response = configured(&server.url())
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: "huaweicloud_compute_eip_associate".to_string(),
                    current_state: DynamicValue::from(json!({ "id": "10.0.0.5/inst-123" })),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        let state = response.new_state.unwrap();
        assert_eq!(state.get_string(&AttributePath::new("fixed_ip")).unwrap(), "192.168.1.4");
        assert_eq!(state.get_string(&AttributePath::new("port_id")).unwrap(), "port-b");
    }

    #[tokio::test]
    async fn test_read_bound_elsewhere_is_gone() {
        let mut server = Server::new_async().await;
        let _lookups = mock_lookups(&mut server, eip_list("ACTIVE", Some("port-z"))).await;

        let response = configured(&server.url())
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: "huaweicloud_compute_eip_associate".to_string(),
                    current_state: DynamicValue::from(json!({
                        "id": "10.0.0.5/inst-123/192.168.1.4"
                    })),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        assert!(response.new_state.is_none());
    }

    #[tokio::test]
    async fn test_read_malformed_id() {
        let response = configured("http://127.0.0.1:1")
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: "huaweicloud_compute_eip_associate".to_string(),
                    current_state: DynamicValue::from(json!({ "id": "10.0.0.5" })),
                },
            )
            .await;

        assert!(response.new_state.is_some());
        assert_eq!(response.diagnostics[0].summary, "Invalid resource ID");
    }

    #[tokio::test]
    async fn test_delete_unbinds_and_waits_for_down() {
        let mut server = Server::new_async().await;
        let _lookups = mock_lookups(&mut server, eip_list("ACTIVE", Some("port-b"))).await;
        let unbind = server
            .mock("PUT", "/v1/p1/publicips/eip-1")
            .match_body(Matcher::Json(json!({ "publicip": { "port_id": null } })))
            .with_body(eip_body("PENDING_UPDATE", None))
            .create_async()
            .await;
        let _status = server
            .mock("GET", "/v1/p1/publicips/eip-1")
            .with_body(eip_body("DOWN", None))
            .create_async()
            .await;

        let response = configured(&server.url())
            .delete(
                Context::new(),
                DeleteResourceRequest {
                    type_name: "huaweicloud_compute_eip_associate".to_string(),
                    prior_state: DynamicValue::from(json!({
                        "id": "10.0.0.5/inst-123/192.168.1.4"
                    })),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        unbind.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_leaves_foreign_binding() {
        let mut server = Server::new_async().await;
        let _lookups = mock_lookups(&mut server, eip_list("ACTIVE", Some("port-z"))).await;
        let unbind = server
            .mock("PUT", "/v1/p1/publicips/eip-1")
            .expect(0)
            .create_async()
            .await;

        let response = configured(&server.url())
            .delete(
                Context::new(),
                DeleteResourceRequest {
                    type_name: "huaweicloud_compute_eip_associate".to_string(),
                    prior_state: DynamicValue::from(json!({
                        "id": "10.0.0.5/inst-123/192.168.1.4"
                    })),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        unbind.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_missing_eip_succeeds() {
        let mut server = Server::new_async().await;
        let _list = server
            .mock("GET", "/v1/p1/publicips")
            .match_query(Matcher::Any)
            .with_body(r#"{"publicips":[]}"#)
            .create_async()
            .await;

        let response = configured(&server.url())
            .delete(
                Context::new(),
                DeleteResourceRequest {
                    type_name: "huaweicloud_compute_eip_associate".to_string(),
                    prior_state: DynamicValue::from(json!({ "id": "10.0.0.5/inst-123" })),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn test_import_pads_legacy_id() {
        let response = ComputeEipAssociateResource::new()
            .import_state(
                Context::new(),
                ImportResourceStateRequest {
                    type_name: "huaweicloud_compute_eip_associate".to_string(),
                    id: "10.0.0.5/inst-123".to_string(),
                },
            )
            .await;

        let state = &response.imported_resources[0].state;
        assert_eq!(state.get_string(&AttributePath::new("public_ip")).unwrap(), "10.0.0.5");
        assert_eq!(state.get_string(&AttributePath::new("instance_id")).unwrap(), "inst-123");
        assert!(state.get_string(&AttributePath::new("fixed_ip")).is_err());
    }
}
