//! huaweicloud_vpc_subnet

use async_trait::async_trait;
use std::sync::Arc;
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
    api_error, id_attribute, id_error, not_configured, optional_bool, optional_string,
    provider_data_from, reconcile_error, region_attribute, required_string, set_bool,
    set_optional_string, set_string, timeouts, DEFAULT_DELAY, DEFAULT_POLL_INTERVAL,
};
use crate::api::vpc::{CreateSubnetRequest, Subnet, SubnetExtension, UpdateSubnetRequest};
use crate::api::{ApiError, Client};
use crate::composite_id::IdFormat;
use crate::mutator::{changed_attributes, check_deleted};
use crate::reconcile::{
    OperationDescriptor, PollResult, ProbeErrorPolicy, Refresh, StatusProber, DELETED,
};
use crate::HuaweiCloudProviderData;

const IMPORT_ID: IdFormat = IdFormat::new(&["vpc_id", "subnet_id"]);
const UPDATABLE: [&str; 5] = [
    "name",
    "description",
    "dhcp_enable",
    "primary_dns",
    "secondary_dns",
];

#[derive(Default)]
pub struct VpcSubnetResource {
    provider_data: Option<HuaweiCloudProviderData>,
}

impl VpcSubnetResource {
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

    fn active_descriptor(id: &str) -> OperationDescriptor {
        OperationDescriptor::new(id)
            .pending(["UNKNOWN"])
            .target(["ACTIVE"])
            .error(["ERROR", "DOWN"])
    }

    async fn create_subnet(
        &self,
        ctx: &Context,
        request: &CreateResourceRequest,
        state: &mut DynamicValue,
    ) -> Result<(), Diagnostic> {
        let data = self.data()?;
        let client = Self::client(data, &request.config)?;
        let timeouts = timeouts(Timeouts::default(), &request.config)?;
        let config = &request.config;

        let vpc_id = required_string(config, "vpc_id")?;
        let create = CreateSubnetRequest {
            name: required_string(config, "name")?,
            cidr: required_string(config, "cidr")?,
            gateway_ip: required_string(config, "gateway_ip")?,
            vpc_id: vpc_id.clone(),
            description: optional_string(config, "description"),
            dhcp_enable: optional_bool(config, "dhcp_enable").unwrap_or(true),
            primary_dns: optional_string(config, "primary_dns"),
            secondary_dns: optional_string(config, "secondary_dns"),
            availability_zone: optional_string(config, "availability_zone"),
            extension: optional_bool(config, "ipv6_enable")
                .filter(|enabled| *enabled)
                .map(|ipv6_enable| SubnetExtension::Ipv6 { ipv6_enable }),
        };

        let _lock = data.locks.lock(&vpc_id).await;

        let subnet = client
            .vpc()
            .create_subnet(&create)
            .await
            .map_err(|e| api_error("Error creating subnet", &e))?;
        info!("subnet {} created in VPC {}", subnet.id, vpc_id);
        set_string(state, "id", &subnet.id);

        let mut prober = subnet_prober(client.clone(), &subnet.id);
        let subnet = data
            .reconciler(
                timeouts.effective(Operation::Create, ctx),
                DEFAULT_DELAY,
                DEFAULT_POLL_INTERVAL,
            )
            .wait(&Self::active_descriptor(&subnet.id), &mut prober)
            .await
            .map_err(|e| {
                reconcile_error(
                    format!("Error waiting for subnet ({}) to become ACTIVE", subnet.id),
                    &e,
                )
            })?;

        if let Some(subnet) = subnet {
            apply(state, &subnet, &client.config().region);
        }
        Ok(())
    }

    async fn update_subnet(
        &self,
        ctx: &Context,
        request: &UpdateResourceRequest,
        state: &mut DynamicValue,
    ) -> Result<(), Diagnostic> {
        let data = self.data()?;
        let client = Self::client(data, &request.prior_state)?;
        let timeouts = timeouts(Timeouts::default(), &request.config)?;
        let id = required_string(&request.prior_state, "id")?;
        let vpc_id = required_string(&request.prior_state, "vpc_id")?;
        let planned = &request.planned_state;

        let changed = changed_attributes(&request.prior_state, planned, &UPDATABLE);
        if !changed.is_empty() {
            // the API wants the name on every update
            let mut update = UpdateSubnetRequest {
                name: required_string(planned, "name")?,
                ..Default::default()
            };
            for name in &changed {
                match *name {
                    "description" => {
                        update.description =
                            Some(optional_string(planned, "description").unwrap_or_default())
                    }
                    "dhcp_enable" => update.dhcp_enable = optional_bool(planned, "dhcp_enable"),
                    "primary_dns" => update.primary_dns = optional_string(planned, "primary_dns"),
                    "secondary_dns" => {
                        update.secondary_dns = optional_string(planned, "secondary_dns")
                    }
                    _ => {}
                }
            }

            info!("updating subnet {}: {:?}", id, changed);
            client
                .vpc()
                .update_subnet(&vpc_id, &id, &update)
                .await
                .map_err(|e| api_error(format!("Error updating subnet ({})", id), &e))?;
        }

        let mut prober = subnet_prober(client.clone(), &id);
        let subnet = data
            .reconciler(
                timeouts.effective(Operation::Update, ctx),
                DEFAULT_DELAY,
                DEFAULT_POLL_INTERVAL,
            )
            .wait(&Self::active_descriptor(&id), &mut prober)
            .await
            .map_err(|e| {
                reconcile_error(format!("Error waiting for subnet ({}) to update", id), &e)
            })?;

        if let Some(subnet) = subnet {
            apply(state, &subnet, &client.config().region);
        }
        Ok(())
    }

    async fn delete_subnet(
        &self,
        ctx: &Context,
        request: &DeleteResourceRequest,
    ) -> Result<(), Diagnostic> {
        let data = self.data()?;
        let client = Self::client(data, &request.prior_state)?;
        let timeouts = timeouts(Timeouts::default(), &request.prior_state)?;
        let id = required_string(&request.prior_state, "id")?;
        let vpc_id = required_string(&request.prior_state, "vpc_id")?;

        let _lock = data.locks.lock(&vpc_id).await;

        let descriptor = OperationDescriptor::new(&id)
            .pending(["ACTIVE"])
            .target([DELETED])
            .error(["ERROR"]);
        let mut deleter = SubnetDeleter {
            client: client.clone(),
            vpc_id,
            id: id.clone(),
        };
        data.reconciler(
            timeouts.effective(Operation::Delete, ctx),
            DEFAULT_DELAY,
            DEFAULT_POLL_INTERVAL,
        )
        .with_error_policy(ProbeErrorPolicy::RetryableOnly)
        .wait(&descriptor, &mut deleter)
        .await
        .map_err(|e| reconcile_error(format!("Error deleting subnet ({})", id), &e))?;

        info!("subnet {} deleted", id);
        Ok(())
    }
}

fn subnet_prober(client: Arc<Client>, id: &str) -> impl Refresh<Object = Subnet> {
    StatusProber::new(id, move |id: String| {
        let client = client.clone();
        async move {
            let subnet = client.vpc().get_subnet(&id).await?;
            let status = subnet.status.clone();
            Ok::<_, ApiError>((subnet, status))
        }
    })
}

/// Sends the DELETE on every refresh until the subnet read comes back 404.
/// The API answers 409 or 5xx while ports on the subnet are still being
/// released, so those keep the subnet ACTIVE.
struct SubnetDeleter {
    client: Arc<Client>,
    vpc_id: String,
    id: String,
}

#[async_trait]
impl Refresh for SubnetDeleter {
    type Object = Subnet;

    async fn refresh(&mut self) -> PollResult<Subnet> {
        let vpc = self.client.vpc();
        let subnet = match vpc.get_subnet(&self.id).await {
            Ok(subnet) => subnet,
            Err(e) if e.is_not_found() => return PollResult::deleted(),
            Err(e) if e.status() == Some(403) || e.is_retryable() => {
                debug!("reading subnet {} during delete: {}", self.id, e);
                return PollResult::status_only("ACTIVE");
            }
            Err(e) => return PollResult::failed(e),
        };

        match vpc.delete_subnet(&self.vpc_id, &self.id).await {
            Ok(()) => PollResult::observed(subnet, "ACTIVE"),
            Err(e) if e.is_not_found() || e.status() == Some(400) => PollResult::deleted(),
            Err(e) if e.is_retryable() => {
                debug!("subnet {} still releasing: {}", self.id, e);
                PollResult::observed(subnet, "ACTIVE")
            }
            Err(e) => PollResult::failed(e),
        }
    }
}

fn apply(state: &mut DynamicValue, subnet: &Subnet, region: &str) {
    set_string(state, "id", &subnet.id);
    set_string(state, "vpc_id", &subnet.vpc_id);
    set_string(state, "name", &subnet.name);
    set_string(state, "cidr", &subnet.cidr);
    set_string(state, "gateway_ip", &subnet.gateway_ip);
    set_optional_string(state, "description", Some(subnet.description.clone()));
    set_bool(state, "dhcp_enable", subnet.dhcp_enable);
    set_optional_string(state, "primary_dns", subnet.primary_dns.clone());
    set_optional_string(state, "secondary_dns", subnet.secondary_dns.clone());
    set_optional_string(state, "availability_zone", subnet.availability_zone.clone());
    set_bool(state, "ipv6_enable", subnet.ipv6_enable);
    set_optional_string(state, "cidr_v6", subnet.cidr_v6.clone());
    set_string(state, "status", &subnet.status);
    set_string(state, "region", region);
}

#[async_trait]
impl Resource for VpcSubnetResource {
    fn type_name(&self) -> &str {
        "huaweicloud_vpc_subnet"
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
        let string = |name: &str| AttributeBuilder::new(name, AttributeType::String);

        let schema = SchemaBuilder::new()
            .version(0)
            .description("Manages a subnet inside a VPC")
            .attribute(id_attribute())
            .attribute(region_attribute())
            .attribute(
                string("vpc_id")
                    .description("The VPC the subnet belongs to")
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(string("name").required().build())
            .attribute(
                string("cidr")
                    .description("Must lie within the VPC's CIDR block")
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(string("gateway_ip").required().force_new().build())
            .attribute(string("description").optional().build())
            .attribute(
                AttributeBuilder::new("dhcp_enable", AttributeType::Bool)
                    .description("Defaults to true")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(string("primary_dns").optional().computed().build())
            .attribute(string("secondary_dns").optional().computed().build())
            .attribute(
                string("availability_zone")
                    .optional()
                    .computed()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("ipv6_enable", AttributeType::Bool)
                    .optional()
                    .computed()
                    .force_new()
                    .build(),
            )
            .attribute(string("cidr_v6").computed().build())
            .attribute(string("status").computed().build())
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

        let has_primary = optional_string(&request.config, "primary_dns").is_some();
        let has_secondary = optional_string(&request.config, "secondary_dns").is_some();
        if has_secondary && !has_primary {
            diagnostics.push(
                Diagnostic::error(
                    "Invalid DNS configuration",
                    "secondary_dns requires primary_dns",
                )
                .with_attribute(AttributePath::new("secondary_dns")),
            );
        }
        if let Err(diag) = timeouts(Timeouts::default(), &request.config) {
            diagnostics.push(diag);
        }

        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let mut new_state = request.planned_state.clone();
        let diagnostics = match self.create_subnet(&ctx, &request, &mut new_state).await {
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
            let result = client.vpc().get_subnet(&id).await;
            let outcome = check_deleted(&id, result)
                .map_err(|e| api_error(format!("Error retrieving subnet ({})", id), &e))?;
            Ok::<_, Diagnostic>((outcome.found(), client.config().region.clone()))
        };

        match lookup.await {
            Ok((Some(subnet), region)) => {
                let mut new_state = request.current_state.clone();
                apply(&mut new_state, &subnet, &region);
                ReadResourceResponse {
                    new_state: Some(new_state),
                    diagnostics: vec![],
                }
            }
            Ok((None, _)) => ReadResourceResponse {
                new_state: None,
                diagnostics: vec![],
            },
            Err(diag) => ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![diag],
            },
        }
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let mut new_state = request.planned_state.clone();
        match self.update_subnet(&ctx, &request, &mut new_state).await {
            Ok(()) => UpdateResourceResponse {
                new_state,
                diagnostics: vec![],
            },
            Err(diag) => UpdateResourceResponse {
                new_state: request.prior_state,
                diagnostics: vec![diag],
            },
        }
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let diagnostics = match self.delete_subnet(&ctx, &request).await {
            Ok(()) => vec![],
            Err(diag) => vec![diag],
        };
        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for VpcSubnetResource {
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
impl ResourceWithImportState for VpcSubnetResource {
    /// Accepts `<vpc_id>/<subnet_id>` or a bare subnet ID; read fills in
    /// the rest
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut state = DynamicValue::object();

        if request.id.contains('/') {
            match IMPORT_ID.decode(&request.id) {
                Ok(parts) => {
                    set_string(&mut state, "vpc_id", &parts[0]);
                    set_string(&mut state, "id", &parts[1]);
                }
                Err(e) => return ImportResourceStateResponse::failed(id_error(&e)),
            }
        } else {
            set_string(&mut state, "id", &request.id);
        }

        ImportResourceStateResponse::imported(request.type_name, state)
    }
}
