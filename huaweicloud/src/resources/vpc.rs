//! huaweicloud_vpc

use async_trait::async_trait;
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::import::import_state_passthrough_id;
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
use tracing::info;

use super::common::{
    api_error, id_attribute, not_configured, optional_string, provider_data_from,
    reconcile_error, region_attribute, required_string, set_optional_string, set_string,
    timeouts, DEFAULT_DELAY, DEFAULT_POLL_INTERVAL,
};
use crate::api::vpc::{CreateVpcRequest, UpdateVpcRequest, Vpc};
use crate::api::{ApiError, Client};
use crate::mutator::{changed_attributes, check_deleted, delete_idempotent, DeleteOutcome};
use crate::reconcile::{OperationDescriptor, Refresh, StatusProber, DELETED};
use crate::HuaweiCloudProviderData;

const UPDATABLE: [&str; 3] = ["name", "cidr", "description"];

#[derive(Default)]
pub struct VpcResource {
    provider_data: Option<HuaweiCloudProviderData>,
}

impl VpcResource {
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

    async fn create_vpc(
        &self,
        ctx: &Context,
        request: &CreateResourceRequest,
        state: &mut DynamicValue,
    ) -> Result<(), Diagnostic> {
        let data = self.data()?;
        let client = Self::client(data, &request.config)?;
        let timeouts = timeouts(Timeouts::default(), &request.config)?;

        let create = CreateVpcRequest {
            name: required_string(&request.config, "name")?,
            cidr: required_string(&request.config, "cidr")?,
            description: optional_string(&request.config, "description"),
            enterprise_project_id: optional_string(&request.config, "enterprise_project_id")
                .or_else(|| data.config().enterprise_project_id.clone()),
        };

        let vpc = client
            .vpc()
            .create_vpc(&create)
            .await
            .map_err(|e| api_error("Error creating VPC", &e))?;
        info!("VPC {} created", vpc.id);
        set_string(state, "id", &vpc.id);

        let descriptor = OperationDescriptor::new(&vpc.id)
            .pending(["CREATING"])
            .target(["OK"])
            .error(["ERROR"]);
        let mut prober = vpc_prober(client.clone(), &vpc.id);
        let vpc = data
            .reconciler(
                timeouts.effective(Operation::Create, ctx),
                DEFAULT_DELAY,
                DEFAULT_POLL_INTERVAL,
            )
            .wait(&descriptor, &mut prober)
            .await
            .map_err(|e| {
                reconcile_error(
                    format!("Error waiting for VPC ({}) to become ready", vpc.id),
                    &e,
                )
            })?;

        if let Some(vpc) = vpc {
            apply(state, &vpc, &client.config().region);
        }
        Ok(())
    }

    async fn update_vpc(
        &self,
        ctx: &Context,
        request: &UpdateResourceRequest,
        state: &mut DynamicValue,
    ) -> Result<(), Diagnostic> {
        let data = self.data()?;
        let client = Self::client(data, &request.prior_state)?;
        let timeouts = timeouts(Timeouts::default(), &request.config)?;
        let id = required_string(&request.prior_state, "id")?;

        let planned = &request.planned_state;

        let changed = changed_attributes(&request.prior_state, planned, &UPDATABLE);
        if !changed.is_empty() {
            let mut update = UpdateVpcRequest::default();
            for name in &changed {
                match *name {
                    "name" => update.name = optional_string(planned, "name"),
                    "cidr" => update.cidr = optional_string(planned, "cidr"),
                    // an empty string clears the description
                    "description" => {
                        update.description =
                            Some(optional_string(planned, "description").unwrap_or_default())
                    }
                    _ => {}
                }
            }

            info!("updating VPC {}: {:?}", id, changed);
            client
                .vpc()
                .update_vpc(&id, &update)
                .await
                .map_err(|e| api_error(format!("Error updating VPC ({})", id), &e))?;
        }

        let descriptor = OperationDescriptor::new(&id)
            .pending(["CREATING"])
            .target(["OK"])
            .error(["ERROR"]);
        let mut prober = vpc_prober(client.clone(), &id);
        let vpc = data
            .reconciler(
                timeouts.effective(Operation::Update, ctx),
                DEFAULT_DELAY,
                DEFAULT_POLL_INTERVAL,
            )
            .wait(&descriptor, &mut prober)
            .await
            .map_err(|e| {
                reconcile_error(format!("Error waiting for VPC ({}) to update", id), &e)
            })?;

        if let Some(vpc) = vpc {
            apply(state, &vpc, &client.config().region);
        }
        Ok(())
    }

    async fn delete_vpc(
        &self,
        ctx: &Context,
        request: &DeleteResourceRequest,
    ) -> Result<(), Diagnostic> {
        let data = self.data()?;
        let client = Self::client(data, &request.prior_state)?;
        let timeouts = timeouts(Timeouts::default(), &request.prior_state)?;
        let id = required_string(&request.prior_state, "id")?;

        let vpc_api = client.vpc();
        let outcome = delete_idempotent(&id, || vpc_api.delete_vpc(&id))
            .await
            .map_err(|e| api_error(format!("Error deleting VPC ({})", id), &e))?;
        if outcome == DeleteOutcome::AlreadyAbsent {
            return Ok(());
        }

        let descriptor = OperationDescriptor::new(&id)
            .pending(["OK", "CREATING"])
            .target([DELETED]);
        let mut prober = vpc_prober(client.clone(), &id);
        data.reconciler(
            timeouts.effective(Operation::Delete, ctx),
            DEFAULT_DELAY,
            DEFAULT_POLL_INTERVAL,
        )
        .wait(&descriptor, &mut prober)
        .await
        .map_err(|e| reconcile_error(format!("Error deleting VPC ({})", id), &e))?;

        info!("VPC {} deleted", id);
        Ok(())
    }
}

/// Status prober over GET /vpcs/{id}
fn vpc_prober(client: Arc<Client>, id: &str) -> impl Refresh<Object = Vpc> {
    StatusProber::new(id, move |id: String| {
        let client = client.clone();
        async move {
            let vpc = client.vpc().get_vpc(&id).await?;
            let status = vpc.status.clone();
            Ok::<_, ApiError>((vpc, status))
        }
    })
}

/// Copies the remote VPC onto `state`
fn apply(state: &mut DynamicValue, vpc: &Vpc, region: &str) {
    set_string(state, "id", &vpc.id);
    set_string(state, "name", &vpc.name);
    set_string(state, "cidr", &vpc.cidr);
    set_optional_string(state, "description", Some(vpc.description.clone()));
    set_string(state, "status", &vpc.status);
    set_string(state, "region", region);
    if vpc.enterprise_project_id.is_some() {
        set_optional_string(
            state,
            "enterprise_project_id",
            vpc.enterprise_project_id.clone(),
        );
    }
}

#[async_trait]
impl Resource for VpcResource {
    fn type_name(&self) -> &str {
        "huaweicloud_vpc"
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
            .description("Manages a VPC")
            .attribute(id_attribute())
            .attribute(region_attribute())
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The name of the VPC")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("cidr", AttributeType::String)
                    .description("The IPv4 range of the VPC, e.g. 192.168.0.0/16")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("enterprise_project_id", AttributeType::String)
                    .description("Enterprise project; defaults to the provider's")
                    .optional()
                    .computed()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("status", AttributeType::String)
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

        if let Some(cidr) = optional_string(&request.config, "cidr") {
            if !looks_like_cidr(&cidr) {
                diagnostics.push(
                    Diagnostic::error(
                        "Invalid CIDR",
                        format!("{:?} is not an IPv4 CIDR block", cidr),
                    )
                    .with_attribute(AttributePath::new("cidr")),
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
        let diagnostics = match self.create_vpc(&ctx, &request, &mut new_state).await {
            Ok(()) => vec![],
            Err(diag) => vec![diag],
        };
        CreateResourceResponse {
            new_state,
            diagnostics,
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let data = match self.data() {
            Ok(data) => data,
            Err(diag) => {
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics: vec![diag],
                }
            }
        };

        let lookup = async {
            let client = Self::client(data, &request.current_state)?;
            let id = required_string(&request.current_state, "id")?;
            let result = client.vpc().get_vpc(&id).await;
            let outcome = check_deleted(&id, result)
                .map_err(|e| api_error(format!("Error retrieving VPC ({})", id), &e))?;
            Ok::<_, Diagnostic>((outcome, client.config().region.clone()))
        };

        match lookup.await {
            Ok((outcome, region)) => match outcome.found() {
                Some(vpc) => {
                    let mut new_state = request.current_state.clone();
                    apply(&mut new_state, &vpc, &region);
                    ReadResourceResponse {
                        new_state: Some(new_state),
                        diagnostics: vec![],
                    }
                }
                None => ReadResourceResponse {
                    new_state: None,
                    diagnostics: vec![],
                },
            },
            Err(diag) => ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![diag],
            },
        }
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let mut new_state = request.planned_state.clone();
        match self.update_vpc(&ctx, &request, &mut new_state).await {
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
        let diagnostics = match self.delete_vpc(&ctx, &request).await {
            Ok(()) => vec![],
            Err(diag) => vec![diag],
        };
        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for VpcResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        match provider_data_from(request) {
            Ok(data) => {
                self.provider_data = Some(data);
                ConfigureResourceResponse {
                    diagnostics: vec![],
                }
            }
            Err(diag) => ConfigureResourceResponse {
                diagnostics: vec![diag],
            },
        }
    }

    fn as_import_state(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }
}

#[async_trait]
impl ResourceWithImportState for VpcResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
        };
        import_state_passthrough_id(&ctx, AttributePath::new("id"), &request, &mut response);
        response
    }
}

fn looks_like_cidr(value: &str) -> bool {
    let Some((addr, prefix)) = value.split_once('/') else {
        return false;
    };
    let prefix_ok = prefix.parse::<u8>().map(|p| p <= 32).unwrap_or(false);
    prefix_ok && addr.parse::<std::net::Ipv4Addr>().is_ok()
}
