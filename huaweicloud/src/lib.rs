pub mod api;
pub mod composite_id;
pub mod config;
pub mod logging;
pub mod mutator;
pub mod mutexkv;
pub mod provider_data;
pub mod reconcile;
pub mod resources;

pub use provider_data::HuaweiCloudProviderData;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tfplug::context::Context;
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, Provider, ProviderMetadataRequest,
    ProviderMetadataResponse, ProviderSchemaRequest, ProviderSchemaResponse, ResourceFactory,
};
use tfplug::resource::ResourceWithConfigure;
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::Diagnostic;
use tracing::info;

use crate::api::Client;
use crate::config::ProviderConfig;

#[derive(Default)]
pub struct HuaweiCloudProvider {
    provider_data: Option<HuaweiCloudProviderData>,
    poll_interval: Option<Duration>,
}

impl HuaweiCloudProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fixed delay and poll interval for every resource wait
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    pub fn provider_data(&self) -> Option<&HuaweiCloudProviderData> {
        self.provider_data.as_ref()
    }
}

#[async_trait]
impl Provider for HuaweiCloudProvider {
    fn type_name(&self) -> &str {
        "huaweicloud"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse {
        ProviderMetadataResponse {
            type_name: self.type_name().to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ProviderSchemaRequest,
    ) -> ProviderSchemaResponse {
        let schema = SchemaBuilder::new()
            .description("HuaweiCloud provider")
            .attribute(
                AttributeBuilder::new("region", AttributeType::String)
                    .description("Region to manage resources in (HW_REGION_NAME)")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("project_id", AttributeType::String)
                    .description("Project scoping every API call (HW_PROJECT_ID)")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("access_key", AttributeType::String)
                    .description("Access key (HW_ACCESS_KEY)")
                    .optional()
                    .sensitive()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("secret_key", AttributeType::String)
                    .description("Secret key (HW_SECRET_KEY)")
                    .optional()
                    .sensitive()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("security_token", AttributeType::String)
                    .description("Security token for temporary credentials (HW_SECURITY_TOKEN)")
                    .optional()
                    .sensitive()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("token", AttributeType::String)
                    .description("IAM token used instead of AK/SK (HW_AUTH_TOKEN)")
                    .optional()
                    .sensitive()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("cloud", AttributeType::String)
                    .description("Endpoint domain suffix (HW_CLOUD)")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("insecure", AttributeType::Bool)
                    .description("Skip TLS certificate verification (HW_INSECURE)")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("max_retries", AttributeType::Number)
                    .description("Retries for throttled requests (HW_MAX_RETRIES)")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("enterprise_project_id", AttributeType::String)
                    .description("Default enterprise project (HW_ENTERPRISE_PROJECT_ID)")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "endpoints",
                    AttributeType::Map(Box::new(AttributeType::String)),
                )
                .description("Custom endpoints keyed by service name")
                .optional()
                .build(),
            )
            .build();

        ProviderSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        logging::init();

        let config = match ProviderConfig::from_dynamic(&request.config) {
            Ok(config) => config,
            Err(e) => {
                return ConfigureProviderResponse {
                    diagnostics: vec![Diagnostic::error(
                        "Invalid provider configuration",
                        e.to_string(),
                    )],
                    provider_data: None,
                }
            }
        };

        let client = match Client::new(config) {
            Ok(client) => client,
            Err(e) => {
                return ConfigureProviderResponse {
                    diagnostics: vec![Diagnostic::error(
                        "Failed to create API client",
                        e.to_string(),
                    )],
                    provider_data: None,
                }
            }
        };
        info!(
            "configured for region {} (terraform {})",
            client.config().region,
            request.terraform_version
        );

        let mut data = HuaweiCloudProviderData::new(client);
        if let Some(interval) = self.poll_interval {
            data = data.with_poll_interval(interval);
        }
        self.provider_data = Some(data.clone());

        ConfigureProviderResponse {
            diagnostics: vec![],
            provider_data: Some(Arc::new(data)),
        }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        let mut factories: HashMap<String, ResourceFactory> = HashMap::new();
        factories.insert(
            "huaweicloud_vpc".to_string(),
            || -> Box<dyn ResourceWithConfigure> { Box::new(resources::VpcResource::new()) },
        );
        factories.insert(
            "huaweicloud_vpc_subnet".to_string(),
            || -> Box<dyn ResourceWithConfigure> {
                Box::new(resources::VpcSubnetResource::new())
            },
        );
        factories.insert(
            "huaweicloud_compute_eip_associate".to_string(),
            || -> Box<dyn ResourceWithConfigure> {
                Box::new(resources::ComputeEipAssociateResource::new())
            },
        );
        factories
    }
}
