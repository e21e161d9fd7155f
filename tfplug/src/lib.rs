//! tfplug - Terraform plugin runtime types for Rust providers
//!
//! The value model, diagnostics, schemas and the provider/resource traits a
//! host drives. Wire framing is left to the host.

// Core modules
pub mod context;
pub mod error;
pub mod schema;
pub mod types;

// Provider API modules
pub mod provider;
pub mod resource;

// Helper modules
pub mod import;
pub mod timeouts;

// Re-exports for convenience
pub use context::Context;
pub use error::{Result, TfplugError};
pub use import::import_state_passthrough_id;
pub use provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, Provider, ProviderMetadataRequest,
    ProviderMetadataResponse, ResourceFactory,
};
pub use resource::{Resource, ResourceWithConfigure, ResourceWithImportState};
pub use schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
pub use timeouts::Timeouts;
pub use types::{Diagnostic, Dynamic, DynamicValue};
