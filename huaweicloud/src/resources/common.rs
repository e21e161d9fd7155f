//! Helpers shared by every resource

use std::time::Duration;
use tfplug::resource::ConfigureResourceRequest;
use tfplug::schema::{Attribute, AttributeBuilder, AttributeType};
use tfplug::timeouts::Timeouts;
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};

use crate::api::ApiError;
use crate::composite_id::CompositeIdError;
use crate::reconcile::ReconcileError;
use crate::HuaweiCloudProviderData;

pub(crate) const DEFAULT_DELAY: Duration = Duration::from_secs(5);
pub(crate) const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Downcasts the provider data handed to `configure`
pub(crate) fn provider_data_from(
    request: ConfigureResourceRequest,
) -> Result<HuaweiCloudProviderData, Diagnostic> {
    let data = request.provider_data.ok_or_else(|| {
        Diagnostic::error(
            "No provider data",
            "No provider data was provided to the resource",
        )
    })?;

    data.downcast_ref::<HuaweiCloudProviderData>()
        .cloned()
        .ok_or_else(|| {
            Diagnostic::error(
                "Invalid provider data",
                "Failed to extract HuaweiCloudProviderData from provider data",
            )
        })
}

pub(crate) fn not_configured() -> Diagnostic {
    Diagnostic::error(
        "Provider not configured",
        "Provider data was not properly configured",
    )
}

pub(crate) fn api_error(summary: impl Into<String>, error: &ApiError) -> Diagnostic {
    let detail = match error.error_code() {
        Some(code) if !code.is_empty() => format!("{} (error code {})", error, code),
        _ => error.to_string(),
    };
    Diagnostic::error(summary, detail)
}

pub(crate) fn reconcile_error(summary: impl Into<String>, error: &ReconcileError) -> Diagnostic {
    Diagnostic::error(summary, error.detail())
}

pub(crate) fn id_error(error: &CompositeIdError) -> Diagnostic {
    Diagnostic::error("Invalid resource ID", error.to_string())
        .with_attribute(AttributePath::new("id"))
}

/// Resource defaults overlaid with the `timeouts` block of `value`
pub(crate) fn timeouts(defaults: Timeouts, value: &DynamicValue) -> Result<Timeouts, Diagnostic> {
    defaults.merge_from(value).map_err(|e| {
        Diagnostic::error("Invalid timeouts", e.to_string())
            .with_attribute(AttributePath::new("timeouts"))
    })
}

pub(crate) fn required_string(value: &DynamicValue, name: &str) -> Result<String, Diagnostic> {
    value.get_non_empty_string(&AttributePath::new(name)).ok_or_else(|| {
        Diagnostic::error(
            format!("Missing {}", name),
            format!("The '{}' attribute is required", name),
        )
        .with_attribute(AttributePath::new(name))
    })
}

pub(crate) fn optional_string(value: &DynamicValue, name: &str) -> Option<String> {
    value.get_non_empty_string(&AttributePath::new(name))
}

pub(crate) fn optional_bool(value: &DynamicValue, name: &str) -> Option<bool> {
    value.get_bool(&AttributePath::new(name)).ok()
}

pub(crate) fn set_string(state: &mut DynamicValue, name: &str, value: impl Into<String>) {
    let _ = state.set_string(&AttributePath::new(name), value.into());
}

/// Sets the attribute, or nulls it when the API returned nothing
pub(crate) fn set_optional_string(state: &mut DynamicValue, name: &str, value: Option<String>) {
    let path = AttributePath::new(name);
    let _ = match value.filter(|v| !v.is_empty()) {
        Some(v) => state.set_string(&path, v),
        None => state.set_null(&path),
    };
}

pub(crate) fn set_bool(state: &mut DynamicValue, name: &str, value: bool) {
    let _ = state.set_bool(&AttributePath::new(name), value);
}

pub(crate) fn id_attribute() -> Attribute {
    AttributeBuilder::new("id", AttributeType::String)
        .description("Resource identifier")
        .computed()
        .build()
}

pub(crate) fn region_attribute() -> Attribute {
    AttributeBuilder::new("region", AttributeType::String)
        .description("Region of the resource; defaults to the provider region")
        .optional()
        .computed()
        .force_new()
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_optional_string_nulls_empty_values() {
        let mut state = DynamicValue::object();
        set_optional_string(&mut state, "description", Some(String::new()));
        assert!(state
            .get(&AttributePath::new("description"))
            .map(|v| matches!(v, tfplug::Dynamic::Null))
            .unwrap_or(false));

        set_optional_string(&mut state, "description", Some("web".to_string()));
        assert_eq!(optional_string(&state, "description").as_deref(), Some("web"));
    }

    #[test]
    fn invalid_timeouts_point_at_attribute() {
        let config = DynamicValue::from(json!({ "timeouts": { "create": "soon" } }));
        let diag = timeouts(Timeouts::default(), &config).unwrap_err();
        assert!(diag.is_error());
    }

    #[test]
    fn api_error_detail_includes_code() {
        let error = ApiError::ApiError {
            status: 400,
            message: "bad cidr".to_string(),
            details: Some(Box::new(crate::api::common::ApiErrorDetails {
                code: "VPC.0002".to_string(),
                message: "bad cidr".to_string(),
            })),
        };
        let diag = api_error("Error creating VPC", &error);
        assert!(diag.detail.contains("VPC.0002"));
    }
}
