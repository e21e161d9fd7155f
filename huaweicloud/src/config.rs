//! Provider configuration
//!
//! Every attribute can also come from the environment, the way the
//! HuaweiCloud CLI tools read it. Values in the provider block win.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tfplug::types::{AttributePath, Dynamic, DynamicValue};
use thiserror::Error;

pub const DEFAULT_CLOUD: &str = "myhuaweicloud.com";
pub const DEFAULT_EUROPE_CLOUD: &str = "myhuaweicloud.eu";
const EUROPE_REGION_PREFIX: &str = "eu-west-1";
pub const DEFAULT_MAX_RETRIES: u32 = 5;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("region should be provided (set in provider config or HW_REGION_NAME env var)")]
    MissingRegion,

    #[error("project_id should be provided (set in provider config or HW_PROJECT_ID env var)")]
    MissingProject,

    #[error("no credentials: set access_key/secret_key (HW_ACCESS_KEY/HW_SECRET_KEY) or token (HW_AUTH_TOKEN)")]
    MissingCredentials,

    #[error("access_key and secret_key must be set together")]
    IncompleteAkSk,

    #[error("max_retries should be a positive value, got {0}")]
    InvalidMaxRetries(String),

    #[error("unsupported service in endpoints: {0}")]
    UnknownService(String),

    #[error("the value of customer endpoint {0} must be specified")]
    EmptyEndpoint(String),
}

/// Services the provider talks to, used as keys of the `endpoints` map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    Vpc,
    Ecs,
}

impl Service {
    pub fn name(self) -> &'static str {
        match self {
            Service::Vpc => "vpc",
            Service::Ecs => "ecs",
        }
    }

    /// Path segment between the endpoint root and the project ID
    pub fn version(self) -> &'static str {
        match self {
            Service::Vpc => "v1",
            Service::Ecs => "v2.1",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Service {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vpc" => Ok(Service::Vpc),
            "ecs" => Ok(Service::Ecs),
            other => Err(ConfigError::UnknownService(other.to_string())),
        }
    }
}

#[derive(Clone, PartialEq)]
pub enum Credentials {
    Token(String),
    AkSk {
        access_key: String,
        secret_key: String,
        security_token: Option<String>,
    },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Token(_) => f.write_str("Token(***)"),
            Credentials::AkSk {
                access_key,
                security_token,
                ..
            } => f
                .debug_struct("AkSk")
                .field("access_key", access_key)
                .field("temporary", &security_token.is_some())
                .finish(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub region: String,
    pub project_id: String,
    pub credentials: Credentials,
    pub cloud: String,
    pub insecure: bool,
    pub max_retries: u32,
    pub enterprise_project_id: Option<String>,
    endpoints: HashMap<Service, String>,
}

impl ProviderConfig {
    pub fn new(
        region: impl Into<String>,
        project_id: impl Into<String>,
        credentials: Credentials,
    ) -> Self {
        let region = region.into();
        Self {
            cloud: cloud_domain(None, &region),
            region,
            project_id: project_id.into(),
            credentials,
            insecure: false,
            max_retries: DEFAULT_MAX_RETRIES,
            enterprise_project_id: None,
            endpoints: HashMap::new(),
        }
    }

    pub fn with_endpoint(mut self, service: Service, endpoint: &str) -> Self {
        self.endpoints.insert(service, normalize_endpoint(endpoint));
        self
    }

    /// Builds the configuration from the provider block, falling back to
    /// environment variables for anything left unset
    pub fn from_dynamic(config: &DynamicValue) -> Result<Self, ConfigError> {
        let region = string_attr(config, "region", &["HW_REGION_NAME", "OS_REGION_NAME"])
            .ok_or(ConfigError::MissingRegion)?;
        let project_id = string_attr(config, "project_id", &["HW_PROJECT_ID", "OS_PROJECT_ID"])
            .ok_or(ConfigError::MissingProject)?;

        let access_key = string_attr(config, "access_key", &["HW_ACCESS_KEY"]);
        let secret_key = string_attr(config, "secret_key", &["HW_SECRET_KEY"]);
        let security_token = string_attr(config, "security_token", &["HW_SECURITY_TOKEN"]);
        let token = string_attr(config, "token", &["HW_AUTH_TOKEN"]);

        let credentials = match (access_key, secret_key, token) {
            (Some(access_key), Some(secret_key), _) => Credentials::AkSk {
                access_key,
                secret_key,
                security_token,
            },
            (Some(_), None, _) | (None, Some(_), _) => return Err(ConfigError::IncompleteAkSk),
            (None, None, Some(token)) => Credentials::Token(token),
            (None, None, None) => return Err(ConfigError::MissingCredentials),
        };

        let cloud = cloud_domain(string_attr(config, "cloud", &["HW_CLOUD"]), &region);

        let insecure = config
            .get_bool(&AttributePath::new("insecure"))
            .ok()
            .or_else(|| {
                std::env::var("HW_INSECURE")
                    .ok()
                    .and_then(|v| v.parse::<bool>().ok())
            })
            .unwrap_or(false);

        let max_retries = match config.get_number(&AttributePath::new("max_retries")) {
            Ok(n) if n < 0.0 || n.fract() != 0.0 => {
                return Err(ConfigError::InvalidMaxRetries(n.to_string()))
            }
            Ok(n) => n as u32,
            Err(_) => match std::env::var("HW_MAX_RETRIES") {
                Ok(raw) => raw
                    .trim()
                    .parse::<u32>()
                    .map_err(|_| ConfigError::InvalidMaxRetries(raw))?,
                Err(_) => DEFAULT_MAX_RETRIES,
            },
        };

        let enterprise_project_id =
            string_attr(config, "enterprise_project_id", &["HW_ENTERPRISE_PROJECT_ID"]);

        let mut endpoints = HashMap::new();
        if let Ok(map) = config.get_map(&AttributePath::new("endpoints")) {
            for (key, value) in map {
                let service = key.parse::<Service>()?;
                let raw = match value {
                    Dynamic::String(s) if !s.trim().is_empty() => s,
                    _ => return Err(ConfigError::EmptyEndpoint(key)),
                };
                endpoints.insert(service, normalize_endpoint(&raw));
            }
        }
        tracing::debug!("custom endpoints: {:?}", endpoints);

        Ok(Self {
            region,
            project_id,
            credentials,
            cloud,
            insecure,
            max_retries,
            enterprise_project_id,
            endpoints,
        })
    }

    /// Root of a service endpoint, always ending in '/'
    pub fn endpoint_root(&self, service: Service) -> String {
        self.endpoints.get(&service).cloned().unwrap_or_else(|| {
            format!("https://{}.{}.{}/", service.name(), self.region, self.cloud)
        })
    }

    /// Base URL for project-scoped calls, e.g.
    /// `https://vpc.cn-north-4.myhuaweicloud.com/v1/{project_id}`
    pub fn service_url(&self, service: Service) -> String {
        format!(
            "{}{}/{}",
            self.endpoint_root(service),
            service.version(),
            self.project_id
        )
    }
}

fn string_attr(config: &DynamicValue, name: &str, env: &[&str]) -> Option<String> {
    config
        .get_non_empty_string(&AttributePath::new(name))
        .or_else(|| {
            env.iter()
                .find_map(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))
        })
}

fn cloud_domain(cloud: Option<String>, region: &str) -> String {
    match cloud {
        Some(cloud) => cloud,
        None if region.starts_with(EUROPE_REGION_PREFIX) => DEFAULT_EUROPE_CLOUD.to_string(),
        None => DEFAULT_CLOUD.to_string(),
    }
}

fn normalize_endpoint(raw: &str) -> String {
    let mut endpoint = raw.trim().to_string();
    if !endpoint.starts_with("http") {
        endpoint = format!("https://{}", endpoint);
    }
    if !endpoint.ends_with('/') {
        endpoint.push('/');
    }
    endpoint
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use serial_test::serial;

    const ENV_KEYS: &[&str] = &[
        "HW_REGION_NAME",
        "OS_REGION_NAME",
        "HW_PROJECT_ID",
        "OS_PROJECT_ID",
        "HW_ACCESS_KEY",
        "HW_SECRET_KEY",
        "HW_SECURITY_TOKEN",
        "HW_AUTH_TOKEN",
        "HW_CLOUD",
        "HW_INSECURE",
        "HW_MAX_RETRIES",
        "HW_ENTERPRISE_PROJECT_ID",
    ];

    fn clear_env() {
        for key in ENV_KEYS {
            std::env::remove_var(key);
        }
    }

    fn block(value: serde_json::Value) -> DynamicValue {
        DynamicValue::from(value)
    }

    #[test]
    #[serial]
    fn reads_block_values() {
        clear_env();
        let config = ProviderConfig::from_dynamic(&block(serde_json::json!({
            "region": "cn-north-4",
            "project_id": "p1",
            "access_key": "AK",
            "secret_key": "SK",
            "max_retries": 2,
            "insecure": true,
        })))
        .unwrap();

        assert_eq!(config.region, "cn-north-4");
        assert_eq!(config.cloud, DEFAULT_CLOUD);
        assert_eq!(config.max_retries, 2);
        assert!(config.insecure);
        assert_eq!(
            config.credentials,
            Credentials::AkSk {
                access_key: "AK".to_string(),
                secret_key: "SK".to_string(),
                security_token: None
            }
        );
        assert_eq!(
            config.service_url(Service::Vpc),
            "https://vpc.cn-north-4.myhuaweicloud.com/v1/p1"
        );
        assert_eq!(
            config.service_url(Service::Ecs),
            "https://ecs.cn-north-4.myhuaweicloud.com/v2.1/p1"
        );
    }

    #[test]
    #[serial]
    fn falls_back_to_environment() {
        clear_env();
        std::env::set_var("HW_REGION_NAME", "eu-west-101");
        std::env::set_var("HW_PROJECT_ID", "p2");
        std::env::set_var("HW_AUTH_TOKEN", "tok");
        std::env::set_var("HW_MAX_RETRIES", "7");

        let config = ProviderConfig::from_dynamic(&DynamicValue::object()).unwrap();
        assert_eq!(config.cloud, DEFAULT_EUROPE_CLOUD);
        assert_eq!(config.credentials, Credentials::Token("tok".to_string()));
        assert_eq!(config.max_retries, 7);
        assert_eq!(config.enterprise_project_id, None);

        clear_env();
    }

    #[test]
    #[serial]
    fn block_wins_over_environment() {
        clear_env();
        std::env::set_var("HW_REGION_NAME", "cn-south-1");

        let config = ProviderConfig::from_dynamic(&block(serde_json::json!({
            "region": "cn-north-4",
            "project_id": "p1",
            "token": "tok",
            "cloud": "example.com",
        })))
        .unwrap();
        assert_eq!(config.region, "cn-north-4");
        assert_eq!(config.endpoint_root(Service::Vpc), "https://vpc.cn-north-4.example.com/");

        clear_env();
    }

    #[test]
    #[serial]
    fn reports_missing_settings() {
        clear_env();
        assert_eq!(
            ProviderConfig::from_dynamic(&DynamicValue::object()).unwrap_err(),
            ConfigError::MissingRegion
        );
        assert_eq!(
            ProviderConfig::from_dynamic(&block(serde_json::json!({"region": "r"}))).unwrap_err(),
            ConfigError::MissingProject
        );
        assert_eq!(
            ProviderConfig::from_dynamic(&block(
                serde_json::json!({"region": "r", "project_id": "p"})
            ))
            .unwrap_err(),
            ConfigError::MissingCredentials
        );
        assert_eq!(
            ProviderConfig::from_dynamic(&block(
                serde_json::json!({"region": "r", "project_id": "p", "access_key": "AK"})
            ))
            .unwrap_err(),
            ConfigError::IncompleteAkSk
        );
        assert!(matches!(
            ProviderConfig::from_dynamic(&block(serde_json::json!({
                "region": "r", "project_id": "p", "token": "t", "max_retries": -1
            })))
            .unwrap_err(),
            ConfigError::InvalidMaxRetries(_)
        ));
    }

    #[test]
    #[serial]
    fn endpoints_are_normalized_and_validated() {
        clear_env();
        let config = ProviderConfig::from_dynamic(&block(serde_json::json!({
            "region": "r",
            "project_id": "p",
            "token": "t",
            "endpoints": {"vpc": " vpc.internal.example "},
        })))
        .unwrap();
        assert_eq!(
            config.service_url(Service::Vpc),
            "https://vpc.internal.example/v1/p"
        );
        assert_eq!(config.endpoint_root(Service::Ecs), "https://ecs.r.myhuaweicloud.com/");

        let err = ProviderConfig::from_dynamic(&block(serde_json::json!({
            "region": "r", "project_id": "p", "token": "t",
            "endpoints": {"obs": "https://obs.example"},
        })))
        .unwrap_err();
        assert_eq!(err, ConfigError::UnknownService("obs".to_string()));

        let err = ProviderConfig::from_dynamic(&block(serde_json::json!({
            "region": "r", "project_id": "p", "token": "t",
            "endpoints": {"ecs": ""},
        })))
        .unwrap_err();
        assert_eq!(err, ConfigError::EmptyEndpoint("ecs".to_string()));
    }

    #[test]
    fn credentials_debug_hides_secrets() {
        let creds = Credentials::AkSk {
            access_key: "AK".to_string(),
            secret_key: "very-secret".to_string(),
            security_token: Some("tok".to_string()),
        };
        let rendered = format!("{:?}", creds);
        assert!(!rendered.contains("very-secret"));
        assert!(!format!("{:?}", Credentials::Token("abc".into())).contains("abc"));
    }
}
