use reqwest::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use super::common::ApiErrorDetails;
use super::error::ApiError;
use super::signer::{SignableRequest, Signer};
use crate::config::{Credentials, ProviderConfig, Service};

const HEADER_AUTH_TOKEN: &str = "X-Auth-Token";
const HEADER_SECURITY_TOKEN: &str = "X-Security-Token";
const HEADER_PROJECT_ID: &str = "X-Project-Id";
const JSON: &str = "application/json";

/// HuaweiCloud API client
///
/// Built once at provider configure time; clones share one connection pool.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    config: ProviderConfig,
    auth: Auth,
    retry_config: RetryConfig,
}

enum Auth {
    Token(HeaderValue),
    AkSk {
        signer: Signer,
        security_token: Option<String>,
    },
}

/// Connection-level retry. Steady-state polling is the reconciler's job;
/// this only covers transport failures and throttling.
#[derive(Clone, Debug)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub timeout_seconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: crate::config::DEFAULT_MAX_RETRIES,
            initial_backoff_ms: 2_000,
            max_backoff_ms: 10 * 60 * 1_000,
            timeout_seconds: 60,
        }
    }
}

impl RetryConfig {
    /// Wait before retry `attempt` (1-based): doubles from the initial
    /// backoff and saturates at the cap
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2_u64.saturating_pow(attempt.saturating_sub(1));
        Duration::from_millis(
            self.initial_backoff_ms
                .saturating_mul(factor)
                .min(self.max_backoff_ms),
        )
    }
}

impl Client {
    /// Create a new API client honouring `config.max_retries`
    pub fn new(config: ProviderConfig) -> Result<Self, ApiError> {
        let retry_config = RetryConfig {
            max_retries: config.max_retries,
            ..Default::default()
        };
        Self::with_retry_config(config, retry_config)
    }

    pub fn with_retry_config(
        config: ProviderConfig,
        retry_config: RetryConfig,
    ) -> Result<Self, ApiError> {
        let http_client = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.insecure)
            .timeout(Duration::from_secs(retry_config.timeout_seconds))
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(30))
            .build()?;

        let auth = match &config.credentials {
            Credentials::Token(token) => Auth::Token(
                HeaderValue::from_str(token)
                    .map_err(|e| ApiError::SigningError(format!("invalid token: {}", e)))?,
            ),
            Credentials::AkSk {
                access_key,
                secret_key,
                security_token,
            } => Auth::AkSk {
                signer: Signer::new(access_key.clone(), secret_key.clone()),
                security_token: security_token.clone(),
            },
        };

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client,
                config,
                auth,
                retry_config,
            }),
        })
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.inner.config
    }

    /// Client for another region with the same credentials and endpoints
    pub fn for_region(&self, region: &str) -> Result<Self, ApiError> {
        if region == self.inner.config.region {
            return Ok(self.clone());
        }
        let mut config = self.inner.config.clone();
        config.region = region.to_string();
        Self::with_retry_config(config, self.inner.retry_config.clone())
    }

    /// VPC, subnet and EIP operations
    pub fn vpc(&self) -> crate::api::vpc::VpcApi<'_> {
        crate::api::vpc::VpcApi::new(self)
    }

    /// ECS server operations
    pub fn ecs(&self) -> crate::api::ecs::EcsApi<'_> {
        crate::api::ecs::EcsApi::new(self)
    }

    /// `{service_url}{path}` for the given service
    pub(crate) fn url(&self, service: Service, path: &str) -> String {
        format!("{}{}", self.inner.config.service_url(service), path)
    }

    pub async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        let body = self.execute_with_retry(Method::GET, url, None).await?;
        parse_body(&body)
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let payload = encode_body(body)?;
        let body = self
            .execute_with_retry(Method::POST, url, Some(payload))
            .await?;
        parse_body(&body)
    }

    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let payload = encode_body(body)?;
        let body = self
            .execute_with_retry(Method::PUT, url, Some(payload))
            .await?;
        parse_body(&body)
    }

    /// DELETE ignores the response body; most services answer 204
    pub async fn delete(&self, url: &str) -> Result<(), ApiError> {
        self.execute_with_retry(Method::DELETE, url, None).await?;
        Ok(())
    }

    async fn send(
        &self,
        method: &Method,
        url: &Url,
        body: Option<&[u8]>,
    ) -> Result<Result<reqwest::Response, reqwest::Error>, ApiError> {
        let mut headers = BTreeMap::new();
        headers.insert(CONTENT_TYPE.as_str().to_string(), JSON.to_string());
        headers.insert(
            HEADER_PROJECT_ID.to_string(),
            self.inner.config.project_id.clone(),
        );

        let mut request = self.inner.http_client.request(method.clone(), url.clone());

        match &self.inner.auth {
            Auth::Token(token) => {
                request = request.header(HEADER_AUTH_TOKEN, token.clone());
            }
            Auth::AkSk {
                signer,
                security_token,
            } => {
                if let Some(token) = security_token {
                    headers.insert(HEADER_SECURITY_TOKEN.to_string(), token.clone());
                }
                let signed = signer.sign(
                    &SignableRequest {
                        method: method.as_str(),
                        url,
                        headers: &headers,
                        body: body.unwrap_or_default(),
                    },
                    chrono::Utc::now(),
                )?;
                for (name, value) in signed {
                    request = request.header(header_name(&name)?, value);
                }
            }
        }

        for (name, value) in &headers {
            request = request.header(header_name(name)?, value.as_str());
        }
        if let Some(body) = body {
            request = request.body(body.to_vec());
        }

        Ok(request.send().await)
    }

    /// Execute request with retry logic, returning the raw success body
    async fn execute_with_retry(
        &self,
        method: Method,
        url: &str,
        body: Option<Vec<u8>>,
    ) -> Result<String, ApiError> {
        let parsed = Url::parse(url).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", url, e)))?;
        let retry = &self.inner.retry_config;
        let mut attempt = 0;
        let mut last_error = None;

        while attempt <= retry.max_retries {
            if attempt > 0 {
                let backoff = retry.backoff(attempt);
                tracing::debug!(
                    "Retrying {} {} after {:?} (attempt {})",
                    method,
                    url,
                    backoff,
                    attempt
                );
                tokio::time::sleep(backoff).await;
            }

            tracing::debug!("{} request to: {}", method, url);

            match self.send(&method, &parsed, body.as_deref()).await? {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let text = response.text().await?;
                        tracing::debug!("API response body: {}", text);
                        return Ok(text);
                    }

                    if status == StatusCode::TOO_MANY_REQUESTS {
                        tracing::warn!("{} {} throttled (HTTP 429)", method, url);
                        last_error = Some(ApiError::RateLimited);
                    } else {
                        return Err(error_from_response(response, parsed.path()).await);
                    }
                }
                Err(e) => {
                    if e.is_timeout() {
                        last_error = Some(ApiError::Timeout(retry.timeout_seconds));
                    } else if e.is_connect() {
                        tracing::warn!("connection to {} failed: {}", url, e);
                        last_error = Some(ApiError::ServiceUnavailable);
                    } else {
                        return Err(ApiError::RequestError(e));
                    }
                }
            }

            attempt += 1;
        }

        Err(last_error.unwrap_or(ApiError::ServiceUnavailable))
    }
}

fn header_name(name: &str) -> Result<HeaderName, ApiError> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| ApiError::SigningError(format!("invalid header {}: {}", name, e)))
}

fn encode_body<B: Serialize>(body: &B) -> Result<Vec<u8>, ApiError> {
    let payload = serde_json::to_vec(body)
        .map_err(|e| ApiError::ParseError(format!("Failed to encode request: {}", e)))?;
    tracing::debug!("API request body: {}", String::from_utf8_lossy(&payload));
    Ok(payload)
}

fn parse_body<T: DeserializeOwned>(text: &str) -> Result<T, ApiError> {
    // Some endpoints answer 200/204 with no body at all
    let text = if text.trim().is_empty() { "null" } else { text };
    serde_json::from_str::<T>(text).map_err(|e| {
        tracing::error!("Failed to deserialize response: {}, body: {}", e, text);
        ApiError::ParseError(format!("Failed to parse response: {}", e))
    })
}

async fn error_from_response(response: reqwest::Response, path: &str) -> ApiError {
    let status = response.status().as_u16();
    let text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    let details = ApiErrorDetails::parse(&text).map(Box::new);

    match status {
        401 => ApiError::AuthError(status),
        404 => ApiError::NotFound {
            path: path.to_string(),
            details,
        },
        _ => ApiError::ApiError {
            status,
            message: text,
            details,
        },
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Echo {
        name: String,
    }

    fn test_config(server_url: &str, credentials: Credentials) -> ProviderConfig {
        ProviderConfig::new("cn-north-4", "p1", credentials).with_endpoint(Service::Vpc, server_url)
    }

    fn fast_retry(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_backoff_ms: 1,
            max_backoff_ms: 5,
            timeout_seconds: 5,
        }
    }

    fn token_client(server_url: &str, max_retries: u32) -> Client {
        Client::with_retry_config(
            test_config(server_url, Credentials::Token("tok".to_string())),
            fast_retry(max_retries),
        )
        .unwrap()
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let retry = RetryConfig::default();
        assert_eq!(retry.backoff(1), Duration::from_secs(2));
        assert_eq!(retry.backoff(2), Duration::from_secs(4));
        assert_eq!(retry.backoff(3), Duration::from_secs(8));
        assert_eq!(retry.backoff(12), Duration::from_secs(600));
        assert_eq!(retry.backoff(70), Duration::from_secs(600));
    }

    #[tokio::test]
    async fn token_auth_sets_headers() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/p1/vpcs/abc")
            .match_header("x-auth-token", "tok")
            .match_header("x-project-id", "p1")
            .with_body(r#"{"name":"vpc-a"}"#)
            .create_async()
            .await;

        let client = token_client(&server.url(), 0);
        let url = client.url(Service::Vpc, "/vpcs/abc");
        let echo: Echo = client.get(&url).await.unwrap();
        assert_eq!(echo.name, "vpc-a");

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn aksk_auth_signs_requests() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/p1/vpcs")
            .match_header(
                "authorization",
                Matcher::Regex(
                    r"^SDK-HMAC-SHA256 Access=AK, SignedHeaders=content-type;host;x-project-id;x-sdk-date;x-security-token, Signature=[0-9a-f]{64}$"
                        .to_string(),
                ),
            )
            .match_header("x-sdk-date", Matcher::Regex(r"^\d{8}T\d{6}Z$".to_string()))
            .match_header("x-security-token", "sts")
            .match_body(Matcher::JsonString(r#"{"vpc":{"name":"a"}}"#.to_string()))
            .with_body(r#"{"name":"a"}"#)
            .create_async()
            .await;

        let client = Client::with_retry_config(
            test_config(
                &server.url(),
                Credentials::AkSk {
                    access_key: "AK".to_string(),
                    secret_key: "SK".to_string(),
                    security_token: Some("sts".to_string()),
                },
            ),
            fast_retry(0),
        )
        .unwrap();

        let url = client.url(Service::Vpc, "/vpcs");
        let echo: Echo = client
            .post(&url, &serde_json::json!({"vpc": {"name": "a"}}))
            .await
            .unwrap();
        assert_eq!(echo.name, "a");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn not_found_is_distinguished() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/v1/p1/vpcs/gone")
            .with_status(404)
            .with_body(r#"{"error_code":"VPC.0202","error_msg":"Query resource by id gone fail"}"#)
            .create_async()
            .await;

        let client = token_client(&server.url(), 3);
        let url = client.url(Service::Vpc, "/vpcs/gone");
        let err = client.get::<Echo>(&url).await.unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(err.error_code(), Some("VPC.0202"));
    }

    #[tokio::test]
    async fn retries_throttled_requests_then_gives_up() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/p1/vpcs")
            .with_status(429)
            .expect(3)
            .create_async()
            .await;

        let client = token_client(&server.url(), 2);
        let url = client.url(Service::Vpc, "/vpcs");
        let err = client.get::<Echo>(&url).await.unwrap_err();

        assert!(matches!(err, ApiError::RateLimited));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn server_errors_are_not_retried() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/p1/vpcs")
            .with_status(500)
            .with_body(r#"{"code":"VPC.9999","message":"internal"}"#)
            .expect(1)
            .create_async()
            .await;

        let client = token_client(&server.url(), 5);
        let url = client.url(Service::Vpc, "/vpcs");
        let err = client
            .post::<Echo, _>(&url, &serde_json::json!({}))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(500));
        assert!(err.is_retryable());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn unauthorized_maps_to_auth_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/v1/p1/vpcs")
            .with_status(401)
            .create_async()
            .await;

        let client = token_client(&server.url(), 3);
        let url = client.url(Service::Vpc, "/vpcs");
        let err = client.get::<Echo>(&url).await.unwrap_err();
        assert!(matches!(err, ApiError::AuthError(401)));
    }

    #[tokio::test]
    async fn delete_accepts_empty_body() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("DELETE", "/v1/p1/vpcs/abc")
            .with_status(204)
            .create_async()
            .await;

        let client = token_client(&server.url(), 0);
        client
            .delete(&client.url(Service::Vpc, "/vpcs/abc"))
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn connection_failures_are_retried() {
        let client = token_client("http://127.0.0.1:1", 1);
        let url = client.url(Service::Vpc, "/vpcs");
        let err = client.get::<Echo>(&url).await.unwrap_err();
        assert!(matches!(
            err,
            ApiError::ServiceUnavailable | ApiError::Timeout(_)
        ));
    }
}
