//! AK/SK request signing (SDK-HMAC-SHA256)

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use url::Url;

use super::error::ApiError;

type HmacSha256 = Hmac<Sha256>;

pub const ALGORITHM: &str = "SDK-HMAC-SHA256";
pub const HEADER_SDK_DATE: &str = "X-Sdk-Date";
const BASIC_DATE_FORMAT: &str = "%Y%m%dT%H%M%SZ";

#[derive(Clone)]
pub struct Signer {
    access_key: String,
    secret_key: String,
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("access_key", &self.access_key)
            .finish_non_exhaustive()
    }
}

/// The parts of an outgoing request that take part in the signature
pub struct SignableRequest<'a> {
    pub method: &'a str,
    pub url: &'a Url,
    /// Extra headers to sign besides host and x-sdk-date
    pub headers: &'a BTreeMap<String, String>,
    pub body: &'a [u8],
}

impl Signer {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }

    /// Headers to attach: `X-Sdk-Date` and `Authorization`
    pub fn sign(
        &self,
        request: &SignableRequest<'_>,
        now: DateTime<Utc>,
    ) -> Result<Vec<(String, String)>, ApiError> {
        let timestamp = now.format(BASIC_DATE_FORMAT).to_string();

        let mut canon_hdrs: BTreeMap<String, String> = request
            .headers
            .iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v.trim().to_string()))
            .collect();
        canon_hdrs.insert("host".into(), host_header(request.url)?);
        canon_hdrs.insert(HEADER_SDK_DATE.to_ascii_lowercase(), timestamp.clone());

        let signed_headers = canon_hdrs.keys().cloned().collect::<Vec<_>>().join(";");
        let canonical_request = canonical_request(
            request.method,
            request.url,
            &canon_hdrs,
            &signed_headers,
            request.body,
        );
        tracing::trace!("canonical request:\n{}", canonical_request);

        let string_to_sign = format!(
            "{}\n{}\n{}",
            ALGORITHM,
            timestamp,
            sha256_hex(canonical_request.as_bytes())
        );

        let mut mac = HmacSha256::new_from_slice(self.secret_key.as_bytes())
            .map_err(|e| ApiError::SigningError(e.to_string()))?;
        mac.update(string_to_sign.as_bytes());
        let signature = hex(&mac.finalize().into_bytes());

        let authorization = format!(
            "{} Access={}, SignedHeaders={}, Signature={}",
            ALGORITHM, self.access_key, signed_headers, signature
        );

        Ok(vec![
            (HEADER_SDK_DATE.to_string(), timestamp),
            ("Authorization".to_string(), authorization),
        ])
    }
}

fn canonical_request(
    method: &str,
    url: &Url,
    headers: &BTreeMap<String, String>,
    signed_headers: &str,
    body: &[u8],
) -> String {
    let canonical_headers: String = headers
        .iter()
        .map(|(k, v)| format!("{}:{}\n", k, v))
        .collect();

    format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        method.to_ascii_uppercase(),
        canonical_uri(url),
        canonical_query(url),
        canonical_headers,
        signed_headers,
        sha256_hex(body)
    )
}

fn canonical_uri(url: &Url) -> String {
    let path = url.path();
    if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{}/", path)
    }
}

fn canonical_query(url: &Url) -> String {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            (
                urlencoding::encode(&k).into_owned(),
                urlencoding::encode(&v).into_owned(),
            )
        })
        .collect();
    pairs.sort();
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

fn host_header(url: &Url) -> Result<String, ApiError> {
    let host = url
        .host_str()
        .ok_or_else(|| ApiError::InvalidUrl(format!("{} has no host", url)))?;
    Ok(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex(&hasher.finalize())
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
