//! Common types and utilities for HuaweiCloud APIs

use serde::Deserialize;

/// Error payload returned by HuaweiCloud services
///
/// Services disagree on the envelope; [`ApiErrorDetails::parse`] accepts
/// the shapes seen across VPC, EIP and ECS.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ApiErrorDetails {
    pub code: String,
    pub message: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorEnvelope {
    Flat {
        error_code: String,
        #[serde(default)]
        error_msg: String,
    },
    Nested {
        error: CodeMessage,
    },
    /// Nova-style bodies keyed by the fault name, e.g. {"itemNotFound": {...}}
    Fault(std::collections::HashMap<String, CodeMessage>),
    Plain(CodeMessage),
}

#[derive(Deserialize)]
struct CodeMessage {
    #[serde(default, deserialize_with = "code_as_string")]
    code: String,
    #[serde(default)]
    message: String,
}

fn code_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(i64),
    }

    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => s,
        StringOrNumber::Number(n) => n.to_string(),
    })
}

impl ApiErrorDetails {
    pub fn parse(body: &str) -> Option<Self> {
        let details = match serde_json::from_str::<ErrorEnvelope>(body).ok()? {
            ErrorEnvelope::Flat {
                error_code,
                error_msg,
            } => Self {
                code: error_code,
                message: error_msg,
            },
            ErrorEnvelope::Nested { error } | ErrorEnvelope::Plain(error) => Self {
                code: error.code,
                message: error.message,
            },
            ErrorEnvelope::Fault(mut faults) => {
                let (_, fault) = faults.drain().next()?;
                Self {
                    code: fault.code,
                    message: fault.message,
                }
            }
        };

        if details.code.is_empty() && details.message.is_empty() {
            None
        } else {
            Some(details)
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ApiQueryParams {
    params: Vec<(String, String)>,
}

impl ApiQueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<K: Into<String>, V: ToString>(mut self, key: K, value: V) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    pub fn add_optional<K: Into<String>, V: ToString>(mut self, key: K, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.params.push((key.into(), v.to_string()));
        }
        self
    }

    pub fn to_query_string(&self) -> String {
        if self.params.is_empty() {
            String::new()
        } else {
            format!(
                "?{}",
                self.params
                    .iter()
                    .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                    .collect::<Vec<_>>()
                    .join("&")
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flat_error_body() {
        let details =
            ApiErrorDetails::parse(r#"{"error_code":"VPC.0202","error_msg":"Query vpc error"}"#)
                .unwrap();
        assert_eq!(details.code, "VPC.0202");
        assert_eq!(details.message, "Query vpc error");
    }

    #[test]
    fn parses_nested_and_plain_bodies() {
        let nested =
            ApiErrorDetails::parse(r#"{"error":{"code":"APIGW.0301","message":"Incorrect IAM"}}"#)
                .unwrap();
        assert_eq!(nested.code, "APIGW.0301");

        let plain = ApiErrorDetails::parse(r#"{"code":"EIP.7902","message":"busy"}"#).unwrap();
        assert_eq!(plain.message, "busy");
    }

    #[test]
    fn parses_fault_keyed_body_with_numeric_code() {
        let details = ApiErrorDetails::parse(
            r#"{"itemNotFound":{"code":404,"message":"Instance could not be found"}}"#,
        )
        .unwrap();
        assert_eq!(details.code, "404");
        assert_eq!(details.message, "Instance could not be found");
    }

    #[test]
    fn rejects_unrelated_bodies() {
        assert!(ApiErrorDetails::parse("not json").is_none());
        assert!(ApiErrorDetails::parse("{}").is_none());
    }

    #[test]
    fn query_string_encodes_values() {
        let params = ApiQueryParams::new()
            .add("public_ip_address", "10.0.0.5")
            .add_optional("limit", None::<u32>)
            .add("name", "a b");
        assert_eq!(
            params.to_query_string(),
            "?public_ip_address=10.0.0.5&name=a%20b"
        );
        assert_eq!(ApiQueryParams::new().to_query_string(), "");
    }
}
