//! Per-operation timeouts read from a resource's `timeouts` attribute
//!
//! Values use Terraform's duration syntax ("30s", "10m", "1h30m").

use crate::context::Context;
use crate::error::{Result, TfplugError};
use crate::schema::{Attribute, AttributeBuilder, AttributeType};
use crate::types::{AttributePath, DynamicValue};
use std::collections::HashMap;
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10 * 60);

const ATTRIBUTE: &str = "timeouts";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

impl Operation {
    fn key(self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub create: Duration,
    pub read: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::uniform(DEFAULT_TIMEOUT)
    }
}

impl Timeouts {
    pub fn uniform(timeout: Duration) -> Self {
        Self {
            create: timeout,
            read: timeout,
            update: timeout,
            delete: timeout,
        }
    }

    pub fn with_create(mut self, timeout: Duration) -> Self {
        self.create = timeout;
        self
    }

    pub fn with_update(mut self, timeout: Duration) -> Self {
        self.update = timeout;
        self
    }

    pub fn with_delete(mut self, timeout: Duration) -> Self {
        self.delete = timeout;
        self
    }

    pub fn get(&self, op: Operation) -> Duration {
        match op {
            Operation::Create => self.create,
            Operation::Read => self.read,
            Operation::Update => self.update,
            Operation::Delete => self.delete,
        }
    }

    fn set(&mut self, op: Operation, timeout: Duration) {
        match op {
            Operation::Create => self.create = timeout,
            Operation::Read => self.read = timeout,
            Operation::Update => self.update = timeout,
            Operation::Delete => self.delete = timeout,
        }
    }

    /// Overlays any durations set in `value.timeouts` on top of `self`.
    /// Null, unknown or empty entries keep the default.
    pub fn merge_from(mut self, value: &DynamicValue) -> Result<Self> {
        for op in [
            Operation::Create,
            Operation::Read,
            Operation::Update,
            Operation::Delete,
        ] {
            let path = AttributePath::new(ATTRIBUTE).attribute(op.key());
            if let Some(raw) = value.get_non_empty_string(&path) {
                self.set(op, parse_duration(&raw)?);
            }
        }
        Ok(self)
    }

    /// The configured timeout for `op`, shortened to the host deadline if
    /// that comes first
    pub fn effective(&self, op: Operation, ctx: &Context) -> Duration {
        let configured = self.get(op);
        match ctx.remaining() {
            Some(remaining) if remaining < configured => {
                tracing::debug!(
                    "{} timeout {:?} capped by context deadline to {:?}",
                    op.key(),
                    configured,
                    remaining
                );
                remaining
            }
            _ => configured,
        }
    }

    /// Schema attribute resources add to accept a `timeouts` object
    pub fn schema_attribute() -> Attribute {
        let fields = [
            Operation::Create,
            Operation::Read,
            Operation::Update,
            Operation::Delete,
        ]
        .into_iter()
        .map(|op| (op.key().to_string(), AttributeType::String))
        .collect::<HashMap<_, _>>();

        AttributeBuilder::new(ATTRIBUTE, AttributeType::Object(fields))
            .description("Per-operation timeouts such as \"10m\" or \"1h30m\"")
            .optional()
            .build()
    }
}

/// Parses a duration string such as "300ms", "45s", "10m" or "1h30m"
pub fn parse_duration(input: &str) -> Result<Duration> {
    let invalid = |reason: &str| TfplugError::InvalidDuration {
        value: input.to_string(),
        reason: reason.to_string(),
    };

    let s = input.trim();
    if s.is_empty() {
        return Err(invalid("empty duration"));
    }
    if s == "0" {
        return Ok(Duration::ZERO);
    }

    let mut total = 0f64;
    let mut rest = s;
    while !rest.is_empty() {
        let num_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if num_len == 0 {
            return Err(invalid("expected a number"));
        }
        let number: f64 = rest[..num_len]
            .parse()
            .map_err(|_| invalid("malformed number"))?;
        rest = &rest[num_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let seconds_per_unit = match &rest[..unit_len] {
            "ns" => 1e-9,
            "us" | "µs" => 1e-6,
            "ms" => 1e-3,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3600.0,
            "" => return Err(invalid("missing unit")),
            _ => return Err(invalid("unknown unit")),
        };
        rest = &rest[unit_len..];

        total += number * seconds_per_unit;
    }

    Duration::try_from_secs_f64(total).map_err(|_| invalid("out of range"))
}
