//! Resource IDs built from several remote identifiers joined with `/`

use thiserror::Error;

pub const SEPARATOR: char = '/';

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompositeIdError {
    #[error("invalid format specified for ID ({id}), must be {layout}")]
    Format { id: String, layout: String },

    #[error("{layout} takes {expected} parts, got {got}")]
    PartCount {
        layout: String,
        expected: String,
        got: usize,
    },
}

/// Joins the parts with `/`. Parts are not escaped.
pub fn encode(parts: &[&str]) -> String {
    parts.join("/")
}

/// Splits `id` on `/`, accepting only the given part counts
pub fn decode(id: &str, expected_counts: &[usize]) -> Result<Vec<String>, CompositeIdError> {
    let parts: Vec<String> = id.split(SEPARATOR).map(str::to_string).collect();
    if expected_counts.contains(&parts.len()) {
        Ok(parts)
    } else {
        let layout = expected_counts
            .iter()
            .map(|n| format!("{} parts", n))
            .collect::<Vec<_>>()
            .join(" or ");
        Err(CompositeIdError::Format {
            id: id.to_string(),
            layout,
        })
    }
}

/// A named ID layout such as `<public_ip>/<instance_id>/<fixed_ip>`
///
/// The first `required` parts must be present and non-empty. Parts after
/// that may be left off when decoding and come back as `""`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdFormat {
    names: &'static [&'static str],
    required: usize,
    keep_empty_trailing: bool,
}

impl IdFormat {
    pub const fn new(names: &'static [&'static str]) -> Self {
        Self {
            names,
            required: names.len(),
            keep_empty_trailing: true,
        }
    }

    /// Layout whose parts after the first `required` are optional
    pub const fn with_optional(names: &'static [&'static str], required: usize) -> Self {
        Self {
            names,
            required,
            keep_empty_trailing: true,
        }
    }

    /// Encode empty trailing parts by leaving them off instead of writing
    /// an empty segment
    pub const fn drop_empty_trailing(mut self) -> Self {
        self.keep_empty_trailing = false;
        self
    }

    pub fn layout(&self) -> String {
        self.names
            .iter()
            .map(|name| format!("<{}>", name))
            .collect::<Vec<_>>()
            .join("/")
    }

    pub fn part_names(&self) -> &'static [&'static str] {
        self.names
    }

    pub fn encode(&self, parts: &[&str]) -> Result<String, CompositeIdError> {
        if parts.len() < self.required || parts.len() > self.names.len() {
            return Err(CompositeIdError::PartCount {
                layout: self.layout(),
                expected: self.count_label(),
                got: parts.len(),
            });
        }

        let mut parts = parts.to_vec();
        if self.keep_empty_trailing {
            parts.resize(self.names.len(), "");
        } else {
            while parts.len() > self.required && parts.last() == Some(&"") {
                parts.pop();
            }
        }
        Ok(encode(&parts))
    }

    /// Returns exactly `names.len()` parts, padding optional trailing
    /// parts with `""`
    pub fn decode(&self, id: &str) -> Result<Vec<String>, CompositeIdError> {
        let counts: Vec<usize> = (self.required..=self.names.len()).collect();
        let mut parts = decode(id, &counts).map_err(|_| self.format_error(id))?;

        if parts[..self.required].iter().any(String::is_empty) {
            return Err(self.format_error(id));
        }

        parts.resize(self.names.len(), String::new());
        Ok(parts)
    }

    fn format_error(&self, id: &str) -> CompositeIdError {
        CompositeIdError::Format {
            id: id.to_string(),
            layout: self.layout(),
        }
    }

    fn count_label(&self) -> String {
        if self.required == self.names.len() {
            self.required.to_string()
        } else {
            format!("{} to {}", self.required, self.names.len())
        }
    }
}
