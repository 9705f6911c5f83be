//! Output encodings

use crate::aggregate::SubjectRoles;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result encoding selected by the caller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Pretty-printed JSON, two-space indentation
    #[default]
    Json,
    /// YAML block style
    Yaml,
}

impl OutputFormat {
    /// Parse a selector, case-insensitively
    ///
    /// `yaml` and `yml` select YAML; anything else, including the empty
    /// string, selects JSON.
    pub fn from_selector(selector: &str) -> Self {
        match selector.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => OutputFormat::Yaml,
            _ => OutputFormat::Json,
        }
    }

    /// HTTP content type of the encoding
    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Json => "application/json",
            OutputFormat::Yaml => "application/x-yaml",
        }
    }

    /// Encode result records
    pub fn encode(&self, results: &[SubjectRoles]) -> Result<Vec<u8>> {
        match self {
            OutputFormat::Json => Ok(serde_json::to_vec_pretty(results)?),
            OutputFormat::Yaml => Ok(serde_yaml::to_string(results)?.into_bytes()),
        }
    }

    /// Decode bytes produced by [`OutputFormat::encode`]
    pub fn decode(&self, bytes: &[u8]) -> Result<Vec<SubjectRoles>> {
        match self {
            OutputFormat::Json => Ok(serde_json::from_slice(bytes)?),
            OutputFormat::Yaml => Ok(serde_yaml::from_slice(bytes)?),
        }
    }
}

impl From<&str> for OutputFormat {
    fn from(selector: &str) -> Self {
        OutputFormat::from_selector(selector)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Yaml => write!(f, "yaml"),
        }
    }
}
