//! Server configuration loading and validation

use anyhow::{Context, Result};
use kubeguard_privilege::{BindingScope, MatchMode, QueryOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Complete server configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub http: HttpSection,

    #[serde(default)]
    pub rbac: RbacSection,

    #[serde(default)]
    pub query: QuerySection,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RbacSection {
    /// Directory of RBAC manifests loaded at startup
    #[serde(default)]
    pub manifests: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QuerySection {
    /// Namespace to scan; empty scans every namespace
    #[serde(default)]
    pub namespace: String,
    #[serde(default = "default_match_mode")]
    pub match_mode: String,
    #[serde(default)]
    pub strict_patterns: bool,
    #[serde(default = "default_lookup_concurrency")]
    pub lookup_concurrency: usize,
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 15 }
fn default_match_mode() -> String { "pattern".to_string() }
fn default_lookup_concurrency() -> usize { kubeguard_privilege::query::DEFAULT_LOOKUP_CONCURRENCY }

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for QuerySection {
    fn default() -> Self {
        Self {
            namespace: String::new(),
            match_mode: default_match_mode(),
            strict_patterns: false,
            lookup_concurrency: default_lookup_concurrency(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .context("Failed to read configuration file")?;

        let config: ServerConfig = toml::from_str(&contents)
            .context("Failed to parse configuration file")?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.http.port == 0 {
            anyhow::bail!("HTTP port must be non-zero");
        }

        if self.http.request_timeout_secs == 0 {
            anyhow::bail!("Request timeout must be at least one second");
        }

        if self.query.lookup_concurrency == 0 {
            anyhow::bail!("Lookup concurrency must be at least 1");
        }

        self.query
            .match_mode
            .parse::<MatchMode>()
            .context("Invalid query.match_mode")?;

        Ok(())
    }

    /// `host:port` to bind
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.http.host, self.http.port)
    }

    /// Query options applied to every search request
    pub fn query_options(&self) -> Result<QueryOptions> {
        Ok(QueryOptions {
            scope: BindingScope::from_namespace(&self.query.namespace),
            match_mode: self
                .query
                .match_mode
                .parse::<MatchMode>()
                .context("Invalid query.match_mode")?,
            strict_patterns: self.query.strict_patterns,
            lookup_concurrency: self.query.lookup_concurrency,
        })
    }
}
