//! Kubeguard privilege search server
//!
//! Serves `GET|POST /api/v0.1/privilege/search` over an RBAC snapshot
//! loaded from a manifest directory.
//!
//! # Usage
//!
//! ```bash
//! # Serve the manifests under ./rbac on 0.0.0.0:8080
//! kubeguard-server --manifests ./rbac
//!
//! # Only consider bindings of one namespace, exact subject names
//! kubeguard-server --manifests ./rbac --namespace team-a --match-mode exact
//!
//! # Start from a TOML file; flags and env vars override it
//! kubeguard-server --config /etc/kubeguard/server.toml --port 9090
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Logging filter (overrides `--log-level`)
//! - `KUBEGUARD_CONFIG`: TOML configuration file
//! - `KUBEGUARD_HOST`: Server host (default: 0.0.0.0)
//! - `KUBEGUARD_PORT`: Server port (default: 8080)
//! - `KUBEGUARD_MANIFESTS`: RBAC manifest directory
//! - `KUBEGUARD_NAMESPACE`: Namespace to scan (default: all)
//! - `KUBEGUARD_MATCH_MODE`: `pattern` or `exact` (default: pattern)
//! - `KUBEGUARD_LOOKUP_CONCURRENCY`: Concurrent grant lookups per query (default: 8)
//! - `KUBEGUARD_REQUEST_TIMEOUT`: Request timeout in seconds (default: 15)

use anyhow::{Context, Result};
use clap::Parser;
use kubeguard_privilege::{manifest, InMemoryRbacClient, RbacClient};
use kubeguard_server::{AppState, Server, ServerConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Kubeguard privilege search server
#[derive(Parser, Debug)]
#[command(
    name = "kubeguard-server",
    version,
    about = "Search which RBAC roles are bound to users, groups and service accounts",
    long_about = None
)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "KUBEGUARD_CONFIG")]
    config: Option<PathBuf>,

    /// Host to bind to
    #[arg(short = 'H', long, env = "KUBEGUARD_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short = 'p', long, env = "KUBEGUARD_PORT")]
    port: Option<u16>,

    /// Directory of RBAC manifests (JSON or YAML)
    #[arg(short, long, env = "KUBEGUARD_MANIFESTS")]
    manifests: Option<PathBuf>,

    /// Namespace to scan; empty scans every namespace
    #[arg(short, long, env = "KUBEGUARD_NAMESPACE")]
    namespace: Option<String>,

    /// Subject matching: pattern or exact
    #[arg(long, env = "KUBEGUARD_MATCH_MODE")]
    match_mode: Option<String>,

    /// Reject malformed subject patterns instead of reporting them
    #[arg(long)]
    strict_patterns: bool,

    /// Concurrent grant lookups per query
    #[arg(long, env = "KUBEGUARD_LOOKUP_CONCURRENCY")]
    lookup_concurrency: Option<usize>,

    /// Request timeout in seconds
    #[arg(long, env = "KUBEGUARD_REQUEST_TIMEOUT")]
    request_timeout: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,
}

impl Args {
    /// Resolve the effective configuration; flags win over the file
    fn into_config(self) -> Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load(path)
                .with_context(|| format!("Failed to load {}", path.display()))?,
            None => ServerConfig::default(),
        };

        if let Some(host) = self.host {
            config.http.host = host;
        }
        if let Some(port) = self.port {
            config.http.port = port;
        }
        if let Some(timeout) = self.request_timeout {
            config.http.request_timeout_secs = timeout;
        }
        if let Some(manifests) = self.manifests {
            config.rbac.manifests = Some(manifests);
        }
        if let Some(namespace) = self.namespace {
            config.query.namespace = namespace;
        }
        if let Some(match_mode) = self.match_mode {
            config.query.match_mode = match_mode;
        }
        if let Some(concurrency) = self.lookup_concurrency {
            config.query.lookup_concurrency = concurrency;
        }
        if self.strict_patterns {
            config.query.strict_patterns = true;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);

    info!("Starting kubeguard server");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = args.into_config()?;
    let options = config.query_options()?;

    let client: Arc<dyn RbacClient> = match &config.rbac.manifests {
        Some(dir) => Arc::new(
            manifest::load_dir(dir)
                .await
                .with_context(|| format!("Failed to load RBAC manifests from {}", dir.display()))?,
        ),
        None => {
            warn!("No manifest directory configured, serving an empty RBAC snapshot");
            Arc::new(InMemoryRbacClient::new())
        }
    };

    info!(
        "Query scope: {:?}, match mode: {:?}, lookup concurrency: {}",
        options.scope, options.match_mode, options.lookup_concurrency
    );

    let server = Server::new(
        config.bind_addr(),
        Duration::from_secs(config.http.request_timeout_secs),
        AppState::new(client, options),
    );

    if let Err(e) = server.run().await {
        error!("Server error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Initialize tracing/logging subsystem
fn init_tracing(log_level: &str) {
    let level = log_level.parse::<tracing::Level>().unwrap_or_else(|_| {
        eprintln!("Invalid log level '{}', using 'info'", log_level);
        tracing::Level::INFO
    });

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "kubeguard_server={level},kubeguard_privilege={level},tower_http={}",
                    if level <= tracing::Level::DEBUG { "debug" } else { "info" }
                )
                .into()
            }),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_line_number(true),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(vec!["kubeguard-server"]);
        assert!(args.config.is_none());
        assert_eq!(args.log_level, "info");

        let config = args.into_config().unwrap();
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
        assert!(config.rbac.manifests.is_none());
    }

    #[test]
    fn test_flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.toml");
        std::fs::write(&path, "[http]\nport = 9000\nhost = \"127.0.0.1\"\n").unwrap();

        let args = Args::parse_from(vec![
            "kubeguard-server",
            "--config",
            path.to_str().unwrap(),
            "--port",
            "9090",
            "--match-mode",
            "exact",
        ]);
        let config = args.into_config().unwrap();

        assert_eq!(config.bind_addr(), "127.0.0.1:9090");
        assert_eq!(config.query.match_mode, "exact");
    }

    #[test]
    fn test_invalid_override_rejected() {
        let args = Args::parse_from(vec!["kubeguard-server", "--lookup-concurrency", "0"]);
        assert!(args.into_config().is_err());
    }
}
