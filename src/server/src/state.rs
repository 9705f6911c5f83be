use kubeguard_privilege::{QueryOptions, RbacClient};
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// RBAC collaborator every query reads from
    pub client: Arc<dyn RbacClient>,

    /// Options applied to every search
    pub options: QueryOptions,

    /// Server start time for uptime calculation
    pub start_time: Instant,

    /// Application version
    pub version: String,
}

impl AppState {
    pub fn new(client: Arc<dyn RbacClient>, options: QueryOptions) -> Self {
        Self {
            client,
            options,
            start_time: Instant::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
