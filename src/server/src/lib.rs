//! HTTP front end for the kubeguard privilege engine

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ApiError, Result};
pub use server::Server;
pub use state::AppState;
