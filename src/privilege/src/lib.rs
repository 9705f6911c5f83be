//! # Kubeguard Privilege Engine
//!
//! Answers "which roles are bound to these subjects?" over a cluster's RBAC
//! graph.
//!
//! ## Features
//!
//! - **Pattern subjects**: requested subjects are unanchored regular
//!   expressions by default (`deve*` matches `developer`), or exact names
//! - **Best-effort resolution**: unresolvable grants and malformed patterns
//!   are reported as [`Diagnostic`]s instead of failing the query
//! - **Deterministic output**: one record per distinct subject, sorted by
//!   subject, identical across binding and fetch order
//! - **Two encodings**: pretty JSON and YAML, both decodable back into
//!   [`SubjectRoles`]
//! - **Injected collaborators**: bindings and grants come from any
//!   [`BindingSource`] + [`GrantFetcher`]; [`InMemoryRbacClient`] and the
//!   [`manifest`] loader provide an offline snapshot
//!
//! ## Example
//!
//! ```rust
//! use kubeguard_privilege::{InMemoryRbacClient, Query, Role, RoleBinding, RoleRef, Subject};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = InMemoryRbacClient::new();
//!     client.insert_role(Role::new("default", "editor")).await;
//!     client
//!         .insert_binding(
//!             RoleBinding::new("default", "dev-editor", RoleRef::role("editor"))
//!                 .with_subject(Subject::user("developer")),
//!         )
//!         .await;
//!
//!     let query = Query::new(Arc::new(client), ["developer", "unknown"], "json")?;
//!     let report = query.run().await?;
//!
//!     assert_eq!(report.results.len(), 2);
//!     assert!(report.results[0].roles.is_some());
//!     assert!(report.results[1].roles.is_none());
//!
//!     Ok(())
//! }
//! ```

pub mod aggregate;
pub mod diagnostic;
pub mod engine;
pub mod error;
pub mod format;
pub mod manifest;
pub mod pattern;
pub mod query;
pub mod source;
pub mod types;

// Re-export commonly used types
pub use aggregate::SubjectRoles;
pub use diagnostic::Diagnostic;
pub use error::{PrivilegeError, Result};
pub use format::OutputFormat;
pub use pattern::MatchMode;
pub use query::{execute, Query, QueryOptions, QueryOutput, QueryReport};
pub use source::{BindingScope, BindingSource, GrantFetcher, InMemoryRbacClient, RbacClient};
pub use types::{
    ClusterRole, GrantKind, GrantRef, LookupFailure, ObjectMeta, PolicyRule, Role, RoleBinding,
    RoleRef, Subject,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
