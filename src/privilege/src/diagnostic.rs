//! Non-fatal findings reported alongside query results

use crate::types::{LookupFailure, RoleRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// A problem that was absorbed instead of failing the query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Pattern failed to compile and matched nothing
    InvalidPattern { pattern: String, reason: String },

    /// A matched binding's grant could not be resolved
    GrantLookupFailed {
        /// Qualified name of the first binding that referenced the grant
        binding: String,
        role_ref: RoleRef,
        cause: LookupFailure,
    },
}

impl Diagnostic {
    /// Log the diagnostic and append it
    pub(crate) fn record(self, diagnostics: &mut Vec<Diagnostic>) {
        warn!("{}", self);
        diagnostics.push(self);
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::InvalidPattern { pattern, reason } => {
                write!(f, "pattern '{}' matches nothing: {}", pattern, reason)
            }
            Diagnostic::GrantLookupFailed {
                binding,
                role_ref,
                cause,
            } => write!(
                f,
                "binding {} references {} '{}': {}",
                binding, role_ref.kind, role_ref.name, cause
            ),
        }
    }
}
