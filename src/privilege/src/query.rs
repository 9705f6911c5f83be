//! Privilege query
//!
//! A [`Query`] is built once with every input it needs and validated at
//! construction. Running it lists the bindings of its scope, matches them
//! against the requested subjects, and aggregates one sorted record per
//! distinct subject.
//!
//! # Example
//!
//! ```rust
//! use kubeguard_privilege::{InMemoryRbacClient, Query, Role, RoleBinding, RoleRef, Subject};
//! use std::sync::Arc;
//!
//! # async fn example() -> kubeguard_privilege::Result<()> {
//! let client = InMemoryRbacClient::new();
//! client.insert_role(Role::new("default", "editor")).await;
//! client
//!     .insert_binding(
//!         RoleBinding::new("default", "dev-editor", RoleRef::role("editor"))
//!             .with_subject(Subject::user("developer")),
//!     )
//!     .await;
//!
//! let query = Query::new(Arc::new(client), ["deve*"], "yaml")?;
//! let output = query.execute().await?;
//! assert!(output.diagnostics.is_empty());
//! # Ok(())
//! # }
//! ```

use crate::aggregate::{aggregate, SubjectRoles};
use crate::diagnostic::Diagnostic;
use crate::engine::MatchEngine;
use crate::error::{PrivilegeError, Result};
use crate::format::OutputFormat;
use crate::pattern::{MatchMode, SubjectMatcher};
use crate::source::{BindingScope, RbacClient};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Default number of grant lookups in flight per query
pub const DEFAULT_LOOKUP_CONCURRENCY: usize = 8;

/// Tunables of a query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Namespaces whose bindings are scanned
    #[serde(default)]
    pub scope: BindingScope,

    /// Pattern or exact subject matching
    #[serde(default)]
    pub match_mode: MatchMode,

    /// Reject malformed patterns instead of reporting them
    #[serde(default)]
    pub strict_patterns: bool,

    /// Maximum concurrent grant lookups
    #[serde(default = "default_lookup_concurrency")]
    pub lookup_concurrency: usize,
}

fn default_lookup_concurrency() -> usize {
    DEFAULT_LOOKUP_CONCURRENCY
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            scope: BindingScope::AllNamespaces,
            match_mode: MatchMode::Pattern,
            strict_patterns: false,
            lookup_concurrency: DEFAULT_LOOKUP_CONCURRENCY,
        }
    }
}

/// Structured query result
#[derive(Debug, Clone, PartialEq)]
pub struct QueryReport {
    /// One record per distinct subject, sorted by subject
    pub results: Vec<SubjectRoles>,

    /// Problems absorbed while matching
    pub diagnostics: Vec<Diagnostic>,
}

/// Encoded query result
#[derive(Debug, Clone)]
pub struct QueryOutput {
    pub body: Vec<u8>,
    pub format: OutputFormat,
    pub diagnostics: Vec<Diagnostic>,
}

impl QueryOutput {
    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }
}

/// Immutable privilege query
pub struct Query {
    client: Arc<dyn RbacClient>,
    subjects: Vec<String>,
    matchers: Vec<SubjectMatcher>,
    format: OutputFormat,
    options: QueryOptions,
    /// Patterns rejected at construction in permissive mode
    pattern_diagnostics: Vec<Diagnostic>,
}

impl Query {
    /// Create a query with default options
    pub fn new<I, S>(client: Arc<dyn RbacClient>, subjects: I, format: &str) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_options(client, subjects, format, QueryOptions::default())
    }

    /// Create a query
    ///
    /// Duplicate subjects are collapsed. Fails with
    /// [`PrivilegeError::InvalidQuery`] when `lookup_concurrency` is zero, and
    /// with [`PrivilegeError::InvalidPattern`] for a malformed pattern when
    /// `strict_patterns` is set.
    pub fn with_options<I, S>(
        client: Arc<dyn RbacClient>,
        subjects: I,
        format: &str,
        options: QueryOptions,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if options.lookup_concurrency == 0 {
            return Err(PrivilegeError::InvalidQuery(
                "lookup_concurrency must be at least 1".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        let subjects: Vec<String> = subjects
            .into_iter()
            .map(Into::into)
            .filter(|s| seen.insert(s.clone()))
            .collect();

        let mut matchers = Vec::with_capacity(subjects.len());
        let mut pattern_diagnostics = Vec::new();
        for subject in &subjects {
            match SubjectMatcher::compile(subject, options.match_mode) {
                Ok(matcher) => matchers.push(matcher),
                Err(err) if options.strict_patterns => return Err(err),
                Err(err) => {
                    let reason = match err {
                        PrivilegeError::InvalidPattern { reason, .. } => reason,
                        other => other.to_string(),
                    };
                    Diagnostic::InvalidPattern {
                        pattern: subject.clone(),
                        reason,
                    }
                    .record(&mut pattern_diagnostics);
                    matchers.push(SubjectMatcher::never(subject));
                }
            }
        }

        Ok(Self {
            client,
            subjects,
            matchers,
            format: OutputFormat::from_selector(format),
            options,
            pattern_diagnostics,
        })
    }

    /// Distinct requested subjects, in request order
    pub fn subjects(&self) -> &[String] {
        &self.subjects
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    /// Run the query without encoding the result
    ///
    /// Fails only when the binding source cannot be listed.
    pub async fn run(&self) -> Result<QueryReport> {
        let start = Instant::now();

        let bindings = self
            .client
            .list_bindings(&self.options.scope)
            .await
            .map_err(|err| match err {
                PrivilegeError::SourceUnavailable(_) => err,
                other => PrivilegeError::SourceUnavailable(other.to_string()),
            })?;

        debug!(
            "Scanning {} bindings for {} subjects ({} unusable patterns)",
            bindings.len(),
            self.subjects.len(),
            self.matchers.iter().filter(|m| !m.is_valid()).count()
        );

        let mut diagnostics = self.pattern_diagnostics.clone();
        let engine = MatchEngine::new(self.client.as_ref(), self.options.lookup_concurrency);
        let hits = engine
            .collect_hits(&bindings, &self.matchers, &mut diagnostics)
            .await;
        let results = aggregate(hits, &self.subjects);

        info!(
            "Privilege query: {} subjects, {} matched, {} diagnostics in {:?}",
            results.len(),
            results.iter().filter(|r| r.is_matched()).count(),
            diagnostics.len(),
            start.elapsed()
        );

        Ok(QueryReport {
            results,
            diagnostics,
        })
    }

    /// Run the query and encode the result in the selected format
    pub async fn execute(&self) -> Result<QueryOutput> {
        let report = self.run().await?;
        let body = self.format.encode(&report.results)?;

        Ok(QueryOutput {
            body,
            format: self.format,
            diagnostics: report.diagnostics,
        })
    }
}

/// Resolve `patterns` against `client` and encode the result per `format`
pub async fn execute<I, S>(client: Arc<dyn RbacClient>, patterns: I, format: &str) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let query = Query::new(client, patterns, format)?;
    Ok(query.execute().await?.body)
}
