//! Match engine
//!
//! Scans binding records for subjects matching the requested patterns and
//! accumulates the bound grants per pattern.
//!
//! Matching runs in three passes:
//!
//! 1. every binding subject is tested against every pattern, recording an
//!    ordered `(pattern, grant)` match for each hit;
//! 2. the distinct grant references are resolved through the fetcher with a
//!    bounded number of lookups in flight;
//! 3. the matches are replayed in binding order to build each pattern's
//!    [`Hit`], so fetch completion order never shows in the output.

use crate::diagnostic::Diagnostic;
use crate::pattern::SubjectMatcher;
use crate::source::RbacClient;
use crate::types::{ClusterRole, GrantKind, GrantRef, LookupFailure, Role, RoleBinding, RoleRef};
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Grants matched by one pattern, in binding-iteration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hit {
    pub roles: Vec<Role>,
    pub cluster_roles: Vec<ClusterRole>,
}

/// A resolved grant object
#[derive(Debug, Clone)]
enum Grant {
    Role(Role),
    ClusterRole(ClusterRole),
}

/// One subject/pattern match awaiting its grant
struct PendingMatch {
    matcher: usize,
    grant: GrantRef,
}

/// Binding scanner bound to a grant fetcher
pub struct MatchEngine<'a> {
    client: &'a dyn RbacClient,
    lookup_concurrency: usize,
}

impl<'a> MatchEngine<'a> {
    /// Create an engine allowing `lookup_concurrency` grant lookups in flight
    pub fn new(client: &'a dyn RbacClient, lookup_concurrency: usize) -> Self {
        Self {
            client,
            lookup_concurrency: lookup_concurrency.max(1),
        }
    }

    /// Map each matching pattern to its hit
    ///
    /// Patterns that matched nothing, or whose matches all failed to
    /// resolve, have no entry. Unresolvable grants are reported through
    /// `diagnostics`.
    pub async fn collect_hits(
        &self,
        bindings: &[RoleBinding],
        matchers: &[SubjectMatcher],
        diagnostics: &mut Vec<Diagnostic>,
    ) -> HashMap<String, Hit> {
        let mut pending = Vec::new();
        // First referencing binding per grant, in discovery order
        let mut referrers: Vec<(GrantRef, &RoleBinding)> = Vec::new();
        let mut seen: HashSet<GrantRef> = HashSet::new();
        let mut rejected: HashSet<String> = HashSet::new();

        for binding in bindings {
            for subject in &binding.subjects {
                for (index, matcher) in matchers.iter().enumerate() {
                    if !matcher.matches(&subject.name) {
                        continue;
                    }

                    debug!(
                        "Subject '{}' in binding {} matches '{}'",
                        subject.name,
                        binding.qualified_name(),
                        matcher.pattern()
                    );

                    match binding.grant_ref() {
                        Ok(grant) => {
                            if seen.insert(grant.clone()) {
                                referrers.push((grant.clone(), binding));
                            }
                            pending.push(PendingMatch {
                                matcher: index,
                                grant,
                            });
                        }
                        Err(cause) => {
                            if rejected.insert(binding.qualified_name()) {
                                lookup_failed(diagnostics, binding, binding.role_ref.clone(), cause);
                            }
                        }
                    }
                }
            }
        }

        let grants: Vec<GrantRef> = referrers.iter().map(|(grant, _)| grant.clone()).collect();
        let resolved = self.resolve(grants.into_iter()).await;

        for (grant, binding) in &referrers {
            if let Some(Err(cause)) = resolved.get(grant) {
                lookup_failed(diagnostics, binding, binding.role_ref.clone(), cause.clone());
            }
        }

        let mut hits: HashMap<String, Hit> = HashMap::new();
        for PendingMatch { matcher, grant } in pending {
            let Some(Ok(object)) = resolved.get(&grant) else {
                continue;
            };

            let hit = hits.entry(matchers[matcher].pattern().to_string()).or_default();
            match object {
                Grant::Role(role) => hit.roles.push(role.clone()),
                Grant::ClusterRole(role) => hit.cluster_roles.push(role.clone()),
            }
        }

        debug!(
            "Matched {} of {} patterns across {} bindings",
            hits.len(),
            matchers.len(),
            bindings.len()
        );

        hits
    }

    /// Fetch each distinct grant once
    async fn resolve(
        &self,
        grants: impl Iterator<Item = GrantRef>,
    ) -> HashMap<GrantRef, std::result::Result<Grant, LookupFailure>> {
        let client = self.client;

        stream::iter(grants.map(move |grant| async move {
            let resolved = fetch_grant(client, &grant).await;
            (grant, resolved)
        }))
        .buffer_unordered(self.lookup_concurrency)
        .collect()
        .await
    }
}

async fn fetch_grant(
    client: &dyn RbacClient,
    grant: &GrantRef,
) -> std::result::Result<Grant, LookupFailure> {
    match grant.kind {
        GrantKind::Role => {
            let namespace = grant
                .namespace
                .as_deref()
                .ok_or(LookupFailure::MissingNamespace)?;
            client
                .get_role(namespace, &grant.name)
                .await
                .map_err(|e| LookupFailure::Fetch(e.to_string()))?
                .map(Grant::Role)
                .ok_or(LookupFailure::NotFound)
        }
        GrantKind::ClusterRole => client
            .get_cluster_role(&grant.name)
            .await
            .map_err(|e| LookupFailure::Fetch(e.to_string()))?
            .map(Grant::ClusterRole)
            .ok_or(LookupFailure::NotFound),
    }
}

fn lookup_failed(
    diagnostics: &mut Vec<Diagnostic>,
    binding: &RoleBinding,
    role_ref: RoleRef,
    cause: LookupFailure,
) {
    Diagnostic::GrantLookupFailed {
        binding: binding.qualified_name(),
        role_ref,
        cause,
    }
    .record(diagnostics);
}
