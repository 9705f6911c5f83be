//! Result aggregation

use crate::engine::Hit;
use crate::types::{ClusterRole, Role};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Grants bound to one requested subject pattern
///
/// `None` lists mean the pattern had no hit of that kind; they serialize as
/// explicit nulls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectRoles {
    pub subject: String,

    pub roles: Option<Vec<Role>>,

    #[serde(rename = "clusterroles")]
    pub cluster_roles: Option<Vec<ClusterRole>>,
}

impl SubjectRoles {
    /// Record for a pattern with no hit
    pub fn unmatched(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            roles: None,
            cluster_roles: None,
        }
    }

    fn from_hit(subject: impl Into<String>, hit: Hit) -> Self {
        Self {
            subject: subject.into(),
            roles: non_empty(hit.roles),
            cluster_roles: non_empty(hit.cluster_roles),
        }
    }

    pub fn is_matched(&self) -> bool {
        self.roles.is_some() || self.cluster_roles.is_some()
    }
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

/// One record per distinct pattern, sorted by pattern
pub fn aggregate(mut hits: HashMap<String, Hit>, patterns: &[String]) -> Vec<SubjectRoles> {
    let mut subjects: Vec<&str> = patterns.iter().map(String::as_str).collect();
    subjects.sort_unstable();
    subjects.dedup();

    subjects
        .into_iter()
        .map(|subject| match hits.remove(subject) {
            Some(hit) => SubjectRoles::from_hit(subject, hit),
            None => SubjectRoles::unmatched(subject),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterns(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_sorted_and_deduplicated() {
        let results = aggregate(HashMap::new(), &patterns(&["zed", "alice", "zed", "bob"]));
        let subjects: Vec<_> = results.iter().map(|r| r.subject.as_str()).collect();
        assert_eq!(subjects, vec!["alice", "bob", "zed"]);
        assert!(results.iter().all(|r| !r.is_matched()));
    }

    #[test]
    fn test_hit_lists_become_absent_when_empty() {
        let mut hits = HashMap::new();
        hits.insert(
            "developer".to_string(),
            Hit {
                roles: vec![Role::new("default", "editor")],
                cluster_roles: Vec::new(),
            },
        );

        let results = aggregate(hits, &patterns(&["developer"]));
        assert_eq!(results[0].roles.as_ref().map(Vec::len), Some(1));
        assert!(results[0].cluster_roles.is_none());
    }

    #[test]
    fn test_empty_pattern_list() {
        assert!(aggregate(HashMap::new(), &[]).is_empty());
    }

    #[test]
    fn test_unmatched_serializes_explicit_nulls() {
        let json = serde_json::to_string(&SubjectRoles::unmatched("unknown")).unwrap();
        assert_eq!(json, r#"{"subject":"unknown","roles":null,"clusterroles":null}"#);
    }
}
