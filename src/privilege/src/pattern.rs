//! Subject pattern matching

use crate::error::{PrivilegeError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How requested subjects are compared against binding subjects
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Unanchored regular-expression search (`dev` matches `developer`)
    #[default]
    Pattern,
    /// Full-string equality
    Exact,
}

impl FromStr for MatchMode {
    type Err = PrivilegeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pattern" | "regex" => Ok(MatchMode::Pattern),
            "exact" => Ok(MatchMode::Exact),
            other => Err(PrivilegeError::InvalidQuery(format!(
                "unknown match mode '{}'",
                other
            ))),
        }
    }
}

/// A requested subject compiled for matching
#[derive(Debug, Clone)]
pub struct SubjectMatcher {
    pattern: String,
    kind: MatcherKind,
}

#[derive(Debug, Clone)]
enum MatcherKind {
    Regex(Regex),
    Exact,
    /// Malformed pattern; matches nothing
    Never,
}

impl SubjectMatcher {
    /// Compile a pattern, failing on malformed regular expressions
    pub fn compile(pattern: &str, mode: MatchMode) -> Result<Self> {
        let kind = match mode {
            MatchMode::Exact => MatcherKind::Exact,
            MatchMode::Pattern => {
                let regex = Regex::new(pattern).map_err(|e| PrivilegeError::InvalidPattern {
                    pattern: pattern.to_string(),
                    reason: e.to_string(),
                })?;
                MatcherKind::Regex(regex)
            }
        };

        Ok(Self {
            pattern: pattern.to_string(),
            kind,
        })
    }

    /// A matcher for a pattern that failed to compile
    pub fn never(pattern: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            kind: MatcherKind::Never,
        }
    }

    /// The pattern as requested
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self.kind, MatcherKind::Never)
    }

    /// Test a binding subject name
    pub fn matches(&self, subject: &str) -> bool {
        match &self.kind {
            MatcherKind::Regex(regex) => regex.is_match(subject),
            MatcherKind::Exact => self.pattern == subject,
            MatcherKind::Never => false,
        }
    }
}
