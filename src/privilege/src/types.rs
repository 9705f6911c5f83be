//! RBAC object model
//!
//! Mirrors the `rbac.authorization.k8s.io/v1` shapes closely enough that
//! manifests exported from a cluster decode directly into these types.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// API group of every RBAC object
pub const RBAC_API_GROUP: &str = "rbac.authorization.k8s.io";

/// Default API version stamped on constructed objects
pub const RBAC_API_VERSION: &str = "rbac.authorization.k8s.io/v1";

/// Decode an explicit `null` list (`rules: null`, bare `rules:`) as empty
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<Vec<T>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Object metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    /// Object name, unique within its namespace
    #[serde(default)]
    pub name: String,

    /// Owning namespace (absent for cluster-scoped objects)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, String>>,

    /// Server-populated fields (`creationTimestamp`, `ownerReferences`, ...)
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ObjectMeta {
    /// Metadata for a namespaced object
    pub fn namespaced(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: Some(namespace.into()),
            ..Default::default()
        }
    }

    /// Metadata for a cluster-scoped object
    pub fn cluster(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// A single permission rule of a role
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyRule {
    /// Permitted verbs (get, list, watch, create, ...)
    #[serde(default, deserialize_with = "null_as_empty")]
    pub verbs: Vec<String>,

    #[serde(default, deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
    pub api_groups: Vec<String>,

    #[serde(default, deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<String>,

    #[serde(default, deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
    pub resource_names: Vec<String>,

    #[serde(
        rename = "nonResourceURLs",
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub non_resource_urls: Vec<String>,
}

impl PolicyRule {
    /// Create a rule granting the given verbs
    pub fn new<I, S>(verbs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            verbs: verbs.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Restrict the rule to API groups
    pub fn with_api_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.api_groups = groups.into_iter().map(Into::into).collect();
        self
    }

    /// Restrict the rule to resources
    pub fn with_resources<I, S>(mut self, resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resources = resources.into_iter().map(Into::into).collect();
        self
    }
}

/// Namespaced grant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    pub metadata: ObjectMeta,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub rules: Vec<PolicyRule>,

    /// Top-level fields outside the `rbac/v1` shape, carried through untouched
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Role {
    /// Create an empty role in a namespace
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            api_version: Some(RBAC_API_VERSION.to_string()),
            kind: Some(GrantKind::Role.as_str().to_string()),
            metadata: ObjectMeta::namespaced(namespace, name),
            rules: Vec::new(),
            extra: BTreeMap::new(),
        }
    }

    /// Append a rule
    pub fn with_rule(mut self, rule: PolicyRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.metadata.namespace.as_deref()
    }
}

/// Cluster-wide grant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterRole {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    pub metadata: ObjectMeta,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub rules: Vec<PolicyRule>,

    /// Label selectors of aggregated roles, carried through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation_rule: Option<Value>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ClusterRole {
    /// Create an empty cluster role
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            api_version: Some(RBAC_API_VERSION.to_string()),
            kind: Some(GrantKind::ClusterRole.as_str().to_string()),
            metadata: ObjectMeta::cluster(name),
            rules: Vec::new(),
            aggregation_rule: None,
            extra: BTreeMap::new(),
        }
    }

    /// Append a rule
    pub fn with_rule(mut self, rule: PolicyRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }
}

/// Identity referenced by a binding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    /// User, Group or ServiceAccount
    pub kind: String,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_group: Option<String>,
}

impl Subject {
    pub fn user(name: impl Into<String>) -> Self {
        Self {
            kind: "User".to_string(),
            name: name.into(),
            namespace: None,
            api_group: Some(RBAC_API_GROUP.to_string()),
        }
    }

    pub fn group(name: impl Into<String>) -> Self {
        Self {
            kind: "Group".to_string(),
            name: name.into(),
            namespace: None,
            api_group: Some(RBAC_API_GROUP.to_string()),
        }
    }

    pub fn service_account(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: "ServiceAccount".to_string(),
            name: name.into(),
            namespace: Some(namespace.into()),
            api_group: None,
        }
    }
}

/// Reference from a binding to the grant it confers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleRef {
    #[serde(default)]
    pub api_group: String,

    /// `Role` or `ClusterRole`
    pub kind: String,

    pub name: String,
}

impl RoleRef {
    pub fn role(name: impl Into<String>) -> Self {
        Self {
            api_group: RBAC_API_GROUP.to_string(),
            kind: GrantKind::Role.as_str().to_string(),
            name: name.into(),
        }
    }

    pub fn cluster_role(name: impl Into<String>) -> Self {
        Self {
            api_group: RBAC_API_GROUP.to_string(),
            kind: GrantKind::ClusterRole.as_str().to_string(),
            name: name.into(),
        }
    }
}

/// Binding record: a set of subjects and the single grant bound to them
///
/// A binding without a namespace is cluster-scoped (the `ClusterRoleBinding`
/// shape is identical to `RoleBinding`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleBinding {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    pub metadata: ObjectMeta,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub subjects: Vec<Subject>,

    pub role_ref: RoleRef,
}

impl RoleBinding {
    /// Create a namespaced binding
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, role_ref: RoleRef) -> Self {
        Self {
            api_version: Some(RBAC_API_VERSION.to_string()),
            kind: Some("RoleBinding".to_string()),
            metadata: ObjectMeta::namespaced(namespace, name),
            subjects: Vec::new(),
            role_ref,
        }
    }

    /// Create a cluster-scoped binding
    pub fn cluster(name: impl Into<String>, role_ref: RoleRef) -> Self {
        Self {
            api_version: Some(RBAC_API_VERSION.to_string()),
            kind: Some("ClusterRoleBinding".to_string()),
            metadata: ObjectMeta::cluster(name),
            subjects: Vec::new(),
            role_ref,
        }
    }

    /// Add a subject
    pub fn with_subject(mut self, subject: Subject) -> Self {
        self.subjects.push(subject);
        self
    }

    pub fn namespace(&self) -> Option<&str> {
        self.metadata.namespace.as_deref()
    }

    pub fn is_cluster_scoped(&self) -> bool {
        self.metadata.namespace.is_none()
    }

    /// `namespace/name`, or the bare name for cluster-scoped bindings
    pub fn qualified_name(&self) -> String {
        match self.namespace() {
            Some(ns) => format!("{}/{}", ns, self.metadata.name),
            None => self.metadata.name.clone(),
        }
    }

    /// Resolve the role reference against this binding's own scope
    pub fn grant_ref(&self) -> std::result::Result<GrantRef, LookupFailure> {
        let kind = GrantKind::parse(&self.role_ref.kind)
            .ok_or_else(|| LookupFailure::UnsupportedKind(self.role_ref.kind.clone()))?;

        match kind {
            GrantKind::Role => {
                let namespace = self.namespace().ok_or(LookupFailure::MissingNamespace)?;
                Ok(GrantRef::role(namespace, &self.role_ref.name))
            }
            GrantKind::ClusterRole => Ok(GrantRef::cluster_role(&self.role_ref.name)),
        }
    }
}

/// Kind of grant a binding refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GrantKind {
    Role,
    ClusterRole,
}

impl GrantKind {
    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "Role" => Some(GrantKind::Role),
            "ClusterRole" => Some(GrantKind::ClusterRole),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GrantKind::Role => "Role",
            GrantKind::ClusterRole => "ClusterRole",
        }
    }
}

/// Fully scoped grant reference
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GrantRef {
    pub kind: GrantKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    pub name: String,
}

impl GrantRef {
    pub fn role(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: GrantKind::Role,
            namespace: Some(namespace.into()),
            name: name.into(),
        }
    }

    pub fn cluster_role(name: impl Into<String>) -> Self {
        Self {
            kind: GrantKind::ClusterRole,
            namespace: None,
            name: name.into(),
        }
    }
}

impl fmt::Display for GrantRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{} {}/{}", self.kind.as_str(), ns, self.name),
            None => write!(f, "{} {}", self.kind.as_str(), self.name),
        }
    }
}

/// Why a grant reference contributed nothing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum LookupFailure {
    /// Fetcher reported no such object
    NotFound,
    /// `roleRef.kind` is neither Role nor ClusterRole
    UnsupportedKind(String),
    /// A Role reference on a cluster-scoped binding
    MissingNamespace,
    /// Fetcher returned an error
    Fetch(String),
}

impl fmt::Display for LookupFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupFailure::NotFound => write!(f, "not found"),
            LookupFailure::UnsupportedKind(kind) => write!(f, "unsupported role kind '{}'", kind),
            LookupFailure::MissingNamespace => {
                write!(f, "Role reference on a cluster-scoped binding")
            }
            LookupFailure::Fetch(reason) => write!(f, "fetch error: {}", reason),
        }
    }
}
