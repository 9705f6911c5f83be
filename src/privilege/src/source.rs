//! Binding source and grant fetcher collaborators

use crate::error::Result;
use crate::types::{ClusterRole, Role, RoleBinding};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Namespace scope a query lists bindings from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingScope {
    /// Every namespace
    #[default]
    AllNamespaces,
    /// A single namespace
    Namespace(String),
}

impl BindingScope {
    /// Empty string selects every namespace
    pub fn from_namespace(namespace: &str) -> Self {
        if namespace.is_empty() {
            BindingScope::AllNamespaces
        } else {
            BindingScope::Namespace(namespace.to_string())
        }
    }

    /// Whether a binding in `namespace` is visible from this scope
    ///
    /// Cluster-scoped bindings (`None`) are visible from every scope.
    pub fn contains(&self, namespace: Option<&str>) -> bool {
        match (self, namespace) {
            (_, None) => true,
            (BindingScope::AllNamespaces, Some(_)) => true,
            (BindingScope::Namespace(scope), Some(ns)) => scope == ns,
        }
    }
}

/// Supplies the active binding records of a scope
#[async_trait]
pub trait BindingSource: Send + Sync {
    /// List bindings visible from `scope`, in source order
    async fn list_bindings(&self, scope: &BindingScope) -> Result<Vec<RoleBinding>>;
}

/// Resolves grant references to grant objects
#[async_trait]
pub trait GrantFetcher: Send + Sync {
    /// Get a namespaced role; `Ok(None)` when it does not exist
    async fn get_role(&self, namespace: &str, name: &str) -> Result<Option<Role>>;

    /// Get a cluster role; `Ok(None)` when it does not exist
    async fn get_cluster_role(&self, name: &str) -> Result<Option<ClusterRole>>;
}

/// Combined collaborator capability held by a query
pub trait RbacClient: BindingSource + GrantFetcher {}

impl<T: BindingSource + GrantFetcher + ?Sized> RbacClient for T {}

/// In-memory RBAC snapshot
///
/// Bindings are listed in insertion order.
pub struct InMemoryRbacClient {
    roles: Arc<RwLock<HashMap<(String, String), Role>>>,
    cluster_roles: Arc<RwLock<HashMap<String, ClusterRole>>>,
    bindings: Arc<RwLock<Vec<RoleBinding>>>,
}

impl InMemoryRbacClient {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self {
            roles: Arc::new(RwLock::new(HashMap::new())),
            cluster_roles: Arc::new(RwLock::new(HashMap::new())),
            bindings: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Store a role, replacing one with the same namespace and name
    ///
    /// Roles without a namespace land in `default`.
    pub async fn insert_role(&self, mut role: Role) {
        let namespace = role
            .metadata
            .namespace
            .get_or_insert_with(|| "default".to_string())
            .clone();
        let mut roles = self.roles.write().await;
        roles.insert((namespace, role.metadata.name.clone()), role);
    }

    /// Store a cluster role, replacing one with the same name
    pub async fn insert_cluster_role(&self, role: ClusterRole) {
        let mut cluster_roles = self.cluster_roles.write().await;
        cluster_roles.insert(role.metadata.name.clone(), role);
    }

    /// Store a binding, replacing one with the same namespace and name in place
    pub async fn insert_binding(&self, binding: RoleBinding) {
        let mut bindings = self.bindings.write().await;
        let existing = bindings.iter_mut().find(|b| {
            b.metadata.name == binding.metadata.name
                && b.metadata.namespace == binding.metadata.namespace
        });

        match existing {
            Some(slot) => *slot = binding,
            None => bindings.push(binding),
        }
    }

    pub async fn remove_role(&self, namespace: &str, name: &str) -> Option<Role> {
        let mut roles = self.roles.write().await;
        roles.remove(&(namespace.to_string(), name.to_string()))
    }

    pub async fn remove_cluster_role(&self, name: &str) -> Option<ClusterRole> {
        let mut cluster_roles = self.cluster_roles.write().await;
        cluster_roles.remove(name)
    }

    /// Remove a binding; `namespace` is `None` for cluster-scoped bindings
    pub async fn remove_binding(&self, namespace: Option<&str>, name: &str) -> Option<RoleBinding> {
        let mut bindings = self.bindings.write().await;
        let index = bindings
            .iter()
            .position(|b| b.metadata.name == name && b.namespace() == namespace)?;
        Some(bindings.remove(index))
    }

    pub async fn role_count(&self) -> usize {
        self.roles.read().await.len()
    }

    pub async fn cluster_role_count(&self) -> usize {
        self.cluster_roles.read().await.len()
    }

    pub async fn binding_count(&self) -> usize {
        self.bindings.read().await.len()
    }
}

impl Default for InMemoryRbacClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BindingSource for InMemoryRbacClient {
    async fn list_bindings(&self, scope: &BindingScope) -> Result<Vec<RoleBinding>> {
        let bindings = self.bindings.read().await;
        Ok(bindings
            .iter()
            .filter(|b| scope.contains(b.namespace()))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl GrantFetcher for InMemoryRbacClient {
    async fn get_role(&self, namespace: &str, name: &str) -> Result<Option<Role>> {
        let roles = self.roles.read().await;
        Ok(roles.get(&(namespace.to_string(), name.to_string())).cloned())
    }

    async fn get_cluster_role(&self, name: &str) -> Result<Option<ClusterRole>> {
        let cluster_roles = self.cluster_roles.read().await;
        Ok(cluster_roles.get(name).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RoleRef, Subject};

    #[tokio::test]
    async fn test_list_bindings_respects_scope() {
        let client = InMemoryRbacClient::new();
        client
            .insert_binding(RoleBinding::new("team-a", "a", RoleRef::role("editor")))
            .await;
        client
            .insert_binding(RoleBinding::new("team-b", "b", RoleRef::role("editor")))
            .await;
        client
            .insert_binding(RoleBinding::cluster("c", RoleRef::cluster_role("view")))
            .await;

        let all = client.list_bindings(&BindingScope::AllNamespaces).await.unwrap();
        assert_eq!(all.len(), 3);

        let team_a = client
            .list_bindings(&BindingScope::Namespace("team-a".to_string()))
            .await
            .unwrap();
        let names: Vec<_> = team_a.iter().map(|b| b.metadata.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_insert_binding_replaces_in_place() {
        let client = InMemoryRbacClient::new();
        client
            .insert_binding(RoleBinding::new("default", "first", RoleRef::role("editor")))
            .await;
        client
            .insert_binding(RoleBinding::new("default", "second", RoleRef::role("viewer")))
            .await;
        client
            .insert_binding(
                RoleBinding::new("default", "first", RoleRef::role("admin"))
                    .with_subject(Subject::user("alice")),
            )
            .await;

        let bindings = client.list_bindings(&BindingScope::AllNamespaces).await.unwrap();
        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings[0].metadata.name, "first");
        assert_eq!(bindings[0].role_ref.name, "admin");
    }

    #[tokio::test]
    async fn test_role_without_namespace_lands_in_default() {
        let client = InMemoryRbacClient::new();
        let mut role = Role::new("ignored", "editor");
        role.metadata.namespace = None;
        client.insert_role(role).await;

        let fetched = client.get_role("default", "editor").await.unwrap();
        assert!(fetched.is_some());
        assert_eq!(fetched.unwrap().namespace(), Some("default"));
    }

    #[tokio::test]
    async fn test_missing_grants_are_none() {
        let client = InMemoryRbacClient::new();
        assert!(client.get_role("default", "nope").await.unwrap().is_none());
        assert!(client.get_cluster_role("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_remove_binding() {
        let client = InMemoryRbacClient::new();
        client
            .insert_binding(RoleBinding::cluster("c", RoleRef::cluster_role("view")))
            .await;

        assert!(client.remove_binding(Some("default"), "c").await.is_none());
        assert!(client.remove_binding(None, "c").await.is_some());
        assert_eq!(client.binding_count().await, 0);
    }
}
