//! RBAC manifest import
//!
//! Loads `Role`, `ClusterRole`, `RoleBinding` and `ClusterRoleBinding`
//! objects from JSON or YAML into an [`InMemoryRbacClient`]. Accepts single
//! objects, multi-document YAML streams, and `List` wrappers (as written by
//! `kubectl get -o yaml`). Objects of other kinds are skipped.

use crate::error::{PrivilegeError, Result};
use crate::source::InMemoryRbacClient;
use crate::types::{ClusterRole, Role, RoleBinding};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File extensions picked up by [`import_dir`]
const MANIFEST_EXTENSIONS: &[&str] = &["json", "yaml", "yml"];

/// Namespace assumed for namespaced objects that omit one
const DEFAULT_NAMESPACE: &str = "default";

/// Counts of imported objects
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub roles: usize,
    pub cluster_roles: usize,
    pub bindings: usize,
    pub skipped: usize,
}

impl ImportSummary {
    fn merge(&mut self, other: ImportSummary) {
        self.roles += other.roles;
        self.cluster_roles += other.cluster_roles;
        self.bindings += other.bindings;
        self.skipped += other.skipped;
    }

    pub fn total(&self) -> usize {
        self.roles + self.cluster_roles + self.bindings
    }
}

/// Import every object in `text`
pub async fn import_str(client: &InMemoryRbacClient, text: &str) -> Result<ImportSummary> {
    let mut objects = Vec::new();
    for document in parse_documents(text)? {
        flatten(document, None, &mut objects)?;
    }

    let mut summary = ImportSummary::default();
    for (kind, object) in objects {
        import_object(client, &kind, object, &mut summary).await?;
    }
    Ok(summary)
}

/// Import every object in one manifest file
pub async fn import_file(client: &InMemoryRbacClient, path: impl AsRef<Path>) -> Result<ImportSummary> {
    let path = path.as_ref();
    let text = tokio::fs::read_to_string(path).await?;
    import_str(client, &text)
        .await
        .map_err(|e| PrivilegeError::Manifest(format!("{}: {}", path.display(), e)))
}

/// Import every manifest file of a directory, in file-name order
pub async fn import_dir(client: &InMemoryRbacClient, dir: impl AsRef<Path>) -> Result<ImportSummary> {
    let dir = dir.as_ref();
    let mut paths: Vec<PathBuf> = Vec::new();

    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_manifest = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| MANIFEST_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false);

        if is_manifest && entry.file_type().await?.is_file() {
            paths.push(path);
        }
    }
    paths.sort();

    let mut summary = ImportSummary::default();
    for path in &paths {
        let imported = import_file(client, path).await?;
        debug!("Imported {} RBAC objects from {}", imported.total(), path.display());
        summary.merge(imported);
    }

    info!(
        "Loaded {} roles, {} cluster roles, {} bindings from {} ({} files)",
        summary.roles,
        summary.cluster_roles,
        summary.bindings,
        dir.display(),
        paths.len()
    );

    Ok(summary)
}

/// Build a snapshot from a manifest directory
pub async fn load_dir(dir: impl AsRef<Path>) -> Result<InMemoryRbacClient> {
    let client = InMemoryRbacClient::new();
    import_dir(&client, dir).await?;
    Ok(client)
}

/// Split a JSON or YAML stream into documents
///
/// YAML is a superset of JSON, so both go through the YAML reader.
fn parse_documents(text: &str) -> Result<Vec<Value>> {
    let mut documents = Vec::new();
    for document in serde_yaml::Deserializer::from_str(text) {
        let value = Value::deserialize(document)
            .map_err(|e| PrivilegeError::Manifest(e.to_string()))?;
        if !value.is_null() {
            documents.push(value);
        }
    }
    Ok(documents)
}

/// Unwrap `List` objects into `(kind, object)` pairs
///
/// `implied_kind` comes from a typed wrapper such as `RoleBindingList`,
/// whose items may omit their own kind.
fn flatten(object: Value, implied_kind: Option<&str>, out: &mut Vec<(String, Value)>) -> Result<()> {
    let kind = object
        .get("kind")
        .and_then(Value::as_str)
        .or(implied_kind)
        .unwrap_or_default()
        .to_string();

    let Some(item_kind) = kind.strip_suffix("List").map(str::to_string) else {
        out.push((kind, object));
        return Ok(());
    };

    let item_kind = Some(item_kind.as_str()).filter(|k| !k.is_empty());
    match object.get("items") {
        Some(Value::Array(items)) => {
            for item in items {
                flatten(item.clone(), item_kind, out)?;
            }
            Ok(())
        }
        Some(Value::Null) | None => Ok(()),
        Some(_) => Err(PrivilegeError::Manifest(format!(
            "{} items must be a sequence",
            kind
        ))),
    }
}

async fn import_object(
    client: &InMemoryRbacClient,
    kind: &str,
    object: Value,
    summary: &mut ImportSummary,
) -> Result<()> {
    match kind {
        "Role" => {
            let mut role: Role = decode(object, kind)?;
            role.metadata
                .namespace
                .get_or_insert_with(|| DEFAULT_NAMESPACE.to_string());
            client.insert_role(role).await;
            summary.roles += 1;
        }
        "ClusterRole" => {
            let mut role: ClusterRole = decode(object, kind)?;
            role.metadata.namespace = None;
            client.insert_cluster_role(role).await;
            summary.cluster_roles += 1;
        }
        "RoleBinding" => {
            let mut binding: RoleBinding = decode(object, kind)?;
            binding
                .metadata
                .namespace
                .get_or_insert_with(|| DEFAULT_NAMESPACE.to_string());
            client.insert_binding(binding).await;
            summary.bindings += 1;
        }
        "ClusterRoleBinding" => {
            let mut binding: RoleBinding = decode(object, kind)?;
            binding.metadata.namespace = None;
            client.insert_binding(binding).await;
            summary.bindings += 1;
        }
        other => {
            debug!("Skipping manifest object of kind '{}'", other);
            summary.skipped += 1;
        }
    }

    Ok(())
}

fn decode<T: DeserializeOwned>(object: Value, kind: &str) -> Result<T> {
    serde_json::from_value(object).map_err(|e| PrivilegeError::Manifest(format!("{}: {}", kind, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{BindingScope, BindingSource, GrantFetcher};

    const MULTI_DOC: &str = r#"
apiVersion: rbac.authorization.k8s.io/v1
kind: Role
metadata:
  name: editor
rules:
  - apiGroups: [""]
    resources: ["pods"]
    verbs: ["get", "update"]
---
apiVersion: rbac.authorization.k8s.io/v1
kind: ClusterRoleBinding
metadata:
  name: ops-admin
subjects:
  - kind: Group
    name: ops
    apiGroup: rbac.authorization.k8s.io
roleRef:
  kind: ClusterRole
  name: cluster-admin
  apiGroup: rbac.authorization.k8s.io
---
apiVersion: v1
kind: ServiceAccount
metadata:
  name: builder
"#;

    #[tokio::test]
    async fn test_import_multi_document_yaml() {
        let client = InMemoryRbacClient::new();
        let summary = import_str(&client, MULTI_DOC).await.unwrap();

        assert_eq!(
            summary,
            ImportSummary {
                roles: 1,
                cluster_roles: 0,
                bindings: 1,
                skipped: 1,
            }
        );
        assert!(client.get_role("default", "editor").await.unwrap().is_some());

        let bindings = client.list_bindings(&BindingScope::AllNamespaces).await.unwrap();
        assert!(bindings[0].is_cluster_scoped());
    }

    #[tokio::test]
    async fn test_import_typed_list() {
        let json = r#"{
            "apiVersion": "rbac.authorization.k8s.io/v1",
            "kind": "ClusterRoleList",
            "items": [
                {"metadata": {"name": "view"}, "rules": []},
                {"metadata": {"name": "edit"}, "rules": []}
            ]
        }"#;

        let client = InMemoryRbacClient::new();
        let summary = import_str(&client, json).await.unwrap();

        assert_eq!(summary.cluster_roles, 2);
        assert!(client.get_cluster_role("edit").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_null_lists_decode_as_empty() {
        let yaml = r#"
apiVersion: rbac.authorization.k8s.io/v1
kind: ClusterRole
metadata:
  name: aggregate-view
aggregationRule:
  clusterRoleSelectors:
    - matchLabels:
        rbac.example.com/aggregate-to-view: "true"
rules:
---
apiVersion: rbac.authorization.k8s.io/v1
kind: Role
metadata:
  name: empty
rules:
  - verbs: ["get"]
    apiGroups: null
    resources: ["pods"]
---
apiVersion: rbac.authorization.k8s.io/v1
kind: RoleBinding
metadata:
  name: orphaned
subjects: null
roleRef:
  kind: Role
  name: empty
  apiGroup: rbac.authorization.k8s.io
"#;

        let client = InMemoryRbacClient::new();
        let summary = import_str(&client, yaml).await.unwrap();
        assert_eq!(summary.total(), 3);

        let aggregated = client.get_cluster_role("aggregate-view").await.unwrap().unwrap();
        assert!(aggregated.rules.is_empty());

        let role = client.get_role("default", "empty").await.unwrap().unwrap();
        assert!(role.rules[0].api_groups.is_empty());

        let bindings = client.list_bindings(&BindingScope::AllNamespaces).await.unwrap();
        assert!(bindings[0].subjects.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_object_fails() {
        let client = InMemoryRbacClient::new();
        let result = import_str(&client, "kind: RoleBinding\nmetadata: {name: x}\n").await;
        assert!(matches!(result, Err(PrivilegeError::Manifest(_))));
    }

    #[tokio::test]
    async fn test_import_dir_ignores_other_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("01-role.yaml"), MULTI_DOC).unwrap();
        std::fs::write(dir.path().join("README.md"), "# not a manifest").unwrap();

        let client = InMemoryRbacClient::new();
        let summary = import_dir(&client, dir.path()).await.unwrap();

        assert_eq!(summary.total(), 2);
        assert_eq!(client.binding_count().await, 1);
    }
}
