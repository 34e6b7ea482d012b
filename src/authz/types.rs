use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// In-memory policy document: custom roles, groups, and per-project bindings.
///
/// Maps are keyed in sorted order so that saved files are deterministic; the
/// sequences inside each entry keep their insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyDocument {
    /// role name (e.g. "roles/custom.developer") -> Role
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub roles: BTreeMap<String, Role>,
    /// group name (e.g. "developers") -> Group
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub groups: BTreeMap<String, Group>,
    /// project id -> Project
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub projects: BTreeMap<String, Project>,
}

impl PolicyDocument {
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty() && self.groups.is_empty() && self.projects.is_empty()
    }

    /// Every binding in the document, paired with the project it belongs to.
    pub fn bindings(&self) -> impl Iterator<Item = (&str, &Binding)> {
        self.projects
            .iter()
            .flat_map(|(id, p)| p.bindings.iter().map(move |b| (id.as_str(), b)))
    }

    pub fn binding_count(&self) -> usize {
        self.projects.values().map(|p| p.bindings.len()).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Role {
    /// Permissions like "secretmanager.secrets.get"
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Group {
    /// Principals like "user:alice@example.com" or "group:admins"
    #[serde(default)]
    pub members: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Project {
    #[serde(default)]
    pub bindings: Vec<Binding>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Binding {
    /// Built-in ("roles/owner") or custom ("roles/custom.ciRunner") role
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
}

/// CEL-style restriction on a binding. Evaluated by the authority, never locally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Condition {
    #[serde(default)]
    pub expression: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// ---------- API request/response types ----------

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckRequest {
    /// e.g. "projects/test-project/secrets/db-password"
    pub resource: String,
    /// e.g. "secretmanager.secrets.get"
    pub permission: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckResponse {
    pub allowed: bool,
    /// "ALLOW", "PERMISSION_DENIED", or "UNAVAILABLE"
    pub outcome: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Body of the authority's `:testIamPermissions` call.
#[derive(Debug, Serialize, Deserialize)]
pub struct TestIamPermissionsRequest {
    pub permissions: Vec<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TestIamPermissionsResponse {
    /// Subset of the requested permissions that the principal holds
    #[serde(default)]
    pub permissions: Vec<String>,
}
