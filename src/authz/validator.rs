use serde::Serialize;

use crate::authz::principal::Principal;
use crate::authz::types::PolicyDocument;

pub const ROLE_PREFIX: &str = "roles/";
pub const CUSTOM_ROLE_PREFIX: &str = "roles/custom.";
const MIN_PERMISSION_SEGMENTS: usize = 3;

/// Outcome of a full validation pass. `valid` is true iff `errors` is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, msg: impl Into<String>) {
        self.valid = false;
        self.errors.push(msg.into());
    }
}

/// Check a permission string: at least three dot-separated segments, none
/// empty and none a wildcard.
pub fn validate_permission(permission: &str) -> Result<(), String> {
    let segments: Vec<&str> = permission.split('.').collect();
    if segments.len() < MIN_PERMISSION_SEGMENTS {
        return Err(format!(
            "invalid permission `{permission}`: expected service.resource.verb (at least {MIN_PERMISSION_SEGMENTS} segments, got {})",
            segments.len()
        ));
    }
    if segments.iter().any(|s| s.is_empty()) {
        return Err(format!(
            "invalid permission `{permission}`: empty segment"
        ));
    }
    if segments.iter().any(|s| *s == "*") {
        return Err(format!(
            "invalid permission `{permission}`: wildcards are not allowed"
        ));
    }
    Ok(())
}

/// Check a role name: `roles/` followed by a non-empty name.
pub fn validate_role_name(role: &str) -> Result<(), String> {
    match role.strip_prefix(ROLE_PREFIX) {
        Some(rest) if !rest.is_empty() => Ok(()),
        Some(_) => Err(format!("invalid role name `{role}`: empty name after `{ROLE_PREFIX}`")),
        None => Err(format!("invalid role name `{role}`: must start with `{ROLE_PREFIX}`")),
    }
}

/// Validate the structure of a policy document.
///
/// Every check runs to completion; the result lists every defect found.
pub fn validate(doc: &PolicyDocument) -> ValidationResult {
    let mut result = ValidationResult::new();

    check_not_empty(doc, &mut result);
    check_permissions(doc, &mut result);
    check_role_names(doc, &mut result);
    check_custom_role_references(doc, &mut result);
    check_members(doc, &mut result);
    check_conditions(doc, &mut result);

    tracing::debug!(
        valid = result.valid,
        errors = result.errors.len(),
        "Validated policy document"
    );

    result
}

fn check_not_empty(doc: &PolicyDocument, result: &mut ValidationResult) {
    if doc.is_empty() {
        result.add_error("policy must define at least one of roles, groups, or projects");
    }
}

fn check_permissions(doc: &PolicyDocument, result: &mut ValidationResult) {
    for (name, role) in &doc.roles {
        for perm in &role.permissions {
            if let Err(e) = validate_permission(perm) {
                result.add_error(format!("role `{name}`: {e}"));
            }
        }
    }
}

fn check_role_names(doc: &PolicyDocument, result: &mut ValidationResult) {
    for name in doc.roles.keys() {
        if let Err(e) = validate_role_name(name) {
            result.add_error(e);
        }
    }

    for (project, binding) in doc.bindings() {
        if binding.role.is_empty() {
            result.add_error(format!("project `{project}`: binding has an empty role"));
        } else if references_custom_namespace(&binding.role) {
            if let Err(e) = validate_role_name(&binding.role) {
                result.add_error(format!("project `{project}`: {e}"));
            }
        }
    }
}

fn check_custom_role_references(doc: &PolicyDocument, result: &mut ValidationResult) {
    for (project, binding) in doc.bindings() {
        // built-in roles resolve at the authority
        if binding.role.starts_with(CUSTOM_ROLE_PREFIX) && !doc.roles.contains_key(&binding.role) {
            result.add_error(format!(
                "project `{project}`: binding references undefined custom role `{}`",
                binding.role
            ));
        }
    }
}

fn check_members(doc: &PolicyDocument, result: &mut ValidationResult) {
    for (group, g) in &doc.groups {
        for member in &g.members {
            check_member(doc, &format!("group `{group}`"), member, result);
        }
    }

    for (project, binding) in doc.bindings() {
        let context = format!("project `{project}` binding `{}`", binding.role);
        for member in &binding.members {
            check_member(doc, &context, member, result);
        }
    }
}

fn check_member(doc: &PolicyDocument, context: &str, member: &str, result: &mut ValidationResult) {
    match Principal::parse(member) {
        None => result.add_error(format!(
            "{context}: invalid member `{member}` (expected user:, serviceAccount:, group:, allUsers, or allAuthenticatedUsers)"
        )),
        Some(principal) => {
            if let Some(name) = principal.group_name() {
                if !doc.groups.contains_key(name) {
                    result.add_error(format!(
                        "{context}: member `{member}` references undefined group `{name}`"
                    ));
                }
            }
        }
    }
}

fn check_conditions(doc: &PolicyDocument, result: &mut ValidationResult) {
    for (project, binding) in doc.bindings() {
        if let Some(cond) = &binding.condition {
            if cond.expression.trim().is_empty() {
                result.add_error(format!(
                    "project `{project}` binding `{}`: condition expression must not be empty",
                    binding.role
                ));
            }
        }
    }
}

/// "roles/custom.x" and the prefix-less "custom.x" both name a custom role.
fn references_custom_namespace(role: &str) -> bool {
    role.starts_with(CUSTOM_ROLE_PREFIX) || role.starts_with("custom.")
}
