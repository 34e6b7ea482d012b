use emulator_authz::authz::types::{Binding, Condition, Group, PolicyDocument, Project, Role};

/// Builder for test policy documents
#[derive(Default)]
pub struct PolicyBuilder {
    doc: PolicyDocument,
}

impl PolicyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn role(mut self, name: &str, permissions: &[&str]) -> Self {
        self.doc.roles.insert(
            name.to_string(),
            Role {
                permissions: permissions.iter().map(|p| p.to_string()).collect(),
            },
        );
        self
    }

    pub fn group(mut self, name: &str, members: &[&str]) -> Self {
        self.doc.groups.insert(
            name.to_string(),
            Group {
                members: members.iter().map(|m| m.to_string()).collect(),
            },
        );
        self
    }

    pub fn binding(self, project: &str, role: &str, members: &[&str]) -> Self {
        self.push_binding(project, role, members, None)
    }

    pub fn conditional_binding(
        self,
        project: &str,
        role: &str,
        members: &[&str],
        expression: &str,
    ) -> Self {
        let condition = Condition {
            expression: expression.to_string(),
            title: Some("conditional".to_string()),
            description: None,
        };
        self.push_binding(project, role, members, Some(condition))
    }

    fn push_binding(
        mut self,
        project: &str,
        role: &str,
        members: &[&str],
        condition: Option<Condition>,
    ) -> Self {
        self.doc
            .projects
            .entry(project.to_string())
            .or_insert_with(Project::default)
            .bindings
            .push(Binding {
                role: role.to_string(),
                members: members.iter().map(|m| m.to_string()).collect(),
                condition,
            });
        self
    }

    pub fn build(self) -> PolicyDocument {
        self.doc
    }
}
