//! Name resolution against a layout: objects, groups, behaviors and the
//! expressions they expose.

use crate::metadata::{ExpressionMetadata, MetadataProvider, ValueKind};
use crate::project::{Layout, ObjectDecl, ObjectGroup, Project};

/// What the expression parser needs to resolve function calls.
pub trait ExpressionLookup {
    /// Whether `name` is an object or a group.
    fn has_object(&self, name: &str) -> bool;
    /// Whether `object` (every member, for a group) has `behavior`.
    fn object_has_behavior(&self, object: &str, behavior: &str) -> bool;
    fn free_expression(&self, kind: ValueKind, name: &str) -> Option<&ExpressionMetadata>;
    fn object_expression(
        &self,
        kind: ValueKind,
        object: &str,
        name: &str,
    ) -> Option<&ExpressionMetadata>;
    fn behavior_expression(
        &self,
        kind: ValueKind,
        object: &str,
        behavior: &str,
        name: &str,
    ) -> Option<&ExpressionMetadata>;
}

/// A layout seen together with the project-wide objects and the metadata
/// catalog. Layout declarations shadow project ones.
#[derive(Clone, Copy)]
pub struct LayoutScope<'a> {
    project: &'a Project,
    layout: &'a Layout,
    metadata: &'a dyn MetadataProvider,
}

impl<'a> LayoutScope<'a> {
    pub fn new(project: &'a Project, layout: &'a Layout, metadata: &'a dyn MetadataProvider) -> Self {
        Self {
            project,
            layout,
            metadata,
        }
    }

    pub fn project(&self) -> &'a Project {
        self.project
    }

    pub fn layout(&self) -> &'a Layout {
        self.layout
    }

    pub fn metadata(&self) -> &'a dyn MetadataProvider {
        self.metadata
    }

    pub fn object(&self, name: &str) -> Option<&'a ObjectDecl> {
        self.layout
            .objects
            .iter()
            .chain(self.project.objects.iter())
            .find(|o| o.name == name)
    }

    pub fn group(&self, name: &str) -> Option<&'a ObjectGroup> {
        self.layout
            .groups
            .iter()
            .chain(self.project.groups.iter())
            .find(|g| g.name == name)
    }

    pub fn has_object_or_group(&self, name: &str) -> bool {
        self.object(name).is_some() || self.group(name).is_some()
    }

    /// Type of an object, or the common type of a group's members.
    /// Empty when unknown or when the members disagree.
    pub fn object_type(&self, name: &str) -> String {
        if let Some(object) = self.object(name) {
            return object.object_type.clone();
        }
        let Some(group) = self.group(name) else {
            return String::new();
        };
        let mut types = group
            .objects
            .iter()
            .filter_map(|member| self.object(member))
            .map(|o| o.object_type.as_str());
        match types.next() {
            Some(first) if types.all(|t| t == first) => first.to_string(),
            _ => String::new(),
        }
    }

    /// Type of the behavior named `behavior` on any object of the scope.
    pub fn behavior_type(&self, behavior: &str) -> String {
        self.layout
            .objects
            .iter()
            .chain(self.project.objects.iter())
            .find_map(|o| o.behavior(behavior))
            .map(|b| b.behavior_type.clone())
            .unwrap_or_default()
    }

    /// Objects a name stands for: the members of a group, or the name
    /// itself. The current object is never expanded.
    pub fn expand_object_name(&self, name: &str, current_object: Option<&str>) -> Vec<String> {
        if current_object == Some(name) {
            return vec![name.to_string()];
        }
        match self.group(name) {
            Some(group) if self.object(name).is_none() => group
                .objects
                .iter()
                .filter(|member| self.object(member).is_some())
                .cloned()
                .collect(),
            _ => vec![name.to_string()],
        }
    }

    /// Every object name of the scope, layout first, without duplicates.
    pub fn all_object_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for object in self.layout.objects.iter().chain(self.project.objects.iter()) {
            if !names.contains(&object.name) {
                names.push(object.name.clone());
            }
        }
        names
    }
}

impl ExpressionLookup for LayoutScope<'_> {
    fn has_object(&self, name: &str) -> bool {
        self.has_object_or_group(name)
    }

    fn object_has_behavior(&self, object: &str, behavior: &str) -> bool {
        if let Some(decl) = self.object(object) {
            return decl.behavior(behavior).is_some();
        }
        match self.group(object) {
            Some(group) if !group.objects.is_empty() => group.objects.iter().all(|member| {
                self.object(member)
                    .is_some_and(|o| o.behavior(behavior).is_some())
            }),
            _ => false,
        }
    }

    fn free_expression(&self, kind: ValueKind, name: &str) -> Option<&ExpressionMetadata> {
        self.metadata.free_expression(kind, name)
    }

    fn object_expression(
        &self,
        kind: ValueKind,
        object: &str,
        name: &str,
    ) -> Option<&ExpressionMetadata> {
        self.metadata
            .object_expression(kind, &self.object_type(object), name)
    }

    fn behavior_expression(
        &self,
        kind: ValueKind,
        _object: &str,
        behavior: &str,
        name: &str,
    ) -> Option<&ExpressionMetadata> {
        self.metadata
            .behavior_expression(kind, &self.behavior_type(behavior), name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::MetadataRegistry;
    use crate::project::ObjectDecl;

    fn project() -> Project {
        let mut project = Project::new("Game");
        project.objects.push(ObjectDecl::new("Hud", "Text"));
        let mut layout = Layout::new("Level");
        layout.objects.push(
            ObjectDecl::new("Player", "Sprite").with_behavior("Physics", "PhysicsBehavior"),
        );
        layout.objects.push(
            ObjectDecl::new("Enemy", "Sprite").with_behavior("Physics", "PhysicsBehavior"),
        );
        layout.objects.push(ObjectDecl::new("Coin", "Sprite"));
        layout
            .groups
            .push(ObjectGroup::new("Characters", ["Player", "Enemy"]));
        layout
            .groups
            .push(ObjectGroup::new("Mixed", ["Player", "Hud", "Ghost"]));
        project.layouts.push(layout);
        project
    }

    #[test]
    fn test_object_and_group_types() {
        let project = project();
        let registry = MetadataRegistry::new();
        let scope = LayoutScope::new(&project, &project.layouts[0], &registry);
        assert_eq!(scope.object_type("Player"), "Sprite");
        assert_eq!(scope.object_type("Hud"), "Text");
        assert_eq!(scope.object_type("Characters"), "Sprite");
        assert_eq!(scope.object_type("Mixed"), "");
        assert_eq!(scope.object_type("Nobody"), "");
    }

    #[test]
    fn test_expand_group_skips_missing_members() {
        let project = project();
        let registry = MetadataRegistry::new();
        let scope = LayoutScope::new(&project, &project.layouts[0], &registry);
        assert_eq!(scope.expand_object_name("Mixed", None), vec!["Player", "Hud"]);
        assert_eq!(
            scope.expand_object_name("Characters", Some("Characters")),
            vec!["Characters"]
        );
        assert_eq!(scope.expand_object_name("Coin", None), vec!["Coin"]);
    }

    #[test]
    fn test_behaviors() {
        let project = project();
        let registry = MetadataRegistry::new();
        let scope = LayoutScope::new(&project, &project.layouts[0], &registry);
        assert!(scope.object_has_behavior("Player", "Physics"));
        assert!(scope.object_has_behavior("Characters", "Physics"));
        assert!(!scope.object_has_behavior("Coin", "Physics"));
        assert!(!scope.object_has_behavior("Mixed", "Physics"));
        assert_eq!(scope.behavior_type("Physics"), "PhysicsBehavior");
    }

    #[test]
    fn test_all_object_names() {
        let project = project();
        let registry = MetadataRegistry::new();
        let scope = LayoutScope::new(&project, &project.layouts[0], &registry);
        assert_eq!(
            scope.all_object_names(),
            vec!["Player", "Enemy", "Coin", "Hud"]
        );
    }
}
