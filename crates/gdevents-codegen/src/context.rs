//! Events code-generation context.
//!
//! A context records, for one generated scope, which object lists it must
//! declare and which ones enclosing scopes already declared. Contexts form
//! a chain through `parent` borrows: a child is created only after its
//! parent has finished registering the lists it needs, and is dropped
//! before the parent emits its own declarations.

use std::cell::Cell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use log::warn;

#[derive(Debug)]
pub struct CodegenContext<'p> {
    already_declared: BTreeSet<String>,
    to_declare: BTreeSet<String>,
    to_declare_without_picking: BTreeSet<String>,
    to_declare_empty: BTreeSet<String>,
    /// Lists declared before the async boundary this context descends from.
    async_inherited: BTreeSet<String>,
    last_use_depth: BTreeMap<String, usize>,
    current_object: Option<String>,
    depth: usize,
    custom_condition_depth: usize,
    is_async: bool,
    reuse_forbidden: bool,
    parent: Option<&'p CodegenContext<'p>>,
    max_depth: Rc<Cell<usize>>,
}

impl Default for CodegenContext<'_> {
    fn default() -> Self {
        Self::root()
    }
}

impl<'p> CodegenContext<'p> {
    /// Context of a sheet's root list, at depth 0.
    pub fn root() -> Self {
        Self {
            already_declared: BTreeSet::new(),
            to_declare: BTreeSet::new(),
            to_declare_without_picking: BTreeSet::new(),
            to_declare_empty: BTreeSet::new(),
            async_inherited: BTreeSet::new(),
            last_use_depth: BTreeMap::new(),
            current_object: None,
            depth: 0,
            custom_condition_depth: 0,
            is_async: false,
            reuse_forbidden: false,
            parent: None,
            max_depth: Rc::new(Cell::new(0)),
        }
    }

    fn derive(parent: &'p CodegenContext<'p>, depth: usize) -> Self {
        let mut already_declared = parent.already_declared.clone();
        already_declared.extend(parent.all_to_declare());
        parent.max_depth.set(parent.max_depth.get().max(depth));
        Self {
            already_declared,
            to_declare: BTreeSet::new(),
            to_declare_without_picking: BTreeSet::new(),
            to_declare_empty: BTreeSet::new(),
            async_inherited: parent.async_inherited.clone(),
            last_use_depth: parent.last_use_depth.clone(),
            current_object: None,
            depth,
            custom_condition_depth: parent.custom_condition_depth,
            is_async: parent.is_async,
            reuse_forbidden: false,
            parent: Some(parent),
            max_depth: Rc::clone(&parent.max_depth),
        }
    }

    /// Child scope one level deeper. Every list the parent declares or
    /// inherited becomes already declared.
    pub fn inherit(parent: &'p CodegenContext<'p>) -> Self {
        Self::derive(parent, parent.depth + 1)
    }

    /// Child scope running after a suspension point. Nothing is considered
    /// declared: lists the parent held, or could restore from an earlier
    /// suspension point, are remembered only so they can be captured and
    /// redeclared.
    pub fn async_inherit(parent: &'p CodegenContext<'p>) -> Self {
        let mut ctx = Self::derive(parent, parent.depth + 1);
        let declared = std::mem::take(&mut ctx.already_declared);
        ctx.async_inherited.extend(declared);
        ctx.is_async = true;
        ctx
    }

    /// Like [`inherit`](Self::inherit), but stays at the parent's depth
    /// when the parent allows it.
    pub fn reuse(parent: &'p CodegenContext<'p>) -> Self {
        let depth = if parent.can_reuse() {
            parent.depth
        } else {
            parent.depth + 1
        };
        Self::derive(parent, depth)
    }

    // ── Registration ──────────────────────────────────────────────────────────

    /// The scope picks instances of `name`.
    pub fn objects_list_needed(&mut self, name: &str) {
        if !self.to_declare_empty.contains(name) {
            self.to_declare.insert(name.to_string());
        }
        self.last_use_depth.insert(name.to_string(), self.depth);
    }

    /// The scope fills the list of `name` itself from the enclosing list
    /// without filtering it; empty when nothing encloses it.
    pub fn objects_list_without_picking_needed(&mut self, name: &str) {
        if !self.to_declare_empty.contains(name) && !self.to_declare.contains(name) {
            self.to_declare_without_picking.insert(name.to_string());
        }
        self.last_use_depth.insert(name.to_string(), self.depth);
    }

    /// The scope starts from an empty list of `name`.
    pub fn empty_objects_list_needed(&mut self, name: &str) {
        if !self.to_declare.contains(name) && !self.to_declare_without_picking.contains(name) {
            self.to_declare_empty.insert(name.to_string());
        }
        self.last_use_depth.insert(name.to_string(), self.depth);
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    pub fn to_declare(&self) -> &BTreeSet<String> {
        &self.to_declare
    }

    pub fn to_declare_without_picking(&self) -> &BTreeSet<String> {
        &self.to_declare_without_picking
    }

    pub fn to_declare_empty(&self) -> &BTreeSet<String> {
        &self.to_declare_empty
    }

    /// Union of the three to-declare sets.
    pub fn all_to_declare(&self) -> BTreeSet<String> {
        self.to_declare
            .iter()
            .chain(&self.to_declare_without_picking)
            .chain(&self.to_declare_empty)
            .cloned()
            .collect()
    }

    pub fn already_declared(&self) -> &BTreeSet<String> {
        &self.already_declared
    }

    /// Whether an enclosing scope (on this side of any async boundary)
    /// declared the list of `name`.
    pub fn object_already_declared_by_parents(&self, name: &str) -> bool {
        self.already_declared.contains(name)
    }

    /// Whether the list of `name` must be restored from the lists captured
    /// before the async boundary.
    pub fn is_inheriting_from_async(&self, name: &str) -> bool {
        self.is_async
            && self.async_inherited.contains(name)
            && !self.already_declared.contains(name)
    }

    /// Depth at which the list of `name` was last needed.
    pub fn last_use_depth(&self, name: &str) -> Option<usize> {
        self.last_use_depth.get(name).copied()
    }

    /// Whether both contexts last needed `name` at the same depth, i.e.
    /// refer to the same target-language list.
    pub fn is_same_objects_list(&self, name: &str, other: &CodegenContext<'_>) -> bool {
        match (self.last_use_depth(name), other.last_use_depth(name)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// Depth of the list of `name`, or the scope depth if it was never
    /// needed.
    pub fn list_depth(&self, name: &str) -> usize {
        self.last_use_depth(name).unwrap_or_else(|| {
            warn!("object list of \"{name}\" used before being needed");
            self.depth
        })
    }

    pub fn current_object(&self) -> Option<&str> {
        self.current_object.as_deref()
    }

    /// Set the object whose instances the generated code is iterating.
    pub fn set_current_object(&mut self, object: Option<String>) {
        self.current_object = object;
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Deepest depth reached by this context or any context sharing its
    /// root.
    pub fn max_depth(&self) -> usize {
        self.max_depth.get()
    }

    pub fn parent(&self) -> Option<&'p CodegenContext<'p>> {
        self.parent
    }

    pub fn is_async(&self) -> bool {
        self.is_async
    }

    pub fn can_reuse(&self) -> bool {
        !self.reuse_forbidden && self.parent.is_some()
    }

    pub fn forbid_reuse(&mut self) {
        self.reuse_forbidden = true;
    }

    pub fn custom_condition_depth(&self) -> usize {
        self.custom_condition_depth
    }

    pub fn enter_custom_condition(&mut self) {
        self.custom_condition_depth += 1;
    }

    pub fn leave_custom_condition(&mut self) {
        self.custom_condition_depth = self.custom_condition_depth.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inherit_declares_parent_lists() {
        let root = CodegenContext::root();
        let mut parent = CodegenContext::inherit(&root);
        parent.objects_list_needed("Player");
        parent.objects_list_without_picking_needed("Coin");
        parent.empty_objects_list_needed("Enemy");
        let child = CodegenContext::inherit(&parent);
        for name in ["Player", "Coin", "Enemy"] {
            assert!(child.object_already_declared_by_parents(name));
        }
        assert!(!child.object_already_declared_by_parents("Bullet"));
        assert_eq!(child.depth(), parent.depth() + 1);
    }

    #[test]
    fn test_async_inherit_declares_nothing() {
        let root = CodegenContext::root();
        let mut parent = CodegenContext::inherit(&root);
        parent.objects_list_needed("Player");
        let child = CodegenContext::async_inherit(&parent);
        assert!(!child.object_already_declared_by_parents("Player"));
        assert!(child.is_inheriting_from_async("Player"));
        assert!(!child.is_inheriting_from_async("Coin"));
        assert!(child.is_async());
    }

    #[test]
    fn test_chained_async_inherit_keeps_earlier_lists() {
        let root = CodegenContext::root();
        let mut parent = CodegenContext::inherit(&root);
        parent.objects_list_needed("Player");
        let first = CodegenContext::async_inherit(&parent);
        // The first callback never touches Player before suspending again.
        let second = CodegenContext::async_inherit(&first);
        assert!(second.is_inheriting_from_async("Player"));
        assert!(first.is_inheriting_from_async("Player"));
        assert_eq!(second.depth(), parent.depth() + 2);
    }

    #[test]
    fn test_sub_scope_of_async_scope_copies_its_lists() {
        let root = CodegenContext::root();
        let mut parent = CodegenContext::inherit(&root);
        parent.objects_list_needed("Player");
        let mut callback = CodegenContext::async_inherit(&parent);
        callback.objects_list_needed("Player");
        let nested = CodegenContext::inherit(&callback);
        assert!(nested.is_async());
        assert!(nested.object_already_declared_by_parents("Player"));
        assert!(!nested.is_inheriting_from_async("Player"));
    }

    #[test]
    fn test_reuse_keeps_depth_when_allowed() {
        let root = CodegenContext::root();
        let event = CodegenContext::inherit(&root);
        let actions = CodegenContext::reuse(&event);
        assert_eq!(actions.depth(), event.depth());

        let mut forbidden = CodegenContext::inherit(&root);
        forbidden.forbid_reuse();
        let deeper = CodegenContext::reuse(&forbidden);
        assert_eq!(deeper.depth(), forbidden.depth() + 1);

        // The root has no parent and is never reused.
        assert_eq!(CodegenContext::reuse(&root).depth(), 1);
    }

    #[test]
    fn test_same_objects_list() {
        let root = CodegenContext::root();
        let mut event = CodegenContext::inherit(&root);
        event.objects_list_needed("Player");
        let mut actions = CodegenContext::reuse(&event);
        assert!(actions.is_same_objects_list("Player", &event));
        actions.objects_list_needed("Player");
        assert!(actions.is_same_objects_list("Player", &event));

        let mut sub = CodegenContext::inherit(&event);
        sub.objects_list_needed("Player");
        assert!(!sub.is_same_objects_list("Player", &event));
        assert!(!sub.is_same_objects_list("Coin", &event));
    }

    #[test]
    fn test_max_depth_shared() {
        let root = CodegenContext::root();
        let a = CodegenContext::inherit(&root);
        let b = CodegenContext::inherit(&a);
        let _c = CodegenContext::inherit(&b);
        assert_eq!(root.max_depth(), 3);
    }

    #[test]
    fn test_empty_list_wins_over_picking() {
        let mut ctx = CodegenContext::root();
        ctx.empty_objects_list_needed("Coin");
        ctx.objects_list_needed("Coin");
        ctx.objects_list_without_picking_needed("Coin");
        assert!(ctx.to_declare().is_empty());
        assert!(ctx.to_declare_without_picking().is_empty());
        assert_eq!(ctx.all_to_declare().len(), 1);
    }

    #[test]
    fn test_custom_condition_depth() {
        let root = CodegenContext::root();
        let mut ctx = CodegenContext::inherit(&root);
        ctx.enter_custom_condition();
        let child = CodegenContext::inherit(&ctx);
        assert_eq!(child.custom_condition_depth(), 1);
        ctx.leave_custom_condition();
        ctx.leave_custom_condition();
        assert_eq!(ctx.custom_condition_depth(), 0);
    }
}
