//! The declaration arena handed over by the front-end.
//!
//! [`SourceSet`] owns every declaration the compiler may look at: the composite
//! declarations to merge, their base declarations, and the interfaces they
//! implement. Declarations are addressed by [`DeclId`] and resolved by simple
//! name.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::ast::{Marked, TypeDecl, TypeRef};
use crate::{CompilationError, DeclId, Result};

/// Arena of declarations, indexed by [`DeclId`] and by simple name.
#[derive(Debug, Default, Clone)]
pub struct SourceSet {
    decls: Vec<TypeDecl>,
    by_name: FxHashMap<String, DeclId>,
}

impl SourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a declaration, assigning member identities.
    pub fn add(&mut self, mut decl: TypeDecl) -> Result<DeclId> {
        if self.by_name.contains_key(&decl.name) {
            return Err(CompilationError::DuplicateDeclaration { name: decl.name });
        }
        decl.assign_ids();
        let id = DeclId::from(self.decls.len());
        self.by_name.insert(decl.name.clone(), id);
        self.decls.push(decl);
        Ok(id)
    }

    /// Get a declaration.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not produced by this set.
    pub fn get(&self, id: DeclId) -> &TypeDecl {
        &self.decls[id.index()]
    }

    /// Get a declaration mutably.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not produced by this set.
    pub fn get_mut(&mut self, id: DeclId) -> &mut TypeDecl {
        &mut self.decls[id.index()]
    }

    pub fn find(&self, name: &str) -> Option<DeclId> {
        self.by_name.get(name).copied()
    }

    /// Resolve a name, failing with `UnknownDeclaration`.
    pub fn resolve(&self, name: &str) -> Result<DeclId> {
        self.find(name)
            .ok_or_else(|| CompilationError::UnknownDeclaration {
                name: name.to_string(),
            })
    }

    pub fn name(&self, id: DeclId) -> &str {
        &self.get(id).name
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = DeclId> + '_ {
        (0..self.decls.len()).map(DeclId::from)
    }

    /// The declaration named by the superclass of `id`, if it is in this set.
    pub fn superclass(&self, id: DeclId) -> Option<DeclId> {
        self.get(id)
            .superclass
            .as_ref()
            .and_then(|s| self.find(&s.name))
    }

    /// The extension chain starting at `leaf`, derived to base.
    ///
    /// The chain follows superclasses while they are participating
    /// declarations known to this set.
    pub fn extension_chain(&self, leaf: DeclId) -> Vec<DeclId> {
        let mut chain = Vec::new();
        let mut current = Some(leaf);
        while let Some(id) = current {
            if !self.get(id).is_participating() || chain.contains(&id) {
                break;
            }
            chain.push(id);
            current = self.superclass(id);
        }
        chain
    }

    /// Direct and inherited super-interfaces of `id` that are known to this set,
    /// in discovery order.
    pub fn all_interfaces(&self, id: DeclId) -> Vec<DeclId> {
        let mut seen = FxHashSet::default();
        let mut out = Vec::new();
        self.collect_interfaces(id, &mut seen, &mut out);
        out
    }

    fn collect_interfaces(&self, id: DeclId, seen: &mut FxHashSet<DeclId>, out: &mut Vec<DeclId>) {
        for iface in &self.get(id).interfaces {
            if let Some(iface_id) = self.find(&iface.name) {
                if seen.insert(iface_id) {
                    out.push(iface_id);
                    self.collect_interfaces(iface_id, seen, out);
                }
            }
        }
    }

    /// Whether a value of declaration `from` can be assigned to a variable of type `to`.
    pub fn is_assignable(&self, to: &TypeRef, from: DeclId) -> bool {
        let mut current = Some(from);
        let mut visited = FxHashSet::default();
        while let Some(id) = current {
            if !visited.insert(id) {
                break;
            }
            if self.get(id).name == to.name {
                return true;
            }
            if self
                .all_interfaces(id)
                .iter()
                .any(|&i| self.get(i).name == to.name)
            {
                return true;
            }
            current = self.superclass(id);
        }
        false
    }

    /// Whether `sub` is `sup` or one of its subtypes, as far as this set knows.
    pub fn is_subtype(&self, sub: &TypeRef, sup: &TypeRef) -> bool {
        if sub == sup {
            return true;
        }
        match self.find(&sub.name) {
            Some(id) => self.is_assignable(sup, id),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::TypeDecl;

    fn set() -> SourceSet {
        let mut set = SourceSet::new();
        set.add(TypeDecl::interface("Base")).unwrap();
        set.add(TypeDecl::interface("Api").implements(TypeRef::named("Base")))
            .unwrap();
        set.add(TypeDecl::participating("Sup").implements(TypeRef::named("Api")))
            .unwrap();
        set.add(TypeDecl::participating("Sub").extends(TypeRef::named("Sup")))
            .unwrap();
        set.add(TypeDecl::participating("Leaf").extends(TypeRef::named("Sub")))
            .unwrap();
        set.add(TypeDecl::class("Plain")).unwrap();
        set.add(TypeDecl::participating("OverPlain").extends(TypeRef::named("Plain")))
            .unwrap();
        set
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut set = set();
        let err = set.add(TypeDecl::class("Sub")).unwrap_err();
        assert!(matches!(err, CompilationError::DuplicateDeclaration { .. }));
    }

    #[test]
    fn extension_chain_is_derived_to_base() {
        let set = set();
        let leaf = set.resolve("Leaf").unwrap();
        let names: Vec<_> = set
            .extension_chain(leaf)
            .into_iter()
            .map(|id| set.name(id))
            .collect();
        assert_eq!(names, ["Leaf", "Sub", "Sup"]);
    }

    #[test]
    fn extension_chain_stops_at_non_participating_base() {
        let set = set();
        let id = set.resolve("OverPlain").unwrap();
        assert_eq!(set.extension_chain(id), vec![id]);
    }

    #[test]
    fn assignability_follows_superclasses_and_interfaces() {
        let set = set();
        let leaf = set.resolve("Leaf").unwrap();
        assert!(set.is_assignable(&TypeRef::named("Sup"), leaf));
        assert!(set.is_assignable(&TypeRef::named("Base"), leaf));
        assert!(!set.is_assignable(&TypeRef::named("Plain"), leaf));
        let sup = set.resolve("Sup").unwrap();
        assert!(!set.is_assignable(&TypeRef::named("Leaf"), sup));
    }

    #[test]
    fn resolve_unknown() {
        let set = set();
        assert!(matches!(
            set.resolve("Nope"),
            Err(CompilationError::UnknownDeclaration { .. })
        ));
    }
}
