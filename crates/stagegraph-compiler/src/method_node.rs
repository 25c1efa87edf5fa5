//! Method nodes: plain methods of composite declarations taking part in the
//! dependency graph.
//!
//! A method node groups one method with every method overriding it or
//! overridden by it along the extension chain, so that after merging they
//! form a single call target.

use rustc_hash::FxHashSet;

use stagegraph_core::ast::MethodDecl;
use stagegraph_core::{DeclId, MemberLoc, SourceSet, SymbolHash};

#[derive(Debug, Clone)]
pub struct MethodNode {
    /// Leaf declaration of the extension chain.
    pub decl: DeclId,
    /// The method in each chain link that has the seed's signature, derived first.
    pub methods: Vec<MemberLoc>,
    /// Super-interface methods with the seed's signature, as `(identity, name)`.
    pub interface_methods: Vec<(SymbolHash, String)>,
}

impl MethodNode {
    pub fn discover(sources: &SourceSet, leaf: DeclId, seed: &MethodDecl) -> MethodNode {
        let chain = sources.extension_chain(leaf);
        let mut methods = Vec::new();
        let mut interface_methods = Vec::new();
        let mut seen = FxHashSet::default();

        for &link in &chain {
            if let Some(index) = sources
                .get(link)
                .methods
                .iter()
                .position(|m| seed.overrides(m))
            {
                methods.push(MemberLoc::new(link, index));
            }
            for iface in sources.all_interfaces(link) {
                for method in &sources.get(iface).methods {
                    if seed.overrides(method) && seen.insert(method.id) {
                        interface_methods.push((method.id, method.name.clone()));
                    }
                }
            }
        }

        MethodNode {
            decl: leaf,
            methods,
            interface_methods,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagegraph_core::ast::{TypeDecl, TypeRef};

    #[test]
    fn groups_overrides_and_interface_methods() {
        let mut sources = SourceSet::new();
        sources
            .add(
                TypeDecl::interface("Api")
                    .with_method(MethodDecl::new("run", TypeRef::void()).into_abstract()),
            )
            .unwrap();
        sources
            .add(
                TypeDecl::participating("Sup")
                    .implements(TypeRef::named("Api"))
                    .with_method(MethodDecl::new("run", TypeRef::void()))
                    .with_method(
                        MethodDecl::new("run", TypeRef::void()).with_param("x", TypeRef::int()),
                    ),
            )
            .unwrap();
        let sub = sources
            .add(
                TypeDecl::participating("Sub")
                    .extends(TypeRef::named("Sup"))
                    .with_method(MethodDecl::new("run", TypeRef::void())),
            )
            .unwrap();

        let seed = sources.get(sub).methods[0].clone();
        let node = MethodNode::discover(&sources, sub, &seed);
        assert_eq!(node.methods.len(), 2);
        assert_eq!(node.methods[0], MemberLoc::new(sub, 0));
        assert_eq!(node.methods[1].index, 0);
        assert_eq!(node.interface_methods.len(), 1);
        assert_eq!(node.interface_methods[0].1, "run");
    }
}
