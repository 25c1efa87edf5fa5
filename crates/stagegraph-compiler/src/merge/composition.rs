//! Composition node merge.
//!
//! The declarations of one composition node (each already holding its whole
//! extension chain) become one type. A node with a single declaration keeps
//! it; several declarations are combined into a new public class named by
//! joining their simple names with `_`, in the package of the first one.
//!
//! Child nodes are nested into their parent's merged type, and the child's
//! parent-access field becomes a final field holding a fresh instance of the
//! nested type.

use tracing::trace;

use stagegraph_core::ast::{Expr, FieldRef, Modifiers, TypeDecl, TypeRef};
use stagegraph_core::{CompilationError, Result};

/// Combine the declarations of one composition node.
pub fn merge_declarations(decls: Vec<TypeDecl>, erase_type_parameters: bool) -> Result<TypeDecl> {
    let mut merged = match <[TypeDecl; 1]>::try_from(decls) {
        Ok([single]) => single,
        Err(decls) => combine(decls)?,
    };
    if erase_type_parameters {
        merged.type_params.clear();
    }
    merged.modifiers.remove(Modifiers::ABSTRACT);
    Ok(merged)
}

fn combine(decls: Vec<TypeDecl>) -> Result<TypeDecl> {
    let Some(first) = decls.first() else {
        return Err(CompilationError::EmptyComposition {
            node: "<unnamed>".to_string(),
        });
    };
    let name = decls
        .iter()
        .map(|d| d.name.as_str())
        .collect::<Vec<_>>()
        .join("_");
    let mut merged = TypeDecl::class(name);
    merged.package = first.package.clone();
    merged.span = first.span;

    for decl in decls {
        trace!(declaration = %decl.name, merged = %merged.name, "declaration merged");
        for param in decl.type_params {
            if !merged.type_params.contains(&param) {
                merged.type_params.push(param);
            }
        }
        for interface in decl.interfaces {
            if !merged.interfaces.contains(&interface) {
                merged.interfaces.push(interface);
            }
        }
        merged.nested.extend(decl.nested);
        merged.fields.extend(decl.fields);
        merged
            .constructors
            .extend(decl.constructors.into_iter().filter(|c| !c.implicit));
        if decl.superclass.is_some() {
            merged.superclass = decl.superclass;
        }
        merged.methods.extend(decl.methods);
    }
    Ok(merged)
}

/// Nest `child` into `parent` and turn the parent-access field into a final
/// field initialized with a new instance of `child`.
pub fn nest_child(parent: &mut TypeDecl, child: TypeDecl, parent_access: &FieldRef) {
    let id = parent_access.hash();
    if let Some(field) = parent.fields.iter_mut().find(|f| f.id == id) {
        let ty = TypeRef::named(child.name.clone());
        field.init = Some(Expr::new_instance(ty.clone()));
        field.ty = ty;
        field.modifiers.insert(Modifiers::FINAL);
    }
    trace!(parent = %parent.name, child = %child.name, field = %parent_access, "child nested");
    parent.nested.push(child);
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagegraph_core::ast::{Block, ConstructorDecl, FieldDecl, MethodDecl};

    #[test]
    fn single_declaration_is_kept() {
        let decl = TypeDecl::participating("Solo")
            .with_type_param("T")
            .with_modifiers(Modifiers::PUBLIC | Modifiers::ABSTRACT);
        let merged = merge_declarations(vec![decl.clone()], false).unwrap();
        assert_eq!(merged.name, "Solo");
        assert_eq!(merged.type_params, ["T"]);
        assert_eq!(merged.modifiers, Modifiers::PUBLIC);

        let erased = merge_declarations(vec![decl], true).unwrap();
        assert!(erased.type_params.is_empty());
    }

    #[test]
    fn several_declarations_are_combined() {
        let first = TypeDecl::participating("Part1")
            .with_package("org.example")
            .with_type_param("K")
            .implements(TypeRef::named("Api"))
            .with_field(FieldDecl::new("a", TypeRef::int()))
            .with_constructor(ConstructorDecl::implicit());
        let second = TypeDecl::participating("Part2")
            .with_type_param("K")
            .implements(TypeRef::named("Api"))
            .with_method(MethodDecl::simple("run", TypeRef::void()))
            .with_constructor(ConstructorDecl::new(Vec::new(), Block::empty()));
        let merged = merge_declarations(vec![first, second], false).unwrap();

        assert_eq!(merged.name, "Part1_Part2");
        assert_eq!(merged.package.as_deref(), Some("org.example"));
        assert_eq!(merged.type_params, ["K"]);
        assert_eq!(merged.interfaces, vec![TypeRef::named("Api")]);
        assert_eq!(merged.fields.len(), 1);
        assert_eq!(merged.methods.len(), 1);
        assert_eq!(merged.constructors.len(), 1);
        assert!(merged.markers.is_empty());
    }

    #[test]
    fn child_is_nested_behind_final_field() {
        let mut parent = TypeDecl::participating("Outer");
        parent.add_field(FieldDecl::new("inner", TypeRef::named("InnerApi")));
        let child = TypeDecl::participating("Inner_Extra");

        nest_child(&mut parent, child, &FieldRef::new("Outer", "inner"));
        let field = parent.field("inner").unwrap();
        assert_eq!(field.ty, TypeRef::named("Inner_Extra"));
        assert_eq!(field.init, Some(Expr::new_instance(TypeRef::named("Inner_Extra"))));
        assert!(field.is_final());
        assert_eq!(parent.nested[0].name, "Inner_Extra");
    }
}
