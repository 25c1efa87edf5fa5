//! Extension chain merge.
//!
//! Folds every link of an extension chain into the leaf, base first: each
//! link is merged into the link extending it, and the result is merged into
//! the next one down to the leaf.
//!
//! Merging a base into the declaration extending it:
//!
//! 1. Formal type parameters of the base that the derived declaration's
//!    `extends` clause instantiates are replaced by the actual arguments.
//! 2. Markers, super-interfaces, nested types and fields are copied forward.
//! 3. Static methods are copied. A method overridden by a concrete method is
//!    kept as a private `_Base_m` when both are concrete, and `super.m(..)`
//!    calls in the derived declaration are redirected to it. Abstract methods
//!    nobody overrides are dropped.
//! 4. A derived constructor starting with `super(..)` gets the matching base
//!    constructor body inlined in place of the call, with the base
//!    parameters renamed to the arguments passed.
//! 5. The derived declaration takes over the base's superclass.

use rustc_hash::FxHashMap;
use tracing::trace;

use stagegraph_core::ast::visitor::{VisitorMut, walk_expr_mut, walk_type_ref_mut};
use stagegraph_core::ast::{
    ConstructorDecl, Expr, Marked, Marker, MethodDecl, MethodRef, Modifiers, Stmt, TypeDecl,
    TypeRef,
};
use stagegraph_core::naming;
use stagegraph_core::{CompilationError, DeclId, Result, SourceSet};

/// Merge the extension chain of a leaf declaration, given derived to base.
pub fn merge_chain(sources: &SourceSet, chain: &[DeclId]) -> Result<TypeDecl> {
    let mut links = chain.iter().rev().map(|&decl| sources.get(decl).clone());
    let Some(mut merged) = links.next() else {
        return Err(CompilationError::UnknownDeclaration {
            name: "<empty extension chain>".to_string(),
        });
    };
    for derived in links {
        merged = merge_link(merged, derived)?;
    }
    Ok(merged)
}

fn merge_link(mut base: TypeDecl, mut derived: TypeDecl) -> Result<TypeDecl> {
    trace!(base = %base.name, derived = %derived.name, "merging extension link");
    instantiate_type_params(&mut base, &mut derived);

    for marker in std::mem::take(&mut base.markers) {
        if !derived.markers.contains(&marker) {
            derived.markers.push(marker);
        }
    }
    for interface in std::mem::take(&mut base.interfaces) {
        if !derived.interfaces.contains(&interface) {
            derived.interfaces.push(interface);
        }
    }
    derived.nested.append(&mut base.nested);
    derived.fields.append(&mut base.fields);

    for method in std::mem::take(&mut base.methods) {
        merge_method(&base.name, &mut derived, method);
    }

    if derived.constructors.is_empty() {
        derived.constructors.extend(
            base.constructors
                .iter()
                .find(|c| c.params.is_empty() && !c.implicit)
                .cloned(),
        );
    } else {
        for constructor in &mut derived.constructors {
            inline_super_constructor(constructor, &base, &derived.name)?;
        }
    }

    derived.superclass = base.superclass.take();
    Ok(derived)
}

/// Replace the base's formal type parameters instantiated by the derived
/// declaration's `extends` clause. A raw `extends` leaves them in place, so
/// they become formal parameters of the derived declaration.
fn instantiate_type_params(base: &mut TypeDecl, derived: &mut TypeDecl) {
    let args = derived
        .superclass
        .as_ref()
        .map(|s| s.args.clone())
        .unwrap_or_default();
    if args.is_empty() {
        for param in &base.type_params {
            if !derived.type_params.contains(param) {
                derived.type_params.push(param.clone());
            }
        }
        return;
    }

    let substitutions: FxHashMap<String, TypeRef> = base
        .type_params
        .iter()
        .zip(args)
        .filter(|(formal, arg)| !(arg.is_type_param && &arg.name == *formal))
        .map(|(formal, arg)| (formal.clone(), arg))
        .collect();
    if !substitutions.is_empty() {
        TypeSubstitution { substitutions }.visit_type_decl_mut(base);
    }
}

struct TypeSubstitution {
    substitutions: FxHashMap<String, TypeRef>,
}

impl VisitorMut for TypeSubstitution {
    fn visit_type_ref_mut(&mut self, ty: &mut TypeRef) {
        if ty.is_type_param {
            if let Some(arg) = self.substitutions.get(&ty.name) {
                *ty = arg.clone();
                return;
            }
        }
        walk_type_ref_mut(self, ty);
    }
}

fn merge_method(base_name: &str, derived: &mut TypeDecl, mut method: MethodDecl) {
    if method.is_static() {
        derived.methods.push(method);
        return;
    }

    let Some(index) = derived.methods.iter().position(|m| m.overrides(&method)) else {
        if !method.is_abstract() {
            derived.methods.push(method);
        }
        return;
    };

    let base_had_override = method.has_marker(&Marker::Override);
    if !method.is_abstract() && !derived.methods[index].is_abstract() {
        let renamed = naming::overridden_name(base_name, &method.name);
        trace!(method = %method.name, %renamed, "overridden method kept");

        let target = MethodRef::new(base_name, renamed.clone(), method.param_types());
        let mut redirect = SuperCallRedirect {
            overridden: &method,
            target,
        };
        redirect.visit_type_decl_mut(derived);

        method.name = renamed;
        method.modifiers.set_visibility(Modifiers::PRIVATE);
        method.remove_marker(&Marker::Override);
        derived.methods.push(method);
    }
    if !base_had_override {
        derived.methods[index].remove_marker(&Marker::Override);
    }
}

/// Rewrites `super.m(..)` calls of one overridden method into calls of its
/// renamed copy.
struct SuperCallRedirect<'a> {
    overridden: &'a MethodDecl,
    target: MethodRef,
}

impl VisitorMut for SuperCallRedirect<'_> {
    fn visit_expr_mut(&mut self, expr: &mut Expr) {
        walk_expr_mut(self, expr);
        if let Expr::Call { target, method, .. } = expr {
            if matches!(target.as_deref(), Some(Expr::Super))
                && self.overridden.matches_ref(method)
            {
                *target = None;
                *method = self.target.clone();
            }
        }
    }
}

fn inline_super_constructor(
    constructor: &mut ConstructorDecl,
    base: &TypeDecl,
    derived_name: &str,
) -> Result<()> {
    let Some(Stmt::SuperConstructor { args }) = constructor.body.stmts.first() else {
        return Ok(());
    };
    let explicit: Vec<&ConstructorDecl> =
        base.constructors.iter().filter(|c| !c.implicit).collect();
    let Some(inlined) = explicit.iter().find(|c| c.params.len() == args.len()) else {
        if explicit.is_empty() && args.is_empty() {
            constructor.body.stmts.remove(0);
        }
        return Ok(());
    };

    let mut renames = FxHashMap::default();
    for (param, arg) in inlined.params.iter().zip(args) {
        match arg {
            Expr::Local(name) if constructor.param_index(name).is_some() => {
                renames.insert(param.name.clone(), name.clone());
            }
            _ => {
                renames.insert(param.name.clone(), String::new());
            }
        }
    }

    let mut body = inlined.body.clone();
    let mut renamer = ParamRenamer {
        renames,
        illegal: false,
    };
    renamer.visit_block_mut(&mut body);
    if renamer.illegal {
        return Err(CompilationError::IllegalSuperCall {
            declaration: derived_name.to_string(),
        });
    }

    trace!(declaration = derived_name, statements = body.stmts.len(), "super constructor inlined");
    constructor.body.stmts.splice(0..1, body.stmts);
    Ok(())
}

/// Renames reads of base constructor parameters. An empty replacement marks
/// a parameter whose argument is not a plain parameter read.
struct ParamRenamer {
    renames: FxHashMap<String, String>,
    illegal: bool,
}

impl VisitorMut for ParamRenamer {
    fn visit_expr_mut(&mut self, expr: &mut Expr) {
        if let Expr::Local(name) = expr {
            match self.renames.get(name.as_str()) {
                Some(replacement) if replacement.is_empty() => self.illegal = true,
                Some(replacement) => *name = replacement.clone(),
                None => {}
            }
            return;
        }
        walk_expr_mut(self, expr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagegraph_core::ast::{Block, FieldDecl, FieldRef, Param};

    fn sources(decls: Vec<TypeDecl>) -> (SourceSet, Vec<DeclId>) {
        let mut sources = SourceSet::new();
        let ids = decls.into_iter().map(|d| sources.add(d).unwrap()).collect();
        (sources, ids)
    }

    fn merge(decls: Vec<TypeDecl>) -> Result<TypeDecl> {
        let (sources, ids) = sources(decls);
        let leaf = *ids.last().unwrap();
        merge_chain(&sources, &sources.extension_chain(leaf))
    }

    #[test]
    fn single_link_is_identity() {
        let decl = TypeDecl::participating("Solo")
            .with_field(FieldDecl::new("x", TypeRef::int()).with_init(Expr::int(-1)))
            .with_method(MethodDecl::simple("run", TypeRef::void()));
        let (sources, ids) = sources(vec![decl]);
        let merged = merge_chain(&sources, &[ids[0]]).unwrap();
        assert_eq!(&merged, sources.get(ids[0]));
    }

    #[test]
    fn members_flow_into_the_leaf() {
        let base = TypeDecl::participating("Base")
            .implements(TypeRef::named("Api"))
            .with_field(FieldDecl::new("x", TypeRef::int()))
            .with_method(
                MethodDecl::simple("helper", TypeRef::void()).with_modifiers(Modifiers::STATIC),
            )
            .with_method(MethodDecl::simple("dropped", TypeRef::void()).into_abstract());
        let leaf = TypeDecl::participating("Leaf")
            .extends(TypeRef::named("Base"))
            .implements(TypeRef::named("Api"))
            .with_field(FieldDecl::new("y", TypeRef::int()));
        let merged = merge(vec![base, leaf]).unwrap();

        assert_eq!(merged.name, "Leaf");
        assert_eq!(merged.superclass, None);
        assert_eq!(merged.interfaces, vec![TypeRef::named("Api")]);
        assert!(merged.field("x").is_some() && merged.field("y").is_some());
        assert!(merged.has_method_named("helper"));
        assert!(!merged.has_method_named("dropped"));
    }

    #[test]
    fn overridden_methods_are_renamed() {
        let base = TypeDecl::participating("Base")
            .with_method(
                MethodDecl::simple("run", TypeRef::int())
                    .with_body(Block::new(vec![Stmt::ret(Expr::int(1))])),
            );
        let super_call = Expr::call_on(
            Some(Expr::Super),
            MethodRef::new("Base", "run", vec![]),
            vec![],
        );
        let leaf = TypeDecl::participating("Leaf")
            .extends(TypeRef::named("Base"))
            .with_method(
                MethodDecl::simple("run", TypeRef::int())
                    .with_marker(Marker::Override)
                    .with_body(Block::new(vec![Stmt::ret(super_call)])),
            );
        let merged = merge(vec![base, leaf]).unwrap();

        let run = &merged.methods[0];
        assert!(!run.has_marker(&Marker::Override));
        assert_eq!(
            run.body.as_ref().unwrap().stmts[0],
            Stmt::ret(Expr::call(MethodRef::new("Base", "_Base_run", vec![]), vec![]))
        );
        let kept = &merged.methods[1];
        assert_eq!(kept.name, "_Base_run");
        assert!(kept.modifiers.contains(Modifiers::PRIVATE));
        assert!(!kept.modifiers.contains(Modifiers::PUBLIC));
    }

    #[test]
    fn instantiated_type_params_are_substituted() {
        let base = TypeDecl::participating("Holder")
            .with_type_param("T")
            .with_field(FieldDecl::new("value", TypeRef::type_param("T")));
        let leaf = TypeDecl::participating("Names")
            .extends(TypeRef::generic("Holder", vec![TypeRef::named("String")]));
        let merged = merge(vec![base, leaf]).unwrap();
        assert_eq!(merged.field("value").unwrap().ty, TypeRef::named("String"));
        assert!(merged.type_params.is_empty());
    }

    #[test]
    fn super_constructor_is_inlined() {
        let base = TypeDecl::participating("Base").with_constructor(ConstructorDecl::new(
            vec![Param::new("size", TypeRef::int())],
            Block::new(vec![Stmt::expr(Expr::assign(
                Expr::field(FieldRef::new("Base", "capacity")),
                Expr::local("size"),
            ))]),
        ));
        let leaf = TypeDecl::participating("Leaf")
            .extends(TypeRef::named("Base"))
            .with_constructor(ConstructorDecl::new(
                vec![Param::new("n", TypeRef::int())],
                Block::new(vec![
                    Stmt::SuperConstructor {
                        args: vec![Expr::local("n")],
                    },
                    Stmt::return_void(),
                ]),
            ));
        let merged = merge(vec![base, leaf]).unwrap();
        assert_eq!(
            merged.constructors[0].body.stmts,
            vec![
                Stmt::expr(Expr::assign(
                    Expr::field(FieldRef::new("Base", "capacity")),
                    Expr::local("n"),
                )),
                Stmt::return_void(),
            ]
        );
    }

    #[test]
    fn super_call_with_computed_argument_fails() {
        let base = TypeDecl::participating("Base").with_constructor(ConstructorDecl::new(
            vec![Param::new("size", TypeRef::int())],
            Block::new(vec![Stmt::expr(Expr::local("size"))]),
        ));
        let leaf = TypeDecl::participating("Leaf")
            .extends(TypeRef::named("Base"))
            .with_constructor(ConstructorDecl::new(
                Vec::new(),
                Block::new(vec![Stmt::SuperConstructor {
                    args: vec![Expr::int(16)],
                }]),
            ));
        let err = merge(vec![base, leaf]).unwrap_err();
        assert_eq!(
            err,
            CompilationError::IllegalSuperCall {
                declaration: "Leaf".into()
            }
        );
    }
}
