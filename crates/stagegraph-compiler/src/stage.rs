//! Stage discovery.
//!
//! A stage is a group of mutable fields of one composite declaration that are
//! initialized and closed together. Its members are found by naming
//! convention across the declaration's extension chain:
//!
//! - fields whose capitalized name is the stage name, or tagged with it
//! - the predicate `fooInit()`, init methods `initFoo(..)` / `initFoo_X(..)`,
//!   and the close method `closeFoo()`
//! - methods tagged with the stage name
//!
//! Methods are scanned over the whole chain before fields, so a predicate
//! declared in a base link is known when the rule for several initialized
//! fields is applied.

use stagegraph_core::ast::{Marked, MethodDecl};
use stagegraph_core::naming::{self, capitalize};
use stagegraph_core::{CompilationError, DeclId, MemberLoc, Result, SourceSet, SymbolHash};

use crate::memo::Memo;

/// A field of a stage.
#[derive(Debug, Clone)]
pub struct StageField {
    pub loc: MemberLoc,
    pub id: SymbolHash,
    pub name: String,
    /// Abstract method named like the field, implemented as its accessor.
    pub declared_accessor: Option<MemberLoc>,
    /// Accessor generated even if no other node reads the field.
    pub forced_accessor: bool,
    pub accessor: Memo<MemberLoc>,
}

/// A stage-tagged method and its guarded wrapper.
#[derive(Debug, Clone)]
pub struct StageMethod {
    pub loc: MemberLoc,
    pub id: SymbolHash,
    pub guarded: Memo<MemberLoc>,
}

/// Which initialized field, if any, tells whether the stage is initialized.
///
/// At most one field may carry an initializer, unless the stage declares a
/// concrete predicate: then several may, and none of them is the sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitializedFieldsRule {
    /// No field is initialized.
    Uninitialized,
    /// The field at this index of [`Stage::fields`] is the sentinel.
    Sentinel(usize),
    /// Several fields are initialized and the declared predicate decides.
    ManyWithPredicate,
}

/// A stage and its lifecycle members.
#[derive(Debug, Clone)]
pub struct Stage {
    pub name: String,
    /// Leaf declaration of the extension chain the stage was found in.
    pub decl: DeclId,
    pub fields: Vec<StageField>,
    pub initialized: InitializedFieldsRule,
    /// Declared predicate, abstract or concrete.
    pub declared_predicate: Option<MemberLoc>,
    pub init_methods: Vec<MemberLoc>,
    /// The init method taking no parameters, used by guards to initialize lazily.
    pub no_arg_init: Option<MemberLoc>,
    /// Declared close, abstract or concrete.
    pub declared_close: Option<MemberLoc>,
    pub stage_methods: Vec<StageMethod>,

    pub predicate: Memo<MemberLoc>,
    pub close: Memo<MemberLoc>,
    /// Whether the close body was synthesized from the sentinel default.
    pub close_generated: bool,
    pub do_close: Memo<MemberLoc>,
}

impl Stage {
    fn new(name: String, decl: DeclId) -> Self {
        Self {
            name,
            decl,
            fields: Vec::new(),
            initialized: InitializedFieldsRule::Uninitialized,
            declared_predicate: None,
            init_methods: Vec::new(),
            no_arg_init: None,
            declared_close: None,
            stage_methods: Vec::new(),
            predicate: Memo::NotStarted,
            close: Memo::NotStarted,
            close_generated: false,
            do_close: Memo::NotStarted,
        }
    }

    /// Name of the stage `field` belongs to: its tag, or its capitalized name.
    pub fn name_of(field: &impl Marked, field_name: &str) -> String {
        field
            .stage_tag()
            .map(str::to_string)
            .unwrap_or_else(|| capitalize(field_name))
    }

    /// Discover the stage of `seed`, a field declared in the extension chain
    /// of `leaf`.
    pub fn discover(sources: &SourceSet, leaf: DeclId, seed: MemberLoc) -> Result<Stage> {
        let seed_field = &sources.get(seed.decl).fields[seed.index];
        let mut stage = Stage::new(Stage::name_of(seed_field, &seed_field.name), leaf);
        let chain = sources.extension_chain(leaf);

        for &decl in &chain {
            stage.scan_methods(sources, decl)?;
        }
        let mut fields_decl: Option<DeclId> = None;
        for &decl in &chain {
            stage.scan_fields(sources, decl, &mut fields_decl)?;
        }

        stage.no_arg_init = stage
            .init_methods
            .iter()
            .copied()
            .find(|&loc| method_at(sources, loc).params.is_empty());

        stage.validate(sources)?;
        Ok(stage)
    }

    fn scan_methods(&mut self, sources: &SourceSet, decl: DeclId) -> Result<()> {
        let predicate_name = naming::predicate_name(&self.name);
        let close_name = naming::close_name(&self.name);

        for (index, method) in sources.get(decl).methods.iter().enumerate() {
            let loc = MemberLoc::new(decl, index);
            if method.name == predicate_name && self.declared_predicate.is_none() {
                if !method.ret.is_boolean() {
                    return Err(invalid_signature(method, "return type should be boolean"));
                }
                if !method.params.is_empty() {
                    return Err(invalid_signature(method, "shouldn't have parameters"));
                }
                self.declared_predicate = Some(loc);
            } else if !method.is_abstract() && naming::is_init_name(&self.name, &method.name) {
                if self
                    .init_methods
                    .iter()
                    .any(|&other| clashes(sources, method, method_at(sources, other)))
                {
                    return Err(CompilationError::OverloadClash {
                        stage: self.name.clone(),
                        method: method.name.clone(),
                    });
                }
                self.init_methods.push(loc);
            } else if method.name == close_name && self.declared_close.is_none() {
                if !method.ret.is_void() {
                    return Err(invalid_signature(method, "should be void"));
                }
                if !method.params.is_empty() {
                    return Err(invalid_signature(method, "shouldn't have parameters"));
                }
                self.declared_close = Some(loc);
            } else if method.stage_tag() == Some(self.name.as_str()) {
                self.stage_methods.push(StageMethod {
                    loc,
                    id: method.id,
                    guarded: Memo::NotStarted,
                });
            }
        }
        Ok(())
    }

    fn scan_fields(
        &mut self,
        sources: &SourceSet,
        decl: DeclId,
        fields_decl: &mut Option<DeclId>,
    ) -> Result<()> {
        let declaration = sources.get(decl);
        for (index, field) in declaration.fields.iter().enumerate() {
            if field.is_static() || field.is_final() || field.is_reference() {
                continue;
            }
            if field.stage_tag() != Some(self.name.as_str())
                && capitalize(&field.name) != self.name
            {
                continue;
            }
            match *fields_decl {
                Some(first) if first != decl => {
                    return Err(CompilationError::SpanViolation {
                        stage: self.name.clone(),
                        first: sources.name(first).to_string(),
                        second: declaration.name.clone(),
                    });
                }
                _ => *fields_decl = Some(decl),
            }

            let field_index = self.fields.len();
            if field.init.is_some() {
                self.initialized = match self.initialized {
                    InitializedFieldsRule::Uninitialized => {
                        InitializedFieldsRule::Sentinel(field_index)
                    }
                    _ if self.has_concrete_predicate(sources) => {
                        InitializedFieldsRule::ManyWithPredicate
                    }
                    _ => {
                        return Err(CompilationError::LifecycleDeclarationConflict {
                            stage: self.name.clone(),
                            detail: format!(
                                "at most one {} stage field could be initialized",
                                self.name
                            ),
                        });
                    }
                };
            }

            let declared_accessor = declaration
                .methods
                .iter()
                .position(|m| m.name == field.name && m.is_abstract())
                .map(|i| MemberLoc::new(decl, i));
            let interface_accessor = sources.all_interfaces(decl).into_iter().any(|iface| {
                sources
                    .get(iface)
                    .methods
                    .iter()
                    .any(|m| m.name == field.name)
            });

            self.fields.push(StageField {
                loc: MemberLoc::new(decl, index),
                id: field.id,
                name: field.name.clone(),
                declared_accessor,
                forced_accessor: declared_accessor.is_some() || interface_accessor,
                accessor: Memo::NotStarted,
            });
        }
        Ok(())
    }

    fn validate(&self, sources: &SourceSet) -> Result<()> {
        let conflict = |detail: String| CompilationError::LifecycleDeclarationConflict {
            stage: self.name.clone(),
            detail,
        };
        let predicate = naming::predicate_name(&self.name);
        let close = naming::close_name(&self.name);
        let sentinel = self.sentinel().is_some();

        if (sentinel && self.has_concrete_predicate(sources))
            || (!sentinel && self.declared_predicate.is_none())
        {
            return Err(conflict(format!(
                "{predicate}() should be declared OR one field initialized"
            )));
        }
        if !sentinel && self.declared_close.is_none() {
            return Err(conflict(format!(
                "If no field initialized, {close}() should be declared"
            )));
        }
        if !sentinel && !self.has_concrete_predicate(sources) {
            return Err(conflict(format!(
                "abstract {predicate}() requires one initialized field"
            )));
        }
        if !sentinel && !self.has_concrete_close(sources) {
            return Err(conflict(format!(
                "abstract {close}() requires one initialized field"
            )));
        }
        Ok(())
    }

    /// Location of the sentinel field, if the stage has one.
    pub fn sentinel(&self) -> Option<&StageField> {
        match self.initialized {
            InitializedFieldsRule::Sentinel(index) => self.fields.get(index),
            _ => None,
        }
    }

    pub fn has_concrete_predicate(&self, sources: &SourceSet) -> bool {
        self.declared_predicate
            .is_some_and(|loc| !method_at(sources, loc).is_abstract())
    }

    pub fn has_concrete_close(&self, sources: &SourceSet) -> bool {
        self.declared_close
            .is_some_and(|loc| !method_at(sources, loc).is_abstract())
    }

    pub fn field_index(&self, id: SymbolHash) -> Option<usize> {
        self.fields.iter().position(|f| f.id == id)
    }

    pub fn stage_method_index(&self, id: SymbolHash) -> Option<usize> {
        self.stage_methods.iter().position(|m| m.id == id)
    }
}

pub(crate) fn method_at(sources: &SourceSet, loc: MemberLoc) -> &MethodDecl {
    &sources.get(loc.decl).methods[loc.index]
}

fn invalid_signature(method: &MethodDecl, detail: &str) -> CompilationError {
    CompilationError::InvalidLifecycleSignature {
        method: method.name.clone(),
        detail: detail.to_string(),
    }
}

/// Two init methods clash when no call could tell them apart: same name, same
/// arity, and every parameter pair related by subtyping or both numeric.
fn clashes(sources: &SourceSet, a: &MethodDecl, b: &MethodDecl) -> bool {
    a.name == b.name
        && a.params.len() == b.params.len()
        && a.params.iter().zip(&b.params).all(|(p, q)| {
            sources.is_subtype(&p.ty, &q.ty)
                || sources.is_subtype(&q.ty, &p.ty)
                || (p.ty.is_numeric_primitive() && q.ty.is_numeric_primitive())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagegraph_core::ast::{Expr, FieldDecl, MethodDecl, TypeDecl, TypeRef};

    fn discover(decls: Vec<TypeDecl>, leaf: &str, field: &str) -> Result<Stage> {
        let mut sources = SourceSet::new();
        for decl in decls {
            sources.add(decl).unwrap();
        }
        let leaf = sources.resolve(leaf).unwrap();
        let seed = sources
            .extension_chain(leaf)
            .into_iter()
            .find_map(|d| {
                sources
                    .get(d)
                    .field_index(field)
                    .map(|i| MemberLoc::new(d, i))
            })
            .unwrap();
        Stage::discover(&sources, leaf, seed)
    }

    #[test]
    fn sentinel_field_stage() {
        let decl = TypeDecl::participating("Part1")
            .with_field(FieldDecl::new("a", TypeRef::int()).with_init(Expr::int(-1)))
            .with_method(MethodDecl::new("initA", TypeRef::void()))
            .with_method(
                MethodDecl::new("initA_WithValue", TypeRef::void()).with_param("v", TypeRef::int()),
            );
        let stage = discover(vec![decl], "Part1", "a").unwrap();
        assert_eq!(stage.name, "A");
        assert_eq!(stage.fields.len(), 1);
        assert_eq!(stage.initialized, InitializedFieldsRule::Sentinel(0));
        assert_eq!(stage.init_methods.len(), 2);
        assert_eq!(stage.no_arg_init, Some(MemberLoc::new(DeclId::new(0), 0)));
    }

    #[test]
    fn tagged_fields_join_stage() {
        let decl = TypeDecl::participating("P")
            .with_field(FieldDecl::new("data", TypeRef::int()).with_init(Expr::int(0)))
            .with_field(FieldDecl::new("length", TypeRef::int()).in_stage("Data"))
            .with_method(MethodDecl::new("count", TypeRef::int()).in_stage("Data"));
        let stage = discover(vec![decl], "P", "length").unwrap();
        assert_eq!(stage.name, "Data");
        assert_eq!(stage.fields.len(), 2);
        assert_eq!(stage.stage_methods.len(), 1);
    }

    #[test]
    fn predicate_or_initialized_field() {
        let decl = TypeDecl::participating("P")
            .with_field(FieldDecl::new("a", TypeRef::int()).with_init(Expr::int(0)))
            .with_method(
                MethodDecl::new("aInit", TypeRef::boolean())
                    .with_body(stagegraph_core::ast::Block::new(vec![
                        stagegraph_core::ast::Stmt::ret(Expr::bool(true)),
                    ])),
            );
        let err = discover(vec![decl], "P", "a").unwrap_err();
        assert!(matches!(err, CompilationError::LifecycleDeclarationConflict { .. }));

        let bare = TypeDecl::participating("P").with_field(FieldDecl::new("a", TypeRef::int()));
        let err = discover(vec![bare], "P", "a").unwrap_err();
        assert!(err.to_string().contains("aInit() should be declared OR one field initialized"));
    }

    #[test]
    fn several_initialized_fields_need_predicate() {
        let two = || {
            TypeDecl::participating("P")
                .with_field(
                    FieldDecl::new("x", TypeRef::int())
                        .in_stage("Pos")
                        .with_init(Expr::int(0)),
                )
                .with_field(
                    FieldDecl::new("y", TypeRef::int())
                        .in_stage("Pos")
                        .with_init(Expr::int(0)),
                )
        };
        let err = discover(vec![two()], "P", "x").unwrap_err();
        assert!(err.to_string().contains("at most one Pos stage field"));

        let with_predicate = two()
            .with_method(MethodDecl::new("posInit", TypeRef::boolean()))
            .with_method(MethodDecl::new("closePos", TypeRef::void()));
        let stage = discover(vec![with_predicate], "P", "x").unwrap();
        assert_eq!(stage.initialized, InitializedFieldsRule::ManyWithPredicate);
        assert!(stage.sentinel().is_none());
    }

    #[test]
    fn no_initialized_field_requires_close() {
        let decl = TypeDecl::participating("P")
            .with_field(FieldDecl::new("a", TypeRef::int()))
            .with_method(MethodDecl::new("aInit", TypeRef::boolean()));
        let err = discover(vec![decl], "P", "a").unwrap_err();
        assert!(err.to_string().contains("closeA() should be declared"));
    }

    #[test]
    fn lifecycle_signatures() {
        let decl = TypeDecl::participating("P")
            .with_field(FieldDecl::new("a", TypeRef::int()).with_init(Expr::int(0)))
            .with_method(MethodDecl::new("aInit", TypeRef::int()).into_abstract());
        let err = discover(vec![decl], "P", "a").unwrap_err();
        assert!(matches!(err, CompilationError::InvalidLifecycleSignature { .. }));

        let decl = TypeDecl::participating("P")
            .with_field(FieldDecl::new("a", TypeRef::int()).with_init(Expr::int(0)))
            .with_method(
                MethodDecl::new("closeA", TypeRef::void()).with_param("x", TypeRef::int()),
            );
        let err = discover(vec![decl], "P", "a").unwrap_err();
        assert!(err.to_string().contains("shouldn't have parameters"));
    }

    #[test]
    fn numeric_init_overloads_clash() {
        let decl = TypeDecl::participating("P")
            .with_field(FieldDecl::new("a", TypeRef::long()).with_init(Expr::int(-1)))
            .with_method(MethodDecl::new("initA", TypeRef::void()).with_param("v", TypeRef::int()))
            .with_method(
                MethodDecl::new("initA", TypeRef::void()).with_param("v", TypeRef::long()),
            );
        let err = discover(vec![decl], "P", "a").unwrap_err();
        assert_eq!(
            err,
            CompilationError::OverloadClash {
                stage: "A".into(),
                method: "initA".into()
            }
        );
    }

    #[test]
    fn fields_cannot_span_links() {
        let base = TypeDecl::participating("Base")
            .with_field(FieldDecl::new("x", TypeRef::int()).in_stage("S").with_init(Expr::int(0)));
        let middle = TypeDecl::participating("Middle").extends(TypeRef::named("Base"));
        let derived = TypeDecl::participating("Derived")
            .extends(TypeRef::named("Middle"))
            .with_field(FieldDecl::new("y", TypeRef::int()).in_stage("S"));
        let err = discover(vec![base, middle, derived], "Derived", "y").unwrap_err();
        assert_eq!(
            err,
            CompilationError::SpanViolation {
                stage: "S".into(),
                first: "Derived".into(),
                second: "Base".into()
            }
        );
    }

    #[test]
    fn accessor_declarations() {
        let api = TypeDecl::interface("Api")
            .with_method(MethodDecl::new("b", TypeRef::int()).into_abstract());
        let decl = TypeDecl::participating("P")
            .implements(TypeRef::named("Api"))
            .with_field(FieldDecl::new("a", TypeRef::int()).in_stage("S").with_init(Expr::int(0)))
            .with_field(FieldDecl::new("b", TypeRef::int()).in_stage("S"))
            .with_method(MethodDecl::new("a", TypeRef::int()).into_abstract());
        let stage = discover(vec![api, decl], "P", "a").unwrap();
        assert!(stage.fields[0].declared_accessor.is_some());
        assert!(stage.fields[0].forced_accessor);
        assert!(stage.fields[1].declared_accessor.is_none());
        assert!(stage.fields[1].forced_accessor);
    }
}
