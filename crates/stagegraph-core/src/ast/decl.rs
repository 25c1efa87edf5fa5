//! Declarations: types and their members.
//!
//! Every field and method carries a [`SymbolHash`] identity derived from the
//! declaration that originally declared it. The identity is assigned when the
//! member is added to a [`TypeDecl`] and never changes afterwards, even when
//! the member is renamed or moved into another declaration while merging.
//!
//! Members also carry a `layout` key. The final output orders fields and
//! methods by it (stable, so equal keys keep declaration order).

use crate::ast::{Block, Expr, FieldRef, Marked, Marker, MethodRef, Modifiers, TypeRef};
use crate::{Span, SymbolHash};

/// A method or constructor parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Param {
    pub name: String,
    pub ty: TypeRef,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// A field declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub id: SymbolHash,
    pub name: String,
    pub ty: TypeRef,
    pub modifiers: Modifiers,
    pub markers: Vec<Marker>,
    /// Initializer, which doubles as the stage sentinel value.
    pub init: Option<Expr>,
    pub span: Span,
    pub layout: i64,
}

impl FieldDecl {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            id: SymbolHash::EMPTY,
            name: name.into(),
            ty,
            modifiers: Modifiers::empty(),
            markers: Vec::new(),
            init: None,
            span: Span::SYNTHESIZED,
            layout: 0,
        }
    }

    pub fn with_init(mut self, init: Expr) -> Self {
        self.init = Some(init);
        self
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn with_marker(mut self, marker: Marker) -> Self {
        self.markers.push(marker);
        self
    }

    /// Tag the field as belonging to `stage`.
    pub fn in_stage(self, stage: impl Into<String>) -> Self {
        self.with_marker(Marker::Stage(stage.into()))
    }

    /// Mark the field as a structural reference.
    pub fn reference(self) -> Self {
        self.with_marker(Marker::Reference)
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn is_static(&self) -> bool {
        self.modifiers.contains(Modifiers::STATIC)
    }

    pub fn is_final(&self) -> bool {
        self.modifiers.contains(Modifiers::FINAL)
    }

    /// A resolved reference to this field as declared by `owner`.
    pub fn as_ref(&self, owner: &str) -> FieldRef {
        FieldRef::new(owner, self.name.clone())
    }
}

impl Marked for FieldDecl {
    fn markers(&self) -> &[Marker] {
        &self.markers
    }

    fn markers_mut(&mut self) -> &mut Vec<Marker> {
        &mut self.markers
    }
}

/// A method declaration. Abstract and interface methods have no body.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    pub id: SymbolHash,
    pub name: String,
    pub params: Vec<Param>,
    pub ret: TypeRef,
    pub modifiers: Modifiers,
    pub markers: Vec<Marker>,
    pub body: Option<Block>,
    pub span: Span,
    pub layout: i64,
}

impl MethodDecl {
    pub fn new(name: impl Into<String>, ret: TypeRef) -> Self {
        Self {
            id: SymbolHash::EMPTY,
            name: name.into(),
            params: Vec::new(),
            ret,
            modifiers: Modifiers::empty(),
            markers: Vec::new(),
            body: Some(Block::empty()),
            span: Span::SYNTHESIZED,
            layout: 0,
        }
    }

    /// A public, parameterless method with an empty body.
    pub fn simple(name: impl Into<String>, ret: TypeRef) -> Self {
        Self::new(name, ret).with_modifiers(Modifiers::PUBLIC)
    }

    pub fn with_param(mut self, name: impl Into<String>, ty: TypeRef) -> Self {
        self.params.push(Param::new(name, ty));
        self
    }

    pub fn with_body(mut self, body: Block) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn with_marker(mut self, marker: Marker) -> Self {
        self.markers.push(marker);
        self
    }

    /// Tag the method as belonging to `stage`.
    pub fn in_stage(self, stage: impl Into<String>) -> Self {
        self.with_marker(Marker::Stage(stage.into()))
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Make the method abstract, dropping its body.
    pub fn into_abstract(mut self) -> Self {
        self.modifiers.insert(Modifiers::ABSTRACT);
        self.body = None;
        self
    }

    pub fn is_abstract(&self) -> bool {
        self.modifiers.contains(Modifiers::ABSTRACT) || self.body.is_none()
    }

    pub fn is_static(&self) -> bool {
        self.modifiers.contains(Modifiers::STATIC)
    }

    /// Turn an abstract declaration into a concrete one with an empty body.
    pub fn make_concrete(&mut self) {
        self.modifiers.remove(Modifiers::ABSTRACT);
        self.body = Some(Block::empty());
    }

    pub fn param_types(&self) -> Vec<TypeRef> {
        self.params.iter().map(|p| p.ty.clone()).collect()
    }

    /// Identity of this method as declared by `owner`.
    pub fn hash_in(&self, owner: &str) -> SymbolHash {
        let params: Vec<SymbolHash> = self.params.iter().map(|p| p.ty.hash()).collect();
        SymbolHash::from_method(owner, &self.name, &params)
    }

    /// Whether `self` and `other` have the same name and parameter types, so
    /// one overrides the other.
    pub fn overrides(&self, other: &MethodDecl) -> bool {
        self.name == other.name
            && self.params.len() == other.params.len()
            && self
                .params
                .iter()
                .zip(&other.params)
                .all(|(a, b)| a.ty == b.ty)
    }

    /// Whether `method` designates this method, ignoring the owner.
    pub fn matches_ref(&self, method: &MethodRef) -> bool {
        self.name == method.name
            && self.params.len() == method.params.len()
            && self.params.iter().zip(&method.params).all(|(p, t)| &p.ty == t)
    }

    /// A resolved reference to this method as declared by `owner`.
    pub fn as_ref(&self, owner: &str) -> MethodRef {
        MethodRef::new(owner, self.name.clone(), self.param_types())
    }

    /// Mutable access to the body, creating an empty one if absent.
    pub fn body_mut(&mut self) -> &mut Block {
        self.body.get_or_insert_with(Block::empty)
    }
}

impl Marked for MethodDecl {
    fn markers(&self) -> &[Marker] {
        &self.markers
    }

    fn markers_mut(&mut self) -> &mut Vec<Marker> {
        &mut self.markers
    }
}

/// A constructor declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorDecl {
    pub params: Vec<Param>,
    pub modifiers: Modifiers,
    pub body: Block,
    /// Implicit default constructor supplied by the front-end.
    pub implicit: bool,
    pub span: Span,
}

impl ConstructorDecl {
    pub fn new(params: Vec<Param>, body: Block) -> Self {
        Self {
            params,
            modifiers: Modifiers::PUBLIC,
            body,
            implicit: false,
            span: Span::SYNTHESIZED,
        }
    }

    /// The implicit public no-argument constructor.
    pub fn implicit() -> Self {
        Self {
            implicit: true,
            ..Self::new(Vec::new(), Block::empty())
        }
    }

    pub fn param_index(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Class,
    Interface,
}

/// A type declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDecl {
    pub kind: TypeKind,
    pub name: String,
    pub package: Option<String>,
    /// Formal type parameter names.
    pub type_params: Vec<String>,
    pub superclass: Option<TypeRef>,
    pub interfaces: Vec<TypeRef>,
    pub modifiers: Modifiers,
    pub markers: Vec<Marker>,
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<MethodDecl>,
    pub constructors: Vec<ConstructorDecl>,
    pub nested: Vec<TypeDecl>,
    pub span: Span,
}

impl TypeDecl {
    fn with_kind(kind: TypeKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            package: None,
            type_params: Vec::new(),
            superclass: None,
            interfaces: Vec::new(),
            modifiers: Modifiers::PUBLIC,
            markers: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
            nested: Vec::new(),
            span: Span::SYNTHESIZED,
        }
    }

    pub fn class(name: impl Into<String>) -> Self {
        Self::with_kind(TypeKind::Class, name)
    }

    pub fn interface(name: impl Into<String>) -> Self {
        Self::with_kind(TypeKind::Interface, name)
    }

    /// A class marked as participating in merging.
    pub fn participating(name: impl Into<String>) -> Self {
        Self::class(name).with_marker(Marker::Participates)
    }

    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = Some(package.into());
        self
    }

    pub fn with_type_param(mut self, name: impl Into<String>) -> Self {
        self.type_params.push(name.into());
        self
    }

    pub fn extends(mut self, superclass: TypeRef) -> Self {
        self.superclass = Some(superclass);
        self
    }

    pub fn implements(mut self, interface: TypeRef) -> Self {
        self.interfaces.push(interface);
        self
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn with_marker(mut self, marker: Marker) -> Self {
        self.markers.push(marker);
        self
    }

    pub fn with_field(mut self, field: FieldDecl) -> Self {
        self.add_field(field);
        self
    }

    pub fn with_method(mut self, method: MethodDecl) -> Self {
        self.add_method(method);
        self
    }

    pub fn with_constructor(mut self, constructor: ConstructorDecl) -> Self {
        self.constructors.push(constructor);
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Add a field, assigning its identity if it has none. Returns its index.
    pub fn add_field(&mut self, mut field: FieldDecl) -> usize {
        if field.id.is_empty() {
            field.id = SymbolHash::from_field(&self.name, &field.name);
        }
        self.fields.push(field);
        self.fields.len() - 1
    }

    /// Add a method, assigning its identity if it has none. Returns its index.
    pub fn add_method(&mut self, mut method: MethodDecl) -> usize {
        if method.id.is_empty() {
            method.id = method.hash_in(&self.name);
        }
        self.methods.push(method);
        self.methods.len() - 1
    }

    /// Assign identities to members that do not have one yet.
    pub fn assign_ids(&mut self) {
        for field in &mut self.fields {
            if field.id.is_empty() {
                field.id = SymbolHash::from_field(&self.name, &field.name);
            }
        }
        for method in &mut self.methods {
            if method.id.is_empty() {
                method.id = method.hash_in(&self.name);
            }
        }
    }

    pub fn is_abstract(&self) -> bool {
        self.modifiers.contains(Modifiers::ABSTRACT)
    }

    /// A reference to this type, parameterized by its own formal parameters.
    pub fn type_ref(&self) -> TypeRef {
        TypeRef::generic(
            self.name.clone(),
            self.type_params.iter().map(TypeRef::type_param).collect(),
        )
    }

    pub fn field(&self, name: &str) -> Option<&FieldDecl> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn field_index_by_id(&self, id: SymbolHash) -> Option<usize> {
        self.fields.iter().position(|f| f.id == id)
    }

    pub fn method_index_by_id(&self, id: SymbolHash) -> Option<usize> {
        self.methods.iter().position(|m| m.id == id)
    }

    /// Index of the method designated by `method`, ignoring its owner.
    pub fn method_index_by_ref(&self, method: &MethodRef) -> Option<usize> {
        self.methods.iter().position(|m| m.matches_ref(method))
    }

    pub fn has_method_named(&self, name: &str) -> bool {
        self.methods.iter().any(|m| m.name == name)
    }

    /// Order fields and methods by their layout key, recursively.
    pub fn sort_members(&mut self) {
        self.fields.sort_by_key(|f| f.layout);
        self.methods.sort_by_key(|m| m.layout);
        for nested in &mut self.nested {
            nested.sort_members();
        }
    }

    /// Find a nested type (at any depth) by name.
    pub fn find_nested(&self, name: &str) -> Option<&TypeDecl> {
        self.nested.iter().find_map(|n| {
            if n.name == name {
                Some(n)
            } else {
                n.find_nested(name)
            }
        })
    }
}

impl Marked for TypeDecl {
    fn markers(&self) -> &[Marker] {
        &self.markers
    }

    fn markers_mut(&mut self) -> &mut Vec<Marker> {
        &mut self.markers
    }
}
