//! Type references, modifiers and declarative markers.

use std::fmt;

use bitflags::bitflags;

use crate::SymbolHash;

/// A reference to a type as written at a use site.
///
/// Examples: `int`, `List<T>`, `Part1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeRef {
    /// Simple name of the referenced type.
    pub name: String,
    /// Actual type arguments.
    pub args: Vec<TypeRef>,
    /// Whether this names a formal type parameter rather than a declaration.
    pub is_type_param: bool,
}

impl TypeRef {
    /// Reference a type by name, without type arguments.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            is_type_param: false,
        }
    }

    /// Reference a generic type instantiated with `args`.
    pub fn generic(name: impl Into<String>, args: Vec<TypeRef>) -> Self {
        Self {
            name: name.into(),
            args,
            is_type_param: false,
        }
    }

    /// Reference a formal type parameter.
    pub fn type_param(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            is_type_param: true,
        }
    }

    pub fn void() -> Self {
        Self::named("void")
    }

    pub fn boolean() -> Self {
        Self::named("boolean")
    }

    pub fn int() -> Self {
        Self::named("int")
    }

    pub fn long() -> Self {
        Self::named("long")
    }

    pub fn is_void(&self) -> bool {
        self.name == "void" && self.args.is_empty()
    }

    pub fn is_boolean(&self) -> bool {
        self.name == "boolean" && self.args.is_empty()
    }

    /// Whether this is an integral primitive (`byte`, `short`, `int`, `long`).
    pub fn is_integral(&self) -> bool {
        self.args.is_empty() && matches!(self.name.as_str(), "byte" | "short" | "int" | "long")
    }

    /// Whether this is a numeric primitive, integral or floating.
    pub fn is_numeric_primitive(&self) -> bool {
        self.is_integral()
            || (self.args.is_empty() && matches!(self.name.as_str(), "char" | "float" | "double"))
    }

    /// Identity hash of the rendered type.
    pub fn hash(&self) -> SymbolHash {
        SymbolHash::from_type(&self.to_string())
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.args.is_empty() {
            write!(f, "<")?;
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{arg}")?;
            }
            write!(f, ">")?;
        }
        Ok(())
    }
}

bitflags! {
    /// Modifiers of declarations and members.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        const PUBLIC = 1 << 0;
        const PROTECTED = 1 << 1;
        const PRIVATE = 1 << 2;
        const STATIC = 1 << 3;
        const FINAL = 1 << 4;
        const ABSTRACT = 1 << 5;
    }
}

impl Modifiers {
    /// All visibility modifiers.
    pub const VISIBILITY: Modifiers = Modifiers::PUBLIC
        .union(Modifiers::PROTECTED)
        .union(Modifiers::PRIVATE);

    /// Replace the visibility with `visibility`.
    pub fn set_visibility(&mut self, visibility: Modifiers) {
        self.remove(Self::VISIBILITY);
        self.insert(visibility & Self::VISIBILITY);
    }
}

/// Declarative markers understood by the compiler.
///
/// All of them are stripped from the output.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Marker {
    /// The type takes part in merging.
    Participates,
    /// The field or method belongs to the named stage.
    Stage(String),
    /// The field is a structural reference into the composition tree.
    Reference,
    /// The method overrides a method of a base type.
    Override,
}

impl Marker {
    /// Whether this marker is consumed by the compiler and removed from the output.
    pub fn is_compiler_marker(&self) -> bool {
        !matches!(self, Marker::Override)
    }
}

/// Access to the markers of a declaration or member.
pub trait Marked {
    fn markers(&self) -> &[Marker];

    fn markers_mut(&mut self) -> &mut Vec<Marker>;

    fn has_marker(&self, marker: &Marker) -> bool {
        self.markers().contains(marker)
    }

    /// The stage named by a `Stage` marker, if any.
    fn stage_tag(&self) -> Option<&str> {
        self.markers().iter().find_map(|m| match m {
            Marker::Stage(name) => Some(name.as_str()),
            _ => None,
        })
    }

    fn is_reference(&self) -> bool {
        self.has_marker(&Marker::Reference)
    }

    fn is_participating(&self) -> bool {
        self.has_marker(&Marker::Participates)
    }

    fn remove_marker(&mut self, marker: &Marker) {
        self.markers_mut().retain(|m| m != marker);
    }

    /// Remove every compiler marker, keeping `Override`.
    fn strip_compiler_markers(&mut self) {
        self.markers_mut().retain(|m| !m.is_compiler_marker());
    }
}
