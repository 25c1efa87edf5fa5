//! Tree model of the declarations the compiler consumes and produces.
//!
//! The front-end hands over declarations whose field and method references are
//! already resolved ([`FieldRef`], [`MethodRef`]); the compiler rewrites the
//! same structures in place and returns merged [`TypeDecl`]s.

mod decl;
mod expr;
mod stmt;
mod types;
pub mod visitor;

pub use decl::{ConstructorDecl, FieldDecl, MethodDecl, Param, TypeDecl, TypeKind};
pub use expr::{BinaryOp, Expr, FieldRef, Literal, MethodRef, UnaryOp};
pub use stmt::{Block, Stmt};
pub use types::{Marked, Marker, Modifiers, TypeRef};
