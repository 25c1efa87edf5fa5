//! Visitor pattern for traversing and rewriting the tree.
//!
//! [`Visitor`] walks the tree read-only; [`VisitorMut`] walks it with mutable
//! access so expressions can be replaced in place. Each `visit_*` method has a
//! default implementation that calls the corresponding `walk_*` function, so an
//! implementation only overrides the nodes it cares about. Not calling the
//! `walk_*` function from an override skips the node's children.
//!
//! # Example
//!
//! ```
//! use stagegraph_core::ast::{Expr, FieldRef, visitor::{Visitor, walk_expr}};
//!
//! struct FieldCounter(usize);
//!
//! impl Visitor for FieldCounter {
//!     fn visit_expr(&mut self, expr: &Expr) {
//!         if matches!(expr, Expr::Field { .. }) {
//!             self.0 += 1;
//!         }
//!         walk_expr(self, expr);
//!     }
//! }
//!
//! let expr = Expr::field_of(
//!     Expr::field(FieldRef::new("A", "b")),
//!     FieldRef::new("B", "c"),
//! );
//! let mut counter = FieldCounter(0);
//! counter.visit_expr(&expr);
//! assert_eq!(counter.0, 2);
//! ```

use crate::ast::{Block, ConstructorDecl, Expr, FieldDecl, MethodDecl, Stmt, TypeDecl, TypeRef};

/// Read-only traversal.
pub trait Visitor: Sized {
    fn visit_type_decl(&mut self, decl: &TypeDecl) {
        walk_type_decl(self, decl);
    }

    fn visit_field_decl(&mut self, field: &FieldDecl) {
        walk_field_decl(self, field);
    }

    fn visit_method_decl(&mut self, method: &MethodDecl) {
        walk_method_decl(self, method);
    }

    fn visit_constructor_decl(&mut self, constructor: &ConstructorDecl) {
        walk_constructor_decl(self, constructor);
    }

    fn visit_block(&mut self, block: &Block) {
        walk_block(self, block);
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr);
    }
}

pub fn walk_type_decl<V: Visitor>(visitor: &mut V, decl: &TypeDecl) {
    for field in &decl.fields {
        visitor.visit_field_decl(field);
    }
    for constructor in &decl.constructors {
        visitor.visit_constructor_decl(constructor);
    }
    for method in &decl.methods {
        visitor.visit_method_decl(method);
    }
    for nested in &decl.nested {
        visitor.visit_type_decl(nested);
    }
}

pub fn walk_field_decl<V: Visitor>(visitor: &mut V, field: &FieldDecl) {
    if let Some(init) = &field.init {
        visitor.visit_expr(init);
    }
}

pub fn walk_method_decl<V: Visitor>(visitor: &mut V, method: &MethodDecl) {
    if let Some(body) = &method.body {
        visitor.visit_block(body);
    }
}

pub fn walk_constructor_decl<V: Visitor>(visitor: &mut V, constructor: &ConstructorDecl) {
    visitor.visit_block(&constructor.body);
}

pub fn walk_block<V: Visitor>(visitor: &mut V, block: &Block) {
    for stmt in &block.stmts {
        visitor.visit_stmt(stmt);
    }
}

pub fn walk_stmt<V: Visitor>(visitor: &mut V, stmt: &Stmt) {
    match stmt {
        Stmt::Expr(expr) | Stmt::Throw(expr) => visitor.visit_expr(expr),
        Stmt::Local { init, .. } => {
            if let Some(init) = init {
                visitor.visit_expr(init);
            }
        }
        Stmt::If {
            cond,
            then,
            otherwise,
        } => {
            visitor.visit_expr(cond);
            visitor.visit_block(then);
            if let Some(otherwise) = otherwise {
                visitor.visit_block(otherwise);
            }
        }
        Stmt::While { cond, body } => {
            visitor.visit_expr(cond);
            visitor.visit_block(body);
        }
        Stmt::Return(value) => {
            if let Some(value) = value {
                visitor.visit_expr(value);
            }
        }
        Stmt::Assert { cond, message } => {
            visitor.visit_expr(cond);
            if let Some(message) = message {
                visitor.visit_expr(message);
            }
        }
        Stmt::SuperConstructor { args } => {
            for arg in args {
                visitor.visit_expr(arg);
            }
        }
        Stmt::Block(block) => visitor.visit_block(block),
    }
}

pub fn walk_expr<V: Visitor>(visitor: &mut V, expr: &Expr) {
    match expr {
        Expr::Literal(_) | Expr::This { .. } | Expr::Super | Expr::Local(_) => {}
        Expr::Field { target, .. } => {
            if let Some(target) = target {
                visitor.visit_expr(target);
            }
        }
        Expr::Call { target, args, .. } => {
            if let Some(target) = target {
                visitor.visit_expr(target);
            }
            for arg in args {
                visitor.visit_expr(arg);
            }
        }
        Expr::New { args, .. } => {
            for arg in args {
                visitor.visit_expr(arg);
            }
        }
        Expr::Unary { operand, .. } => visitor.visit_expr(operand),
        Expr::Binary { lhs, rhs, .. } => {
            visitor.visit_expr(lhs);
            visitor.visit_expr(rhs);
        }
        Expr::Assign { target, value, .. } => {
            visitor.visit_expr(target);
            visitor.visit_expr(value);
        }
        Expr::Conditional {
            cond,
            then,
            otherwise,
        } => {
            visitor.visit_expr(cond);
            visitor.visit_expr(then);
            visitor.visit_expr(otherwise);
        }
    }
}

/// In-place rewriting traversal.
pub trait VisitorMut: Sized {
    fn visit_type_decl_mut(&mut self, decl: &mut TypeDecl) {
        walk_type_decl_mut(self, decl);
    }

    fn visit_field_decl_mut(&mut self, field: &mut FieldDecl) {
        walk_field_decl_mut(self, field);
    }

    fn visit_method_decl_mut(&mut self, method: &mut MethodDecl) {
        walk_method_decl_mut(self, method);
    }

    fn visit_constructor_decl_mut(&mut self, constructor: &mut ConstructorDecl) {
        walk_constructor_decl_mut(self, constructor);
    }

    fn visit_block_mut(&mut self, block: &mut Block) {
        walk_block_mut(self, block);
    }

    fn visit_stmt_mut(&mut self, stmt: &mut Stmt) {
        walk_stmt_mut(self, stmt);
    }

    fn visit_expr_mut(&mut self, expr: &mut Expr) {
        walk_expr_mut(self, expr);
    }

    /// Called for every type reference in declarations, locals, `new`
    /// expressions and method references.
    fn visit_type_ref_mut(&mut self, ty: &mut TypeRef) {
        walk_type_ref_mut(self, ty);
    }
}

pub fn walk_type_decl_mut<V: VisitorMut>(visitor: &mut V, decl: &mut TypeDecl) {
    if let Some(superclass) = &mut decl.superclass {
        visitor.visit_type_ref_mut(superclass);
    }
    for interface in &mut decl.interfaces {
        visitor.visit_type_ref_mut(interface);
    }
    for field in &mut decl.fields {
        visitor.visit_field_decl_mut(field);
    }
    for constructor in &mut decl.constructors {
        visitor.visit_constructor_decl_mut(constructor);
    }
    for method in &mut decl.methods {
        visitor.visit_method_decl_mut(method);
    }
    for nested in &mut decl.nested {
        visitor.visit_type_decl_mut(nested);
    }
}

pub fn walk_field_decl_mut<V: VisitorMut>(visitor: &mut V, field: &mut FieldDecl) {
    visitor.visit_type_ref_mut(&mut field.ty);
    if let Some(init) = &mut field.init {
        visitor.visit_expr_mut(init);
    }
}

pub fn walk_method_decl_mut<V: VisitorMut>(visitor: &mut V, method: &mut MethodDecl) {
    visitor.visit_type_ref_mut(&mut method.ret);
    for param in &mut method.params {
        visitor.visit_type_ref_mut(&mut param.ty);
    }
    if let Some(body) = &mut method.body {
        visitor.visit_block_mut(body);
    }
}

pub fn walk_constructor_decl_mut<V: VisitorMut>(
    visitor: &mut V,
    constructor: &mut ConstructorDecl,
) {
    for param in &mut constructor.params {
        visitor.visit_type_ref_mut(&mut param.ty);
    }
    visitor.visit_block_mut(&mut constructor.body);
}

pub fn walk_block_mut<V: VisitorMut>(visitor: &mut V, block: &mut Block) {
    for stmt in &mut block.stmts {
        visitor.visit_stmt_mut(stmt);
    }
}

pub fn walk_stmt_mut<V: VisitorMut>(visitor: &mut V, stmt: &mut Stmt) {
    match stmt {
        Stmt::Expr(expr) | Stmt::Throw(expr) => visitor.visit_expr_mut(expr),
        Stmt::Local { ty, init, .. } => {
            visitor.visit_type_ref_mut(ty);
            if let Some(init) = init {
                visitor.visit_expr_mut(init);
            }
        }
        Stmt::If {
            cond,
            then,
            otherwise,
        } => {
            visitor.visit_expr_mut(cond);
            visitor.visit_block_mut(then);
            if let Some(otherwise) = otherwise {
                visitor.visit_block_mut(otherwise);
            }
        }
        Stmt::While { cond, body } => {
            visitor.visit_expr_mut(cond);
            visitor.visit_block_mut(body);
        }
        Stmt::Return(value) => {
            if let Some(value) = value {
                visitor.visit_expr_mut(value);
            }
        }
        Stmt::Assert { cond, message } => {
            visitor.visit_expr_mut(cond);
            if let Some(message) = message {
                visitor.visit_expr_mut(message);
            }
        }
        Stmt::SuperConstructor { args } => {
            for arg in args {
                visitor.visit_expr_mut(arg);
            }
        }
        Stmt::Block(block) => visitor.visit_block_mut(block),
    }
}

pub fn walk_expr_mut<V: VisitorMut>(visitor: &mut V, expr: &mut Expr) {
    match expr {
        Expr::Literal(_) | Expr::This { .. } | Expr::Super | Expr::Local(_) => {}
        Expr::Field { target, .. } => {
            if let Some(target) = target {
                visitor.visit_expr_mut(target);
            }
        }
        Expr::Call {
            target,
            method,
            args,
        } => {
            if let Some(target) = target {
                visitor.visit_expr_mut(target);
            }
            for param in &mut method.params {
                visitor.visit_type_ref_mut(param);
            }
            for arg in args {
                visitor.visit_expr_mut(arg);
            }
        }
        Expr::New { ty, args } => {
            visitor.visit_type_ref_mut(ty);
            for arg in args {
                visitor.visit_expr_mut(arg);
            }
        }
        Expr::Unary { operand, .. } => visitor.visit_expr_mut(operand),
        Expr::Binary { lhs, rhs, .. } => {
            visitor.visit_expr_mut(lhs);
            visitor.visit_expr_mut(rhs);
        }
        Expr::Assign { target, value, .. } => {
            visitor.visit_expr_mut(target);
            visitor.visit_expr_mut(value);
        }
        Expr::Conditional {
            cond,
            then,
            otherwise,
        } => {
            visitor.visit_expr_mut(cond);
            visitor.visit_expr_mut(then);
            visitor.visit_expr_mut(otherwise);
        }
    }
}

pub fn walk_type_ref_mut<V: VisitorMut>(visitor: &mut V, ty: &mut TypeRef) {
    for arg in &mut ty.args {
        visitor.visit_type_ref_mut(arg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{FieldRef, MethodRef};

    struct Renamer;

    impl VisitorMut for Renamer {
        fn visit_expr_mut(&mut self, expr: &mut Expr) {
            if let Expr::Field { field, .. } = expr {
                field.owner = "Merged".into();
            }
            walk_expr_mut(self, expr);
        }
    }

    #[test]
    fn rewrites_nested_expressions() {
        let mut block = Block::new(vec![Stmt::ret(Expr::binary(
            crate::ast::BinaryOp::Add,
            Expr::field(FieldRef::new("A", "x")),
            Expr::call(
                MethodRef::new("A", "f", vec![]),
                vec![Expr::field(FieldRef::new("B", "y"))],
            ),
        ))]);
        Renamer.visit_block_mut(&mut block);

        struct Owners(Vec<String>);
        impl Visitor for Owners {
            fn visit_expr(&mut self, expr: &Expr) {
                if let Expr::Field { field, .. } = expr {
                    self.0.push(field.owner.clone());
                }
                walk_expr(self, expr);
            }
        }
        let mut owners = Owners(Vec::new());
        owners.visit_block(&block);
        assert_eq!(owners.0, ["Merged", "Merged"]);
    }

    #[test]
    fn walks_whole_declaration() {
        let decl = TypeDecl::class("A")
            .with_field(
                FieldDecl::new("x", TypeRef::int()).with_init(Expr::field(FieldRef::new("A", "y"))),
            )
            .with_method(MethodDecl::new("m", TypeRef::void()).with_body(Block::new(vec![
                Stmt::expr(Expr::field(FieldRef::new("A", "x"))),
            ])));

        struct Count(usize);
        impl Visitor for Count {
            fn visit_expr(&mut self, expr: &Expr) {
                self.0 += 1;
                walk_expr(self, expr);
            }
        }
        let mut count = Count(0);
        count.visit_type_decl(&decl);
        assert_eq!(count.0, 2);
    }

    #[test]
    fn type_refs_are_reachable() {
        struct Substitute;
        impl VisitorMut for Substitute {
            fn visit_type_ref_mut(&mut self, ty: &mut TypeRef) {
                if ty.is_type_param && ty.name == "T" {
                    *ty = TypeRef::named("String");
                }
                walk_type_ref_mut(self, ty);
            }
        }

        let mut decl = TypeDecl::class("Box")
            .with_field(FieldDecl::new("value", TypeRef::type_param("T")))
            .with_method(
                MethodDecl::new("wrap", TypeRef::generic("List", vec![TypeRef::type_param("T")]))
                    .with_param("item", TypeRef::type_param("T")),
            );
        Substitute.visit_type_decl_mut(&mut decl);
        assert_eq!(decl.fields[0].ty, TypeRef::named("String"));
        assert_eq!(decl.methods[0].ret.args[0], TypeRef::named("String"));
        assert_eq!(decl.methods[0].params[0].ty, TypeRef::named("String"));
    }
}
