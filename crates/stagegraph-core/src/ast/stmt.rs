//! Statement nodes and blocks.

use crate::ast::{Expr, TypeRef};

/// A sequence of statements.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Block {
    pub stmts: Vec<Stmt>,
}

impl Block {
    pub fn new(stmts: Vec<Stmt>) -> Self {
        Self { stmts }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.stmts.is_empty()
    }

    pub fn push(&mut self, stmt: Stmt) {
        self.stmts.push(stmt);
    }

    /// Insert a statement before all others.
    pub fn insert_begin(&mut self, stmt: Stmt) {
        self.stmts.insert(0, stmt);
    }

    /// Insert statements, in order, before all others.
    pub fn insert_begin_all(&mut self, stmts: Vec<Stmt>) {
        self.stmts.splice(0..0, stmts);
    }
}

/// A statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Stmt {
    Expr(Expr),
    Local {
        ty: TypeRef,
        name: String,
        init: Option<Expr>,
    },
    If {
        cond: Expr,
        then: Block,
        otherwise: Option<Block>,
    },
    While {
        cond: Expr,
        body: Block,
    },
    Return(Option<Expr>),
    /// `assert cond : message`, the liveness check of guarded accessors.
    Assert {
        cond: Expr,
        message: Option<Expr>,
    },
    Throw(Expr),
    /// Explicit invocation of the super constructor; only valid as the first
    /// statement of a constructor body.
    SuperConstructor {
        args: Vec<Expr>,
    },
    Block(Block),
}

impl Stmt {
    pub fn expr(expr: Expr) -> Self {
        Stmt::Expr(expr)
    }

    pub fn ret(expr: Expr) -> Self {
        Stmt::Return(Some(expr))
    }

    pub fn return_void() -> Self {
        Stmt::Return(None)
    }

    /// `if (cond) stmt;`
    pub fn if_then(cond: Expr, stmt: Stmt) -> Self {
        Stmt::If {
            cond,
            then: Block::new(vec![stmt]),
            otherwise: None,
        }
    }

    pub fn local(ty: TypeRef, name: impl Into<String>, init: Expr) -> Self {
        Stmt::Local {
            ty,
            name: name.into(),
            init: Some(init),
        }
    }
}
