//! Expression nodes.
//!
//! References to fields and methods are already resolved by the front-end to
//! the declaration that owns them ([`FieldRef`], [`MethodRef`]). A `None`
//! target on a field access or call means implicit `this`.

use std::fmt;

use ordered_float::OrderedFloat;

use crate::SymbolHash;
use crate::ast::TypeRef;

/// A literal value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Literal {
    Int(i64),
    Long(i64),
    Float(OrderedFloat<f64>),
    Bool(bool),
    Char(char),
    Str(String),
    Null,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    Neg,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

impl UnaryOp {
    /// Whether the operator writes to its operand.
    pub fn is_mutation(self) -> bool {
        matches!(
            self,
            UnaryOp::PreInc | UnaryOp::PreDec | UnaryOp::PostInc | UnaryOp::PostDec
        )
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
}

impl BinaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
        }
    }
}

/// A resolved reference to a field: the declaring type and the field name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldRef {
    pub owner: String,
    pub name: String,
}

impl FieldRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Identity of the referenced field.
    pub fn hash(&self) -> SymbolHash {
        SymbolHash::from_field(&self.owner, &self.name)
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.owner, self.name)
    }
}

/// A resolved reference to a method: declaring type, name and parameter types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodRef {
    pub owner: String,
    pub name: String,
    pub params: Vec<TypeRef>,
}

impl MethodRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>, params: Vec<TypeRef>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            params,
        }
    }

    /// Identity of the referenced method.
    pub fn hash(&self) -> SymbolHash {
        let params: Vec<SymbolHash> = self.params.iter().map(TypeRef::hash).collect();
        SymbolHash::from_method(&self.owner, &self.name, &params)
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}(", self.owner, self.name)?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{p}")?;
        }
        write!(f, ")")
    }
}

/// An expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    Literal(Literal),
    /// `this`, or `Outer.this` when `qualifier` names an enclosing type.
    This { qualifier: Option<String> },
    /// `super`, only meaningful as a call target.
    Super,
    /// Read of a local variable or parameter.
    Local(String),
    Field {
        target: Option<Box<Expr>>,
        field: FieldRef,
    },
    Call {
        target: Option<Box<Expr>>,
        method: MethodRef,
        args: Vec<Expr>,
    },
    New {
        ty: TypeRef,
        args: Vec<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `target = value`, or `target op= value` when `op` is set.
    Assign {
        op: Option<BinaryOp>,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Conditional {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
}

impl Expr {
    pub fn int(value: i64) -> Self {
        Expr::Literal(Literal::Int(value))
    }

    pub fn bool(value: bool) -> Self {
        Expr::Literal(Literal::Bool(value))
    }

    pub fn null() -> Self {
        Expr::Literal(Literal::Null)
    }

    pub fn str(value: impl Into<String>) -> Self {
        Expr::Literal(Literal::Str(value.into()))
    }

    pub fn this() -> Self {
        Expr::This { qualifier: None }
    }

    pub fn this_of(qualifier: impl Into<String>) -> Self {
        Expr::This {
            qualifier: Some(qualifier.into()),
        }
    }

    pub fn local(name: impl Into<String>) -> Self {
        Expr::Local(name.into())
    }

    /// Field access on implicit `this`.
    pub fn field(field: FieldRef) -> Self {
        Expr::Field {
            target: None,
            field,
        }
    }

    pub fn field_of(target: Expr, field: FieldRef) -> Self {
        Expr::Field {
            target: Some(Box::new(target)),
            field,
        }
    }

    /// Method call on implicit `this`.
    pub fn call(method: MethodRef, args: Vec<Expr>) -> Self {
        Expr::Call {
            target: None,
            method,
            args,
        }
    }

    pub fn call_on(target: Option<Expr>, method: MethodRef, args: Vec<Expr>) -> Self {
        Expr::Call {
            target: target.map(Box::new),
            method,
            args,
        }
    }

    pub fn new_instance(ty: TypeRef) -> Self {
        Expr::New {
            ty,
            args: Vec::new(),
        }
    }

    pub fn not(operand: Expr) -> Self {
        Expr::Unary {
            op: UnaryOp::Not,
            operand: Box::new(operand),
        }
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn assign(target: Expr, value: Expr) -> Self {
        Expr::Assign {
            op: None,
            target: Box::new(target),
            value: Box::new(value),
        }
    }

    /// Whether this is the literal `-1` (either as a literal or a negated `1`).
    pub fn is_minus_one(&self) -> bool {
        match self {
            Expr::Literal(Literal::Int(-1) | Literal::Long(-1)) => true,
            Expr::Unary {
                op: UnaryOp::Neg,
                operand,
            } => matches!(
                operand.as_ref(),
                Expr::Literal(Literal::Int(1) | Literal::Long(1))
            ),
            _ => false,
        }
    }

    /// The field accessed by this expression, if it is a field access.
    pub fn as_field(&self) -> Option<&FieldRef> {
        match self {
            Expr::Field { field, .. } => Some(field),
            _ => None,
        }
    }

    /// Whether this is `this` (qualified or not).
    pub fn is_this(&self) -> bool {
        matches!(self, Expr::This { .. })
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(v) => write!(f, "{v}"),
            Literal::Long(v) => write!(f, "{v}L"),
            Literal::Float(v) => write!(f, "{}", v.0),
            Literal::Bool(v) => write!(f, "{v}"),
            Literal::Char(c) => write!(f, "'{c}'"),
            Literal::Str(s) => write!(f, "{s:?}"),
            Literal::Null => write!(f, "null"),
        }
    }
}

fn write_target(f: &mut fmt::Formatter<'_>, target: &Option<Box<Expr>>) -> fmt::Result {
    match target {
        Some(t) => write!(f, "{t}."),
        None => Ok(()),
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[Expr]) -> fmt::Result {
    write!(f, "(")?;
    for (i, a) in args.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{a}")?;
    }
    write!(f, ")")
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(lit) => write!(f, "{lit}"),
            Expr::This { qualifier: None } => write!(f, "this"),
            Expr::This {
                qualifier: Some(q),
            } => write!(f, "{q}.this"),
            Expr::Super => write!(f, "super"),
            Expr::Local(name) => write!(f, "{name}"),
            Expr::Field { target, field } => {
                write_target(f, target)?;
                write!(f, "{}", field.name)
            }
            Expr::Call {
                target,
                method,
                args,
            } => {
                write_target(f, target)?;
                write!(f, "{}", method.name)?;
                write_args(f, args)
            }
            Expr::New { ty, args } => {
                write!(f, "new {ty}")?;
                write_args(f, args)
            }
            Expr::Unary { op, operand } => match op {
                UnaryOp::Not => write!(f, "!{operand}"),
                UnaryOp::Neg => write!(f, "-{operand}"),
                UnaryOp::PreInc => write!(f, "++{operand}"),
                UnaryOp::PreDec => write!(f, "--{operand}"),
                UnaryOp::PostInc => write!(f, "{operand}++"),
                UnaryOp::PostDec => write!(f, "{operand}--"),
            },
            Expr::Binary { op, lhs, rhs } => write!(f, "{lhs} {} {rhs}", op.as_str()),
            Expr::Assign { op, target, value } => match op {
                Some(op) => write!(f, "{target} {}= {value}", op.as_str()),
                None => write!(f, "{target} = {value}"),
            },
            Expr::Conditional {
                cond,
                then,
                otherwise,
            } => write!(f, "{cond} ? {then} : {otherwise}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minus_one_forms() {
        assert!(Expr::int(-1).is_minus_one());
        assert!(Expr::Literal(Literal::Long(-1)).is_minus_one());
        let negated = Expr::Unary {
            op: UnaryOp::Neg,
            operand: Box::new(Expr::int(1)),
        };
        assert!(negated.is_minus_one());
        assert!(!Expr::int(0).is_minus_one());
        assert!(!Expr::null().is_minus_one());
    }

    #[test]
    fn display_field_chain_and_call() {
        let p1 = FieldRef::new("Part2", "p1");
        let a = FieldRef::new("Part1", "a");
        let access = Expr::field_of(Expr::field(p1), a);
        assert_eq!(access.to_string(), "p1.a");

        let call = Expr::call_on(
            Some(Expr::this_of("Outer")),
            MethodRef::new("Outer", "run", vec![TypeRef::int()]),
            vec![Expr::int(1)],
        );
        assert_eq!(call.to_string(), "Outer.this.run(1)");
    }

    #[test]
    fn method_ref_hash_tracks_params() {
        let m1 = MethodRef::new("A", "m", vec![TypeRef::int()]);
        let m2 = MethodRef::new("A", "m", vec![]);
        assert_ne!(m1.hash(), m2.hash());
        assert_eq!(m1.hash(), m1.clone().hash());
    }

    #[test]
    fn unary_mutations() {
        assert!(UnaryOp::PostInc.is_mutation());
        assert!(!UnaryOp::Not.is_mutation());
    }
}
