//! Unified error type for a compilation run.
//!
//! Every failure aborts the run: passes return [`Result`] and the orchestrator
//! propagates the first error unchanged.
//!
//! ## Error Kinds
//!
//! ```text
//! CompilationError
//! ├── structural   - SpanViolation, AmbiguousReference, UnboundParent,
//! │                  NotParticipating, EmptyComposition, UnknownDeclaration,
//! │                  DuplicateDeclaration, DuplicateBinding,
//! │                  InterfaceBindingConflict
//! ├── lifecycle    - LifecycleDeclarationConflict, InvalidLifecycleSignature,
//! │                  OverloadClash, IllegalMutation
//! ├── graph        - InconsistentAccessPath, CyclicDependency
//! └── synthesis    - IllegalSuperCall, ReentrantSynthesis, ForeignMember
//! ```

use thiserror::Error;

use crate::Span;

/// Errors raised while analyzing or transforming composite declarations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompilationError {
    /// A stage's fields are declared in more than one link of an extension chain.
    #[error("{stage} fields cannot span several declarations: found in {first} and {second}")]
    SpanViolation {
        stage: String,
        first: String,
        second: String,
    },

    /// A reference field's type is assignable from zero or several composite declarations.
    #[error(
        "reference field {declaration}.{field} must match exactly one composite declaration, candidates: [{}]",
        .candidates.join(", ")
    )]
    AmbiguousReference {
        declaration: String,
        field: String,
        candidates: Vec<String>,
    },

    /// The same dependency is reached through two different reference routes.
    #[error("{dependant} reaches {dependency} through {first} and through {second}")]
    InconsistentAccessPath {
        dependant: String,
        dependency: String,
        first: String,
        second: String,
    },

    /// The dependency graph contains a cycle.
    #[error("stage dependency cycle: {}", .cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    /// A stage field is assigned outside its stage's init, close or stage methods.
    #[error("{field} shouldn't be assigned outside its stage's init() or close(): assigned in {location} at {span}")]
    IllegalMutation {
        field: String,
        location: String,
        span: Span,
    },

    /// The stage declares neither or both of an initialized field and a predicate,
    /// or has no initialized field and no close method.
    #[error("stage {stage}: {detail}")]
    LifecycleDeclarationConflict { stage: String, detail: String },

    /// A nested composition node has no reference field pointing at it from its parent.
    #[error("parent composition node is not referenced: [{}]", .declarations.join(", "))]
    UnboundParent { declarations: Vec<String> },

    /// Two init methods of the same stage have indistinguishable parameter lists.
    #[error("{method}() methods clash in stage {stage}")]
    OverloadClash { stage: String, method: String },

    /// A predicate or close method has the wrong return type or takes parameters.
    #[error("{method}() {detail}")]
    InvalidLifecycleSignature { method: String, detail: String },

    /// A declaration lacks the participation marker.
    #[error("all compiled declarations should be marked as participating: {declaration}")]
    NotParticipating { declaration: String },

    /// A composition node has no declarations to merge.
    #[error("composition node {node} has no declarations")]
    EmptyComposition { node: String },

    #[error("unknown declaration: {name}")]
    UnknownDeclaration { name: String },

    #[error("duplicate declaration: {name}")]
    DuplicateDeclaration { name: String },

    /// A declaration or member is bound twice, e.g. a declaration added to two
    /// composition nodes.
    #[error("{item} is already bound to {existing}")]
    DuplicateBinding { item: String, existing: String },

    /// An interface method is bound to two method nodes in one composition node.
    #[error("interface method {method} is already bound to {existing}; attempt to bind to {attempted}")]
    InterfaceBindingConflict {
        method: String,
        existing: String,
        attempted: String,
    },

    /// A super-constructor argument is not a plain parameter read.
    #[error("super() should be directly called with constructor parameters in {declaration}")]
    IllegalSuperCall { declaration: String },

    /// Memoized synthesis re-entered an artifact that is still being built.
    #[error("reentrant synthesis of {artifact} for {node}")]
    ReentrantSynthesis { node: String, artifact: String },

    /// A guarded accessor is requested from a stage that does not own the member.
    #[error("{member} doesn't belong to {stage}")]
    ForeignMember { member: String, stage: String },
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, CompilationError>;
