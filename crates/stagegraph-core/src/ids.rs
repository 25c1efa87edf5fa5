//! Arena handles used throughout a compilation run.
//!
//! All three handles are plain indices into per-run arenas: [`DeclId`] into the
//! [`SourceSet`](crate::SourceSet), [`DependencyId`] into the dependency graph,
//! and [`CompositionId`] into the composition tree. They are never valid across
//! runs.

use std::fmt;

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            /// Create a handle from an arena index.
            #[inline]
            pub const fn new(index: u32) -> Self {
                Self(index)
            }

            /// Get the underlying index.
            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "_{}"), self.0)
            }
        }

        impl From<usize> for $name {
            fn from(index: usize) -> Self {
                Self(index as u32)
            }
        }
    };
}

arena_id!(
    /// Identifies a declaration in the [`SourceSet`](crate::SourceSet).
    DeclId,
    "decl"
);

arena_id!(
    /// Identifies a stage or method node in the dependency graph.
    DependencyId,
    "dep"
);

arena_id!(
    /// Identifies a node of the composition tree.
    CompositionId,
    "node"
);

/// Location of a field or method inside a declaration of the source set.
///
/// Members are only ever appended to a declaration before merging, so a
/// location stays valid until the merge passes start moving members around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemberLoc {
    /// The declaration holding the member.
    pub decl: DeclId,
    /// Position of the member in the declaration's field or method list.
    pub index: usize,
}

impl MemberLoc {
    /// Create a member location.
    #[inline]
    pub const fn new(decl: DeclId, index: usize) -> Self {
        Self { decl, index }
    }
}
