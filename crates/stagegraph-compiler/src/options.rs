//! Options of a compilation run.

use stagegraph_core::ast::TypeRef;

/// Name of the interface the root merged type implements for its global close.
pub const DEFAULT_CLOSE_INTERFACE: &str = "AutoCloseable";

/// Settings applied to the root merged type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerOptions {
    /// Simple name of the root merged type. Defaults to the joined names of
    /// the root's declarations.
    pub merged_name: Option<String>,
    /// Package of the root merged type. Defaults to the package of the root's
    /// first declaration.
    pub merged_package: Option<String>,
    /// Interface added to the root merged type along with its `close()`.
    pub close_interface: Option<TypeRef>,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            merged_name: None,
            merged_package: None,
            close_interface: Some(TypeRef::named(DEFAULT_CLOSE_INTERFACE)),
        }
    }
}

impl CompilerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_merged_name(mut self, name: impl Into<String>) -> Self {
        self.merged_name = Some(name.into());
        self
    }

    pub fn with_merged_package(mut self, package: impl Into<String>) -> Self {
        self.merged_package = Some(package.into());
        self
    }

    pub fn with_close_interface(mut self, interface: Option<TypeRef>) -> Self {
        self.close_interface = interface;
        self
    }
}
