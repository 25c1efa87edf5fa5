//! Source positions of declarations and members.
//!
//! The front-end attaches a [`Span`] to every declaration, field, method and
//! constructor it hands over. Members synthesized by the compiler carry
//! [`Span::SYNTHESIZED`], which renders as `<generated>` in diagnostics.

use std::fmt;

/// A position in the original source, represented by its starting line and column.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Line number (1-indexed, 0 for synthesized members).
    pub line: u32,
    /// Column number (1-indexed, 0 for synthesized members).
    pub col: u32,
}

impl Span {
    /// Span of a member that has no counterpart in the input.
    pub const SYNTHESIZED: Span = Span { line: 0, col: 0 };

    /// Create a new span from a line and column.
    #[inline]
    pub const fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }

    /// Whether this span belongs to a synthesized member.
    #[inline]
    pub fn is_synthesized(&self) -> bool {
        self.line == 0
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_synthesized() {
            write!(f, "<generated>")
        } else {
            write!(f, "{}:{}", self.line, self.col)
        }
    }
}
