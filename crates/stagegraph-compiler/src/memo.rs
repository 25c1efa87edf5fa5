//! Three-state memoization of synthesized members.
//!
//! Every lazily synthesized member (accessor, guarded wrapper, predicate,
//! close, close-dependants) is built at most once. A request arriving while
//! the same member is still being built is a reentrancy bug and fails with
//! `ReentrantSynthesis` instead of looping.

use stagegraph_core::{CompilationError, Result};

/// State of one memoized artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Memo<T> {
    #[default]
    NotStarted,
    InProgress,
    Done(T),
}

impl<T: Clone> Memo<T> {
    /// The finished value, if any.
    pub fn get(&self) -> Option<&T> {
        match self {
            Memo::Done(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Memo::Done(_))
    }

    /// Begin building the artifact.
    ///
    /// Returns the finished value if there is one; otherwise marks the
    /// artifact in progress and returns `None`, and the caller must
    /// [`finish`](Self::finish) it.
    pub fn start(&mut self, node: &str, artifact: &str) -> Result<Option<T>> {
        match self {
            Memo::Done(value) => Ok(Some(value.clone())),
            Memo::InProgress => Err(CompilationError::ReentrantSynthesis {
                node: node.to_string(),
                artifact: artifact.to_string(),
            }),
            Memo::NotStarted => {
                *self = Memo::InProgress;
                Ok(None)
            }
        }
    }

    /// Store the finished value and return it.
    pub fn finish(&mut self, value: T) -> T {
        *self = Memo::Done(value.clone());
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_once() {
        let mut memo: Memo<u32> = Memo::default();
        assert_eq!(memo.start("Foo", "accessor").unwrap(), None);
        assert_eq!(memo.finish(7), 7);
        assert_eq!(memo.start("Foo", "accessor").unwrap(), Some(7));
        assert_eq!(memo.get(), Some(&7));
    }

    #[test]
    fn reentry_fails() {
        let mut memo: Memo<u32> = Memo::default();
        memo.start("Foo", "close").unwrap();
        let err = memo.start("Foo", "close").unwrap_err();
        assert_eq!(
            err,
            CompilationError::ReentrantSynthesis {
                node: "Foo".into(),
                artifact: "close".into()
            }
        );
        assert!(!memo.is_done());
    }
}
