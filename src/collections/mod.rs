//! Persistent (immutable, structurally shared) collections.
//!
//! Both structures hand out new versions on update and never mutate a
//! version that somebody else may still hold. They back the symbol table
//! and the block-local variable list of [`crate::parser::Scope`].

mod map;
mod stack;

pub use map::{Iter as MapIter, PersistentMap};
pub use stack::{Iter as StackIter, PersistentStack};

use thiserror::Error;

/// Misuse of a persistent collection.
///
/// These never arise from user input; a grammar rule that triggers one is
/// broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CollectionError {
    #[error("the specified key already exists")]
    DuplicateKey,
    #[error("the stack is empty")]
    EmptyStack,
}
