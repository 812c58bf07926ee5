//! Scannerless parser over source text.
//!
//! A parser maps a [`Cursor`] to a lazy stream of [`Parsed`] results.
//! Grammar rules are built from the combinators here and thread a
//! [`Scope`] through the cursor, so symbol declarations flow forward
//! with the input position and are dropped on backtracking.

pub mod combinators;
pub mod grammar;
pub mod repetition;
mod scope;
mod state;

pub use combinators::*;
pub use repetition::*;
pub use scope::Scope;
pub use state::{Cursor, CursorError, ParseError, Parsed};
