use std::sync::Arc;

use thiserror::Error;

/// Outcome of a top-level parse that did not produce exactly one result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("the input does not match the grammar")]
    NoMatch,
    #[error("the input matches the grammar in more than one way")]
    Ambiguous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CursorError {
    #[error("unexpected end of input")]
    EndOfInput,
}

/// Immutable position in the source text plus the user state threaded
/// through the parse.
///
/// Advancing returns a new cursor; the source is shared.
#[derive(Debug, Clone)]
pub struct Cursor<S> {
    source: Arc<str>,
    offset: usize,
    state: S,
}

impl<S> Cursor<S> {
    pub fn new(source: impl Into<Arc<str>>, state: S) -> Self {
        Self {
            source: source.into(),
            offset: 0,
            state,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Byte offset into the source.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    /// The unconsumed input.
    pub fn rest(&self) -> &str {
        &self.source[self.offset..]
    }

    pub fn is_at_end(&self) -> bool {
        self.offset >= self.source.len()
    }

    pub fn current(&self) -> Result<char, CursorError> {
        self.rest().chars().next().ok_or(CursorError::EndOfInput)
    }

    /// Replaces the threaded state, keeping the position.
    pub fn with_state<R>(&self, state: R) -> Cursor<R> {
        Cursor {
            source: Arc::clone(&self.source),
            offset: self.offset,
            state,
        }
    }
}

impl<S: Clone> Cursor<S> {
    /// Moves past the current character.
    pub fn advance(&self) -> Result<Self, CursorError> {
        let c = self.current()?;
        Ok(self.skip(c.len_utf8()))
    }

    /// Moves `bytes` forward. `bytes` must land on a character boundary.
    pub(crate) fn skip(&self, bytes: usize) -> Self {
        Self {
            source: Arc::clone(&self.source),
            offset: self.offset + bytes,
            state: self.state.clone(),
        }
    }
}

impl<S: PartialEq> PartialEq for Cursor<S> {
    fn eq(&self, other: &Self) -> bool {
        self.offset == other.offset
            && (Arc::ptr_eq(&self.source, &other.source) || self.source == other.source)
            && self.state == other.state
    }
}

/// One way of parsing a prefix of the input: the value and the cursor
/// after it.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed<T, S> {
    pub value: T,
    pub tail: Cursor<S>,
}

impl<T, S> Parsed<T, S> {
    pub fn new(value: T, tail: Cursor<S>) -> Self {
        Self { value, tail }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_and_advance() {
        let cursor = Cursor::new("ab", ());
        assert_eq!(cursor.current(), Ok('a'));

        let next = cursor.advance().unwrap();
        assert_eq!(next.current(), Ok('b'));
        assert_eq!(cursor.current(), Ok('a'));
    }

    #[test]
    fn test_end_of_input() {
        let cursor = Cursor::new("x", ()).advance().unwrap();
        assert!(cursor.is_at_end());
        assert_eq!(cursor.current(), Err(CursorError::EndOfInput));
        assert_eq!(cursor.advance().unwrap_err(), CursorError::EndOfInput);
    }

    #[test]
    fn test_multibyte_characters() {
        let cursor = Cursor::new("λx", ()).advance().unwrap();
        assert_eq!(cursor.offset(), 'λ'.len_utf8());
        assert_eq!(cursor.rest(), "x");
    }

    #[test]
    fn test_structural_equality() {
        let a = Cursor::new("abc", 1).advance().unwrap();
        let b = Cursor::new(String::from("abc"), 1).advance().unwrap();
        assert_eq!(a, b);
        assert_ne!(a, b.with_state(2));
    }
}
