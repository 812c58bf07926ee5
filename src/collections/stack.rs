//! Persistent singly-linked LIFO stack.

use std::fmt;
use std::sync::Arc;

use super::CollectionError;

struct Frame<T> {
    value: T,
    next: Option<Arc<Frame<T>>>,
}

/// Immutable stack; `push` shares the receiver as the new tail.
pub struct PersistentStack<T> {
    head: Option<Arc<Frame<T>>>,
    len: usize,
}

impl<T> PersistentStack<T> {
    pub fn new() -> Self {
        Self { head: None, len: 0 }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    pub fn push(&self, value: T) -> Self {
        Self {
            head: Some(Arc::new(Frame {
                value,
                next: self.head.clone(),
            })),
            len: self.len + 1,
        }
    }

    pub fn peek(&self) -> Result<&T, CollectionError> {
        self.head
            .as_deref()
            .map(|frame| &frame.value)
            .ok_or(CollectionError::EmptyStack)
    }

    /// Returns the top element together with the rest of the stack.
    pub fn pop(&self) -> Result<(&T, Self), CollectionError> {
        let frame = self.head.as_deref().ok_or(CollectionError::EmptyStack)?;
        let rest = Self {
            head: frame.next.clone(),
            len: self.len - 1,
        };
        Ok((&frame.value, rest))
    }

    /// Iterates from the most recently pushed element down.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            next: self.head.as_deref(),
        }
    }
}

impl<T: Clone> PersistentStack<T> {
    /// Elements in push order (oldest first).
    pub fn to_vec_in_push_order(&self) -> Vec<T> {
        let mut values: Vec<T> = self.iter().cloned().collect();
        values.reverse();
        values
    }
}

pub struct Iter<'a, T> {
    next: Option<&'a Frame<T>>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let frame = self.next?;
        self.next = frame.next.as_deref();
        Some(&frame.value)
    }
}

impl<'a, T> IntoIterator for &'a PersistentStack<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// Unlinks uniquely owned frames one at a time; the derived drop would
// recurse once per frame.
impl<T> Drop for PersistentStack<T> {
    fn drop(&mut self) {
        let mut next = self.head.take();
        while let Some(frame) = next {
            match Arc::try_unwrap(frame) {
                Ok(mut frame) => next = frame.next.take(),
                Err(_) => break,
            }
        }
    }
}

impl<T> Clone for PersistentStack<T> {
    fn clone(&self) -> Self {
        Self {
            head: self.head.clone(),
            len: self.len,
        }
    }
}

impl<T> Default for PersistentStack<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: PartialEq> PartialEq for PersistentStack<T> {
    fn eq(&self, other: &Self) -> bool {
        let same_head = match (&self.head, &other.head) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        same_head || (self.len == other.len && self.iter().eq(other.iter()))
    }
}

impl<T: Eq> Eq for PersistentStack<T> {}

impl<T: fmt::Debug> fmt::Debug for PersistentStack<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_stack_fails() {
        let stack: PersistentStack<i32> = PersistentStack::new();
        assert_eq!(stack.peek().unwrap_err(), CollectionError::EmptyStack);
        assert_eq!(stack.pop().unwrap_err(), CollectionError::EmptyStack);
    }

    #[test]
    fn test_push_pop() {
        let stack = PersistentStack::new().push(1).push(2);
        let (top, rest) = stack.pop().unwrap();
        assert_eq!(*top, 2);
        assert_eq!(rest.peek(), Ok(&1));
        assert_eq!(rest.len(), 1);
    }

    #[test]
    fn test_branches_are_independent() {
        let base = PersistentStack::new().push("a");
        let left = base.push("b");
        let right = base.push("c");

        assert_eq!(base.peek(), Ok(&"a"));
        assert_eq!(left.iter().copied().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(right.iter().copied().collect::<Vec<_>>(), vec!["c", "a"]);
    }

    #[test]
    fn test_push_order() {
        let stack = PersistentStack::new().push('x').push('y').push('z');
        assert_eq!(stack.to_vec_in_push_order(), vec!['x', 'y', 'z']);
    }

    #[test]
    fn test_long_stack_drops() {
        let mut stack = PersistentStack::new();
        for i in 0..200_000 {
            stack = stack.push(i);
        }
        assert_eq!(stack.len(), 200_000);
        drop(stack);
    }

    proptest! {
        #[test]
        fn prop_push_never_changes_receiver(
            base in prop::collection::vec(any::<u8>(), 0..50),
            extra in prop::collection::vec(any::<u8>(), 1..20),
        ) {
            let mut stack = PersistentStack::new();
            for value in &base {
                stack = stack.push(*value);
            }
            let before: Vec<u8> = stack.iter().copied().collect();

            let mut grown = stack.clone();
            for value in &extra {
                grown = grown.push(*value);
            }

            let after: Vec<u8> = stack.iter().copied().collect();
            prop_assert_eq!(before, after);
            prop_assert_eq!(grown.len(), base.len() + extra.len());
            prop_assert_eq!(grown.peek().ok(), extra.last());
        }
    }
}
