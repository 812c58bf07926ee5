//! Persistent ordered map backed by an AVL tree.
//!
//! Every update copies the path from the root to the touched node and
//! shares all other subtrees with the previous version, so `insert` is
//! `O(log n)` in both time and allocation.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use super::CollectionError;

type Link<K, V> = Option<Arc<Node<K, V>>>;

struct Node<K, V> {
    key: K,
    value: V,
    height: usize,
    left: Link<K, V>,
    right: Link<K, V>,
}

impl<K, V> Node<K, V> {
    fn new(key: K, value: V, left: Link<K, V>, right: Link<K, V>) -> Arc<Self> {
        let height = 1 + height(&left).max(height(&right));
        Arc::new(Node {
            key,
            value,
            height,
            left,
            right,
        })
    }

    fn balance(&self) -> isize {
        height(&self.left) as isize - height(&self.right) as isize
    }
}

fn height<K, V>(link: &Link<K, V>) -> usize {
    link.as_ref().map_or(0, |node| node.height)
}

/// Immutable balanced binary search tree.
pub struct PersistentMap<K, V> {
    root: Link<K, V>,
    len: usize,
}

impl<K, V> PersistentMap<K, V> {
    pub fn new() -> Self {
        Self { root: None, len: 0 }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Height of the tree; `0` for the empty map.
    pub fn height(&self) -> usize {
        height(&self.root)
    }

    /// In-order traversal.
    pub fn iter(&self) -> Iter<'_, K, V> {
        let mut iter = Iter { stack: Vec::new() };
        iter.push_left(self.root.as_deref());
        iter
    }

    /// Returns `true` if both maps are the same version (share their root).
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.root, &other.root) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<K: Ord, V> PersistentMap<K, V> {
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut current = self.root.as_deref();
        while let Some(node) = current {
            match key.cmp(node.key.borrow()) {
                Ordering::Equal => return Some(&node.value),
                Ordering::Less => current = node.left.as_deref(),
                Ordering::Greater => current = node.right.as_deref(),
            }
        }
        None
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.get(key).is_some()
    }

    /// In-order traversal of all entries whose key is `>= lower`.
    pub fn range_from<Q>(&self, lower: &Q) -> Iter<'_, K, V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut stack = Vec::new();
        let mut current = self.root.as_deref();
        while let Some(node) = current {
            if node.key.borrow() >= lower {
                stack.push(node);
                current = node.left.as_deref();
            } else {
                current = node.right.as_deref();
            }
        }
        Iter { stack }
    }
}

impl<K: Ord + Clone, V: Clone> PersistentMap<K, V> {
    /// Returns a new map containing `key`. Fails if the key is already present.
    pub fn insert(&self, key: K, value: V) -> Result<Self, CollectionError> {
        let root = insert(&self.root, key, value)?;
        Ok(Self {
            root: Some(root),
            len: self.len + 1,
        })
    }

    /// Returns a new map in which `key` maps to `value`, replacing any
    /// previous binding. The receiver keeps the old binding.
    pub fn insert_or_replace(&self, key: K, value: V) -> Self {
        let (root, added) = insert_or_replace(&self.root, key, value);
        Self {
            root: Some(root),
            len: if added { self.len + 1 } else { self.len },
        }
    }
}

fn insert<K: Ord + Clone, V: Clone>(
    link: &Link<K, V>,
    key: K,
    value: V,
) -> Result<Arc<Node<K, V>>, CollectionError> {
    let Some(node) = link else {
        return Ok(Node::new(key, value, None, None));
    };

    let (left, right) = match key.cmp(&node.key) {
        Ordering::Equal => return Err(CollectionError::DuplicateKey),
        Ordering::Less => (Some(insert(&node.left, key, value)?), node.right.clone()),
        Ordering::Greater => (node.left.clone(), Some(insert(&node.right, key, value)?)),
    };

    Ok(rebalance(node.key.clone(), node.value.clone(), left, right))
}

fn insert_or_replace<K: Ord + Clone, V: Clone>(
    link: &Link<K, V>,
    key: K,
    value: V,
) -> (Arc<Node<K, V>>, bool) {
    let Some(node) = link else {
        return (Node::new(key, value, None, None), true);
    };

    match key.cmp(&node.key) {
        Ordering::Equal => (
            Node::new(key, value, node.left.clone(), node.right.clone()),
            false,
        ),
        Ordering::Less => {
            let (left, added) = insert_or_replace(&node.left, key, value);
            let node = rebalance(
                node.key.clone(),
                node.value.clone(),
                Some(left),
                node.right.clone(),
            );
            (node, added)
        }
        Ordering::Greater => {
            let (right, added) = insert_or_replace(&node.right, key, value);
            let node = rebalance(
                node.key.clone(),
                node.value.clone(),
                node.left.clone(),
                Some(right),
            );
            (node, added)
        }
    }
}

/// Builds the node `(key, value, left, right)`, rotating when the children
/// differ in height by two. A left-heavy node whose left child leans right
/// needs the double rotation, and symmetrically on the other side.
fn rebalance<K: Clone, V: Clone>(
    key: K,
    value: V,
    left: Link<K, V>,
    right: Link<K, V>,
) -> Arc<Node<K, V>> {
    let balance = height(&left) as isize - height(&right) as isize;

    if balance > 1 {
        if let Some(l) = &left {
            let l = match &l.right {
                Some(inner) if l.balance() < 0 => {
                    rotate_left(l.key.clone(), l.value.clone(), l.left.clone(), inner)
                }
                _ => l.clone(),
            };
            return rotate_right(key, value, &l, right);
        }
    } else if balance < -1 {
        if let Some(r) = &right {
            let r = match &r.left {
                Some(inner) if r.balance() > 0 => {
                    rotate_right(r.key.clone(), r.value.clone(), inner, r.right.clone())
                }
                _ => r.clone(),
            };
            return rotate_left(key, value, left, &r);
        }
    }

    Node::new(key, value, left, right)
}

/// `left` becomes the root; the old root moves down to the right.
fn rotate_right<K: Clone, V: Clone>(
    key: K,
    value: V,
    left: &Arc<Node<K, V>>,
    right: Link<K, V>,
) -> Arc<Node<K, V>> {
    let demoted = Node::new(key, value, left.right.clone(), right);
    Node::new(
        left.key.clone(),
        left.value.clone(),
        left.left.clone(),
        Some(demoted),
    )
}

/// `right` becomes the root; the old root moves down to the left.
fn rotate_left<K: Clone, V: Clone>(
    key: K,
    value: V,
    left: Link<K, V>,
    right: &Arc<Node<K, V>>,
) -> Arc<Node<K, V>> {
    let demoted = Node::new(key, value, left, right.left.clone());
    Node::new(
        right.key.clone(),
        right.value.clone(),
        Some(demoted),
        right.right.clone(),
    )
}

pub struct Iter<'a, K, V> {
    stack: Vec<&'a Node<K, V>>,
}

impl<'a, K, V> Iter<'a, K, V> {
    fn push_left(&mut self, mut link: Option<&'a Node<K, V>>) {
        while let Some(node) = link {
            self.stack.push(node);
            link = node.left.as_deref();
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.push_left(node.right.as_deref());
        Some((&node.key, &node.value))
    }
}

impl<'a, K, V> IntoIterator for &'a PersistentMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V> Clone for PersistentMap<K, V> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            len: self.len,
        }
    }
}

impl<K, V> Default for PersistentMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: PartialEq, V: PartialEq> PartialEq for PersistentMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || (self.len == other.len && self.iter().eq(other.iter()))
    }
}

impl<K: Eq, V: Eq> Eq for PersistentMap<K, V> {}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for PersistentMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    /// Returns the height of `link`, panicking if any node is out of balance
    /// or carries a stale height.
    fn checked_height<K, V>(link: &Link<K, V>) -> usize {
        match link {
            None => 0,
            Some(node) => {
                let left = checked_height(&node.left);
                let right = checked_height(&node.right);
                assert!(left.abs_diff(right) <= 1, "node out of balance");
                assert_eq!(node.height, 1 + left.max(right));
                node.height
            }
        }
    }

    #[test]
    fn test_empty_map() {
        let map: PersistentMap<i32, i32> = PersistentMap::new();
        assert!(map.is_empty());
        assert_eq!(map.height(), 0);
        assert!(map.get(&1).is_none());
    }

    #[test]
    fn test_insert_and_get() {
        let map = PersistentMap::new()
            .insert("b".to_string(), 2)
            .and_then(|m| m.insert("a".to_string(), 1))
            .and_then(|m| m.insert("c".to_string(), 3))
            .unwrap();
        assert_eq!(map.get("a"), Some(&1));
        assert_eq!(map.get("b"), Some(&2));
        assert_eq!(map.get("c"), Some(&3));
        assert!(!map.contains_key("d"));
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_duplicate_key_is_rejected() {
        let map = PersistentMap::new().insert(1, "one").unwrap();
        assert_eq!(map.insert(1, "uno").unwrap_err(), CollectionError::DuplicateKey);
    }

    #[test]
    fn test_old_version_is_unchanged() {
        let base = PersistentMap::new().insert(1, 'a').unwrap();
        let left = base.insert(2, 'b').unwrap();
        let right = base.insert(3, 'c').unwrap();

        assert_eq!(base.len(), 1);
        assert!(base.get(&2).is_none());
        assert!(left.get(&3).is_none());
        assert!(right.get(&2).is_none());
    }

    #[test]
    fn test_insert_or_replace_shadows() {
        let outer = PersistentMap::new().insert("x", 1).unwrap();
        let inner = outer.insert_or_replace("x", 2);
        assert_eq!(outer.get("x"), Some(&1));
        assert_eq!(inner.get("x"), Some(&2));
        assert_eq!(inner.len(), 1);
    }

    #[test]
    fn test_ascending_inserts_stay_logarithmic() {
        let mut map = PersistentMap::new();
        for key in 0..1024 {
            map = map.insert(key, key).unwrap();
        }
        assert!(map.height() <= 11);
        checked_height(&map.root);
    }

    #[test]
    fn test_range_from() {
        let mut map = PersistentMap::new();
        for key in (0..10).filter(|k| *k != 3) {
            map = map.insert(key, key * 10).unwrap();
        }
        let keys: Vec<_> = map.range_from(&3).map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![4, 5, 6, 7, 8, 9]);
    }

    proptest! {
        #[test]
        fn prop_stays_balanced(keys in prop::collection::vec(any::<i16>(), 0..300)) {
            let mut map = PersistentMap::new();
            let mut seen = BTreeSet::new();
            for key in &keys {
                match map.insert(*key, i32::from(*key) * 2) {
                    Ok(next) => {
                        prop_assert!(seen.insert(*key));
                        map = next;
                    }
                    Err(err) => {
                        prop_assert_eq!(err, CollectionError::DuplicateKey);
                        prop_assert!(seen.contains(key));
                    }
                }
                checked_height(&map.root);
            }

            for key in &seen {
                prop_assert_eq!(map.get(key), Some(&(i32::from(*key) * 2)));
            }
            let in_order: Vec<_> = map.iter().map(|(k, _)| *k).collect();
            prop_assert_eq!(in_order, seen.into_iter().collect::<Vec<_>>());
        }
    }
}
