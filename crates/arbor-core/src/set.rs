//! Key set - the unordered set of node keys passed between layers
//!
//! Every mutating tree operation reports the keys whose neighbor set
//! changed as a `KeySet`, and listeners receive the same value.

use std::collections::hash_set;
use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

/// Unordered set of keys with union, membership and equality
#[derive(Clone, PartialEq, Eq)]
pub struct KeySet<K: Eq + Hash> {
    keys: HashSet<K>,
}

impl<K: Eq + Hash> KeySet<K> {
    /// Create an empty set
    pub fn new() -> Self {
        KeySet {
            keys: HashSet::new(),
        }
    }

    /// Create a set holding a single key
    pub fn single(key: K) -> Self {
        let mut set = KeySet::new();
        set.insert(key);
        set
    }

    /// Add a key; returns false if it was already present
    pub fn insert(&mut self, key: K) -> bool {
        self.keys.insert(key)
    }

    /// Remove a key; returns false if it was absent
    pub fn remove(&mut self, key: &K) -> bool {
        self.keys.remove(key)
    }

    #[inline]
    pub fn contains(&self, key: &K) -> bool {
        self.keys.contains(key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> hash_set::Iter<'_, K> {
        self.keys.iter()
    }

    /// Merge another set into this one
    pub fn union_with(&mut self, other: KeySet<K>) {
        if self.keys.is_empty() {
            self.keys = other.keys;
        } else {
            self.keys.extend(other.keys);
        }
    }

    /// True if every key of `self` is in `other`
    pub fn is_subset(&self, other: &KeySet<K>) -> bool {
        self.keys.is_subset(&other.keys)
    }
}

impl<K: Eq + Hash + Clone> KeySet<K> {
    /// New set containing the keys of both sets
    pub fn union(&self, other: &KeySet<K>) -> KeySet<K> {
        KeySet {
            keys: self.keys.union(&other.keys).cloned().collect(),
        }
    }
}

impl<K: Eq + Hash + Ord + Clone> KeySet<K> {
    /// Keys in ascending order
    pub fn sorted(&self) -> Vec<K> {
        let mut keys: Vec<K> = self.keys.iter().cloned().collect();
        keys.sort();
        keys
    }
}

impl<K: Eq + Hash> Default for KeySet<K> {
    fn default() -> Self {
        KeySet::new()
    }
}

impl<K: Eq + Hash + fmt::Debug> fmt::Debug for KeySet<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.keys.iter()).finish()
    }
}

impl<K: Eq + Hash> FromIterator<K> for KeySet<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        KeySet {
            keys: iter.into_iter().collect(),
        }
    }
}

impl<K: Eq + Hash> Extend<K> for KeySet<K> {
    fn extend<I: IntoIterator<Item = K>>(&mut self, iter: I) {
        self.keys.extend(iter);
    }
}

impl<K: Eq + Hash> IntoIterator for KeySet<K> {
    type Item = K;
    type IntoIter = hash_set::IntoIter<K>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.into_iter()
    }
}

impl<'a, K: Eq + Hash> IntoIterator for &'a KeySet<K> {
    type Item = &'a K;
    type IntoIter = hash_set::Iter<'a, K>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.iter()
    }
}
