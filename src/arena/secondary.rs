//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::arena::{ArenaKey, ArenaMap};
use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};
use std::{fmt, iter};

#[cfg(feature = "enable-serde")]
use serde::{Deserialize, Serialize};

/// A dense secondary mapping `K -> V` for keys handed out by a primary
/// [`ArenaMap`]. This is how extra data gets associated with most (but not
/// necessarily all) keys of an existing arena without widening the primary
/// map's value type.
///
/// Slots grow on demand, so keys minted after the secondary map was created
/// can still be inserted. Unlike the primary map, not every key needs to be
/// present, and entries can be removed again.
///
/// ```
/// # use garnet::arena_key;
/// # use garnet::arena::*;
/// arena_key! { struct Player; }
///
/// let mut players = ArenaMap::new();
/// let p1: Player = players.insert("John");
/// let p2 = players.insert("Bob");
///
/// let mut health = SecondaryMap::with_primary(&players);
/// health.insert(p1, 200);
///
/// assert_eq!(health.get(p1), Some(&200));
/// assert_eq!(health.get(p2), None);
/// ```
#[derive(Clone)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
pub struct SecondaryMap<K: ArenaKey, V> {
    slots: Vec<Option<V>>,
    len: usize,
    _unused: PhantomData<fn() -> K>,
}

impl<K: ArenaKey, V> SecondaryMap<K, V> {
    /// Creates an empty map with `0` as the capacity.
    #[inline]
    pub fn new() -> Self {
        Self {
            slots: Vec::default(),
            len: 0,
            _unused: PhantomData,
        }
    }

    /// Creates an empty map with room for `capacity` keys before any
    /// reallocation is necessary.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            len: 0,
            _unused: PhantomData,
        }
    }

    /// Creates an empty map pre-sized for the keys of a primary [`ArenaMap`].
    #[inline]
    pub fn with_primary<T>(primary: &ArenaMap<K, T>) -> Self {
        Self::with_capacity(primary.len())
    }

    /// Inserts a mapping `key -> value`, returning the previous value for
    /// `key` if there was one.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let index = key.index();

        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, || None);
        }

        let prev = self.slots[index].replace(value);

        if prev.is_none() {
            self.len += 1;
        }

        prev
    }

    /// Removes the mapping for `key` (if any) and returns its value.
    pub fn remove(&mut self, key: K) -> Option<V> {
        let prev = self.slots.get_mut(key.index()).and_then(Option::take);

        if prev.is_some() {
            self.len -= 1;
        }

        prev
    }

    /// Checks whether a given key has a value associated with it.
    #[inline]
    pub fn contains(&self, key: K) -> bool {
        self.get(key).is_some()
    }

    /// Gets the value associated with `key`, if there is one.
    #[inline]
    pub fn get(&self, key: K) -> Option<&V> {
        self.slots.get(key.index()).and_then(Option::as_ref)
    }

    /// Gets a mutable reference to the value associated with `key`,
    /// if there is one.
    #[inline]
    pub fn get_mut(&mut self, key: K) -> Option<&mut V> {
        self.slots.get_mut(key.index()).and_then(Option::as_mut)
    }

    /// The number of keys that currently have values associated with them.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Checks whether the map contains any mappings at all.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns an iterator over `(key, &value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (K, &V)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.as_ref().map(|v| (K::new(i), v)))
    }

    /// Returns an iterator over the keys that have values, in key order.
    pub fn keys(&self) -> impl Iterator<Item = K> + '_ {
        self.iter().map(|(k, _)| k)
    }

    /// Removes every mapping while keeping the allocated storage.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.len = 0;
    }
}

impl<K: ArenaKey, V> Default for SecondaryMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ArenaKey, V> Index<K> for SecondaryMap<K, V> {
    type Output = V;

    #[inline]
    fn index(&self, key: K) -> &V {
        self.get(key).expect("no value associated with key")
    }
}

impl<K: ArenaKey, V> IndexMut<K> for SecondaryMap<K, V> {
    #[inline]
    fn index_mut(&mut self, key: K) -> &mut V {
        self.get_mut(key).expect("no value associated with key")
    }
}

impl<K: ArenaKey, V: Debug> Debug for SecondaryMap<K, V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        super::write_map(f, "SecondaryMap", self.iter())
    }
}

impl<K: ArenaKey, V> iter::FromIterator<(K, V)> for SecondaryMap<K, V> {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(pairs: T) -> Self {
        let mut map = Self::new();

        for (k, v) in pairs {
            map.insert(k, v);
        }

        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena_key;

    arena_key! { struct Key; }

    fn keys(n: usize) -> Vec<Key> {
        let mut primary = ArenaMap::<Key, ()>::new();

        (0..n).map(|_| primary.insert(())).collect()
    }

    #[test]
    fn insert_get_remove() {
        let ks = keys(3);
        let mut map = SecondaryMap::new();

        assert_eq!(map.insert(ks[1], "b"), None);
        assert_eq!(map.insert(ks[1], "b2"), Some("b"));
        assert_eq!(map.get(ks[0]), None);
        assert_eq!(map.get(ks[1]), Some(&"b2"));
        assert_eq!(map.len(), 1);

        assert_eq!(map.remove(ks[1]), Some("b2"));
        assert_eq!(map.remove(ks[1]), None);
        assert!(map.is_empty());
    }

    #[test]
    fn grows_past_initial_capacity() {
        let ks = keys(100);
        let mut map = SecondaryMap::with_capacity(2);

        for (i, k) in ks.iter().enumerate() {
            map.insert(*k, i);
        }

        assert_eq!(map.len(), 100);
        assert_eq!(map[ks[99]], 99);
    }

    #[test]
    fn iter_skips_missing_slots() {
        let ks = keys(5);
        let mut map = SecondaryMap::new();

        map.insert(ks[0], 'a');
        map.insert(ks[4], 'e');

        let pairs: Vec<(Key, char)> = map.iter().map(|(k, v)| (k, *v)).collect();

        assert_eq!(pairs, vec![(ks[0], 'a'), (ks[4], 'e')]);
    }
}
