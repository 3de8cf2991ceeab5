//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::arena::ArenaKey;
use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};
use std::{fmt, iter};

#[cfg(feature = "enable-serde")]
use serde::{Deserialize, Serialize};

/// A primary mapping of `K -> V`, where `K` is some key type and `V` is the
/// value being stored. Other mappings that use the same key as an existing
/// [`ArenaMap`] should use [`SecondaryMap`](super::SecondaryMap) instead.
///
/// This is effectively a typed wrapper around `Vec<V>`, the main advantage is
/// that it does not implicitly convert into array types (i.e. it actually
/// acts like a map instead of a sequence) and it only allows indexing with
/// the correct key type. Keys are handed out on insertion and remain valid
/// for the lifetime of the arena: nothing can ever be removed.
///
/// ```
/// # use garnet::arena_key;
/// # use garnet::arena::ArenaMap;
/// arena_key! {
///     struct Name;
/// }
///
/// let mut blocks = ArenaMap::new();
/// let bb: Name = blocks.insert("Hello!");
///
/// assert_eq!(blocks[bb], "Hello!");
/// ```
#[derive(Clone)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
pub struct ArenaMap<K: ArenaKey, V> {
    slots: Vec<V>,
    _unused: PhantomData<fn() -> K>,
}

impl<K: ArenaKey, V> ArenaMap<K, V> {
    /// Creates a new, empty arena.
    #[inline]
    pub fn new() -> Self {
        Self {
            slots: Vec::default(),
            _unused: PhantomData,
        }
    }

    /// Creates an empty arena that can hold `capacity` values before it
    /// needs to reallocate.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            _unused: PhantomData,
        }
    }

    /// Checks if the arena contains a given key, i.e. whether a given key
    /// has been returned from [`Self::insert`] at some point.
    #[inline]
    pub fn contains(&self, key: K) -> bool {
        key.index() < self.slots.len()
    }

    /// Inserts a value into the arena and returns the key that now
    /// refers to it.
    #[inline]
    pub fn insert(&mut self, value: V) -> K {
        let key = K::new(self.slots.len());

        self.slots.push(value);

        key
    }

    /// Returns the key that the *next* call to [`Self::insert`] will return.
    #[inline]
    pub fn next_key(&self) -> K {
        K::new(self.slots.len())
    }

    /// Gets the value associated with a given key, if the key is valid
    /// for this arena.
    #[inline]
    pub fn get(&self, key: K) -> Option<&V> {
        self.slots.get(key.index())
    }

    /// Gets a mutable reference to the value associated with a given key,
    /// if the key is valid for this arena.
    #[inline]
    pub fn get_mut(&mut self, key: K) -> Option<&mut V> {
        self.slots.get_mut(key.index())
    }

    /// The number of values that have been inserted into the arena.
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Checks whether the arena has had any values inserted into it.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns an iterator over every key in the arena, in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = K> + '_ {
        (0..self.slots.len()).map(K::new)
    }

    /// Returns an iterator over `(key, &value)` pairs, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (K, &V)> + '_ {
        self.slots.iter().enumerate().map(|(i, v)| (K::new(i), v))
    }

    /// Returns an iterator over `(key, &mut value)` pairs, in insertion order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (K, &mut V)> + '_ {
        self.slots
            .iter_mut()
            .enumerate()
            .map(|(i, v)| (K::new(i), v))
    }
}

impl<K: ArenaKey, V> Default for ArenaMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ArenaKey, V> Index<K> for ArenaMap<K, V> {
    type Output = V;

    #[inline]
    fn index(&self, key: K) -> &V {
        &self.slots[key.index()]
    }
}

impl<K: ArenaKey, V> IndexMut<K> for ArenaMap<K, V> {
    #[inline]
    fn index_mut(&mut self, key: K) -> &mut V {
        &mut self.slots[key.index()]
    }
}

impl<K: ArenaKey, V: Debug> Debug for ArenaMap<K, V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        super::write_map(f, "ArenaMap", self.iter())
    }
}

impl<K: ArenaKey, V> FromIterator<V> for ArenaMap<K, V> {
    fn from_iter<T: IntoIterator<Item = V>>(values: T) -> Self {
        Self {
            slots: Vec::from_iter(values),
            _unused: PhantomData,
        }
    }
}

impl<K: ArenaKey, V> iter::Extend<V> for ArenaMap<K, V> {
    fn extend<T: IntoIterator<Item = V>>(&mut self, values: T) {
        self.slots.extend(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena_key;

    arena_key! { struct Key; }

    #[test]
    fn insert_then_read_back() {
        let mut map = ArenaMap::new();
        let k1: Key = map.insert("a");
        let k2 = map.insert("b");

        assert_ne!(k1, k2);
        assert_eq!(map[k1], "a");
        assert_eq!(map[k2], "b");
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn next_key_matches_insert() {
        let mut map = ArenaMap::<Key, i32>::new();
        let upcoming = map.next_key();
        let k = map.insert(42);

        assert_eq!(upcoming, k);
        assert!(map.contains(k));
        assert!(!map.contains(map.next_key()));
    }

    #[test]
    fn iter_yields_insertion_order() {
        let mut map = ArenaMap::<Key, i32>::new();
        let keys: Vec<Key> = (0..4).map(|i| map.insert(i * 10)).collect();
        let seen: Vec<(Key, i32)> = map.iter().map(|(k, v)| (k, *v)).collect();

        for (i, (k, v)) in seen.iter().enumerate() {
            assert_eq!(*k, keys[i]);
            assert_eq!(*v, (i as i32) * 10);
        }
    }
}
