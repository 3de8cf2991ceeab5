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
use smallbitvec::{sbvec, SmallBitVec};
use std::fmt;
use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;

/// A dense set of keys from a primary map.
///
/// This is theoretically equivalent to a
/// [`SecondaryMap<K, ()>`](crate::arena::SecondaryMap) but is a bit leaner
/// under-the-hood, being implemented as just a bitvector with no additional
/// slot storage. Compiler passes use these for things like visited flags and
/// per-block marks, where nearly every key ends up in (or out of) the set.
///
/// ```
/// # use garnet::arena_key;
/// # use garnet::arena::*;
/// arena_key! { struct Key; }
/// let mut primary = ArenaMap::default();
/// let k1: Key = primary.insert(15);
/// let k2 = primary.insert(20);
///
/// let mut evens = SecondarySet::with_primary(&primary);
/// evens.insert(k2);
///
/// assert_eq!(evens.contains(k1), false);
/// assert_eq!(evens.contains(k2), true);
/// ```
#[derive(Clone)]
pub struct SecondarySet<K: ArenaKey> {
    bits: SmallBitVec,
    cardinality: usize,
    _unused: PhantomData<fn() -> K>,
}

impl<K: ArenaKey> SecondarySet<K> {
    /// Creates an empty set with `0` as the capacity.
    pub fn new() -> Self {
        Self {
            bits: SmallBitVec::default(),
            cardinality: 0,
            _unused: PhantomData,
        }
    }

    /// Creates an empty set that is pre-allocated for a specific
    /// number of keys.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bits: sbvec![false; capacity],
            cardinality: 0,
            _unused: PhantomData,
        }
    }

    /// Creates an empty set pre-sized for the keys of a primary [`ArenaMap`].
    #[inline]
    pub fn with_primary<T>(primary: &ArenaMap<K, T>) -> Self {
        Self::with_capacity(primary.len())
    }

    /// Adds a key to the set. Returns `true` if the key was newly inserted.
    pub fn insert(&mut self, key: K) -> bool {
        let index = key.index();

        if index >= self.bits.len() {
            self.bits.resize(index + 1, false);
        }

        let was_set = self.bits.get(index).unwrap_or(false);

        self.bits.set(index, true);

        if !was_set {
            self.cardinality += 1;
        }

        !was_set
    }

    /// Removes a key from the set. Returns `true` if the key was present.
    pub fn remove(&mut self, key: K) -> bool {
        let index = key.index();

        if !self.bits.get(index).unwrap_or(false) {
            return false;
        }

        self.bits.set(index, false);
        self.cardinality -= 1;

        true
    }

    /// Checks whether a key is in the set.
    #[inline]
    pub fn contains(&self, key: K) -> bool {
        self.bits.get(key.index()).unwrap_or(false)
    }

    /// The number of keys in the set.
    #[inline]
    pub fn len(&self) -> usize {
        self.cardinality
    }

    /// Checks whether the set is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cardinality == 0
    }

    /// Removes every key while keeping the allocated storage.
    pub fn clear(&mut self) {
        for i in 0..self.bits.len() {
            self.bits.set(i, false);
        }

        self.cardinality = 0;
    }
}

impl<K: ArenaKey> Default for SecondarySet<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ArenaKey> Debug for SecondarySet<K> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut set = f.debug_set();

        for i in 0..self.bits.len() {
            if self.bits.get(i).unwrap_or(false) {
                set.entry(&K::new(i));
            }
        }

        set.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena_key;

    arena_key! { struct Key; }

    #[test]
    fn insert_contains_remove() {
        let mut set = SecondarySet::new();
        let k1 = Key::new(0);
        let k2 = Key::new(17);

        assert!(set.insert(k2));
        assert!(!set.insert(k2));
        assert!(set.contains(k2));
        assert!(!set.contains(k1));
        assert_eq!(set.len(), 1);

        assert!(set.remove(k2));
        assert!(!set.remove(k2));
        assert!(set.is_empty());
    }

    #[test]
    fn contains_out_of_range_is_false() {
        let set = SecondarySet::<Key>::with_capacity(4);

        assert!(!set.contains(Key::new(1000)));
    }

    #[test]
    fn clear_keeps_capacity_semantics() {
        let mut set = SecondarySet::with_capacity(8);

        set.insert(Key::new(3));
        set.insert(Key::new(5));
        set.clear();

        assert!(set.is_empty());
        assert!(!set.contains(Key::new(3)));
    }
}
