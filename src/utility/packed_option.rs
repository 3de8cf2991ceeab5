//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use std::fmt::{Debug, Formatter, Result};

#[cfg(feature = "enable-serde")]
use serde::{Deserialize, Serialize};

/// Helper trait for a type that can be packed into a [`PackedOption`].
///
/// These types need to have some null-ish value that they can reserve,
/// that value will be used to distinguish between `None` and `Some`.
///
/// ```
/// # use garnet::utility::*;
/// struct NonZero(i32);
///
/// impl Packable for NonZero {
///     fn reserved_null() -> Self {
///         NonZero(0)
///     }
///
///     fn is_reserved_null(&self) -> bool {
///         self.0 == 0
///     }
/// }
///
/// let opt = PackedOption::some(NonZero(15));
///
/// assert_eq!(opt.is_some(), true);
/// ```
pub trait Packable {
    /// Gets the reserved value of the type.
    ///
    /// This value is not meant to be constructed normally in any
    /// circumstances.
    fn reserved_null() -> Self;

    /// Checks if the current object is equivalent to the constant
    /// returned by [`Self::reserved_null`].
    fn is_reserved_null(&self) -> bool;
}

/// Provides an [`Option`]-like type for (valid) arena keys without paying
/// any extra cost to store the flag. It takes up exactly as much space as
/// the key would on its own, while also storing whether or not the key
/// actually exists.
///
/// Relies on the null state of a key to distinguish between "none" and
/// "some".
#[derive(Copy, Clone, PartialEq, PartialOrd, Eq, Ord, Hash)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
pub struct PackedOption<T: Packable>(T);

impl<T: Packable> PackedOption<T> {
    /// Creates a `None` instance of `PackedOption`.
    ///
    /// ```
    /// # use garnet::utility::*;
    /// # use garnet::dense_arena_key;
    /// dense_arena_key! { struct Key; }
    /// let null = PackedOption::<Key>::none();
    /// assert_eq!(null.is_none(), true);
    /// ```
    #[inline]
    pub fn none() -> Self {
        Self(T::reserved_null())
    }

    /// Creates a `Some` instance of `PackedOption`.
    ///
    /// Panics if `value` is the reserved null value.
    #[inline]
    pub fn some(value: T) -> Self {
        assert!(!value.is_reserved_null());

        Self(value)
    }

    /// Returns `true` if the packed option is a `None` value.
    #[inline]
    pub fn is_none(&self) -> bool {
        self.0.is_reserved_null()
    }

    /// Returns `true` if the packed option is a `Some` value.
    #[inline]
    pub fn is_some(&self) -> bool {
        !self.is_none()
    }

    /// Expands the packed representation into a real [`Option`].
    ///
    /// ```
    /// # use garnet::utility::*;
    /// # use garnet::dense_arena_key;
    /// # use garnet::arena::ArenaKey;
    /// dense_arena_key! { struct Key; }
    /// let opt = PackedOption::some(Key::new(3));
    /// assert_eq!(opt.expand(), Some(Key::new(3)));
    /// ```
    #[inline]
    pub fn expand(self) -> Option<T> {
        if self.is_none() {
            None
        } else {
            Some(self.0)
        }
    }

    /// Unwraps the contained value, panicking if the option is `None`.
    #[inline]
    #[track_caller]
    pub fn unwrap(self) -> T {
        self.expand().unwrap()
    }

    /// Checks whether the option holds exactly `value`.
    #[inline]
    pub fn contains(&self, value: T) -> bool
    where
        T: PartialEq,
    {
        self.is_some() && self.0 == value
    }
}

impl<T: Packable> Default for PackedOption<T> {
    fn default() -> Self {
        Self::none()
    }
}

impl<T: Packable> From<T> for PackedOption<T> {
    fn from(value: T) -> Self {
        Self::some(value)
    }
}

impl<T: Packable> From<Option<T>> for PackedOption<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or_else(Self::none, Self::some)
    }
}

impl<T: Packable + Debug> Debug for PackedOption<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        if self.is_none() {
            write!(f, "None")
        } else {
            write!(f, "Some({:?})", self.0)
        }
    }
}
