// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Attribute identification types.
//!
//! [`AttrId`] identifies an attribute at runtime; [`Attr<T>`] is the typed key
//! handed out by [`AttrRegistry::register`](crate::AttrRegistry::register).

use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;

/// A runtime attribute identifier.
///
/// A compact `u16` index into the [`AttrRegistry`](crate::AttrRegistry) that
/// issued it. Ids from different registries are not comparable.
///
/// # Example
///
/// ```rust
/// use stratum_attr::AttrId;
///
/// let id = AttrId::new(7);
/// assert_eq!(id.index(), 7);
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AttrId(u16);

impl AttrId {
    /// Creates an attribute id from a raw index.
    #[must_use]
    #[inline]
    pub const fn new(index: u16) -> Self {
        Self(index)
    }

    /// Returns the raw index.
    #[must_use]
    #[inline]
    pub const fn index(self) -> u16 {
        self.0
    }
}

impl fmt::Debug for AttrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AttrId").field(&self.0).finish()
    }
}

impl fmt::Display for AttrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "attr#{}", self.0)
    }
}

/// A typed attribute key.
///
/// Wraps an [`AttrId`] with the value type `T` so reads and writes are
/// checked at compile time. It is as small as the id itself.
pub struct Attr<T> {
    id: AttrId,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Attr<T> {
    /// Wraps a raw id.
    ///
    /// The id must have been registered with value type `T`; lookups with a
    /// mismatched type simply find nothing.
    #[must_use]
    #[inline]
    pub const fn from_id(id: AttrId) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    /// Returns the untyped id.
    #[must_use]
    #[inline]
    pub const fn id(self) -> AttrId {
        self.id
    }
}

impl<T> Copy for Attr<T> {}

impl<T> Clone for Attr<T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> PartialEq for Attr<T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Attr<T> {}

impl<T> Hash for Attr<T> {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T> fmt::Debug for Attr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attr")
            .field("id", &self.id)
            .field("type", &core::any::type_name::<T>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;

    #[test]
    fn attr_id_formatting() {
        let id = AttrId::new(3);
        assert_eq!(format!("{id:?}"), "AttrId(3)");
        assert_eq!(format!("{id}"), "attr#3");
    }

    #[test]
    fn typed_keys_share_ids() {
        let a: Attr<f64> = Attr::from_id(AttrId::new(1));
        let b: Attr<bool> = Attr::from_id(AttrId::new(1));
        assert_eq!(a.id(), b.id());
        assert_eq!(core::mem::size_of::<Attr<f64>>(), 2);
    }
}
