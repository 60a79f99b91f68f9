// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-node sparse attribute storage.
//!
//! [`AttrStore`] keeps only explicitly set values, in a `SmallVec` sorted by
//! [`AttrId`] and searched with binary search. Reads of unset attributes fall
//! back to the registry default.
//!
//! Writes compare the proposed value against the current effective value
//! (stored or default). Equal writes are dropped without touching storage, so
//! they produce no [`AttrChange`].

use core::fmt;
use smallvec::SmallVec;

use crate::id::{Attr, AttrId};
use crate::registry::AttrRegistry;
use crate::value::{AttrValue, ErasedValue};

/// Inline capacity; most nodes set only position and a few style values.
const INLINE_CAPACITY: usize = 8;

/// A recorded attribute change.
///
/// Produced by [`AttrStore::set`] and friends only when the effective value
/// actually changed.
#[derive(Clone, Debug)]
pub struct AttrChange {
    /// The attribute that changed.
    pub attr: AttrId,
    /// The attribute's registered name.
    pub name: &'static str,
    /// The previous effective value.
    pub old: ErasedValue,
    /// The new effective value.
    pub new: ErasedValue,
}

impl AttrChange {
    /// Returns the previous value as `T`, if the types match.
    #[must_use]
    pub fn old_as<T: 'static>(&self) -> Option<&T> {
        self.old.downcast_ref()
    }

    /// Returns the new value as `T`, if the types match.
    #[must_use]
    pub fn new_as<T: 'static>(&self) -> Option<&T> {
        self.new.downcast_ref()
    }
}

/// Error returned by untyped writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttrWriteError {
    /// The attribute id is not registered.
    Unknown(AttrId),
    /// The value's type does not match the registered type.
    TypeMismatch {
        /// The attribute being written.
        attr: AttrId,
        /// The registered value type.
        expected: &'static str,
        /// The type that was supplied.
        found: &'static str,
    },
}

impl fmt::Display for AttrWriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(attr) => write!(f, "unknown attribute {attr}"),
            Self::TypeMismatch {
                attr,
                expected,
                found,
            } => write!(f, "{attr} expects a value of type {expected}, got {found}"),
        }
    }
}

impl core::error::Error for AttrWriteError {}

/// Sparse attribute storage for one node.
///
/// # Example
///
/// ```rust
/// use stratum_attr::{AttrMetadataBuilder, AttrRegistry, AttrStore};
///
/// let mut registry = AttrRegistry::new();
/// let x = registry.register("x", AttrMetadataBuilder::new(0.0_f64).build());
///
/// let mut store = AttrStore::new();
/// assert_eq!(*store.get_or_default(x, &registry), 0.0);
///
/// // Writing the default is a no-op.
/// assert!(store.set(x, 0.0, &registry).is_none());
/// assert!(store.is_empty());
///
/// let change = store.set(x, 10.0, &registry).unwrap();
/// assert_eq!(change.old_as::<f64>(), Some(&0.0));
/// assert_eq!(store.get(x), Some(&10.0));
/// ```
#[derive(Clone, Debug, Default)]
pub struct AttrStore {
    entries: SmallVec<[(AttrId, ErasedValue); INLINE_CAPACITY]>,
}

impl AttrStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if no attribute is explicitly set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of explicitly set attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterates over explicitly set attributes in id order.
    pub fn entries(&self) -> impl Iterator<Item = (AttrId, &ErasedValue)> + '_ {
        self.entries.iter().map(|(id, v)| (*id, v))
    }

    #[inline]
    fn find(&self, id: AttrId) -> Result<usize, usize> {
        self.entries.binary_search_by_key(&id, |(aid, _)| *aid)
    }

    /// Returns `true` if the attribute is explicitly set.
    #[must_use]
    pub fn contains(&self, id: AttrId) -> bool {
        self.find(id).is_ok()
    }

    /// Returns the explicitly set value, if any.
    #[must_use]
    pub fn get<T: AttrValue>(&self, attr: Attr<T>) -> Option<&T> {
        self.get_erased(attr.id()).and_then(ErasedValue::downcast_ref)
    }

    /// Returns the explicitly set value as an [`ErasedValue`].
    #[must_use]
    pub fn get_erased(&self, id: AttrId) -> Option<&ErasedValue> {
        self.find(id).ok().map(|idx| &self.entries[idx].1)
    }

    /// Returns the explicitly set value or the registry default.
    ///
    /// # Panics
    ///
    /// Panics if the attribute is not registered in `registry` with type `T`.
    #[must_use]
    pub fn get_or_default<'a, T: AttrValue>(
        &'a self,
        attr: Attr<T>,
        registry: &'a AttrRegistry,
    ) -> &'a T {
        if let Some(v) = self.get(attr) {
            return v;
        }
        match registry.metadata(attr) {
            Some(metadata) => metadata.default_value(),
            None => panic!("Attribute {:?} not found in registry", attr.id()),
        }
    }

    /// Writes a typed value.
    ///
    /// The value is coerced, then compared with the current effective value.
    /// Returns the change if there was one; equal writes return `None` and
    /// leave the store untouched.
    ///
    /// # Panics
    ///
    /// Panics if the attribute is not registered in `registry` with type `T`.
    pub fn set<T: AttrValue>(
        &mut self,
        attr: Attr<T>,
        value: T,
        registry: &AttrRegistry,
    ) -> Option<AttrChange> {
        let Some(metadata) = registry.metadata(attr) else {
            panic!("Attribute {:?} not found in registry", attr.id());
        };
        let value = metadata.coerce(value);
        let current = self.get(attr).unwrap_or(metadata.default_value());
        if metadata.is_unchanged(current, &value) {
            return None;
        }
        let old = ErasedValue::new(current.clone());
        let new = ErasedValue::new(value);
        self.store(attr.id(), new.clone());
        Some(AttrChange {
            attr: attr.id(),
            name: registry.name(attr.id()).unwrap_or_default(),
            old,
            new,
        })
    }

    /// Writes an erased value.
    ///
    /// Same semantics as [`set`](Self::set), for callers that only know the
    /// attribute at runtime (such as deserializers).
    pub fn set_erased(
        &mut self,
        id: AttrId,
        value: ErasedValue,
        registry: &AttrRegistry,
    ) -> Result<Option<AttrChange>, AttrWriteError> {
        let registration = registry.get(id).ok_or(AttrWriteError::Unknown(id))?;
        let value = registration
            .coerce_erased(value)
            .map_err(|v| AttrWriteError::TypeMismatch {
                attr: id,
                expected: registration.type_name(),
                found: v.type_name(),
            })?;
        let old = self
            .get_erased(id)
            .cloned()
            .unwrap_or_else(|| registration.default_erased());
        if registration.is_unchanged_erased(&old, &value) {
            return Ok(None);
        }
        self.store(id, value.clone());
        Ok(Some(AttrChange {
            attr: id,
            name: registration.name(),
            old,
            new: value,
        }))
    }

    /// Removes an explicit value, reverting to the default.
    ///
    /// Returns the change if the effective value differs afterwards.
    pub fn clear(&mut self, id: AttrId, registry: &AttrRegistry) -> Option<AttrChange> {
        let idx = self.find(id).ok()?;
        let (_, old) = self.entries.remove(idx);
        let registration = registry.get(id)?;
        let new = registration.default_erased();
        if registration.is_unchanged_erased(&old, &new) {
            return None;
        }
        Some(AttrChange {
            attr: id,
            name: registration.name(),
            old,
            new,
        })
    }

    fn store(&mut self, id: AttrId, value: ErasedValue) {
        match self.find(id) {
            Ok(idx) => self.entries[idx].1 = value,
            Err(idx) => self.entries.insert(idx, (id, value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::AttrMetadataBuilder;
    use alloc::boxed::Box;
    use alloc::string::String;
    use alloc::vec::Vec;

    fn setup_registry() -> (AttrRegistry, Attr<f64>, Attr<String>) {
        let mut registry = AttrRegistry::new();
        let x = registry.register(
            "x",
            AttrMetadataBuilder::new(0.0_f64).transform_affecting().build(),
        );
        let name = registry.register("name", AttrMetadataBuilder::new(String::new()).build());
        (registry, x, name)
    }

    #[test]
    fn equal_write_is_dropped() {
        let (registry, x, _) = setup_registry();
        let mut store = AttrStore::new();
        assert!(store.set(x, 5.0, &registry).is_some());
        assert!(store.set(x, 5.0, &registry).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn change_carries_old_and_new() {
        let (registry, _, name) = setup_registry();
        let mut store = AttrStore::new();
        let change = store.set(name, String::from("a"), &registry).unwrap();
        assert_eq!(change.name, "name");
        assert_eq!(change.old_as::<String>().map(String::as_str), Some(""));
        assert_eq!(change.new_as::<String>().map(String::as_str), Some("a"));
    }

    #[test]
    fn signed_zero_is_a_transform_change() {
        let (registry, x, _) = setup_registry();
        let mut store = AttrStore::new();
        assert!(store.set(x, -0.0, &registry).is_some());
    }

    #[test]
    fn erased_write_checks_type() {
        let (registry, x, _) = setup_registry();
        let mut store = AttrStore::new();
        let err = store
            .set_erased(x.id(), ErasedValue::new(true), &registry)
            .unwrap_err();
        assert!(matches!(err, AttrWriteError::TypeMismatch { .. }));

        let change = store
            .set_erased(x.id(), ErasedValue::new(2.0_f64), &registry)
            .unwrap();
        assert!(change.is_some());
        assert_eq!(store.get(x), Some(&2.0));

        assert!(matches!(
            store.set_erased(AttrId::new(40), ErasedValue::new(1.0_f64), &registry),
            Err(AttrWriteError::Unknown(id)) if id == AttrId::new(40)
        ));
    }

    #[test]
    fn clear_reverts_to_default() {
        let (registry, x, _) = setup_registry();
        let mut store = AttrStore::new();
        store.set(x, 3.0, &registry);
        let change = store.clear(x.id(), &registry).unwrap();
        assert_eq!(change.new_as::<f64>(), Some(&0.0));
        assert!(store.is_empty());
        assert!(store.clear(x.id(), &registry).is_none());
    }

    #[test]
    fn entries_stay_sorted() {
        let mut registry = AttrRegistry::new();
        let attrs: Vec<Attr<i32>> = (0..20)
            .map(|i| {
                registry.register(
                    Box::leak(alloc::format!("a{i}").into_boxed_str()),
                    AttrMetadataBuilder::new(0).build(),
                )
            })
            .collect();
        let mut store = AttrStore::new();
        for (i, attr) in attrs.iter().enumerate().rev() {
            store.set(*attr, i32::try_from(i).unwrap() + 1, &registry);
        }
        let ids: Vec<_> = store.entries().map(|(id, _)| id.index()).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(store.get(attrs[7]), Some(&8));
    }
}
