// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Attribute registry.
//!
//! [`AttrRegistry`] owns the metadata for every attribute a scene knows
//! about. Each scene has its own registry, so independent scenes never share
//! ids.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::any::{Any, TypeId};
use hashbrown::HashMap;

use crate::id::{Attr, AttrId};
use crate::invalidation::Invalidation;
use crate::metadata::AttrMetadata;
use crate::value::{AttrValue, ErasedValue};

/// A registration entry: name, value type and metadata.
pub struct AttrRegistration {
    name: &'static str,
    type_id: TypeId,
    type_name: &'static str,
    metadata: Box<dyn ErasedMetadata>,
}

impl AttrRegistration {
    /// Returns the attribute name.
    #[must_use]
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the [`TypeId`] of the value type.
    #[must_use]
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the Rust type name of the value type.
    #[must_use]
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns what a change to this attribute invalidates.
    #[must_use]
    #[inline]
    pub fn affects(&self) -> Invalidation {
        self.metadata.affects()
    }

    /// Returns `true` if the attribute composes the local transform.
    #[must_use]
    #[inline]
    pub fn is_transform_affecting(&self) -> bool {
        self.metadata.is_transform_affecting()
    }

    /// Returns the default value, erased.
    #[must_use]
    pub fn default_erased(&self) -> ErasedValue {
        self.metadata.default_erased()
    }

    /// Coerces an erased value.
    ///
    /// Returns the value untouched in `Err` if its type does not match.
    pub fn coerce_erased(&self, value: ErasedValue) -> Result<ErasedValue, ErasedValue> {
        self.metadata.coerce_erased(value)
    }

    /// Compares two erased values the way typed writes are compared.
    #[must_use]
    pub fn is_unchanged_erased(&self, old: &ErasedValue, new: &ErasedValue) -> bool {
        if self.metadata.is_transform_affecting() {
            old.same_bits(new)
        } else {
            old.same_value(new)
        }
    }
}

impl core::fmt::Debug for AttrRegistration {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AttrRegistration")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("affects", &self.affects())
            .field("transform_affecting", &self.is_transform_affecting())
            .finish_non_exhaustive()
    }
}

/// A registry of attributes.
///
/// # Example
///
/// ```rust
/// use stratum_attr::{AttrMetadataBuilder, AttrRegistry, Invalidation};
///
/// let mut registry = AttrRegistry::new();
/// let x = registry.register(
///     "x",
///     AttrMetadataBuilder::new(0.0_f64).transform_affecting().build(),
/// );
///
/// assert_eq!(registry.name(x.id()), Some("x"));
/// assert_eq!(registry.by_name("x"), Some(x.id()));
/// assert!(registry.affects(x.id()).contains(Invalidation::TRANSFORM));
/// ```
#[derive(Default)]
pub struct AttrRegistry {
    attrs: Vec<AttrRegistration>,
    by_name: HashMap<&'static str, AttrId>,
}

impl AttrRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an attribute and returns its typed key.
    ///
    /// # Panics
    ///
    /// Panics if `name` is already registered or if more than `u16::MAX`
    /// attributes are registered.
    pub fn register<T: AttrValue>(&mut self, name: &'static str, metadata: AttrMetadata<T>) -> Attr<T> {
        assert!(
            !self.by_name.contains_key(name),
            "Attribute '{name}' is already registered"
        );
        assert!(
            self.attrs.len() < u16::MAX as usize,
            "Too many attributes registered (max {})",
            u16::MAX
        );

        #[expect(clippy::cast_possible_truncation, reason = "checked above")]
        let id = AttrId::new(self.attrs.len() as u16);

        self.attrs.push(AttrRegistration {
            name,
            type_id: TypeId::of::<T>(),
            type_name: core::any::type_name::<T>(),
            metadata: Box::new(metadata),
        });
        self.by_name.insert(name, id);

        Attr::from_id(id)
    }

    /// Returns the number of registered attributes.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    /// Looks up an attribute by name.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<AttrId> {
        self.by_name.get(name).copied()
    }

    /// Returns an attribute's name.
    #[must_use]
    pub fn name(&self, id: AttrId) -> Option<&'static str> {
        self.get(id).map(AttrRegistration::name)
    }

    /// Returns the registration for an attribute.
    #[must_use]
    pub fn get(&self, id: AttrId) -> Option<&AttrRegistration> {
        self.attrs.get(usize::from(id.index()))
    }

    /// Returns what a change to an attribute invalidates.
    #[must_use]
    pub fn affects(&self, id: AttrId) -> Invalidation {
        self.get(id)
            .map(AttrRegistration::affects)
            .unwrap_or_default()
    }

    /// Returns the typed metadata for an attribute.
    #[must_use]
    pub fn metadata<T: AttrValue>(&self, attr: Attr<T>) -> Option<&AttrMetadata<T>> {
        self.get(attr.id())
            .and_then(|r| r.metadata.as_any().downcast_ref())
    }

    /// Iterates over all registrations in id order.
    pub fn iter(&self) -> impl Iterator<Item = (AttrId, &AttrRegistration)> {
        self.attrs.iter().enumerate().map(|(i, r)| {
            #[expect(clippy::cast_possible_truncation, reason = "index < len < u16::MAX")]
            (AttrId::new(i as u16), r)
        })
    }
}

impl core::fmt::Debug for AttrRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AttrRegistry")
            .field("count", &self.attrs.len())
            .field(
                "attrs",
                &self.attrs.iter().map(|r| r.name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

trait ErasedMetadata: Any {
    fn as_any(&self) -> &dyn Any;
    fn affects(&self) -> Invalidation;
    fn is_transform_affecting(&self) -> bool;
    fn default_erased(&self) -> ErasedValue;
    fn coerce_erased(&self, value: ErasedValue) -> Result<ErasedValue, ErasedValue>;
}

impl<T: AttrValue> ErasedMetadata for AttrMetadata<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn affects(&self) -> Invalidation {
        Self::affects(self)
    }

    fn is_transform_affecting(&self) -> bool {
        Self::is_transform_affecting(self)
    }

    fn default_erased(&self) -> ErasedValue {
        ErasedValue::new(self.default_value().clone())
    }

    fn coerce_erased(&self, value: ErasedValue) -> Result<ErasedValue, ErasedValue> {
        if !self.has_coerce_callback() {
            return if value.is::<T>() { Ok(value) } else { Err(value) };
        }
        match value.downcast_ref::<T>() {
            Some(typed) => Ok(ErasedValue::new(self.coerce(typed.clone()))),
            None => Err(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::AttrMetadataBuilder;
    use alloc::{format, vec};

    #[test]
    fn register_and_lookup() {
        let mut registry = AttrRegistry::new();
        assert!(registry.is_empty());
        let opacity = registry.register(
            "opacity",
            AttrMetadataBuilder::new(1.0_f64)
                .affects(Invalidation::PAINT)
                .build(),
        );
        assert_eq!(registry.len(), 1);
        assert_eq!(opacity.id().index(), 0);
        assert_eq!(registry.by_name("opacity"), Some(opacity.id()));
        assert_eq!(registry.by_name("missing"), None);
        assert_eq!(registry.name(AttrId::new(99)), None);
        assert_eq!(registry.affects(opacity.id()), Invalidation::PAINT);
    }

    #[test]
    fn typed_metadata_lookup() {
        let mut registry = AttrRegistry::new();
        let x = registry.register("x", AttrMetadataBuilder::new(5.0_f64).build());
        assert_eq!(registry.metadata(x).map(|m| *m.default_value()), Some(5.0));

        let wrong: Attr<bool> = Attr::from_id(x.id());
        assert!(registry.metadata(wrong).is_none());
    }

    #[test]
    fn erased_coercion() {
        let mut registry = AttrRegistry::new();
        let opacity = registry.register(
            "opacity",
            AttrMetadataBuilder::new(1.0_f64)
                .coerce(|v: f64| v.clamp(0.0, 1.0))
                .build(),
        );
        let reg = registry.get(opacity.id()).unwrap();
        let coerced = reg.coerce_erased(ErasedValue::new(4.0_f64)).unwrap();
        assert_eq!(coerced.downcast_ref::<f64>(), Some(&1.0));
        assert!(reg.coerce_erased(ErasedValue::new(true)).is_err());
        assert!(reg.default_erased().same_value(&ErasedValue::new(1.0_f64)));
    }

    #[test]
    fn iteration_order() {
        let mut registry = AttrRegistry::new();
        registry.register("x", AttrMetadataBuilder::new(0.0_f64).build());
        registry.register("y", AttrMetadataBuilder::new(0.0_f64).build());
        let names: Vec<_> = registry.iter().map(|(_, r)| r.name()).collect();
        assert_eq!(names, vec!["x", "y"]);
        assert!(format!("{registry:?}").contains("\"y\""));
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn duplicate_name_panics() {
        let mut registry = AttrRegistry::new();
        registry.register("x", AttrMetadataBuilder::new(0.0_f64).build());
        registry.register("x", AttrMetadataBuilder::new(0.0_f64).build());
    }
}
