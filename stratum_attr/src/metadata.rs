// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Attribute metadata definitions.
//!
//! [`AttrMetadata`] stores an attribute's default value, what it invalidates
//! and an optional coercion. [`AttrMetadataBuilder`] builds it.

use alloc::boxed::Box;

use crate::invalidation::Invalidation;
use crate::value::AttrValue;

/// Callback that coerces a proposed value before it is compared and stored.
pub type CoerceValueCallback<T> = Box<dyn Fn(T) -> T + Send + Sync>;

/// Metadata for one attribute.
///
/// # Example
///
/// ```rust
/// use stratum_attr::{AttrMetadataBuilder, Invalidation};
///
/// let metadata = AttrMetadataBuilder::new(1.0_f64)
///     .affects(Invalidation::PAINT)
///     .coerce(|v: f64| v.clamp(0.0, 1.0))
///     .build();
///
/// assert_eq!(metadata.default_value(), &1.0);
/// assert_eq!(metadata.coerce(2.5), 1.0);
/// assert!(!metadata.is_transform_affecting());
/// ```
pub struct AttrMetadata<T: AttrValue> {
    default_value: T,
    affects: Invalidation,
    transform_affecting: bool,
    coerce_callback: Option<CoerceValueCallback<T>>,
}

impl<T: AttrValue> AttrMetadata<T> {
    /// Creates metadata with the given default and no invalidation.
    #[must_use]
    pub fn new(default_value: T) -> Self {
        Self {
            default_value,
            affects: Invalidation::empty(),
            transform_affecting: false,
            coerce_callback: None,
        }
    }

    /// Returns the default value.
    #[must_use]
    #[inline]
    pub fn default_value(&self) -> &T {
        &self.default_value
    }

    /// Returns what a change to this attribute invalidates.
    #[must_use]
    #[inline]
    pub fn affects(&self) -> Invalidation {
        self.affects
    }

    /// Returns `true` if the attribute composes the local transform.
    #[must_use]
    #[inline]
    pub fn is_transform_affecting(&self) -> bool {
        self.transform_affecting
    }

    /// Applies the coercion callback, if any.
    #[inline]
    pub fn coerce(&self, value: T) -> T {
        match &self.coerce_callback {
            Some(callback) => callback(value),
            None => value,
        }
    }

    /// Returns `true` if a coercion callback is set.
    #[must_use]
    #[inline]
    pub fn has_coerce_callback(&self) -> bool {
        self.coerce_callback.is_some()
    }

    /// Returns `true` if `old` and `new` count as the same value.
    ///
    /// Transform-affecting attributes compare bit patterns; everything else
    /// uses [`AttrValue::same_value`].
    #[must_use]
    pub fn is_unchanged(&self, old: &T, new: &T) -> bool {
        if self.transform_affecting {
            old.same_bits(new)
        } else {
            old.same_value(new)
        }
    }
}

impl<T: AttrValue> core::fmt::Debug for AttrMetadata<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AttrMetadata")
            .field("default_value", &self.default_value)
            .field("affects", &self.affects)
            .field("transform_affecting", &self.transform_affecting)
            .field("has_coerce_callback", &self.coerce_callback.is_some())
            .finish()
    }
}

/// Builder for [`AttrMetadata`].
pub struct AttrMetadataBuilder<T: AttrValue> {
    metadata: AttrMetadata<T>,
}

impl<T: AttrValue> core::fmt::Debug for AttrMetadataBuilder<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("AttrMetadataBuilder")
            .field(&self.metadata)
            .finish()
    }
}

impl<T: AttrValue> AttrMetadataBuilder<T> {
    /// Starts a builder with the given default value.
    #[must_use]
    pub fn new(default_value: T) -> Self {
        Self {
            metadata: AttrMetadata::new(default_value),
        }
    }

    /// Adds invalidation categories.
    #[must_use]
    pub fn affects(mut self, affects: Invalidation) -> Self {
        self.metadata.affects |= affects;
        self
    }

    /// Tags the attribute as a component of the local transform.
    ///
    /// Implies [`Invalidation::TRANSFORM`] and switches change detection to
    /// [`AttrValue::same_bits`].
    #[must_use]
    pub fn transform_affecting(mut self) -> Self {
        self.metadata.transform_affecting = true;
        self.metadata.affects |= Invalidation::TRANSFORM;
        self
    }

    /// Sets a callback that coerces values before they are stored.
    #[must_use]
    pub fn coerce<F>(mut self, callback: F) -> Self
    where
        F: Fn(T) -> T + Send + Sync + 'static,
    {
        self.metadata.coerce_callback = Some(Box::new(callback));
        self
    }

    /// Finishes the builder.
    #[must_use]
    pub fn build(self) -> AttrMetadata<T> {
        self.metadata
    }
}
