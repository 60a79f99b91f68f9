// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Stratum Attr: typed attribute storage with change detection.
//!
//! Every node in a Stratum scene carries an [`AttrStore`]: a sparse bag of
//! explicitly set values keyed by [`AttrId`]. Attributes are declared once in
//! an [`AttrRegistry`], which records each attribute's default value, what a
//! change to it invalidates ([`Invalidation`]), and an optional coercion.
//!
//! ## Change detection
//!
//! A write compares the proposed value against the current effective value
//! (stored value or default) and produces an [`AttrChange`] only when they
//! differ. Equality comes from [`AttrValue`]:
//!
//! - ordinary attributes use [`AttrValue::same_value`];
//! - attributes registered with
//!   [`AttrMetadataBuilder::transform_affecting`] use
//!   [`AttrValue::same_bits`], so any bit-level change to a float is a change.
//!
//! ## Quick Start
//!
//! ```rust
//! use stratum_attr::{AttrMetadataBuilder, AttrRegistry, AttrStore, Invalidation};
//!
//! let mut registry = AttrRegistry::new();
//! let rotation = registry.register(
//!     "rotation",
//!     AttrMetadataBuilder::new(0.0_f64).transform_affecting().build(),
//! );
//! let opacity = registry.register(
//!     "opacity",
//!     AttrMetadataBuilder::new(1.0_f64)
//!         .affects(Invalidation::PAINT)
//!         .coerce(|v: f64| v.clamp(0.0, 1.0))
//!         .build(),
//! );
//!
//! let mut store = AttrStore::new();
//! let change = store.set(rotation, 0.5, &registry).unwrap();
//! assert!(registry.affects(change.attr).contains(Invalidation::TRANSFORM));
//!
//! // Coerced to 1.0, which is the default, so nothing changes.
//! assert!(store.set(opacity, 3.0, &registry).is_none());
//! ```
//!
//! ## `no_std` Support
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod id;
mod invalidation;
mod metadata;
mod registry;
mod store;
mod value;

pub use id::{Attr, AttrId};
pub use invalidation::Invalidation;
pub use metadata::{AttrMetadata, AttrMetadataBuilder, CoerceValueCallback};
pub use registry::{AttrRegistration, AttrRegistry};
pub use store::{AttrChange, AttrStore, AttrWriteError};
pub use value::{AttrValue, ErasedValue};
