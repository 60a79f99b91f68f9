// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Attribute value types.
//!
//! Every attribute value implements [`AttrValue`], which supplies the
//! equality used for change detection. [`ErasedValue`] stores any such value
//! in a heterogeneous collection.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use core::any::{Any, TypeId};
use core::fmt;

use kurbo::{Point, Rect, Vec2};
use peniko::Color;

/// A value that can be stored in an attribute.
///
/// [`same_value`](Self::same_value) is the ordinary equality check used to
/// suppress no-op writes. [`same_bits`](Self::same_bits) is the stricter
/// comparison used for transform-affecting attributes; for floating point
/// types it compares bit patterns, so `-0.0` and `0.0` differ and a `NaN`
/// equals itself.
pub trait AttrValue: Clone + fmt::Debug + 'static {
    /// Returns `true` if `self` and `other` are equal for change detection.
    fn same_value(&self, other: &Self) -> bool;

    /// Returns `true` if `self` and `other` are bit-for-bit identical.
    fn same_bits(&self, other: &Self) -> bool {
        self.same_value(other)
    }
}

macro_rules! impl_attr_value_eq {
    ($($ty:ty),* $(,)?) => {
        $(
            impl AttrValue for $ty {
                #[inline]
                fn same_value(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

impl_attr_value_eq!(
    bool,
    char,
    i8,
    i16,
    i32,
    i64,
    isize,
    u8,
    u16,
    u32,
    u64,
    usize,
    String,
    &'static str,
);

impl AttrValue for f64 {
    #[inline]
    fn same_value(&self, other: &Self) -> bool {
        self == other
    }

    #[inline]
    fn same_bits(&self, other: &Self) -> bool {
        self.to_bits() == other.to_bits()
    }
}

impl AttrValue for f32 {
    #[inline]
    fn same_value(&self, other: &Self) -> bool {
        self == other
    }

    #[inline]
    fn same_bits(&self, other: &Self) -> bool {
        self.to_bits() == other.to_bits()
    }
}

impl<T: AttrValue> AttrValue for Option<T> {
    fn same_value(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.same_value(b),
            (None, None) => true,
            _ => false,
        }
    }

    fn same_bits(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.same_bits(b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T: AttrValue> AttrValue for Vec<T> {
    fn same_value(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other).all(|(a, b)| a.same_value(b))
    }

    fn same_bits(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other).all(|(a, b)| a.same_bits(b))
    }
}

impl AttrValue for Point {
    fn same_value(&self, other: &Self) -> bool {
        self == other
    }

    fn same_bits(&self, other: &Self) -> bool {
        self.x.same_bits(&other.x) && self.y.same_bits(&other.y)
    }
}

impl AttrValue for Vec2 {
    fn same_value(&self, other: &Self) -> bool {
        self == other
    }

    fn same_bits(&self, other: &Self) -> bool {
        self.x.same_bits(&other.x) && self.y.same_bits(&other.y)
    }
}

impl AttrValue for Rect {
    fn same_value(&self, other: &Self) -> bool {
        self == other
    }

    fn same_bits(&self, other: &Self) -> bool {
        self.x0.same_bits(&other.x0)
            && self.y0.same_bits(&other.y0)
            && self.x1.same_bits(&other.x1)
            && self.y1.same_bits(&other.y1)
    }
}

impl AttrValue for Color {
    fn same_value(&self, other: &Self) -> bool {
        self.components == other.components
    }

    fn same_bits(&self, other: &Self) -> bool {
        self.components
            .iter()
            .zip(other.components.iter())
            .all(|(a, b)| a.to_bits() == b.to_bits())
    }
}

/// A type-erased attribute value.
///
/// # Example
///
/// ```rust
/// use stratum_attr::ErasedValue;
///
/// let value = ErasedValue::new(42_i32);
/// assert!(value.is::<i32>());
/// assert_eq!(value.downcast_ref::<i32>(), Some(&42));
/// assert!(value.same_value(&ErasedValue::new(42_i32)));
/// assert!(!value.same_value(&ErasedValue::new(42_i64)));
/// ```
pub struct ErasedValue {
    inner: Box<dyn ErasedValueTrait>,
    type_id: TypeId,
}

impl ErasedValue {
    /// Erases a concrete value.
    #[must_use]
    pub fn new<T: AttrValue>(value: T) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            inner: Box::new(value),
        }
    }

    /// Returns the [`TypeId`] of the contained value.
    #[must_use]
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the Rust type name of the contained value.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.inner.type_name()
    }

    /// Returns `true` if the contained value is of type `T`.
    #[must_use]
    #[inline]
    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Downcasts to `&T`, or `None` on a type mismatch.
    #[must_use]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        if self.is::<T>() {
            self.inner.as_any().downcast_ref()
        } else {
            None
        }
    }

    /// Compares two erased values with [`AttrValue::same_value`].
    ///
    /// Values of different types are never equal.
    #[must_use]
    pub fn same_value(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.inner.same_value_dyn(other.inner.as_any())
    }

    /// Compares two erased values with [`AttrValue::same_bits`].
    #[must_use]
    pub fn same_bits(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.inner.same_bits_dyn(other.inner.as_any())
    }
}

impl Clone for ErasedValue {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone_boxed(),
            type_id: self.type_id,
        }
    }
}

impl fmt::Debug for ErasedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.debug_value(f)
    }
}

trait ErasedValueTrait: Any {
    fn as_any(&self) -> &dyn Any;
    fn clone_boxed(&self) -> Box<dyn ErasedValueTrait>;
    fn same_value_dyn(&self, other: &dyn Any) -> bool;
    fn same_bits_dyn(&self, other: &dyn Any) -> bool;
    fn debug_value(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
    fn type_name(&self) -> &'static str;
}

impl<T: AttrValue> ErasedValueTrait for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_boxed(&self) -> Box<dyn ErasedValueTrait> {
        Box::new(self.clone())
    }

    fn same_value_dyn(&self, other: &dyn Any) -> bool {
        other.downcast_ref::<T>().is_some_and(|o| self.same_value(o))
    }

    fn same_bits_dyn(&self, other: &dyn Any) -> bool {
        other.downcast_ref::<T>().is_some_and(|o| self.same_bits(o))
    }

    fn debug_value(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }

    fn type_name(&self) -> &'static str {
        core::any::type_name::<T>()
    }
}
