// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The built-in attribute set every scene registers.

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use kurbo::Rect;
use peniko::Color;
use stratum_attr::{Attr, AttrMetadataBuilder, AttrRegistry, AttrValue, Invalidation};
use stratum_raster::{CompositeOp, Pixmap};

use crate::types::TransformsMode;

/// A pixel filter applied to a cached node's scene bitmap.
pub trait Filter: 'static {
    /// Filters `image` in place. Pixels are premultiplied RGBA8.
    fn apply(&self, image: &mut Pixmap);
}

/// An ordered filter chain.
///
/// Two chains compare equal when they hold the same filter instances in the
/// same order.
#[derive(Clone, Default)]
pub struct Filters(Vec<Arc<dyn Filter>>);

impl Filters {
    /// An empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a filter.
    #[must_use]
    pub fn with(mut self, filter: impl Filter) -> Self {
        self.0.push(Arc::new(filter));
        self
    }

    /// Appends a shared filter.
    #[must_use]
    pub fn with_shared(mut self, filter: Arc<dyn Filter>) -> Self {
        self.0.push(filter);
        self
    }

    /// Number of filters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the chain is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Runs every filter in order.
    pub fn apply(&self, image: &mut Pixmap) {
        for filter in &self.0 {
            filter.apply(image);
        }
    }
}

impl fmt::Debug for Filters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Filters").field(&self.0.len()).finish()
    }
}

impl AttrValue for Filters {
    fn same_value(&self, other: &Self) -> bool {
        self.0.len() == other.0.len()
            && self.0.iter().zip(&other.0).all(|(a, b)| Arc::ptr_eq(a, b))
    }
}

/// Typed keys for the built-in attributes.
///
/// Obtained from [`Scene::attrs`](crate::Scene::attrs).
#[derive(Clone, Copy, Debug)]
pub struct StandardAttrs {
    /// Horizontal position.
    pub x: Attr<f64>,
    /// Vertical position.
    pub y: Attr<f64>,
    /// Horizontal scale factor.
    pub scale_x: Attr<f64>,
    /// Vertical scale factor.
    pub scale_y: Attr<f64>,
    /// Rotation in radians.
    pub rotation: Attr<f64>,
    /// Horizontal skew factor.
    pub skew_x: Attr<f64>,
    /// Vertical skew factor.
    pub skew_y: Attr<f64>,
    /// Horizontal pivot, subtracted before the other transform steps.
    pub offset_x: Attr<f64>,
    /// Vertical pivot.
    pub offset_y: Attr<f64>,
    /// Which transform components apply.
    pub transforms_enabled: Attr<TransformsMode>,
    /// Opacity, coerced into `0..=1`.
    pub opacity: Attr<f64>,
    /// Whether the node renders.
    pub visible: Attr<bool>,
    /// Whether the node takes part in picking.
    pub listening: Attr<bool>,
    /// Whitespace-separated names.
    pub name: Attr<String>,
    /// Unique id.
    pub id: Attr<String>,
    /// Fill color; `None` disables filling.
    pub fill: Attr<Option<Color>>,
    /// Stroke color; `None` disables stroking.
    pub stroke: Attr<Option<Color>>,
    /// Stroke width in local units, coerced to be non-negative.
    pub stroke_width: Attr<f64>,
    /// Composite operator used when drawing the node.
    pub composite_op: Attr<CompositeOp>,
    /// Clip rectangle for a container's children, in its local space.
    pub clip: Attr<Option<Rect>>,
    /// Filters applied to a cached node's bitmap.
    pub filters: Attr<Filters>,
}

impl StandardAttrs {
    /// Registers the built-in attributes.
    ///
    /// # Panics
    ///
    /// Panics if `registry` already holds any of the built-in names.
    pub fn register(registry: &mut AttrRegistry) -> Self {
        let geometry = |default: f64| {
            AttrMetadataBuilder::new(default)
                .transform_affecting()
                .affects(Invalidation::BOUNDS)
                .build()
        };
        Self {
            x: registry.register("x", geometry(0.0)),
            y: registry.register("y", geometry(0.0)),
            scale_x: registry.register("scaleX", geometry(1.0)),
            scale_y: registry.register("scaleY", geometry(1.0)),
            rotation: registry.register("rotation", geometry(0.0)),
            skew_x: registry.register("skewX", geometry(0.0)),
            skew_y: registry.register("skewY", geometry(0.0)),
            offset_x: registry.register("offsetX", geometry(0.0)),
            offset_y: registry.register("offsetY", geometry(0.0)),
            transforms_enabled: registry.register(
                "transformsEnabled",
                AttrMetadataBuilder::new(TransformsMode::All)
                    .affects(Invalidation::TRANSFORM | Invalidation::BOUNDS)
                    .build(),
            ),
            opacity: registry.register(
                "opacity",
                AttrMetadataBuilder::new(1.0)
                    .affects(Invalidation::PAINT)
                    .coerce(|v: f64| if v.is_nan() { 1.0 } else { v.clamp(0.0, 1.0) })
                    .build(),
            ),
            visible: registry.register(
                "visible",
                AttrMetadataBuilder::new(true)
                    .affects(Invalidation::VISIBILITY | Invalidation::BOUNDS)
                    .build(),
            ),
            listening: registry.register(
                "listening",
                AttrMetadataBuilder::new(true)
                    .affects(Invalidation::LISTENING)
                    .build(),
            ),
            name: registry.register(
                "name",
                AttrMetadataBuilder::new(String::new())
                    .affects(Invalidation::INDEX)
                    .build(),
            ),
            id: registry.register(
                "id",
                AttrMetadataBuilder::new(String::new())
                    .affects(Invalidation::INDEX)
                    .build(),
            ),
            fill: registry.register(
                "fill",
                AttrMetadataBuilder::new(None)
                    .affects(Invalidation::PAINT | Invalidation::HIT)
                    .build(),
            ),
            stroke: registry.register(
                "stroke",
                AttrMetadataBuilder::new(None)
                    .affects(Invalidation::PAINT | Invalidation::HIT)
                    .build(),
            ),
            stroke_width: registry.register(
                "strokeWidth",
                AttrMetadataBuilder::new(1.0)
                    .affects(Invalidation::PAINT | Invalidation::HIT | Invalidation::BOUNDS)
                    .coerce(|v: f64| if v.is_nan() { 0.0 } else { v.max(0.0) })
                    .build(),
            ),
            composite_op: registry.register(
                "globalCompositeOperation",
                AttrMetadataBuilder::new(CompositeOp::SourceOver)
                    .affects(Invalidation::PAINT)
                    .build(),
            ),
            clip: registry.register(
                "clip",
                AttrMetadataBuilder::new(None)
                    .affects(Invalidation::PAINT | Invalidation::HIT | Invalidation::BOUNDS)
                    .build(),
            ),
            filters: registry.register(
                "filters",
                AttrMetadataBuilder::new(Filters::new())
                    .affects(Invalidation::FILTERS)
                    .build(),
            ),
        }
    }
}

/// Paint style resolved from a leaf's attributes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Style {
    /// Fill color, if filling.
    pub fill: Option<Color>,
    /// Stroke color, if stroking.
    pub stroke: Option<Color>,
    /// Stroke width in local units.
    pub stroke_width: f64,
}
