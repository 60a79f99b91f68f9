// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Stratum Scene: a retained-mode 2D scene graph that does as little work
//! per frame as it can.
//!
//! A [`Scene`] owns a tree of nodes: [layers](NodeKind::Layer) on a stage,
//! [groups](NodeKind::Group) inside them, and drawable
//! [leaves](NodeKind::Leaf). Every node carries typed attributes (position,
//! rotation, opacity, fill, ...), declared in an attribute registry that
//! also records what a change to each attribute invalidates.
//!
//! Writing an attribute routes exactly the work that change requires:
//!
//! - Transform attributes dirty the memoized matrices of the node and its
//!   subtree. Matrices are recomputed lazily, at most once per node between
//!   mutations.
//! - Changes that affect hit geometry mark the layer's pick surface stale.
//!   It is rebuilt on the next [`Scene::pick_at`].
//! - Changes inside a bitmap-cached subtree mark that cache stale; the next
//!   draw re-renders it once, later draws just blit.
//! - Visual changes schedule the layer. Any number of changes before the
//!   next [`Scene::on_animation_frame`] cost one redraw.
//!
//! Writing a value equal to the current one does nothing at all.
//!
//! ## Picking
//!
//! Each listening leaf is assigned a unique opaque color. Layers render
//! their leaves in these colors onto an aliased pick canvas, so a point
//! query is a single pixel read.
//!
//! ## Quick Start
//!
//! ```rust
//! use kurbo::{Point, Rect};
//! use peniko::Color;
//! use stratum_scene::{CacheOptions, CacheOutcome, LayerOptions, PathDrawable, Scene};
//!
//! let mut scene = Scene::new();
//! let a = scene.attrs();
//!
//! let layer = scene.create_layer(LayerOptions::new(200.0, 200.0));
//! scene.add_layer(layer).unwrap();
//!
//! let group = scene.create_group();
//! scene.add_child(layer, group).unwrap();
//! scene.set_attr(group, a.x, 50.0).unwrap();
//!
//! let dot = scene.create_leaf(PathDrawable::from_shape(&Rect::new(0.0, 0.0, 20.0, 20.0)));
//! scene.set_attr(dot, a.fill, Some(Color::from_rgba8(0, 128, 255, 255))).unwrap();
//! scene.add_child(group, dot).unwrap();
//!
//! // Render the group once into bitmaps and blit from then on.
//! let outcome = scene.enable_cache(group, CacheOptions::new()).unwrap();
//! assert_eq!(outcome, CacheOutcome::Cached { width: 20, height: 20 });
//!
//! assert_eq!(scene.on_animation_frame(), vec![layer]);
//! assert_eq!(scene.pick_at(Point::new(60.0, 10.0)), Some(dot));
//! ```
//!
//! ## Warnings
//!
//! Requests the scene can recover from, such as an out-of-range z-index or
//! an oversized cache, are logged through `tracing` and queued as
//! [`Warning`]s; see [`Scene::take_warnings`].
//!
//! ## Features
//!
//! - `std` (enabled by default): use the standard library.
//! - `libm`: float math for `no_std` builds.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod attrs;
mod cache;
mod config;
mod draw;
mod error;
mod node;
mod pick;
mod record;
mod render;
mod scene;
mod schedule;
mod transform;
mod tree;
mod types;

pub use attrs::{Filter, Filters, StandardAttrs, Style};
pub use cache::{CacheInfo, CacheOutcome};
pub use config::{CacheOptions, LayerOptions, SceneConfig};
pub use draw::{Drawable, PathDrawable, ShapeContext};
pub use error::{CacheRejection, InvalidOperation, SceneError, Warning};
pub use pick::ColorKey;
pub use record::NodeRecord;
pub use scene::{ListenerId, Scene};
pub use schedule::{FrameRequester, RedrawState};
pub use transform::LocalTransform;
pub use types::{NodeId, NodeKind, TransformsMode};

pub use stratum_attr::{
    Attr, AttrChange, AttrId, AttrMetadata, AttrMetadataBuilder, AttrValue, ErasedValue,
    Invalidation,
};
pub use stratum_raster::{Antialias, Canvas, CompositeOp, Pixmap};
