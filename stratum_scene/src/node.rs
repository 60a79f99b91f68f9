// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-node storage.

use alloc::boxed::Box;
use core::fmt;

use smallvec::SmallVec;
use stratum_attr::AttrStore;
use stratum_raster::{Antialias, Canvas};

use crate::cache::BitmapCache;
use crate::config::LayerOptions;
use crate::draw::Drawable;
use crate::pick::ColorKey;
use crate::schedule::RedrawState;
use crate::transform::TransformEntry;
use crate::types::{NodeId, NodeKind};

/// Surfaces and bookkeeping owned by a layer.
#[derive(Debug)]
pub(crate) struct LayerSurfaces {
    pub(crate) options: LayerOptions,
    pub(crate) canvas: Canvas,
    pub(crate) pick: Canvas,
    pub(crate) pick_stale: bool,
    pub(crate) pick_rebuilds: u64,
    pub(crate) redraws: u64,
    pub(crate) state: RedrawState,
}

impl LayerSurfaces {
    pub(crate) fn new(
        options: LayerOptions,
        pixel_ratio: f64,
        hit_pixel_ratio: f64,
        antialias: Antialias,
    ) -> Self {
        Self {
            options,
            canvas: Canvas::new(options.width, options.height, pixel_ratio)
                .with_antialias(antialias),
            pick: Canvas::new(options.width, options.height, hit_pixel_ratio)
                .with_antialias(Antialias::None),
            pick_stale: true,
            pick_rebuilds: 0,
            redraws: 0,
            state: RedrawState::Idle,
        }
    }
}

pub(crate) struct Node {
    pub(crate) generation: u32,
    pub(crate) kind: NodeKind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: SmallVec<[NodeId; 4]>,
    pub(crate) attrs: AttrStore,
    pub(crate) transform: TransformEntry,
    pub(crate) drawable: Option<Box<dyn Drawable>>,
    pub(crate) color_key: Option<ColorKey>,
    pub(crate) cache: Option<Box<BitmapCache>>,
    pub(crate) surfaces: Option<Box<LayerSurfaces>>,
}

impl Node {
    pub(crate) fn new(generation: u32, kind: NodeKind) -> Self {
        Self {
            generation,
            kind,
            parent: None,
            children: SmallVec::new(),
            attrs: AttrStore::new(),
            transform: TransformEntry::default(),
            drawable: None,
            color_key: None,
            cache: None,
            surfaces: None,
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("generation", &self.generation)
            .field("kind", &self.kind)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("attrs", &self.attrs)
            .field("color_key", &self.color_key)
            .field("cached", &self.cache.is_some())
            .finish_non_exhaustive()
    }
}
