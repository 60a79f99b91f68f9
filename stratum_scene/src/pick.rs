// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Color-keyed picking.
//!
//! Every leaf that takes part in picking gets a unique opaque RGB color, its
//! key. Each layer keeps an aliased pick canvas on which every listening,
//! visible leaf is drawn in its key color. A point query reads one pixel and
//! maps the color back to the node.
//!
//! The pick canvas is rebuilt lazily, on the first query after anything
//! that affects hit geometry changes.

use alloc::vec::Vec;

use hashbrown::HashMap;
use kurbo::Point;
use peniko::Color;
use stratum_raster::Surface;

use crate::error::{SceneError, Warning};
use crate::render::Pass;
use crate::scene::Scene;
use crate::types::NodeId;

/// A leaf's pick color, packed as `0xRRGGBB`.
///
/// Keys are non-zero: transparent and black pixels never resolve.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ColorKey(u32);

impl ColorKey {
    /// Largest key.
    pub const MAX: u32 = 0x00FF_FFFF;

    /// The key for a packed RGB value, if it is a valid key.
    #[must_use]
    pub const fn new(rgb: u32) -> Option<Self> {
        if rgb == 0 || rgb > Self::MAX {
            None
        } else {
            Some(Self(rgb))
        }
    }

    /// The packed RGB value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Opaque RGBA8 bytes.
    #[must_use]
    #[expect(clippy::cast_possible_truncation, reason = "masked to one byte")]
    pub const fn to_rgba8(self) -> [u8; 4] {
        [(self.0 >> 16) as u8, (self.0 >> 8) as u8, self.0 as u8, 255]
    }

    /// The key as an opaque color.
    #[must_use]
    pub fn to_color(self) -> Color {
        let [r, g, b, a] = self.to_rgba8();
        Color::from_rgba8(r, g, b, a)
    }

    /// Decodes a pick pixel. Anything not fully opaque is a miss.
    #[must_use]
    pub fn from_rgba8(px: [u8; 4]) -> Option<Self> {
        if px[3] != 255 {
            return None;
        }
        Self::new((u32::from(px[0]) << 16) | (u32::from(px[1]) << 8) | u32::from(px[2]))
    }
}

/// Key allocation and reverse lookup.
#[derive(Debug, Default)]
pub(crate) struct ColorKeys {
    next: u32,
    free: Vec<ColorKey>,
    owners: HashMap<ColorKey, NodeId>,
}

impl ColorKeys {
    pub(crate) fn allocate(&mut self, node: NodeId) -> Option<ColorKey> {
        let key = match self.free.pop() {
            Some(key) => key,
            None => {
                let key = ColorKey::new(self.next + 1)?;
                self.next += 1;
                key
            }
        };
        self.owners.insert(key, node);
        Some(key)
    }

    pub(crate) fn retire(&mut self, key: ColorKey) {
        if self.owners.remove(&key).is_some() {
            self.free.push(key);
        }
    }

    pub(crate) fn resolve(&self, key: ColorKey) -> Option<NodeId> {
        self.owners.get(&key).copied()
    }
}

impl Scene {
    /// The leaf's color key, allocating one on first use.
    pub(crate) fn ensure_color_key(&mut self, leaf: NodeId) -> Option<ColorKey> {
        let existing = self.get(leaf)?.color_key;
        if existing.is_some() {
            return existing;
        }
        let Some(key) = self.keys.allocate(leaf) else {
            self.warn(Warning::ColorKeysExhausted { node: leaf });
            return None;
        };
        if let Some(node) = self.get_mut(leaf) {
            node.color_key = Some(key);
        }
        Some(key)
    }

    /// The leaf's color key, if it has taken part in a pick rebuild.
    pub fn color_key(&self, leaf: NodeId) -> Result<Option<ColorKey>, SceneError> {
        Ok(self.live(leaf)?.color_key)
    }

    /// Redraws the layer's pick canvas.
    pub(crate) fn rebuild_pick(&mut self, layer: NodeId) {
        let Some(mut surfaces) = self.get_mut(layer).and_then(|n| n.surfaces.take()) else {
            return;
        };
        surfaces.pick.clear();
        self.draw_layer_content(layer, &mut surfaces.pick, Pass::Hit);
        surfaces.pick_stale = false;
        surfaces.pick_rebuilds += 1;
        tracing::debug!(?layer, rebuilds = surfaces.pick_rebuilds, "pick surface rebuilt");
        if let Some(node) = self.get_mut(layer) {
            node.surfaces = Some(surfaces);
        }
    }

    /// The topmost listening leaf under `point` in one layer.
    ///
    /// `point` is in stage coordinates. Returns `None` for layers with the
    /// hit graph disabled.
    pub fn pick_in_layer(&mut self, layer: NodeId, point: Point) -> Result<Option<NodeId>, SceneError> {
        let surfaces = self.surfaces(layer)?;
        if !surfaces.options.hit_graph_enabled {
            return Ok(None);
        }
        if surfaces.pick_stale {
            self.rebuild_pick(layer);
        }
        let px = self.surfaces(layer)?.pick.pixel_at(point);
        Ok(px
            .and_then(ColorKey::from_rgba8)
            .and_then(|key| self.keys.resolve(key))
            .filter(|&n| self.is_alive(n)))
    }

    /// The topmost listening leaf under `point`, searching staged layers
    /// from the top.
    pub fn pick_at(&mut self, point: Point) -> Option<NodeId> {
        let layers: Vec<NodeId> = self.layers.iter().rev().copied().collect();
        layers
            .into_iter()
            .find_map(|layer| self.pick_in_layer(layer, point).ok().flatten())
    }

    /// Returns `true` if the layer's pick canvas will be rebuilt on the next
    /// query.
    pub fn is_pick_stale(&self, layer: NodeId) -> Result<bool, SceneError> {
        Ok(self.surfaces(layer)?.pick_stale)
    }

    /// Number of times the layer's pick canvas has been rebuilt.
    pub fn pick_rebuilds(&self, layer: NodeId) -> Result<u64, SceneError> {
        Ok(self.surfaces(layer)?.pick_rebuilds)
    }
}
