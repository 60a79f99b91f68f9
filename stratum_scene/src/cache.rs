// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Subtree bitmap caches.
//!
//! A cached node renders its content once into a scene bitmap and a hit
//! bitmap, both in the node's own coordinate space (its transform, opacity
//! and composite operator are applied when the bitmaps are blitted). Any
//! render-affecting change inside the subtree marks the cache stale; the
//! next draw or pick re-renders it before blitting.
//!
//! Filters run on the scene bitmap only. The unfiltered pixels are kept so a
//! filter-only change re-runs the chain without re-rendering the subtree.

use alloc::boxed::Box;

use kurbo::{Affine, Rect};
use stratum_attr::Invalidation;
use stratum_raster::{Antialias, Canvas, Pixmap, device_size};

use crate::config::CacheOptions;
use crate::error::{CacheRejection, InvalidOperation, SceneError, Warning};
use crate::render::{Pass, Paint};
use crate::scene::Scene;
use crate::tree::STRUCTURE;
use crate::types::{NodeId, NodeKind};

#[derive(Debug)]
pub(crate) struct BitmapCache {
    pub(crate) rect: Rect,
    pub(crate) pixel_ratio: f64,
    pub(crate) scene: Pixmap,
    pub(crate) hit: Pixmap,
    pub(crate) filter_input: Option<Pixmap>,
    pub(crate) stale: bool,
    pub(crate) filters_stale: bool,
    pub(crate) refreshes: u64,
}

/// Result of [`Scene::enable_cache`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CacheOutcome {
    /// Bitmaps of this device size were allocated and rendered.
    Cached {
        /// Width in device pixels.
        width: u32,
        /// Height in device pixels.
        height: u32,
    },
    /// The request was refused and the subtree renders live.
    Rejected(CacheRejection),
}

/// A snapshot of a node's cache state.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CacheInfo {
    /// Cached region in the node's own space.
    pub rect: Rect,
    /// Device pixels per logical unit.
    pub pixel_ratio: f64,
    /// Bitmap width in device pixels.
    pub width: u32,
    /// Bitmap height in device pixels.
    pub height: u32,
    /// Whether the next use re-renders the subtree.
    pub stale: bool,
    /// Number of times the subtree has been rendered into the bitmaps.
    pub refreshes: u64,
}

impl Scene {
    /// Caches a group or leaf as bitmaps.
    ///
    /// The region defaults to the subtree's bounds in the node's own space,
    /// grown by `padding` and rounded out to whole units. Empty regions and
    /// regions over the configured ceiling are refused with a warning; the
    /// node then renders live. Re-caching replaces any existing cache.
    pub fn enable_cache(
        &mut self,
        node: NodeId,
        options: CacheOptions,
    ) -> Result<CacheOutcome, SceneError> {
        if self.live(node)?.kind == NodeKind::Layer {
            return Err(InvalidOperation::LayerCache(node).into());
        }
        if let Some(entry) = self.get_mut(node) {
            entry.cache = None;
        }
        let rect = options
            .bounds
            .or_else(|| self.content_rect(node))
            .map(|r| r.inflate(options.padding, options.padding).expand())
            .filter(|r| r.width() > 0.0 && r.height() > 0.0);
        let Some(rect) = rect else {
            return Ok(self.reject_cache(node, CacheRejection::EmptyBounds));
        };
        let ratio = options
            .pixel_ratio
            .filter(|r| r.is_finite() && *r > 0.0)
            .unwrap_or(self.config.pixel_ratio);
        let width = device_size(rect.width(), ratio);
        let height = device_size(rect.height(), ratio);
        let limit = self.config.max_cache_dimension;
        if width > limit
            || height > limit
            || u64::from(width) * u64::from(height) > self.config.max_cache_area
        {
            return Ok(self.reject_cache(node, CacheRejection::TooLarge { width, height }));
        }
        if let Some(entry) = self.get_mut(node) {
            entry.cache = Some(Box::new(BitmapCache {
                rect,
                pixel_ratio: ratio,
                scene: Pixmap::new(width, height),
                hit: Pixmap::new(width, height),
                filter_input: None,
                stale: true,
                filters_stale: false,
                refreshes: 0,
            }));
        }
        self.refresh_cache_if_stale(node);
        self.invalidate_above(node, STRUCTURE);
        Ok(CacheOutcome::Cached { width, height })
    }

    fn reject_cache(&mut self, node: NodeId, reason: CacheRejection) -> CacheOutcome {
        self.warn(Warning::CacheRejected { node, reason });
        self.invalidate_above(node, STRUCTURE);
        CacheOutcome::Rejected(reason)
    }

    fn invalidate_above(&mut self, node: NodeId, affects: Invalidation) {
        if let Some(parent) = self.get(node).and_then(|n| n.parent) {
            self.invalidate(parent, affects);
        }
    }

    /// Drops a node's cache. Returns whether it had one.
    pub fn disable_cache(&mut self, node: NodeId) -> Result<bool, SceneError> {
        self.live(node)?;
        let had = self
            .get_mut(node)
            .and_then(|n| n.cache.take())
            .is_some();
        if had {
            self.invalidate_above(node, STRUCTURE);
        }
        Ok(had)
    }

    /// Returns `true` if the node renders from a bitmap cache.
    pub fn is_cached(&self, node: NodeId) -> Result<bool, SceneError> {
        Ok(self.live(node)?.cache.is_some())
    }

    /// The node's cache state, if cached.
    pub fn cache_info(&self, node: NodeId) -> Result<Option<CacheInfo>, SceneError> {
        Ok(self.live(node)?.cache.as_deref().map(|c| CacheInfo {
            rect: c.rect,
            pixel_ratio: c.pixel_ratio,
            width: c.scene.width(),
            height: c.scene.height(),
            stale: c.stale,
            refreshes: c.refreshes,
        }))
    }

    /// The cached scene bitmap, with filters applied.
    pub fn cached_scene(&self, node: NodeId) -> Result<Option<&Pixmap>, SceneError> {
        Ok(self.live(node)?.cache.as_deref().map(|c| &c.scene))
    }

    /// The cached hit bitmap.
    pub fn cached_hit(&self, node: NodeId) -> Result<Option<&Pixmap>, SceneError> {
        Ok(self.live(node)?.cache.as_deref().map(|c| &c.hit))
    }

    /// Brings a stale cache up to date now rather than at the next draw.
    /// Returns whether any work was done.
    pub fn refresh_cache(&mut self, node: NodeId) -> Result<bool, SceneError> {
        self.live(node)?;
        Ok(self.refresh_cache_if_stale(node))
    }

    pub(crate) fn refresh_cache_if_stale(&mut self, node: NodeId) -> bool {
        let Some(cache) = self.get(node).and_then(|n| n.cache.as_deref()) else {
            return false;
        };
        let (rect, ratio, stale, filters_stale) =
            (cache.rect, cache.pixel_ratio, cache.stale, cache.filters_stale);
        if !stale && !filters_stale {
            return false;
        }
        let Some(filters) = self
            .get(node)
            .map(|n| n.attrs.get_or_default(self.attrs.filters, &self.registry).clone())
        else {
            return false;
        };
        let rendered = stale.then(|| {
            let base = Affine::translate(-rect.origin().to_vec2());
            let mut scene = Canvas::new(rect.width(), rect.height(), ratio)
                .with_antialias(self.config.antialias);
            self.draw_content(node, &mut scene, base, Paint::root(Pass::Scene), true);
            let mut hit = Canvas::new(rect.width(), rect.height(), ratio)
                .with_antialias(Antialias::None);
            self.draw_content(node, &mut hit, base, Paint::root(Pass::Hit), true);
            (scene.into_pixmap(), hit.into_pixmap())
        });
        let Some(cache) = self.get_mut(node).and_then(|n| n.cache.as_deref_mut()) else {
            return false;
        };
        let input = match rendered {
            Some((scene, hit)) => {
                cache.hit = hit;
                cache.refreshes += 1;
                tracing::trace!(?node, refreshes = cache.refreshes, "cache re-rendered");
                scene
            }
            None => {
                tracing::trace!(?node, "cache filters re-applied");
                cache
                    .filter_input
                    .take()
                    .unwrap_or_else(|| cache.scene.clone())
            }
        };
        if filters.is_empty() {
            cache.scene = input;
            cache.filter_input = None;
        } else {
            let mut output = input.clone();
            filters.apply(&mut output);
            cache.scene = output;
            cache.filter_input = Some(input);
        }
        cache.stale = false;
        cache.filters_stale = false;
        true
    }
}
