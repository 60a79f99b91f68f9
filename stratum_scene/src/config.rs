// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scene, layer and cache configuration.

use kurbo::Rect;
use stratum_raster::Antialias;

/// Scene-wide configuration.
///
/// Fields are public for direct construction; the `with_*` methods read
/// better at call sites that only change one or two values.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneConfig {
    /// Device pixels per logical unit for layer scene canvases.
    pub pixel_ratio: f64,
    /// Device pixels per logical unit for layer pick canvases.
    pub hit_pixel_ratio: f64,
    /// Coverage sampling for scene canvases and cached scene bitmaps.
    ///
    /// Pick canvases always render aliased.
    pub antialias: Antialias,
    /// Largest width or height, in device pixels, of a cache bitmap.
    pub max_cache_dimension: u32,
    /// Largest area, in device pixels, of a cache bitmap.
    pub max_cache_area: u64,
    /// Schedule a layer redraw automatically when its content changes.
    pub auto_draw: bool,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            pixel_ratio: 1.0,
            hit_pixel_ratio: 1.0,
            antialias: Antialias::default(),
            max_cache_dimension: 8192,
            max_cache_area: 8192 * 8192,
            auto_draw: true,
        }
    }
}

impl SceneConfig {
    /// Sets the scene canvas pixel ratio.
    #[must_use]
    pub fn with_pixel_ratio(mut self, ratio: f64) -> Self {
        self.pixel_ratio = ratio;
        self
    }

    /// Sets the pick canvas pixel ratio.
    #[must_use]
    pub fn with_hit_pixel_ratio(mut self, ratio: f64) -> Self {
        self.hit_pixel_ratio = ratio;
        self
    }

    /// Sets scene canvas antialiasing.
    #[must_use]
    pub fn with_antialias(mut self, antialias: Antialias) -> Self {
        self.antialias = antialias;
        self
    }

    /// Sets the cache bitmap ceilings.
    #[must_use]
    pub fn with_cache_limits(mut self, max_dimension: u32, max_area: u64) -> Self {
        self.max_cache_dimension = max_dimension;
        self.max_cache_area = max_area;
        self
    }

    /// Enables or disables automatic redraw scheduling.
    #[must_use]
    pub fn with_auto_draw(mut self, auto_draw: bool) -> Self {
        self.auto_draw = auto_draw;
        self
    }
}

/// Per-layer options.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayerOptions {
    /// Logical width of the layer surfaces.
    pub width: f64,
    /// Logical height of the layer surfaces.
    pub height: f64,
    /// Clear the scene canvas before each redraw.
    pub clear_before_draw: bool,
    /// Maintain a pick surface. When off, picks in this layer never resolve.
    pub hit_graph_enabled: bool,
}

impl LayerOptions {
    /// Options for a `width` by `height` layer with default behavior.
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            clear_before_draw: true,
            hit_graph_enabled: true,
        }
    }

    /// Sets whether the scene canvas is cleared before each redraw.
    #[must_use]
    pub fn with_clear_before_draw(mut self, clear: bool) -> Self {
        self.clear_before_draw = clear;
        self
    }

    /// Sets whether the layer keeps a pick surface.
    #[must_use]
    pub fn with_hit_graph(mut self, enabled: bool) -> Self {
        self.hit_graph_enabled = enabled;
        self
    }
}

/// Options for [`Scene::enable_cache`](crate::Scene::enable_cache).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CacheOptions {
    /// Region to cache, in the node's own coordinate space. Defaults to the
    /// subtree's bounding rect.
    pub bounds: Option<Rect>,
    /// Device pixels per logical unit. Defaults to the scene pixel ratio.
    pub pixel_ratio: Option<f64>,
    /// Logical units added on every side of the region.
    pub padding: f64,
}

impl CacheOptions {
    /// Caches the subtree bounds at the scene pixel ratio.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Caches an explicit region.
    #[must_use]
    pub fn with_bounds(mut self, bounds: Rect) -> Self {
        self.bounds = Some(bounds);
        self
    }

    /// Caches at an explicit pixel ratio.
    #[must_use]
    pub fn with_pixel_ratio(mut self, ratio: f64) -> Self {
        self.pixel_ratio = Some(ratio);
        self
    }

    /// Pads the region.
    #[must_use]
    pub fn with_padding(mut self, padding: f64) -> Self {
        self.padding = padding;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SceneConfig::default();
        assert_eq!(config.pixel_ratio, 1.0);
        assert!(config.auto_draw);
        assert_eq!(config.max_cache_area, 8192 * 8192);

        let layer = LayerOptions::new(100.0, 50.0);
        assert!(layer.clear_before_draw);
        assert!(layer.hit_graph_enabled);
    }

    #[test]
    fn builders() {
        let config = SceneConfig::default()
            .with_pixel_ratio(2.0)
            .with_auto_draw(false)
            .with_cache_limits(64, 1024);
        assert_eq!(config.pixel_ratio, 2.0);
        assert!(!config.auto_draw);
        assert_eq!(config.max_cache_dimension, 64);

        let cache = CacheOptions::new().with_padding(2.0).with_pixel_ratio(3.0);
        assert_eq!(cache.padding, 2.0);
        assert_eq!(cache.pixel_ratio, Some(3.0));
        assert_eq!(cache.bounds, None);
    }
}
