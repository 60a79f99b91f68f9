// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree traversal onto scene and pick canvases.
//!
//! The same traversal serves both passes. On the scene pass, opacity
//! multiplies down the tree and composite operators apply to leaves and
//! cache blits. On the hit pass both are ignored, only listening nodes are
//! visited, and leaves paint in their color key.
//!
//! Matrices come from the transform cache when drawing onto a layer. Inside
//! a bitmap cache they are composed relative to the cached node, so the
//! cached pixels do not depend on where the node sits.

use kurbo::{Affine, Size};
use stratum_raster::{Canvas, CompositeOp, Surface};

use crate::attrs::Style;
use crate::draw::{PaintMode, ShapeContext};
use crate::error::SceneError;
use crate::scene::Scene;
use crate::schedule::RedrawState;
use crate::tree::STRUCTURE;
use crate::types::{NodeId, NodeKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Pass {
    Scene,
    Hit,
}

/// Per-node paint state resolved during traversal.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Paint {
    pub(crate) pass: Pass,
    pub(crate) alpha: f64,
    pub(crate) composite: CompositeOp,
}

impl Paint {
    pub(crate) fn root(pass: Pass) -> Self {
        Self {
            pass,
            alpha: 1.0,
            composite: CompositeOp::SourceOver,
        }
    }
}

impl Scene {
    pub(crate) fn render_layer(&mut self, layer: NodeId) {
        let Some(mut surfaces) = self.get_mut(layer).and_then(|n| n.surfaces.take()) else {
            return;
        };
        if surfaces.options.clear_before_draw {
            surfaces.canvas.clear();
        }
        self.draw_layer_content(layer, &mut surfaces.canvas, Pass::Scene);
        surfaces.redraws += 1;
        surfaces.state = RedrawState::Idle;
        tracing::debug!(?layer, redraws = surfaces.redraws, "layer redrawn");
        if let Some(node) = self.get_mut(layer) {
            node.surfaces = Some(surfaces);
        }
    }

    pub(crate) fn draw_layer_content(&mut self, layer: NodeId, canvas: &mut Canvas, pass: Pass) {
        let Some(node) = self.get(layer) else {
            return;
        };
        let a = self.attrs;
        if !self.value_of(node, a.visible) || (pass == Pass::Hit && !self.value_of(node, a.listening))
        {
            return;
        }
        let mut paint = Paint::root(pass);
        if pass == Pass::Scene {
            paint.alpha = self.value_of(node, a.opacity);
        }
        let matrix = self.absolute_of(layer);
        self.draw_content(layer, canvas, matrix, paint, false);
    }

    fn draw_node(
        &mut self,
        id: NodeId,
        canvas: &mut Canvas,
        parent: Option<Affine>,
        inherited: Paint,
    ) {
        let Some(node) = self.get(id) else {
            return;
        };
        let a = self.attrs;
        if !self.value_of(node, a.visible) {
            return;
        }
        let paint = match inherited.pass {
            Pass::Scene => Paint {
                pass: Pass::Scene,
                alpha: inherited.alpha * self.value_of(node, a.opacity),
                composite: self.value_of(node, a.composite_op),
            },
            Pass::Hit if self.value_of(node, a.listening) => Paint::root(Pass::Hit),
            Pass::Hit => return,
        };
        let cached = node.cache.is_some();
        let matrix = match parent {
            Some(m) => m * self.local_of(id),
            None => self.absolute_of(id),
        };
        if cached {
            self.blit_cache(id, canvas, matrix, paint);
        } else {
            self.draw_content(id, canvas, matrix, paint, parent.is_some());
        }
    }

    /// Draws a node's own content in the space given by `matrix`, without
    /// consulting its cache. Children compose their matrices onto `matrix`
    /// when `relative` is set, and read the transform cache otherwise.
    pub(crate) fn draw_content(
        &mut self,
        id: NodeId,
        canvas: &mut Canvas,
        matrix: Affine,
        paint: Paint,
        relative: bool,
    ) {
        let Some(node) = self.get(id) else {
            return;
        };
        if node.kind == NodeKind::Leaf {
            self.draw_leaf(id, canvas, matrix, paint);
            return;
        }
        let clip = self.value_of(node, self.attrs.clip);
        let children = node.children.clone();
        let saved = canvas.save();
        if let Some(clip) = clip {
            canvas.set_transform(matrix);
            canvas.clip_rect(clip);
        }
        for child in children {
            self.draw_node(child, canvas, relative.then_some(matrix), paint);
        }
        canvas.restore(saved);
    }

    fn draw_leaf(&mut self, id: NodeId, canvas: &mut Canvas, matrix: Affine, paint: Paint) {
        let mode = match paint.pass {
            Pass::Scene => PaintMode::Scene,
            Pass::Hit => match self.ensure_color_key(id) {
                Some(key) => PaintMode::Hit(key.to_color()),
                None => return,
            },
        };
        let Some(node) = self.get(id) else {
            return;
        };
        let Some(drawable) = node.drawable.as_deref() else {
            return;
        };
        let a = self.attrs;
        let style = Style {
            fill: self.value_of(node, a.fill),
            stroke: self.value_of(node, a.stroke),
            stroke_width: self.value_of(node, a.stroke_width),
        };
        let saved = canvas.save();
        canvas.set_transform(matrix);
        canvas.set_global_alpha(paint.alpha);
        canvas.set_composite_op(paint.composite);
        let mut ctx = ShapeContext::new(canvas, style, mode);
        match paint.pass {
            Pass::Scene => drawable.draw(&mut ctx),
            Pass::Hit => drawable.draw_hit(&mut ctx),
        }
        canvas.restore(saved);
    }

    fn blit_cache(&mut self, id: NodeId, canvas: &mut Canvas, matrix: Affine, paint: Paint) {
        self.refresh_cache_if_stale(id);
        let Some(cache) = self.get(id).and_then(|n| n.cache.as_deref()) else {
            return;
        };
        let image = match paint.pass {
            Pass::Scene => &cache.scene,
            Pass::Hit => &cache.hit,
        };
        let saved = canvas.save();
        canvas.set_transform(
            matrix
                * Affine::translate(cache.rect.origin().to_vec2())
                * Affine::scale(1.0 / cache.pixel_ratio),
        );
        canvas.set_global_alpha(paint.alpha);
        canvas.set_composite_op(paint.composite);
        canvas.draw_image(image, 0.0, 0.0);
        canvas.restore(saved);
    }

    /// A layer's scene canvas, as of its last redraw.
    pub fn layer_canvas(&self, layer: NodeId) -> Result<&Canvas, SceneError> {
        Ok(&self.surfaces(layer)?.canvas)
    }

    /// A layer's pick canvas, as of its last rebuild.
    pub fn pick_canvas(&self, layer: NodeId) -> Result<&Canvas, SceneError> {
        Ok(&self.surfaces(layer)?.pick)
    }

    /// Resizes a layer's canvases.
    pub fn set_layer_size(&mut self, layer: NodeId, size: Size) -> Result<(), SceneError> {
        self.surfaces(layer)?;
        if let Some(surfaces) = self.surfaces_mut(layer) {
            surfaces.options.width = size.width;
            surfaces.options.height = size.height;
            surfaces.canvas.resize(size.width, size.height);
            surfaces.pick.resize(size.width, size.height);
        }
        self.invalidate(layer, STRUCTURE);
        Ok(())
    }

    /// Changes the scene pixel ratio, reallocating every layer's scene
    /// canvas. Cached bitmaps keep the ratio they were created with.
    pub fn set_pixel_ratio(&mut self, ratio: f64) {
        self.config.pixel_ratio = ratio;
        for slot in &mut self.nodes {
            if let Some(surfaces) = slot.as_mut().and_then(|n| n.surfaces.as_mut()) {
                surfaces.canvas.set_pixel_ratio(ratio);
            }
        }
        let staged = self.layers.clone();
        for layer in staged {
            self.invalidate(layer, STRUCTURE);
        }
    }
}
