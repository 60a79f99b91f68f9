// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The leaf drawing contract.
//!
//! A leaf owns a [`Drawable`]. The scene calls it twice per frame in two
//! different modes: once onto a scene canvas with the leaf's own style, and
//! once onto a pick canvas where every fill and stroke is replaced by the
//! leaf's color key. Drawables describe geometry through [`ShapeContext`]
//! and never choose hit colors themselves.

use core::fmt;

use kurbo::{BezPath, Rect, Shape, Stroke};
use peniko::{Color, Fill};
use stratum_raster::Canvas;

use crate::attrs::Style;

/// Geometry owned by a leaf.
pub trait Drawable: 'static {
    /// Draws onto the scene canvas.
    fn draw(&self, ctx: &mut ShapeContext<'_>);

    /// Draws onto the pick canvas. Defaults to [`draw`](Self::draw), whose
    /// fills and strokes are recolored to the color key.
    fn draw_hit(&self, ctx: &mut ShapeContext<'_>) {
        self.draw(ctx);
    }

    /// Bounds of the geometry in the leaf's local space, excluding stroke.
    fn bounds(&self) -> Rect;
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum PaintMode {
    Scene,
    Hit(Color),
}

/// Drawing context handed to a [`Drawable`].
///
/// The canvas transform is already set to the leaf's matrix, so geometry is
/// given in local coordinates.
pub struct ShapeContext<'a> {
    canvas: &'a mut Canvas,
    style: Style,
    mode: PaintMode,
}

impl fmt::Debug for ShapeContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShapeContext")
            .field("style", &self.style)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl<'a> ShapeContext<'a> {
    pub(crate) fn new(canvas: &'a mut Canvas, style: Style, mode: PaintMode) -> Self {
        Self {
            canvas,
            style,
            mode,
        }
    }

    /// The leaf's resolved style.
    #[must_use]
    pub fn style(&self) -> &Style {
        &self.style
    }

    /// Returns `true` while drawing onto a pick canvas.
    #[must_use]
    pub fn is_hit_pass(&self) -> bool {
        matches!(self.mode, PaintMode::Hit(_))
    }

    fn paint(&self, color: Color) -> Color {
        match self.mode {
            PaintMode::Scene => color,
            PaintMode::Hit(key) => key,
        }
    }

    /// Fills `path` with the fill style, if any.
    pub fn fill(&mut self, path: &BezPath) {
        if let Some(color) = self.style.fill {
            self.canvas.fill_path(path, self.paint(color));
        }
    }

    /// Fills `path` with the fill style using an explicit fill rule.
    pub fn fill_with_rule(&mut self, path: &BezPath, rule: Fill) {
        if let Some(color) = self.style.fill {
            self.canvas
                .fill_path_with_rule(path, self.paint(color), rule);
        }
    }

    /// Strokes `path` with the stroke style, if any.
    pub fn stroke(&mut self, path: &BezPath) {
        if let Some(color) = self.style.stroke {
            let stroke = Stroke::new(self.style.stroke_width);
            self.canvas.stroke_path(path, &stroke, self.paint(color));
        }
    }

    /// Fills then strokes `path`.
    pub fn fill_stroke(&mut self, path: &BezPath) {
        self.fill(path);
        self.stroke(path);
    }

    /// Fills `path` with an explicit color, ignoring the fill style.
    ///
    /// On the pick canvas the color key is used instead.
    pub fn fill_color(&mut self, path: &BezPath, color: Color) {
        self.canvas.fill_path(path, self.paint(color));
    }
}

/// A leaf drawn from a fixed path with the node's fill and stroke.
#[derive(Clone, Debug)]
pub struct PathDrawable {
    path: BezPath,
    fill_rule: Fill,
}

impl PathDrawable {
    /// Wraps a path, filled with the nonzero rule.
    #[must_use]
    pub fn new(path: BezPath) -> Self {
        Self {
            path,
            fill_rule: Fill::NonZero,
        }
    }

    /// Wraps any kurbo shape.
    #[must_use]
    pub fn from_shape(shape: &impl Shape) -> Self {
        Self::new(shape.to_path(0.1))
    }

    /// Sets the fill rule.
    #[must_use]
    pub fn with_fill_rule(mut self, rule: Fill) -> Self {
        self.fill_rule = rule;
        self
    }

    /// The wrapped path.
    #[must_use]
    pub fn path(&self) -> &BezPath {
        &self.path
    }
}

impl Drawable for PathDrawable {
    fn draw(&self, ctx: &mut ShapeContext<'_>) {
        ctx.fill_with_rule(&self.path, self.fill_rule);
        ctx.stroke(&self.path);
    }

    fn bounds(&self) -> Rect {
        self.path.bounding_box()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Circle;

    const RED: Color = Color::from_rgba8(255, 0, 0, 255);
    const KEY: Color = Color::from_rgba8(0, 0, 7, 255);

    fn style(fill: Option<Color>) -> Style {
        Style {
            fill,
            stroke: None,
            stroke_width: 1.0,
        }
    }

    #[test]
    fn scene_pass_uses_style() {
        let mut canvas = Canvas::new(10.0, 10.0, 1.0);
        let shape = PathDrawable::from_shape(&Rect::new(0.0, 0.0, 10.0, 10.0));
        shape.draw(&mut ShapeContext::new(&mut canvas, style(Some(RED)), PaintMode::Scene));
        assert_eq!(canvas.pixel_at((5.0, 5.0).into()), Some([255, 0, 0, 255]));
    }

    #[test]
    fn hit_pass_replaces_color() {
        let mut canvas = Canvas::new(10.0, 10.0, 1.0);
        let shape = PathDrawable::from_shape(&Rect::new(0.0, 0.0, 10.0, 10.0));
        let mut ctx = ShapeContext::new(&mut canvas, style(Some(RED)), PaintMode::Hit(KEY));
        assert!(ctx.is_hit_pass());
        shape.draw_hit(&mut ctx);
        assert_eq!(canvas.pixel_at((5.0, 5.0).into()), Some([0, 0, 7, 255]));
    }

    #[test]
    fn unfilled_shapes_paint_nothing() {
        let mut canvas = Canvas::new(10.0, 10.0, 1.0);
        let shape = PathDrawable::from_shape(&Circle::new((5.0, 5.0), 4.0));
        shape.draw(&mut ShapeContext::new(&mut canvas, style(None), PaintMode::Hit(KEY)));
        assert!(canvas.pixmap().is_transparent());
    }

    #[test]
    fn bounds_come_from_the_path() {
        let shape = PathDrawable::from_shape(&Rect::new(1.0, 2.0, 3.0, 4.0));
        assert_eq!(shape.bounds(), Rect::new(1.0, 2.0, 3.0, 4.0));
    }
}
