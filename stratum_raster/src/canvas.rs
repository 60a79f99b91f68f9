// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The surface contract and its tiny-skia implementation.

use alloc::vec::Vec;
#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::{Affine, BezPath, Cap, Join, PathEl, Point, Rect, Shape, Stroke};
use peniko::{Color, Fill};
use tiny_skia::{
    FillRule, FilterQuality, LineCap, LineJoin, Mask, Paint, PathBuilder, Pattern, SpreadMode,
    StrokeDash, Transform,
};

use crate::pixmap::{CompositeOp, Pixmap};

/// Tolerance used when converting rectangles to paths.
const TOLERANCE: f64 = 0.1;

/// Edge antialiasing for fills, strokes, clips and image edges.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Antialias {
    /// Each pixel is either covered or not. An opaque color lands on the
    /// target bit-exact.
    None,
    /// Analytic edge coverage.
    #[default]
    Analytic,
}

impl Antialias {
    fn enabled(self) -> bool {
        matches!(self, Self::Analytic)
    }
}

/// A raster drawing surface.
///
/// Coordinates are logical; the pixel ratio maps them to device pixels and
/// only affects how many pixels back the surface.
pub trait Surface {
    /// Clears every pixel to transparent.
    fn clear(&mut self);

    /// Draws `image` with its top-left corner at `(x, y)` in the current
    /// user space, one image pixel per logical unit.
    fn draw_image(&mut self, image: &Pixmap, x: f64, y: f64);

    /// Returns the current user transform.
    fn transform(&self) -> Affine;

    /// Replaces the current user transform.
    fn set_transform(&mut self, transform: Affine);

    /// Returns the device pixels per logical unit.
    fn pixel_ratio(&self) -> f64;

    /// Changes the device pixels per logical unit, reallocating the backing
    /// store. Logical coordinates are unaffected.
    fn set_pixel_ratio(&mut self, ratio: f64);
}

/// Scoped helpers for [`Surface`].
pub trait SurfaceExt: Surface {
    /// Runs `f` with `matrix` appended to the user transform, restoring the
    /// previous transform afterwards.
    ///
    /// Note: if `f` panics, the transform is not restored.
    #[inline]
    fn with_transform<R>(&mut self, matrix: Affine, f: impl FnOnce(&mut Self) -> R) -> R {
        let saved = self.transform();
        self.set_transform(saved * matrix);
        let out = f(self);
        self.set_transform(saved);
        out
    }
}

impl<S: Surface + ?Sized> SurfaceExt for S {}

/// Saved drawing state, see [`Canvas::save`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CanvasState {
    transform: Affine,
    alpha: f64,
    composite: CompositeOp,
    clip_depth: usize,
}

/// A [`Surface`] that draws into a [`Pixmap`] through tiny-skia.
///
/// # Example
///
/// ```rust
/// use kurbo::{Affine, Rect, Shape};
/// use peniko::Color;
/// use stratum_raster::{Antialias, Canvas, Surface, SurfaceExt};
///
/// let mut canvas = Canvas::new(10.0, 10.0, 2.0).with_antialias(Antialias::None);
/// assert_eq!(canvas.pixmap().width(), 20);
///
/// canvas.with_transform(Affine::translate((5.0, 5.0)), |c| {
///     c.fill_path(&Rect::new(0.0, 0.0, 1.0, 1.0).to_path(0.1), Color::from_rgba8(255, 0, 0, 255));
/// });
/// assert_eq!(canvas.pixel_at((5.5, 5.5).into()), Some([255, 0, 0, 255]));
/// assert_eq!(canvas.pixel_at((4.5, 4.5).into()), Some([0, 0, 0, 0]));
/// ```
#[derive(Clone)]
pub struct Canvas {
    width: f64,
    height: f64,
    pixel_ratio: f64,
    pixmap: Pixmap,
    transform: Affine,
    alpha: f64,
    composite: CompositeOp,
    antialias: Antialias,
    clips: Vec<Mask>,
}

impl core::fmt::Debug for Canvas {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Canvas")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("pixel_ratio", &self.pixel_ratio)
            .field("pixmap", &self.pixmap)
            .field("transform", &self.transform)
            .field("alpha", &self.alpha)
            .field("composite", &self.composite)
            .field("antialias", &self.antialias)
            .field("clip_depth", &self.clips.len())
            .finish()
    }
}

/// Device size for a logical extent at a pixel ratio.
#[must_use]
#[expect(clippy::cast_possible_truncation, reason = "clamped to u32")]
pub fn device_size(logical: f64, pixel_ratio: f64) -> u32 {
    let v = (logical * pixel_ratio).ceil();
    if v.is_nan() || v <= 0.0 {
        0
    } else {
        v.min(f64::from(u32::MAX)) as u32
    }
}

impl Canvas {
    /// Creates a transparent canvas of `width` by `height` logical units.
    #[must_use]
    pub fn new(width: f64, height: f64, pixel_ratio: f64) -> Self {
        let pixel_ratio = sanitize_ratio(pixel_ratio);
        Self {
            width,
            height,
            pixel_ratio,
            pixmap: Pixmap::new(device_size(width, pixel_ratio), device_size(height, pixel_ratio)),
            transform: Affine::IDENTITY,
            alpha: 1.0,
            composite: CompositeOp::SourceOver,
            antialias: Antialias::default(),
            clips: Vec::new(),
        }
    }

    /// Sets the antialiasing mode.
    #[must_use]
    pub fn with_antialias(mut self, antialias: Antialias) -> Self {
        self.antialias = antialias;
        self
    }

    /// Logical width.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Logical height.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.height
    }

    /// Changes the logical size, reallocating and clearing the backing store.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
        self.reallocate();
    }

    fn reallocate(&mut self) {
        self.pixmap = Pixmap::new(
            device_size(self.width, self.pixel_ratio),
            device_size(self.height, self.pixel_ratio),
        );
        self.clips.clear();
    }

    /// The backing pixels.
    #[must_use]
    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Consumes the canvas, returning its pixels.
    #[must_use]
    pub fn into_pixmap(self) -> Pixmap {
        self.pixmap
    }

    /// Current antialiasing mode.
    #[must_use]
    pub fn antialias(&self) -> Antialias {
        self.antialias
    }

    /// Current global alpha.
    #[must_use]
    pub fn global_alpha(&self) -> f64 {
        self.alpha
    }

    /// Sets the global alpha applied to every subsequent primitive.
    pub fn set_global_alpha(&mut self, alpha: f64) {
        self.alpha = alpha.clamp(0.0, 1.0);
    }

    /// Current composite operator.
    #[must_use]
    pub fn composite_op(&self) -> CompositeOp {
        self.composite
    }

    /// Sets the composite operator for subsequent primitives.
    pub fn set_composite_op(&mut self, op: CompositeOp) {
        self.composite = op;
    }

    /// Snapshots transform, alpha, composite operator and clip depth.
    #[must_use]
    pub fn save(&self) -> CanvasState {
        CanvasState {
            transform: self.transform,
            alpha: self.alpha,
            composite: self.composite,
            clip_depth: self.clips.len(),
        }
    }

    /// Restores a snapshot taken with [`save`](Self::save).
    pub fn restore(&mut self, state: CanvasState) {
        self.transform = state.transform;
        self.alpha = state.alpha;
        self.composite = state.composite;
        self.clips.truncate(state.clip_depth);
    }

    /// Maps user space to device pixels.
    #[must_use]
    pub fn device_transform(&self) -> Affine {
        Affine::scale(self.pixel_ratio) * self.transform
    }

    /// Intersects the clip with a user-space path until the next
    /// [`restore`](Self::restore).
    ///
    /// An empty path clips everything away.
    pub fn clip_path(&mut self, path: &BezPath) {
        let mask = match self.clips.last() {
            Some(top) => Some(top.clone()),
            None => Mask::new(self.pixmap.width(), self.pixmap.height()),
        };
        let Some(mut mask) = mask else {
            return;
        };
        let transform = skia_transform(self.device_transform());
        let anti_alias = self.antialias.enabled();
        match skia_path(path) {
            Some(path) if self.clips.is_empty() => {
                mask.fill_path(&path, FillRule::Winding, anti_alias, transform);
            }
            Some(path) => mask.intersect_path(&path, FillRule::Winding, anti_alias, transform),
            None => mask.data_mut().fill(0),
        }
        self.clips.push(mask);
    }

    /// Intersects the clip with a user-space rectangle.
    pub fn clip_rect(&mut self, rect: Rect) {
        self.clip_path(&rect.to_path(TOLERANCE));
    }

    /// Fills a user-space path with the nonzero rule.
    pub fn fill_path(&mut self, path: &BezPath, color: Color) {
        self.fill_path_with_rule(path, color, Fill::NonZero);
    }

    /// Fills a user-space path with an explicit fill rule.
    pub fn fill_path_with_rule(&mut self, path: &BezPath, color: Color, fill: Fill) {
        let Some(paint) = self.solid_paint(color) else {
            return;
        };
        let Some(path) = skia_path(path) else {
            return;
        };
        let rule = match fill {
            Fill::NonZero => FillRule::Winding,
            Fill::EvenOdd => FillRule::EvenOdd,
        };
        let transform = skia_transform(self.device_transform());
        if let Some(target) = self.pixmap.as_skia_mut() {
            target.fill_path(&path, &paint, rule, transform, self.clips.last());
        }
    }

    /// Fills a user-space rectangle.
    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.fill_path(&rect.to_path(TOLERANCE), color);
    }

    /// Strokes a user-space path.
    ///
    /// The stroke is built in user space, so non-uniform transforms distort
    /// it the way they distort the geometry.
    pub fn stroke_path(&mut self, path: &BezPath, stroke: &Stroke, color: Color) {
        if stroke.width <= 0.0 {
            return;
        }
        let Some(paint) = self.solid_paint(color) else {
            return;
        };
        let Some(path) = skia_path(path) else {
            return;
        };
        let stroke = skia_stroke(stroke);
        let transform = skia_transform(self.device_transform());
        if let Some(target) = self.pixmap.as_skia_mut() {
            target.stroke_path(&path, &paint, &stroke, transform, self.clips.last());
        }
    }

    /// Paint for a solid color under the current alpha, operator and
    /// antialiasing. `None` when global alpha makes it invisible.
    fn solid_paint(&self, color: Color) -> Option<Paint<'static>> {
        let alpha = self.alpha_f32()?;
        let rgba = color.to_rgba8();
        let mut color = tiny_skia::Color::from_rgba8(rgba.r, rgba.g, rgba.b, rgba.a);
        color.apply_opacity(alpha);
        let mut paint = Paint::default();
        paint.set_color(color);
        paint.blend_mode = self.composite.blend_mode();
        paint.anti_alias = self.antialias.enabled();
        Some(paint)
    }

    #[expect(clippy::cast_possible_truncation, reason = "alpha is in 0..=1")]
    fn alpha_f32(&self) -> Option<f32> {
        (self.alpha > 0.0).then_some(self.alpha as f32)
    }

    /// Draws `image` mapped into user space by `image_to_user`.
    ///
    /// Sampling is nearest-neighbour, so exact colors survive any transform
    /// when antialiasing is off.
    pub fn draw_image_transformed(&mut self, image: &Pixmap, image_to_user: Affine) {
        let to_device = self.device_transform() * image_to_user;
        if to_device.determinant().abs() < 1e-12 {
            return;
        }
        let Some(opacity) = self.alpha_f32() else {
            return;
        };
        let Some(source) = image.as_skia() else {
            return;
        };
        let Some(bounds) =
            tiny_skia::Rect::from_xywh(0.0, 0.0, image.width() as f32, image.height() as f32)
        else {
            return;
        };
        let paint = Paint {
            shader: Pattern::new(
                source,
                SpreadMode::Pad,
                FilterQuality::Nearest,
                opacity,
                Transform::identity(),
            ),
            blend_mode: self.composite.blend_mode(),
            anti_alias: self.antialias.enabled(),
            ..Paint::default()
        };
        let transform = skia_transform(to_device);
        if let Some(target) = self.pixmap.as_skia_mut() {
            target.fill_rect(bounds, &paint, transform, self.clips.last());
        }
    }

    /// Reads the device pixel under a logical point, ignoring the user
    /// transform.
    #[must_use]
    pub fn pixel_at(&self, point: Point) -> Option<[u8; 4]> {
        let x = (point.x * self.pixel_ratio).floor();
        let y = (point.y * self.pixel_ratio).floor();
        if x < 0.0 || y < 0.0 || !x.is_finite() || !y.is_finite() {
            return None;
        }
        #[expect(clippy::cast_possible_truncation, reason = "pixmap bounds check follows")]
        let (x, y) = (x as u32, y as u32);
        self.pixmap.pixel(x, y)
    }
}

impl Surface for Canvas {
    fn clear(&mut self) {
        self.pixmap.clear();
    }

    fn draw_image(&mut self, image: &Pixmap, x: f64, y: f64) {
        self.draw_image_transformed(image, Affine::translate((x, y)));
    }

    fn transform(&self) -> Affine {
        self.transform
    }

    fn set_transform(&mut self, transform: Affine) {
        self.transform = transform;
    }

    fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    fn set_pixel_ratio(&mut self, ratio: f64) {
        let ratio = sanitize_ratio(ratio);
        if ratio != self.pixel_ratio {
            self.pixel_ratio = ratio;
            self.reallocate();
        }
    }
}

fn sanitize_ratio(ratio: f64) -> f64 {
    if ratio.is_finite() && ratio > 0.0 {
        ratio
    } else {
        1.0
    }
}

#[expect(clippy::cast_possible_truncation, reason = "tiny-skia works in f32")]
fn skia_transform(affine: Affine) -> Transform {
    let [a, b, c, d, e, f] = affine.as_coeffs();
    Transform::from_row(a as f32, b as f32, c as f32, d as f32, e as f32, f as f32)
}

/// Converts a kurbo path. `None` for paths tiny-skia treats as empty.
#[expect(clippy::cast_possible_truncation, reason = "tiny-skia works in f32")]
fn skia_path(path: &BezPath) -> Option<tiny_skia::Path> {
    let mut builder = PathBuilder::new();
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => builder.move_to(p.x as f32, p.y as f32),
            PathEl::LineTo(p) => builder.line_to(p.x as f32, p.y as f32),
            PathEl::QuadTo(p1, p2) => {
                builder.quad_to(p1.x as f32, p1.y as f32, p2.x as f32, p2.y as f32);
            }
            PathEl::CurveTo(p1, p2, p3) => builder.cubic_to(
                p1.x as f32,
                p1.y as f32,
                p2.x as f32,
                p2.y as f32,
                p3.x as f32,
                p3.y as f32,
            ),
            PathEl::ClosePath => builder.close(),
        }
    }
    builder.finish()
}

#[expect(clippy::cast_possible_truncation, reason = "tiny-skia works in f32")]
fn skia_stroke(stroke: &Stroke) -> tiny_skia::Stroke {
    let dash = if stroke.dash_pattern.is_empty() {
        None
    } else {
        StrokeDash::new(
            stroke.dash_pattern.iter().map(|d| *d as f32).collect(),
            stroke.dash_offset as f32,
        )
    };
    tiny_skia::Stroke {
        width: stroke.width as f32,
        miter_limit: stroke.miter_limit as f32,
        line_cap: match stroke.start_cap {
            Cap::Butt => LineCap::Butt,
            Cap::Square => LineCap::Square,
            Cap::Round => LineCap::Round,
        },
        line_join: match stroke.join {
            Join::Bevel => LineJoin::Bevel,
            Join::Miter => LineJoin::Miter,
            Join::Round => LineJoin::Round,
        },
        dash,
    }
}
