// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Premultiplied RGBA8 pixel buffers and the composite operators applied to
//! them.

use stratum_attr::AttrValue;
use tiny_skia::BlendMode;

/// Porter-Duff compositing operators plus additive `Lighter`.
///
/// Operators are applied only where a primitive has coverage; pixels outside
/// a primitive are left alone, including for operators such as
/// [`SourceIn`](Self::SourceIn) that would clear them on a canvas that
/// composites the whole surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CompositeOp {
    /// Source over destination.
    #[default]
    SourceOver,
    /// Destination over source.
    DestinationOver,
    /// Source where the destination is opaque.
    SourceIn,
    /// Destination where the source is opaque.
    DestinationIn,
    /// Source where the destination is transparent.
    SourceOut,
    /// Destination where the source is transparent; erases.
    DestinationOut,
    /// Source on top of the destination, inside the destination.
    SourceAtop,
    /// Destination on top of the source, inside the source.
    DestinationAtop,
    /// Non-overlapping regions of both.
    Xor,
    /// Source replaces destination.
    Copy,
    /// Sum of source and destination.
    Lighter,
}

impl CompositeOp {
    pub(crate) fn blend_mode(self) -> BlendMode {
        match self {
            Self::SourceOver => BlendMode::SourceOver,
            Self::DestinationOver => BlendMode::DestinationOver,
            Self::SourceIn => BlendMode::SourceIn,
            Self::DestinationIn => BlendMode::DestinationIn,
            Self::SourceOut => BlendMode::SourceOut,
            Self::DestinationOut => BlendMode::DestinationOut,
            Self::SourceAtop => BlendMode::SourceAtop,
            Self::DestinationAtop => BlendMode::DestinationAtop,
            Self::Xor => BlendMode::Xor,
            Self::Copy => BlendMode::Source,
            Self::Lighter => BlendMode::Plus,
        }
    }
}

impl AttrValue for CompositeOp {
    fn same_value(&self, other: &Self) -> bool {
        self == other
    }
}

/// A premultiplied RGBA8 pixel buffer.
///
/// Rows are tightly packed, top to bottom. A pixmap has no notion of logical
/// size or density; [`Canvas`](crate::Canvas) carries those.
///
/// Storage is a [`tiny_skia::Pixmap`]. Sizes tiny-skia cannot allocate, a
/// zero width or height or a row too wide to address, give an empty pixmap:
/// it reports a 0x0 size and drawing into it does nothing.
///
/// # Example
///
/// ```rust
/// use stratum_raster::Pixmap;
///
/// let mut pixmap = Pixmap::new(4, 2);
/// assert!(pixmap.is_transparent());
/// pixmap.fill([10, 20, 30, 255]);
/// assert_eq!(pixmap.pixel(3, 1), Some([10, 20, 30, 255]));
/// assert_eq!(pixmap.pixel(4, 0), None);
///
/// assert!(Pixmap::new(u32::MAX, u32::MAX).is_empty());
/// ```
#[derive(Clone)]
pub struct Pixmap {
    inner: Option<tiny_skia::Pixmap>,
}

impl core::fmt::Debug for Pixmap {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Pixmap")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish_non_exhaustive()
    }
}

impl PartialEq for Pixmap {
    fn eq(&self, other: &Self) -> bool {
        self.width() == other.width()
            && self.height() == other.height()
            && self.data() == other.data()
    }
}

impl Eq for Pixmap {}

impl Pixmap {
    /// Allocates a transparent pixmap, or an empty one if the size cannot be
    /// allocated.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            inner: tiny_skia::Pixmap::new(width, height),
        }
    }

    /// Returns `true` if no pixels back this pixmap.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_none()
    }

    /// Width in pixels.
    #[must_use]
    #[inline]
    pub fn width(&self) -> u32 {
        self.inner.as_ref().map_or(0, tiny_skia::Pixmap::width)
    }

    /// Height in pixels.
    #[must_use]
    #[inline]
    pub fn height(&self) -> u32 {
        self.inner.as_ref().map_or(0, tiny_skia::Pixmap::height)
    }

    /// Raw premultiplied bytes.
    #[must_use]
    #[inline]
    pub fn data(&self) -> &[u8] {
        match &self.inner {
            Some(inner) => inner.data(),
            None => &[],
        }
    }

    /// Raw premultiplied bytes, mutable.
    #[must_use]
    #[inline]
    pub fn data_mut(&mut self) -> &mut [u8] {
        match &mut self.inner {
            Some(inner) => inner.data_mut(),
            None => &mut [],
        }
    }

    pub(crate) fn as_skia(&self) -> Option<tiny_skia::PixmapRef<'_>> {
        self.inner.as_ref().map(tiny_skia::Pixmap::as_ref)
    }

    pub(crate) fn as_skia_mut(&mut self) -> Option<&mut tiny_skia::Pixmap> {
        self.inner.as_mut()
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width() && y < self.height())
            .then(|| (y as usize * self.width() as usize + x as usize) * 4)
    }

    /// Reads one premultiplied pixel.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let px = self.inner.as_ref()?.pixel(x, y)?;
        Some([px.red(), px.green(), px.blue(), px.alpha()])
    }

    /// Overwrites one pixel with premultiplied bytes. Out-of-bounds writes are
    /// ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if let Some(i) = self.offset(x, y) {
            self.data_mut()[i..i + 4].copy_from_slice(&rgba);
        }
    }

    /// Clears to transparent.
    pub fn clear(&mut self) {
        self.data_mut().fill(0);
    }

    /// Fills every pixel with premultiplied bytes.
    pub fn fill(&mut self, rgba: [u8; 4]) {
        for px in self.data_mut().chunks_exact_mut(4) {
            px.copy_from_slice(&rgba);
        }
    }

    /// Returns `true` if every pixel is fully transparent.
    #[must_use]
    pub fn is_transparent(&self) -> bool {
        self.data().chunks_exact(4).all(|px| px[3] == 0)
    }

    /// Counts pixels whose alpha is non-zero.
    #[must_use]
    pub fn count_opaque(&self) -> usize {
        self.data().chunks_exact(4).filter(|px| px[3] != 0).count()
    }
}
