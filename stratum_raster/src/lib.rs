// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Stratum Raster: CPU raster surfaces.
//!
//! This crate provides the drawing surface a Stratum scene renders into, as a
//! thin adapter over [`tiny_skia`]:
//!
//! - [`Pixmap`]: a premultiplied RGBA8 buffer.
//! - [`Canvas`]: a [`Surface`] over a pixmap with a logical size and a pixel
//!   ratio, plus path fill/stroke, rectangular and path clips, global alpha,
//!   [`CompositeOp`] and transformed image blits. Paths and transforms come in
//!   as [`kurbo`] types and colors as [`peniko`] colors.
//!
//! The [`Surface`] trait is the contract a scene needs from a backend:
//! clearing, drawing an image, a user transform (scoped via
//! [`SurfaceExt::with_transform`]) and a pixel ratio that changes only the
//! backing resolution.
//!
//! ## Exact colors
//!
//! With [`Antialias::None`], tiny-skia's aliased fills either cover a pixel or
//! leave it alone, and image blits use nearest-neighbour sampling. A fully opaque color drawn this
//! way lands on the target bit-exact, which is what color-keyed hit testing
//! needs.
//!
//! ```rust
//! use kurbo::Shape;
//! use peniko::Color;
//! use stratum_raster::{Antialias, Canvas, Surface};
//!
//! let key = Color::from_rgba8(0, 0, 7, 255);
//! let mut canvas = Canvas::new(8.0, 8.0, 1.0).with_antialias(Antialias::None);
//! canvas.fill_path(&kurbo::Circle::new((4.0, 4.0), 3.0).to_path(0.1), key);
//! assert_eq!(canvas.pixel_at((4.0, 4.0).into()), Some([0, 0, 7, 255]));
//!
//! canvas.clear();
//! assert!(canvas.pixmap().is_transparent());
//! ```
//!
//! ## `no_std` Support
//!
//! This crate is `no_std` and uses `alloc`; enable the `libm` feature when
//! building without `std`.

#![no_std]

extern crate alloc;

mod canvas;
mod pixmap;

pub use canvas::{Antialias, Canvas, CanvasState, Surface, SurfaceExt, device_size};
pub use pixmap::{CompositeOp, Pixmap};
