// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Invalidation categories carried by attribute metadata.

bitflags::bitflags! {
    /// What a change to an attribute invalidates.
    ///
    /// The scene uses these bits to decide which caches to dirty when an
    /// attribute changes. Bits may be combined freely.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Invalidation: u16 {
        /// Local and absolute transforms of the node and its descendants.
        const TRANSFORM  = 0b0000_0000_0001;
        /// Pixels on the scene surface.
        const PAINT      = 0b0000_0000_0010;
        /// Pixels on the pick surface.
        const HIT        = 0b0000_0000_0100;
        /// Bounding rectangles of the node and its ancestors.
        const BOUNDS     = 0b0000_0000_1000;
        /// Effective listening of the node's subtree.
        const LISTENING  = 0b0000_0001_0000;
        /// Effective visibility of the node's subtree.
        const VISIBILITY = 0b0000_0010_0000;
        /// The node's filter chain.
        const FILTERS    = 0b0000_0100_0000;
        /// Name or id lookup indices.
        const INDEX      = 0b0000_1000_0000;
    }
}

impl Default for Invalidation {
    fn default() -> Self {
        Self::empty()
    }
}

impl Invalidation {
    /// Returns `true` if the change requires a scene redraw.
    #[must_use]
    pub const fn needs_redraw(self) -> bool {
        self.intersects(
            Self::TRANSFORM
                .union(Self::PAINT)
                .union(Self::BOUNDS)
                .union(Self::VISIBILITY)
                .union(Self::FILTERS),
        )
    }

    /// Returns `true` if the change makes the pick surface stale.
    #[must_use]
    pub const fn needs_pick_rebuild(self) -> bool {
        self.intersects(
            Self::TRANSFORM
                .union(Self::HIT)
                .union(Self::BOUNDS)
                .union(Self::LISTENING)
                .union(Self::VISIBILITY),
        )
    }
}
