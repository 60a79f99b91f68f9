// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public identifier and classification types.

use stratum_attr::AttrValue;

/// Identifier for a node in a [`Scene`](crate::Scene).
///
/// A slot index plus a generation counter. Destroying a node frees its slot;
/// when the slot is reused the generation is bumped, so stale ids never alias
/// a newer node.
///
/// - On creation, a fresh slot starts at generation `1`.
/// - [`Scene::is_alive`](crate::Scene::is_alive) reports whether an id still
///   refers to a live node.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32, pub(crate) u32);

impl NodeId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }

    /// Slot index.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }

    /// Generation of the slot when this id was issued.
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.1
    }
}

/// The closed set of node kinds.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum NodeKind {
    /// Surface-backed container; lives in the scene's layer stack and owns a
    /// scene canvas and a pick canvas.
    Layer,
    /// Grouping container without a surface.
    Group,
    /// Drawable leaf.
    Leaf,
}

impl NodeKind {
    /// Returns `true` for kinds that own children.
    #[must_use]
    pub const fn is_container(self) -> bool {
        matches!(self, Self::Layer | Self::Group)
    }

    /// Returns `true` if a container of this kind accepts a child of `child`
    /// kind. Layers only live in the layer stack.
    #[must_use]
    pub const fn accepts(self, child: Self) -> bool {
        self.is_container() && !matches!(child, Self::Layer)
    }

    /// Name used in serialized records.
    #[must_use]
    pub const fn class_name(self) -> &'static str {
        match self {
            Self::Layer => "Layer",
            Self::Group => "Group",
            Self::Leaf => "Shape",
        }
    }
}

/// Which parts of a node's attributes contribute to its local transform.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum TransformsMode {
    /// Position, rotation, scale, skew and offset.
    #[default]
    All,
    /// Translation by position minus offset only.
    PositionOnly,
    /// The node contributes the identity.
    None,
}

impl AttrValue for TransformsMode {
    fn same_value(&self, other: &Self) -> bool {
        self == other
    }
}
