// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors and recoverable warnings.
//!
//! Operations that cannot proceed return [`SceneError`]. Conditions the
//! scene recovers from on its own (clamped z-indices, rejected caches) are
//! reported as [`Warning`]s: logged through `tracing` and queued for
//! [`Scene::take_warnings`](crate::Scene::take_warnings).

use alloc::string::String;
use stratum_attr::AttrWriteError;
use thiserror::Error;

use crate::types::{NodeId, NodeKind};

/// Why an operation was refused.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum InvalidOperation {
    /// The node was destroyed, or the id never existed.
    #[error("node {0:?} has been destroyed")]
    Destroyed(NodeId),
    /// A node cannot be its own child.
    #[error("cannot add {0:?} to itself")]
    SelfInsert(NodeId),
    /// The node is an ancestor of the target container.
    #[error("adding {node:?} under {container:?} would create a cycle")]
    Cycle {
        /// The node being added.
        node: NodeId,
        /// The container it was being added to.
        container: NodeId,
    },
    /// The container does not accept children of this kind.
    #[error("a {container_kind:?} cannot hold a {child_kind:?}")]
    ChildKind {
        /// Kind of the would-be parent.
        container_kind: NodeKind,
        /// Kind of the would-be child.
        child_kind: NodeKind,
    },
    /// A layer was required.
    #[error("{0:?} is not a layer")]
    NotALayer(NodeId),
    /// Layers render to their own surface and cannot be bitmap-cached.
    #[error("layer {0:?} cannot be bitmap-cached")]
    LayerCache(NodeId),
    /// The reference node is not an ancestor of the node.
    #[error("{ancestor:?} is not an ancestor of {node:?}")]
    NotAnAncestor {
        /// The node being measured.
        node: NodeId,
        /// The supposed ancestor.
        ancestor: NodeId,
    },
    /// No attribute is registered under this name.
    #[error("unknown attribute `{0}`")]
    UnknownAttr(String),
    /// An untyped attribute write was rejected.
    #[error(transparent)]
    AttrWrite(#[from] AttrWriteError),
}

/// Error type for scene operations.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum SceneError {
    /// The operation is not valid for the current tree state.
    #[error("invalid operation: {0}")]
    InvalidOperation(#[from] InvalidOperation),
}

impl From<AttrWriteError> for SceneError {
    fn from(err: AttrWriteError) -> Self {
        Self::InvalidOperation(err.into())
    }
}

/// Why a bitmap cache request fell back to live rendering.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum CacheRejection {
    /// The subtree has no area to cache.
    #[error("the cached region is empty")]
    EmptyBounds,
    /// The bitmap would exceed the configured ceiling.
    #[error("a {width}x{height} bitmap exceeds the cache size limit")]
    TooLarge {
        /// Requested width in device pixels.
        width: u32,
        /// Requested height in device pixels.
        height: u32,
    },
}

/// A condition the scene recovered from.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum Warning {
    /// A z-index or insertion index was outside `0..len` and was clamped.
    #[error("index {requested} for {node:?} clamped to {clamped}")]
    ZIndexClamped {
        /// The node being placed.
        node: NodeId,
        /// The index asked for.
        requested: usize,
        /// The index used.
        clamped: usize,
    },
    /// A cache request was refused; the subtree renders live.
    #[error("cache for {node:?} refused, rendering live: {reason}")]
    CacheRejected {
        /// The node that asked for a cache.
        node: NodeId,
        /// Why it was refused.
        reason: CacheRejection,
    },
    /// An id was assigned to a second node; lookups now find the newer one.
    #[error("id `{id}` moved from {previous:?} to {node:?}")]
    DuplicateId {
        /// The id string.
        id: String,
        /// The node the id pointed to before.
        previous: NodeId,
        /// The node it points to now.
        node: NodeId,
    },
    /// Filters were set on a node without a bitmap cache and are ignored.
    #[error("filters on {node:?} are ignored without a bitmap cache")]
    FiltersWithoutCache {
        /// The node carrying the filters.
        node: NodeId,
    },
    /// Every color key is in use; the leaf is left off the pick surface.
    #[error("no color key left for {node:?}; it cannot be picked")]
    ColorKeysExhausted {
        /// The leaf that could not be keyed.
        node: NodeId,
    },
}
