// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The [`Scene`] container, attribute writes and invalidation dispatch.

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use hashbrown::HashMap;
use smallvec::SmallVec;
use stratum_attr::{
    Attr, AttrChange, AttrId, AttrMetadata, AttrRegistry, AttrValue, AttrWriteError, ErasedValue,
    Invalidation,
};

use crate::attrs::{Filters, StandardAttrs};
use crate::config::SceneConfig;
use crate::error::{InvalidOperation, SceneError, Warning};
use crate::node::Node;
use crate::pick::ColorKeys;
use crate::schedule::Scheduler;
use crate::types::NodeId;

/// Handle for an attribute-change subscription.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ListenerId(u64);

type ChangeCallback = Box<dyn FnMut(NodeId, &AttrChange)>;

struct Listener {
    id: ListenerId,
    node: NodeId,
    attr: Option<AttrId>,
    callback: ChangeCallback,
}

/// A retained 2D scene.
///
/// The scene owns every node, the attribute registry, the layer stack and
/// the redraw scheduler. Nodes are addressed by [`NodeId`]; operations on a
/// destroyed node fail with [`InvalidOperation::Destroyed`].
///
/// # Example
///
/// ```rust
/// use kurbo::{Point, Rect};
/// use peniko::Color;
/// use stratum_scene::{LayerOptions, PathDrawable, Scene};
///
/// let mut scene = Scene::new();
/// let a = scene.attrs();
/// let layer = scene.create_layer(LayerOptions::new(100.0, 100.0));
/// scene.add_layer(layer).unwrap();
///
/// let square = scene.create_leaf(PathDrawable::from_shape(&Rect::new(0.0, 0.0, 20.0, 20.0)));
/// scene.set_attr(square, a.fill, Some(Color::from_rgba8(255, 0, 0, 255))).unwrap();
/// scene.set_attr(square, a.x, 40.0).unwrap();
/// scene.add_child(layer, square).unwrap();
///
/// assert_eq!(scene.pick_at(Point::new(50.0, 10.0)), Some(square));
/// assert_eq!(scene.pick_at(Point::new(10.0, 10.0)), None);
///
/// // The change scheduled one redraw of the layer.
/// assert_eq!(scene.on_animation_frame(), vec![layer]);
/// ```
pub struct Scene {
    pub(crate) nodes: Vec<Option<Node>>,
    pub(crate) generations: Vec<u32>,
    pub(crate) free_list: Vec<usize>,
    pub(crate) layers: Vec<NodeId>,
    pub(crate) registry: AttrRegistry,
    pub(crate) attrs: StandardAttrs,
    pub(crate) config: SceneConfig,
    pub(crate) names: HashMap<String, SmallVec<[NodeId; 2]>>,
    pub(crate) ids: HashMap<String, NodeId>,
    pub(crate) keys: ColorKeys,
    pub(crate) scheduler: Scheduler,
    pub(crate) transform_recomputations: u64,
    listeners: Vec<Listener>,
    next_listener: u64,
    warnings: VecDeque<Warning>,
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("nodes", &(self.nodes.len() - self.free_list.len()))
            .field("layers", &self.layers)
            .field("config", &self.config)
            .field("listeners", &self.listeners.len())
            .field("pending_warnings", &self.warnings.len())
            .finish_non_exhaustive()
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// How many undrained warnings [`take_warnings`](Self::take_warnings)
    /// can return.
    pub const MAX_QUEUED_WARNINGS: usize = 256;

    /// Creates an empty scene with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(SceneConfig::default())
    }

    /// Creates an empty scene.
    #[must_use]
    pub fn with_config(config: SceneConfig) -> Self {
        let mut registry = AttrRegistry::new();
        let attrs = StandardAttrs::register(&mut registry);
        Self {
            nodes: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            layers: Vec::new(),
            registry,
            attrs,
            config,
            names: HashMap::new(),
            ids: HashMap::new(),
            keys: ColorKeys::default(),
            scheduler: Scheduler::default(),
            transform_recomputations: 0,
            listeners: Vec::new(),
            next_listener: 0,
            warnings: VecDeque::new(),
        }
    }

    /// The scene configuration.
    #[must_use]
    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// Typed keys for the built-in attributes.
    #[must_use]
    pub fn attrs(&self) -> StandardAttrs {
        self.attrs
    }

    /// The attribute registry.
    #[must_use]
    pub fn registry(&self) -> &AttrRegistry {
        &self.registry
    }

    /// Registers an additional attribute.
    ///
    /// # Panics
    ///
    /// Panics if `name` is already registered.
    pub fn register_attr<T: AttrValue>(
        &mut self,
        name: &'static str,
        metadata: AttrMetadata<T>,
    ) -> Attr<T> {
        self.registry.register(name, metadata)
    }

    /// Drains the warnings recorded since the last call, oldest first.
    ///
    /// At most [`MAX_QUEUED_WARNINGS`](Self::MAX_QUEUED_WARNINGS) are kept
    /// between calls; older ones are dropped, though every warning is still
    /// logged through `tracing` when it happens.
    pub fn take_warnings(&mut self) -> Vec<Warning> {
        core::mem::take(&mut self.warnings).into()
    }

    pub(crate) fn warn(&mut self, warning: Warning) {
        tracing::warn!(%warning, "scene recovered from an invalid request");
        if self.warnings.len() == Self::MAX_QUEUED_WARNINGS {
            self.warnings.pop_front();
        }
        self.warnings.push_back(warning);
    }

    pub(crate) fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes
            .get(id.idx())?
            .as_ref()
            .filter(|n| n.generation == id.generation())
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes
            .get_mut(id.idx())?
            .as_mut()
            .filter(|n| n.generation == id.generation())
    }

    pub(crate) fn live(&self, id: NodeId) -> Result<&Node, SceneError> {
        self.get(id)
            .ok_or_else(|| InvalidOperation::Destroyed(id).into())
    }

    /// Returns `true` if `id` refers to a live node.
    #[must_use]
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Effective value of a built-in attribute on a live node.
    pub(crate) fn value_of<T: AttrValue + Copy>(&self, node: &Node, attr: Attr<T>) -> T {
        *node.attrs.get_or_default(attr, &self.registry)
    }

    /// Writes an attribute.
    ///
    /// Returns `Ok(true)` if the effective value changed. Writing the
    /// current value (after coercion) is a no-op: no listener runs and
    /// nothing is invalidated.
    pub fn set_attr<T: AttrValue>(
        &mut self,
        node: NodeId,
        attr: Attr<T>,
        value: T,
    ) -> Result<bool, SceneError> {
        if self.registry.metadata(attr).is_none() {
            return Err(AttrWriteError::Unknown(attr.id()).into());
        }
        let Self {
            nodes, registry, ..
        } = self;
        let entry = nodes
            .get_mut(node.idx())
            .and_then(Option::as_mut)
            .filter(|n| n.generation == node.generation())
            .ok_or(InvalidOperation::Destroyed(node))?;
        let change = entry.attrs.set(attr, value, registry);
        Ok(self.commit(node, change))
    }

    /// Writes an attribute known only at runtime.
    pub fn set_attr_erased(
        &mut self,
        node: NodeId,
        attr: AttrId,
        value: ErasedValue,
    ) -> Result<bool, SceneError> {
        let Self {
            nodes, registry, ..
        } = self;
        let entry = nodes
            .get_mut(node.idx())
            .and_then(Option::as_mut)
            .filter(|n| n.generation == node.generation())
            .ok_or(InvalidOperation::Destroyed(node))?;
        let change = entry.attrs.set_erased(attr, value, registry)?;
        Ok(self.commit(node, change))
    }

    /// Writes an attribute by its registered name.
    pub fn set_attr_by_name(
        &mut self,
        node: NodeId,
        name: &str,
        value: ErasedValue,
    ) -> Result<bool, SceneError> {
        let attr = self
            .registry
            .by_name(name)
            .ok_or_else(|| InvalidOperation::UnknownAttr(name.into()))?;
        self.set_attr_erased(node, attr, value)
    }

    /// Removes an explicit value, reverting to the registered default.
    pub fn clear_attr(&mut self, node: NodeId, attr: AttrId) -> Result<bool, SceneError> {
        let Self {
            nodes, registry, ..
        } = self;
        let entry = nodes
            .get_mut(node.idx())
            .and_then(Option::as_mut)
            .filter(|n| n.generation == node.generation())
            .ok_or(InvalidOperation::Destroyed(node))?;
        let change = entry.attrs.clear(attr, registry);
        Ok(self.commit(node, change))
    }

    /// Reads the effective value of an attribute.
    pub fn get_attr<T: AttrValue>(&self, node: NodeId, attr: Attr<T>) -> Result<T, SceneError> {
        let metadata = self
            .registry
            .metadata(attr)
            .ok_or(AttrWriteError::Unknown(attr.id()))?;
        let node = self.live(node)?;
        Ok(node
            .attrs
            .get(attr)
            .unwrap_or(metadata.default_value())
            .clone())
    }

    /// Reads the effective value of an attribute known only at runtime.
    pub fn get_attr_erased(&self, node: NodeId, attr: AttrId) -> Result<ErasedValue, SceneError> {
        let registration = self
            .registry
            .get(attr)
            .ok_or(AttrWriteError::Unknown(attr))?;
        let node = self.live(node)?;
        Ok(node
            .attrs
            .get_erased(attr)
            .cloned()
            .unwrap_or_else(|| registration.default_erased()))
    }

    /// Subscribes to attribute changes on `node`, optionally filtered to a
    /// single attribute.
    ///
    /// The callback runs after the scene has applied the change's
    /// invalidation, once per effective change.
    pub fn on_attr_change(
        &mut self,
        node: NodeId,
        attr: Option<AttrId>,
        callback: impl FnMut(NodeId, &AttrChange) + 'static,
    ) -> Result<ListenerId, SceneError> {
        self.live(node)?;
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push(Listener {
            id,
            node,
            attr,
            callback: Box::new(callback),
        });
        Ok(id)
    }

    /// Removes a subscription. Returns `false` if it was already gone.
    pub fn off_attr_change(&mut self, listener: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| l.id != listener);
        self.listeners.len() != before
    }

    pub(crate) fn drop_listeners(&mut self, node: NodeId) {
        self.listeners.retain(|l| l.node != node);
    }

    fn commit(&mut self, node: NodeId, change: Option<AttrChange>) -> bool {
        let Some(change) = change else {
            return false;
        };
        let affects = self.registry.affects(change.attr);
        if affects.contains(Invalidation::TRANSFORM) {
            self.mark_transform_dirty(node, true);
        }
        if affects.contains(Invalidation::INDEX) {
            self.reindex(node, &change);
        }
        if change.attr == self.attrs.filters.id() {
            let has_filters = change.new_as::<Filters>().is_some_and(|f| !f.is_empty());
            let cached = self.get(node).is_some_and(|n| n.cache.is_some());
            if has_filters && !cached {
                self.warn(Warning::FiltersWithoutCache { node });
            }
        }
        self.invalidate(node, affects);
        for listener in &mut self.listeners {
            if listener.node == node && listener.attr.is_none_or(|a| a == change.attr) {
                (listener.callback)(node, &change);
            }
        }
        true
    }

    /// Routes an invalidation to the caches above `node` and to its layer.
    ///
    /// Every cached node from `node` up to its layer goes stale, since each
    /// cache bitmap embeds the pixels of the caches below it. A change that
    /// only touches filters leaves the node's own bitmap intact and just
    /// re-runs its filters.
    pub(crate) fn invalidate(&mut self, node: NodeId, affects: Invalidation) {
        let redraw = affects.needs_redraw();
        let pick = affects.needs_pick_rebuild();
        if !redraw && !pick {
            return;
        }
        let filters_only = affects == Invalidation::FILTERS;
        let mut layer = None;
        let mut cur = Some(node);
        while let Some(n) = cur {
            let Some(entry) = self.get_mut(n) else { break };
            if let Some(cache) = entry.cache.as_mut() {
                if filters_only && n == node {
                    cache.filters_stale = true;
                } else {
                    cache.stale = true;
                }
            }
            if entry.surfaces.is_some() {
                layer = Some(n);
            }
            cur = entry.parent;
        }
        let Some(layer) = layer else { return };
        if pick && let Some(surfaces) = self.get_mut(layer).and_then(|n| n.surfaces.as_mut()) {
            surfaces.pick_stale = true;
        }
        if redraw && self.config.auto_draw {
            self.schedule(layer);
        }
    }
}
