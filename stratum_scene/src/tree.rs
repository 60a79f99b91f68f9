// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree structure: creation, attachment, z-order, teardown and queries.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::cmp::Ordering;

use kurbo::Rect;
use stratum_attr::{Attr, AttrChange, Invalidation};

use crate::config::LayerOptions;
use crate::draw::Drawable;
use crate::error::{InvalidOperation, SceneError, Warning};
use crate::node::{LayerSurfaces, Node};
use crate::schedule::RedrawState;
use crate::scene::Scene;
use crate::types::{NodeId, NodeKind};

/// Invalidation raised by attaching, detaching or reordering nodes.
pub(crate) const STRUCTURE: Invalidation = Invalidation::PAINT
    .union(Invalidation::HIT)
    .union(Invalidation::BOUNDS);

fn shift(siblings: &mut [NodeId], from: usize, to: usize) {
    match from.cmp(&to) {
        Ordering::Less => siblings[from..=to].rotate_left(1),
        Ordering::Greater => siblings[to..=from].rotate_right(1),
        Ordering::Equal => {}
    }
}

impl Scene {
    #[expect(clippy::cast_possible_truncation, reason = "slot count stays below u32::MAX")]
    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].wrapping_add(1).max(1);
            self.generations[idx] = generation;
            self.nodes[idx] = Some(Node::new(generation, kind));
            NodeId::new(idx as u32, generation)
        } else {
            let idx = self.nodes.len();
            self.nodes.push(Some(Node::new(1, kind)));
            self.generations.push(1);
            NodeId::new(idx as u32, 1)
        }
    }

    /// Creates a detached layer with its own scene and pick canvases.
    ///
    /// Call [`add_layer`](Self::add_layer) to put it on the stage.
    pub fn create_layer(&mut self, options: LayerOptions) -> NodeId {
        let id = self.alloc(NodeKind::Layer);
        let surfaces = LayerSurfaces::new(
            options,
            self.config.pixel_ratio,
            self.config.hit_pixel_ratio,
            self.config.antialias,
        );
        if let Some(node) = self.get_mut(id) {
            node.surfaces = Some(Box::new(surfaces));
        }
        id
    }

    /// Creates a detached group.
    pub fn create_group(&mut self) -> NodeId {
        self.alloc(NodeKind::Group)
    }

    /// Creates a detached leaf drawing `drawable`.
    pub fn create_leaf(&mut self, drawable: impl Drawable) -> NodeId {
        let id = self.alloc(NodeKind::Leaf);
        if let Some(node) = self.get_mut(id) {
            node.drawable = Some(Box::new(drawable));
        }
        id
    }

    /// Replaces a leaf's drawable.
    pub fn set_drawable(&mut self, leaf: NodeId, drawable: impl Drawable) -> Result<(), SceneError> {
        let node = self.live(leaf)?;
        if node.kind != NodeKind::Leaf {
            return Err(InvalidOperation::ChildKind {
                container_kind: node.kind,
                child_kind: NodeKind::Leaf,
            }
            .into());
        }
        if let Some(node) = self.get_mut(leaf) {
            node.drawable = Some(Box::new(drawable));
        }
        self.invalidate(leaf, STRUCTURE);
        Ok(())
    }

    /// Puts a layer on top of the stage, moving it there if it is already
    /// on stage.
    pub fn add_layer(&mut self, layer: NodeId) -> Result<(), SceneError> {
        if self.live(layer)?.kind != NodeKind::Layer {
            return Err(InvalidOperation::NotALayer(layer).into());
        }
        self.layers.retain(|&l| l != layer);
        self.layers.push(layer);
        self.invalidate(layer, STRUCTURE);
        Ok(())
    }

    /// Layers on stage, bottom to top.
    #[must_use]
    pub fn layers(&self) -> &[NodeId] {
        &self.layers
    }

    /// Appends `node` to `container`'s children, detaching it from any
    /// previous parent first.
    pub fn add_child(&mut self, container: NodeId, node: NodeId) -> Result<(), SceneError> {
        self.attach(container, node, None).map(|_| ())
    }

    /// Inserts `node` among `container`'s children at `index`.
    ///
    /// An index past the end is clamped with a [`Warning::ZIndexClamped`].
    /// Returns the index used.
    pub fn insert_child(
        &mut self,
        container: NodeId,
        node: NodeId,
        index: usize,
    ) -> Result<usize, SceneError> {
        self.attach(container, node, Some(index))
    }

    fn attach(
        &mut self,
        container: NodeId,
        node: NodeId,
        index: Option<usize>,
    ) -> Result<usize, SceneError> {
        let container_kind = self.live(container)?.kind;
        let child_kind = self.live(node)?.kind;
        if node == container {
            return Err(InvalidOperation::SelfInsert(node).into());
        }
        if !container_kind.accepts(child_kind) {
            return Err(InvalidOperation::ChildKind {
                container_kind,
                child_kind,
            }
            .into());
        }
        if self.is_ancestor_of(node, container) {
            return Err(InvalidOperation::Cycle { node, container }.into());
        }
        self.detach(node);
        let len = self.get(container).map_or(0, |c| c.children.len());
        let pos = match index {
            None => len,
            Some(i) if i <= len => i,
            Some(i) => {
                self.warn(Warning::ZIndexClamped {
                    node,
                    requested: i,
                    clamped: len,
                });
                len
            }
        };
        if let Some(c) = self.get_mut(container) {
            c.children.insert(pos, node);
        }
        if let Some(n) = self.get_mut(node) {
            n.parent = Some(container);
        }
        self.mark_transform_dirty(node, false);
        self.invalidate(container, STRUCTURE);
        Ok(pos)
    }

    fn detach(&mut self, node: NodeId) {
        let Some(parent) = self.get(node).map(|n| n.parent) else {
            return;
        };
        match parent {
            Some(parent) => {
                self.invalidate(parent, STRUCTURE);
                if let Some(p) = self.get_mut(parent) {
                    p.children.retain(|c| *c != node);
                }
                if let Some(n) = self.get_mut(node) {
                    n.parent = None;
                }
                self.mark_transform_dirty(node, false);
            }
            None => {
                self.layers.retain(|&l| l != node);
                if let Some(surfaces) = self.get_mut(node).and_then(|n| n.surfaces.as_mut()) {
                    surfaces.state = RedrawState::Idle;
                }
            }
        }
    }

    /// Detaches a node from its parent, or a layer from the stage.
    ///
    /// A node without a parent, or a destroyed node, is left alone.
    pub fn remove(&mut self, node: NodeId) {
        self.detach(node);
    }

    /// Detaches `node` if it is a child of `container`. Returns whether it
    /// was.
    pub fn remove_child(&mut self, container: NodeId, node: NodeId) -> Result<bool, SceneError> {
        self.live(container)?;
        if self.get(node).and_then(|n| n.parent) != Some(container) {
            return Ok(false);
        }
        self.detach(node);
        Ok(true)
    }

    /// Destroys a node and its subtree.
    ///
    /// Returns `false` if the node was already destroyed.
    pub fn destroy(&mut self, node: NodeId) -> bool {
        if !self.is_alive(node) {
            return false;
        }
        self.detach(node);
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            let Some(entry) = self.nodes.get_mut(id.idx()).and_then(Option::take) else {
                continue;
            };
            stack.extend(entry.children.iter().copied());
            if let Some(key) = entry.color_key {
                self.keys.retire(key);
            }
            let name = entry.attrs.get(self.attrs.name).cloned().unwrap_or_default();
            self.unindex_names(id, &name);
            if let Some(key) = entry.attrs.get(self.attrs.id)
                && self.ids.get(key) == Some(&id)
            {
                self.ids.remove(key);
            }
            self.drop_listeners(id);
            self.free_list.push(id.idx());
        }
        true
    }

    /// Destroys every child of `container`.
    pub fn destroy_children(&mut self, container: NodeId) -> Result<(), SceneError> {
        let children = self.live(container)?.children.clone();
        for child in children {
            self.destroy(child);
        }
        Ok(())
    }

    fn siblings(&self, node: NodeId) -> Option<&[NodeId]> {
        match self.get(node)?.parent {
            Some(parent) => self.get(parent).map(|p| p.children.as_slice()),
            None if self.layers.contains(&node) => Some(self.layers.as_slice()),
            None => None,
        }
    }

    fn siblings_mut(&mut self, node: NodeId) -> Option<&mut [NodeId]> {
        match self.get(node)?.parent {
            Some(parent) => self.get_mut(parent).map(|p| p.children.as_mut_slice()),
            None if self.layers.contains(&node) => Some(self.layers.as_mut_slice()),
            None => None,
        }
    }

    fn reorder(
        &mut self,
        node: NodeId,
        target: impl FnOnce(usize, usize) -> usize,
    ) -> Result<bool, SceneError> {
        let parent = self.live(node)?.parent;
        let Some(siblings) = self.siblings_mut(node) else {
            return Ok(false);
        };
        let Some(from) = siblings.iter().position(|&n| n == node) else {
            return Ok(false);
        };
        let to = target(from, siblings.len());
        if to == from {
            return Ok(false);
        }
        shift(siblings, from, to);
        if let Some(parent) = parent {
            self.invalidate(parent, STRUCTURE);
        }
        Ok(true)
    }

    /// Moves a node above all of its siblings. Returns whether it moved.
    pub fn move_to_top(&mut self, node: NodeId) -> Result<bool, SceneError> {
        self.reorder(node, |_, len| len - 1)
    }

    /// Moves a node below all of its siblings.
    pub fn move_to_bottom(&mut self, node: NodeId) -> Result<bool, SceneError> {
        self.reorder(node, |_, _| 0)
    }

    /// Swaps a node with the sibling above it.
    pub fn move_up(&mut self, node: NodeId) -> Result<bool, SceneError> {
        self.reorder(node, |i, len| (i + 1).min(len - 1))
    }

    /// Swaps a node with the sibling below it.
    pub fn move_down(&mut self, node: NodeId) -> Result<bool, SceneError> {
        self.reorder(node, |i, _| i.saturating_sub(1))
    }

    /// Moves a node to `index` among its siblings.
    ///
    /// An index past the last sibling is clamped with a
    /// [`Warning::ZIndexClamped`]. Returns the index used.
    pub fn set_z_index(&mut self, node: NodeId, index: usize) -> Result<usize, SceneError> {
        self.live(node)?;
        let len = self.siblings(node).map_or(0, <[NodeId]>::len);
        if len == 0 {
            return Ok(0);
        }
        let clamped = index.min(len - 1);
        if clamped != index {
            self.warn(Warning::ZIndexClamped {
                node,
                requested: index,
                clamped,
            });
        }
        self.reorder(node, |_, _| clamped)?;
        Ok(clamped)
    }

    /// Position among siblings, or on stage for a layer. Detached roots
    /// report `0`.
    pub fn z_index(&self, node: NodeId) -> Result<usize, SceneError> {
        self.live(node)?;
        Ok(self
            .siblings(node)
            .and_then(|s| s.iter().position(|&n| n == node))
            .unwrap_or(0))
    }

    /// The node's kind.
    pub fn kind(&self, node: NodeId) -> Result<NodeKind, SceneError> {
        Ok(self.live(node)?.kind)
    }

    /// The node's parent.
    pub fn parent(&self, node: NodeId) -> Result<Option<NodeId>, SceneError> {
        Ok(self.live(node)?.parent)
    }

    /// The node's children, bottom to top.
    pub fn children(&self, node: NodeId) -> Result<&[NodeId], SceneError> {
        Ok(self.live(node)?.children.as_slice())
    }

    /// Number of ancestors.
    pub fn depth(&self, node: NodeId) -> Result<usize, SceneError> {
        self.live(node)?;
        Ok(self.ancestors(node).count())
    }

    /// Strict ancestors, nearest first.
    pub(crate) fn ancestors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let mut cur = self.get(node).and_then(|n| n.parent);
        core::iter::from_fn(move || {
            let n = cur?;
            cur = self.get(n).and_then(|e| e.parent);
            Some(n)
        })
    }

    /// The layer at the root of the node's tree, if the root is a layer.
    #[must_use]
    pub fn layer_of(&self, node: NodeId) -> Option<NodeId> {
        let root = self.ancestors(node).last().unwrap_or(node);
        (self.get(root)?.kind == NodeKind::Layer).then_some(root)
    }

    /// Returns `true` if `ancestor` is a strict ancestor of `node`.
    #[must_use]
    pub fn is_ancestor_of(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.ancestors(node).any(|n| n == ancestor)
    }

    /// The nearest strict ancestor matching `pred`.
    pub fn find_ancestor(
        &self,
        node: NodeId,
        mut pred: impl FnMut(NodeId) -> bool,
    ) -> Result<Option<NodeId>, SceneError> {
        self.live(node)?;
        Ok(self.ancestors(node).find(|&n| pred(n)))
    }

    /// The nearest strict ancestor carrying `name` among its names.
    pub fn find_ancestor_by_name(
        &self,
        node: NodeId,
        name: &str,
    ) -> Result<Option<NodeId>, SceneError> {
        self.find_ancestor(node, |n| self.has_name(n, name))
    }

    /// Returns `true` if `name` is one of the node's whitespace-separated
    /// names.
    #[must_use]
    pub fn has_name(&self, node: NodeId, name: &str) -> bool {
        self.get(node).is_some_and(|n| {
            n.attrs
                .get(self.attrs.name)
                .is_some_and(|names| names.split_whitespace().any(|t| t == name))
        })
    }

    /// Every live node carrying `name`, in the order they received it.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Vec<NodeId> {
        self.names
            .get(name)
            .map(|nodes| nodes.to_vec())
            .unwrap_or_default()
    }

    /// The node most recently given `id`.
    #[must_use]
    pub fn find_by_id(&self, id: &str) -> Option<NodeId> {
        self.ids.get(id).copied()
    }

    /// Descendants of `container` carrying `name`, in depth-first order.
    pub fn find_by_name_in(&self, container: NodeId, name: &str) -> Result<Vec<NodeId>, SceneError> {
        Ok(self
            .descendants(container)?
            .into_iter()
            .filter(|&n| self.has_name(n, name))
            .collect())
    }

    /// Strict descendants of `node`, depth first, bottom to top.
    pub fn descendants(&self, node: NodeId) -> Result<Vec<NodeId>, SceneError> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.live(node)?.children.iter().rev().copied().collect();
        while let Some(n) = stack.pop() {
            out.push(n);
            if let Some(entry) = self.get(n) {
                stack.extend(entry.children.iter().rev().copied());
            }
        }
        Ok(out)
    }

    fn flag_chain(&self, node: NodeId, attr: Attr<bool>) -> bool {
        core::iter::once(node)
            .chain(self.ancestors(node))
            .all(|n| self.get(n).is_some_and(|e| self.value_of(e, attr)))
    }

    /// Visible if the node and every ancestor are visible.
    pub fn is_visible(&self, node: NodeId) -> Result<bool, SceneError> {
        self.live(node)?;
        Ok(self.flag_chain(node, self.attrs.visible))
    }

    /// Listening if the node and every ancestor are listening.
    pub fn is_listening(&self, node: NodeId) -> Result<bool, SceneError> {
        self.live(node)?;
        Ok(self.flag_chain(node, self.attrs.listening))
    }

    /// Product of opacities from the root down to the node.
    pub fn absolute_opacity(&self, node: NodeId) -> Result<f64, SceneError> {
        self.live(node)?;
        Ok(core::iter::once(node)
            .chain(self.ancestors(node))
            .filter_map(|n| self.get(n))
            .map(|e| self.value_of(e, self.attrs.opacity))
            .product())
    }

    /// Axis-aligned bounds of the node's visible content.
    ///
    /// With `relative_to` unset the rect is in layer space. With
    /// `relative_to` set to the node itself, its own transform is skipped;
    /// with an ancestor, the rect is in that ancestor's local space.
    /// Returns `None` for nodes with no content.
    pub fn client_rect(
        &mut self,
        node: NodeId,
        relative_to: Option<NodeId>,
    ) -> Result<Option<Rect>, SceneError> {
        self.live(node)?;
        let matrix = match relative_to {
            None => self.absolute_of(node),
            Some(ancestor) => self.transform_relative_to(node, ancestor)?,
        };
        Ok(self
            .content_rect(node)
            .map(|r| matrix.transform_rect_bbox(r)))
    }

    /// Content bounds in the node's own space, excluding its transform.
    pub(crate) fn content_rect(&mut self, node: NodeId) -> Option<Rect> {
        let entry = self.get(node)?;
        if entry.kind == NodeKind::Leaf {
            let bounds = entry.drawable.as_ref()?.bounds();
            let stroked = self.value_of(entry, self.attrs.stroke).is_some();
            let half = self.value_of(entry, self.attrs.stroke_width) / 2.0;
            return Some(if stroked {
                bounds.inflate(half, half)
            } else {
                bounds
            });
        }
        let children = entry.children.clone();
        let clip = self.value_of(entry, self.attrs.clip);
        let mut acc: Option<Rect> = None;
        for child in children {
            let visible = self
                .get(child)
                .is_some_and(|e| self.value_of(e, self.attrs.visible));
            if !visible {
                continue;
            }
            let Some(rect) = self.content_rect(child) else {
                continue;
            };
            let rect = self.local_of(child).transform_rect_bbox(rect);
            acc = Some(acc.map_or(rect, |a| a.union(rect)));
        }
        match (acc, clip) {
            (Some(rect), Some(clip)) => Some(rect.intersect(clip)),
            (acc, _) => acc,
        }
    }

    pub(crate) fn reindex(&mut self, node: NodeId, change: &AttrChange) {
        if change.attr == self.attrs.name.id() {
            if let Some(old) = change.old_as::<String>() {
                self.unindex_names(node, old);
            }
            if let Some(new) = change.new_as::<String>() {
                for token in new.split_whitespace() {
                    let entry = self.names.entry(token.into()).or_default();
                    if !entry.contains(&node) {
                        entry.push(node);
                    }
                }
            }
        } else if change.attr == self.attrs.id.id() {
            if let Some(old) = change.old_as::<String>()
                && self.ids.get(old) == Some(&node)
            {
                self.ids.remove(old);
            }
            if let Some(new) = change.new_as::<String>()
                && !new.is_empty()
                && let Some(previous) = self.ids.insert(new.clone(), node)
                && previous != node
                && self.is_alive(previous)
            {
                self.warn(Warning::DuplicateId {
                    id: new.clone(),
                    previous,
                    node,
                });
            }
        }
    }

    fn unindex_names(&mut self, node: NodeId, names: &str) {
        for token in names.split_whitespace() {
            if let Some(entry) = self.names.get_mut(token) {
                entry.retain(|n| *n != node);
                if entry.is_empty() {
                    self.names.remove(token);
                }
            }
        }
    }
}
