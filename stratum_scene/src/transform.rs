// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Memoized local and absolute matrices.
//!
//! Each node caches its local matrix and its absolute matrix, each with a
//! dirty bit. Writing a transform-affecting attribute dirties the node's
//! local matrix and the absolute matrices of the node and every descendant.
//! Reads recompute lazily, top-down along the dirty part of the ancestor
//! chain, and store the result.
//!
//! A dirty absolute matrix always implies dirty descendants, so marking can
//! stop at any subtree that is already dirty, and recomputation can stop
//! walking upwards at the first clean ancestor.

use kurbo::Affine;
use smallvec::SmallVec;

use crate::error::{InvalidOperation, SceneError};
use crate::node::Node;
use crate::scene::Scene;
use crate::types::{NodeId, TransformsMode};

#[derive(Clone, Copy, Debug)]
pub(crate) struct TransformEntry {
    pub(crate) local: Affine,
    pub(crate) absolute: Affine,
    pub(crate) local_dirty: bool,
    pub(crate) absolute_dirty: bool,
}

impl Default for TransformEntry {
    fn default() -> Self {
        Self {
            local: Affine::IDENTITY,
            absolute: Affine::IDENTITY,
            local_dirty: true,
            absolute_dirty: true,
        }
    }
}

/// Components of a node's local transform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocalTransform {
    /// Horizontal position.
    pub x: f64,
    /// Vertical position.
    pub y: f64,
    /// Rotation in radians.
    pub rotation: f64,
    /// Horizontal scale.
    pub scale_x: f64,
    /// Vertical scale.
    pub scale_y: f64,
    /// Horizontal skew.
    pub skew_x: f64,
    /// Vertical skew.
    pub skew_y: f64,
    /// Horizontal pivot.
    pub offset_x: f64,
    /// Vertical pivot.
    pub offset_y: f64,
}

impl Default for LocalTransform {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            skew_x: 0.0,
            skew_y: 0.0,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }
}

impl LocalTransform {
    /// The matrix for these components under `mode`.
    ///
    /// With [`TransformsMode::All`] the matrix is
    /// `translate(x, y) * rotate(rotation) * scale(scale_x, scale_y) *
    /// skew(skew_x, skew_y) * translate(-offset_x, -offset_y)`.
    #[must_use]
    pub fn to_affine(&self, mode: TransformsMode) -> Affine {
        match mode {
            TransformsMode::All => {
                Affine::translate((self.x, self.y))
                    * Affine::rotate(self.rotation)
                    * Affine::scale_non_uniform(self.scale_x, self.scale_y)
                    * Affine::skew(self.skew_x, self.skew_y)
                    * Affine::translate((-self.offset_x, -self.offset_y))
            }
            TransformsMode::PositionOnly => {
                Affine::translate((self.x - self.offset_x, self.y - self.offset_y))
            }
            TransformsMode::None => Affine::IDENTITY,
        }
    }
}

impl Scene {
    fn local_parts(&self, node: &Node) -> (LocalTransform, TransformsMode) {
        let a = &self.attrs;
        let get = |attr| *node.attrs.get_or_default(attr, &self.registry);
        let parts = LocalTransform {
            x: get(a.x),
            y: get(a.y),
            rotation: get(a.rotation),
            scale_x: get(a.scale_x),
            scale_y: get(a.scale_y),
            skew_x: get(a.skew_x),
            skew_y: get(a.skew_y),
            offset_x: get(a.offset_x),
            offset_y: get(a.offset_y),
        };
        let mode = *node
            .attrs
            .get_or_default(a.transforms_enabled, &self.registry);
        (parts, mode)
    }

    pub(crate) fn local_of(&mut self, id: NodeId) -> Affine {
        let Some(node) = self.get(id) else {
            return Affine::IDENTITY;
        };
        if !node.transform.local_dirty {
            return node.transform.local;
        }
        let (parts, mode) = self.local_parts(node);
        let local = parts.to_affine(mode);
        if let Some(node) = self.get_mut(id) {
            node.transform.local = local;
            node.transform.local_dirty = false;
        }
        local
    }

    pub(crate) fn absolute_of(&mut self, id: NodeId) -> Affine {
        let mut chain: SmallVec<[NodeId; 16]> = SmallVec::new();
        let mut base = Affine::IDENTITY;
        let mut cur = Some(id);
        while let Some(n) = cur {
            let Some(node) = self.get(n) else { break };
            if !node.transform.absolute_dirty {
                base = node.transform.absolute;
                break;
            }
            chain.push(n);
            cur = node.parent;
        }
        for n in chain.into_iter().rev() {
            base *= self.local_of(n);
            if let Some(node) = self.get_mut(n) {
                node.transform.absolute = base;
                node.transform.absolute_dirty = false;
            }
            self.transform_recomputations += 1;
        }
        base
    }

    /// Dirties the absolute matrices of `id` and its subtree, and the local
    /// matrix of `id` itself when `local` is set.
    pub(crate) fn mark_transform_dirty(&mut self, id: NodeId, local: bool) {
        if local && let Some(node) = self.get_mut(id) {
            node.transform.local_dirty = true;
        }
        let mut stack: SmallVec<[NodeId; 16]> = SmallVec::new();
        stack.push(id);
        while let Some(n) = stack.pop() {
            let Some(node) = self.get_mut(n) else {
                continue;
            };
            if node.transform.absolute_dirty && n != id {
                continue;
            }
            node.transform.absolute_dirty = true;
            stack.extend(node.children.iter().copied());
        }
    }

    /// Returns the node's local matrix.
    pub fn local_transform(&mut self, node: NodeId) -> Result<Affine, SceneError> {
        self.live(node)?;
        Ok(self.local_of(node))
    }

    /// Returns the product of local matrices from the node's root down to
    /// the node. A layer's absolute matrix is its own local matrix.
    pub fn absolute_transform(&mut self, node: NodeId) -> Result<Affine, SceneError> {
        self.live(node)?;
        Ok(self.absolute_of(node))
    }

    /// Returns the matrix mapping the node's local space into `ancestor`'s
    /// local space.
    ///
    /// This is the product of local matrices strictly below `ancestor` down
    /// to and including `node`; for `node == ancestor` it is the identity.
    pub fn transform_relative_to(
        &mut self,
        node: NodeId,
        ancestor: NodeId,
    ) -> Result<Affine, SceneError> {
        self.live(node)?;
        self.live(ancestor)?;
        let mut matrix = Affine::IDENTITY;
        let mut cur = node;
        while cur != ancestor {
            matrix = self.local_of(cur) * matrix;
            cur = self
                .get(cur)
                .and_then(|n| n.parent)
                .ok_or(InvalidOperation::NotAnAncestor { node, ancestor })?;
        }
        Ok(matrix)
    }

    /// Number of absolute matrices computed since the scene was created.
    #[must_use]
    pub fn transform_recomputations(&self) -> u64 {
        self.transform_recomputations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayerOptions;
    use core::f64::consts::FRAC_PI_2;
    use kurbo::Point;

    fn close(a: Point, b: Point) -> bool {
        (a - b).hypot() < 1e-9
    }

    #[test]
    fn composition_order() {
        let parts = LocalTransform {
            x: 10.0,
            y: 0.0,
            rotation: FRAC_PI_2,
            scale_x: 2.0,
            offset_x: 1.0,
            ..LocalTransform::default()
        };
        // (2, 0) -offset-> (1, 0) -scale-> (2, 0) -rotate-> (0, 2) -translate-> (10, 2)
        let p = parts.to_affine(TransformsMode::All) * Point::new(2.0, 0.0);
        assert!(close(p, Point::new(10.0, 2.0)));

        let p = parts.to_affine(TransformsMode::PositionOnly) * Point::new(2.0, 0.0);
        assert!(close(p, Point::new(11.0, 0.0)));

        let p = parts.to_affine(TransformsMode::None) * Point::new(2.0, 0.0);
        assert!(close(p, Point::new(2.0, 0.0)));
    }

    #[test]
    fn skew_follows_scale() {
        let parts = LocalTransform {
            scale_x: 2.0,
            skew_x: 1.0,
            ..LocalTransform::default()
        };
        // skew first: (0, 1) -> (1, 1); then scale: (2, 1)
        let p = parts.to_affine(TransformsMode::All) * Point::new(0.0, 1.0);
        assert!(close(p, Point::new(2.0, 1.0)));
    }

    #[test]
    fn absolute_composes_through_the_layer() {
        let mut scene = Scene::new();
        let a = scene.attrs();
        let layer = scene.create_layer(LayerOptions::new(100.0, 100.0));
        let group = scene.create_group();
        let leaf = scene.create_group();
        scene.add_child(layer, group).unwrap();
        scene.add_child(group, leaf).unwrap();
        scene.set_attr(layer, a.x, 1.0).unwrap();
        scene.set_attr(group, a.x, 10.0).unwrap();
        scene.set_attr(leaf, a.y, 5.0).unwrap();

        let m = scene.absolute_transform(leaf).unwrap();
        assert!(close(m * Point::ZERO, Point::new(11.0, 5.0)));
        assert_eq!(
            scene.absolute_transform(layer).unwrap(),
            scene.local_transform(layer).unwrap()
        );
        let rel = scene.transform_relative_to(leaf, group).unwrap();
        assert!(close(rel * Point::ZERO, Point::new(0.0, 5.0)));
        assert_eq!(scene.transform_relative_to(leaf, leaf).unwrap(), Affine::IDENTITY);
        assert!(scene.transform_relative_to(group, leaf).is_err());
    }

    #[test]
    fn recomputes_at_most_once_between_mutations() {
        let mut scene = Scene::new();
        let a = scene.attrs();
        let root = scene.create_group();
        let mid = scene.create_group();
        let leaf = scene.create_group();
        scene.add_child(root, mid).unwrap();
        scene.add_child(mid, leaf).unwrap();

        let _ = scene.absolute_transform(leaf).unwrap();
        let base = scene.transform_recomputations();
        let _ = scene.absolute_transform(leaf).unwrap();
        let _ = scene.absolute_transform(mid).unwrap();
        assert_eq!(scene.transform_recomputations(), base);

        scene.set_attr(mid, a.rotation, 0.5).unwrap();
        for _ in 0..3 {
            let _ = scene.absolute_transform(leaf).unwrap();
            let _ = scene.absolute_transform(mid).unwrap();
            let _ = scene.absolute_transform(root).unwrap();
        }
        // mid and leaf, once each; root stayed clean
        assert_eq!(scene.transform_recomputations(), base + 2);
    }

    #[test]
    fn dirtiness_reaches_every_descendant() {
        let mut scene = Scene::new();
        let a = scene.attrs();
        let root = scene.create_group();
        let mid = scene.create_group();
        let leaf = scene.create_group();
        scene.add_child(root, mid).unwrap();
        scene.add_child(mid, leaf).unwrap();
        let _ = scene.absolute_transform(leaf).unwrap();

        scene.set_attr(root, a.x, 3.0).unwrap();
        scene.set_attr(mid, a.x, 4.0).unwrap();
        let m = scene.absolute_transform(leaf).unwrap();
        assert!(close(m * Point::ZERO, Point::new(7.0, 0.0)));
    }

    #[test]
    fn reparenting_refreshes_absolute() {
        let mut scene = Scene::new();
        let a = scene.attrs();
        let left = scene.create_group();
        let right = scene.create_group();
        let leaf = scene.create_group();
        scene.set_attr(left, a.x, 1.0).unwrap();
        scene.set_attr(right, a.x, 2.0).unwrap();
        scene.add_child(left, leaf).unwrap();
        assert!(close(scene.absolute_transform(leaf).unwrap() * Point::ZERO, Point::new(1.0, 0.0)));
        scene.add_child(right, leaf).unwrap();
        assert!(close(scene.absolute_transform(leaf).unwrap() * Point::ZERO, Point::new(2.0, 0.0)));
    }

    #[test]
    fn transforms_mode_is_live() {
        let mut scene = Scene::new();
        let a = scene.attrs();
        let node = scene.create_group();
        scene.set_attr(node, a.x, 5.0).unwrap();
        scene.set_attr(node, a.rotation, 1.0).unwrap();
        scene
            .set_attr(node, a.transforms_enabled, TransformsMode::None)
            .unwrap();
        assert_eq!(scene.local_transform(node).unwrap(), Affine::IDENTITY);
        scene
            .set_attr(node, a.transforms_enabled, TransformsMode::PositionOnly)
            .unwrap();
        assert_eq!(
            scene.local_transform(node).unwrap(),
            Affine::translate((5.0, 0.0))
        );
    }
}
