// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Attribute snapshots for serializers.
//!
//! A [`NodeRecord`] lists a subtree's kinds and non-default attributes by
//! their registered names. Encoding it to text is left to the caller.

use alloc::vec::Vec;

use stratum_attr::ErasedValue;

use crate::error::SceneError;
use crate::scene::Scene;
use crate::types::NodeId;

/// A serializable snapshot of a node and its descendants.
#[derive(Clone, Debug)]
pub struct NodeRecord {
    /// `"Layer"`, `"Group"` or `"Shape"`.
    pub class_name: &'static str,
    /// Attributes that differ from their defaults, in registration order.
    pub attrs: Vec<(&'static str, ErasedValue)>,
    /// Child records, bottom to top.
    pub children: Vec<NodeRecord>,
}

impl NodeRecord {
    /// Looks up an attribute value by name.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&ErasedValue> {
        self.attrs
            .iter()
            .find_map(|(n, v)| (*n == name).then_some(v))
    }
}

impl Scene {
    /// Snapshots a subtree.
    pub fn to_record(&self, node: NodeId) -> Result<NodeRecord, SceneError> {
        let entry = self.live(node)?;
        let attrs = entry
            .attrs
            .entries()
            .filter_map(|(id, value)| {
                let registration = self.registry.get(id)?;
                let default = registration.default_erased();
                (!registration.is_unchanged_erased(&default, value))
                    .then(|| (registration.name(), value.clone()))
            })
            .collect();
        let children = entry
            .children
            .iter()
            .map(|&c| self.to_record(c))
            .collect::<Result<_, _>>()?;
        Ok(NodeRecord {
            class_name: entry.kind.class_name(),
            attrs,
            children,
        })
    }

    /// Writes named attributes onto a node, stopping at the first failure.
    /// Returns how many of them changed the node.
    pub fn apply_attrs(
        &mut self,
        node: NodeId,
        attrs: &[(&str, ErasedValue)],
    ) -> Result<usize, SceneError> {
        let mut changed = 0;
        for (name, value) in attrs {
            if self.set_attr_by_name(node, name, value.clone())? {
                changed += 1;
            }
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayerOptions;
    use crate::draw::PathDrawable;
    use kurbo::Rect;
    use peniko::Color;

    #[test]
    fn records_skip_defaults() {
        let mut scene = Scene::new();
        let a = scene.attrs();
        let layer = scene.create_layer(LayerOptions::new(10.0, 10.0));
        let leaf = scene.create_leaf(PathDrawable::from_shape(&Rect::new(0.0, 0.0, 1.0, 1.0)));
        scene.add_child(layer, leaf).unwrap();
        scene.set_attr(leaf, a.x, 5.0).unwrap();
        scene.set_attr(leaf, a.y, 3.0).unwrap();
        scene.set_attr(leaf, a.y, 0.0).unwrap();
        scene
            .set_attr(leaf, a.fill, Some(Color::from_rgba8(1, 2, 3, 255)))
            .unwrap();

        let record = scene.to_record(layer).unwrap();
        assert_eq!(record.class_name, "Layer");
        assert!(record.attrs.is_empty());
        let child = &record.children[0];
        assert_eq!(child.class_name, "Shape");
        let names: Vec<_> = child.attrs.iter().map(|(n, _)| *n).collect();
        assert_eq!(names, ["x", "fill"]);
        assert_eq!(child.attr("x").unwrap().downcast_ref::<f64>(), Some(&5.0));
        assert!(child.attr("y").is_none());
    }

    #[test]
    fn records_round_trip_attributes() {
        let mut scene = Scene::new();
        let a = scene.attrs();
        let source = scene.create_group();
        scene.set_attr(source, a.rotation, 0.25).unwrap();
        scene.set_attr(source, a.name, "a b".into()).unwrap();
        scene.set_attr(source, a.listening, false).unwrap();

        let record = scene.to_record(source).unwrap();
        let copy = scene.create_group();
        assert_eq!(scene.apply_attrs(copy, &record.attrs).unwrap(), 3);
        assert_eq!(scene.get_attr(copy, a.rotation).unwrap(), 0.25);
        assert_eq!(scene.find_by_name("b"), alloc::vec![source, copy]);

        let again = scene.to_record(copy).unwrap();
        assert_eq!(again.attrs.len(), record.attrs.len());
        for ((n1, v1), (n2, v2)) in record.attrs.iter().zip(&again.attrs) {
            assert_eq!(n1, n2);
            assert!(v1.same_value(v2));
        }
        assert_eq!(scene.apply_attrs(copy, &record.attrs).unwrap(), 0);
    }
}
