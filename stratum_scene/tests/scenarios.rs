// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end scenarios for `stratum_scene`.
//!
//! These drive a whole scene through its public API and check how much work
//! each mutation causes: redraws, cache re-renders, matrix recomputations.

use std::cell::Cell;
use std::rc::Rc;

use kurbo::{Affine, Point, Rect};
use peniko::Color;
use stratum_scene::{
    CacheOptions, CacheOutcome, Drawable, InvalidOperation, LayerOptions, LocalTransform, NodeId,
    PathDrawable, RedrawState, Scene, SceneError, ShapeContext, TransformsMode,
};

const RED: Color = Color::from_rgba8(255, 0, 0, 255);
const BLUE: Color = Color::from_rgba8(0, 0, 255, 255);

/// Counts scene-pass draws of the wrapped path.
struct Counted {
    path: PathDrawable,
    draws: Rc<Cell<u32>>,
}

impl Drawable for Counted {
    fn draw(&self, ctx: &mut ShapeContext<'_>) {
        if !ctx.is_hit_pass() {
            self.draws.set(self.draws.get() + 1);
        }
        self.path.draw(ctx);
    }

    fn bounds(&self) -> Rect {
        self.path.bounds()
    }
}

fn staged_layer(scene: &mut Scene) -> NodeId {
    let layer = scene.create_layer(LayerOptions::new(200.0, 200.0));
    scene.add_layer(layer).unwrap();
    layer
}

fn filled_rect(scene: &mut Scene, rect: Rect, color: Color) -> NodeId {
    let a = scene.attrs();
    let leaf = scene.create_leaf(PathDrawable::from_shape(&rect));
    scene.set_attr(leaf, a.fill, Some(color)).unwrap();
    leaf
}

fn assert_affine_eq(actual: Affine, expected: Affine) {
    for (a, e) in actual.as_coeffs().iter().zip(expected.as_coeffs()) {
        assert!((a - e).abs() < 1e-9, "{actual:?} != {expected:?}");
    }
}

#[test]
fn set_z_index_moves_first_child_to_third() {
    let mut scene = Scene::new();
    let layer = staged_layer(&mut scene);
    let group = scene.create_group();
    scene.add_child(layer, group).unwrap();
    let c: Vec<NodeId> = (0..4).map(|_| scene.create_group()).collect();
    for &child in &c {
        scene.add_child(group, child).unwrap();
    }

    assert_eq!(scene.set_z_index(c[0], 2).unwrap(), 2);
    assert_eq!(scene.children(group).unwrap(), &[c[1], c[2], c[0], c[3]]);
    assert_eq!(scene.z_index(c[0]).unwrap(), 2);
    assert!(scene.take_warnings().is_empty());
}

#[test]
fn add_then_remove_restores_sibling_order() {
    let mut scene = Scene::new();
    let group = scene.create_group();
    let c: Vec<NodeId> = (0..4).map(|_| scene.create_group()).collect();
    for &child in &c {
        scene.add_child(group, child).unwrap();
    }
    let before: Vec<usize> = c.iter().map(|&n| scene.z_index(n).unwrap()).collect();

    let extra = scene.create_group();
    scene.insert_child(group, extra, 1).unwrap();
    assert_eq!(scene.z_index(c[1]).unwrap(), 2);
    assert!(scene.remove_child(group, extra).unwrap());

    let after: Vec<usize> = c.iter().map(|&n| scene.z_index(n).unwrap()).collect();
    assert_eq!(before, after);
    assert_eq!(scene.children(group).unwrap(), c.as_slice());
    assert_eq!(scene.parent(extra).unwrap(), None);
}

#[test]
fn cache_renders_at_density_and_rerenders_once_per_change() {
    let mut scene = Scene::new();
    let a = scene.attrs();
    let layer = staged_layer(&mut scene);
    let group = scene.create_group();
    scene.add_child(layer, group).unwrap();

    let draws = Rc::new(Cell::new(0));
    let leaf = scene.create_leaf(Counted {
        path: PathDrawable::from_shape(&Rect::new(0.0, 0.0, 100.0, 50.0)),
        draws: draws.clone(),
    });
    scene.set_attr(leaf, a.fill, Some(RED)).unwrap();
    scene.add_child(group, leaf).unwrap();

    assert_eq!(scene.on_animation_frame(), vec![layer]);
    assert_eq!(draws.get(), 1);

    let outcome = scene
        .enable_cache(group, CacheOptions::new().with_pixel_ratio(2.0))
        .unwrap();
    assert_eq!(
        outcome,
        CacheOutcome::Cached {
            width: 200,
            height: 100
        }
    );
    let hit = scene.cached_hit(group).unwrap().unwrap();
    assert_eq!((hit.width(), hit.height()), (200, 100));
    assert_eq!(draws.get(), 2);

    // Plain redraws blit.
    scene.on_animation_frame();
    scene.draw_layer(layer).unwrap();
    assert_eq!(draws.get(), 2);

    scene.set_attr(leaf, a.fill, Some(BLUE)).unwrap();
    assert!(scene.cache_info(group).unwrap().unwrap().stale);
    assert_eq!(scene.redraw_state(layer).unwrap(), RedrawState::Scheduled);

    assert_eq!(scene.on_animation_frame(), vec![layer]);
    assert_eq!(draws.get(), 3);
    let info = scene.cache_info(group).unwrap().unwrap();
    assert!(!info.stale);
    assert_eq!(info.refreshes, 2);
    assert_eq!(
        scene.layer_canvas(layer).unwrap().pixel_at(Point::new(50.0, 25.0)),
        Some([0, 0, 255, 255])
    );

    // Nothing is pending, and a forced redraw still blits.
    assert!(scene.on_animation_frame().is_empty());
    scene.draw_layer(layer).unwrap();
    assert_eq!(draws.get(), 3);
}

#[test]
fn non_listening_cover_picks_the_listening_leaf_beneath() {
    let mut scene = Scene::new();
    let a = scene.attrs();
    let layer = staged_layer(&mut scene);
    let group = scene.create_group();
    scene.add_child(layer, group).unwrap();

    let below = filled_rect(&mut scene, Rect::new(0.0, 0.0, 50.0, 50.0), RED);
    let cover = filled_rect(&mut scene, Rect::new(0.0, 0.0, 60.0, 60.0), BLUE);
    scene.set_attr(cover, a.listening, false).unwrap();
    scene.add_child(group, below).unwrap();
    scene.add_child(group, cover).unwrap();

    assert_eq!(scene.pick_at(Point::new(25.0, 25.0)), Some(below));
    // Covered only by the non-listening leaf.
    assert_eq!(scene.pick_at(Point::new(55.0, 55.0)), None);

    // Once it listens, the cover wins.
    scene.set_attr(cover, a.listening, true).unwrap();
    assert_eq!(scene.pick_at(Point::new(25.0, 25.0)), Some(cover));
}

#[test]
fn pick_finds_a_single_leaf_under_transforms() {
    let mut scene = Scene::new();
    let a = scene.attrs();
    let layer = staged_layer(&mut scene);
    let group = scene.create_group();
    scene.add_child(layer, group).unwrap();
    scene.set_attr(group, a.x, 40.0).unwrap();
    scene.set_attr(group, a.scale_x, 2.0).unwrap();

    let leaf = filled_rect(&mut scene, Rect::new(0.0, 0.0, 10.0, 10.0), RED);
    scene.add_child(group, leaf).unwrap();

    assert_eq!(scene.pick_at(Point::new(55.0, 5.0)), Some(leaf));
    assert_eq!(scene.pick_at(Point::new(35.0, 5.0)), None);
    assert_eq!(scene.pick_at(Point::new(65.0, 5.0)), None);
}

#[test]
fn equal_write_triggers_nothing() {
    let mut scene = Scene::new();
    let a = scene.attrs();
    let layer = staged_layer(&mut scene);
    let group = scene.create_group();
    scene.add_child(layer, group).unwrap();
    let leaf = filled_rect(&mut scene, Rect::new(0.0, 0.0, 20.0, 20.0), RED);
    scene.add_child(group, leaf).unwrap();
    scene.enable_cache(group, CacheOptions::new()).unwrap();

    let events = Rc::new(Cell::new(0));
    let seen = events.clone();
    scene
        .on_attr_change(leaf, None, move |_, _| seen.set(seen.get() + 1))
        .unwrap();

    assert!(scene.set_attr(leaf, a.x, 5.0).unwrap());
    assert_eq!(events.get(), 1);
    scene.on_animation_frame();
    scene.pick_at(Point::new(10.0, 10.0));

    let frames = scene.frames_requested();
    let refreshes = scene.cache_info(group).unwrap().unwrap().refreshes;

    assert!(!scene.set_attr(leaf, a.x, 5.0).unwrap());
    assert!(!scene.set_attr(leaf, a.fill, Some(RED)).unwrap());
    // Coerced to the stored value.
    assert!(!scene.set_attr(leaf, a.opacity, 7.0).unwrap());
    assert!(!scene.set_attr(leaf, a.opacity, 1.0).unwrap());

    assert_eq!(events.get(), 1);
    assert_eq!(scene.frames_requested(), frames);
    assert_eq!(scene.redraw_state(layer).unwrap(), RedrawState::Idle);
    assert!(!scene.is_pick_stale(layer).unwrap());
    let info = scene.cache_info(group).unwrap().unwrap();
    assert!(!info.stale);
    assert_eq!(info.refreshes, refreshes);
}

#[test]
fn enabling_cache_twice_is_bit_identical() {
    let mut scene = Scene::new();
    let a = scene.attrs();
    let layer = staged_layer(&mut scene);
    let group = scene.create_group();
    scene.add_child(layer, group).unwrap();
    let leaf = filled_rect(&mut scene, Rect::new(0.0, 0.0, 30.0, 20.0), RED);
    scene.set_attr(leaf, a.stroke, Some(BLUE)).unwrap();
    scene.set_attr(leaf, a.stroke_width, 3.0).unwrap();
    scene.set_attr(leaf, a.rotation, 0.3).unwrap();
    scene.add_child(group, leaf).unwrap();

    let options = CacheOptions::new().with_pixel_ratio(1.5).with_padding(2.0);
    let first = scene.enable_cache(group, options).unwrap();
    let scene_px = scene.cached_scene(group).unwrap().unwrap().clone();
    let hit_px = scene.cached_hit(group).unwrap().unwrap().clone();

    let second = scene.enable_cache(group, options).unwrap();
    assert_eq!(first, second);
    assert_eq!(scene.cached_scene(group).unwrap().unwrap(), &scene_px);
    assert_eq!(scene.cached_hit(group).unwrap().unwrap(), &hit_px);
}

#[test]
fn nested_caches_both_go_stale() {
    let mut scene = Scene::new();
    let a = scene.attrs();
    let layer = staged_layer(&mut scene);
    let outer = scene.create_group();
    let inner = scene.create_group();
    scene.add_child(layer, outer).unwrap();
    scene.add_child(outer, inner).unwrap();
    let leaf = filled_rect(&mut scene, Rect::new(0.0, 0.0, 10.0, 10.0), RED);
    scene.add_child(inner, leaf).unwrap();

    scene.enable_cache(inner, CacheOptions::new()).unwrap();
    scene.enable_cache(outer, CacheOptions::new()).unwrap();
    assert!(!scene.cache_info(inner).unwrap().unwrap().stale);
    assert!(!scene.cache_info(outer).unwrap().unwrap().stale);

    scene.set_attr(leaf, a.fill, Some(BLUE)).unwrap();
    assert!(scene.cache_info(inner).unwrap().unwrap().stale);
    assert!(scene.cache_info(outer).unwrap().unwrap().stale);

    scene.on_animation_frame();
    assert_eq!(scene.cache_info(inner).unwrap().unwrap().refreshes, 2);
    assert_eq!(scene.cache_info(outer).unwrap().unwrap().refreshes, 2);
    assert_eq!(
        scene.layer_canvas(layer).unwrap().pixel_at(Point::new(5.0, 5.0)),
        Some([0, 0, 255, 255])
    );
}

#[test]
fn transforms_recompute_at_most_once_per_mutation() {
    let mut scene = Scene::new();
    let a = scene.attrs();
    let layer = staged_layer(&mut scene);
    let outer = scene.create_group();
    let inner = scene.create_group();
    let leaf = filled_rect(&mut scene, Rect::new(0.0, 0.0, 10.0, 10.0), RED);
    scene.add_child(layer, outer).unwrap();
    scene.add_child(outer, inner).unwrap();
    scene.add_child(inner, leaf).unwrap();

    scene.set_attr(inner, a.rotation, 0.5).unwrap();
    scene.set_attr(inner, a.offset_x, 4.0).unwrap();
    scene.set_attr(leaf, a.y, 3.0).unwrap();
    for node in [outer, inner, leaf] {
        scene.absolute_transform(node).unwrap();
    }

    scene.set_attr(outer, a.x, 20.0).unwrap();
    scene.set_attr(outer, a.scale_y, 2.0).unwrap();
    let before = scene.transform_recomputations();
    let mut leaf_matrix = Affine::IDENTITY;
    for _ in 0..3 {
        leaf_matrix = scene.absolute_transform(leaf).unwrap();
        scene.absolute_transform(inner).unwrap();
        scene.absolute_transform(outer).unwrap();
    }
    assert!(scene.transform_recomputations() - before <= 3);

    let outer_local = LocalTransform {
        x: 20.0,
        scale_y: 2.0,
        ..LocalTransform::default()
    };
    let inner_local = Affine::rotate(0.5) * Affine::translate((-4.0, 0.0));
    let leaf_local = Affine::translate((0.0, 3.0));
    assert_affine_eq(
        leaf_matrix,
        outer_local.to_affine(TransformsMode::All) * inner_local * leaf_local,
    );

    // Untouched since the last read.
    let settled = scene.transform_recomputations();
    scene.absolute_transform(leaf).unwrap();
    assert_eq!(scene.transform_recomputations(), settled);
}

#[test]
fn invalid_structure_is_rejected() {
    let mut scene = Scene::new();
    let layer = staged_layer(&mut scene);
    let outer = scene.create_group();
    let inner = scene.create_group();
    scene.add_child(layer, outer).unwrap();
    scene.add_child(outer, inner).unwrap();

    assert!(matches!(
        scene.add_child(inner, outer),
        Err(SceneError::InvalidOperation(InvalidOperation::Cycle { .. }))
    ));
    assert!(matches!(
        scene.add_child(outer, outer),
        Err(SceneError::InvalidOperation(InvalidOperation::SelfInsert(_)))
    ));
    let other = scene.create_layer(LayerOptions::new(10.0, 10.0));
    assert!(matches!(
        scene.add_child(outer, other),
        Err(SceneError::InvalidOperation(InvalidOperation::ChildKind { .. }))
    ));
    assert!(matches!(
        scene.enable_cache(layer, CacheOptions::new()),
        Err(SceneError::InvalidOperation(InvalidOperation::LayerCache(_)))
    ));

    assert!(scene.destroy(inner));
    assert!(matches!(
        scene.kind(inner),
        Err(SceneError::InvalidOperation(InvalidOperation::Destroyed(_)))
    ));
    assert!(scene.children(outer).unwrap().is_empty());
    // Failed operations leave the tree as it was.
    assert_eq!(scene.children(layer).unwrap(), &[outer]);
}
