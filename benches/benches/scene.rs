// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Benchmarks for `stratum_scene`: attribute writes, transform
//! recomputation, pick rebuilds, and cached versus live redraws.

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use kurbo::{Point, Rect};
use peniko::Color;
use stratum_scene::{CacheOptions, LayerOptions, NodeId, PathDrawable, Scene};

const FILL: Color = Color::from_rgba8(40, 120, 200, 255);

/// A staged layer holding one group with a `cols` by `rows` grid of leaves.
fn grid_scene(cols: u32, rows: u32) -> (Scene, NodeId, NodeId, Vec<NodeId>) {
    let mut scene = Scene::new();
    let a = scene.attrs();
    let layer = scene.create_layer(LayerOptions::new(512.0, 512.0));
    scene.add_layer(layer).unwrap();
    let group = scene.create_group();
    scene.add_child(layer, group).unwrap();

    let mut leaves = Vec::new();
    for row in 0..rows {
        for col in 0..cols {
            let leaf = scene.create_leaf(PathDrawable::from_shape(&Rect::new(0.0, 0.0, 6.0, 6.0)));
            scene.set_attr(leaf, a.fill, Some(FILL)).unwrap();
            scene.set_attr(leaf, a.x, f64::from(col) * 8.0).unwrap();
            scene.set_attr(leaf, a.y, f64::from(row) * 8.0).unwrap();
            scene.add_child(group, leaf).unwrap();
            leaves.push(leaf);
        }
    }
    scene.on_animation_frame();
    (scene, layer, group, leaves)
}

/// A chain of nested groups `depth` deep with a leaf at the bottom.
fn chain_scene(depth: usize) -> (Scene, Vec<NodeId>) {
    let mut scene = Scene::new();
    let a = scene.attrs();
    let layer = scene.create_layer(LayerOptions::new(64.0, 64.0));
    scene.add_layer(layer).unwrap();
    let mut chain = vec![layer];
    for i in 0..depth {
        let group = scene.create_group();
        scene.set_attr(group, a.rotation, 0.01 * i as f64).unwrap();
        scene.add_child(chain[chain.len() - 1], group).unwrap();
        chain.push(group);
    }
    let leaf = scene.create_leaf(PathDrawable::from_shape(&Rect::new(0.0, 0.0, 1.0, 1.0)));
    scene.add_child(chain[chain.len() - 1], leaf).unwrap();
    chain.push(leaf);
    (scene, chain)
}

fn bench_attrs(c: &mut Criterion) {
    let mut group = c.benchmark_group("stratum_attrs");

    let (mut scene, _, _, leaves) = grid_scene(16, 16);
    let a = scene.attrs();
    let mut flip = false;
    group.bench_function("set_changed(n=256)", |b| {
        b.iter(|| {
            flip = !flip;
            let opacity = if flip { 0.5 } else { 0.75 };
            for &leaf in &leaves {
                black_box(scene.set_attr(leaf, a.opacity, opacity).unwrap());
            }
        });
    });

    group.bench_function("set_unchanged(n=256)", |b| {
        b.iter(|| {
            for &leaf in &leaves {
                black_box(scene.set_attr(leaf, a.fill, Some(FILL)).unwrap());
            }
        });
    });

    group.finish();
}

fn bench_transforms(c: &mut Criterion) {
    let mut group = c.benchmark_group("stratum_transforms");

    for &depth in &[8_usize, 64] {
        let (mut scene, chain) = chain_scene(depth);
        let a = scene.attrs();
        let root = chain[1];
        let leaf = chain[chain.len() - 1];
        let mut x = 0.0;
        group.bench_function(format!("mutate_root_read_leaf(depth={depth})"), |b| {
            b.iter(|| {
                x += 1.0;
                scene.set_attr(root, a.x, x).unwrap();
                black_box(scene.absolute_transform(leaf).unwrap());
            });
        });

        group.bench_function(format!("read_clean_leaf(depth={depth})"), |b| {
            b.iter(|| black_box(scene.absolute_transform(leaf).unwrap()));
        });
    }

    group.finish();
}

fn bench_pick(c: &mut Criterion) {
    let mut group = c.benchmark_group("stratum_pick");

    let (mut scene, _, _, leaves) = grid_scene(32, 32);
    let a = scene.attrs();
    scene.pick_at(Point::new(1.0, 1.0));
    group.bench_function("pick_clean(n=1024)", |b| {
        b.iter(|| black_box(scene.pick_at(Point::new(131.0, 67.0))));
    });

    let mut x = 0.0;
    group.bench_function("move_then_pick(n=1024)", |b| {
        b.iter(|| {
            x = if x == 0.0 { 1.0 } else { 0.0 };
            scene.set_attr(leaves[0], a.x, x).unwrap();
            black_box(scene.pick_at(Point::new(131.0, 67.0)))
        });
    });

    group.finish();
}

fn bench_cache(c: &mut Criterion) {
    let mut group = c.benchmark_group("stratum_cache");
    group.sample_size(30);

    group.bench_function("redraw_live(n=1024)", |b| {
        b.iter_batched(
            || grid_scene(32, 32),
            |(mut scene, layer, _, _)| {
                scene.draw_layer(layer).unwrap();
                black_box(scene);
            },
            BatchSize::LargeInput,
        );
    });

    group.bench_function("redraw_cached(n=1024)", |b| {
        b.iter_batched(
            || {
                let (mut scene, layer, group, leaves) = grid_scene(32, 32);
                scene.enable_cache(group, CacheOptions::new()).unwrap();
                (scene, layer, group, leaves)
            },
            |(mut scene, layer, _, _)| {
                scene.draw_layer(layer).unwrap();
                black_box(scene);
            },
            BatchSize::LargeInput,
        );
    });

    group.finish();
}

criterion_group!(benches, bench_attrs, bench_transforms, bench_pick, bench_cache);
criterion_main!(benches);
