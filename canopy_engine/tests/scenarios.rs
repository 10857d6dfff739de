// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end scenarios exercising the whole engine stack.

use canopy_engine::Engine;
use canopy_kernel::{dist, exp_map, origin};
use canopy_layout::RadialConfig;
use canopy_ops::Operator;
use canopy_pointset::PointSet;

/// Dimension 2, capacity 8: a root with two children hung on opposite
/// tangents behaves metrically.
#[test]
fn small_tree_has_consistent_metric_structure() {
    let mut ps = PointSet::new(2, 8);
    let r = ps.add_point("r", None, None).unwrap();
    let a = ps.add_child_along("a", r, &[0.0, 0.5, 0.0]).unwrap();
    let b = ps.add_child_along("b", r, &[0.0, -0.5, 0.0]).unwrap();

    assert_eq!(ps.depth_of(a), 1);
    assert_eq!(ps.depth_of(b), 1);
    assert!((ps.dist(r, a) - 0.5).abs() < 1e-9);
    assert!((ps.dist(r, b) - 0.5).abs() < 1e-9);
    // a, r, b are colinear on one geodesic, so the triangle inequality
    // is tight.
    assert!(ps.dist(a, b) > ps.dist(a, r) + ps.dist(r, b) - 1e-5);
}

/// Dimension 5, 1000 random points: the VP-tree agrees with the linear
/// scan on k-nearest queries.
#[test]
fn vp_tree_matches_linear_scan_at_scale() {
    let dim = 5;
    let n = 1000;
    let mut ps = PointSet::new(dim, n);
    let o = origin(dim);
    // Deterministic LCG cloud in a tangent ball of radius 2.
    let mut state = 0x2545f4914f6cdd1d_u64;
    let mut next = move || {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
        ((state >> 32) as f64 / u32::MAX as f64) * 2.0 - 1.0
    };
    for i in 0..n {
        let mut tangent = vec![0.0; dim + 1];
        for t in tangent.iter_mut().skip(1) {
            *t = next() * 2.0 / (dim as f64).sqrt();
        }
        let mut q = vec![0.0; dim + 1];
        exp_map(&mut q, &o, &tangent);
        ps.add_point(&format!("p{i}"), None, Some(&q)).unwrap();
    }

    let mut index = canopy_index::VpIndex::new();
    for query in [0_usize, 137, 499, 998] {
        let fast: Vec<usize> = index.k_nearest(&ps, query, 8).iter().map(|e| e.0).collect();
        let slow: Vec<usize> = ps.k_nearest(query, 8).iter().map(|e| e.0).collect();
        assert_eq!(fast, slow, "query {query}");
    }
}

/// Tangent lens at the origin: a unit-tangent point lands one scale unit
/// right of center, and a zero-duration focus animation recenters it.
#[test]
fn lens_projection_and_instant_refocus() {
    let mut engine = Engine::new(2);
    let id = engine.create_pointset(8);
    engine.add_point(id, "r", None, 0.0).unwrap();
    let o = origin(2);
    let mut q = vec![0.0; 3];
    exp_map(&mut q, &o, &[0.0, 1.0, 0.0]);
    let target = engine
        .add_point_at(id, "target", Some(0), Some(&q), 1.0)
        .unwrap();
    engine.set_lens_viewport("main", 800.0, 600.0, 100.0, 0.0, 0.0);

    let ps = engine.pointset(id).unwrap();
    let s = engine.active_lens().project_point(ps.coords_of(target));
    assert!((s.x - 500.0).abs() < 1e-9);
    assert!((s.y - 300.0).abs() < 1e-9);

    engine.animate_focus_to(id, target, 0.0).unwrap();
    engine.tick_animations(id, 0.0);
    let ps = engine.pointset(id).unwrap();
    let s = engine.active_lens().project_point(ps.coords_of(target));
    assert!((s.x - 400.0).abs() < 1e-6);
    assert!((s.y - 300.0).abs() < 1e-6);
}

/// Radial layout on a three-level binary tree: siblings are symmetric
/// around their parent.
#[test]
fn radial_layout_symmetry() {
    let mut engine = Engine::new(2);
    let id = engine.create_pointset(16);
    engine.add_point(id, "r", None, 0.0).unwrap();
    for (parent, name) in [
        ("r", "a"),
        ("r", "b"),
        ("a", "aa"),
        ("a", "ab"),
        ("b", "ba"),
        ("b", "bb"),
    ] {
        engine.add_point(id, name, Some(parent), 1.0).unwrap();
    }
    assert!(engine.layout_radial(id, 0, &RadialConfig::default(), 2.0));

    let ps = engine.pointset(id).unwrap();
    let a = ps.index_of("a").unwrap();
    let aa = ps.index_of("aa").unwrap();
    let ab = ps.index_of("ab").unwrap();
    assert!((ps.dist(a, aa) - ps.dist(a, ab)).abs() < 1e-5);
    assert!((ps.dist(aa, ab) - ps.dist(ab, aa)).abs() < 1e-12);
    ps.assert_invariants();
}

/// Ten rounds of centroid attraction monotonically contract a selection
/// of five points.
#[test]
fn centroid_attraction_converges() {
    let mut engine = Engine::new(2);
    let id = engine.create_pointset(8);
    let o = origin(2);
    for (i, t) in [[1.0, 0.0], [-0.9, 0.3], [0.2, 1.1], [-0.3, -1.0], [0.6, -0.6]]
        .iter()
        .enumerate()
    {
        let mut q = vec![0.0; 3];
        exp_map(&mut q, &o, &[0.0, t[0], t[1]]);
        engine
            .add_point_at(id, &format!("p{i}"), None, Some(&q), 0.0)
            .unwrap();
    }
    assert!(engine.apply_operator(id, &Operator::SelectAll, 1.0));

    let diameter = |ps: &PointSet| {
        let mut m: f64 = 0.0;
        for i in 0..5 {
            for j in (i + 1)..5 {
                m = m.max(ps.dist(i, j));
            }
        }
        m
    };
    let mut prev = diameter(engine.pointset(id).unwrap());
    for round in 0..10 {
        assert!(engine.apply_operator_named(id, "attract-centroid:0.2", 10.0 + round as f64));
        let cur = diameter(engine.pointset(id).unwrap());
        assert!(cur <= prev + 1e-9, "round {round} grew the diameter");
        prev = cur;
    }
    assert!(prev < 1.0);
}

/// Cut a subtree of four nodes and paste it elsewhere: the count is
/// unchanged, depths are rewritten, and undo restores the original tree.
#[test]
fn cut_paste_undo_cycle() {
    let mut engine = Engine::new(2);
    let id = engine.create_pointset(32);
    engine.add_point(id, "r", None, 0.0).unwrap();
    engine.add_point(id, "a", Some("r"), 1.0).unwrap();
    engine.add_point(id, "a1", Some("a"), 2.0).unwrap();
    engine.add_point(id, "a2", Some("a"), 3.0).unwrap();
    engine.add_point(id, "a2x", Some("a2"), 4.0).unwrap();
    engine.add_point(id, "other", Some("r"), 5.0).unwrap();

    let ps = engine.pointset(id).unwrap();
    let a = ps.index_of("a").unwrap();
    let other = ps.index_of("other").unwrap();
    let r = ps.index_of("r").unwrap();
    assert_eq!(ps.subtree_size(a), 4);
    let count = ps.count();

    assert!(engine.cut_subtree(id, a, 100.0));
    let pasted = engine.paste_subtree(id, other, 700.0).unwrap();
    assert_eq!(pasted, a);

    let ps = engine.pointset(id).unwrap();
    assert_eq!(ps.count(), count);
    assert_eq!(ps.parent_of(a), Some(other));
    assert_eq!(ps.depth_of(a), ps.depth_of(other) + 1);
    for name in ["a1", "a2"] {
        let i = ps.index_of(name).unwrap();
        assert_eq!(ps.depth_of(i), ps.depth_of(a) + 1);
    }
    let a2x = ps.index_of("a2x").unwrap();
    assert_eq!(ps.depth_of(a2x), ps.depth_of(a) + 2);
    ps.assert_invariants();

    // Undo paste, then undo cut.
    assert!(engine.undo(id));
    assert!(engine.undo(id));
    let ps = engine.pointset(id).unwrap();
    assert_eq!(ps.parent_of(a), Some(r));
    assert_eq!(ps.depth_of(a), 1);
    assert_eq!(ps.visible().count(), count);
    ps.assert_invariants();
}

/// The renderer pipeline runs end to end through the engine and respects
/// hidden points after an operator.
#[test]
fn operator_renderer_integration() {
    let mut engine = Engine::new(2);
    let id = engine.create_pointset(16);
    engine.add_point(id, "r", None, 0.0).unwrap();
    for i in 0..5 {
        engine
            .add_point(id, &format!("c{i}"), Some("r"), i as f64)
            .unwrap();
    }
    let rid = engine.create_batch_renderer(id, 16).unwrap();
    engine.update_batch(rid, 0.0);
    engine.finish_frame(rid, 2.0);
    let full = engine.get_batch_stats(rid).unwrap().projected;
    assert_eq!(full, 6);

    // Hide everything below the root; the next frame culls it.
    assert!(engine.apply_operator_named(id, "select-all", 10.0));
    assert!(engine.apply_operator_named(id, "deselect-all", 600.0));
    assert!(engine.apply_operator(
        id,
        &canopy_ops::Operator::Select(canopy_ops::SelectPred::AtDepth(1)),
        700.0
    ));
    assert!(engine.apply_operator_named(id, "hide", 800.0));
    engine.update_batch(rid, 20.0);
    engine.finish_frame(rid, 22.0);
    let batch = engine.batch(rid).unwrap();
    assert_eq!(batch.stats.culled, 5);
    assert_eq!(batch.render_count, 1);

    // Undo the hide; everything returns.
    assert!(engine.undo(id));
    engine.update_batch(rid, 40.0);
    engine.finish_frame(rid, 42.0);
    assert_eq!(engine.batch(rid).unwrap().render_count, 6);
}

/// Export → import → export is a fixed point.
#[test]
fn export_is_stable_under_round_trip() {
    let mut engine = Engine::new(2);
    let id = engine.create_pointset(16);
    engine.add_point(id, "root", None, 0.0).unwrap();
    engine.add_point(id, "left", Some("root"), 1.0).unwrap();
    engine.add_point(id, "right", Some("root"), 2.0).unwrap();
    engine.set_selected(id, 1, true, 3.0);

    let first = engine.export_pointset(id).unwrap();
    let id2 = engine.import_pointset(&first).unwrap();
    let second = engine.export_pointset(id2).unwrap();
    assert_eq!(first, second);
}

/// Distances come back clamped and symmetric through the public API.
#[test]
fn distance_queries_through_the_api() {
    let mut engine = Engine::new(2);
    let id = engine.create_pointset(8);
    engine.add_point(id, "r", None, 0.0).unwrap();
    let far = engine
        .add_point_at(id, "far", None, Some(&[0.0, 1.0e9, 0.0]), 1.0)
        .unwrap();
    let d = engine.get_distance(id, 0, far).unwrap();
    assert_eq!(d, canopy_kernel::MAX_DIST);
    assert_eq!(
        engine.get_distance(id, far, 0).unwrap(),
        engine.get_distance(id, 0, far).unwrap()
    );
    let o = origin(2);
    assert!(dist(&o, &o).abs() < 1e-12);
}
