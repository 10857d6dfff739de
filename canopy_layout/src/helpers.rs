// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Small one-shot layout helpers.

use canopy_history::Transaction;
use canopy_kernel::{EPS, Transvection, exp_map, hyperboloid, tangent_basis};
use canopy_pointset::{PointSet, PointSetError};

use crate::move_recorded;

/// Evenly distributes the direct children of `parent` on a circle of
/// hyperbolic radius `radius` around it (tangent axes 1 and 2).
pub fn spread_children(
    ps: &mut PointSet,
    tx: &mut Transaction,
    parent: usize,
    radius: f64,
) -> Result<(), PointSetError> {
    if !ps.is_live(parent) {
        return Err(PointSetError::NoSuchPoint(parent));
    }
    let children = ps.children(parent);
    if children.is_empty() {
        return Ok(());
    }
    let stride = ps.stride();
    let parent_coords = ps.coords_of(parent).to_vec();
    let mut e1 = vec![0.0; stride];
    let mut e2 = vec![0.0; stride];
    tangent_basis(&parent_coords, 1, 2, &mut e1, &mut e2);
    let mut tangent = vec![0.0; stride];
    let mut placed = vec![0.0; stride];
    for (k, &child) in children.iter().enumerate() {
        let theta = core::f64::consts::TAU * k as f64 / children.len() as f64;
        let (sin, cos) = theta.sin_cos();
        for i in 0..stride {
            tangent[i] = radius * (cos * e1[i] + sin * e2[i]);
        }
        exp_map(&mut placed, &parent_coords, &tangent);
        move_recorded(ps, tx, child, &placed)?;
    }
    Ok(())
}

/// Translates the whole set so `root` lands on the hyperboloid origin.
///
/// An isometry: every distance and the tree shape are preserved; only the
/// viewpoint changes.
pub fn center_on_root(
    ps: &mut PointSet,
    tx: &mut Transaction,
    root: usize,
) -> Result<(), PointSetError> {
    if !ps.is_live(root) {
        return Err(PointSetError::NoSuchPoint(root));
    }
    let tv = Transvection::to_origin(ps.coords_of(root));
    let stride = ps.stride();
    let mut scratch = vec![0.0; stride];
    for i in 0..ps.count() {
        scratch.copy_from_slice(ps.coords_of(i));
        tv.apply(&mut scratch);
        move_recorded(ps, tx, i, &scratch)?;
    }
    Ok(())
}

/// Pulls every point of cluster `motif` a fraction `t ∈ [0, 1]` of the way
/// toward the cluster's centroid along its geodesic.
pub fn compact_cluster(
    ps: &mut PointSet,
    tx: &mut Transaction,
    motif: i32,
    t: f64,
) -> Result<(), PointSetError> {
    let members: Vec<usize> = ps.visible().filter(|&i| ps.motif(i) == motif).collect();
    if members.len() < 2 {
        return Ok(());
    }
    let stride = ps.stride();
    let mut centroid = vec![0.0; stride];
    for &i in &members {
        for (c, v) in centroid.iter_mut().zip(ps.coords_of(i)) {
            *c += v;
        }
    }
    for c in &mut centroid {
        *c /= members.len() as f64;
    }
    if hyperboloid::project_to_hyperboloid(&mut centroid).is_err() {
        return Ok(());
    }

    let t = t.clamp(0.0, 1.0);
    let mut next = vec![0.0; stride];
    for &i in &members {
        if ps.dist_to(i, &centroid) < EPS {
            continue;
        }
        hyperboloid::geodesic_lerp(&mut next, ps.coords_of(i), &centroid, t);
        move_recorded(ps, tx, i, &next)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_kernel::origin;

    #[test]
    fn spread_places_children_on_the_circle() {
        let mut ps = PointSet::new(2, 8);
        let r = ps.add_point("r", None, None).unwrap();
        for i in 0..4 {
            ps.add_child_along(&format!("c{i}"), r, &[0.0, 0.01, 0.0])
                .unwrap();
        }
        let mut tx = Transaction::new();
        spread_children(&mut ps, &mut tx, r, 0.8).unwrap();
        for i in 1..5 {
            assert!((ps.dist(r, i) - 0.8).abs() < 1e-9);
        }
        // Opposite children sit farther apart than adjacent ones.
        assert!(ps.dist(1, 3) > ps.dist(1, 2));
        ps.assert_invariants();
    }

    #[test]
    fn centering_moves_root_to_origin_isometrically() {
        let mut ps = PointSet::new(2, 8);
        let r = ps
            .add_point("r", None, Some(&[0.0, 0.9, -0.4]))
            .unwrap();
        let c = ps.add_child_along("c", r, &[0.0, 0.5, 0.3]).unwrap();
        let d_before = ps.dist(r, c);

        let mut tx = Transaction::new();
        center_on_root(&mut ps, &mut tx, r).unwrap();
        let o = origin(2);
        assert!(ps.dist_to(r, &o) < 1e-9);
        assert!((ps.dist(r, c) - d_before).abs() < 1e-9);
    }

    #[test]
    fn compacting_shrinks_the_cluster() {
        let mut ps = PointSet::new(2, 8);
        for (i, s) in [[0.8, 0.0], [-0.8, 0.2], [0.1, -0.9]].iter().enumerate() {
            let idx = ps
                .add_point(&format!("m{i}"), None, Some(&[0.0, s[0], s[1]]))
                .unwrap();
            ps.set_motif(idx, 7);
        }
        let outsider = ps.add_point("out", None, Some(&[0.0, 2.0, 2.0])).unwrap();
        let out_before = ps.coords_of(outsider).to_vec();

        let diameter = |ps: &PointSet| {
            let mut m: f64 = 0.0;
            for i in 0..3 {
                for j in (i + 1)..3 {
                    m = m.max(ps.dist(i, j));
                }
            }
            m
        };
        let before = diameter(&ps);
        let mut tx = Transaction::new();
        compact_cluster(&mut ps, &mut tx, 7, 0.5).unwrap();
        assert!(diameter(&ps) < before);
        // Non-members stay put.
        assert_eq!(ps.coords_of(outsider), &out_before[..]);
    }
}
