// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Force-directed relaxation in tangent space.

use canopy_history::Transaction;
use canopy_kernel::{EPS, exp_map, maps, minkowski_dot};
use canopy_pointset::{PointFlags, PointSet, PointSetError};

use crate::move_recorded;

/// Parameters for [`force_layout`].
///
/// The force cap is applied to the raw magnitude without renormalizing
/// the direction; this matches the tuning the layout was calibrated with
/// and is deliberately exposed rather than hidden.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ForceConfig {
    /// Maximum relaxation iterations.
    pub max_iterations: usize,
    /// Repulsion strength (inverse-square in hyperbolic distance).
    pub repulsion: f64,
    /// Pairs farther apart than this exert no repulsion.
    pub repulsion_cutoff: f64,
    /// Spring strength along tree edges.
    pub spring: f64,
    /// Rest length of edge springs.
    pub target_edge_length: f64,
    /// Per-node force magnitude cap.
    pub force_cap: f64,
    /// Velocity damping applied before the exp step.
    pub damping: f64,
    /// Total force magnitude below which the layout is converged.
    pub tolerance: f64,
}

impl Default for ForceConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            repulsion: 0.05,
            repulsion_cutoff: 5.0,
            spring: 0.2,
            target_edge_length: 1.0,
            force_cap: 0.3,
            damping: 0.9,
            tolerance: 1e-3,
        }
    }
}

/// Relaxes visible points with pairwise repulsion and edge springs.
///
/// Forces are accumulated per node in its own tangent space (log
/// directions toward the other endpoint), capped, damped, and applied
/// with one exp step per node per iteration. Roots and `PINNED` points do
/// not move. Returns the number of iterations run; fewer than
/// `max_iterations` means the total force dropped below tolerance.
pub fn force_layout(
    ps: &mut PointSet,
    tx: &mut Transaction,
    config: &ForceConfig,
) -> Result<usize, PointSetError> {
    let stride = ps.stride();
    let nodes: Vec<usize> = ps.visible().collect();
    let movable: Vec<bool> = nodes
        .iter()
        .map(|&i| !ps.has_flag(i, PointFlags::PINNED) && !ps.has_flag(i, PointFlags::ROOT))
        .collect();

    let mut forces = vec![0.0; nodes.len() * stride];
    let mut dir = vec![0.0; stride];
    let mut next = vec![0.0; stride];

    for iteration in 0..config.max_iterations {
        forces.fill(0.0);
        let mut total = 0.0;

        // Pairwise repulsion, symmetric.
        for a in 0..nodes.len() {
            for b in (a + 1)..nodes.len() {
                let (i, j) = (nodes[a], nodes[b]);
                let d = ps.dist(i, j);
                if d < EPS || d >= config.repulsion_cutoff {
                    continue;
                }
                let mag = config.repulsion / (d * d);
                let len = maps::log_map_direction(&mut dir, ps.coords_of(i), ps.coords_of(j));
                if len < EPS {
                    continue;
                }
                for k in 0..stride {
                    forces[a * stride + k] -= mag * dir[k];
                }
                // The opposite direction lives in j's tangent space.
                let len = maps::log_map_direction(&mut dir, ps.coords_of(j), ps.coords_of(i));
                if len >= EPS {
                    for k in 0..stride {
                        forces[b * stride + k] -= mag * dir[k];
                    }
                }
            }
        }

        // Edge springs toward the rest length.
        for (slot, &i) in nodes.iter().enumerate() {
            let Some(parent) = ps.parent_of(i) else {
                continue;
            };
            if ps.has_flag(parent, PointFlags::HIDDEN) {
                continue;
            }
            let d = ps.dist(i, parent);
            if d < EPS {
                continue;
            }
            let pull = config.spring * (d - config.target_edge_length);
            maps::log_map_direction(&mut dir, ps.coords_of(i), ps.coords_of(parent));
            for k in 0..stride {
                forces[slot * stride + k] += pull * dir[k];
            }
            if let Some(parent_slot) = nodes.iter().position(|&n| n == parent) {
                maps::log_map_direction(&mut dir, ps.coords_of(parent), ps.coords_of(i));
                for k in 0..stride {
                    forces[parent_slot * stride + k] += pull * dir[k];
                }
            }
        }

        // Cap, damp, and apply.
        for (slot, &i) in nodes.iter().enumerate() {
            if !movable[slot] {
                continue;
            }
            let f = &mut forces[slot * stride..(slot + 1) * stride];
            let norm = minkowski_dot(f, f).max(0.0).sqrt();
            if norm < EPS {
                continue;
            }
            if norm > config.force_cap {
                let scale = config.force_cap / norm;
                for v in f.iter_mut() {
                    *v *= scale;
                }
            }
            total += minkowski_dot(f, f).max(0.0).sqrt();
            for v in f.iter_mut() {
                *v *= config.damping;
            }
            exp_map(&mut next, ps.coords_of(i), f);
            move_recorded(ps, tx, i, &next)?;
        }

        if total < config.tolerance {
            return Ok(iteration + 1);
        }
    }
    Ok(config.max_iterations)
}
