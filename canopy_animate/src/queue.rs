// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Animations and the global queue.

use canopy_kernel::hyperboloid;
use canopy_lens::Lens;
use canopy_pointset::PointSet;

use crate::easing::Easing;

/// Longest time step fed to spring integration; a stalled display loop
/// must not explode the integrator.
const MAX_SPRING_DT_MS: f64 = 100.0;

/// What an animation drives, and how.
#[derive(Clone, Debug)]
pub enum AnimationKind {
    /// Interpolate the lens focus from `from` to `to` along the geodesic.
    GeodesicFocus {
        /// Focus captured when the animation started.
        from: Vec<f64>,
        /// Destination focus.
        to: Vec<f64>,
    },
    /// Interpolate one point's coordinates along the geodesic.
    GeodesicPoint {
        /// The animated point.
        idx: usize,
        /// Coordinates captured when the animation started.
        from: Vec<f64>,
        /// Destination coordinates.
        to: Vec<f64>,
    },
    /// Critically damped spring driving the focus toward `to`.
    ///
    /// Integrated with semi-implicit Euler on the geodesic parameter;
    /// completes when both the remaining offset and the velocity fall
    /// below the settle precision.
    SpringFocus {
        /// Focus captured when the animation started.
        from: Vec<f64>,
        /// Destination focus.
        to: Vec<f64>,
        /// Spring stiffness (1/s²).
        stiffness: f64,
        /// Settle precision on parameter and velocity.
        precision: f64,
        /// Current geodesic parameter (starts at 0).
        s: f64,
        /// Current parameter velocity.
        v: f64,
    },
    /// Run children one after another.
    Sequence(
        /// Children in play order.
        Vec<Animation>,
    ),
    /// Run children together; completes when all complete.
    Parallel(
        /// Concurrent children.
        Vec<Animation>,
    ),
}

/// One cooperative animation.
#[derive(Clone, Debug)]
pub struct Animation {
    id: u64,
    kind: AnimationKind,
    duration_ms: f64,
    easing: Easing,
    started_ms: Option<f64>,
    last_tick_ms: Option<f64>,
    cancelled: bool,
    complete: bool,
}

impl Animation {
    /// Creates an animation; ids are assigned when it is queued.
    #[must_use]
    pub fn new(kind: AnimationKind, duration_ms: f64, easing: Easing) -> Self {
        Self {
            id: 0,
            kind,
            duration_ms,
            easing,
            started_ms: None,
            last_tick_ms: None,
            cancelled: false,
            complete: false,
        }
    }

    /// The queue-assigned id (0 before queueing).
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Advances the animation. Returns `true` when it has finished.
    fn tick(&mut self, now_ms: f64, lens: &mut Lens, ps: &mut PointSet) -> bool {
        if self.cancelled || self.complete {
            return true;
        }
        let started = *self.started_ms.get_or_insert(now_ms);
        let dt = self
            .last_tick_ms
            .map_or(0.0, |last| (now_ms - last).clamp(0.0, MAX_SPRING_DT_MS));
        self.last_tick_ms = Some(now_ms);

        // Zero-duration animations apply their final state immediately.
        let raw_t = if self.duration_ms <= 0.0 {
            1.0
        } else {
            ((now_ms - started) / self.duration_ms).clamp(0.0, 1.0)
        };
        let eased = self.easing.apply(raw_t);

        match &mut self.kind {
            AnimationKind::GeodesicFocus { from, to } => {
                let mut pos = vec![0.0; from.len()];
                hyperboloid::geodesic_lerp(&mut pos, from, to, eased);
                lens.set_focus(&pos);
                self.complete = raw_t >= 1.0;
            }
            AnimationKind::GeodesicPoint { idx, from, to } => {
                if !ps.is_live(*idx) {
                    self.complete = true;
                    return true;
                }
                let mut pos = vec![0.0; from.len()];
                hyperboloid::geodesic_lerp(&mut pos, from, to, eased);
                if ps.set_coords(*idx, &pos).is_err() {
                    self.complete = true;
                    return true;
                }
                self.complete = raw_t >= 1.0;
            }
            AnimationKind::SpringFocus {
                from,
                to,
                stiffness,
                precision,
                s,
                v,
            } => {
                let dt_s = dt / 1000.0;
                if dt_s > 0.0 {
                    // Critical damping: c = 2√k.
                    let k = *stiffness;
                    let damping = 2.0 * k.sqrt();
                    let accel = k * (1.0 - *s) - damping * *v;
                    *v += accel * dt_s;
                    *s += *v * dt_s;
                }
                if (1.0 - *s).abs() < *precision && v.abs() < *precision {
                    *s = 1.0;
                    self.complete = true;
                }
                let mut pos = vec![0.0; from.len()];
                hyperboloid::geodesic_lerp(&mut pos, from, to, s.clamp(0.0, 1.0));
                lens.set_focus(&pos);
            }
            AnimationKind::Sequence(children) => {
                if let Some(current) = children.iter_mut().find(|c| !c.complete && !c.cancelled) {
                    current.tick(now_ms, lens, ps);
                }
                self.complete = children.iter().all(|c| c.complete || c.cancelled);
            }
            AnimationKind::Parallel(children) => {
                for child in children.iter_mut() {
                    if !child.complete && !child.cancelled {
                        child.tick(now_ms, lens, ps);
                    }
                }
                self.complete = children.iter().all(|c| c.complete || c.cancelled);
            }
        }
        self.complete
    }
}

/// The global animation queue.
///
/// Owned by the engine; ticked once per display frame. Finished and
/// cancelled animations are removed during the tick, and their ids are
/// reported through [`AnimationQueue::drain_completed`] so callers can
/// chain follow-up work.
#[derive(Debug, Default)]
pub struct AnimationQueue {
    animations: Vec<Animation>,
    next_id: u64,
    completed: Vec<u64>,
}

impl AnimationQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an animation and returns its id.
    pub fn add(&mut self, mut animation: Animation) -> u64 {
        self.next_id += 1;
        animation.id = self.next_id;
        self.animations.push(animation);
        self.next_id
    }

    /// Number of queued (running) animations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.animations.len()
    }

    /// Returns `true` when no animations are queued; the display loop can
    /// stop ticking.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.animations.is_empty()
    }

    /// Advances every running animation and retires finished ones.
    pub fn tick(&mut self, now_ms: f64, lens: &mut Lens, ps: &mut PointSet) {
        for anim in &mut self.animations {
            if anim.tick(now_ms, lens, ps) && !anim.cancelled {
                self.completed.push(anim.id);
            }
        }
        self.animations.retain(|a| !a.complete && !a.cancelled);
    }

    /// Cancels one animation. Idempotent: returns `true` only the first
    /// time; the animation is removed on the next tick without applying
    /// further state.
    pub fn cancel(&mut self, id: u64) -> bool {
        for anim in &mut self.animations {
            if anim.id == id && !anim.cancelled {
                anim.cancelled = true;
                return true;
            }
        }
        false
    }

    /// Cancels everything.
    pub fn cancel_all(&mut self) {
        for anim in &mut self.animations {
            anim.cancelled = true;
        }
    }

    /// Ids of animations that ran to completion since the last drain.
    pub fn drain_completed(&mut self) -> Vec<u64> {
        core::mem::take(&mut self.completed)
    }
}
