// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy Engine: the process-wide aggregate.
//!
//! An [`Engine`] owns every piece of core state: point sets with their
//! spatial indices, fields, and histories; named lenses; batch renderers;
//! the animation queue; the clipboard; styles; and the per-frame arena.
//! It exposes the public API that input and renderer adapters drive. One
//! engine is created per process with [`Engine::new`] and lives for the
//! process lifetime.
//!
//! ## Threading and time
//!
//! The engine is single-threaded and cooperative: every call runs to
//! completion on the caller's (display/event loop) thread, and nothing
//! blocks. The engine never reads a clock; operations that need time
//! (history coalescing, animation, frame budgets) take `now_ms` from the
//! caller. Call [`Engine::begin_frame`] at the top of each display frame
//! to reset the scratch arena, then [`Engine::tick_animations`] and
//! [`Engine::update_batch`] as the frame proceeds.
//!
//! ## Error contract
//!
//! No call panics or propagates errors across the API: failures come back
//! as `None`/`false` (the sentinel contract), with a diagnostic logged
//! through the `log` facade. The only hard failures are programmer errors
//! (indices out of range), which `debug_assert` in development builds.
//!
//! ## Mutation discipline
//!
//! Only operators, history (undo/redo), clipboard, layout, and animation
//! calls mutate point sets. All of them route through history
//! transactions, so every user-visible mutation is one undo step. Flag
//! and structure mutations conservatively mark the bound renderers fully
//! dirty; pure coordinate motion flows through the point set's own dirty
//! flags and stays incremental.

mod clipboard;
mod opnames;
mod sets;
mod style;
mod view;

pub use clipboard::{Clipboard, ClipNode};
pub use opnames::parse_operator;
pub use style::{ResolvedStyle, StyleOverride, StyleState, Theme};
pub use view::Label;

use canopy_animate::AnimationQueue;
use canopy_arena::{BufferPool, FrameArena};
use canopy_field::{FieldKernel, ScalarField};
use canopy_history::History;
use canopy_index::VpIndex;
use canopy_lens::Lens;
use canopy_pointset::PointSet;
use canopy_render::BatchRenderer;
use hashbrown::HashMap;

/// Handle to a point set registered in the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PointSetId(pub(crate) usize);

/// Handle to a batch renderer registered in the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RendererId(pub(crate) usize);

/// Elements per point set: the columns plus their caches and history.
#[derive(Debug)]
pub(crate) struct SetEntry {
    pub(crate) ps: PointSet,
    pub(crate) index: VpIndex,
    pub(crate) field: ScalarField,
    pub(crate) history: History,
}

#[derive(Debug)]
pub(crate) struct RendererEntry {
    pub(crate) renderer: BatchRenderer,
    pub(crate) ps: PointSetId,
}

/// Scratch capacity of the per-frame arena in `f64` elements.
const ARENA_CAPACITY: usize = 64 * 1024;

/// The process-wide engine state.
#[derive(Debug)]
pub struct Engine {
    dim: usize,
    pub(crate) sets: Vec<SetEntry>,
    pub(crate) renderers: Vec<RendererEntry>,
    pub(crate) lenses: HashMap<String, Lens>,
    pub(crate) active_lens: String,
    pub(crate) animations: AnimationQueue,
    pub(crate) clipboard: Option<Clipboard>,
    pub(crate) styles: StyleState,
    arena: FrameArena,
    pools: BufferPool,
    /// Actor id attached to history records (one engine, one actor).
    pub(crate) actor: u32,
}

impl Engine {
    /// Initializes the engine for hyperbolic dimension `dim` (at least 2).
    ///
    /// Installs a default lens under the key `"main"`.
    #[must_use]
    pub fn new(dim: usize) -> Self {
        let dim = dim.max(2);
        let mut lenses = HashMap::new();
        lenses.insert("main".to_owned(), Lens::new(dim));
        log::debug!("engine init, dim {dim}");
        Self {
            dim,
            sets: Vec::new(),
            renderers: Vec::new(),
            lenses,
            active_lens: "main".to_owned(),
            animations: AnimationQueue::new(),
            clipboard: None,
            styles: StyleState::default(),
            arena: FrameArena::with_capacity(ARENA_CAPACITY),
            pools: BufferPool::new(),
            actor: 0,
        }
    }

    /// The engine's hyperbolic dimension.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Resets the per-frame arena. Call at the top of every display
    /// frame, before any projection or layout work.
    pub fn begin_frame(&mut self) {
        self.arena.reset();
    }

    /// The per-frame scratch arena.
    pub fn arena(&mut self) -> &mut FrameArena {
        &mut self.arena
    }

    /// The size-keyed buffer pools for longer-lived scratch.
    pub fn pools(&mut self) -> &mut BufferPool {
        &mut self.pools
    }

    /// Registers an empty point set and returns its id.
    pub fn create_pointset(&mut self, capacity: usize) -> PointSetId {
        let id = PointSetId(self.sets.len());
        self.sets.push(SetEntry {
            ps: PointSet::new(self.dim, capacity),
            index: VpIndex::new(),
            field: ScalarField::new(FieldKernel::Gaussian, 1.0),
            history: History::new(),
        });
        log::debug!("pointset {} created, capacity {capacity}", id.0);
        id
    }

    pub(crate) fn set(&self, id: PointSetId) -> Option<&SetEntry> {
        self.sets.get(id.0)
    }

    pub(crate) fn set_mut(&mut self, id: PointSetId) -> Option<&mut SetEntry> {
        self.sets.get_mut(id.0)
    }

    /// Read access to a registered point set.
    #[must_use]
    pub fn pointset(&self, id: PointSetId) -> Option<&PointSet> {
        self.set(id).map(|s| &s.ps)
    }

    /// Marks every renderer bound to `id` fully dirty.
    ///
    /// Called after mutations the renderer cannot observe through the
    /// point set's own dirty flags (visibility, structure, undo).
    pub(crate) fn invalidate_renderers(&mut self, id: PointSetId) {
        for entry in &mut self.renderers {
            if entry.ps == id {
                entry.renderer.mark_all_dirty();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_installs_a_main_lens() {
        let engine = Engine::new(2);
        assert_eq!(engine.dim(), 2);
        assert!(engine.lenses.contains_key("main"));
    }

    #[test]
    fn dimension_is_clamped_to_at_least_two() {
        let engine = Engine::new(0);
        assert_eq!(engine.dim(), 2);
    }

    #[test]
    fn begin_frame_resets_the_arena() {
        let mut engine = Engine::new(2);
        let handle = engine.arena().alloc(128);
        assert_eq!(engine.arena().get(handle).len(), 128);
        engine.begin_frame();
        assert_eq!(engine.arena().allocated(), 0);
    }
}
