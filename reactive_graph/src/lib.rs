// Copyright 2026 the Reactive Graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A glitch-free, push/pull hybrid incremental dataflow engine.
//!
//! Three kinds of node:
//!
//! - [`Signal<T>`]: a mutable leaf value. Writing it is the only thing
//!   that can start a propagation.
//! - [`Computed<T>`]: a memoized derivation, re-run only when a read
//!   observes it might be stale and its upstream turns out to have
//!   actually changed.
//! - watchers, created with [`effect`]: a side-effecting body re-run
//!   once per batch in which one of its dependencies changed.
//!
//! Dependencies are discovered dynamically: a `Computed` or effect body
//! depends on exactly whatever it read the last time it ran, so a
//! branch not taken this run is not a dependency this run (see
//! [`tracker`]). All of this lives behind a thread-local engine — every
//! node handle ([`Signal`], [`Computed`], [`EffectHandle`]) is only
//! valid on the thread that created it.
//!
//! ```
//! use reactive_graph::{signal, computed, effect};
//!
//! let count = signal(1);
//! let doubled = computed({
//!     let count = count;
//!     move || count.get() * 2
//! });
//! assert_eq!(doubled.get(), 2);
//! count.set(5);
//! assert_eq!(doubled.get(), 10);
//! ```

mod arena;
mod edge;
mod effect;
mod engine;
mod error;
mod graph;
mod limits;
mod node;
mod pull;
mod push;
pub mod report;
mod scheduler;
pub mod trace;
mod tracker;
mod tracking;
mod version;

use std::marker::PhantomData;

use engine::Engine;

pub use arena::NodeId;
pub use engine::{edge_count, node_count};
pub use error::EngineError;
pub use limits::{Limits, RecursionStrategy};
pub use report::{BatchReport, EffectOutcome, EffectRun};
pub use version::{Status, Version};

/// A mutable leaf node. Cheap to copy; all clones refer to the same
/// underlying node.
pub struct Signal<T> {
    id: NodeId,
    _marker: PhantomData<T>,
}

impl<T> Copy for Signal<T> {}
impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        *self
    }
}

/// Creates a new signal holding `value`, using `PartialEq` to decide
/// whether a write actually changes it.
#[must_use]
pub fn signal<T: PartialEq + 'static>(value: T) -> Signal<T> {
    signal_with_eq(value, |a: &T, b: &T| a == b)
}

/// Creates a new signal with a custom equality predicate, for values
/// that are not (or should not be compared via) `PartialEq` — e.g.
/// treating every write as a change regardless of content.
#[must_use]
pub fn signal_with_eq<T: 'static>(value: T, eq: impl Fn(&T, &T) -> bool + 'static) -> Signal<T> {
    let id = Engine::with_current(|e| e.allocate_source(value, Box::new(eq)));
    Signal {
        id,
        _marker: PhantomData,
    }
}

impl<T: Clone + 'static> Signal<T> {
    /// Returns the current value, registering a dependency if called
    /// during a `Computed` or effect evaluation.
    ///
    /// # Panics
    /// Panics if the signal has been disposed. Use [`Signal::try_get`]
    /// to handle that instead.
    #[must_use]
    pub fn get(&self) -> T {
        self.try_get().expect("signal read failed")
    }

    /// Fallible version of [`Signal::get`].
    pub fn try_get(&self) -> Result<T, EngineError> {
        Engine::with_current(|e| {
            e.check_poisoned()?;
            let version = e.source_version(self.id)?;
            e.track_current(self.id, version);
            e.source_value(self.id)
        })
    }

    /// Reads the current value without registering a dependency, even
    /// if called during an evaluation.
    #[must_use]
    pub fn peek(&self) -> T {
        untracked(|| self.get())
    }
}

impl<T: PartialEq + 'static> Signal<T> {
    /// Writes a new value. A no-op (no propagation) if the new value
    /// compares equal to the current one.
    ///
    /// # Panics
    /// Panics if the signal has been disposed. Use [`Signal::try_set`]
    /// to handle that instead.
    pub fn set(&self, value: T) {
        self.try_set(value).expect("signal write failed");
    }

    /// Fallible version of [`Signal::set`].
    pub fn try_set(&self, value: T) -> Result<(), EngineError> {
        batch(|| {
            Engine::with_current(|e| {
                e.check_poisoned()?;
                let changed = e.write_source(self.id, value)?;
                if changed {
                    push::invalidate_from_write(e, self.id);
                }
                Ok(())
            })
        })
    }
}

/// A memoized derivation. Cheap to copy; all clones refer to the same
/// underlying node.
pub struct Computed<T> {
    id: NodeId,
    _marker: PhantomData<T>,
}

impl<T> Copy for Computed<T> {}
impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        *self
    }
}

/// Creates a memoized derivation, using `PartialEq` on the output to
/// decide whether a recompute actually changed anything (and so whether
/// it should propagate further).
#[must_use]
pub fn computed<T, F>(f: F) -> Computed<T>
where
    T: PartialEq + 'static,
    F: FnMut() -> T + 'static,
{
    computed_with_eq(f, |a: &T, b: &T| a == b)
}

/// Creates a memoized derivation with a custom equality predicate, for
/// output types that are not `PartialEq` (or for which identity rather
/// than value equality is the right notion of "changed") — e.g. `|_,
/// _| false` to always propagate.
#[must_use]
pub fn computed_with_eq<T, F, Eq>(f: F, eq: Eq) -> Computed<T>
where
    T: 'static,
    F: FnMut() -> T + 'static,
    Eq: Fn(&T, &T) -> bool + 'static,
{
    let id = Engine::with_current(|e| e.allocate_derived(f, eq));
    Computed {
        id,
        _marker: PhantomData,
    }
}

impl<T: Clone + 'static> Computed<T> {
    /// Returns the up-to-date value, revalidating (and, if needed,
    /// recomputing) it first. Registers a dependency if called during
    /// another `Computed` or effect evaluation.
    ///
    /// # Panics
    /// Panics on a disposed node, a dependency cycle, or a propagated
    /// compute-closure error. Use [`Computed::try_get`] to handle those.
    #[must_use]
    pub fn get(&self) -> T {
        self.try_get().expect("computed read failed")
    }

    /// Fallible version of [`Computed::get`].
    pub fn try_get(&self) -> Result<T, EngineError> {
        pull::validate(self.id)?;
        Engine::with_current(|e| {
            e.check_poisoned()?;
            let version = e.derived_version(self.id)?;
            e.track_current(self.id, version);
            e.derived_value(self.id)
        })
    }

    /// Reads the up-to-date value without registering a dependency,
    /// even if called during an evaluation. Still revalidates.
    #[must_use]
    pub fn peek(&self) -> T {
        untracked(|| self.get())
    }
}

/// A disposable handle to a running effect.
pub struct EffectHandle {
    id: NodeId,
}

impl EffectHandle {
    /// Runs the effect's final cleanup (if any) and unlinks its
    /// dependencies so it never runs again. Idempotent.
    pub fn dispose(&self) {
        effect::dispose(self.id);
    }
}

/// Registers a side-effecting body, running it once immediately under
/// dependency tracking. `f` may return a cleanup closure, which runs
/// right before the next run (or on [`EffectHandle::dispose`]).
///
/// Any writes `f` performs are themselves batched; if they in turn
/// schedule other watchers, those run before this call returns (or, if
/// called from inside an outer [`batch`], once that outer batch ends).
pub fn effect<F, C>(f: F) -> EffectHandle
where
    F: FnMut() -> Option<C> + 'static,
    C: FnOnce() + 'static,
{
    let id = Engine::with_current(|e| e.allocate_watcher(f));
    // A `UserClosureError` on the very first run is swallowed the same
    // way a later queued run's error is: left for the caller to notice
    // via a later `batch_with_report`, rather than making registration
    // itself fallible.
    let _ = effect::run_watcher(id);
    EffectHandle { id }
}

/// Defers propagation until `f` returns: writes inside `f` invalidate
/// their consumers immediately, but scheduled watchers only run once
/// the outermost `batch` call completes. Nested calls flatten — only
/// the outermost drains.
///
/// A bare write outside of any `batch` behaves as if wrapped in its own
/// single-write batch.
pub fn batch<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    Engine::with_current(Engine::start_batch);
    let result = f();
    let should_drain = Engine::with_current(Engine::end_batch_should_drain);
    if should_drain {
        effect::drain_queue();
    }
    result
}

/// Like [`batch`], but returns the drain's [`BatchReport`] alongside
/// `f`'s result. If `f` runs inside an already-open outer `batch`, no
/// drain happens here and the returned report is empty — the outer
/// `batch`/`batch_with_report` call is the one that actually drains.
pub fn batch_with_report<F, R>(f: F) -> (R, BatchReport)
where
    F: FnOnce() -> R,
{
    Engine::with_current(Engine::start_batch);
    let result = f();
    let should_drain = Engine::with_current(Engine::end_batch_should_drain);
    let report = if should_drain {
        effect::drain_queue()
    } else {
        BatchReport::default()
    };
    (result, report)
}

/// Replaces the calling thread's engine configuration. Must be called
/// before any signal, computed, or effect is created on this thread;
/// existing nodes (there should be none) are dropped.
pub fn configure(limits: Limits) {
    Engine::configure(limits);
}

/// Runs `f` without registering any reads it performs as dependencies
/// of the currently evaluating `Computed` or effect, even if `f` itself
/// reads signals or computeds. Safe to nest.
pub fn untracked<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    Engine::with_current(Engine::enter_untracked);
    let result = f();
    Engine::with_current(Engine::exit_untracked);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn computed_tracks_and_memoizes() {
        let a = signal(1);
        let recomputes = std::rc::Rc::new(std::cell::RefCell::new(0));
        let doubled = computed({
            let recomputes = recomputes.clone();
            move || {
                *recomputes.borrow_mut() += 1;
                a.get() * 2
            }
        });
        assert_eq!(doubled.get(), 2);
        assert_eq!(doubled.get(), 2);
        assert_eq!(*recomputes.borrow(), 1, "a second read with nothing changed must not recompute");
        a.set(5);
        assert_eq!(doubled.get(), 10);
        assert_eq!(*recomputes.borrow(), 2);
    }

    #[test]
    fn diamond_dependency_runs_watcher_once_per_batch() {
        let a = signal(1);
        let b = computed(move || a.get() + 1);
        let c = computed(move || a.get() * 10);
        let sum = computed(move || b.get() + c.get());
        assert_eq!(sum.get(), 2 + 10);
        a.set(2);
        assert_eq!(sum.get(), 3 + 20);
    }

    #[test]
    fn conditional_dependency_drops_untaken_branch() {
        let flag = signal(true);
        let a = signal(1);
        let b = signal(100);
        let out = computed(move || if flag.get() { a.get() } else { b.get() });
        assert_eq!(out.get(), 1);
        flag.set(false);
        assert_eq!(out.get(), 100);
        // `a` is no longer a dependency: changing it must not affect `out`.
        a.set(999);
        assert_eq!(out.get(), 100);
    }

    #[test]
    fn effect_reruns_on_dependency_change_and_cleans_up() {
        let count = signal(0);
        let log = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let handle = effect({
            let log = log.clone();
            move || {
                log.borrow_mut().push(count.get());
                let log = log.clone();
                Some(move || log.borrow_mut().push(-1))
            }
        });
        assert_eq!(*log.borrow(), vec![0]);
        count.set(1);
        assert_eq!(*log.borrow(), vec![0, -1, 1]);
        handle.dispose();
        count.set(2);
        assert_eq!(*log.borrow(), vec![0, -1, 1, -1]);
    }

    #[test]
    fn untracked_read_does_not_create_dependency() {
        let a = signal(1);
        let b = signal(10);
        let out = computed(move || a.get() + untracked(|| b.get()));
        assert_eq!(out.get(), 11);
        b.set(20);
        assert_eq!(out.get(), 11);
        a.set(2);
        assert_eq!(out.get(), 22);
    }

    #[test]
    fn batch_defers_effect_until_outermost_end() {
        let a = signal(1);
        let b = signal(10);
        let runs = std::rc::Rc::new(std::cell::RefCell::new(0));
        let _handle = effect({
            let runs = runs.clone();
            move || {
                let _ = a.get() + b.get();
                *runs.borrow_mut() += 1;
                None::<fn()>
            }
        });
        assert_eq!(*runs.borrow(), 1);
        batch(|| {
            a.set(2);
            b.set(20);
        });
        assert_eq!(*runs.borrow(), 2);
    }
}
