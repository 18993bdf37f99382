// Copyright 2026 the Reactive Graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The three node variants and their type-erased dispatch surface.
//!
//! The arena stores a single homogeneous `NodeSlot` per node; polymorphic
//! behavior (read value, recompute, run) is dispatched through a small
//! vtable (`ErasedSource`/`ErasedDerived`/`ErasedWatcher`) rather than a
//! heterogeneous hash container, keeping the hot edge-walking path
//! monomorphic over `NodeSlot` itself.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::arena::EdgeId;
use crate::error::{EngineError, panic_to_error};
use crate::version::{Status, Version};

/// Cleanup callback captured from a watcher's previous run.
pub(crate) type CleanupFn = Box<dyn FnOnce()>;

pub(crate) trait ErasedSource {
    fn version(&self) -> Version;
    fn value_any(&self) -> &dyn Any;
    /// Attempts to overwrite the value; returns `true` if it changed
    /// under the node's equality predicate (and thus bumped version).
    fn write_any(&mut self, new_value: Box<dyn Any>) -> bool;
}

pub(crate) struct SourceNode<T> {
    value: T,
    version: Version,
    eq: Box<dyn Fn(&T, &T) -> bool>,
}

impl<T: 'static> SourceNode<T> {
    pub(crate) fn new(value: T, eq: Box<dyn Fn(&T, &T) -> bool>) -> Self {
        Self {
            value,
            version: Version::ZERO,
            eq,
        }
    }
}

impl<T: 'static> ErasedSource for SourceNode<T> {
    fn version(&self) -> Version {
        self.version
    }

    fn value_any(&self) -> &dyn Any {
        &self.value
    }

    fn write_any(&mut self, new_value: Box<dyn Any>) -> bool {
        let new_value = *new_value
            .downcast::<T>()
            .unwrap_or_else(|_| panic!("signal value type mismatch"));
        if (self.eq)(&self.value, &new_value) {
            false
        } else {
            self.value = new_value;
            self.version.bump();
            true
        }
    }
}

pub(crate) trait ErasedDerived {
    fn status(&self) -> Status;
    fn set_status(&mut self, status: Status);
    fn version(&self) -> Version;
    /// Panics if called before the first successful recompute; callers
    /// must ensure the node has been validated first.
    fn value_any(&self) -> &dyn Any;
    /// Invokes the compute closure and applies the equality predicate,
    /// bumping `version` iff the output changed. Never touches the
    /// engine: dependency tracking happens around this call, not inside
    /// it.
    fn recompute(&mut self) -> Result<bool, EngineError>;
}

pub(crate) struct DerivedNode<T, F, Eq> {
    value: Option<T>,
    compute: F,
    eq: Eq,
    version: Version,
    status: Status,
}

impl<T, F, Eq> DerivedNode<T, F, Eq> {
    pub(crate) fn new(compute: F, eq: Eq) -> Self {
        Self {
            value: None,
            compute,
            eq,
            version: Version::ZERO,
            status: Status::Dirty,
        }
    }
}

impl<T, F, Eq> ErasedDerived for DerivedNode<T, F, Eq>
where
    T: 'static,
    F: FnMut() -> T,
    Eq: Fn(&T, &T) -> bool,
{
    fn status(&self) -> Status {
        self.status
    }

    fn set_status(&mut self, status: Status) {
        self.status = status;
    }

    fn version(&self) -> Version {
        self.version
    }

    fn value_any(&self) -> &dyn Any {
        self.value
            .as_ref()
            .expect("derived read before its first validation")
    }

    fn recompute(&mut self) -> Result<bool, EngineError> {
        let new_value =
            catch_unwind(AssertUnwindSafe(|| (self.compute)())).map_err(panic_to_error)?;
        let changed = match &self.value {
            Some(old) if (self.eq)(old, &new_value) => false,
            _ => true,
        };
        if changed {
            self.value = Some(new_value);
            self.version.bump();
        }
        Ok(changed)
    }
}

pub(crate) trait ErasedWatcher {
    fn disposed(&self) -> bool;
    fn set_disposed(&mut self, disposed: bool);
    fn scheduled(&self) -> bool;
    fn set_scheduled(&mut self, scheduled: bool);
    /// Invokes any pending cleanup from the previous run, untracked.
    fn run_cleanup(&mut self);
    /// Invokes the watcher body, capturing its return value as the next
    /// cleanup.
    fn run_body(&mut self) -> Result<(), EngineError>;
}

pub(crate) struct WatcherNode<F> {
    body: F,
    cleanup: Option<CleanupFn>,
    disposed: bool,
    scheduled: bool,
}

impl<F> WatcherNode<F> {
    pub(crate) fn new(body: F) -> Self {
        Self {
            body,
            cleanup: None,
            disposed: false,
            scheduled: false,
        }
    }
}

impl<F, C> ErasedWatcher for WatcherNode<F>
where
    F: FnMut() -> Option<C>,
    C: FnOnce() + 'static,
{
    fn disposed(&self) -> bool {
        self.disposed
    }

    fn set_disposed(&mut self, disposed: bool) {
        self.disposed = disposed;
    }

    fn scheduled(&self) -> bool {
        self.scheduled
    }

    fn set_scheduled(&mut self, scheduled: bool) {
        self.scheduled = scheduled;
    }

    fn run_cleanup(&mut self) {
        if let Some(cleanup) = self.cleanup.take() {
            // A cleanup panic has no `EffectRun` to attach to (it isn't
            // itself a run); swallow it rather than letting it unwind
            // through the engine borrow above this call.
            let _ = catch_unwind(AssertUnwindSafe(cleanup));
        }
    }

    fn run_body(&mut self) -> Result<(), EngineError> {
        let cleanup = catch_unwind(AssertUnwindSafe(|| (self.body)())).map_err(panic_to_error)?;
        self.cleanup = cleanup.map(|c| Box::new(c) as CleanupFn);
        Ok(())
    }
}

/// The payload of a node, or a placeholder while its closure is running
/// outside the engine borrow (see `engine::with_current`).
pub(crate) enum NodePayload {
    Source(Box<dyn ErasedSource>),
    Derived(Box<dyn ErasedDerived>),
    Watcher(Box<dyn ErasedWatcher>),
    /// Temporarily vacated so the boxed closure can run without holding
    /// the thread-local engine borrow across reentrant calls.
    Taken,
}

/// One arena slot: the node's payload plus its intrusive adjacency list
/// heads.
pub(crate) struct NodeSlot {
    pub(crate) payload: NodePayload,
    pub(crate) outgoing_head: Option<EdgeId>,
    pub(crate) incoming_head: Option<EdgeId>,
}

impl NodeSlot {
    pub(crate) fn new(payload: NodePayload) -> Self {
        Self {
            payload,
            outgoing_head: None,
            incoming_head: None,
        }
    }

    pub(crate) fn has_live_edges(&self) -> bool {
        self.outgoing_head.is_some() || self.incoming_head.is_some()
    }
}
