// Copyright 2026 the Reactive Graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error taxonomy for the dataflow engine.

use std::error::Error as StdError;
use std::fmt;

use crate::arena::NodeId;

/// Errors the engine can surface to a caller.
#[derive(Debug)]
pub enum EngineError {
    /// A user-provided compute or effect closure panicked-equivalent
    /// (returned an error). The offending node was marked `Dirty` so a
    /// later read retries it.
    UserClosureError(Box<dyn StdError + Send + Sync>),
    /// The node being evaluated is already on the observer stack: a
    /// dependency cycle.
    CycleError {
        /// The node at which the cycle was detected.
        node: NodeId,
    },
    /// A read or write targeted a node that has been disposed.
    DisposedError {
        /// The disposed node.
        node: NodeId,
    },
    /// An internal invariant failed (e.g. a dangling edge). The owning
    /// engine is poisoned and must not be used further.
    InvariantViolation(&'static str),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserClosureError(e) => write!(f, "user closure error: {e}"),
            Self::CycleError { node } => write!(f, "dependency cycle detected at {node:?}"),
            Self::DisposedError { node } => write!(f, "operation on disposed node {node:?}"),
            Self::InvariantViolation(msg) => write!(f, "internal invariant violated: {msg}"),
        }
    }
}

impl StdError for EngineError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::UserClosureError(e) => Some(e.as_ref()),
            Self::CycleError { .. } | Self::DisposedError { .. } | Self::InvariantViolation(_) => {
                None
            }
        }
    }
}

impl EngineError {
    #[inline]
    pub(crate) fn user_closure(e: impl StdError + Send + Sync + 'static) -> Self {
        Self::UserClosureError(Box::new(e))
    }
}

/// Adapter so arbitrary closures can report a boxed error without
/// pulling in a derive-macro crate (matches the rest of the core's
/// hand-rolled error style).
#[derive(Debug)]
pub(crate) struct ClosureError(pub(crate) String);

impl fmt::Display for ClosureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl StdError for ClosureError {}

/// Converts a caught panic payload from a user compute/effect closure
/// into a [`EngineError::UserClosureError`]. A closure has no way to
/// return an error from the middle of an arbitrary expression, so a
/// panic crossing `catch_unwind` is what this engine treats as a failed
/// compute or effect body.
pub(crate) fn panic_to_error(payload: Box<dyn std::any::Any + Send>) -> EngineError {
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "closure panicked with a non-string payload".to_string()
    };
    EngineError::user_closure(ClosureError(message))
}
