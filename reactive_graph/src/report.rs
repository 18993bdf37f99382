// Copyright 2026 the Reactive Graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Structured reporting for a batch drain, for callers that want
//! observability into what an update actually did without threading
//! their own counters through effect bodies.

use crate::arena::NodeId;
use crate::error::EngineError;

/// What happened to one watcher during a batch drain.
#[derive(Debug)]
pub enum EffectOutcome {
    /// The watcher's body ran to completion.
    Ran,
    /// The watcher's body raised (panicked). It is not automatically
    /// retried — it only runs again the next time one of its tracked
    /// dependencies actually changes — but the error is surfaced here
    /// rather than aborting the rest of the drain.
    Errored(EngineError),
}

/// Per-watcher record for a single drain, keyed by the order each
/// watcher actually ran in (which may interleave with watchers
/// newly scheduled mid-drain).
#[derive(Debug)]
pub struct EffectRun {
    /// The watcher that ran.
    pub watcher: NodeId,
    /// What happened.
    pub outcome: EffectOutcome,
}

/// Summary of one batch's drain: every watcher that ran (or failed) as
/// a result of the batch's writes.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Every watcher run triggered by this drain, in run order.
    pub runs: Vec<EffectRun>,
}

impl BatchReport {
    #[must_use]
    pub fn errors(&self) -> impl Iterator<Item = &EngineError> {
        self.runs.iter().filter_map(|r| match &r.outcome {
            EffectOutcome::Errored(e) => Some(e),
            EffectOutcome::Ran => None,
        })
    }

    #[must_use]
    pub fn had_errors(&self) -> bool {
        self.runs
            .iter()
            .any(|r| matches!(r.outcome, EffectOutcome::Errored(_)))
    }
}
