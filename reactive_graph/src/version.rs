// Copyright 2026 the Reactive Graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Version counters and freshness status for graph nodes.

/// Monotonically increasing value-epoch counter.
///
/// Equal versions imply equal values: a producer that writes (or
/// recomputes to) the same value under its equality predicate does not
/// bump its version, and consumers rely on that to short-circuit
/// revalidation.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version(u64);

impl Version {
    /// The version assigned to a freshly allocated node.
    pub const ZERO: Self = Self(0);

    /// Returns the raw counter value.
    #[must_use]
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }

    #[inline]
    pub(crate) fn bump(&mut self) {
        self.0 = self.0.wrapping_add(1);
    }
}

/// A consumer's freshness knowledge about its inputs.
///
/// Writers transition direct consumers `Clean -> Dirty` and transitive
/// consumers `Clean -> Pending`. Readers transition `Dirty -> Clean`
/// (after recompute) or `Pending -> Clean` (after an upstream scan
/// finds no real change).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Status {
    /// Cached value is known consistent with current inputs.
    Clean,
    /// Some transitive upstream may have changed; must be revalidated
    /// before reuse, but may turn out unchanged (short-circuit).
    Pending,
    /// A direct input is known to have changed; must recompute before
    /// reuse.
    Dirty,
}

impl Status {
    /// Returns `true` if no revalidation work is required.
    #[must_use]
    #[inline]
    pub const fn is_clean(self) -> bool {
        matches!(self, Self::Clean)
    }
}
