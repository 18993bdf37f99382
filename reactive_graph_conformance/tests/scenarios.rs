// Copyright 2026 the Reactive Graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end scenario and invariant coverage for propagation
//! semantics that cross several `reactive_graph` modules at once —
//! the kind of test that would be awkward to place inside any single
//! module's own `#[cfg(test)]` block.

use std::cell::RefCell;
use std::rc::Rc;

use reactive_graph::{batch, computed, computed_with_eq, effect, signal, untracked, EngineError};

#[test]
fn diamond_dependency_is_glitch_free() {
    // a -> b, a -> c, (b, c) -> sum. A naive push-only implementation
    // can run `sum`'s effect twice per write to `a` (once after `b`
    // updates, once after `c` does) and can observe a torn
    // intermediate state (`b` new, `c` old) in between. This engine's
    // pull-validation at read time means `sum` only ever sees both
    // inputs at the same write's version.
    let a = signal(1);
    let b = computed(move || a.get() + 1);
    let c = computed(move || a.get() * 10);
    let observed = Rc::new(RefCell::new(Vec::new()));
    let _watch = effect({
        let observed = observed.clone();
        move || {
            observed.borrow_mut().push(b.get() + c.get());
            None::<fn()>
        }
    });
    assert_eq!(*observed.borrow(), vec![2 + 10]);

    a.set(2);
    // Exactly one more observation, reflecting a single consistent
    // write, not an intermediate b-updated/c-stale (or vice versa) state.
    assert_eq!(*observed.borrow(), vec![12, 3 + 20]);
}

#[test]
fn conditional_dependency_is_pruned_after_not_being_read() {
    let flag = signal(true);
    let left = signal("left");
    let right = signal("right");
    let mut recomputes = 0;
    let picked = computed_with_eq(
        move || {
            recomputes += 1;
            if flag.get() { left.get() } else { right.get() }
        },
        |a: &&str, b: &&str| a == b,
    );

    assert_eq!(picked.get(), "left");
    flag.set(false);
    assert_eq!(picked.get(), "right");

    // `left` is no longer a dependency of `picked`: writing it must not
    // invalidate `picked`, i.e. reading it again should not recompute.
    left.set("left-changed");
    assert_eq!(picked.get(), "right");
}

#[test]
fn unchanged_recompute_does_not_propagate_further() {
    // A -> B(|x| x.abs()) -> effect. Flipping A's sign changes A but not
    // B's output, so the effect must not rerun.
    let a = signal(-3);
    let abs = computed(move || a.get().abs());
    let runs = Rc::new(RefCell::new(0));
    let _watch = effect({
        let runs = runs.clone();
        move || {
            let _ = abs.get();
            *runs.borrow_mut() += 1;
            None::<fn()>
        }
    });
    assert_eq!(*runs.borrow(), 1);

    a.set(3);
    assert_eq!(*runs.borrow(), 1, "abs(3) == abs(-3), effect must not rerun");

    a.set(4);
    assert_eq!(*runs.borrow(), 2);
}

#[test]
fn batch_coalesces_multiple_writes_into_one_effect_run() {
    let a = signal(1);
    let b = signal(10);
    let runs = Rc::new(RefCell::new(0));
    let _watch = effect({
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
        a.set(3);
    });
    assert_eq!(*runs.borrow(), 2, "one drain for the whole batch, not per write");
}

#[test]
fn nested_batches_flatten_to_a_single_drain() {
    let a = signal(1);
    let runs = Rc::new(RefCell::new(0));
    let _watch = effect({
        let runs = runs.clone();
        move || {
            let _ = a.get();
            *runs.borrow_mut() += 1;
            None::<fn()>
        }
    });
    assert_eq!(*runs.borrow(), 1);

    batch(|| {
        batch(|| {
            a.set(2);
        });
        // Inner batch must not have drained yet.
        assert_eq!(*runs.borrow(), 1);
        a.set(3);
    });
    assert_eq!(*runs.borrow(), 2);
}

#[test]
fn self_reference_is_a_reported_cycle_not_a_stack_overflow() {
    let a = signal(1);
    // `bad` reads its own handle through a `RefCell` indirection so it
    // can be constructed before being assigned into its own closure.
    let bad: Rc<RefCell<Option<reactive_graph::Computed<i32>>>> = Rc::new(RefCell::new(None));
    let bad_for_closure = bad.clone();
    let node = computed(move || {
        let self_handle = *bad_for_closure.borrow();
        a.get() + self_handle.map(|c| c.get()).unwrap_or(0)
    });
    *bad.borrow_mut() = Some(node);

    match node.try_get() {
        Err(EngineError::CycleError { .. }) => {}
        other => panic!("expected a cycle error, got {other:?}"),
    }
}

#[test]
fn disposed_effect_stops_running_and_cleanup_fires_once() {
    let a = signal(1);
    let cleanups = Rc::new(RefCell::new(0));
    let handle = effect({
        let cleanups = cleanups.clone();
        move || {
            let _ = a.get();
            let cleanups = cleanups.clone();
            Some(move || *cleanups.borrow_mut() += 1)
        }
    });
    a.set(2);
    assert_eq!(*cleanups.borrow(), 1, "cleanup from the first run fired before the second");

    handle.dispose();
    assert_eq!(*cleanups.borrow(), 2, "dispose runs the last run's cleanup");

    a.set(3);
    assert_eq!(*cleanups.borrow(), 2, "disposed effect must not run again");
}

#[test]
fn deep_chain_write_of_the_existing_value_recomputes_nothing() {
    // a -> c1 -> c2 -> ... -> c50, each ci = c_{i-1}, effect reads c50.
    // Writing a's already-current value must not recompute a single
    // node in the chain, at any depth, let alone rerun the effect.
    const DEPTH: usize = 50;
    let a = signal(0);
    let counters: Vec<Rc<RefCell<u32>>> = (0..DEPTH).map(|_| Rc::new(RefCell::new(0))).collect();

    let mut tail = {
        let counter = counters[0].clone();
        computed(move || {
            *counter.borrow_mut() += 1;
            a.get()
        })
    };
    for counter in counters.iter().take(DEPTH).skip(1) {
        let upstream = tail;
        let counter = counter.clone();
        tail = computed(move || {
            *counter.borrow_mut() += 1;
            upstream.get()
        });
    }

    let effect_runs = Rc::new(RefCell::new(0));
    let _watch = effect({
        let effect_runs = effect_runs.clone();
        move || {
            let _ = tail.get();
            *effect_runs.borrow_mut() += 1;
            None::<fn()>
        }
    });

    // The effect's first run pulls every node in the chain exactly once.
    for counter in &counters {
        assert_eq!(*counter.borrow(), 1);
    }
    assert_eq!(*effect_runs.borrow(), 1);

    a.set(0);

    for (depth, counter) in counters.iter().enumerate() {
        assert_eq!(
            *counter.borrow(),
            1,
            "node at depth {depth} recomputed after a same-value write"
        );
    }
    assert_eq!(*effect_runs.borrow(), 1, "effect must not rerun after a same-value write");
}

#[test]
fn untracked_read_inside_an_effect_does_not_subscribe() {
    let trigger = signal(0);
    let silent = signal(100);
    let runs = Rc::new(RefCell::new(0));
    let seen = Rc::new(RefCell::new(0));
    let _watch = effect({
        let runs = runs.clone();
        let seen = seen.clone();
        move || {
            *runs.borrow_mut() += 1;
            let _ = trigger.get();
            *seen.borrow_mut() = untracked(|| silent.get());
            None::<fn()>
        }
    });
    assert_eq!(*runs.borrow(), 1);
    assert_eq!(*seen.borrow(), 100);

    silent.set(200);
    assert_eq!(*runs.borrow(), 1, "untracked read must not create a dependency");

    trigger.set(1);
    assert_eq!(*runs.borrow(), 2);
    assert_eq!(*seen.borrow(), 200, "the untracked read still sees the live value when it does run");
}
