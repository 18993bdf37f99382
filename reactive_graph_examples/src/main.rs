// Copyright 2026 the Reactive Graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Small runnable demonstrations of `reactive_graph`. Run with
//! `cargo run -p reactive_graph_examples`.

use reactive_graph::{batch, computed, effect, signal};

fn main() {
    diamond_dependency();
    batching();
    cleanup_on_rerun();
}

/// Two computeds derived from one signal, joined by a single effect.
/// The effect only ever sees one consistent write per `a.set`, never a
/// torn intermediate state.
fn diamond_dependency() {
    let a = signal(1);
    let b = computed(move || a.get() + 1);
    let c = computed(move || a.get() * 10);
    let _watch = effect(move || {
        println!("sum = {}", b.get() + c.get());
        None::<fn()>
    });

    a.set(2);
    a.set(3);
}

/// Several writes inside `batch` collapse into one effect run.
fn batching() {
    let count = signal(0);
    let _watch = effect(move || {
        println!("count = {}", count.get());
        None::<fn()>
    });

    batch(|| {
        count.set(1);
        count.set(2);
        count.set(3);
    });
}

/// An effect's return value is a cleanup closure run before its next
/// invocation (and on dispose).
fn cleanup_on_rerun() {
    let resource = signal("a");
    let _watch = effect(move || {
        let name = resource.get();
        println!("opening {name}");
        Some(move || println!("closing {name}"))
    });

    resource.set("b");
}
