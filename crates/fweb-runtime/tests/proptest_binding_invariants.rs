//! Property-based invariant tests for the binding graph.
//!
//! 1. A write over an arbitrary graph (cycles included) terminates and
//!    notifies every observable at most once.
//! 2. With identity links, every vertex reachable from the written one ends
//!    with the written value; unreachable vertices keep theirs.
//! 3. The written observable is never re-triggered by its own pass.
//! 4. After `remove`, no link references a removed object and the remaining
//!    links are untouched.
//! 5. Refresh passes over unchanged polled sources propagate nothing.

use std::cell::Cell;
use std::collections::{BTreeSet, VecDeque};
use std::rc::Rc;

use fweb_runtime::reactive::{
    Observable, RefreshConfig, Subscription, ValueMap, bind_to, links_of, refresh_step, remove,
    reset, stats,
};
use proptest::prelude::*;
use serde_json::json;

// ── Helpers ──────────────────────────────────────────────────────────

fn arb_graph() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
    (2usize..8).prop_flat_map(|n| {
        let edges = proptest::collection::vec((0..n, 0..n), 0..(n * 3))
            .prop_map(|edges| edges.into_iter().filter(|(a, b)| a != b).collect::<Vec<_>>());
        (Just(n), edges)
    })
}

struct Net {
    nodes: Vec<Observable<i64>>,
    writes: Vec<Rc<Cell<u32>>>,
    _subs: Vec<Subscription>,
}

fn build(n: usize, edges: &[(usize, usize)]) -> Net {
    reset();
    let nodes: Vec<_> = (0..n).map(|i| Observable::new(i as i64)).collect();
    let writes: Vec<_> = (0..n).map(|_| Rc::new(Cell::new(0u32))).collect();
    let subs = nodes
        .iter()
        .zip(&writes)
        .map(|(node, counter)| {
            let counter = Rc::clone(counter);
            node.subscribe(move |_| counter.set(counter.get() + 1))
        })
        .collect();
    for &(a, b) in edges {
        bind_to(&nodes[a], "value", &nodes[b], "value", None);
    }
    for counter in &writes {
        counter.set(0);
    }
    Net {
        nodes,
        writes,
        _subs: subs,
    }
}

fn reachable(n: usize, edges: &[(usize, usize)], from: usize) -> BTreeSet<usize> {
    let mut seen = BTreeSet::from([from]);
    let mut queue = VecDeque::from([from]);
    while let Some(v) = queue.pop_front() {
        for &(a, b) in edges {
            if a == v && b < n && seen.insert(b) {
                queue.push_back(b);
            }
        }
    }
    seen
}

// ═════════════════════════════════════════════════════════════════════════
// 1–3. Termination, at-most-once, reachability
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn write_terminates_and_reaches_exactly_the_reachable_set(
        (n, edges) in arb_graph(),
        pick in any::<prop::sample::Index>(),
    ) {
        let net = build(n, &edges);
        let before: Vec<i64> = net.nodes.iter().map(Observable::get).collect();
        let origin = pick.index(n);
        net.nodes[origin].set(1_000);

        let reach = reachable(n, &edges, origin);
        for (i, node) in net.nodes.iter().enumerate() {
            prop_assert!(net.writes[i].get() <= 1, "node {} written {} times", i, net.writes[i].get());
            if reach.contains(&i) {
                prop_assert_eq!(node.get(), 1_000);
            } else {
                prop_assert_eq!(node.get(), before[i]);
            }
        }
        prop_assert_eq!(net.writes[origin].get(), 1);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Teardown completeness
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn remove_clears_every_link_of_removed_objects(
        (n, edges) in arb_graph(),
        doomed in proptest::collection::btree_set(0usize..8, 0..4),
    ) {
        let net = build(n, &edges);
        let doomed: BTreeSet<usize> = doomed.into_iter().filter(|i| *i < n).collect();
        let survivors = edges
            .iter()
            .filter(|(a, b)| !doomed.contains(a) && !doomed.contains(b))
            .count();

        remove(doomed.iter().map(|i| net.nodes[*i].object_id()));

        for i in &doomed {
            prop_assert!(links_of(net.nodes[*i].object_id()).is_empty());
        }
        prop_assert_eq!(stats().links, survivors);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Quiet refresh
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn unchanged_polled_sources_are_quiet(keys in proptest::collection::vec("[a-d]", 1..6)) {
        reset();
        let map = ValueMap::new();
        let sinks: Vec<_> = keys
            .iter()
            .enumerate()
            .map(|(i, key)| {
                map.insert(key.clone(), json!(i));
                let sink = Observable::new(-1i64);
                bind_to(&map, key, &sink, "value", None);
                sink
            })
            .collect();
        prop_assert_eq!(sinks.len(), keys.len());
        let report = refresh_step(&RefreshConfig::default());
        prop_assert_eq!(report.polled_links, keys.len());
        prop_assert_eq!(report.changed_sources, 0);
    }
}
