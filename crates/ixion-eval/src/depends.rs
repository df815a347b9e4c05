//! Directed dependency edges between cells, and the DFS-based topological
//! sort the queue manager uses to schedule a recompute batch.
//!
//! Cycles are not rejected at insertion time - a formula is free to name a
//! cell that (transitively) depends on it. They are instead discovered by
//! [`DependencyTracker::topo_sort`] and handed back as a separate set so the
//! caller can stamp every participant with `ref_result_not_available` in a
//! dedicated circular-check phase, rather than during ordinary scheduling.

use rustc_hash::{FxHashMap, FxHashSet};

use ixion_common::Address;

#[derive(Default)]
pub struct DependencyTracker {
    /// `origin -> { cells origin's formula reads }`.
    edges: FxHashMap<Address, FxHashSet<Address>>,
    /// Debug-only guard: a tracker is built fresh per recompute batch and
    /// must not be reused once consumed by `topo_sort`.
    #[cfg(debug_assertions)]
    consumed: bool,
}

/// Outcome of a topological sort: a linear recompute order for the
/// acyclic part of the graph, plus the set of cells caught in a cycle.
pub struct Schedule {
    pub order: Vec<Address>,
    pub cyclic: FxHashSet<Address>,
}

impl DependencyTracker {
    pub fn new() -> Self {
        DependencyTracker::default()
    }

    /// Record that `origin`'s formula reads `dependency`. Idempotent:
    /// inserting the same edge twice is a no-op.
    pub fn insert_depend(&mut self, origin: Address, dependency: Address) {
        self.edges.entry(origin).or_default().insert(dependency);
    }

    pub fn remove_all(&mut self, origin: Address) {
        self.edges.remove(&origin);
    }

    pub fn dependencies_of(&self, origin: Address) -> impl Iterator<Item = Address> + '_ {
        self.edges.get(&origin).into_iter().flatten().copied()
    }

    /// DFS over every cell that appears as an edge endpoint, producing a
    /// dependency-first order (a cell's dependencies precede it) for the
    /// acyclic portion of the graph. Every cell on a cycle it discovers
    /// along the way is collected into `cyclic` instead of `order`.
    pub fn topo_sort(&mut self) -> Schedule {
        #[cfg(debug_assertions)]
        {
            assert!(!self.consumed, "DependencyTracker consumed twice without a reset");
            self.consumed = true;
        }

        let mut nodes: FxHashSet<Address> = FxHashSet::default();
        for (origin, deps) in &self.edges {
            nodes.insert(*origin);
            nodes.extend(deps.iter().copied());
        }

        let mut visited: FxHashSet<Address> = FxHashSet::default();
        let mut on_stack: FxHashSet<Address> = FxHashSet::default();
        let mut path: Vec<Address> = Vec::new();
        let mut order = Vec::with_capacity(nodes.len());
        let mut cyclic: FxHashSet<Address> = FxHashSet::default();

        let mut todo: Vec<Address> = nodes.into_iter().collect();
        todo.sort_by_key(|a| (a.sheet, a.row, a.col));
        for start in todo {
            if !visited.contains(&start) {
                self.visit(start, &mut visited, &mut on_stack, &mut path, &mut order, &mut cyclic);
            }
        }
        Schedule { order, cyclic }
    }

    /// Resets the consumed guard so the same tracker instance can be
    /// rebuilt and sorted again for the next recompute batch.
    pub fn reset(&mut self) {
        self.edges.clear();
        #[cfg(debug_assertions)]
        {
            self.consumed = false;
        }
    }

    /// `path` is the current DFS stack in visit order (`on_stack` is the
    /// same set, kept for O(1) membership tests). A back edge to `dep`
    /// means `dep..=node` along `path` is one cycle; only that segment is
    /// stamped cyclic, not every node that happens to reach `node`.
    fn visit(
        &self,
        node: Address,
        visited: &mut FxHashSet<Address>,
        on_stack: &mut FxHashSet<Address>,
        path: &mut Vec<Address>,
        order: &mut Vec<Address>,
        cyclic: &mut FxHashSet<Address>,
    ) {
        visited.insert(node);
        on_stack.insert(node);
        path.push(node);
        if let Some(deps) = self.edges.get(&node) {
            let mut deps: Vec<Address> = deps.iter().copied().collect();
            deps.sort_by_key(|a| (a.sheet, a.row, a.col));
            for dep in deps {
                if on_stack.contains(&dep) {
                    let start = path.iter().position(|a| *a == dep).expect("on_stack implies path membership");
                    cyclic.extend(path[start..].iter().copied());
                    continue;
                }
                if !visited.contains(&dep) {
                    self.visit(dep, visited, on_stack, path, order, cyclic);
                }
            }
        }
        path.pop();
        on_stack.remove(&node);
        order.push(node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(row: i32) -> Address {
        Address::absolute(0, row, 0)
    }

    #[test]
    fn acyclic_chain_orders_dependencies_first() {
        let mut tracker = DependencyTracker::new();
        tracker.insert_depend(addr(2), addr(1));
        tracker.insert_depend(addr(1), addr(0));
        let schedule = tracker.topo_sort();
        assert!(schedule.cyclic.is_empty());
        let pos = |a: Address| schedule.order.iter().position(|x| *x == a).unwrap();
        assert!(pos(addr(0)) < pos(addr(1)));
        assert!(pos(addr(1)) < pos(addr(2)));
    }

    #[test]
    fn self_reference_is_its_own_cycle() {
        let mut tracker = DependencyTracker::new();
        tracker.insert_depend(addr(0), addr(0));
        let schedule = tracker.topo_sort();
        assert!(schedule.cyclic.contains(&addr(0)));
    }

    #[test]
    fn three_cell_cycle_is_fully_marked() {
        let mut tracker = DependencyTracker::new();
        tracker.insert_depend(addr(0), addr(1));
        tracker.insert_depend(addr(1), addr(2));
        tracker.insert_depend(addr(2), addr(0));
        let schedule = tracker.topo_sort();
        assert!(schedule.cyclic.contains(&addr(0)));
        assert!(schedule.cyclic.contains(&addr(1)));
        assert!(schedule.cyclic.contains(&addr(2)));
    }

    #[test]
    fn ancestor_of_a_cycle_is_not_itself_marked_cyclic() {
        let mut tracker = DependencyTracker::new();
        tracker.insert_depend(addr(1), addr(2));
        tracker.insert_depend(addr(2), addr(1));
        tracker.insert_depend(addr(0), addr(1));
        let schedule = tracker.topo_sort();
        assert!(schedule.cyclic.contains(&addr(1)));
        assert!(schedule.cyclic.contains(&addr(2)));
        assert!(!schedule.cyclic.contains(&addr(0)));
    }

    #[test]
    #[cfg_attr(not(debug_assertions), ignore)]
    #[should_panic(expected = "consumed twice")]
    fn reusing_a_consumed_tracker_panics_in_debug() {
        let mut tracker = DependencyTracker::new();
        tracker.insert_depend(addr(0), addr(1));
        let _ = tracker.topo_sort();
        let _ = tracker.topo_sort();
    }

    #[test]
    fn reset_allows_reuse_for_the_next_batch() {
        let mut tracker = DependencyTracker::new();
        tracker.insert_depend(addr(0), addr(1));
        let _ = tracker.topo_sort();
        tracker.reset();
        tracker.insert_depend(addr(3), addr(4));
        let schedule = tracker.topo_sort();
        assert_eq!(schedule.order.len(), 2);
    }
}
