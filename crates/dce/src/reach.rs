use crate::CallGraph;
use cranelift_entity::EntitySet;
use wasmprune_module::FuncIndex;

/// The functions reachable from a set of roots.
#[derive(Debug, Clone, Default)]
pub struct ReachableSet {
    set: EntitySet<FuncIndex>,
    members: Vec<FuncIndex>,
}

impl ReachableSet {
    /// Whether `func` is reachable.
    pub fn contains(&self, func: FuncIndex) -> bool {
        self.set.contains(func)
    }

    /// Number of reachable functions.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether nothing is reachable.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// The reachable functions in ascending index order.
    pub fn to_sorted_vec(&self) -> Vec<FuncIndex> {
        let mut members = self.members.clone();
        members.sort_unstable();
        members
    }

    fn insert(&mut self, func: FuncIndex) -> bool {
        if self.set.contains(func) {
            return false;
        }
        self.set.insert(func);
        self.members.push(func);
        true
    }
}

/// Compute the closure of `roots` under the `graph`'s caller to callee
/// edges.
///
/// Traversal is depth-first with an explicit worklist; every function is
/// expanded at most once, so cycles terminate.
pub fn compute_reachable(
    graph: &CallGraph,
    roots: impl IntoIterator<Item = FuncIndex>,
) -> ReachableSet {
    let mut reachable = ReachableSet::default();
    let mut worklist = Vec::new();

    for root in roots {
        if reachable.insert(root) {
            worklist.push(root);
        }
        while let Some(func) = worklist.pop() {
            for &callee in graph.callees(func) {
                if reachable.insert(callee) {
                    worklist.push(callee);
                }
            }
        }
    }

    log::debug!("{} functions are reachable", reachable.len());
    reachable
}
