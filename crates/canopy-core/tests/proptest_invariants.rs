use std::collections::BTreeSet;

use canopy_core::{Closure, Forest, MemoryStore, NodeId, SqliteStore, TransactionalStore, TreeError};
use proptest::prelude::*;

/// Operation over the live node list; indices wrap modulo its length.
#[derive(Debug, Clone)]
enum Op {
    Add(Option<usize>),
    Delete(usize),
    Move(usize, Option<usize>),
    Copy(usize, Option<usize>),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => proptest::option::of(0..64_usize).prop_map(Op::Add),
        1 => (0..64_usize).prop_map(Op::Delete),
        2 => (0..64_usize, proptest::option::of(0..64_usize)).prop_map(|(n, p)| Op::Move(n, p)),
        1 => (0..64_usize, proptest::option::of(0..64_usize)).prop_map(|(n, p)| Op::Copy(n, p)),
    ]
}

fn pick(live: &[NodeId], index: usize) -> Option<NodeId> {
    (!live.is_empty()).then(|| live[index % live.len()])
}

/// Triples among `members` with ids replaced by their rank, so two
/// isomorphic subtrees compare equal.
fn relative_shape<S: TransactionalStore>(forest: &mut Forest<S>, root: NodeId) -> Vec<(usize, usize, u32)> {
    let tree = forest.subtree(root, None).expect("subtree");
    let order = tree.preorder();
    let rank = |id: NodeId| order.iter().position(|x| *x == id).expect("member");
    let mut shape: Vec<(usize, usize, u32)> = forest
        .get_tree(root, None)
        .expect("get")
        .into_iter()
        .map(|c| (rank(c.ancestor), rank(c.descendant), c.depth))
        .collect();
    shape.sort_unstable();
    shape
}

fn internal_closures<S: TransactionalStore>(forest: &mut Forest<S>, root: NodeId) -> Vec<Closure> {
    forest.get_tree(root, None).expect("get")
}

fn run_ops<S: TransactionalStore>(mut forest: Forest<S>, ops: &[Op]) -> Result<(), TestCaseError> {
    let mut live: Vec<NodeId> = Vec::new();

    for op in ops {
        match op {
            Op::Add(parent) => {
                let parent = parent.and_then(|p| pick(&live, p));
                let id = forest.add_node(parent).expect("add");
                prop_assert!(!live.contains(&id));
                live.push(id);
            }
            Op::Delete(n) => {
                let Some(node) = pick(&live, *n) else { continue };
                let deleted = forest.delete_node(node).expect("delete");
                prop_assert!(deleted.contains(&node));
                prop_assert!(forest.get_tree(node, None).expect("get").is_empty());
                live.retain(|id| !deleted.contains(id));
            }
            Op::Move(n, parent) => {
                let Some(node) = pick(&live, *n) else { continue };
                let parent = parent.and_then(|p| pick(&live, p));
                let before = internal_closures(&mut forest, node);
                let everything_before = forest.verify().expect("verify");

                match forest.move_node(node, parent) {
                    Ok(moved) => {
                        let members: BTreeSet<NodeId> =
                            before.iter().map(|c| c.descendant).collect();
                        prop_assert_eq!(moved, members);
                        prop_assert_eq!(internal_closures(&mut forest, node), before);
                        if let Some(parent) = parent {
                            prop_assert!(forest.is_child_of(parent, node).expect("is_child_of"));
                        } else {
                            prop_assert!(forest.ancestors(node).expect("ancestors").is_empty());
                        }
                    }
                    Err(TreeError::InvalidRelocation { .. }) => {
                        let parent = parent.expect("only a parent can be rejected");
                        prop_assert!(parent == node || forest.is_child_of(node, parent).expect("is_child_of"));
                        prop_assert_eq!(forest.verify().expect("verify"), everything_before);
                    }
                    Err(other) => return Err(TestCaseError::fail(format!("unexpected: {other}"))),
                }
            }
            Op::Copy(n, parent) => {
                let Some(node) = pick(&live, *n) else { continue };
                let parent = parent.and_then(|p| pick(&live, p));
                let source_shape = relative_shape(&mut forest, node);

                let created = forest.copy_node(node, parent).expect("copy");
                prop_assert_eq!(created.len(), source_shape.iter().filter(|t| t.2 == 0).count());
                prop_assert!(created.iter().all(|id| !live.contains(id)));
                prop_assert_eq!(relative_shape(&mut forest, created[0]), source_shape);
                live.extend(created);
            }
        }

        let report = forest.verify().expect("verify");
        prop_assert!(report.is_ok(), "violations after {:?}: {:?}", op, report.violations);
        prop_assert_eq!(report.nodes, live.len());
        for id in &live {
            let tree = forest.get_tree(*id, None).expect("get");
            prop_assert_eq!(tree.iter().filter(|c| c.is_self() && c.ancestor == *id).count(), 1);
        }
    }

    Ok(())
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(256))]

    #[test]
    fn memory_store_keeps_invariants(ops in proptest::collection::vec(arb_op(), 1..40)) {
        run_ops(Forest::new(MemoryStore::new()), &ops)?;
    }
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(48))]

    #[test]
    fn sqlite_store_keeps_invariants(ops in proptest::collection::vec(arb_op(), 1..25)) {
        let store = SqliteStore::in_memory().expect("open sqlite store");
        run_ops(Forest::new(store), &ops)?;
    }
}
