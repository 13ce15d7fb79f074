//! Whole-store integrity check of the closure invariants.
//!
//! [`verify`] reads both relations and reports every violation it finds. It
//! never repairs anything.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use crate::error::TreeError;
use crate::model::{Closure, NodeId};
use crate::relation::ClosureRelation;

/// One broken invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    /// A node has no `(n, n, 0)` triple.
    MissingSelfClosure { node: NodeId },
    /// A triple `(n, n, k)` with `k > 0`.
    SelfLoop { node: NodeId, depth: u32 },
    /// A triple names a node that is not in the node store.
    DanglingClosure { closure: Closure },
    /// A node has more than one depth-1 ancestor.
    MultipleParents { node: NodeId, parents: Vec<NodeId> },
    /// `(a, n, k)` with `k >= 2` has no matching `(a, parent(n), k - 1)`.
    UnsupportedClosure { closure: Closure },
    /// `(a, n, d)` and `(n, m, e)` exist but `(a, m, d + e)` does not.
    BrokenTransitivity {
        ancestor: NodeId,
        via: NodeId,
        descendant: NodeId,
        expected_depth: u32,
        found_depth: Option<u32>,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSelfClosure { node } => write!(f, "node {node} has no self closure"),
            Self::SelfLoop { node, depth } => {
                write!(f, "node {node} reaches itself at depth {depth}")
            }
            Self::DanglingClosure { closure } => {
                write!(f, "closure {closure} references a missing node")
            }
            Self::UnsupportedClosure { closure } => {
                write!(f, "closure {closure} is not backed by a path through the parent")
            }
            Self::MultipleParents { node, parents } => {
                let parents: Vec<String> = parents.iter().map(ToString::to_string).collect();
                write!(f, "node {node} has parents {}", parents.join(", "))
            }
            Self::BrokenTransitivity {
                ancestor,
                via,
                descendant,
                expected_depth,
                found_depth,
            } => match found_depth {
                Some(found) => write!(
                    f,
                    "{ancestor} -> {descendant} via {via}: expected depth {expected_depth}, found {found}"
                ),
                None => write!(
                    f,
                    "{ancestor} -> {descendant} via {via}: missing closure at depth {expected_depth}"
                ),
            },
        }
    }
}

/// Result of [`verify`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
    pub nodes: usize,
    pub closures: usize,
    pub roots: usize,
    pub violations: Vec<Violation>,
}

impl IntegrityReport {
    /// Return `true` when no invariant is broken.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Check every node and triple in `rel`.
///
/// Transitivity is checked through direct parents in both directions: for
/// each depth-1 edge `(p, n)` and each triple `(n, m, e)`, every `(a, p, d)`
/// must be matched by `(a, m, d + 1 + e)`, and every deeper triple
/// `(a, n, k)` must be matched by `(a, p, k - 1)`.
///
/// # Errors
///
/// Returns a store error if either relation cannot be read.
pub fn verify<R>(rel: &R) -> Result<IntegrityReport, TreeError>
where
    R: ClosureRelation + ?Sized,
{
    let nodes: BTreeSet<NodeId> = rel.all_nodes()?.into_iter().collect();
    let closures = rel.all_closures()?;
    let depth_of: BTreeMap<(NodeId, NodeId), u32> = closures
        .iter()
        .map(|c| ((c.ancestor, c.descendant), c.depth))
        .collect();

    let mut violations = Vec::new();
    let mut parents: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
    let mut up: BTreeMap<NodeId, Vec<(NodeId, u32)>> = BTreeMap::new();
    let mut down: BTreeMap<NodeId, Vec<(NodeId, u32)>> = BTreeMap::new();

    for closure in &closures {
        if !nodes.contains(&closure.ancestor) || !nodes.contains(&closure.descendant) {
            violations.push(Violation::DanglingClosure { closure: *closure });
        }
        if closure.is_self() && closure.depth != 0 {
            violations.push(Violation::SelfLoop {
                node: closure.ancestor,
                depth: closure.depth,
            });
        }
        if closure.depth == 1 {
            parents
                .entry(closure.descendant)
                .or_default()
                .push(closure.ancestor);
        }
        up.entry(closure.descendant)
            .or_default()
            .push((closure.ancestor, closure.depth));
        down.entry(closure.ancestor)
            .or_default()
            .push((closure.descendant, closure.depth));
    }

    for node in &nodes {
        if depth_of.get(&(*node, *node)) != Some(&0) {
            violations.push(Violation::MissingSelfClosure { node: *node });
        }
    }

    for (node, node_parents) in &parents {
        let [parent] = node_parents.as_slice() else {
            violations.push(Violation::MultipleParents {
                node: *node,
                parents: node_parents.clone(),
            });
            continue;
        };
        let empty = Vec::new();
        for (ancestor, above) in up.get(parent).unwrap_or(&empty) {
            for (descendant, below) in down.get(node).unwrap_or(&empty) {
                let expected_depth = above + 1 + below;
                let found_depth = depth_of.get(&(*ancestor, *descendant)).copied();
                if found_depth != Some(expected_depth) {
                    violations.push(Violation::BrokenTransitivity {
                        ancestor: *ancestor,
                        via: *node,
                        descendant: *descendant,
                        expected_depth,
                        found_depth,
                    });
                }
            }
        }
    }

    for closure in closures.iter().filter(|c| c.depth >= 2 && !c.is_self()) {
        let backed = match parents.get(&closure.descendant).map(Vec::as_slice) {
            Some([parent]) => {
                depth_of.get(&(closure.ancestor, *parent)) == Some(&(closure.depth - 1))
            }
            // Already reported as MultipleParents.
            Some(_) => true,
            None => false,
        };
        if !backed {
            violations.push(Violation::UnsupportedClosure { closure: *closure });
        }
    }

    let roots = nodes.iter().filter(|id| !parents.contains_key(id)).count();
    Ok(IntegrityReport {
        nodes: nodes.len(),
        closures: closures.len(),
        roots,
        violations,
    })
}
