//! In-memory tree view rebuilt from a flat closure result set.
//!
//! # Overview
//!
//! Depth-0 triples register nodes and depth-1 triples give direct
//! parent/child edges. Deeper triples are ignored. The node with no parent
//! edge inside the set is the root; exactly one must exist and every other
//! node must hang below it.
//!
//! # Ownership
//!
//! Each [`TreeNode`] owns its children outright. The parent link is a plain
//! [`NodeId`], resolved through the [`Tree`] when walking upward.

#![allow(clippy::module_name_repetitions)]

use std::collections::{BTreeMap, BTreeSet};

use crate::error::TreeError;
use crate::model::{Closure, NodeId};

// ---------------------------------------------------------------------------
// TreeNode
// ---------------------------------------------------------------------------

/// One node of a reconstructed tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    id: NodeId,
    parent: Option<NodeId>,
    children: BTreeMap<NodeId, TreeNode>,
}

impl TreeNode {
    #[must_use]
    pub const fn id(&self) -> NodeId {
        self.id
    }

    /// `None` for the root of the view, even when the stored node has a
    /// parent outside the subtree that was read.
    #[must_use]
    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Direct children in ascending id order.
    pub fn children(&self) -> impl Iterator<Item = &Self> {
        self.children.values()
    }

    #[must_use]
    pub fn child(&self, id: NodeId) -> Option<&Self> {
        self.children.get(&id)
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    fn find(&self, id: NodeId) -> Option<&Self> {
        if self.id == id {
            return Some(self);
        }
        self.children.values().find_map(|child| child.find(id))
    }

    fn collect_preorder(&self, out: &mut Vec<NodeId>) {
        out.push(self.id);
        for child in self.children.values() {
            child.collect_preorder(out);
        }
    }
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

/// A single rooted tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tree {
    root: TreeNode,
    len: usize,
}

impl Tree {
    /// Build the view from closure triples.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::AmbiguousTree`] if the set is empty, has zero or
    /// several roots, gives a node more than one parent, or leaves nodes
    /// unreachable from the root.
    pub fn from_closures(closures: &[Closure]) -> Result<Self, TreeError> {
        let mut nodes = BTreeSet::new();
        let mut parent_of: BTreeMap<NodeId, NodeId> = BTreeMap::new();

        for closure in closures {
            nodes.insert(closure.ancestor);
            nodes.insert(closure.descendant);
            if closure.depth != 1 {
                continue;
            }
            if let Some(previous) = parent_of.insert(closure.descendant, closure.ancestor)
                && previous != closure.ancestor
            {
                return Err(ambiguous(format!(
                    "node {} has parents {previous} and {}",
                    closure.descendant, closure.ancestor
                )));
            }
        }

        let roots: Vec<NodeId> = nodes
            .iter()
            .copied()
            .filter(|id| !parent_of.contains_key(id))
            .collect();
        let root_id = match roots.as_slice() {
            [] if nodes.is_empty() => return Err(ambiguous("no nodes".to_string())),
            [] => return Err(ambiguous("no root: every node has a parent".to_string())),
            [root] => *root,
            many => return Err(ambiguous(format!("{} candidate roots", many.len()))),
        };

        let mut children_of: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
        for (child, parent) in &parent_of {
            children_of.entry(*parent).or_default().push(*child);
        }

        let mut len = 0;
        let root = build(root_id, None, &children_of, &mut len);
        if len != nodes.len() {
            return Err(ambiguous(format!(
                "{} of {} nodes unreachable from root {root_id}",
                nodes.len() - len,
                nodes.len()
            )));
        }

        Ok(Self { root, len })
    }

    #[must_use]
    pub const fn root(&self) -> &TreeNode {
        &self.root
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Always `false`; a tree has at least its root.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn find(&self, id: NodeId) -> Option<&TreeNode> {
        self.root.find(id)
    }

    /// Ids in pre-order, children ascending.
    #[must_use]
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.len);
        self.root.collect_preorder(&mut out);
        out
    }

    /// Path from `id` up to the root, `id` first.
    #[must_use]
    pub fn path_to_root(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = Vec::new();
        let mut cursor = self.find(id);
        while let Some(node) = cursor {
            path.push(node.id);
            cursor = node.parent.and_then(|parent| self.find(parent));
        }
        path
    }
}

fn build(
    id: NodeId,
    parent: Option<NodeId>,
    children_of: &BTreeMap<NodeId, Vec<NodeId>>,
    len: &mut usize,
) -> TreeNode {
    *len += 1;
    let children = children_of
        .get(&id)
        .map(|ids| {
            ids.iter()
                .map(|child| (*child, build(*child, Some(id), children_of, len)))
                .collect()
        })
        .unwrap_or_default();
    TreeNode {
        id,
        parent,
        children,
    }
}

const fn ambiguous(reason: String) -> TreeError {
    TreeError::AmbiguousTree { reason }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
