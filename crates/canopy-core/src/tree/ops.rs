//! Closure-table maintenance algorithms.
//!
//! Each function takes the caller's open scope and plain ids, and returns
//! plain ids or triples. None of them begins or commits a transaction, so
//! several can be composed into one atomic unit (copy does exactly that).
//!
//! # Operations
//!
//! - [`add_node`]: new root, or new leaf under an existing parent
//! - [`delete_node`]: a node and its whole subtree
//! - [`move_node`]: re-hang a subtree elsewhere, or sever it into its own tree
//! - [`copy_node`]: duplicate a subtree with fresh ids
//! - [`read_subtree`]: closure triples describing a subtree
//! - [`is_descendant_of`]: strict reachability, used as the cycle guard
//!
//! # Cycle prevention
//!
//! [`move_node`] refuses a new parent that is the moving node itself or any
//! of its descendants. The check runs in the same scope as the rewrite.

#![allow(clippy::module_name_repetitions)]

use std::collections::BTreeSet;

use super::reconstruct::{Tree, TreeNode};
use crate::error::TreeError;
use crate::model::{Closure, NodeId};
use crate::relation::ClosureRelation;

// ---------------------------------------------------------------------------
// Mutating operations
// ---------------------------------------------------------------------------

/// Create a node, either as a new root (`parent = None`) or as the last
/// child of `parent`.
///
/// For every `(a, parent, d)` (the parent's self triple included) the new
/// node gets `(a, new, d + 1)`, plus its own `(new, new, 0)`.
///
/// # Errors
///
/// Returns [`TreeError::NodeNotFound`] if `parent` does not exist, or a
/// store error.
pub fn add_node<R>(rel: &mut R, parent: Option<NodeId>) -> Result<NodeId, TreeError>
where
    R: ClosureRelation + ?Sized,
{
    let ancestors = match parent {
        Some(parent_id) => {
            let ancestors = rel.ancestors_of(parent_id)?;
            if ancestors.is_empty() && !rel.node_exists(parent_id)? {
                return Err(TreeError::NodeNotFound(parent_id));
            }
            ancestors
        }
        None => Vec::new(),
    };

    let id = rel.allocate_node()?;
    rel.insert_closure(Closure::self_closure(id))?;
    for (ancestor, depth) in ancestors {
        rel.insert_closure(Closure::new(ancestor, id, depth + 1))?;
    }

    Ok(id)
}

/// Delete `node` and everything beneath it.
///
/// Returns every deleted id, `node` included. A node that does not exist
/// yields an empty set rather than an error.
///
/// # Errors
///
/// Returns a store error.
pub fn delete_node<R>(rel: &mut R, node: NodeId) -> Result<BTreeSet<NodeId>, TreeError>
where
    R: ClosureRelation + ?Sized,
{
    let doomed: BTreeSet<NodeId> = rel
        .descendants_of(node, None)?
        .into_iter()
        .map(|(id, _)| id)
        .collect();
    if doomed.is_empty() {
        return Ok(doomed);
    }

    rel.delete_closures_involving(&doomed)?;
    rel.remove_nodes(&doomed)?;
    Ok(doomed)
}

/// Re-hang the subtree rooted at `node` under `new_parent`, or make it a
/// standalone tree when `new_parent` is `None`.
///
/// Triples inside the subtree keep their depths. Triples from the old
/// strict ancestors into the subtree are dropped, and for every
/// `(a, new_parent, da)` and subtree member `(d, dd)` a triple
/// `(a, d, da + 1 + dd)` is added. Returns the ids of the subtree; a
/// missing `node` yields an empty set.
///
/// # Errors
///
/// Returns [`TreeError::InvalidRelocation`] if `new_parent` is `node` or one
/// of its descendants (nothing is written), [`TreeError::NodeNotFound`] if
/// `new_parent` does not exist, or a store error.
pub fn move_node<R>(
    rel: &mut R,
    node: NodeId,
    new_parent: Option<NodeId>,
) -> Result<BTreeSet<NodeId>, TreeError>
where
    R: ClosureRelation + ?Sized,
{
    let new_ancestors = match new_parent {
        Some(parent_id) => {
            if parent_id == node || is_descendant_of(rel, node, parent_id)? {
                return Err(TreeError::InvalidRelocation {
                    node,
                    new_parent: parent_id,
                });
            }
            let ancestors = rel.ancestors_of(parent_id)?;
            if ancestors.is_empty() && !rel.node_exists(parent_id)? {
                return Err(TreeError::NodeNotFound(parent_id));
            }
            ancestors
        }
        None => Vec::new(),
    };

    let subtree = rel.descendants_of(node, None)?;
    let members: BTreeSet<NodeId> = subtree.iter().map(|(id, _)| *id).collect();
    if members.is_empty() {
        return Ok(members);
    }

    let old_ancestors: BTreeSet<NodeId> = rel
        .ancestors_of(node)?
        .into_iter()
        .filter_map(|(id, _)| (id != node).then_some(id))
        .collect();
    rel.delete_links(&old_ancestors, &members)?;

    for (ancestor, ancestor_depth) in &new_ancestors {
        for (descendant, descendant_depth) in &subtree {
            rel.insert_closure(Closure::new(
                *ancestor,
                *descendant,
                ancestor_depth + 1 + descendant_depth,
            ))?;
        }
    }

    Ok(members)
}

/// Duplicate the subtree rooted at `node` under `new_parent` (or as a new
/// tree), allocating fresh ids.
///
/// Returns the new ids in pre-order: the copy of `node` first, then each
/// child's copy followed by its own descendants, children in ascending id
/// order. Copying a subtree beneath one of its own descendants is allowed;
/// the source shape is read before anything is written.
///
/// # Errors
///
/// Returns [`TreeError::NodeNotFound`] if `node` or `new_parent` does not
/// exist, [`TreeError::AmbiguousTree`] if the stored closures for `node`
/// are corrupt, or a store error.
pub fn copy_node<R>(
    rel: &mut R,
    node: NodeId,
    new_parent: Option<NodeId>,
) -> Result<Vec<NodeId>, TreeError>
where
    R: ClosureRelation + ?Sized,
{
    let closures = read_subtree(rel, node, None)?;
    if closures.is_empty() {
        return Err(TreeError::NodeNotFound(node));
    }
    let tree = Tree::from_closures(&closures)?;

    let mut created = Vec::with_capacity(tree.len());
    add_subtree(rel, tree.root(), new_parent, &mut created)?;
    Ok(created)
}

fn add_subtree<R>(
    rel: &mut R,
    source: &TreeNode,
    parent: Option<NodeId>,
    created: &mut Vec<NodeId>,
) -> Result<(), TreeError>
where
    R: ClosureRelation + ?Sized,
{
    let copy = add_node(rel, parent)?;
    created.push(copy);
    for child in source.children() {
        add_subtree(rel, child, Some(copy), created)?;
    }
    Ok(())
}

/// Delete every node and triple.
///
/// # Errors
///
/// Returns a store error.
pub fn clear<R>(rel: &mut R) -> Result<(), TreeError>
where
    R: ClosureRelation + ?Sized,
{
    rel.clear()
}

// ---------------------------------------------------------------------------
// Read operations
// ---------------------------------------------------------------------------

/// All triples among the nodes of the subtree rooted at `node`, limited to
/// members at most `max_depth` below it.
///
/// The result holds every member's self triple and every ancestor link
/// between members (not only the links starting at `node`), which is enough
/// to rebuild the subtree's shape. Sorted by depth, then ancestor, then
/// descendant. Empty when `node` does not exist.
///
/// # Errors
///
/// Returns a store error.
pub fn read_subtree<R>(
    rel: &R,
    node: NodeId,
    max_depth: Option<u32>,
) -> Result<Vec<Closure>, TreeError>
where
    R: ClosureRelation + ?Sized,
{
    let members: BTreeSet<NodeId> = rel
        .descendants_of(node, max_depth)?
        .into_iter()
        .map(|(id, _)| id)
        .collect();
    if members.is_empty() {
        return Ok(Vec::new());
    }

    let mut closures = rel.closures_among(&members)?;
    closures.sort_by_key(Closure::sort_key);
    Ok(closures)
}

/// `true` iff `descendant` lies strictly below `ancestor` (depth ≥ 1).
/// A node is not its own descendant.
///
/// # Errors
///
/// Returns a store error.
pub fn is_descendant_of<R>(rel: &R, ancestor: NodeId, descendant: NodeId) -> Result<bool, TreeError>
where
    R: ClosureRelation + ?Sized,
{
    Ok(rel
        .ancestors_of(descendant)?
        .iter()
        .any(|(id, depth)| *id == ancestor && *depth >= 1))
}

/// Strict ancestors of `node`, nearest first. Empty for roots and for
/// missing nodes.
///
/// # Errors
///
/// Returns a store error.
pub fn ancestors<R>(rel: &R, node: NodeId) -> Result<Vec<NodeId>, TreeError>
where
    R: ClosureRelation + ?Sized,
{
    Ok(rel
        .ancestors_of(node)?
        .into_iter()
        .filter_map(|(id, depth)| (depth > 0).then_some(id))
        .collect())
}

/// Every node without an incoming triple of depth ≥ 1, ascending.
///
/// # Errors
///
/// Returns a store error.
pub fn roots<R>(rel: &R) -> Result<Vec<NodeId>, TreeError>
where
    R: ClosureRelation + ?Sized,
{
    let children: BTreeSet<NodeId> = rel
        .all_closures()?
        .into_iter()
        .filter_map(|c| (c.depth > 0).then_some(c.descendant))
        .collect();
    Ok(rel
        .all_nodes()?
        .into_iter()
        .filter(|id| !children.contains(id))
        .collect())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relation::memory::MemoryRelation;

    fn set(ids: &[NodeId]) -> BTreeSet<NodeId> {
        ids.iter().copied().collect()
    }

    fn triples(ids: &[(NodeId, NodeId, u32)]) -> Vec<Closure> {
        let mut closures: Vec<Closure> = ids.iter().copied().map(Closure::from).collect();
        closures.sort_by_key(Closure::sort_key);
        closures
    }

    /// a -> b -> c -> d
    fn chain(rel: &mut MemoryRelation) -> (NodeId, NodeId, NodeId, NodeId) {
        let a = add_node(rel, None).unwrap();
        let b = add_node(rel, Some(a)).unwrap();
        let c = add_node(rel, Some(b)).unwrap();
        let d = add_node(rel, Some(c)).unwrap();
        (a, b, c, d)
    }

    // -----------------------------------------------------------------------
    // add_node
    // -----------------------------------------------------------------------

    #[test]
    fn add_root_creates_only_self_closure() {
        let mut rel = MemoryRelation::new();
        let a = add_node(&mut rel, None).unwrap();
        assert_eq!(read_subtree(&rel, a, None).unwrap(), triples(&[(a, a, 0)]));
    }

    #[test]
    fn add_child_links_every_ancestor() {
        let mut rel = MemoryRelation::new();
        let (a, b, c, d) = chain(&mut rel);
        assert_eq!(
            rel.ancestors_of(d).unwrap(),
            vec![(d, 0), (c, 1), (b, 2), (a, 3)]
        );
    }

    #[test]
    fn add_under_missing_parent_fails_without_allocating() {
        let mut rel = MemoryRelation::new();
        let err = add_node(&mut rel, Some(NodeId::new(99))).unwrap_err();
        assert!(matches!(err, TreeError::NodeNotFound(id) if id == NodeId::new(99)));
        assert_eq!(rel.node_count(), 0);
    }

    // -----------------------------------------------------------------------
    // delete_node
    // -----------------------------------------------------------------------

    #[test]
    fn delete_leaf_removes_one_node() {
        let mut rel = MemoryRelation::new();
        let (a, b, c, d) = chain(&mut rel);
        assert_eq!(delete_node(&mut rel, d).unwrap(), set(&[d]));
        assert_eq!(read_subtree(&rel, a, None).unwrap().len(), 6);
        assert!(read_subtree(&rel, d, None).unwrap().is_empty());
        assert!(rel.node_exists(c).unwrap());
        assert!(rel.node_exists(b).unwrap());
    }

    #[test]
    fn delete_missing_node_is_empty() {
        let mut rel = MemoryRelation::new();
        assert!(delete_node(&mut rel, NodeId::new(7)).unwrap().is_empty());
    }

    #[test]
    fn delete_root_removes_component() {
        let mut rel = MemoryRelation::new();
        let (a, b, c, d) = chain(&mut rel);
        let other = add_node(&mut rel, None).unwrap();
        assert_eq!(delete_node(&mut rel, a).unwrap(), set(&[a, b, c, d]));
        assert_eq!(rel.node_count(), 1);
        assert_eq!(rel.closure_count(), 1);
        assert!(rel.node_exists(other).unwrap());
    }

    // -----------------------------------------------------------------------
    // move_node
    // -----------------------------------------------------------------------

    #[test]
    fn move_rejects_self_and_descendants() {
        let mut rel = MemoryRelation::new();
        let (a, b, c, d) = chain(&mut rel);
        let before = rel.all_closures().unwrap();

        for target in [b, c, d] {
            let err = move_node(&mut rel, b, Some(target)).unwrap_err();
            assert!(matches!(err, TreeError::InvalidRelocation { .. }), "target {target}");
        }
        assert_eq!(rel.all_closures().unwrap(), before);
        assert!(move_node(&mut rel, b, Some(a)).is_ok());
    }

    #[test]
    fn move_under_missing_parent_fails() {
        let mut rel = MemoryRelation::new();
        let (_, b, _, _) = chain(&mut rel);
        let err = move_node(&mut rel, b, Some(NodeId::new(500))).unwrap_err();
        assert!(matches!(err, TreeError::NodeNotFound(_)));
    }

    #[test]
    fn move_missing_node_is_empty() {
        let mut rel = MemoryRelation::new();
        let a = add_node(&mut rel, None).unwrap();
        assert!(move_node(&mut rel, NodeId::new(42), Some(a)).unwrap().is_empty());
        assert_eq!(rel.closure_count(), 1);
    }

    #[test]
    fn move_to_current_parent_is_stable() {
        let mut rel = MemoryRelation::new();
        let (a, b, c, _) = chain(&mut rel);
        let before = read_subtree(&rel, a, None).unwrap();
        move_node(&mut rel, c, Some(b)).unwrap();
        assert_eq!(read_subtree(&rel, a, None).unwrap(), before);
    }

    // -----------------------------------------------------------------------
    // copy_node
    // -----------------------------------------------------------------------

    #[test]
    fn copy_returns_preorder_ids() {
        //      a
        //     / \
        //    b   c
        //    |
        //    d
        let mut rel = MemoryRelation::new();
        let a = add_node(&mut rel, None).unwrap();
        let b = add_node(&mut rel, Some(a)).unwrap();
        let c = add_node(&mut rel, Some(a)).unwrap();
        let d = add_node(&mut rel, Some(b)).unwrap();

        let copied = copy_node(&mut rel, a, None).unwrap();
        assert_eq!(copied.len(), 4);
        let (a2, b2, d2, c2) = (copied[0], copied[1], copied[2], copied[3]);
        assert!(copied.iter().all(|id| ![a, b, c, d].contains(id)));
        assert_eq!(
            read_subtree(&rel, a2, None).unwrap(),
            triples(&[
                (a2, a2, 0),
                (b2, b2, 0),
                (c2, c2, 0),
                (d2, d2, 0),
                (a2, b2, 1),
                (a2, c2, 1),
                (b2, d2, 1),
                (a2, d2, 2),
            ])
        );
    }

    #[test]
    fn copy_missing_node_fails() {
        let mut rel = MemoryRelation::new();
        let err = copy_node(&mut rel, NodeId::new(3), None).unwrap_err();
        assert!(matches!(err, TreeError::NodeNotFound(_)));
    }

    // -----------------------------------------------------------------------
    // reads
    // -----------------------------------------------------------------------

    #[test]
    fn is_descendant_of_is_strict() {
        let mut rel = MemoryRelation::new();
        let (a, b, _, d) = chain(&mut rel);
        assert!(is_descendant_of(&rel, a, d).unwrap());
        assert!(is_descendant_of(&rel, b, d).unwrap());
        assert!(!is_descendant_of(&rel, d, a).unwrap());
        assert!(!is_descendant_of(&rel, a, a).unwrap());
    }

    #[test]
    fn ancestors_are_nearest_first() {
        let mut rel = MemoryRelation::new();
        let (a, b, c, d) = chain(&mut rel);
        assert_eq!(ancestors(&rel, d).unwrap(), vec![c, b, a]);
        assert!(ancestors(&rel, a).unwrap().is_empty());
    }

    #[test]
    fn roots_lists_each_component_once() {
        let mut rel = MemoryRelation::new();
        let (a, _, c, _) = chain(&mut rel);
        let lone = add_node(&mut rel, None).unwrap();
        assert_eq!(roots(&rel).unwrap(), vec![a, lone]);

        move_node(&mut rel, c, None).unwrap();
        assert_eq!(roots(&rel).unwrap(), vec![a, c, lone]);
    }

    #[test]
    fn read_subtree_respects_depth() {
        let mut rel = MemoryRelation::new();
        let (_, b, c, _) = chain(&mut rel);
        assert_eq!(
            read_subtree(&rel, b, Some(1)).unwrap(),
            triples(&[(b, b, 0), (c, c, 0), (b, c, 1)])
        );
        assert_eq!(read_subtree(&rel, b, Some(0)).unwrap(), triples(&[(b, b, 0)]));
    }

    #[test]
    fn clear_empties_everything() {
        let mut rel = MemoryRelation::new();
        chain(&mut rel);
        clear(&mut rel).unwrap();
        assert_eq!(rel.node_count(), 0);
        assert_eq!(rel.closure_count(), 0);
    }
}
