//! The two durable relations (nodes and closures) behind a trait seam.
//!
//! Every tree operation is written against [`ClosureRelation`] and runs
//! inside a [`Scope`] opened by a [`TransactionalStore`]. A scope is
//! committed explicitly; dropping it without committing rolls back every
//! statement issued through it.
//!
//! Two stores ship with the crate:
//! - [`crate::db::SqliteStore`] persists to SQLite
//! - [`memory::MemoryStore`] keeps both relations in process, for tests and
//!   for verifying operations without a live database

pub mod memory;

use std::collections::BTreeSet;

use crate::error::TreeError;
use crate::model::{Closure, NodeId};

/// Query and mutation primitives over the node store and closure relation.
///
/// Implementations have no side effects beyond the two relations and never
/// open transactions of their own.
pub trait ClosureRelation {
    /// Allocate a fresh node id and record the node. Ids are never reused.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::Transaction`] on store failure.
    fn allocate_node(&mut self) -> Result<NodeId, TreeError>;

    /// # Errors
    ///
    /// Returns [`TreeError::Transaction`] on store failure.
    fn node_exists(&self, node: NodeId) -> Result<bool, TreeError>;

    /// Remove node rows. Returns how many existed.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::Transaction`] on store failure.
    fn remove_nodes(&mut self, nodes: &BTreeSet<NodeId>) -> Result<usize, TreeError>;

    /// Every `(ancestor, depth)` with a triple ending at `node`, self
    /// included, nearest first.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::Transaction`] on store failure.
    fn ancestors_of(&self, node: NodeId) -> Result<Vec<(NodeId, u32)>, TreeError>;

    /// Every `(descendant, depth)` with a triple starting at `node`, self
    /// included, optionally capped at `max_depth`. Sorted by depth then id.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::Transaction`] on store failure.
    fn descendants_of(
        &self,
        node: NodeId,
        max_depth: Option<u32>,
    ) -> Result<Vec<(NodeId, u32)>, TreeError>;

    /// Insert one triple. Re-inserting an identical triple is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::ConstraintViolation`] if the pair exists with a
    /// different depth, or if a self pair carries a non-zero depth.
    fn insert_closure(&mut self, closure: Closure) -> Result<(), TreeError>;

    /// Remove every triple whose ancestor or descendant is in `nodes`.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::Transaction`] on store failure.
    fn delete_closures_involving(&mut self, nodes: &BTreeSet<NodeId>) -> Result<usize, TreeError>;

    /// Remove every triple with ancestor in `ancestors` and descendant in
    /// `descendants`.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::Transaction`] on store failure.
    fn delete_links(
        &mut self,
        ancestors: &BTreeSet<NodeId>,
        descendants: &BTreeSet<NodeId>,
    ) -> Result<usize, TreeError>;

    /// Every triple whose ancestor and descendant both lie in `nodes`.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::Transaction`] on store failure.
    fn closures_among(&self, nodes: &BTreeSet<NodeId>) -> Result<Vec<Closure>, TreeError>;

    /// All node ids, ascending.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::Transaction`] on store failure.
    fn all_nodes(&self) -> Result<Vec<NodeId>, TreeError>;

    /// All triples, including ones that reference missing nodes.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::Transaction`] on store failure.
    fn all_closures(&self) -> Result<Vec<Closure>, TreeError>;

    /// Delete every row from both relations.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::Transaction`] on store failure.
    fn clear(&mut self) -> Result<(), TreeError>;
}

/// A transactional scope over the relations.
pub trait Scope: ClosureRelation {
    /// Make every change issued through this scope durable.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::Transaction`] if the store refuses the commit.
    fn commit(self) -> Result<(), TreeError>;
}

/// A store that can open transactional scopes.
pub trait TransactionalStore {
    type Tx<'a>: Scope
    where
        Self: 'a;

    /// Open a scope for one operation.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::Transaction`] if the store cannot begin.
    fn begin(&mut self) -> Result<Self::Tx<'_>, TreeError>;

    /// Open a scope for an operation that only reads. Stores with shared
    /// read locks override this so readers never wait on a writer.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::Transaction`] if the store cannot begin.
    fn begin_read(&mut self) -> Result<Self::Tx<'_>, TreeError> {
        self.begin()
    }
}

/// Reject triples that could never be valid in a forest, before touching
/// the store.
pub(crate) fn check_shape(closure: Closure) -> Result<(), TreeError> {
    if closure.is_self() && closure.depth != 0 {
        return Err(TreeError::ConstraintViolation {
            ancestor: closure.ancestor,
            descendant: closure.descendant,
            existing: 0,
            requested: closure.depth,
        });
    }
    Ok(())
}

/// Resolve an insert against a previously stored depth.
///
/// Returns `Ok(true)` when the triple still needs to be written.
pub(crate) fn check_existing(closure: Closure, existing: Option<u32>) -> Result<bool, TreeError> {
    match existing {
        None => Ok(true),
        Some(depth) if depth == closure.depth => Ok(false),
        Some(depth) => Err(TreeError::ConstraintViolation {
            ancestor: closure.ancestor,
            descendant: closure.descendant,
            existing: depth,
            requested: closure.depth,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(raw: i64) -> NodeId {
        NodeId::new(raw)
    }

    #[test]
    fn self_pair_with_depth_is_rejected() {
        let err = check_shape(Closure::new(n(1), n(1), 2)).unwrap_err();
        assert!(matches!(err, TreeError::ConstraintViolation { requested: 2, .. }));
        assert!(check_shape(Closure::self_closure(n(1))).is_ok());
    }

    #[test]
    fn existing_pair_same_depth_is_noop() {
        let closure = Closure::new(n(1), n(2), 1);
        assert!(check_existing(closure, None).unwrap());
        assert!(!check_existing(closure, Some(1)).unwrap());
        let err = check_existing(closure, Some(3)).unwrap_err();
        assert!(matches!(
            err,
            TreeError::ConstraintViolation {
                existing: 3,
                requested: 1,
                ..
            }
        ));
    }
}
