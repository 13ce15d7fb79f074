//! Tree engine: closure-table operations over a transactional store.
//!
//! [`Forest`] is the entry point. Each method opens one scope on the
//! underlying [`TransactionalStore`], runs the matching function from
//! [`ops`], and commits. Any error drops the scope, which rolls back every
//! statement the operation issued. Read-only methods open their scope with
//! [`TransactionalStore::begin_read`], so they never queue behind a writer.
//!
//! ## Submodules
//!
//! - [`ops`]: the algorithms, generic over [`ClosureRelation`]
//! - [`reconstruct`]: in-memory tree view used by copy
//! - [`verify`]: whole-store invariant check
//!
//! [`ClosureRelation`]: crate::relation::ClosureRelation

pub mod ops;
pub mod reconstruct;
pub mod verify;

use std::collections::BTreeSet;
use std::path::Path;

use tracing::{debug, warn};

use crate::config::StoreConfig;
use crate::db::SqliteStore;
use crate::error::TreeError;
use crate::model::{Closure, NodeId};
use crate::relation::memory::MemoryStore;
use crate::relation::{Scope, TransactionalStore};

pub use reconstruct::{Tree, TreeNode};
pub use verify::{IntegrityReport, Violation};

/// A forest of closure-table trees backed by `S`.
#[derive(Debug)]
pub struct Forest<S> {
    store: S,
}

impl Forest<SqliteStore> {
    /// Open (or create) a SQLite-backed forest at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: &Path, config: &StoreConfig) -> anyhow::Result<Self> {
        Ok(Self::new(SqliteStore::open(path, config)?))
    }
}

impl Forest<MemoryStore> {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }
}

impl<S: TransactionalStore> Forest<S> {
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub fn into_store(self) -> S {
        self.store
    }

    /// Add a root (`parent = None`) or a child of `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::NodeNotFound`] for a missing parent, or a store
    /// error.
    pub fn add_node(&mut self, parent: Option<NodeId>) -> Result<NodeId, TreeError> {
        let mut tx = self.store.begin()?;
        let id = ops::add_node(&mut tx, parent)?;
        tx.commit()?;
        debug!(node = %id, parent = ?parent.map(NodeId::get), "added node");
        Ok(id)
    }

    /// Delete `node` and its subtree. Missing nodes yield an empty set.
    ///
    /// # Errors
    ///
    /// Returns a store error.
    pub fn delete_node(&mut self, node: NodeId) -> Result<BTreeSet<NodeId>, TreeError> {
        let mut tx = self.store.begin()?;
        let deleted = ops::delete_node(&mut tx, node)?;
        tx.commit()?;
        debug!(node = %node, deleted = deleted.len(), "deleted subtree");
        Ok(deleted)
    }

    /// Re-hang `node` under `new_parent`, or detach it as a new root.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::InvalidRelocation`] when the move would create a
    /// cycle, [`TreeError::NodeNotFound`] for a missing parent, or a store
    /// error. The store is unchanged in every error case.
    pub fn move_node(
        &mut self,
        node: NodeId,
        new_parent: Option<NodeId>,
    ) -> Result<BTreeSet<NodeId>, TreeError> {
        let mut tx = self.store.begin()?;
        let moved = match ops::move_node(&mut tx, node, new_parent) {
            Ok(moved) => moved,
            Err(err @ TreeError::InvalidRelocation { .. }) => {
                warn!(node = %node, new_parent = ?new_parent.map(NodeId::get), "rejected move: {err}");
                return Err(err);
            }
            Err(err) => return Err(err),
        };
        tx.commit()?;
        debug!(
            node = %node,
            new_parent = ?new_parent.map(NodeId::get),
            moved = moved.len(),
            "moved subtree"
        );
        Ok(moved)
    }

    /// Copy the subtree at `node` under `new_parent` (or as a new root).
    /// Returns the new ids in pre-order.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::NodeNotFound`] for a missing source or parent,
    /// [`TreeError::AmbiguousTree`] if stored closures are corrupt, or a
    /// store error.
    pub fn copy_node(
        &mut self,
        node: NodeId,
        new_parent: Option<NodeId>,
    ) -> Result<Vec<NodeId>, TreeError> {
        let mut tx = self.store.begin()?;
        let created = ops::copy_node(&mut tx, node, new_parent)?;
        tx.commit()?;
        debug!(
            node = %node,
            new_parent = ?new_parent.map(NodeId::get),
            copied = created.len(),
            "copied subtree"
        );
        Ok(created)
    }

    /// Triples describing the subtree at `node`, optionally depth-limited.
    ///
    /// # Errors
    ///
    /// Returns a store error.
    pub fn get_tree(
        &mut self,
        node: NodeId,
        max_depth: Option<u32>,
    ) -> Result<Vec<Closure>, TreeError> {
        let tx = self.store.begin_read()?;
        let closures = ops::read_subtree(&tx, node, max_depth)?;
        tx.commit()?;
        debug!(node = %node, ?max_depth, closures = closures.len(), "read subtree");
        Ok(closures)
    }

    /// Reconstructed view of the subtree at `node`.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::NodeNotFound`] for a missing node,
    /// [`TreeError::AmbiguousTree`] for corrupt closures, or a store error.
    pub fn subtree(&mut self, node: NodeId, max_depth: Option<u32>) -> Result<Tree, TreeError> {
        let closures = self.get_tree(node, max_depth)?;
        if closures.is_empty() {
            return Err(TreeError::NodeNotFound(node));
        }
        Tree::from_closures(&closures)
    }

    /// `true` iff `descendant` lies strictly below `ancestor`.
    ///
    /// # Errors
    ///
    /// Returns a store error.
    pub fn is_child_of(&mut self, ancestor: NodeId, descendant: NodeId) -> Result<bool, TreeError> {
        let tx = self.store.begin_read()?;
        let found = ops::is_descendant_of(&tx, ancestor, descendant)?;
        tx.commit()?;
        Ok(found)
    }

    /// Strict ancestors of `node`, nearest first.
    ///
    /// # Errors
    ///
    /// Returns a store error.
    pub fn ancestors(&mut self, node: NodeId) -> Result<Vec<NodeId>, TreeError> {
        let tx = self.store.begin_read()?;
        let ancestors = ops::ancestors(&tx, node)?;
        tx.commit()?;
        Ok(ancestors)
    }

    /// Root of every tree in the forest, ascending.
    ///
    /// # Errors
    ///
    /// Returns a store error.
    pub fn roots(&mut self) -> Result<Vec<NodeId>, TreeError> {
        let tx = self.store.begin_read()?;
        let roots = ops::roots(&tx)?;
        tx.commit()?;
        Ok(roots)
    }

    /// Check every closure invariant across the store.
    ///
    /// # Errors
    ///
    /// Returns a store error.
    pub fn verify(&mut self) -> Result<IntegrityReport, TreeError> {
        let tx = self.store.begin_read()?;
        let report = verify::verify(&tx)?;
        tx.commit()?;
        debug!(
            nodes = report.nodes,
            closures = report.closures,
            violations = report.violations.len(),
            "verified store"
        );
        Ok(report)
    }

    /// Remove every node and triple.
    ///
    /// # Errors
    ///
    /// Returns a store error.
    pub fn clear(&mut self) -> Result<(), TreeError> {
        let mut tx = self.store.begin()?;
        ops::clear(&mut tx)?;
        tx.commit()?;
        debug!("cleared store");
        Ok(())
    }
}
