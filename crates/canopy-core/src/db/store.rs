//! [`ClosureRelation`] over a SQLite transaction.

use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior, params};
use std::collections::BTreeSet;
use std::path::Path;

use super::{migrations, open_store};
use crate::config::{StoreConfig, WriteLock};
use crate::error::TreeError;
use crate::model::{Closure, NodeId};
use crate::relation::{ClosureRelation, Scope, TransactionalStore, check_existing, check_shape};

/// Forest store persisted in SQLite. Each scope is one SQLite transaction
/// opened with the configured locking behavior.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    write_lock: WriteLock,
}

impl SqliteStore {
    /// Open (or create) the database at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: &Path, config: &StoreConfig) -> anyhow::Result<Self> {
        let conn = open_store(path, config)?;
        Ok(Self::from_connection(conn, config))
    }

    /// A private in-memory database, migrated and ready.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::Transaction`] if SQLite cannot create it.
    pub fn in_memory() -> Result<Self, TreeError> {
        let mut conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations::migrate(&mut conn)?;
        Ok(Self::from_connection(conn, &StoreConfig::default()))
    }

    /// Wrap an already migrated connection.
    #[must_use]
    pub fn from_connection(conn: Connection, config: &StoreConfig) -> Self {
        Self {
            conn,
            write_lock: config.write_lock,
        }
    }

    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl TransactionalStore for SqliteStore {
    type Tx<'a> = SqliteTx<'a>;

    fn begin(&mut self) -> Result<Self::Tx<'_>, TreeError> {
        let tx = self.conn.transaction_with_behavior(self.write_lock.behavior())?;
        Ok(SqliteTx { tx })
    }

    /// Deferred: under WAL the scope reads a snapshot and takes no write
    /// lock.
    fn begin_read(&mut self) -> Result<Self::Tx<'_>, TreeError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Deferred)?;
        Ok(SqliteTx { tx })
    }
}

/// One open SQLite transaction. Dropping it rolls back.
pub struct SqliteTx<'conn> {
    tx: Transaction<'conn>,
}

impl Scope for SqliteTx<'_> {
    fn commit(self) -> Result<(), TreeError> {
        self.tx.commit()?;
        Ok(())
    }
}

impl ClosureRelation for SqliteTx<'_> {
    fn allocate_node(&mut self) -> Result<NodeId, TreeError> {
        self.tx
            .prepare_cached("INSERT INTO nodes DEFAULT VALUES")?
            .execute([])?;
        Ok(NodeId::new(self.tx.last_insert_rowid()))
    }

    fn node_exists(&self, node: NodeId) -> Result<bool, TreeError> {
        let exists = self.tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM nodes WHERE id = ?1)",
            [node],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn remove_nodes(&mut self, nodes: &BTreeSet<NodeId>) -> Result<usize, TreeError> {
        let mut stmt = self.tx.prepare_cached("DELETE FROM nodes WHERE id = ?1")?;
        let mut removed = 0;
        for node in nodes {
            removed += stmt.execute([node])?;
        }
        Ok(removed)
    }

    fn ancestors_of(&self, node: NodeId) -> Result<Vec<(NodeId, u32)>, TreeError> {
        let mut stmt = self.tx.prepare_cached(
            "SELECT ancestor, depth
             FROM closures
             WHERE descendant = ?1
             ORDER BY depth, ancestor",
        )?;
        let rows = stmt
            .query_map([node], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn descendants_of(
        &self,
        node: NodeId,
        max_depth: Option<u32>,
    ) -> Result<Vec<(NodeId, u32)>, TreeError> {
        let mut stmt = self.tx.prepare_cached(
            "SELECT descendant, depth
             FROM closures
             WHERE ancestor = ?1 AND (?2 IS NULL OR depth <= ?2)
             ORDER BY depth, descendant",
        )?;
        let rows = stmt
            .query_map(params![node, max_depth], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn insert_closure(&mut self, closure: Closure) -> Result<(), TreeError> {
        check_shape(closure)?;
        let existing: Option<u32> = self
            .tx
            .prepare_cached("SELECT depth FROM closures WHERE ancestor = ?1 AND descendant = ?2")?
            .query_row(params![closure.ancestor, closure.descendant], |row| row.get(0))
            .optional()?;
        if check_existing(closure, existing)? {
            self.tx
                .prepare_cached(
                    "INSERT INTO closures (ancestor, descendant, depth) VALUES (?1, ?2, ?3)",
                )?
                .execute(params![closure.ancestor, closure.descendant, closure.depth])?;
        }
        Ok(())
    }

    fn delete_closures_involving(&mut self, nodes: &BTreeSet<NodeId>) -> Result<usize, TreeError> {
        let mut stmt = self
            .tx
            .prepare_cached("DELETE FROM closures WHERE ancestor = ?1 OR descendant = ?1")?;
        let mut removed = 0;
        for node in nodes {
            removed += stmt.execute([node])?;
        }
        Ok(removed)
    }

    fn delete_links(
        &mut self,
        ancestors: &BTreeSet<NodeId>,
        descendants: &BTreeSet<NodeId>,
    ) -> Result<usize, TreeError> {
        let mut stmt = self
            .tx
            .prepare_cached("DELETE FROM closures WHERE ancestor = ?1 AND descendant = ?2")?;
        let mut removed = 0;
        for ancestor in ancestors {
            for descendant in descendants {
                removed += stmt.execute(params![ancestor, descendant])?;
            }
        }
        Ok(removed)
    }

    fn closures_among(&self, nodes: &BTreeSet<NodeId>) -> Result<Vec<Closure>, TreeError> {
        let mut stmt = self
            .tx
            .prepare_cached("SELECT descendant, depth FROM closures WHERE ancestor = ?1")?;
        let mut closures = Vec::new();
        for ancestor in nodes {
            let rows = stmt.query_map([ancestor], |row| {
                Ok(Closure::new(*ancestor, row.get(0)?, row.get(1)?))
            })?;
            for row in rows {
                let closure = row?;
                if nodes.contains(&closure.descendant) {
                    closures.push(closure);
                }
            }
        }
        Ok(closures)
    }

    fn all_nodes(&self) -> Result<Vec<NodeId>, TreeError> {
        let mut stmt = self.tx.prepare_cached("SELECT id FROM nodes ORDER BY id")?;
        let rows = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn all_closures(&self) -> Result<Vec<Closure>, TreeError> {
        let mut stmt = self.tx.prepare_cached(
            "SELECT ancestor, descendant, depth
             FROM closures
             ORDER BY ancestor, descendant",
        )?;
        let rows = stmt
            .query_map([], |row| Ok(Closure::new(row.get(0)?, row.get(1)?, row.get(2)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn clear(&mut self) -> Result<(), TreeError> {
        self.tx
            .execute_batch("DELETE FROM closures; DELETE FROM nodes;")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(tx: &mut SqliteTx<'_>) -> (NodeId, NodeId, NodeId) {
        let a = tx.allocate_node().unwrap();
        let b = tx.allocate_node().unwrap();
        let c = tx.allocate_node().unwrap();
        for closure in [
            Closure::self_closure(a),
            Closure::self_closure(b),
            Closure::self_closure(c),
            Closure::new(a, b, 1),
            Closure::new(b, c, 1),
            Closure::new(a, c, 2),
        ] {
            tx.insert_closure(closure).unwrap();
        }
        (a, b, c)
    }

    #[test]
    fn allocated_ids_are_not_reused_after_clear() {
        let mut store = SqliteStore::in_memory().unwrap();
        let mut tx = store.begin().unwrap();
        let first = tx.allocate_node().unwrap();
        tx.clear().unwrap();
        let second = tx.allocate_node().unwrap();
        assert!(second > first);
    }

    #[test]
    fn ancestor_and_descendant_queries() {
        let mut store = SqliteStore::in_memory().unwrap();
        let mut tx = store.begin().unwrap();
        let (a, b, c) = chain(&mut tx);

        assert_eq!(tx.ancestors_of(c).unwrap(), vec![(c, 0), (b, 1), (a, 2)]);
        assert_eq!(tx.descendants_of(a, None).unwrap(), vec![(a, 0), (b, 1), (c, 2)]);
        assert_eq!(tx.descendants_of(a, Some(1)).unwrap(), vec![(a, 0), (b, 1)]);
        assert_eq!(tx.descendants_of(a, Some(0)).unwrap(), vec![(a, 0)]);
    }

    #[test]
    fn conflicting_depth_is_a_constraint_violation() {
        let mut store = SqliteStore::in_memory().unwrap();
        let mut tx = store.begin().unwrap();
        let (a, _, c) = chain(&mut tx);

        tx.insert_closure(Closure::new(a, c, 2)).unwrap();
        let err = tx.insert_closure(Closure::new(a, c, 1)).unwrap_err();
        assert!(matches!(
            err,
            TreeError::ConstraintViolation {
                existing: 2,
                requested: 1,
                ..
            }
        ));
    }

    #[test]
    fn closures_among_ignores_outside_pairs() {
        let mut store = SqliteStore::in_memory().unwrap();
        let mut tx = store.begin().unwrap();
        let (_, b, c) = chain(&mut tx);

        let mut among = tx.closures_among(&BTreeSet::from([b, c])).unwrap();
        among.sort_by_key(Closure::sort_key);
        assert_eq!(
            among,
            vec![
                Closure::self_closure(b),
                Closure::self_closure(c),
                Closure::new(b, c, 1),
            ]
        );
    }

    #[test]
    fn uncommitted_scope_rolls_back() {
        let mut store = SqliteStore::in_memory().unwrap();
        {
            let mut tx = store.begin().unwrap();
            chain(&mut tx);
        }
        let count: i64 = store
            .connection()
            .query_row("SELECT COUNT(*) FROM nodes", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);

        let mut tx = store.begin().unwrap();
        chain(&mut tx);
        tx.commit().unwrap();
        let count: i64 = store
            .connection()
            .query_row("SELECT COUNT(*) FROM closures", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 6);
    }
}
