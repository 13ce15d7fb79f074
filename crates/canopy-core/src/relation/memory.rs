//! In-process double of the node store and closure relation.
//!
//! [`MemoryRelation`] holds both relations in ordered maps so results are
//! deterministic. [`MemoryStore`] adds transactional scopes by staging a
//! copy of the relation and swapping it in on commit.

use std::collections::{BTreeMap, BTreeSet};

use super::{ClosureRelation, Scope, TransactionalStore, check_existing, check_shape};
use crate::error::TreeError;
use crate::model::{Closure, NodeId};

/// Both relations, held in memory.
#[derive(Debug, Clone)]
pub struct MemoryRelation {
    next_id: i64,
    nodes: BTreeSet<NodeId>,
    closures: BTreeMap<(NodeId, NodeId), u32>,
}

impl Default for MemoryRelation {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRelation {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next_id: 1,
            nodes: BTreeSet::new(),
            closures: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn closure_count(&self) -> usize {
        self.closures.len()
    }
}

impl ClosureRelation for MemoryRelation {
    fn allocate_node(&mut self) -> Result<NodeId, TreeError> {
        let id = NodeId::new(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id);
        Ok(id)
    }

    fn node_exists(&self, node: NodeId) -> Result<bool, TreeError> {
        Ok(self.nodes.contains(&node))
    }

    fn remove_nodes(&mut self, nodes: &BTreeSet<NodeId>) -> Result<usize, TreeError> {
        Ok(nodes.iter().filter(|id| self.nodes.remove(id)).count())
    }

    fn ancestors_of(&self, node: NodeId) -> Result<Vec<(NodeId, u32)>, TreeError> {
        let mut ancestors: Vec<(NodeId, u32)> = self
            .closures
            .iter()
            .filter(|((_, descendant), _)| *descendant == node)
            .map(|((ancestor, _), depth)| (*ancestor, *depth))
            .collect();
        ancestors.sort_by_key(|(id, depth)| (*depth, *id));
        Ok(ancestors)
    }

    fn descendants_of(
        &self,
        node: NodeId,
        max_depth: Option<u32>,
    ) -> Result<Vec<(NodeId, u32)>, TreeError> {
        let mut descendants: Vec<(NodeId, u32)> = self
            .closures
            .range((node, NodeId::new(i64::MIN))..=(node, NodeId::new(i64::MAX)))
            .filter(|(_, depth)| max_depth.is_none_or(|max| **depth <= max))
            .map(|((_, descendant), depth)| (*descendant, *depth))
            .collect();
        descendants.sort_by_key(|(id, depth)| (*depth, *id));
        Ok(descendants)
    }

    fn insert_closure(&mut self, closure: Closure) -> Result<(), TreeError> {
        check_shape(closure)?;
        let key = (closure.ancestor, closure.descendant);
        if check_existing(closure, self.closures.get(&key).copied())? {
            self.closures.insert(key, closure.depth);
        }
        Ok(())
    }

    fn delete_closures_involving(&mut self, nodes: &BTreeSet<NodeId>) -> Result<usize, TreeError> {
        let before = self.closures.len();
        self.closures
            .retain(|(ancestor, descendant), _| !nodes.contains(ancestor) && !nodes.contains(descendant));
        Ok(before - self.closures.len())
    }

    fn delete_links(
        &mut self,
        ancestors: &BTreeSet<NodeId>,
        descendants: &BTreeSet<NodeId>,
    ) -> Result<usize, TreeError> {
        let before = self.closures.len();
        self.closures.retain(|(ancestor, descendant), _| {
            !(ancestors.contains(ancestor) && descendants.contains(descendant))
        });
        Ok(before - self.closures.len())
    }

    fn closures_among(&self, nodes: &BTreeSet<NodeId>) -> Result<Vec<Closure>, TreeError> {
        Ok(self
            .closures
            .iter()
            .filter(|((ancestor, descendant), _)| {
                nodes.contains(ancestor) && nodes.contains(descendant)
            })
            .map(|((ancestor, descendant), depth)| Closure::new(*ancestor, *descendant, *depth))
            .collect())
    }

    fn all_nodes(&self) -> Result<Vec<NodeId>, TreeError> {
        Ok(self.nodes.iter().copied().collect())
    }

    fn all_closures(&self) -> Result<Vec<Closure>, TreeError> {
        Ok(self
            .closures
            .iter()
            .map(|((ancestor, descendant), depth)| Closure::new(*ancestor, *descendant, *depth))
            .collect())
    }

    fn clear(&mut self) -> Result<(), TreeError> {
        // The allocator keeps counting so ids stay disjoint across resets.
        self.nodes.clear();
        self.closures.clear();
        Ok(())
    }
}

/// Transactional wrapper around a [`MemoryRelation`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    relation: MemoryRelation,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed state, for assertions.
    #[must_use]
    pub const fn relation(&self) -> &MemoryRelation {
        &self.relation
    }
}

/// Scope over a staged copy of the store; dropped without commit, it
/// leaves the store untouched.
#[derive(Debug)]
pub struct MemoryTx<'a> {
    target: &'a mut MemoryRelation,
    staged: MemoryRelation,
}

impl TransactionalStore for MemoryStore {
    type Tx<'a> = MemoryTx<'a>;

    fn begin(&mut self) -> Result<Self::Tx<'_>, TreeError> {
        let staged = self.relation.clone();
        Ok(MemoryTx {
            target: &mut self.relation,
            staged,
        })
    }
}

impl Scope for MemoryTx<'_> {
    fn commit(self) -> Result<(), TreeError> {
        *self.target = self.staged;
        Ok(())
    }
}

impl ClosureRelation for MemoryTx<'_> {
    fn allocate_node(&mut self) -> Result<NodeId, TreeError> {
        self.staged.allocate_node()
    }

    fn node_exists(&self, node: NodeId) -> Result<bool, TreeError> {
        self.staged.node_exists(node)
    }

    fn remove_nodes(&mut self, nodes: &BTreeSet<NodeId>) -> Result<usize, TreeError> {
        self.staged.remove_nodes(nodes)
    }

    fn ancestors_of(&self, node: NodeId) -> Result<Vec<(NodeId, u32)>, TreeError> {
        self.staged.ancestors_of(node)
    }

    fn descendants_of(
        &self,
        node: NodeId,
        max_depth: Option<u32>,
    ) -> Result<Vec<(NodeId, u32)>, TreeError> {
        self.staged.descendants_of(node, max_depth)
    }

    fn insert_closure(&mut self, closure: Closure) -> Result<(), TreeError> {
        self.staged.insert_closure(closure)
    }

    fn delete_closures_involving(&mut self, nodes: &BTreeSet<NodeId>) -> Result<usize, TreeError> {
        self.staged.delete_closures_involving(nodes)
    }

    fn delete_links(
        &mut self,
        ancestors: &BTreeSet<NodeId>,
        descendants: &BTreeSet<NodeId>,
    ) -> Result<usize, TreeError> {
        self.staged.delete_links(ancestors, descendants)
    }

    fn closures_among(&self, nodes: &BTreeSet<NodeId>) -> Result<Vec<Closure>, TreeError> {
        self.staged.closures_among(nodes)
    }

    fn all_nodes(&self) -> Result<Vec<NodeId>, TreeError> {
        self.staged.all_nodes()
    }

    fn all_closures(&self) -> Result<Vec<Closure>, TreeError> {
        self.staged.all_closures()
    }

    fn clear(&mut self) -> Result<(), TreeError> {
        self.staged.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocator_never_reuses_ids_after_clear() {
        let mut rel = MemoryRelation::new();
        let a = rel.allocate_node().unwrap();
        rel.clear().unwrap();
        let b = rel.allocate_node().unwrap();
        assert!(b > a);
        assert_eq!(rel.node_count(), 1);
    }

    #[test]
    fn descendants_respect_max_depth() {
        let mut rel = MemoryRelation::new();
        let a = rel.allocate_node().unwrap();
        let b = rel.allocate_node().unwrap();
        let c = rel.allocate_node().unwrap();
        for closure in [
            Closure::self_closure(a),
            Closure::self_closure(b),
            Closure::self_closure(c),
            Closure::new(a, b, 1),
            Closure::new(b, c, 1),
            Closure::new(a, c, 2),
        ] {
            rel.insert_closure(closure).unwrap();
        }

        assert_eq!(rel.descendants_of(a, Some(1)).unwrap(), vec![(a, 0), (b, 1)]);
        assert_eq!(rel.descendants_of(a, None).unwrap().len(), 3);
        assert_eq!(rel.ancestors_of(c).unwrap(), vec![(c, 0), (b, 1), (a, 2)]);
    }

    #[test]
    fn conflicting_depth_is_a_constraint_violation() {
        let mut rel = MemoryRelation::new();
        let a = rel.allocate_node().unwrap();
        let b = rel.allocate_node().unwrap();
        rel.insert_closure(Closure::new(a, b, 1)).unwrap();
        rel.insert_closure(Closure::new(a, b, 1)).unwrap();
        assert_eq!(rel.closure_count(), 1);

        let err = rel.insert_closure(Closure::new(a, b, 2)).unwrap_err();
        assert!(matches!(err, TreeError::ConstraintViolation { .. }));
    }

    #[test]
    fn dropped_scope_rolls_back() {
        let mut store = MemoryStore::new();
        {
            let mut tx = store.begin().unwrap();
            let id = tx.allocate_node().unwrap();
            tx.insert_closure(Closure::self_closure(id)).unwrap();
        }
        assert_eq!(store.relation().node_count(), 0);
        assert_eq!(store.relation().closure_count(), 0);

        let mut tx = store.begin().unwrap();
        let id = tx.allocate_node().unwrap();
        tx.insert_closure(Closure::self_closure(id)).unwrap();
        tx.commit().unwrap();
        assert_eq!(store.relation().node_count(), 1);
    }

    #[test]
    fn delete_links_only_touches_the_cross_product() {
        let mut rel = MemoryRelation::new();
        let a = rel.allocate_node().unwrap();
        let b = rel.allocate_node().unwrap();
        let c = rel.allocate_node().unwrap();
        for closure in [
            Closure::self_closure(a),
            Closure::self_closure(b),
            Closure::self_closure(c),
            Closure::new(a, b, 1),
            Closure::new(b, c, 1),
            Closure::new(a, c, 2),
        ] {
            rel.insert_closure(closure).unwrap();
        }

        let removed = rel
            .delete_links(&BTreeSet::from([a]), &BTreeSet::from([b, c]))
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(
            rel.closures_among(&BTreeSet::from([b, c])).unwrap(),
            vec![
                Closure::self_closure(b),
                Closure::new(b, c, 1),
                Closure::self_closure(c),
            ]
        );
    }
}
