//! Value types shared by every store and operation.
//!
//! Node identity is a plain integer key. Two lookups of the same id from
//! separately built views compare equal; there is no object identity.

use rusqlite::ToSql;
use rusqlite::types::{FromSql, FromSqlResult, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Surrogate key of a node in the forest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(i64);

impl NodeId {
    #[must_use]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NodeId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(Self)
    }
}

impl From<i64> for NodeId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

impl ToSql for NodeId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0))
    }
}

impl FromSql for NodeId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        i64::column_result(value).map(Self)
    }
}

/// One reachability fact: `descendant` sits `depth` parent-hops below
/// `ancestor`. Depth 0 is the self-closure every node carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Closure {
    pub ancestor: NodeId,
    pub descendant: NodeId,
    pub depth: u32,
}

impl Closure {
    #[must_use]
    pub const fn new(ancestor: NodeId, descendant: NodeId, depth: u32) -> Self {
        Self {
            ancestor,
            descendant,
            depth,
        }
    }

    /// The `(n, n, 0)` triple.
    #[must_use]
    pub const fn self_closure(node: NodeId) -> Self {
        Self::new(node, node, 0)
    }

    #[must_use]
    pub fn is_self(&self) -> bool {
        self.ancestor == self.descendant
    }

    /// Ordering used for every read result: shallow triples first.
    #[must_use]
    pub const fn sort_key(&self) -> (u32, NodeId, NodeId) {
        (self.depth, self.ancestor, self.descendant)
    }
}

impl From<(NodeId, NodeId, u32)> for Closure {
    fn from((ancestor, descendant, depth): (NodeId, NodeId, u32)) -> Self {
        Self::new(ancestor, descendant, depth)
    }
}

impl fmt::Display for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.ancestor, self.descendant, self.depth)
    }
}
