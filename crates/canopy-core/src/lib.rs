//! canopy-core library.
//!
//! Forests of trees stored as a closure table: every `(ancestor, descendant,
//! depth)` pair is kept explicitly, so subtree reads and ancestor checks are
//! single lookups while add, delete, move, and copy rewrite the relation
//! inside one transaction.
//!
//! # Conventions
//!
//! - **Errors**: library operations return [`TreeError`]; store bootstrap
//!   uses `anyhow::Result`.
//! - **Logging**: `tracing` macros, target `canopy_core`.
//!
//! ```rust,ignore
//! use canopy_core::Forest;
//!
//! let mut forest = Forest::in_memory();
//! let root = forest.add_node(None)?;
//! let child = forest.add_node(Some(root))?;
//! assert!(forest.is_child_of(root, child)?);
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod relation;
pub mod tree;

pub use db::SqliteStore;
pub use error::{ErrorCode, TreeError};
pub use model::{Closure, NodeId};
pub use relation::memory::MemoryStore;
pub use relation::{ClosureRelation, Scope, TransactionalStore};
pub use tree::{Forest, IntegrityReport, Tree, TreeNode, Violation};
