use std::fmt;

use crate::model::NodeId;

/// Machine-readable error codes for scripted callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotInitialized,
    ConfigParseError,
    NodeNotFound,
    InvalidRelocation,
    AmbiguousTree,
    ConstraintViolation,
    IntegrityViolation,
    TransactionFailure,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotInitialized => "E1001",
            Self::ConfigParseError => "E1002",
            Self::NodeNotFound => "E2001",
            Self::InvalidRelocation => "E2002",
            Self::AmbiguousTree => "E2003",
            Self::ConstraintViolation => "E3001",
            Self::IntegrityViolation => "E3002",
            Self::TransactionFailure => "E5001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotInitialized => "Store not initialized",
            Self::ConfigParseError => "Config file parse error",
            Self::NodeNotFound => "Node not found",
            Self::InvalidRelocation => "Move would create a cycle",
            Self::AmbiguousTree => "Closure set does not describe exactly one tree",
            Self::ConstraintViolation => "Closure pair already exists with another depth",
            Self::IntegrityViolation => "Closure invariants violated",
            Self::TransactionFailure => "Store transaction failed",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run `canopy init` to create the store."),
            Self::ConfigParseError => Some("Fix syntax in .canopy/config.toml and retry."),
            Self::NodeNotFound => None,
            Self::InvalidRelocation => {
                Some("Pick a new parent outside the subtree of the node being moved.")
            }
            Self::AmbiguousTree | Self::ConstraintViolation => {
                Some("Run `canopy verify` and report a bug with the output.")
            }
            Self::IntegrityViolation => Some("Restore from backup or rebuild the affected trees."),
            Self::TransactionFailure => {
                Some("Retry the operation; no partial changes were committed.")
            }
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Failures raised by tree operations and the stores beneath them.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// A closure pair was inserted twice with different depths.
    #[error("closure ({ancestor}, {descendant}) exists at depth {existing}, refusing depth {requested}")]
    ConstraintViolation {
        ancestor: NodeId,
        descendant: NodeId,
        existing: u32,
        requested: u32,
    },

    /// The requested new parent is the node itself or one of its descendants.
    #[error("cannot move {node} under {new_parent}: a node cannot be moved to one of its descendants")]
    InvalidRelocation { node: NodeId, new_parent: NodeId },

    /// A referenced node does not exist.
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    /// Closure data handed to the reconstructor did not form a single tree.
    #[error("closure set is not a single tree: {reason}")]
    AmbiguousTree { reason: String },

    /// The backing store aborted, timed out, or lost its connection.
    #[error("store transaction failed: {0}")]
    Transaction(#[from] rusqlite::Error),
}

impl TreeError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::ConstraintViolation { .. } => ErrorCode::ConstraintViolation,
            Self::InvalidRelocation { .. } => ErrorCode::InvalidRelocation,
            Self::NodeNotFound(_) => ErrorCode::NodeNotFound,
            Self::AmbiguousTree { .. } => ErrorCode::AmbiguousTree,
            Self::Transaction(_) => ErrorCode::TransactionFailure,
        }
    }

    /// Optional remediation hint for operators.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}
