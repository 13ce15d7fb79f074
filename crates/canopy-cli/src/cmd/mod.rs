//! Command handlers, one module per subcommand.

pub mod add;
pub mod ancestors;
pub mod clear;
pub mod completions;
pub mod copy;
pub mod delete;
pub mod init;
pub mod move_cmd;
pub mod roots;
pub mod tree;
pub mod verify;

use anyhow::Result;
use canopy_core::config::EffectiveConfig;
use canopy_core::db::try_open_store;
use canopy_core::{ErrorCode, Forest, NodeId, SqliteStore};
use clap::Args;
use std::path::PathBuf;

use crate::output::{CliError, OutputMode, render_error};

/// Everything a handler needs besides its own arguments.
#[derive(Debug)]
pub struct Context {
    pub project_root: PathBuf,
    pub config: EffectiveConfig,
    pub output: OutputMode,
}

impl Context {
    /// Open the forest, failing with `E1001` when `canopy init` has not run.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is missing or cannot be opened.
    pub fn open_forest(&self) -> Result<Forest<SqliteStore>> {
        let db_path = &self.config.db_path;
        let store_config = &self.config.project.store;
        match try_open_store(db_path, store_config)? {
            Some(conn) => Ok(Forest::new(SqliteStore::from_connection(conn, store_config))),
            None => {
                let code = ErrorCode::NotInitialized;
                let message =
                    format!("{}: no forest store at {}", code.message(), db_path.display());
                render_error(self.output, &CliError::coded(code, message.clone()))?;
                anyhow::bail!(message)
            }
        }
    }
}

/// Shared `--parent ID | --root` selector for commands that place a subtree.
#[derive(Args, Debug, Clone, Copy)]
#[group(required = true, multiple = false)]
pub struct Placement {
    /// New parent node id.
    #[arg(long, value_name = "ID")]
    pub parent: Option<NodeId>,

    /// Make the subtree a standalone tree.
    #[arg(long)]
    pub root: bool,
}

impl Placement {
    /// `None` when `--root` was given.
    pub const fn parent(self) -> Option<NodeId> {
        if self.root { None } else { self.parent }
    }
}
