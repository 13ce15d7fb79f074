//! `canopy init`: create `.canopy/` and an empty, migrated store.

use anyhow::{Context as _, Result};
use canopy_core::config::STATE_DIR;
use canopy_core::db::{migrations, open_store};
use clap::Args;
use serde::Serialize;

use super::Context;
use crate::output::{pretty_kv, render_mode};

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Rewrite `.canopy/config.toml` even if the store already exists.
    #[arg(long)]
    pub force: bool,
}

const CONFIG_TOML: &str = "[store]\n\
    path = \".canopy/canopy.db\"\n\
    busy_timeout_ms = 5000\n\
    # deferred | immediate | exclusive\n\
    write_lock = \"immediate\"\n";

const GITIGNORE: &str = "canopy.db\ncanopy.db-wal\ncanopy.db-shm\n";

#[derive(Debug, Serialize)]
struct Initialized {
    state_dir: String,
    db_path: String,
    schema_version: u32,
}

/// Execute `canopy init`. Creates:
///
/// ```text
/// .canopy/
///   config.toml   (store settings template)
///   .gitignore    (database and WAL files)
///   canopy.db     (migrated, empty)
/// ```
///
/// # Errors
///
/// Returns an error if the store already exists and `--force` is not set,
/// or if any filesystem or SQLite operation fails.
pub fn run_init(args: &InitArgs, ctx: &Context) -> Result<()> {
    let state_dir = ctx.project_root.join(STATE_DIR);
    let db_path = &ctx.config.db_path;

    if db_path.exists() && !args.force {
        anyhow::bail!(
            "store already exists at {}. Use `canopy init --force` to reinitialize.",
            db_path.display()
        );
    }

    std::fs::create_dir_all(&state_dir)
        .with_context(|| format!("Failed to create {}", state_dir.display()))?;

    let config_path = state_dir.join("config.toml");
    if args.force || !config_path.exists() {
        std::fs::write(&config_path, CONFIG_TOML)
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
    }
    let gitignore_path = state_dir.join(".gitignore");
    if !gitignore_path.exists() {
        std::fs::write(&gitignore_path, GITIGNORE)
            .with_context(|| format!("Failed to write {}", gitignore_path.display()))?;
    }

    let conn = open_store(db_path, &ctx.config.project.store)?;
    let schema_version = migrations::current_schema_version(&conn)?;
    tracing::info!(path = %db_path.display(), "initialized forest store");

    let result = Initialized {
        state_dir: state_dir.display().to_string(),
        db_path: db_path.display().to_string(),
        schema_version,
    };
    render_mode(
        ctx.output,
        &result,
        |r, w| writeln!(w, "{}", r.db_path),
        |r, w| {
            writeln!(w, "✓ initialized canopy store")?;
            pretty_kv(w, "state", &r.state_dir)?;
            pretty_kv(w, "database", &r.db_path)?;
            pretty_kv(w, "schema", r.schema_version.to_string())
        },
    )
}
