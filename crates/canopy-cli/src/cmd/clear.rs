//! `canopy clear`: delete every node and closure.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use super::Context;
use crate::output::{CliError, fail, render, render_error};

#[derive(Args, Debug)]
pub struct ClearArgs {
    /// Confirm that every tree should be deleted.
    #[arg(long)]
    pub yes: bool,
}

#[derive(Debug, Serialize)]
struct Cleared {
    cleared: bool,
    db_path: String,
}

pub fn run_clear(args: &ClearArgs, ctx: &Context) -> Result<()> {
    if !args.yes {
        render_error(
            ctx.output,
            &CliError::new("refusing to clear the forest without --yes"),
        )?;
        anyhow::bail!("refusing to clear the forest without --yes");
    }

    let mut forest = ctx.open_forest()?;
    forest.clear().map_err(|err| fail(ctx.output, err))?;

    let result = Cleared {
        cleared: true,
        db_path: ctx.config.db_path.display().to_string(),
    };
    render(ctx.output, &result, |r, w| writeln!(w, "cleared {}", r.db_path))
}
