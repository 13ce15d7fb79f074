//! `canopy roots`: list the root of every tree.

use anyhow::Result;
use canopy_core::NodeId;
use serde::Serialize;

use super::Context;
use crate::output::{fail, render_mode};

#[derive(Debug, Serialize)]
struct Roots {
    roots: Vec<NodeId>,
}

pub fn run_roots(ctx: &Context) -> Result<()> {
    let mut forest = ctx.open_forest()?;
    let roots = forest.roots().map_err(|err| fail(ctx.output, err))?;

    render_mode(
        ctx.output,
        &Roots { roots },
        |r, w| {
            for root in &r.roots {
                writeln!(w, "{root}")?;
            }
            Ok(())
        },
        |r, w| {
            if r.roots.is_empty() {
                return writeln!(w, "forest is empty");
            }
            writeln!(w, "{} tree(s)", r.roots.len())?;
            for root in &r.roots {
                writeln!(w, "  {root}")?;
            }
            Ok(())
        },
    )
}
