//! `canopy ancestors`: the path from a node up to its root.

use anyhow::Result;
use canopy_core::NodeId;
use clap::Args;
use serde::Serialize;

use super::Context;
use crate::output::{fail, join_ids, render_mode};

#[derive(Args, Debug)]
pub struct AncestorsArgs {
    /// Node whose ancestors to list.
    pub id: NodeId,
}

#[derive(Debug, Serialize)]
struct Ancestry {
    id: NodeId,
    /// Nearest first.
    ancestors: Vec<NodeId>,
}

pub fn run_ancestors(args: &AncestorsArgs, ctx: &Context) -> Result<()> {
    let mut forest = ctx.open_forest()?;
    let ancestors = forest
        .ancestors(args.id)
        .map_err(|err| fail(ctx.output, err))?;

    let result = Ancestry {
        id: args.id,
        ancestors,
    };
    render_mode(
        ctx.output,
        &result,
        |r, w| writeln!(w, "{}", join_ids(&r.ancestors)),
        |r, w| {
            let mut path = vec![r.id.to_string()];
            path.extend(r.ancestors.iter().map(ToString::to_string));
            writeln!(w, "{}", path.join(" → "))
        },
    )
}
