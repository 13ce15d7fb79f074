//! `canopy copy`: duplicate a subtree with fresh ids.

use anyhow::Result;
use canopy_core::NodeId;
use clap::Args;
use serde::Serialize;

use super::{Context, Placement};
use crate::output::{fail, join_ids, render_mode};

#[derive(Args, Debug)]
pub struct CopyArgs {
    /// Root of the subtree to copy.
    pub id: NodeId,

    #[command(flatten)]
    pub placement: Placement,
}

#[derive(Debug, Serialize)]
struct Copied {
    source: NodeId,
    parent: Option<NodeId>,
    /// New ids in pre-order; the first is the copy of `source`.
    created: Vec<NodeId>,
}

pub fn run_copy(args: &CopyArgs, ctx: &Context) -> Result<()> {
    let parent = args.placement.parent();
    let mut forest = ctx.open_forest()?;
    let created = forest
        .copy_node(args.id, parent)
        .map_err(|err| fail(ctx.output, err))?;

    let result = Copied {
        source: args.id,
        parent,
        created,
    };
    render_mode(
        ctx.output,
        &result,
        |r, w| writeln!(w, "{}", join_ids(&r.created)),
        |r, w| {
            writeln!(
                w,
                "copied {} node(s) from {}: {}",
                r.created.len(),
                r.source,
                join_ids(&r.created)
            )
        },
    )
}
