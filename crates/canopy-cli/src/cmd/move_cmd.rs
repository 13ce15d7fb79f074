//! `canopy move`: re-hang a subtree under another node, or detach it.

use anyhow::Result;
use canopy_core::NodeId;
use clap::Args;
use serde::Serialize;
use std::collections::BTreeSet;

use super::{Context, Placement};
use crate::output::{fail, join_ids, render_mode};

#[derive(Args, Debug)]
pub struct MoveArgs {
    /// Root of the subtree to move.
    pub id: NodeId,

    #[command(flatten)]
    pub placement: Placement,
}

#[derive(Debug, Serialize)]
struct Moved {
    id: NodeId,
    parent: Option<NodeId>,
    moved: BTreeSet<NodeId>,
}

pub fn run_move(args: &MoveArgs, ctx: &Context) -> Result<()> {
    let parent = args.placement.parent();
    let mut forest = ctx.open_forest()?;
    let moved = forest
        .move_node(args.id, parent)
        .map_err(|err| fail(ctx.output, err))?;

    let result = Moved {
        id: args.id,
        parent,
        moved,
    };
    render_mode(
        ctx.output,
        &result,
        |r, w| writeln!(w, "{}", join_ids(&r.moved)),
        |r, w| {
            if r.moved.is_empty() {
                return writeln!(w, "nothing to move: node {} does not exist", r.id);
            }
            match r.parent {
                Some(parent) => writeln!(
                    w,
                    "moved {} node(s) under {parent}: {}",
                    r.moved.len(),
                    join_ids(&r.moved)
                ),
                None => writeln!(
                    w,
                    "detached {} node(s) as a new tree: {}",
                    r.moved.len(),
                    join_ids(&r.moved)
                ),
            }
        },
    )
}
