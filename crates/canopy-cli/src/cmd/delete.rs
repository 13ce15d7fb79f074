//! `canopy delete`: remove a node and its whole subtree.

use anyhow::Result;
use canopy_core::NodeId;
use clap::Args;
use serde::Serialize;
use std::collections::BTreeSet;

use super::Context;
use crate::output::{fail, join_ids, render_mode};

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Node to delete, together with everything beneath it.
    pub id: NodeId,
}

#[derive(Debug, Serialize)]
struct Deleted {
    id: NodeId,
    deleted: BTreeSet<NodeId>,
}

pub fn run_delete(args: &DeleteArgs, ctx: &Context) -> Result<()> {
    let mut forest = ctx.open_forest()?;
    let deleted = forest
        .delete_node(args.id)
        .map_err(|err| fail(ctx.output, err))?;

    let result = Deleted {
        id: args.id,
        deleted,
    };
    render_mode(
        ctx.output,
        &result,
        |r, w| writeln!(w, "{}", join_ids(&r.deleted)),
        |r, w| {
            if r.deleted.is_empty() {
                writeln!(w, "nothing to delete: node {} does not exist", r.id)
            } else {
                writeln!(
                    w,
                    "deleted {} node(s): {}",
                    r.deleted.len(),
                    join_ids(&r.deleted)
                )
            }
        },
    )
}
