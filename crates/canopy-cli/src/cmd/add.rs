//! `canopy add`: create a root or a child node.

use anyhow::Result;
use canopy_core::NodeId;
use clap::Args;
use serde::Serialize;

use super::Context;
use crate::output::{fail, pretty_kv, render_mode};

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Parent node id; omit to start a new tree.
    #[arg(long, value_name = "ID")]
    pub parent: Option<NodeId>,
}

#[derive(Debug, Serialize)]
struct Added {
    id: NodeId,
    parent: Option<NodeId>,
}

pub fn run_add(args: &AddArgs, ctx: &Context) -> Result<()> {
    let mut forest = ctx.open_forest()?;
    let id = forest
        .add_node(args.parent)
        .map_err(|err| fail(ctx.output, err))?;

    let added = Added {
        id,
        parent: args.parent,
    };
    render_mode(
        ctx.output,
        &added,
        |a, w| writeln!(w, "{}", a.id),
        |a, w| {
            pretty_kv(w, "added", a.id.to_string())?;
            pretty_kv(
                w,
                "parent",
                a.parent.map_or_else(|| "(root)".to_string(), |p| p.to_string()),
            )
        },
    )
}
