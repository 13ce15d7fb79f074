//! `canopy tree`: show the subtree rooted at a node.

use anyhow::Result;
use canopy_core::{Closure, NodeId, Tree, TreeError, TreeNode};
use clap::Args;
use serde::Serialize;
use std::io::{self, Write};

use super::Context;
use crate::output::{fail, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct TreeArgs {
    /// Root of the subtree to show.
    pub id: NodeId,

    /// Only include nodes at most this many levels below the root.
    #[arg(long, value_name = "N")]
    pub depth: Option<u32>,
}

#[derive(Debug, Serialize)]
struct SubtreeView {
    root: NodeId,
    max_depth: Option<u32>,
    nodes: Vec<NodeId>,
    closures: Vec<Closure>,
    #[serde(skip)]
    tree: Tree,
}

pub fn run_tree(args: &TreeArgs, ctx: &Context) -> Result<()> {
    let mut forest = ctx.open_forest()?;
    let closures = forest
        .get_tree(args.id, args.depth)
        .map_err(|err| fail(ctx.output, err))?;
    if closures.is_empty() {
        return Err(fail(ctx.output, TreeError::NodeNotFound(args.id)));
    }
    let tree = Tree::from_closures(&closures).map_err(|err| fail(ctx.output, err))?;

    let view = SubtreeView {
        root: args.id,
        max_depth: args.depth,
        nodes: tree.preorder(),
        closures,
        tree,
    };
    render_mode(
        ctx.output,
        &view,
        |v, w| {
            for closure in &v.closures {
                writeln!(w, "{}\t{}\t{}", closure.ancestor, closure.descendant, closure.depth)?;
            }
            Ok(())
        },
        |v, w| {
            pretty_section(w, &format!("tree {} ({} nodes)", v.root, v.nodes.len()))?;
            draw(w, v.tree.root(), "", true, true)
        },
    )
}

/// Box-drawing outline, children in ascending id order.
fn draw(w: &mut dyn Write, node: &TreeNode, prefix: &str, last: bool, top: bool) -> io::Result<()> {
    if top {
        writeln!(w, "{}", node.id())?;
    } else {
        let branch = if last { "└── " } else { "├── " };
        writeln!(w, "{prefix}{branch}{}", node.id())?;
    }

    let child_prefix = if top {
        String::new()
    } else if last {
        format!("{prefix}    ")
    } else {
        format!("{prefix}│   ")
    };

    let children: Vec<&TreeNode> = node.children().collect();
    for (i, child) in children.iter().enumerate() {
        draw(w, child, &child_prefix, i + 1 == children.len(), false)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(raw: i64) -> NodeId {
        NodeId::new(raw)
    }

    #[test]
    fn draw_renders_nested_branches() {
        let tree = Tree::from_closures(&[
            Closure::self_closure(n(1)),
            Closure::self_closure(n(2)),
            Closure::self_closure(n(3)),
            Closure::self_closure(n(4)),
            Closure::new(n(1), n(2), 1),
            Closure::new(n(1), n(3), 1),
            Closure::new(n(2), n(4), 1),
            Closure::new(n(1), n(4), 2),
        ])
        .expect("valid tree");

        let mut buf = Vec::new();
        draw(&mut buf, tree.root(), "", true, true).expect("draw");
        let text = String::from_utf8(buf).expect("utf8");
        assert_eq!(text, "1\n├── 2\n│   └── 4\n└── 3\n");
    }
}
