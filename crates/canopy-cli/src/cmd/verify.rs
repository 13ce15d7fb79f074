//! `canopy verify`: check every closure invariant in the store.

use anyhow::Result;
use canopy_core::ErrorCode;

use super::Context;
use crate::output::{CliError, fail, pretty_kv, pretty_section, render_error, render_mode};

/// Exits non-zero with `E3002` when any violation is found.
pub fn run_verify(ctx: &Context) -> Result<()> {
    let mut forest = ctx.open_forest()?;
    let report = forest.verify().map_err(|err| fail(ctx.output, err))?;

    render_mode(
        ctx.output,
        &report,
        |r, w| {
            writeln!(w, "nodes {} closures {} roots {}", r.nodes, r.closures, r.roots)?;
            for violation in &r.violations {
                writeln!(w, "{violation}")?;
            }
            Ok(())
        },
        |r, w| {
            pretty_section(w, "forest integrity")?;
            pretty_kv(w, "nodes", r.nodes.to_string())?;
            pretty_kv(w, "closures", r.closures.to_string())?;
            pretty_kv(w, "roots", r.roots.to_string())?;
            if r.is_ok() {
                return writeln!(w, "✓ all invariants hold");
            }
            writeln!(w, "✗ {} violation(s)", r.violations.len())?;
            for violation in &r.violations {
                writeln!(w, "  - {violation}")?;
            }
            Ok(())
        },
    )?;

    if report.is_ok() {
        return Ok(());
    }
    let code = ErrorCode::IntegrityViolation;
    let message = format!("{}: {} violation(s)", code.message(), report.violations.len());
    render_error(ctx.output, &CliError::coded(code, message.clone()))?;
    anyhow::bail!(message)
}
