//! Init command - create the shadow branch and this branch's namespace

use laddermoon_core::store::DEFAULT_BRANCH;
use laddermoon_core::InitStatus;

use super::Context;
use crate::output::{print_info, print_success, short_commit};

/// Execute the init command
///
/// Running it on a branch that already has META is an error.
pub fn execute(ctx: &Context) -> anyhow::Result<()> {
    let status = ctx.store.status(&ctx.ns)?;
    if status == InitStatus::Uninitialized {
        print_info(&format!(
            "Creating META branch '{}'...",
            ctx.store.branch_name()
        ));
    }

    let head = ctx.store.with_lock(|store| store.init(&ctx.ns))?;

    print_success(&format!(
        "Initialized META for branch '{}' at {}",
        ctx.ns.branch(),
        short_commit(&head)
    ));
    if ctx.store.branch_name() != DEFAULT_BRANCH {
        print_info(&format!("Using META branch '{}'", ctx.store.branch_name()));
    }
    print_info("Next: run 'lm feed <info>' to describe the project.");
    Ok(())
}
