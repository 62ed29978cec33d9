//! Status command - show the shadow branch state for the current branch

use laddermoon_core::{InitStatus, MutationLock, SyncState};

use super::Context;
use crate::output::{print_info, short_commit};

/// Execute the status command
pub fn execute(ctx: &Context) -> anyhow::Result<()> {
    let store = &ctx.store;
    let status = store.status(&ctx.ns)?;

    println!();
    println!("  {:<20} {}", "Branch:", ctx.ns.branch());
    println!("  {:<20} {}", "Namespace:", ctx.ns.dir());
    println!("  {:<20} {}", "META Branch:", store.branch_name());

    if status == InitStatus::Uninitialized {
        println!("  {:<20} no", "Initialized:");
        println!();
        print_info("Run 'lm init' to initialize.");
        return Ok(());
    }

    let live_head = store.repo().head_commit()?;
    let meta_head = store.head_commit()?;
    println!("  {:<20} yes", "Initialized:");
    println!("  {:<20} {}", "Main Commit:", short_commit(&live_head));
    println!("  {:<20} {}", "META Commit:", short_commit(&meta_head));

    if let Some(holder) = MutationLock::holder(&store.lock_path())? {
        let state = if holder.is_alive() { "" } else { " (not running)" };
        println!(
            "  {:<20} pid {}{} for {}s",
            "Lock held:",
            holder.pid,
            state,
            holder.age().as_secs()
        );
    }
    println!();

    if status == InitStatus::NamespaceMissing {
        print_info("This branch has no META yet; the first 'lm feed' creates it.");
        return Ok(());
    }

    let sync = match store.sync_state(&ctx.ns, &live_head)? {
        SyncState::NeverSynced => "never synced".to_string(),
        SyncState::InSync => "up to date".to_string(),
        SyncState::Stale { since } => format!("behind (last synced {})", short_commit(&since)),
    };
    println!("  {:<20} {}", "Sync:", sync);
    println!("  {:<20} #{}", "Next feed:", store.next_feed_id(&ctx.ns)?);
    println!();

    let mut files = store.list_files(&ctx.ns)?;
    files.sort();
    println!("  META Files:");
    for f in files.iter().filter(|f| !f.ends_with(".gitkeep")) {
        println!("    - {}", f);
    }
    println!();

    let meta = store.read_meta(&ctx.ns)?;
    if meta.is_empty() {
        println!("  META.md: (empty)");
        println!("  Hint: Run 'lm feed <info>' to add project information");
    } else {
        println!("  META.md: {} bytes", meta.len());
    }
    println!();

    Ok(())
}
