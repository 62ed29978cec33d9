//! Sync command - fold main-history changes into META

use clap::Args;
use laddermoon_core::git::history;
use laddermoon_core::{Agent, SyncState};

use super::Context;
use crate::output::{print_info, print_success, short_commit};

/// Synchronize codebase changes into META
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Show the change summary without invoking the agent
    #[arg(long)]
    pub dry_run: bool,
}

impl SyncArgs {
    /// Execute the sync command
    pub async fn execute(&self, ctx: &Context, agent: &dyn Agent) -> anyhow::Result<()> {
        ctx.require_initialized()?;

        let store = &ctx.store;
        let root = store.repo().root();
        let live_head = store.repo().head_commit()?;

        let since = match store.sync_state(&ctx.ns, &live_head)? {
            SyncState::InSync => {
                print_info("Already up to date. No changes since last sync.");
                return Ok(());
            }
            SyncState::NeverSynced => {
                print_info("First sync - analyzing current state...");
                None
            }
            SyncState::Stale { since } => {
                print_info(&format!(
                    "Changes: {} -> {}",
                    short_commit(&since),
                    short_commit(&live_head)
                ));
                Some(since)
            }
        };

        let log = history::log_oneline(store.runner(), root, since.as_deref(), &live_head)?;
        let stat = history::diff_stat(store.runner(), root, since.as_deref(), &live_head)?;
        println!("{}", log.trim_end());
        println!();
        println!("{}", stat.trim_end());
        println!();

        if self.dry_run {
            return Ok(());
        }

        print_info(&format!("Synchronizing with {}...", agent.name()));
        let output = agent.invoke(&sync_prompt(&log, &stat), false).await?;
        if let Some(stdout) = output.stdout.as_deref().filter(|s| !s.trim().is_empty()) {
            println!("{}", stdout.trim_end());
        }

        store.with_lock(|store| store.set_synced_commit(&ctx.ns, &live_head))?;
        print_success(&format!("META synced to {}", short_commit(&live_head)));
        Ok(())
    }
}

fn sync_prompt(log: &str, stat: &str) -> String {
    format!(
        "Use the laddermoon-sync skill to synchronize the codebase changes to META.\n\n\
         Commits:\n{}\n\nChanged files:\n{}",
        log.trim_end(),
        stat.trim_end()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_includes_changes() {
        let prompt = sync_prompt("abc1234 add lib\n", " lib.rs | 1 +\n");
        assert!(prompt.starts_with("Use the laddermoon-sync skill"));
        assert!(prompt.contains("Commits:\nabc1234 add lib\n"));
        assert!(prompt.ends_with("Changed files:\n lib.rs | 1 +"));
    }
}
