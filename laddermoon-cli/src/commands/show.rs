//! Read-only views of META, the user feed log and notes

use clap::Args;
use laddermoon_core::store::USER_FEED_LOG;
use laddermoon_core::Category;

use super::Context;
use crate::output::print_info;

/// Show notes of one category
#[derive(Args, Debug)]
pub struct NotesArgs {
    /// Note id, with or without `.md`; lists all notes when omitted
    pub id: Option<String>,
}

impl NotesArgs {
    /// Execute a notes command for `category`
    pub fn execute(&self, ctx: &Context, category: Category) -> anyhow::Result<()> {
        ctx.require_initialized()?;

        let Some(id) = &self.id else {
            let mut notes = ctx.store.list_notes(&ctx.ns, category)?;
            if notes.is_empty() {
                print_info(&format!("No {} yet.", category.dir().to_lowercase()));
                return Ok(());
            }
            notes.sort();
            println!("{}:", category);
            for note in notes {
                println!("  - {}", note);
            }
            return Ok(());
        };

        match ctx.store.read_note(&ctx.ns, category, id)? {
            Some(content) => {
                print!("{}", content);
                Ok(())
            }
            None => anyhow::bail!("No entry '{}' in {}", id, category),
        }
    }
}

/// Print META.md
pub fn meta(ctx: &Context) -> anyhow::Result<()> {
    ctx.require_initialized()?;

    let meta = ctx.store.read_meta(&ctx.ns)?;
    if meta.is_empty() {
        print_info("META.md is empty. Run 'lm feed <info>' to add project information.");
    } else {
        print!("{}", meta);
    }
    Ok(())
}

/// Print the raw user feed log
pub fn userlog(ctx: &Context) -> anyhow::Result<()> {
    ctx.require_initialized()?;

    match ctx.store.read_to_string(&ctx.ns, USER_FEED_LOG)? {
        Some(log) if !log.is_empty() => print!("{}", log),
        _ => print_info("No user feed recorded yet."),
    }
    Ok(())
}
