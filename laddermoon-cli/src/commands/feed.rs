//! Feed command - record user knowledge and hand it to the agent

use clap::Args;
use laddermoon_core::{Agent, FeedRecord};

use super::Context;
use crate::output::{print_info, print_success, truncate};

/// Add project information to META
#[derive(Args, Debug)]
pub struct FeedArgs {
    /// Information to record; all words are joined with spaces
    #[arg(required = true, num_args = 1..)]
    pub text: Vec<String>,
}

impl FeedArgs {
    /// The feed content
    pub fn content(&self) -> String {
        self.text.join(" ")
    }

    /// Execute the feed command
    pub async fn execute(&self, ctx: &Context, agent: &dyn Agent) -> anyhow::Result<()> {
        ctx.require_initialized()?;

        let content = self.content();
        if content.trim().is_empty() {
            anyhow::bail!("Feed content cannot be empty");
        }

        print_info("Acquiring META lock...");
        let record: FeedRecord = ctx
            .store
            .with_lock(|store| store.record_feed(&ctx.ns, &content))?;
        print_info(&format!("Recorded Feed #{}", record.id));
        print_info(&format!("Content: {}", truncate(&content, 60)));

        // The lock is released: the agent may write to META itself
        print_info(&format!("Processing with {}...", agent.name()));
        let prompt = feed_prompt(record.id, &content);
        agent.invoke(&prompt, true).await?;

        print_success(&format!("Feed #{} recorded and processed!", record.id));
        Ok(())
    }
}

fn feed_prompt(id: u64, content: &str) -> String {
    format!(
        "Use the laddermoon-feed skill to process Feed #{}:\n\n{}",
        id, content
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_joined() {
        let args = FeedArgs {
            text: vec!["Uses".into(), "PostgreSQL".into()],
        };
        assert_eq!(args.content(), "Uses PostgreSQL");
    }

    #[test]
    fn test_prompt() {
        let prompt = feed_prompt(3, "REST API");
        assert!(prompt.contains("Feed #3"));
        assert!(prompt.ends_with("\n\nREST API"));
    }
}
