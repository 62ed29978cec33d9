//! LadderMoon CLI - project knowledge kept on a shadow branch
//!
//! Every command resolves the checked-out branch once and works on that
//! branch's namespace of the META branch.

mod commands;
mod output;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use laddermoon_core::{Category, Config, Error};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{Context, FeedArgs, NotesArgs, SyncArgs};
use output::{print_error, print_info};

/// LadderMoon: AI-driven project management on a shadow branch
#[derive(Parser, Debug)]
#[command(name = "lm")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to claude executable (overrides config and env)
    #[arg(long, global = true, env = "LADDERMOON_CLAUDE_PATH")]
    claude_path: Option<String>,

    /// Model to use (overrides config and env)
    #[arg(long, global = true, env = "LADDERMOON_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show version information
    Version,

    /// Initialize META for the current branch
    Init,

    /// Show META state for the current branch
    #[command(visible_alias = "st")]
    Status,

    /// Print META.md
    Meta,

    /// Print the raw user feed log
    Userlog,

    /// List questions or show one
    Questions(NotesArgs),

    /// List issues or show one
    Issues(NotesArgs),

    /// List proposals or show one
    Proposals(NotesArgs),

    /// List tasks or show one
    Tasks(NotesArgs),

    /// Add project information to META
    Feed(FeedArgs),

    /// Synchronize codebase changes into META
    Sync(SyncArgs),

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so command output stays clean
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            print_error(&err.to_string());
            if let Some(hint) = hint_for(&err) {
                print_info(hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Load configuration with overrides
    let config = Config::load_with_overrides(cli.claude_path.clone(), cli.model.clone())?;

    tracing::debug!(
        claude_path = %config.agent.claude_path,
        model = ?config.agent.model,
        branch = %config.store.branch,
        "Configuration loaded"
    );

    let Some(command) = cli.command else {
        println!("LadderMoon - AI-driven project management");
        println!();
        println!("Use --help for usage information");
        return Ok(());
    };

    match command {
        Commands::Version => {
            println!("lm {}", env!("CARGO_PKG_VERSION"));
        }
        Commands::Config => show_config(&config),
        Commands::Init => commands::init::execute(&Context::open(&config)?)?,
        Commands::Status => commands::status::execute(&Context::open(&config)?)?,
        Commands::Meta => commands::show::meta(&Context::open(&config)?)?,
        Commands::Userlog => commands::show::userlog(&Context::open(&config)?)?,
        Commands::Questions(args) => args.execute(&Context::open(&config)?, Category::Question)?,
        Commands::Issues(args) => args.execute(&Context::open(&config)?, Category::Issue)?,
        Commands::Proposals(args) => args.execute(&Context::open(&config)?, Category::Proposal)?,
        Commands::Tasks(args) => args.execute(&Context::open(&config)?, Category::Task)?,
        Commands::Feed(args) => {
            let ctx = Context::open(&config)?;
            args.execute(&ctx, &ctx.agent()).await?;
        }
        Commands::Sync(args) => {
            let ctx = Context::open(&config)?;
            args.execute(&ctx, &ctx.agent()).await?;
        }
    }

    Ok(())
}

fn show_config(config: &Config) {
    println!("LadderMoon Configuration");
    println!("========================");
    println!();
    println!("Agent Settings:");
    println!("  claude_path: {}", config.agent.claude_path);
    println!("  model: {}", config.agent.model.as_deref().unwrap_or("(default)"));
    println!();
    println!("Store Settings:");
    println!("  branch: {}", config.store.branch);
    println!("  git_path: {}", config.store.git_path);
    println!();
    println!("Lock Settings:");
    println!("  timeout: {:?}", config.lock.timeout);
    println!("  poll_interval: {:?}", config.lock.poll_interval);
    if let Some(stale) = config.lock.stale_after {
        println!("  stale_after: {:?}", stale);
    }
    println!();
    if let Some(path) = Config::default_config_path() {
        println!("Config file: {}", path.display());
        if path.exists() {
            println!("  (exists)");
        } else {
            println!("  (not found - using defaults)");
        }
    }
}

fn hint_for(err: &anyhow::Error) -> Option<&'static str> {
    match err.downcast_ref::<Error>()? {
        Error::NotInitialized => Some("Run 'lm init' to initialize."),
        Error::AlreadyInitialized { .. } => Some("Run 'lm status' to inspect the existing META."),
        Error::NotAGitRepository(_) => Some("This command must be run inside a Git repository."),
        Error::DetachedHead => Some("Check out a branch first; META is kept per branch."),
        Error::LockTimeout { .. } => {
            Some("Another lm command is still running. Retry once it finishes.")
        }
        Error::NamespaceCollision { .. } => {
            Some("Rename the branch; its META directory is owned by another branch.")
        }
        Error::Agent(_) => Some("Make sure 'claude' CLI is installed and configured."),
        _ => None,
    }
}
