//! LadderMoon Core - shadow-branch metadata store
//!
//! Project knowledge (a META document and categorized notes) lives on a
//! dedicated orphan branch of the user's repository. This crate reads that
//! branch without checking it out, writes to it through short-lived secondary
//! worktrees, and serializes writers across processes with a lock file.

pub mod agent;
pub mod config;
pub mod error;
pub mod git;
pub mod store;

pub use agent::{Agent, AgentOutput, ClaudeAgent};
pub use config::Config;
pub use error::{Error, Result};
pub use git::{GitRepo, GitRunner, SystemGit};
pub use store::{
    Category, FeedRecord, InitStatus, LockHolder, LockOptions, MutationLock, Namespace,
    ShadowStore, SyncState, WorktreeMode, WriteMode,
};
