//! Git operations for LadderMoon
//!
//! Repository discovery and ref resolution use libgit2; anything that writes
//! goes through the `git` binary via [`GitRunner`].

pub mod history;
mod repo;
mod runner;

pub use repo::GitRepo;
pub(crate) use runner::path_arg;
pub use runner::{GitRunner, SystemGit};
