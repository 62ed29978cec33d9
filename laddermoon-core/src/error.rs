//! Error types for LadderMoon

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result type alias for LadderMoon operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for LadderMoon operations
#[derive(Error, Debug)]
pub enum Error {
    /// The working directory is not inside a git repository
    #[error("Not a git repository: {}", .0.display())]
    NotAGitRepository(PathBuf),

    /// The shadow branch does not exist yet
    #[error("LadderMoon not initialized, run 'lm init' first")]
    NotInitialized,

    /// The namespace for the current branch already exists
    #[error("LadderMoon already initialized for namespace '{namespace}'")]
    AlreadyInitialized { namespace: String },

    /// HEAD is not on a branch, so there is no namespace to use
    #[error("HEAD is detached; check out a branch before using LadderMoon")]
    DetachedHead,

    /// Two branch names map to the same namespace directory
    #[error(
        "Namespace '{namespace}' belongs to branch '{owner}', not '{requested}'; rename one of the branches"
    )]
    NamespaceCollision {
        namespace: String,
        owner: String,
        requested: String,
    },

    /// The mutation lock could not be obtained before the deadline
    #[error("Timed out after {waited:?} waiting for META lock at {}; retry later", .path.display())]
    LockTimeout { path: PathBuf, waited: Duration },

    /// A git subprocess exited unsuccessfully
    #[error("git {command} failed (exit code {code:?}): {stderr}")]
    Subprocess {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// A relative path inside the namespace was rejected
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// A stored record could not be interpreted
    #[error("Corrupt {path}: {reason}")]
    Corrupt { path: String, reason: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// libgit2 error
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Agent execution error
    #[error("Agent error: {0}")]
    Agent(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
