//! Subprocess access to the `git` binary

use std::path::Path;
use std::process::Command;

use crate::{Error, Result};

/// Something that can run git commands in a directory
///
/// Every write to the shadow branch goes through this seam, which lets tests
/// fail individual steps of a mutation.
pub trait GitRunner: Send + Sync {
    /// Run `git <args>` in `dir` and return its stdout
    ///
    /// A non-zero exit status is reported as [`Error::Subprocess`].
    fn run(&self, dir: &Path, args: &[&str]) -> Result<String>;
}

/// Runs the system `git` executable
#[derive(Debug, Clone)]
pub struct SystemGit {
    program: String,
}

impl SystemGit {
    /// Use `git` from PATH
    pub fn new() -> Self {
        Self {
            program: "git".to_string(),
        }
    }

    /// Use a specific git executable
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Path of the executable this runner invokes
    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Default for SystemGit {
    fn default() -> Self {
        Self::new()
    }
}

impl GitRunner for SystemGit {
    fn run(&self, dir: &Path, args: &[&str]) -> Result<String> {
        tracing::debug!(dir = %dir.display(), args = ?args, "git");

        let output = Command::new(&self.program)
            .args(args)
            .current_dir(dir)
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::Config(format!(
                        "git executable not found at '{}'. Is git installed?",
                        self.program
                    ))
                } else {
                    Error::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(Error::Subprocess {
                command: args.join(" "),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Convert a path into a git argument
pub(crate) fn path_arg(path: &Path) -> Result<&str> {
    path.to_str()
        .ok_or_else(|| Error::InvalidPath(format!("non UTF-8 path: {}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_program() {
        let git = SystemGit::new().with_program("/nonexistent/git-binary-12345");
        let err = git.run(Path::new("."), &["--version"]).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_nonzero_exit_is_subprocess_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SystemGit::new()
            .run(dir.path(), &["rev-parse", "--verify", "no-such-ref"])
            .unwrap_err();
        match err {
            Error::Subprocess { command, code, .. } => {
                assert_eq!(command, "rev-parse --verify no-such-ref");
                assert_ne!(code, Some(0));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_captures_stdout() {
        let out = SystemGit::new().run(Path::new("."), &["--version"]).unwrap();
        assert!(out.starts_with("git version"));
    }
}
