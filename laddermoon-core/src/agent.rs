//! External AI agent invoked by commands
//!
//! The store never calls the agent. Commands hand it a prompt and wait for it
//! to finish; there is no timeout, a hung agent hangs the command.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use tokio::process::Command;

use crate::config::AgentConfig;
use crate::{Error, Result};

/// What an agent run produced
#[derive(Debug, Clone)]
pub struct AgentOutput {
    /// Exit status of the agent process
    pub status: ExitStatus,
    /// Captured stdout; `None` when the agent wrote straight to the terminal
    pub stdout: Option<String>,
}

/// Capability to delegate work to an AI agent
#[async_trait]
pub trait Agent: Send + Sync {
    /// Get the name of this agent
    fn name(&self) -> &'static str;

    /// Run the agent on a prompt and wait for it to exit
    ///
    /// Interactive runs share the terminal with the user. Non-interactive runs
    /// print once and have their output captured.
    async fn invoke(&self, prompt: &str, interactive: bool) -> Result<AgentOutput>;
}

/// Claude Code CLI
#[derive(Debug, Clone)]
pub struct ClaudeAgent {
    claude_path: String,
    model: Option<String>,
    workdir: PathBuf,
}

impl ClaudeAgent {
    /// Create an agent running `claude` from PATH in `workdir`
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            claude_path: "claude".to_string(),
            model: None,
            workdir: workdir.into(),
        }
    }

    /// Create an agent from configuration
    pub fn from_config(config: &AgentConfig, workdir: impl Into<PathBuf>) -> Self {
        let agent = Self::new(workdir).with_path(config.claude_path.clone());
        match &config.model {
            Some(model) => agent.with_model(model.clone()),
            None => agent,
        }
    }

    /// Use a custom claude executable
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.claude_path = path.into();
        self
    }

    /// Use a specific model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Working directory of the agent
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn build_command(&self, prompt: &str, interactive: bool) -> Command {
        let mut cmd = Command::new(&self.claude_path);
        if !interactive {
            cmd.arg("--print");
        }
        if let Some(ref model) = self.model {
            cmd.arg("--model").arg(model);
        }
        cmd.arg(prompt).current_dir(&self.workdir);

        if interactive {
            cmd.stdin(Stdio::inherit())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit());
        } else {
            cmd.stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::inherit());
        }
        cmd
    }
}

#[async_trait]
impl Agent for ClaudeAgent {
    fn name(&self) -> &'static str {
        "claude"
    }

    async fn invoke(&self, prompt: &str, interactive: bool) -> Result<AgentOutput> {
        if !self.workdir.exists() {
            return Err(Error::Agent(format!(
                "Working directory does not exist: {}",
                self.workdir.display()
            )));
        }

        tracing::debug!(agent = self.name(), interactive, "Invoking agent");

        let mut cmd = self.build_command(prompt, interactive);
        let spawn_error = |e: std::io::Error| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::Agent(format!(
                    "Claude executable not found at '{}'. Is Claude Code installed?",
                    self.claude_path
                ))
            } else {
                Error::Io(e)
            }
        };

        let output = if interactive {
            let status = cmd.status().await.map_err(spawn_error)?;
            AgentOutput { status, stdout: None }
        } else {
            let out = cmd.output().await.map_err(spawn_error)?;
            AgentOutput {
                status: out.status,
                stdout: Some(String::from_utf8_lossy(&out.stdout).into_owned()),
            }
        };

        if !output.status.success() {
            return Err(Error::Agent(format!(
                "{} exited with status: {}",
                self.claude_path, output.status
            )));
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_workdir() {
        let agent = ClaudeAgent::new("/nonexistent/path/12345");
        let err = agent.invoke("test", false).await.unwrap_err();
        assert!(matches!(err, Error::Agent(_)));
    }

    #[tokio::test]
    async fn test_missing_executable() {
        let dir = tempfile::tempdir().unwrap();
        let agent = ClaudeAgent::new(dir.path()).with_path("/usr/bin/nonexistent-claude-binary");
        let err = agent.invoke("test", false).await.unwrap_err();
        assert!(matches!(err, Error::Agent(ref m) if m.contains("not found")));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_captures_print_output() {
        let dir = tempfile::tempdir().unwrap();
        let agent = ClaudeAgent::new(dir.path()).with_path("echo");
        let out = agent.invoke("summarize META", false).await.unwrap();
        assert_eq!(out.stdout.as_deref(), Some("--print summarize META\n"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failure_status() {
        let dir = tempfile::tempdir().unwrap();
        let agent = ClaudeAgent::new(dir.path()).with_path("false");
        let err = agent.invoke("anything", false).await.unwrap_err();
        assert!(matches!(err, Error::Agent(_)));
    }

    #[test]
    fn test_from_config() {
        let config = AgentConfig {
            claude_path: "/opt/claude".to_string(),
            model: Some("opus".to_string()),
        };
        let agent = ClaudeAgent::from_config(&config, "/repo");
        assert_eq!(agent.claude_path, "/opt/claude");
        assert_eq!(agent.model.as_deref(), Some("opus"));
        assert_eq!(agent.workdir(), Path::new("/repo"));
    }
}
