//! Writes to the shadow branch

use super::namespace::{validate_rel_path, Namespace};
use super::worktree::{ShadowWorktree, WorktreeMode};
use super::{InitStatus, ShadowStore, OWNER_FILE};
use crate::{Error, Result};

/// How new content is combined with an existing file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Add to the end, creating the file if needed
    Append,
    /// Overwrite the whole file
    Replace,
}

/// One file write inside a namespace; `rel` is already validated
pub(crate) struct Change<'a> {
    pub(crate) rel: String,
    pub(crate) content: &'a [u8],
    pub(crate) mode: WriteMode,
}

impl<'a> Change<'a> {
    pub(crate) fn new(rel: &str, content: &'a [u8], mode: WriteMode) -> Result<Self> {
        Ok(Self {
            rel: validate_rel_path(rel)?,
            content,
            mode,
        })
    }
}

impl ShadowStore {
    /// Write `content` to `rel` inside `ns` as a single new commit
    ///
    /// Creates the shadow branch and the namespace on first use. Returns the
    /// resulting head; if the write changes nothing, no commit is made and the
    /// current head is returned. On failure the head does not move.
    ///
    /// Callers serializing with other processes must hold [`ShadowStore::lock`].
    pub fn mutate(
        &self,
        ns: &Namespace,
        rel: &str,
        content: &[u8],
        mode: WriteMode,
    ) -> Result<String> {
        let change = Change::new(rel, content, mode)?;
        let message = format!("Update {} for branch {}", change.rel, ns.branch());
        self.commit_changes(ns, &[change], &message)
    }

    /// Create the namespace for `ns`, and the shadow branch if it is missing
    ///
    /// Fails with [`Error::AlreadyInitialized`] when the namespace exists.
    pub fn init(&self, ns: &Namespace) -> Result<String> {
        if self.status(ns)? == InitStatus::Ready {
            if let Some(owner) = self.namespace_owner(ns)? {
                if owner != ns.branch() {
                    return Err(Error::NamespaceCollision {
                        namespace: ns.dir().to_string(),
                        owner,
                        requested: ns.branch().to_string(),
                    });
                }
            }
            return Err(Error::AlreadyInitialized {
                namespace: ns.dir().to_string(),
            });
        }
        let message = format!("Initialize LadderMoon META for branch: {}", ns.branch());
        self.commit_changes(ns, &[], &message)
    }

    /// Branch recorded as the creator of the namespace directory
    pub fn namespace_owner(&self, ns: &Namespace) -> Result<Option<String>> {
        let owner = self.read_to_string(ns, OWNER_FILE)?.unwrap_or_default();
        let owner = owner.trim();
        Ok((!owner.is_empty()).then(|| owner.to_string()))
    }

    /// Apply every change in one worktree and record them as a single commit
    pub(crate) fn commit_changes(
        &self,
        ns: &Namespace,
        changes: &[Change<'_>],
        message: &str,
    ) -> Result<String> {
        let mode = if self.exists() {
            WorktreeMode::SteadyState
        } else {
            WorktreeMode::Bootstrap
        };

        let worktree = ShadowWorktree::attach(
            self.runner(),
            self.repo().root(),
            self.branch_name(),
            mode,
        )?;
        let created = worktree.ensure_namespace(ns)?;

        for change in changes {
            worktree.write_file(ns, &change.rel, change.content, change.mode)?;
        }

        // Forced adds: the user's exclude rules apply to every worktree
        match (worktree.mode(), created) {
            (WorktreeMode::Bootstrap, _) => {
                worktree.git(&["add", "-A", "-f"])?;
            }
            (WorktreeMode::SteadyState, true) => {
                worktree.git(&["add", "-A", "-f", "--", ns.dir()])?;
            }
            (WorktreeMode::SteadyState, false) if !changes.is_empty() => {
                let paths: Vec<String> = changes.iter().map(|c| ns.tree_path(&c.rel)).collect();
                let mut args = vec!["add", "-f", "--"];
                args.extend(paths.iter().map(String::as_str));
                worktree.git(&args)?;
            }
            (WorktreeMode::SteadyState, false) => {}
        }

        if worktree.mode() == WorktreeMode::SteadyState && !worktree.has_staged_changes()? {
            tracing::debug!(namespace = %ns, "Nothing changed, skipping commit");
            return worktree.head();
        }

        worktree.git(&["commit", "--no-verify", "--quiet", "-m", message])?;
        let head = worktree.head()?;

        tracing::info!(
            namespace = %ns,
            commit = %head,
            summary = message,
            "Committed to shadow branch"
        );
        Ok(head)
    }
}
