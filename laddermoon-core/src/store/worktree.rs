//! Temporary secondary worktrees bound to the shadow branch

use std::fs;
use std::path::Path;

use tempfile::TempDir;

use super::mutate::WriteMode;
use super::namespace::{checkout_path, Namespace};
use super::{FEED_ID_FILE, META_FILE, OWNER_FILE, SYNC_STATE_FILE};
use super::records::Category;
use crate::git::{path_arg, GitRunner};
use crate::{Error, Result};

/// Prefix of scratch directories created in the repository root
pub const TEMP_PREFIX: &str = ".lm-tmp-";

/// Placeholder keeping empty category directories in the tree
const KEEP_FILE: &str = ".gitkeep";

/// How the worktree gets attached to the shadow branch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorktreeMode {
    /// The shadow branch does not exist; create it as an orphan
    Bootstrap,
    /// Check out the existing shadow branch
    SteadyState,
}

/// A checkout of the shadow branch in a scratch directory under the repository root
///
/// The checkout lives inside the repository because the agent working on the
/// project may only be allowed to touch files below it. Dropping the value
/// detaches the worktree and deletes the directory.
pub(crate) struct ShadowWorktree<'a> {
    runner: &'a dyn GitRunner,
    repo_root: &'a Path,
    mode: WorktreeMode,
    attached: bool,
    // Removed when the value is dropped, after `Drop::drop` has detached it
    dir: TempDir,
}

impl<'a> ShadowWorktree<'a> {
    /// Create the scratch directory and attach it to `branch`
    pub(crate) fn attach(
        runner: &'a dyn GitRunner,
        repo_root: &'a Path,
        branch: &str,
        mode: WorktreeMode,
    ) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempdir_in(repo_root)?;

        let mut worktree = Self {
            runner,
            repo_root,
            mode,
            attached: false,
            dir,
        };

        let dir_arg = path_arg(worktree.dir.path())?.to_string();
        match mode {
            WorktreeMode::SteadyState => {
                runner.run(repo_root, &["worktree", "add", &dir_arg, branch])?;
                worktree.attached = true;
            }
            WorktreeMode::Bootstrap => {
                runner.run(repo_root, &["worktree", "add", "--detach", &dir_arg])?;
                worktree.attached = true;
                worktree.start_orphan(branch)?;
            }
        }

        tracing::debug!(dir = %worktree.path().display(), ?mode, "Attached shadow worktree");
        Ok(worktree)
    }

    /// Root of the checkout
    pub(crate) fn path(&self) -> &Path {
        self.dir.path()
    }

    pub(crate) fn mode(&self) -> WorktreeMode {
        self.mode
    }

    /// Run git inside the checkout
    pub(crate) fn git(&self, args: &[&str]) -> Result<String> {
        self.runner.run(self.path(), args)
    }

    /// Turn the detached checkout into an empty orphan branch
    fn start_orphan(&self, branch: &str) -> Result<()> {
        self.git(&["checkout", "--orphan", branch])?;

        // Fails when there is nothing to unstage
        if let Err(e) = self.git(&["rm", "-rf", "--cached", "--quiet", "."]) {
            tracing::debug!(error = %e, "Nothing to unstage in new orphan branch");
        }

        for entry in fs::read_dir(self.path())? {
            let entry = entry?;
            if entry.file_name() == ".git" {
                continue;
            }
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                fs::remove_dir_all(&path)?;
            } else {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }

    /// Create the namespace scaffold if it is not in the checkout yet
    ///
    /// Returns `true` when the scaffold was created. An existing namespace owned
    /// by a different branch is rejected before anything is written.
    pub(crate) fn ensure_namespace(&self, ns: &Namespace) -> Result<bool> {
        let ns_dir = self.path().join(ns.dir());

        if ns_dir.is_dir() {
            check_owner(&ns_dir, ns)?;
            return Ok(false);
        }

        fs::create_dir_all(&ns_dir)?;
        fs::write(ns_dir.join(META_FILE), b"")?;
        fs::write(ns_dir.join(SYNC_STATE_FILE), b"")?;
        fs::write(ns_dir.join(FEED_ID_FILE), b"")?;
        fs::write(ns_dir.join(OWNER_FILE), format!("{}\n", ns.branch()))?;
        for category in Category::ALL {
            let dir = ns_dir.join(category.dir());
            fs::create_dir_all(&dir)?;
            fs::write(dir.join(KEEP_FILE), b"")?;
        }

        tracing::info!(namespace = %ns, branch = ns.branch(), "Created namespace");
        Ok(true)
    }

    /// Append to or replace a file in the namespace
    pub(crate) fn write_file(
        &self,
        ns: &Namespace,
        rel: &str,
        content: &[u8],
        mode: WriteMode,
    ) -> Result<()> {
        use std::io::Write;

        let path = checkout_path(self.path(), ns, rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        match mode {
            WriteMode::Append => {
                let mut file = fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path)?;
                file.write_all(content)?;
                file.flush()?;
            }
            WriteMode::Replace => fs::write(&path, content)?,
        }
        Ok(())
    }

    /// Whether the index differs from the branch head
    pub(crate) fn has_staged_changes(&self) -> Result<bool> {
        let out = self.git(&["diff", "--cached", "--name-only"])?;
        Ok(!out.trim().is_empty())
    }

    /// Current HEAD of the checkout
    pub(crate) fn head(&self) -> Result<String> {
        Ok(self.git(&["rev-parse", "HEAD"])?.trim().to_string())
    }

    fn detach(&mut self) -> Result<()> {
        if !self.attached {
            return Ok(());
        }
        self.attached = false;

        let dir_arg = path_arg(self.dir.path())?.to_string();
        if let Err(e) = self
            .runner
            .run(self.repo_root, &["worktree", "remove", "--force", &dir_arg])
        {
            tracing::warn!(
                error = %e,
                dir = %dir_arg,
                "git worktree remove failed, pruning instead"
            );
            if self.dir.path().exists() {
                fs::remove_dir_all(self.dir.path())?;
            }
            self.runner.run(self.repo_root, &["worktree", "prune"])?;
        }
        Ok(())
    }
}

impl Drop for ShadowWorktree<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.detach() {
            tracing::warn!(
                error = %e,
                dir = %self.dir.path().display(),
                "Failed to clean up shadow worktree"
            );
        }
    }
}

fn check_owner(ns_dir: &Path, ns: &Namespace) -> Result<()> {
    let owner = match fs::read_to_string(ns_dir.join(OWNER_FILE)) {
        Ok(owner) => owner.trim().to_string(),
        // Namespaces created before the marker existed have no owner
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(Error::Io(e)),
    };

    if !owner.is_empty() && owner != ns.branch() {
        return Err(Error::NamespaceCollision {
            namespace: ns.dir().to_string(),
            owner,
            requested: ns.branch().to_string(),
        });
    }
    Ok(())
}
