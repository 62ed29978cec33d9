//! The shadow branch: a hidden metadata store inside the user's repository
//!
//! Reads resolve the shadow branch head and look objects up directly in the
//! object database, so they never touch a working directory, index or ref.
//! Writes are performed by [`ShadowStore::mutate`] in a throwaway worktree.

mod lock;
mod mutate;
mod namespace;
mod records;
mod worktree;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use git2::{ObjectType, Tree, TreeWalkMode, TreeWalkResult};

use crate::config::Config;
use crate::git::{GitRepo, GitRunner, SystemGit};
use crate::{Error, Result};

pub use lock::{LockHolder, LockOptions, MutationLock, LOCK_FILE};
pub use mutate::WriteMode;
pub use namespace::Namespace;
pub use records::{Category, FeedRecord, SyncState, USER_FEED_LOG};
pub use worktree::{WorktreeMode, TEMP_PREFIX};

/// Default name of the shadow branch
pub const DEFAULT_BRANCH: &str = "laddermoon-meta";
/// The accumulated project knowledge document
pub const META_FILE: &str = "META.md";
/// Last main-history commit incorporated into META
pub const SYNC_STATE_FILE: &str = ".sync_state";
/// Next feed sequence number
pub const FEED_ID_FILE: &str = ".next_feed_id";
/// Branch that created the namespace
pub const OWNER_FILE: &str = ".branch";

/// Initialization state of the store for one namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStatus {
    /// The shadow branch does not exist
    Uninitialized,
    /// The shadow branch exists but this namespace has not been created
    NamespaceMissing,
    /// The namespace exists
    Ready,
}

/// Handle to the shadow branch of one repository
pub struct ShadowStore {
    repo: GitRepo,
    branch: String,
    runner: Arc<dyn GitRunner>,
    lock_options: LockOptions,
}

impl std::fmt::Debug for ShadowStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShadowStore")
            .field("root", &self.repo.root())
            .field("branch", &self.branch)
            .field("lock_options", &self.lock_options)
            .finish_non_exhaustive()
    }
}

impl ShadowStore {
    /// Open the store of the repository containing `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            repo: GitRepo::open(path)?,
            branch: DEFAULT_BRANCH.to_string(),
            runner: Arc::new(SystemGit::new()),
            lock_options: LockOptions::default(),
        })
    }

    /// Open the store with branch name, git executable and lock timing from `config`
    pub fn from_config(path: impl AsRef<Path>, config: &Config) -> Result<Self> {
        Ok(Self::open(path)?
            .with_branch(config.store.branch.clone())
            .with_runner(Arc::new(
                SystemGit::new().with_program(config.store.git_path.clone()),
            ))
            .with_lock_options(config.lock.options()))
    }

    /// Use a different shadow branch name
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    /// Run git commands through `runner`
    pub fn with_runner(mut self, runner: Arc<dyn GitRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Use different lock timing
    pub fn with_lock_options(mut self, options: LockOptions) -> Self {
        self.lock_options = options;
        self
    }

    /// The user's repository
    pub fn repo(&self) -> &GitRepo {
        &self.repo
    }

    /// Name of the shadow branch
    pub fn branch_name(&self) -> &str {
        &self.branch
    }

    /// The git runner used for writes and history queries
    pub fn runner(&self) -> &dyn GitRunner {
        self.runner.as_ref()
    }

    /// Namespace of the branch checked out right now
    pub fn current_namespace(&self) -> Result<Namespace> {
        self.repo
            .current_branch()?
            .map(Namespace::for_branch)
            .ok_or(Error::DetachedHead)
    }

    /// Location of the mutation lock file
    pub fn lock_path(&self) -> PathBuf {
        self.repo.root().join(LOCK_FILE)
    }

    /// Acquire the mutation lock for this repository
    pub fn lock(&self) -> Result<MutationLock> {
        MutationLock::acquire(self.lock_path(), &self.lock_options)
    }

    /// Run `f` while holding the mutation lock
    pub fn with_lock<T>(&self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        let lock = self.lock()?;
        let result = f(self);
        let released = lock.release();
        let value = result?;
        released?;
        Ok(value)
    }

    /// Whether the shadow branch exists
    pub fn exists(&self) -> bool {
        self.repo.branch_exists(&self.branch)
    }

    /// Initialization state for `ns`
    pub fn status(&self, ns: &Namespace) -> Result<InitStatus> {
        if !self.exists() {
            return Ok(InitStatus::Uninitialized);
        }
        if self.namespace_exists(ns)? {
            Ok(InitStatus::Ready)
        } else {
            Ok(InitStatus::NamespaceMissing)
        }
    }

    /// Whether `ns` has a directory at the shadow branch head
    pub fn namespace_exists(&self, ns: &Namespace) -> Result<bool> {
        if !self.exists() {
            return Ok(false);
        }
        let tree = self.head_tree()?;
        let found = match tree.get_path(Path::new(ns.dir())) {
            Ok(entry) => entry.kind() == Some(ObjectType::Tree),
            Err(e) if e.code() == git2::ErrorCode::NotFound => false,
            Err(e) => return Err(Error::Git(e)),
        };
        Ok(found)
    }

    /// Commit id of the shadow branch head
    pub fn head_commit(&self) -> Result<String> {
        Ok(self.head_commit_object()?.id().to_string())
    }

    /// Raw content of `rel` inside `ns`, or `None` when there is no such file
    pub fn read_file(&self, ns: &Namespace, rel: &str) -> Result<Option<Vec<u8>>> {
        let rel = namespace::validate_rel_path(rel)?;
        let tree = self.head_tree()?;

        let entry = match tree.get_path(Path::new(&ns.tree_path(&rel))) {
            Ok(entry) => entry,
            Err(e) if e.code() == git2::ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(Error::Git(e)),
        };
        if entry.kind() != Some(ObjectType::Blob) {
            return Ok(None);
        }

        let blob = self.repo.inner().find_blob(entry.id())?;
        Ok(Some(blob.content().to_vec()))
    }

    /// Content of `rel` inside `ns` as text
    pub fn read_to_string(&self, ns: &Namespace, rel: &str) -> Result<Option<String>> {
        Ok(self
            .read_file(ns, rel)?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// Every file under `ns`, relative to the namespace directory
    ///
    /// Paths come back in tree order; callers must not rely on it.
    pub fn list_files(&self, ns: &Namespace) -> Result<Vec<String>> {
        let tree = self.head_tree()?;

        let entry = match tree.get_path(Path::new(ns.dir())) {
            Ok(entry) => entry,
            Err(e) if e.code() == git2::ErrorCode::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::Git(e)),
        };
        if entry.kind() != Some(ObjectType::Tree) {
            return Ok(Vec::new());
        }

        let subtree = self.repo.inner().find_tree(entry.id())?;
        let mut files = Vec::new();
        subtree.walk(TreeWalkMode::PreOrder, |dir, entry| {
            if entry.kind() == Some(ObjectType::Blob) {
                if let Some(name) = entry.name() {
                    files.push(format!("{}{}", dir, name));
                }
            }
            TreeWalkResult::Ok
        })?;

        Ok(files)
    }

    fn head_commit_object(&self) -> Result<git2::Commit<'_>> {
        let reference = match self
            .repo
            .inner()
            .find_reference(&format!("refs/heads/{}", self.branch))
        {
            Ok(r) => r,
            Err(e) if e.code() == git2::ErrorCode::NotFound => return Err(Error::NotInitialized),
            Err(e) => return Err(Error::Git(e)),
        };
        Ok(reference.peel_to_commit()?)
    }

    fn head_tree(&self) -> Result<Tree<'_>> {
        Ok(self.head_commit_object()?.tree()?)
    }
}
