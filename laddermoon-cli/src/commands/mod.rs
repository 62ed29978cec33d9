//! CLI command implementations

pub mod feed;
pub mod init;
pub mod show;
pub mod status;
pub mod sync;

pub use feed::FeedArgs;
pub use show::NotesArgs;
pub use sync::SyncArgs;

use std::path::Path;

use laddermoon_core::{ClaudeAgent, Config, Error, InitStatus, Namespace, ShadowStore};

/// Store and namespace resolved once per invocation
pub struct Context {
    pub store: ShadowStore,
    pub ns: Namespace,
    pub config: Config,
}

impl Context {
    /// Open the store of the repository containing the working directory
    pub fn open(config: &Config) -> anyhow::Result<Self> {
        Self::open_at(std::env::current_dir()?, config)
    }

    /// Open the store of the repository containing `path`
    pub fn open_at(path: impl AsRef<Path>, config: &Config) -> anyhow::Result<Self> {
        let store = ShadowStore::from_config(path, config)?;
        let ns = store.current_namespace()?;

        tracing::debug!(
            root = %store.repo().root().display(),
            namespace = %ns,
            "Resolved namespace"
        );

        Ok(Self {
            store,
            ns,
            config: config.clone(),
        })
    }

    /// Fail unless the shadow branch exists
    ///
    /// A missing namespace is fine: the first write creates it.
    pub fn require_initialized(&self) -> anyhow::Result<()> {
        if self.store.status(&self.ns)? == InitStatus::Uninitialized {
            return Err(Error::NotInitialized.into());
        }
        Ok(())
    }

    /// The configured agent, running at the repository root
    pub fn agent(&self) -> ClaudeAgent {
        ClaudeAgent::from_config(&self.config.agent, self.store.repo().root())
    }
}
