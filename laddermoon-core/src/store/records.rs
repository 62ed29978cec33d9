//! Typed records kept in each namespace

use std::fmt;
use std::str::FromStr;

use chrono::Local;

use super::mutate::{Change, WriteMode};
use super::namespace::Namespace;
use super::{ShadowStore, FEED_ID_FILE, META_FILE, SYNC_STATE_FILE};
use crate::{Error, Result};

/// Raw user feed entries, oldest first
pub const USER_FEED_LOG: &str = "UserFeed.log";

/// Directory name older namespaces used for proposals
const LEGACY_PROPOSALS_DIR: &str = "Suggestions";

/// Kind of note stored in a namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Question,
    Issue,
    Proposal,
    Task,
}

impl Category {
    /// Every category, in display order
    pub const ALL: [Category; 4] = [
        Category::Question,
        Category::Issue,
        Category::Proposal,
        Category::Task,
    ];

    /// Directory holding notes of this category
    pub fn dir(self) -> &'static str {
        match self {
            Category::Question => "Questions",
            Category::Issue => "Issues",
            Category::Proposal => "Proposals",
            Category::Task => "Tasks",
        }
    }

    /// Directories searched when listing, current name first
    fn search_dirs(self) -> &'static [&'static str] {
        match self {
            Category::Proposal => &["Proposals", LEGACY_PROPOSALS_DIR],
            Category::Question => &["Questions"],
            Category::Issue => &["Issues"],
            Category::Task => &["Tasks"],
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "question" | "questions" => Ok(Category::Question),
            "issue" | "issues" => Ok(Category::Issue),
            "proposal" | "proposals" | "suggestion" | "suggestions" => Ok(Category::Proposal),
            "task" | "tasks" => Ok(Category::Task),
            other => Err(Error::InvalidPath(format!("unknown note category '{}'", other))),
        }
    }
}

/// How META relates to the main history
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncState {
    /// No commit has been incorporated yet
    NeverSynced,
    /// META reflects the given head
    InSync,
    /// META reflects an older commit
    Stale { since: String },
}

/// A recorded user feed entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedRecord {
    pub id: u64,
    pub commit: String,
}

impl ShadowStore {
    /// Content of META.md, empty if it has never been written
    pub fn read_meta(&self, ns: &Namespace) -> Result<String> {
        Ok(self.read_to_string(ns, META_FILE)?.unwrap_or_default())
    }

    /// Append to META.md
    pub fn append_meta(&self, ns: &Namespace, text: &str) -> Result<String> {
        self.mutate(ns, META_FILE, text.as_bytes(), WriteMode::Append)
    }

    /// Replace META.md
    pub fn replace_meta(&self, ns: &Namespace, text: &str) -> Result<String> {
        self.mutate(ns, META_FILE, text.as_bytes(), WriteMode::Replace)
    }

    /// Main-history commit last incorporated into META
    pub fn synced_commit(&self, ns: &Namespace) -> Result<Option<String>> {
        let content = self.read_to_string(ns, SYNC_STATE_FILE)?.unwrap_or_default();
        let commit = content.trim();
        Ok((!commit.is_empty()).then(|| commit.to_string()))
    }

    /// Record that META now reflects `commit`
    pub fn set_synced_commit(&self, ns: &Namespace, commit: &str) -> Result<String> {
        let commit = commit.trim();
        if commit.is_empty() || commit.contains(char::is_whitespace) {
            return Err(Error::InvalidPath(format!("invalid commit id '{}'", commit)));
        }
        let content = format!("{}\n", commit);
        self.mutate(ns, SYNC_STATE_FILE, content.as_bytes(), WriteMode::Replace)
    }

    /// Compare the sync cursor with the live head of the working branch
    pub fn sync_state(&self, ns: &Namespace, live_head: &str) -> Result<SyncState> {
        Ok(match self.synced_commit(ns)? {
            None => SyncState::NeverSynced,
            Some(synced) if synced == live_head => SyncState::InSync,
            Some(synced) => SyncState::Stale { since: synced },
        })
    }

    /// Sequence number the next feed entry will get
    pub fn next_feed_id(&self, ns: &Namespace) -> Result<u64> {
        let content = self.read_to_string(ns, FEED_ID_FILE)?.unwrap_or_default();
        let content = content.trim();
        if content.is_empty() {
            return Ok(1);
        }
        content.parse().map_err(|e| Error::Corrupt {
            path: ns.tree_path(FEED_ID_FILE),
            reason: format!("'{}' is not a feed id: {}", content, e),
        })
    }

    /// Append a user feed entry to the log and advance the counter
    ///
    /// Both files change in one commit, so an entry is never logged without
    /// its id being consumed. Callers hold the mutation lock so ids stay unique.
    pub fn record_feed(&self, ns: &Namespace, text: &str) -> Result<FeedRecord> {
        let id = self.next_feed_id(ns)?;
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        let entry = format!(
            "\n=== Feed #{} ===\nDate: {}\nContent:\n{}\n===\n",
            id, timestamp, text
        );
        let next = format!("{}\n", id + 1);

        let changes = [
            Change::new(USER_FEED_LOG, entry.as_bytes(), WriteMode::Append)?,
            Change::new(FEED_ID_FILE, next.as_bytes(), WriteMode::Replace)?,
        ];
        let message = format!("Record feed #{} for branch {}", id, ns.branch());
        let commit = self.commit_changes(ns, &changes, &message)?;

        tracing::info!(namespace = %ns, id, "Recorded user feed");
        Ok(FeedRecord { id, commit })
    }

    /// Notes of one category, as paths relative to the namespace
    pub fn list_notes(&self, ns: &Namespace, category: Category) -> Result<Vec<String>> {
        let files = self.list_files(ns)?;
        Ok(files
            .into_iter()
            .filter(|path| {
                category
                    .search_dirs()
                    .iter()
                    .any(|dir| path.strip_prefix(dir).is_some_and(|rest| rest.starts_with('/')))
            })
            .filter(|path| !path.ends_with("/.gitkeep"))
            .collect())
    }

    /// Content of a note, looked up by id with or without the `.md` extension
    pub fn read_note(
        &self,
        ns: &Namespace,
        category: Category,
        id: &str,
    ) -> Result<Option<String>> {
        for dir in category.search_dirs() {
            for candidate in [format!("{}/{}.md", dir, id), format!("{}/{}", dir, id)] {
                if let Some(content) = self.read_to_string(ns, &candidate)? {
                    return Ok(Some(content));
                }
            }
        }
        Ok(None)
    }
}
