//! Mapping from working branches to directories on the shadow branch

use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::{Error, Result};

/// Character substituted for path separators in branch names
const SEPARATOR_SUBSTITUTE: char = '_';

/// A working branch and the shadow-branch directory that holds its metadata
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    branch: String,
    dir: String,
}

impl Namespace {
    /// Derive the namespace of a working branch
    ///
    /// `feature/login` becomes `feature_login`. Branch names that differ only
    /// by a separator versus an underscore share a directory; the store detects
    /// that case through the owner marker written at namespace creation.
    pub fn for_branch(branch: impl Into<String>) -> Self {
        let branch = branch.into();
        let dir = branch
            .chars()
            .map(|c| match c {
                '/' | '\\' => SEPARATOR_SUBSTITUTE,
                c => c,
            })
            .collect();
        Self { branch, dir }
    }

    /// The working branch name
    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// The directory name on the shadow branch
    pub fn dir(&self) -> &str {
        &self.dir
    }

    /// Tree path of a file inside this namespace, as git expects it
    pub(crate) fn tree_path(&self, rel: &str) -> String {
        format!("{}/{}", self.dir, rel)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dir)
    }
}

/// Check a caller-supplied path and normalize it to forward slashes
///
/// Only plain relative paths are accepted, so a write can never escape its
/// namespace directory.
pub(crate) fn validate_rel_path(rel: &str) -> Result<String> {
    if rel.trim().is_empty() {
        return Err(Error::InvalidPath("empty path".to_string()));
    }

    let mut parts = Vec::new();
    for component in Path::new(rel).components() {
        match component {
            Component::Normal(part) => parts.push(
                part.to_str()
                    .ok_or_else(|| Error::InvalidPath(rel.to_string()))?
                    .to_string(),
            ),
            Component::CurDir => {}
            _ => {
                return Err(Error::InvalidPath(format!(
                    "{} must be relative to the namespace",
                    rel
                )))
            }
        }
    }

    if parts.is_empty() {
        return Err(Error::InvalidPath(format!("{} names no file", rel)));
    }
    if parts[0] == ".git" {
        return Err(Error::InvalidPath(format!("{} is reserved", rel)));
    }

    Ok(parts.join("/"))
}

/// Filesystem location of a validated relative path under a checkout
pub(crate) fn checkout_path(checkout: &Path, ns: &Namespace, rel: &str) -> PathBuf {
    let mut path = checkout.join(ns.dir());
    for part in rel.split('/') {
        path.push(part);
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separator_substitution() {
        assert_eq!(Namespace::for_branch("main").dir(), "main");
        assert_eq!(Namespace::for_branch("feature/login").dir(), "feature_login");
        assert_eq!(Namespace::for_branch("a/b/c").dir(), "a_b_c");
        assert_eq!(Namespace::for_branch("win\\style").dir(), "win_style");
    }

    #[test]
    fn test_mapping_is_pure() {
        let a = Namespace::for_branch("feature/x");
        let b = Namespace::for_branch("feature/x");
        assert_eq!(a, b);
        assert_eq!(a.branch(), "feature/x");
    }

    #[test]
    fn test_known_collision() {
        let slash = Namespace::for_branch("a/b");
        let underscore = Namespace::for_branch("a_b");
        assert_eq!(slash.dir(), underscore.dir());
        assert_ne!(slash, underscore);
    }

    #[test]
    fn test_tree_path() {
        let ns = Namespace::for_branch("feature/x");
        assert_eq!(ns.tree_path("Questions/q-001.md"), "feature_x/Questions/q-001.md");
    }

    #[test]
    fn test_validate_rel_path() {
        assert_eq!(validate_rel_path("META.md").unwrap(), "META.md");
        assert_eq!(validate_rel_path("./Issues/i-1.md").unwrap(), "Issues/i-1.md");
        assert!(validate_rel_path("").is_err());
        assert!(validate_rel_path("../escape").is_err());
        assert!(validate_rel_path("Issues/../../x").is_err());
        assert!(validate_rel_path("/etc/passwd").is_err());
        assert!(validate_rel_path(".").is_err());
        assert!(validate_rel_path(".git/config").is_err());
    }
}
