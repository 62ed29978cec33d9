//! Summaries of main-history changes between two commits

use std::path::Path;

use super::runner::GitRunner;
use crate::Result;

/// Number of commits shown when there is no previous sync point
const FIRST_SYNC_LOG_LIMIT: &str = "-20";

/// `git diff --stat` between two commits
///
/// Without a starting commit the stat of `to` alone is returned.
pub fn diff_stat(
    runner: &dyn GitRunner,
    root: &Path,
    from: Option<&str>,
    to: &str,
) -> Result<String> {
    match from {
        Some(from) => runner.run(root, &["diff", "--stat", from, to]),
        None => runner.run(root, &["show", "--stat", to]),
    }
}

/// One-line log of the commits in `from..to`
///
/// Without a starting commit the most recent commits up to `to` are listed.
pub fn log_oneline(
    runner: &dyn GitRunner,
    root: &Path,
    from: Option<&str>,
    to: &str,
) -> Result<String> {
    match from {
        Some(from) => runner.run(root, &["log", "--oneline", &format!("{}..{}", from, to)]),
        None => runner.run(root, &["log", "--oneline", FIRST_SYNC_LOG_LIMIT, to]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl GitRunner for Recorder {
        fn run(&self, _dir: &Path, args: &[&str]) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push(args.iter().map(|s| s.to_string()).collect());
            Ok(String::new())
        }
    }

    #[test]
    fn test_ranges() {
        let rec = Recorder::default();
        let root = PathBuf::from("/repo");

        diff_stat(&rec, &root, Some("aaa"), "bbb").unwrap();
        diff_stat(&rec, &root, None, "bbb").unwrap();
        log_oneline(&rec, &root, Some("aaa"), "bbb").unwrap();
        log_oneline(&rec, &root, None, "bbb").unwrap();

        let calls = rec.calls.lock().unwrap();
        assert_eq!(calls[0], ["diff", "--stat", "aaa", "bbb"]);
        assert_eq!(calls[1], ["show", "--stat", "bbb"]);
        assert_eq!(calls[2], ["log", "--oneline", "aaa..bbb"]);
        assert_eq!(calls[3], ["log", "--oneline", "-20", "bbb"]);
    }
}
