//! Cross-process lock serializing shadow-branch mutations
//!
//! The lock is an OS advisory lock on `.lm.lock` in the repository root. The
//! OS drops the lock of a process that dies, so a file left behind by a crash
//! is simply locked again by the next process. While held, the file records
//! who holds it; a holder older than `stale_after` is broken by force.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Lock file name at the repository root
pub const LOCK_FILE: &str = ".lm.lock";

/// Timing for lock acquisition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockOptions {
    /// Give up after waiting this long
    pub timeout: Duration,
    /// Delay between attempts
    pub poll_interval: Duration,
    /// Treat a live holder as stale once it has held the lock this long
    pub stale_after: Option<Duration>,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(100),
            stale_after: None,
        }
    }
}

/// Who holds the lock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockHolder {
    /// Process id of the holder
    pub pid: u32,
    /// When the holder acquired the lock
    #[serde(with = "humantime_serde")]
    pub acquired_at: SystemTime,
}

impl LockHolder {
    fn current() -> Self {
        Self {
            pid: std::process::id(),
            acquired_at: SystemTime::now(),
        }
    }

    /// How long the lock has been held
    pub fn age(&self) -> Duration {
        SystemTime::now()
            .duration_since(self.acquired_at)
            .unwrap_or_default()
    }

    /// Whether the recorded process is still running
    ///
    /// Informational only: a dead pid can be left over from a crash while a
    /// new holder is between locking and rewriting the file.
    pub fn is_alive(&self) -> bool {
        is_process_alive(self.pid)
    }
}

/// An acquired mutation lock
///
/// Dropping the guard releases the lock, so every exit path of the protected
/// region gives it up.
#[derive(Debug)]
pub struct MutationLock {
    file: Option<File>,
    path: PathBuf,
}

impl MutationLock {
    /// Acquire the lock at `path`, polling until `opts.timeout` elapses
    pub fn acquire(path: impl Into<PathBuf>, opts: &LockOptions) -> Result<Self> {
        let path = path.into();
        let start = Instant::now();

        loop {
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(&path)?;

            match file.try_lock_exclusive() {
                Ok(()) => {
                    // A releasing holder unlinks the file; if that happened
                    // after we opened it, we locked an orphaned inode.
                    if !still_linked(&file, &path) {
                        continue;
                    }

                    let mut lock = Self {
                        file: Some(file),
                        path,
                    };
                    lock.write_holder()?;
                    tracing::debug!(
                        path = %lock.path.display(),
                        waited = ?start.elapsed(),
                        "META lock acquired"
                    );
                    return Ok(lock);
                }
                Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                    drop(file);
                    if clear_if_stale(&path, opts)? {
                        continue;
                    }
                }
                Err(e) => return Err(Error::Io(e)),
            }

            let waited = start.elapsed();
            if waited >= opts.timeout {
                return Err(Error::LockTimeout { path, waited });
            }
            std::thread::sleep(opts.poll_interval.min(opts.timeout - waited));
        }
    }

    /// Read the holder recorded in a lock file, if any
    pub fn holder(path: &Path) -> Result<Option<LockHolder>> {
        match fs::read_to_string(path) {
            Ok(contents) if contents.trim().is_empty() => Ok(None),
            Ok(contents) => Ok(Some(serde_json::from_str(&contents)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Io(e)),
        }
    }

    /// Path of the lock file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock and delete the lock file
    pub fn release(mut self) -> Result<()> {
        self.release_inner()
    }

    fn write_holder(&mut self) -> Result<()> {
        let holder = serde_json::to_string(&LockHolder::current())?;
        if let Some(file) = self.file.as_mut() {
            file.set_len(0)?;
            file.write_all(holder.as_bytes())?;
            file.flush()?;
        }
        Ok(())
    }

    fn release_inner(&mut self) -> Result<()> {
        let Some(file) = self.file.take() else {
            return Ok(());
        };

        // Unlink while still locked so a waiter cannot lock this inode and
        // believe it holds the live lock. A file that was cleared as stale and
        // recreated belongs to the new holder.
        let removed = if still_linked(&file, &self.path) {
            match fs::remove_file(&self.path) {
                Err(e) if e.kind() != io::ErrorKind::NotFound => Err(Error::Io(e)),
                _ => Ok(()),
            }
        } else {
            Ok(())
        };
        let unlocked = FileExt::unlock(&file).map_err(Error::Io);
        drop(file);

        tracing::debug!(path = %self.path.display(), "META lock released");
        removed.and(unlocked)
    }
}

impl Drop for MutationLock {
    fn drop(&mut self) {
        if let Err(e) = self.release_inner() {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to release META lock");
        }
    }
}

/// Remove a contended lock file whose holder has exceeded `stale_after`
///
/// Contention means a live file description holds the lock, so the recorded
/// pid is never grounds for removal.
fn clear_if_stale(path: &Path, opts: &LockOptions) -> Result<bool> {
    let Some(limit) = opts.stale_after else {
        return Ok(false);
    };
    // Unreadable or half-written metadata is left alone; the holder may still
    // be writing it.
    let Ok(Some(holder)) = MutationLock::holder(path) else {
        return Ok(false);
    };
    if holder.age() < limit {
        return Ok(false);
    }

    tracing::warn!(
        pid = holder.pid,
        age = ?holder.age(),
        "Breaking expired META lock"
    );
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(true),
        Err(e) => Err(Error::Io(e)),
    }
}

#[cfg(unix)]
fn still_linked(file: &File, path: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    match (file.metadata(), fs::metadata(path)) {
        (Ok(held), Ok(current)) => held.dev() == current.dev() && held.ino() == current.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn still_linked(_file: &File, path: &Path) -> bool {
    path.exists()
}

#[cfg(target_os = "linux")]
fn is_process_alive(pid: u32) -> bool {
    Path::new(&format!("/proc/{}/stat", pid)).exists()
}

#[cfg(all(unix, not(target_os = "linux")))]
fn is_process_alive(pid: u32) -> bool {
    std::process::Command::new("kill")
        .args(["-0", &pid.to_string()])
        .output()
        .map(|o| o.status.success())
        .unwrap_or(true)
}

#[cfg(not(unix))]
fn is_process_alive(_pid: u32) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick() -> LockOptions {
        LockOptions {
            timeout: Duration::from_millis(400),
            poll_interval: Duration::from_millis(20),
            stale_after: None,
        }
    }

    #[test]
    fn test_acquire_writes_holder() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LOCK_FILE);

        let lock = MutationLock::acquire(&path, &quick()).unwrap();
        let holder = MutationLock::holder(&path).unwrap().unwrap();
        assert_eq!(holder.pid, std::process::id());
        assert!(holder.age() < Duration::from_secs(60));

        lock.release().unwrap();
        assert!(!path.exists());
        assert!(MutationLock::holder(&path).unwrap().is_none());
    }

    #[test]
    fn test_second_acquire_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LOCK_FILE);
        let opts = quick();

        let _held = MutationLock::acquire(&path, &opts).unwrap();

        let start = Instant::now();
        let err = MutationLock::acquire(&path, &opts).unwrap_err();
        let elapsed = start.elapsed();

        assert!(matches!(err, Error::LockTimeout { .. }));
        assert!(elapsed >= opts.timeout, "gave up early: {elapsed:?}");
        assert!(elapsed < Duration::from_secs(5), "waited too long: {elapsed:?}");
    }

    #[test]
    fn test_drop_releases() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LOCK_FILE);

        {
            let _lock = MutationLock::acquire(&path, &quick()).unwrap();
            assert!(path.exists());
        }
        assert!(!path.exists());

        let again = MutationLock::acquire(&path, &quick()).unwrap();
        again.release().unwrap();
    }

    #[test]
    fn test_waiter_gets_lock_after_release() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LOCK_FILE);
        let held = MutationLock::acquire(&path, &quick()).unwrap();

        let waiter = {
            let path = path.clone();
            std::thread::spawn(move || {
                let opts = LockOptions {
                    timeout: Duration::from_secs(10),
                    ..quick()
                };
                MutationLock::acquire(&path, &opts).map(|lock| lock.release())
            })
        };

        std::thread::sleep(Duration::from_millis(100));
        held.release().unwrap();

        waiter.join().unwrap().unwrap().unwrap();
    }

    #[test]
    fn test_orphaned_file_is_reclaimed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LOCK_FILE);

        // A crashed holder leaves its metadata but no OS lock behind
        let orphan = LockHolder {
            pid: u32::MAX,
            acquired_at: SystemTime::now() - Duration::from_secs(3600),
        };
        fs::write(&path, serde_json::to_string(&orphan).unwrap()).unwrap();

        let lock = MutationLock::acquire(&path, &quick()).unwrap();
        let holder = MutationLock::holder(&path).unwrap().unwrap();
        assert_eq!(holder.pid, std::process::id());
        lock.release().unwrap();
    }

    #[test]
    fn test_dead_pid_does_not_break_held_lock() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LOCK_FILE);

        // A crashed holder's metadata, with a new holder that has taken the
        // OS lock but not yet rewritten the file
        let orphan = LockHolder {
            pid: u32::MAX,
            acquired_at: SystemTime::now(),
        };
        fs::write(&path, serde_json::to_string(&orphan).unwrap()).unwrap();
        let other = OpenOptions::new().read(true).write(true).open(&path).unwrap();
        other.try_lock_exclusive().unwrap();

        let err = MutationLock::acquire(&path, &quick()).unwrap_err();
        assert!(matches!(err, Error::LockTimeout { .. }));
        assert!(path.exists());
        let recorded = MutationLock::holder(&path).unwrap().unwrap();
        assert_eq!(recorded.pid, orphan.pid);

        FileExt::unlock(&other).unwrap();
    }

    #[test]
    fn test_liveness() {
        assert!(LockHolder::current().is_alive());
    }

    #[test]
    fn test_expired_holder_is_cleared() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LOCK_FILE);
        let opts = LockOptions {
            stale_after: Some(Duration::from_millis(50)),
            ..quick()
        };

        let held = MutationLock::acquire(&path, &LockOptions::default()).unwrap();
        std::thread::sleep(Duration::from_millis(100));

        let taken = MutationLock::acquire(&path, &opts).unwrap();

        // The broken holder must not delete its successor's file
        drop(held);
        assert_eq!(
            MutationLock::holder(&path).unwrap().map(|h| h.pid),
            Some(std::process::id())
        );
        taken.release().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_holder_serialization() {
        let holder = LockHolder {
            pid: 42,
            acquired_at: SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000),
        };
        let json = serde_json::to_string(&holder).unwrap();
        assert!(json.contains("\"pid\":42"));
        assert!(json.contains("2023-11-14T22:13:20Z"));
        let back: LockHolder = serde_json::from_str(&json).unwrap();
        assert_eq!(back, holder);
    }
}
