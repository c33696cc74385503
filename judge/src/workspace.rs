//! Scratch directory management
//!
//! The scratch directory is process-wide and never torn down. Each run gets a
//! [`RunScratch`] that records every path it hands out and deletes exactly
//! those paths when released (or dropped), so concurrent runs never touch each
//! other's files.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{HarnessError, HarnessResult};

/// Process-wide counter mixed into every allocated name
static FILE_COUNTER: AtomicU64 = AtomicU64::new(0);

const FILE_PREFIX: &str = "submission";

/// Handle to the shared scratch directory
#[derive(Debug, Clone)]
pub struct ScratchSpace {
    root: PathBuf,
}

impl ScratchSpace {
    /// A relative root is resolved against the current directory: commands
    /// run with the scratch directory as their working directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let root = std::path::absolute(&root).unwrap_or(root);
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the scratch directory if it does not exist yet. Idempotent.
    pub async fn ensure(&self) -> HarnessResult<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|source| HarnessError::Environment {
                path: self.root.clone(),
                source,
            })
    }

    /// Start tracking files for one run
    pub fn begin_run(&self) -> RunScratch {
        RunScratch {
            root: self.root.clone(),
            run_id: short_token(),
            paths: Vec::new(),
        }
    }
}

/// Files allocated on behalf of a single run
#[derive(Debug)]
pub struct RunScratch {
    root: PathBuf,
    run_id: String,
    paths: Vec<PathBuf>,
}

impl RunScratch {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Allocate a fresh path inside the scratch directory and remember it for
    /// cleanup. Nothing is created on disk.
    pub fn allocate(&mut self, extension: Option<&str>) -> PathBuf {
        let path = self.reserve(extension);
        self.track(path.clone());
        path
    }

    /// Pick a fresh name without claiming it. Call [`track`](Self::track)
    /// once this run has actually created the file.
    pub fn reserve(&self, extension: Option<&str>) -> PathBuf {
        self.root.join(unique_file_name(&self.run_id, extension))
    }

    /// Take ownership of a path this run created
    pub fn track(&mut self, path: PathBuf) {
        self.paths.push(path);
    }

    /// Paths handed out so far and not yet released
    pub fn allocated(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Best-effort deletion of every allocated path. Failures are logged only.
    pub async fn release(&mut self) {
        for path in std::mem::take(&mut self.paths) {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!(run_id = %self.run_id, "Removed {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(
                    run_id = %self.run_id,
                    "Failed to delete scratch file {}: {}",
                    path.display(),
                    e
                ),
            }
        }
    }
}

impl Drop for RunScratch {
    fn drop(&mut self) {
        for path in self.paths.drain(..) {
            match std::fs::remove_file(&path) {
                Ok(()) => debug!("Removed {} on drop", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to delete scratch file {}: {}", path.display(), e),
            }
        }
    }
}

/// `<prefix>_<run token>_<unix millis>_<counter>[.<ext>]`
fn unique_file_name(run_id: &str, extension: Option<&str>) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let counter = FILE_COUNTER.fetch_add(1, Ordering::Relaxed);
    let stem = format!("{}_{}_{}_{}", FILE_PREFIX, run_id, millis, counter);
    match extension.filter(|ext| !ext.is_empty()) {
        Some(ext) => format!("{}.{}", stem, ext),
        None => stem,
    }
}

fn short_token() -> String {
    let mut token = Uuid::new_v4().simple().to_string();
    token.truncate(12);
    token
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[tokio::test]
    async fn test_ensure_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = ScratchSpace::new(dir.path().join("nested").join("scratch"));
        scratch.ensure().await.unwrap();
        scratch.ensure().await.unwrap();
        assert!(scratch.root().is_dir());
    }

    #[tokio::test]
    async fn test_ensure_fails_on_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        let scratch = ScratchSpace::new(blocker.join("scratch"));
        assert!(matches!(
            scratch.ensure().await,
            Err(HarnessError::Environment { .. })
        ));
    }

    #[test]
    fn test_relative_root_is_made_absolute() {
        let scratch = ScratchSpace::new("relative_scratch");
        assert!(scratch.root().is_absolute());
        assert!(scratch.root().ends_with("relative_scratch"));
    }

    #[tokio::test]
    async fn test_reserved_path_is_not_released() {
        let dir = tempfile::tempdir().unwrap();
        let mut run = ScratchSpace::new(dir.path()).begin_run();
        let reserved = run.reserve(Some("cpp"));
        // Someone else got there first
        std::fs::write(&reserved, "not ours").unwrap();

        assert!(run.allocated().is_empty());
        run.release().await;
        assert!(reserved.exists());
    }

    #[test]
    fn test_allocated_names_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = ScratchSpace::new(dir.path());
        let mut first = scratch.begin_run();
        let mut second = scratch.begin_run();
        assert_ne!(first.run_id(), second.run_id());

        let mut seen = HashSet::new();
        for _ in 0..100 {
            assert!(seen.insert(first.allocate(Some("cpp"))));
            assert!(seen.insert(second.allocate(Some("cpp"))));
        }
    }

    #[test]
    fn test_allocate_extension() {
        let dir = tempfile::tempdir().unwrap();
        let mut run = ScratchSpace::new(dir.path()).begin_run();
        let source = run.allocate(Some("py"));
        let artifact = run.allocate(None);
        assert_eq!(source.extension().unwrap(), "py");
        assert!(artifact.extension().is_none());
        assert!(source.starts_with(dir.path()));
        assert_eq!(run.allocated().len(), 2);
    }

    #[tokio::test]
    async fn test_release_removes_only_own_files() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = ScratchSpace::new(dir.path());
        let foreign = dir.path().join("someone_else.txt");
        std::fs::write(&foreign, "keep").unwrap();

        let mut run = scratch.begin_run();
        let written = run.allocate(Some("cpp"));
        std::fs::write(&written, "int main() {}").unwrap();
        let _never_written = run.allocate(None);

        run.release().await;
        assert!(!written.exists());
        assert!(foreign.exists());
        assert!(run.allocated().is_empty());
    }

    #[test]
    fn test_drop_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = {
            let mut run = ScratchSpace::new(dir.path()).begin_run();
            let path = run.allocate(Some("py"));
            std::fs::write(&path, "print(1)").unwrap();
            path
        };
        assert!(!path.exists());
    }
}
