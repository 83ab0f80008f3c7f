//! Source snapshots
//!
//! The catalog is built from a directory tree holding the documentation pages and the
//! chain specifications. A [`SnapshotSource`] produces that tree, either by cloning the
//! upstream repository into a temporary directory or by pointing at an existing checkout.

use anyhow::{bail, Context, Result};
use git2::{build::RepoBuilder, FetchOptions, Repository};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

/// A directory tree to extract the catalog from
#[derive(Debug)]
pub struct Snapshot {
    root: PathBuf,
    // Deletes the clone on drop
    checkout: Option<TempDir>,
}

impl Snapshot {
    /// Wrap a directory owned by someone else; closing it leaves the files in place.
    pub fn borrowed(root: PathBuf) -> Self {
        Self {
            root,
            checkout: None,
        }
    }

    /// Take ownership of a temporary directory; closing it deletes the files.
    pub fn owned(checkout: TempDir) -> Self {
        Self {
            root: checkout.path().to_path_buf(),
            checkout: Some(checkout),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Release the snapshot, removing it from disk if it was a temporary clone.
    pub fn close(self) -> Result<()> {
        if let Some(checkout) = self.checkout {
            let path = checkout.path().to_path_buf();
            checkout
                .close()
                .with_context(|| format!("Failed to remove snapshot at {}", path.display()))?;
            debug!(path = %path.display(), "removed snapshot");
        }
        Ok(())
    }
}

/// Provider of a source snapshot
pub trait SnapshotSource {
    /// Produce a snapshot. Blocking.
    fn fetch_snapshot(&self) -> Result<Snapshot>;

    /// Human-readable description for logs
    fn describe(&self) -> String;
}

/// Shallow clone of a remote repository, submodules included
#[derive(Debug, Clone)]
pub struct GitSnapshotSource {
    url: String,
    branch: String,
}

impl GitSnapshotSource {
    pub fn new(url: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            branch: branch.into(),
        }
    }
}

fn update_submodules(repo: &Repository) -> Result<(), git2::Error> {
    for mut submodule in repo.submodules()? {
        debug!(name = submodule.name().unwrap_or("<non-utf8>"), "updating submodule");
        submodule.update(true, None)?;
        let nested = submodule.open()?;
        update_submodules(&nested)?;
    }
    Ok(())
}

impl SnapshotSource for GitSnapshotSource {
    fn fetch_snapshot(&self) -> Result<Snapshot> {
        let checkout = tempfile::Builder::new()
            .prefix("rollup-codes-")
            .tempdir()
            .context("Failed to create temporary directory")?;

        info!(url = %self.url, branch = %self.branch, "cloning repository");

        let mut fetch_options = FetchOptions::new();
        fetch_options.depth(1);

        let repo = RepoBuilder::new()
            .branch(&self.branch)
            .fetch_options(fetch_options)
            .clone(&self.url, checkout.path())
            .with_context(|| format!("Failed to clone {}", self.url))?;

        update_submodules(&repo)
            .with_context(|| format!("Failed to update submodules of {}", self.url))?;

        info!(path = %checkout.path().display(), "repository cloned");
        Ok(Snapshot::owned(checkout))
    }

    fn describe(&self) -> String {
        format!("git {} ({})", self.url, self.branch)
    }
}

/// An existing checkout on the local filesystem
#[derive(Debug, Clone)]
pub struct LocalSnapshotSource {
    root: PathBuf,
}

impl LocalSnapshotSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl SnapshotSource for LocalSnapshotSource {
    fn fetch_snapshot(&self) -> Result<Snapshot> {
        if !self.root.is_dir() {
            bail!("Local snapshot {} is not a directory", self.root.display());
        }
        Ok(Snapshot::borrowed(self.root.clone()))
    }

    fn describe(&self) -> String {
        format!("local {}", self.root.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test that a local source hands back its directory and leaves it in place
    #[test]
    fn test_local_snapshot_is_borrowed() {
        let dir = TempDir::new().unwrap();
        let source = LocalSnapshotSource::new(dir.path());

        let snapshot = source.fetch_snapshot().unwrap();
        assert_eq!(snapshot.root(), dir.path());
        snapshot.close().unwrap();

        assert!(dir.path().exists());
    }

    #[test]
    fn test_local_snapshot_missing_directory() {
        let source = LocalSnapshotSource::new("/definitely/not/a/checkout");
        let err = source.fetch_snapshot().unwrap_err();
        assert!(err.to_string().contains("is not a directory"));
    }

    /// Test that closing an owned snapshot deletes it
    #[test]
    fn test_owned_snapshot_removed_on_close() {
        let checkout = TempDir::new().unwrap();
        let path = checkout.path().to_path_buf();
        std::fs::write(path.join("marker"), "x").unwrap();

        let snapshot = Snapshot::owned(checkout);
        assert_eq!(snapshot.root(), path.as_path());
        snapshot.close().unwrap();

        assert!(!path.exists());
    }

    #[test]
    fn test_git_source_describe() {
        let source = GitSnapshotSource::new("https://example.org/repo.git", "main");
        assert_eq!(source.describe(), "git https://example.org/repo.git (main)");
    }
}
