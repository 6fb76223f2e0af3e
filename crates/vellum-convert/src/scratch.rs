// SPDX-License-Identifier: MIT
//
// Scratch directory and transient artifact management.
//
// All process-based strategies stage their files in one shared scratch
// directory. Uniqueness under concurrency comes from a random suffix per
// acquisition, so no locking is needed. Artifacts are RAII guards: the
// backing file is deleted when the guard drops, on every exit path, and
// deletion failure is logged rather than propagated so cleanup can never
// mask the primary result of an operation.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use uuid::Uuid;

use vellum_core::error::Result;

/// Handle to the shared scratch directory.
#[derive(Debug, Clone)]
pub struct ScratchDir {
    root: PathBuf,
}

impl ScratchDir {
    /// Open (and create, idempotently) the scratch directory. Called once
    /// at startup; strategies receive the handle from there.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        info!(dir = %root.display(), "scratch directory ready");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Allocate a collision-free path derived from an uploaded filename:
    /// `{stem}_{random}{ext}`. Only the final path component of the
    /// original name is used: upload names are untrusted and must not
    /// traverse out of the scratch directory.
    pub fn acquire(&self, original_name: &str) -> TransientArtifact {
        let safe_name = Path::new(original_name)
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.is_empty())
            .unwrap_or("upload");

        let (stem, ext) = match safe_name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem, format!(".{ext}")),
            _ => (safe_name, String::new()),
        };

        let uid = Uuid::new_v4().simple();
        let path = self.root.join(format!("{stem}_{uid}{ext}"));
        debug!(path = %path.display(), "artifact acquired");
        TransientArtifact { path }
    }

    /// Wrap an externally produced path (e.g. a converter's output file)
    /// in a guard so it is cleaned up with the same guarantees as an
    /// acquired artifact.
    pub fn adopt(&self, path: PathBuf) -> TransientArtifact {
        debug!(path = %path.display(), "artifact adopted");
        TransientArtifact { path }
    }
}

/// A filesystem path exclusively owned by one in-flight operation.
///
/// Dropping the guard removes the backing file if it exists.
#[derive(Debug)]
pub struct TransientArtifact {
    path: PathBuf,
}

impl TransientArtifact {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TransientArtifact {
    fn drop(&mut self) {
        if self.path.exists() {
            match std::fs::remove_file(&self.path) {
                Ok(()) => debug!(path = %self.path.display(), "artifact released"),
                // Best-effort only: a failed deletion must never surface
                // as an operation failure.
                Err(err) => warn!(path = %self.path.display(), %err, "failed to release artifact"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_name_never_collides() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::new(dir.path()).unwrap();

        let a = scratch.acquire("report.pdf");
        let b = scratch.acquire("report.pdf");
        assert_ne!(a.path(), b.path());

        let name = a.path().file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("report_"));
        assert!(name.ends_with(".pdf"));
    }

    #[test]
    fn drop_removes_backing_file() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::new(dir.path()).unwrap();

        let artifact = scratch.acquire("data.docx");
        std::fs::write(artifact.path(), b"bytes").unwrap();
        let path = artifact.path().to_path_buf();
        assert!(path.exists());

        drop(artifact);
        assert!(!path.exists());
    }

    #[test]
    fn drop_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::new(dir.path()).unwrap();

        // Never written: dropping must not panic or error.
        let artifact = scratch.acquire("never_written.pdf");
        drop(artifact);
    }

    #[test]
    fn traversal_attempts_stay_inside_scratch() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::new(dir.path()).unwrap();

        let artifact = scratch.acquire("../../etc/passwd");
        assert!(artifact.path().starts_with(dir.path()));

        let artifact = scratch.acquire("");
        assert!(artifact.path().starts_with(dir.path()));
        assert!(
            artifact
                .path()
                .file_name()
                .unwrap()
                .to_str()
                .unwrap()
                .starts_with("upload_")
        );
    }

    #[test]
    fn new_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        ScratchDir::new(dir.path().join("nested")).unwrap();
        ScratchDir::new(dir.path().join("nested")).unwrap();
    }
}
