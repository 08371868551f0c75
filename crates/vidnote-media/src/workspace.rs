//! Per-job temporary workspace lifecycle.
//!
//! Workspaces are scoped by job id, never by external video id, so two
//! concurrent jobs processing the same video cannot collide. Deletion is not
//! automatic on capture success: the publisher still needs the files, so
//! cleanup is a separate, independently triggerable operation.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::MediaResult;

/// Compute the workspace path for a job.
pub fn job_workspace(root: impl AsRef<Path>, job_id: &str) -> PathBuf {
    root.as_ref().join(job_id)
}

/// Create (or reuse) the workspace directory for a job.
pub async fn create_workspace(root: impl AsRef<Path>, job_id: &str) -> MediaResult<PathBuf> {
    let dir = job_workspace(root, job_id);
    tokio::fs::create_dir_all(&dir).await?;
    debug!("Workspace ready: {}", dir.display());
    Ok(dir)
}

/// Best-effort workspace removal. Failure is logged, never propagated.
pub async fn cleanup_workspace(dir: impl AsRef<Path>) {
    let dir = dir.as_ref();
    if !dir.exists() {
        return;
    }

    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => debug!("Removed workspace {}", dir.display()),
        Err(e) => warn!("Failed to remove workspace {}: {}", dir.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_create_and_cleanup() {
        let root = TempDir::new().unwrap();
        let dir = create_workspace(root.path(), "job-1").await.unwrap();
        assert!(dir.exists());
        assert!(dir.ends_with("job-1"));

        tokio::fs::write(dir.join("source.mp4"), b"stub").await.unwrap();

        cleanup_workspace(&dir).await;
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn test_cleanup_missing_dir_is_silent() {
        cleanup_workspace("/tmp/vidnote-test-does-not-exist").await;
    }

    #[test]
    fn test_workspace_scoped_by_job_id() {
        let a = job_workspace("/tmp/vidnote", "job-a");
        let b = job_workspace("/tmp/vidnote", "job-b");
        assert_ne!(a, b);
    }
}
