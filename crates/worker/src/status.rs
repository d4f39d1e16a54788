//! Job state as observed through the filesystem convention.

use serde::Serialize;

use crate::layout::JobLayout;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// No job has run, or its outcome was cleared.
    Idle,
    /// The working directory exists.
    Running,
    /// The rendered video sits in the parent directory.
    Succeeded,
    /// The error marker sits in the parent directory.
    Failed,
}

/// Read the state of a user's job from disk.
///
/// A present working directory wins over any outcome left by an earlier
/// job, since launching removes stale outcomes anyway.
pub async fn job_status(layout: &JobLayout) -> std::io::Result<JobStatus> {
    if tokio::fs::try_exists(&layout.working_dir).await? {
        return Ok(JobStatus::Running);
    }
    if tokio::fs::try_exists(layout.error_marker_path()).await? {
        return Ok(JobStatus::Failed);
    }
    if tokio::fs::try_exists(layout.result_path()).await? {
        return Ok(JobStatus::Succeeded);
    }
    Ok(JobStatus::Idle)
}
