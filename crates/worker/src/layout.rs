//! File names and locations of a user's render job.

use std::path::PathBuf;

use trackreel_core::types::{UserId, UserScope};

pub const CONFIG_FILE: &str = "config.ini";
pub const TRACK_FILE: &str = "g2v.gpx";
/// Written by the renderer into the working directory and moved to the
/// parent on success.
pub const VIDEO_FILE: &str = "v.mp4";
/// Empty file left in the parent directory when a job fails.
pub const ERROR_MARKER: &str = "error";

/// Paths derived from a [`UserScope`].
#[derive(Debug, Clone)]
pub struct JobLayout {
    pub user_id: UserId,
    /// Ephemeral directory holding the in-progress artifacts.
    pub working_dir: PathBuf,
    /// Where the outcome of a finished job is deposited.
    pub parent_dir: PathBuf,
}

impl JobLayout {
    pub fn new(scope: &UserScope) -> Self {
        Self {
            user_id: scope.user_id,
            working_dir: scope.working_dir(),
            parent_dir: scope.user_dir(),
        }
    }

    pub fn config_path(&self) -> PathBuf {
        self.working_dir.join(CONFIG_FILE)
    }

    pub fn track_path(&self) -> PathBuf {
        self.working_dir.join(TRACK_FILE)
    }

    pub fn rendered_video(&self) -> PathBuf {
        self.working_dir.join(VIDEO_FILE)
    }

    pub fn result_path(&self) -> PathBuf {
        self.parent_dir.join(VIDEO_FILE)
    }

    pub fn error_marker_path(&self) -> PathBuf {
        self.parent_dir.join(ERROR_MARKER)
    }
}
