//! Per-user render job lifecycle.
//!
//! ```text
//! Idle ──reserve──▶ Preparing ──launch──▶ Running ──resolve──▶ Idle
//!                      │                                   (video or error
//!                      └── any failure: working dir removed  marker in parent)
//! ```
//!
//! The working directory doubles as the per-user lock: it is created with a
//! non-recursive `create_dir`, so a second submission while it exists is
//! rejected. A process crash while it exists leaves the user blocked until
//! the directory is removed by hand.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use trackreel_core::activity::ActivitySource;
use trackreel_core::assembler::{AssemblyContext, ConfigAssembler, ConfigDocument, Preamble};
use trackreel_core::error::{CoreError, CoreResult};
use trackreel_core::registry::OptionRegistry;
use trackreel_core::track::{build_track, Track};
use trackreel_core::types::{FormValues, UserId, UserScope};

use crate::events::{JobEvent, JobEvents, JobOutcome};
use crate::layout::JobLayout;
use crate::runner::{run_renderer, RenderCommand, RenderError};
use crate::status::{job_status, JobStatus};

/// Settings of the renderer and the fixed config preamble.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub users_dir: PathBuf,
    pub command: RenderCommand,
    /// Substring the renderer prints when the video was produced.
    pub success_marker: String,
    pub ffmpeg: String,
    pub map_api_key: String,
    pub map_type: String,
}

/// A render request that passed HTTP decoding.
#[derive(Debug, Clone)]
pub struct Submission {
    pub user_id: UserId,
    pub activity_id: i64,
    pub values: FormValues,
}

// ---------------------------------------------------------------------------
// PreparedJob
// ---------------------------------------------------------------------------

/// A reserved working directory being filled with artifacts.
///
/// [`PreparedJob::discard`] removes the directory, returning the user to
/// idle. A job dropped without being launched or discarded, as when the
/// submitting request is cancelled, removes it synchronously in `Drop`.
#[derive(Debug)]
pub struct PreparedJob {
    layout: JobLayout,
    armed: bool,
}

impl PreparedJob {
    /// Claim the user's working directory.
    ///
    /// Fails with [`CoreError::Conflict`] if a job is already running.
    pub async fn reserve(scope: &UserScope) -> CoreResult<Self> {
        let layout = JobLayout::new(scope);
        tokio::fs::create_dir_all(&layout.parent_dir).await?;
        match tokio::fs::create_dir(&layout.working_dir).await {
            Ok(()) => Ok(Self {
                layout,
                armed: true,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Err(CoreError::Conflict(
                "a video is already being generated for this user".into(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    pub fn layout(&self) -> &JobLayout {
        &self.layout
    }

    pub async fn write_config(&self, doc: &ConfigDocument) -> CoreResult<()> {
        let path = self.layout.config_path();
        tokio::fs::write(&path, doc.render()).await.map_err(|e| {
            tracing::error!(
                user_id = self.layout.user_id,
                path = %path.display(),
                error = %e,
                "Failed to write config document",
            );
            CoreError::Io(e)
        })
    }

    pub async fn write_track(&self, track: &Track) -> CoreResult<()> {
        let bytes = track.to_gpx()?;
        let path = self.layout.track_path();
        tokio::fs::write(&path, bytes).await.map_err(|e| {
            tracing::error!(
                user_id = self.layout.user_id,
                path = %path.display(),
                error = %e,
                "Failed to write track file",
            );
            CoreError::Io(e)
        })
    }

    /// Remove the working directory of a job that will not be launched.
    pub async fn discard(self) {
        let layout = self.disarm();
        if let Err(e) = tokio::fs::remove_dir_all(&layout.working_dir).await {
            tracing::error!(
                user_id = layout.user_id,
                dir = %layout.working_dir.display(),
                error = %e,
                "Failed to remove working directory of aborted job",
            );
        }
    }

    fn disarm(mut self) -> JobLayout {
        self.armed = false;
        self.layout.clone()
    }
}

impl Drop for PreparedJob {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        // Only reached when a submission future is dropped mid-way; the
        // directory holds at most two small files.
        if let Err(e) = std::fs::remove_dir_all(&self.layout.working_dir) {
            tracing::error!(
                user_id = self.layout.user_id,
                dir = %self.layout.working_dir.display(),
                error = %e,
                "Failed to remove working directory of aborted job",
            );
        }
    }
}

// ---------------------------------------------------------------------------
// RenderCoordinator
// ---------------------------------------------------------------------------

/// Validates submissions, prepares job artifacts and runs the renderer in
/// detached tasks.
pub struct RenderCoordinator {
    config: CoordinatorConfig,
    registry: Arc<OptionRegistry>,
    source: Arc<dyn ActivitySource>,
    tracker: TaskTracker,
    events: Arc<JobEvents>,
}

impl RenderCoordinator {
    pub fn new(
        config: CoordinatorConfig,
        registry: Arc<OptionRegistry>,
        source: Arc<dyn ActivitySource>,
    ) -> Self {
        Self {
            config,
            registry,
            source,
            tracker: TaskTracker::new(),
            events: Arc::new(JobEvents::default()),
        }
    }

    pub fn registry(&self) -> &OptionRegistry {
        &self.registry
    }

    pub fn source(&self) -> &Arc<dyn ActivitySource> {
        &self.source
    }

    pub fn scope(&self, user_id: UserId) -> UserScope {
        UserScope::new(&self.config.users_dir, user_id)
    }

    pub async fn status(&self, user_id: UserId) -> CoreResult<JobStatus> {
        Ok(job_status(&JobLayout::new(&self.scope(user_id))).await?)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.events.subscribe()
    }

    /// Number of renders still running.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Run the synchronous part of a submission and launch the renderer.
    ///
    /// Every error returned here leaves no working directory behind. The
    /// returned handle resolves once the detached job has finished; callers
    /// are free to drop it.
    pub async fn submit(&self, submission: Submission) -> CoreResult<JoinHandle<JobOutcome>> {
        let Submission {
            user_id,
            activity_id,
            values,
        } = submission;
        let scope = self.scope(user_id);

        let job = PreparedJob::reserve(&scope).await?;

        match self.prepare(&job, &scope, activity_id, values).await {
            Ok(points) => {
                tracing::info!(user_id, activity_id, points, "Render job prepared");
                Ok(self.launch(job).await)
            }
            Err(e) => {
                job.discard().await;
                Err(e)
            }
        }
    }

    /// Write the config document and the track into the reserved directory.
    /// Returns the number of track points.
    async fn prepare(
        &self,
        job: &PreparedJob,
        scope: &UserScope,
        activity_id: i64,
        values: FormValues,
    ) -> CoreResult<usize> {
        let user_id = scope.user_id;
        let activity = self.source.activity(user_id, activity_id).await?;
        let context = AssemblyContext {
            preamble: Preamble {
                ffmpeg: self.config.ffmpeg.clone(),
                map_api_key: self.config.map_api_key.clone(),
                track_file: job.layout().track_path(),
                map_type: self.config.map_type.clone(),
            },
            activity_utc_offset_hours: activity.utc_offset_hours(),
            output_dir: job.layout().working_dir.clone(),
        };

        // Validation may create the photo directory.
        let registry = Arc::clone(&self.registry);
        let assembly_scope = scope.clone();
        let doc = tokio::task::spawn_blocking(move || {
            ConfigAssembler::new(&registry).assemble(&values, &assembly_scope, &context)
        })
        .await
        .map_err(|e| CoreError::Internal(format!("config assembly task failed: {e}")))??;
        job.write_config(&doc).await?;

        let streams = self.source.streams(user_id, activity_id).await?;
        let track = build_track(&streams, activity.start_date)?;
        job.write_track(&track).await?;

        Ok(track.len())
    }

    /// Clear stale outcomes and start the renderer for a prepared job.
    pub async fn launch(&self, job: PreparedJob) -> JoinHandle<JobOutcome> {
        for stale in [job.layout().result_path(), job.layout().error_marker_path()] {
            match tokio::fs::remove_file(&stale).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(
                    user_id = job.layout().user_id,
                    path = %stale.display(),
                    error = %e,
                    "Failed to remove stale job outcome",
                ),
            }
        }

        let layout = job.disarm();
        let command = self.config.command.clone();
        let marker = self.config.success_marker.clone();
        let events = Arc::clone(&self.events);

        tracing::info!(user_id = layout.user_id, "Render job launched");
        self.tracker
            .spawn(async move { run_job(command, marker, layout, events).await })
    }

    /// Stop accepting new jobs and wait for running ones to finish.
    pub async fn shutdown(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }
}

/// Detached part of a job: render, deposit the outcome, remove the working
/// directory.
async fn run_job(
    command: RenderCommand,
    marker: String,
    layout: JobLayout,
    events: Arc<JobEvents>,
) -> JobOutcome {
    let outcome = match render_and_collect(&command, &marker, &layout).await {
        Ok(()) => {
            tracing::info!(user_id = layout.user_id, "Render job succeeded");
            JobOutcome::Succeeded
        }
        Err(e) => {
            tracing::error!(user_id = layout.user_id, error = %e, "Render job failed");
            if let Err(marker_err) = tokio::fs::File::create(layout.error_marker_path()).await {
                tracing::error!(
                    user_id = layout.user_id,
                    error = %marker_err,
                    "Failed to create error marker",
                );
            }
            JobOutcome::Failed {
                reason: e.to_string(),
            }
        }
    };

    if let Err(e) = tokio::fs::remove_dir_all(&layout.working_dir).await {
        tracing::error!(
            user_id = layout.user_id,
            dir = %layout.working_dir.display(),
            error = %e,
            "Failed to remove working directory",
        );
    }

    events.publish(JobEvent::new(layout.user_id, outcome.clone()));
    outcome
}

async fn render_and_collect(
    command: &RenderCommand,
    marker: &str,
    layout: &JobLayout,
) -> Result<(), RenderError> {
    let output = run_renderer(command, &layout.config_path()).await?;
    if !output.reports_success(marker) {
        tracing::warn!(
            user_id = layout.user_id,
            exit_code = ?output.exit_code,
            duration_ms = output.duration_ms,
            output = %output.combined,
            "Renderer did not report success",
        );
        return Err(RenderError::MarkerMissing);
    }
    tokio::fs::rename(layout.rendered_video(), layout.result_path()).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
