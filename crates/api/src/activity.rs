//! Activity source backed by JSON exports on disk.
//!
//! ```text
//! <activities_dir>/<uid>/<activity_id>.json
//! ```
//!
//! Each file holds `{ "activity": ActivitySummary, "streams": ActivityStreams }`,
//! as dumped by the sync job that talks to the activity provider.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use trackreel_core::activity::{ActivitySource, ActivityStreams, ActivitySummary};
use trackreel_core::error::{CoreError, CoreResult};
use trackreel_core::types::UserId;

#[derive(Debug, Deserialize)]
struct ActivityExport {
    activity: ActivitySummary,
    streams: ActivityStreams,
}

pub struct JsonActivitySource {
    root: PathBuf,
}

impl JsonActivitySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn user_dir(&self, user_id: UserId) -> PathBuf {
        self.root.join(user_id.to_string())
    }

    async fn load(&self, user_id: UserId, activity_id: i64) -> CoreResult<ActivityExport> {
        let path = self.user_dir(user_id).join(format!("{activity_id}.json"));
        match tokio::fs::read(&path).await {
            Ok(bytes) => parse_export(&path, &bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(CoreError::NotFound {
                user_id,
                activity_id,
            }),
            Err(e) => Err(CoreError::Upstream(format!(
                "cannot read {}: {e}",
                path.display()
            ))),
        }
    }
}

fn parse_export(path: &Path, bytes: &[u8]) -> CoreResult<ActivityExport> {
    serde_json::from_slice(bytes)
        .map_err(|e| CoreError::Upstream(format!("cannot parse {}: {e}", path.display())))
}

#[async_trait]
impl ActivitySource for JsonActivitySource {
    async fn list_activities(&self, user_id: UserId) -> CoreResult<Vec<ActivitySummary>> {
        let dir = self.user_dir(user_id);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(CoreError::Upstream(format!(
                    "cannot list {}: {e}",
                    dir.display()
                )))
            }
        };

        let mut activities = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CoreError::Upstream(e.to_string()))?
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|e| CoreError::Upstream(format!("cannot read {}: {e}", path.display())))?;
            match parse_export(&path, &bytes) {
                Ok(export) => activities.push(export.activity),
                Err(e) => tracing::warn!(error = %e, "Skipping unreadable activity export"),
            }
        }

        activities.sort_by(|a, b| b.start_date.cmp(&a.start_date));
        Ok(activities)
    }

    async fn activity(&self, user_id: UserId, activity_id: i64) -> CoreResult<ActivitySummary> {
        Ok(self.load(user_id, activity_id).await?.activity)
    }

    async fn streams(&self, user_id: UserId, activity_id: i64) -> CoreResult<ActivityStreams> {
        Ok(self.load(user_id, activity_id).await?.streams)
    }
}
