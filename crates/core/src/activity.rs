//! Activity data consumed from the upstream provider.
//!
//! The provider itself lives outside this workspace; [`ActivitySource`] is
//! the seam it plugs into.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CoreResult;
use crate::types::{Timestamp, UserId};

/// A recorded activity as listed by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivitySummary {
    pub id: i64,
    pub name: String,
    /// Start of the activity in UTC.
    pub start_date: Timestamp,
    /// The same instant expressed in the activity's local wall-clock time,
    /// carried with a UTC marker the way the provider reports it.
    pub start_date_local: Timestamp,
}

impl ActivitySummary {
    /// Difference between local and UTC start, in fractional hours.
    pub fn utc_offset_hours(&self) -> f64 {
        (self.start_date_local - self.start_date).num_seconds() as f64 / 3600.0
    }
}

/// Parallel time series of one activity.
///
/// All three series must have the same length. `locations` entries are
/// `[lat, lon]` pairs; `time_offsets` are seconds since `start_date`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivityStreams {
    pub locations: Vec<Vec<f64>>,
    /// `None` where the provider reports no elevation for the sample.
    pub elevations: Vec<Option<f64>>,
    pub time_offsets: Vec<i64>,
}

/// Where activities and their streams come from.
#[async_trait]
pub trait ActivitySource: Send + Sync {
    /// Activities available to `user_id`, most recent first.
    async fn list_activities(&self, user_id: UserId) -> CoreResult<Vec<ActivitySummary>>;

    async fn activity(&self, user_id: UserId, activity_id: i64) -> CoreResult<ActivitySummary>;

    async fn streams(&self, user_id: UserId, activity_id: i64) -> CoreResult<ActivityStreams>;
}
