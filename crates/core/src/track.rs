//! Track construction from activity streams and GPX serialization.

use chrono::TimeDelta;
use time::OffsetDateTime;

use crate::activity::ActivityStreams;
use crate::error::{CoreError, CoreResult};
use crate::types::Timestamp;

const GPX_CREATOR: &str = "trackreel";

#[derive(Debug, Clone, PartialEq)]
pub struct TrackPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: Option<f64>,
    pub time: Timestamp,
}

/// Timestamped points in recording order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Track {
    pub points: Vec<TrackPoint>,
}

/// Zip the three activity series into a track starting at `start`.
///
/// Fails with [`CoreError::DataShape`] when the series differ in length, a
/// location is not a `[lat, lon]` pair, or the time offsets go backwards.
pub fn build_track(streams: &ActivityStreams, start: Timestamp) -> CoreResult<Track> {
    let len = streams.time_offsets.len();
    if streams.locations.len() != len || streams.elevations.len() != len {
        return Err(CoreError::DataShape(format!(
            "series lengths differ: {} locations, {} elevations, {} time offsets",
            streams.locations.len(),
            streams.elevations.len(),
            len
        )));
    }

    let mut points = Vec::with_capacity(len);
    let mut previous: Option<i64> = None;
    for (i, ((location, elevation), offset)) in streams
        .locations
        .iter()
        .zip(&streams.elevations)
        .zip(&streams.time_offsets)
        .enumerate()
    {
        let &[latitude, longitude] = location.as_slice() else {
            return Err(CoreError::DataShape(format!(
                "location {i} has {} coordinates, expected 2",
                location.len()
            )));
        };
        if previous.is_some_and(|p| *offset < p) {
            return Err(CoreError::DataShape(format!(
                "time offset {i} goes backwards ({offset}s)"
            )));
        }
        previous = Some(*offset);

        let time = TimeDelta::try_seconds(*offset)
            .and_then(|delta| start.checked_add_signed(delta))
            .ok_or_else(|| {
                CoreError::DataShape(format!("time offset {i} is out of range ({offset}s)"))
            })?;

        points.push(TrackPoint {
            latitude,
            longitude,
            elevation: *elevation,
            time,
        });
    }

    Ok(Track { points })
}

impl Track {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Serialize as a GPX 1.1 document with a single track segment.
    pub fn to_gpx(&self) -> CoreResult<Vec<u8>> {
        let mut segment = gpx::TrackSegment::new();
        for point in &self.points {
            let mut waypoint =
                gpx::Waypoint::new(geo_types::Point::new(point.longitude, point.latitude));
            waypoint.elevation = point.elevation;
            waypoint.time = Some(gpx::Time::from(to_offset_date_time(point.time)?));
            segment.points.push(waypoint);
        }

        let mut track = gpx::Track::new();
        track.segments.push(segment);

        let document = gpx::Gpx {
            version: gpx::GpxVersion::Gpx11,
            creator: Some(GPX_CREATOR.to_string()),
            tracks: vec![track],
            ..Default::default()
        };

        let mut buf = Vec::new();
        gpx::write(&document, &mut buf)
            .map_err(|e| CoreError::Internal(format!("GPX serialization failed: {e}")))?;
        Ok(buf)
    }
}

fn to_offset_date_time(ts: Timestamp) -> CoreResult<OffsetDateTime> {
    let nanos = i128::from(ts.timestamp()) * 1_000_000_000 + i128::from(ts.timestamp_subsec_nanos());
    OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .map_err(|e| CoreError::DataShape(format!("timestamp {ts} cannot be encoded: {e}")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
