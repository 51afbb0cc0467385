use std::collections::HashMap;

use nalgebra as na;
use serde_derive::Serialize;
use tracing::debug;

use crate::config::Config;
use crate::detection::Detection;
use crate::error::Error;
use crate::mapper::CoordinateMapper;
use crate::math;
use crate::track::{TrackPoint, VehicleTrack};

const MS_TO_KMH: f32 = 3.6;

/// Snapshot of the global speed measurement log. Numeric aggregates are
/// `None` while the log is empty.
#[derive(Debug, Clone, Serialize)]
pub struct Statistics {
    pub total_vehicles: u64,
    pub measurements: usize,
    pub average_speed: Option<f32>,
    pub max_speed: Option<f32>,
    pub min_speed: Option<f32>,
    pub std_speed: Option<f32>,
}

/// Maintains per-track trajectories in ground-plane coordinates and derives
/// noise-robust speed estimates from them.
///
/// The trajectory registry is keyed by the associator's id space but evolves
/// independently: staleness cleanup here may keep a trajectory whose id the
/// associator already retired, and vice versa. No reconciliation is needed.
pub struct SpeedEstimator {
    mapper: CoordinateMapper,
    tracks: HashMap<u32, VehicleTrack>,
    min_track_points: usize,
    min_speed_kmh: f32,
    max_speed_kmh: f32,
    total_vehicles: u64,
    measurements: Vec<f32>,
}

impl SpeedEstimator {
    pub fn new(mapper: CoordinateMapper, config: &Config) -> Self {
        Self {
            mapper,
            tracks: HashMap::new(),
            min_track_points: config.min_track_points,
            min_speed_kmh: config.min_speed_kmh,
            max_speed_kmh: config.max_speed_kmh,
            total_vehicles: 0,
            measurements: Vec::new(),
        }
    }

    #[inline]
    pub fn mapper(&self) -> &CoordinateMapper {
        &self.mapper
    }

    #[inline]
    pub fn mapper_mut(&mut self) -> &mut CoordinateMapper {
        &mut self.mapper
    }

    #[inline]
    pub fn track(&self, track_id: u32) -> Option<&VehicleTrack> {
        self.tracks.get(&track_id)
    }

    #[inline]
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Appends the detection to the track's trajectory and, once enough
    /// history exists, returns the track's smoothed speed in km/h. Returns
    /// `Ok(None)` while history is insufficient or the instantaneous value
    /// fell outside the plausibility gate.
    pub fn update(
        &mut self,
        track_id: u32,
        detection: &Detection,
        timestamp: f32,
    ) -> Result<Option<f32>, Error> {
        let center = detection.center();
        let world = self.mapper.image_to_world(&[center])?;

        if !self.tracks.contains_key(&track_id) {
            self.tracks.insert(track_id, VehicleTrack::new(track_id));
            self.total_vehicles += 1;
        }

        let min_track_points = self.min_track_points;
        let (min_kmh, max_kmh) = (self.min_speed_kmh, self.max_speed_kmh);

        if let Some(track) = self.tracks.get_mut(&track_id) {
            track.add_point(TrackPoint::new(timestamp, center, world[0]));

            if track.point_count() >= min_track_points {
                if let Some(speed) =
                    instantaneous_speed(track, min_track_points, min_kmh, max_kmh)
                {
                    track.add_speed(speed);
                    track.tag_latest_speed(speed);
                    self.measurements.push(speed);

                    return Ok(track.smoothed_speed());
                }
            }
        }

        Ok(None)
    }

    /// Aggregates over the full measurement log.
    pub fn statistics(&self) -> Statistics {
        Statistics {
            total_vehicles: self.total_vehicles,
            measurements: self.measurements.len(),
            average_speed: math::mean(&self.measurements),
            max_speed: self
                .measurements
                .iter()
                .copied()
                .reduce(f32::max),
            min_speed: self
                .measurements
                .iter()
                .copied()
                .reduce(f32::min),
            std_speed: math::std_dev(&self.measurements),
        }
    }

    /// Evicts every trajectory that has not been updated within `max_age`
    /// seconds of `current_time`. Independent of the associator's
    /// disappearance-based eviction.
    pub fn cleanup_old_tracks(&mut self, current_time: f32, max_age: f32) {
        let before = self.tracks.len();

        self.tracks
            .retain(|_, track| current_time - track.last_update <= max_age);

        let removed = before - self.tracks.len();
        if removed > 0 {
            debug!(removed, "stale trajectories evicted");
        }
    }
}

/// Speed over the most recent `window` trajectory points: summed pairwise
/// ground distance over summed positive time deltas. Pairs with zero or
/// negative time delta are excluded from both sums, which guards against
/// duplicate and out-of-order timestamps. The result must fall strictly
/// inside the `(min_kmh, max_kmh)` gate or it is discarded.
fn instantaneous_speed(
    track: &VehicleTrack,
    window: usize,
    min_kmh: f32,
    max_kmh: f32,
) -> Option<f32> {
    let recent: Vec<&TrackPoint> = track.recent_points(window).collect();
    if recent.len() < 2 {
        return None;
    }

    let mut total_distance = 0.0f32;
    let mut total_time = 0.0f32;

    for pair in recent.windows(2) {
        let dt = pair[1].timestamp - pair[0].timestamp;
        if dt > 0.0 {
            total_distance += na::distance(&pair[0].world_pos, &pair[1].world_pos);
            total_time += dt;
        }
    }

    if total_time <= 0.0 {
        return None;
    }

    let speed_kmh = total_distance / total_time * MS_TO_KMH;

    if speed_kmh > min_kmh && speed_kmh < max_kmh {
        Some(speed_kmh)
    } else {
        None
    }
}
