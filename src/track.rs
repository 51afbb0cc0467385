use nalgebra as na;

use crate::circular_queue::CircularQueue;
use crate::math;

/// Trajectory samples retained per track.
pub const POINT_HISTORY: usize = 30;

/// Accepted speed samples retained per track for smoothing.
pub const SPEED_WINDOW: usize = 10;

/// One sample of a vehicle's trajectory.
#[derive(Debug, Clone)]
pub struct TrackPoint {
    pub timestamp: f32,
    pub image_pos: na::Point2<f32>,
    pub world_pos: na::Point2<f32>,
    pub speed_kmh: Option<f32>,
}

impl TrackPoint {
    pub fn new(timestamp: f32, image_pos: na::Point2<f32>, world_pos: na::Point2<f32>) -> Self {
        Self {
            timestamp,
            image_pos,
            world_pos,
            speed_kmh: None,
        }
    }
}

/// A tracked vehicle's bounded trajectory and speed history.
#[derive(Debug, Clone)]
pub struct VehicleTrack {
    pub track_id: u32,
    points: CircularQueue<TrackPoint>,
    speeds: CircularQueue<f32>,
    pub last_update: f32,
    pub total_distance: f32,
    pub frames_tracked: u32,
}

impl VehicleTrack {
    pub fn new(track_id: u32) -> Self {
        Self {
            track_id,
            points: CircularQueue::with_capacity(POINT_HISTORY),
            speeds: CircularQueue::with_capacity(SPEED_WINDOW),
            last_update: 0.0,
            total_distance: 0.0,
            frames_tracked: 0,
        }
    }

    /// Appends a trajectory point, accumulating ground-plane distance from
    /// the previous one.
    pub fn add_point(&mut self, point: TrackPoint) {
        if let Some(prev) = self.points.latest() {
            self.total_distance += na::distance(&prev.world_pos, &point.world_pos);
        }

        self.last_update = point.timestamp;
        self.frames_tracked += 1;
        self.points.push(point);
    }

    /// Records an accepted speed sample. Non-positive samples are dropped.
    pub fn add_speed(&mut self, speed_kmh: f32) {
        if speed_kmh > 0.0 {
            self.speeds.push(speed_kmh);
        }
    }

    /// Tags the most recent trajectory point with its computed speed, for
    /// annotation layers that color trajectories by speed.
    pub fn tag_latest_speed(&mut self, speed_kmh: f32) {
        if let Some(point) = self.points.latest_mut() {
            point.speed_kmh = Some(speed_kmh);
        }
    }

    #[inline]
    pub fn points(&self) -> impl Iterator<Item = &TrackPoint> {
        self.points.iter()
    }

    #[inline]
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// The most recent `n` trajectory points, oldest first.
    #[inline]
    pub fn recent_points(&self, n: usize) -> impl Iterator<Item = &TrackPoint> {
        self.points.recent(n)
    }

    #[inline]
    pub fn speed_count(&self) -> usize {
        self.speeds.len()
    }

    /// Outlier-filtered mean of the buffered speed samples. With 3 or more
    /// samples, values deviating from the median by half its magnitude or
    /// more are dropped before averaging; with fewer, all samples are
    /// averaged as-is.
    pub fn smoothed_speed(&self) -> Option<f32> {
        if self.speeds.is_empty() {
            return None;
        }

        let samples: Vec<f32> = self.speeds.iter().copied().collect();

        if samples.len() >= 3 {
            let median = math::median(&samples)?;
            let filtered: Vec<f32> = samples
                .iter()
                .copied()
                .filter(|s| (s - median).abs() < median * 0.5)
                .collect();

            if !filtered.is_empty() {
                return math::mean(&filtered);
            }
        }

        math::mean(&samples)
    }
}
