pub mod associator;
pub mod config;
pub mod detection;
pub mod error;
pub mod estimator;
pub mod frame;
pub mod mapper;
pub mod math;
pub mod track;

mod circular_queue;

pub use associator::TrackAssociator;
pub use config::Config;
pub use detection::Detection;
pub use error::Error;
pub use estimator::{SpeedEstimator, Statistics};
pub use frame::Frame;
pub use mapper::CoordinateMapper;
pub use track::{TrackPoint, VehicleTrack};

use nalgebra as na;
use tracing::warn;

/// One pipeline output row: a detection tagged with its persistent track id
/// and, once enough trajectory exists, a smoothed speed in km/h.
#[derive(Debug, Clone)]
pub struct TrackedVehicle {
    pub track_id: u32,
    pub detection: Detection,
    pub speed_kmh: Option<f32>,
}

/// Per-frame orchestration: association feeds trajectory update, which maps
/// through the calibrated ground plane and yields smoothed speeds. Frames
/// must arrive sequentially in non-decreasing timestamp order.
pub struct SpeedPipeline {
    associator: TrackAssociator,
    estimator: SpeedEstimator,
    track_max_age: f32,
    cleanup_interval: f32,
    last_cleanup: f32,
}

impl SpeedPipeline {
    pub fn new(config: Config) -> Self {
        Self {
            associator: TrackAssociator::new(
                config.max_disappeared_frames,
                config.max_tracking_distance,
            ),
            estimator: SpeedEstimator::new(CoordinateMapper::new(), &config),
            track_max_age: config.track_max_age,
            cleanup_interval: config.cleanup_interval,
            last_cleanup: 0.0,
        }
    }

    /// Calibrates the ground-plane mapping. Must succeed before any frame is
    /// processed.
    pub fn calibrate(
        &mut self,
        image_points: &[na::Point2<f32>],
        world_points: &[na::Point2<f32>],
    ) -> bool {
        self.estimator.mapper_mut().calibrate(image_points, world_points)
    }

    #[inline]
    pub fn is_calibrated(&self) -> bool {
        self.estimator.mapper().is_calibrated()
    }

    /// Processes one frame: associates detections with tracks, updates each
    /// track's trajectory and speed, and periodically purges stale
    /// trajectories. A failure on a single detection is logged and skipped
    /// rather than aborting the frame.
    pub fn process_frame(&mut self, frame: &Frame) -> Result<Vec<TrackedVehicle>, Error> {
        if !self.is_calibrated() {
            return Err(Error::NotCalibrated);
        }

        let pairs = self.associator.update(&frame.detections);
        let mut results = Vec::with_capacity(pairs.len());

        for (track_id, detection) in pairs {
            match self.estimator.update(track_id, &detection, frame.timestamp) {
                Ok(speed_kmh) => results.push(TrackedVehicle {
                    track_id,
                    detection,
                    speed_kmh,
                }),
                Err(err) => {
                    warn!(track_id, %err, "skipping detection");
                }
            }
        }

        if frame.timestamp - self.last_cleanup >= self.cleanup_interval {
            self.estimator
                .cleanup_old_tracks(frame.timestamp, self.track_max_age);
            self.last_cleanup = frame.timestamp;
        }

        Ok(results)
    }

    #[inline]
    pub fn statistics(&self) -> Statistics {
        self.estimator.statistics()
    }

    /// Trajectory read access for annotation layers.
    #[inline]
    pub fn track(&self, track_id: u32) -> Option<&VehicleTrack> {
        self.estimator.track(track_id)
    }

    /// Manually purges trajectories not updated within the configured
    /// maximum age.
    pub fn cleanup_old_tracks(&mut self, current_time: f32) {
        self.estimator
            .cleanup_old_tracks(current_time, self.track_max_age);
    }
}
