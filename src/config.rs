use serde_derive::Deserialize;

/// Pipeline tunables. All fields have defaults, so a partial config
/// deserializes cleanly.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Frames a track may go unmatched before the associator retires it.
    pub max_disappeared_frames: u32,
    /// Association gate in image-plane pixels.
    pub max_tracking_distance: f32,
    /// Trajectory points required before computing an instantaneous speed.
    pub min_track_points: usize,
    /// Open-interval plausibility bounds on accepted speeds, km/h.
    pub min_speed_kmh: f32,
    pub max_speed_kmh: f32,
    /// Seconds a trajectory may go without updates before staleness cleanup
    /// evicts it.
    pub track_max_age: f32,
    /// Frame-time seconds between automatic staleness cleanup passes.
    pub cleanup_interval: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_disappeared_frames: 30,
            max_tracking_distance: 100.0,
            min_track_points: 3,
            min_speed_kmh: 0.0,
            max_speed_kmh: 200.0,
            track_max_age: 10.0,
            cleanup_interval: 10.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();

        assert_eq!(config.max_disappeared_frames, 30);
        assert_eq!(config.max_tracking_distance, 100.0);
        assert_eq!(config.min_track_points, 3);
        assert_eq!(config.max_speed_kmh, 200.0);
        assert_eq!(config.track_max_age, 10.0);
    }

    #[test]
    fn partial_json_uses_defaults_for_the_rest() {
        let config: Config =
            serde_json::from_str(r#"{"max_tracking_distance": 80.0}"#).unwrap();

        assert_eq!(config.max_tracking_distance, 80.0);
        assert_eq!(config.max_disappeared_frames, 30);
    }
}
