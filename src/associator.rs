use std::collections::HashMap;

use nalgebra as na;
use ndarray::Array2;
use tracing::debug;

use crate::detection::Detection;

/// Last known image-plane center and consecutive missed-frame count for one
/// track id. Kept separate from the trajectory registry on purpose: the two
/// evolve under different eviction policies.
#[derive(Debug, Clone)]
struct TrackEntry {
    center: na::Point2<f32>,
    disappeared: u32,
}

/// Frame-to-frame data association by greedy nearest-neighbor matching over
/// image-plane centers. The greedy sorted-candidate commit is a deliberate
/// approximation of optimal assignment: ambiguous configurations may pair
/// locally rather than globally best, which keeps track-id continuity
/// behavior predictable and cheap.
pub struct TrackAssociator {
    tracks: HashMap<u32, TrackEntry>,
    next_id: u32,
    max_disappeared: u32,
    max_distance: f32,
}

impl TrackAssociator {
    pub fn new(max_disappeared: u32, max_distance: f32) -> Self {
        Self {
            tracks: HashMap::new(),
            next_id: 1,
            max_disappeared,
            max_distance,
        }
    }

    #[inline]
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    #[inline]
    pub fn contains(&self, track_id: u32) -> bool {
        self.tracks.contains_key(&track_id)
    }

    /// Assigns every input detection to a track id, spawning fresh ids for
    /// unmatched detections. Tracks that receive no detection age by one
    /// frame and are retired once their disappearance count exceeds the
    /// configured maximum; retired ids are never reused.
    pub fn update(&mut self, detections: &[Detection]) -> Vec<(u32, Detection)> {
        if detections.is_empty() {
            self.age_tracks(&[]);
            return Vec::new();
        }

        if self.tracks.is_empty() {
            return detections
                .iter()
                .map(|det| (self.create_track(det), det.clone()))
                .collect();
        }

        // stable id order so equal distances break ties deterministically
        let mut track_ids: Vec<u32> = self.tracks.keys().copied().collect();
        track_ids.sort_unstable();

        let centers: Vec<na::Point2<f32>> = detections.iter().map(|d| d.center()).collect();

        let distances = Array2::from_shape_fn((track_ids.len(), detections.len()), |(i, j)| {
            na::distance(&self.tracks[&track_ids[i]].center, &centers[j])
        });

        let mut candidates: Vec<(f32, usize, usize)> = Vec::new();
        for i in 0..track_ids.len() {
            for j in 0..detections.len() {
                let d = distances[(i, j)];
                if d < self.max_distance {
                    candidates.push((d, i, j));
                }
            }
        }
        candidates.sort_by(|a, b| {
            a.0.total_cmp(&b.0)
                .then(a.1.cmp(&b.1))
                .then(a.2.cmp(&b.2))
        });

        let mut used_tracks = vec![false; track_ids.len()];
        let mut used_dets = vec![false; detections.len()];
        let mut results = Vec::with_capacity(detections.len());

        for (_, i, j) in candidates {
            if used_tracks[i] || used_dets[j] {
                continue;
            }
            used_tracks[i] = true;
            used_dets[j] = true;

            let track_id = track_ids[i];
            if let Some(entry) = self.tracks.get_mut(&track_id) {
                entry.center = centers[j];
                entry.disappeared = 0;
            }

            results.push((track_id, detections[j].clone()));
        }

        // age the pre-frame registry before spawning, so tracks created for
        // this frame's unmatched detections start at disappeared = 0
        let matched: Vec<u32> = track_ids
            .iter()
            .zip(&used_tracks)
            .filter(|(_, &used)| used)
            .map(|(&id, _)| id)
            .collect();
        self.age_tracks(&matched);

        for (j, det) in detections.iter().enumerate() {
            if !used_dets[j] {
                results.push((self.create_track(det), det.clone()));
            }
        }

        results
    }

    fn create_track(&mut self, det: &Detection) -> u32 {
        let track_id = self.next_id;
        self.next_id += 1;

        self.tracks.insert(
            track_id,
            TrackEntry {
                center: det.center(),
                disappeared: 0,
            },
        );

        track_id
    }

    /// Ages every track not in `matched` and retires the expired ones.
    fn age_tracks(&mut self, matched: &[u32]) {
        let max_disappeared = self.max_disappeared;

        self.tracks.retain(|id, entry| {
            if matched.contains(id) {
                return true;
            }

            entry.disappeared += 1;
            if entry.disappeared > max_disappeared {
                debug!(track_id = id, "track retired after disappearing");
                false
            } else {
                true
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det_at(x: f32, y: f32) -> Detection {
        Detection::new(x - 10.0, y - 10.0, x + 10.0, y + 10.0, 0.9, 2)
    }

    #[test]
    fn first_frame_spawns_tracks() {
        let mut assoc = TrackAssociator::new(30, 100.0);
        let out = assoc.update(&[det_at(100.0, 100.0), det_at(500.0, 500.0)]);

        let ids: Vec<u32> = out.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(assoc.track_count(), 2);
    }

    #[test]
    fn every_detection_appears_exactly_once() {
        let mut assoc = TrackAssociator::new(30, 100.0);
        assoc.update(&[det_at(100.0, 100.0), det_at(500.0, 500.0)]);

        let dets = [det_at(105.0, 100.0), det_at(505.0, 500.0), det_at(900.0, 100.0)];
        let out = assoc.update(&dets);

        assert_eq!(out.len(), dets.len());
        for det in &dets {
            assert_eq!(out.iter().filter(|(_, d)| d == det).count(), 1);
        }
    }

    #[test]
    fn nearby_detection_keeps_its_id() {
        let mut assoc = TrackAssociator::new(30, 100.0);
        assoc.update(&[det_at(100.0, 100.0)]);
        let out = assoc.update(&[det_at(110.0, 100.0)]);

        assert_eq!(out[0].0, 1);
        assert_eq!(assoc.track_count(), 1);
    }

    #[test]
    fn far_detection_spawns_new_track() {
        let mut assoc = TrackAssociator::new(30, 100.0);
        assoc.update(&[det_at(100.0, 100.0)]);
        let out = assoc.update(&[det_at(400.0, 400.0)]);

        assert_eq!(out[0].0, 2);
        // the old track survives, aged by one frame
        assert_eq!(assoc.track_count(), 2);
    }

    #[test]
    fn greedy_matching_prefers_closest_pair() {
        let mut assoc = TrackAssociator::new(30, 100.0);
        assoc.update(&[det_at(100.0, 100.0), det_at(160.0, 100.0)]);

        // detection near track 1, another between the two but closer to 2
        let out = assoc.update(&[det_at(102.0, 100.0), det_at(150.0, 100.0)]);

        let mut pairs: Vec<(u32, f32)> = out.iter().map(|(id, d)| (*id, d.center().x)).collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(pairs[0], (1, 102.0));
        assert_eq!(pairs[1], (2, 150.0));
    }

    #[test]
    fn empty_frames_age_and_retire_tracks() {
        let mut assoc = TrackAssociator::new(30, 100.0);
        assoc.update(&[det_at(100.0, 100.0)]);
        assert!(assoc.contains(1));

        for _ in 0..30 {
            let out = assoc.update(&[]);
            assert!(out.is_empty());
        }
        // disappeared == 30, not yet over the limit
        assert!(assoc.contains(1));

        assoc.update(&[]);
        assert!(!assoc.contains(1));
        assert_eq!(assoc.track_count(), 0);
    }

    #[test]
    fn matching_resets_disappearance() {
        let mut assoc = TrackAssociator::new(2, 100.0);
        assoc.update(&[det_at(100.0, 100.0)]);
        assoc.update(&[]);
        assoc.update(&[]);
        // one more empty frame would retire it; a match saves it instead
        let out = assoc.update(&[det_at(101.0, 100.0)]);
        assert_eq!(out[0].0, 1);

        assoc.update(&[]);
        assoc.update(&[]);
        assert!(assoc.contains(1));
    }

    #[test]
    fn spawned_track_is_not_aged_on_its_spawn_frame() {
        let mut assoc = TrackAssociator::new(1, 100.0);
        assoc.update(&[det_at(100.0, 100.0)]);

        // track 2 spawns in a frame where track 1 already exists
        let out = assoc.update(&[det_at(100.0, 100.0), det_at(500.0, 500.0)]);
        assert_eq!(out.len(), 2);
        assert!(assoc.contains(2));

        // first miss: disappeared goes 0 -> 1, still within the limit
        assoc.update(&[det_at(100.0, 100.0)]);
        assert!(assoc.contains(2));

        // second miss pushes it over and retires it
        assoc.update(&[det_at(100.0, 100.0)]);
        assert!(!assoc.contains(2));
    }

    #[test]
    fn retired_ids_are_never_reused() {
        let mut assoc = TrackAssociator::new(0, 100.0);
        assoc.update(&[det_at(100.0, 100.0)]);
        assoc.update(&[]); // disappeared = 1 > 0, retired

        assert!(!assoc.contains(1));
        let out = assoc.update(&[det_at(100.0, 100.0)]);
        assert_eq!(out[0].0, 2);
    }

    #[test]
    fn update_on_empty_state_is_total() {
        let mut assoc = TrackAssociator::new(30, 100.0);
        for _ in 0..5 {
            assert!(assoc.update(&[]).is_empty());
        }
        assert_eq!(assoc.track_count(), 0);
    }
}
