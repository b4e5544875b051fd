//! Frame-to-frame stabilization of filtered detections.
//!
//! Detections are greedily matched to live tracks of the same label by IoU.
//! Matched tracks are smoothed towards the detection, unmatched detections
//! spawn tracks, and tracks unmatched for more than `max_misses` frames are
//! dropped. Only tracks with at least `required_hits` hits are emitted.

use log::{debug, trace};
use serde_derive::{Deserialize, Serialize};

use crate::detection::Prediction;
use crate::track::{Track, TrackState};
use crate::Tracking;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct StabilizerConfig {
    pub required_hits: u32,
    pub max_misses: u32,
    pub match_iou: f32,
    /// Weight of the new detection when smoothing a matched box.
    pub smooth: f32,
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        Self {
            required_hits: 1,
            max_misses: 3,
            match_iou: 0.25,
            smooth: 0.6,
        }
    }
}

#[derive(Debug, Default)]
pub struct Stabilizer {
    config: StabilizerConfig,
    tracks: Vec<Track>,
    next_id: u32,
}

impl Stabilizer {
    pub fn new(config: StabilizerConfig) -> Self {
        Self {
            config,
            tracks: Vec::with_capacity(16),
            next_id: 0,
        }
    }

    #[inline]
    pub fn config(&self) -> &StabilizerConfig {
        &self.config
    }

    #[inline]
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    fn next_id(&mut self) -> u32 {
        self.next_id = self.next_id.wrapping_add(1);
        self.next_id
    }

    /// Unclaimed track with the same label and the highest positive IoU.
    fn best_match(&self, det: &Prediction, claimed: &[bool]) -> Option<(usize, f32)> {
        let mut best: Option<(usize, f32)> = None;

        for (ti, t) in self.tracks.iter().enumerate() {
            if claimed[ti] || t.label != det.label {
                continue;
            }

            let iou = t.bbox.iou(&det.bbox);
            if iou > best.map_or(0.0, |(_, b)| b) {
                best = Some((ti, iou));
            }
        }

        best
    }
}

impl Tracking for Stabilizer {
    fn update(&mut self, dets: &[Prediction]) -> Vec<Prediction> {
        let StabilizerConfig {
            required_hits,
            max_misses,
            match_iou,
            smooth,
        } = self.config;

        let mut claimed = vec![false; self.tracks.len()];
        let mut spawn = Vec::new();

        for det in dets {
            match self.best_match(det, &claimed) {
                Some((ti, iou)) if iou >= match_iou => {
                    trace!("track {} matched {} (iou {:.2})", self.tracks[ti].track_id, det.label, iou);
                    self.tracks[ti].update(det, smooth);
                    claimed[ti] = true;
                }
                _ => spawn.push(det),
            }
        }

        for (t, _) in self.tracks.iter_mut().zip(&claimed).filter(|(_, c)| !**c) {
            t.mark_missed();
        }

        self.tracks.retain(|t| {
            let stale = t.state(required_hits, max_misses) == TrackState::Stale;
            if stale {
                debug!("track {} ({}) retired after {} misses", t.track_id, t.label, t.misses);
            }
            !stale
        });

        for det in spawn {
            let id = self.next_id();
            debug!("track {} ({}) spawned", id, det.label);
            self.tracks.push(Track::new(id, det));
        }

        self.tracks
            .iter()
            .filter(|t| t.state(required_hits, max_misses) == TrackState::Confirmed)
            .map(Into::into)
            .collect()
    }

    fn reset(&mut self) {
        self.tracks.clear();
    }
}
