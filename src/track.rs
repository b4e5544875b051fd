use crate::bbox::NormalizedRect;
use crate::detection::Prediction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    New,
    Confirmed,
    Stale,
}

#[derive(Debug, Clone)]
pub struct Track {
    pub track_id: u32,
    pub label: String,
    pub confidence: f32,
    /// Smoothed box in normalized space.
    pub bbox: NormalizedRect,
    pub hits: u32,
    pub misses: u32,
}

impl Track {
    pub fn new(track_id: u32, det: &Prediction) -> Self {
        Self {
            track_id,
            label: det.label.clone(),
            confidence: det.confidence,
            bbox: det.bbox,
            hits: 1,
            misses: 0,
        }
    }

    /// Pulls the box towards `det` by `smooth` and registers a hit.
    pub fn update(&mut self, det: &Prediction, smooth: f32) {
        self.bbox = self.bbox.lerp(&det.bbox, smooth);
        self.confidence = self.confidence.max(det.confidence);
        self.hits += 1;
        self.misses = 0;
    }

    #[inline]
    pub fn mark_missed(&mut self) {
        self.misses += 1;
    }

    pub fn state(&self, required_hits: u32, max_misses: u32) -> TrackState {
        if self.misses > max_misses {
            TrackState::Stale
        } else if self.hits >= required_hits {
            TrackState::Confirmed
        } else {
            TrackState::New
        }
    }
}

impl From<&Track> for Prediction {
    fn from(t: &Track) -> Prediction {
        Prediction {
            label: t.label.clone(),
            confidence: t.confidence,
            bbox: t.bbox,
        }
    }
}
