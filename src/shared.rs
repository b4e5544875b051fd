//! Thread-safe front of the pipeline.
//!
//! Frame processing is serialized behind one mutex so the tracker sees a
//! single writer. Each result is published by swapping an `Arc<Snapshot>`,
//! readers always get a whole snapshot. Frames older than the last applied
//! one are dropped.

use log::debug;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

use crate::config::PipelineConfig;
use crate::detection::Prediction;
use crate::display::{DisplayHold, DisplayStatus};
use crate::frame::Frame;
use crate::pipeline::Pipeline;
use crate::slope::DownhillCue;
use crate::tracker::Stabilizer;
use crate::Tracking;

/// Published result of one processed frame, ready for the overlay.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub seq: Option<u64>,
    pub timestamp: f32,
    pub predictions: Arc<[Prediction]>,
    pub guidance: Option<DownhillCue>,
    pub status: DisplayStatus,
}

impl Snapshot {
    fn empty() -> Self {
        Self {
            seq: None,
            timestamp: 0.0,
            predictions: Arc::new([]),
            guidance: None,
            status: DisplayStatus::Waiting,
        }
    }
}

struct State<T: Tracking> {
    pipeline: Pipeline<T>,
    hold: DisplayHold,
    last_seq: Option<u64>,
}

pub struct SharedPipeline<T: Tracking = Stabilizer> {
    state: Mutex<State<T>>,
    published: RwLock<Arc<Snapshot>>,
}

impl SharedPipeline<Stabilizer> {
    pub fn new(config: &PipelineConfig) -> Self {
        Self::with_pipeline(config, Pipeline::new(config))
    }
}

impl<T: Tracking> SharedPipeline<T> {
    pub fn with_pipeline(config: &PipelineConfig, pipeline: Pipeline<T>) -> Self {
        Self {
            state: Mutex::new(State {
                pipeline,
                hold: DisplayHold::new(&config.display),
                last_seq: None,
            }),
            published: RwLock::new(Arc::new(Snapshot::empty())),
        }
    }

    /// Processes `frame` and publishes the result. Returns `None` when the
    /// frame is not newer than the last applied one and was discarded.
    pub fn submit(&self, frame: &Frame) -> Option<Arc<Snapshot>> {
        let mut state = self.state.lock();

        if let Some(last) = state.last_seq {
            if frame.seq <= last {
                debug!("discarding stale frame {} (last applied {})", frame.seq, last);
                return None;
            }
        }

        let out = state.pipeline.process(frame);
        let status = state.hold.update(frame.timestamp, out.predictions);
        state.last_seq = Some(frame.seq);

        let snapshot = Arc::new(Snapshot {
            seq: Some(frame.seq),
            timestamp: frame.timestamp,
            predictions: state.hold.shown(),
            guidance: out.guidance,
            status,
        });

        *self.published.write() = snapshot.clone();

        Some(snapshot)
    }

    /// Latest published snapshot.
    #[inline]
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.published.read().clone()
    }

    /// Clears tracks, display state and the frame sequence, then publishes an empty snapshot.
    pub fn reset(&self) {
        let mut state = self.state.lock();

        state.pipeline.reset();
        state.hold.reset();
        state.last_seq = None;

        *self.published.write() = Arc::new(Snapshot::empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bbox::NormalizedRect;

    fn ball_frame(seq: u64, ts: f32) -> Frame {
        Frame::new(
            seq,
            ts,
            vec![Prediction::new("ball", 0.8, NormalizedRect::lbwh(0.4, 0.4, 0.05, 0.05))],
        )
    }

    #[test]
    fn publishes_and_discards_stale_frames() {
        let shared = SharedPipeline::new(&PipelineConfig::default());
        assert!(shared.snapshot().predictions.is_empty());

        let snap = shared.submit(&ball_frame(2, 0.2)).unwrap();
        assert_eq!(snap.predictions.len(), 1);
        assert_eq!(snap.status, DisplayStatus::Detected(1));

        assert!(shared.submit(&Frame::new(1, 0.1, vec![])).is_none());
        assert!(shared.submit(&Frame::new(2, 0.2, vec![])).is_none());
        assert_eq!(shared.snapshot().seq, Some(2));
    }

    #[test]
    fn reset_publishes_empty_snapshot() {
        let shared = SharedPipeline::new(&PipelineConfig::default());
        shared.submit(&ball_frame(5, 0.5));
        shared.reset();

        let snap = shared.snapshot();
        assert!(snap.predictions.is_empty());
        assert_eq!(snap.status, DisplayStatus::Waiting);

        // sequence restarts after a reset
        assert!(shared.submit(&ball_frame(1, 0.0)).is_some());
    }
}
