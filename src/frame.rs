use crate::depth::DepthFrame;
use crate::detection::Prediction;

/// Everything the pipeline consumes for one processed camera frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Monotonically increasing per capture session; older frames are discarded.
    pub seq: u64,
    pub timestamp: f32, // in seconds
    pub predictions: Vec<Prediction>,
    pub depth: Option<DepthFrame>,
}

impl Frame {
    pub fn new(seq: u64, timestamp: f32, predictions: Vec<Prediction>) -> Self {
        Self {
            seq,
            timestamp,
            predictions,
            depth: None,
        }
    }

    pub fn with_depth(mut self, depth: DepthFrame) -> Self {
        self.depth = Some(depth);
        self
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.predictions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.predictions.is_empty()
    }
}
