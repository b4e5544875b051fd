//! Per-frame orchestration: filter, optional depth size gate, stabilization,
//! then slope guidance around the best stabilized guidance target.

use log::trace;
use serde_derive::{Deserialize, Serialize};

use crate::bbox::NormalizedRect;
use crate::config::PipelineConfig;
use crate::depth::DepthFrame;
use crate::detection::{self, Prediction};
use crate::filter::DetectionFilter;
use crate::frame::Frame;
use crate::sizer::DepthSizer;
use crate::slope::{DownhillCue, SlopeEstimator};
use crate::tracker::Stabilizer;
use crate::Tracking;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct GuidanceConfig {
    pub enabled: bool,
    /// Label whose best stabilized prediction anchors the slope estimate.
    pub label: String,
    /// ROI size relative to the target box, about its center.
    pub roi_scale: f32,
}

impl Default for GuidanceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            label: "ball".into(),
            roi_scale: 3.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FrameOutput {
    pub predictions: Vec<Prediction>,
    pub guidance: Option<DownhillCue>,
}

pub struct Pipeline<T: Tracking = Stabilizer> {
    filter: DetectionFilter,
    sizer: DepthSizer,
    tracker: T,
    slope: SlopeEstimator,
    guidance: GuidanceConfig,
}

impl Pipeline<Stabilizer> {
    pub fn new(config: &PipelineConfig) -> Self {
        Self::with_tracker(config, Stabilizer::new(config.stabilizer.clone()))
    }
}

impl Default for Pipeline<Stabilizer> {
    fn default() -> Self {
        Self::new(&PipelineConfig::default())
    }
}

impl<T: Tracking> Pipeline<T> {
    pub fn with_tracker(config: &PipelineConfig, tracker: T) -> Self {
        Self {
            filter: DetectionFilter::new(config.filter.clone()),
            sizer: DepthSizer::new(config.size_check.clone()),
            tracker,
            slope: SlopeEstimator::new(config.slope.clone()),
            guidance: config.guidance.clone(),
        }
    }

    #[inline]
    pub fn tracker(&self) -> &T {
        &self.tracker
    }

    pub fn process(&mut self, frame: &Frame) -> FrameOutput {
        let depth = frame.depth.as_ref();

        let mut dets = self.filter.filter(&frame.predictions);
        if self.sizer.config().enabled {
            dets = self.sizer.gate_by_size(depth, dets);
        }

        let predictions = self.tracker.update(&dets);
        trace!(
            "frame {}: {} raw, {} filtered, {} stable",
            frame.seq,
            frame.len(),
            dets.len(),
            predictions.len()
        );

        let guidance = self.guidance(&predictions, depth);

        FrameOutput {
            predictions,
            guidance,
        }
    }

    /// Slope cue around the best stabilized guidance target, if any.
    pub fn guidance(
        &self,
        predictions: &[Prediction],
        depth: Option<&DepthFrame>,
    ) -> Option<DownhillCue> {
        if !self.guidance.enabled {
            return None;
        }

        let target = detection::best_of(predictions, &self.guidance.label)?;
        let roi = self.guidance_roi(&target.bbox);

        self.slope
            .projected_downhill(&roi, depth, self.slope.config().step_meters)
    }

    #[inline]
    pub fn guidance_roi(&self, target: &NormalizedRect) -> NormalizedRect {
        target.scaled(self.guidance.roi_scale).clamped()
    }

    pub fn reset(&mut self) {
        self.tracker.reset();
    }
}
