//! Physical plausibility check of a detection's apparent size against depth.

use log::{debug, trace};
use serde_derive::{Deserialize, Serialize};

use crate::bbox::NormalizedRect;
use crate::depth::{DepthFrame, DepthRange};
use crate::detection::Prediction;

const METERS_PER_INCH: f32 = 0.0254;

/// Outcome of a single size check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeCheck {
    Matches,
    Mismatches,
    /// No usable depth; callers must not reject on this.
    Indeterminate,
}

impl SizeCheck {
    /// Fail-open: only a definite mismatch rejects.
    #[inline]
    pub fn rejects(self) -> bool {
        self == SizeCheck::Mismatches
    }
}

/// Known real-world size of one class.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ObjectSize {
    pub label: String,
    pub meters: f32,
    /// Relative tolerance, accepted sizes are `expected * (1 ± tolerance)`.
    pub tolerance: f32,
}

impl ObjectSize {
    pub fn from_inches(label: impl Into<String>, inches: f32, tolerance: f32) -> Self {
        Self {
            label: label.into(),
            meters: inches * METERS_PER_INCH,
            tolerance,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SizeCheckConfig {
    pub enabled: bool,
    pub objects: Vec<ObjectSize>,
    pub depth_range: DepthRange,
}

impl Default for SizeCheckConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            objects: vec![
                ObjectSize::from_inches("ball", 1.68, 0.6),
                ObjectSize::from_inches("hole", 4.25, 0.5),
            ],
            depth_range: DepthRange::default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DepthSizer {
    config: SizeCheckConfig,
}

impl DepthSizer {
    pub fn new(config: SizeCheckConfig) -> Self {
        Self { config }
    }

    #[inline]
    pub fn config(&self) -> &SizeCheckConfig {
        &self.config
    }

    pub fn object(&self, label: &str) -> Option<&ObjectSize> {
        self.config.objects.iter().find(|o| o.label == label)
    }

    /// Compares the box's size in capture pixels with the pinhole projection
    /// `focal * real_size / depth` of an object of `real_size_m` meters.
    pub fn passes_size_check(
        &self,
        frame: Option<&DepthFrame>,
        bbox: &NormalizedRect,
        real_size_m: f32,
        tolerance: f32,
    ) -> SizeCheck {
        let frame = match frame {
            Some(f) => f,
            None => return SizeCheck::Indeterminate,
        };

        let depth = match frame.depth_at_normalized(bbox.center(), &self.config.depth_range) {
            Some(z) => z,
            None => {
                trace!("size check: no valid depth under {:?}", bbox.center());
                return SizeCheck::Indeterminate;
            }
        };

        let expected_px = frame.intrinsics().focal_px() * real_size_m / depth;

        let (cw, ch) = frame.capture_size();
        let measured_px = 0.5 * (bbox.width() * cw as f32 + bbox.height() * ch as f32);

        let lo = expected_px * (1.0 - tolerance);
        let hi = expected_px * (1.0 + tolerance);

        if measured_px >= lo && measured_px <= hi {
            SizeCheck::Matches
        } else {
            debug!(
                "size check: measured {:.1}px, expected {:.1}px at {:.2}m",
                measured_px, expected_px, depth
            );
            SizeCheck::Mismatches
        }
    }

    /// Size check using the configured size and tolerance of the prediction's class.
    pub fn check(&self, frame: Option<&DepthFrame>, p: &Prediction) -> SizeCheck {
        match self.object(&p.label) {
            Some(obj) => self.passes_size_check(frame, &p.bbox, obj.meters, obj.tolerance),
            None => SizeCheck::Indeterminate,
        }
    }

    /// Drops definite mismatches, keeps everything else.
    pub fn gate_by_size(
        &self,
        frame: Option<&DepthFrame>,
        predictions: Vec<Prediction>,
    ) -> Vec<Prediction> {
        predictions
            .into_iter()
            .filter(|p| !self.check(frame, p).rejects())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::depth::Intrinsics;
    use ndarray::Array2;

    const F: f32 = 1000.0;
    const D: f32 = 2.0;
    const S: f32 = 0.05;

    fn frame(depth: f32) -> DepthFrame {
        DepthFrame::new(
            Array2::from_elem((48, 64), depth),
            Intrinsics::new(F, 900.0, 320.0, 240.0),
            (640, 480),
        )
        .unwrap()
    }

    /// Square in capture pixels, centered.
    fn square_box(px: f32) -> NormalizedRect {
        let (w, h) = (px / 640.0, px / 480.0);
        NormalizedRect::lbwh(0.5 - w / 2.0, 0.5 - h / 2.0, w, h)
    }

    #[test]
    fn expected_size_passes() {
        let sizer = DepthSizer::default();
        let f = frame(D);
        let expected = F * S / D;

        assert_eq!(
            sizer.passes_size_check(Some(&f), &square_box(expected), S, 0.5),
            SizeCheck::Matches
        );
    }

    #[test]
    fn double_size_fails() {
        let sizer = DepthSizer::default();
        let f = frame(D);
        let expected = F * S / D;

        assert_eq!(
            sizer.passes_size_check(Some(&f), &square_box(2.0 * expected), S, 0.6),
            SizeCheck::Mismatches
        );
        assert_eq!(
            sizer.passes_size_check(Some(&f), &square_box(0.2 * expected), S, 0.6),
            SizeCheck::Mismatches
        );
    }

    #[test]
    fn missing_or_bad_depth_is_indeterminate() {
        let sizer = DepthSizer::default();
        let b = square_box(25.0);

        assert_eq!(
            sizer.passes_size_check(None, &b, S, 0.5),
            SizeCheck::Indeterminate
        );
        assert_eq!(
            sizer.passes_size_check(Some(&frame(f32::INFINITY)), &b, S, 0.5),
            SizeCheck::Indeterminate
        );
        assert_eq!(
            sizer.passes_size_check(Some(&frame(0.03)), &b, S, 0.5),
            SizeCheck::Indeterminate
        );
        assert!(!SizeCheck::Indeterminate.rejects());
    }

    #[test]
    fn gate_drops_only_mismatches() {
        let sizer = DepthSizer::default();
        let f = frame(D);
        let ball_px = F * 1.68 * METERS_PER_INCH / D;

        let preds = vec![
            Prediction::new("ball", 0.6, square_box(ball_px)),
            Prediction::new("ball", 0.6, square_box(4.0 * ball_px)),
            Prediction::new("flag", 0.6, square_box(4.0 * ball_px)),
        ];

        let out = sizer.gate_by_size(Some(&f), preds.clone());
        assert_eq!(out, vec![preds[0].clone(), preds[2].clone()]);

        assert_eq!(sizer.gate_by_size(None, preds.clone()), preds);
    }
}
