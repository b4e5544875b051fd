//! Local surface slope from depth: back-projects a grid of depth samples under a
//! region of interest into world space and fits `y = a*x + b*z` (world up is +y).

use log::{debug, trace};
use nalgebra as na;
use serde_derive::{Deserialize, Serialize};

use crate::bbox::NormalizedRect;
use crate::depth::{DepthFrame, DepthRange};
use crate::math;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SlopeConfig {
    /// Minimum ROI extent on the depth grid, in depth pixels per axis.
    pub min_span_px: usize,
    /// Sampling strides per axis, i.e. at most `(strides + 1)²` samples.
    pub strides: usize,
    pub min_samples: usize,
    pub depth_range: DepthRange,
    /// Normal equations with `|det|` below this are treated as singular.
    pub det_epsilon: f32,
    /// World distance walked along the downhill direction for the screen cue.
    pub step_meters: f32,
}

impl Default for SlopeConfig {
    fn default() -> Self {
        Self {
            min_span_px: 4,
            strides: 24,
            min_samples: 20,
            depth_range: DepthRange::default(),
            det_epsilon: 1e-6,
            step_meters: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlopeResult {
    pub angle_degrees: f32,
    /// Horizontal downhill direction in world space. Arbitrary when the surface is level.
    pub downhill_world: na::Unit<na::Vector3<f32>>,
}

/// Screen-space rendering cue for the downhill direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DownhillCue {
    /// ROI center in screen points.
    pub anchor: na::Point2<f32>,
    pub direction: na::Unit<na::Vector2<f32>>,
    pub angle_degrees: f32,
}

#[derive(Debug, Clone, Default)]
pub struct SlopeEstimator {
    config: SlopeConfig,
}

impl SlopeEstimator {
    pub fn new(config: SlopeConfig) -> Self {
        Self { config }
    }

    #[inline]
    pub fn config(&self) -> &SlopeConfig {
        &self.config
    }

    /// Depth-pixel window `(u0, v0, u1, v1)` covered by `roi`, clipped to the grid.
    fn window(&self, roi: &NormalizedRect, frame: &DepthFrame) -> Option<(usize, usize, usize, usize)> {
        let corners = roi.as_lbrt();
        let p0 = frame.normalized_to_depth_pixel(corners.min_corner());
        let p1 = frame.normalized_to_depth_pixel(corners.max_corner());
        if ![p0.x, p0.y, p1.x, p1.y].iter().all(|c| c.is_finite()) {
            return None;
        }

        let (dw, dh) = frame.dims();
        let (max_u, max_v) = ((dw - 1) as f32, (dh - 1) as f32);

        let u0 = p0.x.min(p1.x).clamp(0.0, max_u) as usize;
        let v0 = p0.y.min(p1.y).clamp(0.0, max_v) as usize;
        let u1 = p0.x.max(p1.x).clamp(0.0, max_u) as usize;
        let v1 = p0.y.max(p1.y).clamp(0.0, max_v) as usize;

        let span = self.config.min_span_px;
        if u1.saturating_sub(u0) < span || v1.saturating_sub(v0) < span {
            return None;
        }

        Some((u0, v0, u1, v1))
    }

    /// World points under `roi`, on a bounded grid of samples with valid depth.
    pub fn sample_points(&self, roi: &NormalizedRect, frame: &DepthFrame) -> Option<Vec<na::Point3<f32>>> {
        let (u0, v0, u1, v1) = match self.window(roi, frame) {
            Some(w) => w,
            None => {
                trace!("slope: roi {:?} too small on depth grid", roi);
                return None;
            }
        };

        let strides = self.config.strides.max(1);
        let step_u = ((u1 - u0 + strides - 1) / strides).max(1);
        let step_v = ((v1 - v0 + strides - 1) / strides).max(1);

        let mut points = Vec::with_capacity((strides + 1) * (strides + 1));
        for v in (v0..=v1).step_by(step_v) {
            for u in (u0..=u1).step_by(step_u) {
                match frame.depth_at(u, v) {
                    Some(z) if self.config.depth_range.contains(z) => {
                        points.push(frame.unproject(u, v, z))
                    }
                    _ => {}
                }
            }
        }

        Some(points)
    }

    pub fn estimate_slope(&self, roi: &NormalizedRect, frame: Option<&DepthFrame>) -> Option<SlopeResult> {
        let points = self.sample_points(roi, frame?)?;

        if points.len() < self.config.min_samples {
            debug!("slope: {} valid samples, need {}", points.len(), self.config.min_samples);
            return None;
        }

        let params = match math::plane_ls(&points, self.config.det_epsilon) {
            Some(p) => p,
            None => {
                debug!("slope: singular plane fit over {} samples", points.len());
                return None;
            }
        };

        let (a, b) = (params[0], params[1]);
        let downhill = na::Unit::try_new(na::Vector3::new(-a, 0.0, -b), f32::EPSILON)
            .unwrap_or_else(na::Vector3::x_axis);
        let angle_degrees = (a * a + b * b).sqrt().atan().to_degrees();

        Some(SlopeResult {
            angle_degrees,
            downhill_world: downhill,
        })
    }

    /// Screen anchor and unit direction of the downhill vector at the ROI center.
    pub fn projected_downhill(
        &self,
        roi: &NormalizedRect,
        frame: Option<&DepthFrame>,
        step_meters: f32,
    ) -> Option<DownhillCue> {
        let frame = frame?;
        let slope = self.estimate_slope(roi, Some(frame))?;

        let p0 = frame.world_point_at_center(roi, &self.config.depth_range)?;
        let p1 = p0 + slope.downhill_world.into_inner() * step_meters;

        let s0 = frame.project_to_screen(&p0)?;
        let s1 = frame.project_to_screen(&p1)?;
        let direction = na::Unit::try_new(s1 - s0, 1e-6)?;

        Some(DownhillCue {
            anchor: s0,
            direction,
            angle_degrees: slope.angle_degrees,
        })
    }
}
