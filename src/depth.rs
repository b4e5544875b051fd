//! Depth frames and the coordinate-space conversions around them.
//!
//! Spaces used here:
//! * normalized: `[0,1]²`, origin bottom-left, y up (detector boxes);
//! * preview: `[0,1]²`, origin top-left, y down (viewport, before scaling);
//! * depth-normalized: `[0,1]²` over the depth grid / captured image, top-left origin;
//! * depth pixel: `(u, v)` column/row indices of the depth grid;
//! * capture pixel: pixels of the captured color image, the space of the intrinsics;
//! * camera: x right, y down, z forward along the optical axis (meters);
//! * world: the session's world frame, y up (meters);
//! * screen: viewport points, origin top-left.

use nalgebra as na;
use ndarray::Array2;
use serde_derive::{Deserialize, Serialize};

use crate::bbox::{normalized_to_preview, preview_to_normalized, NormalizedRect};
use crate::error::Error;

/// Pinhole intrinsics expressed in capture pixels.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Intrinsics {
    pub fx: f32,
    pub fy: f32,
    pub cx: f32,
    pub cy: f32,
}

impl Intrinsics {
    pub fn new(fx: f32, fy: f32, cx: f32, cy: f32) -> Self {
        Self { fx, fy, cx, cy }
    }

    pub fn is_valid(&self) -> bool {
        self.fx.is_finite()
            && self.fy.is_finite()
            && self.cx.is_finite()
            && self.cy.is_finite()
            && self.fx.abs() > f32::EPSILON
            && self.fy.abs() > f32::EPSILON
    }

    /// Larger of the two focal lengths, used as the effective focal length.
    #[inline]
    pub fn focal_px(&self) -> f32 {
        self.fx.max(self.fy)
    }
}

/// Accepted depth interval `(min, max]` in meters; non-finite values never pass.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct DepthRange {
    pub min: f32,
    pub max: f32,
}

impl Default for DepthRange {
    fn default() -> Self {
        Self {
            min: 0.05,
            max: 20.0,
        }
    }
}

impl DepthRange {
    #[inline]
    pub fn contains(&self, z: f32) -> bool {
        z.is_finite() && z > self.min && z <= self.max
    }
}

/// One captured depth frame with the camera state it was taken under.
#[derive(Debug, Clone)]
pub struct DepthFrame {
    /// Scene depth in meters, indexed `[(v, u)]`.
    depth: Array2<f32>,
    intrinsics: Intrinsics,
    capture_size: (u32, u32),
    camera_to_world: na::Matrix4<f32>,
    world_to_camera: Option<na::Matrix4<f32>>,
    /// Affine map from preview coordinates to depth-normalized coordinates.
    display_transform: na::Matrix3<f32>,
    viewport: na::Vector2<f32>,
}

impl DepthFrame {
    /// New frame with identity pose and display transform and a viewport equal to the capture size.
    pub fn new(
        depth: Array2<f32>,
        intrinsics: Intrinsics,
        capture_size: (u32, u32),
    ) -> Result<Self, Error> {
        if depth.is_empty() {
            return Err(Error::EmptyDepthMap);
        }

        if !intrinsics.is_valid() {
            let Intrinsics { fx, fy, cx, cy } = intrinsics;
            return Err(Error::InvalidIntrinsics { fx, fy, cx, cy });
        }

        if capture_size.0 == 0 || capture_size.1 == 0 {
            return Err(Error::InvalidCaptureSize(capture_size.0, capture_size.1));
        }

        Ok(Self {
            depth,
            intrinsics,
            capture_size,
            camera_to_world: na::Matrix4::identity(),
            world_to_camera: Some(na::Matrix4::identity()),
            display_transform: na::Matrix3::identity(),
            viewport: na::Vector2::new(capture_size.0 as f32, capture_size.1 as f32),
        })
    }

    pub fn with_camera_to_world(mut self, m: na::Matrix4<f32>) -> Self {
        self.camera_to_world = m;
        self.world_to_camera = m.try_inverse();
        self
    }

    pub fn with_display_transform(mut self, m: na::Matrix3<f32>) -> Self {
        self.display_transform = m;
        self
    }

    pub fn with_viewport(mut self, width: f32, height: f32) -> Self {
        self.viewport = na::Vector2::new(width, height);
        self
    }

    #[inline]
    pub fn intrinsics(&self) -> &Intrinsics {
        &self.intrinsics
    }

    #[inline]
    pub fn capture_size(&self) -> (u32, u32) {
        self.capture_size
    }

    #[inline]
    pub fn viewport(&self) -> na::Vector2<f32> {
        self.viewport
    }

    #[inline]
    pub fn camera_to_world(&self) -> &na::Matrix4<f32> {
        &self.camera_to_world
    }

    /// Depth grid `(width, height)`.
    #[inline]
    pub fn dims(&self) -> (usize, usize) {
        let (rows, cols) = self.depth.dim();
        (cols, rows)
    }

    /// Raw depth at a grid cell, `None` outside the grid.
    #[inline]
    pub fn depth_at(&self, u: usize, v: usize) -> Option<f32> {
        self.depth.get((v, u)).copied()
    }

    /// preview -> depth-normalized
    pub fn preview_to_depth_normalized(&self, p: na::Point2<f32>) -> na::Point2<f32> {
        apply_affine(&self.display_transform, p)
    }

    /// depth-normalized -> preview, `None` if the display transform is not invertible.
    pub fn depth_normalized_to_preview(&self, p: na::Point2<f32>) -> Option<na::Point2<f32>> {
        let inv = self.display_transform.try_inverse()?;
        Some(apply_affine(&inv, p))
    }

    /// normalized (bottom-left) -> depth pixel, unclipped.
    pub fn normalized_to_depth_pixel(&self, p: na::Point2<f32>) -> na::Point2<f32> {
        let (dw, dh) = self.dims();
        let d = self.preview_to_depth_normalized(normalized_to_preview(p));

        na::Point2::new(d.x * dw as f32, d.y * dh as f32)
    }

    /// depth pixel -> capture pixel
    pub fn depth_pixel_to_capture(&self, p: na::Point2<f32>) -> na::Point2<f32> {
        let (dw, dh) = self.dims();
        let (cw, ch) = self.capture_size;

        na::Point2::new(p.x * cw as f32 / dw as f32, p.y * ch as f32 / dh as f32)
    }

    /// capture pixel -> depth-normalized
    pub fn capture_to_depth_normalized(&self, p: na::Point2<f32>) -> na::Point2<f32> {
        let (cw, ch) = self.capture_size;

        na::Point2::new(p.x / cw as f32, p.y / ch as f32)
    }

    /// capture pixel + depth -> camera space (pinhole inverse).
    pub fn back_project(&self, p: na::Point2<f32>, z: f32) -> na::Point3<f32> {
        let Intrinsics { fx, fy, cx, cy } = self.intrinsics;

        na::Point3::new((p.x - cx) * z / fx, (p.y - cy) * z / fy, z)
    }

    /// camera space -> capture pixel, `None` behind (or on) the image plane.
    pub fn project(&self, p: &na::Point3<f32>) -> Option<na::Point2<f32>> {
        if p.z <= f32::EPSILON {
            return None;
        }

        let Intrinsics { fx, fy, cx, cy } = self.intrinsics;
        Some(na::Point2::new(fx * p.x / p.z + cx, fy * p.y / p.z + cy))
    }

    /// camera -> world
    #[inline]
    pub fn camera_to_world_point(&self, p: &na::Point3<f32>) -> na::Point3<f32> {
        transform_point(&self.camera_to_world, p)
    }

    /// world -> camera, `None` if the pose is not invertible.
    #[inline]
    pub fn world_to_camera_point(&self, p: &na::Point3<f32>) -> Option<na::Point3<f32>> {
        self.world_to_camera.as_ref().map(|m| transform_point(m, p))
    }

    /// Depth pixel `(u, v)` with depth `z` -> world point.
    pub fn unproject(&self, u: usize, v: usize, z: f32) -> na::Point3<f32> {
        let capture = self.depth_pixel_to_capture(na::Point2::new(u as f32, v as f32));

        self.camera_to_world_point(&self.back_project(capture, z))
    }

    /// Grid cell under a normalized point, `None` outside the grid.
    pub fn cell_at(&self, p: na::Point2<f32>) -> Option<(usize, usize)> {
        let px = self.normalized_to_depth_pixel(p);
        let (dw, dh) = self.dims();

        if !(px.x >= 0.0 && px.y >= 0.0) {
            return None;
        }

        let (u, v) = (px.x as usize, px.y as usize);
        if u < dw && v < dh {
            Some((u, v))
        } else {
            None
        }
    }

    /// Depth under a normalized point if it lies within `range`.
    pub fn depth_at_normalized(&self, p: na::Point2<f32>, range: &DepthRange) -> Option<f32> {
        let (u, v) = self.cell_at(p)?;
        let z = self.depth_at(u, v)?;

        if range.contains(z) {
            Some(z)
        } else {
            None
        }
    }

    /// World point under the center of `roi`, single sample.
    pub fn world_point_at_center(
        &self,
        roi: &NormalizedRect,
        range: &DepthRange,
    ) -> Option<na::Point3<f32>> {
        let (u, v) = self.cell_at(roi.center())?;
        let z = self.depth_at(u, v)?;

        if !range.contains(z) {
            return None;
        }

        Some(self.unproject(u, v, z))
    }

    /// world -> screen points (top-left origin, viewport sized).
    pub fn project_to_screen(&self, world: &na::Point3<f32>) -> Option<na::Point2<f32>> {
        let cam = self.world_to_camera_point(world)?;
        let capture = self.project(&cam)?;
        let preview = self.depth_normalized_to_preview(self.capture_to_depth_normalized(capture))?;

        Some(na::Point2::new(
            preview.x * self.viewport.x,
            preview.y * self.viewport.y,
        ))
    }

    /// screen point -> normalized (bottom-left) point.
    pub fn screen_to_normalized(&self, p: na::Point2<f32>) -> na::Point2<f32> {
        preview_to_normalized(na::Point2::new(
            p.x / self.viewport.x,
            p.y / self.viewport.y,
        ))
    }
}

#[inline]
fn apply_affine(m: &na::Matrix3<f32>, p: na::Point2<f32>) -> na::Point2<f32> {
    let v = m * na::Vector3::new(p.x, p.y, 1.0);
    na::Point2::new(v.x, v.y)
}

#[inline]
fn transform_point(m: &na::Matrix4<f32>, p: &na::Point3<f32>) -> na::Point3<f32> {
    let v = m * na::Vector4::new(p.x, p.y, p.z, 1.0);
    na::Point3::new(v.x, v.y, v.z)
}
