use nalgebra as na;
use serde_derive::{Deserialize, Serialize};
use std::marker::PhantomData;

/// Guards denominators of area ratios against zero-area rectangles.
pub const AREA_EPSILON: f32 = 1e-6;

pub trait BBoxFormat: std::fmt::Debug {}

/// Left-bottom-width-height format, contains the bottom left corner and width-height.
/// Used in normalized image space: origin at bottom-left, y grows upward.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct Lbwh;
impl BBoxFormat for Lbwh {}

/// Left-bottom-right-top format, contains the bottom left and top right corners
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct Lbrt;
impl BBoxFormat for Lbrt {}

/// Left-top-width-height format, contains left top corner and width-height.
/// Used in screen space: origin at top-left, y grows downward.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct Ltwh;
impl BBoxFormat for Ltwh {}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct BBox<F: BBoxFormat>([f32; 4], PhantomData<F>);

/// Axis-aligned rectangle in normalized `[0,1]` image space, bottom-left origin.
pub type NormalizedRect = BBox<Lbwh>;

impl BBox<Lbwh> {
    #[inline]
    pub fn lbwh(x: f32, y: f32, w: f32, h: f32) -> Self {
        BBox([x, y, w, h], PhantomData)
    }

    #[inline(always)]
    pub fn x(&self) -> f32 {
        self.0[0]
    }

    #[inline(always)]
    pub fn y(&self) -> f32 {
        self.0[1]
    }

    #[inline(always)]
    pub fn width(&self) -> f32 {
        self.0[2]
    }

    #[inline(always)]
    pub fn height(&self) -> f32 {
        self.0[3]
    }

    #[inline(always)]
    pub fn max_x(&self) -> f32 {
        self.0[0] + self.0[2]
    }

    #[inline(always)]
    pub fn max_y(&self) -> f32 {
        self.0[1] + self.0[3]
    }

    #[inline(always)]
    pub fn mid_x(&self) -> f32 {
        self.0[0] + self.0[2] / 2.0
    }

    #[inline(always)]
    pub fn mid_y(&self) -> f32 {
        self.0[1] + self.0[3] / 2.0
    }

    #[inline]
    pub fn center(&self) -> na::Point2<f32> {
        na::Point2::new(self.mid_x(), self.mid_y())
    }

    #[inline]
    pub fn as_lbrt(&self) -> BBox<Lbrt> {
        self.into()
    }

    /// Area in normalized units; negative sizes count as empty.
    #[inline]
    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// Orientation invariant aspect ratio `max(w, h) / min(w, h)`, always `>= 1`.
    #[inline]
    pub fn aspect(&self) -> f32 {
        let w = self.width().max(AREA_EPSILON);
        let h = self.height().max(AREA_EPSILON);

        (w / h).max(h / w)
    }

    pub fn intersection(&self, other: &Self) -> Option<Self> {
        let x0 = self.x().max(other.x());
        let y0 = self.y().max(other.y());
        let x1 = self.max_x().min(other.max_x());
        let y1 = self.max_y().min(other.max_y());

        if x1 > x0 && y1 > y0 {
            Some(Self::lbwh(x0, y0, x1 - x0, y1 - y0))
        } else {
            None
        }
    }

    /// Intersection over union, `0` for disjoint, empty or degenerate rectangles.
    pub fn iou(&self, other: &Self) -> f32 {
        let inter = match self.intersection(other) {
            Some(r) => r.area(),
            None => return 0.0,
        };

        let union = self.area() + other.area() - inter;
        if union > AREA_EPSILON * AREA_EPSILON {
            inter / union
        } else {
            0.0
        }
    }

    /// Moves every component towards `other` by `factor` (`0` keeps self, `1` takes other).
    #[inline]
    pub fn lerp(&self, other: &Self, factor: f32) -> Self {
        let mut out = [0.0; 4];
        for (o, (a, b)) in out.iter_mut().zip(self.0.iter().zip(other.0.iter())) {
            *o = a * (1.0 - factor) + b * factor;
        }

        BBox(out, PhantomData)
    }

    /// Grows (or shrinks) the rectangle about its center.
    pub fn scaled(&self, factor: f32) -> Self {
        let w = self.width() * factor;
        let h = self.height() * factor;

        Self::lbwh(self.mid_x() - w / 2.0, self.mid_y() - h / 2.0, w, h)
    }

    /// Clips the rectangle to the unit square.
    pub fn clamped(&self) -> Self {
        let x0 = self.x().clamp(0.0, 1.0);
        let y0 = self.y().clamp(0.0, 1.0);
        let x1 = self.max_x().clamp(0.0, 1.0);
        let y1 = self.max_y().clamp(0.0, 1.0);

        Self::lbwh(x0, y0, (x1 - x0).max(0.0), (y1 - y0).max(0.0))
    }

    /// Screen rectangle (top-left origin, y down) for a viewport of `viewport` points.
    pub fn to_screen(&self, viewport: na::Vector2<f32>) -> BBox<Ltwh> {
        let top_left = normalized_to_preview(na::Point2::new(self.x(), self.max_y()));

        BBox::ltwh(
            top_left.x * viewport.x,
            top_left.y * viewport.y,
            self.width() * viewport.x,
            self.height() * viewport.y,
        )
    }
}

impl BBox<Lbrt> {
    #[inline]
    pub fn lbrt(x1: f32, x2: f32, x3: f32, x4: f32) -> Self {
        BBox([x1, x2, x3, x4], PhantomData)
    }

    #[inline]
    pub fn as_lbwh(&self) -> BBox<Lbwh> {
        self.into()
    }

    #[inline(always)]
    pub fn left(&self) -> f32 {
        self.0[0]
    }

    #[inline(always)]
    pub fn bottom(&self) -> f32 {
        self.0[1]
    }

    #[inline(always)]
    pub fn right(&self) -> f32 {
        self.0[2]
    }

    #[inline(always)]
    pub fn top(&self) -> f32 {
        self.0[3]
    }

    #[inline]
    pub fn min_corner(&self) -> na::Point2<f32> {
        na::Point2::new(self.0[0], self.0[1])
    }

    #[inline]
    pub fn max_corner(&self) -> na::Point2<f32> {
        na::Point2::new(self.0[2], self.0[3])
    }
}

impl BBox<Ltwh> {
    #[inline]
    pub fn ltwh(x1: f32, x2: f32, x3: f32, x4: f32) -> Self {
        BBox([x1, x2, x3, x4], PhantomData)
    }

    #[inline(always)]
    pub fn left(&self) -> f32 {
        self.0[0]
    }

    #[inline(always)]
    pub fn top(&self) -> f32 {
        self.0[1]
    }

    #[inline(always)]
    pub fn width(&self) -> f32 {
        self.0[2]
    }

    #[inline(always)]
    pub fn height(&self) -> f32 {
        self.0[3]
    }
}

impl<'a> From<&'a BBox<Lbwh>> for BBox<Lbrt> {
    #[inline]
    fn from(v: &'a BBox<Lbwh>) -> Self {
        Self(
            [v.0[0], v.0[1], v.0[0] + v.0[2], v.0[1] + v.0[3]],
            PhantomData,
        )
    }
}

impl<'a> From<&'a BBox<Lbrt>> for BBox<Lbwh> {
    #[inline]
    fn from(v: &'a BBox<Lbrt>) -> Self {
        Self(
            [v.0[0], v.0[1], v.0[2] - v.0[0], v.0[3] - v.0[1]],
            PhantomData,
        )
    }
}

/// Normalized bottom-left origin point -> normalized preview point (top-left origin, y down).
#[inline]
pub fn normalized_to_preview(p: na::Point2<f32>) -> na::Point2<f32> {
    na::Point2::new(p.x, 1.0 - p.y)
}

/// Normalized preview point (top-left origin) -> normalized bottom-left origin point.
#[inline]
pub fn preview_to_normalized(p: na::Point2<f32>) -> na::Point2<f32> {
    na::Point2::new(p.x, 1.0 - p.y)
}
