#![allow(dead_code)]

use golftrack::depth::Intrinsics;
use golftrack::{DepthFrame, NormalizedRect, Prediction};
use nalgebra as na;
use ndarray::Array2;

pub const CAMERA_HEIGHT: f32 = 1.5;
pub const DEPTH_W: usize = 64;
pub const DEPTH_H: usize = 48;
pub const CAPTURE: (u32, u32) = (640, 480);

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn intrinsics() -> Intrinsics {
    Intrinsics::new(500.0, 500.0, 320.0, 240.0)
}

/// Camera `CAMERA_HEIGHT` meters above the origin looking straight down.
pub fn looking_down() -> na::Matrix4<f32> {
    na::Matrix4::new(
        1.0, 0.0, 0.0, 0.0,
        0.0, 0.0, -1.0, CAMERA_HEIGHT,
        0.0, 1.0, 0.0, 0.0,
        0.0, 0.0, 0.0, 1.0,
    )
}

/// Ground plane `y = a*x + b*z` under the `looking_down` camera.
pub fn ground(a: f32, b: f32) -> DepthFrame {
    let intr = intrinsics();
    let (cw, ch) = (CAPTURE.0 as f32, CAPTURE.1 as f32);

    let depth = Array2::from_shape_fn((DEPTH_H, DEPTH_W), |(v, u)| {
        let xn = (u as f32 * cw / DEPTH_W as f32 - intr.cx) / intr.fx;
        let yn = (v as f32 * ch / DEPTH_H as f32 - intr.cy) / intr.fy;
        CAMERA_HEIGHT / (1.0 + a * xn + b * yn)
    });

    DepthFrame::new(depth, intr, CAPTURE)
        .unwrap()
        .with_camera_to_world(looking_down())
        .with_viewport(320.0, 240.0)
}

/// Fronto-parallel wall at `z` meters.
pub fn wall(z: f32) -> DepthFrame {
    DepthFrame::new(Array2::from_elem((DEPTH_H, DEPTH_W), z), intrinsics(), CAPTURE).unwrap()
}

/// Box centered at `(cx, cy)` that measures `px` capture pixels on both axes.
pub fn square_px(cx: f32, cy: f32, px: f32) -> NormalizedRect {
    let w = px / CAPTURE.0 as f32;
    let h = px / CAPTURE.1 as f32;

    NormalizedRect::lbwh(cx - w / 2.0, cy - h / 2.0, w, h)
}

pub fn ball(conf: f32, bbox: NormalizedRect) -> Prediction {
    Prediction::new("ball", conf, bbox)
}

pub fn hole(conf: f32, bbox: NormalizedRect) -> Prediction {
    Prediction::new("hole", conf, bbox)
}
