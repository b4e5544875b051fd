pub mod bbox;
pub mod config;
pub mod depth;
pub mod detection;
pub mod detector;
pub mod display;
pub mod error;
pub mod filter;
pub mod frame;
pub mod math;
pub mod pipeline;
pub mod shared;
pub mod sizer;
pub mod slope;
pub mod tracker;

mod track;

pub use bbox::NormalizedRect;
pub use config::PipelineConfig;
pub use depth::DepthFrame;
pub use detection::Prediction;
pub use frame::Frame;
pub use pipeline::{FrameOutput, Pipeline};
pub use shared::{SharedPipeline, Snapshot};
pub use slope::{DownhillCue, SlopeResult};
pub use track::{Track, TrackState};
pub use tracker::Stabilizer;

use nalgebra as na;
use std::fmt;

pub trait Float:
    num_traits::FromPrimitive + na::RealField + Copy + fmt::Debug + PartialEq + 'static
{
}

impl<T> Float for T where
    T: num_traits::FromPrimitive + na::RealField + Copy + fmt::Debug + PartialEq + 'static
{
}

/// Frame-to-frame identity keeping for detections.
///
/// Implementations hold mutable state and expect a single writer; wrap them
/// in [`SharedPipeline`] when frames arrive from several threads.
pub trait Tracking {
    /// Feeds one frame of filtered detections, returns the confirmed ones.
    fn update(&mut self, dets: &[Prediction]) -> Vec<Prediction>;

    /// Drops every track, e.g. when the camera session restarts.
    fn reset(&mut self);
}
