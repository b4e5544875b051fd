//! What the overlay should show for the latest result.
//!
//! Short detection dropouts are bridged: an empty frame only clears the
//! overlay once `hold_seconds` have passed since the last non-empty one.

use serde_derive::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::detection::Prediction;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct DisplayConfig {
    pub hold_seconds: f32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { hold_seconds: 0.7 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayStatus {
    /// Nothing has been shown yet.
    Waiting,
    Detected(usize),
    /// Empty frame inside the hold window, previous predictions still shown.
    Holding,
    Empty,
}

impl fmt::Display for DisplayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayStatus::Waiting => write!(f, "Awaiting input..."),
            DisplayStatus::Detected(n) => write!(f, "{} object(s) detected", n),
            DisplayStatus::Holding => write!(f, "Holding last detections"),
            DisplayStatus::Empty => write!(f, "No predictions"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DisplayHold {
    hold_seconds: f32,
    last_non_empty: Option<f32>,
    shown: Arc<[Prediction]>,
    status: DisplayStatus,
}

impl DisplayHold {
    pub fn new(config: &DisplayConfig) -> Self {
        Self {
            hold_seconds: config.hold_seconds,
            last_non_empty: None,
            shown: Arc::new([]),
            status: DisplayStatus::Waiting,
        }
    }

    #[inline]
    pub fn shown(&self) -> Arc<[Prediction]> {
        self.shown.clone()
    }

    #[inline]
    pub fn status(&self) -> DisplayStatus {
        self.status
    }

    pub fn update(&mut self, timestamp: f32, predictions: Vec<Prediction>) -> DisplayStatus {
        if predictions.is_empty() {
            let within_hold = self
                .last_non_empty
                .map_or(false, |ts| timestamp - ts < self.hold_seconds);

            if within_hold && !self.shown.is_empty() {
                self.status = DisplayStatus::Holding;
            } else {
                self.shown = Arc::new([]);
                self.status = DisplayStatus::Empty;
            }
        } else {
            self.last_non_empty = Some(timestamp);
            self.status = DisplayStatus::Detected(predictions.len());
            self.shown = predictions.into();
        }

        self.status
    }

    pub fn reset(&mut self) {
        self.last_non_empty = None;
        self.shown = Arc::new([]);
        self.status = DisplayStatus::Waiting;
    }
}

impl Default for DisplayHold {
    fn default() -> Self {
        Self::new(&DisplayConfig::default())
    }
}
