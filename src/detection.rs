use serde_derive::{Deserialize, Serialize};

use crate::bbox::NormalizedRect;

/// A single labelled detection in normalized image space (bottom-left origin).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: String,
    #[serde(rename = "p")]
    pub confidence: f32,
    pub bbox: NormalizedRect,
}

impl Prediction {
    pub fn new(label: impl Into<String>, confidence: f32, bbox: NormalizedRect) -> Self {
        Self {
            label: label.into(),
            confidence,
            bbox,
        }
    }

    #[inline]
    pub fn iou(&self, other: &Prediction) -> f32 {
        self.bbox.iou(&other.bbox)
    }

    #[inline(always)]
    pub fn area(&self) -> f32 {
        self.bbox.area()
    }

    #[inline(always)]
    pub fn is(&self, label: &str) -> bool {
        self.label == label
    }
}

/// Highest confidence prediction with the given label.
pub fn best_of<'a>(predictions: &'a [Prediction], label: &str) -> Option<&'a Prediction> {
    predictions
        .iter()
        .filter(|p| p.is(label))
        .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn best_of_picks_highest_confidence_for_label() {
        let preds = vec![
            Prediction::new("ball", 0.4, NormalizedRect::lbwh(0.1, 0.1, 0.05, 0.05)),
            Prediction::new("hole", 0.99, NormalizedRect::lbwh(0.5, 0.5, 0.1, 0.1)),
            Prediction::new("ball", 0.8, NormalizedRect::lbwh(0.3, 0.3, 0.05, 0.05)),
        ];

        let best = best_of(&preds, "ball").unwrap();
        assert_eq!(best.confidence, 0.8);
        assert!(best_of(&preds, "flag").is_none());
    }
}
