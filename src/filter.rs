//! Gating, per-class non-max suppression and cross-class conflict resolution
//! for raw detector output.

use log::{debug, trace};
use serde_derive::{Deserialize, Serialize};

use crate::bbox::AREA_EPSILON;
use crate::detection::Prediction;

/// Shape, size and position bounds for one class.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ClassGate {
    pub label: String,
    /// Normalized area bounds, inclusive.
    pub min_area: f32,
    pub max_area: f32,
    /// Bounds on `max(w,h) / min(w,h)`, inclusive.
    pub min_aspect: f32,
    pub max_aspect: f32,
    /// Minimum vertical center (bottom-left origin), i.e. keeps boxes away from the bottom edge.
    #[serde(default)]
    pub min_center_y: Option<f32>,
}

impl ClassGate {
    pub fn admits(&self, p: &Prediction) -> bool {
        let area = p.bbox.area();
        let aspect = p.bbox.aspect();

        let ok_area = area >= self.min_area && area <= self.max_area;
        let ok_aspect = aspect >= self.min_aspect && aspect <= self.max_aspect;
        let ok_pos = self.min_center_y.map_or(true, |y| p.bbox.mid_y() >= y);

        ok_area && ok_aspect && ok_pos
    }
}

/// Arbitration between a small-object class and a large-object class that overlap.
///
/// When a pair overlaps by at least `iou` and `area(small) / area(large) <= area_ratio`
/// the small detection wins, otherwise the large one does.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ConflictRule {
    pub small: String,
    pub large: String,
    pub iou: f32,
    pub area_ratio: f32,
}

impl Default for ConflictRule {
    fn default() -> Self {
        Self {
            small: "ball".into(),
            large: "hole".into(),
            iou: 0.50,
            area_ratio: 0.70,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct FilterConfig {
    pub gates: Vec<ClassGate>,
    pub nms_iou: f32,
    pub conflict: Option<ConflictRule>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            gates: vec![
                ClassGate {
                    label: "ball".into(),
                    min_area: 0.000005,
                    max_area: 0.03,
                    min_aspect: 0.60,
                    max_aspect: 1.67,
                    min_center_y: None,
                },
                ClassGate {
                    label: "hole".into(),
                    min_area: 0.00015,
                    max_area: 0.25,
                    min_aspect: 0.60,
                    max_aspect: 1.67,
                    min_center_y: Some(0.05),
                },
            ],
            nms_iou: 0.50,
            conflict: Some(ConflictRule::default()),
        }
    }
}

/// Deterministic, stateless detection filter.
#[derive(Debug, Clone, Default)]
pub struct DetectionFilter {
    config: FilterConfig,
}

impl DetectionFilter {
    pub fn new(config: FilterConfig) -> Self {
        Self { config }
    }

    #[inline]
    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    pub fn filter(&self, predictions: &[Prediction]) -> Vec<Prediction> {
        let gated = predictions.iter().filter(|p| self.gate(p)).cloned();

        let mut groups: Vec<(String, Vec<Prediction>)> = Vec::new();
        for p in gated {
            match groups.iter_mut().find(|(label, _)| *label == p.label) {
                Some((_, dets)) => dets.push(p),
                None => groups.push((p.label.clone(), vec![p])),
            }
        }

        for (_, dets) in groups.iter_mut() {
            non_maximum_suppression(dets, self.config.nms_iou);
        }

        if let Some(rule) = &self.config.conflict {
            resolve_conflicts(&mut groups, rule);
        }

        groups.into_iter().flat_map(|(_, dets)| dets).collect()
    }

    fn gate(&self, p: &Prediction) -> bool {
        match self.config.gates.iter().find(|g| g.label == p.label) {
            Some(gate) => {
                let ok = gate.admits(p);
                if !ok {
                    trace!(
                        "gate dropped {} conf={:.2} area={:.6} aspect={:.2} mid_y={:.3}",
                        p.label,
                        p.confidence,
                        p.area(),
                        p.bbox.aspect(),
                        p.bbox.mid_y()
                    );
                }
                ok
            }
            None => true,
        }
    }
}

/// Greedy NMS: keeps the most confident box of every cluster with IoU `>= iou_threshold`.
///
/// Sorting is stable so equal confidences keep their input order.
pub fn non_maximum_suppression(dets: &mut Vec<Prediction>, iou_threshold: f32) {
    if dets.len() < 2 {
        return;
    }

    dets.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut retain = vec![true; dets.len()];
    for idx in 0..dets.len() - 1 {
        if !retain[idx] {
            continue;
        }

        for r in idx + 1..dets.len() {
            if retain[r] && dets[idx].iou(&dets[r]) >= iou_threshold {
                retain[r] = false;
            }
        }
    }

    let before = dets.len();
    let mut keep = retain.into_iter();
    dets.retain(|_| keep.next().unwrap_or(false));

    if dets.len() < before {
        debug!(
            "nms {}: kept {} of {}",
            dets[0].label,
            dets.len(),
            before
        );
    }
}

fn resolve_conflicts(groups: &mut [(String, Vec<Prediction>)], rule: &ConflictRule) {
    let small_idx = groups.iter().position(|(l, _)| *l == rule.small);
    let large_idx = groups.iter().position(|(l, _)| *l == rule.large);

    let (si, li) = match (small_idx, large_idx) {
        (Some(si), Some(li)) if si != li => (si, li),
        _ => return,
    };

    let (small, large) = (&groups[si].1, &groups[li].1);
    let mut keep_small = vec![true; small.len()];
    let mut keep_large = vec![true; large.len()];

    for (i, s) in small.iter().enumerate() {
        for (j, l) in large.iter().enumerate() {
            if !keep_small[i] {
                break;
            }

            if !keep_large[j] || s.iou(l) < rule.iou {
                continue;
            }

            let ratio = s.area() / l.area().max(AREA_EPSILON);
            if ratio <= rule.area_ratio {
                debug!("conflict: {} inside {} (ratio {:.2}), dropping {}", rule.small, rule.large, ratio, rule.large);
                keep_large[j] = false;
            } else {
                debug!("conflict: {} vs {} (ratio {:.2}), dropping {}", rule.small, rule.large, ratio, rule.small);
                keep_small[i] = false;
            }
        }
    }

    let mut keep = keep_small.into_iter();
    groups[si].1.retain(|_| keep.next().unwrap_or(false));

    let mut keep = keep_large.into_iter();
    groups[li].1.retain(|_| keep.next().unwrap_or(false));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bbox::NormalizedRect;

    fn ball(conf: f32, x: f32, y: f32, s: f32) -> Prediction {
        Prediction::new("ball", conf, NormalizedRect::lbwh(x, y, s, s))
    }

    fn hole(conf: f32, x: f32, y: f32, s: f32) -> Prediction {
        Prediction::new("hole", conf, NormalizedRect::lbwh(x, y, s, s))
    }

    #[test]
    fn nms_keeps_only_most_confident_of_cluster() {
        let filter = DetectionFilter::default();
        let preds = vec![
            ball(0.6, 0.50, 0.50, 0.1),
            ball(0.9, 0.51, 0.50, 0.1),
            ball(0.7, 0.50, 0.51, 0.1),
        ];

        let out = filter.filter(&preds);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].confidence, 0.9);
    }

    #[test]
    fn nms_keeps_separate_objects() {
        let filter = DetectionFilter::default();
        let preds = vec![ball(0.6, 0.1, 0.1, 0.05), ball(0.9, 0.6, 0.6, 0.05)];

        let out = filter.filter(&preds);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].confidence, 0.9);
    }

    #[test]
    fn ball_with_iou_point_eight_suppresses_weaker_duplicate() {
        // width 0.1, shifted so that IoU = 0.8: overlap w = 0.0888..
        let shift = 0.1 - 0.1 * (2.0 * 0.8 / 1.8);
        let preds = vec![ball(0.9, 0.4, 0.4, 0.1), ball(0.6, 0.4 + shift, 0.4, 0.1)];
        assert!((preds[0].iou(&preds[1]) - 0.8).abs() < 1e-3);

        let out = DetectionFilter::default().filter(&preds);
        assert_eq!(out, vec![preds[0].clone()]);
    }

    #[test]
    fn gate_rejects_bad_shape_and_position() {
        let filter = DetectionFilter::default();
        let preds = vec![
            // too elongated
            Prediction::new("ball", 0.9, NormalizedRect::lbwh(0.1, 0.1, 0.1, 0.02)),
            // too large for a ball
            ball(0.9, 0.1, 0.1, 0.5),
            // hole centered right at the bottom edge region
            hole(0.9, 0.4, 0.0, 0.06),
            // valid hole
            hole(0.8, 0.4, 0.4, 0.1),
        ];

        let out = filter.filter(&preds);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].label, "hole");
        assert_eq!(out[0].confidence, 0.8);
    }

    #[test]
    fn unknown_labels_pass_ungated() {
        let filter = DetectionFilter::default();
        let flag = Prediction::new("flag", 0.5, NormalizedRect::lbwh(0.0, 0.0, 0.9, 0.05));

        assert_eq!(filter.filter(&[flag.clone()]), vec![flag]);
    }

    #[test]
    fn small_ball_inside_hole_wins() {
        let filter = DetectionFilter::default();
        let h = hole(0.9, 0.40, 0.40, 0.10);
        let b = ball(0.7, 0.41, 0.41, 0.08);
        // ratio 0.64 <= 0.7, iou 0.64 >= 0.5
        let out = filter.filter(&[h, b.clone()]);

        assert_eq!(out, vec![b]);
    }

    #[test]
    fn large_ball_against_hole_loses() {
        let filter = DetectionFilter::default();
        let h = hole(0.9, 0.40, 0.40, 0.10);
        let b = ball(0.7, 0.405, 0.405, 0.09);
        // ratio 0.81 > 0.7
        let out = filter.filter(&[h.clone(), b]);

        assert_eq!(out, vec![h]);
    }

    #[test]
    fn conflict_rule_can_be_disabled() {
        let filter = DetectionFilter::new(FilterConfig {
            conflict: None,
            ..Default::default()
        });
        let out = filter.filter(&[hole(0.9, 0.40, 0.40, 0.10), ball(0.7, 0.41, 0.41, 0.08)]);

        assert_eq!(out.len(), 2);
    }

    #[test]
    fn min_center_y_rejects_boxes_near_the_bottom_edge() {
        let cfg = FilterConfig::default();
        let gate = cfg.gates.iter().find(|g| g.label == "hole").unwrap();

        assert!(!gate.admits(&hole(0.9, 0.4, 0.0, 0.06)));
        assert!(gate.admits(&hole(0.9, 0.4, 0.94, 0.06)));
    }
}
