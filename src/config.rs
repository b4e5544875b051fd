use serde_derive::{Deserialize, Serialize};
use std::path::Path;

use crate::display::DisplayConfig;
use crate::error::Error;
use crate::filter::FilterConfig;
use crate::pipeline::GuidanceConfig;
use crate::sizer::SizeCheckConfig;
use crate::slope::SlopeConfig;
use crate::tracker::StabilizerConfig;

/// All tunables of the per-frame pipeline. Missing sections and fields take
/// their defaults, so a partial JSON document is a valid override.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct PipelineConfig {
    pub filter: FilterConfig,
    pub size_check: SizeCheckConfig,
    pub stabilizer: StabilizerConfig,
    pub slope: SlopeConfig,
    pub guidance: GuidanceConfig,
    pub display: DisplayConfig,
}

impl PipelineConfig {
    pub fn from_json_str(s: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    pub fn to_json_string(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_override_keeps_defaults() {
        let cfg = PipelineConfig::from_json_str(
            r#"{ "stabilizer": { "required_hits": 2 }, "filter": { "nms_iou": 0.4 } }"#,
        )
        .unwrap();

        assert_eq!(cfg.stabilizer.required_hits, 2);
        assert_eq!(cfg.stabilizer.max_misses, 3);
        assert_eq!(cfg.filter.nms_iou, 0.4);
        assert_eq!(cfg.filter.gates.len(), 2);
        assert_eq!(cfg.display.hold_seconds, 0.7);
    }

    #[test]
    fn roundtrips_through_json() {
        let cfg = PipelineConfig::default();
        let json = cfg.to_json_string().unwrap();

        let back = PipelineConfig::from_json_str(&json).unwrap();

        assert_eq!(back.stabilizer, cfg.stabilizer);
        assert_eq!(back.guidance, cfg.guidance);
        assert_eq!(back.filter.conflict, cfg.filter.conflict);
        assert_eq!(back.size_check.objects.len(), 2);
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        assert!(matches!(
            PipelineConfig::from_json_str("{ \"filter\": 3 }"),
            Err(Error::ConfigError(_))
        ));
        assert!(matches!(
            PipelineConfig::from_json_file("/nonexistent/golftrack.json"),
            Err(Error::IoError(_))
        ));
    }
}
