//! Detection oracle backends.
//!
//! The detector is opaque to the rest of the pipeline: it takes a frame
//! and returns vehicle bounding boxes. Thresholds are fixed at startup and
//! handed to the backend once.
//!
//! Backends:
//! - [`ProcessDetector`] - a long-running external model process speaking a
//!   line-oriented protocol over stdin/stdout
//! - [`ReplayDetector`] - recorded oracle output replayed from a JSON-lines
//!   file, one line per frame

mod process;
mod replay;

pub use process::{FrameHeader, ProcessDetector};
pub use replay::ReplayDetector;

use parkwatch_core::{BoundingBox, ConfigError, ConfigResult, Detection, Frame};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default minimum detection confidence.
pub const DEFAULT_CONFIDENCE: f32 = 0.25;

/// Default IoU threshold for non-maximum suppression.
pub const DEFAULT_OVERLAP: f32 = 0.7;

/// Errors from the detection oracle. Any of these stops the producer.
#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("Failed to start detector {command}: {reason}")]
    Spawn { command: String, reason: String },

    #[error("Detector I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Detector exited unexpectedly")]
    Exited,

    #[error("Malformed detector output: {0}")]
    Protocol(String),

    #[error("Failed to load replay file {path}: {reason}")]
    Replay { path: String, reason: String },
}

/// Thresholds passed to the oracle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionThresholds {
    pub confidence: f32,
    pub overlap: f32,
}

impl Default for DetectionThresholds {
    fn default() -> Self {
        Self {
            confidence: DEFAULT_CONFIDENCE,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

impl DetectionThresholds {
    /// Both thresholds must lie in `0.0..=1.0`.
    pub fn validate(&self) -> ConfigResult<()> {
        for (field, value) in [("confidence", self.confidence), ("overlap", self.overlap)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: value.to_string(),
                    expected: "a value between 0.0 and 1.0".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Per-frame vehicle detector.
pub trait Detector: Send {
    /// Detects vehicles in `frame`.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, DetectionError>;

    /// Backend name for logs.
    fn name(&self) -> &str;
}

/// One detection as emitted by an oracle. Coordinates may be fractional.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    #[serde(default)]
    pub confidence: f32,
    #[serde(default)]
    pub class: u32,
}

impl From<RawDetection> for Detection {
    /// Truncates coordinates toward zero (saturating, NaN becomes 0).
    fn from(raw: RawDetection) -> Self {
        Detection::new(
            BoundingBox::new(raw.x1 as i32, raw.y1 as i32, raw.x2 as i32, raw.y2 as i32),
            raw.confidence,
            raw.class,
        )
    }
}

/// Parses one line of oracle output: a JSON array of detections.
pub fn parse_detections(line: &str) -> Result<Vec<Detection>, DetectionError> {
    let raw: Vec<RawDetection> =
        serde_json::from_str(line.trim()).map_err(|e| DetectionError::Protocol(e.to_string()))?;
    Ok(raw.into_iter().map(Detection::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds() {
        let t = DetectionThresholds::default();
        assert_eq!(t.confidence, 0.25);
        assert_eq!(t.overlap, 0.7);
        assert!(t.validate().is_ok());
    }

    #[test]
    fn test_out_of_range_threshold_rejected() {
        let t = DetectionThresholds {
            confidence: 1.5,
            overlap: 0.7,
        };
        assert!(matches!(
            t.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "confidence"
        ));
    }

    #[test]
    fn test_parse_truncates_toward_zero() {
        let dets = parse_detections(
            r#"[{"x1": 90.9, "y1": 60.2, "x2": 110.7, "y2": 80.0, "confidence": 0.8, "class": 2}]"#,
        )
        .unwrap();
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].bbox, BoundingBox::new(90, 60, 110, 80));
        assert_eq!(dets[0].class, 2);
    }

    #[test]
    fn test_parse_negative_truncation() {
        let dets = parse_detections(r#"[{"x1": -1.5, "y1": 0, "x2": 2, "y2": 2}]"#).unwrap();
        assert_eq!(dets[0].bbox.x1, -1);
    }

    #[test]
    fn test_parse_empty_and_malformed() {
        assert!(parse_detections("[]").unwrap().is_empty());
        assert!(matches!(
            parse_detections("{not json"),
            Err(DetectionError::Protocol(_))
        ));
    }
}
