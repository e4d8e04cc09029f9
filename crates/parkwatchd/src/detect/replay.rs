//! Replays recorded oracle output, one JSON line per frame.
//!
//! Useful for demos and for reproducing a run without the model. When the
//! recording runs out it wraps around to the first line. Blank lines are
//! frames with no detections.

use super::{parse_detections, DetectionError, Detector};
use parkwatch_core::{Detection, Frame};
use std::path::Path;

#[derive(Debug)]
pub struct ReplayDetector {
    name: String,
    frames: Vec<Vec<Detection>>,
    position: usize,
}

impl ReplayDetector {
    pub fn load(path: &Path) -> Result<Self, DetectionError> {
        let text = std::fs::read_to_string(path).map_err(|e| DetectionError::Replay {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let mut replay = Self::from_lines(&text).map_err(|e| DetectionError::Replay {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        replay.name = format!("replay:{}", path.display());
        Ok(replay)
    }

    pub fn from_lines(text: &str) -> Result<Self, DetectionError> {
        let frames = text
            .lines()
            .map(|line| {
                if line.trim().is_empty() {
                    Ok(Vec::new())
                } else {
                    parse_detections(line)
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(frames))
    }

    pub fn new(frames: Vec<Vec<Detection>>) -> Self {
        Self {
            name: "replay".to_string(),
            frames,
            position: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl Detector for ReplayDetector {
    fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>, DetectionError> {
        if self.frames.is_empty() {
            return Ok(Vec::new());
        }
        let detections = self.frames.get(self.position).cloned().unwrap_or_default();
        self.position = (self.position + 1) % self.frames.len();
        Ok(detections)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
