//! External model process speaking a line protocol.
//!
//! Per frame the daemon writes to the child's stdin:
//!
//! ```text
//! {"width":1280,"height":720,"confidence":0.25,"overlap":0.7}\n
//! <width * height * 3 bytes of packed RGB>
//! ```
//!
//! and reads back exactly one line on stdout: a JSON array of
//! `{"x1","y1","x2","y2","confidence","class"}` objects. The child lives for
//! the whole run so the model is loaded once.

use super::{parse_detections, DetectionError, DetectionThresholds, Detector};
use parkwatch_core::{Detection, Frame};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use tracing::{debug, info, warn};

/// Header line preceding each frame's pixel data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameHeader {
    pub width: u32,
    pub height: u32,
    pub confidence: f32,
    pub overlap: f32,
}

pub struct ProcessDetector {
    command: String,
    thresholds: DetectionThresholds,
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    line: String,
}

impl ProcessDetector {
    /// Spawns `program args...` with piped stdin/stdout.
    ///
    /// stderr is inherited so model warnings reach the daemon's log stream.
    pub fn spawn(
        program: &str,
        args: &[String],
        thresholds: DetectionThresholds,
    ) -> Result<Self, DetectionError> {
        let command = std::iter::once(program.to_string())
            .chain(args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ");

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| DetectionError::Spawn {
                command: command.clone(),
                reason: e.to_string(),
            })?;

        let (stdin, stdout) = match (child.stdin.take(), child.stdout.take()) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            _ => {
                terminate(&mut child);
                return Err(DetectionError::Spawn {
                    command,
                    reason: "stdio pipes unavailable".to_string(),
                });
            }
        };

        info!(command = %command, pid = child.id(), "Detector process started");
        Ok(Self {
            command,
            thresholds,
            child,
            stdin,
            stdout: BufReader::new(stdout),
            line: String::new(),
        })
    }

    fn header(&self, frame: &Frame) -> FrameHeader {
        FrameHeader {
            width: frame.width(),
            height: frame.height(),
            confidence: self.thresholds.confidence,
            overlap: self.thresholds.overlap,
        }
    }
}

impl Detector for ProcessDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, DetectionError> {
        let header = serde_json::to_string(&self.header(frame))
            .map_err(|e| DetectionError::Protocol(e.to_string()))?;
        self.stdin.write_all(header.as_bytes())?;
        self.stdin.write_all(b"\n")?;
        self.stdin.write_all(frame.pixels())?;
        self.stdin.flush()?;

        self.line.clear();
        let n = self.stdout.read_line(&mut self.line)?;
        if n == 0 {
            return Err(DetectionError::Exited);
        }

        let detections = parse_detections(&self.line)?;
        debug!(count = detections.len(), "Detector returned");
        Ok(detections)
    }

    fn name(&self) -> &str {
        &self.command
    }
}

impl Drop for ProcessDetector {
    fn drop(&mut self) {
        terminate(&mut self.child);
    }
}

/// Kills the child and reaps it so no zombie is left behind.
fn terminate(child: &mut Child) {
    if let Err(e) = child.kill() {
        debug!(error = %e, "Detector kill failed");
    }
    if let Err(e) = child.wait() {
        warn!(error = %e, "Failed to reap detector process");
    }
}
