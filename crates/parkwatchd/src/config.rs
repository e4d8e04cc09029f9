//! Daemon configuration.
//!
//! Values are resolved in three layers, later layers winning:
//! 1. built-in defaults
//! 2. an optional TOML file (`--config` / `PARKWATCH_CONFIG`)
//! 3. command-line overrides (clap also maps `PARKWATCH_ADDR` onto
//!    `--listen`)
//!
//! ```toml
//! listen = "127.0.0.1:5000"
//! zones = "zones.toml"
//! source = "parking.mp4"
//! cycle_delay_ms = 0
//!
//! [detector]
//! kind = "process"
//! command = ["python3", "oracle.py"]
//!
//! [thresholds]
//! confidence = 0.25
//! overlap = 0.7
//!
//! [frame]
//! width = 1280
//! height = 720
//! ffmpeg = "ffmpeg"
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use parkwatch_core::{ConfigError, ConfigResult, ZoneRegistry};

use crate::detect::{
    DetectionError, DetectionThresholds, Detector, ProcessDetector, ReplayDetector,
};
use crate::server::DEFAULT_LISTEN_ADDR;
use crate::source::{FrameSelector, SourceOptions, DEFAULT_FRAME_HEIGHT, DEFAULT_FRAME_WIDTH};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "PARKWATCH_CONFIG";

/// Environment variable overriding the listen address.
pub const ADDR_ENV: &str = "PARKWATCH_ADDR";

// ============================================================================
// File Representation
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DaemonConfigFile {
    pub listen: Option<String>,
    pub zones: Option<PathBuf>,
    pub source: Option<String>,
    pub cycle_delay_ms: Option<u64>,
    pub detector: Option<DetectorSpec>,
    pub thresholds: Option<ThresholdsFile>,
    pub frame: Option<FrameFile>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThresholdsFile {
    pub confidence: Option<f32>,
    pub overlap: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FrameFile {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub ffmpeg: Option<String>,
}

/// Which detection backend to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DetectorSpec {
    /// Long-running model process: program followed by its arguments
    Process { command: Vec<String> },
    /// Recorded detections, one JSON line per frame
    Replay { path: PathBuf },
}

impl DetectorSpec {
    /// Starts the backend.
    pub fn open(&self, thresholds: DetectionThresholds) -> Result<Box<dyn Detector>, DetectionError> {
        match self {
            Self::Process { command } => {
                let (program, args) = command.split_first().ok_or(DetectionError::Spawn {
                    command: String::new(),
                    reason: "empty command".to_string(),
                })?;
                Ok(Box::new(ProcessDetector::spawn(program, args, thresholds)?))
            }
            Self::Replay { path } => Ok(Box::new(ReplayDetector::load(path)?)),
        }
    }
}

// ============================================================================
// Overrides
// ============================================================================

/// Values supplied on the command line. `None` leaves the lower layer alone.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub listen: Option<String>,
    pub zones: Option<PathBuf>,
    pub source: Option<String>,
    pub detector: Option<DetectorSpec>,
    pub confidence: Option<f32>,
    pub overlap: Option<f32>,
    pub cycle_delay_ms: Option<u64>,
    pub frame_width: Option<u32>,
    pub frame_height: Option<u32>,
    pub ffmpeg: Option<String>,
}

// ============================================================================
// Resolved Configuration
// ============================================================================

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub listen: SocketAddr,
    pub zones_path: PathBuf,
    pub source: FrameSelector,
    pub detector: DetectorSpec,
    pub thresholds: DetectionThresholds,
    pub cycle_delay: Duration,
    pub source_options: SourceOptions,
}

impl DaemonConfig {
    /// Reads the optional file, applies overrides and validates.
    pub fn load(path: Option<&Path>, overrides: ConfigOverrides) -> ConfigResult<Self> {
        let file = match path {
            Some(path) => read_config_file(path)?,
            None => DaemonConfigFile::default(),
        };
        Self::resolve(file, overrides)
    }

    pub fn resolve(file: DaemonConfigFile, overrides: ConfigOverrides) -> ConfigResult<Self> {
        let listen_raw = overrides
            .listen
            .or(file.listen)
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
        let listen = listen_raw
            .parse()
            .map_err(|_| invalid("listen", &listen_raw, "an address like 127.0.0.1:5000"))?;

        let zones_path = overrides
            .zones
            .or(file.zones)
            .ok_or_else(|| missing("zones", "a zone file path"))?;

        let source_raw = overrides
            .source
            .or(file.source)
            .ok_or_else(|| missing("source", "a device index, URL or path"))?;
        let source = FrameSelector::parse(&source_raw)?;

        let detector = overrides
            .detector
            .or(file.detector)
            .ok_or_else(|| missing("detector", "a process command or replay file"))?;

        let thresholds_file = file.thresholds.unwrap_or_default();
        let defaults = DetectionThresholds::default();
        let thresholds = DetectionThresholds {
            confidence: overrides
                .confidence
                .or(thresholds_file.confidence)
                .unwrap_or(defaults.confidence),
            overlap: overrides
                .overlap
                .or(thresholds_file.overlap)
                .unwrap_or(defaults.overlap),
        };

        let frame = file.frame.unwrap_or_default();
        let source_options = SourceOptions {
            width: overrides
                .frame_width
                .or(frame.width)
                .unwrap_or(DEFAULT_FRAME_WIDTH),
            height: overrides
                .frame_height
                .or(frame.height)
                .unwrap_or(DEFAULT_FRAME_HEIGHT),
            ffmpeg: overrides
                .ffmpeg
                .or(frame.ffmpeg)
                .unwrap_or_else(|| SourceOptions::default().ffmpeg),
        };

        let cycle_delay = Duration::from_millis(
            overrides.cycle_delay_ms.or(file.cycle_delay_ms).unwrap_or(0),
        );

        let config = Self {
            listen,
            zones_path,
            source,
            detector,
            thresholds,
            cycle_delay,
            source_options,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.thresholds.validate()?;

        if self.source_options.width == 0 || self.source_options.height == 0 {
            return Err(invalid(
                "frame size",
                &format!("{}x{}", self.source_options.width, self.source_options.height),
                "non-zero width and height",
            ));
        }

        if let DetectorSpec::Process { command } = &self.detector {
            if command.is_empty() {
                return Err(invalid("detector.command", "[]", "a program and its arguments"));
            }
        }

        Ok(())
    }

    /// Loads and validates the zone file.
    pub fn load_zones(&self) -> ConfigResult<ZoneRegistry> {
        ZoneRegistry::load(&self.zones_path)
    }
}

fn read_config_file(path: &Path) -> ConfigResult<DaemonConfigFile> {
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let file = toml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))?;
    debug!(path = %path.display(), "Loaded daemon config file");
    Ok(file)
}

fn invalid(field: &str, value: &str, expected: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        expected: expected.to_string(),
    }
}

fn missing(field: &str, expected: &str) -> ConfigError {
    invalid(field, "<missing>", expected)
}
