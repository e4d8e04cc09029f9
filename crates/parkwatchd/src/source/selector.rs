//! Source selection from a single user-supplied string.
//!
//! | Input                     | Source                         | Kind   |
//! |---------------------------|--------------------------------|--------|
//! | `0`, `1`, ...             | capture device `/dev/video{n}` | live   |
//! | `stub://name?frames=N`    | synthetic frames               | finite |
//! | `stub://name`             | synthetic frames, endless      | live   |
//! | `rtsp://...` etc.         | network stream via ffmpeg      | live   |
//! | directory / `.png` `.jpg` | image sequence                 | finite |
//! | any other file            | video file via ffmpeg          | finite |

use super::ffmpeg::{FfmpegInput, FfmpegReader};
use super::images::{is_image_path, ImageSequenceReader};
use super::stub::StubReader;
use super::{FrameReadError, FrameReader, SourceKind};
use parkwatch_core::{ConfigError, ConfigResult};
use std::fmt;
use std::path::{Path, PathBuf};

/// Default decode width for ffmpeg-backed sources.
pub const DEFAULT_FRAME_WIDTH: u32 = 1280;

/// Default decode height for ffmpeg-backed sources.
pub const DEFAULT_FRAME_HEIGHT: u32 = 720;

const STUB_SCHEME: &str = "stub://";
const DEFAULT_STUB_WIDTH: u32 = 320;
const DEFAULT_STUB_HEIGHT: u32 = 240;

/// Settings that apply when opening a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceOptions {
    /// Frame width ffmpeg scales to
    pub width: u32,
    /// Frame height ffmpeg scales to
    pub height: u32,
    /// ffmpeg executable
    pub ffmpeg: String,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            width: DEFAULT_FRAME_WIDTH,
            height: DEFAULT_FRAME_HEIGHT,
            ffmpeg: "ffmpeg".to_string(),
        }
    }
}

/// A parsed frame source description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameSelector {
    Device(u32),
    Stub {
        name: String,
        frames: Option<u64>,
        width: u32,
        height: u32,
    },
    Stream(String),
    ImageSequence(PathBuf),
    Video(PathBuf),
}

impl FrameSelector {
    /// Classifies a source string.
    ///
    /// Filesystem paths must exist; the check happens here so a typo is a
    /// startup configuration error rather than an empty stream.
    pub fn parse(input: &str) -> ConfigResult<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(invalid(input, "a device index, URL or path"));
        }

        if input.bytes().all(|b| b.is_ascii_digit()) {
            let index = input
                .parse()
                .map_err(|_| invalid(input, "a device index that fits in u32"))?;
            return Ok(Self::Device(index));
        }

        if let Some(rest) = input.strip_prefix(STUB_SCHEME) {
            return parse_stub(input, rest);
        }

        if input.contains("://") {
            return Ok(Self::Stream(input.to_string()));
        }

        let path = Path::new(input);
        if !path.exists() {
            return Err(ConfigError::Read {
                path: input.to_string(),
                reason: "no such file or directory".to_string(),
            });
        }
        if path.is_dir() || is_image_path(path) {
            Ok(Self::ImageSequence(path.to_path_buf()))
        } else {
            Ok(Self::Video(path.to_path_buf()))
        }
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            Self::Device(_) | Self::Stream(_) => SourceKind::Live,
            Self::Stub { frames, .. } => match frames {
                Some(_) => SourceKind::Finite,
                None => SourceKind::Live,
            },
            Self::ImageSequence(_) | Self::Video(_) => SourceKind::Finite,
        }
    }

    /// Opens the backend for this selector.
    pub fn open(&self, options: &SourceOptions) -> Result<Box<dyn FrameReader>, FrameReadError> {
        let reader: Box<dyn FrameReader> = match self {
            Self::Device(index) => Box::new(FfmpegReader::spawn(
                options.ffmpeg.clone(),
                FfmpegInput::Device(PathBuf::from(format!("/dev/video{index}"))),
                options.width,
                options.height,
            )?),
            Self::Stub {
                name,
                frames,
                width,
                height,
            } => Box::new(StubReader::new(name.clone(), *width, *height, *frames)),
            Self::Stream(url) => Box::new(FfmpegReader::spawn(
                options.ffmpeg.clone(),
                FfmpegInput::Stream(url.clone()),
                options.width,
                options.height,
            )?),
            Self::ImageSequence(path) => Box::new(ImageSequenceReader::open(path)?),
            Self::Video(path) => Box::new(FfmpegReader::spawn(
                options.ffmpeg.clone(),
                FfmpegInput::File(path.clone()),
                options.width,
                options.height,
            )?),
        };
        Ok(reader)
    }
}

impl fmt::Display for FrameSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Device(index) => write!(f, "device {index}"),
            Self::Stub { name, frames, .. } => match frames {
                Some(n) => write!(f, "stub {name} ({n} frames)"),
                None => write!(f, "stub {name}"),
            },
            Self::Stream(url) => write!(f, "stream {url}"),
            Self::ImageSequence(path) => write!(f, "images {}", path.display()),
            Self::Video(path) => write!(f, "video {}", path.display()),
        }
    }
}

fn invalid(value: &str, expected: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: "source".to_string(),
        value: value.to_string(),
        expected: expected.to_string(),
    }
}

fn parse_stub(input: &str, rest: &str) -> ConfigResult<FrameSelector> {
    let (name, query) = rest.split_once('?').unwrap_or((rest, ""));
    if name.is_empty() {
        return Err(invalid(input, "stub://<name>"));
    }

    let mut frames = None;
    let mut width = DEFAULT_STUB_WIDTH;
    let mut height = DEFAULT_STUB_HEIGHT;

    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| invalid(input, "key=value query parameters"))?;
        match key {
            "frames" => {
                frames = Some(
                    value
                        .parse()
                        .map_err(|_| invalid(input, "frames=<count>"))?,
                )
            }
            "width" => width = value.parse().map_err(|_| invalid(input, "width=<pixels>"))?,
            "height" => height = value.parse().map_err(|_| invalid(input, "height=<pixels>"))?,
            _ => return Err(invalid(input, "frames, width or height parameters")),
        }
    }

    Ok(FrameSelector::Stub {
        name: name.to_string(),
        frames,
        width,
        height,
    })
}
