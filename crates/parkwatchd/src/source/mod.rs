//! Frame sources and the end-of-stream restart policy.
//!
//! A [`FrameReader`] is a raw backend (image sequence, ffmpeg child
//! process, synthetic stub). [`FrameSource`] wraps one and applies the
//! restart policy on read failure:
//!
//! - **Finite** sources (files, image sequences, bounded stubs) are rewound
//!   to the beginning and read exactly once more. If that retry also fails,
//!   the stream ends normally.
//! - **Live** sources (capture devices, network streams, unbounded stubs)
//!   end immediately.
//!
//! The policy is applied once per failure; there is no backoff and no
//! repeated retrying. Read errors never escape as crashes: the caller only
//! ever sees `Some(frame)` or `None`.

mod ffmpeg;
mod images;
mod selector;
mod stub;

pub use ffmpeg::{FfmpegInput, FfmpegReader};
pub use images::ImageSequenceReader;
pub use selector::{FrameSelector, SourceOptions, DEFAULT_FRAME_HEIGHT, DEFAULT_FRAME_WIDTH};
pub use stub::StubReader;

use parkwatch_core::{Frame, FrameError};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Whether a source can be rewound and replayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Seekable and bounded: rewind once on failure
    Finite,
    /// Unbounded or unseekable: stop on failure
    Live,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finite => f.write_str("finite"),
            Self::Live => f.write_str("live"),
        }
    }
}

/// Errors reading a single frame.
#[derive(Error, Debug)]
pub enum FrameReadError {
    /// No more frames
    #[error("End of stream")]
    EndOfStream,

    #[error("Failed to start {program}: {reason}")]
    Spawn { program: String, reason: String },

    #[error("I/O error reading frame: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to decode {path}: {reason}")]
    Decode { path: String, reason: String },

    #[error("Invalid frame: {0}")]
    Frame(#[from] FrameError),

    #[error("No frames found in {0}")]
    Empty(String),

    /// Rewind requested on a source that cannot seek
    #[error("Source {0} cannot be rewound")]
    NotSeekable(String),
}

/// A raw frame backend.
///
/// Implementations are driven from the producer thread and may block.
pub trait FrameReader: Send {
    /// Reads the next frame.
    fn read(&mut self) -> Result<Frame, FrameReadError>;

    /// Repositions the reader at its first frame.
    fn rewind(&mut self) -> Result<(), FrameReadError>;

    fn kind(&self) -> SourceKind;

    /// Short human-readable description for logs.
    fn describe(&self) -> String;
}

/// A frame reader with the restart policy applied.
pub struct FrameSource {
    reader: Box<dyn FrameReader>,
    finished: bool,
    frames_read: u64,
    rewinds: u64,
}

impl FrameSource {
    pub fn new(reader: Box<dyn FrameReader>) -> Self {
        Self {
            reader,
            finished: false,
            frames_read: 0,
            rewinds: 0,
        }
    }

    /// Returns the next frame, or `None` once the stream has ended.
    ///
    /// After the first `None`, every later call also returns `None`.
    pub fn next_frame(&mut self) -> Option<Frame> {
        if self.finished {
            return None;
        }

        let frame = match self.reader.read() {
            Ok(frame) => Some(frame),
            Err(e) => self.recover(e),
        };

        match frame {
            Some(frame) => {
                self.frames_read += 1;
                Some(frame)
            }
            None => {
                self.finished = true;
                None
            }
        }
    }

    fn recover(&mut self, error: FrameReadError) -> Option<Frame> {
        let source = self.reader.describe();
        match self.reader.kind() {
            SourceKind::Live => {
                info!(source = %source, error = %error, "Live source stopped; ending stream");
                None
            }
            SourceKind::Finite => {
                debug!(source = %source, error = %error, "Finite source exhausted; rewinding");
                if let Err(e) = self.reader.rewind() {
                    warn!(source = %source, error = %e, "Rewind failed; ending stream");
                    return None;
                }
                self.rewinds += 1;
                match self.reader.read() {
                    Ok(frame) => Some(frame),
                    Err(e) => {
                        info!(source = %source, error = %e, "Read after rewind failed; ending stream");
                        None
                    }
                }
            }
        }
    }

    pub fn kind(&self) -> SourceKind {
        self.reader.kind()
    }

    pub fn describe(&self) -> String {
        self.reader.describe()
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    pub fn rewinds(&self) -> u64 {
        self.rewinds
    }
}

impl Iterator for FrameSource {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        self.next_frame()
    }
}
