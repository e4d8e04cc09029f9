//! Video decoding through an `ffmpeg` child process.
//!
//! ffmpeg decodes the input, scales every frame to a fixed size and writes
//! packed RGB24 frames back-to-back on stdout. Reading a frame is a single
//! `read_exact` of `width * height * 3` bytes.
//!
//! Rewinding a file restarts the child from the first frame. Devices and
//! network streams cannot be rewound.

use super::{FrameReadError, FrameReader, SourceKind};
use parkwatch_core::Frame;
use std::io::{ErrorKind, Read};
use std::path::PathBuf;
use std::process::{Child, ChildStdout, Command, Stdio};
use tracing::{debug, warn};

/// What ffmpeg should open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FfmpegInput {
    /// A local video file
    File(PathBuf),
    /// A V4L2 capture device such as `/dev/video0`
    Device(PathBuf),
    /// Any URL ffmpeg understands (rtsp://, http://, ...)
    Stream(String),
}

impl FfmpegInput {
    fn kind(&self) -> SourceKind {
        match self {
            Self::File(_) => SourceKind::Finite,
            Self::Device(_) | Self::Stream(_) => SourceKind::Live,
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::File(path) | Self::Device(path) => path.display().to_string(),
            Self::Stream(url) => url.clone(),
        }
    }

    /// Full ffmpeg argument list for decoding this input at `width`x`height`.
    pub fn args(&self, width: u32, height: u32) -> Vec<String> {
        let mut args: Vec<String> = ["-hide_banner", "-loglevel", "error"]
            .into_iter()
            .map(String::from)
            .collect();
        match self {
            Self::File(path) => {
                args.push("-i".to_string());
                args.push(path.display().to_string());
            }
            Self::Device(path) => {
                args.extend(["-f", "v4l2", "-i"].into_iter().map(String::from));
                args.push(path.display().to_string());
            }
            Self::Stream(url) => {
                args.push("-i".to_string());
                args.push(url.clone());
            }
        }
        args.extend(
            ["-an", "-f", "rawvideo", "-pix_fmt", "rgb24", "-vf"]
                .into_iter()
                .map(String::from),
        );
        args.push(format!("scale={width}:{height}"));
        args.push("-".to_string());
        args
    }
}

pub struct FfmpegReader {
    program: String,
    input: FfmpegInput,
    width: u32,
    height: u32,
    child: Option<Child>,
    stdout: Option<ChildStdout>,
}

impl FfmpegReader {
    /// Starts decoding `input` with the given ffmpeg executable.
    pub fn spawn(
        program: impl Into<String>,
        input: FfmpegInput,
        width: u32,
        height: u32,
    ) -> Result<Self, FrameReadError> {
        let mut reader = Self {
            program: program.into(),
            input,
            width,
            height,
            child: None,
            stdout: None,
        };
        reader.start()?;
        Ok(reader)
    }

    fn start(&mut self) -> Result<(), FrameReadError> {
        self.stop();
        let mut child = Command::new(&self.program)
            .args(self.input.args(self.width, self.height))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| FrameReadError::Spawn {
                program: self.program.clone(),
                reason: e.to_string(),
            })?;
        self.stdout = child.stdout.take();
        debug!(
            program = %self.program,
            input = %self.input.describe(),
            pid = child.id(),
            "Started ffmpeg decoder"
        );
        self.child = Some(child);
        Ok(())
    }

    fn stop(&mut self) {
        self.stdout = None;
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill() {
                // Already exited on its own
                debug!(error = %e, "ffmpeg kill failed");
            }
            if let Err(e) = child.wait() {
                warn!(error = %e, "Failed to reap ffmpeg process");
            }
        }
    }
}

impl FrameReader for FfmpegReader {
    fn read(&mut self) -> Result<Frame, FrameReadError> {
        let len = Frame::buffer_len(self.width, self.height)?;
        let stdout = self.stdout.as_mut().ok_or(FrameReadError::EndOfStream)?;
        let mut pixels = vec![0u8; len];
        match stdout.read_exact(&mut pixels) {
            Ok(()) => Ok(Frame::new(self.width, self.height, pixels)?),
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => Err(FrameReadError::EndOfStream),
            Err(e) => Err(FrameReadError::Io(e)),
        }
    }

    fn rewind(&mut self) -> Result<(), FrameReadError> {
        match self.input.kind() {
            SourceKind::Finite => self.start(),
            SourceKind::Live => Err(FrameReadError::NotSeekable(self.describe())),
        }
    }

    fn kind(&self) -> SourceKind {
        self.input.kind()
    }

    fn describe(&self) -> String {
        self.input.describe()
    }
}

impl Drop for FfmpegReader {
    fn drop(&mut self) {
        self.stop();
    }
}
