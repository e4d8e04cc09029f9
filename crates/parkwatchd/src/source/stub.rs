//! Synthetic frame source for tests and demos (`stub://name?frames=N`).

use super::{FrameReadError, FrameReader, SourceKind};
use parkwatch_core::Frame;

/// Generates gradient frames that shift with the frame index.
///
/// Bounded when a frame count is given (finite, rewindable), otherwise
/// endless and treated as live.
pub struct StubReader {
    name: String,
    width: u32,
    height: u32,
    frames: Option<u64>,
    position: u64,
}

impl StubReader {
    pub fn new(name: impl Into<String>, width: u32, height: u32, frames: Option<u64>) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            frames,
            position: 0,
        }
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    fn render(&self) -> Result<Frame, FrameReadError> {
        let len = Frame::buffer_len(self.width, self.height)?;
        let mut pixels = Vec::with_capacity(len);
        let shift = self.position;
        for y in 0..self.height {
            for x in 0..self.width {
                let v = (u64::from(x) + u64::from(y) + shift) % 256;
                let v = u8::try_from(v).unwrap_or(0);
                pixels.extend_from_slice(&[v, v, v]);
            }
        }
        Ok(Frame::new(self.width, self.height, pixels)?)
    }
}

impl FrameReader for StubReader {
    fn read(&mut self) -> Result<Frame, FrameReadError> {
        if let Some(limit) = self.frames {
            if self.position >= limit {
                return Err(FrameReadError::EndOfStream);
            }
        }
        let frame = self.render()?;
        self.position += 1;
        Ok(frame)
    }

    fn rewind(&mut self) -> Result<(), FrameReadError> {
        match self.frames {
            Some(_) => {
                self.position = 0;
                Ok(())
            }
            None => Err(FrameReadError::NotSeekable(self.describe())),
        }
    }

    fn kind(&self) -> SourceKind {
        match self.frames {
            Some(_) => SourceKind::Finite,
            None => SourceKind::Live,
        }
    }

    fn describe(&self) -> String {
        match self.frames {
            Some(n) => format!("stub://{}?frames={n}", self.name),
            None => format!("stub://{}", self.name),
        }
    }
}
