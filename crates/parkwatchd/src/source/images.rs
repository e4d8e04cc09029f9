//! Still images as a finite frame source.
//!
//! Accepts either a single image file (a one-frame sequence) or a
//! directory, whose image files are played in file-name order.

use super::{FrameReadError, FrameReader, SourceKind};
use parkwatch_core::Frame;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File extensions recognised as still images.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// True if the path has a still-image extension.
pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

pub struct ImageSequenceReader {
    root: PathBuf,
    paths: Vec<PathBuf>,
    position: usize,
}

impl ImageSequenceReader {
    /// Opens a single image or a directory of images.
    pub fn open(path: &Path) -> Result<Self, FrameReadError> {
        let paths = if path.is_dir() {
            let mut paths: Vec<PathBuf> = std::fs::read_dir(path)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && is_image_path(p))
                .collect();
            paths.sort();
            paths
        } else {
            vec![path.to_path_buf()]
        };

        if paths.is_empty() {
            return Err(FrameReadError::Empty(path.display().to_string()));
        }

        debug!(path = %path.display(), images = paths.len(), "Opened image sequence");
        Ok(Self {
            root: path.to_path_buf(),
            paths,
            position: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Decodes an image file into an RGB frame.
pub fn load_frame(path: &Path) -> Result<Frame, FrameReadError> {
    let decoded = image::open(path).map_err(|e| FrameReadError::Decode {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let rgb = decoded.to_rgb8();
    let (width, height) = rgb.dimensions();
    Ok(Frame::new(width, height, rgb.into_raw())?)
}

impl FrameReader for ImageSequenceReader {
    fn read(&mut self) -> Result<Frame, FrameReadError> {
        let path = self
            .paths
            .get(self.position)
            .ok_or(FrameReadError::EndOfStream)?;
        let frame = load_frame(path)?;
        self.position += 1;
        Ok(frame)
    }

    fn rewind(&mut self) -> Result<(), FrameReadError> {
        self.position = 0;
        Ok(())
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Finite
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_png(path: &Path, width: u32, height: u32, rgb: [u8; 3]) {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb(rgb));
        img.save(path).unwrap();
    }

    #[test]
    fn test_is_image_path() {
        assert!(is_image_path(Path::new("a.png")));
        assert!(is_image_path(Path::new("b.JPG")));
        assert!(!is_image_path(Path::new("c.mp4")));
        assert!(!is_image_path(Path::new("noext")));
    }

    #[test]
    fn test_directory_sequence_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        write_png(&dir.path().join("002.png"), 2, 2, [0, 0, 255]);
        write_png(&dir.path().join("001.png"), 2, 2, [255, 0, 0]);
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut reader = ImageSequenceReader::open(dir.path()).unwrap();
        assert_eq!(reader.len(), 2);
        assert_eq!(reader.read().unwrap().pixel(0, 0), Some([255, 0, 0]));
        assert_eq!(reader.read().unwrap().pixel(0, 0), Some([0, 0, 255]));
        assert!(matches!(reader.read(), Err(FrameReadError::EndOfStream)));

        reader.rewind().unwrap();
        assert_eq!(reader.read().unwrap().pixel(1, 1), Some([255, 0, 0]));
    }

    #[test]
    fn test_single_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lot.png");
        write_png(&path, 3, 2, [10, 20, 30]);
        let mut reader = ImageSequenceReader::open(&path).unwrap();
        let frame = reader.read().unwrap();
        assert_eq!((frame.width(), frame.height()), (3, 2));
        assert_eq!(reader.kind(), SourceKind::Finite);
    }

    #[test]
    fn test_empty_directory_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ImageSequenceReader::open(dir.path()),
            Err(FrameReadError::Empty(_))
        ));
    }

    #[test]
    fn test_corrupt_image_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.png");
        std::fs::write(&path, b"not a png").unwrap();
        let mut reader = ImageSequenceReader::open(&path).unwrap();
        assert!(matches!(reader.read(), Err(FrameReadError::Decode { .. })));
    }
}
