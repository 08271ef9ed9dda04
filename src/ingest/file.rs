//! Local image-directory frame source.
//!
//! Replays the still images (`.jpg`, `.jpeg`, `.png`) found in a local
//! directory, in file-name order. Useful for replaying recorded footage that
//! was dumped frame by frame.
//!
//! An undecodable file is a transient failure (skipped); running out of files
//! exhausts the source.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use super::{FrameSource, SourceStats};
use crate::error::SourceError;
use crate::frame::Frame;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Directory-of-images frame source.
pub struct ImageDirSource {
    dir: PathBuf,
    location: String,
    pending: VecDeque<PathBuf>,
    frame_count: u64,
    failures: u64,
    open: bool,
}

impl ImageDirSource {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            location: dir.display().to_string(),
            pending: VecDeque::new(),
            frame_count: 0,
            failures: 0,
            open: false,
        }
    }

    /// Files still to be replayed.
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl FrameSource for ImageDirSource {
    fn location(&self) -> &str {
        &self.location
    }

    fn open(&mut self) -> Result<(), SourceError> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| {
            SourceError::DeviceUnavailable(format!("cannot read {}: {}", self.location, e))
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && is_image_path(path))
            .collect();
        files.sort();

        log::info!(
            "ImageDirSource: opened {} ({} images)",
            self.location,
            files.len()
        );
        self.pending = files.into();
        self.open = true;
        Ok(())
    }

    fn read(&mut self) -> Result<Frame, SourceError> {
        if !self.open {
            return Err(SourceError::DeviceUnavailable(format!(
                "{} is not open",
                self.location
            )));
        }
        let path = self.pending.pop_front().ok_or(SourceError::Exhausted)?;

        match image::open(&path) {
            Ok(decoded) => {
                self.frame_count += 1;
                Ok(Frame::new(decoded.to_rgb8(), self.frame_count))
            }
            Err(e) => {
                self.failures += 1;
                Err(SourceError::Transient(format!(
                    "cannot decode {}: {}",
                    path.display(),
                    e
                )))
            }
        }
    }

    fn close(&mut self) {
        if self.open {
            log::info!(
                "ImageDirSource: closed {} ({} images unread)",
                self.location,
                self.pending.len()
            );
        }
        self.pending.clear();
        self.open = false;
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            read_failures: self.failures,
        }
    }
}

fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn replays_images_in_name_order() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        RgbImage::from_pixel(4, 3, Rgb([1, 2, 3])).save(dir.path().join("b.png"))?;
        RgbImage::from_pixel(6, 5, Rgb([9, 9, 9])).save(dir.path().join("a.png"))?;
        std::fs::write(dir.path().join("notes.txt"), b"ignored")?;

        let mut source = ImageDirSource::new(dir.path());
        source.open()?;
        assert_eq!(source.remaining(), 2);

        let first = source.read()?;
        assert_eq!((first.width(), first.height()), (6, 5));
        let second = source.read()?;
        assert_eq!((second.width(), second.height()), (4, 3));
        assert!(matches!(source.read(), Err(SourceError::Exhausted)));
        assert_eq!(source.stats().frames_captured, 2);
        Ok(())
    }

    #[test]
    fn corrupt_image_is_transient() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("broken.jpg"), b"not a jpeg")?;
        RgbImage::new(2, 2).save(dir.path().join("ok.png"))?;

        let mut source = ImageDirSource::new(dir.path());
        source.open()?;
        assert!(matches!(source.read(), Err(SourceError::Transient(_))));
        assert!(source.read().is_ok());
        assert_eq!(source.stats().read_failures, 1);
        Ok(())
    }

    #[test]
    fn missing_directory_is_unavailable() {
        let mut source = ImageDirSource::new(Path::new("/nonexistent/sentinel/frames"));
        assert!(matches!(
            source.open(),
            Err(SourceError::DeviceUnavailable(_))
        ));
    }
}
