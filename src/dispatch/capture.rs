//! Snapshot persistence.
//!
//! Captures are written synchronously, so the file exists when the dispatcher
//! returns. File names carry the fire time at one-second granularity:
//! `human_YYYYMMDD_HHMMSS.jpg`. The cooldown keeps fires more than a second
//! apart in normal configurations; a sub-second cooldown can collide, in which
//! case a `-N` suffix is added instead of overwriting. When every suffix is
//! taken the capture fails rather than replacing an existing file.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;

use crate::config::CaptureSettings;
use crate::error::CaptureError;

pub const CAPTURE_PREFIX: &str = "human_";
pub const CAPTURE_EXTENSION: &str = "jpg";
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const MAX_SUFFIX: u32 = 1000;

/// A persisted snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptureArtifact {
    pub path: PathBuf,
    pub created_at: DateTime<Utc>,
    pub bytes: usize,
}

/// Writes annotated snapshots into the capture directory.
#[derive(Clone, Debug)]
pub struct CaptureStore {
    dir: PathBuf,
    jpeg_quality: u8,
    local_time: bool,
    max_suffix: u32,
}

impl CaptureStore {
    pub fn new(settings: &CaptureSettings) -> Self {
        Self {
            dir: settings.directory.clone(),
            jpeg_quality: settings.jpeg_quality,
            local_time: settings.local_time,
            max_suffix: MAX_SUFFIX,
        }
    }

    /// Cap on `-N` suffixes tried for one second before giving up.
    pub fn with_max_suffix(mut self, max_suffix: u32) -> Self {
        self.max_suffix = max_suffix;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name for a capture fired at `fired_at`.
    pub fn file_name(&self, fired_at: DateTime<Utc>) -> String {
        let stamp = if self.local_time {
            fired_at.with_timezone(&Local).format(TIMESTAMP_FORMAT).to_string()
        } else {
            fired_at.format(TIMESTAMP_FORMAT).to_string()
        };
        format!("{CAPTURE_PREFIX}{stamp}.{CAPTURE_EXTENSION}")
    }

    /// Encode `snapshot` as JPEG and write it under the capture directory.
    pub fn persist(
        &self,
        snapshot: &RgbImage,
        fired_at: DateTime<Utc>,
    ) -> Result<CaptureArtifact, CaptureError> {
        fs::create_dir_all(&self.dir).map_err(|source| CaptureError::CreateDir {
            path: self.dir.clone(),
            source,
        })?;

        let path = self.free_path(&self.file_name(fired_at))?;

        let mut encoded = Vec::new();
        JpegEncoder::new_with_quality(&mut encoded, self.jpeg_quality)
            .encode_image(snapshot)
            .map_err(|source| CaptureError::Encode {
                path: path.clone(),
                source,
            })?;

        write_atomic(&path, &encoded).map_err(|source| CaptureError::Write {
            path: path.clone(),
            source,
        })?;

        Ok(CaptureArtifact {
            path,
            created_at: Utc::now(),
            bytes: encoded.len(),
        })
    }

    fn free_path(&self, name: &str) -> Result<PathBuf, CaptureError> {
        let path = self.dir.join(name);
        if !path.exists() {
            return Ok(path);
        }
        let stem = name.trim_end_matches(&format!(".{CAPTURE_EXTENSION}"));
        (1..=self.max_suffix)
            .map(|n| self.dir.join(format!("{stem}-{n}.{CAPTURE_EXTENSION}")))
            .find(|candidate| !candidate.exists())
            .ok_or(CaptureError::NameExhausted {
                path,
                attempts: self.max_suffix,
            })
    }
}

fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let tmp_path = path.with_extension("jpg.tmp");
    let written = File::create(&tmp_path).and_then(|mut file| {
        file.write_all(data)?;
        file.sync_all()
    });
    let result = written.and_then(|()| fs::rename(&tmp_path, path));
    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use image::Rgb;

    fn store(dir: &Path) -> CaptureStore {
        CaptureStore::new(&CaptureSettings {
            directory: dir.to_path_buf(),
            ..CaptureSettings::default()
        })
    }

    #[test]
    fn file_name_uses_second_granularity_utc() {
        let store = store(Path::new("captures"));
        let fired_at = Utc.with_ymd_and_hms(2024, 3, 9, 17, 4, 5).unwrap()
            + chrono::Duration::milliseconds(999);
        assert_eq!(store.file_name(fired_at), "human_20240309_170405.jpg");
    }

    #[test]
    fn persist_creates_directory_and_writes_jpeg() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let store = store(&root.path().join("nested").join("captures"));
        let fired_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let artifact = store.persist(&RgbImage::from_pixel(16, 8, Rgb([200, 10, 10])), fired_at)?;

        assert!(artifact.path.ends_with("human_20240101_000000.jpg"));
        let written = fs::read(&artifact.path)?;
        assert_eq!(written.len(), artifact.bytes);
        // JPEG SOI marker.
        assert_eq!(&written[..2], &[0xFF, 0xD8]);
        assert!(!artifact.path.with_extension("jpg.tmp").exists());
        Ok(())
    }

    #[test]
    fn collisions_get_a_suffix() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let store = store(root.path());
        let fired_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let image = RgbImage::new(4, 4);

        let first = store.persist(&image, fired_at)?;
        let second = store.persist(&image, fired_at + chrono::Duration::milliseconds(500))?;

        assert!(first.path.ends_with("human_20240101_000000.jpg"));
        assert!(second.path.ends_with("human_20240101_000000-1.jpg"));
        Ok(())
    }

    #[test]
    fn unwritable_directory_is_reported() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let blocker = root.path().join("occupied");
        fs::write(&blocker, b"a file, not a directory")?;

        let err = store(&blocker)
            .persist(&RgbImage::new(2, 2), Utc::now())
            .expect_err("directory creation must fail");
        assert!(matches!(err, CaptureError::CreateDir { .. }));
        assert_eq!(err.path(), blocker.as_path());
        Ok(())
    }

    #[test]
    fn exhausted_suffixes_never_overwrite() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let store = store(root.path()).with_max_suffix(2);
        let fired_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let image = RgbImage::new(4, 4);

        let first = store.persist(&image, fired_at)?;
        let original = fs::read(&first.path)?;
        store.persist(&image, fired_at)?;
        store.persist(&image, fired_at)?;

        let err = store
            .persist(&RgbImage::from_pixel(4, 4, Rgb([255, 255, 255])), fired_at)
            .expect_err("all names taken");
        assert!(matches!(err, CaptureError::NameExhausted { attempts: 2, .. }));
        assert_eq!(fs::read(&first.path)?, original);
        assert_eq!(fs::read_dir(root.path())?.count(), 3);
        Ok(())
    }

    #[test]
    fn failed_write_leaves_no_temp_file() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let target = root.path().join("human_20240101_000000.jpg");
        // A non-empty directory at the target path makes the rename fail.
        fs::create_dir(&target)?;
        fs::write(target.join("keep"), b"x")?;

        assert!(write_atomic(&target, b"jpeg bytes").is_err());
        assert!(!target.with_extension("jpg.tmp").exists());
        Ok(())
    }
}
