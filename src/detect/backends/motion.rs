use image::RgbImage;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::Region;
use crate::error::DetectorError;
use crate::frame::Frame;

const DEFAULT_PIXEL_THRESHOLD: u8 = 32;
const DEFAULT_MIN_CHANGED_FRACTION: f32 = 0.002;

/// CPU backend: frame differencing against the previous frame.
///
/// Pixels whose luma moved by more than `pixel_threshold` count as changed.
/// When enough of the frame changed, a single region bounding all changed
/// pixels is reported. Its confidence is the changed share of that box.
/// The first frame (and any frame whose size differs from the previous one)
/// only establishes the baseline.
pub struct MotionBackend {
    previous: Option<Vec<u8>>,
    dims: (u32, u32),
    pixel_threshold: u8,
    min_changed_fraction: f32,
}

impl MotionBackend {
    pub fn new() -> Self {
        Self {
            previous: None,
            dims: (0, 0),
            pixel_threshold: DEFAULT_PIXEL_THRESHOLD,
            min_changed_fraction: DEFAULT_MIN_CHANGED_FRACTION,
        }
    }

    pub fn with_pixel_threshold(mut self, threshold: u8) -> Self {
        self.pixel_threshold = threshold;
        self
    }

    pub fn with_min_changed_fraction(mut self, fraction: f32) -> Self {
        self.min_changed_fraction = fraction.clamp(0.0, 1.0);
        self
    }

    fn changed_region(&self, previous: &[u8], current: &[u8], width: u32) -> Option<Region> {
        let mut count = 0usize;
        let (mut min_x, mut min_y) = (u32::MAX, u32::MAX);
        let (mut max_x, mut max_y) = (0u32, 0u32);

        for (idx, (&before, &after)) in previous.iter().zip(current).enumerate() {
            if before.abs_diff(after) <= self.pixel_threshold {
                continue;
            }
            let x = (idx as u32) % width;
            let y = (idx as u32) / width;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
            count += 1;
        }

        let min_count = ((current.len() as f32) * self.min_changed_fraction).ceil() as usize;
        if count == 0 || count < min_count.max(1) {
            return None;
        }

        let region_w = max_x - min_x + 1;
        let region_h = max_y - min_y + 1;
        let area = (region_w as usize) * (region_h as usize);
        Some(Region {
            x: min_x as i32,
            y: min_y as i32,
            width: region_w,
            height: region_h,
            confidence: (count as f32 / area as f32).min(1.0),
        })
    }
}

impl Default for MotionBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorBackend for MotionBackend {
    fn name(&self) -> &'static str {
        "motion"
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Region>, DetectorError> {
        let (width, height) = (frame.width(), frame.height());
        if width == 0 || height == 0 {
            return Err(DetectorError::new(self.name(), "empty frame"));
        }

        let current = luma(frame.image());
        let region = match self.previous.as_deref() {
            Some(previous) if self.dims == (width, height) => {
                self.changed_region(previous, &current, width)
            }
            _ => None,
        };

        self.previous = Some(current);
        self.dims = (width, height);
        Ok(region.into_iter().collect())
    }
}

/// BT.601 luma, one byte per pixel.
fn luma(image: &RgbImage) -> Vec<u8> {
    image
        .pixels()
        .map(|p| {
            let [r, g, b] = p.0;
            ((u32::from(r) * 299 + u32::from(g) * 587 + u32::from(b) * 114) / 1000) as u8
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn frame_with_block(block: Option<(u32, u32, u32, u32)>) -> Frame {
        let mut image = RgbImage::from_pixel(64, 48, Rgb([20, 20, 20]));
        if let Some((x0, y0, w, h)) = block {
            for y in y0..y0 + h {
                for x in x0..x0 + w {
                    image.put_pixel(x, y, Rgb([230, 230, 230]));
                }
            }
        }
        Frame::new(image, 1)
    }

    #[test]
    fn first_frame_only_sets_baseline() {
        let mut backend = MotionBackend::new();
        let regions = backend.detect(&frame_with_block(Some((4, 4, 10, 20)))).unwrap();
        assert!(regions.is_empty());
    }

    #[test]
    fn reports_bounding_box_of_change() {
        let mut backend = MotionBackend::new();
        backend.detect(&frame_with_block(None)).unwrap();

        let regions = backend.detect(&frame_with_block(Some((10, 5, 8, 16)))).unwrap();
        assert_eq!(regions.len(), 1);
        let r = regions[0];
        assert_eq!((r.x, r.y, r.width, r.height), (10, 5, 8, 16));
        assert!((r.confidence - 1.0).abs() < f32::EPSILON);

        // Static scene afterwards: nothing.
        let regions = backend.detect(&frame_with_block(Some((10, 5, 8, 16)))).unwrap();
        assert!(regions.is_empty());
    }

    #[test]
    fn small_changes_are_ignored() {
        let mut backend = MotionBackend::new().with_min_changed_fraction(0.05);
        backend.detect(&frame_with_block(None)).unwrap();
        // 4 pixels out of 3072 is well under 5%.
        let regions = backend.detect(&frame_with_block(Some((0, 0, 2, 2)))).unwrap();
        assert!(regions.is_empty());
    }

    #[test]
    fn size_change_resets_baseline() {
        let mut backend = MotionBackend::new();
        backend.detect(&frame_with_block(None)).unwrap();
        let other = Frame::new(RgbImage::from_pixel(32, 32, Rgb([255, 255, 255])), 2);
        assert!(backend.detect(&other).unwrap().is_empty());
    }

    #[test]
    fn empty_frame_is_a_detector_failure() {
        let mut backend = MotionBackend::new();
        let empty = Frame::new(RgbImage::new(0, 0), 1);
        assert!(backend.detect(&empty).is_err());
    }
}
