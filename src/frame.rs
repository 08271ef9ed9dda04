//! Frames and frame annotation.
//!
//! - `Frame`: owned RGB image handed from an ingest source to the processing loop.
//! - `annotate`: paints detection boxes and the status banner onto a copy of the
//!   frame. The detector only ever sees the unannotated frame.

use anyhow::{anyhow, Result};
use image::{Rgb, RgbImage};
use std::time::{Duration, Instant};

use crate::detect::Region;

/// Outline colour for detected regions.
pub const REGION_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
/// Banner colour when a human is in view.
pub const PRESENT_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
/// Banner colour when nobody is in view.
pub const ABSENT_COLOR: Rgb<u8> = Rgb([0, 0, 255]);

const REGION_THICKNESS: u32 = 2;
const BANNER_HEIGHT: u32 = 6;

/// A single captured frame.
pub struct Frame {
    image: RgbImage,
    /// Position of this frame in its source (1-based).
    pub sequence: u64,
    capture_instant: Instant,
}

impl Frame {
    pub fn new(image: RgbImage, sequence: u64) -> Self {
        Self {
            image,
            sequence,
            capture_instant: Instant::now(),
        }
    }

    /// Build a frame from packed RGB24 bytes.
    pub fn from_rgb(pixels: Vec<u8>, width: u32, height: u32, sequence: u64) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        let got = pixels.len();
        let image = RgbImage::from_raw(width, height, pixels).ok_or_else(|| {
            anyhow!(
                "RGB frame length mismatch: expected {}, got {}",
                expected,
                got
            )
        })?;
        Ok(Self::new(image, sequence))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Packed RGB24 pixels, row-major.
    pub fn pixels(&self) -> &[u8] {
        self.image.as_raw()
    }

    /// Time since the frame was captured. Survives `map_image`.
    pub fn age(&self) -> Duration {
        self.capture_instant.elapsed()
    }

    /// Replace the image while keeping sequence and capture instant.
    pub fn map_image(self, f: impl FnOnce(RgbImage) -> RgbImage) -> Self {
        Self {
            image: f(self.image),
            sequence: self.sequence,
            capture_instant: self.capture_instant,
        }
    }
}

/// Copy of `frame` with region outlines and the status banner painted on.
pub fn annotate(frame: &Frame, regions: &[Region], present: bool) -> RgbImage {
    let mut image = frame.image().clone();
    for region in regions {
        draw_region(&mut image, region, REGION_COLOR, REGION_THICKNESS);
    }
    draw_status_banner(&mut image, present);
    image
}

/// Outline `region`, clipped to the image bounds.
pub fn draw_region(image: &mut RgbImage, region: &Region, color: Rgb<u8>, thickness: u32) {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 || region.width == 0 || region.height == 0 {
        return;
    }

    let left = i64::from(region.x);
    let top = i64::from(region.y);
    let right = left + i64::from(region.width) - 1;
    let bottom = top + i64::from(region.height) - 1;
    let t = i64::from(thickness.max(1));

    for py in top.max(0)..=bottom.min(i64::from(height) - 1) {
        for px in left.max(0)..=right.min(i64::from(width) - 1) {
            let on_edge = px - left < t || right - px < t || py - top < t || bottom - py < t;
            if on_edge {
                image.put_pixel(px as u32, py as u32, color);
            }
        }
    }
}

/// Paint a solid bar across the top rows: red when present, blue otherwise.
pub fn draw_status_banner(image: &mut RgbImage, present: bool) {
    let color = if present { PRESENT_COLOR } else { ABSENT_COLOR };
    let rows = BANNER_HEIGHT.min(image.height());
    for y in 0..rows {
        for x in 0..image.width() {
            image.put_pixel(x, y, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn black(width: u32, height: u32) -> Frame {
        Frame::new(RgbImage::new(width, height), 1)
    }

    fn region(x: i32, y: i32, width: u32, height: u32) -> Region {
        Region {
            x,
            y,
            width,
            height,
            confidence: 1.0,
        }
    }

    #[test]
    fn from_rgb_validates_length() {
        assert!(Frame::from_rgb(vec![0u8; 12], 2, 2, 1).is_ok());
        assert!(Frame::from_rgb(vec![0u8; 11], 2, 2, 1).is_err());
    }

    #[test]
    fn region_outline_leaves_interior_untouched() {
        let mut image = RgbImage::new(40, 40);
        draw_region(&mut image, &region(10, 10, 20, 20), REGION_COLOR, 2);

        assert_eq!(*image.get_pixel(10, 10), REGION_COLOR);
        assert_eq!(*image.get_pixel(11, 20), REGION_COLOR);
        assert_eq!(*image.get_pixel(29, 29), REGION_COLOR);
        assert_eq!(*image.get_pixel(20, 20), Rgb([0, 0, 0]));
        assert_eq!(*image.get_pixel(9, 9), Rgb([0, 0, 0]));
        assert_eq!(*image.get_pixel(30, 30), Rgb([0, 0, 0]));
    }

    #[test]
    fn region_outline_is_clipped() {
        let mut image = RgbImage::new(16, 16);
        draw_region(&mut image, &region(-8, -8, 100, 100), REGION_COLOR, 2);
        // Only the clipped interior is visible; nothing panics.
        assert_eq!(*image.get_pixel(0, 0), Rgb([0, 0, 0]));

        draw_region(&mut image, &region(50, 50, 10, 10), REGION_COLOR, 2);
        assert!(image.pixels().all(|p| *p == Rgb([0, 0, 0])));
    }

    #[test]
    fn annotate_paints_banner_by_presence() {
        let frame = black(8, 20);
        let present = annotate(&frame, &[], true);
        let absent = annotate(&frame, &[], false);

        assert_eq!(*present.get_pixel(3, 0), PRESENT_COLOR);
        assert_eq!(*absent.get_pixel(3, 0), ABSENT_COLOR);
        assert_eq!(*present.get_pixel(3, 19), Rgb([0, 0, 0]));
        // The source frame is untouched.
        assert_eq!(*frame.image().get_pixel(3, 0), Rgb([0, 0, 0]));
    }

    #[test]
    fn age_survives_resizing() {
        let frame = black(4, 4);
        std::thread::sleep(Duration::from_millis(20));
        let resized = frame.map_image(|image| {
            image::imageops::resize(&image, 2, 2, image::imageops::FilterType::Nearest)
        });
        assert!(resized.age() >= Duration::from_millis(20));
    }
}
