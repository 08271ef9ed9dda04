/// Bounding box of one detection, in frame pixel coordinates.
///
/// `x`/`y` may be negative when a detector pads the search window past the
/// frame edge.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub confidence: f32,
}

/// Detections for a single frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DetectionResult {
    pub regions: Vec<Region>,
}

impl DetectionResult {
    pub fn new(regions: Vec<Region>) -> Self {
        Self { regions }
    }

    /// Empty result, used when the detector failed for this frame.
    pub fn absent() -> Self {
        Self::default()
    }

    /// A human is present when at least one region survived.
    pub fn present(&self) -> bool {
        !self.regions.is_empty()
    }

    /// Drop regions below `min_confidence`. A floor of 0.0 keeps everything.
    pub fn with_confidence_floor(mut self, min_confidence: f32) -> Self {
        if min_confidence > 0.0 {
            self.regions.retain(|r| r.confidence >= min_confidence);
        }
        self
    }

    /// Highest confidence among the regions, if any.
    pub fn peak_confidence(&self) -> Option<f32> {
        self.regions
            .iter()
            .map(|r| r.confidence)
            .fold(None, |acc, c| Some(acc.map_or(c, |a: f32| a.max(c))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(confidence: f32) -> Region {
        Region {
            x: 0,
            y: 0,
            width: 10,
            height: 20,
            confidence,
        }
    }

    #[test]
    fn presence_follows_region_count() {
        assert!(!DetectionResult::absent().present());
        assert!(DetectionResult::new(vec![region(0.1)]).present());
    }

    #[test]
    fn zero_floor_keeps_low_confidence_regions() {
        let result = DetectionResult::new(vec![region(0.0), region(0.2)]).with_confidence_floor(0.0);
        assert_eq!(result.regions.len(), 2);
    }

    #[test]
    fn floor_filters_and_can_clear_presence() {
        let result =
            DetectionResult::new(vec![region(0.3), region(0.9)]).with_confidence_floor(0.5);
        assert_eq!(result.regions.len(), 1);
        assert_eq!(result.peak_confidence(), Some(0.9));

        let cleared = DetectionResult::new(vec![region(0.3)]).with_confidence_floor(0.5);
        assert!(!cleared.present());
        assert_eq!(cleared.peak_confidence(), None);
    }
}
