use crate::error::DetectorError;
use crate::frame::Frame;

use super::result::Region;

/// Detector backend trait.
///
/// Implementations must treat the frame as read-only; annotation happens on a
/// copy after detection. A failure is reported as `DetectorError` and the
/// processing loop treats that frame as having no detection.
pub trait DetectorBackend: Send {
    /// Backend identifier, used for registry lookup and logging.
    fn name(&self) -> &'static str;

    /// Run detection on a frame.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Region>, DetectorError>;

    /// Optional warm-up hook, called once before the first frame.
    fn warm_up(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}
