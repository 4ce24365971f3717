//! Motion detection against the reference image
//!
//! gray(frame) → |gray - reference| → box blur (kills sensor noise and faint
//! shadows) → binary threshold. Stateless and deterministic.

use crate::error::Fault;
use crate::raster::{Frame, MotionMask, abs_diff, morph, threshold, to_gray};
use crate::settings::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionDetector {
    /// Blur window (pixels)
    pub kernel: u32,
    /// Blurred differences strictly above this are motion
    pub threshold: u8,
}

impl Default for MotionDetector {
    fn default() -> Self {
        Self {
            kernel: 20,
            threshold: 20,
        }
    }
}

impl MotionDetector {
    pub fn new(kernel: u32, threshold: u8) -> Self {
        Self { kernel, threshold }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.motion_kernel, settings.motion_threshold)
    }

    /// 0/255 mask of where `frame` differs from the reference
    pub fn detect(&self, frame: &Frame, reference_gray: &MotionMask) -> Result<MotionMask, Fault> {
        let diff = abs_diff(&to_gray(frame), reference_gray)?;
        let blurred = morph::box_blur(&diff, self.kernel);
        Ok(threshold(&blurred, self.threshold))
    }
}
