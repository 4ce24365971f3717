//! Raster types and whole-image operations
//!
//! - `Frame`: W×H RGB color buffer, rewritten in place by every phase
//! - `MotionMask`: W×H single channel, 0 = still, 255 = motion
//! - `ReferenceImage`: the captured baseline (color + derived gray)

pub mod draw;
pub mod morph;

use image::{GrayImage, Luma, Rgb, RgbImage, imageops};

use crate::error::{Fault, ensure_dimensions};

/// Color frame handed from phase to phase during a tick
pub type Frame = RgbImage;

/// Single-channel motion raster
pub type MotionMask = GrayImage;

/// Pure black
pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

/// The scene with nobody in it, captured once at startup and on request
#[derive(Debug, Clone)]
pub struct ReferenceImage {
    pub color: RgbImage,
    pub gray: GrayImage,
}

impl ReferenceImage {
    /// Capture a new reference from the given frame
    pub fn capture(frame: &Frame) -> Self {
        Self {
            color: frame.clone(),
            gray: to_gray(frame),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.color.dimensions()
    }
}

/// Luma conversion of a color frame
pub fn to_gray(frame: &Frame) -> GrayImage {
    imageops::grayscale(frame)
}

/// Expand a mask into a color frame (gray replicated to all channels)
pub fn gray_to_color(mask: &MotionMask) -> Frame {
    RgbImage::from_fn(mask.width(), mask.height(), |x, y| {
        let v = mask.get_pixel(x, y).0[0];
        Rgb([v, v, v])
    })
}

/// Per-pixel |a - b|
pub fn abs_diff(a: &GrayImage, b: &GrayImage) -> Result<GrayImage, Fault> {
    ensure_dimensions("abs_diff", a.dimensions(), b.dimensions())?;
    let data = a
        .as_raw()
        .iter()
        .zip(b.as_raw())
        .map(|(&p, &q)| p.abs_diff(q))
        .collect();
    GrayImage::from_raw(a.width(), a.height(), data).ok_or(Fault::EmptyRaster { what: "abs_diff" })
}

/// Binary threshold: strictly above `level` becomes 255, everything else 0
pub fn threshold(img: &GrayImage, level: u8) -> GrayImage {
    let mut out = img.clone();
    for p in out.iter_mut() {
        *p = if *p > level { 255 } else { 0 };
    }
    out
}

/// Bitwise NOT of every sample
pub fn invert(img: &GrayImage) -> GrayImage {
    let mut out = img.clone();
    for p in out.iter_mut() {
        *p = !*p;
    }
    out
}

/// Keep frame pixels where the mask is set, black elsewhere (bitwise AND with
/// the mask broadcast to three channels)
pub fn mask_frame(frame: &Frame, mask: &MotionMask) -> Result<Frame, Fault> {
    ensure_dimensions("mask_frame", frame.dimensions(), mask.dimensions())?;
    let mut out = frame.clone();
    for (x, y, px) in out.enumerate_pixels_mut() {
        let m = mask.get_pixel(x, y).0[0];
        for c in px.0.iter_mut() {
            *c &= m;
        }
    }
    Ok(out)
}

/// Number of nonzero samples
pub fn count_nonzero(img: &GrayImage) -> usize {
    img.as_raw().iter().filter(|&&v| v != 0).count()
}

/// Mask with every sample zero
pub fn empty_mask(width: u32, height: u32) -> MotionMask {
    GrayImage::from_pixel(width, height, Luma([0]))
}

/// Sample the mask, treating anything outside the raster as "no motion"
#[inline]
pub fn sample(mask: &MotionMask, x: i32, y: i32) -> u8 {
    if x < 0 || y < 0 {
        return 0;
    }
    mask.get_pixel_checked(x as u32, y as u32)
        .map(|p| p.0[0])
        .unwrap_or(0)
}
