//! Software drawing on color frames
//!
//! Every primitive clips against the frame, so shapes may sit partly (or
//! wholly) off-screen, e.g. bubbles still above the top edge.

use glam::IVec2;
use image::Rgb;

use super::Frame;

/// Set one pixel if it lies inside the frame
#[inline]
pub fn put_pixel(frame: &mut Frame, x: i32, y: i32, color: Rgb<u8>) {
    if x < 0 || y < 0 {
        return;
    }
    let (x, y) = (x as u32, y as u32);
    if x >= frame.width() || y >= frame.height() {
        return;
    }
    frame.put_pixel(x, y, color);
}

/// Filled disc
pub fn fill_circle(frame: &mut Frame, center: IVec2, radius: i32, color: Rgb<u8>) {
    if radius <= 0 {
        put_pixel(frame, center.x, center.y, color);
        return;
    }
    let r2 = radius * radius;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= r2 {
                put_pixel(frame, center.x + dx, center.y + dy, color);
            }
        }
    }
}

/// One pixel wide circle outline
pub fn draw_ring(frame: &mut Frame, center: IVec2, radius: i32, color: Rgb<u8>) {
    let radius = radius.max(1);
    let inner = (radius - 1) * (radius - 1);
    let outer = radius * radius;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let d2 = dx * dx + dy * dy;
            if d2 > inner && d2 <= outer {
                put_pixel(frame, center.x + dx, center.y + dy, color);
            }
        }
    }
}

/// Filled axis-aligned square with its top-left corner at `origin`
pub fn fill_square(frame: &mut Frame, origin: IVec2, side: i32, color: Rgb<u8>) {
    for y in origin.y..=origin.y + side {
        for x in origin.x..=origin.x + side {
            put_pixel(frame, x, y, color);
        }
    }
}

/// Square brush of `thickness` pixels centered on (x, y)
pub fn stamp(frame: &mut Frame, x: i32, y: i32, thickness: i32, color: Rgb<u8>) {
    let half = thickness / 2;
    for dy in -half..=half {
        for dx in -half..=half {
            put_pixel(frame, x + dx, y + dy, color);
        }
    }
}

/// `frame = overlay * alpha + frame * (1 - alpha)`, alpha clamped to [0, 1]
///
/// Frames of different sizes are left untouched.
pub fn blend(frame: &mut Frame, overlay: &Frame, alpha: f32) {
    if frame.dimensions() != overlay.dimensions() {
        return;
    }
    let a = alpha.clamp(0.0, 1.0);
    let inv = 1.0 - a;
    for (dst, src) in frame.iter_mut().zip(overlay.iter()) {
        *dst = (*src as f32 * a + *dst as f32 * inv).round() as u8;
    }
}
