//! Collision tests against the motion mask
//!
//! Two policies: a single point sample at the body center, and an area scan
//! over a square inset inside the body's circle (for bodies that grow large).
//! Centers on or beyond the frame edge never collide, and samples outside
//! the mask read as "no motion".

use glam::IVec2;

use crate::raster::{MotionMask, sample};

/// Whether `pos` lies strictly inside the mask bounds
#[inline]
fn strictly_inside(mask: &MotionMask, pos: IVec2) -> bool {
    let (w, h) = (mask.width() as i32, mask.height() as i32);
    pos.x > 0 && pos.x < w && pos.y > 0 && pos.y < h
}

/// Is there motion exactly at `pos`?
pub fn point_collides(mask: &MotionMask, pos: IVec2, threshold: u8) -> bool {
    strictly_inside(mask, pos) && sample(mask, pos.x, pos.y) > threshold
}

/// Half side of the inset square: radius minus a quarter-radius margin
#[inline]
pub fn inset_half_side(radius: i32) -> i32 {
    radius - radius / 4
}

/// Is there motion anywhere in the square inset inside the circle?
///
/// The square spans `[pos - half, pos + half)` on both axes, clamped to the
/// mask, and is scanned row by row until the first hit.
pub fn area_collides(mask: &MotionMask, pos: IVec2, radius: i32, threshold: u8) -> bool {
    if !strictly_inside(mask, pos) {
        return false;
    }
    let half = inset_half_side(radius.max(0));
    let (w, h) = (mask.width() as i32, mask.height() as i32);
    let start = (pos - IVec2::splat(half)).max(IVec2::ZERO);
    let end = (pos + IVec2::splat(half)).min(IVec2::new(w, h));

    for y in start.y..end.y {
        for x in start.x..end.x {
            if sample(mask, x, y) > threshold {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use proptest::prelude::*;

    fn hot_pixel(w: u32, h: u32, x: u32, y: u32) -> MotionMask {
        let mut mask = GrayImage::new(w, h);
        mask.put_pixel(x, y, Luma([255]));
        mask
    }

    #[test]
    fn test_point_hit_and_miss() {
        let mask = hot_pixel(800, 600, 100, 200);
        assert!(point_collides(&mask, IVec2::new(100, 200), 1));
        assert!(!point_collides(&mask, IVec2::new(101, 200), 1));
    }

    #[test]
    fn test_point_threshold_is_strict() {
        let mut mask = GrayImage::new(10, 10);
        mask.put_pixel(5, 5, Luma([1]));
        assert!(!point_collides(&mask, IVec2::new(5, 5), 1));
        mask.put_pixel(5, 5, Luma([2]));
        assert!(point_collides(&mask, IVec2::new(5, 5), 1));
    }

    #[test]
    fn test_point_boundaries_never_collide() {
        let mask = GrayImage::from_pixel(800, 600, Luma([255]));
        for pos in [
            IVec2::new(0, 300),
            IVec2::new(800, 300),
            IVec2::new(400, 0),
            IVec2::new(400, 600),
            IVec2::new(400, -50),
        ] {
            assert!(!point_collides(&mask, pos, 1), "{pos:?}");
        }
    }

    #[test]
    fn test_area_hot_pixel_inside_inset() {
        // radius 20 → margin 5 → box [385, 415) x [285, 315)
        let mask = hot_pixel(800, 600, 405, 305);
        assert!(area_collides(&mask, IVec2::new(400, 300), 20, 1));
    }

    #[test]
    fn test_area_hot_pixel_outside_inset() {
        let mask = hot_pixel(800, 600, 416, 300);
        assert!(!area_collides(&mask, IVec2::new(400, 300), 20, 1));
    }

    #[test]
    fn test_area_zero_mask() {
        let mask = GrayImage::new(800, 600);
        assert!(!area_collides(&mask, IVec2::new(400, 300), 200, 1));
    }

    #[test]
    fn test_area_clamped_at_corner() {
        let mask = hot_pixel(800, 600, 799, 599);
        assert!(area_collides(&mask, IVec2::new(795, 595), 60, 1));
        assert!(area_collides(&mask, IVec2::new(799, 599), 500, 1));
    }

    proptest! {
        #[test]
        fn prop_point_matches_sample(x in -20i32..820, y in -20i32..620, hx in 0u32..800, hy in 0u32..600) {
            let mask = hot_pixel(800, 600, hx, hy);
            let expected = x > 0 && x < 800 && y > 0 && y < 600 && x as u32 == hx && y as u32 == hy;
            prop_assert_eq!(point_collides(&mask, IVec2::new(x, y), 1), expected);
        }

        #[test]
        fn prop_area_matches_box(x in 1i32..80, y in 1i32..60, radius in 0i32..120, hx in 0u32..80, hy in 0u32..60) {
            let mask = hot_pixel(80, 60, hx, hy);
            let half = inset_half_side(radius);
            let (hx, hy) = (hx as i32, hy as i32);
            let expected = hx >= x - half && hx < x + half && hy >= y - half && hy < y + half;
            prop_assert_eq!(area_collides(&mask, IVec2::new(x, y), radius, 1), expected);
        }
    }
}
