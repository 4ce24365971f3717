//! Neighborhood operations on single-channel rasters
//!
//! Box blur, 3×3 cross erosion/dilation, skeleton thinning and contour
//! extraction. Samples outside the raster never contribute to a min/max;
//! the blur replicates edge samples.

use std::collections::VecDeque;

use glam::IVec2;
use image::GrayImage;

use super::count_nonzero;

/// 4-neighborhood plus center (the 3×3 cross structuring element)
const CROSS: [(i32, i32); 5] = [(0, 0), (-1, 0), (1, 0), (0, -1), (0, 1)];

/// Normalized box filter with a `kernel`×`kernel` window
///
/// The window spans `[-kernel/2, kernel - 1 - kernel/2]` around each sample.
/// Implemented as two sliding-window passes (rows, then columns).
pub fn box_blur(src: &GrayImage, kernel: u32) -> GrayImage {
    let (w, h) = src.dimensions();
    if kernel <= 1 || w == 0 || h == 0 {
        return src.clone();
    }
    let lo = -((kernel / 2) as i32);
    let hi = kernel as i32 - 1 + lo;
    let area = kernel * kernel;
    let (wi, hi_px) = (w as i32, h as i32);
    let data = src.as_raw();

    // Pass 1: horizontal window sums per row
    let mut rows = vec![0u32; (w * h) as usize];
    for y in 0..hi_px {
        let base = (y * wi) as usize;
        let at = |x: i32| data[base + x.clamp(0, wi - 1) as usize] as u32;
        let mut sum: u32 = (lo..=hi).map(at).sum();
        for x in 0..wi {
            rows[base + x as usize] = sum;
            sum = sum + at(x + hi + 1) - at(x + lo);
        }
    }

    // Pass 2: vertical window sums of the row sums
    let mut out = vec![0u8; (w * h) as usize];
    for x in 0..wi {
        let at = |y: i32| rows[(y.clamp(0, hi_px - 1) * wi + x) as usize];
        let mut sum: u32 = (lo..=hi).map(at).sum();
        for y in 0..hi_px {
            out[(y * wi + x) as usize] = ((sum + area / 2) / area).min(255) as u8;
            sum = sum + at(y + hi + 1) - at(y + lo);
        }
    }

    GrayImage::from_raw(w, h, out).unwrap_or_else(|| src.clone())
}

fn cross_reduce(src: &GrayImage, pick: fn(u8, u8) -> u8) -> GrayImage {
    let (w, h) = src.dimensions();
    GrayImage::from_fn(w, h, |x, y| {
        let center = src.get_pixel(x, y).0[0];
        let v = CROSS[1..].iter().fold(center, |acc, &(dx, dy)| {
            let nx = x as i32 + dx;
            let ny = y as i32 + dy;
            if nx < 0 || ny < 0 || nx >= w as i32 || ny >= h as i32 {
                acc
            } else {
                pick(acc, src.get_pixel(nx as u32, ny as u32).0[0])
            }
        });
        image::Luma([v])
    })
}

/// Erosion with the 3×3 cross
pub fn erode(src: &GrayImage) -> GrayImage {
    cross_reduce(src, u8::min)
}

/// Dilation with the 3×3 cross
pub fn dilate(src: &GrayImage) -> GrayImage {
    cross_reduce(src, u8::max)
}

/// Saturating `a - b`
pub fn subtract(a: &GrayImage, b: &GrayImage) -> GrayImage {
    let mut out = a.clone();
    for (p, q) in out.iter_mut().zip(b.iter()) {
        *p = p.saturating_sub(*q);
    }
    out
}

/// `dst |= src`
pub fn or_in_place(dst: &mut GrayImage, src: &GrayImage) {
    for (p, q) in dst.iter_mut().zip(src.iter()) {
        *p |= *q;
    }
}

/// Morphological skeleton of a binary mask
///
/// Each pass erodes the working image, opens it back up, and accumulates
/// whatever the opening lost. Stops when the eroded image is empty or after
/// `max_passes` passes. Returns the skeleton and the number of passes run.
pub fn skeletonize(mask: &GrayImage, max_passes: u32) -> (GrayImage, u32) {
    let mut img = super::threshold(mask, 127);
    let mut skeleton = GrayImage::new(mask.width(), mask.height());
    let mut passes = 0;

    loop {
        let eroded = erode(&img);
        let opened = dilate(&eroded);
        let residue = subtract(&img, &opened);
        or_in_place(&mut skeleton, &residue);
        img = eroded;
        passes += 1;

        if passes >= max_passes.max(1) || count_nonzero(&img) == 0 {
            break;
        }
    }

    (skeleton, passes)
}

/// One connected outline
pub type Contour = Vec<IVec2>;

/// Outlines of every blob in the mask
///
/// A boundary pixel is a set pixel with a 4-neighbor that is unset or off the
/// raster. Boundary pixels are grouped into 8-connected contours, in raster
/// scan order of their first pixel.
pub fn find_contours(mask: &GrayImage) -> Vec<Contour> {
    let (w, h) = mask.dimensions();
    let (wi, hi) = (w as i32, h as i32);
    let set = |x: i32, y: i32| {
        x >= 0 && y >= 0 && x < wi && y < hi && mask.get_pixel(x as u32, y as u32).0[0] != 0
    };
    let is_boundary =
        |x: i32, y: i32| set(x, y) && CROSS[1..].iter().any(|&(dx, dy)| !set(x + dx, y + dy));

    let mut visited = vec![false; (w * h) as usize];
    let mut contours = Vec::new();

    for y in 0..hi {
        for x in 0..wi {
            let idx = (y * wi + x) as usize;
            if visited[idx] || !is_boundary(x, y) {
                continue;
            }
            visited[idx] = true;
            let mut contour = Vec::new();
            let mut queue = VecDeque::from([IVec2::new(x, y)]);
            while let Some(p) = queue.pop_front() {
                contour.push(p);
                for dy in -1..=1 {
                    for dx in -1..=1 {
                        let (nx, ny) = (p.x + dx, p.y + dy);
                        if nx < 0 || ny < 0 || nx >= wi || ny >= hi {
                            continue;
                        }
                        let nidx = (ny * wi + nx) as usize;
                        if !visited[nidx] && is_boundary(nx, ny) {
                            visited[nidx] = true;
                            queue.push_back(IVec2::new(nx, ny));
                        }
                    }
                }
            }
            contours.push(contour);
        }
    }

    contours
}
