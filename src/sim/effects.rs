//! Frame/mask rewriting effects and the pre/post-process utilities
//!
//! Effects run in the pre-process queue, ahead of collision testing:
//! - `ShrinkMaskEffect` ("smoosher"): shrinks the moving actor into the
//!   bottom of the scene, and only that shrunken actor can pop bubbles
//! - `SkeletonizeEffect`: replaces frame and mask with the mask's skeleton
//! - `ContourFireEffect`: outlines the motion blobs, mask untouched

use std::time::Instant;

use image::imageops::{self, FilterType};
use image::RgbImage;

use crate::consts::{CONTOUR_THICKNESS, SHRINK_LIFT, SHRINK_LIFT_BELOW};
use crate::error::{Fault, ensure_dimensions};
use crate::raster::{
    Frame, MotionMask, ReferenceImage, draw, gray_to_color, invert, mask_frame, morph, threshold,
    to_gray,
};
use crate::settings::Settings;

use super::collision::point_collides;
use super::entity::{Behavior, Capabilities, Flow, PhaseContext};
use super::state::{Body, EntityId, GameEvent, PopEvent, PopKind, SimRng, palette};

/// Where the shrink animation is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleMode {
    /// Scale decreasing every tick
    Shrink,
    /// Parked at the floor until the hold timer fires
    Hold,
    /// Scale increasing back to full size
    Grow,
}

/// "You shrunk me!" mode
///
/// Armed, it is a green square falling through the game-process queue. Once
/// popped it moves to the pre-process queue: the moving actor is cut out of
/// the frame, scaled down and composited bottom-center over the reference
/// image, and the shrunken silhouette becomes the motion mask.
#[derive(Debug, Clone)]
pub struct ShrinkMaskEffect {
    pub trigger: Body,
    pub scale: f32,
    pub mode: ScaleMode,
    pub min_scale: f32,
    pub shrink_step: f32,
    pub grow_step: f32,
}

impl ShrinkMaskEffect {
    pub fn new(rng: &mut SimRng, settings: &Settings) -> Self {
        Self {
            trigger: Body::spawn(
                rng,
                settings.frame_size(),
                settings.smoosher_radius,
                palette::SMOOSHER,
                settings.smoosher_increment,
            ),
            scale: 1.0,
            mode: ScaleMode::Shrink,
            min_scale: settings.shrink_min_scale,
            shrink_step: settings.shrink_step,
            grow_step: settings.grow_step,
        }
    }

    /// Ready to fall again: full scale, new spawn point
    pub fn rearm(&mut self, rng: &mut SimRng, bounds: (u32, u32)) {
        self.scale = 1.0;
        self.mode = ScaleMode::Shrink;
        self.trigger.respawn(rng, bounds);
    }

    /// Hold is over
    pub fn begin_growing(&mut self) {
        if self.mode == ScaleMode::Hold {
            self.mode = ScaleMode::Grow;
        }
    }

    /// Advance the scale one tick. Returns true when the floor is first reached.
    fn animate(&mut self) -> bool {
        match self.mode {
            ScaleMode::Shrink => {
                self.scale -= self.shrink_step;
                if self.scale <= self.min_scale {
                    self.scale = self.min_scale;
                    self.mode = ScaleMode::Hold;
                    return true;
                }
            }
            ScaleMode::Hold => {}
            ScaleMode::Grow => {
                self.scale = (self.scale + self.grow_step).min(1.0);
            }
        }
        false
    }

    /// Black canvas with the scaled actor placed bottom-center
    fn composite(&self, moving: &RgbImage) -> Result<RgbImage, Fault> {
        let (w, h) = moving.dimensions();
        let sw = (w as f32 * self.scale).round() as u32;
        let sh = (h as f32 * self.scale).round() as u32;
        if sw == 0 || sh == 0 {
            return Err(Fault::EmptyRaster { what: "smoosher" });
        }
        let shrunk = if (sw, sh) == (w, h) {
            moving.clone()
        } else {
            imageops::resize(moving, sw.min(w), sh.min(h), FilterType::Triangle)
        };

        let x = ((w - shrunk.width()) / 2) as i64;
        let mut y = (h - shrunk.height()) as i64;
        if shrunk.height() < SHRINK_LIFT_BELOW {
            y -= SHRINK_LIFT;
        }
        let mut canvas = RgbImage::new(w, h);
        imageops::replace(&mut canvas, &shrunk, x, y);
        Ok(canvas)
    }
}

impl Behavior for ShrinkMaskEffect {
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            pre_process: true,
            game_process: true,
            post_process: false,
        }
    }

    fn pre_process(
        &mut self,
        id: EntityId,
        frame: &mut Frame,
        mask: &mut MotionMask,
        ctx: &mut PhaseContext<'_>,
    ) -> Result<Flow, Fault> {
        ensure_dimensions("smoosher reference", frame.dimensions(), ctx.reference.dimensions())?;
        let moving = mask_frame(frame, mask)?;
        let canvas = self.composite(&moving)?;

        // Silhouette of the shrunken actor, and its inverse to reveal the scene
        let silhouette = threshold(&to_gray(&canvas), 1);
        let reveal = invert(&silhouette);

        for (x, y, px) in frame.enumerate_pixels_mut() {
            let keep = reveal.get_pixel(x, y).0[0];
            let back = ctx.reference.color.get_pixel(x, y).0;
            let fore = canvas.get_pixel(x, y).0;
            for c in 0..3 {
                px.0[c] = (back[c] & keep) | fore[c];
            }
        }
        *mask = silhouette;

        if self.animate() {
            ctx.emit(GameEvent::ShrinkFloorReached { id });
        }
        Ok(Flow::Continue)
    }

    fn game_process(
        &mut self,
        id: EntityId,
        frame: &mut Frame,
        mask: &MotionMask,
        ctx: &mut PhaseContext<'_>,
    ) -> Result<Flow, Fault> {
        let bounds = ctx.bounds();
        let body = &mut self.trigger;
        if point_collides(mask, body.pos, ctx.settings.collision_threshold) {
            ctx.emit(GameEvent::Pop(PopEvent {
                id,
                pos: body.pos,
                kind: PopKind::Smoosher,
            }));
            body.respawn(ctx.rng, bounds);
            return Ok(Flow::Finished);
        }
        body.fall(ctx.rng, bounds);
        draw::fill_square(frame, body.pos, body.radius, body.color);
        Ok(Flow::Continue)
    }
}

/// Thin the motion blob down to its skeleton and show only that
#[derive(Debug, Clone)]
pub struct SkeletonizeEffect {
    pub max_passes: u32,
    /// Passes used on the latest run
    pub last_passes: u32,
}

impl SkeletonizeEffect {
    pub fn new(max_passes: u32) -> Self {
        Self {
            max_passes: max_passes.max(1),
            last_passes: 0,
        }
    }
}

impl Behavior for SkeletonizeEffect {
    fn capabilities(&self) -> Capabilities {
        Capabilities::PRE
    }

    fn pre_process(
        &mut self,
        _id: EntityId,
        frame: &mut Frame,
        mask: &mut MotionMask,
        _ctx: &mut PhaseContext<'_>,
    ) -> Result<Flow, Fault> {
        ensure_dimensions("skeleton mask", frame.dimensions(), mask.dimensions())?;
        let (skeleton, passes) = morph::skeletonize(mask, self.max_passes);
        self.last_passes = passes;
        *frame = gray_to_color(&skeleton);
        *mask = skeleton;
        Ok(Flow::Continue)
    }
}

/// Outline every motion blob on the frame
#[derive(Debug, Clone, Default)]
pub struct ContourFireEffect {
    /// Contours drawn on the latest run
    pub last_contours: usize,
}

impl Behavior for ContourFireEffect {
    fn capabilities(&self) -> Capabilities {
        Capabilities::PRE
    }

    fn pre_process(
        &mut self,
        _id: EntityId,
        frame: &mut Frame,
        mask: &mut MotionMask,
        _ctx: &mut PhaseContext<'_>,
    ) -> Result<Flow, Fault> {
        let contours = morph::find_contours(mask);
        for point in contours.iter().flatten() {
            draw::stamp(frame, point.x, point.y, CONTOUR_THICKNESS, palette::CONTOUR);
        }
        self.last_contours = contours.len();
        Ok(Flow::Continue)
    }
}

/// Take the current frame as the new reference image
#[derive(Debug, Clone, Default)]
pub struct ReferenceCapture;

impl Behavior for ReferenceCapture {
    fn capabilities(&self) -> Capabilities {
        Capabilities::PRE
    }

    fn pre_process(
        &mut self,
        _id: EntityId,
        frame: &mut Frame,
        _mask: &mut MotionMask,
        ctx: &mut PhaseContext<'_>,
    ) -> Result<Flow, Fault> {
        ensure_dimensions("reference capture", ctx.bounds(), frame.dimensions())?;
        log::info!("New reference acquisition");
        *ctx.reference = ReferenceImage::capture(frame);
        ctx.emit(GameEvent::ReferenceCaptured);
        Ok(Flow::Finished)
    }
}

/// Measures the frame rate between consecutive post-process passes
#[derive(Debug, Clone, Default)]
pub struct FpsOverlay {
    last: Option<Instant>,
    pub fps: Option<f32>,
}

impl Behavior for FpsOverlay {
    fn capabilities(&self) -> Capabilities {
        Capabilities::POST
    }

    fn post_process(
        &mut self,
        _id: EntityId,
        _frame: &mut Frame,
        _mask: &MotionMask,
        ctx: &mut PhaseContext<'_>,
    ) -> Result<Flow, Fault> {
        let now = Instant::now();
        if let Some(last) = self.last {
            let dt = now.duration_since(last).as_secs_f32();
            if dt > 0.0 {
                self.fps = Some(1.0 / dt);
            }
        }
        self.last = Some(now);
        ctx.fps = self.fps;
        Ok(Flow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{count_nonzero, empty_mask};
    use crate::sim::state::seeded_rng;
    use glam::IVec2;
    use image::{GrayImage, Luma, Rgb};

    const SCENE: Rgb<u8> = Rgb([60, 90, 120]);
    const ACTOR: Rgb<u8> = Rgb([250, 200, 10]);

    /// Scene reference plus a frame with an actor standing in a rectangle
    fn actor_scene() -> (Settings, ReferenceImage, Frame, MotionMask) {
        let settings = Settings::default();
        let reference = ReferenceImage::capture(&Frame::from_pixel(800, 600, SCENE));
        let mut frame = Frame::from_pixel(800, 600, SCENE);
        let mut mask = empty_mask(800, 600);
        for y in 200..600 {
            for x in 300..500 {
                frame.put_pixel(x, y, ACTOR);
                mask.put_pixel(x, y, Luma([255]));
            }
        }
        (settings, reference, frame, mask)
    }

    #[test]
    fn test_shrink_full_scale_keeps_actor_in_place() {
        let (settings, mut reference, mut frame, mut mask) = actor_scene();
        let mut rng = seeded_rng(1);
        let mut effect = ShrinkMaskEffect::new(&mut rng, &settings);
        let mut ctx = PhaseContext::new(&settings, &mut reference, &mut rng, 1);

        effect.pre_process(7, &mut frame, &mut mask, &mut ctx).unwrap();
        assert_eq!(frame.get_pixel(400, 400), &ACTOR);
        assert_eq!(frame.get_pixel(100, 100), &SCENE);
        assert_eq!(mask.get_pixel(400, 400).0[0], 255);
        assert_eq!(mask.get_pixel(100, 100).0[0], 0);
        assert!((effect.scale - 0.975).abs() < 1e-6);
    }

    #[test]
    fn test_shrunken_actor_sits_bottom_center() {
        let (settings, mut reference, mut frame, mut mask) = actor_scene();
        let mut rng = seeded_rng(1);
        let mut effect = ShrinkMaskEffect::new(&mut rng, &settings);
        effect.scale = 0.25;
        effect.mode = ScaleMode::Hold;
        let mut ctx = PhaseContext::new(&settings, &mut reference, &mut rng, 1);

        effect.pre_process(7, &mut frame, &mut mask, &mut ctx).unwrap();
        // 200x150 canvas patch at x 300..500, lifted 20px: y 430..580.
        // The actor (x 300..500, y 200..600) maps to x 375..425, y 480..580.
        assert_eq!(mask.get_pixel(400, 550).0[0], 255);
        let px = frame.get_pixel(400, 550).0;
        for c in 0..3 {
            assert!(px[c].abs_diff(ACTOR.0[c]) <= 2);
        }
        // Where the full-size actor stood, only the scene is left
        assert_eq!(mask.get_pixel(400, 300).0[0], 0);
        assert_eq!(frame.get_pixel(400, 300), &SCENE);
        // Below the lifted patch
        assert_eq!(mask.get_pixel(400, 590).0[0], 0);
        assert!(count_nonzero(&mask) < 60 * 110);
        // Holding: no change, no new floor event
        assert_eq!(effect.scale, 0.25);
        assert!(ctx.events.is_empty());
    }

    #[test]
    fn test_shrink_cycle_shrink_hold_grow() {
        let (settings, mut reference, frame, mask) = actor_scene();
        let mut rng = seeded_rng(1);
        let mut effect = ShrinkMaskEffect::new(&mut rng, &settings);
        let mut ctx = PhaseContext::new(&settings, &mut reference, &mut rng, 1);

        let mut ticks = 0;
        while effect.mode == ScaleMode::Shrink {
            let (mut f, mut m) = (frame.clone(), mask.clone());
            effect.pre_process(7, &mut f, &mut m, &mut ctx).unwrap();
            ticks += 1;
            assert!(ticks < 100);
        }
        assert_eq!(effect.scale, 0.25);
        assert_eq!(
            ctx.events
                .iter()
                .filter(|e| matches!(e, GameEvent::ShrinkFloorReached { id: 7 }))
                .count(),
            1
        );

        effect.begin_growing();
        assert_eq!(effect.mode, ScaleMode::Grow);
        for _ in 0..10 {
            let (mut f, mut m) = (frame.clone(), mask.clone());
            effect.pre_process(7, &mut f, &mut m, &mut ctx).unwrap();
        }
        assert_eq!(effect.scale, 1.0);
    }

    #[test]
    fn test_shrink_rejects_wrong_reference_size() {
        let (settings, _, mut frame, mut mask) = actor_scene();
        let mut reference = ReferenceImage::capture(&Frame::new(64, 48));
        let mut rng = seeded_rng(1);
        let mut effect = ShrinkMaskEffect::new(&mut rng, &settings);
        let mut ctx = PhaseContext::new(&settings, &mut reference, &mut rng, 1);
        let result = effect.pre_process(7, &mut frame, &mut mask, &mut ctx);
        assert!(matches!(result, Err(Fault::DimensionMismatch { .. })));
    }

    #[test]
    fn test_smoosher_trigger_pops() {
        let (settings, mut reference, mut frame, _) = actor_scene();
        let mut rng = seeded_rng(1);
        let mut effect = ShrinkMaskEffect::new(&mut rng, &settings);
        effect.trigger.pos = IVec2::new(50, 50);
        let mut mask = empty_mask(800, 600);
        mask.put_pixel(50, 50, Luma([255]));
        let mut ctx = PhaseContext::new(&settings, &mut reference, &mut rng, 1);

        let flow = effect.game_process(8, &mut frame, &mask, &mut ctx).unwrap();
        assert_eq!(flow, Flow::Finished);
        assert!(matches!(
            ctx.events[0],
            GameEvent::Pop(PopEvent { kind: PopKind::Smoosher, id: 8, .. })
        ));
    }

    #[test]
    fn test_skeleton_replaces_frame_and_mask() {
        let (settings, mut reference, mut frame, mut mask) = actor_scene();
        let mut rng = seeded_rng(1);
        let mut effect = SkeletonizeEffect::new(100);
        let mut ctx = PhaseContext::new(&settings, &mut reference, &mut rng, 1);

        effect.pre_process(1, &mut frame, &mut mask, &mut ctx).unwrap();
        assert!(effect.last_passes > 1 && effect.last_passes <= 100);
        let n = count_nonzero(&mask);
        assert!(n > 0 && n < 200 * 400);
        for (x, y, p) in mask.enumerate_pixels() {
            let v = p.0[0];
            assert_eq!(frame.get_pixel(x, y), &Rgb([v, v, v]));
        }
    }

    #[test]
    fn test_fire_outlines_without_touching_mask() {
        let (settings, mut reference, mut frame, mut mask) = actor_scene();
        let before = mask.clone();
        let mut rng = seeded_rng(1);
        let mut effect = ContourFireEffect::default();
        let mut ctx = PhaseContext::new(&settings, &mut reference, &mut rng, 1);

        effect.pre_process(1, &mut frame, &mut mask, &mut ctx).unwrap();
        assert_eq!(mask, before);
        assert_eq!(effect.last_contours, 1);
        assert_eq!(frame.get_pixel(300, 400), &palette::CONTOUR);
        assert_eq!(frame.get_pixel(400, 400), &ACTOR);
    }

    #[test]
    fn test_reference_capture_is_one_shot() {
        let settings = Settings::default();
        let mut reference = ReferenceImage::capture(&Frame::new(800, 600));
        let mut rng = seeded_rng(1);
        let mut frame = Frame::from_pixel(800, 600, SCENE);
        let mut mask: GrayImage = empty_mask(800, 600);
        let mut ctx = PhaseContext::new(&settings, &mut reference, &mut rng, 1);

        let flow = ReferenceCapture.pre_process(1, &mut frame, &mut mask, &mut ctx).unwrap();
        assert_eq!(flow, Flow::Finished);
        assert_eq!(ctx.events, vec![GameEvent::ReferenceCaptured]);
        assert_eq!(ctx.reference.color.get_pixel(5, 5), &SCENE);
    }
}
