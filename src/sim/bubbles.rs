//! Falling bubbles and the ring that rises from a pop

use glam::IVec2;

use crate::error::Fault;
use crate::raster::{Frame, MotionMask, draw};
use crate::settings::Settings;

use super::collision::{area_collides, point_collides};
use super::entity::{Behavior, Capabilities, Flow, PhaseContext};
use super::state::{Body, EntityId, GameEvent, PopEvent, PopKind, SimRng, palette};

/// The group of good (blue) bubbles
///
/// Each bubble falls, wraps back above the frame once it has left the
/// bottom, and pops on a point collision at its center.
#[derive(Debug, Clone)]
pub struct BubbleGroup {
    pub bubbles: Vec<Body>,
}

impl BubbleGroup {
    pub fn new(rng: &mut SimRng, settings: &Settings) -> Self {
        let bounds = settings.frame_size();
        let bubbles = (0..settings.bubble_count)
            .map(|_| {
                Body::spawn(
                    rng,
                    bounds,
                    settings.bubble_radius,
                    palette::GOOD,
                    settings.bubble_increment,
                )
            })
            .collect();
        Self { bubbles }
    }
}

impl Behavior for BubbleGroup {
    fn capabilities(&self) -> Capabilities {
        Capabilities::GAME
    }

    fn game_process(
        &mut self,
        id: EntityId,
        frame: &mut Frame,
        mask: &MotionMask,
        ctx: &mut PhaseContext<'_>,
    ) -> Result<Flow, Fault> {
        let bounds = ctx.bounds();
        let threshold = ctx.settings.collision_threshold;
        for bubble in &mut self.bubbles {
            if point_collides(mask, bubble.pos, threshold) {
                ctx.events.push(GameEvent::Pop(PopEvent {
                    id,
                    pos: bubble.pos,
                    kind: PopKind::Good,
                }));
                bubble.respawn(ctx.rng, bounds);
            } else {
                bubble.fall(ctx.rng, bounds);
                draw::fill_circle(frame, bubble.pos, bubble.radius, bubble.color);
            }
        }
        Ok(Flow::Continue)
    }
}

/// The red bubble: pops the mess over the player and costs points
///
/// Collides over an inset square rather than a single point since it grows
/// after every pop. A pop disables it until its mess burst has played out.
#[derive(Debug, Clone)]
pub struct AdversarialBubble {
    pub body: Body,
}

impl AdversarialBubble {
    pub fn new(rng: &mut SimRng, settings: &Settings, radius: i32) -> Self {
        Self {
            body: Body::spawn(
                rng,
                settings.frame_size(),
                radius,
                palette::BAD,
                settings.bad_increment,
            ),
        }
    }

    /// Grow by `jump` pixels
    pub fn harder(&mut self, jump: i32) {
        self.body.radius += jump;
    }
}

impl Behavior for AdversarialBubble {
    fn capabilities(&self) -> Capabilities {
        Capabilities::GAME
    }

    fn game_process(
        &mut self,
        id: EntityId,
        frame: &mut Frame,
        mask: &MotionMask,
        ctx: &mut PhaseContext<'_>,
    ) -> Result<Flow, Fault> {
        let bounds = ctx.bounds();
        let body = &mut self.body;
        if area_collides(mask, body.pos, body.radius, ctx.settings.collision_threshold) {
            ctx.emit(GameEvent::Pop(PopEvent {
                id,
                pos: body.pos,
                kind: PopKind::Bad,
            }));
            body.respawn(ctx.rng, bounds);
            return Ok(Flow::Finished);
        }
        body.fall(ctx.rng, bounds);
        draw::fill_circle(frame, body.pos, body.radius, body.color);
        Ok(Flow::Continue)
    }
}

/// Ring rising from a pop, shrinking as it goes
#[derive(Debug, Clone)]
pub struct PopFeedback {
    pub body: Body,
    /// Radius lost per tick (radius floors at 1)
    pub shrink: i32,
    /// Disappears once it has risen above this line
    pub stop_y: i32,
}

impl PopFeedback {
    pub fn new(pos: IVec2, settings: &Settings) -> Self {
        Self {
            body: Body::new(
                pos,
                settings.feedback_radius,
                palette::FEEDBACK,
                settings.feedback_increment,
            ),
            shrink: settings.feedback_shrink,
            stop_y: pos.y - settings.feedback_rise,
        }
    }
}

impl Behavior for PopFeedback {
    fn capabilities(&self) -> Capabilities {
        Capabilities::GAME
    }

    fn game_process(
        &mut self,
        _id: EntityId,
        frame: &mut Frame,
        _mask: &MotionMask,
        _ctx: &mut PhaseContext<'_>,
    ) -> Result<Flow, Fault> {
        self.body.rise();
        self.body.radius = (self.body.radius - self.shrink).max(1);
        draw::draw_ring(frame, self.body.pos, self.body.radius, self.body.color);
        if self.body.pos.y < self.stop_y {
            return Ok(Flow::Finished);
        }
        Ok(Flow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{ReferenceImage, empty_mask};
    use crate::sim::state::seeded_rng;
    use image::{Luma, Rgb};

    struct Rig {
        settings: Settings,
        reference: ReferenceImage,
        rng: SimRng,
        frame: Frame,
    }

    impl Rig {
        fn new() -> Self {
            let settings = Settings::default();
            let frame = Frame::from_pixel(800, 600, Rgb([128, 128, 128]));
            Self {
                reference: ReferenceImage::capture(&frame),
                rng: seeded_rng(5),
                settings,
                frame,
            }
        }
    }

    fn pops(events: &[GameEvent]) -> Vec<PopEvent> {
        events
            .iter()
            .filter_map(|e| match e {
                GameEvent::Pop(p) => Some(*p),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_group_falls_without_motion() {
        let mut rig = Rig::new();
        let mut group = BubbleGroup::new(&mut rig.rng, &rig.settings);
        assert_eq!(group.bubbles.len(), 10);
        let mask = empty_mask(800, 600);
        let before: Vec<i32> = group.bubbles.iter().map(|b| b.pos.y).collect();

        let mut ctx = PhaseContext::new(&rig.settings, &mut rig.reference, &mut rig.rng, 1);
        let flow = group.game_process(1, &mut rig.frame, &mask, &mut ctx).unwrap();
        assert_eq!(flow, Flow::Continue);
        assert!(ctx.events.is_empty());
        for (b, y0) in group.bubbles.iter().zip(before) {
            assert_eq!(b.pos.y, y0 + 12);
        }
    }

    #[test]
    fn test_group_pops_and_respawns_immediately() {
        let mut rig = Rig::new();
        let mut group = BubbleGroup::new(&mut rig.rng, &rig.settings);
        group.bubbles.truncate(1);
        group.bubbles[0].pos = IVec2::new(200, 300);
        let mut mask = empty_mask(800, 600);
        mask.put_pixel(200, 300, Luma([255]));

        let mut ctx = PhaseContext::new(&rig.settings, &mut rig.reference, &mut rig.rng, 1);
        group.game_process(9, &mut rig.frame, &mask, &mut ctx).unwrap();
        let popped = pops(&ctx.events);
        assert_eq!(popped.len(), 1);
        assert_eq!(popped[0].pos, IVec2::new(200, 300));
        assert_eq!(popped[0].kind, PopKind::Good);
        assert_eq!(popped[0].id, 9);
        assert!(group.bubbles[0].pos.y < 0);
        // Popped bubbles are not drawn that tick
        assert_eq!(rig.frame.get_pixel(200, 300), &Rgb([128, 128, 128]));
    }

    #[test]
    fn test_bad_bubble_pop_finishes_it() {
        let mut rig = Rig::new();
        let mut bad = AdversarialBubble::new(&mut rig.rng, &rig.settings, 20);
        bad.body.pos = IVec2::new(400, 300);
        let mut mask = empty_mask(800, 600);
        mask.put_pixel(405, 305, Luma([255]));

        let mut ctx = PhaseContext::new(&rig.settings, &mut rig.reference, &mut rig.rng, 1);
        let flow = bad.game_process(2, &mut rig.frame, &mask, &mut ctx).unwrap();
        assert_eq!(flow, Flow::Finished);
        assert_eq!(pops(&ctx.events)[0].kind, PopKind::Bad);
        assert!(bad.body.pos.y < 0);
    }

    #[test]
    fn test_bad_bubble_draws_when_falling() {
        let mut rig = Rig::new();
        let mut bad = AdversarialBubble::new(&mut rig.rng, &rig.settings, 20);
        bad.body.pos = IVec2::new(400, 300);
        let mask = empty_mask(800, 600);

        let mut ctx = PhaseContext::new(&rig.settings, &mut rig.reference, &mut rig.rng, 1);
        let flow = bad.game_process(2, &mut rig.frame, &mask, &mut ctx).unwrap();
        assert_eq!(flow, Flow::Continue);
        assert_eq!(bad.body.pos, IVec2::new(400, 312));
        assert_eq!(rig.frame.get_pixel(400, 312), &palette::BAD);
    }

    #[test]
    fn test_harder_grows_radius() {
        let mut rig = Rig::new();
        let mut bad = AdversarialBubble::new(&mut rig.rng, &rig.settings, 10);
        bad.harder(10);
        bad.harder(10);
        assert_eq!(bad.body.radius, 30);
    }

    #[test]
    fn test_feedback_rises_shrinks_and_expires() {
        let mut rig = Rig::new();
        let mut ring = PopFeedback::new(IVec2::new(100, 400), &rig.settings);
        let mask = empty_mask(800, 600);
        let mut ctx = PhaseContext::new(&rig.settings, &mut rig.reference, &mut rig.rng, 1);

        let mut ticks = 0;
        loop {
            ticks += 1;
            let flow = ring.game_process(3, &mut rig.frame, &mask, &mut ctx).unwrap();
            assert!(ring.body.radius >= 1);
            if flow == Flow::Finished {
                break;
            }
            assert!(ticks < 100);
        }
        // 8 px per tick: first above 325 after ten ticks
        assert_eq!(ticks, 10);
        assert_eq!(ring.body.radius, 10);
    }

    #[test]
    fn test_feedback_radius_floors_at_one() {
        let mut rig = Rig::new();
        let mut settings = rig.settings.clone();
        settings.feedback_radius = 3;
        settings.feedback_rise = 500;
        let mut ring = PopFeedback::new(IVec2::new(100, 590), &settings);
        let mask = empty_mask(800, 600);
        let mut ctx = PhaseContext::new(&settings, &mut rig.reference, &mut rig.rng, 1);
        for _ in 0..6 {
            let flow = ring.game_process(3, &mut rig.frame, &mask, &mut ctx).unwrap();
            assert_eq!(flow, Flow::Continue);
        }
        assert_eq!(ring.body.radius, 1);
    }
}
