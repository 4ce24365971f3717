//! The green mess that sprays out of a popped bad bubble
//!
//! Particles scatter sideways from the pop point, rise and fade. The whole
//! burst is alpha blended with one shared opacity per tick, taken from the
//! last particle processed.

use glam::IVec2;
use rand::Rng;

use crate::error::Fault;
use crate::raster::{Frame, MotionMask, draw};
use crate::settings::Settings;

use super::collision::point_collides;
use super::entity::{Behavior, Capabilities, Flow, PhaseContext};
use super::state::{Body, EntityId, GameEvent, SimRng, palette};

/// Vertical scatter below the pop point: `1..MAX_DROP` px
const MAX_DROP: i32 = 5;

#[derive(Debug, Clone)]
pub struct ParticleBurst {
    pub particles: Vec<Body>,
    pub fade_step: f32,
}

impl ParticleBurst {
    /// Spray `settings.burst_count` particles around `origin`. The first half
    /// lands to the left, the rest to the right.
    pub fn new(rng: &mut SimRng, settings: &Settings, origin: IVec2) -> Self {
        let count = settings.burst_count;
        let spread = settings.burst_spread.max(2);
        let particles = (0..count)
            .map(|i| {
                let dx = rng.random_range(1..spread);
                let x = if i < count / 2 { origin.x - dx } else { origin.x + dx };
                let y = origin.y + rng.random_range(1..MAX_DROP);
                Body::new(
                    IVec2::new(x, y),
                    settings.burst_radius,
                    palette::MESS,
                    settings.burst_rise,
                )
            })
            .collect();
        Self {
            particles,
            fade_step: settings.burst_fade_step,
        }
    }

    pub fn visible_count(&self) -> usize {
        self.particles.iter().filter(|p| p.visible()).count()
    }
}

impl Behavior for ParticleBurst {
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
        let mut overlay = frame.clone();
        let mut any_visible = false;
        let mut shared_opacity = None;

        for particle in &mut self.particles {
            if !particle.visible() {
                continue;
            }
            // Hitting a particle has no effect yet; it keeps rising
            let _hit = point_collides(mask, particle.pos, ctx.settings.collision_threshold);
            particle.fade(self.fade_step);
            draw::fill_circle(&mut overlay, particle.pos, particle.radius, particle.color);
            any_visible = true;
            particle.rise();
            shared_opacity = Some(particle.opacity);
        }

        if let Some(opacity) = shared_opacity {
            draw::blend(frame, &overlay, opacity);
        }

        if !any_visible {
            let pos = self.particles.last().map(|p| p.pos).unwrap_or(IVec2::ZERO);
            log::debug!("mess burst {id} finished");
            ctx.emit(GameEvent::BurstDone { id, pos });
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
    use image::Rgb;

    #[test]
    fn test_scatter_left_then_right() {
        let settings = Settings::default();
        let mut rng = seeded_rng(3);
        let burst = ParticleBurst::new(&mut rng, &settings, IVec2::new(400, 300));
        assert_eq!(burst.particles.len(), 50);
        for (i, p) in burst.particles.iter().enumerate() {
            if i < 25 {
                assert!(p.pos.x < 400 && p.pos.x > 300);
            } else {
                assert!(p.pos.x > 400 && p.pos.x < 500);
            }
            assert!(p.pos.y > 300 && p.pos.y < 305);
            assert_eq!(p.increment, 5);
        }
    }

    #[test]
    fn test_burst_finishes_within_bound() {
        let settings = Settings::default();
        let mut rng = seeded_rng(11);
        let frame = Frame::from_pixel(800, 600, Rgb([40, 40, 40]));
        let mut reference = ReferenceImage::capture(&frame);
        let mut burst = ParticleBurst::new(&mut rng, &settings, IVec2::new(400, 590));
        let mask = empty_mask(800, 600);
        let bound = (600 + 110_u32).div_ceil(settings.burst_rise as u32);

        let mut ctx = PhaseContext::new(&settings, &mut reference, &mut rng, 1);
        let mut frame = frame;
        let mut ticks = 0;
        loop {
            ticks += 1;
            let flow = burst.game_process(4, &mut frame, &mask, &mut ctx).unwrap();
            if flow == Flow::Finished {
                break;
            }
            assert!(ticks <= bound, "burst still visible after {ticks} ticks");
        }
        assert!(ticks <= bound);
        assert!(matches!(ctx.events.last(), Some(GameEvent::BurstDone { id: 4, .. })));
        assert_eq!(burst.visible_count(), 0);
    }

    #[test]
    fn test_burst_blends_with_shared_opacity() {
        let settings = Settings::default();
        let mut rng = seeded_rng(2);
        let mut frame = Frame::from_pixel(800, 600, Rgb([0, 0, 0]));
        let mut reference = ReferenceImage::capture(&frame);
        let mut burst = ParticleBurst::new(&mut rng, &settings, IVec2::new(400, 300));
        let mask = empty_mask(800, 600);
        let first = burst.particles[0].pos;

        let mut ctx = PhaseContext::new(&settings, &mut reference, &mut rng, 1);
        burst.game_process(4, &mut frame, &mask, &mut ctx).unwrap();
        // Opacity after one fade step is 0.99: green blended at 99%
        assert_eq!(frame.get_pixel(first.x as u32, first.y as u32), &Rgb([0, 252, 0]));
        assert!(burst.particles.iter().all(|p| (p.opacity - 0.99).abs() < 1e-6));
    }
}
