//! Shared simulation types
//!
//! The common body every moving entity carries, the events entities emit
//! during a phase, and the seeded RNG they draw spawn positions from.

use glam::IVec2;
use image::Rgb;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::consts::{MIN_APPROACH, SPAWN_CLEARANCE};

/// Stable handle for an entity while it moves between queues
pub type EntityId = u32;

/// RNG used for every spawn decision
pub type SimRng = Pcg32;

pub fn seeded_rng(seed: u64) -> SimRng {
    Pcg32::seed_from_u64(seed)
}

/// Palette (RGB)
pub mod palette {
    use image::Rgb;

    pub const GOOD: Rgb<u8> = Rgb([0, 0, 255]);
    pub const BAD: Rgb<u8> = Rgb([255, 0, 0]);
    pub const MESS: Rgb<u8> = Rgb([0, 255, 0]);
    pub const SMOOSHER: Rgb<u8> = Rgb([0, 255, 0]);
    pub const FEEDBACK: Rgb<u8> = Rgb([0, 0, 255]);
    pub const CONTOUR: Rgb<u8> = Rgb([255, 255, 128]);
}

/// Position, size and look shared by every moving entity
///
/// `pos.y` may be negative: the body is above the frame and still has to
/// fall into view.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub pos: IVec2,
    pub radius: i32,
    pub color: Rgb<u8>,
    pub opacity: f32,
    /// Vertical speed (px/tick)
    pub increment: i32,
}

impl Body {
    pub fn new(pos: IVec2, radius: i32, color: Rgb<u8>, increment: i32) -> Self {
        Self {
            pos,
            radius,
            color,
            opacity: 1.0,
            increment,
        }
    }

    /// New body at a random spawn point above the frame
    pub fn spawn(
        rng: &mut SimRng,
        bounds: (u32, u32),
        radius: i32,
        color: Rgb<u8>,
        increment: i32,
    ) -> Self {
        let mut body = Self::new(IVec2::ZERO, radius, color, increment);
        body.respawn(rng, bounds);
        body
    }

    /// Jump to a random x and a random start height above the frame
    pub fn respawn(&mut self, rng: &mut SimRng, (width, height): (u32, u32)) {
        self.pos.x = rng.random_range(0..width.max(1) as i32);
        self.pos.y = spawn_height(rng, height);
    }

    /// Fall one step; past the bottom edge (plus radius, so large bodies
    /// leave the screen entirely) wrap to a new spawn. Returns true on wrap.
    pub fn fall(&mut self, rng: &mut SimRng, bounds: (u32, u32)) -> bool {
        self.pos.y += self.increment;
        if self.pos.y > bounds.1 as i32 + self.radius {
            self.respawn(rng, bounds);
            return true;
        }
        false
    }

    /// Rise one step
    pub fn rise(&mut self) {
        self.pos.y -= self.increment;
    }

    /// Fade by `step`; once fully transparent, park the body above the frame
    pub fn fade(&mut self, step: f32) {
        self.opacity -= step;
        if self.opacity < 0.0 {
            self.pos.y = -SPAWN_CLEARANCE;
        }
    }

    /// On screen or below it (not parked above the frame)
    pub fn visible(&self) -> bool {
        self.pos.y >= 0
    }
}

/// Negative start height: clearance plus a random approach distance
fn spawn_height(rng: &mut SimRng, height: u32) -> i32 {
    let top = (height as i32).max(MIN_APPROACH + 1);
    -SPAWN_CLEARANCE - rng.random_range(MIN_APPROACH..top)
}

/// Who got popped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopKind {
    /// One of the falling blue bubbles
    Good,
    /// The red bubble
    Bad,
    /// The green smoosher square
    Smoosher,
}

/// A collision with the motion mask
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopEvent {
    pub id: EntityId,
    pub pos: IVec2,
    pub kind: PopKind,
}

/// Signals emitted by entities during a phase, consumed after the drain
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    Pop(PopEvent),
    /// A mess burst has no visible particles left
    BurstDone { id: EntityId, pos: IVec2 },
    /// A shrink effect reached its smallest scale and starts holding
    ShrinkFloorReached { id: EntityId },
    /// A new reference image was captured
    ReferenceCaptured,
}
