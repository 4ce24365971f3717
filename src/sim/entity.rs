//! Entities and their per-phase capability contract
//!
//! Every variant implements `Behavior` for the phases it takes part in; the
//! remaining phase methods are no-ops. `Entity` wraps a variant with its
//! queue bookkeeping (`enabled`, `continuous`) and dispatches by tag.

use crate::error::Fault;
use crate::raster::{Frame, MotionMask, ReferenceImage};
use crate::settings::Settings;

use super::bubbles::{AdversarialBubble, BubbleGroup, PopFeedback};
use super::burst::ParticleBurst;
use super::effects::{
    ContourFireEffect, FpsOverlay, ReferenceCapture, ShrinkMaskEffect, SkeletonizeEffect,
};
use super::scheduler::Phase;
use super::state::{EntityId, GameEvent, SimRng};

/// Which phase methods a variant actually implements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub pre_process: bool,
    pub game_process: bool,
    pub post_process: bool,
}

impl Capabilities {
    pub const PRE: Self = Self {
        pre_process: true,
        game_process: false,
        post_process: false,
    };
    pub const GAME: Self = Self {
        pre_process: false,
        game_process: true,
        post_process: false,
    };
    pub const POST: Self = Self {
        pre_process: false,
        game_process: false,
        post_process: true,
    };

    pub fn supports(&self, phase: Phase) -> bool {
        match phase {
            Phase::Pre => self.pre_process,
            Phase::Game => self.game_process,
            Phase::Post => self.post_process,
        }
    }
}

/// What a phase method wants done with its entity afterwards
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Leave the entity's flags alone
    Continue,
    /// Done with this phase: clears `enabled` (game/post) or `continuous` (pre)
    Finished,
}

/// Per-tick state lent to each entity while it runs
pub struct PhaseContext<'a> {
    pub settings: &'a Settings,
    pub reference: &'a mut ReferenceImage,
    pub rng: &'a mut SimRng,
    /// Events raised during the phase, consumed after the drain
    pub events: Vec<GameEvent>,
    /// Latest measured frame rate, published by the FPS overlay
    pub fps: Option<f32>,
    /// Tick being drained, for log lines
    pub tick: u64,
}

impl<'a> PhaseContext<'a> {
    pub fn new(
        settings: &'a Settings,
        reference: &'a mut ReferenceImage,
        rng: &'a mut SimRng,
        tick: u64,
    ) -> Self {
        Self {
            settings,
            reference,
            rng,
            events: Vec::new(),
            fps: None,
            tick,
        }
    }

    pub fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Configured (width, height)
    pub fn bounds(&self) -> (u32, u32) {
        self.settings.frame_size()
    }
}

/// Phase methods. Pre-process entities may rewrite the frame and replace the
/// mask wholesale; later entities see the result.
pub trait Behavior {
    fn capabilities(&self) -> Capabilities;

    fn pre_process(
        &mut self,
        _id: EntityId,
        _frame: &mut Frame,
        _mask: &mut MotionMask,
        _ctx: &mut PhaseContext<'_>,
    ) -> Result<Flow, Fault> {
        Ok(Flow::Continue)
    }

    fn game_process(
        &mut self,
        _id: EntityId,
        _frame: &mut Frame,
        _mask: &MotionMask,
        _ctx: &mut PhaseContext<'_>,
    ) -> Result<Flow, Fault> {
        Ok(Flow::Continue)
    }

    fn post_process(
        &mut self,
        _id: EntityId,
        _frame: &mut Frame,
        _mask: &MotionMask,
        _ctx: &mut PhaseContext<'_>,
    ) -> Result<Flow, Fault> {
        Ok(Flow::Continue)
    }
}

/// Variant tag
#[derive(Debug, Clone)]
pub enum EntityKind {
    Bubbles(BubbleGroup),
    Adversary(AdversarialBubble),
    Burst(ParticleBurst),
    Feedback(PopFeedback),
    Shrink(ShrinkMaskEffect),
    Skeleton(SkeletonizeEffect),
    Fire(ContourFireEffect),
    Reference(ReferenceCapture),
    Fps(FpsOverlay),
}

impl EntityKind {
    fn behavior_ref(&self) -> &dyn Behavior {
        match self {
            EntityKind::Bubbles(b) => b,
            EntityKind::Adversary(b) => b,
            EntityKind::Burst(b) => b,
            EntityKind::Feedback(b) => b,
            EntityKind::Shrink(b) => b,
            EntityKind::Skeleton(b) => b,
            EntityKind::Fire(b) => b,
            EntityKind::Reference(b) => b,
            EntityKind::Fps(b) => b,
        }
    }

    fn behavior(&mut self) -> &mut dyn Behavior {
        match self {
            EntityKind::Bubbles(b) => b,
            EntityKind::Adversary(b) => b,
            EntityKind::Burst(b) => b,
            EntityKind::Feedback(b) => b,
            EntityKind::Shrink(b) => b,
            EntityKind::Skeleton(b) => b,
            EntityKind::Fire(b) => b,
            EntityKind::Reference(b) => b,
            EntityKind::Fps(b) => b,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EntityKind::Bubbles(_) => "bubbles",
            EntityKind::Adversary(_) => "bad bubble",
            EntityKind::Burst(_) => "mess burst",
            EntityKind::Feedback(_) => "pop feedback",
            EntityKind::Shrink(_) => "smoosher",
            EntityKind::Skeleton(_) => "skeleton",
            EntityKind::Fire(_) => "contour fire",
            EntityKind::Reference(_) => "reference capture",
            EntityKind::Fps(_) => "fps overlay",
        }
    }
}

/// A queued work item
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    /// Game/post items are dropped at the end of the tick once this clears
    pub enabled: bool,
    /// Pre-process items re-enroll every tick while this is set
    pub continuous: bool,
    pub kind: EntityKind,
}

impl Entity {
    /// Enabled, and continuous (so it also persists in the pre-process queue)
    pub fn new(id: EntityId, kind: EntityKind) -> Self {
        Self {
            id,
            enabled: true,
            continuous: true,
            kind,
        }
    }

    /// Runs once in the pre-process queue
    pub fn one_shot(id: EntityId, kind: EntityKind) -> Self {
        Self {
            continuous: false,
            ..Self::new(id, kind)
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        self.kind.behavior_ref().capabilities()
    }

    /// Run the phase method for `phase` and apply the returned flow
    pub fn run(
        &mut self,
        phase: Phase,
        frame: &mut Frame,
        mask: &mut MotionMask,
        ctx: &mut PhaseContext<'_>,
    ) -> Result<(), Fault> {
        let id = self.id;
        let behavior = self.kind.behavior();
        let flow = match phase {
            Phase::Pre => behavior.pre_process(id, frame, mask, ctx)?,
            Phase::Game => behavior.game_process(id, frame, mask, ctx)?,
            Phase::Post => behavior.post_process(id, frame, mask, ctx)?,
        };
        if flow == Flow::Finished {
            match phase {
                Phase::Pre => self.continuous = false,
                Phase::Game | Phase::Post => self.enabled = false,
            }
        }
        Ok(())
    }

    /// Whether the entity goes back into `phase`'s queue after running
    pub fn reenrolls(&self, phase: Phase) -> bool {
        match phase {
            Phase::Pre => self.continuous,
            Phase::Game | Phase::Post => self.enabled,
        }
    }
}
