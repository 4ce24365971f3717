//! The three ordered work queues and the per-tick drain
//!
//! Each tick the bubbler drains pre-process, then game-process, then
//! post-process, in enrollment order. Draining a queue works on a snapshot:
//! every item runs once, then goes back to the tail if it is still wanted
//! (`continuous` for pre-process, `enabled` for the other two) or is handed
//! back to the caller as retired.

use std::collections::VecDeque;
use std::mem;

use crate::error::Fault;
use crate::raster::{Frame, MotionMask};

use super::entity::{Entity, PhaseContext};
use super::state::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Pre,
    Game,
    Post,
}

impl Phase {
    /// Drain order within a tick
    pub const ALL: [Phase; 3] = [Phase::Pre, Phase::Game, Phase::Post];

    pub fn name(self) -> &'static str {
        match self {
            Phase::Pre => "pre-process",
            Phase::Game => "game-process",
            Phase::Post => "post-process",
        }
    }
}

/// Outcome of draining one queue
#[derive(Debug, Default)]
pub struct PhaseReport {
    /// The entity that faulted, if any. Items after it were not run.
    pub fault: Option<(EntityId, Fault)>,
    /// Items that dropped out of the queue this drain
    pub retired: Vec<Entity>,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    pre: VecDeque<Entity>,
    game: VecDeque<Entity>,
    post: VecDeque<Entity>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn queue(&self, phase: Phase) -> &VecDeque<Entity> {
        match phase {
            Phase::Pre => &self.pre,
            Phase::Game => &self.game,
            Phase::Post => &self.post,
        }
    }

    fn queue_mut(&mut self, phase: Phase) -> &mut VecDeque<Entity> {
        match phase {
            Phase::Pre => &mut self.pre,
            Phase::Game => &mut self.game,
            Phase::Post => &mut self.post,
        }
    }

    /// Append to `phase`'s queue. Entities without that phase method are
    /// refused and handed back.
    pub fn enroll(&mut self, phase: Phase, entity: Entity) -> Result<(), Entity> {
        if !entity.capabilities().supports(phase) {
            log::warn!(
                "{} #{} has no {} step, not enrolled",
                entity.kind.name(),
                entity.id,
                phase.name()
            );
            return Err(entity);
        }
        log::debug!("enroll {} #{} in {}", entity.kind.name(), entity.id, phase.name());
        self.queue_mut(phase).push_back(entity);
        Ok(())
    }

    /// Run every queued item of `phase` once, in order
    ///
    /// A fault stops the drain: it is logged, the faulting item is kept or
    /// retired by its flags like any other, and the items it never reached
    /// stay queued ahead of the ones that already ran.
    pub fn run_phase(
        &mut self,
        phase: Phase,
        frame: &mut Frame,
        mask: &mut MotionMask,
        ctx: &mut PhaseContext<'_>,
    ) -> PhaseReport {
        let mut pending = mem::take(self.queue_mut(phase)).into_iter();
        let mut kept = VecDeque::new();
        let mut report = PhaseReport::default();

        while let Some(mut entity) = pending.next() {
            let outcome = entity.run(phase, frame, mask, ctx);
            let id = entity.id;
            let name = entity.kind.name();
            if entity.reenrolls(phase) {
                kept.push_back(entity);
            } else {
                log::trace!("{name} #{id} leaves the {} queue", phase.name());
                report.retired.push(entity);
            }
            if let Err(fault) = outcome {
                log::error!("tick {}: {name} #{id} failed in {}: {fault}", ctx.tick, phase.name());
                report.fault = Some((id, fault));
                break;
            }
        }

        let queue = self.queue_mut(phase);
        queue.extend(pending);
        queue.extend(kept);
        report
    }

    pub fn find_mut(&mut self, phase: Phase, id: EntityId) -> Option<&mut Entity> {
        self.queue_mut(phase).iter_mut().find(|e| e.id == id)
    }

    pub fn contains(&self, phase: Phase, id: EntityId) -> bool {
        self.queue(phase).iter().any(|e| e.id == id)
    }

    pub fn len(&self, phase: Phase) -> usize {
        self.queue(phase).len()
    }

    pub fn is_empty(&self) -> bool {
        Phase::ALL.iter().all(|&p| self.queue(p).is_empty())
    }

    /// Queue order, for logging and tests
    pub fn ids(&self, phase: Phase) -> Vec<EntityId> {
        self.queue(phase).iter().map(|e| e.id).collect()
    }

    /// Variant names in queue order
    pub fn names(&self, phase: Phase) -> Vec<&'static str> {
        self.queue(phase).iter().map(|e| e.kind.name()).collect()
    }

    /// Take every item out of `phase`'s queue
    pub fn clear(&mut self, phase: Phase) -> Vec<Entity> {
        self.queue_mut(phase).drain(..).collect()
    }

    /// Take out the items matching `pred`, keeping the order of the rest
    pub fn remove_where(
        &mut self,
        phase: Phase,
        mut pred: impl FnMut(&Entity) -> bool,
    ) -> Vec<Entity> {
        let queue = self.queue_mut(phase);
        let (removed, kept): (Vec<Entity>, Vec<Entity>) = queue.drain(..).partition(|e| pred(e));
        queue.extend(kept);
        removed
    }
}
