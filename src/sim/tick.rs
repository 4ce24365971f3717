//! Per-tick pipeline driver
//!
//! `Bubbler` owns everything that lives between ticks: the reference image,
//! the three phase queues, the timer wheel, the game session and the RNG.
//! One call to `tick` consumes one camera frame:
//! - fit the frame to the configured size and fire due timers
//! - detect motion against the reference
//! - drain pre-process, game-process and post-process in that order,
//!   handling retired entities and emitted events after each drain
//! - report the drawn frame, the final mask and a HUD snapshot

use image::imageops::{self, FilterType};
use serde::Serialize;

use crate::raster::{Frame, MotionMask, ReferenceImage, empty_mask};
use crate::settings::Settings;

use super::bubbles::{AdversarialBubble, BubbleGroup, PopFeedback};
use super::burst::ParticleBurst;
use super::effects::{
    ContourFireEffect, FpsOverlay, ReferenceCapture, ShrinkMaskEffect, SkeletonizeEffect,
};
use super::entity::{Entity, EntityKind, PhaseContext};
use super::motion::MotionDetector;
use super::scheduler::{Phase, Scheduler};
use super::session::{GameSession, SessionSignal};
use super::state::{EntityId, GameEvent, PopEvent, PopKind, SimRng, seeded_rng};
use super::timers::{TimerEvent, TimerWheel};

/// Host key presses the pipeline understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    /// Re-acquire the reference image
    Reacquire,
    ToggleFps,
    ToggleFire,
    ToggleSkeleton,
    /// Drop an extra smoosher
    Smoosher,
    SkeletonUp,
    SkeletonDown,
    /// Abandon the current game and restart the countdown
    NewGame,
    Quit,
}

impl KeyCommand {
    pub const ESCAPE: u32 = 27;

    /// Map a host key code (character code, or 27 for Esc)
    pub fn from_key(key: u32) -> Option<Self> {
        if key == Self::ESCAPE {
            return Some(KeyCommand::Quit);
        }
        let command = match char::from_u32(key)? {
            'r' => KeyCommand::Reacquire,
            'f' => KeyCommand::ToggleFps,
            '1' => KeyCommand::ToggleFire,
            '2' => KeyCommand::ToggleSkeleton,
            's' => KeyCommand::Smoosher,
            'u' => KeyCommand::SkeletonUp,
            'd' => KeyCommand::SkeletonDown,
            'n' => KeyCommand::NewGame,
            'q' => KeyCommand::Quit,
            _ => return None,
        };
        Some(command)
    }
}

/// What the host should print over the frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Hud {
    /// Seconds until the game starts
    pub prestart: Option<u32>,
    /// Seconds of play left
    pub time_left: Option<u32>,
    pub score: Option<u32>,
    pub fps: Option<f32>,
}

/// Result of one tick
#[derive(Debug, Clone)]
pub struct TickOutput {
    pub frame: Frame,
    pub mask: MotionMask,
    pub hud: Hud,
}

pub struct Bubbler {
    settings: Settings,
    detector: MotionDetector,
    reference: ReferenceImage,
    has_reference: bool,
    rng: SimRng,
    scheduler: Scheduler,
    timers: TimerWheel,
    session: Option<GameSession>,
    tick: u64,
    next_id: EntityId,
    bubbles: Option<EntityId>,
    adversary: Option<EntityId>,
    /// Popped adversary, waiting for its mess burst to play out
    parked: Option<Entity>,
    /// The burst the parked adversary is waiting on
    mess: Option<EntityId>,
    fire: Option<EntityId>,
    skeleton: Option<EntityId>,
    fps_overlay: Option<EntityId>,
    skeleton_passes: u32,
    fps: Option<f32>,
    quit: bool,
}

impl Bubbler {
    pub fn new(settings: Settings) -> Self {
        let (width, height) = settings.frame_size();
        let mut timers = TimerWheel::new();
        timers.schedule(
            settings.ticks_for_ms(settings.reference_delay_ms),
            TimerEvent::CaptureReference,
            None,
        );
        if settings.video_only {
            log::info!("video only: no game session");
        } else {
            timers.schedule(
                settings.ticks_for_ms(settings.session_delay_ms),
                TimerEvent::CreateSession,
                None,
            );
        }
        log::info!(
            "bubbler {width}x{height} @ {} ticks/s, seed {:#x}",
            settings.ticks_per_second,
            settings.seed
        );

        Self {
            detector: MotionDetector::from_settings(&settings),
            reference: ReferenceImage::capture(&Frame::new(width, height)),
            has_reference: false,
            rng: seeded_rng(settings.seed),
            scheduler: Scheduler::new(),
            timers,
            session: None,
            tick: 0,
            next_id: 1,
            bubbles: None,
            adversary: None,
            parked: None,
            mess: None,
            fire: None,
            skeleton: None,
            fps_overlay: None,
            skeleton_passes: settings.skeleton_max_passes.max(1),
            fps: None,
            quit: false,
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn session(&self) -> Option<&GameSession> {
        self.session.as_ref()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn reference(&self) -> &ReferenceImage {
        &self.reference
    }

    pub fn has_reference(&self) -> bool {
        self.has_reference
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn skeleton_passes(&self) -> u32 {
        self.skeleton_passes
    }

    pub fn is_running(&self) -> bool {
        self.session.as_ref().is_some_and(GameSession::is_running)
    }

    /// Quit was requested
    pub fn should_quit(&self) -> bool {
        self.quit
    }

    fn epoch(&self) -> u64 {
        self.session.as_ref().map_or(0, |s| s.epoch)
    }

    fn next_entity_id(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn enroll(&mut self, phase: Phase, entity: Entity) -> Option<EntityId> {
        let id = entity.id;
        self.scheduler.enroll(phase, entity).ok().map(|()| id)
    }

    /// Fire `event` `ticks` from now
    fn after(&mut self, ticks: u64, event: TimerEvent, session_scoped: bool) {
        let epoch = session_scoped.then(|| self.epoch());
        self.timers.schedule(self.tick + ticks, event, epoch);
    }

    /// Run one frame through the pipeline
    pub fn tick(&mut self, frame: Frame) -> TickOutput {
        self.tick += 1;
        let mut frame = self.fit_frame(frame);

        if !self.has_reference {
            log::info!("no reference yet, using the first frame");
            self.reference = ReferenceImage::capture(&frame);
            self.has_reference = true;
        }

        // One at a time: a timer can end the session and cancel the rest
        while let Some(timer) = self.timers.pop_next_due(self.tick) {
            if timer.is_stale(self.epoch()) {
                log::debug!("dropping stale {:?} from an older game", timer.event);
                continue;
            }
            self.on_timer(timer.event);
        }

        let mut mask = match self.detector.detect(&frame, &self.reference.gray) {
            Ok(mask) => mask,
            Err(fault) => {
                log::error!("motion detection: {fault}");
                empty_mask(frame.width(), frame.height())
            }
        };

        for phase in Phase::ALL {
            let mut ctx =
                PhaseContext::new(&self.settings, &mut self.reference, &mut self.rng, self.tick);
            let report = self.scheduler.run_phase(phase, &mut frame, &mut mask, &mut ctx);
            let (events, fps) = (ctx.events, ctx.fps);

            if phase == Phase::Post && self.fps_overlay.is_some() {
                self.fps = fps;
            }
            self.on_retired(phase, report.retired);
            self.on_events(events);
        }

        TickOutput {
            frame,
            mask,
            hud: self.hud(),
        }
    }

    /// Frames from the host are resized to the configured dimensions
    fn fit_frame(&self, frame: Frame) -> Frame {
        let (width, height) = self.settings.frame_size();
        if frame.dimensions() == (width, height) {
            return frame;
        }
        if frame.width() == 0 || frame.height() == 0 {
            log::warn!("empty frame from host, substituting black");
            return Frame::new(width, height);
        }
        log::trace!(
            "resizing {}x{} frame to {width}x{height}",
            frame.width(),
            frame.height()
        );
        imageops::resize(&frame, width, height, FilterType::Triangle)
    }

    pub fn hud(&self) -> Hud {
        match &self.session {
            Some(session) => Hud {
                prestart: session.prestart_left(),
                time_left: session.time_left(),
                score: Some(session.score),
                fps: self.fps,
            },
            None => Hud {
                fps: self.fps,
                ..Hud::default()
            },
        }
    }

    pub fn on_key(&mut self, command: KeyCommand) {
        match command {
            KeyCommand::Reacquire => self.capture_reference(),
            KeyCommand::ToggleFps => {
                self.fps_overlay = self.toggle(
                    Phase::Post,
                    self.fps_overlay,
                    EntityKind::Fps(FpsOverlay::default()),
                );
                if self.fps_overlay.is_none() {
                    self.fps = None;
                }
            }
            KeyCommand::ToggleFire => {
                self.fire = self.toggle(
                    Phase::Pre,
                    self.fire,
                    EntityKind::Fire(ContourFireEffect::default()),
                );
            }
            KeyCommand::ToggleSkeleton => {
                self.skeleton = self.toggle(
                    Phase::Pre,
                    self.skeleton,
                    EntityKind::Skeleton(SkeletonizeEffect::new(self.skeleton_passes)),
                );
            }
            KeyCommand::Smoosher => self.spawn_smoosher(),
            KeyCommand::SkeletonUp => self.adjust_skeleton(1),
            KeyCommand::SkeletonDown => self.adjust_skeleton(-1),
            KeyCommand::NewGame => self.new_game(),
            KeyCommand::Quit => {
                log::info!("quit requested");
                self.quit = true;
            }
        }
    }

    /// Remove `current` from `phase` if set, otherwise enroll `kind`
    fn toggle(
        &mut self,
        phase: Phase,
        current: Option<EntityId>,
        kind: EntityKind,
    ) -> Option<EntityId> {
        if let Some(id) = current {
            self.scheduler.remove_where(phase, |e| e.id == id);
            log::info!("{} off", kind.name());
            return None;
        }
        log::info!("{} on", kind.name());
        let id = self.next_entity_id();
        self.enroll(phase, Entity::new(id, kind))
    }

    fn adjust_skeleton(&mut self, delta: i32) {
        let passes = self.skeleton_passes.saturating_add_signed(delta).max(1);
        self.skeleton_passes = passes;
        log::info!("skeleton passes: {passes}");
        if let Some(id) = self.skeleton
            && let Some(Entity {
                kind: EntityKind::Skeleton(effect),
                ..
            }) = self.scheduler.find_mut(Phase::Pre, id)
        {
            effect.max_passes = passes;
        }
    }

    fn capture_reference(&mut self) {
        let id = self.next_entity_id();
        self.enroll(
            Phase::Pre,
            Entity::one_shot(id, EntityKind::Reference(ReferenceCapture)),
        );
    }

    fn new_game(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        log::info!("new game");
        if session.restart() == Some(SessionSignal::Stop) {
            self.stop_game();
        }
    }

    fn on_timer(&mut self, event: TimerEvent) {
        match event {
            TimerEvent::CaptureReference => self.capture_reference(),
            TimerEvent::CreateSession => self.create_session(),
            TimerEvent::SessionSecond => self.session_second(),
            TimerEvent::SpawnSmoosher => self.spawn_smoosher(),
            TimerEvent::ShrinkGrow { id } => match self.scheduler.find_mut(Phase::Pre, id) {
                Some(Entity {
                    kind: EntityKind::Shrink(effect),
                    ..
                }) => effect.begin_growing(),
                _ => log::debug!("smoosher #{id} is gone, nothing to grow"),
            },
            TimerEvent::ShrinkExpire { id } => match self.scheduler.find_mut(Phase::Pre, id) {
                Some(entity) if matches!(entity.kind, EntityKind::Shrink(_)) => {
                    log::info!("smoosher #{id} wears off");
                    entity.continuous = false;
                }
                _ => log::debug!("smoosher #{id} is gone, nothing to expire"),
            },
        }
    }

    fn create_session(&mut self) {
        if self.session.is_some() || self.settings.video_only {
            return;
        }
        let session = GameSession::new(&self.settings);
        log::info!(
            "session created, first game in {}s",
            self.settings.startup_prestart_secs
        );
        self.session = Some(session);
        self.after(self.settings.ticks_for_secs(1), TimerEvent::SessionSecond, false);
    }

    fn session_second(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let signal = session.second_elapsed();
        self.after(self.settings.ticks_for_secs(1), TimerEvent::SessionSecond, false);
        match signal {
            Some(SessionSignal::Start) => self.start_game(),
            Some(SessionSignal::Stop) => self.stop_game(),
            None => {}
        }
    }

    fn start_game(&mut self) {
        let Some(radius) = self.session.as_ref().map(|s| s.bad_radius) else {
            return;
        };
        let id = self.next_entity_id();
        let group = BubbleGroup::new(&mut self.rng, &self.settings);
        self.bubbles = self.enroll(Phase::Game, Entity::new(id, EntityKind::Bubbles(group)));

        let id = self.next_entity_id();
        let bad = AdversarialBubble::new(&mut self.rng, &self.settings, radius);
        self.adversary = self.enroll(Phase::Game, Entity::new(id, EntityKind::Adversary(bad)));

        let delay = self.settings.ticks_for_secs(self.settings.smoosher_delay_secs);
        self.after(delay, TimerEvent::SpawnSmoosher, true);
    }

    fn stop_game(&mut self) {
        let cleared = self.scheduler.clear(Phase::Game).len();
        let smooshers = self
            .scheduler
            .remove_where(Phase::Pre, |e| matches!(e.kind, EntityKind::Shrink(_)))
            .len();
        log::info!("game stopped: cleared {cleared} game entities, {smooshers} active smooshers");
        self.timers.cancel(TimerEvent::SpawnSmoosher);
        self.bubbles = None;
        self.adversary = None;
        self.parked = None;
        self.mess = None;
    }

    fn spawn_smoosher(&mut self) {
        let id = self.next_entity_id();
        let effect = ShrinkMaskEffect::new(&mut self.rng, &self.settings);
        if self
            .enroll(Phase::Game, Entity::new(id, EntityKind::Shrink(effect)))
            .is_some()
        {
            log::info!("smoosher #{id} incoming");
        }
    }

    /// Entities that dropped out of `phase`'s queue this tick
    fn on_retired(&mut self, phase: Phase, retired: Vec<Entity>) {
        for mut entity in retired {
            let id = entity.id;
            let is_smoosher = matches!(entity.kind, EntityKind::Shrink(_));
            match phase {
                Phase::Game if matches!(entity.kind, EntityKind::Adversary(_)) => {
                    log::debug!("bad bubble #{id} parked");
                    self.parked = Some(entity);
                }
                Phase::Game if is_smoosher => {
                    entity.enabled = true;
                    entity.continuous = true;
                    if self.enroll(Phase::Pre, entity).is_some() {
                        let active = self.settings.ticks_for_secs(self.settings.shrink_active_secs);
                        self.after(active, TimerEvent::ShrinkExpire { id }, true);
                    }
                }
                Phase::Pre if is_smoosher => self.rearm_smoosher(entity),
                _ => log::trace!("{} #{id} retired", entity.kind.name()),
            }
        }
    }

    /// A smoosher that wore off goes back to falling, if there is a game
    fn rearm_smoosher(&mut self, mut entity: Entity) {
        let id = entity.id;
        self.timers.cancel(TimerEvent::ShrinkGrow { id });
        if !self.is_running() {
            return;
        }
        if let EntityKind::Shrink(effect) = &mut entity.kind {
            effect.rearm(&mut self.rng, self.settings.frame_size());
        }
        entity.enabled = true;
        entity.continuous = true;
        log::debug!("smoosher #{id} re-armed");
        self.enroll(Phase::Game, entity);
    }

    fn on_events(&mut self, events: Vec<GameEvent>) {
        for event in events {
            match event {
                GameEvent::Pop(pop) => self.on_pop(pop),
                GameEvent::BurstDone { id, .. } => self.release_adversary(id),
                GameEvent::ShrinkFloorReached { id } => {
                    let hold = self.settings.ticks_for_secs(self.settings.shrink_hold_secs);
                    self.after(hold, TimerEvent::ShrinkGrow { id }, true);
                }
                GameEvent::ReferenceCaptured => self.has_reference = true,
            }
        }
    }

    fn on_pop(&mut self, pop: PopEvent) {
        if let Some(session) = self.session.as_mut() {
            session.score_pop(pop.kind);
        }
        match pop.kind {
            PopKind::Good => {
                log::debug!("pop at ({}, {})", pop.pos.x, pop.pos.y);
                let id = self.next_entity_id();
                let ring = PopFeedback::new(pop.pos, &self.settings);
                self.enroll(Phase::Game, Entity::new(id, EntityKind::Feedback(ring)));
            }
            PopKind::Bad => {
                log::info!(
                    "bad bubble popped, score {}",
                    self.session.as_ref().map_or(0, |s| s.score)
                );
                if let Some(jump) = self.session.as_mut().map(GameSession::harder)
                    && let Some(Entity {
                        id,
                        kind: EntityKind::Adversary(bad),
                        ..
                    }) = self.parked.as_mut()
                    && *id == pop.id
                {
                    bad.harder(jump);
                }
                let id = self.next_entity_id();
                let burst = ParticleBurst::new(&mut self.rng, &self.settings, pop.pos);
                self.mess = self.enroll(Phase::Game, Entity::new(id, EntityKind::Burst(burst)));
            }
            PopKind::Smoosher => log::info!("smoosher #{} popped", pop.id),
        }
    }

    /// The mess is gone: put the adversary back in play
    fn release_adversary(&mut self, burst: EntityId) {
        if self.mess != Some(burst) {
            return;
        }
        self.mess = None;
        let Some(mut bad) = self.parked.take() else {
            return;
        };
        if self.is_running() {
            bad.enabled = true;
            self.adversary = self.enroll(Phase::Game, bad);
        }
    }
}
