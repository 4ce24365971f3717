//! Per-tick simulation pipeline
//!
//! Everything between "a frame arrived" and "here is the drawn frame":
//! - Deterministic for a given seed and frame sequence (seeded RNG only,
//!   stable queue order, timers counted in ticks)
//! - No camera, window or text rendering dependencies

pub mod bubbles;
pub mod burst;
pub mod collision;
pub mod effects;
pub mod entity;
pub mod motion;
pub mod scheduler;
pub mod session;
pub mod state;
pub mod tick;
pub mod timers;

pub use bubbles::{AdversarialBubble, BubbleGroup, PopFeedback};
pub use burst::ParticleBurst;
pub use collision::{area_collides, point_collides};
pub use effects::{
    ContourFireEffect, FpsOverlay, ReferenceCapture, ScaleMode, ShrinkMaskEffect,
    SkeletonizeEffect,
};
pub use entity::{Behavior, Capabilities, Entity, EntityKind, Flow, PhaseContext};
pub use motion::MotionDetector;
pub use scheduler::{Phase, PhaseReport, Scheduler};
pub use session::{Countdown, GameSession, SessionSignal};
pub use state::{Body, EntityId, GameEvent, PopEvent, PopKind};
pub use tick::{Bubbler, Hud, KeyCommand, TickOutput};
pub use timers::{TimerEvent, TimerWheel};
