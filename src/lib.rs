//! Bubbler - a motion-reactive bubble popping game
//!
//! A video source feeds one frame per tick. The pipeline differences it
//! against a reference image to get a motion mask, then runs three phase
//! queues of entities over the (frame, mask) pair:
//! pre-process effects that may rewrite both, game entities that collide with
//! the mask and draw, and post-process overlays.
//!
//! Core modules:
//! - `raster`: Frame / MotionMask / ReferenceImage, drawing and morphology
//! - `sim`: Motion detection, entities, phase scheduler, timers, game session
//! - `settings`: The flat options record
//!
//! Camera capture, windows, key polling and text rendering belong to the host.

pub mod error;
pub mod raster;
pub mod settings;
pub mod sim;

pub use error::Fault;
pub use raster::{Frame, MotionMask, ReferenceImage};
pub use settings::Settings;
pub use sim::{Bubbler, KeyCommand, TickOutput};

/// Game configuration constants
pub mod consts {
    /// Default frame dimensions
    pub const IMG_WIDTH: u32 = 800;
    pub const IMG_HEIGHT: u32 = 600;

    /// Host tick rate assumed when converting durations to ticks
    pub const TICKS_PER_SECOND: u32 = 30;

    /// Bubbles re-enter from at least this far above the frame
    pub const SPAWN_CLEARANCE: i32 = 10;
    /// Minimum extra "approach distance" above the frame for a new spawn
    pub const MIN_APPROACH: i32 = 100;

    /// Shrunken composites shorter than this are lifted clear of the HUD text
    pub const SHRINK_LIFT_BELOW: u32 = 200;
    pub const SHRINK_LIFT: i64 = 20;

    /// Outline width for motion contours
    pub const CONTOUR_THICKNESS: i32 = 3;
}
