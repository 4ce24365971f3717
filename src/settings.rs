//! Pipeline settings
//!
//! One flat options record, fixed at startup. The core never reads it from
//! disk; the native driver may load it from JSON.

use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Every tunable of the pipeline, the game and its effects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Frame ===
    pub frame_width: u32,
    pub frame_height: u32,
    /// Host tick rate; converts second/millisecond durations into ticks
    pub ticks_per_second: u32,
    /// Seed for every spawn position
    pub seed: u64,

    // === Motion detection ===
    /// Box blur window (pixels)
    pub motion_kernel: u32,
    /// Blurred difference above this becomes motion
    pub motion_threshold: u8,
    /// Mask value above this counts as a collision
    pub collision_threshold: u8,

    // === Good bubbles ===
    pub bubble_count: usize,
    pub bubble_radius: i32,
    /// Fall speed (px/tick)
    pub bubble_increment: i32,
    pub good_points: u32,

    // === Bad bubble ===
    pub bad_base_radius: i32,
    /// Radius growth per bad pop
    pub bad_radius_jump: i32,
    pub bad_increment: i32,
    pub bad_points: u32,
    /// Bad pops cost `bad_points * bad_multiplier`
    pub bad_multiplier: u32,

    // === Pop feedback ring ===
    pub feedback_radius: i32,
    pub feedback_increment: i32,
    pub feedback_shrink: i32,
    /// Distance risen before the ring disappears
    pub feedback_rise: i32,

    // === Mess burst ===
    pub burst_count: usize,
    pub burst_radius: i32,
    pub burst_rise: i32,
    pub burst_fade_step: f32,
    /// Lateral scatter window (px)
    pub burst_spread: i32,

    // === Smoosher (shrink mask effect) ===
    pub smoosher_radius: i32,
    pub smoosher_increment: i32,
    pub shrink_min_scale: f32,
    pub shrink_step: f32,
    pub grow_step: f32,
    pub shrink_hold_secs: u32,
    pub shrink_active_secs: u32,
    /// Delay between game start and the smoosher appearing
    pub smoosher_delay_secs: u32,

    // === Skeleton ===
    pub skeleton_max_passes: u32,

    // === Session ===
    pub game_secs: u32,
    pub prestart_secs: u32,
    /// Countdown used for the first game only
    pub startup_prestart_secs: u32,
    /// Camera stabilization delay before the first real reference capture
    pub reference_delay_ms: u64,
    /// Delay before the game session is created
    pub session_delay_ms: u64,
    /// Only detect motion and run effects; no game session
    pub video_only: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            frame_width: IMG_WIDTH,
            frame_height: IMG_HEIGHT,
            ticks_per_second: TICKS_PER_SECOND,
            seed: 0x0B0B_B1E5,

            motion_kernel: 20,
            motion_threshold: 20,
            collision_threshold: 1,

            bubble_count: 10,
            bubble_radius: 20,
            bubble_increment: IMG_HEIGHT as i32 / 48,
            good_points: 10,

            bad_base_radius: 10,
            bad_radius_jump: 10,
            bad_increment: IMG_HEIGHT as i32 / 48,
            bad_points: 10,
            bad_multiplier: 10,

            feedback_radius: 20,
            feedback_increment: 8,
            feedback_shrink: 1,
            feedback_rise: 75,

            burst_count: 50,
            burst_radius: 5,
            burst_rise: 5,
            burst_fade_step: 0.01,
            burst_spread: IMG_WIDTH as i32 / 8,

            smoosher_radius: 20,
            smoosher_increment: 8,
            shrink_min_scale: 0.25,
            shrink_step: 0.025,
            grow_step: 0.10,
            shrink_hold_secs: 3,
            shrink_active_secs: 6,
            smoosher_delay_secs: 3,

            skeleton_max_passes: 100,

            game_secs: 60,
            prestart_secs: 10,
            startup_prestart_secs: 3,
            reference_delay_ms: 1900,
            session_delay_ms: 2000,
            video_only: false,
        }
    }
}

impl Settings {
    /// Short countdowns and delays for trying things out
    pub fn debug() -> Self {
        Self::default().with_debug_timing()
    }

    /// Swap in the debug countdowns and delays, keeping everything else
    pub fn with_debug_timing(self) -> Self {
        Self {
            game_secs: 10,
            prestart_secs: 2,
            reference_delay_ms: 90,
            session_delay_ms: 100,
            smoosher_delay_secs: 1,
            ..self
        }
    }

    /// Defaults scaled to another frame size
    pub fn for_frame(width: u32, height: u32) -> Self {
        Self {
            frame_width: width,
            frame_height: height,
            bubble_increment: (height as i32 / 48).max(1),
            bad_increment: (height as i32 / 48).max(1),
            burst_spread: (width as i32 / 8).max(2),
            ..Self::default()
        }
    }

    pub fn frame_size(&self) -> (u32, u32) {
        (self.frame_width, self.frame_height)
    }

    /// Ticks covering `ms` milliseconds (at least one)
    pub fn ticks_for_ms(&self, ms: u64) -> u64 {
        let tps = self.ticks_per_second.max(1) as u64;
        (ms * tps).div_ceil(1000).max(1)
    }

    /// Ticks covering `secs` seconds (at least one)
    pub fn ticks_for_secs(&self, secs: u32) -> u64 {
        self.ticks_for_ms(secs as u64 * 1000)
    }

    /// Points lost on a bad pop
    pub fn bad_penalty(&self) -> u32 {
        self.bad_points * self.bad_multiplier
    }
}
