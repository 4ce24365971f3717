//! Game session: score, countdown and difficulty
//!
//! The countdown advances once per second from a timer. Prestart counts
//! down to the start of a game; Running counts down to its end, at which
//! point score and difficulty reset and the next prestart begins.

use crate::settings::Settings;

use super::state::PopKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Countdown {
    /// Seconds until the game starts
    Prestart { remaining: u32 },
    /// Seconds of play left
    Running { remaining: u32 },
}

/// Phase transitions the bubbler reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSignal {
    /// Spawn the bubbles and the adversary
    Start,
    /// Drain the game queue
    Stop,
}

#[derive(Debug, Clone)]
pub struct GameSession {
    pub score: u32,
    pub countdown: Countdown,
    /// Radius the adversary has (or respawns with)
    pub bad_radius: i32,
    /// Bumped whenever a game ends; timers from an older epoch are stale
    pub epoch: u64,
    game_secs: u32,
    prestart_secs: u32,
    good_points: u32,
    bad_penalty: u32,
    bad_base_radius: i32,
    bad_radius_jump: i32,
}

impl GameSession {
    /// A fresh session on its (short) startup countdown
    pub fn new(settings: &Settings) -> Self {
        Self {
            score: 0,
            countdown: Countdown::Prestart {
                remaining: settings.startup_prestart_secs,
            },
            bad_radius: settings.bad_base_radius,
            epoch: 0,
            game_secs: settings.game_secs,
            prestart_secs: settings.prestart_secs,
            good_points: settings.good_points,
            bad_penalty: settings.bad_penalty(),
            bad_base_radius: settings.bad_base_radius,
            bad_radius_jump: settings.bad_radius_jump,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.countdown, Countdown::Running { .. })
    }

    /// Advance the countdown by one second
    pub fn second_elapsed(&mut self) -> Option<SessionSignal> {
        match self.countdown {
            Countdown::Prestart { remaining } => {
                let remaining = remaining.saturating_sub(1);
                if remaining == 0 {
                    self.countdown = Countdown::Running {
                        remaining: self.game_secs,
                    };
                    log::info!("game on: {}s", self.game_secs);
                    Some(SessionSignal::Start)
                } else {
                    self.countdown = Countdown::Prestart { remaining };
                    None
                }
            }
            Countdown::Running { remaining } => {
                let remaining = remaining.saturating_sub(1);
                if remaining == 0 {
                    log::info!("time up, final score {}", self.score);
                    self.end_game();
                    Some(SessionSignal::Stop)
                } else {
                    self.countdown = Countdown::Running { remaining };
                    None
                }
            }
        }
    }

    /// Abandon the current game (if any) and start a new prestart countdown
    pub fn restart(&mut self) -> Option<SessionSignal> {
        let was_running = self.is_running();
        self.end_game();
        was_running.then_some(SessionSignal::Stop)
    }

    fn end_game(&mut self) {
        self.score = 0;
        self.bad_radius = self.bad_base_radius;
        self.countdown = Countdown::Prestart {
            remaining: self.prestart_secs,
        };
        self.epoch += 1;
    }

    /// Apply a pop to the score; bad pops floor at zero
    pub fn score_pop(&mut self, kind: PopKind) {
        match kind {
            PopKind::Good => self.score += self.good_points,
            PopKind::Bad => self.score = self.score.saturating_sub(self.bad_penalty),
            PopKind::Smoosher => {}
        }
    }

    /// Grow the adversary after a bad pop; returns the jump applied
    pub fn harder(&mut self) -> i32 {
        self.bad_radius += self.bad_radius_jump;
        self.bad_radius_jump
    }

    pub fn time_left(&self) -> Option<u32> {
        match self.countdown {
            Countdown::Running { remaining } => Some(remaining),
            Countdown::Prestart { .. } => None,
        }
    }

    pub fn prestart_left(&self) -> Option<u32> {
        match self.countdown {
            Countdown::Prestart { remaining } => Some(remaining),
            Countdown::Running { .. } => None,
        }
    }
}
