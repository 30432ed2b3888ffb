//! Stealth escape (`stealth_escape`)
//!
//! A scanner sweeps with a fixed period. Moving is safe only while the
//! sweep phase lies strictly inside the safe window. Moves outside it are
//! counted as detections; progress is kept.

use super::{MinigameInput, MinigameTask, TaskStatus};

pub const PERIOD_MS: u32 = 2000;
/// Open interval of the sweep during which a move goes unseen
pub const SAFE_WINDOW_MS: (u32, u32) = (600, 1400);
pub const STEPS_REQUIRED: u32 = 3;

#[derive(Debug, Clone, Default)]
pub struct StealthEscape {
    clock_ms: u32,
    steps: u32,
    detections: u32,
    /// Result of the most recent move
    last_move: Option<bool>,
}

impl StealthEscape {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the sweep at a given phase
    pub fn with_phase(phase_ms: u32) -> Self {
        Self {
            clock_ms: phase_ms % PERIOD_MS,
            ..Self::default()
        }
    }

    pub fn phase_ms(&self) -> u32 {
        self.clock_ms % PERIOD_MS
    }

    pub fn is_safe(&self) -> bool {
        let phase = self.phase_ms();
        phase > SAFE_WINDOW_MS.0 && phase < SAFE_WINDOW_MS.1
    }

    pub fn steps(&self) -> u32 {
        self.steps
    }

    /// Failed attempts so far
    pub fn detections(&self) -> u32 {
        self.detections
    }
}

impl MinigameTask for StealthEscape {
    fn kind(&self) -> &str {
        "stealth_escape"
    }

    fn handle(&mut self, input: &MinigameInput) -> TaskStatus {
        if self.status() == TaskStatus::Completed || *input != MinigameInput::Move {
            return self.status();
        }
        if self.is_safe() {
            self.steps += 1;
            self.last_move = Some(true);
        } else {
            self.detections += 1;
            self.last_move = Some(false);
            tracing::debug!("Detected at phase {}ms ({} total)", self.phase_ms(), self.detections);
        }
        self.status()
    }

    fn tick(&mut self, dt_ms: u32) -> TaskStatus {
        // Only the phase matters, keep the clock bounded
        self.clock_ms = (self.clock_ms % PERIOD_MS) + (dt_ms % PERIOD_MS);
        self.status()
    }

    fn status(&self) -> TaskStatus {
        if self.steps >= STEPS_REQUIRED {
            TaskStatus::Completed
        } else {
            TaskStatus::Running
        }
    }

    fn status_line(&self) -> String {
        if self.status() == TaskStatus::Completed {
            return "Escaped!".to_string();
        }
        let scanner = if self.is_safe() { "scanner away" } else { "scanner sweeping" };
        match self.last_move {
            Some(false) => format!("Detected! Wait for the scan to pass. ({})", scanner),
            Some(true) => format!("Moved ({}/{}) ({})", self.steps, STEPS_REQUIRED, scanner),
            None => format!("Move only when the scanner is away. ({})", scanner),
        }
    }
}
