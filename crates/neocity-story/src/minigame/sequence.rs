//! Sequence recall (`hacking_puzzle`)
//!
//! The task plays a random pad sequence, then the player repeats it. Pad
//! presses during playback are ignored. A wrong pad throws progress away
//! and replays the whole sequence.

use rand::Rng;

use super::{Difficulty, MinigameInput, MinigameTask, TaskStatus};

pub const PAD_COUNT: usize = 4;
/// Time each pad stays lit during playback
pub const STEP_MS: u32 = 600;
/// Pause after the last pad before input opens
const SETTLE_MS: u32 = 400;

/// Keyboard labels of the pads, by index
pub const PAD_LABELS: [&str; PAD_COUNT] = ["Q", "W", "A", "S"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Showing { elapsed_ms: u32 },
    Input { next: usize },
    Done,
}

#[derive(Debug, Clone)]
pub struct SequenceRecall {
    sequence: Vec<usize>,
    phase: Phase,
    /// Last input was a miss; shown until the player gets a pad right
    missed: bool,
}

impl SequenceRecall {
    /// Random sequence sized by difficulty (easy 3, medium 4, hard 6)
    pub fn new(difficulty: Difficulty) -> Self {
        let len = match difficulty {
            Difficulty::Easy => 3,
            Difficulty::Medium => 4,
            Difficulty::Hard => 6,
        };
        let mut rng = rand::thread_rng();
        Self::with_sequence((0..len).map(|_| rng.gen_range(0..PAD_COUNT)).collect())
    }

    /// Fixed sequence; pads outside `0..PAD_COUNT` wrap around
    pub fn with_sequence(sequence: Vec<usize>) -> Self {
        Self {
            sequence: sequence.into_iter().map(|p| p % PAD_COUNT).collect(),
            phase: Phase::Showing { elapsed_ms: 0 },
            missed: false,
        }
    }

    pub fn sequence(&self) -> &[usize] {
        &self.sequence
    }

    /// Total playback time before input opens
    pub fn playback_ms(&self) -> u32 {
        STEP_MS * self.sequence.len() as u32 + SETTLE_MS
    }

    pub fn is_showing(&self) -> bool {
        matches!(self.phase, Phase::Showing { .. })
    }

    /// Pad lit right now during playback
    pub fn lit_pad(&self) -> Option<usize> {
        match self.phase {
            Phase::Showing { elapsed_ms } => self.sequence.get((elapsed_ms / STEP_MS) as usize).copied(),
            _ => None,
        }
    }

    fn replay(&mut self) {
        self.phase = Phase::Showing { elapsed_ms: 0 };
    }
}

impl MinigameTask for SequenceRecall {
    fn kind(&self) -> &str {
        "hacking_puzzle"
    }

    fn handle(&mut self, input: &MinigameInput) -> TaskStatus {
        match (*input, self.phase) {
            (MinigameInput::Pad(pad), Phase::Input { next }) => {
                if self.sequence.get(next) != Some(&pad) {
                    tracing::debug!("Sequence miss at step {}", next);
                    self.missed = true;
                    self.replay();
                } else if next + 1 >= self.sequence.len() {
                    self.missed = false;
                    self.phase = Phase::Done;
                } else {
                    self.missed = false;
                    self.phase = Phase::Input { next: next + 1 };
                }
            }
            (MinigameInput::Replay, Phase::Input { .. }) => self.replay(),
            _ => {}
        }
        self.status()
    }

    fn tick(&mut self, dt_ms: u32) -> TaskStatus {
        if let Phase::Showing { elapsed_ms } = self.phase {
            let elapsed_ms = elapsed_ms.saturating_add(dt_ms);
            self.phase = if elapsed_ms >= self.playback_ms() {
                Phase::Input { next: 0 }
            } else {
                Phase::Showing { elapsed_ms }
            };
        }
        self.status()
    }

    fn status(&self) -> TaskStatus {
        if self.phase == Phase::Done {
            TaskStatus::Completed
        } else {
            TaskStatus::Running
        }
    }

    fn status_line(&self) -> String {
        match self.phase {
            Phase::Showing { .. } if self.missed => "Wrong! Replaying...".to_string(),
            Phase::Showing { .. } => match self.lit_pad() {
                Some(pad) => format!("Listen... [{}]", PAD_LABELS[pad]),
                None => "Listen...".to_string(),
            },
            Phase::Input { next } => format!("Your turn ({}/{})", next, self.sequence.len()),
            Phase::Done => "Cleansed!".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready(sequence: Vec<usize>) -> SequenceRecall {
        let mut task = SequenceRecall::with_sequence(sequence);
        let playback = task.playback_ms();
        task.tick(playback);
        assert!(!task.is_showing());
        task
    }

    #[test]
    fn length_follows_difficulty() {
        assert_eq!(SequenceRecall::new(Difficulty::Easy).sequence().len(), 3);
        assert_eq!(SequenceRecall::new(Difficulty::Medium).sequence().len(), 4);
        let hard = SequenceRecall::new(Difficulty::Hard);
        assert_eq!(hard.sequence().len(), 6);
        assert!(hard.sequence().iter().all(|&p| p < PAD_COUNT));
    }

    #[test]
    fn input_ignored_during_playback() {
        let mut task = SequenceRecall::with_sequence(vec![2]);
        assert_eq!(task.lit_pad(), Some(2));
        assert_eq!(task.handle(&MinigameInput::Pad(2)), TaskStatus::Running);
        task.tick(STEP_MS);
        assert_eq!(task.lit_pad(), None);
        assert!(task.is_showing());
        task.tick(SETTLE_MS);
        assert_eq!(task.status_line(), "Your turn (0/1)");
        assert_eq!(task.handle(&MinigameInput::Pad(2)), TaskStatus::Completed);
        assert_eq!(task.status_line(), "Cleansed!");
    }

    #[test]
    fn wrong_pad_resets_and_replays() {
        let mut task = ready(vec![0, 1, 3]);
        task.handle(&MinigameInput::Pad(0));
        task.handle(&MinigameInput::Pad(1));
        assert_eq!(task.handle(&MinigameInput::Pad(2)), TaskStatus::Running);
        assert!(task.is_showing());
        assert_eq!(task.status_line(), "Wrong! Replaying...");

        let playback = task.playback_ms();
        task.tick(playback);
        // Progress starts over from the first pad
        assert_eq!(task.handle(&MinigameInput::Pad(3)), TaskStatus::Running);
        assert!(task.is_showing());
        task.tick(playback);
        for pad in [0, 1] {
            assert_eq!(task.handle(&MinigameInput::Pad(pad)), TaskStatus::Running);
        }
        assert_eq!(task.handle(&MinigameInput::Pad(3)), TaskStatus::Completed);
    }

    #[test]
    fn replay_on_demand() {
        let mut task = ready(vec![1, 1]);
        task.handle(&MinigameInput::Pad(1));
        task.handle(&MinigameInput::Replay);
        assert!(task.is_showing());
        assert_eq!(task.status_line(), "Listen... [W]");
    }
}
