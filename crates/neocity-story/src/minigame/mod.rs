//! Minigame task contract
//!
//! A minigame scene hands control to a [`MinigameTask`] built by the runner
//! registered for the descriptor's `type` tag. The task owns its own input
//! and reports [`TaskStatus::Completed`] once the player meets its success
//! condition. The interpreter resolves the scene through the task's
//! [`MinigameTicket`], so a repeated or stale completion is ignored there.
//!
//! Built-in variants (story `type` tags):
//!   hacking_puzzle - sequence recall over four pads
//!   memory_puzzle  - rotate circuit tiles until power reaches the sink
//!   audio_stitch   - swap wave segments back into order
//!   stealth_escape - move only while the scanner is away

pub mod circuit;
pub mod sequence;
pub mod stealth;
pub mod stitch;

use std::collections::HashMap;
use std::fmt;

use crate::scene::MinigameDescriptor;
use crate::{Result, StoryError};

pub use circuit::CircuitBoard;
pub use sequence::SequenceRecall;
pub use stealth::StealthEscape;
pub use stitch::WaveStitch;

/// Player action routed to the active minigame. Actions a variant does not
/// understand are ignored by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinigameInput {
    /// Generic "Complete" button of the fallback task
    Acknowledge,
    Pad(usize),
    Rotate { x: usize, y: usize },
    Select(usize),
    Move,
    Replay,
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Running,
    Completed,
}

/// Identifies one launched minigame instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MinigameTicket(pub u64);

impl fmt::Display for MinigameTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A running minigame
pub trait MinigameTask {
    /// Story `type` tag this task was launched for
    fn kind(&self) -> &str;

    /// Feed one player action
    fn handle(&mut self, input: &MinigameInput) -> TaskStatus;

    /// Advance the task's clock
    fn tick(&mut self, _dt_ms: u32) -> TaskStatus {
        self.status()
    }

    fn status(&self) -> TaskStatus;

    /// Short human-readable state (may span lines)
    fn status_line(&self) -> String;
}

/// Builds a task from a descriptor
pub trait MinigameRunner {
    fn start(&self, descriptor: &MinigameDescriptor) -> Box<dyn MinigameTask>;
}

impl<F> MinigameRunner for F
where
    F: Fn(&MinigameDescriptor) -> Box<dyn MinigameTask>,
{
    fn start(&self, descriptor: &MinigameDescriptor) -> Box<dyn MinigameTask> {
        self(descriptor)
    }
}

/// Minigame difficulty from the descriptor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    /// Parse a descriptor difficulty; absent or unknown reads as medium
    pub fn parse(s: Option<&str>) -> Self {
        match s.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("easy") => Difficulty::Easy,
            Some("hard") => Difficulty::Hard,
            _ => Difficulty::Medium,
        }
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Maps `type` tags to runners
#[derive(Default)]
pub struct MinigameRegistry {
    runners: HashMap<String, Box<dyn MinigameRunner>>,
}

impl fmt::Debug for MinigameRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&str> = self.runners.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        f.debug_struct("MinigameRegistry").field("kinds", &kinds).finish()
    }
}

impl MinigameRegistry {
    /// Empty registry; every type falls back to [`Acknowledge`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the four built-in variants
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register("hacking_puzzle", |d: &MinigameDescriptor| {
            Box::new(SequenceRecall::new(Difficulty::parse(d.difficulty.as_deref()))) as Box<dyn MinigameTask>
        });
        registry.register("memory_puzzle", |_: &MinigameDescriptor| {
            Box::new(CircuitBoard::new()) as Box<dyn MinigameTask>
        });
        registry.register("audio_stitch", |_: &MinigameDescriptor| {
            Box::new(WaveStitch::new()) as Box<dyn MinigameTask>
        });
        registry.register("stealth_escape", |_: &MinigameDescriptor| {
            Box::new(StealthEscape::new()) as Box<dyn MinigameTask>
        });
        registry
    }

    /// Register (or replace) the runner for a type tag
    pub fn register(&mut self, kind: &str, runner: impl MinigameRunner + 'static) {
        if self.runners.insert(kind.to_string(), Box::new(runner)).is_some() {
            tracing::debug!("Replaced minigame runner for '{}'", kind);
        }
    }

    pub fn is_registered(&self, kind: &str) -> bool {
        self.runners.contains_key(kind)
    }

    /// Start the registered runner for this descriptor
    pub fn launch(&self, descriptor: &MinigameDescriptor) -> Result<Box<dyn MinigameTask>> {
        let runner = self
            .runners
            .get(&descriptor.kind)
            .ok_or_else(|| StoryError::MinigameTypeUnregistered(descriptor.kind.clone()))?;
        Ok(runner.start(descriptor))
    }

    /// Start the registered runner, or the acknowledge-and-complete fallback
    pub fn launch_or_fallback(&self, descriptor: &MinigameDescriptor) -> Box<dyn MinigameTask> {
        match self.launch(descriptor) {
            Ok(task) => task,
            Err(e) => {
                tracing::warn!("{}; using acknowledge fallback", e);
                Box::new(Acknowledge::new(&descriptor.kind))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Fallback task
// ---------------------------------------------------------------------------

/// Generic "Complete" button for types without a runner
#[derive(Debug, Clone)]
pub struct Acknowledge {
    kind: String,
    done: bool,
}

impl Acknowledge {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            done: false,
        }
    }
}

impl MinigameTask for Acknowledge {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn handle(&mut self, input: &MinigameInput) -> TaskStatus {
        if *input == MinigameInput::Acknowledge {
            self.done = true;
        }
        self.status()
    }

    fn status(&self) -> TaskStatus {
        if self.done {
            TaskStatus::Completed
        } else {
            TaskStatus::Running
        }
    }

    fn status_line(&self) -> String {
        if self.done {
            "Complete".to_string()
        } else {
            format!("Task: {} (ok to complete)", self.kind)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_parsing() {
        assert_eq!(Difficulty::parse(Some("EASY")), Difficulty::Easy);
        assert_eq!(Difficulty::parse(Some("hard")), Difficulty::Hard);
        assert_eq!(Difficulty::parse(Some("brutal")), Difficulty::Medium);
        assert_eq!(Difficulty::parse(None), Difficulty::Medium);
    }

    #[test]
    fn builtin_registry_knows_story_types() {
        let registry = MinigameRegistry::with_builtin();
        for kind in ["hacking_puzzle", "memory_puzzle", "audio_stitch", "stealth_escape"] {
            assert!(registry.is_registered(kind));
            let task = registry.launch(&MinigameDescriptor::new(kind, None)).unwrap();
            assert_eq!(task.status(), TaskStatus::Running);
        }
    }

    #[test]
    fn unregistered_type_is_an_error_or_fallback() {
        let registry = MinigameRegistry::with_builtin();
        let descriptor = MinigameDescriptor::new("pinball", Some("after"));
        assert!(matches!(
            registry.launch(&descriptor),
            Err(StoryError::MinigameTypeUnregistered(kind)) if kind == "pinball"
        ));

        let mut task = registry.launch_or_fallback(&descriptor);
        assert_eq!(task.kind(), "pinball");
        assert_eq!(task.handle(&MinigameInput::Move), TaskStatus::Running);
        assert_eq!(task.handle(&MinigameInput::Acknowledge), TaskStatus::Completed);
    }

    #[test]
    fn closures_register_as_runners() {
        let mut registry = MinigameRegistry::new();
        registry.register("quiz", |d: &MinigameDescriptor| {
            Box::new(Acknowledge::new(&d.kind)) as Box<dyn MinigameTask>
        });
        let task = registry.launch(&MinigameDescriptor::new("quiz", None)).unwrap();
        assert_eq!(task.kind(), "quiz");
        assert!(format!("{:?}", registry).contains("quiz"));
    }
}
