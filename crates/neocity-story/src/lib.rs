//! Neocity story engine
//!
//! Scene graph interpreter for branching dialogue:
//!   - `scene`       - scene graph schema, JSON loading, validation
//!   - `interpreter` - the dialogue state machine (advance, choices, puzzles)
//!   - `frame`       - presentation frames and the `Presenter` collaborator
//!   - `minigame`    - minigame contract, registry and the built-in variants
//!   - `flags`       - progress flags raised on scene entry
//!   - `listener`    - scoped advance-signal listener

pub mod flags;
pub mod frame;
pub mod interpreter;
pub mod listener;
pub mod minigame;
pub mod scene;

pub use flags::FlagStore;
pub use frame::{ChoiceHandle, NodeFrame, Presenter, TranscriptPresenter};
pub use interpreter::{EndReason, InterpreterState, SceneInterpreter, StoryEvent};
pub use listener::{AdvanceListener, ListenerGuard};
pub use minigame::{MinigameInput, MinigameRegistry, MinigameTicket, TaskStatus};
pub use scene::{Scene, SceneId, StoryGraph};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoryError {
    #[error("Scene not found: {0}")]
    SceneNotFound(String),

    #[error("No minigame runner registered for type: {0}")]
    MinigameTypeUnregistered(String),

    #[error("Invalid story: {0}")]
    InvalidStory(String),

    #[error("Failed to parse story JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to read story file: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StoryError>;
