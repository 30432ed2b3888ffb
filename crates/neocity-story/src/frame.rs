//! Presentation frames and the rendering collaborator.
//!
//! The interpreter never touches display state directly. Every render
//! builds an immutable frame value and hands it to a [`Presenter`]; the
//! presenter owns images, audio and layout. Missing assets resolve to
//! `None` here and the presenter simply shows nothing for them.

use crate::minigame::MinigameTicket;
use crate::scene::{Effect, PortraitLayout, Scene, SceneId, StoryGraph};

/// Cue played when an input puzzle accepts an answer
pub const SFX_SELECT: &str = "assets/audio/select.mp3";
/// Cue played when an input puzzle rejects an answer
pub const SFX_WRONG: &str = "assets/audio/wrong.mp3";

/// Pose used for the non-speaking character in dual layouts
const IDLE_POSE: &str = "speak";

// ---------------------------------------------------------------------------
// Frame values
// ---------------------------------------------------------------------------

/// One active visual effect with its style
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveEffect {
    pub effect: Effect,
    /// Time until the presenter should clear it
    pub duration_ms: u32,
    pub intensity: Option<f32>,
    pub color: Option<String>,
}

/// The complete effect set for a render. Replaces the previous set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EffectSet {
    pub effects: Vec<ActiveEffect>,
}

impl EffectSet {
    /// Resolve tags against the story's style table (duplicates collapse)
    pub fn resolve(story: &StoryGraph, tags: &[Effect]) -> Self {
        let mut effects: Vec<ActiveEffect> = Vec::new();
        for &effect in tags {
            if effects.iter().any(|e| e.effect == effect) {
                continue;
            }
            let style = story.effect_style(effect);
            effects.push(ActiveEffect {
                effect,
                duration_ms: style.map_or(effect.default_duration_ms(), |s| s.duration),
                intensity: style.and_then(|s| s.intensity),
                color: style.and_then(|s| s.color.clone()),
            });
        }
        Self { effects }
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn contains(&self, effect: Effect) -> bool {
        self.effects.iter().any(|e| e.effect == effect)
    }
}

/// A character image slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Portrait {
    /// Character key (lowercased speaker)
    pub character: String,
    /// Image path; `None` when the character or pose has no image
    pub image: Option<String>,
    pub speaking: bool,
}

/// Portrait arrangement for one node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortraitFrame {
    None,
    Single(Portrait),
    Dual {
        left: Option<Portrait>,
        right: Option<Portrait>,
    },
}

/// Everything needed to draw one dialogue node
#[derive(Debug, Clone, PartialEq)]
pub struct NodeFrame {
    pub scene: SceneId,
    pub index: usize,
    pub total: usize,
    pub speaker: String,
    pub text: String,
    pub emotion: Option<String>,
    pub portraits: PortraitFrame,
    pub effects: EffectSet,
}

impl NodeFrame {
    /// Build the frame for node `index` of `scene`. Returns `None` past the end.
    /// The first node also carries the scene's `effectsOnStart`.
    pub fn build(story: &StoryGraph, scene_id: &str, scene: &Scene, index: usize) -> Option<Self> {
        let node = scene.dialogue.get(index)?;
        let tags: Vec<Effect> = if index == 0 {
            scene.effects_on_start.iter().chain(&node.effects).copied().collect()
        } else {
            node.effects.clone()
        };
        let portraits = if node.is_system() {
            PortraitFrame::None
        } else {
            portraits_for(story, scene, &node.speaker, node.emotion.as_deref())
        };
        Some(Self {
            scene: scene_id.to_string(),
            index,
            total: scene.dialogue.len(),
            speaker: node.speaker.clone(),
            text: node.text.clone(),
            emotion: node.emotion.clone(),
            portraits,
            effects: EffectSet::resolve(story, &tags),
        })
    }

    pub fn is_last(&self) -> bool {
        self.index + 1 == self.total
    }
}

fn portrait(story: &StoryGraph, character: &str, pose: Option<&str>, speaking: bool) -> Portrait {
    Portrait {
        character: character.to_string(),
        image: story
            .character(character)
            .and_then(|c| c.portrait(pose))
            .map(str::to_string),
        speaking,
    }
}

fn portraits_for(story: &StoryGraph, scene: &Scene, speaker: &str, emotion: Option<&str>) -> PortraitFrame {
    let current = speaker.trim().to_lowercase();
    let speakers = scene.speakers();

    let layout = match scene.portrait_layout {
        PortraitLayout::Auto => match speakers.len() {
            0 => return PortraitFrame::None,
            1 => PortraitLayout::Single,
            _ => PortraitLayout::Dual,
        },
        forced => forced,
    };

    match layout {
        PortraitLayout::Dual => {
            let protagonist = story.protagonist.as_deref().map(str::to_lowercase);
            let slot = |key: &String| {
                let speaking = *key == current;
                let pose = if speaking { emotion } else { Some(IDLE_POSE) };
                portrait(story, key, pose, speaking)
            };
            let left = speakers
                .iter()
                .find(|s| Some(s.as_str()) == protagonist.as_deref())
                .map(slot);
            let right = speakers
                .iter()
                .find(|s| Some(s.as_str()) != protagonist.as_deref())
                .map(slot);
            PortraitFrame::Dual { left, right }
        }
        _ if current.is_empty() => PortraitFrame::None,
        _ => PortraitFrame::Single(portrait(story, &current, emotion, true)),
    }
}

/// Scene backdrop: background key and the resolved image
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Backdrop {
    pub key: Option<String>,
    pub image: Option<String>,
}

impl Backdrop {
    pub fn for_scene(story: &StoryGraph, scene: &Scene) -> Self {
        Self {
            key: scene.background.clone(),
            image: story.background_path(scene.background.as_deref()).map(str::to_string),
        }
    }
}

/// Handle a presenter passes back to select a choice. Handles from an
/// earlier render are stale and ignored by the interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChoiceHandle {
    pub generation: u64,
    pub index: usize,
}

/// One selectable choice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceView {
    pub handle: ChoiceHandle,
    pub text: String,
    pub hover_sfx: Option<String>,
    pub hover_hint: Option<String>,
}

/// Free-text prompt plus the scene's lead line, if any
#[derive(Debug, Clone, PartialEq)]
pub struct InputPromptView {
    pub scene: SceneId,
    pub prompt: String,
    pub lead: Option<NodeFrame>,
}

/// Result shown after an input-puzzle submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFeedback {
    Accepted,
    /// Transient "incorrect" indication (shake); the prompt stays open
    Incorrect,
}

/// A running minigame as the presenter sees it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinigameView {
    pub ticket: MinigameTicket,
    pub kind: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub difficulty: Option<String>,
    pub status: String,
}

// ---------------------------------------------------------------------------
// Rendering collaborator
// ---------------------------------------------------------------------------

/// Host-provided rendering collaborator. Calls cannot fail; asset problems
/// are absorbed by the implementation.
pub trait Presenter {
    fn set_background(&mut self, backdrop: &Backdrop);

    /// `None` stops the current track
    fn play_music(&mut self, _cue: Option<&str>) {}

    fn play_sfx(&mut self, _cue: &str) {}

    fn apply_effects(&mut self, effects: &EffectSet);

    fn show_node(&mut self, frame: &NodeFrame);

    /// Non-attributed overlay for `System` nodes
    fn show_system_message(&mut self, frame: &NodeFrame);

    fn dismiss_system_message(&mut self) {}

    fn show_choices(&mut self, choices: &[ChoiceView]);

    fn clear_choices(&mut self);

    fn show_input_prompt(&mut self, view: &InputPromptView);

    fn show_input_feedback(&mut self, feedback: InputFeedback);

    /// Called on start and whenever the minigame's status line changes
    fn show_minigame(&mut self, view: &MinigameView);

    fn hide_minigame(&mut self) {}
}

/// Everything a [`TranscriptPresenter`] recorded
#[derive(Debug, Clone, PartialEq)]
pub enum PresenterCall {
    Background(Backdrop),
    Music(Option<String>),
    Sfx(String),
    Effects(EffectSet),
    Node(NodeFrame),
    SystemMessage(NodeFrame),
    DismissSystemMessage,
    Choices(Vec<ChoiceView>),
    ClearChoices,
    InputPrompt(InputPromptView),
    InputFeedback(InputFeedback),
    Minigame(MinigameView),
    HideMinigame,
}

/// Headless presenter that records every call, for replays and tests
#[derive(Debug, Clone, Default)]
pub struct TranscriptPresenter {
    pub calls: Vec<PresenterCall>,
}

impl TranscriptPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain the recorded calls
    pub fn take(&mut self) -> Vec<PresenterCall> {
        std::mem::take(&mut self.calls)
    }

    /// Node and system-message frames, in render order
    pub fn rendered(&self) -> Vec<&NodeFrame> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                PresenterCall::Node(f) | PresenterCall::SystemMessage(f) => Some(f),
                _ => None,
            })
            .collect()
    }

    /// Texts of rendered nodes, in order
    pub fn rendered_texts(&self) -> Vec<&str> {
        self.rendered().into_iter().map(|f| f.text.as_str()).collect()
    }

    /// The most recent choice list shown
    pub fn last_choices(&self) -> Option<&[ChoiceView]> {
        self.calls.iter().rev().find_map(|c| match c {
            PresenterCall::Choices(list) => Some(list.as_slice()),
            _ => None,
        })
    }

    pub fn count(&self, pred: impl Fn(&PresenterCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }
}

impl Presenter for TranscriptPresenter {
    fn set_background(&mut self, backdrop: &Backdrop) {
        self.calls.push(PresenterCall::Background(backdrop.clone()));
    }

    fn play_music(&mut self, cue: Option<&str>) {
        self.calls.push(PresenterCall::Music(cue.map(str::to_string)));
    }

    fn play_sfx(&mut self, cue: &str) {
        self.calls.push(PresenterCall::Sfx(cue.to_string()));
    }

    fn apply_effects(&mut self, effects: &EffectSet) {
        self.calls.push(PresenterCall::Effects(effects.clone()));
    }

    fn show_node(&mut self, frame: &NodeFrame) {
        self.calls.push(PresenterCall::Node(frame.clone()));
    }

    fn show_system_message(&mut self, frame: &NodeFrame) {
        self.calls.push(PresenterCall::SystemMessage(frame.clone()));
    }

    fn dismiss_system_message(&mut self) {
        self.calls.push(PresenterCall::DismissSystemMessage);
    }

    fn show_choices(&mut self, choices: &[ChoiceView]) {
        self.calls.push(PresenterCall::Choices(choices.to_vec()));
    }

    fn clear_choices(&mut self) {
        self.calls.push(PresenterCall::ClearChoices);
    }

    fn show_input_prompt(&mut self, view: &InputPromptView) {
        self.calls.push(PresenterCall::InputPrompt(view.clone()));
    }

    fn show_input_feedback(&mut self, feedback: InputFeedback) {
        self.calls.push(PresenterCall::InputFeedback(feedback));
    }

    fn show_minigame(&mut self, view: &MinigameView) {
        self.calls.push(PresenterCall::Minigame(view.clone()));
    }

    fn hide_minigame(&mut self) {
        self.calls.push(PresenterCall::HideMinigame);
    }
}
