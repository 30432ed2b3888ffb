//! Scene graph schema - the authoring format the interpreter runs.
//!
//! A story is a static mapping of scene id → scene record, loaded from JSON.
//! Field names follow the original content (`nextScene`, `inputPrompt`,
//! `onComplete`, ...) so existing scene data stays loadable as-is.
//!
//! Precedence inside a scene is fixed: minigame > input prompt > dialogue.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;

use neocity_common::SystemMessageAdvance;
use serde::{Deserialize, Deserializer, Serialize};

use crate::{Result, StoryError};

/// Opaque scene key, used for every graph edge
pub type SceneId = String;

/// Speaker sentinel for non-attributed system overlays
pub const SYSTEM_SPEAKER: &str = "System";

/// Chapter 1 ("The Memory-Loop"), embedded at build time
const CHAPTER_ONE_JSON: &str = include_str!("../data/chapter1.json");

/// `null` and absent both mean "empty" in scene data
fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Effects
// ---------------------------------------------------------------------------

/// Visual effect tag attached to nodes or scene entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    Glitch,
    Flicker,
    Scan,
}

impl Effect {
    /// Tag as written in scene data
    pub fn tag(&self) -> &'static str {
        match self {
            Effect::Glitch => "glitch",
            Effect::Flicker => "flicker",
            Effect::Scan => "scan",
        }
    }

    /// Fallback duration when the story has no style entry for this effect
    pub fn default_duration_ms(&self) -> u32 {
        match self {
            Effect::Flicker => 500,
            Effect::Glitch => 800,
            Effect::Scan => 2000,
        }
    }
}

/// Style entry from the story's `effects` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectStyle {
    #[serde(rename = "type")]
    pub kind: String,
    /// Duration in milliseconds before the effect is cleared
    pub duration: u32,
    #[serde(default)]
    pub intensity: Option<f32>,
    #[serde(default)]
    pub color: Option<String>,
}

// ---------------------------------------------------------------------------
// Nodes, choices, descriptors
// ---------------------------------------------------------------------------

/// One line of dialogue
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DialogueNode {
    #[serde(default, deserialize_with = "nullable")]
    pub speaker: String,
    /// Portrait pose key (e.g. "happy", "sad")
    #[serde(default)]
    pub emotion: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub text: String,
    #[serde(default, deserialize_with = "nullable")]
    pub effects: Vec<Effect>,
}

impl DialogueNode {
    pub fn new(speaker: &str, text: &str) -> Self {
        Self {
            speaker: speaker.to_string(),
            emotion: None,
            text: text.to_string(),
            effects: Vec::new(),
        }
    }

    /// A `System` overlay line
    pub fn system(text: &str) -> Self {
        Self::new(SYSTEM_SPEAKER, text)
    }

    pub fn with_emotion(mut self, emotion: &str) -> Self {
        self.emotion = Some(emotion.to_string());
        self
    }

    pub fn with_effects(mut self, effects: &[Effect]) -> Self {
        self.effects = effects.to_vec();
        self
    }

    pub fn is_system(&self) -> bool {
        self.speaker == SYSTEM_SPEAKER
    }
}

/// A branch offered after the last dialogue node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Choice {
    pub text: String,
    /// Absent = end the dialogue
    #[serde(default)]
    pub next_scene: Option<SceneId>,
    #[serde(default)]
    pub hover_sfx: Option<String>,
    #[serde(default)]
    pub hover_hint: Option<String>,
}

impl Choice {
    pub fn to(text: &str, next_scene: &str) -> Self {
        Self {
            text: text.to_string(),
            next_scene: Some(next_scene.to_string()),
            ..Default::default()
        }
    }

    pub fn end(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Default::default()
        }
    }
}

/// Minigame declaration. Opaque to the interpreter except for `on_complete`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinigameDescriptor {
    /// Variant tag used to pick a runner (e.g. "hacking_puzzle")
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    /// Scene loaded when the minigame reports success
    #[serde(default)]
    pub on_complete: Option<SceneId>,
}

impl MinigameDescriptor {
    pub fn new(kind: &str, on_complete: Option<&str>) -> Self {
        Self {
            kind: kind.to_string(),
            on_complete: on_complete.map(str::to_string),
            ..Default::default()
        }
    }
}

/// Portrait layout capability flag for the rendering collaborator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortraitLayout {
    /// Single when exactly one character speaks in the scene, dual otherwise
    #[default]
    Auto,
    Single,
    Dual,
}

// ---------------------------------------------------------------------------
// Scene
// ---------------------------------------------------------------------------

/// A named unit of story content
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    #[serde(default)]
    pub background: Option<String>,
    #[serde(default)]
    pub music: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub dialogue: Vec<DialogueNode>,
    #[serde(default, deserialize_with = "nullable")]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub minigame: Option<MinigameDescriptor>,
    #[serde(default)]
    pub input_prompt: Option<String>,
    #[serde(default)]
    pub input_answer: Option<String>,
    #[serde(default)]
    pub next_on_correct: Option<SceneId>,
    #[serde(default, deserialize_with = "nullable")]
    pub effects_on_start: Vec<Effect>,
    /// Flags raised every time this scene is entered
    #[serde(default, deserialize_with = "nullable")]
    pub on_enter_set_flags: Vec<String>,
    /// One-shot sound cue played on entry
    #[serde(default)]
    pub on_enter_sfx: Option<String>,
    #[serde(default)]
    pub portrait_layout: PortraitLayout,
    /// Per-scene override of the global system-message mode
    #[serde(default)]
    pub system_message_advance: Option<SystemMessageAdvance>,
}

/// The primary behavior of a scene, resolved by precedence
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SceneKind<'a> {
    Minigame(&'a MinigameDescriptor),
    InputPuzzle(InputPuzzle<'a>),
    Dialogue,
}

/// Free-text puzzle view over a scene
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputPuzzle<'a> {
    pub prompt: &'a str,
    pub answer: Option<&'a str>,
    pub next_on_correct: Option<&'a str>,
}

impl InputPuzzle<'_> {
    /// Compare a submission against the expected answer, ignoring
    /// surrounding whitespace and letter case. A puzzle without an
    /// answer accepts nothing.
    pub fn accepts(&self, submitted: &str) -> bool {
        match self.answer {
            Some(answer) => normalize_answer(submitted) == normalize_answer(answer),
            None => false,
        }
    }
}

/// Trim + case-fold, the normalization used for input puzzles
pub fn normalize_answer(s: &str) -> String {
    s.trim().to_lowercase()
}

impl Scene {
    /// Plain dialogue scene
    pub fn dialogue(nodes: Vec<DialogueNode>) -> Self {
        Self {
            dialogue: nodes,
            ..Default::default()
        }
    }

    /// Scene that only runs a minigame
    pub fn minigame(descriptor: MinigameDescriptor) -> Self {
        Self {
            minigame: Some(descriptor),
            ..Default::default()
        }
    }

    /// Scene that asks for a typed answer
    pub fn input(prompt: &str, answer: &str, next_on_correct: &str) -> Self {
        Self {
            input_prompt: Some(prompt.to_string()),
            input_answer: Some(answer.to_string()),
            next_on_correct: Some(next_on_correct.to_string()),
            ..Default::default()
        }
    }

    pub fn with_choices(mut self, choices: Vec<Choice>) -> Self {
        self.choices = choices;
        self
    }

    pub fn with_start_effects(mut self, effects: &[Effect]) -> Self {
        self.effects_on_start = effects.to_vec();
        self
    }

    pub fn with_flags(mut self, flags: &[&str]) -> Self {
        self.on_enter_set_flags = flags.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn with_background(mut self, key: &str) -> Self {
        self.background = Some(key.to_string());
        self
    }

    /// Resolve the scene's primary behavior: minigame > input prompt > dialogue
    pub fn kind(&self) -> SceneKind<'_> {
        if let Some(descriptor) = &self.minigame {
            return SceneKind::Minigame(descriptor);
        }
        if let Some(prompt) = &self.input_prompt {
            return SceneKind::InputPuzzle(InputPuzzle {
                prompt,
                answer: self.input_answer.as_deref(),
                next_on_correct: self.next_on_correct.as_deref(),
            });
        }
        SceneKind::Dialogue
    }

    /// Index of the final dialogue node, if any
    pub fn last_index(&self) -> Option<usize> {
        self.dialogue.len().checked_sub(1)
    }

    pub fn has_choices(&self) -> bool {
        !self.choices.is_empty()
    }

    /// Distinct non-System speakers, lowercased, in order of first appearance
    pub fn speakers(&self) -> Vec<String> {
        let mut speakers: Vec<String> = Vec::new();
        for node in &self.dialogue {
            if node.speaker.is_empty() || node.is_system() {
                continue;
            }
            let key = node.speaker.trim().to_lowercase();
            if !speakers.contains(&key) {
                speakers.push(key);
            }
        }
        speakers
    }
}

// ---------------------------------------------------------------------------
// Characters
// ---------------------------------------------------------------------------

/// Character portrait set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub name: String,
    /// Pose key → image path
    #[serde(default)]
    pub images: BTreeMap<String, String>,
}

impl Character {
    /// Requested pose, then `speak`, then `normal`, then any image
    pub fn portrait(&self, emotion: Option<&str>) -> Option<&str> {
        emotion
            .and_then(|e| self.images.get(e))
            .or_else(|| self.images.get("speak"))
            .or_else(|| self.images.get("normal"))
            .or_else(|| self.images.values().next())
            .map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Story graph
// ---------------------------------------------------------------------------

/// The full scene graph plus presentation tables
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoryGraph {
    #[serde(default)]
    pub title: String,
    /// Default entry scene
    #[serde(default)]
    pub start: Option<SceneId>,
    /// Character key shown on the left in dual layouts
    #[serde(default)]
    pub protagonist: Option<String>,
    pub scenes: HashMap<SceneId, Scene>,
    #[serde(default)]
    pub characters: HashMap<String, Character>,
    /// Background key → image path
    #[serde(default)]
    pub backgrounds: HashMap<String, String>,
    /// Effect tag → style
    #[serde(default)]
    pub effects: HashMap<String, EffectStyle>,
}

/// A structural problem found by [`StoryGraph::validate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoryIssue {
    /// An edge points at a scene that does not exist
    DanglingEdge {
        from: SceneId,
        to: SceneId,
        edge: &'static str,
    },
    /// An input puzzle without an answer or follow-up scene
    IncompletePuzzle { scene: SceneId, missing: &'static str },
    /// The declared start scene does not exist
    MissingStart(SceneId),
}

impl fmt::Display for StoryIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoryIssue::DanglingEdge { from, to, edge } => {
                write!(f, "scene '{}' {} → unknown scene '{}'", from, edge, to)
            }
            StoryIssue::IncompletePuzzle { scene, missing } => {
                write!(f, "input puzzle '{}' has no {}", scene, missing)
            }
            StoryIssue::MissingStart(id) => write!(f, "start scene '{}' does not exist", id),
        }
    }
}

impl StoryGraph {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Default::default()
        }
    }

    pub fn with_scene(mut self, id: &str, scene: Scene) -> Self {
        self.scenes.insert(id.to_string(), scene);
        self
    }

    pub fn with_start(mut self, id: &str) -> Self {
        self.start = Some(id.to_string());
        self
    }

    /// Parse a story from JSON text
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load a story from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let story = Self::from_json(&text)?;
        tracing::info!(
            "Loaded story '{}' ({} scenes) from {:?}",
            story.title,
            story.scenes.len(),
            path.as_ref()
        );
        Ok(story)
    }

    /// The embedded first chapter
    pub fn chapter_one() -> Result<Self> {
        Self::from_json(CHAPTER_ONE_JSON)
    }

    pub fn scene(&self, id: &str) -> Result<&Scene> {
        self.scenes
            .get(id)
            .ok_or_else(|| StoryError::SceneNotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.scenes.contains_key(id)
    }

    pub fn start_scene(&self) -> Option<&str> {
        self.start.as_deref()
    }

    /// Look up a character by key or display name (case-insensitive)
    pub fn character(&self, speaker: &str) -> Option<&Character> {
        let key = speaker.trim().to_lowercase();
        if key.is_empty() {
            return None;
        }
        self.characters
            .values()
            .find(|c| c.name.to_lowercase() == key)
            .or_else(|| self.characters.get(&key))
    }

    /// Image path for a background key; unknown keys degrade to no image
    pub fn background_path(&self, key: Option<&str>) -> Option<&str> {
        key.and_then(|k| self.backgrounds.get(k)).map(String::as_str)
    }

    pub fn effect_style(&self, effect: Effect) -> Option<&EffectStyle> {
        self.effects.get(effect.tag())
    }

    /// All scene ids, sorted
    pub fn scene_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.scenes.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Report dangling edges and incomplete puzzles. An empty list means
    /// every edge in the graph resolves.
    pub fn validate(&self) -> Vec<StoryIssue> {
        let mut issues = Vec::new();

        if let Some(start) = &self.start {
            if !self.contains(start) {
                issues.push(StoryIssue::MissingStart(start.clone()));
            }
        }

        for id in self.scene_ids() {
            let scene = &self.scenes[id];
            let mut edge = |to: &str, edge: &'static str| {
                if !self.contains(to) {
                    issues.push(StoryIssue::DanglingEdge {
                        from: id.to_string(),
                        to: to.to_string(),
                        edge,
                    });
                }
            };

            for choice in &scene.choices {
                if let Some(next) = &choice.next_scene {
                    edge(next, "choice");
                }
            }
            if let Some(next) = scene.minigame.as_ref().and_then(|m| m.on_complete.as_deref()) {
                edge(next, "onComplete");
            }
            if let Some(next) = &scene.next_on_correct {
                edge(next, "nextOnCorrect");
            }

            if scene.input_prompt.is_some() {
                if scene.input_answer.is_none() {
                    issues.push(StoryIssue::IncompletePuzzle {
                        scene: id.to_string(),
                        missing: "inputAnswer",
                    });
                }
                if scene.next_on_correct.is_none() {
                    issues.push(StoryIssue::IncompletePuzzle {
                        scene: id.to_string(),
                        missing: "nextOnCorrect",
                    });
                }
            }
        }

        issues
    }

    /// Keep the story only if `validate()` finds nothing
    pub fn into_validated(self) -> Result<Self> {
        let issues = self.validate();
        if issues.is_empty() {
            return Ok(self);
        }
        let report: Vec<String> = issues.iter().map(ToString::to_string).collect();
        Err(StoryError::InvalidStory(report.join("; ")))
    }
}
