//! Runs through the embedded chapter with fixed minigame boards.

use neocity_common::{EngineConfig, SystemMessageAdvance};
use neocity_story::frame::{PresenterCall, TranscriptPresenter, SFX_SELECT};
use neocity_story::interpreter::{EndReason, InterpreterState, SceneInterpreter, StoryEvent};
use neocity_story::minigame::{
    CircuitBoard, MinigameInput, MinigameRegistry, MinigameTask, SequenceRecall, StealthEscape,
    WaveStitch,
};
use neocity_story::scene::{MinigameDescriptor, StoryGraph};

const HACK_SEQUENCE: [usize; 6] = [0, 1, 2, 3, 2, 1];

fn fixed_registry() -> MinigameRegistry {
    let mut registry = MinigameRegistry::new();
    registry.register("audio_stitch", |_: &MinigameDescriptor| {
        Box::new(WaveStitch::with_order(vec![1, 0, 2, 3, 4])) as Box<dyn MinigameTask>
    });
    registry.register("memory_puzzle", |_: &MinigameDescriptor| {
        Box::new(CircuitBoard::with_rotations([[0; 3]; 3])) as Box<dyn MinigameTask>
    });
    registry.register("hacking_puzzle", |_: &MinigameDescriptor| {
        Box::new(SequenceRecall::with_sequence(HACK_SEQUENCE.to_vec())) as Box<dyn MinigameTask>
    });
    registry.register("stealth_escape", |_: &MinigameDescriptor| {
        Box::new(StealthEscape::with_phase(1000)) as Box<dyn MinigameTask>
    });
    registry
}

fn chapter() -> SceneInterpreter<TranscriptPresenter> {
    SceneInterpreter::new(StoryGraph::chapter_one().unwrap(), TranscriptPresenter::new())
        .with_registry(fixed_registry())
}

/// Advance until choices are on screen
fn advance_to_choices(it: &mut SceneInterpreter<TranscriptPresenter>) -> Vec<StoryEvent> {
    let mut events = Vec::new();
    for _ in 0..32 {
        if it.state() != InterpreterState::RenderingNode {
            break;
        }
        events.extend(it.advance());
    }
    events
}

#[test]
fn test_intro_plays_whispers_and_offers_three_choices() {
    let mut it = chapter();
    let start = it.story().start_scene().unwrap().to_string();
    it.start_story(&start);
    assert!(it
        .presenter()
        .calls
        .contains(&PresenterCall::Sfx("assets/audio/whispers.mp3".into())));
    assert!(it
        .presenter()
        .calls
        .contains(&PresenterCall::Music(Some("assets/audio/menu.mp3".into()))));

    advance_to_choices(&mut it);
    assert_eq!(it.state(), InterpreterState::AwaitingChoice);
    let choices = it.presenter().last_choices().unwrap();
    assert_eq!(choices.len(), 3);
    assert_eq!(choices[1].hover_hint.as_deref(), Some("It sounds like rain... or a promise."));
}

#[test]
fn test_jukebox_puzzle_sets_flag() {
    let mut it = chapter();
    it.start_story("puzzle_jukebox");
    advance_to_choices(&mut it);

    let events = it.choose(0);
    assert!(matches!(&events[1], StoryEvent::MinigameStarted { kind, .. } if kind == "audio_stitch"));

    assert!(it.minigame_input(MinigameInput::Select(0)).is_empty());
    let events = it.minigame_input(MinigameInput::Select(1));
    assert!(events.contains(&StoryEvent::SceneEntered("jukebox_solved".into())));
    assert!(it.flags().is_set("jukeboxFixed"));
}

#[test]
fn test_sign_circuit_sets_flag() {
    let mut it = chapter();
    it.start_story("sign_minigame");
    it.minigame_input(MinigameInput::Rotate { x: 1, y: 1 });
    let events = it.minigame_input(MinigameInput::Rotate { x: 2, y: 1 });
    assert!(events.contains(&StoryEvent::SceneEntered("sign_solved".into())));
    assert!(it.flags().is_set("signFixed"));
}

#[test]
fn test_override_answer_breaks_the_memory() {
    let mut it = chapter();
    it.start_story("kael_override");
    assert_eq!(it.state(), InterpreterState::AwaitingInputPuzzle);
    let prompt = it.presenter().calls.iter().find_map(|c| match c {
        PresenterCall::InputPrompt(view) => Some(view.clone()),
        _ => None,
    });
    let prompt = prompt.unwrap();
    assert_eq!(prompt.prompt, "[Override: What was your first project?]");
    assert_eq!(prompt.lead.map(|f| f.speaker), Some("Synthya".to_string()));

    let events = it.submit_answer(" PROJECT sundown");
    assert!(events.contains(&StoryEvent::SceneEntered("memory_break".into())));
    assert!(it.presenter().calls.contains(&PresenterCall::Sfx(SFX_SELECT.into())));
}

#[test]
fn test_data_hack_through_stealth_to_chapter_end() {
    let mut it = chapter();
    it.start_story("data_hack");

    // Pads are ignored until the sequence has played
    assert!(it.minigame_input(MinigameInput::Pad(0)).is_empty());
    it.tick(10_000);
    let mut events = Vec::new();
    for pad in HACK_SEQUENCE {
        events.extend(it.minigame_input(MinigameInput::Pad(pad)));
    }
    assert!(events.contains(&StoryEvent::SceneEntered("stealth_escape".into())));
    assert!(it
        .presenter()
        .calls
        .contains(&PresenterCall::Music(Some("assets/audio/game.mp3".into()))));

    let mut events = Vec::new();
    for _ in 0..3 {
        events.extend(it.minigame_input(MinigameInput::Move));
    }
    assert!(events.contains(&StoryEvent::SceneEntered("chapter_end".into())));

    advance_to_choices(&mut it);
    let choices = it.presenter().last_choices().unwrap();
    assert_eq!(choices[0].text, "Return to The Grid");
}

#[test]
fn test_escape_hub_ends_dialogue() {
    let mut it = chapter();
    let listener = it.listener();
    it.start_story("escape_room_hub");
    let events = advance_to_choices(&mut it);
    assert_eq!(
        events.last(),
        Some(&StoryEvent::DialogueEnded { reason: EndReason::SceneExhausted })
    );
    assert!(!listener.is_active());
}

#[test]
fn test_auto_system_messages_walk_the_intro() {
    let config = EngineConfig {
        system_message_advance: SystemMessageAdvance::Auto,
        system_message_delay_ms: 500,
        ..Default::default()
    };
    let mut it = chapter().with_config(&config);
    it.start_story("archive_intro");
    // First node is a system line
    assert_eq!(it.node_index(), Some(0));
    it.tick(500);
    assert_eq!(it.node_index(), Some(1));
    // Character lines still wait for the player
    it.tick(5_000);
    assert_eq!(it.node_index(), Some(1));
}
