//! Host game state: menu, bar world and dialogue mode
//!
//!   hotspots - world interactions and the flag rules behind them
//!   input    - line commands
//!   terminal - text rendering collaborator

pub mod hotspots;
pub mod input;
pub mod terminal;

use neocity_story::{EndReason, InterpreterState, Presenter, SceneInterpreter, StoryEvent};

use crate::game::hotspots::Hotspot;
use crate::game::input::{Command, InputMode, HELP};

/// Which host state is active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostState {
    Menu,
    World,
    Dialogue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Game<P: Presenter> {
    interpreter: SceneInterpreter<P>,
    state: HostState,
    /// Story entry scene, opened by the archive terminal
    start_scene: String,
    /// Host messages for the terminal (help, flag list, hints)
    notices: Vec<String>,
}

impl<P: Presenter> Game<P> {
    pub fn new(interpreter: SceneInterpreter<P>, start_scene: impl Into<String>) -> Self {
        Self {
            interpreter,
            state: HostState::Menu,
            start_scene: start_scene.into(),
            notices: vec!["NEOCITY - type `start` to enter the Broken Mug, `help` for commands".to_string()],
        }
    }

    pub fn state(&self) -> HostState {
        self.state
    }

    pub fn interpreter(&self) -> &SceneInterpreter<P> {
        &self.interpreter
    }

    /// How the next line of input should be read
    pub fn input_mode(&self) -> InputMode {
        match (self.state, self.interpreter.state()) {
            (HostState::Menu, _) => InputMode::Menu,
            (HostState::World, _) => InputMode::World,
            (HostState::Dialogue, InterpreterState::AwaitingInputPuzzle) => InputMode::Answer,
            (HostState::Dialogue, InterpreterState::AwaitingMinigame) => InputMode::Minigame,
            (HostState::Dialogue, _) => InputMode::Dialogue,
        }
    }

    pub fn take_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notices)
    }

    fn notice(&mut self, text: impl Into<String>) {
        self.notices.push(text.into());
    }

    /// Route one command
    pub fn handle(&mut self, command: Command) -> Flow {
        let events = match command {
            Command::Quit => {
                if self.interpreter.in_dialogue() {
                    self.interpreter.cancel();
                }
                return Flow::Quit;
            }
            Command::Help => {
                self.notice(HELP);
                return Flow::Continue;
            }
            Command::Flags => {
                let flags: Vec<&str> = self.interpreter.flags().iter().collect();
                let line = if flags.is_empty() {
                    "No flags set".to_string()
                } else {
                    format!("Flags: {}", flags.join(", "))
                };
                self.notice(line);
                return Flow::Continue;
            }
            Command::Unknown(text) => {
                self.notice(format!("Unknown command: {} (try `help`)", text));
                return Flow::Continue;
            }
            command => self.dispatch(command),
        };
        self.process(events);
        Flow::Continue
    }

    fn dispatch(&mut self, command: Command) -> Vec<StoryEvent> {
        match (self.state, command) {
            (HostState::Menu, Command::Start | Command::Advance) => {
                self.enter_world();
                Vec::new()
            }
            (HostState::World, Command::Look(target)) => match Hotspot::parse(&target) {
                Some(hotspot) => {
                    let scene = hotspot.scene_for(self.interpreter.flags(), &self.start_scene);
                    tracing::info!("Hotspot '{}' opens '{}'", hotspot.name(), scene);
                    self.state = HostState::Dialogue;
                    self.interpreter.start_story(&scene)
                }
                None => {
                    self.notice(format!("Nothing called '{}' here", target));
                    Vec::new()
                }
            },
            (HostState::World, Command::Advance) => Vec::new(),
            (HostState::Dialogue, Command::Advance) => {
                // Advance is only routed while the dialogue listener is live
                if self.interpreter.listener().is_active() {
                    self.interpreter.advance()
                } else {
                    Vec::new()
                }
            }
            (HostState::Dialogue, Command::Choose(index)) => self.interpreter.choose(index),
            (HostState::Dialogue, Command::Answer(text)) => self.interpreter.submit_answer(&text),
            (HostState::Dialogue, Command::Minigame(input)) => self.interpreter.minigame_input(input),
            (state, command) => {
                tracing::debug!("Command {:?} ignored in {:?}", command, state);
                self.notice("That does nothing here");
                Vec::new()
            }
        }
    }

    /// Advance the clocks by `dt_ms`
    pub fn tick(&mut self, dt_ms: u32) {
        if self.state == HostState::Dialogue {
            let events = self.interpreter.tick(dt_ms);
            self.process(events);
        }
    }

    fn enter_world(&mut self) {
        tracing::info!("Host state: {:?} -> World", self.state);
        self.state = HostState::World;
        let names: Vec<&str> = Hotspot::ALL.iter().map(|h| h.name()).collect();
        self.notice(format!("You are in the Broken Mug. Look at: {}", names.join(", ")));
    }

    fn process(&mut self, events: Vec<StoryEvent>) {
        for event in events {
            match event {
                StoryEvent::DialogueEnded { reason } => {
                    if let EndReason::SceneNotFound(id) = &reason {
                        self.notice(format!("(scene '{}' is missing)", id));
                    }
                    tracing::debug!("Dialogue ended: {:?}", reason);
                    self.enter_world();
                }
                StoryEvent::FlagRaised { flag, first_time: true } => {
                    tracing::info!("Progress: {}", flag);
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neocity_story::{StoryGraph, TranscriptPresenter};

    fn game() -> Game<TranscriptPresenter> {
        let story = StoryGraph::chapter_one().unwrap();
        let start = story.start.clone().unwrap();
        Game::new(SceneInterpreter::new(story, TranscriptPresenter::new()), start)
    }

    fn in_world() -> Game<TranscriptPresenter> {
        let mut game = game();
        game.handle(Command::Start);
        assert_eq!(game.state(), HostState::World);
        game
    }

    #[test]
    fn starts_in_menu() {
        let mut game = game();
        assert_eq!(game.input_mode(), InputMode::Menu);
        assert!(!game.take_notices().is_empty());
        game.handle(Command::Advance);
        assert_eq!(game.state(), HostState::World);
    }

    #[test]
    fn looking_at_a_hotspot_enters_dialogue() {
        let mut game = in_world();
        game.handle(Command::Look("kael".into()));
        assert_eq!(game.state(), HostState::Dialogue);
        assert_eq!(game.interpreter().current_scene(), Some("puzzle_kael_talk"));
        assert!(game.interpreter().listener().is_active());
    }

    #[test]
    fn unknown_hotspot_stays_in_world() {
        let mut game = in_world();
        game.take_notices();
        game.handle(Command::Look("door".into()));
        assert_eq!(game.state(), HostState::World);
        assert_eq!(game.take_notices(), vec!["Nothing called 'door' here".to_string()]);
    }

    #[test]
    fn dialogue_end_returns_to_world() {
        let mut game = in_world();
        game.handle(Command::Look("kael".into()));
        game.handle(Command::Advance);
        // "Go back" leads to the hub, which ends after its two lines
        game.handle(Command::Choose(0));
        assert_eq!(game.interpreter().current_scene(), Some("escape_room_hub"));
        game.handle(Command::Advance);
        assert_eq!(game.state(), HostState::Dialogue);
        game.handle(Command::Advance);
        assert_eq!(game.state(), HostState::World);
        assert!(!game.interpreter().listener().is_active());
    }

    #[test]
    fn quit_cancels_dialogue() {
        let mut game = in_world();
        game.handle(Command::Look("archive".into()));
        let listener = game.interpreter().listener();
        assert!(listener.is_active());
        assert_eq!(game.handle(Command::Quit), Flow::Quit);
        assert!(!listener.is_active());
    }

    #[test]
    fn dialogue_commands_ignored_in_world() {
        let mut game = in_world();
        game.take_notices();
        game.handle(Command::Choose(0));
        assert_eq!(game.state(), HostState::World);
        assert_eq!(game.take_notices(), vec!["That does nothing here".to_string()]);
    }

    #[test]
    fn flags_listing() {
        let mut game = in_world();
        game.take_notices();
        game.handle(Command::Flags);
        assert_eq!(game.take_notices(), vec!["No flags set".to_string()]);
    }
}
