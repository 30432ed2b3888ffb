//! Scene interpreter - the dialogue state machine.
//!
//! Drives one story graph node by node. Every operation returns the
//! host-facing [`StoryEvent`]s it produced and renders through the
//! [`Presenter`]. The interpreter never blocks: it parks in one of the
//! waiting states until the next advance signal, choice, answer or
//! minigame completion arrives.
//!
//! State machine:
//!   Idle ──start_story──▶ RenderingNode ──advance──▶ RenderingNode
//!                                       ──advance──▶ AwaitingChoice (last node, choices)
//!                                       ──advance──▶ Idle (DialogueEnded)
//!   any ──minigame scene──▶ AwaitingMinigame ──completion──▶ next scene | Idle
//!   any ──input scene──▶ AwaitingInputPuzzle ──correct──▶ next scene | Idle
//!                                            ──incorrect──▶ AwaitingInputPuzzle

use std::rc::Rc;

use neocity_common::{EngineConfig, SystemMessageAdvance, DEFAULT_SYSTEM_MESSAGE_DELAY_MS};

use crate::flags::FlagStore;
use crate::frame::{
    Backdrop, ChoiceHandle, ChoiceView, EffectSet, InputFeedback, InputPromptView, MinigameView,
    NodeFrame, Presenter, SFX_SELECT, SFX_WRONG,
};
use crate::listener::{AdvanceListener, ListenerGuard};
use crate::minigame::{MinigameInput, MinigameRegistry, MinigameTask, MinigameTicket, TaskStatus};
use crate::scene::{MinigameDescriptor, Scene, SceneId, SceneKind, StoryGraph};

/// Longest chain of scene loads processed for one operation
const MAX_TRANSITION_CHAIN: usize = 64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InterpreterState {
    #[default]
    Idle,
    RenderingNode,
    AwaitingChoice,
    AwaitingMinigame,
    AwaitingInputPuzzle,
}

/// Why dialogue mode ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndReason {
    /// Last node passed and no choices to offer
    SceneExhausted,
    /// A choice, minigame or puzzle had no follow-up scene
    NoNextScene,
    SceneNotFound(SceneId),
    /// Scene loads kept chaining without waiting for the player
    TransitionLoop,
}

/// Host-facing notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoryEvent {
    SceneEntered(SceneId),
    FlagRaised { flag: String, first_time: bool },
    MinigameStarted { scene: SceneId, kind: String, ticket: MinigameTicket },
    MinigameResolved { scene: SceneId, ticket: MinigameTicket },
    InputAccepted { scene: SceneId },
    InputRejected { scene: SceneId },
    /// The end-of-dialogue signal; the host leaves dialogue presentation
    DialogueEnded { reason: EndReason },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Cursor {
    scene: SceneId,
    index: usize,
}

/// A `System` overlay waiting to be dismissed
#[derive(Debug, Clone, Copy)]
struct Overlay {
    elapsed_ms: u32,
    auto: bool,
}

struct ActiveMinigame {
    ticket: MinigameTicket,
    scene: SceneId,
    descriptor: MinigameDescriptor,
    task: Box<dyn MinigameTask>,
    last_status: String,
}

pub struct SceneInterpreter<P: Presenter> {
    story: Rc<StoryGraph>,
    presenter: P,
    registry: MinigameRegistry,
    flags: FlagStore,

    system_advance: SystemMessageAdvance,
    system_delay_ms: u32,

    state: InterpreterState,
    cursor: Option<Cursor>,
    overlay: Option<Overlay>,
    choice_generation: u64,
    choices_live: bool,
    minigame: Option<ActiveMinigame>,
    next_ticket: u64,

    listener: AdvanceListener,
    guard: Option<ListenerGuard>,
}

impl<P: Presenter> SceneInterpreter<P> {
    /// Interpreter with the built-in minigames and default settings
    pub fn new(story: StoryGraph, presenter: P) -> Self {
        Self {
            story: Rc::new(story),
            presenter,
            registry: MinigameRegistry::with_builtin(),
            flags: FlagStore::new(),
            system_advance: SystemMessageAdvance::default(),
            system_delay_ms: DEFAULT_SYSTEM_MESSAGE_DELAY_MS,
            state: InterpreterState::Idle,
            cursor: None,
            overlay: None,
            choice_generation: 0,
            choices_live: false,
            minigame: None,
            next_ticket: 0,
            listener: AdvanceListener::new(),
            guard: None,
        }
    }

    pub fn with_registry(mut self, registry: MinigameRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Apply the system-message settings from the engine config
    pub fn with_config(mut self, config: &EngineConfig) -> Self {
        self.system_advance = config.system_message_advance;
        self.system_delay_ms = config.system_message_delay_ms;
        self
    }

    // ─── Accessors ───

    pub fn state(&self) -> InterpreterState {
        self.state
    }

    pub fn story(&self) -> &StoryGraph {
        &self.story
    }

    /// Read-only flag view for hotspot logic
    pub fn flags(&self) -> &FlagStore {
        &self.flags
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    /// Handle the host polls before routing advance signals
    pub fn listener(&self) -> AdvanceListener {
        self.listener.clone()
    }

    pub fn in_dialogue(&self) -> bool {
        self.guard.is_some()
    }

    pub fn current_scene(&self) -> Option<&str> {
        self.cursor.as_ref().map(|c| c.scene.as_str())
    }

    pub fn node_index(&self) -> Option<usize> {
        self.cursor.as_ref().map(|c| c.index)
    }

    /// Ticket of the pending minigame, if one is running
    pub fn active_minigame(&self) -> Option<MinigameTicket> {
        self.minigame.as_ref().map(|m| m.ticket)
    }

    /// Handle for choice `index` of the list on screen
    pub fn choice_handle(&self, index: usize) -> Option<ChoiceHandle> {
        if !self.choices_live {
            return None;
        }
        let cursor = self.cursor.as_ref()?;
        let count = self.story.scenes.get(&cursor.scene)?.choices.len();
        (index < count).then_some(ChoiceHandle {
            generation: self.choice_generation,
            index,
        })
    }

    // ─── Host operations ───

    /// Enter dialogue mode and load the first scene
    pub fn start_story(&mut self, scene_id: &str) -> Vec<StoryEvent> {
        tracing::info!("Starting story at '{}'", scene_id);
        self.enter_dialogue_mode();
        self.load_scene(scene_id)
    }

    /// Load a scene. Unknown ids end the dialogue instead of failing.
    pub fn load_scene(&mut self, scene_id: &str) -> Vec<StoryEvent> {
        let mut events = Vec::new();
        self.enter_dialogue_mode();
        self.run_transitions(scene_id.to_string(), &mut events);
        events
    }

    /// The generic continue signal (click / Space / Enter)
    pub fn advance(&mut self) -> Vec<StoryEvent> {
        let mut events = Vec::new();
        if self.state != InterpreterState::RenderingNode {
            if self.state == InterpreterState::AwaitingInputPuzzle {
                tracing::debug!("Advance ignored while the input prompt is open");
            }
            return events;
        }
        let Some(cursor) = self.cursor.clone() else {
            return events;
        };
        let story = Rc::clone(&self.story);
        let Ok(scene) = story.scene(&cursor.scene) else {
            self.finish(EndReason::SceneNotFound(cursor.scene), &mut events);
            return events;
        };

        if self.overlay.take().is_some() {
            self.presenter.dismiss_system_message();
            self.render_node(&story, &cursor.scene, scene, cursor.index + 1, &mut events);
            return events;
        }

        match scene.last_index() {
            Some(last) if cursor.index < last => {
                self.render_node(&story, &cursor.scene, scene, cursor.index + 1, &mut events);
            }
            // Choices need an explicit selection
            _ if scene.has_choices() => {}
            _ => self.finish(EndReason::SceneExhausted, &mut events),
        }
        events
    }

    /// Select a choice from the list currently on screen
    pub fn select_choice(&mut self, handle: ChoiceHandle) -> Vec<StoryEvent> {
        let mut events = Vec::new();
        if self.state != InterpreterState::AwaitingChoice
            || !self.choices_live
            || handle.generation != self.choice_generation
        {
            tracing::debug!("Ignoring stale choice {:?}", handle);
            return events;
        }
        let Some(cursor) = self.cursor.clone() else {
            return events;
        };
        let story = Rc::clone(&self.story);
        let Some(choice) = story
            .scenes
            .get(&cursor.scene)
            .and_then(|s| s.choices.get(handle.index))
        else {
            tracing::warn!("Choice index {} out of range in '{}'", handle.index, cursor.scene);
            return events;
        };

        self.retract_choices();
        tracing::info!("Choice selected: \"{}\"", choice.text);
        match &choice.next_scene {
            Some(next) => self.run_transitions(next.clone(), &mut events),
            None => self.finish(EndReason::NoNextScene, &mut events),
        }
        events
    }

    /// Select choice `index` of the current list
    pub fn choose(&mut self, index: usize) -> Vec<StoryEvent> {
        match self.choice_handle(index) {
            Some(handle) => self.select_choice(handle),
            None => {
                tracing::debug!("No choice {} on screen", index);
                Vec::new()
            }
        }
    }

    /// Submit an answer to the open input puzzle
    pub fn submit_answer(&mut self, text: &str) -> Vec<StoryEvent> {
        let mut events = Vec::new();
        if self.state != InterpreterState::AwaitingInputPuzzle {
            return events;
        }
        let Some(cursor) = self.cursor.clone() else {
            return events;
        };
        let story = Rc::clone(&self.story);
        let Some(SceneKind::InputPuzzle(puzzle)) = story.scenes.get(&cursor.scene).map(Scene::kind) else {
            return events;
        };

        if !puzzle.accepts(text) {
            tracing::debug!("Wrong answer for '{}'", cursor.scene);
            self.presenter.play_sfx(SFX_WRONG);
            self.presenter.show_input_feedback(InputFeedback::Incorrect);
            events.push(StoryEvent::InputRejected { scene: cursor.scene });
            return events;
        }

        tracing::info!("Input puzzle '{}' solved", cursor.scene);
        self.presenter.play_sfx(SFX_SELECT);
        self.presenter.show_input_feedback(InputFeedback::Accepted);
        events.push(StoryEvent::InputAccepted { scene: cursor.scene });
        match puzzle.next_on_correct {
            Some(next) => self.run_transitions(next.to_string(), &mut events),
            None => self.finish(EndReason::NoNextScene, &mut events),
        }
        events
    }

    /// Route a player action to the running minigame
    pub fn minigame_input(&mut self, input: MinigameInput) -> Vec<StoryEvent> {
        let mut events = Vec::new();
        let Some(active) = self.minigame.as_mut() else {
            tracing::debug!("No minigame running for {:?}", input);
            return events;
        };
        let status = active.task.handle(&input);
        let ticket = active.ticket;
        self.refresh_minigame();
        if status == TaskStatus::Completed {
            self.complete_into(ticket, &mut events);
        }
        events
    }

    /// Completion signal from a minigame. Only the ticket of the pending
    /// instance resolves it; repeats and stale tickets are ignored.
    pub fn complete_minigame(&mut self, ticket: MinigameTicket) -> Vec<StoryEvent> {
        let mut events = Vec::new();
        self.complete_into(ticket, &mut events);
        events
    }

    /// Advance time: system-message auto-dismiss and the minigame clock
    pub fn tick(&mut self, dt_ms: u32) -> Vec<StoryEvent> {
        let mut events = Vec::new();

        if let Some(overlay) = self.overlay.as_mut().filter(|o| o.auto) {
            overlay.elapsed_ms = overlay.elapsed_ms.saturating_add(dt_ms);
            if overlay.elapsed_ms >= self.system_delay_ms {
                events.extend(self.advance());
            }
        }

        if let Some(active) = self.minigame.as_mut() {
            let status = active.task.tick(dt_ms);
            let ticket = active.ticket;
            self.refresh_minigame();
            if status == TaskStatus::Completed {
                self.complete_into(ticket, &mut events);
            }
        }
        events
    }

    /// Host-initiated exit from dialogue mode. Abandons any pending
    /// minigame and emits no events.
    pub fn cancel(&mut self) {
        if self.state == InterpreterState::Idle && self.guard.is_none() {
            return;
        }
        tracing::info!("Dialogue cancelled by host");
        self.clear_transient();
        self.state = InterpreterState::Idle;
        self.cursor = None;
        self.guard = None;
    }

    // ─── Scene loading ───

    fn enter_dialogue_mode(&mut self) {
        if self.guard.is_none() {
            self.guard = Some(self.listener.activate());
        }
    }

    /// Load `first` and any scenes it immediately chains into
    fn run_transitions(&mut self, first: SceneId, events: &mut Vec<StoryEvent>) {
        let mut next = Some(first);
        let mut hops = 0;
        while let Some(scene_id) = next.take() {
            hops += 1;
            if hops > MAX_TRANSITION_CHAIN {
                tracing::error!("Scene transitions looped at '{}'", scene_id);
                self.finish(EndReason::TransitionLoop, events);
                return;
            }
            next = self.enter_scene(&scene_id, events);
        }
    }

    /// Enter one scene. Returns the scene to load next when the scene
    /// resolves without waiting for the player.
    fn enter_scene(&mut self, scene_id: &str, events: &mut Vec<StoryEvent>) -> Option<SceneId> {
        self.clear_transient();
        let story = Rc::clone(&self.story);
        let scene = match story.scene(scene_id) {
            Ok(scene) => scene,
            Err(e) => {
                tracing::error!("{}", e);
                self.finish(EndReason::SceneNotFound(scene_id.to_string()), events);
                return None;
            }
        };

        tracing::info!("Entering scene '{}'", scene_id);
        self.cursor = Some(Cursor {
            scene: scene_id.to_string(),
            index: 0,
        });
        events.push(StoryEvent::SceneEntered(scene_id.to_string()));

        for flag in &scene.on_enter_set_flags {
            let first_time = self.flags.raise(flag);
            events.push(StoryEvent::FlagRaised {
                flag: flag.clone(),
                first_time,
            });
        }
        if let Some(sfx) = &scene.on_enter_sfx {
            self.presenter.play_sfx(sfx);
        }
        self.presenter.set_background(&Backdrop::for_scene(&story, scene));
        if scene.music.is_some() {
            self.presenter.play_music(scene.music.as_deref());
        }

        match scene.kind() {
            SceneKind::Minigame(descriptor) => {
                self.presenter
                    .apply_effects(&EffectSet::resolve(&story, &scene.effects_on_start));
                return self.launch_minigame(scene_id, descriptor, events);
            }
            SceneKind::InputPuzzle(puzzle) => {
                let lead = NodeFrame::build(&story, scene_id, scene, 0);
                let effects = match &lead {
                    Some(frame) => frame.effects.clone(),
                    None => EffectSet::resolve(&story, &scene.effects_on_start),
                };
                self.presenter.apply_effects(&effects);
                self.presenter.show_input_prompt(&InputPromptView {
                    scene: scene_id.to_string(),
                    prompt: puzzle.prompt.to_string(),
                    lead,
                });
                self.state = InterpreterState::AwaitingInputPuzzle;
            }
            SceneKind::Dialogue => {
                if scene.dialogue.is_empty() {
                    self.presenter
                        .apply_effects(&EffectSet::resolve(&story, &scene.effects_on_start));
                }
                self.render_node(&story, scene_id, scene, 0, events);
            }
        }
        None
    }

    // ─── Rendering ───

    fn render_node(
        &mut self,
        story: &StoryGraph,
        scene_id: &str,
        scene: &Scene,
        index: usize,
        events: &mut Vec<StoryEvent>,
    ) {
        self.cursor = Some(Cursor {
            scene: scene_id.to_string(),
            index,
        });

        let Some(frame) = NodeFrame::build(story, scene_id, scene, index) else {
            if scene.has_choices() {
                self.offer_choices(scene);
            } else {
                self.finish(EndReason::SceneExhausted, events);
            }
            return;
        };

        self.presenter.apply_effects(&frame.effects);
        self.state = InterpreterState::RenderingNode;

        if scene.dialogue[index].is_system() {
            self.retract_choices();
            self.presenter.show_system_message(&frame);
            let mode = scene.system_message_advance.unwrap_or(self.system_advance);
            self.overlay = Some(Overlay {
                elapsed_ms: 0,
                auto: mode == SystemMessageAdvance::Auto,
            });
            return;
        }

        self.presenter.show_node(&frame);
        if frame.is_last() && scene.has_choices() {
            self.offer_choices(scene);
        }
    }

    fn offer_choices(&mut self, scene: &Scene) {
        self.choice_generation += 1;
        let generation = self.choice_generation;
        let views: Vec<ChoiceView> = scene
            .choices
            .iter()
            .enumerate()
            .map(|(index, choice)| ChoiceView {
                handle: ChoiceHandle { generation, index },
                text: choice.text.clone(),
                hover_sfx: choice.hover_sfx.clone(),
                hover_hint: choice.hover_hint.clone(),
            })
            .collect();
        self.presenter.show_choices(&views);
        self.choices_live = true;
        self.state = InterpreterState::AwaitingChoice;
    }

    fn retract_choices(&mut self) {
        if self.choices_live {
            self.presenter.clear_choices();
            self.choices_live = false;
        }
    }

    /// Drop per-scene presentation state: overlay, choices, minigame
    fn clear_transient(&mut self) {
        if self.overlay.take().is_some() {
            self.presenter.dismiss_system_message();
        }
        self.retract_choices();
        if let Some(abandoned) = self.minigame.take() {
            tracing::debug!("Abandoning minigame {} in '{}'", abandoned.ticket, abandoned.scene);
            self.presenter.hide_minigame();
        }
    }

    fn finish(&mut self, reason: EndReason, events: &mut Vec<StoryEvent>) {
        self.clear_transient();
        self.state = InterpreterState::Idle;
        self.cursor = None;
        self.guard = None;
        tracing::info!("Dialogue ended: {:?}", reason);
        events.push(StoryEvent::DialogueEnded { reason });
    }

    // ─── Minigames ───

    fn launch_minigame(
        &mut self,
        scene_id: &str,
        descriptor: &MinigameDescriptor,
        events: &mut Vec<StoryEvent>,
    ) -> Option<SceneId> {
        let task = self.registry.launch_or_fallback(descriptor);
        self.next_ticket += 1;
        let ticket = MinigameTicket(self.next_ticket);
        tracing::info!("Minigame {} '{}' started in '{}'", ticket, descriptor.kind, scene_id);
        events.push(StoryEvent::MinigameStarted {
            scene: scene_id.to_string(),
            kind: descriptor.kind.clone(),
            ticket,
        });

        let already_done = task.status() == TaskStatus::Completed;
        let active = ActiveMinigame {
            ticket,
            scene: scene_id.to_string(),
            descriptor: descriptor.clone(),
            last_status: task.status_line(),
            task,
        };
        self.presenter.show_minigame(&minigame_view(&active));
        self.minigame = Some(active);
        self.state = InterpreterState::AwaitingMinigame;

        if already_done {
            return self.resolve_minigame(ticket, events);
        }
        None
    }

    /// Re-show the minigame when its status line changed
    fn refresh_minigame(&mut self) {
        let Some(active) = self.minigame.as_mut() else {
            return;
        };
        let status = active.task.status_line();
        if status != active.last_status {
            active.last_status = status;
            self.presenter.show_minigame(&minigame_view(active));
        }
    }

    fn complete_into(&mut self, ticket: MinigameTicket, events: &mut Vec<StoryEvent>) {
        if let Some(next) = self.resolve_minigame(ticket, events) {
            self.run_transitions(next, events);
        }
    }

    /// Close the pending minigame. Returns its `onComplete` target.
    fn resolve_minigame(&mut self, ticket: MinigameTicket, events: &mut Vec<StoryEvent>) -> Option<SceneId> {
        if self.active_minigame() != Some(ticket) {
            tracing::warn!("Ignoring completion from stale minigame {}", ticket);
            return None;
        }
        let active = self.minigame.take()?;
        self.presenter.hide_minigame();
        tracing::info!("Minigame {} '{}' completed", ticket, active.descriptor.kind);
        events.push(StoryEvent::MinigameResolved {
            scene: active.scene,
            ticket,
        });

        match active.descriptor.on_complete {
            Some(next) => Some(next),
            None => {
                self.finish(EndReason::NoNextScene, events);
                None
            }
        }
    }
}

fn minigame_view(active: &ActiveMinigame) -> MinigameView {
    MinigameView {
        ticket: active.ticket,
        kind: active.descriptor.kind.clone(),
        title: active.descriptor.title.clone(),
        description: active.descriptor.description.clone(),
        difficulty: active.descriptor.difficulty.clone(),
        status: active.last_status.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{PresenterCall, TranscriptPresenter};
    use crate::minigame::Acknowledge;
    use crate::scene::{Choice, DialogueNode};

    fn lines(texts: &[&str]) -> Vec<DialogueNode> {
        texts.iter().map(|t| DialogueNode::new("Kael", t)).collect()
    }

    fn interp(story: StoryGraph) -> SceneInterpreter<TranscriptPresenter> {
        SceneInterpreter::new(story, TranscriptPresenter::new())
    }

    fn ended(events: &[StoryEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, StoryEvent::DialogueEnded { .. }))
            .count()
    }

    #[test]
    fn start_story_holds_the_listener() {
        let story = StoryGraph::new("t").with_scene("a", Scene::dialogue(lines(&["one"])));
        let mut it = interp(story);
        let listener = it.listener();
        assert!(!listener.is_active());

        it.start_story("a");
        assert!(listener.is_active());
        assert_eq!(it.state(), InterpreterState::RenderingNode);

        let events = it.advance();
        assert_eq!(ended(&events), 1);
        assert!(!listener.is_active());
        assert_eq!(it.state(), InterpreterState::Idle);
    }

    #[test]
    fn system_overlay_is_dismissed_before_next_node() {
        let story = StoryGraph::new("t").with_scene(
            "a",
            Scene::dialogue(vec![DialogueNode::system("BOOT"), DialogueNode::new("Kael", "hi")]),
        );
        let mut it = interp(story);
        it.start_story("a");
        assert!(matches!(it.presenter().calls.last(), Some(PresenterCall::SystemMessage(f)) if f.text == "BOOT"));

        it.advance();
        let calls = &it.presenter().calls;
        assert!(calls.contains(&PresenterCall::DismissSystemMessage));
        assert_eq!(it.node_index(), Some(1));
        assert_eq!(it.presenter().rendered_texts(), vec!["BOOT", "hi"]);
    }

    #[test]
    fn trailing_system_message_then_choices() {
        let story = StoryGraph::new("t").with_scene(
            "a",
            Scene::dialogue(vec![DialogueNode::new("Kael", "hi"), DialogueNode::system("LOCK")])
                .with_choices(vec![Choice::end("Leave")]),
        );
        let mut it = interp(story);
        it.start_story("a");
        it.advance();
        assert!(it.presenter().last_choices().is_none());
        assert_eq!(it.state(), InterpreterState::RenderingNode);

        it.advance();
        assert_eq!(it.state(), InterpreterState::AwaitingChoice);
        assert_eq!(it.presenter().last_choices().map(|c| c.len()), Some(1));

        let events = it.choose(0);
        assert_eq!(events, vec![StoryEvent::DialogueEnded { reason: EndReason::NoNextScene }]);
    }

    #[test]
    fn auto_system_messages_dismiss_on_tick() {
        let config = EngineConfig {
            system_message_advance: SystemMessageAdvance::Auto,
            system_message_delay_ms: 1000,
            ..Default::default()
        };
        let story = StoryGraph::new("t").with_scene(
            "a",
            Scene::dialogue(vec![DialogueNode::system("SCAN"), DialogueNode::new("Kael", "hi")]),
        );
        let mut it = interp(story).with_config(&config);
        it.start_story("a");
        it.tick(999);
        assert_eq!(it.node_index(), Some(0));
        it.tick(1);
        assert_eq!(it.node_index(), Some(1));
    }

    #[test]
    fn scene_override_keeps_manual_mode() {
        let config = EngineConfig {
            system_message_advance: SystemMessageAdvance::Auto,
            ..Default::default()
        };
        let mut scene = Scene::dialogue(vec![DialogueNode::system("SCAN"), DialogueNode::new("Kael", "hi")]);
        scene.system_message_advance = Some(SystemMessageAdvance::Manual);
        let mut it = interp(StoryGraph::new("t").with_scene("a", scene)).with_config(&config);
        it.start_story("a");
        it.tick(60_000);
        assert_eq!(it.node_index(), Some(0));
    }

    #[test]
    fn stale_choice_handles_are_ignored() {
        let story = StoryGraph::new("t")
            .with_scene(
                "a",
                Scene::dialogue(lines(&["pick"])).with_choices(vec![Choice::to("Go", "b")]),
            )
            .with_scene(
                "b",
                Scene::dialogue(lines(&["again"])).with_choices(vec![Choice::to("Back", "a")]),
            );
        let mut it = interp(story);
        it.start_story("a");
        let first = it.choice_handle(0).unwrap();

        let events = it.select_choice(first);
        assert_eq!(events, vec![StoryEvent::SceneEntered("b".into())]);
        // Same handle again: double-fired click
        assert!(it.select_choice(first).is_empty());
        assert_eq!(it.current_scene(), Some("b"));
        assert!(it.choice_handle(3).is_none());
    }

    #[test]
    fn flags_are_raised_on_every_entry() {
        let story = StoryGraph::new("t").with_scene(
            "solved",
            Scene::dialogue(lines(&["fixed"])).with_flags(&["jukeboxFixed"]),
        );
        let mut it = interp(story);
        let events = it.start_story("solved");
        assert!(events.contains(&StoryEvent::FlagRaised { flag: "jukeboxFixed".into(), first_time: true }));
        it.advance();

        let events = it.start_story("solved");
        assert!(events.contains(&StoryEvent::FlagRaised { flag: "jukeboxFixed".into(), first_time: false }));
        assert!(it.flags().is_set("jukeboxFixed"));
        assert_eq!(it.flags().len(), 1);
    }

    #[test]
    fn minigame_input_drives_completion() {
        let story = StoryGraph::new("t")
            .with_scene("m", Scene::minigame(MinigameDescriptor::new("mystery", Some("after"))))
            .with_scene("after", Scene::dialogue(lines(&["done"])));
        let mut it = interp(story);
        let events = it.start_story("m");
        assert!(matches!(&events[1], StoryEvent::MinigameStarted { kind, .. } if kind == "mystery"));
        assert_eq!(it.state(), InterpreterState::AwaitingMinigame);

        // Advance signals do nothing while a minigame runs
        assert!(it.advance().is_empty());
        assert!(it.minigame_input(MinigameInput::Move).is_empty());

        let events = it.minigame_input(MinigameInput::Acknowledge);
        assert!(matches!(&events[0], StoryEvent::MinigameResolved { scene, .. } if scene == "m"));
        assert_eq!(events[1], StoryEvent::SceneEntered("after".into()));
        assert!(it.presenter().calls.contains(&PresenterCall::HideMinigame));
    }

    #[test]
    fn minigame_without_target_ends_dialogue() {
        let story = StoryGraph::new("t")
            .with_scene("m", Scene::minigame(MinigameDescriptor::new("mystery", None)));
        let mut it = interp(story);
        let events = it.start_story("m");
        let ticket = ticket_of(&events);
        let events = it.complete_minigame(ticket);
        assert_eq!(ended(&events), 1);
        assert!(it.complete_minigame(ticket).is_empty());
    }

    fn ticket_of(events: &[StoryEvent]) -> MinigameTicket {
        events
            .iter()
            .find_map(|e| match e {
                StoryEvent::MinigameStarted { ticket, .. } => Some(*ticket),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn cancel_abandons_pending_minigame() {
        let story = StoryGraph::new("t")
            .with_scene("m", Scene::minigame(MinigameDescriptor::new("mystery", Some("after"))))
            .with_scene("after", Scene::dialogue(lines(&["done"])));
        let mut it = interp(story);
        let listener = it.listener();
        let ticket = ticket_of(&it.start_story("m"));

        it.cancel();
        assert!(!listener.is_active());
        assert_eq!(it.state(), InterpreterState::Idle);
        assert!(it.complete_minigame(ticket).is_empty());
        assert!(it.current_scene().is_none());
    }

    #[test]
    fn instantly_completed_minigame_chains_on() {
        let mut registry = MinigameRegistry::new();
        registry.register("auto", |d: &MinigameDescriptor| {
            let mut task = Acknowledge::new(&d.kind);
            task.handle(&MinigameInput::Acknowledge);
            Box::new(task) as Box<dyn MinigameTask>
        });
        let story = StoryGraph::new("t")
            .with_scene("m", Scene::minigame(MinigameDescriptor::new("auto", Some("after"))))
            .with_scene("after", Scene::dialogue(lines(&["done"])));
        let mut it = interp(story).with_registry(registry);
        let events = it.start_story("m");
        assert!(events.contains(&StoryEvent::SceneEntered("after".into())));
        assert_eq!(it.state(), InterpreterState::RenderingNode);
    }

    #[test]
    fn self_completing_loop_is_cut_off() {
        let mut registry = MinigameRegistry::new();
        registry.register("auto", |d: &MinigameDescriptor| {
            let mut task = Acknowledge::new(&d.kind);
            task.handle(&MinigameInput::Acknowledge);
            Box::new(task) as Box<dyn MinigameTask>
        });
        let story = StoryGraph::new("t")
            .with_scene("m", Scene::minigame(MinigameDescriptor::new("auto", Some("m"))));
        let mut it = interp(story).with_registry(registry);
        let listener = it.listener();
        let events = it.start_story("m");
        assert_eq!(
            events.last(),
            Some(&StoryEvent::DialogueEnded { reason: EndReason::TransitionLoop })
        );
        assert_eq!(ended(&events), 1);
        assert!(!listener.is_active());
    }

    #[test]
    fn advance_is_ignored_during_input_puzzle() {
        let story = StoryGraph::new("t")
            .with_scene("q", Scene::input("Name?", "echo", "next"))
            .with_scene("next", Scene::dialogue(lines(&["ok"])));
        let mut it = interp(story);
        it.start_story("q");
        assert!(it.advance().is_empty());
        assert_eq!(it.state(), InterpreterState::AwaitingInputPuzzle);
        assert!(it.listener().is_active());
    }

    #[test]
    fn effects_replace_per_render() {
        let story = StoryGraph::new("t").with_scene(
            "a",
            Scene::dialogue(vec![
                DialogueNode::new("Kael", "glitchy").with_effects(&[crate::scene::Effect::Glitch]),
                DialogueNode::new("Kael", "calm"),
            ]),
        );
        let mut it = interp(story);
        it.start_story("a");
        it.advance();
        let effects: Vec<&EffectSet> = it
            .presenter()
            .calls
            .iter()
            .filter_map(|c| match c {
                PresenterCall::Effects(set) => Some(set),
                _ => None,
            })
            .collect();
        assert_eq!(effects.len(), 2);
        assert!(effects[0].contains(crate::scene::Effect::Glitch));
        assert!(effects[1].is_empty());
    }
}
