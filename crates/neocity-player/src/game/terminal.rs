//! Text rendering collaborator: prints frames to a terminal.
//!
//! Images and audio have no terminal form; backgrounds, music and sound
//! cues are printed as short tags and missing assets print nothing.

use std::io::Write;
use std::path::Path;

use neocity_story::frame::{
    Backdrop, ChoiceView, EffectSet, InputFeedback, InputPromptView, MinigameView, NodeFrame,
    Portrait, PortraitFrame, Presenter,
};
use neocity_story::MinigameTicket;

pub struct TerminalPresenter<W: Write> {
    out: W,
    /// Minigame whose header was already printed
    minigame: Option<MinigameTicket>,
}

impl<W: Write> TerminalPresenter<W> {
    pub fn new(out: W) -> Self {
        Self { out, minigame: None }
    }

    fn line(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{}", text) {
            tracing::warn!("Terminal write failed: {}", e);
        }
    }
}

/// File stem of an asset path, for short tags
fn cue_name(path: &str) -> &str {
    Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
}

fn portrait_tag(portraits: &PortraitFrame) -> Option<String> {
    match portraits {
        PortraitFrame::Dual { left, right } => {
            let name = |p: &Option<Portrait>| {
                p.as_ref().map_or("-".to_string(), |p| {
                    if p.speaking {
                        format!("*{}*", p.character)
                    } else {
                        p.character.clone()
                    }
                })
            };
            Some(format!("[{} | {}]", name(left), name(right)))
        }
        _ => None,
    }
}

impl<W: Write> Presenter for TerminalPresenter<W> {
    fn set_background(&mut self, backdrop: &Backdrop) {
        if let Some(key) = &backdrop.key {
            self.line(&format!("\n=== {} ===", key.replace('_', " ")));
        }
    }

    fn play_music(&mut self, cue: Option<&str>) {
        if let Some(cue) = cue {
            self.line(&format!("(music: {})", cue_name(cue)));
        }
    }

    fn play_sfx(&mut self, cue: &str) {
        self.line(&format!("(sfx: {})", cue_name(cue)));
    }

    fn apply_effects(&mut self, effects: &EffectSet) {
        if effects.is_empty() {
            return;
        }
        let tags: Vec<&str> = effects.effects.iter().map(|e| e.effect.tag()).collect();
        self.line(&format!("~ {} ~", tags.join(" ")));
    }

    fn show_node(&mut self, frame: &NodeFrame) {
        if let Some(tag) = portrait_tag(&frame.portraits) {
            self.line(&tag);
        }
        let speaker = match &frame.emotion {
            Some(emotion) => format!("{} ({})", frame.speaker, emotion),
            None => frame.speaker.clone(),
        };
        self.line(&format!("{}: {}", speaker, frame.text));
    }

    fn show_system_message(&mut self, frame: &NodeFrame) {
        self.line(&format!(">> {}", frame.text));
    }

    fn show_choices(&mut self, choices: &[ChoiceView]) {
        for (n, choice) in choices.iter().enumerate() {
            match &choice.hover_hint {
                Some(hint) => self.line(&format!("  {}. {}  ({})", n + 1, choice.text, hint)),
                None => self.line(&format!("  {}. {}", n + 1, choice.text)),
            }
        }
    }

    fn clear_choices(&mut self) {}

    fn show_input_prompt(&mut self, view: &InputPromptView) {
        if let Some(lead) = &view.lead {
            self.show_node(lead);
        }
        self.line(&format!("? {}", view.prompt));
    }

    fn show_input_feedback(&mut self, feedback: InputFeedback) {
        match feedback {
            InputFeedback::Accepted => self.line("Access granted."),
            InputFeedback::Incorrect => self.line("Incorrect. Try again."),
        }
    }

    fn show_minigame(&mut self, view: &MinigameView) {
        if self.minigame != Some(view.ticket) {
            self.minigame = Some(view.ticket);
            let title = view.title.as_deref().unwrap_or(&view.kind);
            self.line(&format!("\n[ {} ]", title));
            if let Some(description) = &view.description {
                self.line(description);
            }
        }
        self.line(&view.status);
    }

    fn hide_minigame(&mut self) {
        self.minigame = None;
    }
}
