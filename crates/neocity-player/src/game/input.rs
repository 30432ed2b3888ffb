//! Line commands typed at the terminal.

use neocity_story::minigame::sequence::PAD_LABELS;
use neocity_story::MinigameInput;

/// What the host is waiting for; decides how bare text is read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Menu,
    World,
    Dialogue,
    /// An input puzzle is open: bare text is an answer
    Answer,
    Minigame,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Empty line / `next`: the advance signal
    Advance,
    /// Zero-based choice index (typed one-based)
    Choose(usize),
    Answer(String),
    Minigame(MinigameInput),
    Look(String),
    Start,
    Flags,
    Help,
    Quit,
    Unknown(String),
}

pub const HELP: &str = "\
Commands:
  <enter> | next       continue dialogue
  1..9                 pick a choice
  answer <text>        answer a prompt (or just type it)
  pad <q|w|a|s|0-3>    press a sequence pad
  rotate <x> <y>       rotate a circuit tile (0-2)
  select <n>           select a wave segment (0-4)
  move | replay | reset | ok
  look <hotspot>       jukebox, sign, kael, archive
  start | flags | help | quit";

fn parse_pad(arg: &str) -> Option<usize> {
    if let Ok(n) = arg.parse::<usize>() {
        return Some(n);
    }
    PAD_LABELS.iter().position(|label| label.eq_ignore_ascii_case(arg))
}

/// Parse one line of input
pub fn parse(line: &str, mode: InputMode) -> Command {
    let trimmed = line.trim();
    let mut words = trimmed.split_whitespace();
    let head = words.next().unwrap_or("").to_ascii_lowercase();
    let args: Vec<&str> = words.collect();

    match (head.as_str(), args.as_slice()) {
        ("", _) | ("next", []) => return Command::Advance,
        ("quit" | "exit", []) => return Command::Quit,
        ("help" | "?", []) => return Command::Help,
        ("flags", []) => return Command::Flags,
        ("answer", [_, ..]) => {
            let text = trimmed[head.len()..].trim_start();
            return Command::Answer(text.to_string());
        }
        _ => {}
    }

    if mode == InputMode::Answer {
        return Command::Answer(trimmed.to_string());
    }

    let minigame = Command::Minigame;
    match (head.as_str(), args.as_slice()) {
        ("start", []) => Command::Start,
        ("look", [target]) => Command::Look(target.to_ascii_lowercase()),
        ("ok", []) => minigame(MinigameInput::Acknowledge),
        ("move", []) => minigame(MinigameInput::Move),
        ("replay", []) => minigame(MinigameInput::Replay),
        ("reset", []) => minigame(MinigameInput::Reset),
        ("pad", [pad]) => match parse_pad(pad) {
            Some(pad) => minigame(MinigameInput::Pad(pad)),
            None => Command::Unknown(trimmed.to_string()),
        },
        ("select", [n]) => match n.parse() {
            Ok(n) => minigame(MinigameInput::Select(n)),
            Err(_) => Command::Unknown(trimmed.to_string()),
        },
        ("rotate", [x, y]) => match (x.parse(), y.parse()) {
            (Ok(x), Ok(y)) => minigame(MinigameInput::Rotate { x, y }),
            _ => Command::Unknown(trimmed.to_string()),
        },
        (number, []) => match number.parse::<usize>() {
            Ok(n) if n >= 1 => Command::Choose(n - 1),
            _ => Command::Unknown(trimmed.to_string()),
        },
        _ => Command::Unknown(trimmed.to_string()),
    }
}
