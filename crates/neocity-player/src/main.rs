/// Neocity Player - terminal host for the Neocity visual novel
///
/// Architecture:
///   neocity-common - configuration (TOML)
///   neocity-story  - scene graph, interpreter, minigames
///   game/          - host states, hotspots, line input, text rendering

mod game;

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Parser;
use neocity_common::{AppConfig, SystemMessageAdvance};
use neocity_story::{SceneInterpreter, StoryGraph};
use tracing_subscriber::EnvFilter;

use crate::game::input;
use crate::game::terminal::TerminalPresenter;
use crate::game::{Flow, Game};

const DEFAULT_CONFIG: &str = "neocity.toml";

#[derive(Parser)]
#[command(name = "neocity", version, about = "Play the Neocity visual novel in a terminal")]
struct Args {
    /// Config file (defaults to ./neocity.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// External scene graph JSON instead of the built-in chapter
    #[arg(long)]
    story: Option<PathBuf>,

    /// Scene the archive terminal opens
    #[arg(long)]
    scene: Option<String>,

    /// Advance system messages on a timer
    #[arg(long)]
    auto_system: bool,

    /// Refuse to start when the story has dangling edges
    #[arg(long)]
    strict: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AppConfig::load_or_default(DEFAULT_CONFIG).context("Failed to load neocity.toml")?,
    };
    if let Some(story) = args.story {
        config.engine.story_path = Some(story);
    }
    if let Some(scene) = args.scene {
        config.engine.start_scene = Some(scene);
    }
    if args.auto_system {
        config.engine.system_message_advance = SystemMessageAdvance::Auto;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(format!("neocity={}", config.log_level).parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Neocity Player v{}", env!("CARGO_PKG_VERSION"));

    let story = match &config.engine.story_path {
        Some(path) => StoryGraph::load(path)
            .with_context(|| format!("Failed to load story {}", path.display()))?,
        None => StoryGraph::chapter_one().context("Built-in chapter is malformed")?,
    };
    let story = if args.strict {
        story.into_validated().context("Story failed validation")?
    } else {
        for issue in story.validate() {
            tracing::warn!("Story: {}", issue);
        }
        story
    };
    tracing::info!(
        "Loaded '{}': {} scenes, system messages {}",
        story.title,
        story.scenes.len(),
        config.engine.system_message_advance.display_name()
    );

    let start = match config.engine.start_scene.clone().or_else(|| story.start.clone()) {
        Some(start) => start,
        None => bail!("No start scene: set engine.start_scene or the story's `start`"),
    };

    let presenter = TerminalPresenter::new(std::io::stdout());
    let interpreter = SceneInterpreter::new(story, presenter).with_config(&config.engine);
    let mut game = Game::new(interpreter, start);

    run(&mut game)
}

/// Read commands until `quit` or end of input
fn run(game: &mut Game<TerminalPresenter<std::io::Stdout>>) -> Result<()> {
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    let mut last = Instant::now();

    loop {
        for notice in game.take_notices() {
            println!("{}", notice);
        }
        print!("> ");
        std::io::stdout().flush().context("Failed to flush stdout")?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("Failed to read input")?;

        // Time spent waiting for the line drives timers
        let now = Instant::now();
        let dt_ms = u32::try_from(now.duration_since(last).as_millis()).unwrap_or(u32::MAX);
        last = now;
        game.tick(dt_ms);

        let command = input::parse(&line, game.input_mode());
        if game.handle(command) == Flow::Quit {
            break;
        }
    }

    tracing::info!("Bye");
    Ok(())
}
