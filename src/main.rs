//! Sandblast: falling blocks that crumble into sand, in the terminal.

mod app;
mod input;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::{Parser, ValueEnum};
use sandblast::Config;
use std::path::PathBuf;

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;

    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_else(|e| {
        log::warn!("theme not loaded, using defaults: {e}");
        theme::Theme::default()
    });
    let config = Config {
        logical_width: args.width,
        logical_height: args.height,
        particle_scale: args.scale,
        special_block_chance: args.bomb_chance,
        ..Config::default()
    };
    config.validate().context("invalid playfield options")?;

    let mut app = App::new(args, config, theme)?;
    app.run()
}

/// The terminal belongs to the UI, so logs only go to a file when asked for.
fn init_logging(path: Option<&std::path::Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = std::fs::File::create(path).with_context(|| format!("creating log file {}", path.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    log::info!("sandblast {} starting", env!("CARGO_PKG_VERSION"));
    Ok(())
}

/// Falling-sand block puzzle in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "sandblast",
    version,
    about = "Falling-block puzzle where placed blocks crumble into coloured sand.",
    long_about = "Sandblast is a terminal puzzle game.\n\n\
        Drop blocks onto the field. Once placed they crumble into sand that slides \
        and piles up. Any same-colour patch of sand that touches the right wall is \
        cleared; clears that cause more clears chain for bonus points. Bomb blocks \
        blow away everything nearby.\n\n\
        CONTROLS:\n  Left/Right h/l  Move      Up/k      Rotate\n  Down/j          Soft drop Space     Hard drop\n  P               Pause     R         Restart (after game over)\n  Q / Esc         Quit\n\n\
        The game is saved when paused, when quitting and every 30 seconds, and \
        resumes paused on the next start."
)]
pub struct Args {
    /// Playfield width in blocks.
    #[arg(long, default_value = "12", value_name = "COLS")]
    pub width: usize,

    /// Playfield height in blocks.
    #[arg(long, default_value = "20", value_name = "ROWS")]
    pub height: usize,

    /// Sand particles per block edge.
    #[arg(long, default_value = "4", value_name = "N")]
    pub scale: usize,

    /// Chance that a new block is a bomb (0 to 1).
    #[arg(long, default_value = "0.15", value_name = "P")]
    pub bomb_chance: f64,

    /// Starting level; affects drop speed and score.
    #[arg(long, default_value = "1", value_name = "N")]
    pub initial_level: u32,

    /// Colour palette for the sand.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Path to theme file (btop-style theme[key]="value"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Seed for block spawning and sand tie-breaks.
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Write logs to this file (filter with RUST_LOG).
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Skip settle and flash animations; turns resolve instantly.
    #[arg(long)]
    pub no_animation: bool,

    /// Do not load or write the save file.
    #[arg(long)]
    pub no_save: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    /// Bright arcade colours.
    Classic,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}
