//! Oceantui: clean-the-ocean match-3 puzzle in the terminal.

mod app;
mod board;
mod cascade;
mod game;
mod input;
mod logging;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::{ArgAction, Parser, ValueEnum};

/// Options derived from CLI that affect game behaviour (budgets, seed, pacing, look).
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub starting_moves: u32,
    pub starting_reshuffles: u32,
    pub seed: Option<u64>,
    pub no_animation: bool,
    pub glyphs: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            starting_moves: 50,
            starting_reshuffles: 3,
            seed: None,
            no_animation: false,
            glyphs: false,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    if let Some(path) = args.log_file.as_deref() {
        logging::init(path, logging::level_for(args.verbose))
            .with_context(|| format!("cannot open log file {}", path.display()))?;
    }
    let theme = match theme::Theme::load(args.theme.as_deref(), args.palette) {
        Ok(theme) => theme,
        Err(e) => {
            log::warn!("theme not loaded, using defaults: {e}");
            theme::Theme::with_palette(args.palette)
        }
    };
    let config = GameConfig {
        starting_moves: args.moves,
        starting_reshuffles: args.reshuffles,
        seed: args.seed,
        no_animation: args.no_animation,
        glyphs: args.glyphs,
    };
    log::info!("starting oceantui with {:?}", config);
    let mut app = App::new(args, config, theme);
    app.run().context("terminal session failed")?;
    Ok(())
}

/// Clean-the-ocean match-3 puzzle in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "oceantui",
    version,
    about = "Clean-the-ocean match-3 puzzle in the terminal. Swap pieces to line up three or more; clearing pollution cleans the ocean fastest.",
    long_about = "Oceantui is a match-3 puzzle about cleaning the ocean (SDG 14: Life Below Water).\n\n\
        Swap two neighbouring pieces to line up three or more of the same kind. Cleared \
        pollution adds 2% cleanliness per piece, cleared sea life 0.5%. Reach 100% before \
        your moves run out. Stuck? Reshuffle the board (costs one move).\n\n\
        CONTROLS:\n  Arrows/hjkl Move cursor   Enter/Space Select   Mouse Click to select\n  \
        R Reshuffle   N Play again (after a game ends)   I Info   Q / Esc Quit"
)]
pub struct Args {
    /// Moves available per session (each swap or reshuffle costs one).
    #[arg(long, default_value = "50", value_name = "N")]
    pub moves: u32,

    /// Board reshuffles available per session.
    #[arg(long, default_value = "3", value_name = "N")]
    pub reshuffles: u32,

    /// Seed for board generation and refills (reproducible games). Random if not set.
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Disable cascade pacing (clear, fall and refill resolve instantly).
    #[arg(long)]
    pub no_animation: bool,

    /// Skip the start screen and begin playing immediately.
    #[arg(long)]
    pub no_menu: bool,

    /// Target render frames per second.
    #[arg(long, default_value = "30.0", value_name = "RATE")]
    pub frame_rate: f64,

    /// Draw pieces as coloured letters instead of emoji (for terminals without emoji).
    #[arg(long)]
    pub glyphs: bool,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<std::path::PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Write a log to this file (the terminal itself is taken by the game).
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<std::path::PathBuf>,

    /// More log detail: -v debug, -vv trace.
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}
