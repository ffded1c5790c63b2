//! Orbtui — Chain Reaction-style territorial orb duel in the terminal.

mod app;
mod game;
mod input;
mod theme;
mod ui;

use anyhow::Result;
use app::App;
use clap::{Parser, ValueEnum};

/// Options derived from CLI that the match itself depends on (names, board
/// size, per-player clock).
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub player1: String,
    pub player2: String,
    pub grid_size: usize,
    pub timer_secs: u32,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_default();
    let config = GameConfig {
        player1: args.player1.clone(),
        player2: args.player2.clone(),
        grid_size: args.grid_size as usize,
        timer_secs: args.timer,
    };
    let mut app = App::new(args, config, theme)?;
    app.run()?;
    Ok(())
}

/// Chain Reaction-style duel in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "orbtui",
    version,
    about = "Chain Reaction-style territorial orb duel in the terminal. Stack orbs past a cell's critical mass to set off cascades that capture your opponent's territory.",
    long_about = "Orbtui is a two-player terminal rendition of the classic Chain Reaction board game.\n\n\
        Take turns dropping orbs into cells you own (or empty ones). A cell holding as many orbs \
        as it has neighbours explodes, sending one orb into each neighbour and capturing enemy \
        cells on the way; captures can chain across the whole board. Eliminate every enemy orb \
        to win, and keep an eye on your clock.\n\n\
        CONTROLS (normal):\n  Arrows      Move cursor   Enter/Space  Place orb\n  P           Pause         R            Restart (game over)   Q / Esc  Quit\n\n\
        CONTROLS (vim):\n  h/j/k/l     Move cursor   Space        Place orb   p  Pause   q  Quit\n\n\
        Use --theme to load a btop-style theme (e.g. onedark.theme)."
)]
pub struct Args {
    /// Display name for player 1 (red, moves first).
    #[arg(long, default_value = "Player 1", value_name = "NAME")]
    pub player1: String,

    /// Display name for player 2 (blue).
    #[arg(long, default_value = "Player 2", value_name = "NAME")]
    pub player2: String,

    /// Board size N for an NxN grid. Clamped to what fits the terminal.
    #[arg(short, long, default_value = "8", value_name = "N")]
    pub grid_size: u16,

    /// Seconds on each player's clock. The clock pauses during cascades.
    #[arg(short, long, default_value = "60", value_name = "SECS")]
    pub timer: u32,

    /// Path to theme file (btop-style theme[key]="value"). Uses One Dark if not set.
    #[arg(long, value_name = "FILE")]
    pub theme: Option<std::path::PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Explosion replay steps per second during a cascade (cosmetic only;
    /// the board outcome never depends on it).
    #[arg(long, default_value = "10.0", value_name = "RATE")]
    pub cascade_rate: f64,

    /// Skip the start menu and begin the match immediately.
    #[arg(long)]
    pub no_menu: bool,

    /// Disable explosion animation (replay resolves instantly).
    #[arg(long)]
    pub no_animation: bool,
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
