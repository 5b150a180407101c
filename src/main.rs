//! Candyburst: click connected candies to burst them and reach the target score in limited moves.

mod app;
mod game;
mod history;
mod input;
mod logger;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::{Parser, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use game::Candy;
use history::HistoryStore;
use rand::Rng;
use thiserror::Error;

/// Rules of one game. Defaults are the classic 10×10, four colours, 20 moves, target 50.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameConfig {
    pub grid_size: usize,
    pub candies: Vec<Candy>,
    pub max_moves: u32,
    pub win_score: u32,
    pub min_burst: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            grid_size: 10,
            candies: Candy::DEFAULT_PALETTE.to_vec(),
            max_moves: 20,
            win_score: 50,
            min_burst: 3,
        }
    }
}

pub const MIN_GRID_SIZE: usize = 3;
pub const MAX_GRID_SIZE: usize = 16;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("grid size must be between 3 and 16, got {0}")]
    GridSize(usize),
    #[error("need at least 2 distinct candies, got {0}")]
    TooFewCandies(usize),
    #[error("max moves must be at least 1")]
    NoMoves,
    #[error("win score must be at least 1")]
    NoTarget,
    #[error("minimum burst size must be at least 1")]
    NoMinBurst,
}

impl GameConfig {
    /// Drop duplicate candies (keeping first occurrence) and check ranges.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        let mut seen = Vec::with_capacity(self.candies.len());
        for c in self.candies {
            if !seen.contains(&c) {
                seen.push(c);
            }
        }
        self.candies = seen;

        if !(MIN_GRID_SIZE..=MAX_GRID_SIZE).contains(&self.grid_size) {
            return Err(ConfigError::GridSize(self.grid_size));
        }
        if self.candies.len() < 2 {
            return Err(ConfigError::TooFewCandies(self.candies.len()));
        }
        if self.max_moves == 0 {
            return Err(ConfigError::NoMoves);
        }
        if self.win_score == 0 {
            return Err(ConfigError::NoTarget);
        }
        if self.min_burst == 0 {
            return Err(ConfigError::NoMinBurst);
        }
        Ok(self)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let history_path = args
        .history_file
        .clone()
        .unwrap_or_else(history::default_history_path);

    let log_path = args
        .log_file
        .clone()
        .unwrap_or_else(|| history::config_dir().join(logger::LOG_FILENAME));
    if let Err(err) = logger::init(&log_path, args.verbose.log_level_filter()) {
        eprintln!("candyburst: logging disabled ({}): {}", log_path.display(), err);
    }

    let config = GameConfig {
        grid_size: args.size,
        candies: args.candies.clone(),
        max_moves: args.moves,
        win_score: args.target,
        min_burst: args.min_burst,
    }
    .validate()
    .context("invalid game options")?;

    let history = HistoryStore::open(history_path);
    if args.show_history {
        print_history(&history);
        return Ok(());
    }

    let theme = match theme::Theme::load(args.theme.as_deref(), args.scheme) {
        Ok(t) => t,
        Err(err) => {
            log::warn!("Falling back to default theme: {}", err);
            theme::Theme::default()
        }
    };
    let seed = args.seed.unwrap_or_else(|| rand::rng().random());
    log::info!("Starting with seed {} and {:?}", seed, config);

    let mut app = App::new(config, theme, history, seed);
    app.run()?;
    Ok(())
}

fn print_history(history: &HistoryStore) {
    if history.entries().is_empty() {
        println!("No score history");
        return;
    }
    println!("Score history ({}):", history.path().display());
    for entry in history.entries() {
        println!("  {}", entry);
    }
}

/// Candy-burst puzzle in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "candyburst",
    version,
    about = "Candy-burst puzzle in the terminal. Click a group of 3+ connected candies to burst it; reach the target score before your moves run out.",
    long_about = "Candyburst is a terminal tile-matching puzzle.\n\n\
        Click a candy to burst every orthogonally connected candy of the same colour (at least 3). \
        Candies above fall into the gaps and new ones drop in from the top. Each burst costs one \
        move and scores one point per candy. Reach the target before your moves run out.\n\n\
        CONTROLS:\n  Mouse       Click a candy to burst it\n  Arrows/hjkl Move cursor    Enter/Space Burst at cursor\n  R           New game      Q / Esc     Quit\n\n\
        Finished games are recorded in a history file when you start a new game."
)]
pub struct Args {
    /// Grid width and height in cells.
    #[arg(long, default_value = "10", value_name = "N")]
    pub size: usize,

    /// Candy colours in play, comma separated.
    #[arg(
        long,
        value_delimiter = ',',
        default_values = ["red", "blue", "green", "yellow"],
        value_name = "COLOURS"
    )]
    pub candies: Vec<Candy>,

    /// Moves per game.
    #[arg(long, default_value = "20", value_name = "N")]
    pub moves: u32,

    /// Score that wins the game.
    #[arg(long, default_value = "50", value_name = "SCORE")]
    pub target: u32,

    /// Smallest connected group that can be burst.
    #[arg(long, default_value = "3", value_name = "N")]
    pub min_burst: usize,

    /// Seed for the candy generator (random if not set).
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<std::path::PathBuf>,

    /// Colour scheme: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub scheme: ColorScheme,

    /// History file (defaults to the config directory).
    #[arg(long, value_name = "FILE")]
    pub history_file: Option<std::path::PathBuf>,

    /// Log file (defaults to the config directory).
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<std::path::PathBuf>,

    /// Print the score history and exit.
    #[arg(long)]
    pub show_history: bool,

    #[command(flatten)]
    pub verbose: Verbosity<WarnLevel>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorScheme {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_classic_rules() {
        let c = GameConfig::default();
        assert_eq!(c.grid_size, 10);
        assert_eq!(c.candies, vec![Candy::Red, Candy::Blue, Candy::Green, Candy::Yellow]);
        assert_eq!((c.max_moves, c.win_score, c.min_burst), (20, 50, 3));
        assert_eq!(c.clone().validate(), Ok(c));
    }

    #[test]
    fn test_validate_dedups_candies() {
        let c = GameConfig {
            candies: vec![Candy::Red, Candy::Blue, Candy::Red],
            ..GameConfig::default()
        };
        assert_eq!(c.validate().unwrap().candies, vec![Candy::Red, Candy::Blue]);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let base = GameConfig::default;
        let one_colour = GameConfig {
            candies: vec![Candy::Red, Candy::Red],
            ..base()
        };
        assert_eq!(one_colour.validate(), Err(ConfigError::TooFewCandies(1)));
        let tiny = GameConfig {
            grid_size: 2,
            ..base()
        };
        assert_eq!(tiny.validate(), Err(ConfigError::GridSize(2)));
        let huge = GameConfig {
            grid_size: 17,
            ..base()
        };
        assert_eq!(huge.validate(), Err(ConfigError::GridSize(17)));
        let no_moves = GameConfig {
            max_moves: 0,
            ..base()
        };
        assert_eq!(no_moves.validate(), Err(ConfigError::NoMoves));
        let no_target = GameConfig {
            win_score: 0,
            ..base()
        };
        assert_eq!(no_target.validate(), Err(ConfigError::NoTarget));
        let no_burst = GameConfig {
            min_burst: 0,
            ..base()
        };
        assert_eq!(no_burst.validate(), Err(ConfigError::NoMinBurst));
    }

    #[test]
    fn test_args_parse_defaults_and_candies() {
        let args = Args::try_parse_from(["candyburst"]).unwrap();
        assert_eq!(args.size, 10);
        assert_eq!(args.candies, Candy::DEFAULT_PALETTE.to_vec());
        assert_eq!(args.scheme, ColorScheme::Normal);

        let args =
            Args::try_parse_from(["candyburst", "--candies", "red,purple,orange", "--seed", "9"])
                .unwrap();
        assert_eq!(args.candies, vec![Candy::Red, Candy::Purple, Candy::Orange]);
        assert_eq!(args.seed, Some(9));
    }
}
