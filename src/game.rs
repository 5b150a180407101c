//! Game state: candy grid, burst search, collapse/refill, session state machine.

use crate::GameConfig;
use crate::history::HistoryEntry;
use clap::ValueEnum;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Orthogonal neighbours (row, col) offsets; no diagonals.
const NEIGHBOURS_4: [(isize, isize); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// Candy colours. The default palette is the first four.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Candy {
    Red,
    Blue,
    Green,
    Yellow,
    Purple,
    Orange,
}

impl Candy {
    pub const DEFAULT_PALETTE: [Self; 4] = [Self::Red, Self::Blue, Self::Green, Self::Yellow];

    /// Colour index 0..6 for theme.candy_color().
    pub fn index(self) -> usize {
        match self {
            Self::Red => 0,
            Self::Blue => 1,
            Self::Green => 2,
            Self::Yellow => 3,
            Self::Purple => 4,
            Self::Orange => 5,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Blue => "blue",
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Purple => "purple",
            Self::Orange => "orange",
        }
    }
}

fn random_candy<R: Rng + ?Sized>(palette: &[Candy], rng: &mut R) -> Candy {
    palette[rng.random_range(0..palette.len())]
}

/// One grid slot. `marked` is only ever set between a burst search and the collapse that consumes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub candy: Candy,
    pub marked: bool,
}

impl Cell {
    fn new(candy: Candy) -> Self {
        Self {
            candy,
            marked: false,
        }
    }
}

/// Square grid of candies, row-major. Row 0 is the top row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    size: usize,
    cells: Vec<Cell>,
}

impl Grid {
    /// Every cell drawn independently and uniformly from `palette`. No adjacency rules:
    /// a fresh grid may already hold large bursts.
    pub fn generate<R: Rng + ?Sized>(size: usize, palette: &[Candy], rng: &mut R) -> Self {
        let cells = (0..size * size)
            .map(|_| Cell::new(random_candy(palette, rng)))
            .collect();
        Self { size, cells }
    }

    /// Build a grid from explicit rows. Returns None unless the rows form a non-empty square.
    #[cfg(test)]
    pub fn from_rows(rows: &[Vec<Candy>]) -> Option<Self> {
        let size = rows.len();
        if size == 0 || rows.iter().any(|r| r.len() != size) {
            return None;
        }
        let cells = rows.iter().flatten().copied().map(Cell::new).collect();
        Some(Self { size, cells })
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    fn idx(&self, row: usize, col: usize) -> usize {
        row * self.size + col
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<Cell> {
        if row >= self.size || col >= self.size {
            return None;
        }
        self.cells.get(self.idx(row, col)).copied()
    }

    #[inline]
    pub fn candy_at(&self, row: usize, col: usize) -> Option<Candy> {
        self.get(row, col).map(|c| c.candy)
    }

    /// Candies row by row, for rendering.
    pub fn candy_rows(&self) -> Vec<Vec<Candy>> {
        self.cells
            .chunks(self.size)
            .map(|row| row.iter().map(|c| c.candy).collect())
            .collect()
    }

    pub fn marked_count(&self) -> usize {
        self.cells.iter().filter(|c| c.marked).count()
    }

    pub fn clear_marks(&mut self) {
        for cell in &mut self.cells {
            cell.marked = false;
        }
    }

    /// Mark the orthogonally connected same-candy region containing (row, col).
    /// Returns the region size; out of bounds is 0. Explicit stack, each cell visited once.
    pub fn mark_burst(&mut self, row: usize, col: usize) -> usize {
        let Some(target) = self.candy_at(row, col) else {
            return 0;
        };
        let mut visited = vec![false; self.cells.len()];
        let mut stack = vec![(row, col)];
        visited[self.idx(row, col)] = true;
        let mut count = 0;

        while let Some((r, c)) = stack.pop() {
            let i = self.idx(r, c);
            self.cells[i].marked = true;
            count += 1;

            for (dr, dc) in NEIGHBOURS_4 {
                let (Some(nr), Some(nc)) = (r.checked_add_signed(dr), c.checked_add_signed(dc))
                else {
                    continue;
                };
                if nr >= self.size || nc >= self.size {
                    continue;
                }
                let ni = self.idx(nr, nc);
                if !visited[ni] && self.cells[ni].candy == target {
                    visited[ni] = true;
                    stack.push((nr, nc));
                }
            }
        }
        count
    }

    /// Compact marked slots column by column, bottom row first. Each marked slot takes the
    /// candy of the nearest unmarked cell above it (which then becomes marked); with nothing
    /// left above, the slot gets a fresh random candy. Leaves no marks behind.
    pub fn collapse<R: Rng + ?Sized>(&mut self, palette: &[Candy], rng: &mut R) {
        for col in 0..self.size {
            for row in (0..self.size).rev() {
                let i = self.idx(row, col);
                if !self.cells[i].marked {
                    continue;
                }
                let donor = (0..row)
                    .rev()
                    .map(|k| self.idx(k, col))
                    .find(|&k| !self.cells[k].marked);
                match donor {
                    Some(d) => {
                        self.cells[i].candy = self.cells[d].candy;
                        self.cells[d].marked = true;
                    }
                    None => self.cells[i].candy = random_candy(palette, rng),
                }
                self.cells[i].marked = false;
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Playing,
    Over,
}

/// Result of a finished game, decided purely by the score against the win threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Won,
    Lost,
}

/// Lifetime counters for this process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub played: u32,
    pub won: u32,
    pub lost: u32,
}

/// Why a click left the session untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ignored {
    GameOver,
    OutOfBounds,
    /// Connected region smaller than the minimum burst size.
    TooSmall(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    Burst { size: usize, game_over: bool },
    Ignored(Ignored),
}

/// Read-only view handed to the renderer after every action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub candies: Vec<Vec<Candy>>,
    pub moves_left: u32,
    pub max_moves: u32,
    pub score: u32,
    pub win_score: u32,
    pub over: bool,
    /// Some only when over.
    pub outcome: Option<Outcome>,
    pub stats: Stats,
}

/// One player's game: grid, moves, score, state and lifetime counters.
/// Actions take the session by value and hand back the next one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub config: GameConfig,
    pub grid: Grid,
    pub moves_left: u32,
    pub score: u32,
    pub status: Status,
    pub stats: Stats,
}

impl Session {
    pub fn new<R: Rng + ?Sized>(config: GameConfig, rng: &mut R) -> Self {
        let grid = Grid::generate(config.grid_size, &config.candies, rng);
        Self {
            moves_left: config.max_moves,
            score: 0,
            status: Status::Playing,
            stats: Stats::default(),
            grid,
            config,
        }
    }

    #[inline]
    pub fn is_over(&self) -> bool {
        self.status == Status::Over
    }

    /// Won iff the score has reached the threshold, whatever the moves.
    pub fn outcome(&self) -> Outcome {
        if self.score >= self.config.win_score {
            Outcome::Won
        } else {
            Outcome::Lost
        }
    }

    /// Click at (row, col). Regions below the minimum burst size change nothing.
    pub fn click<R: Rng + ?Sized>(
        mut self,
        row: usize,
        col: usize,
        rng: &mut R,
    ) -> (Self, ClickOutcome) {
        if self.is_over() {
            return (self, ClickOutcome::Ignored(Ignored::GameOver));
        }
        let Some(candy) = self.grid.candy_at(row, col) else {
            return (self, ClickOutcome::Ignored(Ignored::OutOfBounds));
        };
        let size = self.grid.mark_burst(row, col);
        if size < self.config.min_burst {
            self.grid.clear_marks();
            log::trace!("({}, {}) region of {} too small", row, col, size);
            return (self, ClickOutcome::Ignored(Ignored::TooSmall(size)));
        }

        self.grid.collapse(&self.config.candies, rng);
        debug_assert_eq!(self.grid.marked_count(), 0);
        self.score = self.score.saturating_add(size as u32);
        self.moves_left = self.moves_left.saturating_sub(1);
        log::debug!(
            "({}, {}) burst {} {} candies, score {}, moves left {}",
            row,
            col,
            size,
            candy.name(),
            self.score,
            self.moves_left
        );

        if self.moves_left == 0 || self.score >= self.config.win_score {
            self.status = Status::Over;
            log::info!(
                "Game over: {:?} with score {} ({} moves left)",
                self.outcome(),
                self.score,
                self.moves_left
            );
        }
        let game_over = self.is_over();
        (self, ClickOutcome::Burst { size, game_over })
    }

    /// Start over from any state. Counts the finished game and returns its history record.
    pub fn reset<R: Rng + ?Sized>(mut self, rng: &mut R) -> (Self, HistoryEntry) {
        let outcome = self.outcome();
        let entry = HistoryEntry::now(self.score, outcome);

        self.stats.played += 1;
        match outcome {
            Outcome::Won => self.stats.won += 1,
            Outcome::Lost => self.stats.lost += 1,
        }
        log::info!(
            "Reset after {:?} with score {}; played {}, won {}, lost {}",
            outcome,
            self.score,
            self.stats.played,
            self.stats.won,
            self.stats.lost
        );

        self.grid = Grid::generate(self.config.grid_size, &self.config.candies, rng);
        self.moves_left = self.config.max_moves;
        self.score = 0;
        self.status = Status::Playing;
        (self, entry)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            candies: self.grid.candy_rows(),
            moves_left: self.moves_left,
            max_moves: self.config.max_moves,
            score: self.score,
            win_score: self.config.win_score,
            over: self.is_over(),
            outcome: self.is_over().then(|| self.outcome()),
            stats: self.stats,
        }
    }
}
