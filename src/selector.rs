//! The move-selection contract every search strategy implements.
//!
//! A caller holds the board, hands a copy to a strategy, and applies the
//! returned [`MoveOutcome`] itself (including the follow-up spawn). Strategies
//! are interchangeable behind [`MoveSelector`], so the game driver and the
//! statistics harness never branch on which one they were given.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::engine::{Board, BoardError, MoveOutcome};
use crate::expectimax::{Expectimax, ExpectimaxConfig, ExpectimaxParallel};
use crate::montecarlo::{MonteCarlo, MonteCarloConfig};

/// Per-call search budget.
///
/// Rollout strategies use both fields; expectimax runs at its configured
/// depth and ignores them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SearchBudget {
    /// Random playouts per candidate first move.
    pub searches_per_move: usize,
    /// Playout horizon in moves, counting the first move.
    pub search_length: usize,
}

impl SearchBudget {
    pub fn new(searches_per_move: usize, search_length: usize) -> Self { Self { searches_per_move, search_length } }
}

/// Choose a move for a board.
pub trait MoveSelector {
    /// Short label used in logs and reports.
    fn name(&self) -> &'static str;

    /// Pick a direction for `board` and return its outcome.
    ///
    /// `valid == false` means no direction changes the board: the game is over.
    fn select_move(&mut self, board: Board, budget: SearchBudget) -> MoveOutcome;
}

impl<S: MoveSelector + ?Sized> MoveSelector for Box<S> {
    fn name(&self) -> &'static str { (**self).name() }

    fn select_move(&mut self, board: Board, budget: SearchBudget) -> MoveOutcome { (**self).select_move(board, budget) }
}

/// Grid-level entry point: validate the grid, then ask `selector` for a move.
///
/// The caller's grid is only read; the chosen move shows up in the returned
/// outcome alone. A grid that is not 4x4 or holds a value that is not a tile
/// fails with [`BoardError`] before any search runs.
///
/// ```
/// use ai_2048_bot::selector::ai_move;
/// use ai_2048_bot::montecarlo::{MonteCarlo, MonteCarloConfig};
///
/// let grid = vec![vec![2u64, 2, 0, 0], vec![0; 4], vec![0; 4], vec![0; 4]];
/// let mut mc = MonteCarlo::with_seed(MonteCarloConfig::default(), 3);
/// let out = ai_move(&mut mc, &grid, 10, 5).unwrap();
/// assert!(out.valid);
/// assert_eq!(grid[0], vec![2, 2, 0, 0]);
///
/// assert!(ai_move(&mut mc, &grid[..3], 10, 5).is_err());
/// ```
pub fn ai_move<S, R>(
    selector: &mut S,
    grid: &[R],
    searches_per_move: usize,
    search_length: usize,
) -> Result<MoveOutcome, BoardError>
where
    S: MoveSelector + ?Sized,
    R: AsRef<[u64]>,
{
    let board = Board::from_grid(grid)?;
    Ok(selector.select_move(board, SearchBudget::new(searches_per_move, search_length)))
}

/// The built-in strategies, by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    Expectimax,
    ExpectimaxParallel,
    MonteCarlo,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown strategy {0:?} (expected expectimax, expectimax-par or montecarlo)")]
pub struct UnknownStrategy(pub String);

impl Strategy {
    pub const ALL: [Strategy; 3] = [Strategy::Expectimax, Strategy::ExpectimaxParallel, Strategy::MonteCarlo];

    /// Build the strategy with default tuning, seeded if `seed` is given.
    pub fn build(self, seed: Option<u64>) -> Box<dyn MoveSelector + Send> {
        match (self, seed) {
            (Strategy::Expectimax, Some(seed)) => Box::new(Expectimax::with_seed(ExpectimaxConfig::default(), seed)),
            (Strategy::Expectimax, None) => Box::new(Expectimax::new()),
            (Strategy::ExpectimaxParallel, Some(seed)) => {
                Box::new(ExpectimaxParallel::with_seed(ExpectimaxConfig::default(), seed))
            }
            (Strategy::ExpectimaxParallel, None) => Box::new(ExpectimaxParallel::new()),
            (Strategy::MonteCarlo, Some(seed)) => Box::new(MonteCarlo::with_seed(MonteCarloConfig::default(), seed)),
            (Strategy::MonteCarlo, None) => Box::new(MonteCarlo::new()),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::Expectimax => "expectimax",
            Strategy::ExpectimaxParallel => "expectimax-par",
            Strategy::MonteCarlo => "montecarlo",
        };
        f.write_str(name)
    }
}

impl FromStr for Strategy {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "expectimax" => Ok(Strategy::Expectimax),
            "expectimax-par" | "expectimax-parallel" => Ok(Strategy::ExpectimaxParallel),
            "montecarlo" | "mcts" | "monte-carlo" => Ok(Strategy::MonteCarlo),
            _ => Err(UnknownStrategy(s.to_string())),
        }
    }
}
