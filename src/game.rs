//! Headless game driver shared by the binaries.

use std::time::Instant;

use rand::Rng;
use serde::Serialize;

use crate::engine::{self as GameEngine, Board, MoveOutcome, WIN_TILE};
use crate::selector::{MoveSelector, SearchBudget};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameConfig {
    pub budget: SearchBudget,
    /// Tile that counts as a win.
    pub win_tile: u64,
    /// End the game as soon as `win_tile` appears.
    pub stop_at_win: bool,
    /// Stop after this many accepted moves.
    pub max_moves: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self { budget: SearchBudget::default(), win_tile: WIN_TILE, stop_at_win: false, max_moves: None }
    }
}

/// How a finished game went.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameSummary {
    pub strategy: String,
    pub score: u64,
    pub highest_tile: u64,
    pub moves: u64,
    pub won: bool,
    /// Row-major tile values of the last board.
    pub final_board: [u64; 16],
    pub elapsed_s: f64,
}

/// Play one game from a fresh board until the selector finds no valid move
/// (or a configured stop condition hits).
pub fn play_game<S, R>(selector: &mut S, cfg: &GameConfig, rng: &mut R) -> GameSummary
where
    S: MoveSelector + ?Sized,
    R: Rng + ?Sized,
{
    play_game_with(selector, cfg, rng, |_, _| {})
}

/// Like [`play_game`], calling `on_move(board_before, outcome)` for every
/// accepted move, before the follow-up spawn.
pub fn play_game_with<S, R, F>(selector: &mut S, cfg: &GameConfig, rng: &mut R, mut on_move: F) -> GameSummary
where
    S: MoveSelector + ?Sized,
    R: Rng + ?Sized,
    F: FnMut(&Board, &MoveOutcome),
{
    let start = Instant::now();
    let mut board = GameEngine::initialize(rng);
    let mut score = 0u64;
    let mut moves = 0u64;
    let mut won = false;
    loop {
        if board.has_tile(cfg.win_tile) {
            won = true;
            if cfg.stop_at_win {
                break;
            }
        }
        if cfg.max_moves.is_some_and(|limit| moves >= limit) {
            break;
        }
        let outcome = selector.select_move(board, cfg.budget);
        if !outcome.valid {
            break;
        }
        on_move(&board, &outcome);
        score += outcome.score;
        moves += 1;
        board = outcome.board.with_random_tile(rng);
    }
    let summary = GameSummary {
        strategy: selector.name().to_string(),
        score,
        highest_tile: board.highest_tile(),
        moves,
        won,
        final_board: board.to_cells(),
        elapsed_s: start.elapsed().as_secs_f64(),
    };
    log::info!(
        "{} finished: score {}, highest tile {}, {} moves",
        summary.strategy,
        summary.score,
        summary.highest_tile,
        summary.moves
    );
    summary
}
