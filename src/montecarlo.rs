//! Monte-Carlo rollout search.
//!
//! Every valid first move gets one spawned tile, and `searches_per_move`
//! random playouts all start from that same board. A playout keeps applying
//! uniformly random valid moves (spawning after each) until the horizon is
//! reached or nothing moves. The move's value is its own merge score plus
//! every playout's merge score, divided by the number of playouts.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::engine::{Board, Move, MoveOutcome};
use crate::selector::{MoveSelector, SearchBudget};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonteCarloConfig {
    /// Order in which first moves are tried; earlier moves win ties.
    pub first_moves: [Move; 4],
}

impl Default for MonteCarloConfig {
    fn default() -> Self { Self { first_moves: [Move::Down, Move::Left, Move::Right, Move::Up] } }
}

/// Value of one candidate first move.
#[derive(Debug, Clone, Copy)]
pub struct RolloutEval {
    pub dir: Move,
    /// Immediate plus total playout score, per playout; 0 when illegal.
    pub value: f64,
    pub legal: bool,
    pub outcome: MoveOutcome,
}

pub struct MonteCarlo {
    cfg: MonteCarloConfig,
    rng: StdRng,
}

impl MonteCarlo {
    pub fn new() -> Self { Self::with_config(MonteCarloConfig::default()) }

    pub fn with_config(cfg: MonteCarloConfig) -> Self { Self { cfg, rng: StdRng::from_entropy() } }

    pub fn with_seed(cfg: MonteCarloConfig, seed: u64) -> Self { Self { cfg, rng: StdRng::seed_from_u64(seed) } }

    /// Score every first move, in configured order.
    pub fn move_values(&mut self, board: Board, budget: SearchBudget) -> [RolloutEval; 4] {
        let first_moves = self.cfg.first_moves;
        first_moves.map(|dir| {
            let outcome = board.apply(dir);
            if !outcome.valid {
                return RolloutEval { dir, value: 0.0, legal: false, outcome };
            }
            let start = outcome.board.with_random_tile(&mut self.rng);
            let mut rollout_total = 0u64;
            for _ in 0..budget.searches_per_move {
                rollout_total += playout(start, budget.search_length, &mut self.rng);
            }
            let value = move_value(outcome.score, rollout_total, budget.searches_per_move);
            log::trace!("montecarlo {dir}: immediate {} playouts {rollout_total} value {value:.1}", outcome.score);
            RolloutEval { dir, value, legal: true, outcome }
        })
    }

    /// Pick the legal first move with the highest value; earlier moves win ties.
    ///
    /// ```
    /// use ai_2048_bot::engine::{Board, Move};
    /// use ai_2048_bot::montecarlo::{MonteCarlo, MonteCarloConfig};
    /// use ai_2048_bot::selector::SearchBudget;
    /// let b = Board::from_rows(&[[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]]).unwrap();
    /// let mut mc = MonteCarlo::with_seed(MonteCarloConfig::default(), 5);
    /// // No playouts: only the immediate merge score counts, and left comes before right.
    /// assert_eq!(mc.best_move(b, SearchBudget::new(0, 0)), b.apply(Move::Left));
    /// ```
    pub fn best_move(&mut self, board: Board, budget: SearchBudget) -> MoveOutcome {
        let evals = self.move_values(board, budget);
        match pick(&evals) {
            Some(eval) => {
                log::debug!("montecarlo chose {} (value {:.1})", eval.dir, eval.value);
                eval.outcome
            }
            None => MoveOutcome::rejected(board),
        }
    }
}

impl Default for MonteCarlo { fn default() -> Self { Self::new() } }

impl MoveSelector for MonteCarlo {
    fn name(&self) -> &'static str { "montecarlo" }

    fn select_move(&mut self, board: Board, budget: SearchBudget) -> MoveOutcome { self.best_move(board, budget) }
}

/// First legal eval with the strictly highest value.
fn pick(evals: &[RolloutEval]) -> Option<&RolloutEval> {
    let mut best: Option<&RolloutEval> = None;
    for eval in evals.iter().filter(|e| e.legal) {
        if best.map_or(true, |b| eval.value > b.value) {
            best = Some(eval);
        }
    }
    best
}

/// Accumulated score of a first move averaged over its playouts.
///
/// The immediate score enters the accumulator once, not once per playout.
fn move_value(immediate: u64, rollout_total: u64, playouts: usize) -> f64 {
    (immediate + rollout_total) as f64 / playouts.max(1) as f64
}

/// One playout from the spawned board after a first move; returns the merge
/// score it collected. The first move counts as step one of `search_length`.
fn playout<R: Rng + ?Sized>(start: Board, search_length: usize, rng: &mut R) -> u64 {
    let mut board = start;
    let mut total = 0;
    for _ in 1..search_length {
        let out = board.random_valid_move(rng);
        if !out.valid {
            break;
        }
        total += out.score;
        board = out.board.with_random_tile(rng);
    }
    total
}
