//! Depth-bounded expectimax move search for 2048.
//!
//! This module provides two policy implementations:
//! - [`Expectimax`]: single-threaded expectimax.
//! - [`ExpectimaxParallel`]: rayon fan-out over the four root moves.
//!
//! Both walk the same tree. Player nodes take the best valid move (plus ten
//! times the merge score it earns). Chance nodes average over at most three
//! sampled empty cells, each contributing `0.9 * value(2) + 0.1 * value(4)`.
//! Leaves are scored by [`evaluate`]. At the root, a move that leaves more
//! empty cells than before gets a flat bonus, and ties go to the first move
//! in up, down, left, right order.
//!
//! Quick start
//! ```
//! use ai_2048_bot::engine::Board;
//! use ai_2048_bot::expectimax::{Expectimax, ExpectimaxConfig};
//!
//! let board = Board::from_rows(&[[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]]).unwrap();
//! let mut ex = Expectimax::with_seed(ExpectimaxConfig::default(), 7);
//! let out = ex.best_move(board);
//! assert!(out.valid);
//! assert_ne!(out.board, board);
//! ```

use rand::seq::index::sample;
use rand::Rng;

use crate::engine::{Board, Move, MoveOutcome};

mod heuristic;
mod search_par;
mod search_seq;

pub use heuristic::{evaluate, LOST_PENALTY};
pub use search_par::ExpectimaxParallel;
pub use search_seq::Expectimax;

/// Tuning knobs for expectimax.
///
/// # Example
///
/// ```
/// use ai_2048_bot::expectimax::ExpectimaxConfig;
///
/// let cfg = ExpectimaxConfig::default().with_depth(2).with_chance_samples(4);
/// assert_eq!(cfg.depth, 2);
/// assert_eq!(cfg.deep_depth, 4);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ExpectimaxConfig {
    /// Search depth in plies for ordinary boards.
    pub depth: u32,
    /// Search depth once fewer than `survival_threshold` cells are empty.
    pub deep_depth: u32,
    /// Empty-cell count below which `deep_depth` applies.
    pub survival_threshold: u64,
    /// Empty cells sampled per chance node (all of them when there are fewer).
    pub chance_samples: usize,
    /// Probability that a spawned tile is a 2 rather than a 4.
    pub spawn_two_probability: f64,
    /// Multiplier on the merge score a player-node move earns.
    pub merge_weight: f64,
    /// Root bonus for a move that increases the number of empty cells.
    pub space_bonus: f64,
}

impl Default for ExpectimaxConfig {
    fn default() -> Self {
        Self {
            depth: 3,
            deep_depth: 4,
            survival_threshold: 2,
            chance_samples: 3,
            spawn_two_probability: 0.9,
            merge_weight: 10.0,
            space_bonus: 1_000_000.0,
        }
    }
}

impl ExpectimaxConfig {
    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_deep_depth(mut self, depth: u32) -> Self {
        self.deep_depth = depth;
        self
    }

    pub fn with_survival_threshold(mut self, empty_cells: u64) -> Self {
        self.survival_threshold = empty_cells;
        self
    }

    /// Sets the chance-node sample cap. Zero is treated as one.
    pub fn with_chance_samples(mut self, samples: usize) -> Self {
        self.chance_samples = samples.max(1);
        self
    }

    pub fn with_merge_weight(mut self, weight: f64) -> Self {
        self.merge_weight = weight;
        self
    }

    pub fn with_space_bonus(mut self, bonus: f64) -> Self {
        self.space_bonus = bonus;
        self
    }

    /// Depth used for a root board: one deeper when space is running out.
    pub fn depth_for(&self, board: Board) -> u32 {
        if board.count_empty() < self.survival_threshold { self.deep_depth } else { self.depth }
    }
}

/// Value of one root move.
///
/// - `ev` is the chance-node value after the move, including the space bonus.
/// - `legal` is false when the move is a no-op for the current board.
#[derive(Debug, Clone, Copy)]
pub struct BranchEval {
    pub dir: Move,
    pub ev: f64,
    pub legal: bool,
    pub outcome: MoveOutcome,
}

/// Basic search stats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Nodes visited for the last root decision.
    pub nodes: u64,
    /// Largest `nodes` seen since the last reset.
    pub peak_nodes: u64,
    /// Root decisions that fell back to the first valid move.
    pub fallbacks: u64,
}

impl SearchStats {
    fn record(&mut self, nodes: u64) {
        self.nodes = nodes;
        self.peak_nodes = self.peak_nodes.max(nodes);
    }
}

/// Common helper for constructors to ensure tables are initialized.
fn warm_engine_and_heuristics() {
    crate::engine::new();
    heuristic::warm();
}

/// One tree walk: borrows the config and an RNG for chance-node sampling.
///
/// Boards are values, so each spawned-tile candidate is a fresh board and the
/// parent never needs restoring.
struct Searcher<'a, R: Rng + ?Sized> {
    cfg: &'a ExpectimaxConfig,
    rng: &'a mut R,
    nodes: u64,
}

impl<'a, R: Rng + ?Sized> Searcher<'a, R> {
    fn new(cfg: &'a ExpectimaxConfig, rng: &'a mut R) -> Self { Self { cfg, rng, nodes: 0 } }

    fn player(&mut self, board: Board, depth: u32) -> f64 {
        self.nodes += 1;
        if depth == 0 {
            return evaluate(board);
        }
        let mut best: Option<f64> = None;
        for dir in Move::ALL {
            let out = board.apply(dir);
            if !out.valid {
                continue;
            }
            let value = self.chance(out.board, depth - 1) + self.cfg.merge_weight * out.score as f64;
            best = Some(best.map_or(value, |b| b.max(value)));
        }
        best.unwrap_or_else(|| evaluate(board))
    }

    fn chance(&mut self, board: Board, depth: u32) -> f64 {
        self.nodes += 1;
        if depth == 0 {
            return evaluate(board);
        }
        let empty: Vec<usize> = board.empty_cells().collect();
        if empty.is_empty() {
            return evaluate(board);
        }
        let cap = self.cfg.chance_samples.max(1);
        let cells: Vec<usize> = if empty.len() > cap {
            sample(&mut *self.rng, empty.len(), cap).into_iter().map(|i| empty[i]).collect()
        } else {
            empty
        };
        let two = self.cfg.spawn_two_probability;
        let mut total = 0.0;
        for &idx in &cells {
            total += two * self.player(board.with_exponent(idx, 1), depth - 1);
            total += (1.0 - two) * self.player(board.with_exponent(idx, 2), depth - 1);
        }
        total / cells.len() as f64
    }
}

/// Evaluate a single root move at `depth`, returning the branch and nodes visited.
fn eval_root_branch<R: Rng + ?Sized>(
    cfg: &ExpectimaxConfig,
    board: Board,
    dir: Move,
    depth: u32,
    rng: &mut R,
) -> (BranchEval, u64) {
    let outcome = board.apply(dir);
    if !outcome.valid {
        return (BranchEval { dir, ev: f64::NEG_INFINITY, legal: false, outcome }, 0);
    }
    let mut searcher = Searcher::new(cfg, rng);
    let mut ev = searcher.chance(outcome.board, depth);
    if outcome.board.count_empty() > board.count_empty() {
        ev += cfg.space_bonus;
    }
    (BranchEval { dir, ev, legal: true, outcome }, searcher.nodes)
}

/// Root decision over evaluated branches.
///
/// The strictly greatest `ev` wins, so ties keep the earliest direction. If no
/// legal branch beats negative infinity (NaN or -inf scores), the first legal
/// move is returned anyway and the fallback is counted.
fn pick_branch(board: Board, depth: u32, branches: &[BranchEval; 4], stats: &mut SearchStats) -> MoveOutcome {
    let mut best_score = f64::NEG_INFINITY;
    let mut best: Option<&BranchEval> = None;
    for branch in branches.iter().filter(|b| b.legal) {
        if branch.ev > best_score {
            best_score = branch.ev;
            best = Some(branch);
        }
    }
    if let Some(branch) = best {
        log::debug!("expectimax chose {} (ev {:.1}, depth {depth}, {} nodes)", branch.dir, branch.ev, stats.nodes);
        return branch.outcome;
    }
    match branches.iter().find(|b| b.legal) {
        Some(branch) => {
            stats.fallbacks += 1;
            log::warn!("no branch scored above -inf on {:?}; falling back to first valid move {}", board, branch.dir);
            branch.outcome
        }
        None => MoveOutcome::rejected(board),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn rows(rows: [[u64; 4]; 4]) -> Board { Board::from_rows(&rows).unwrap() }

    fn corpus() -> Vec<Board> {
        let mut rng = StdRng::seed_from_u64(1337);
        let mut boards = vec![Board::EMPTY, rows([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]])];
        let mut b = crate::engine::initialize(&mut rng);
        for _ in 0..40 {
            boards.push(b);
            let out = b.random_valid_move(&mut rng);
            if !out.valid {
                break;
            }
            b = out.board.with_random_tile(&mut rng);
        }
        boards
    }

    #[test]
    fn depth_zero_is_the_static_evaluation() {
        let cfg = ExpectimaxConfig::default();
        let mut rng = StdRng::seed_from_u64(5);
        for board in corpus() {
            let mut searcher = Searcher::new(&cfg, &mut rng);
            assert_eq!(searcher.player(board, 0), evaluate(board));
            assert_eq!(searcher.chance(board, 0), evaluate(board));
        }
    }

    #[test]
    fn stuck_player_node_falls_back_to_evaluation() {
        let cfg = ExpectimaxConfig::default();
        let mut rng = StdRng::seed_from_u64(5);
        let locked = rows([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]]);
        let mut searcher = Searcher::new(&cfg, &mut rng);
        assert_eq!(searcher.player(locked, 3), LOST_PENALTY);
        assert_eq!(searcher.chance(locked, 3), LOST_PENALTY);
    }

    #[test]
    fn chance_node_weights_two_and_four() {
        // One empty cell, depth 1: children are leaves.
        let cfg = ExpectimaxConfig::default();
        let mut rng = StdRng::seed_from_u64(5);
        let board = rows([[0, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]]);
        let expected = 0.9 * evaluate(board.with_exponent(0, 1)) + 0.1 * evaluate(board.with_exponent(0, 2));
        let mut searcher = Searcher::new(&cfg, &mut rng);
        assert_eq!(searcher.chance(board, 1), expected);
        assert_eq!(searcher.nodes, 3);
    }

    #[test]
    fn chance_node_samples_three_of_four_cells() {
        // Four empty cells whose 2/4 leaves all score differently.
        let board = rows([[0, 0, 0, 0], [4, 8, 16, 32], [64, 128, 256, 512], [2, 4, 8, 16]]);
        let cfg = ExpectimaxConfig::default();
        let leaf = |idx: usize| 0.9 * evaluate(board.with_exponent(idx, 1)) + 0.1 * evaluate(board.with_exponent(idx, 2));
        let leaves: Vec<f64> = (0..4).map(leaf).collect();
        let triples: Vec<f64> = (0..4)
            .map(|skip| (0..4).filter(|&i| i != skip).map(|i| leaves[i]).sum::<f64>() / 3.0)
            .collect();

        let mut seen = [false; 4];
        for seed in 0..64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut searcher = Searcher::new(&cfg, &mut rng);
            let value = searcher.chance(board, 1);
            // 1 chance node + 3 cells * 2 tiles.
            assert_eq!(searcher.nodes, 7);
            let hit = triples.iter().position(|&t| (t - value).abs() <= 1e-9 * t.abs());
            let hit = hit.expect("value must be the mean of three distinct cells");
            seen[hit] = true;
        }
        assert!(seen.iter().all(|&s| s), "every 3-subset should come up across seeds");
    }

    #[test]
    fn depth_deepens_when_space_runs_out() {
        let cfg = ExpectimaxConfig::default();
        assert_eq!(cfg.depth_for(Board::EMPTY), 3);
        let one_gap = rows([[0, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]]);
        assert_eq!(cfg.depth_for(one_gap), 4);
        let two_gaps = one_gap.with_exponent(5, 0);
        assert_eq!(cfg.depth_for(two_gaps), 3);
    }

    #[test]
    fn builders_reach_the_search() {
        let cfg = ExpectimaxConfig::default().with_survival_threshold(16);
        assert_eq!(cfg.depth_for(Board::EMPTY), 3);
        assert_eq!(cfg.depth_for(Board::EMPTY.with_exponent(0, 1)), 4);

        let board = rows([[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]]);
        let mut rng = StdRng::seed_from_u64(5);

        // Without the merge term a depth-1 player node is the best static child.
        let flat = ExpectimaxConfig::default().with_merge_weight(0.0);
        let best_child = Move::ALL
            .iter()
            .map(|&dir| board.apply(dir))
            .filter(|out| out.valid)
            .map(|out| evaluate(out.board))
            .fold(f64::NEG_INFINITY, f64::max);
        let mut searcher = Searcher::new(&flat, &mut rng);
        assert_eq!(searcher.player(board, 1), best_child);

        let no_bonus = ExpectimaxConfig::default().with_space_bonus(0.0);
        let (left, _) = eval_root_branch(&no_bonus, board, Move::Left, 0, &mut rng);
        assert_eq!(left.ev, evaluate(board.apply(Move::Left).board));
        let (left, _) = eval_root_branch(&ExpectimaxConfig::default(), board, Move::Left, 0, &mut rng);
        assert_eq!(left.ev, evaluate(board.apply(Move::Left).board) + 1_000_000.0);
    }

    #[test]
    fn pick_prefers_first_of_equal_branches() {
        let board = rows([[2, 0, 0, 0], [0; 4], [0; 4], [0; 4]]);
        let mut stats = SearchStats::default();
        let branches = Move::ALL.map(|dir| {
            let outcome = board.apply(dir);
            BranchEval { dir, ev: 1.0, legal: outcome.valid, outcome }
        });
        // Up and left are no-ops; down is the first legal branch.
        assert_eq!(pick_branch(board, 3, &branches, &mut stats), board.apply(Move::Down));
        assert_eq!(stats.fallbacks, 0);
    }

    #[test]
    fn pick_falls_back_to_first_valid_move() {
        let board = rows([[2, 0, 0, 0], [0; 4], [0; 4], [0; 4]]);
        let mut stats = SearchStats::default();
        let branches = Move::ALL.map(|dir| {
            let outcome = board.apply(dir);
            BranchEval { dir, ev: f64::NAN, legal: outcome.valid, outcome }
        });
        assert_eq!(pick_branch(board, 3, &branches, &mut stats), board.apply(Move::Down));
        assert_eq!(stats.fallbacks, 1);

        let none = branches.map(|b| BranchEval { legal: false, ..b });
        assert_eq!(pick_branch(board, 3, &none, &mut stats), MoveOutcome::rejected(board));
    }
}
