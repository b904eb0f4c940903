use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::engine::{Board, Move, MoveOutcome};
use crate::selector::{MoveSelector, SearchBudget};

use super::{eval_root_branch, pick_branch, warm_engine_and_heuristics, BranchEval, ExpectimaxConfig, SearchStats, Searcher};

/// Single-threaded Expectimax search.
///
/// Owns the RNG used to sample chance-node cells, so two instances built
/// with the same seed and config make the same decisions.
pub struct Expectimax {
    cfg: ExpectimaxConfig,
    stats: SearchStats,
    rng: StdRng,
}

impl Expectimax {
    pub fn new() -> Self { Self::with_config(ExpectimaxConfig::default()) }

    pub fn with_config(cfg: ExpectimaxConfig) -> Self { Self::build(cfg, StdRng::from_entropy()) }

    /// Deterministic instance for tests and reproducible runs.
    pub fn with_seed(cfg: ExpectimaxConfig, seed: u64) -> Self { Self::build(cfg, StdRng::seed_from_u64(seed)) }

    fn build(cfg: ExpectimaxConfig, rng: StdRng) -> Self {
        warm_engine_and_heuristics();
        Self { cfg, stats: SearchStats::default(), rng }
    }

    #[inline]
    pub fn config(&self) -> &ExpectimaxConfig { &self.cfg }

    /// Choose a move and return its outcome on a copy of `board`.
    ///
    /// Returns a rejected outcome when no direction is valid.
    ///
    /// Example
    /// ```
    /// use ai_2048_bot::engine::{Board, Move};
    /// use ai_2048_bot::expectimax::{Expectimax, ExpectimaxConfig};
    /// // Only a leftward slide changes this board.
    /// let b = Board::from_rows(&[[0, 2, 4, 8], [0, 4, 8, 16], [0, 8, 16, 32], [0, 16, 32, 64]]).unwrap();
    /// let mut ex = Expectimax::with_seed(ExpectimaxConfig::default(), 1);
    /// assert_eq!(ex.best_move(b), b.apply(Move::Left));
    /// ```
    pub fn best_move(&mut self, board: Board) -> MoveOutcome {
        let branches = self.branch_evals(board);
        pick_branch(board, self.cfg.depth_for(board), &branches, &mut self.stats)
    }

    /// Compute the root value of each direction.
    ///
    /// Returns a fixed array in order: `[Up, Down, Left, Right]` and marks
    /// illegal moves as `legal=false`.
    pub fn branch_evals(&mut self, board: Board) -> [BranchEval; 4] {
        let depth = self.cfg.depth_for(board);
        let mut state_count = 0u64;
        let out = Move::ALL.map(|dir| {
            let (branch, nodes) = eval_root_branch(&self.cfg, board, dir, depth, &mut self.rng);
            state_count += nodes;
            branch
        });
        self.stats.record(state_count);
        out
    }

    /// Player-node value of `board` at the depth the root would use.
    pub fn state_value(&mut self, board: Board) -> f64 {
        let depth = self.cfg.depth_for(board);
        let mut searcher = Searcher::new(&self.cfg, &mut self.rng);
        let value = searcher.player(board, depth);
        let nodes = searcher.nodes;
        self.stats.record(nodes);
        value
    }

    /// Statistics collected from the last call to [`Self::best_move`],
    /// [`Self::branch_evals`] or [`Self::state_value`].
    #[inline]
    pub fn last_stats(&self) -> SearchStats { self.stats }

    /// Reset accumulated stats to zero.
    #[inline]
    pub fn reset_stats(&mut self) { self.stats = SearchStats::default(); }
}

impl Default for Expectimax { fn default() -> Self { Self::new() } }

impl MoveSelector for Expectimax {
    fn name(&self) -> &'static str { "expectimax" }

    /// Expectimax has a fixed depth policy and ignores the rollout budget.
    fn select_move(&mut self, board: Board, _budget: SearchBudget) -> MoveOutcome { self.best_move(board) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expectimax::evaluate;
    use rand::Rng;

    fn rows(rows: [[u64; 4]; 4]) -> Board { Board::from_rows(&rows).unwrap() }

    #[test]
    fn no_valid_move_is_reported() {
        let locked = rows([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]]);
        let mut ex = Expectimax::with_seed(ExpectimaxConfig::default(), 3);
        assert_eq!(ex.best_move(locked), MoveOutcome::rejected(locked));
        assert!(ex.branch_evals(locked).iter().all(|b| !b.legal));
    }

    #[test]
    fn full_board_takes_a_merging_move() {
        // Full board; only the vertical 2/2 pair in column 0 can merge.
        let board = rows([[2, 4, 8, 16], [2, 8, 16, 32], [4, 16, 32, 64], [8, 32, 64, 128]]);
        let mut ex = Expectimax::with_seed(ExpectimaxConfig::default(), 3);
        let out = ex.best_move(board);
        assert!(out.valid);
        assert!(out == board.apply(Move::Up) || out == board.apply(Move::Down));
    }

    #[test]
    fn caller_board_is_untouched() {
        let board = rows([[2, 2, 4, 0], [0, 4, 0, 0], [0; 4], [0, 0, 0, 2]]);
        let copy = board;
        let mut ex = Expectimax::with_seed(ExpectimaxConfig::default(), 9);
        let out = ex.best_move(board);
        assert_eq!(board, copy);
        assert!(out.valid);
        assert!(Move::ALL.iter().any(|&dir| board.apply(dir) == out));
    }

    #[test]
    fn space_bonus_applies_only_when_empty_cells_grow() {
        let board = rows([[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]]);
        let cfg = ExpectimaxConfig::default().with_depth(0);
        let mut ex = Expectimax::with_seed(cfg, 2);
        let branches = ex.branch_evals(board);
        // Up is a no-op, down keeps both tiles, left merges them.
        assert!(!branches[0].legal);
        let down = board.apply(Move::Down).board;
        assert_eq!(branches[1].ev, evaluate(down));
        let left = board.apply(Move::Left).board;
        assert_eq!(branches[2].ev, evaluate(left) + 1_000_000.0);
        assert_eq!(ex.best_move(board), board.apply(Move::Left));
    }

    #[test]
    fn state_value_at_depth_zero_is_static() {
        let cfg = ExpectimaxConfig::default().with_depth(0).with_deep_depth(0);
        let mut ex = Expectimax::with_seed(cfg, 4);
        let mut rng = StdRng::seed_from_u64(4);
        let mut board = crate::engine::initialize(&mut rng);
        for _ in 0..30 {
            assert_eq!(ex.state_value(board), evaluate(board));
            let dir = Move::ALL[rng.gen_range(0..4)];
            board = board.make_move(dir, &mut rng).board;
        }
    }

    #[test]
    fn same_seed_same_decisions() {
        let mut rng = StdRng::seed_from_u64(21);
        let mut a = Expectimax::with_seed(ExpectimaxConfig::default(), 77);
        let mut b = Expectimax::with_seed(ExpectimaxConfig::default(), 77);
        let mut board = crate::engine::initialize(&mut rng);
        for _ in 0..10 {
            let out = a.best_move(board);
            assert_eq!(out, b.best_move(board));
            if !out.valid {
                break;
            }
            board = out.board.with_random_tile(&mut rng);
        }
        assert!(a.last_stats().nodes > 0);
        assert!(a.last_stats().peak_nodes >= a.last_stats().nodes);
        a.reset_stats();
        assert_eq!(a.last_stats(), SearchStats::default());
    }
}
