use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::engine::{Board, Move, MoveOutcome};
use crate::selector::{MoveSelector, SearchBudget};

use super::{eval_root_branch, pick_branch, warm_engine_and_heuristics, BranchEval, ExpectimaxConfig, SearchStats};

/// Expectimax with the four root moves searched on the rayon pool.
///
/// Each root branch gets its own RNG seeded from the instance RNG before the
/// fan-out, so results do not depend on thread scheduling.
pub struct ExpectimaxParallel {
    cfg: ExpectimaxConfig,
    stats: SearchStats,
    rng: StdRng,
}

impl ExpectimaxParallel {
    pub fn new() -> Self { Self::with_config(ExpectimaxConfig::default()) }

    pub fn with_config(cfg: ExpectimaxConfig) -> Self { Self::build(cfg, StdRng::from_entropy()) }

    pub fn with_seed(cfg: ExpectimaxConfig, seed: u64) -> Self { Self::build(cfg, StdRng::seed_from_u64(seed)) }

    fn build(cfg: ExpectimaxConfig, rng: StdRng) -> Self {
        warm_engine_and_heuristics();
        Self { cfg, stats: SearchStats::default(), rng }
    }

    /// Choose a move using parallel expectimax.
    ///
    /// This is a convenience wrapper around `branch_evals` that applies the
    /// shared root policy (first maximum wins, first-valid fallback).
    #[inline]
    pub fn best_move(&mut self, board: Board) -> MoveOutcome {
        let branches = self.branch_evals(board);
        pick_branch(board, self.cfg.depth_for(board), &branches, &mut self.stats)
    }

    /// Compute the root value of each direction in parallel.
    ///
    /// Returns a fixed array in order: `[Up, Down, Left, Right]`.
    pub fn branch_evals(&mut self, board: Board) -> [BranchEval; 4] {
        let depth = self.cfg.depth_for(board);
        let seeds: [u64; 4] = std::array::from_fn(|_| self.rng.gen());
        let cfg = &self.cfg;
        let results: Vec<(BranchEval, u64)> = Move::ALL[..]
            .par_iter()
            .zip(seeds[..].par_iter())
            .map(|(&dir, &seed)| {
                let mut rng = StdRng::seed_from_u64(seed);
                eval_root_branch(cfg, board, dir, depth, &mut rng)
            })
            .collect();
        let state_count: u64 = results.iter().map(|(_, nodes)| nodes).sum();
        self.stats.record(state_count);
        std::array::from_fn(|i| results[i].0)
    }

    #[inline]
    pub fn last_stats(&self) -> SearchStats { self.stats }

    #[inline]
    pub fn reset_stats(&mut self) { self.stats = SearchStats::default(); }
}

impl Default for ExpectimaxParallel { fn default() -> Self { Self::new() } }

impl MoveSelector for ExpectimaxParallel {
    fn name(&self) -> &'static str { "expectimax-par" }

    fn select_move(&mut self, board: Board, _budget: SearchBudget) -> MoveOutcome { self.best_move(board) }
}
