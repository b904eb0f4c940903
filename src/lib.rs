//! ai-2048-bot: move selection for the 2048 sliding-tile puzzle
//!
//! This crate provides:
//! - A compact `Board` type with value-semantics transitions (`apply`, `with_random_tile`, ...)
//! - A static heuristic evaluator and a depth-bounded Expectimax search (`expectimax`)
//! - A Monte-Carlo rollout search (`montecarlo`)
//! - The `MoveSelector` contract both searches implement, plus a grid-level `ai_move` (`selector`)
//! - A headless game driver (`game`)
//!
//! Quick start:
//! ```
//! use ai_2048_bot::engine::{self as GameEngine, Move};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! // Deterministic board initialization with a seeded RNG
//! let mut rng = StdRng::seed_from_u64(42);
//! let b0 = GameEngine::initialize(&mut rng);
//! let out = b0.apply(Move::Left);
//! assert!(!out.valid || out.board != b0);
//! ```
//!
//! Full loop
//! ```
//! use ai_2048_bot::engine as GameEngine;
//! use ai_2048_bot::selector::{MoveSelector, SearchBudget, Strategy};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let mut rng = StdRng::seed_from_u64(123);
//! let mut policy = Strategy::MonteCarlo.build(Some(123));
//! let budget = SearchBudget::new(10, 5);
//!
//! let mut board = GameEngine::initialize(&mut rng);
//! let mut score = 0;
//! for _ in 0..4 {
//!     let out = policy.select_move(board, budget);
//!     if !out.valid {
//!         break;
//!     }
//!     score += out.score;
//!     board = out.board.with_random_tile(&mut rng);
//! }
//! assert!(board.count_empty() < 16);
//! # let _ = score;
//! ```
//!
pub mod engine;
pub mod expectimax;
pub mod game;
pub mod montecarlo;
pub mod selector;
