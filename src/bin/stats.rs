use ai_2048_bot::engine as GameEngine;
use ai_2048_bot::game::{play_game, GameConfig, GameSummary};
use ai_2048_bot::selector::{SearchBudget, Strategy};
use anyhow::Context;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use rand::{rngs::StdRng, SeedableRng};
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Debug, Parser)]
#[command(name = "stats", about = "Play batches of games per strategy and summarise the results")]
struct Args {
    /// Games per configuration
    #[arg(long, default_value_t = 5)]
    games: u64,

    /// Base seed; game i of every configuration uses seed + i
    #[arg(long)]
    seed: Option<u64>,

    /// Write the full report as JSON to this path
    #[arg(long)]
    out: Option<PathBuf>,

    /// Stop each game once this tile appears
    #[arg(long)]
    stop_tile: Option<u64>,

    /// Hide the progress bar
    #[arg(long)]
    quiet: bool,
}

struct RunConfig {
    label: &'static str,
    strategy: Strategy,
    budget: SearchBudget,
}

const RUNS: [RunConfig; 3] = [
    RunConfig { label: "MCTS (fast)", strategy: Strategy::MonteCarlo, budget: SearchBudget { searches_per_move: 10, search_length: 5 } },
    RunConfig { label: "MCTS (strong)", strategy: Strategy::MonteCarlo, budget: SearchBudget { searches_per_move: 50, search_length: 20 } },
    RunConfig { label: "Expectimax", strategy: Strategy::Expectimax, budget: SearchBudget { searches_per_move: 0, search_length: 0 } },
];

#[derive(Debug, Serialize)]
struct ConfigReport {
    label: &'static str,
    strategy: String,
    budget: SearchBudget,
    mean_score: f64,
    max_score: u64,
    mean_moves: f64,
    wins: usize,
    games: Vec<GameSummary>,
}

#[derive(Debug, Serialize)]
struct Report {
    games_per_config: u64,
    seed: Option<u64>,
    elapsed_s: f64,
    configs: Vec<ConfigReport>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    GameEngine::new();
    let start = Instant::now();

    let total = args.games * RUNS.len() as u64;
    let pb = if args.quiet { ProgressBar::hidden() } else { ProgressBar::new(total) };
    pb.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} games | {elapsed_precise} | {msg}")
            .context("progress template")?,
    );

    let mut configs = Vec::with_capacity(RUNS.len());
    for run in &RUNS {
        pb.set_message(run.label);
        let game_cfg = GameConfig {
            budget: run.budget,
            stop_at_win: args.stop_tile.is_some(),
            win_tile: args.stop_tile.unwrap_or(GameEngine::WIN_TILE),
            max_moves: None,
        };
        let games: Vec<GameSummary> = (0..args.games)
            .into_par_iter()
            .map(|i| {
                let seed = args.seed.map(|s| s.wrapping_add(i));
                let mut selector = run.strategy.build(seed);
                let mut rng = match seed {
                    Some(s) => StdRng::seed_from_u64(s),
                    None => StdRng::from_entropy(),
                };
                let summary = play_game(&mut selector, &game_cfg, &mut rng);
                pb.inc(1);
                summary
            })
            .collect();
        configs.push(summarise(run, games));
    }
    pb.finish_and_clear();

    for c in &configs {
        let tiles: Vec<String> = c.games.iter().map(|g| g.highest_tile.to_string()).collect();
        println!(
            "{:<14} | mean score: {:>9.1} | max score: {:>7} | mean moves: {:>7.1} | highest tiles: [{}]",
            c.label,
            c.mean_score,
            c.max_score,
            c.mean_moves,
            tiles.join(", ")
        );
    }

    if let Some(path) = &args.out {
        let report = Report {
            games_per_config: args.games,
            seed: args.seed,
            elapsed_s: start.elapsed().as_secs_f64(),
            configs,
        };
        let json = serde_json::to_string_pretty(&report)?;
        fs::write(path, json).with_context(|| format!("writing report to {}", path.display()))?;
        println!("Report written to {}", path.display());
    }
    Ok(())
}

fn summarise(run: &RunConfig, games: Vec<GameSummary>) -> ConfigReport {
    let n = games.len().max(1) as f64;
    let mean_score = games.iter().map(|g| g.score as f64).sum::<f64>() / n;
    let mean_moves = games.iter().map(|g| g.moves as f64).sum::<f64>() / n;
    let max_score = games.iter().map(|g| g.score).max().unwrap_or(0);
    let wins = games.iter().filter(|g| g.won).count();
    ConfigReport {
        label: run.label,
        strategy: run.strategy.to_string(),
        budget: run.budget,
        mean_score,
        max_score,
        mean_moves,
        wins,
        games,
    }
}
