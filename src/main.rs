use std::thread;
use std::time::Duration;

use ai_2048_bot::game::{play_game_with, GameConfig};
use ai_2048_bot::selector::{SearchBudget, Strategy};
use clap::Parser;
use rand::{rngs::StdRng, SeedableRng};

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    let mut selector = args.strategy.build(args.seed);
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let cfg = GameConfig {
        budget: SearchBudget::new(args.searches_per_move, args.search_length),
        win_tile: args.win_tile,
        stop_at_win: !args.keep_going,
        max_moves: args.steps,
    };
    let delay = Duration::from_millis(args.delay_ms);
    let summary = play_game_with(&mut selector, &cfg, &mut rng, |_, outcome| {
        if !args.quiet {
            println!("{}", outcome.board);
        }
        if !delay.is_zero() {
            thread::sleep(delay);
        }
    });
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }
    println!(
        "{}: {} | score: {} | highest tile: {} | moves: {} | {:.2}s",
        summary.strategy,
        if summary.won { "win" } else { "game over" },
        summary.score,
        summary.highest_tile,
        summary.moves,
        summary.elapsed_s
    );
    Ok(())
}

#[derive(Debug, Parser)]
#[command(name = "ai-2048-bot", about = "Play one game of 2048 with a search strategy")]
struct Args {
    /// expectimax, expectimax-par or montecarlo
    #[arg(long, default_value = "expectimax")]
    strategy: Strategy,

    /// Random playouts per first move (montecarlo)
    #[arg(long, default_value_t = 40)]
    searches_per_move: usize,

    /// Playout horizon in moves (montecarlo)
    #[arg(long, default_value_t = 20)]
    search_length: usize,

    /// Seed for the game and the strategy
    #[arg(long)]
    seed: Option<u64>,

    /// Tile that wins the game
    #[arg(long, default_value_t = ai_2048_bot::engine::WIN_TILE)]
    win_tile: u64,

    /// Keep playing after the win tile appears
    #[arg(long)]
    keep_going: bool,

    /// Stop after this many moves
    #[arg(long)]
    steps: Option<u64>,

    /// Pause between moves, in milliseconds
    #[arg(long, default_value_t = 0)]
    delay_ms: u64,

    /// Only print the final line
    #[arg(long)]
    quiet: bool,

    /// Print the final summary as JSON
    #[arg(long)]
    json: bool,
}
