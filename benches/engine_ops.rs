use ai_2048_bot::engine::{self as GameEngine, count_empty, get_highest_tile_val, Board, Move};
use ai_2048_bot::expectimax::evaluate;
use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use rand::{rngs::StdRng, SeedableRng};
use std::hint::black_box;

fn warm() { GameEngine::new(); }

fn corpus() -> Vec<Board> {
    let mut rng = StdRng::seed_from_u64(42);
    let mut boards = vec![Board::EMPTY];
    let mut b = GameEngine::initialize(&mut rng);
    boards.push(b);
    let seq = [Move::Left, Move::Up, Move::Right, Move::Down];
    for i in 0..20 {
        let out = b.apply(seq[i % seq.len()]);
        if out.valid { b = out.board.with_random_tile(&mut rng); }
        boards.push(b);
    }
    boards
}

fn bench_apply(c: &mut Criterion) {
    warm();
    let boards = corpus();
    for dir in Move::ALL {
        c.bench_function(&format!("apply/{dir}"), |bch| {
            bch.iter(|| {
                let mut acc = 0u64;
                for &bd in &boards {
                    let out = bd.apply(dir);
                    acc ^= out.board.raw().wrapping_add(out.score);
                }
                black_box(acc)
            })
        });
    }
}

fn bench_spawn_and_rollout_step(c: &mut Criterion) {
    warm();
    c.bench_function("board/with_random_tile", |bch| {
        bch.iter_batched(
            || (Board::EMPTY, StdRng::seed_from_u64(7)),
            |(mut bd, mut rng)| {
                for _ in 0..16 { bd = bd.with_random_tile(&mut rng); }
                black_box(bd)
            },
            BatchSize::SmallInput,
        )
    });
    c.bench_function("board/random_valid_move", |bch| {
        bch.iter_batched(
            || {
                let mut rng = StdRng::seed_from_u64(9);
                (GameEngine::initialize(&mut rng), rng)
            },
            |(mut bd, mut rng)| {
                for _ in 0..64 {
                    let out = bd.random_valid_move(&mut rng);
                    if !out.valid { break; }
                    bd = out.board.with_random_tile(&mut rng);
                }
                black_box(bd)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_queries(c: &mut Criterion) {
    warm();
    let boards = corpus();
    c.bench_function("query/count_empty", |bch| {
        bch.iter(|| {
            let mut acc = 0u64;
            for &bd in &boards { acc ^= count_empty(bd); }
            black_box(acc)
        })
    });
    c.bench_function("query/highest_tile_val", |bch| {
        bch.iter(|| {
            let mut acc = 0u64;
            for &bd in &boards { acc ^= get_highest_tile_val(bd); }
            black_box(acc)
        })
    });
    c.bench_function("heuristic/evaluate", |bch| {
        bch.iter(|| {
            let mut acc = 0f64;
            for &bd in &boards { acc += evaluate(bd); }
            black_box(acc)
        })
    });
}

criterion_group!(engine_ops, bench_apply, bench_spawn_and_rollout_step, bench_queries);
criterion_main!(engine_ops);
