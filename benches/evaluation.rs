use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use talon_engine::bitboards::Attacks;
use talon_engine::defs::{FEN_KIWIPETE_POSITION, FEN_START_POSITION};
use talon_engine::movegen::defs::MoveType;
use talon_engine::movegen::MoveGenerator;
use talon_engine::nnue::Network;
use talon_engine::search::{eval, SearchContext};
use talon_engine::tt::TranspositionTable;
use talon_engine::zobrist::ZobristRandoms;
use talon_engine::Position;

const TEST_POSITIONS: &[(&str, &str)] = &[
    (FEN_START_POSITION, "Starting Position"),
    ("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1", "After 1.e4"),
    (FEN_KIWIPETE_POSITION, "Kiwipete"),
    ("r2q1rk1/ppp2ppp/2np1n2/2b1p1B1/2B1P3/3P1N2/PPP2PPP/RN1Q1RK1 w - - 0 9", "Complex Middlegame"),
    ("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1", "King and Pawn Endgame"),
    ("8/8/8/8/8/3k4/8/3K4 w - - 0 1", "Lone Kings"),
];

fn setup_context(fen: &str) -> (SearchContext, Arc<MoveGenerator>) {
    let attacks = Arc::new(Attacks::new().expect("attack table init"));
    let zr = Arc::new(ZobristRandoms::new());
    let mut pos = Position::new(attacks.clone(), zr);
    pos.load_fen(fen);
    let mg = Arc::new(MoveGenerator::new(attacks));
    let net = Arc::new(Network::embedded().expect("embedded weights"));
    let tt = Arc::new(TranspositionTable::with_size_mb(1));
    (SearchContext::new(pos, mg.clone(), net, tt), mg)
}

/// Cost of one static-eval call (NNUE forward pass + correction history) in
/// a range of position types.
fn bench_static_eval(c: &mut Criterion) {
    let mut group = c.benchmark_group("static_eval");

    for (fen, name) in TEST_POSITIONS {
        let (mut ctx, _mg) = setup_context(fen);
        group.bench_with_input(BenchmarkId::new("static_eval", name), fen, |b, _| {
            b.iter(|| {
                black_box(eval::static_eval(&ctx.pos, &ctx.net, &ctx.acc, &mut ctx.eval_cache, &ctx.history))
            });
        });
    }

    group.finish();
}

/// Cost of pushing/popping an accumulator frame across make/unmake, which
/// is what keeps NNUE eval cheap during search.
fn bench_accumulator_make_unmake(c: &mut Criterion) {
    let mut group = c.benchmark_group("accumulator_make_unmake");

    let (mut ctx, mg) = setup_context("r2q1rk1/ppp2ppp/2np1n2/2b1p1B1/2B1P3/3P1N2/PPP2PPP/RN1Q1RK1 w - - 0 9");
    let mut list = talon_engine::movegen::defs::MoveList::new();
    mg.generate(&ctx.pos, &mut list, MoveType::All);
    let m = list.iter().next().expect("at least one legal move");

    group.bench_function("make_then_unmake", |b| {
        b.iter(|| {
            let before = eval::snapshot_features(&ctx.pos);
            let undo = ctx.pos.make(m);
            eval::push_for_move(&mut ctx.acc, &ctx.net, &ctx.pos, &before, m);
            black_box(eval::static_eval(&ctx.pos, &ctx.net, &ctx.acc, &mut ctx.eval_cache, &ctx.history));
            eval::pop(&mut ctx.acc);
            ctx.pos.unmake(m, undo);
        });
    });

    group.finish();
}

/// Cost of a fixed low-depth search, a proxy for node throughput across
/// move ordering + pruning + eval together.
fn bench_fixed_depth_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("fixed_depth_search");
    group.sample_size(20);

    for (fen, name) in TEST_POSITIONS {
        group.bench_with_input(BenchmarkId::new("depth_4", name), fen, |b, fen| {
            b.iter(|| {
                let (mut ctx, _mg) = setup_context(fen);
                black_box(talon_engine::search::search_fixed_depth(&mut ctx, 4))
            });
        });
    }

    group.finish();
}

/// Raw pseudo-legal + legality-filtered move generation cost.
fn bench_move_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("move_generation");

    for (fen, name) in TEST_POSITIONS {
        let (ctx, mg) = setup_context(fen);
        group.bench_with_input(BenchmarkId::new("legal_moves", name), fen, |b, _| {
            b.iter(|| black_box(mg.legal_moves(&mut ctx.pos.clone(), MoveType::All)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_static_eval,
    bench_accumulator_make_unmake,
    bench_fixed_depth_search,
    bench_move_generation
);
criterion_main!(benches);
