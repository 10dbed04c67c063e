/* =======================================================================
Talon is a chess playing engine. See src/defs.rs for license notice.
======================================================================= */

//! Keeps the two-perspective NNUE accumulator stack synchronized to the
//! search's make/unmake discipline, and produces the corrected static eval
//! consulted by the alpha-beta search.

use crate::board::Position;
use crate::defs::{NrOf, Pieces, Sides};
use crate::evalcache::EvaluationCache;
use crate::history_tables::{CorrectionKind, HistoryTables};
use crate::movegen::defs::Move;
use crate::nnue::accumulator::AccumulatorStack;
use crate::nnue::{self, Network};

/// Pushes one accumulator frame per perspective for `m`, having already
/// been applied to `pos` via `Position::make`. Ordinary moves take a plain
/// before/after active-feature diff; a move of the mover's own king that
/// crosses a king-bucket or mirror boundary forces a full refresh of that
/// perspective instead, since every feature index for it changes.
pub fn push_for_move(acc: &mut AccumulatorStack, net: &Network, pos: &Position, before: &[Vec<usize>; 2], m: Move) {
    let mover = pos.opponent();
    for perspective in [Sides::WHITE, Sides::BLACK] {
        let after = pos.active_features(perspective);
        if m.piece() == Pieces::KING
            && mover == perspective
            && nnue::king_move_forces_refresh(perspective, m.from(), m.to())
        {
            acc.push_refresh(perspective, net, &after);
        } else {
            let (adds, subs) = diff_features(&before[perspective], &after);
            acc.push_delta(perspective, net, &adds, &subs);
        }
    }
}

pub fn push_null(acc: &mut AccumulatorStack) {
    for perspective in [Sides::WHITE, Sides::BLACK] {
        acc.push_copy(perspective);
    }
}

pub fn pop(acc: &mut AccumulatorStack) {
    for perspective in [Sides::WHITE, Sides::BLACK] {
        acc.pop(perspective);
    }
}

/// Snapshot of both perspectives' active features, taken before a move is
/// applied to `pos`, to be diffed against the post-move set by [`push_for_move`].
pub fn snapshot_features(pos: &Position) -> [Vec<usize>; 2] {
    [pos.active_features(Sides::WHITE), pos.active_features(Sides::BLACK)]
}

fn diff_features(before: &[usize], after: &[usize]) -> (Vec<usize>, Vec<usize>) {
    let mut adds = Vec::new();
    let mut subs = Vec::new();
    for &f in after {
        if !before.contains(&f) {
            adds.push(f);
        }
    }
    for &f in before {
        if !after.contains(&f) {
            subs.push(f);
        }
    }
    (adds, subs)
}

/// Raw NNUE inference plus corrected static eval for the side to move.
pub fn static_eval(
    pos: &Position,
    net: &Network,
    acc: &AccumulatorStack,
    eval_cache: &mut EvaluationCache,
    history: &HistoryTables,
) -> (i32, i32) {
    let side = pos.us();
    if let Some(cached) = eval_cache.probe(pos.state.zobrist_key) {
        let corrected = cached + corrections(pos, history, side);
        return (cached, corrected);
    }

    let non_pawn_king_count: usize = [Sides::WHITE, Sides::BLACK]
        .iter()
        .flat_map(|&s| (0..NrOf::PIECE_TYPES).map(move |p| (s, p)))
        .filter(|&(_, p)| p != Pieces::PAWN && p != Pieces::KING)
        .map(|(s, p)| pos.get_pieces(p, s).count_ones() as usize)
        .sum();
    let bucket = Network::output_bucket(non_pawn_king_count);

    let stm = acc.current(side);
    let other = acc.current(side ^ 1);
    let (raw, _stm_active, _other_active) = net.forward(stm, other, bucket);

    eval_cache.store(pos.state.zobrist_key, raw);
    let corrected = raw + corrections(pos, history, side);
    (raw, corrected)
}

fn corrections(pos: &Position, history: &HistoryTables, side: usize) -> i32 {
    history.total_correction(
        side,
        pos.state.pawn_hash,
        pos.state.minor_hash,
        pos.state.major_hash,
        pos.state.material_hash,
    )
}

/// Updates all four correction-history tables from the realized error
/// between the search's best score and the raw (uncorrected) eval.
pub fn update_correction_history(
    history: &mut HistoryTables,
    pos: &Position,
    side: usize,
    raw_eval: i32,
    best_score: i32,
    depth: i8,
) {
    let error = best_score - raw_eval;
    history.update_correction(side, CorrectionKind::Pawn, pos.state.pawn_hash, error, depth);
    history.update_correction(side, CorrectionKind::Minor, pos.state.minor_hash, error, depth);
    history.update_correction(side, CorrectionKind::Major, pos.state.major_hash, error, depth);
    history.update_correction(side, CorrectionKind::Material, pos.state.material_hash, error, depth);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitboards::Attacks;
    use crate::zobrist::ZobristRandoms;
    use std::sync::Arc;

    fn setup() -> (Position, Arc<Network>, AccumulatorStack) {
        let attacks = Arc::new(Attacks::new().unwrap());
        let zr = Arc::new(ZobristRandoms::new());
        let pos = Position::new(attacks, zr);
        let net = Arc::new(Network::embedded().unwrap());
        let acc = AccumulatorStack::new(&net);
        (pos, net, acc)
    }

    #[test]
    fn push_for_move_keeps_accumulator_depth_in_sync() {
        let (mut pos, net, mut acc) = setup();
        let before = snapshot_features(&pos);
        let m = Move::new(12, 28, Pieces::PAWN, Pieces::NONE, Pieces::NONE, false);
        let undo = pos.make(m);
        push_for_move(&mut acc, &net, &pos, &before, m);
        assert_eq!(acc.depth(Sides::WHITE), 2);
        pop(&mut acc);
        pos.unmake(m, undo);
        assert_eq!(acc.depth(Sides::WHITE), 1);
    }

    #[test]
    fn static_eval_is_cached_on_second_probe() {
        let (pos, net, acc) = setup();
        let mut cache = EvaluationCache::with_size_mb(1);
        let history = HistoryTables::new(crate::defs::MAX_PLY);
        let (raw1, _) = static_eval(&pos, &net, &acc, &mut cache, &history);
        let (raw2, _) = static_eval(&pos, &net, &acc, &mut cache, &history);
        assert_eq!(raw1, raw2);
    }
}
