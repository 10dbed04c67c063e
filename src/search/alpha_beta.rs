/* =======================================================================
Talon is a chess playing engine. See src/defs.rs for license notice.
======================================================================= */

//! The recursive alpha-beta core and its quiescence-search tail. Consults,
//! in order: mate-distance pruning, the transposition table, corrected
//! static eval, reverse futility pruning, null-move pruning, razoring,
//! internal iterative reduction, probcut, singular extension, then the
//! main move loop (late-move reductions, futility/history/SEE pruning).

use super::defs::*;
use super::manager::SearchManager;
use super::picker::MovePicker;
use super::SearchContext;
use crate::movegen::defs::{Move, MoveType, ShortMove};
use crate::tt::{score_from_tt, score_to_tt, NodeType, TtData};

/// Runs one iteration with an aspiration window centered on `prev_score`,
/// widening and retrying on fail-low/fail-high until the true score is
/// bracketed (or the full [-INF, INF] window is reached).
pub fn aspirated_search(ctx: &mut SearchContext, manager: &SearchManager, depth: i8, prev_score: i32, pv: &mut Vec<Move>) -> i32 {
    if depth < 4 {
        return root_search(ctx, manager, depth, -INF, INF, pv);
    }

    let mut window = ASPIRATION_WINDOW;
    let mut alpha = (prev_score - window).max(-INF);
    let mut beta = (prev_score + window).min(INF);

    loop {
        let score = root_search(ctx, manager, depth, alpha, beta, pv);
        if score == INVALID {
            return INVALID;
        }
        if score <= alpha {
            alpha = (alpha - window).max(-INF);
        } else if score >= beta {
            beta = (beta + window).min(INF);
        } else {
            return score;
        }
        window *= 2;
        if alpha <= -INF && beta >= INF {
            return root_search(ctx, manager, depth, -INF, INF, pv);
        }
    }
}

fn root_search(ctx: &mut SearchContext, manager: &SearchManager, depth: i8, alpha: i32, beta: i32, pv: &mut Vec<Move>) -> i32 {
    ctx.seldepth = 0;
    alpha_beta(ctx, manager, depth, alpha, beta, 0, pv, ShortMove::none(), NodeType::Pv)
}

/// Negates a child node's return value, propagating an abort sentinel
/// unchanged instead of negating it (negating `INVALID` would otherwise
/// need care around `i32::MIN`).
fn negate(child: i32) -> i32 {
    if child == INVALID {
        INVALID
    } else {
        -child
    }
}

#[allow(clippy::too_many_arguments)]
fn alpha_beta(
    ctx: &mut SearchContext,
    manager: &SearchManager,
    mut depth: i8,
    mut alpha: i32,
    mut beta: i32,
    ply: usize,
    pv: &mut Vec<Move>,
    skip_move: ShortMove,
    expected: NodeType,
) -> i32 {
    pv.clear();
    let is_pv = expected == NodeType::Pv;
    ctx.seldepth = ctx.seldepth.max(ply as i8);

    // 1. abort check
    ctx.nodes += 1;
    if ctx.nodes % CHECK_TERMINATION_EVERY == 0 && manager.on_search_stop_control(ctx.nodes) {
        return INVALID;
    }

    // 2. draw + mate-distance pruning
    if ply > 0 {
        if ctx.pos.repetition_count() >= 2 || ctx.pos.state.halfmove_clock >= 100 || ctx.pos.is_insufficient_material() {
            return DRAW;
        }
        alpha = alpha.max(-MATE + ply as i32);
        beta = beta.min(MATE - ply as i32 - 1);
        if alpha >= beta {
            return alpha;
        }
    }

    // 3. quiescence handoff
    if depth <= 0 {
        return qsearch(ctx, manager, alpha, beta, ply);
    }

    let in_check = ctx.pos.in_check(ctx.pos.us());
    if in_check {
        depth += 1;
    }

    // 4. TT probe
    let zhash = ctx.pos.state.zobrist_key;
    let mut tt_move = ShortMove::none();
    let tt_entry = if skip_move.is_none() { ctx.tt.probe(zhash) } else { None };
    if let Some(entry) = &tt_entry {
        tt_move = entry.best_move;
        if entry.depth >= depth && ply > 0 {
            let score = score_from_tt(entry.score, ply);
            let usable = match entry.node_type {
                NodeType::Pv => true,
                NodeType::Cut => score >= beta,
                NodeType::All => score <= alpha,
            };
            if usable && !is_pv {
                return score;
            }
        }
    }

    // 5. static eval + correction history
    let (raw_eval, static_eval) = if in_check { (INVALID, INVALID) } else { ctx.static_eval() };
    ctx.static_eval_stack[ply] = static_eval;

    // 6. improving flag: position got better than our own eval two plies ago
    let improving = !in_check
        && ply >= 2
        && ctx.static_eval_stack[ply - 2] != INVALID
        && static_eval > ctx.static_eval_stack[ply - 2];
    ctx.reduced_stack[ply] = false;

    if !in_check && !is_pv && ply > 0 && skip_move.is_none() {
        // 8. reverse futility pruning
        if depth <= RFP_MAX_DEPTH {
            let margin = RFP_MARGIN_PER_DEPTH * depth as i32 - if improving { RFP_IMPROVING_BONUS } else { 0 };
            if static_eval - margin >= beta && static_eval.abs() < MATE_THRESHOLD {
                return (static_eval + beta) / 2;
            }
        }

        // 9. null-move pruning
        if depth >= NMP_MIN_DEPTH && static_eval >= beta && has_non_pawn_material(ctx) {
            let reduction = 3 + depth / 4;
            let undo = ctx.make_null();
            let mut child_pv = Vec::new();
            let child = alpha_beta(ctx, manager, depth - 1 - reduction, -beta, -beta + 1, ply + 1, &mut child_pv, ShortMove::none(), NodeType::Cut);
            ctx.unmake_null(undo);
            if child == INVALID {
                return INVALID;
            }
            let score = negate(child);
            if score >= beta {
                if depth >= NMP_VERIFICATION_DEPTH {
                    let verify = alpha_beta(ctx, manager, depth - reduction, beta - 1, beta, ply, &mut Vec::new(), skip_move, NodeType::Cut);
                    if verify == INVALID {
                        return INVALID;
                    }
                    if verify >= beta {
                        return verify;
                    }
                } else {
                    return score;
                }
            } else {
                ctx.set_null_move_threat(ply, child_pv.first().map(|m| m.to()));
            }
        }

        // 10. razoring
        if depth <= RAZOR_MAX_DEPTH {
            let margin = static_eval + RAZOR_MARGIN_PER_DEPTH * depth as i32;
            if margin < alpha {
                let score = qsearch(ctx, manager, alpha, beta, ply);
                if score == INVALID {
                    return INVALID;
                }
                if score < alpha {
                    return score;
                }
            }
        }
    }

    // 11. internal iterative reduction
    if depth >= IIR_MIN_DEPTH && tt_move.is_none() && !in_check {
        depth -= 1;
    }

    let mg = ctx.mg.clone();

    // 12. probcut
    if !is_pv && !in_check && depth >= PROBCUT_MIN_DEPTH && skip_move.is_none() {
        let probcut_beta = beta + PROBCUT_MARGIN;
        let mut picker = MovePicker::new(tt_move, GOOD_QUIET_THRESHOLD);
        picker.skip_quiets();
        while let Some(m) = picker.pick(&mut ctx.pos, &mg, &ctx.history, ply, Move::null()) {
            if !m.is_capture() {
                continue;
            }
            let exchange = crate::see::see(&mg, &ctx.pos, m);
            if static_eval + exchange < probcut_beta {
                continue;
            }
            let undo = ctx.make(m);
            let mut child_pv = Vec::new();
            let child = alpha_beta(ctx, manager, depth - PROBCUT_MIN_DEPTH, -probcut_beta, -probcut_beta + 1, ply + 1, &mut child_pv, ShortMove::none(), NodeType::Cut);
            ctx.unmake(m, undo);
            if child == INVALID {
                return INVALID;
            }
            let score = negate(child);
            if score >= probcut_beta {
                return score;
            }
        }
    }

    // 13. singular extension candidate: reuses the tt entry probed above
    let singular_candidate = if depth >= SINGULAR_MIN_DEPTH && skip_move.is_none() && !tt_move.is_none() {
        tt_entry.filter(|e| e.depth >= depth - SINGULAR_TT_DEPTH_MARGIN && e.node_type != NodeType::All)
    } else {
        None
    };

    // 14. main move loop
    let mut picker = MovePicker::new(tt_move, GOOD_QUIET_THRESHOLD);
    picker.set_null_move_threat(ctx.null_move_threat(ply));
    let mut best_score = -INF;
    let mut best_move = ShortMove::none();
    let mut node_type = NodeType::All;
    let mut moves_tried = 0usize;
    let mut quiets_tried: Vec<Move> = Vec::new();

    loop {
        let m = match picker.pick(&mut ctx.pos, &mg, &ctx.history, ply, Move::null()) {
            Some(m) => m,
            None => break,
        };
        if !skip_move.is_none() && skip_move.matches(&m) {
            continue;
        }
        if ply == 0 && ctx.root_move_excluded(m) {
            continue;
        }

        let gives_check = ctx.pos.causes_check(m, ctx.pos.opponent());
        let is_quiet = m.is_quiet();

        // late move pruning / futility for quiet moves deep in the list
        if !is_pv && moves_tried > 0 && best_score > -MATE_THRESHOLD && is_quiet && !gives_check && !in_check {
            if depth <= FUTILITY_MAX_LMR_DEPTH {
                let margin = FUTILITY_BASE + FUTILITY_PER_PLY * depth as i32;
                if static_eval + margin <= alpha {
                    continue;
                }
            }
            if depth <= LMR_FUTILITY_MAX_DEPTH && moves_tried as i32 > 3 + depth as i32 * depth as i32 {
                continue;
            }
            let hist = ctx.history.quiet.get(m.piece(), m.to());
            if hist < HISTORY_PRUNE_MARGIN {
                continue;
            }
        }
        if !is_pv && moves_tried > 0 {
            if m.is_capture() {
                let exchange = crate::see::see(&mg, &ctx.pos, m);
                if exchange < SEE_PRUNE_CAPTURE_MARGIN * depth as i32 {
                    continue;
                }
            } else if is_quiet && depth <= 8 && !gives_check {
                let exchange = crate::see::see(&mg, &ctx.pos, m);
                if exchange < SEE_PRUNE_QUIET_MARGIN * depth as i32 {
                    continue;
                }
            }
        }

        // singular extension: if this is the tt move and it holds up under a
        // reduced-window search excluding itself, it's forced; extend by one.
        let mut extension = 0i8;
        if let Some(entry) = &singular_candidate {
            if tt_move.matches(&m) {
                let margin = (depth as i32).max(1);
                let singular_beta = score_from_tt(entry.score, ply) - 2 * margin;
                let mut dummy_pv = Vec::new();
                let score = alpha_beta(ctx, manager, (depth - 1) / 2, singular_beta - 1, singular_beta, ply, &mut dummy_pv, tt_move, NodeType::Cut);
                if score == INVALID {
                    return INVALID;
                }
                if score < singular_beta {
                    extension = 1;
                } else if singular_beta >= beta {
                    return singular_beta;
                }
            }
        }

        let undo = ctx.make(m);
        if is_quiet {
            quiets_tried.push(m);
        }

        let mut child_pv = Vec::new();
        let score = if moves_tried == 0 {
            let child = alpha_beta(
                ctx,
                manager,
                depth - 1 + extension,
                -beta,
                -alpha,
                ply + 1,
                &mut child_pv,
                ShortMove::none(),
                if is_pv { NodeType::Pv } else { NodeType::Cut },
            );
            if child == INVALID {
                ctx.unmake(m, undo);
                return INVALID;
            }
            negate(child)
        } else {
            let mut reduction = 0i8;
            if depth >= 3 && moves_tried >= 2 && is_quiet && !gives_check {
                reduction = lmr_reduction(depth, moves_tried);
                if is_pv {
                    reduction -= 1;
                }
                if ctx.history.quiet.get(m.piece(), m.to()) > 0 {
                    reduction -= 1;
                }
                reduction = reduction.clamp(0, depth - 1);
            }
            ctx.reduced_stack[ply] = reduction > 0;

            let child = alpha_beta(ctx, manager, depth - 1 - reduction, -alpha - 1, -alpha, ply + 1, &mut child_pv, ShortMove::none(), NodeType::Cut);
            if child == INVALID {
                ctx.unmake(m, undo);
                return INVALID;
            }
            let mut s = negate(child);

            if s > alpha && reduction > 0 {
                child_pv.clear();
                let child = alpha_beta(ctx, manager, depth - 1, -alpha - 1, -alpha, ply + 1, &mut child_pv, ShortMove::none(), NodeType::Cut);
                if child == INVALID {
                    ctx.unmake(m, undo);
                    return INVALID;
                }
                s = negate(child);
            }
            if s > alpha && s < beta && is_pv {
                child_pv.clear();
                let child = alpha_beta(ctx, manager, depth - 1 + extension, -beta, -alpha, ply + 1, &mut child_pv, ShortMove::none(), NodeType::Pv);
                if child == INVALID {
                    ctx.unmake(m, undo);
                    return INVALID;
                }
                s = negate(child);
            }
            s
        };

        ctx.unmake(m, undo);
        moves_tried += 1;

        if score > best_score {
            best_score = score;
            best_move = m.to_short();
            if score > alpha {
                alpha = score;
                node_type = NodeType::Pv;
                pv.clear();
                pv.push(m);
                pv.extend(child_pv);
            }
        }

        if alpha >= beta {
            node_type = NodeType::Cut;
            if is_quiet {
                let bonus = crate::history_tables::HistoryTables::cutoff_bonus(depth);
                ctx.history.quiet.update(m.piece(), m.to(), bonus);
                ctx.history.update_continuation(ply, m, bonus);
                ctx.history.record_killer(ply, m.to_short());
                if quiets_tried.len() > 1 {
                    for &q in &quiets_tried[..quiets_tried.len() - 1] {
                        ctx.history.quiet.update(q.piece(), q.to(), -bonus);
                        ctx.history.update_continuation(ply, q, -bonus);
                    }
                }
            } else {
                let bonus = crate::history_tables::HistoryTables::cutoff_bonus(depth);
                ctx.history.capture.update(m.piece(), m.to(), m.captured(), bonus);
            }
            break;
        }
    }

    // 15. checkmate / stalemate
    if moves_tried == 0 {
        if skip_move.is_none() {
            return if in_check { -MATE + ply as i32 } else { DRAW };
        }
        return alpha;
    }

    // 16. TT store + correction history update
    if skip_move.is_none() {
        ctx.tt.store(
            zhash,
            TtData {
                best_move,
                node_type,
                static_eval: raw_eval.clamp(-8191, 8191),
                depth,
                age: ctx.tt.current_age(),
                score: score_to_tt(best_score, ply),
            },
        );

        if !in_check && raw_eval != INVALID && best_score.abs() < MATE_THRESHOLD {
            let allow_update = match node_type {
                NodeType::Pv => true,
                NodeType::Cut => best_score > raw_eval,
                NodeType::All => best_score < raw_eval,
            };
            if allow_update {
                let side = ctx.pos.us();
                super::eval::update_correction_history(&mut ctx.history, &ctx.pos, side, raw_eval, best_score, depth);
            }
        }
    }

    best_score
}

fn lmr_reduction(depth: i8, moves_tried: usize) -> i8 {
    let d = (depth as f64).max(1.0).ln();
    let m = (moves_tried as f64).max(1.0).ln();
    (0.4 + d * m * 0.3) as i8
}

fn has_non_pawn_material(ctx: &SearchContext) -> bool {
    use crate::defs::Pieces;
    let side = ctx.pos.us();
    [Pieces::KNIGHT, Pieces::BISHOP, Pieces::ROOK, Pieces::QUEEN]
        .iter()
        .any(|&p| ctx.pos.get_pieces(p, side) != 0)
}

/// Quiescence search: captures and check evasions only, until the position
/// is quiet. Uses the same corrected static eval as the main search for its
/// stand-pat bound but never writes back to correction history.
fn qsearch(ctx: &mut SearchContext, manager: &SearchManager, mut alpha: i32, beta: i32, ply: usize) -> i32 {
    ctx.nodes += 1;
    ctx.seldepth = ctx.seldepth.max(ply as i8);
    if ctx.nodes % CHECK_TERMINATION_EVERY == 0 && manager.on_search_stop_control(ctx.nodes) {
        return INVALID;
    }

    let in_check = ctx.pos.in_check(ctx.pos.us());
    let stand_pat = if in_check { -MATE + ply as i32 } else { ctx.static_eval().1 };

    if !in_check {
        if stand_pat >= beta {
            return stand_pat;
        }
        alpha = alpha.max(stand_pat);
    }

    let mg = ctx.mg.clone();
    let mut list = crate::movegen::defs::MoveList::new();
    if in_check {
        mg.generate(&ctx.pos, &mut list, MoveType::All);
    } else {
        mg.generate(&ctx.pos, &mut list, MoveType::Captures);
    }

    let mut best_score = if in_check { -INF } else { stand_pat };
    let mut any_legal = false;

    for m in list.iter() {
        if ctx.pos.causes_check(m, ctx.pos.us()) {
            continue;
        }
        any_legal = true;

        if !in_check && m.is_capture() {
            let exchange = crate::see::see(&mg, &ctx.pos, m);
            if exchange < 0 || stand_pat + exchange + 200 < alpha {
                continue;
            }
        }

        let undo = ctx.make(m);
        let child = qsearch(ctx, manager, -beta, -alpha, ply + 1);
        ctx.unmake(m, undo);

        if child == INVALID {
            return INVALID;
        }
        let score = negate(child);
        if score > best_score {
            best_score = score;
            if score > alpha {
                alpha = score;
            }
        }
        if alpha >= beta {
            break;
        }
    }

    if in_check && !any_legal {
        return -MATE + ply as i32;
    }

    best_score
}
