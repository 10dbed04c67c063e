/* =======================================================================
Talon is a chess playing engine. See src/defs.rs for license notice.
======================================================================= */

//! Staged move picker: `TT -> GOOD_CAPTURE -> PROMOTION -> KILLER ->
//! GOOD_QUIET -> BAD_CAPTURE -> BAD_QUIET -> END`. Each stage is lazily
//! generated on first entry and drained before the next stage starts.

use crate::board::Position;
use crate::defs::Pieces;
use crate::history_tables::HistoryTables;
use crate::movegen::defs::{Move, MoveList, MoveType, ShortMove};
use crate::movegen::MoveGenerator;
use crate::see::see;

const GOOD_CAPTURE_CAP: usize = 20;
const GOOD_QUIET_CAP: usize = 40;

// Threats-bonus constants (see spec glossary: threats bonus).
const ESCAPE_MINOR_BONUS: i32 = 16384;
const WALK_INTO_MINOR_PENALTY: i32 = 16384;
const ESCAPE_MAJOR_BONUS: i32 = 16384;
const WALK_INTO_MAJOR_PENALTY: i32 = 16384;
const ATTACK_BONUS: i32 = 8192;
const KING_ATTACK_BONUS: i32 = 16384;
const NULL_MOVE_ESCAPE_BONUS: i32 = 4096;

#[derive(Copy, Clone, PartialEq, Eq)]
enum Stage {
    Tt,
    GoodCapture,
    Promotion,
    Killer,
    GoodQuiet,
    BadCapture,
    BadQuiet,
    End,
}

struct Scored {
    mv: Move,
    score: i32,
}

/// Per-node move picker. Owns no state across nodes; constructed fresh by
/// the searcher at every ply with the data it needs for scoring.
pub struct MovePicker {
    stage: Stage,
    tt_move: ShortMove,
    tt_emitted: bool,
    good_capture: Vec<Scored>,
    bad_capture: Vec<Scored>,
    promotion: Vec<Scored>,
    good_quiet: Vec<Scored>,
    bad_quiet: Vec<Scored>,
    killer_queue: Vec<Move>,
    skip_quiets: bool,
    good_quiet_threshold: i32,
    last_capture: bool,
    null_move_threat: Option<Square>,
    captures_generated: bool,
    promotions_generated: bool,
    quiets_generated: bool,
    killers_generated: bool,
}

impl MovePicker {
    pub fn new(tt_move: ShortMove, good_quiet_threshold: i32) -> Self {
        Self {
            stage: Stage::Tt,
            tt_move,
            tt_emitted: false,
            good_capture: Vec::new(),
            bad_capture: Vec::new(),
            promotion: Vec::new(),
            good_quiet: Vec::new(),
            bad_quiet: Vec::new(),
            killer_queue: Vec::new(),
            skip_quiets: false,
            good_quiet_threshold,
            last_capture: false,
            null_move_threat: None,
            captures_generated: false,
            promotions_generated: false,
            quiets_generated: false,
            killers_generated: false,
        }
    }

    /// Late-move pruning calls this once generation of quiets becomes
    /// pointless for the rest of this node.
    pub fn skip_quiets(&mut self) {
        self.skip_quiets = true;
    }

    /// The destination square of the previous iteration's null-move threat
    /// move, if any; moves escaping to that square get a quiet-ordering bonus.
    pub fn set_null_move_threat(&mut self, square: Option<Square>) {
        self.null_move_threat = square;
    }

    pub fn last_pick_was_capture(&self) -> bool {
        self.last_capture
    }

    #[allow(clippy::too_many_arguments)]
    pub fn pick(
        &mut self,
        pos: &mut Position,
        mg: &MoveGenerator,
        history: &HistoryTables,
        ply: usize,
        prev_move: Move,
    ) -> Option<Move> {
        loop {
            let candidate = self.next_candidate(pos, mg, history, ply, prev_move)?;
            let side = pos.us();
            if pos.causes_check(candidate, side) {
                continue;
            }
            self.last_capture = candidate.is_capture();
            return Some(candidate);
        }
    }

    fn next_candidate(
        &mut self,
        pos: &mut Position,
        mg: &MoveGenerator,
        history: &HistoryTables,
        ply: usize,
        prev_move: Move,
    ) -> Option<Move> {
        loop {
            match self.stage {
                Stage::Tt => {
                    self.stage = Stage::GoodCapture;
                    if !self.tt_emitted && !self.tt_move.is_none() {
                        self.tt_emitted = true;
                        if let Some(mv) = self.reconstruct_tt_move(pos, mg) {
                            return Some(mv);
                        }
                    }
                }
                Stage::GoodCapture => {
                    if !self.captures_generated {
                        self.generate_captures(pos, mg, history);
                        self.captures_generated = true;
                    }
                    if let Some(mv) = pop_best(&mut self.good_capture) {
                        return Some(mv);
                    }
                    self.stage = Stage::Promotion;
                }
                Stage::Promotion => {
                    if !self.promotions_generated {
                        self.generate_promotions(pos, mg, history, ply);
                        self.promotions_generated = true;
                    }
                    if let Some(mv) = pop_best(&mut self.promotion) {
                        return Some(mv);
                    }
                    self.stage = Stage::Killer;
                }
                Stage::Killer => {
                    if !self.killers_generated {
                        self.generate_killers(pos, mg, history, ply, prev_move);
                        self.killers_generated = true;
                    }
                    if let Some(mv) = self.killer_queue.pop() {
                        if self.tt_move.matches(&mv) {
                            continue;
                        }
                        return Some(mv);
                    }
                    self.stage = Stage::GoodQuiet;
                }
                Stage::GoodQuiet => {
                    if !self.skip_quiets && !self.quiets_generated {
                        self.generate_quiets(pos, mg, history, ply);
                        self.quiets_generated = true;
                    }
                    if !self.skip_quiets {
                        if let Some(mv) = pop_best(&mut self.good_quiet) {
                            return Some(mv);
                        }
                    }
                    self.stage = Stage::BadCapture;
                }
                Stage::BadCapture => {
                    if let Some(mv) = pop_best(&mut self.bad_capture) {
                        return Some(mv);
                    }
                    self.stage = Stage::BadQuiet;
                }
                Stage::BadQuiet => {
                    if !self.skip_quiets {
                        if let Some(mv) = pop_best(&mut self.bad_quiet) {
                            return Some(mv);
                        }
                    }
                    self.stage = Stage::End;
                }
                Stage::End => return None,
            }
        }
    }

    fn reconstruct_tt_move(&self, pos: &Position, mg: &MoveGenerator) -> Option<Move> {
        let mut list = MoveList::new();
        mg.generate(pos, &mut list, MoveType::All);
        let found = list.iter().find(|m| self.tt_move.matches(m));
        found
    }

    fn generate_captures(&mut self, pos: &Position, mg: &MoveGenerator, history: &HistoryTables) {
        let mut list = MoveList::new();
        mg.generate(pos, &mut list, MoveType::Captures);
        for m in list.iter() {
            if self.tt_move.matches(&m) {
                continue;
            }
            let exchange = see(mg, pos, m);
            let history_term = if m.is_en_passant() {
                0
            } else {
                history.capture.get(m.piece(), m.to(), m.captured()) / 32
            };
            let score = exchange + history_term;
            let scored = Scored { mv: m, score };
            if score >= 0 && self.good_capture.len() < GOOD_CAPTURE_CAP {
                self.good_capture.push(scored);
            } else {
                self.bad_capture.push(scored);
            }
        }
    }

    /// Non-capture promotions, scored by quiet history alone (no threats
    /// bonus) — capturing promotions are already ranked in GOOD_CAPTURE.
    fn generate_promotions(&mut self, pos: &Position, mg: &MoveGenerator, history: &HistoryTables, ply: usize) {
        let mut list = MoveList::new();
        mg.generate(pos, &mut list, MoveType::Quiet);
        for m in list.iter() {
            if !m.is_promotion() || self.tt_move.matches(&m) {
                continue;
            }
            let score = history.quiet_history(ply, m);
            self.promotion.push(Scored { mv: m, score });
        }
    }

    fn generate_killers(
        &mut self,
        pos: &Position,
        mg: &MoveGenerator,
        history: &HistoryTables,
        ply: usize,
        prev_move: Move,
    ) {
        let mut candidates = vec![history.counter_move(prev_move)];
        candidates.extend(history.killers(ply));
        if ply >= 2 {
            candidates.extend(history.killers(ply - 2));
        }

        let mut list = MoveList::new();
        mg.generate(pos, &mut list, MoveType::All);

        let mut seen = Vec::new();
        for short in candidates {
            if short.is_none() || seen.contains(&short) {
                continue;
            }
            seen.push(short);
            if let Some(mv) = list.iter().find(|m| short.matches(m) && !m.is_capture()) {
                if !mg.is_pseudo_legal(pos, mv) {
                    continue;
                }
                self.killer_queue.push(mv);
            }
        }
    }

    fn generate_quiets(&mut self, pos: &Position, mg: &MoveGenerator, history: &HistoryTables, ply: usize) {
        let mut list = MoveList::new();
        mg.generate(pos, &mut list, MoveType::Quiet);
        for m in list.iter() {
            if m.is_promotion() {
                continue;
            }
            if self.tt_move.matches(&m) {
                continue;
            }
            if self.killer_already_queued(&m) {
                continue;
            }
            let mut score = history.quiet_history(ply, m) + threats_bonus(pos, m, ply);
            if self.null_move_threat == Some(m.from()) {
                score += NULL_MOVE_ESCAPE_BONUS;
            }
            let scored = Scored { mv: m, score };
            if score >= self.good_quiet_threshold && self.good_quiet.len() < GOOD_QUIET_CAP {
                self.good_quiet.push(scored);
            } else {
                self.bad_quiet.push(scored);
            }
        }
    }

    fn killer_already_queued(&self, m: &Move) -> bool {
        self.killer_queue.iter().any(|k| k.fingerprint() == m.fingerprint())
    }
}

fn pop_best(bucket: &mut Vec<Scored>) -> Option<Move> {
    if bucket.is_empty() {
        return None;
    }
    let (idx, _) = bucket
        .iter()
        .enumerate()
        .max_by_key(|(_, s)| s.score)
        .unwrap();
    Some(bucket.remove(idx).mv)
}

/// §4.5.1: bonuses/penalties for moves that escape or walk into attacks,
/// attack undefended enemy material, or flee a previously-found null-move
/// threat square.
fn threats_bonus(pos: &Position, m: Move, _ply: usize) -> i32 {
    let mut bonus = 0i32;
    let side = pos.us();
    let enemy = side ^ 1;
    let attacks = pos.attacks();
    let occ = pos.occupancy();
    let pawn_attacks = attacks_by_pawns(pos, enemy);

    let is_minor = matches!(m.piece(), Pieces::KNIGHT | Pieces::BISHOP);
    let is_major = matches!(m.piece(), Pieces::ROOK | Pieces::QUEEN);

    if is_minor {
        if pawn_attacks & (1u64 << m.from()) != 0 {
            bonus += ESCAPE_MINOR_BONUS;
        }
        if pawn_attacks & (1u64 << m.to()) != 0 {
            bonus -= WALK_INTO_MINOR_PENALTY;
        }
    }

    if is_major {
        let minor_attacks = attacks_by_minors(pos, enemy, occ);
        let threatening = pawn_attacks | minor_attacks;
        if threatening & (1u64 << m.from()) != 0 {
            bonus += ESCAPE_MAJOR_BONUS;
        }
        if threatening & (1u64 << m.to()) != 0 {
            bonus -= WALK_INTO_MAJOR_PENALTY;
        }
    }

    let reach = piece_reach(attacks, m.piece(), m.to(), occ);
    let enemy_occupancy = pos.side_occupancy(enemy);
    if reach & enemy_occupancy != 0 {
        let attacked_king = pos.get_pieces(Pieces::KING, enemy) & reach != 0;
        if attacked_king {
            bonus += KING_ATTACK_BONUS;
        } else {
            bonus += ATTACK_BONUS;
        }
    }

    bonus
}

fn attacks_by_pawns(pos: &Position, side: usize) -> u64 {
    let mut bb = pos.get_pieces(Pieces::PAWN, side);
    let mut out = 0u64;
    while bb != 0 {
        let sq = crate::misc::bits::next(&mut bb);
        out |= pos.attacks().pawn(side, sq);
    }
    out
}

fn attacks_by_minors(pos: &Position, side: usize, occ: u64) -> u64 {
    let attacks = pos.attacks();
    let mut out = 0u64;
    for piece in [Pieces::KNIGHT, Pieces::BISHOP] {
        let mut bb = pos.get_pieces(piece, side);
        while bb != 0 {
            let sq = crate::misc::bits::next(&mut bb);
            out |= if piece == Pieces::KNIGHT {
                attacks.knight(sq)
            } else {
                attacks.bishop(sq, occ)
            };
        }
    }
    out
}

fn piece_reach(attacks: &crate::bitboards::Attacks, piece: usize, to: Square, occ: u64) -> u64 {
    match piece {
        Pieces::KNIGHT => attacks.knight(to),
        Pieces::BISHOP => attacks.bishop(to, occ),
        Pieces::ROOK => attacks.rook(to, occ),
        Pieces::QUEEN => attacks.queen(to, occ),
        Pieces::KING => attacks.king(to),
        _ => 0,
    }
}

use crate::defs::Square;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitboards::Attacks;
    use crate::zobrist::ZobristRandoms;
    use std::sync::Arc;

    fn setup(fen: &str) -> (Position, MoveGenerator, HistoryTables) {
        let attacks = Arc::new(Attacks::new().unwrap());
        let zr = Arc::new(ZobristRandoms::new());
        let mut pos = Position::new(attacks.clone(), zr);
        pos.load_fen(fen);
        (pos, MoveGenerator::new(attacks), HistoryTables::new(crate::defs::MAX_PLY))
    }

    #[test]
    fn picker_exhausts_all_legal_moves_exactly_once() {
        let (mut pos, mg, history) = setup(crate::defs::FEN_START_POSITION);
        let mut picker = MovePicker::new(ShortMove::none(), 0);
        let mut seen = Vec::new();
        while let Some(mv) = picker.pick(&mut pos, &mg, &history, 0, Move::null()) {
            seen.push(mv.fingerprint());
        }
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), 20);
    }

    #[test]
    fn tt_move_is_emitted_first() {
        let (mut pos, mg, history) = setup(crate::defs::FEN_START_POSITION);
        let tt_move = ShortMove::new(12, 28, Pieces::NONE); // e2e4
        let mut picker = MovePicker::new(tt_move, 0);
        let first = picker.pick(&mut pos, &mg, &history, 0, Move::null()).unwrap();
        assert_eq!(first.fingerprint(), tt_move.0);
    }
}
