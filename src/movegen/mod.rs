/* =======================================================================
Talon is a chess playing engine. See src/defs.rs for license notice.
======================================================================= */

//! Pseudo-legal move generation. Four entry points cover the move picker's
//! needs: all moves, captures+promotions, quiet moves (including
//! castling), and quiet checks (including discovered-check candidates via
//! the bitboard x-ray tables). [`MoveGenerator::is_pseudo_legal`] validates
//! a single candidate move without generating the full list, used to
//! sanity-check TT and killer moves before trying them.

pub mod defs;

use crate::bitboards::Attacks;
use crate::board::defs::Castling;
use crate::board::Position;
use crate::defs::{Piece, Pieces, Side, Sides, Square};
use crate::misc::bits;
use defs::{Move, MoveList, MoveType};
use std::sync::Arc;

pub struct MoveGenerator {
    attacks: Arc<Attacks>,
}

const PROMOTION_PIECES: [Piece; 4] = [Pieces::QUEEN, Pieces::ROOK, Pieces::BISHOP, Pieces::KNIGHT];

impl MoveGenerator {
    pub fn new(attacks: Arc<Attacks>) -> Self {
        Self { attacks }
    }

    pub fn generate(&self, pos: &Position, list: &mut MoveList, move_type: MoveType) {
        match move_type {
            MoveType::All => {
                self.generate_captures(pos, list);
                self.generate_quiet(pos, list);
            }
            MoveType::Captures => self.generate_captures(pos, list),
            MoveType::Quiet => self.generate_quiet(pos, list),
            MoveType::QuietChecks => self.generate_quiet_checks(pos, list),
        }
    }

    fn generate_captures(&self, pos: &Position, list: &mut MoveList) {
        let side = pos.us();
        let opp = pos.opponent();
        let occ = pos.occupancy();
        let enemy = pos.bb_side[opp];

        self.generate_pawn_moves(pos, list, side, true);

        for piece in [Pieces::KNIGHT, Pieces::BISHOP, Pieces::ROOK, Pieces::QUEEN, Pieces::KING] {
            let mut bb = pos.bb_pieces[side][piece];
            while bb != 0 {
                let from = bits::next(&mut bb);
                let attacks = self.piece_attacks(piece, from, occ) & enemy;
                self.push_targets(list, from, piece, attacks, pos, true);
            }
        }

        if let Some(ep) = pos.state.en_passant {
            let ep = ep as Square;
            let mut attackers = self.attacks.pawn(opp, ep) & pos.bb_pieces[side][Pieces::PAWN];
            while attackers != 0 {
                let from = bits::next(&mut attackers);
                list.push(Move::new(from, ep, Pieces::PAWN, Pieces::PAWN, Pieces::NONE, true));
            }
        }
    }

    fn generate_quiet(&self, pos: &Position, list: &mut MoveList) {
        let side = pos.us();
        let occ = pos.occupancy();
        let empty = !occ;

        self.generate_pawn_moves(pos, list, side, false);

        for piece in [Pieces::KNIGHT, Pieces::BISHOP, Pieces::ROOK, Pieces::QUEEN, Pieces::KING] {
            let mut bb = pos.bb_pieces[side][piece];
            while bb != 0 {
                let from = bits::next(&mut bb);
                let attacks = self.piece_attacks(piece, from, occ) & empty;
                self.push_targets(list, from, piece, attacks, pos, false);
            }
        }

        self.generate_castling(pos, list);
    }

    /// Non-capture moves that give check, including moves whose own target
    /// square doesn't attack the king but unmask a slider behind it.
    fn generate_quiet_checks(&self, pos: &Position, list: &mut MoveList) {
        let mut quiet = MoveList::new();
        self.generate_quiet(pos, &mut quiet);
        let opp_king = pos.king_square(pos.opponent());

        for m in quiet.iter() {
            if self.gives_direct_check(pos, m, opp_king) || self.gives_discovered_check(pos, m, opp_king) {
                list.push(m);
            }
        }
    }

    fn gives_direct_check(&self, pos: &Position, m: Move, opp_king: Square) -> bool {
        let occ_after = (pos.occupancy() & !(1u64 << m.from())) | (1u64 << m.to());
        let piece = if m.is_promotion() { m.promotion() } else { m.piece() };
        if piece == Pieces::KING {
            return false;
        }
        self.piece_attacks(piece, m.to(), occ_after) & (1u64 << opp_king) != 0
    }

    fn gives_discovered_check(&self, pos: &Position, m: Move, opp_king: Square) -> bool {
        let side = pos.us();
        let sliders = (pos.bb_pieces[side][Pieces::ROOK] | pos.bb_pieces[side][Pieces::QUEEN])
            & self.attacks.rook_xray(opp_king, pos.occupancy())
            | (pos.bb_pieces[side][Pieces::BISHOP] | pos.bb_pieces[side][Pieces::QUEEN])
                & self.attacks.bishop_xray(opp_king, pos.occupancy());
        let mut candidates = sliders;
        while candidates != 0 {
            let from = bits::next(&mut candidates);
            if from == m.from() {
                continue;
            }
            let occ_after = (pos.occupancy() & !(1u64 << m.from())) | (1u64 << m.to());
            let piece = pos.piece_on(from);
            let blocks = match piece {
                Pieces::ROOK => self.attacks.rook(from, occ_after),
                Pieces::BISHOP => self.attacks.bishop(from, occ_after),
                Pieces::QUEEN => self.attacks.queen(from, occ_after),
                _ => 0,
            };
            if blocks & (1u64 << opp_king) != 0 {
                return true;
            }
        }
        false
    }

    fn piece_attacks(&self, piece: Piece, from: Square, occ: u64) -> u64 {
        match piece {
            Pieces::KNIGHT => self.attacks.knight(from),
            Pieces::KING => self.attacks.king(from),
            Pieces::BISHOP => self.attacks.bishop(from, occ),
            Pieces::ROOK => self.attacks.rook(from, occ),
            Pieces::QUEEN => self.attacks.queen(from, occ),
            _ => 0,
        }
    }

    fn push_targets(&self, list: &mut MoveList, from: Square, piece: Piece, mut targets: u64, pos: &Position, capture: bool) {
        while targets != 0 {
            let to = bits::next(&mut targets);
            let captured = if capture { pos.piece_on(to) } else { Pieces::NONE };
            list.push(Move::new(from, to, piece, captured, Pieces::NONE, false));
        }
    }

    fn generate_pawn_moves(&self, pos: &Position, list: &mut MoveList, side: Side, captures: bool) {
        let occ = pos.occupancy();
        let opp = side ^ 1;
        let mut pawns = pos.bb_pieces[side][Pieces::PAWN];
        let promotion_rank: u64 = if side == Sides::WHITE { 0xFF00000000000000 } else { 0xFF };

        while pawns != 0 {
            let from = bits::next(&mut pawns);

            if captures {
                let mut atk = self.attacks.pawn(side, from) & pos.bb_side[opp];
                while atk != 0 {
                    let to = bits::next(&mut atk);
                    self.push_pawn_move(list, from, to, pos.piece_on(to), promotion_rank);
                }
            } else {
                let single = self.attacks.pawn_single_push(side, from) & !occ;
                if single != 0 {
                    let to = single.trailing_zeros() as Square;
                    self.push_pawn_move(list, from, to, Pieces::NONE, promotion_rank);

                    let start_rank_ok = if side == Sides::WHITE { from / 8 == 1 } else { from / 8 == 6 };
                    if start_rank_ok {
                        let two_step = if side == Sides::WHITE { from + 16 } else { from - 16 };
                        if occ & (1u64 << two_step) == 0 {
                            list.push(Move::new(from, two_step, Pieces::PAWN, Pieces::NONE, Pieces::NONE, false));
                        }
                    }
                }
            }
        }
    }

    fn push_pawn_move(&self, list: &mut MoveList, from: Square, to: Square, captured: Piece, promotion_rank: u64) {
        if (1u64 << to) & promotion_rank != 0 {
            for &promo in &PROMOTION_PIECES {
                list.push(Move::new(from, to, Pieces::PAWN, captured, promo, false));
            }
        } else {
            list.push(Move::new(from, to, Pieces::PAWN, captured, Pieces::NONE, false));
        }
    }

    fn generate_castling(&self, pos: &Position, list: &mut MoveList) {
        let side = pos.us();
        let occ = pos.occupancy();
        let opp = pos.opponent();

        if pos.in_check(side) {
            return;
        }

        let (kingside, queenside, king_from, rook_king_to, rook_queen_to) = if side == Sides::WHITE {
            (Castling::WK, Castling::WQ, 4usize, (5usize, 6usize), (3usize, 2usize))
        } else {
            (Castling::BK, Castling::BQ, 60usize, (61usize, 62usize), (59usize, 58usize))
        };

        if pos.state.castling & kingside != 0 {
            let (transit, dest) = rook_king_to;
            let path_clear = occ & ((1u64 << transit) | (1u64 << dest)) == 0;
            if path_clear && !pos.square_attacked_by(transit, opp) && !pos.square_attacked_by(dest, opp) {
                list.push(Move::new(king_from, dest, Pieces::KING, Pieces::NONE, Pieces::NONE, false));
            }
        }
        if pos.state.castling & queenside != 0 {
            let (transit, dest) = rook_queen_to;
            let b_file = if side == Sides::WHITE { 1usize } else { 57usize };
            let path_clear = occ & ((1u64 << transit) | (1u64 << dest) | (1u64 << b_file)) == 0;
            if path_clear && !pos.square_attacked_by(transit, opp) && !pos.square_attacked_by(dest, opp) {
                list.push(Move::new(king_from, dest, Pieces::KING, Pieces::NONE, Pieces::NONE, false));
            }
        }
    }

    /// Validates that `m` is a pseudo-legal move in `pos` without
    /// generating the full move list. Used by the move picker to sanity
    /// check TT and killer moves before trying them.
    pub fn is_pseudo_legal(&self, pos: &Position, m: Move) -> bool {
        if m.is_null() {
            return false;
        }
        let side = pos.us();
        if pos.side_on(m.from()) != Some(side) {
            return false;
        }
        if pos.piece_on(m.from()) != m.piece() {
            return false;
        }
        if let Some(dest_side) = pos.side_on(m.to()) {
            if dest_side == side {
                return false;
            }
        }

        let mut list = MoveList::new();
        self.generate(pos, &mut list, MoveType::All);
        let found = list.iter().any(|candidate| candidate.fingerprint() == m.fingerprint() && candidate.piece() == m.piece());
        found
    }

    /// Filters `list`'s pseudo-legal moves down to legal ones in place,
    /// returning the legal moves as a fresh list.
    pub fn legal_moves(&self, pos: &mut Position, move_type: MoveType) -> MoveList {
        let mut pseudo = MoveList::new();
        self.generate(pos, &mut pseudo, move_type);
        let mut legal = MoveList::new();
        let side = pos.us();
        for m in pseudo.iter() {
            if !pos.causes_check(m, side) {
                legal.push(m);
            }
        }
        legal
    }

    pub fn perft(&self, pos: &mut Position, depth: u8) -> u64 {
        if depth == 0 {
            return 1;
        }
        let moves = self.legal_moves(pos, MoveType::All);
        if depth == 1 {
            return moves.len() as u64;
        }
        let mut nodes = 0;
        for m in moves.iter() {
            let undo = pos.make(m);
            nodes += self.perft(pos, depth - 1);
            pos.unmake(m, undo);
        }
        nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::{FEN_KIWIPETE_POSITION, FEN_START_POSITION};
    use crate::zobrist::ZobristRandoms;

    fn setup(fen: &str) -> (Position, MoveGenerator) {
        let attacks = Arc::new(Attacks::new().unwrap());
        let zr = Arc::new(ZobristRandoms::new());
        let mut pos = Position::new(attacks.clone(), zr);
        pos.load_fen(fen);
        (pos, MoveGenerator::new(attacks))
    }

    #[test]
    fn start_position_has_twenty_legal_moves() {
        let (mut pos, mg) = setup(FEN_START_POSITION);
        let moves = mg.legal_moves(&mut pos, MoveType::All);
        assert_eq!(moves.len(), 20);
    }

    #[test]
    fn perft_start_position_depth_3() {
        let (mut pos, mg) = setup(FEN_START_POSITION);
        assert_eq!(mg.perft(&mut pos, 3), 8902);
    }

    #[test]
    fn perft_kiwipete_depth_2() {
        let (mut pos, mg) = setup(FEN_KIWIPETE_POSITION);
        assert_eq!(mg.perft(&mut pos, 2), 2039);
    }

    #[test]
    fn perft_start_position_depth_4() {
        let (mut pos, mg) = setup(FEN_START_POSITION);
        assert_eq!(mg.perft(&mut pos, 4), 197_281);
    }

    #[test]
    fn perft_kiwipete_depth_3() {
        let (mut pos, mg) = setup(FEN_KIWIPETE_POSITION);
        assert_eq!(mg.perft(&mut pos, 3), 97_862);
    }

    #[test]
    #[ignore = "several seconds; run with --ignored"]
    fn perft_start_position_depth_6() {
        let (mut pos, mg) = setup(FEN_START_POSITION);
        assert_eq!(mg.perft(&mut pos, 6), 119_060_324);
    }

    #[test]
    #[ignore = "several seconds; run with --ignored"]
    fn perft_kiwipete_depth_5() {
        let (mut pos, mg) = setup(FEN_KIWIPETE_POSITION);
        assert_eq!(mg.perft(&mut pos, 5), 193_690_690);
    }

    #[test]
    fn pseudo_legal_rejects_foreign_piece_move() {
        let (pos, mg) = setup(FEN_START_POSITION);
        let bogus = Move::new(52, 36, Pieces::PAWN, Pieces::NONE, Pieces::NONE, false);
        assert!(!mg.is_pseudo_legal(&pos, bogus));
    }
}
