/* =======================================================================
Talon is a chess playing engine. See src/defs.rs for license notice.
======================================================================= */

//! Static exchange evaluation: the minimax value of the capture sequence
//! on one square, used both for capture ordering and as a pruning
//! threshold (SEE-pruning, probcut).

use crate::board::Position;
use crate::defs::{Pieces, Square, PIECE_VALUES};
use crate::misc::bits;
use crate::movegen::defs::Move;
use crate::movegen::MoveGenerator;

/// Smallest-attacker-first exchange value on `m.to()`. En-passant captures
/// always return 0 (not modeled, per the captured pawn being off-square).
pub fn see(mg: &MoveGenerator, pos: &Position, m: Move) -> i32 {
    if m.is_en_passant() {
        return 0;
    }

    let target = m.to();
    let mut occ = pos.occupancy();
    let mut side = pos.opponent();
    let mut gain = [0i32; 32];
    let mut depth = 0usize;

    gain[0] = PIECE_VALUES[m.captured()];
    let mut attacker_value = PIECE_VALUES[m.piece()];
    occ &= !(1u64 << m.from());

    loop {
        depth += 1;
        gain[depth] = attacker_value - gain[depth - 1];
        if gain[depth].max(-gain[depth - 1]) < 0 {
            break;
        }

        match least_valuable_attacker(mg, pos, target, side, occ) {
            Some((from, piece)) => {
                occ &= !(1u64 << from);
                attacker_value = PIECE_VALUES[piece];
                side ^= 1;
            }
            None => break,
        }
    }

    while depth > 1 {
        depth -= 1;
        gain[depth - 1] = -gain[depth].max(-gain[depth - 1]);
    }

    gain[0]
}

fn least_valuable_attacker(
    _mg: &MoveGenerator,
    pos: &Position,
    target: Square,
    side: usize,
    occ: u64,
) -> Option<(Square, usize)> {
    for piece in [
        Pieces::PAWN,
        Pieces::KNIGHT,
        Pieces::BISHOP,
        Pieces::ROOK,
        Pieces::QUEEN,
        Pieces::KING,
    ] {
        let mut attackers = attackers_of_piece(pos, target, side, piece, occ) & occ;
        if attackers != 0 {
            let from = bits::next(&mut attackers);
            return Some((from, piece));
        }
    }
    None
}

fn attackers_of_piece(pos: &Position, target: Square, side: usize, piece: usize, occ: u64) -> u64 {
    let candidates = pos.get_pieces(piece, side);
    if candidates == 0 {
        return 0;
    }
    let attacks = pos.attacks();
    let reaches = match piece {
        Pieces::PAWN => attacks.pawn(side ^ 1, target),
        Pieces::KNIGHT => attacks.knight(target),
        Pieces::KING => attacks.king(target),
        Pieces::BISHOP => attacks.bishop(target, occ),
        Pieces::ROOK => attacks.rook(target, occ),
        Pieces::QUEEN => attacks.queen(target, occ),
        _ => 0,
    };
    reaches & candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitboards::Attacks;
    use crate::zobrist::ZobristRandoms;
    use std::sync::Arc;

    fn setup(fen: &str) -> (Position, MoveGenerator) {
        let attacks = Arc::new(Attacks::new().unwrap());
        let zr = Arc::new(ZobristRandoms::new());
        let mut pos = Position::new(attacks.clone(), zr);
        pos.load_fen(fen);
        (pos, MoveGenerator::new(attacks))
    }

    #[test]
    fn pawn_takes_undefended_knight_wins_material() {
        let (pos, mg) = setup("4k3/8/8/3n4/4P3/8/8/4K3 w - - 0 1");
        let m = Move::new(28, 35, Pieces::PAWN, Pieces::KNIGHT, Pieces::NONE, false);
        assert_eq!(see(&mg, &pos, m), PIECE_VALUES[Pieces::KNIGHT]);
    }

    #[test]
    fn losing_capture_is_negative() {
        let (pos, mg) = setup("4k3/8/2p1p3/3n4/4Q3/8/8/4K3 w - - 0 1");
        let m = Move::new(28, 35, Pieces::QUEEN, Pieces::KNIGHT, Pieces::NONE, false);
        let score = see(&mg, &pos, m);
        assert!(score < 0, "expected losing exchange, got {score}");
    }
}
