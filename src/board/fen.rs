/* =======================================================================
Talon is a chess playing engine. See src/defs.rs for license notice.
======================================================================= */

//! FEN reading and writing. `load_fen` is tolerant: unrecognized tokens are
//! skipped and the caller gets the best partial parse rather than an error.

use super::Position;
use crate::defs::{file_of, rank_of, Piece, Pieces, Side, Sides, Square};
use crate::board::defs::Castling;

const SPLITTER: char = '/';

fn piece_from_char(c: char) -> Option<(Side, Piece)> {
    let side = if c.is_ascii_uppercase() { Sides::WHITE } else { Sides::BLACK };
    let piece = match c.to_ascii_lowercase() {
        'k' => Pieces::KING,
        'q' => Pieces::QUEEN,
        'r' => Pieces::ROOK,
        'b' => Pieces::BISHOP,
        'n' => Pieces::KNIGHT,
        'p' => Pieces::PAWN,
        _ => return None,
    };
    Some((side, piece))
}

fn char_from_piece(side: Side, piece: Piece) -> char {
    let c = match piece {
        Pieces::KING => 'k',
        Pieces::QUEEN => 'q',
        Pieces::ROOK => 'r',
        Pieces::BISHOP => 'b',
        Pieces::KNIGHT => 'n',
        Pieces::PAWN => 'p',
        _ => '?',
    };
    if side == Sides::WHITE {
        c.to_ascii_uppercase()
    } else {
        c
    }
}

fn square_from_algebraic(s: &str) -> Option<Square> {
    let mut chars = s.chars();
    let file = chars.next()?;
    let rank = chars.next()?;
    if !('a'..='h').contains(&file) || !('1'..='8').contains(&rank) {
        return None;
    }
    let file = file as usize - 'a' as usize;
    let rank = rank as usize - '1' as usize;
    Some(rank * 8 + file)
}

fn algebraic_from_square(sq: Square) -> String {
    let file = (b'a' + file_of(sq) as u8) as char;
    let rank = (b'1' + rank_of(sq) as u8) as char;
    format!("{file}{rank}")
}

impl Position {
    /// Parses a FEN string, skipping any field the engine doesn't
    /// recognize and falling back to defaults for the rest.
    pub fn load_fen(&mut self, fen: &str) {
        self.reset();

        let mut parts = fen.split_whitespace();

        if let Some(board_part) = parts.next() {
            self.parse_piece_placement(board_part);
        }

        match parts.next() {
            Some("w") => self.state.active_color = Sides::WHITE as u8,
            Some("b") => self.state.active_color = Sides::BLACK as u8,
            _ => self.state.active_color = Sides::WHITE as u8,
        }

        if let Some(castling_part) = parts.next() {
            self.state.castling = parse_castling(castling_part);
        }

        if let Some(ep_part) = parts.next() {
            self.state.en_passant = square_from_algebraic(ep_part).map(|sq| sq as u8);
        }

        if let Some(half) = parts.next() {
            self.state.halfmove_clock = half.parse().unwrap_or(0);
        }

        if let Some(full) = parts.next() {
            self.state.fullmove_number = full.parse().unwrap_or(1);
        }

        self.init_derived_state();
    }

    fn parse_piece_placement(&mut self, board_part: &str) {
        let mut rank = 7usize;

        for row in board_part.split(SPLITTER) {
            if rank > 7 {
                break;
            }
            let mut file = 0usize;
            for c in row.chars() {
                if file > 7 {
                    break;
                }
                if let Some(skip) = c.to_digit(10) {
                    file += skip as usize;
                    continue;
                }
                if let Some((side, piece)) = piece_from_char(c) {
                    let sq = rank * 8 + file;
                    self.put_piece(side, piece, sq);
                }
                file += 1;
            }
            if rank == 0 {
                break;
            }
            rank -= 1;
        }
    }

    /// Writes the canonical FEN for the current position.
    pub fn generate_fen(&self) -> String {
        let mut board = String::new();
        for rank in (0..8).rev() {
            let mut empty_run = 0;
            for file in 0..8 {
                let sq = rank * 8 + file;
                let piece = self.piece_list[sq];
                if piece == Pieces::NONE {
                    empty_run += 1;
                    continue;
                }
                if empty_run > 0 {
                    board.push_str(&empty_run.to_string());
                    empty_run = 0;
                }
                let side = if self.bb_pieces[Sides::WHITE][piece] & (1u64 << sq) != 0 {
                    Sides::WHITE
                } else {
                    Sides::BLACK
                };
                board.push(char_from_piece(side, piece));
            }
            if empty_run > 0 {
                board.push_str(&empty_run.to_string());
            }
            if rank > 0 {
                board.push(SPLITTER);
            }
        }

        let side = if self.state.active_color == Sides::WHITE as u8 { "w" } else { "b" };

        let mut castling = String::new();
        if self.state.castling & Castling::WK != 0 {
            castling.push('K');
        }
        if self.state.castling & Castling::WQ != 0 {
            castling.push('Q');
        }
        if self.state.castling & Castling::BK != 0 {
            castling.push('k');
        }
        if self.state.castling & Castling::BQ != 0 {
            castling.push('q');
        }
        if castling.is_empty() {
            castling.push('-');
        }

        let ep = match self.state.en_passant {
            Some(sq) => algebraic_from_square(sq as Square),
            None => "-".to_string(),
        };

        format!(
            "{board} {side} {castling} {ep} {} {}",
            self.state.halfmove_clock, self.state.fullmove_number
        )
    }
}

fn parse_castling(part: &str) -> u8 {
    if part == "-" {
        return 0;
    }
    let mut rights = 0u8;
    for c in part.chars() {
        match c {
            'K' => rights |= Castling::WK,
            'Q' => rights |= Castling::WQ,
            'k' => rights |= Castling::BK,
            'q' => rights |= Castling::BQ,
            _ => {}
        }
    }
    rights
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitboards::Attacks;
    use crate::defs::FEN_START_POSITION;
    use crate::zobrist::ZobristRandoms;
    use std::sync::Arc;

    fn fresh() -> Position {
        Position::new(Arc::new(Attacks::new().unwrap()), Arc::new(ZobristRandoms::new()))
    }

    #[test]
    fn round_trips_start_position() {
        let mut pos = fresh();
        pos.load_fen(FEN_START_POSITION);
        assert_eq!(pos.generate_fen(), FEN_START_POSITION);
    }

    #[test]
    fn round_trips_kiwipete() {
        let mut pos = fresh();
        pos.load_fen(crate::defs::FEN_KIWIPETE_POSITION);
        assert_eq!(pos.generate_fen(), crate::defs::FEN_KIWIPETE_POSITION);
    }

    #[test]
    fn tolerates_garbage_fields() {
        let mut pos = fresh();
        pos.load_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - garbage garbage");
        assert_eq!(pos.state.halfmove_clock, 0);
        assert_eq!(pos.state.fullmove_number, 1);
    }
}
