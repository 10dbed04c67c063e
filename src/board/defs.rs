/* =======================================================================
Talon is a chess playing engine. See src/defs.rs for license notice.
======================================================================= */

//! Board-local type definitions: castling flags, the per-ply [`GameState`]
//! snapshot, and the [`Unmake`] record that lets `Position::unmake` reverse
//! `Position::make` in O(1).

pub use crate::zobrist::ZobristKey;
use crate::defs::Piece;

pub struct Castling;
impl Castling {
    pub const WK: u8 = 0b0001;
    pub const WQ: u8 = 0b0010;
    pub const BK: u8 = 0b0100;
    pub const BQ: u8 = 0b1000;
    pub const ALL: u8 = 0b1111;
}

/// Everything about a position that is cheap to copy and needs to be
/// restored verbatim on `unmake`: hashes, rights, clocks, side to move.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GameState {
    pub active_color: u8,
    pub castling: u8,
    pub en_passant: Option<u8>,
    pub halfmove_clock: u8,
    pub fullmove_number: u16,
    pub zobrist_key: ZobristKey,
    pub pawn_hash: u64,
    pub minor_hash: u64,
    pub major_hash: u64,
    pub material_hash: u64,
    /// Set true for a null-move child position; forbids recursive NMP.
    pub null_move_flag: bool,
}

impl GameState {
    pub fn new() -> Self {
        Self {
            active_color: 0,
            castling: 0,
            en_passant: None,
            halfmove_clock: 0,
            fullmove_number: 1,
            zobrist_key: 0,
            pawn_hash: 0,
            minor_hash: 0,
            major_hash: 0,
            material_hash: 0,
            null_move_flag: false,
        }
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

/// Data required to reverse `Position::make` / `Position::make_null` in O(1).
#[derive(Copy, Clone, Debug)]
pub struct Unmake {
    pub captured_piece: Piece,
    pub prior_state: GameState,
    /// True when the move was an en-passant capture (the captured pawn is
    /// not on the `to` square).
    pub en_passant_consumed: bool,
}
