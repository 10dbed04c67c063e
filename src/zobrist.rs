/* =======================================================================
Talon is a chess playing engine. See src/defs.rs for license notice.
======================================================================= */

//! Zobrist hashing: the main position hash plus the three disjoint
//! structure-hash bands (pawn, minor, major) used to index the
//! correction-history tables, and a material hash.

use crate::defs::{NrOf, Piece, Side, Sides, Square};
use rand::{rngs::StdRng, Rng, SeedableRng};

pub type ZobristKey = u64;

/// Deterministic seed: tables are identical across runs/platforms.
const ZOBRIST_SEED: u64 = 0x5DEECE66D_u64;

pub struct ZobristRandoms {
    piece: [[[u64; NrOf::SQUARES]; NrOf::PIECE_TYPES]; Sides::BOTH],
    castling: [u64; 16],
    en_passant: [u64; 9], // 8 files + "none"
    side: u64,
    /// One random value per (piece kind, count 0..=10), used for the
    /// material-only hash; independent of square.
    material: [[u64; 11]; NrOf::PIECE_TYPES],
}

impl ZobristRandoms {
    pub fn new() -> Self {
        let mut rng = StdRng::seed_from_u64(ZOBRIST_SEED);
        let mut piece = [[[0u64; NrOf::SQUARES]; NrOf::PIECE_TYPES]; Sides::BOTH];
        for s in piece.iter_mut() {
            for p in s.iter_mut() {
                for v in p.iter_mut() {
                    *v = rng.gen();
                }
            }
        }
        let mut castling = [0u64; 16];
        castling.iter_mut().for_each(|v| *v = rng.gen());
        let mut en_passant = [0u64; 9];
        en_passant.iter_mut().for_each(|v| *v = rng.gen());
        let mut material = [[0u64; 11]; NrOf::PIECE_TYPES];
        for p in material.iter_mut() {
            for v in p.iter_mut() {
                *v = rng.gen();
            }
        }

        Self {
            piece,
            castling,
            en_passant,
            side: rng.gen(),
            material,
        }
    }

    #[inline]
    pub fn piece(&self, side: Side, piece: Piece, square: Square) -> u64 {
        self.piece[side][piece][square]
    }

    #[inline]
    pub fn castling(&self, rights: u8) -> u64 {
        self.castling[rights as usize & 0xF]
    }

    #[inline]
    pub fn en_passant(&self, square: Option<u8>) -> u64 {
        match square {
            Some(sq) => self.en_passant[sq as usize % 8],
            None => self.en_passant[8],
        }
    }

    #[inline]
    pub fn side(&self, side: Side) -> u64 {
        if side == Sides::WHITE {
            0
        } else {
            self.side
        }
    }

    #[inline]
    pub fn material(&self, piece: Piece, count: usize) -> u64 {
        self.material[piece][count.min(10)]
    }
}

impl Default for ZobristRandoms {
    fn default() -> Self {
        Self::new()
    }
}
