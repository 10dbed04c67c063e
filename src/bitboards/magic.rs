/* =======================================================================
Talon is a chess playing engine. See src/defs.rs for license notice.
======================================================================= */

//! Magic-bitboard table construction for rook and bishop sliding attacks.
//!
//! Each square gets a relevant-occupancy mask, an offset into a shared
//! attack table, and a magic multiplier + shift chosen by rejection
//! sampling so that `(occupancy & mask).wrapping_mul(magic) >> shift`
//! never collides across the square's occupancy subsets.

use crate::defs::{Bitboard, Square};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Failure mode for one-time engine initialization: attack-table
/// construction, or weight-file decode.
#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error("magic number search exceeded the attempt cap for square {square}")]
    MagicSearchFailed { square: Square },
    #[error("embedded weight file is corrupt: {0}")]
    WeightFileCorrupt(String),
}

/// Soft cap on rejection-sampling attempts per square before giving up.
const MAX_MAGIC_ATTEMPTS: usize = 20_000_000;

/// Deterministic seed so table construction is reproducible across runs
/// and platforms (spec: do not rely on static-initializer ordering beyond
/// "before first search").
const MAGIC_SEED: u64 = 0x9E3779B97F4A7C15;

pub struct MagicEntry {
    pub mask: Bitboard,
    pub magic: u64,
    pub shift: u32,
    pub offset: usize,
}

/// A fully constructed slider attack table for one piece type (rook or bishop).
pub struct SliderTable {
    pub entries: [MagicEntry; 64],
    pub attacks: Vec<Bitboard>,
    /// X-ray variant: attacks that pass through the first blocker. Shares
    /// the same index scheme as `attacks`.
    pub xray: Vec<Bitboard>,
}

fn rook_mask(sq: Square) -> Bitboard {
    let (f, r) = (sq as i32 % 8, sq as i32 / 8);
    let mut mask = 0u64;
    for nf in (f + 1)..7 {
        mask |= 1u64 << (r * 8 + nf);
    }
    for nf in 1..f {
        mask |= 1u64 << (r * 8 + nf);
    }
    for nr in (r + 1)..7 {
        mask |= 1u64 << (nr * 8 + f);
    }
    for nr in 1..r {
        mask |= 1u64 << (nr * 8 + f);
    }
    mask
}

fn bishop_mask(sq: Square) -> Bitboard {
    let (f, r) = (sq as i32 % 8, sq as i32 / 8);
    let mut mask = 0u64;
    for (df, dr) in [(1, 1), (1, -1), (-1, 1), (-1, -1)] {
        let (mut nf, mut nr) = (f + df, r + dr);
        while (1..7).contains(&nf) && (1..7).contains(&nr) {
            mask |= 1u64 << (nr * 8 + nf);
            nf += df;
            nr += dr;
        }
    }
    mask
}

fn rook_attacks_slow(sq: Square, occ: Bitboard) -> Bitboard {
    slide(sq, occ, &[(1, 0), (-1, 0), (0, 1), (0, -1)])
}

fn bishop_attacks_slow(sq: Square, occ: Bitboard) -> Bitboard {
    slide(sq, occ, &[(1, 1), (1, -1), (-1, 1), (-1, -1)])
}

fn slide(sq: Square, occ: Bitboard, dirs: &[(i32, i32)]) -> Bitboard {
    let (f0, r0) = (sq as i32 % 8, sq as i32 / 8);
    let mut attacks = 0u64;
    for &(df, dr) in dirs {
        let (mut f, mut r) = (f0 + df, r0 + dr);
        while (0..8).contains(&f) && (0..8).contains(&r) {
            let s = (r * 8 + f) as Square;
            attacks |= 1u64 << s;
            if occ & (1u64 << s) != 0 {
                break;
            }
            f += df;
            r += dr;
        }
    }
    attacks
}

/// First-blocker x-ray attack: the attack set of the slider as if the
/// first blocker were transparent (used to find discovered-check
/// candidates behind a piece that is about to move).
fn xray_attacks(sq: Square, occ: Bitboard, attacks_fn: impl Fn(Square, Bitboard) -> Bitboard) -> Bitboard {
    let blockers = attacks_fn(sq, occ) & occ;
    let mut xray = attacks_fn(sq, occ);
    let mut b = blockers;
    while b != 0 {
        let blocker_sq = b.trailing_zeros() as Square;
        b &= b - 1;
        xray |= attacks_fn(sq, occ ^ (1u64 << blocker_sq));
    }
    xray
}

fn subsets(mask: Bitboard) -> Vec<Bitboard> {
    // Carry-Rippler enumeration of every occupancy subset of `mask`.
    let mut subsets = Vec::with_capacity(1 << mask.count_ones());
    let mut subset: Bitboard = 0;
    loop {
        subsets.push(subset);
        subset = subset.wrapping_sub(mask) & mask;
        if subset == 0 {
            break;
        }
    }
    subsets
}

fn build_table(
    is_rook: bool,
    attacks_fn: impl Fn(Square, Bitboard) -> Bitboard,
) -> Result<SliderTable, InitError> {
    let mut rng = StdRng::seed_from_u64(MAGIC_SEED ^ (is_rook as u64));
    let mut attacks = Vec::new();
    let mut xray = Vec::new();
    let mut entries: Vec<MagicEntry> = Vec::with_capacity(64);

    for sq in 0..64 {
        let mask = if is_rook { rook_mask(sq) } else { bishop_mask(sq) };
        let bits = mask.count_ones();
        let shift = 64 - bits;
        let occs = subsets(mask);
        let table_attacks: Vec<Bitboard> = occs.iter().map(|&o| attacks_fn(sq, o)).collect();
        let table_xray: Vec<Bitboard> = occs.iter().map(|&o| xray_attacks(sq, o, &attacks_fn)).collect();

        let size = 1usize << bits;
        let mut table = vec![0u64; size];
        let mut table_x = vec![0u64; size];
        let mut found = None;

        'search: for _ in 0..MAX_MAGIC_ATTEMPTS {
            let magic: u64 = rng.gen::<u64>() & rng.gen::<u64>() & rng.gen::<u64>();
            table.iter_mut().for_each(|e| *e = u64::MAX);
            let mut ok = true;
            for (i, &occ) in occs.iter().enumerate() {
                let idx = ((occ.wrapping_mul(magic)) >> shift) as usize;
                if table[idx] == u64::MAX {
                    table[idx] = table_attacks[i];
                    table_x[idx] = table_xray[i];
                } else if table[idx] != table_attacks[i] {
                    ok = false;
                    break;
                }
            }
            if ok {
                found = Some(magic);
                break 'search;
            }
        }

        let magic = found.ok_or(InitError::MagicSearchFailed { square: sq })?;
        let offset = attacks.len();
        for v in table.iter_mut() {
            if *v == u64::MAX {
                *v = 0;
            }
        }
        attacks.extend_from_slice(&table);
        xray.extend_from_slice(&table_x);
        entries.push(MagicEntry { mask, magic, shift, offset });
    }

    let entries: [MagicEntry; 64] = entries
        .try_into()
        .unwrap_or_else(|_| unreachable!("exactly 64 squares were pushed"));

    Ok(SliderTable { entries, attacks, xray })
}

pub fn build_rook_table() -> Result<SliderTable, InitError> {
    build_table(true, rook_attacks_slow)
}

pub fn build_bishop_table() -> Result<SliderTable, InitError> {
    build_table(false, bishop_attacks_slow)
}

impl SliderTable {
    #[inline]
    pub fn attacks(&self, sq: Square, occ: Bitboard) -> Bitboard {
        let e = &self.entries[sq];
        let idx = ((occ & e.mask).wrapping_mul(e.magic) >> e.shift) as usize;
        self.attacks[e.offset + idx]
    }

    #[inline]
    pub fn xray_attacks(&self, sq: Square, occ: Bitboard) -> Bitboard {
        let e = &self.entries[sq];
        let idx = ((occ & e.mask).wrapping_mul(e.magic) >> e.shift) as usize;
        self.xray[e.offset + idx]
    }
}
