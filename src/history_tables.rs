/* =======================================================================
Talon is a chess playing engine. See src/defs.rs for license notice.
======================================================================= */

//! Per-thread move-ordering and correction-history tables. Everything here
//! is owned by a single search context; nothing is shared across threads.
//!
//! Piece-to style tables (piece-to, capture-to, continuation, counter,
//! killer) bias the move picker. The four correction-history tables learn
//! a per-structure additive fixup to the static NNUE eval.

use crate::defs::{NrOf, Piece, Sides, Square};
use crate::movegen::defs::{Move, ShortMove};

const HISTORY_MAX: i32 = 16384;
const CORRECTION_MAX: i32 = 150;
const CORRECTION_GRAIN: i32 = 512;
const KILLERS_PER_PLY: usize = 2;

/// Saturating history update: `h += bonus - h * |bonus| / HISTORY_MAX`.
fn apply_gravity(h: &mut i16, bonus: i32) {
    let bonus = bonus.clamp(-HISTORY_MAX, HISTORY_MAX);
    let current = *h as i32;
    let updated = current + bonus - current * bonus.abs() / HISTORY_MAX;
    *h = updated.clamp(-HISTORY_MAX, HISTORY_MAX) as i16;
}

/// `kind x to` history, used both as the plain piece-to table and as the
/// shape behind continuation history (indexed by a previous ply's move).
#[derive(Clone)]
pub struct PieceToTable {
    table: Vec<i16>,
}

impl PieceToTable {
    fn new() -> Self {
        Self {
            table: vec![0i16; NrOf::PIECE_TYPES * NrOf::SQUARES],
        }
    }

    fn index(piece: Piece, to: Square) -> usize {
        piece * NrOf::SQUARES + to
    }

    pub fn get(&self, piece: Piece, to: Square) -> i32 {
        self.table[Self::index(piece, to)] as i32
    }

    pub fn update(&mut self, piece: Piece, to: Square, bonus: i32) {
        apply_gravity(&mut self.table[Self::index(piece, to)], bonus);
    }
}

impl Default for PieceToTable {
    fn default() -> Self {
        Self::new()
    }
}

/// `kind x to x captured` history for captures.
#[derive(Clone)]
pub struct CaptureToTable {
    table: Vec<i16>,
}

impl CaptureToTable {
    fn new() -> Self {
        Self {
            table: vec![0i16; NrOf::PIECE_TYPES * NrOf::SQUARES * NrOf::PIECE_TYPES],
        }
    }

    fn index(piece: Piece, to: Square, captured: Piece) -> usize {
        (piece * NrOf::SQUARES + to) * NrOf::PIECE_TYPES + captured
    }

    pub fn get(&self, piece: Piece, to: Square, captured: Piece) -> i32 {
        self.table[Self::index(piece, to, captured)] as i32
    }

    pub fn update(&mut self, piece: Piece, to: Square, captured: Piece, bonus: i32) {
        apply_gravity(&mut self.table[Self::index(piece, to, captured)], bonus);
    }
}

impl Default for CaptureToTable {
    fn default() -> Self {
        Self::new()
    }
}

/// The distances back from the current ply that continuation history looks
/// at: 1, 2, 4 and 6 plies.
pub const CONTINUATION_OFFSETS: [usize; 4] = [1, 2, 4, 6];

/// Per-thread bundle of every move-ordering and correction-history table.
pub struct HistoryTables {
    pub quiet: PieceToTable,
    pub capture: CaptureToTable,
    /// One continuation table per offset in [`CONTINUATION_OFFSETS`], each
    /// indexed by the moving piece/to-square of the move made `n` plies ago.
    pub continuation: [PieceToTable; CONTINUATION_OFFSETS.len()],
    pub counter: Vec<ShortMove>,
    killers: Vec<[ShortMove; KILLERS_PER_PLY]>,
    pub correction_pawn: [[i32; Self::CORRECTION_ENTRIES]; Sides::BOTH],
    pub correction_minor: [[i32; Self::CORRECTION_ENTRIES]; Sides::BOTH],
    pub correction_major: [[i32; Self::CORRECTION_ENTRIES]; Sides::BOTH],
    pub correction_material: [[i32; Self::CORRECTION_ENTRIES]; Sides::BOTH],
}

impl HistoryTables {
    const CORRECTION_BITS: u32 = 14;
    const CORRECTION_ENTRIES: usize = 1 << Self::CORRECTION_BITS;

    pub fn new(max_ply: usize) -> Self {
        Self {
            quiet: PieceToTable::new(),
            capture: CaptureToTable::new(),
            continuation: std::array::from_fn(|_| PieceToTable::new()),
            counter: vec![ShortMove::none(); NrOf::PIECE_TYPES * NrOf::SQUARES],
            killers: vec![[ShortMove::none(); KILLERS_PER_PLY]; max_ply],
            correction_pawn: [[0; Self::CORRECTION_ENTRIES]; Sides::BOTH],
            correction_minor: [[0; Self::CORRECTION_ENTRIES]; Sides::BOTH],
            correction_major: [[0; Self::CORRECTION_ENTRIES]; Sides::BOTH],
            correction_material: [[0; Self::CORRECTION_ENTRIES]; Sides::BOTH],
        }
    }

    pub fn clear(&mut self) {
        *self = Self::new(self.killers.len());
    }

    fn correction_index(hash: u64) -> usize {
        (hash as usize) & (Self::CORRECTION_ENTRIES - 1)
    }

    pub fn killers(&self, ply: usize) -> [ShortMove; KILLERS_PER_PLY] {
        self.killers[ply]
    }

    pub fn record_killer(&mut self, ply: usize, m: ShortMove) {
        let slot = &mut self.killers[ply];
        if slot[0] == m {
            return;
        }
        slot[1] = slot[0];
        slot[0] = m;
    }

    pub fn counter_move(&self, prev: Move) -> ShortMove {
        if prev.is_null() {
            return ShortMove::none();
        }
        self.counter[prev.piece() * NrOf::SQUARES + prev.to()]
    }

    pub fn record_counter(&mut self, prev: Move, reply: ShortMove) {
        if prev.is_null() {
            return;
        }
        self.counter[prev.piece() * NrOf::SQUARES + prev.to()] = reply;
    }

    /// Quiet-move ordering score: plain piece-to history plus every
    /// continuation table whose offset reaches back past ply 0.
    pub fn quiet_history(&self, ply: usize, m: Move) -> i32 {
        let mut score = self.quiet.get(m.piece(), m.to());
        for (i, &offset) in CONTINUATION_OFFSETS.iter().enumerate() {
            if ply >= offset {
                score += self.continuation[i].get(m.piece(), m.to());
            }
        }
        score
    }

    /// Applies `bonus` to every continuation table whose offset reaches
    /// back past ply 0, alongside the plain quiet-history update.
    pub fn update_continuation(&mut self, ply: usize, m: Move, bonus: i32) {
        for (i, &offset) in CONTINUATION_OFFSETS.iter().enumerate() {
            if ply >= offset {
                self.continuation[i].update(m.piece(), m.to(), bonus);
            }
        }
    }

    /// Bonus for a move that caused a beta cutoff, per the gravity formula,
    /// scaled by depth the way capture/quiet move ordering expects.
    pub fn cutoff_bonus(depth: i8) -> i32 {
        let d = depth as i32;
        (4 * d * d).min(1024)
    }

    fn correction_table_mut(
        &mut self,
        side: usize,
        kind: CorrectionKind,
    ) -> &mut [i32; Self::CORRECTION_ENTRIES] {
        match kind {
            CorrectionKind::Pawn => &mut self.correction_pawn[side],
            CorrectionKind::Minor => &mut self.correction_minor[side],
            CorrectionKind::Major => &mut self.correction_major[side],
            CorrectionKind::Material => &mut self.correction_material[side],
        }
    }

    fn correction_table(&self, side: usize, kind: CorrectionKind) -> &[i32; Self::CORRECTION_ENTRIES] {
        match kind {
            CorrectionKind::Pawn => &self.correction_pawn[side],
            CorrectionKind::Minor => &self.correction_minor[side],
            CorrectionKind::Major => &self.correction_major[side],
            CorrectionKind::Material => &self.correction_material[side],
        }
    }

    pub fn correction_value(&self, side: usize, kind: CorrectionKind, hash: u64) -> i32 {
        self.correction_table(side, kind)[Self::correction_index(hash)] / CORRECTION_GRAIN
    }

    /// Sum of all four correction terms, added to the raw static eval.
    pub fn total_correction(
        &self,
        side: usize,
        pawn_hash: u64,
        minor_hash: u64,
        major_hash: u64,
        material_hash: u64,
    ) -> i32 {
        self.correction_value(side, CorrectionKind::Pawn, pawn_hash)
            + self.correction_value(side, CorrectionKind::Minor, minor_hash)
            + self.correction_value(side, CorrectionKind::Major, major_hash)
            + self.correction_value(side, CorrectionKind::Material, material_hash)
    }

    /// EMA update of one correction table from the realized search-vs-static
    /// error, weighted by `min(depth, 16)`.
    pub fn update_correction(
        &mut self,
        side: usize,
        kind: CorrectionKind,
        hash: u64,
        error: i32,
        depth: i8,
    ) {
        let weight = (depth as i32).min(16);
        let scaled_error = error * CORRECTION_GRAIN;
        let entry = &mut self.correction_table_mut(side, kind)[Self::correction_index(hash)];
        let updated = (*entry * (256 - weight) + scaled_error * weight) / 256;
        *entry = updated.clamp(-CORRECTION_MAX * CORRECTION_GRAIN, CORRECTION_MAX * CORRECTION_GRAIN);
    }
}

#[derive(Copy, Clone, PartialEq, Eq)]
pub enum CorrectionKind {
    Pawn,
    Minor,
    Major,
    Material,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::Pieces;

    #[test]
    fn gravity_pulls_toward_bonus_and_saturates() {
        let mut h: i16 = 0;
        for _ in 0..100 {
            apply_gravity(&mut h, HISTORY_MAX);
        }
        assert!(h as i32 <= HISTORY_MAX);
        assert!(h > 0);
    }

    #[test]
    fn piece_to_table_updates_only_its_own_slot() {
        let mut t = PieceToTable::new();
        t.update(Pieces::KNIGHT, 10, 500);
        assert!(t.get(Pieces::KNIGHT, 10) > 0);
        assert_eq!(t.get(Pieces::KNIGHT, 11), 0);
        assert_eq!(t.get(Pieces::BISHOP, 10), 0);
    }

    #[test]
    fn killer_insertion_keeps_most_recent_first() {
        let mut tables = HistoryTables::new(4);
        let a = ShortMove::new(8, 16, Pieces::NONE);
        let b = ShortMove::new(9, 17, Pieces::NONE);
        tables.record_killer(0, a);
        tables.record_killer(0, b);
        let killers = tables.killers(0);
        assert_eq!(killers[0], b);
        assert_eq!(killers[1], a);
    }

    #[test]
    fn duplicate_killer_is_not_reinserted() {
        let mut tables = HistoryTables::new(4);
        let a = ShortMove::new(8, 16, Pieces::NONE);
        tables.record_killer(0, a);
        tables.record_killer(0, a);
        let killers = tables.killers(0);
        assert_eq!(killers[0], a);
        assert_eq!(killers[1], ShortMove::none());
    }

    #[test]
    fn correction_history_moves_toward_error_sign() {
        let mut tables = HistoryTables::new(4);
        for _ in 0..50 {
            tables.update_correction(Sides::WHITE, CorrectionKind::Pawn, 0xABC, 80, 16);
        }
        assert!(tables.correction_value(Sides::WHITE, CorrectionKind::Pawn, 0xABC) > 0);
    }

    #[test]
    fn counter_move_round_trips() {
        let mut tables = HistoryTables::new(4);
        let prev = Move::new(12, 28, Pieces::PAWN, Pieces::NONE, Pieces::NONE, false);
        let reply = ShortMove::new(52, 36, Pieces::NONE);
        tables.record_counter(prev, reply);
        assert_eq!(tables.counter_move(prev), reply);
    }
}
