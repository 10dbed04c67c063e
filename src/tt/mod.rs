/* =======================================================================
Talon is a chess playing engine. See src/defs.rs for license notice.
======================================================================= */

//! Transposition table: 4-way bucketed, XOR-checksummed so a torn read
//! under concurrent unsynchronized access resolves as a miss rather than
//! data corruption. Shared across all search threads.
//!
//! Each entry stores `key = zhash ^ payload` and `payload` in separate
//! words. A probe recomputes `key ^ payload` and compares it against the
//! probing hash; if a concurrent writer tore the two words apart between
//! the reader's two loads, the comparison fails and the probe reports a
//! miss instead of returning a corrupted entry.

use crate::defs::MAX_PLY;
use crate::movegen::defs::ShortMove;
use std::sync::atomic::{AtomicU16, AtomicU64, Ordering};

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum NodeType {
    Pv,
    Cut,
    All,
}

#[derive(Copy, Clone, Debug)]
pub struct TtData {
    pub best_move: ShortMove,
    pub node_type: NodeType,
    pub static_eval: i32,
    pub depth: i8,
    pub age: u16,
    pub score: i32,
}

// Bit layout (64 bits total): move:16 | node_type:2 | depth:7 | age:9 |
// static_eval:14 (clamped to +-8191) | score:16 (full mate-score range).
fn pack(d: TtData) -> u64 {
    let mv = d.best_move.0 as u64;
    let nt: u64 = match d.node_type {
        NodeType::Pv => 0,
        NodeType::Cut => 1,
        NodeType::All => 2,
    };
    let depth = (d.depth as u8 & 0x7F) as u64;
    let age = (d.age & 0x1FF) as u64;
    let eval = (d.static_eval.clamp(-8191, 8191) as i16 as u16 & 0x3FFF) as u64;
    let score = (d.score as i16 as u16) as u64;
    mv | (nt << 16) | (depth << 18) | (age << 25) | (eval << 34) | (score << 48)
}

fn unpack(payload: u64) -> TtData {
    let node_type = match (payload >> 16) & 0x3 {
        0 => NodeType::Pv,
        1 => NodeType::Cut,
        _ => NodeType::All,
    };
    let eval_bits = ((payload >> 34) & 0x3FFF) as u16;
    // sign-extend the 14-bit field
    let eval = (((eval_bits << 2) as i16) >> 2) as i32;
    TtData {
        best_move: ShortMove((payload & 0xFFFF) as u16),
        node_type,
        depth: ((payload >> 18) & 0x7F) as u8 as i8,
        age: ((payload >> 25) & 0x1FF) as u16,
        static_eval: eval,
        score: ((payload >> 48) & 0xFFFF) as u16 as i16 as i32,
    }
}

/// Converts a mate score found at search-time `ply` into a mate-distance-
/// from-root encoding stable across re-probes at different plies.
pub fn score_to_tt(score: i32, ply: usize) -> i32 {
    const MATE: i32 = 32000;
    if score >= MATE - MAX_PLY as i32 {
        score + ply as i32
    } else if score <= -MATE + MAX_PLY as i32 {
        score - ply as i32
    } else {
        score
    }
}

pub fn score_from_tt(score: i32, ply: usize) -> i32 {
    const MATE: i32 = 32000;
    if score >= MATE - MAX_PLY as i32 {
        score - ply as i32
    } else if score <= -MATE + MAX_PLY as i32 {
        score + ply as i32
    } else {
        score
    }
}

struct Slot {
    key: AtomicU64,
    payload: AtomicU64,
}

impl Slot {
    fn empty() -> Self {
        Self {
            key: AtomicU64::new(0),
            payload: AtomicU64::new(0),
        }
    }
}

const BUCKET_SIZE: usize = 4;

pub struct TranspositionTable {
    slots: Vec<Slot>,
    buckets_mask: usize,
    age: AtomicU16,
}

impl TranspositionTable {
    pub fn with_size_mb(mb: usize) -> Self {
        let bytes = mb.max(1) * 1024 * 1024;
        let raw_entries = bytes / (std::mem::size_of::<u64>() * 2);
        let buckets = (raw_entries / BUCKET_SIZE).max(1).next_power_of_two();
        let entries = buckets * BUCKET_SIZE;
        let mut slots = Vec::with_capacity(entries);
        slots.resize_with(entries, Slot::empty);
        Self {
            slots,
            buckets_mask: buckets - 1,
            age: AtomicU16::new(0),
        }
    }

    /// Bumps the age epoch; called once per `new_game` and once per search
    /// iteration so stale entries (older than one epoch) replace freely.
    pub fn new_search(&self) {
        self.age.fetch_add(1, Ordering::Relaxed);
    }

    fn bucket_base(&self, zhash: u64) -> usize {
        (zhash as usize & self.buckets_mask) * BUCKET_SIZE
    }

    pub fn probe(&self, zhash: u64) -> Option<TtData> {
        let base = self.bucket_base(zhash);
        for i in 0..BUCKET_SIZE {
            let key = self.slots[base + i].key.load(Ordering::Relaxed);
            let payload = self.slots[base + i].payload.load(Ordering::Relaxed);
            if payload != 0 && key ^ payload == zhash {
                return Some(unpack(payload));
            }
        }
        None
    }

    pub fn store(&self, zhash: u64, data: TtData) {
        let base = self.bucket_base(zhash);
        let payload = pack(data);
        let current_age = self.age.load(Ordering::Relaxed);

        for i in 0..BUCKET_SIZE {
            let key = self.slots[base + i].key.load(Ordering::Relaxed);
            let existing_payload = self.slots[base + i].payload.load(Ordering::Relaxed);
            if existing_payload != 0 && key ^ existing_payload == zhash {
                self.write_slot(base + i, zhash, payload);
                return;
            }
        }

        let mut worst_slot = 0usize;
        let mut worst_effective_depth = i32::MAX;
        for i in 0..BUCKET_SIZE {
            let existing_payload = self.slots[base + i].payload.load(Ordering::Relaxed);
            if existing_payload == 0 {
                worst_slot = i;
                break;
            }
            let existing = unpack(existing_payload);
            let stale = current_age.wrapping_sub(existing.age) > 1;
            let effective_depth = if stale {
                -1
            } else {
                existing.depth as i32
                    + match existing.node_type {
                        NodeType::Pv => 2,
                        NodeType::Cut => 1,
                        NodeType::All => 0,
                    }
            };
            if effective_depth < worst_effective_depth {
                worst_effective_depth = effective_depth;
                worst_slot = i;
            }
        }
        self.write_slot(base + worst_slot, zhash, payload);
    }

    fn write_slot(&self, index: usize, zhash: u64, payload: u64) {
        self.slots[index].payload.store(payload, Ordering::Relaxed);
        self.slots[index].key.store(zhash ^ payload, Ordering::Relaxed);
    }

    pub fn current_age(&self) -> u16 {
        self.age.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(score: i32, depth: i8, age: u16) -> TtData {
        TtData {
            best_move: ShortMove::new(12, 28, crate::defs::Pieces::NONE),
            node_type: NodeType::Cut,
            static_eval: 55,
            depth,
            age,
            score,
        }
    }

    #[test]
    fn stores_and_probes_round_trip() {
        let tt = TranspositionTable::with_size_mb(1);
        let data = sample(123, 10, tt.current_age());
        tt.store(0xABCDEF, data);
        let probed = tt.probe(0xABCDEF).expect("entry stored");
        assert_eq!(probed.best_move, data.best_move);
        assert_eq!(probed.depth, data.depth);
        assert_eq!(probed.score, data.score);
    }

    #[test]
    fn mismatched_key_misses() {
        let tt = TranspositionTable::with_size_mb(1);
        tt.store(0x1111, sample(0, 1, 0));
        assert!(tt.probe(0x2222).is_none());
    }

    #[test]
    fn mate_score_round_trips_through_ply_shift() {
        let mate_score = 32000 - 5;
        let stored = score_to_tt(mate_score, 10);
        assert_eq!(score_from_tt(stored, 10), mate_score);
    }

    #[test]
    fn replaces_shallowest_slot_when_bucket_full() {
        let tt = TranspositionTable::with_size_mb(1);
        // Force four distinct entries into the very first bucket by using
        // hashes whose low bits collide with bucket 0 but whose full value
        // differs so each is a distinct position.
        let keys: Vec<u64> = (0..5u64).map(|i| (i + 1) << 40).collect();
        for (i, &k) in keys.iter().take(4).enumerate() {
            tt.store(k, sample(i as i32, i as i8 + 1, 0));
        }
        tt.store(keys[4], sample(99, 20, 0));
        assert!(tt.probe(keys[4]).is_some());
    }
}
