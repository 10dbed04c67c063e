/* =======================================================================
Talon is a chess playing engine. See src/defs.rs for license notice.
======================================================================= */

//! Eight-way LRU, keyed by the upper 48 bits of `zhash`, caching a clamped
//! 16-bit static eval. Purely a miss-amortization for NNUE inference cost;
//! never authoritative, so a false hit after a hash collision only costs
//! search quality, never correctness.

const WAYS: usize = 8;

#[derive(Copy, Clone)]
struct Entry {
    tag: u64,
    eval: i16,
    valid: bool,
}

impl Entry {
    const EMPTY: Entry = Entry { tag: 0, eval: 0, valid: false };
}

pub struct EvaluationCache {
    buckets: Vec<[Entry; WAYS]>,
    mask: usize,
}

fn tag_of(zhash: u64) -> u64 {
    zhash >> 16
}

impl EvaluationCache {
    pub fn with_size_mb(mb: usize) -> Self {
        let bytes = mb.max(1) * 1024 * 1024;
        let bucket_bytes = std::mem::size_of::<[Entry; WAYS]>();
        let buckets = (bytes / bucket_bytes).max(1).next_power_of_two();
        Self {
            buckets: vec![[Entry::EMPTY; WAYS]; buckets],
            mask: buckets - 1,
        }
    }

    fn bucket_index(&self, zhash: u64) -> usize {
        (zhash as usize) & self.mask
    }

    /// On hit, moves the entry to the front (most-recently-used slot 0).
    pub fn probe(&mut self, zhash: u64) -> Option<i32> {
        let idx = self.bucket_index(zhash);
        let tag = tag_of(zhash);
        let bucket = &mut self.buckets[idx];
        if let Some(pos) = bucket.iter().position(|e| e.valid && e.tag == tag) {
            let hit = bucket[pos];
            if pos != 0 {
                bucket.copy_within(0..pos, 1);
                bucket[0] = hit;
            }
            return Some(hit.eval as i32);
        }
        None
    }

    pub fn store(&mut self, zhash: u64, eval: i32) {
        let idx = self.bucket_index(zhash);
        let tag = tag_of(zhash);
        let bucket = &mut self.buckets[idx];
        bucket.copy_within(0..WAYS - 1, 1);
        bucket[0] = Entry {
            tag,
            eval: eval.clamp(i16::MIN as i32, i16::MAX as i32) as i16,
            valid: true,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stores_and_probes() {
        let mut cache = EvaluationCache::with_size_mb(1);
        cache.store(0xAAAA_1234, 55);
        assert_eq!(cache.probe(0xAAAA_1234), Some(55));
    }

    #[test]
    fn miss_on_unrelated_hash() {
        let mut cache = EvaluationCache::with_size_mb(1);
        cache.store(0xAAAA_1234, 55);
        assert_eq!(cache.probe(0xBBBB_5678), None);
    }

    #[test]
    fn lru_eviction_drops_oldest() {
        let mut cache = EvaluationCache::with_size_mb(1);
        let idx = 0u64;
        for i in 0..WAYS as u64 + 1 {
            cache.store(idx | (i << 20), i as i32);
        }
        // The first entry stored should have been evicted.
        assert_eq!(cache.probe(idx), None);
    }
}
