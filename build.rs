//! Generates the engine's embedded default NNUE weight file.
//!
//! There is no trained network to ship, so this deterministically fills the
//! quantized weight arrays from a fixed seeded PRNG (the same `StdRng`-style
//! splitmix construction used at runtime for magic-number search and Zobrist
//! tables) and Huffman-encodes the result with the same codec the runtime
//! decoder uses. The output is reproducible byte-for-byte across builds and
//! platforms.

include!("src/nnue/huffman_codec.rs");

const HIDDEN: usize = 64;
const KING_BUCKETS: usize = 16;
const PIECE_SLOTS: usize = 12;
const INPUT_FEATURES: usize = 64 * PIECE_SLOTS;
const OUTPUT_BUCKETS: usize = 8;

const FEATURE_WEIGHT_COUNT: usize = KING_BUCKETS * INPUT_FEATURES * HIDDEN;
const OUTPUT_WEIGHT_COUNT: usize = OUTPUT_BUCKETS * 2 * HIDDEN;

const WEIGHT_SEED: u64 = 0xD1B54A32D192ED03;

/// Minimal splitmix64 generator; avoids pulling `rand` into the build-script
/// dependency graph for what is otherwise a handful of deterministic draws.
struct SplitMix64(u64);

impl SplitMix64 {
    fn new(seed: u64) -> Self {
        SplitMix64(seed)
    }

    fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E3779B97F4A7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
        z ^ (z >> 31)
    }

    /// Small-magnitude quantized weight in roughly [-127, 127].
    fn next_weight(&mut self) -> i16 {
        ((self.next_u64() % 255) as i16) - 127
    }
}

fn main() {
    println!("cargo:rerun-if-changed=src/nnue/huffman_codec.rs");

    let mut rng = SplitMix64::new(WEIGHT_SEED);

    let feature_weights: Vec<i16> = (0..FEATURE_WEIGHT_COUNT).map(|_| rng.next_weight()).collect();
    let feature_bias: Vec<i16> = (0..HIDDEN).map(|_| rng.next_weight()).collect();
    let output_weights: Vec<i16> = (0..OUTPUT_WEIGHT_COUNT).map(|_| rng.next_weight()).collect();
    let output_bias: Vec<i32> = (0..OUTPUT_BUCKETS).map(|_| rng.next_weight() as i32).collect();

    let feature_bytes: Vec<u8> = feature_weights.iter().flat_map(|w| w.to_le_bytes()).collect();
    let feature_section = encode(&feature_bytes);

    let output_bytes: Vec<u8> = output_weights.iter().flat_map(|w| w.to_le_bytes()).collect();
    let output_section = encode(&output_bytes);

    let mut out = Vec::new();
    out.extend_from_slice(&(feature_section.len() as u32).to_le_bytes());
    out.extend_from_slice(&feature_section);
    for b in &feature_bias {
        out.extend_from_slice(&b.to_le_bytes());
    }
    out.extend_from_slice(&output_section);
    for b in &output_bias {
        out.extend_from_slice(&b.to_le_bytes());
    }

    let out_dir = std::env::var("OUT_DIR").expect("OUT_DIR set by cargo");
    let dest = std::path::Path::new(&out_dir).join("default_weights.bin");
    std::fs::write(&dest, &out).expect("write embedded weight file");
}
