/* =======================================================================
Talon is a chess playing engine. See src/defs.rs for license notice.
======================================================================= */

//! Loads a [`Network`] either from the embedded default weight file (built
//! deterministically by `build.rs` and Huffman-decoded here at startup) or
//! from an external file supplied by the UCI `setoption` path.

use super::{huffman, Network, HIDDEN, INPUT_FEATURES, KING_BUCKETS, OUTPUT_BUCKETS};
use crate::bitboards::magic::InitError;
use std::path::Path;

const FEATURE_WEIGHT_COUNT: usize = KING_BUCKETS * INPUT_FEATURES * HIDDEN;
const OUTPUT_WEIGHT_COUNT: usize = OUTPUT_BUCKETS * 2 * HIDDEN;

static DEFAULT_WEIGHTS: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/default_weights.bin"));

impl Network {
    /// Decodes the engine's built-in, deterministically generated weight
    /// file. Always succeeds for a correctly built binary; a failure here
    /// means `build.rs` and this decoder have drifted out of sync.
    pub fn embedded() -> Result<Self, InitError> {
        Self::from_huffman_bytes(DEFAULT_WEIGHTS)
    }

    /// Loads a weight file from disk in the same Huffman-coded format
    /// produced by `build.rs`.
    pub fn from_file(path: &Path) -> Result<Self, InitError> {
        let data = std::fs::read(path)
            .map_err(|e| InitError::WeightFileCorrupt(format!("{}: {e}", path.display())))?;
        Self::from_huffman_bytes(&data)
    }

    fn from_huffman_bytes(data: &[u8]) -> Result<Self, InitError> {
        if data.len() < 4 {
            return Err(InitError::WeightFileCorrupt("file too short".into()));
        }
        let feature_len = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;
        let rest = &data[4..];
        if feature_len > rest.len() {
            return Err(InitError::WeightFileCorrupt("feature section length out of range".into()));
        }
        let (feature_section, tail) = rest.split_at(feature_len);

        let feature_weights = huffman::decode_weights(feature_section, FEATURE_WEIGHT_COUNT)?;

        if tail.len() < HIDDEN * 2 {
            return Err(InitError::WeightFileCorrupt("truncated feature bias".into()));
        }
        let (bias_bytes, tail) = tail.split_at(HIDDEN * 2);
        let mut feature_bias = [0i16; HIDDEN];
        for (i, c) in bias_bytes.chunks_exact(2).enumerate() {
            feature_bias[i] = i16::from_le_bytes([c[0], c[1]]);
        }

        let output_weights = huffman::decode_weights(tail, OUTPUT_WEIGHT_COUNT)?;

        let output_bias_section = &tail[tail.len() - OUTPUT_BUCKETS * 4..];
        let mut output_bias = [0i32; OUTPUT_BUCKETS];
        for (i, c) in output_bias_section.chunks_exact(4).enumerate() {
            output_bias[i] = i32::from_le_bytes([c[0], c[1], c[2], c[3]]);
        }

        if feature_weights.len() != FEATURE_WEIGHT_COUNT {
            return Err(InitError::WeightFileCorrupt(format!(
                "expected {FEATURE_WEIGHT_COUNT} feature weights, got {}",
                feature_weights.len()
            )));
        }
        if output_weights.len() != OUTPUT_WEIGHT_COUNT {
            return Err(InitError::WeightFileCorrupt(format!(
                "expected {OUTPUT_WEIGHT_COUNT} output weights, got {}",
                output_weights.len()
            )));
        }

        Ok(Network {
            feature_weights,
            feature_bias,
            output_weights,
            output_bias,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_network_decodes() {
        let net = Network::embedded().expect("embedded weights must decode");
        assert_eq!(net.feature_weights.len(), FEATURE_WEIGHT_COUNT);
        assert_eq!(net.output_weights.len(), OUTPUT_WEIGHT_COUNT);
    }
}
