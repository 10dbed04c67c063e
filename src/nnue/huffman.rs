/* =======================================================================
Talon is a chess playing engine. See src/defs.rs for license notice.
======================================================================= */

//! Huffman codec for the embedded NNUE weight file: a 256-entry `u32`
//! frequency-table header followed by a packed canonical-Huffman bitstream
//! over the i16 weight array's little-endian byte representation.

include!("huffman_codec.rs");

use crate::bitboards::magic::InitError;

pub fn decode_weights(data: &[u8], i16_count: usize) -> Result<Vec<i16>, InitError> {
    if data.len() < 256 * 4 {
        return Err(InitError::WeightFileCorrupt("truncated frequency header".into()));
    }
    let bytes = decode(data, i16_count * 2);
    if bytes.len() != i16_count * 2 {
        return Err(InitError::WeightFileCorrupt(format!(
            "expected {} decoded bytes, got {}",
            i16_count * 2,
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|c| i16::from_le_bytes([c[0], c[1]]))
        .collect())
}

pub fn encode_weights(weights: &[i16]) -> Vec<u8> {
    let bytes: Vec<u8> = weights.iter().flat_map(|w| w.to_le_bytes()).collect();
    encode(&bytes)
}
