//! Binary fingerprints from the pre-binarization embedding.
//!
//! Each embedding value is thresholded at [`BINARIZE_THRESHOLD`] (strictly
//! greater) and the resulting bits are packed eight per byte, most
//! significant bit first:
//!
//! ```text
//! element j  ->  byte j / 8, bit 7 - (j % 8)
//! [0.9, 0.1, 0.6, 0.0, 0.0, 0.0, 0.0, 0.7, 0.8]  ->  [0b1010_0001, 0b1000_0000]
//! ```
//!
//! Unused bits of the final byte are zero. This matches NumPy's
//! `packbits(..., bitorder="big")`, so fingerprints stay comparable with
//! ones produced elsewhere.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Activations strictly above this value become 1 bits.
pub const BINARIZE_THRESHOLD: f32 = 0.5;

/// Pack `row > threshold` into bytes, MSB first.
pub fn pack_bits(row: impl IntoIterator<Item = f32>, threshold: f32) -> BinaryFingerprint {
    let mut bytes = Vec::new();
    let mut width = 0;
    for value in row {
        let bit = width % 8;
        if bit == 0 {
            bytes.push(0u8);
        }
        if value > threshold {
            if let Some(last) = bytes.last_mut() {
                *last |= 0x80u8 >> bit;
            }
        }
        width += 1;
    }
    BinaryFingerprint { bytes, width }
}

/// Packed bytes that do not form a fingerprint of the stated width.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum FingerprintError {
    #[error("fingerprint of width {width} needs {expected} bytes, got {actual}")]
    LengthMismatch {
        width: usize,
        expected: usize,
        actual: usize,
    },
}

/// A bit-packed, thresholded embedding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BinaryFingerprint {
    bytes: Vec<u8>,
    /// Number of meaningful bits (the embedding width).
    width: usize,
}

impl BinaryFingerprint {
    /// Wrap already-packed bytes holding `width` bits, MSB first.
    ///
    /// `bytes` must be exactly `ceil(width / 8)` long. Bits past `width` in
    /// the last byte are cleared.
    pub fn from_bytes(mut bytes: Vec<u8>, width: usize) -> Result<Self, FingerprintError> {
        let expected = width.div_ceil(8);
        if bytes.len() != expected {
            return Err(FingerprintError::LengthMismatch {
                width,
                expected,
                actual: bytes.len(),
            });
        }
        let used = width % 8;
        if used != 0 {
            if let Some(last) = bytes.last_mut() {
                *last &= !(0xffu8 >> used);
            }
        }
        Ok(Self { bytes, width })
    }

    /// Packed bytes, `ceil(width / 8)` long.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Embedding width in bits.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Value of bit `j` (the thresholded embedding element `j`).
    pub fn bit(&self, j: usize) -> Option<bool> {
        if j >= self.width {
            return None;
        }
        Some(self.bytes[j / 8] & (0x80u8 >> (j % 8)) != 0)
    }

    /// Number of set bits.
    pub fn count_ones(&self) -> u32 {
        self.bytes.iter().map(|b| b.count_ones()).sum()
    }

    /// Number of differing bits, or `None` if the widths differ.
    pub fn hamming_distance(&self, other: &BinaryFingerprint) -> Option<u32> {
        if self.width != other.width {
            return None;
        }
        Some(
            self.bytes
                .iter()
                .zip(&other.bytes)
                .map(|(a, b)| (a ^ b).count_ones())
                .sum(),
        )
    }

    /// Base64 (standard alphabet, padded) of the packed bytes.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }
}

#[derive(Serialize, Deserialize)]
struct FingerprintRepr {
    width: usize,
    bits: String,
}

impl Serialize for BinaryFingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        FingerprintRepr {
            width: self.width,
            bits: self.to_base64(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for BinaryFingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = FingerprintRepr::deserialize(deserializer)?;
        let bytes = STANDARD
            .decode(repr.bits.as_bytes())
            .map_err(serde::de::Error::custom)?;
        Self::from_bytes(bytes, repr.width).map_err(serde::de::Error::custom)
    }
}
