//! 1-bit sample packing.
//!
//! No native element type holds 1-bit samples, so each bit is widened to a full `u8`
//! element of value 0 or 1.

use crate::error::{BridgeError, Result};

/// Position of the first sample inside a packed byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BitOrder {
    /// First sample in bit 7. Used by packed rasters.
    MsbFirst,
    /// First sample in bit 0. Used by raw DICOM bit-packed frames.
    #[default]
    LsbFirst,
}

impl BitOrder {
    #[inline]
    const fn shift(self, bit: usize) -> usize {
        match self {
            Self::MsbFirst => 7 - bit % 8,
            Self::LsbFirst => bit % 8,
        }
    }
}

/// Number of bytes needed to address `height` lines of `width` bits.
pub fn packed_len(width: usize, height: usize, line_stride_bits: usize, bit_offset: usize) -> usize {
    if width == 0 || height == 0 {
        return 0;
    }
    (bit_offset + (height - 1) * line_stride_bits + width).div_ceil(8)
}

/// Expands packed bits into one element per sample.
///
/// `line_stride_bits` is the distance between the first bits of two successive lines,
/// `bit_offset` the position of the very first sample.
pub fn unpack_bits(
    packed: &[u8],
    width: usize,
    height: usize,
    line_stride_bits: usize,
    bit_offset: usize,
    order: BitOrder,
) -> Result<Vec<u8>> {
    if line_stride_bits < width {
        return Err(BridgeError::invalid_argument(format!(
            "line stride of {line_stride_bits} bits is shorter than {width} samples"
        )));
    }
    let needed = packed_len(width, height, line_stride_bits, bit_offset);
    if packed.len() < needed {
        return Err(BridgeError::invalid_argument(format!(
            "packed data holds {} bytes, {needed} needed",
            packed.len()
        )));
    }

    let mut out = Vec::with_capacity(width * height);
    for y in 0..height {
        let line_start = bit_offset + y * line_stride_bits;
        for x in 0..width {
            let bit = line_start + x;
            out.push((packed[bit / 8] >> order.shift(bit)) & 1);
        }
    }
    Ok(out)
}

/// Packs one element per sample back into bits. Any non-zero element is a set bit.
pub fn pack_bits(
    values: &[u8],
    width: usize,
    height: usize,
    line_stride_bits: usize,
    order: BitOrder,
) -> Result<Vec<u8>> {
    if values.len() != width * height {
        return Err(BridgeError::invalid_argument(format!(
            "{} values for a {width}x{height} binary image",
            values.len()
        )));
    }
    if line_stride_bits < width {
        return Err(BridgeError::invalid_argument(format!(
            "line stride of {line_stride_bits} bits is shorter than {width} samples"
        )));
    }

    let mut packed = vec![0u8; packed_len(width, height, line_stride_bits, 0)];
    for y in 0..height {
        for x in 0..width {
            if values[y * width + x] != 0 {
                let bit = y * line_stride_bits + x;
                packed[bit / 8] |= 1 << order.shift(bit);
            }
        }
    }
    Ok(packed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unpack_msb_with_stride_and_offset() {
        // Two lines of 5 samples, 2 bytes per line, first sample at bit 2.
        // Line 0 bits 2..7 of byte 0: 1 0 1 1 0
        // Line 1 bits 18..23 of byte 2: 0 1 0 0 1
        let packed = [0b0010_1100, 0xFF, 0b0001_0010, 0xFF];
        let values = unpack_bits(&packed, 5, 2, 16, 2, BitOrder::MsbFirst).unwrap();
        assert_eq!(values, vec![1, 0, 1, 1, 0, 0, 1, 0, 0, 1]);
    }

    #[test]
    fn test_unpack_lsb_continuous() {
        // 3x3 image as a continuous stream of 9 bits.
        let packed = [0b1010_0101, 0b0000_0001];
        let values = unpack_bits(&packed, 3, 3, 3, 0, BitOrder::LsbFirst).unwrap();
        assert_eq!(values, vec![1, 0, 1, 0, 0, 1, 0, 1, 1]);
    }

    #[test]
    fn test_unpack_short_input() {
        let err = unpack_bits(&[0u8; 1], 8, 2, 8, 0, BitOrder::MsbFirst).unwrap_err();
        assert!(matches!(err, BridgeError::InvalidArgument(_)));
    }

    #[test]
    fn test_pack_matches_unpack() {
        let values = vec![1, 1, 0, 0, 1, 0, 1, 0, 0, 1, 1, 1];
        for order in [BitOrder::MsbFirst, BitOrder::LsbFirst] {
            let packed = pack_bits(&values, 6, 2, 8, order).unwrap();
            assert_eq!(packed.len(), 2);
            assert_eq!(unpack_bits(&packed, 6, 2, 8, 0, order).unwrap(), values);
        }
    }
}
