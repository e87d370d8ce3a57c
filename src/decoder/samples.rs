//! Access to single samples inside a packed row.
//!
//! Sub-byte depths are packed most significant bit first, 16 bit samples are stored as big endian
//! pairs.

/// Read sample `x` of a row packed at `bits` per sample.
///
/// `bits` must be one of 1, 2, 4, 8 or 16 and `x` must lie inside the row.
#[inline]
pub fn get_component(row: &[u8], x: usize, bits: u8) -> u16 {
    match bits {
        8 => u16::from(row[x]),
        16 => u16::from_be_bytes([row[2 * x], row[2 * x + 1]]),
        1 | 2 | 4 => {
            let per_byte = 8 / usize::from(bits);
            let shift = (per_byte - 1 - x % per_byte) * usize::from(bits);
            let mask = (1u8 << bits) - 1;
            u16::from((row[x / per_byte] >> shift) & mask)
        }
        _ => 0,
    }
}

/// Write sample `x` of a row packed at `bits` per sample.
///
/// The target field is cleared first, values wider than the field are truncated.
#[inline]
pub fn put_component(row: &mut [u8], x: usize, bits: u8, value: u16) {
    match bits {
        8 => row[x] = value as u8,
        16 => row[2 * x..2 * x + 2].copy_from_slice(&value.to_be_bytes()),
        1 | 2 | 4 => {
            let per_byte = 8 / usize::from(bits);
            let shift = (per_byte - 1 - x % per_byte) * usize::from(bits);
            let mask = (1u8 << bits) - 1;
            let byte = &mut row[x / per_byte];
            *byte &= !(mask << shift);
            *byte |= (value as u8 & mask) << shift;
        }
        _ => {}
    }
}

/// Bytes needed for `samples` samples of `bits` each, rounded up to whole bytes.
pub fn row_bytes(samples: u64, bits: u8) -> Option<u64> {
    samples
        .checked_mul(u64::from(bits))
        .map(|total| total.div_ceil(8))
}
