use super::samples::{get_component, put_component};
use crate::tags::ByteOrder;

/// Reverse horizontal differencing in place.
///
/// Each row of `image` holds `width` pixels of `samples` interleaved samples. Within a row every
/// sample is replaced by the running sum of its channel, modulo `2^bits`. 16 bit samples are
/// still in `byte_order` and are summed as such.
pub fn rev_hpredict_nsamp(
    image: &mut [u8],
    stride: usize,
    (width, samples): (usize, usize),
    bits: u8,
    byte_order: ByteOrder,
) {
    if stride == 0 {
        return;
    }

    let row_samples = width * samples;
    for row in image.chunks_exact_mut(stride) {
        match bits {
            8 => {
                for col in samples..row_samples {
                    row[col] = row[col].wrapping_add(row[col - samples]);
                }
            }
            16 => {
                fn read(row: &[u8], col: usize, byte_order: ByteOrder) -> u16 {
                    let pair = [row[2 * col], row[2 * col + 1]];
                    match byte_order {
                        ByteOrder::LittleEndian => u16::from_le_bytes(pair),
                        ByteOrder::BigEndian => u16::from_be_bytes(pair),
                    }
                }

                for col in samples..row_samples {
                    let sum = read(row, col, byte_order)
                        .wrapping_add(read(row, col - samples, byte_order));
                    let pair = match byte_order {
                        ByteOrder::LittleEndian => sum.to_le_bytes(),
                        ByteOrder::BigEndian => sum.to_be_bytes(),
                    };
                    row[2 * col..2 * col + 2].copy_from_slice(&pair);
                }
            }
            _ => {
                let mask = (1u16 << bits) - 1;
                for col in samples..row_samples {
                    let sum = get_component(row, col, bits) + get_component(row, col - samples, bits);
                    put_component(row, col, bits, sum & mask);
                }
            }
        }
    }
}
