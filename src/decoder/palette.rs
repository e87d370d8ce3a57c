use super::samples::get_component;
use crate::{TiffFormatError, TiffResult, TiffUnsupportedError};

/// Expand palette indices to 8 bit RGB, keeping an extra sample as a widened alpha channel.
///
/// `color_map` holds all red entries, then all green, then all blue, 16 bits each. Only the high
/// byte of each entry is kept. Returns the new buffer with a stride of `width * (samples + 2)`.
pub fn expand_palette(
    image: &[u8],
    stride: usize,
    (width, height): (usize, usize),
    samples: u16,
    bits: u16,
    color_map: &[u16],
) -> TiffResult<Vec<u8>> {
    if !(samples == 1 || samples == 2) || !(bits == 4 || bits == 8) {
        return Err(TiffUnsupportedError::UnsupportedPalette { samples, bits }.into());
    }

    let entries = 1usize << bits;
    if color_map.len() != 3 * entries {
        return Err(TiffFormatError::InvalidColorMap {
            entries: color_map.len(),
            expected: 3 * entries,
        }
        .into());
    }

    let (red, rest) = color_map.split_at(entries);
    let (green, blue) = rest.split_at(entries);
    let bits = bits as u8;
    let samples = usize::from(samples);

    let out_stride = width * (samples + 2);
    let mut expanded = Vec::new();
    expanded.try_reserve_exact(out_stride * height)?;

    for row in image.chunks_exact(stride).take(height) {
        for x in 0..width {
            let index = usize::from(get_component(row, x * samples, bits));
            expanded.push((red[index] >> 8) as u8);
            expanded.push((green[index] >> 8) as u8);
            expanded.push((blue[index] >> 8) as u8);

            if samples == 2 {
                let alpha = get_component(row, x * 2 + 1, bits);
                expanded.push((alpha << (8 - bits)) as u8);
            }
        }
    }

    Ok(expanded)
}
