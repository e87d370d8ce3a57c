use super::compression::Decompressor;
use super::samples::row_bytes;
use super::stream::SmartReader;
use super::Limits;
use crate::directory::TiffDirectory;
use crate::tags::{FillOrder, PlanarConfiguration};
use crate::{TiffError, TiffFormatError, TiffResult, TiffUnsupportedError};

/// Geometry of the strips of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StripLayout {
    /// Bytes per row, padded to a whole byte.
    pub stride: usize,
    pub rows_per_strip: usize,
    pub height: usize,
    pub strip_count: usize,
}

impl StripLayout {
    /// Validates the strip tables of `dir` against its geometry.
    pub fn new(dir: &TiffDirectory) -> TiffResult<Self> {
        if dir.rows_per_strip == 0 || dir.strip_offsets.is_empty() || dir.strip_byte_counts.is_empty()
        {
            return Err(TiffUnsupportedError::MissingStripData.into());
        }

        if dir.planar_config != PlanarConfiguration::Chunky {
            return Err(TiffUnsupportedError::UnsupportedPlanarConfig(dir.planar_config).into());
        }

        let expected = dir.strips_expected();
        if dir.strip_offsets.len() != expected || dir.strip_byte_counts.len() != expected {
            return Err(TiffFormatError::InconsistentStripTables {
                offsets: dir.strip_offsets.len(),
                byte_counts: dir.strip_byte_counts.len(),
                expected,
            }
            .into());
        }

        let samples = u64::from(dir.width) * u64::from(dir.samples_per_pixel);
        let bits = u8::try_from(dir.bits_per_sample)?;
        let stride = row_bytes(samples, bits).ok_or(TiffError::IntSizeError)?;

        Ok(StripLayout {
            stride: usize::try_from(stride)?,
            rows_per_strip: usize::try_from(dir.rows_per_strip)?,
            height: usize::try_from(dir.height)?,
            strip_count: expected,
        })
    }

    /// Size of the whole decoded image.
    pub fn image_bytes(&self) -> TiffResult<usize> {
        self.stride
            .checked_mul(self.height)
            .ok_or(TiffError::IntSizeError)
    }

    /// Bytes covered by a full strip.
    pub fn strip_bytes(&self) -> TiffResult<usize> {
        self.stride
            .checked_mul(self.rows_per_strip)
            .ok_or(TiffError::IntSizeError)
    }
}

/// Decompress all strips into one buffer of `stride * height` bytes.
pub(crate) fn read_strips(
    reader: &SmartReader<'_>,
    dir: &TiffDirectory,
    layout: &StripLayout,
    decompressor: &Decompressor,
    limits: &Limits,
) -> TiffResult<Vec<u8>> {
    let total = layout.image_bytes()?;
    if total > limits.decoding_buffer_size {
        return Err(TiffError::LimitsExceeded);
    }

    let mut image = Vec::new();
    image.try_reserve_exact(total)?;
    image.resize(total, 0);

    let span = layout.strip_bytes()?;
    let mut scratch = Vec::new();
    let mut position = 0;

    let strips = dir.strip_offsets.iter().zip(&dir.strip_byte_counts);
    for (index, (&offset, &length)) in strips.enumerate().take(layout.strip_count) {
        if position >= total {
            break;
        }

        let compressed = reader
            .bytes_at(u64::from(offset), u64::from(length))
            .map_err(|err| err.in_strip(index))?;

        let compressed = if dir.fill_order == FillOrder::LsbFirst {
            scratch.clear();
            scratch
                .try_reserve(compressed.len())
                .map_err(|err| TiffError::from(err).in_strip(index))?;
            scratch.extend(compressed.iter().map(|b| b.reverse_bits()));
            &scratch[..]
        } else {
            compressed
        };

        // The final strip may cover rows past the end of the image.
        let end = position.saturating_add(span).min(total);
        log::trace!(
            "strip {}: {} bytes at {} into {}..{}",
            index,
            length,
            offset,
            position,
            end
        );

        decompressor
            .decode(compressed, &mut image[position..end], limits)
            .map_err(|err| err.in_strip(index))?;

        position = position.saturating_add(span);
    }

    Ok(image)
}
