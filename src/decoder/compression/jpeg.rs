use zune_jpeg::zune_core::bytestream::ZCursor;
use zune_jpeg::zune_core::colorspace::ColorSpace;
use zune_jpeg::zune_core::options::DecoderOptions;
use zune_jpeg::JpegDecoder;

use super::super::Limits;
use super::JpegParams;
use crate::error::{DecodeError, TiffResult};
use crate::TiffError;

/// Decode a self-contained JPEG strip of `rows` rows to interleaved 8 bit samples.
///
/// YCbCr data is converted to RGB by the JPEG decoder, gray and CMYK data are passed through.
/// The frame must be as wide as the image, carry one output component per sample and hold either
/// `rows` or a full strip of rows.
pub(super) fn decode(
    compressed: &[u8],
    params: &JpegParams,
    rows: usize,
    limits: &Limits,
) -> TiffResult<Vec<u8>> {
    let jpeg_error = |err: zune_jpeg::errors::DecodeErrors| {
        TiffError::DecodeError(DecodeError::Jpeg(format!("{:?}", err)))
    };

    let mut decoder = JpegDecoder::new(ZCursor::new(compressed));
    decoder.decode_headers().map_err(jpeg_error)?;

    let out_colorspace = match decoder.input_colorspace() {
        Some(ColorSpace::Luma) => ColorSpace::Luma,
        Some(ColorSpace::CMYK | ColorSpace::YCCK) => ColorSpace::CMYK,
        _ => ColorSpace::RGB,
    };
    let components = out_colorspace.num_components();

    let (width, height) = decoder
        .dimensions()
        .map(|(width, height)| (usize::from(width), usize::from(height)))
        .ok_or_else(|| DecodeError::Jpeg("missing frame header".into()))?;

    let fits_strip = width as u64 == u64::from(params.width)
        && components == usize::from(params.components)
        && (height == rows || height as u64 == u64::from(params.rows_per_strip));
    if !fits_strip {
        return Err(DecodeError::JpegFrameMismatch {
            width,
            height,
            components,
        }
        .into());
    }

    let size = width.saturating_mul(height).saturating_mul(components);
    if size > limits.intermediate_buffer_size {
        return Err(TiffError::LimitsExceeded);
    }

    let options = DecoderOptions::default().jpeg_set_out_colorspace(out_colorspace);
    decoder.set_options(options);

    let data = decoder.decode().map_err(jpeg_error)?;
    log::trace!(
        "jpeg strip: {}x{} {:?}, {} bytes",
        width,
        height,
        out_colorspace,
        data.len()
    );

    Ok(data)
}
