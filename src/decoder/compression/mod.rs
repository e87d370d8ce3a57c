use std::io::{self, Read};

use super::stream::PackBitsReader;
#[cfg(feature = "deflate")]
use super::stream::DeflateReader;
#[cfg(feature = "lzw")]
use super::stream::LZWReader;
use super::Limits;
use crate::directory::TiffDirectory;
use crate::error::{DecodeError, TiffResult};
use crate::tags::{CompressionMethod, PhotometricInterpretation};
use crate::{TiffError, TiffUnsupportedError};

#[cfg(feature = "fax")]
mod fax;
#[cfg(feature = "jpeg")]
mod jpeg;

/// Parameters of the CCITT decoders, derived from the directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaxParams {
    /// Pixels per row.
    pub columns: u16,
    /// Rows of the whole image.
    pub rows: u32,
    /// Black pixels are stored as 1 bits.
    pub black_is_1: bool,
    /// Negative for Group 4, zero for one-dimensional Group 3, positive when Group 3 rows may
    /// be coded two-dimensionally.
    pub k: i32,
    /// Rows start on byte boundaries and carry no EOL markers.
    pub encoded_byte_align: bool,
}

/// Shape every JPEG strip of the image must decode to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JpegParams {
    /// Pixels per row.
    pub width: u32,
    /// Samples per pixel.
    pub components: u16,
    /// Rows of a full strip. The last strip may hold fewer.
    pub rows_per_strip: u32,
}

/// The decompressor for a strip, selected by the compression code.
///
/// Every variant fills the output buffer entirely or fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decompressor {
    None,
    PackBits,
    Lzw,
    Deflate,
    Fax(FaxParams),
    Jpeg(JpegParams),
}

impl Decompressor {
    /// Select the decompressor for the image described by `dir`.
    pub fn from_directory(dir: &TiffDirectory) -> TiffResult<Self> {
        let method = dir.compression;
        let unsupported = || {
            TiffError::UnsupportedError(TiffUnsupportedError::UnsupportedCompressionMethod(method))
        };

        Ok(match method {
            CompressionMethod::None => Decompressor::None,
            CompressionMethod::PackBits => Decompressor::PackBits,
            CompressionMethod::LZW if cfg!(feature = "lzw") => Decompressor::Lzw,
            CompressionMethod::Deflate | CompressionMethod::OldDeflate
                if cfg!(feature = "deflate") =>
            {
                Decompressor::Deflate
            }
            CompressionMethod::Huffman | CompressionMethod::Fax3 | CompressionMethod::Fax4
                if cfg!(feature = "fax") =>
            {
                let columns = u16::try_from(dir.width).map_err(|_| {
                    TiffUnsupportedError::UnsupportedDimensions(dir.width, dir.height)
                })?;
                let k = match method {
                    CompressionMethod::Fax4 => -1,
                    // Bit 0 of the Group 3 options selects two-dimensional coding.
                    CompressionMethod::Fax3 if dir.t4_options & 1 != 0 => 1,
                    _ => 0,
                };

                Decompressor::Fax(FaxParams {
                    columns,
                    rows: dir.height,
                    black_is_1: dir.photometric_interpretation
                        == PhotometricInterpretation::WhiteIsZero,
                    k,
                    encoded_byte_align: method == CompressionMethod::Huffman,
                })
            }
            CompressionMethod::JPEG => return Err(unsupported()),
            CompressionMethod::ModernJPEG if cfg!(feature = "jpeg") => {
                if dir.bits_per_sample != 8 {
                    return Err(
                        TiffUnsupportedError::UnsupportedBitsPerChannel(dir.bits_per_sample).into(),
                    );
                }

                Decompressor::Jpeg(JpegParams {
                    width: dir.width,
                    components: dir.samples_per_pixel,
                    rows_per_strip: dir.rows_per_strip,
                })
            }
            CompressionMethod::Unknown(code) => {
                return Err(TiffUnsupportedError::UnknownCompressionMethod(code).into())
            }
            _ => return Err(unsupported()),
        })
    }

    fn create_reader<'r>(
        &self,
        compressed: &'r [u8],
        expected: usize,
        limits: &Limits,
    ) -> TiffResult<Box<dyn Read + 'r>> {
        Ok(match *self {
            Decompressor::None => Box::new(compressed),
            Decompressor::PackBits => {
                Box::new(PackBitsReader::new(compressed, compressed.len() as u64))
            }
            #[cfg(feature = "lzw")]
            Decompressor::Lzw => {
                if expected > limits.intermediate_buffer_size
                    || compressed.len() > limits.intermediate_buffer_size
                {
                    return Err(TiffError::LimitsExceeded);
                }

                Box::new(LZWReader::new(compressed))
            }
            #[cfg(feature = "deflate")]
            Decompressor::Deflate => Box::new(DeflateReader::new(compressed)),
            #[cfg(feature = "fax")]
            Decompressor::Fax(params) => {
                if expected > limits.intermediate_buffer_size {
                    return Err(TiffError::LimitsExceeded);
                }

                Box::new(io::Cursor::new(fax::decode(compressed, &params, expected)?))
            }
            #[cfg(feature = "jpeg")]
            Decompressor::Jpeg(params) => {
                let row_bytes = (params.width as usize)
                    .checked_mul(usize::from(params.components))
                    .filter(|&len| len > 0)
                    .ok_or(TiffError::IntSizeError)?;
                let rows = expected / row_bytes;

                Box::new(io::Cursor::new(jpeg::decode(compressed, &params, rows, limits)?))
            }
            #[allow(unreachable_patterns)]
            _ => {
                return Err(TiffUnsupportedError::UnsupportedCompressionMethod(self.method()).into())
            }
        })
    }

    /// The compression method handled by this decompressor.
    pub fn method(&self) -> CompressionMethod {
        match *self {
            Decompressor::None => CompressionMethod::None,
            Decompressor::PackBits => CompressionMethod::PackBits,
            Decompressor::Lzw => CompressionMethod::LZW,
            Decompressor::Deflate => CompressionMethod::Deflate,
            Decompressor::Fax(FaxParams { k, .. }) if k < 0 => CompressionMethod::Fax4,
            Decompressor::Fax(FaxParams {
                encoded_byte_align: true,
                ..
            }) => CompressionMethod::Huffman,
            Decompressor::Fax(_) => CompressionMethod::Fax3,
            Decompressor::Jpeg(_) => CompressionMethod::ModernJPEG,
        }
    }

    /// Decompress `compressed` into exactly `out.len()` bytes.
    pub fn decode(&self, compressed: &[u8], out: &mut [u8], limits: &Limits) -> TiffResult<()> {
        let mut reader = self.create_reader(compressed, out.len(), limits)?;

        let mut filled = 0;
        while filled < out.len() {
            match reader.read(&mut out[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(DecodeError::Corrupt(e).into()),
            }
        }

        if filled < out.len() {
            return Err(DecodeError::Truncated {
                expected: out.len(),
                actual: filled,
            }
            .into());
        }

        Ok(())
    }
}
