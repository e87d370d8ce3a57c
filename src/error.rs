use std::collections::TryReserveError;
use std::error::Error;
use std::fmt;
use std::io;
use std::num::TryFromIntError;

use crate::tags::{CompressionMethod, PhotometricInterpretation, PlanarConfiguration, Tag};

/// Tiff error kinds.
#[derive(Debug)]
#[non_exhaustive]
pub enum TiffError {
    /// The Image is not formatted properly.
    FormatError(TiffFormatError),

    /// The Decoder does not support features required by the image.
    UnsupportedError(TiffUnsupportedError),

    /// A read of `len` bytes at `offset` does not fit into a buffer of `size` bytes.
    OutOfBounds { offset: u64, len: u64, size: usize },

    /// A compressed strip could not be decompressed.
    DecodeError(DecodeError),

    /// The Limits of the Decoder is exceeded.
    LimitsExceeded,

    /// The allocator refused a buffer of the requested size.
    AllocationError(TryReserveError),

    /// An integer conversion to or from a platform size failed.
    IntSizeError,

    /// An error occurred while reading the given tag.
    Tag { tag: Tag, source: Box<TiffError> },

    /// An error occurred while decoding the given strip.
    Strip { index: usize, source: Box<TiffError> },
}

/// The broad category of a [`TiffError`], independent of any attached context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad magic, bad version or a garbled directory.
    MalformedHeader,
    /// Tiled storage, non-chunky planar layout, old-style JPEG and similar.
    UnsupportedFeature,
    /// The compression code is not known to the decoder.
    UnsupportedCompression,
    /// The photometric interpretation is not known to the decoder.
    UnsupportedPhotometric,
    /// A strip or a directory value lies outside of the source buffer.
    OutOfBounds,
    /// A scratch or output buffer could not be allocated.
    AllocationFailure,
    /// A decompressor failed or produced too few bytes.
    DecodeFailure,
}

/// The image is not formatted properly.
///
/// This indicates that the encoder producing the image might behave incorrectly or that the input
/// file has been corrupted.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum TiffFormatError {
    TiffSignatureNotFound,
    TiffSignatureInvalid,
    ImageFileDirectoryNotFound,
    InvalidDimensions(u32, u32),
    InvalidTagValueType(Tag),
    RequiredTagEmpty(Tag),
    InconsistentStripTables { offsets: usize, byte_counts: usize, expected: usize },
    InvalidColorMap { entries: usize, expected: usize },
}

impl fmt::Display for TiffFormatError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        use self::TiffFormatError::*;
        match *self {
            TiffSignatureNotFound => write!(fmt, "TIFF signature not found."),
            TiffSignatureInvalid => write!(fmt, "TIFF signature invalid."),
            ImageFileDirectoryNotFound => write!(fmt, "Image file directory not found."),
            InvalidDimensions(width, height) => {
                write!(fmt, "Invalid dimensions: {}x{}.", width, height)
            }
            InvalidTagValueType(ref tag) => {
                write!(fmt, "Tag `{:?}` did not have the expected value type.", tag)
            }
            RequiredTagEmpty(ref tag) => write!(fmt, "Required tag `{:?}` was empty.", tag),
            InconsistentStripTables {
                offsets,
                byte_counts,
                expected,
            } => write!(
                fmt,
                "Strip tables are inconsistent: {} offsets, {} byte counts, {} strips expected.",
                offsets, byte_counts, expected
            ),
            InvalidColorMap { entries, expected } => write!(
                fmt,
                "Color map has {} entries, expected {}.",
                entries, expected
            ),
        }
    }
}

/// The Decoder does not support features required by the image.
///
/// This only captures known failures for which the standard either does not require support or an
/// implementation has been planned but not yet completed. Some variants may become unused over
/// time and will then get deprecated before being removed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum TiffUnsupportedError {
    /// Tile tags are present, only strips are decoded.
    Tiled,
    /// The image has no strip tables at all.
    MissingStripData,
    UnsupportedPlanarConfig(PlanarConfiguration),
    UnsupportedBitsPerChannel(u16),
    InconsistentBitsPerSample(Vec<u16>),
    UnsupportedSampleDepth(u16),
    UnknownCompressionMethod(u16),
    UnsupportedCompressionMethod(CompressionMethod),
    UnknownInterpretation(u16),
    UnsupportedInterpretation(PhotometricInterpretation),
    /// A palette image whose layout can not be expanded to RGB.
    UnsupportedPalette { samples: u16, bits: u16 },
    MissingColorMap,
    UnsupportedDimensions(u32, u32),
}

impl fmt::Display for TiffUnsupportedError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        use self::TiffUnsupportedError::*;
        match *self {
            Tiled => write!(fmt, "Tiled images are not supported."),
            MissingStripData => write!(fmt, "No strip data in image, possibly tiled."),
            UnsupportedPlanarConfig(config) => {
                write!(fmt, "Unsupported planar configuration {:?}.", config)
            }
            UnsupportedBitsPerChannel(bits) => {
                write!(fmt, "{} bits per channel not supported.", bits)
            }
            InconsistentBitsPerSample(ref bits) => {
                write!(fmt, "Differing bits per sample {:?} not supported.", bits)
            }
            UnsupportedSampleDepth(samples) => {
                write!(fmt, "{} samples per pixel is not supported.", samples)
            }
            UnknownCompressionMethod(code) => {
                write!(fmt, "Unknown compression method {}.", code)
            }
            UnsupportedCompressionMethod(method) => {
                write!(fmt, "Compression method {:?} is unsupported", method)
            }
            UnknownInterpretation(code) => {
                write!(fmt, "Unknown photometric interpretation {}.", code)
            }
            UnsupportedInterpretation(interpretation) => write!(
                fmt,
                "Photometric interpretation {:?} is unsupported.",
                interpretation
            ),
            UnsupportedPalette { samples, bits } => write!(
                fmt,
                "Palette images with {} samples of {} bits are unsupported.",
                samples, bits
            ),
            MissingColorMap => write!(fmt, "Palette image without a color map."),
            UnsupportedDimensions(width, height) => {
                write!(fmt, "Dimensions {}x{} are unsupported.", width, height)
            }
        }
    }
}

/// A decompressor reported an error or ended early.
#[derive(Debug)]
#[non_exhaustive]
pub enum DecodeError {
    /// The decompressor ended after `actual` of `expected` bytes.
    Truncated { expected: usize, actual: usize },
    /// The compressed data is corrupt.
    Corrupt(io::Error),
    /// The JPEG decoder rejected the stream.
    Jpeg(String),
    /// The JPEG frame does not have the shape of the strip holding it.
    JpegFrameMismatch {
        width: usize,
        height: usize,
        components: usize,
    },
    /// The fax decoder could not decode the stream.
    Fax,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            DecodeError::Truncated { expected, actual } => write!(
                fmt,
                "decompressed data ended after {} of {} bytes",
                actual, expected
            ),
            DecodeError::Corrupt(ref e) => write!(fmt, "corrupt compressed data: {}", e),
            DecodeError::Jpeg(ref e) => write!(fmt, "jpeg: {}", e),
            DecodeError::JpegFrameMismatch {
                width,
                height,
                components,
            } => write!(
                fmt,
                "jpeg frame of {}x{} with {} components does not match the strip",
                width, height, components
            ),
            DecodeError::Fax => write!(fmt, "invalid CCITT fax data"),
        }
    }
}

impl TiffError {
    /// Classify the error, looking through any context wrappers.
    pub fn kind(&self) -> ErrorKind {
        match *self {
            TiffError::FormatError(_) => ErrorKind::MalformedHeader,
            TiffError::UnsupportedError(ref e) => match *e {
                // Old-style JPEG is a known method without a decoder.
                TiffUnsupportedError::UnsupportedCompressionMethod(CompressionMethod::JPEG) => {
                    ErrorKind::UnsupportedFeature
                }
                TiffUnsupportedError::UnknownCompressionMethod(_)
                | TiffUnsupportedError::UnsupportedCompressionMethod(_) => {
                    ErrorKind::UnsupportedCompression
                }
                TiffUnsupportedError::UnknownInterpretation(_)
                | TiffUnsupportedError::UnsupportedInterpretation(_) => {
                    ErrorKind::UnsupportedPhotometric
                }
                _ => ErrorKind::UnsupportedFeature,
            },
            TiffError::OutOfBounds { .. } => ErrorKind::OutOfBounds,
            TiffError::DecodeError(_) => ErrorKind::DecodeFailure,
            TiffError::LimitsExceeded | TiffError::AllocationError(_) => {
                ErrorKind::AllocationFailure
            }
            TiffError::IntSizeError => ErrorKind::MalformedHeader,
            TiffError::Tag { ref source, .. } | TiffError::Strip { ref source, .. } => {
                source.kind()
            }
        }
    }

    /// Strip all context wrappers.
    pub fn root(&self) -> &TiffError {
        match *self {
            TiffError::Tag { ref source, .. } | TiffError::Strip { ref source, .. } => {
                source.root()
            }
            ref other => other,
        }
    }

    pub(crate) fn in_tag(self, tag: Tag) -> TiffError {
        TiffError::Tag {
            tag,
            source: Box::new(self),
        }
    }

    pub(crate) fn in_strip(self, index: usize) -> TiffError {
        TiffError::Strip {
            index,
            source: Box::new(self),
        }
    }
}

impl fmt::Display for TiffError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match *self {
            TiffError::FormatError(ref e) => write!(fmt, "Format error: {}", e),
            TiffError::UnsupportedError(ref f) => write!(
                fmt,
                "The Decoder does not support the \
                 image format `{}`",
                f
            ),
            TiffError::OutOfBounds { offset, len, size } => write!(
                fmt,
                "{} bytes at offset {} extend beyond the end of the {} byte file",
                len, offset, size
            ),
            TiffError::DecodeError(ref e) => write!(fmt, "Decode error: {}", e),
            TiffError::LimitsExceeded => write!(fmt, "The Decoder limits are exceeded"),
            TiffError::AllocationError(ref e) => write!(fmt, "Allocation failed: {}", e),
            TiffError::IntSizeError => write!(fmt, "Platform or format size limits exceeded"),
            TiffError::Tag { tag, ref source } => {
                write!(fmt, "could not read tag {:?}: {}", tag, source)
            }
            TiffError::Strip { index, ref source } => {
                write!(fmt, "could not decode strip {}: {}", index, source)
            }
        }
    }
}

impl Error for TiffError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match *self {
            TiffError::DecodeError(DecodeError::Corrupt(ref e)) => Some(e),
            TiffError::AllocationError(ref e) => Some(e),
            TiffError::Tag { ref source, .. } | TiffError::Strip { ref source, .. } => {
                Some(source.as_ref())
            }
            _ => None,
        }
    }
}

impl From<TiffFormatError> for TiffError {
    fn from(err: TiffFormatError) -> TiffError {
        TiffError::FormatError(err)
    }
}

impl From<TiffUnsupportedError> for TiffError {
    fn from(err: TiffUnsupportedError) -> TiffError {
        TiffError::UnsupportedError(err)
    }
}

impl From<DecodeError> for TiffError {
    fn from(err: DecodeError) -> TiffError {
        TiffError::DecodeError(err)
    }
}

impl From<TryFromIntError> for TiffError {
    fn from(_err: TryFromIntError) -> TiffError {
        TiffError::IntSizeError
    }
}

impl From<TryReserveError> for TiffError {
    fn from(err: TryReserveError) -> TiffError {
        TiffError::AllocationError(err)
    }
}

/// Result of an image decoding process
pub type TiffResult<T> = Result<T, TiffError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_looks_through_context() {
        let err = TiffError::OutOfBounds {
            offset: 10,
            len: 4,
            size: 12,
        }
        .in_tag(Tag::StripOffsets)
        .in_strip(3);

        assert_eq!(err.kind(), ErrorKind::OutOfBounds);
        assert!(matches!(err.root(), TiffError::OutOfBounds { offset: 10, .. }));
        assert_eq!(
            err.to_string(),
            "could not decode strip 3: could not read tag StripOffsets: \
             4 bytes at offset 10 extend beyond the end of the 12 byte file"
        );
    }

    #[test]
    fn unsupported_kinds() {
        let compression: TiffError = TiffUnsupportedError::UnknownCompressionMethod(99).into();
        assert_eq!(compression.kind(), ErrorKind::UnsupportedCompression);

        let photometric: TiffError = TiffUnsupportedError::UnknownInterpretation(4).into();
        assert_eq!(photometric.kind(), ErrorKind::UnsupportedPhotometric);

        let tiled: TiffError = TiffUnsupportedError::Tiled.into();
        assert_eq!(tiled.kind(), ErrorKind::UnsupportedFeature);

        let old_jpeg: TiffError =
            TiffUnsupportedError::UnsupportedCompressionMethod(CompressionMethod::JPEG).into();
        assert_eq!(old_jpeg.kind(), ErrorKind::UnsupportedFeature);
    }
}
