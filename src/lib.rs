//! Decoding of baseline TIFF images
//!
//! TIFF (Tagged Image File Format) is a versatile image format that supports
//! lossless and lossy compression. This crate decodes the first image of a file held in memory
//! into interleaved samples, as needed by document renderers embedding TIFF images.
//!
//! Supported are strips in chunky planar configuration at 1, 2, 4, 8 and 16 bits per sample,
//! stored uncompressed or compressed with PackBits, LZW, Deflate, CCITT modified Huffman, Group 3
//! (1-D and 2-D) and Group 4, and JPEG.
//!
//! ```no_run
//! # fn main() -> tiff_baseline::TiffResult<()> {
//! let data = std::fs::read("scan.tif").unwrap();
//! let image = tiff_baseline::decoder::decode(&data)?;
//! println!("{}x{} {:?}", image.width, image.height, image.color_model);
//! # Ok(())
//! # }
//! ```
//!
//! # Related Links
//! * <https://web.archive.org/web/20210108073850/https://www.adobe.io/open/standards/TIFF.html> - The TIFF specification

pub mod decoder;
mod directory;
mod error;
pub mod tags;

pub use self::directory::TiffDirectory;
pub use self::error::{
    DecodeError, ErrorKind, TiffError, TiffFormatError, TiffResult, TiffUnsupportedError,
};

use self::tags::PhotometricInterpretation;

/// The color model of decoded samples
#[derive(Copy, PartialEq, Eq, Debug, Clone, Hash)]
pub enum ColorModel {
    /// One sample per pixel, plus an optional extra sample
    Gray,
    /// Red, green and blue samples, plus an optional extra sample
    Rgb,
    /// Cyan, magenta, yellow and black samples, plus an optional extra sample
    Cmyk,
}

impl ColorModel {
    /// The color model of an image after decoding.
    ///
    /// Palette images are expanded to RGB, YCbCr data is converted to RGB while decoding.
    pub fn from_photometric(interpretation: PhotometricInterpretation) -> TiffResult<Self> {
        match interpretation {
            PhotometricInterpretation::WhiteIsZero | PhotometricInterpretation::BlackIsZero => {
                Ok(ColorModel::Gray)
            }
            PhotometricInterpretation::RGB
            | PhotometricInterpretation::RGBPalette
            | PhotometricInterpretation::YCbCr => Ok(ColorModel::Rgb),
            PhotometricInterpretation::CMYK => Ok(ColorModel::Cmyk),
            PhotometricInterpretation::Unknown(code) => {
                Err(TiffUnsupportedError::UnknownInterpretation(code).into())
            }
            other => Err(TiffUnsupportedError::UnsupportedInterpretation(other).into()),
        }
    }

    /// Number of color samples per pixel.
    pub fn channels(&self) -> u16 {
        match *self {
            ColorModel::Gray => 1,
            ColorModel::Rgb => 3,
            ColorModel::Cmyk => 4,
        }
    }
}
