use std::ops::Range;

use crate::directory::TiffDirectory;
use crate::tags::{ByteOrder, PhotometricInterpretation, Predictor, ResolutionUnit};
use crate::{ColorModel, TiffResult, TiffUnsupportedError};

use self::compression::Decompressor;
use self::image::StripLayout;
use self::samples::{get_component, put_component};
use self::stream::SmartReader;

pub use self::compression::{FaxParams, JpegParams};

mod compression;
pub mod ifd;
mod image;
mod palette;
mod predictor;
pub mod samples;
pub(crate) mod stream;

/// Resolution reported when the file carries none or an unusable one.
pub const DEFAULT_RESOLUTION: u32 = 96;

/// Decoding limits
#[derive(Clone, Debug)]
pub struct Limits {
    /// The maximum size of the decoded image in bytes, the default is 256MiB. Palette expansion
    /// may grow the image beyond this size by a factor of at most four.
    pub decoding_buffer_size: usize,
    /// The maximum size of any ifd value in bytes, the default is
    /// 1MiB.
    pub ifd_value_size: usize,
    /// Maximum size for intermediate buffers, such as the output of a fax or JPEG decoder and the
    /// compressed or decompressed size of an LZW strip.
    pub intermediate_buffer_size: usize,
    /// The purpose of this is to prevent all the fields of the struct from
    /// being public, as this would make adding new fields a major version
    /// bump.
    _non_exhaustive: (),
}

impl Limits {
    /// A configuration that does not impose any limits.
    ///
    /// This is a good start if the caller only wants to impose selective limits, contrary to the
    /// default limits which allows selectively disabling limits.
    ///
    /// Note that this configuration is likely to crash on excessively large images since,
    /// naturally, the machine running the program does not have infinite memory.
    pub fn unlimited() -> Limits {
        Limits {
            decoding_buffer_size: usize::MAX,
            ifd_value_size: usize::MAX,
            intermediate_buffer_size: usize::MAX,
            _non_exhaustive: (),
        }
    }
}

impl Default for Limits {
    fn default() -> Limits {
        Limits {
            decoding_buffer_size: 256 * 1024 * 1024,
            intermediate_buffer_size: 128 * 1024 * 1024,
            ifd_value_size: 1024 * 1024,
            _non_exhaustive: (),
        }
    }
}

/// A condition that did not prevent decoding but may affect the result.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum DecodeWarning {
    /// Shared JPEG tables at this location of the file were not used. Strips relying on them fail
    /// to decode.
    JpegTablesIgnored(Range<u64>),
}

/// A fully decoded image.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    /// Samples per pixel, including any extra sample.
    pub components: u16,
    /// Bits per sample, 8 after palette expansion.
    pub bits_per_sample: u16,
    /// Bytes per row. Rows of sub-byte samples are padded to a whole byte.
    pub stride: usize,
    pub color_model: ColorModel,
    pub has_alpha: bool,
    /// Horizontal resolution in dots per inch.
    pub x_resolution: u32,
    /// Vertical resolution in dots per inch.
    pub y_resolution: u32,
    pub icc_profile: Option<Vec<u8>>,
    /// Interleaved samples, `stride * height` bytes. 16 bit samples are big endian.
    pub samples: Vec<u8>,
    pub warnings: Vec<DecodeWarning>,
}

/// The representation of a TIFF decoder
///
/// Only the first image of a file is decoded, from strips in chunky planar configuration.
#[derive(Debug)]
pub struct Decoder<'a> {
    reader: SmartReader<'a>,
    ifd_offset: u32,
    limits: Limits,
    directory: Option<TiffDirectory>,
}

/// Decode the first image of a TIFF file with the default limits.
pub fn decode(data: &[u8]) -> TiffResult<DecodedImage> {
    Decoder::new(data)?.decode()
}

impl<'a> Decoder<'a> {
    /// Create a new decoder over an in-memory file, checking its header.
    pub fn new(data: &'a [u8]) -> TiffResult<Decoder<'a>> {
        let (reader, ifd_offset) = ifd::read_header(data)?;

        log::debug!(
            "tiff: {:?}, {} bytes, first directory at {}",
            reader.byte_order,
            reader.size(),
            ifd_offset
        );

        Ok(Decoder {
            reader,
            ifd_offset,
            limits: Default::default(),
            directory: None,
        })
    }

    pub fn with_limits(mut self, limits: Limits) -> Decoder<'a> {
        self.limits = limits;
        self
    }

    /// The byte order of the file.
    pub fn byte_order(&self) -> ByteOrder {
        self.reader.byte_order
    }

    /// The first directory of the file, read on first use.
    pub fn directory(&mut self) -> TiffResult<&TiffDirectory> {
        let directory = match self.directory.take() {
            Some(directory) => directory,
            None => {
                let entries = ifd::read_directory(&self.reader, self.ifd_offset, &self.limits)?;
                TiffDirectory::from_entries(&self.reader, &entries, &self.limits)?
            }
        };

        Ok(self.directory.insert(directory))
    }

    /// Decode the image into interleaved samples.
    pub fn decode(&mut self) -> TiffResult<DecodedImage> {
        let reader = self.reader;
        let limits = self.limits.clone();
        let dir = self.directory()?;

        let color_model = ColorModel::from_photometric(dir.photometric_interpretation)?;

        let mut bits = dir.bits_per_sample;
        if !matches!(bits, 1 | 2 | 4 | 8 | 16) {
            return Err(TiffUnsupportedError::UnsupportedBitsPerChannel(bits).into());
        }

        let mut components = dir.samples_per_pixel;
        if components == 0 {
            return Err(TiffUnsupportedError::UnsupportedSampleDepth(components).into());
        }

        // Palette indices expand to three channels, see `palette::expand_palette`.
        let is_palette = dir.photometric_interpretation == PhotometricInterpretation::RGBPalette;
        if !is_palette && components < color_model.channels() {
            return Err(TiffUnsupportedError::UnsupportedSampleDepth(components).into());
        }

        let decompressor = Decompressor::from_directory(dir)?;
        let layout = StripLayout::new(dir)?;
        log::debug!(
            "decoding {} strips of {} rows with {:?}",
            layout.strip_count,
            layout.rows_per_strip,
            decompressor.method()
        );

        let mut warnings = Vec::new();
        if let Some(tables) = &dir.jpeg_tables {
            log::warn!(
                "ignoring {} bytes of JPEG tables at offset {}",
                tables.end - tables.start,
                tables.start
            );
            warnings.push(DecodeWarning::JpegTablesIgnored(tables.clone()));
        }

        let mut samples = image::read_strips(&reader, dir, &layout, &decompressor, &limits)?;
        let mut stride = layout.stride;
        let width = dir.width as usize;
        let height = layout.height;

        if matches!(decompressor, Decompressor::Lzw | Decompressor::Deflate)
            && dir.predictor == Predictor::Horizontal
        {
            predictor::rev_hpredict_nsamp(
                &mut samples,
                stride,
                (width, usize::from(components)),
                bits as u8,
                dir.byte_order,
            );
        }

        if is_palette {
            let color_map = dir
                .color_map
                .as_deref()
                .ok_or(TiffUnsupportedError::MissingColorMap)?;
            samples = palette::expand_palette(
                &samples,
                stride,
                (width, height),
                components,
                bits,
                color_map,
            )?;
            components += 2;
            bits = 8;
            stride = width * usize::from(components);
        }

        if dir.photometric_interpretation == PhotometricInterpretation::WhiteIsZero {
            let skip_last = !dir.extra_samples.is_empty();
            Self::invert_colors(
                &mut samples,
                stride,
                (width, usize::from(components)),
                bits as u8,
                skip_last,
            );
        }

        if bits == 16 {
            Self::fix_endianness(&mut samples, dir.byte_order);
        }

        let (x_resolution, y_resolution) = Self::resolution_dpi(dir);

        Ok(DecodedImage {
            width: dir.width,
            height: dir.height,
            components,
            bits_per_sample: bits,
            stride,
            color_model,
            has_alpha: dir.has_alpha(),
            x_resolution,
            y_resolution,
            icc_profile: dir.icc_profile.clone(),
            samples,
            warnings,
        })
    }

    /// Replace every sample `v` with `max - v`, leaving the last channel alone when `skip_last`.
    fn invert_colors(
        buffer: &mut [u8],
        stride: usize,
        (width, samples): (usize, usize),
        bits: u8,
        skip_last: bool,
    ) {
        let max = ((1u32 << bits) - 1) as u16;
        let inverted = if skip_last { samples - 1 } else { samples };

        for row in buffer.chunks_exact_mut(stride) {
            for x in 0..width {
                for k in 0..inverted {
                    let index = x * samples + k;
                    let value = get_component(row, index, bits);
                    put_component(row, index, bits, max - value);
                }
            }
        }
    }

    /// Bring 16 bit samples into big endian order.
    fn fix_endianness(buffer: &mut [u8], byte_order: ByteOrder) {
        byte_order.convert_u16(buffer, ByteOrder::BigEndian);
    }

    /// Resolution in dots per inch, falling back to 96 for unknown units and zero values.
    fn resolution_dpi(dir: &TiffDirectory) -> (u32, u32) {
        let to_inch = |v: u32| (f64::from(v) * 2.54 + 0.5) as u32;

        let (x, y) = match dir.resolution_unit {
            ResolutionUnit::Inch => (dir.x_resolution, dir.y_resolution),
            ResolutionUnit::Centimeter => (to_inch(dir.x_resolution), to_inch(dir.y_resolution)),
            _ => (DEFAULT_RESOLUTION, DEFAULT_RESOLUTION),
        };

        if x == 0 || y == 0 {
            (DEFAULT_RESOLUTION, DEFAULT_RESOLUTION)
        } else {
            (x, y)
        }
    }
}
