use std::ops::Range;

use crate::decoder::ifd::Entry;
use crate::decoder::stream::SmartReader;
use crate::decoder::Limits;
use crate::tags::{
    ByteOrder, CompressionMethod, ExtraSamples, FillOrder, PhotometricInterpretation,
    PlanarConfiguration, Predictor, ResolutionUnit, Tag,
};
use crate::{TiffError, TiffFormatError, TiffResult, TiffUnsupportedError};

/// The first Image File Directory (IFD) of a file, resolved into typed fields.
///
/// Fields absent from the file hold the defaults of the TIFF 6.0 baseline. The strip tables are
/// not validated against the geometry here, see
/// [`Decoder::decode`](crate::decoder::Decoder::decode).
#[doc(alias = "IFD")]
#[derive(Clone, Debug, PartialEq)]
pub struct TiffDirectory {
    pub byte_order: ByteOrder,
    pub subfile_type: u32,
    pub width: u32,
    pub height: u32,
    pub samples_per_pixel: u16,
    pub bits_per_sample: u16,
    pub compression: CompressionMethod,
    pub photometric_interpretation: PhotometricInterpretation,
    pub fill_order: FillOrder,
    pub planar_config: PlanarConfiguration,
    pub predictor: Predictor,
    /// Never larger than the image height.
    pub rows_per_strip: u32,
    pub extra_samples: Vec<ExtraSamples>,
    pub x_resolution: u32,
    pub y_resolution: u32,
    pub resolution_unit: ResolutionUnit,
    pub t4_options: u32,
    pub t6_options: u32,
    pub ycbcr_subsampling: (u16, u16),
    pub strip_offsets: Vec<u32>,
    pub strip_byte_counts: Vec<u32>,
    /// All red entries, then all green, then all blue.
    pub color_map: Option<Vec<u16>>,
    pub icc_profile: Option<Vec<u8>>,
    /// Location of shared JPEG tables in the source. These are recorded but never consumed.
    pub jpeg_tables: Option<Range<u64>>,
}

impl Default for TiffDirectory {
    fn default() -> Self {
        TiffDirectory {
            byte_order: ByteOrder::LittleEndian,
            subfile_type: 0,
            width: 0,
            height: 0,
            samples_per_pixel: 1,
            bits_per_sample: 1,
            compression: CompressionMethod::None,
            photometric_interpretation: PhotometricInterpretation::WhiteIsZero,
            fill_order: FillOrder::MsbFirst,
            planar_config: PlanarConfiguration::Chunky,
            predictor: Predictor::None,
            rows_per_strip: u32::MAX,
            extra_samples: Vec::new(),
            x_resolution: 0,
            y_resolution: 0,
            resolution_unit: ResolutionUnit::Inch,
            t4_options: 0,
            t6_options: 0,
            ycbcr_subsampling: (2, 2),
            strip_offsets: Vec::new(),
            strip_byte_counts: Vec::new(),
            color_map: None,
            icc_profile: None,
            jpeg_tables: None,
        }
    }
}

impl TiffDirectory {
    /// Resolve the entries of a directory.
    pub(crate) fn from_entries(
        reader: &SmartReader<'_>,
        entries: &[Entry],
        limits: &Limits,
    ) -> TiffResult<Self> {
        let mut dir = TiffDirectory {
            byte_order: reader.byte_order,
            ..TiffDirectory::default()
        };

        for entry in entries {
            dir.apply(reader, entry, limits)
                .map_err(|err| err.in_tag(entry.tag))?;
        }

        if dir.width == 0 || dir.height == 0 {
            return Err(TiffFormatError::InvalidDimensions(dir.width, dir.height).into());
        }

        dir.rows_per_strip = dir.rows_per_strip.min(dir.height);

        log::debug!(
            "directory: {}x{}, {} samples of {} bits, {:?}, {:?}, {} strips",
            dir.width,
            dir.height,
            dir.samples_per_pixel,
            dir.bits_per_sample,
            dir.compression,
            dir.photometric_interpretation,
            dir.strip_offsets.len(),
        );

        Ok(dir)
    }

    fn apply(&mut self, reader: &SmartReader<'_>, entry: &Entry, limits: &Limits) -> TiffResult<()> {
        let value = || entry.value(reader, limits);
        let short = || -> TiffResult<u16> { Ok(u16::try_from(entry.value(reader, limits)?)?) };

        match entry.tag {
            Tag::NewSubfileType => self.subfile_type = value()?,
            Tag::ImageWidth => self.width = value()?,
            Tag::ImageLength => self.height = value()?,
            Tag::BitsPerSample => self.bits_per_sample = Self::uniform_bits(reader, entry, limits)?,
            Tag::Compression => self.compression = CompressionMethod::from_u16_exhaustive(short()?),
            Tag::PhotometricInterpretation => {
                self.photometric_interpretation =
                    PhotometricInterpretation::from_u16_exhaustive(short()?)
            }
            Tag::FillOrder => self.fill_order = FillOrder::from_u16_exhaustive(short()?),
            Tag::StripOffsets => self.strip_offsets = entry.values(reader, limits)?,
            Tag::SamplesPerPixel => self.samples_per_pixel = short()?,
            Tag::RowsPerStrip => self.rows_per_strip = value()?,
            Tag::StripByteCounts => self.strip_byte_counts = entry.values(reader, limits)?,
            Tag::XResolution => self.x_resolution = value()?,
            Tag::YResolution => self.y_resolution = value()?,
            Tag::PlanarConfiguration => {
                self.planar_config = PlanarConfiguration::from_u16_exhaustive(short()?)
            }
            Tag::ResolutionUnit => self.resolution_unit = ResolutionUnit::from_u16_exhaustive(short()?),
            Tag::ColorMap => {
                let map = entry
                    .values(reader, limits)?
                    .into_iter()
                    .map(u16::try_from)
                    .collect::<Result<Vec<_>, _>>()?;
                self.color_map = Some(map);
            }
            Tag::ExtraSamples => {
                self.extra_samples = entry
                    .values(reader, limits)?
                    .into_iter()
                    .map(|v| u16::try_from(v).map(ExtraSamples::from_u16_exhaustive))
                    .collect::<Result<Vec<_>, _>>()?;
            }
            Tag::T4Options => self.t4_options = value()?,
            Tag::T6Options => self.t6_options = value()?,
            Tag::Predictor => self.predictor = Predictor::from_u16_exhaustive(short()?),
            Tag::YCbCrSubsampling => {
                if let [h, v, ..] = entry.values(reader, limits)?[..] {
                    self.ycbcr_subsampling = (u16::try_from(h)?, u16::try_from(v)?);
                }
            }
            Tag::IccProfile => self.icc_profile = Some(entry.raw_bytes(reader, limits)?.to_vec()),
            Tag::JPEGTables => self.jpeg_tables = Some(entry.byte_range()),
            tag if tag.is_tile_tag() => {
                return Err(TiffError::UnsupportedError(TiffUnsupportedError::Tiled))
            }
            tag => log::trace!("skipping tag {:?} ({:?}, {} values)", tag, entry.type_, entry.count),
        }

        Ok(())
    }

    /// One bit depth shared by all samples.
    fn uniform_bits(reader: &SmartReader<'_>, entry: &Entry, limits: &Limits) -> TiffResult<u16> {
        let bits = entry
            .values(reader, limits)?
            .into_iter()
            .map(u16::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let first = *bits
            .first()
            .ok_or(TiffFormatError::RequiredTagEmpty(Tag::BitsPerSample))?;
        if bits.iter().any(|&b| b != first) {
            return Err(TiffUnsupportedError::InconsistentBitsPerSample(bits).into());
        }

        Ok(first)
    }

    /// Whether the first extra sample is an alpha channel.
    pub fn has_alpha(&self) -> bool {
        matches!(
            self.extra_samples.first(),
            Some(ExtraSamples::AssociatedAlpha | ExtraSamples::UnassociatedAlpha)
        )
    }

    /// Number of strips covering the image height.
    pub fn strips_expected(&self) -> usize {
        if self.rows_per_strip == 0 {
            return 0;
        }

        self.height.div_ceil(self.rows_per_strip) as usize
    }
}
