#![allow(dead_code)]

//! Assembles TIFF files in memory.

pub const BYTE: u16 = 1;
pub const SHORT: u16 = 3;
pub const LONG: u16 = 4;
pub const RATIONAL: u16 = 5;
pub const UNDEFINED: u16 = 7;

pub const IMAGE_WIDTH: u16 = 256;
pub const IMAGE_LENGTH: u16 = 257;
pub const BITS_PER_SAMPLE: u16 = 258;
pub const COMPRESSION: u16 = 259;
pub const PHOTOMETRIC: u16 = 262;
pub const FILL_ORDER: u16 = 266;
pub const STRIP_OFFSETS: u16 = 273;
pub const SAMPLES_PER_PIXEL: u16 = 277;
pub const ROWS_PER_STRIP: u16 = 278;
pub const STRIP_BYTE_COUNTS: u16 = 279;
pub const X_RESOLUTION: u16 = 282;
pub const Y_RESOLUTION: u16 = 283;
pub const PLANAR_CONFIGURATION: u16 = 284;
pub const T4_OPTIONS: u16 = 292;
pub const RESOLUTION_UNIT: u16 = 296;
pub const PREDICTOR: u16 = 317;
pub const COLOR_MAP: u16 = 320;
pub const TILE_WIDTH: u16 = 322;
pub const EXTRA_SAMPLES: u16 = 338;
pub const JPEG_TABLES: u16 = 347;
pub const ICC_PROFILE: u16 = 34675;

struct RawEntry {
    tag: u16,
    type_: u16,
    count: u32,
    /// Already in file byte order.
    data: Vec<u8>,
}

/// Builder for single image TIFF files.
///
/// Strip offsets and byte counts are filled in from the strips handed to [`TiffBuilder::strips`].
pub struct TiffBuilder {
    little_endian: bool,
    entries: Vec<RawEntry>,
    strips: Vec<Vec<u8>>,
    strips_last: bool,
}

impl TiffBuilder {
    pub fn new(little_endian: bool) -> Self {
        TiffBuilder {
            little_endian,
            entries: Vec::new(),
            strips: Vec::new(),
            strips_last: false,
        }
    }

    /// The geometry and layout tags of an image.
    pub fn image(
        little_endian: bool,
        (width, height): (u32, u32),
        samples: u16,
        bits: u16,
        photometric: u16,
    ) -> Self {
        TiffBuilder::new(little_endian)
            .long(IMAGE_WIDTH, &[width])
            .long(IMAGE_LENGTH, &[height])
            .short(BITS_PER_SAMPLE, &vec![bits; usize::from(samples)])
            .short(SAMPLES_PER_PIXEL, &[samples])
            .short(PHOTOMETRIC, &[photometric])
    }

    fn u16_bytes(&self, v: u16) -> [u8; 2] {
        if self.little_endian {
            v.to_le_bytes()
        } else {
            v.to_be_bytes()
        }
    }

    fn u32_bytes(&self, v: u32) -> [u8; 4] {
        if self.little_endian {
            v.to_le_bytes()
        } else {
            v.to_be_bytes()
        }
    }

    fn push(mut self, tag: u16, type_: u16, count: u32, data: Vec<u8>) -> Self {
        self.entries.retain(|e| e.tag != tag);
        self.entries.push(RawEntry {
            tag,
            type_,
            count,
            data,
        });
        self
    }

    pub fn short(self, tag: u16, values: &[u16]) -> Self {
        let data = values.iter().flat_map(|&v| self.u16_bytes(v)).collect();
        self.push(tag, SHORT, values.len() as u32, data)
    }

    pub fn long(self, tag: u16, values: &[u32]) -> Self {
        let data = values.iter().flat_map(|&v| self.u32_bytes(v)).collect();
        self.push(tag, LONG, values.len() as u32, data)
    }

    pub fn rational(self, tag: u16, numerator: u32, denominator: u32) -> Self {
        let mut data = self.u32_bytes(numerator).to_vec();
        data.extend_from_slice(&self.u32_bytes(denominator));
        self.push(tag, RATIONAL, 1, data)
    }

    /// An entry of single byte values.
    pub fn bytes(self, tag: u16, type_: u16, values: &[u8]) -> Self {
        self.push(tag, type_, values.len() as u32, values.to_vec())
    }

    /// An entry with arbitrary type and count whose data is given in file byte order.
    pub fn raw(self, tag: u16, type_: u16, count: u32, data: Vec<u8>) -> Self {
        self.push(tag, type_, count, data)
    }

    pub fn rows_per_strip(self, rows: u32) -> Self {
        self.long(ROWS_PER_STRIP, &[rows])
    }

    pub fn compression(self, code: u16) -> Self {
        self.short(COMPRESSION, &[code])
    }

    pub fn strips(mut self, strips: Vec<Vec<u8>>) -> Self {
        self.strips = strips;
        self
    }

    /// Place the strip data after the directory, so truncating the file cuts into strips first.
    pub fn strips_last(mut self) -> Self {
        self.strips_last = true;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let offsets_entry;
        let counts_entry;
        let strips_size: usize = self.strips.iter().map(Vec::len).sum();
        let mut entries: Vec<&RawEntry> = self
            .entries
            .iter()
            .filter(|e| e.tag != STRIP_OFFSETS && e.tag != STRIP_BYTE_COUNTS)
            .collect();

        // Strip tables are written as LONG values.
        let strip_entries = 2 * usize::from(!self.strips.is_empty());
        let entry_count = entries.len() + strip_entries;
        let table_values = if self.strips.len() > 1 {
            2 * 4 * self.strips.len()
        } else {
            0
        };
        let ifd_size = 2 + 12 * entry_count + 4;
        let values_size: usize = entries
            .iter()
            .filter(|e| e.data.len() > 4)
            .map(|e| e.data.len())
            .sum::<usize>()
            + table_values;

        let (strips_start, values_start, ifd_start) = if self.strips_last {
            let ifd_start = 8;
            let values_start = ifd_start + ifd_size;
            (values_start + values_size, values_start, ifd_start)
        } else {
            let values_start = 8 + strips_size;
            (8, values_start, values_start + values_size)
        };

        let mut strip_offsets = Vec::new();
        let mut position = strips_start;
        for strip in &self.strips {
            strip_offsets.push(position as u32);
            position += strip.len();
        }
        let strip_counts: Vec<u32> = self.strips.iter().map(|s| s.len() as u32).collect();

        if !self.strips.is_empty() {
            offsets_entry = RawEntry {
                tag: STRIP_OFFSETS,
                type_: LONG,
                count: strip_offsets.len() as u32,
                data: strip_offsets.iter().flat_map(|&v| self.u32_bytes(v)).collect(),
            };
            counts_entry = RawEntry {
                tag: STRIP_BYTE_COUNTS,
                type_: LONG,
                count: strip_counts.len() as u32,
                data: strip_counts.iter().flat_map(|&v| self.u32_bytes(v)).collect(),
            };
            entries.push(&offsets_entry);
            entries.push(&counts_entry);
        }
        entries.sort_by_key(|e| e.tag);

        let mut values = Vec::new();
        let mut ifd = Vec::new();
        ifd.extend_from_slice(&self.u16_bytes(entries.len() as u16));
        for entry in &entries {
            ifd.extend_from_slice(&self.u16_bytes(entry.tag));
            ifd.extend_from_slice(&self.u16_bytes(entry.type_));
            ifd.extend_from_slice(&self.u32_bytes(entry.count));
            if entry.data.len() <= 4 {
                let mut inline = entry.data.clone();
                inline.resize(4, 0);
                ifd.extend_from_slice(&inline);
            } else {
                let offset = (values_start + values.len()) as u32;
                ifd.extend_from_slice(&self.u32_bytes(offset));
                values.extend_from_slice(&entry.data);
            }
        }
        ifd.extend_from_slice(&[0; 4]);
        assert_eq!(ifd.len(), ifd_size);
        assert_eq!(values.len(), values_size);

        let mut file = Vec::new();
        file.extend_from_slice(if self.little_endian { b"II" } else { b"MM" });
        file.extend_from_slice(&self.u16_bytes(42));
        file.extend_from_slice(&self.u32_bytes(ifd_start as u32));

        let strip_data = self.strips.concat();
        if self.strips_last {
            file.extend_from_slice(&ifd);
            file.extend_from_slice(&values);
            file.extend_from_slice(&strip_data);
        } else {
            file.extend_from_slice(&strip_data);
            file.extend_from_slice(&values);
            file.extend_from_slice(&ifd);
        }

        file
    }
}

/// Split rows of `stride` bytes into strips of `rows_per_strip` rows.
pub fn split_strips(data: &[u8], stride: usize, rows_per_strip: usize) -> Vec<Vec<u8>> {
    data.chunks(stride * rows_per_strip).map(<[u8]>::to_vec).collect()
}

pub fn lzw(data: &[u8]) -> Vec<u8> {
    weezl::encode::Encoder::with_tiff_size_switch(weezl::BitOrder::Msb, 8)
        .encode(data)
        .unwrap()
}

pub fn deflate(data: &[u8]) -> Vec<u8> {
    use std::io::Write;

    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Horizontal differencing of 8 bit rows.
pub fn predict_u8(data: &[u8], stride: usize, samples: usize) -> Vec<u8> {
    let mut out = data.to_vec();
    for row in out.chunks_exact_mut(stride) {
        for col in (samples..row.len()).rev() {
            row[col] = row[col].wrapping_sub(row[col - samples]);
        }
    }
    out
}

/// Pack a string of `0` and `1` most significant bit first, padding the last byte with zeros.
/// Other characters only separate codes.
pub fn pack_bits(bits: &str) -> Vec<u8> {
    let bits: Vec<bool> = bits
        .chars()
        .filter(|c| matches!(c, '0' | '1'))
        .map(|c| c == '1')
        .collect();

    bits.chunks(8)
        .map(|byte| {
            byte.iter()
                .enumerate()
                .fold(0u8, |acc, (i, &bit)| acc | (u8::from(bit) << (7 - i)))
        })
        .collect()
}

/// A baseline JPEG of 8 bit samples at the highest quality.
pub fn jpeg(data: &[u8], (width, height): (u16, u16), color: jpeg_encoder::ColorType) -> Vec<u8> {
    let mut out = Vec::new();
    jpeg_encoder::Encoder::new(&mut out, 100)
        .encode(data, width, height, color)
        .expect("Cannot encode jpeg");
    out
}
