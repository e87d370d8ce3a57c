//! Function for reading TIFF tags

use std::ops::Range;

use super::stream::SmartReader;
use super::Limits;
use crate::tags::{ByteOrder, Tag, Type};
use crate::{TiffError, TiffFormatError, TiffResult};

/// Size of a single directory entry in bytes.
pub(crate) const ENTRY_SIZE: u64 = 12;

/// The value or offset field of a directory entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryValue {
    /// The value fits into the four bytes of the field, stored in file byte order.
    Inline([u8; 4]),
    /// The value is stored elsewhere in the file.
    Offset(u32),
}

/// A single directory entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Entry {
    pub tag: Tag,
    /// `None` for type codes outside of TIFF 6.0.
    pub type_: Option<Type>,
    pub count: u32,
    pub value: EntryValue,
    /// Absolute offset of the value field itself.
    position: u64,
}

/// Reads the file header, returning a reader with the established byte order and the offset of
/// the first directory.
pub fn read_header(data: &[u8]) -> TiffResult<(SmartReader<'_>, u32)> {
    let marker = match data {
        [a, b, ..] => [*a, *b],
        _ => return Err(TiffError::FormatError(TiffFormatError::TiffSignatureNotFound)),
    };
    let byte_order = ByteOrder::from_marker(marker)
        .ok_or(TiffError::FormatError(TiffFormatError::TiffSignatureNotFound))?;

    let reader = SmartReader::wrap(data, byte_order);
    let version = reader
        .read_u16(2)
        .map_err(|_| TiffFormatError::TiffSignatureInvalid)?;
    if version != 42 {
        return Err(TiffError::FormatError(TiffFormatError::TiffSignatureInvalid));
    }

    let ifd_offset = reader
        .read_u32(4)
        .map_err(|_| TiffFormatError::ImageFileDirectoryNotFound)?;

    Ok((reader, ifd_offset))
}

/// Reads all entries of the directory at `offset`.
pub fn read_directory(
    reader: &SmartReader<'_>,
    offset: u32,
    limits: &Limits,
) -> TiffResult<Vec<Entry>> {
    let offset = u64::from(offset);
    let count = reader.read_u16(offset)?;

    let table_size = u64::from(count) * ENTRY_SIZE;
    if table_size > limits.ifd_value_size as u64 {
        return Err(TiffError::LimitsExceeded);
    }

    let mut entries = Vec::new();
    entries.try_reserve(usize::from(count))?;

    let start = offset + 2;
    for index in 0..u64::from(count) {
        entries.push(read_entry(reader, start + index * ENTRY_SIZE)?);
    }

    Ok(entries)
}

/// Reads the 12 byte entry at `offset`.
pub fn read_entry(reader: &SmartReader<'_>, offset: u64) -> TiffResult<Entry> {
    let tag = Tag::from_u16_exhaustive(reader.read_u16(offset)?);
    let type_ = Type::from_u16(reader.read_u16(offset + 2)?);
    let count = reader.read_u32(offset + 4)?;

    let position = offset + 8;
    let field = reader.bytes_at(position, 4)?;

    let value = match type_ {
        Some(type_) if type_.value_bytes(count) <= 4 => {
            EntryValue::Inline([field[0], field[1], field[2], field[3]])
        }
        _ => EntryValue::Offset(reader.read_u32(position)?),
    };

    Ok(Entry {
        tag,
        type_,
        count,
        value,
        position,
    })
}

impl Entry {
    /// Absolute byte range of the value data, `count` bytes long.
    pub fn byte_range(&self) -> Range<u64> {
        let start = match self.value {
            EntryValue::Inline(_) => self.position,
            EntryValue::Offset(offset) => u64::from(offset),
        };

        start..start + u64::from(self.count)
    }

    /// The value data, `len` bytes long.
    fn data<'a>(&self, reader: &SmartReader<'a>, len: u64, limits: &Limits) -> TiffResult<&'a [u8]> {
        if len > limits.ifd_value_size as u64 {
            return Err(TiffError::LimitsExceeded);
        }

        match self.value {
            EntryValue::Inline(_) => reader.bytes_at(self.position, len),
            EntryValue::Offset(offset) => reader.bytes_at(u64::from(offset), len),
        }
    }

    /// Resolves the values of an integer valued entry.
    ///
    /// BYTE, SHORT and LONG values are widened, RATIONAL values are divided with truncation, a zero
    /// denominator yielding 0. Any other type is an error.
    pub fn values(&self, reader: &SmartReader<'_>, limits: &Limits) -> TiffResult<Vec<u32>> {
        let type_ = match self.type_ {
            Some(type_ @ (Type::BYTE | Type::SHORT | Type::LONG | Type::RATIONAL)) => type_,
            _ => return Err(TiffFormatError::InvalidTagValueType(self.tag).into()),
        };

        let data = self.data(reader, type_.value_bytes(self.count), limits)?;
        let decode_u16 = |b: &[u8]| match reader.byte_order {
            ByteOrder::LittleEndian => u16::from_le_bytes([b[0], b[1]]),
            ByteOrder::BigEndian => u16::from_be_bytes([b[0], b[1]]),
        };
        let decode_u32 = |b: &[u8]| match reader.byte_order {
            ByteOrder::LittleEndian => u32::from_le_bytes([b[0], b[1], b[2], b[3]]),
            ByteOrder::BigEndian => u32::from_be_bytes([b[0], b[1], b[2], b[3]]),
        };

        let mut values = Vec::new();
        values.try_reserve(self.count as usize)?;

        match type_ {
            Type::BYTE => values.extend(data.iter().map(|&b| u32::from(b))),
            Type::SHORT => values.extend(data.chunks_exact(2).map(|b| u32::from(decode_u16(b)))),
            Type::LONG => values.extend(data.chunks_exact(4).map(decode_u32)),
            _ => values.extend(data.chunks_exact(8).map(|b| {
                let numerator = decode_u32(&b[..4]);
                numerator.checked_div(decode_u32(&b[4..])).unwrap_or(0)
            })),
        }

        Ok(values)
    }

    /// The first value of an integer valued entry.
    pub fn value(&self, reader: &SmartReader<'_>, limits: &Limits) -> TiffResult<u32> {
        self.values(reader, limits)?
            .first()
            .copied()
            .ok_or(TiffError::FormatError(TiffFormatError::RequiredTagEmpty(
                self.tag,
            )))
    }

    /// The `count` raw bytes of the entry, whatever its type.
    pub fn raw_bytes<'a>(&self, reader: &SmartReader<'a>, limits: &Limits) -> TiffResult<&'a [u8]> {
        self.data(reader, u64::from(self.count), limits)
    }
}
