//! CCITT T.4 and T.6 strips, decoded row by row on the code tables of the `fax` crate.
//!
//! Rows are kept as lists of changing elements: the columns where the color flips, starting from
//! white. Entries at even positions turn black, entries at odd positions turn white again.

use std::convert::Infallible;

use fax34::decoder::pels;
use fax34::maps::{black, mode, white, Mode};
use fax34::{BitReader, ByteReader, Color};

use super::FaxParams;
use crate::error::{DecodeError, TiffResult};

/// Appended to every strip so that table lookups for the final codes can peek ahead.
const LOOKAHEAD: [u8; 2] = [0; 2];

/// How a coded row ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Line {
    Row,
    EndOfBlock,
}

/// Decode a CCITT strip into `expected` bytes of packed one bit rows.
///
/// `k < 0` is Group 4. Otherwise rows are Group 3 with optional EOL codes and fill bits, and a tag
/// bit after each EOL chooses between one and two dimensional coding when `k > 0`. With
/// `encoded_byte_align` every row starts on a byte boundary.
///
/// Decoding stops once `expected` bytes are produced. A strip that ends early comes back short.
pub(super) fn decode(compressed: &[u8], params: &FaxParams, expected: usize) -> TiffResult<Vec<u8>> {
    let width = params.columns;
    let row_bytes = usize::from(width).div_ceil(8);

    let mut out = Vec::new();
    out.try_reserve_exact(expected)?;
    let mut row = vec![0u8; row_bytes];

    let bytes = compressed
        .iter()
        .chain(LOOKAHEAD.iter())
        .map(|&byte| Ok::<u8, Infallible>(byte));
    let mut reader = match ByteReader::new(bytes) {
        Ok(reader) => reader,
        Err(never) => match never {},
    };

    // The line above the first row of a strip is white.
    let mut reference: Vec<u16> = Vec::new();
    let mut current: Vec<u16> = Vec::new();

    while out.len() < expected {
        current.clear();
        let line = next_row(&mut reader, params, &reference, &mut current)
            .ok_or(DecodeError::Fax)?;
        if line == Line::EndOfBlock {
            break;
        }

        row.fill(0);
        for (x, color) in pels(&current, width).enumerate() {
            if matches!(color, Color::Black) == params.black_is_1 {
                row[x / 8] |= 0x80 >> (x % 8);
            }
        }

        let take = row_bytes.min(expected - out.len());
        out.extend_from_slice(&row[..take]);
        std::mem::swap(&mut reference, &mut current);
    }

    log::trace!(
        "fax strip: k={}, {} of {} bytes",
        params.k,
        out.len(),
        expected
    );
    Ok(out)
}

/// Decode the next row into `current`. `None` means the data is corrupt.
fn next_row(
    reader: &mut impl BitReader,
    params: &FaxParams,
    reference: &[u16],
    current: &mut Vec<u16>,
) -> Option<Line> {
    if params.encoded_byte_align {
        let fill = reader.bits_to_byte_boundary();
        reader.consume(fill).ok()?;
    }

    if params.k < 0 {
        return decode_2d(reader, reference, current, params.columns);
    }

    skip_eol(reader)?;
    let two_dimensional = if params.k > 0 {
        let tag = reader.peek(1)?;
        reader.consume(1).ok()?;
        tag == 0
    } else {
        false
    };

    if two_dimensional {
        decode_2d(reader, reference, current, params.columns)
    } else {
        decode_1d(reader, current, params.columns)?;
        Some(Line::Row)
    }
}

/// Skip fill bits and one EOL code, if present.
fn skip_eol(reader: &mut impl BitReader) -> Option<bool> {
    loop {
        match reader.peek(12) {
            Some(1) => {
                reader.consume(12).ok()?;
                return Some(true);
            }
            // Twelve zero bits can not start a code, so at least one of them is fill.
            Some(0) => reader.consume(1).ok()?,
            _ => return Some(false),
        }
    }
}

/// A run of make-up codes closed by a terminating code.
fn run_length(reader: &mut impl BitReader, color: Color) -> Option<u16> {
    let mut total: u16 = 0;
    loop {
        let run = match color {
            Color::White => white::decode(reader)?,
            Color::Black => black::decode(reader)?,
        };
        total = total.checked_add(run)?;
        if run < 64 {
            return Some(total);
        }
    }
}

/// Record a color change at `pos`. Two changes at the same column cancel out.
fn push_change(changes: &mut Vec<u16>, pos: u16, width: u16) {
    if pos >= width {
        return;
    }

    if changes.last() == Some(&pos) {
        changes.pop();
    } else {
        changes.push(pos);
    }
}

fn decode_1d(reader: &mut impl BitReader, current: &mut Vec<u16>, width: u16) -> Option<()> {
    let mut a0: u16 = 0;
    let mut color = Color::White;
    while a0 < width {
        let run = run_length(reader, color)?;
        a0 = a0.checked_add(run).filter(|&end| end <= width)?;
        push_change(current, a0, width);
        color = !color;
    }

    Some(())
}

/// `b1` and `b2`: the first change on the reference line right of `a0` to the opposite of
/// `color`, and the change following it. Missing changes sit at `width`.
fn changing_elements(reference: &[u16], a0: i32, color: Color, width: u16) -> (i32, i32) {
    let parity = match color {
        Color::White => 0,
        Color::Black => 1,
    };
    let at = |i: usize| reference.get(i).map_or(i32::from(width), |&b| i32::from(b));

    match reference
        .iter()
        .enumerate()
        .position(|(i, &b)| i % 2 == parity && i32::from(b) > a0)
    {
        Some(b1) => (at(b1), at(b1 + 1)),
        None => (i32::from(width), i32::from(width)),
    }
}

fn decode_2d(
    reader: &mut impl BitReader,
    reference: &[u16],
    current: &mut Vec<u16>,
    width: u16,
) -> Option<Line> {
    let end = i32::from(width);
    // The imaginary white pixel left of the row.
    let mut a0: i32 = -1;
    let mut color = Color::White;

    while a0 < end {
        match mode::decode(reader)? {
            Mode::EOF if a0 < 0 => return Some(Line::EndOfBlock),
            Mode::Pass => {
                let (_, b2) = changing_elements(reference, a0, color, width);
                a0 = b2;
            }
            Mode::Vertical(delta) => {
                let (b1, _) = changing_elements(reference, a0, color, width);
                let a1 = b1 + i32::from(delta);
                if a1 < a0.max(0) || a1 > end {
                    return None;
                }
                push_change(current, a1 as u16, width);
                a0 = a1;
                color = !color;
            }
            Mode::Horizontal => {
                let a1 = a0.max(0) + i32::from(run_length(reader, color)?);
                let a2 = a1 + i32::from(run_length(reader, !color)?);
                if a2 > end {
                    return None;
                }
                push_change(current, a1 as u16, width);
                push_change(current, a2 as u16, width);
                a0 = a2;
            }
            Mode::Extension | Mode::EOF => return None,
        }
    }

    Some(Line::Row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fax34::encoder::Encoder;
    use fax34::maps::EOL;
    use fax34::{BitWriter, Bits, VecWriter};

    fn params(columns: u16, k: i32, encoded_byte_align: bool) -> FaxParams {
        FaxParams {
            columns,
            rows: 8,
            black_is_1: true,
            k,
            encoded_byte_align,
        }
    }

    fn put(writer: &mut VecWriter, bits: Option<Bits>) {
        let _ = writer.write(bits.expect("code exists"));
    }

    /// Alternating white and black runs, each a make-up code if needed and a terminating code.
    fn runs(writer: &mut VecWriter, lengths: &[u16]) {
        for (i, &len) in lengths.iter().enumerate() {
            let encode = if i % 2 == 0 { white::encode } else { black::encode };
            if len >= 64 {
                put(writer, encode(len / 64 * 64));
            }
            put(writer, encode(len % 64));
        }
    }

    fn tag(writer: &mut VecWriter, one_dimensional: bool) {
        let _ = writer.write(EOL);
        let _ = writer.write(Bits {
            data: u16::from(one_dimensional),
            len: 1,
        });
    }

    #[test]
    fn group3_last_row_needs_no_eol() {
        let mut writer = VecWriter::new();
        let rows: [&[u16]; 2] = [&[2, 4, 2], &[0, 8]];
        for lengths in rows {
            let _ = writer.write(EOL);
            runs(&mut writer, lengths);
        }

        let out = decode(&writer.finish(), &params(8, 0, false), 2).unwrap();
        assert_eq!(out, [0x3C, 0xFF]);
    }

    #[test]
    fn group3_fill_bits_before_eol() {
        let mut writer = VecWriter::new();
        let _ = writer.write(Bits { data: 0, len: 7 });
        let _ = writer.write(EOL);
        runs(&mut writer, &[3, 5]);

        let out = decode(&writer.finish(), &params(8, 0, false), 1).unwrap();
        assert_eq!(out, [0x1F]);
    }

    #[test]
    fn modified_huffman_rows_are_byte_aligned() {
        let mut writer = VecWriter::new();
        runs(&mut writer, &[1728]);
        writer.pad();
        runs(&mut writer, &[1, 1726, 1]);
        let data = writer.finish();

        let out = decode(&data, &params(1728, 0, true), 2 * 216).unwrap();
        assert!(out[..216].iter().all(|&b| b == 0));
        assert_eq!(out[216], 0x7F);
        assert!(out[217..431].iter().all(|&b| b == 0xFF));
        assert_eq!(out[431], 0xFE);
    }

    #[test]
    fn group3_two_dimensional_rows() {
        let mut writer = VecWriter::new();
        // 1-D: ww bbbb ww
        tag(&mut writer, true);
        runs(&mut writer, &[2, 4, 2]);
        // 2-D: the black run moves one pixel to the right.
        tag(&mut writer, false);
        put(&mut writer, mode::encode(Mode::Vertical(1)));
        put(&mut writer, mode::encode(Mode::Vertical(1)));
        put(&mut writer, mode::encode(Mode::Vertical(0)));
        // 2-D: pass the black run, then a single black pixel on column 7.
        tag(&mut writer, false);
        put(&mut writer, mode::encode(Mode::Pass));
        put(&mut writer, mode::encode(Mode::Horizontal));
        runs(&mut writer, &[0, 1]);

        let out = decode(&writer.finish(), &params(8, 1, false), 3).unwrap();
        assert_eq!(out, [0x3C, 0x1E, 0x01]);
    }

    #[test]
    fn group4_matches_the_encoder() {
        let rows: [&[u8]; 4] = [
            &[0, 0, 1, 1, 1, 0, 0, 0, 0, 1, 1, 0],
            &[0, 0, 0, 1, 1, 1, 0, 0, 0, 1, 1, 1],
            &[1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1],
            &[0, 1, 0, 1, 0, 1, 0, 0, 0, 0, 0, 0],
        ];

        let mut encoder = Encoder::new(VecWriter::new());
        for row in rows {
            let colors = row
                .iter()
                .map(|&p| if p == 1 { Color::Black } else { Color::White });
            encoder.encode_line(colors, 12).unwrap();
        }
        let data = encoder.finish().unwrap().finish();

        let out = decode(&data, &params(12, -1, false), 8).unwrap();
        let packed: Vec<u8> = rows
            .iter()
            .flat_map(|row| {
                let bits = row.iter().fold(0u16, |acc, &p| acc << 1 | u16::from(p)) << 4;
                bits.to_be_bytes()
            })
            .collect();
        assert_eq!(out, packed);

        // White is zero puts the ones on the white pixels.
        let mut inverted = params(12, -1, false);
        inverted.black_is_1 = false;
        let out = decode(&data, &inverted, 8).unwrap();
        let expected: Vec<u8> = packed
            .chunks(2)
            .flat_map(|row| [!row[0], !row[1] & 0xF0])
            .collect();
        assert_eq!(out, expected);
    }

    #[test]
    fn group4_end_of_block_leaves_the_strip_short() {
        let mut encoder = Encoder::new(VecWriter::new());
        encoder
            .encode_line(std::iter::repeat(Color::White).take(8), 8)
            .unwrap();
        let data = encoder.finish().unwrap().finish();

        let out = decode(&data, &params(8, -1, false), 3).unwrap();
        assert_eq!(out, [0x00]);
    }

    #[test]
    fn corrupt_codes() {
        // An extension code is not a valid row start.
        let mut writer = VecWriter::new();
        put(&mut writer, mode::encode(Mode::Extension));
        let err = decode(&writer.finish(), &params(8, -1, false), 1).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::DecodeFailure);

        // A run past the end of the row.
        let mut writer = VecWriter::new();
        runs(&mut writer, &[9]);
        assert!(decode(&writer.finish(), &params(8, 0, false), 1).is_err());
    }
}
