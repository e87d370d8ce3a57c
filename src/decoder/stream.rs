//! All IO functionality needed for TIFF decoding

use std::io::{self, Read};

use crate::tags::ByteOrder;
use crate::{TiffError, TiffResult};

macro_rules! read_fn {
    ($name:ident, $type:ty) => {
        /// reads an $type at an absolute offset
        #[inline(always)]
        pub fn $name(&self, offset: u64) -> TiffResult<$type> {
            const LEN: usize = std::mem::size_of::<$type>();
            let mut n = [0u8; LEN];
            n.copy_from_slice(self.bytes_at(offset, LEN as u64)?);
            Ok(match self.byte_order {
                ByteOrder::LittleEndian => <$type>::from_le_bytes(n),
                ByteOrder::BigEndian => <$type>::from_be_bytes(n),
            })
        }
    };
}

///
/// ## SmartReader
///

/// Byte order aware view of an in-memory file.
///
/// Every read names its absolute offset and is checked against the extent of the buffer before
/// any byte is touched.
#[derive(Clone, Copy, Debug)]
pub struct SmartReader<'a> {
    data: &'a [u8],
    pub byte_order: ByteOrder,
}

impl<'a> SmartReader<'a> {
    /// Wraps a buffer
    pub fn wrap(data: &'a [u8], byte_order: ByteOrder) -> SmartReader<'a> {
        SmartReader { data, byte_order }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// The `len` bytes starting at `offset`.
    pub fn bytes_at(&self, offset: u64, len: u64) -> TiffResult<&'a [u8]> {
        let out_of_bounds = || TiffError::OutOfBounds {
            offset,
            len,
            size: self.data.len(),
        };

        let end = offset.checked_add(len).ok_or_else(out_of_bounds)?;
        if end > self.data.len() as u64 {
            return Err(out_of_bounds());
        }

        // Both fit into the buffer length, so they fit into usize.
        Ok(&self.data[offset as usize..end as usize])
    }

    read_fn!(read_u16, u16);
    read_fn!(read_u32, u32);
}

///
/// # READERS
///

///
/// ## Deflate Reader
///

#[cfg(feature = "deflate")]
pub type DeflateReader<R> = flate2::read::ZlibDecoder<R>;

///
/// ## LZW Reader
///

/// Reader that decompresses LZW streams
#[cfg(feature = "lzw")]
pub struct LZWReader<R: io::BufRead> {
    reader: R,
    decoder: weezl::decode::Decoder,
}

#[cfg(feature = "lzw")]
impl<R: io::BufRead> LZWReader<R> {
    /// Wraps a reader
    pub fn new(reader: R) -> LZWReader<R> {
        Self {
            reader,
            decoder: weezl::decode::Decoder::with_tiff_size_switch(weezl::BitOrder::Msb, 8),
        }
    }
}

#[cfg(feature = "lzw")]
impl<R: io::BufRead> Read for LZWReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let result = self.decoder.decode_bytes(self.reader.fill_buf()?, buf);
            self.reader.consume(result.consumed_in);

            match result.status {
                Ok(weezl::LzwStatus::Ok) => {
                    if result.consumed_out == 0 {
                        continue;
                    } else {
                        return Ok(result.consumed_out);
                    }
                }
                Ok(weezl::LzwStatus::NoProgress) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "no lzw end code found",
                    ));
                }
                Ok(weezl::LzwStatus::Done) => {
                    return Ok(result.consumed_out);
                }
                Err(err) => return Err(io::Error::new(io::ErrorKind::InvalidData, err)),
            }
        }
    }
}

///
/// ## PackBits Reader
///

enum PackBitsReaderState {
    Header,
    Literal,
    Repeat { value: u8 },
}

/// Reader that unpacks Apple's `PackBits` format
pub struct PackBitsReader<R: Read> {
    reader: io::Take<R>,
    state: PackBitsReaderState,
    count: usize,
}

impl<R: Read> PackBitsReader<R> {
    /// Wraps a reader
    pub fn new(reader: R, length: u64) -> Self {
        Self {
            reader: reader.take(length),
            state: PackBitsReaderState::Header,
            count: 0,
        }
    }
}

impl<R: Read> Read for PackBitsReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while let PackBitsReaderState::Header = self.state {
            if self.reader.limit() == 0 {
                return Ok(0);
            }
            let mut header: [u8; 1] = [0];
            self.reader.read_exact(&mut header)?;
            let h = header[0] as i8;
            if (-127..=-1).contains(&h) {
                let mut data: [u8; 1] = [0];
                self.reader.read_exact(&mut data)?;
                self.state = PackBitsReaderState::Repeat { value: data[0] };
                self.count = (1 - h as isize) as usize;
            } else if h >= 0 {
                self.state = PackBitsReaderState::Literal;
                self.count = h as usize + 1;
            } else {
                // h = -128 is a no-op.
            }
        }

        let length = buf.len().min(self.count);
        let actual = match self.state {
            PackBitsReaderState::Literal => self.reader.read(&mut buf[..length])?,
            PackBitsReaderState::Repeat { value } => {
                for b in &mut buf[..length] {
                    *b = value;
                }

                length
            }
            PackBitsReaderState::Header => unreachable!(),
        };

        // A literal run cut short by the end of the strip.
        if actual == 0 && length > 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "packbits literal run extends past the strip",
            ));
        }

        self.count -= actual;
        if self.count == 0 {
            self.state = PackBitsReaderState::Header;
        }
        Ok(actual)
    }
}
