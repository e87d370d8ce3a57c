macro_rules! tags {
    {
        // Permit arbitrary meta items, which include documentation.
        $( #[$enum_attr:meta] )*
        $vis:vis enum $name:ident($ty:tt) $(unknown(#[$unknown_meta:meta] $unknown_doc:ident))* {
            // Each of the `Name = Val,` permitting documentation.
            $($(#[$ident_attr:meta])* $tag:ident = $val:expr,)*
        }
    } => {
        $( #[$enum_attr] )*
        #[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
        #[non_exhaustive]
        #[repr($ty)]
        pub enum $name {
            $($(#[$ident_attr])* $tag = $val,)*
            $(
                #[$unknown_meta]
                Unknown($ty),
            )*
        }

        impl $name {
            #[inline(always)]
            const fn __from_inner_type(n: $ty) -> Result<Self, $ty> {
                match n {
                    $( $val => Ok($name::$tag), )*
                    n => Err(n),
                }
            }

            #[inline(always)]
            const fn __to_inner_type(&self) -> $ty {
                match *self {
                    $( $name::$tag => $val, )*
                    $( $name::Unknown($unknown_doc) => { $unknown_doc }, )*
                }
            }
        }

        tags!($name, $ty, $($unknown_doc)*);
    };
    // All tag types of a baseline file are u16, provide direct conversion methods.
    ($name:tt, u16, $($unknown_doc:ident)*) => {
        impl $name {
            #[inline(always)]
            pub const fn from_u16(val: u16) -> Option<Self> {
                match Self::__from_inner_type(val) {
                    Ok(v) => Some(v),
                    Err(_) => None,
                }
            }

            $(
            #[inline(always)]
            pub const fn from_u16_exhaustive($unknown_doc: u16) -> Self {
                match Self::__from_inner_type($unknown_doc) {
                    Ok(v) => v,
                    Err(_) => $name::Unknown($unknown_doc),
                }
            }
            )*

            #[inline(always)]
            pub const fn to_u16(&self) -> u16 {
                Self::__to_inner_type(self)
            }
        }
    };
}

// Note: These tags appear in the order they are mentioned in the TIFF reference
tags! {
/// TIFF tags understood by the decoder
pub enum Tag(u16) unknown(
    /// A private, extension or unhandled baseline tag
    unknown
) {
    // Baseline tags:
    NewSubfileType = 254,
    ImageWidth = 256,
    ImageLength = 257,
    BitsPerSample = 258,
    Compression = 259,
    PhotometricInterpretation = 262,
    FillOrder = 266,
    StripOffsets = 273,
    SamplesPerPixel = 277,
    RowsPerStrip = 278,
    StripByteCounts = 279,
    XResolution = 282,
    YResolution = 283,
    PlanarConfiguration = 284,
    ResolutionUnit = 296,
    // palette-color images (PhotometricInterpretation 3)
    ColorMap = 320,
    ExtraSamples = 338,
    // CCITT options
    #[doc(alias = "Group3Options")]
    T4Options = 292,
    #[doc(alias = "Group4Options")]
    T6Options = 293,
    // Advanced tags
    Predictor = 317,
    TileWidth = 322,
    TileLength = 323,
    TileOffsets = 324,
    TileByteCounts = 325,
    // JPEG
    JPEGTables = 347,
    // Subsampling
    #[doc(alias = "ChromaSubsampling")]
    YCbCrSubsampling = 530,
    // <https://www.color.org/technotes/ICC-Technote-ProfileEmbedding.pdf>
    IccProfile = 34675,
}
}

impl Tag {
    /// Tags describing tiled storage, which the decoder refuses.
    pub const fn is_tile_tag(&self) -> bool {
        matches!(
            self,
            Tag::TileWidth | Tag::TileLength | Tag::TileOffsets | Tag::TileByteCounts
        )
    }
}

tags! {
/// The type of an IFD entry (a 2 byte field).
pub enum Type(u16) {
    /// 8-bit unsigned integer
    BYTE = 1,
    /// 8-bit byte that contains a 7-bit ASCII code; the last byte must be zero
    ASCII = 2,
    /// 16-bit unsigned integer
    SHORT = 3,
    /// 32-bit unsigned integer
    LONG = 4,
    /// Fraction stored as two 32-bit unsigned integers
    RATIONAL = 5,
    /// 8-bit signed integer
    SBYTE = 6,
    /// 8-bit byte that may contain anything, depending on the field
    UNDEFINED = 7,
    /// 16-bit signed integer
    SSHORT = 8,
    /// 32-bit signed integer
    SLONG = 9,
    /// Fraction stored as two 32-bit signed integers
    SRATIONAL = 10,
    /// 32-bit IEEE floating point
    FLOAT = 11,
    /// 64-bit IEEE floating point
    DOUBLE = 12,
}
}

impl Type {
    pub(crate) fn byte_len(&self) -> u8 {
        match *self {
            Type::BYTE | Type::SBYTE | Type::ASCII | Type::UNDEFINED => 1,
            Type::SHORT | Type::SSHORT => 2,
            Type::LONG | Type::SLONG | Type::FLOAT => 4,
            Type::DOUBLE | Type::RATIONAL | Type::SRATIONAL => 8,
        }
    }

    pub(crate) fn value_bytes(&self, count: u32) -> u64 {
        u64::from(count) * u64::from(self.byte_len())
    }
}

tags! {
/// See [TIFF compression tags](https://www.awaresystems.be/imaging/tiff/tifftags/compression.html)
/// for reference.
pub enum CompressionMethod(u16) unknown(
    /// A custom compression method
    unknown
) {
    None = 1,
    Huffman = 2,
    Fax3 = 3,
    Fax4 = 4,
    LZW = 5,
    JPEG = 6,
    // "Extended JPEG" or "new JPEG" style
    ModernJPEG = 7,
    Deflate = 8,
    OldDeflate = 0x80B2,
    PackBits = 0x8005,
}
}

tags! {
pub enum PhotometricInterpretation(u16) unknown(
    /// An interpretation without a meaning for this decoder
    unknown
) {
    WhiteIsZero = 0,
    BlackIsZero = 1,
    RGB = 2,
    RGBPalette = 3,
    TransparencyMask = 4,
    CMYK = 5,
    YCbCr = 6,
    CIELab = 8,
}
}

tags! {
pub enum PlanarConfiguration(u16) unknown(
    /// A value outside of the TIFF specification
    unknown
) {
    Chunky = 1,
    Planar = 2,
}
}

tags! {
pub enum Predictor(u16) unknown(
    /// A predictor outside of the TIFF specification
    unknown
) {
    /// No changes were made to the data
    None = 1,
    /// The images' rows were processed to contain the difference of each pixel from the previous one.
    ///
    /// This means that instead of having in order `[r1, g1. b1, r2, g2 ...]` you will find
    /// `[r1, g1, b1, r2-r1, g2-g1, b2-b1, r3-r2, g3-g2, ...]`
    Horizontal = 2,
    /// Not supported by this decoder, the data is left as is.
    FloatingPoint = 3,
}
}

tags! {
/// Type to represent resolution units
pub enum ResolutionUnit(u16) unknown(
    /// A unit outside of the TIFF specification
    unknown
) {
    None = 1,
    Inch = 2,
    Centimeter = 3,
}
}

tags! {
/// Order of the bits within each byte of the compressed data
pub enum FillOrder(u16) unknown(
    /// A fill order outside of the TIFF specification
    unknown
) {
    /// Pixels with lower column values are stored in the higher-order bits of the byte.
    MsbFirst = 1,
    /// Pixels with lower column values are stored in the lower-order bits of the byte.
    LsbFirst = 2,
}
}

tags! {
pub enum ExtraSamples(u16) unknown(
    /// An extra sample type outside of the TIFF specification
    unknown
) {
    /// There is no specified association between the sample and the image.
    Unspecified = 0,
    /// The sample is associated alpha, i.e. pre-multiplied color.
    AssociatedAlpha = 1,
    /// The sample is unassociated alpha such as a mask. There might be more than one such sample.
    UnassociatedAlpha = 2,
}
}

/// Byte order of the TIFF file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ByteOrder {
    /// little endian byte order
    LittleEndian,
    /// big endian byte order
    BigEndian,
}

impl ByteOrder {
    /// Decode a byte order marker, `II` or `MM`.
    pub const fn from_marker(marker: [u8; 2]) -> Option<Self> {
        match &marker {
            b"II" => Some(ByteOrder::LittleEndian),
            b"MM" => Some(ByteOrder::BigEndian),
            _ => None,
        }
    }

    /// Convert a buffer of 16-bit values to the specified byte order in-place.
    ///
    /// A trailing odd byte is left untouched.
    pub fn convert_u16(self, buffer: &mut [u8], to: ByteOrder) {
        if self == to {
            return;
        }

        for chunk in buffer.chunks_exact_mut(2) {
            chunk.swap(0, 1);
        }
    }
}
