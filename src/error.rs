use std::fmt;
use nom::{
    Err,
    error::VerboseError,
};
use crate::Tag;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FontError {
    /// unknown signature or inconsistent directory
    MalformedHeader(String),
    TruncatedBuffer { needed: usize, available: usize },
    InvalidTableRange { tag: Tag, offset: u32, length: u32 },
    ChecksumMismatch { tag: Tag, expected: u32, actual: u32 },
    CollectionIndexOutOfRange { index: u32, num_fonts: u32 },

    RequiredTableMissing(Tag),
    FieldOutOfRange { tag: Tag },
    InvalidValue { tag: Tag, field: &'static str, value: i64 },

    GlyphIndexOutOfRange { gid: u32, num_glyphs: u32 },
    CorruptOutlineData { gid: u32, reason: &'static str },
    CompositeCycleDetected { gid: u32 },
    CompositeDepthExceeded { gid: u32, limit: usize },

    /// A nom parser ran out of input. Never escapes the crate: the table
    /// decoders and the glyph assembler rewrite it into a scoped variant.
    UnexpectedEof,
}

impl FontError {
    /// Scope a bare read failure to the table it happened in.
    pub(crate) fn in_table(self, tag: Tag) -> FontError {
        match self {
            FontError::UnexpectedEof => FontError::FieldOutOfRange { tag },
            e => e
        }
    }
    /// Scope a bare read failure to the glyph being decoded.
    pub(crate) fn in_glyph(self, gid: u32) -> FontError {
        match self {
            FontError::UnexpectedEof => FontError::CorruptOutlineData { gid, reason: "glyph data ends early" },
            e => e
        }
    }
}

impl fmt::Display for FontError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            FontError::MalformedHeader(ref msg) => write!(f, "malformed font header: {}", msg),
            FontError::TruncatedBuffer { needed, available } =>
                write!(f, "buffer truncated: need {} bytes, have {}", needed, available),
            FontError::InvalidTableRange { tag, offset, length } =>
                write!(f, "table '{}' at {}+{} lies outside the buffer", tag, offset, length),
            FontError::ChecksumMismatch { tag, expected, actual } =>
                write!(f, "checksum of table '{}' is {:#010x}, directory says {:#010x}", tag, actual, expected),
            FontError::CollectionIndexOutOfRange { index, num_fonts } =>
                write!(f, "font index {} requested from a collection of {}", index, num_fonts),
            FontError::RequiredTableMissing(tag) => write!(f, "required table '{}' is missing", tag),
            FontError::FieldOutOfRange { tag } => write!(f, "field reads past the end of table '{}'", tag),
            FontError::InvalidValue { tag, field, value } =>
                write!(f, "table '{}': invalid {} ({})", tag, field, value),
            FontError::GlyphIndexOutOfRange { gid, num_glyphs } =>
                write!(f, "glyph {} out of range (font has {} glyphs)", gid, num_glyphs),
            FontError::CorruptOutlineData { gid, reason } => write!(f, "glyph {}: {}", gid, reason),
            FontError::CompositeCycleDetected { gid } =>
                write!(f, "composite glyph {} references itself", gid),
            FontError::CompositeDepthExceeded { gid, limit } =>
                write!(f, "composite glyph {} nests deeper than {} levels", gid, limit),
            FontError::UnexpectedEof => write!(f, "unexpected end of data"),
        }
    }
}

impl std::error::Error for FontError {}

impl<'a> From<Err<VerboseError<&'a [u8]>>> for FontError {
    fn from(_: Err<VerboseError<&'a [u8]>>) -> Self {
        FontError::UnexpectedEof
    }
}
