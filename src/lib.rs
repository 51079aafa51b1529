//! Reads TrueType fonts from memory: the table directory, the font-wide
//! tables and `glyf` outlines, including composite glyphs.
//!
//! ```no_run
//! let data = std::fs::read("font.ttf").unwrap();
//! let font = sfnt_outline::parse(&data).unwrap();
//! if let Some(gid) = font.glyph_for_codepoint('A' as u32) {
//!     let outline = font.glyph_outline(gid).unwrap();
//!     println!("{} contours", outline.contours.len());
//! }
//! ```

#[macro_use] extern crate log;

use nom::{IResult, error::VerboseError};

#[macro_use]
mod macros;
mod error;
mod tag;
mod options;
mod parsers;
mod font;

pub mod directory;
pub mod opentype;
pub mod outline;
pub mod truetype;

pub use error::FontError;
pub use tag::Tag;
pub use options::{ParseOptions, DuplicateTagPolicy, DEFAULT_COMPOSITE_DEPTH};
pub use font::{Font, Metadata};
pub use directory::{TableDirectory, TableRecord, Flavor, num_fonts};
pub use outline::{GlyphOutline, Contour, Point, BBox, Segment};
pub use opentype::{Table, HMetrics};

pub mod tags {
    //! Tags of the tables this crate decodes.
    pub use crate::tag::{HEAD, MAXP, HHEA, HMTX, LOCA, GLYF, CMAP, NAME, OS2, POST};
}

pub type R<'a, T> = IResult<&'a [u8], T, VerboseError<&'a [u8]>>;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GlyphId(pub u32);

/// Parse the first font in `data` with default options.
pub fn parse(data: &[u8]) -> Result<Font, FontError> {
    Font::parse(data)
}
