use std::borrow::Cow;
use std::fmt;
use std::sync::OnceLock;
use pathfinder_geometry::{transform2d::Transform2F, vector::Vector2F};
use crate::{FontError, GlyphId, Tag, ParseOptions};
use crate::directory::{TableDirectory, Flavor, parse_directory};
use crate::opentype::{Tables, Table, Head, Maxp, LocaFormat, HMetrics};
use crate::opentype::name::Name;
use crate::outline::{GlyphOutline, BBox};
use crate::truetype::{Assembler, Shape, USE_MY_METRICS};
use crate::tag::{HEAD, MAXP};

/// Summary of the font-wide tables.
#[derive(Clone, Debug)]
pub struct Metadata {
    pub flavor: Flavor,
    pub units_per_em: u16,
    pub num_glyphs: u32,
    /// from hhea, or the OS/2 typo metrics when hhea is absent
    pub ascent: Option<i16>,
    pub descent: Option<i16>,
    pub line_gap: Option<i16>,
    pub bbox: BBox,
    pub loca_format: LocaFormat,
    pub names: Name,
    pub weight: Option<u16>,
    pub italic_angle: Option<f32>,
    pub is_fixed_pitch: bool,
    pub mac_style: u16,
}
impl Metadata {
    fn new(directory: &TableDirectory, tables: &Tables, head: &Head, maxp: &Maxp) -> Metadata {
        let typo = tables.os2().and_then(|os2| os2.typo);
        let (ascent, descent, line_gap) = match (tables.hhea(), typo) {
            (Some(hhea), _) => (Some(hhea.ascender), Some(hhea.descender), Some(hhea.line_gap)),
            (None, Some(typo)) => (Some(typo.ascender), Some(typo.descender), Some(typo.line_gap)),
            (None, None) => (None, None, None),
        };
        Metadata {
            flavor: directory.flavor(),
            units_per_em: head.units_per_em,
            num_glyphs: maxp.num_glyphs as u32,
            ascent,
            descent,
            line_gap,
            bbox: BBox {
                x_min: head.x_min as i32,
                y_min: head.y_min as i32,
                x_max: head.x_max as i32,
                y_max: head.y_max as i32,
            },
            loca_format: head.index_to_loc_format,
            names: tables.name().cloned().unwrap_or_default(),
            weight: tables.os2().map(|os2| os2.weight),
            italic_angle: tables.post().map(|post| post.italic_angle),
            is_fixed_pitch: tables.post().map_or(false, |post| post.is_fixed_pitch),
            mac_style: head.mac_style,
        }
    }
}

/// A parsed TrueType font.
///
/// All tables are decoded up front. Glyph outlines are assembled on
/// request and, unless disabled in [`ParseOptions`], kept for later calls.
/// A `Font` can be shared between threads.
pub struct Font {
    directory: TableDirectory,
    tables: Tables,
    metadata: Metadata,
    options: ParseOptions,
    outlines: Vec<OnceLock<GlyphOutline>>,
}

impl fmt::Debug for Font {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Font")
            .field("directory", &self.directory)
            .field("metadata", &self.metadata)
            .field("options", &self.options)
            .finish()
    }
}

impl Font {
    pub fn parse(data: &[u8]) -> Result<Font, FontError> {
        Font::parse_with(data, ParseOptions::default())
    }

    pub fn parse_with(data: &[u8], options: ParseOptions) -> Result<Font, FontError> {
        let directory = parse_directory(data, &options)?;
        let tables = Tables::decode(data, &directory)?;

        let head = tables.head().ok_or(FontError::RequiredTableMissing(HEAD))?;
        let maxp = tables.maxp().ok_or(FontError::RequiredTableMissing(MAXP))?;
        let metadata = Metadata::new(&directory, &tables, head, maxp);
        info!("{:?} font with {} glyphs, {} units per em", metadata.flavor, metadata.num_glyphs, metadata.units_per_em);

        let outlines = if options.cache_outlines {
            (0 .. metadata.num_glyphs).map(|_| OnceLock::new()).collect()
        } else {
            Vec::new()
        };

        Ok(Font {
            directory,
            tables,
            metadata,
            options,
            outlines,
        })
    }

    pub fn table_directory(&self) -> &TableDirectory {
        &self.directory
    }
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }
    pub fn options(&self) -> &ParseOptions {
        &self.options
    }
    pub fn tables(&self) -> &Tables {
        &self.tables
    }
    /// Whether the table was present in the directory. Tables this crate
    /// does not decode still count.
    pub fn has_table(&self, tag: Tag) -> bool {
        self.directory.contains(tag)
    }
    /// The decoded table, if `tag` is one this crate understands.
    pub fn table(&self, tag: Tag) -> Option<&Table> {
        self.tables.get(tag)
    }
    pub fn num_glyphs(&self) -> u32 {
        self.metadata.num_glyphs
    }
    pub fn units_per_em(&self) -> u16 {
        self.metadata.units_per_em
    }
    /// Maps design units to the em square.
    pub fn font_matrix(&self) -> Transform2F {
        let scale = 1.0 / self.metadata.units_per_em as f32;
        Transform2F::from_scale(Vector2F::splat(scale))
    }

    fn assembler(&self) -> Result<Assembler, FontError> {
        Assembler::new(&self.tables, self.options.max_composite_depth)
    }

    /// The assembled outline of `gid`.
    ///
    /// Errors are not cached; a failing glyph fails again on the next call.
    pub fn glyph_outline(&self, gid: GlyphId) -> Result<Cow<GlyphOutline>, FontError> {
        if !self.options.cache_outlines {
            return self.assembler()?.assemble(gid.0).map(Cow::Owned);
        }
        let slot = match self.outlines.get(gid.0 as usize) {
            Some(slot) => slot,
            None => return Err(FontError::GlyphIndexOutOfRange { gid: gid.0, num_glyphs: self.num_glyphs() })
        };
        if let Some(outline) = slot.get() {
            return Ok(Cow::Borrowed(outline));
        }
        let outline = self.assembler()?.assemble(gid.0)?;
        // another thread may have stored the same outline in the meantime
        Ok(Cow::Borrowed(slot.get_or_init(|| outline)))
    }

    pub fn glyph_for_codepoint(&self, codepoint: u32) -> Option<GlyphId> {
        trace!("glyph for codepoint {0} ({0:#x})", codepoint);
        self.tables.cmap()?.get_codepoint(codepoint).map(GlyphId)
    }

    /// Lookup through a format 14 variation sequence. Falls back to the
    /// base character for default variations.
    pub fn glyph_for_variant(&self, codepoint: u32, selector: u32) -> Option<GlyphId> {
        let cmap = self.tables.cmap()?;
        cmap.get_pair(codepoint, selector).map(GlyphId)
    }

    /// Advance and left side bearing from hmtx. A composite with a
    /// `USE_MY_METRICS` component takes that component's metrics.
    pub fn glyph_metrics(&self, gid: GlyphId) -> Option<HMetrics> {
        let hmtx = self.tables.hmtx()?;
        if gid.0 >= self.num_glyphs() {
            return None;
        }
        let mut gid = gid.0;
        if let Ok(assembler) = self.assembler() {
            if let Ok(Shape::Compound { components, .. }) = assembler.shape(gid) {
                if let Some(c) = components.iter().find(|c| c.flags & USE_MY_METRICS != 0) {
                    if c.gid < self.num_glyphs() {
                        gid = c.gid;
                    }
                }
            }
        }
        hmtx.metrics_for_gid(gid as u16)
    }
}
