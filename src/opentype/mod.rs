//! Decoders for the sfnt tables this crate understands.
//!
//! Tables are decoded in the fixed order of [`DECODERS`]; a decoder may
//! only look at tables that appear before it in that list.

#![allow(non_snake_case)]

use std::ops::Range;
use indexmap::IndexMap;
use nom::{
    number::complete::{be_u16, be_i16, be_i64, be_u32},
    multi::count,
    combinator::map,
    sequence::tuple,
};
use pathfinder_geometry::{vector::Vector2F, rect::RectF};
use crate::{FontError, Tag};
use crate::directory::TableDirectory;
use crate::parsers::fixed;
use crate::tag::{HEAD, MAXP, HHEA, HMTX, LOCA, GLYF, CMAP, NAME, OS2, POST};

pub mod cmap;
pub mod name;
pub mod os2;
pub mod post;

use cmap::{CMap, parse_cmap};
use name::{Name, parse_name};
use os2::{Os2, parse_os2};
use post::{Post, parse_post};

/// A decoded table, one variant per supported tag.
#[derive(Clone, Debug)]
pub enum Table {
    Head(Head),
    Maxp(Maxp),
    Hhea(Hhea),
    Hmtx(Hmtx),
    Loca(Loca),
    Glyf(Glyf),
    Cmap(CMap),
    Name(Name),
    Os2(Os2),
    Post(Post),
}
impl Table {
    pub fn tag(&self) -> Tag {
        match *self {
            Table::Head(_) => HEAD,
            Table::Maxp(_) => MAXP,
            Table::Hhea(_) => HHEA,
            Table::Hmtx(_) => HMTX,
            Table::Loca(_) => LOCA,
            Table::Glyf(_) => GLYF,
            Table::Cmap(_) => CMAP,
            Table::Name(_) => NAME,
            Table::Os2(_) => OS2,
            Table::Post(_) => POST,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Requirement {
    Required,
    Optional,
}
use Requirement::*;

type Decoder = fn(&[u8], &Tables) -> Result<Table, FontError>;

/// Decode order. Dependencies always come first.
const DECODERS: [(Tag, Requirement, Decoder); 10] = [
    (HEAD, Required, decode_head),
    (MAXP, Required, decode_maxp),
    (HHEA, Optional, decode_hhea),
    (HMTX, Optional, decode_hmtx),
    (LOCA, Required, decode_loca),
    (GLYF, Required, decode_glyf),
    (CMAP, Optional, decode_cmap),
    (NAME, Optional, decode_name),
    (OS2, Optional, decode_os2),
    (POST, Optional, decode_post),
];

fn decode_head(data: &[u8], _: &Tables) -> Result<Table, FontError> {
    parse_head(data).map(Table::Head)
}
fn decode_maxp(data: &[u8], _: &Tables) -> Result<Table, FontError> {
    parse_maxp(data).map(Table::Maxp)
}
fn decode_hhea(data: &[u8], _: &Tables) -> Result<Table, FontError> {
    parse_hhea(data).map(Table::Hhea)
}
fn decode_hmtx(data: &[u8], tables: &Tables) -> Result<Table, FontError> {
    let hhea = tables.hhea().ok_or(FontError::RequiredTableMissing(HHEA))?;
    let maxp = tables.maxp().ok_or(FontError::RequiredTableMissing(MAXP))?;
    parse_hmtx(data, hhea, maxp).map(Table::Hmtx)
}
fn decode_loca(data: &[u8], tables: &Tables) -> Result<Table, FontError> {
    let head = tables.head().ok_or(FontError::RequiredTableMissing(HEAD))?;
    let maxp = tables.maxp().ok_or(FontError::RequiredTableMissing(MAXP))?;
    parse_loca(data, head, maxp).map(Table::Loca)
}
fn decode_glyf(data: &[u8], tables: &Tables) -> Result<Table, FontError> {
    if let Some(&end) = tables.loca().and_then(|loca| loca.offsets.last()) {
        if end as usize > data.len() {
            warn!("loca points {} bytes past the end of glyf", end as usize - data.len());
        }
    }
    Ok(Table::Glyf(Glyf { data: data.to_vec() }))
}
fn decode_cmap(data: &[u8], _: &Tables) -> Result<Table, FontError> {
    parse_cmap(data).map(Table::Cmap)
}
fn decode_name(data: &[u8], _: &Tables) -> Result<Table, FontError> {
    parse_name(data).map(Table::Name)
}
fn decode_os2(data: &[u8], _: &Tables) -> Result<Table, FontError> {
    parse_os2(data).map(Table::Os2)
}
fn decode_post(data: &[u8], _: &Tables) -> Result<Table, FontError> {
    parse_post(data).map(Table::Post)
}

macro_rules! accessor {
    ($name:ident, $tag:expr, $variant:ident, $ty:ty) => (
        pub fn $name(&self) -> Option<&$ty> {
            match self.entries.get(&$tag) {
                Some(Table::$variant(ref table)) => Some(table),
                _ => None
            }
        }
    )
}

/// All decoded tables of one font, keyed by tag.
#[derive(Clone, Debug, Default)]
pub struct Tables {
    entries: IndexMap<Tag, Table>
}
impl Tables {
    pub fn decode(data: &[u8], directory: &TableDirectory) -> Result<Tables, FontError> {
        let mut tables = Tables::default();
        for &(tag, requirement, decoder) in DECODERS.iter() {
            let table_data = match directory.data(data, tag) {
                Some(table_data) => table_data,
                None if requirement == Required => return Err(FontError::RequiredTableMissing(tag)),
                None => {
                    debug!("no '{}' table", tag);
                    continue;
                }
            };
            debug!("decoding '{}' ({} bytes)", tag, table_data.len());
            let table = decoder(table_data, &tables).map_err(|e| e.in_table(tag))?;
            tables.entries.insert(tag, table);
        }
        Ok(tables)
    }
    pub fn get(&self, tag: Tag) -> Option<&Table> {
        self.entries.get(&tag)
    }
    pub fn contains(&self, tag: Tag) -> bool {
        self.entries.contains_key(&tag)
    }
    /// tables in decode order
    pub fn iter(&self) -> impl Iterator<Item=&Table> {
        self.entries.values()
    }
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    accessor!(head, HEAD, Head, Head);
    accessor!(maxp, MAXP, Maxp, Maxp);
    accessor!(hhea, HHEA, Hhea, Hhea);
    accessor!(hmtx, HMTX, Hmtx, Hmtx);
    accessor!(loca, LOCA, Loca, Loca);
    accessor!(glyf, GLYF, Glyf, Glyf);
    accessor!(cmap, CMAP, Cmap, CMap);
    accessor!(name, NAME, Name, Name);
    accessor!(os2, OS2, Os2, Os2);
    accessor!(post, POST, Post, Post);
}

pub const HEAD_MAGIC: u32 = 0x5F0F3CF5;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LocaFormat {
    /// u16 offsets, stored halved
    Short,
    Long,
}

#[derive(Clone, Debug)]
pub struct Head {
    pub font_revision: f32,
    pub checksum_adjustment: u32,
    pub flags: u16,
    pub units_per_em: u16,
    /// seconds since 1904-01-01
    pub created: i64,
    pub modified: i64,
    pub x_min: i16,
    pub y_min: i16,
    pub x_max: i16,
    pub y_max: i16,
    pub mac_style: u16,
    pub lowest_rec_ppem: u16,
    pub font_direction_hint: i16,
    pub index_to_loc_format: LocaFormat,
}
impl Head {
    pub fn bbox(&self) -> RectF {
        let bb_min = Vector2F::new(self.x_min as f32, self.y_min as f32);
        let bb_max = Vector2F::new(self.x_max as f32, self.y_max as f32);
        RectF::from_points(bb_min, bb_max)
    }
}
pub fn parse_head(i: &[u8]) -> Result<Head, FontError> {
    let (i, major) = be_u16(i)?;
    let (i, minor) = be_u16(i)?;
    if (major, minor) != (1, 0) {
        warn!("head version {}.{}", major, minor);
    }

    let (i, font_revision) = fixed(i)?;
    let (i, checksum_adjustment) = be_u32(i)?;
    let (i, magic) = be_u32(i)?;
    require!(magic == HEAD_MAGIC, FontError::InvalidValue { tag: HEAD, field: "magicNumber", value: magic as i64 });

    let (i, flags) = be_u16(i)?;
    let (i, units_per_em) = be_u16(i)?;
    if !(16 ..= 16384).contains(&units_per_em) {
        warn!("unitsPerEm {} outside 16..=16384", units_per_em);
    }

    let (i, created) = be_i64(i)?;
    let (i, modified) = be_i64(i)?;

    let (i, (x_min, y_min, x_max, y_max)) = tuple((be_i16, be_i16, be_i16, be_i16))(i)?;

    let (i, mac_style) = be_u16(i)?;
    let (i, lowest_rec_ppem) = be_u16(i)?;
    let (i, font_direction_hint) = be_i16(i)?;
    let (i, index_to_loc_format) = be_i16(i)?;
    let (_, glyph_data_format) = be_i16(i)?;

    let index_to_loc_format = match index_to_loc_format {
        0 => LocaFormat::Short,
        1 => LocaFormat::Long,
        n => return Err(FontError::InvalidValue { tag: HEAD, field: "indexToLocFormat", value: n as i64 })
    };
    require!(glyph_data_format == 0, FontError::InvalidValue {
        tag: HEAD,
        field: "glyphDataFormat",
        value: glyph_data_format as i64
    });

    Ok(Head {
        font_revision,
        checksum_adjustment,
        flags,
        units_per_em,
        created,
        modified,
        x_min, y_min, x_max, y_max,
        mac_style,
        lowest_rec_ppem,
        font_direction_hint,
        index_to_loc_format,
    })
}

/// The version 1.0 part of maxp.
#[derive(Clone, Debug, Default)]
pub struct MaxpLimits {
    pub max_points: u16,
    pub max_contours: u16,
    pub max_composite_points: u16,
    pub max_composite_contours: u16,
    pub max_zones: u16,
    pub max_twilight_points: u16,
    pub max_storage: u16,
    pub max_function_defs: u16,
    pub max_instruction_defs: u16,
    pub max_stack_elements: u16,
    pub max_size_of_instructions: u16,
    pub max_component_elements: u16,
    pub max_component_depth: u16,
}

#[derive(Clone, Debug)]
pub struct Maxp {
    pub num_glyphs: u16,
    pub limits: Option<MaxpLimits>,
}
pub fn parse_maxp(i: &[u8]) -> Result<Maxp, FontError> {
    let (i, version) = be_u32(i)?;
    let (i, num_glyphs) = be_u16(i)?;
    let limits = match version {
        0x0000_5000 => None,
        0x0001_0000 => {
            let (_, v) = count(be_u16, 13)(i)?;
            Some(MaxpLimits {
                max_points: v[0],
                max_contours: v[1],
                max_composite_points: v[2],
                max_composite_contours: v[3],
                max_zones: v[4],
                max_twilight_points: v[5],
                max_storage: v[6],
                max_function_defs: v[7],
                max_instruction_defs: v[8],
                max_stack_elements: v[9],
                max_size_of_instructions: v[10],
                max_component_elements: v[11],
                max_component_depth: v[12],
            })
        }
        v => return Err(FontError::InvalidValue { tag: MAXP, field: "version", value: v as i64 })
    };
    Ok(Maxp { num_glyphs, limits })
}

#[derive(Clone, Debug)]
pub struct Hhea {
    pub ascender: i16,
    pub descender: i16,
    pub line_gap: i16,
    pub advance_width_max: u16,
    pub min_left_side_bearing: i16,
    pub min_right_side_bearing: i16,
    pub x_max_extent: i16,
    pub caret_slope_rise: i16,
    pub caret_slope_run: i16,
    pub caret_offset: i16,
    pub number_of_hmetrics: u16,
}
pub fn parse_hhea(i: &[u8]) -> Result<Hhea, FontError> {
    let (i, _majorVersion) = be_u16(i)?;
    let (i, _minorVersion) = be_u16(i)?;
    let (i, ascender) = be_i16(i)?;
    let (i, descender) = be_i16(i)?;
    let (i, line_gap) = be_i16(i)?;
    let (i, advance_width_max) = be_u16(i)?;
    let (i, min_left_side_bearing) = be_i16(i)?;
    let (i, min_right_side_bearing) = be_i16(i)?;
    let (i, x_max_extent) = be_i16(i)?;
    let (i, caret_slope_rise) = be_i16(i)?;
    let (i, caret_slope_run) = be_i16(i)?;
    let (i, caret_offset) = be_i16(i)?;
    let (i, _reserved) = count(be_i16, 4)(i)?;
    let (i, _metricDataFormat) = be_i16(i)?;
    let (_, number_of_hmetrics) = be_u16(i)?;

    Ok(Hhea {
        ascender,
        descender,
        line_gap,
        advance_width_max,
        min_left_side_bearing,
        min_right_side_bearing,
        x_max_extent,
        caret_slope_rise,
        caret_slope_run,
        caret_offset,
        number_of_hmetrics,
    })
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct HMetrics {
    pub advance: u16,
    pub lsb: i16,
}

#[derive(Clone, Debug)]
pub struct Hmtx {
    metrics: Vec<(u16, i16)>, // (advance, lsb)
    lsbs: Vec<i16>,
}
impl Hmtx {
    /// Glyphs past the last full record repeat its advance.
    pub fn metrics_for_gid(&self, gid: u16) -> Option<HMetrics> {
        let gid = gid as usize;
        if let Some(&(advance, lsb)) = self.metrics.get(gid) {
            return Some(HMetrics { advance, lsb });
        }
        let &(advance, _) = self.metrics.last()?;
        let lsb = *self.lsbs.get(gid - self.metrics.len())?;
        Some(HMetrics { advance, lsb })
    }
}
pub fn parse_hmtx(i: &[u8], hhea: &Hhea, maxp: &Maxp) -> Result<Hmtx, FontError> {
    let num_metrics = hhea.number_of_hmetrics;
    require!(num_metrics > 0 || maxp.num_glyphs == 0, FontError::InvalidValue {
        tag: HHEA,
        field: "numberOfHMetrics",
        value: 0
    });
    if num_metrics > maxp.num_glyphs {
        warn!("{} hmetrics for {} glyphs", num_metrics, maxp.num_glyphs);
    }
    let (i, metrics) = count(
        tuple((be_u16, be_i16)),
        num_metrics as usize
    )(i)?;
    let num_lsbs = maxp.num_glyphs.saturating_sub(num_metrics);
    let (_, lsbs) = count(be_i16, num_lsbs as usize)(i)?;

    Ok(Hmtx {
        metrics,
        lsbs,
    })
}

/// Glyph offsets into `glyf`, `numGlyphs + 1` of them.
#[derive(Clone, Debug)]
pub struct Loca {
    format: LocaFormat,
    offsets: Vec<u32>,
}
impl Loca {
    pub fn format(&self) -> LocaFormat {
        self.format
    }
    pub fn offsets(&self) -> &[u32] {
        &self.offsets
    }
    /// The glyph's (start, end) within glyf. Not checked against glyf.
    pub fn glyph_range(&self, gid: u32) -> Option<Range<u32>> {
        let gid = gid as usize;
        match (self.offsets.get(gid), self.offsets.get(gid + 1)) {
            (Some(&start), Some(&end)) => Some(start .. end),
            _ => None
        }
    }
}
pub fn parse_loca(i: &[u8], head: &Head, maxp: &Maxp) -> Result<Loca, FontError> {
    let n = maxp.num_glyphs as usize + 1;
    let (_, offsets) = match head.index_to_loc_format {
        LocaFormat::Short => count(map(be_u16, |off| 2 * off as u32), n)(i)?,
        LocaFormat::Long => count(be_u32, n)(i)?,
    };
    Ok(Loca {
        format: head.index_to_loc_format,
        offsets
    })
}

/// Raw glyph records; decoded one glyph at a time by the outline assembler.
#[derive(Clone, Debug)]
pub struct Glyf {
    data: Vec<u8>,
}
impl Glyf {
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}
