//! Builds small TrueType fonts in memory.

#![allow(dead_code)]

use sfnt_outline::directory::table_checksum;
use sfnt_outline::truetype::{
    ARG_1_AND_2_ARE_WORDS, ARGS_ARE_XY_VALUES, WE_HAVE_A_SCALE, WE_HAVE_AN_X_AND_Y_SCALE,
    MORE_COMPONENTS,
};

pub fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Clone, Default)]
pub struct FontBuilder {
    magic: [u8; 4],
    tables: Vec<([u8; 4], Vec<u8>)>,
}

impl FontBuilder {
    pub fn new() -> FontBuilder {
        FontBuilder { magic: [0, 1, 0, 0], tables: vec![] }
    }

    /// head, maxp, hhea, hmtx, loca and glyf for the given glyph records.
    pub fn truetype(glyphs: &[Vec<u8>]) -> FontBuilder {
        let (loca, glyf) = loca_glyf(glyphs);
        let metrics: Vec<(u16, i16)> = (0 .. glyphs.len()).map(|i| (500 + i as u16, i as i16)).collect();
        FontBuilder::new()
            .table(b"head", head(1000, 1))
            .table(b"maxp", maxp(glyphs.len() as u16))
            .table(b"hhea", hhea(800, -200, 90, metrics.len() as u16))
            .table(b"hmtx", hmtx(&metrics))
            .table(b"loca", loca)
            .table(b"glyf", glyf)
    }

    pub fn magic(mut self, magic: &[u8; 4]) -> FontBuilder {
        self.magic = *magic;
        self
    }

    /// Appends a table record. The same tag may be added twice.
    pub fn table(mut self, tag: &[u8; 4], data: Vec<u8>) -> FontBuilder {
        self.tables.push((*tag, data));
        self
    }

    /// Replaces every table with this tag.
    pub fn replace(mut self, tag: &[u8; 4], data: Vec<u8>) -> FontBuilder {
        for entry in self.tables.iter_mut().filter(|(t, _)| t == tag) {
            entry.1 = data.clone();
        }
        self
    }

    pub fn without(mut self, tag: &[u8; 4]) -> FontBuilder {
        self.tables.retain(|(t, _)| t != tag);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write(&mut out);
        out
    }

    /// Appends offset table, records and table data. Offsets are absolute
    /// within `out`.
    pub fn write(&self, out: &mut Vec<u8>) {
        let base = out.len();
        let n = self.tables.len() as u16;
        let entry_selector = 15 - n.max(1).leading_zeros() as u16;
        let search_range: u16 = 16 * (1 << entry_selector);
        out.extend_from_slice(&self.magic);
        out.extend_from_slice(&n.to_be_bytes());
        out.extend_from_slice(&search_range.to_be_bytes());
        out.extend_from_slice(&entry_selector.to_be_bytes());
        out.extend_from_slice(&(n * 16 - search_range.min(n * 16)).to_be_bytes());

        let mut offset = base + 12 + 16 * self.tables.len();
        for (tag, data) in &self.tables {
            out.extend_from_slice(tag);
            out.extend_from_slice(&table_checksum(data).to_be_bytes());
            out.extend_from_slice(&(offset as u32).to_be_bytes());
            out.extend_from_slice(&(data.len() as u32).to_be_bytes());
            offset += padded(data.len());
        }
        for (_, data) in &self.tables {
            out.extend_from_slice(data);
            out.resize(out.len() + padded(data.len()) - data.len(), 0);
        }
    }
}

fn padded(len: usize) -> usize {
    (len + 3) & !3
}

pub fn collection(fonts: &[FontBuilder]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"ttcf");
    out.extend_from_slice(&[0, 1, 0, 0]);
    out.extend_from_slice(&(fonts.len() as u32).to_be_bytes());
    let offsets_at = out.len();
    out.resize(out.len() + 4 * fonts.len(), 0);
    for (i, font) in fonts.iter().enumerate() {
        let start = out.len() as u32;
        out[offsets_at + 4 * i .. offsets_at + 4 * i + 4].copy_from_slice(&start.to_be_bytes());
        font.write(&mut out);
    }
    out
}

fn push16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_be_bytes());
}
fn push32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_be_bytes());
}

pub fn head(units_per_em: u16, loca_format: i16) -> Vec<u8> {
    let mut out = Vec::new();
    push32(&mut out, 0x0001_0000);
    push32(&mut out, 0x0001_0000);
    push32(&mut out, 0);
    push32(&mut out, 0x5F0F_3CF5);
    push16(&mut out, 0);
    push16(&mut out, units_per_em);
    out.extend_from_slice(&[0; 16]);
    for &v in &[-50i16, -250, 1050, 900] {
        out.extend_from_slice(&v.to_be_bytes());
    }
    push16(&mut out, 0);
    push16(&mut out, 8);
    push16(&mut out, 2);
    out.extend_from_slice(&loca_format.to_be_bytes());
    push16(&mut out, 0);
    out
}

pub fn maxp(num_glyphs: u16) -> Vec<u8> {
    let mut out = Vec::new();
    push32(&mut out, 0x0000_5000);
    push16(&mut out, num_glyphs);
    out
}

pub fn hhea(ascender: i16, descender: i16, line_gap: i16, number_of_hmetrics: u16) -> Vec<u8> {
    let mut out = Vec::new();
    push32(&mut out, 0x0001_0000);
    for &v in &[ascender, descender, line_gap] {
        out.extend_from_slice(&v.to_be_bytes());
    }
    out.resize(34, 0);
    push16(&mut out, number_of_hmetrics);
    out
}

pub fn hmtx(metrics: &[(u16, i16)]) -> Vec<u8> {
    let mut out = Vec::new();
    for &(advance, lsb) in metrics {
        push16(&mut out, advance);
        out.extend_from_slice(&lsb.to_be_bytes());
    }
    out
}

/// Long loca plus glyf for the given glyph records.
pub fn loca_glyf(glyphs: &[Vec<u8>]) -> (Vec<u8>, Vec<u8>) {
    let mut loca = Vec::new();
    let mut glyf = Vec::new();
    for glyph in glyphs {
        push32(&mut loca, glyf.len() as u32);
        glyf.extend_from_slice(glyph);
    }
    push32(&mut loca, glyf.len() as u32);
    (loca, glyf)
}

fn glyph_header(out: &mut Vec<u8>, contours: i16, bounds: [i16; 4]) {
    out.extend_from_slice(&contours.to_be_bytes());
    for v in &bounds {
        out.extend_from_slice(&v.to_be_bytes());
    }
}

/// A simple glyph with long coordinate deltas.
pub fn simple_glyph(contours: &[&[(i16, i16, bool)]]) -> Vec<u8> {
    let points: Vec<(i16, i16, bool)> = contours.iter().flat_map(|c| c.iter().cloned()).collect();
    let bounds = [
        points.iter().map(|p| p.0).min().unwrap_or(0),
        points.iter().map(|p| p.1).min().unwrap_or(0),
        points.iter().map(|p| p.0).max().unwrap_or(0),
        points.iter().map(|p| p.1).max().unwrap_or(0),
    ];
    let mut out = Vec::new();
    glyph_header(&mut out, contours.len() as i16, bounds);
    let mut end = 0;
    for c in contours {
        end += c.len() as u16;
        push16(&mut out, end - 1);
    }
    push16(&mut out, 0);
    out.extend(points.iter().map(|&(_, _, on)| on as u8));
    let mut last = 0;
    for &(x, _, _) in &points {
        out.extend_from_slice(&(x - last).to_be_bytes());
        last = x;
    }
    let mut last = 0;
    for &(_, y, _) in &points {
        out.extend_from_slice(&(y - last).to_be_bytes());
        last = y;
    }
    out
}

pub fn offset_component(gid: u16, dx: i16, dy: i16) -> Vec<u8> {
    let mut out = Vec::new();
    push16(&mut out, ARG_1_AND_2_ARE_WORDS | ARGS_ARE_XY_VALUES);
    push16(&mut out, gid);
    out.extend_from_slice(&dx.to_be_bytes());
    out.extend_from_slice(&dy.to_be_bytes());
    out
}

pub fn scaled_component(gid: u16, dx: i16, dy: i16, scale: f32) -> Vec<u8> {
    let mut out = offset_component(gid, dx, dy);
    out[1] |= WE_HAVE_A_SCALE as u8;
    out.extend_from_slice(&((scale * 16384.0).round() as i16).to_be_bytes());
    out
}

pub fn xy_scaled_component(gid: u16, dx: i16, dy: i16, x_scale: f32, y_scale: f32) -> Vec<u8> {
    let mut out = offset_component(gid, dx, dy);
    out[1] |= WE_HAVE_AN_X_AND_Y_SCALE as u8;
    for &scale in &[x_scale, y_scale] {
        out.extend_from_slice(&((scale * 16384.0).round() as i16).to_be_bytes());
    }
    out
}

/// Sets extra flag bits on an encoded component record.
pub fn with_flags(mut component: Vec<u8>, flags: u16) -> Vec<u8> {
    let old = u16::from_be_bytes([component[0], component[1]]);
    component[0 .. 2].copy_from_slice(&(old | flags).to_be_bytes());
    component
}

pub fn matched_component(gid: u16, parent: u16, child: u16) -> Vec<u8> {
    let mut out = Vec::new();
    push16(&mut out, ARG_1_AND_2_ARE_WORDS);
    push16(&mut out, gid);
    push16(&mut out, parent);
    push16(&mut out, child);
    out
}

/// Joins component records, setting `MORE_COMPONENTS` on all but the last.
pub fn composite_glyph(bounds: [i16; 4], components: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();
    glyph_header(&mut out, -1, bounds);
    for (i, c) in components.iter().enumerate() {
        let start = out.len();
        out.extend_from_slice(c);
        if i + 1 < components.len() {
            out[start + 1] |= MORE_COMPONENTS as u8;
        }
    }
    out
}

/// A (3, 10) cmap with a single format 12 subtable.
pub fn cmap_format12(groups: &[(u32, u32, u32)]) -> Vec<u8> {
    let mut out = Vec::new();
    push16(&mut out, 0);
    push16(&mut out, 1);
    push16(&mut out, 3);
    push16(&mut out, 10);
    push32(&mut out, 12);
    push16(&mut out, 12);
    push16(&mut out, 0);
    push32(&mut out, 16 + 12 * groups.len() as u32);
    push32(&mut out, 0);
    push32(&mut out, groups.len() as u32);
    for &(start, end, gid) in groups {
        push32(&mut out, start);
        push32(&mut out, end);
        push32(&mut out, gid);
    }
    out
}

/// A name table with a Windows English family name.
pub fn name_table(family: &str) -> Vec<u8> {
    let encoded: Vec<u8> = family.encode_utf16().flat_map(|u| u.to_be_bytes().to_vec()).collect();
    let mut out = Vec::new();
    push16(&mut out, 0);
    push16(&mut out, 1);
    push16(&mut out, 6 + 12);
    for &v in &[3, 1, 0x0409, 1, encoded.len() as u16, 0] {
        push16(&mut out, v);
    }
    out.extend(encoded);
    out
}

pub fn square(size: i16) -> Vec<u8> {
    simple_glyph(&[&[(0, 0, true), (size, 0, true), (size, size, true), (0, size, true)]])
}
