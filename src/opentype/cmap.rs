#![allow(non_snake_case)]

use std::collections::HashMap;
use nom::{
    number::complete::{be_u8, be_u16, be_u32, be_u24},
    bytes::complete::take,
    sequence::tuple,
};
use itertools::multizip;
use crate::{GlyphId, FontError, parsers::*};

/// Highest Unicode scalar value; ranges in format 12/13 are clamped to it.
const MAX_CODEPOINT: u32 = 0x10FFFF;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EncodingRecord {
    pub platform_id: u16,
    pub encoding_id: u16,
    pub format: u16,
}

/// One format 12 or 13 subtable. Groups are kept as ranges, sorted by
/// start code and without overlaps.
#[derive(Debug, Clone)]
struct GroupTable {
    constant: bool,
    groups: Vec<(u32, u32, u32)>,
}
impl GroupTable {
    fn lookup(&self, cp: u32) -> Option<u32> {
        let idx = self.groups.partition_point(|&(start, _, _)| start <= cp);
        let &(start, end, start_gid) = self.groups.get(idx.checked_sub(1)?)?;
        if cp > end {
            return None;
        }
        let gid = if self.constant { start_gid } else { start_gid.wrapping_add(cp - start) };
        if gid == 0 { None } else { Some(gid) }
    }
    fn mappings<'a>(&'a self) -> impl Iterator<Item=(u32, u32)> + 'a {
        self.groups.iter()
            .flat_map(|&(start, end, _)| start ..= end)
            .filter_map(move |cp| self.lookup(cp).map(|gid| (cp, gid)))
    }
}

#[derive(Debug, Clone, Default)]
pub struct CMap {
    single_codepoint: HashMap<u32, u32>,
    /// in subtable order; a later table shadows an earlier one
    group_tables: Vec<GroupTable>,
    double_codepoint: HashMap<(u32, u32), u32>,
    subtables: Vec<EncodingRecord>,
}
impl CMap {
    pub fn get_codepoint(&self, cp: u32) -> Option<u32> {
        match self.single_codepoint.get(&cp) {
            Some(&gid) => Some(gid),
            None => self.group_tables.iter().rev().find_map(|t| t.lookup(cp))
        }
    }
    /// glyph for `base` followed by the variation selector `variant`
    pub fn get_pair(&self, base: u32, variant: u32) -> Option<u32> {
        self.double_codepoint.get(&(base, variant)).cloned()
    }
    /// Every mapped codepoint once. Ranges are walked lazily.
    pub fn items<'a>(&'a self) -> impl Iterator<Item=(u32, GlyphId)> + 'a {
        let ranged = self.group_tables.iter().enumerate().flat_map(move |(n, table)| {
            table.mappings().filter(move |&(cp, _)| {
                !self.single_codepoint.contains_key(&cp)
                    && self.group_tables[n + 1 ..].iter().all(|later| later.lookup(cp).is_none())
            })
        });
        self.single_codepoint.iter()
            .map(|(&cp, &gid)| (cp, gid))
            .chain(ranged)
            .map(|(cp, gid)| (cp, GlyphId(gid)))
    }
    /// Counts through `items`, so it is linear in the number of mappings.
    pub fn len(&self) -> usize {
        self.items().count()
    }
    pub fn is_empty(&self) -> bool {
        self.items().next().is_none()
    }
    /// subtables that contributed to the mapping
    pub fn subtables(&self) -> &[EncodingRecord] {
        &self.subtables
    }
}

fn is_unicode(platform: u16, encoding: u16) -> bool {
    matches!((platform, encoding), (0, _) | (3, 0) | (3, 1) | (3, 10))
}

pub fn parse_cmap(input: &[u8]) -> Result<CMap, FontError> {
    let (i, _version) = be_u16(input)?;
    let (i, num_tables) = be_u16(i)?;
    let (_, records) = take(num_tables as usize * 8)(i)?;

    let mut cmap = CMap::default();
    let mut default_uvs = Vec::new();
    let mut seen_offsets = Vec::new();

    let have_unicode = iterator(records, tuple((be_u16, be_u16, be_u32)))
        .any(|(platform, encoding, _)| is_unicode(platform, encoding));

    for (platform, encoding, offset) in iterator(records, tuple((be_u16, be_u16, be_u32))) {
        let mac_roman = match (platform, encoding) {
            (p, e) if is_unicode(p, e) => false,
            (1, 0) if !have_unicode => true,
            (1, 0) => continue,
            _ => {
                warn!("unsupported cmap platform={}, encoding={}", platform, encoding);
                continue;
            }
        };
        // (0, 3) and (3, 1) usually share one subtable
        if seen_offsets.contains(&offset) {
            continue;
        }
        seen_offsets.push(offset);

        let table = offset!(input, offset);
        let (i, format) = be_u16(table)?;
        debug!("cmap platform={} encoding={} format {}", platform, encoding, format);
        let map = &mut cmap.single_codepoint;
        match format {
            0 => {
                let (i, _len) = be_u16(i)?;
                let (i, _language) = be_u16(i)?;
                let (_, glyphs) = take(256usize)(i)?;
                for (code, &gid) in glyphs.iter().enumerate() {
                    if gid != 0 && !(mac_roman && code >= 0x80) {
                        map.insert(code as u32, gid as u32);
                    }
                }
            }
            4 => {
                let (_, len) = be_u16(i)?;
                let data = if table.len() < len as usize {
                    warn!("cmap format 4 claims {} bytes, {} present", len, table.len());
                    table
                } else {
                    &table[.. len as usize]
                };
                parse_format4(slice!(data, 4 ..), map, mac_roman)?;
            }
            6 => {
                let (i, _len) = be_u16(i)?;
                let (i, _language) = be_u16(i)?;
                let (i, first_code) = be_u16(i)?;
                let (i, entry_count) = be_u16(i)?;
                let (_, glyphs) = take(entry_count as usize * 2)(i)?;
                map.reserve(entry_count as usize);
                for (n, gid) in iterator(glyphs, be_u16).enumerate() {
                    let c = first_code as u32 + n as u32;
                    if gid != 0 && !(mac_roman && c >= 0x80) {
                        trace!("codepoint {}({}+{}) -> gid {}", c, first_code, n, gid);
                        map.insert(c, gid as u32);
                    }
                }
            }
            12 | 13 => {
                let (i, _reserved) = be_u16(i)?;
                let (i, _len) = be_u32(i)?;
                let (i, _language) = be_u32(i)?;
                let (i, num_groups) = be_u32(i)?;
                let (_, groups) = take(num_groups as usize * 12)(i)?;
                let mut table = GroupTable { constant: format == 13, groups: Vec::with_capacity(num_groups as usize) };
                for (start_code, end_code, start_gid) in iterator(groups, tuple((be_u32, be_u32, be_u32))) {
                    trace!("start_code={}, end_code={}, start_gid={}", start_code, end_code, start_gid);
                    if start_code > end_code || start_code > MAX_CODEPOINT {
                        warn!("bad cmap group {}..={}", start_code, end_code);
                        continue;
                    }
                    table.groups.push((start_code, end_code.min(MAX_CODEPOINT), start_gid));
                }
                table.groups.sort_by_key(|&(start, _, _)| start);
                let mut last_end = None;
                table.groups.retain(|&(start, end, _)| {
                    if last_end.map_or(false, |last| start <= last) {
                        warn!("cmap group {}..={} overlaps the previous one", start, end);
                        return false;
                    }
                    last_end = Some(end);
                    true
                });
                // earlier subtables lose the codepoints this one covers
                map.retain(|&cp, _| table.lookup(cp).is_none());
                cmap.group_tables.push(table);
            }
            14 => {
                let (i, length) = be_u32(i)?;
                let i = slice!(i, .. (length as usize).saturating_sub(6));

                let (i, num_var_selector_records) = be_u32(i)?;
                let (_, selectors) = take(num_var_selector_records as usize * 11)(i)?;
                for (var_selector, default_uvs_offset, non_default_uvs_offset) in iterator(selectors, tuple((be_u24, be_u32, be_u32))) {
                    if default_uvs_offset != 0 {
                        let i = offset!(table, default_uvs_offset);
                        let (i, num_unicode_value_ranges) = be_u32(i)?;
                        let (_, ranges) = take(num_unicode_value_ranges as usize * 4)(i)?;
                        for (start_unicode_value, additional_count) in iterator(ranges, tuple((be_u24, be_u8))) {
                            for cp in start_unicode_value ..= start_unicode_value + additional_count as u32 {
                                default_uvs.push((cp, var_selector));
                            }
                        }
                    }
                    if non_default_uvs_offset != 0 {
                        let i = offset!(table, non_default_uvs_offset);
                        let (i, num_uvs_mappings) = be_u32(i)?;
                        let (_, mappings) = take(num_uvs_mappings as usize * 5)(i)?;
                        for (unicode_value, glyph_id) in iterator(mappings, tuple((be_u24, be_u16))) {
                            if glyph_id != 0 {
                                cmap.double_codepoint.insert((unicode_value, var_selector), glyph_id as u32);
                            }
                        }
                    }
                }
            }
            n => {
                warn!("unsupported cmap format {}", n);
                continue;
            }
        }
        cmap.subtables.push(EncodingRecord { platform_id: platform, encoding_id: encoding, format });
    }

    // default variation sequences use whatever the plain mapping says
    for (cp, var_selector) in default_uvs {
        if let Some(gid) = cmap.get_codepoint(cp) {
            cmap.double_codepoint.insert((cp, var_selector), gid);
        }
    }

    Ok(cmap)
}

/// Segment mapping to delta values. `i` starts after format and length.
fn parse_format4(i: &[u8], map: &mut HashMap<u32, u32>, mac_roman: bool) -> Result<(), FontError> {
    let (i, _language) = be_u16(i)?;
    let (i, segCountX2) = be_u16(i)?;
    let (i, _searchRange) = be_u16(i)?;
    let (i, _entrySelector) = be_u16(i)?;
    let (i, _rangeShift) = be_u16(i)?;
    let (i, endCode) = take(segCountX2)(i)?;
    let (i, _reservedPad) = be_u16(i)?;
    let (i, startCode) = take(segCountX2)(i)?;
    let (i, idDelta) = take(segCountX2)(i)?;
    // idRangeOffset is relative to its own position, so keep the glyph array attached
    let idRangeOffset = i;
    let (_, _) = take(segCountX2)(idRangeOffset)?;

    let segments = multizip((
        iterator(startCode, be_u16),
        iterator(endCode, be_u16),
        iterator(idDelta, be_u16),
        iterator(idRangeOffset, be_u16),
    )).take(segCountX2 as usize / 2);

    for (n, (start, end, delta, offset)) in segments.enumerate() {
        trace!("start={}, end={}, delta={}, offset={}", start, end, delta, offset);
        if start == 0xFFFF && end == 0xFFFF {
            break;
        }
        if start > end {
            warn!("cmap segment {} runs backwards: {}..={}", n, start, end);
            continue;
        }
        for c in start ..= end {
            if mac_roman && c >= 0x80 {
                break;
            }
            let gid = if offset == 0 {
                c.wrapping_add(delta)
            } else {
                let index = 2 * n + offset as usize + 2 * (c - start) as usize;
                let gid = match idRangeOffset.get(index .. index + 2) {
                    Some(b) => u16::from_be_bytes([b[0], b[1]]),
                    None => {
                        warn!("cmap segment {} points past the glyph array", n);
                        break;
                    }
                };
                if gid == 0 {
                    continue;
                }
                gid.wrapping_add(delta)
            };
            if gid != 0 {
                trace!("codepoint {} -> gid {}", c, gid);
                map.insert(c as u32, gid as u32);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(records: &[(u16, u16, u32)]) -> Vec<u8> {
        let mut out = vec![0, 0];
        out.extend_from_slice(&(records.len() as u16).to_be_bytes());
        for &(p, e, off) in records {
            out.extend_from_slice(&p.to_be_bytes());
            out.extend_from_slice(&e.to_be_bytes());
            out.extend_from_slice(&off.to_be_bytes());
        }
        out
    }
    fn push_u16s(out: &mut Vec<u8>, values: &[u16]) {
        for v in values {
            out.extend_from_slice(&v.to_be_bytes());
        }
    }

    /// 'A'..='C' -> 10..=12 by delta, 'a'..='b' through the glyph array, and the final segment
    fn format4() -> Vec<u8> {
        let mut sub = Vec::new();
        push_u16s(&mut sub, &[4, 0, 0, 6, 0, 0, 0]);
        push_u16s(&mut sub, &[0x43, 0x62, 0xFFFF]); // endCode
        push_u16s(&mut sub, &[0]);
        push_u16s(&mut sub, &[0x41, 0x61, 0xFFFF]); // startCode
        push_u16s(&mut sub, &[10u16.wrapping_sub(0x41), 0, 1]); // idDelta
        push_u16s(&mut sub, &[0, 4, 0]); // idRangeOffset
        push_u16s(&mut sub, &[20, 0]); // glyphIdArray
        let len = sub.len() as u16;
        sub[2 .. 4].copy_from_slice(&len.to_be_bytes());
        sub
    }

    #[test]
    fn format4_segments() {
        let mut data = header(&[(3, 1, 20), (0, 3, 20)]);
        data.extend(format4());
        let cmap = parse_cmap(&data).unwrap();
        assert_eq!(cmap.get_codepoint(0x41), Some(10));
        assert_eq!(cmap.get_codepoint(0x43), Some(12));
        assert_eq!(cmap.get_codepoint(0x61), Some(20));
        assert_eq!(cmap.get_codepoint(0x62), None);
        assert_eq!(cmap.get_codepoint(0x44), None);
        assert_eq!(cmap.len(), 4);
        // the shared subtable is parsed once
        assert_eq!(cmap.subtables(), &[EncodingRecord { platform_id: 3, encoding_id: 1, format: 4 }]);
    }

    #[test]
    fn format12_and_13_groups() {
        let mut sub12 = Vec::new();
        push_u16s(&mut sub12, &[12, 0]);
        sub12.extend_from_slice(&40u32.to_be_bytes());
        sub12.extend_from_slice(&0u32.to_be_bytes());
        sub12.extend_from_slice(&2u32.to_be_bytes());
        for v in [0x1F600u32, 0x1F602, 5, 0x30, 0x31, 1].iter() {
            sub12.extend_from_slice(&v.to_be_bytes());
        }
        let mut sub13 = sub12.clone();
        sub13[1] = 13;

        let mut data = header(&[(3, 10, 12)]);
        data.extend(&sub12);
        let cmap = parse_cmap(&data).unwrap();
        assert_eq!(cmap.get_codepoint(0x1F601), Some(6));
        assert_eq!(cmap.get_codepoint(0x31), Some(2));

        let mut data = header(&[(3, 10, 12)]);
        data.extend(&sub13);
        let cmap = parse_cmap(&data).unwrap();
        assert_eq!(cmap.get_codepoint(0x1F602), Some(5));
        assert_eq!(cmap.get_codepoint(0x30), Some(1));
    }

    fn format12(groups: &[(u32, u32, u32)]) -> Vec<u8> {
        let mut sub = Vec::new();
        push_u16s(&mut sub, &[12, 0]);
        sub.extend_from_slice(&(16 + 12 * groups.len() as u32).to_be_bytes());
        sub.extend_from_slice(&0u32.to_be_bytes());
        sub.extend_from_slice(&(groups.len() as u32).to_be_bytes());
        for &(start, end, gid) in groups {
            for v in [start, end, gid].iter() {
                sub.extend_from_slice(&v.to_be_bytes());
            }
        }
        sub
    }

    #[test]
    fn wide_groups_stay_ranges() {
        let groups = [(0x80000, 0xFFFF_FFFF, 0x90000), (0x20, 0x7FFFF, 1), (0x100, 0x200, 7)];
        let mut data = header(&[(3, 10, 12)]);
        data.extend(format12(&groups));
        let cmap = parse_cmap(&data).unwrap();
        assert_eq!(cmap.get_codepoint(0x1F), None);
        assert_eq!(cmap.get_codepoint(0x20), Some(1));
        assert_eq!(cmap.get_codepoint(0x7FFFF), Some(0x7FFE0));
        assert_eq!(cmap.get_codepoint(0x80000), Some(0x90000));
        assert_eq!(cmap.get_codepoint(MAX_CODEPOINT), Some(0x11FFFF));
        assert_eq!(cmap.get_codepoint(MAX_CODEPOINT + 1), None);
        // the overlapping group is dropped
        assert_eq!(cmap.get_codepoint(0x100), Some(0xE1));
        assert_eq!(cmap.items().take(3).collect::<Vec<_>>(), vec![(0x20, GlyphId(1)), (0x21, GlyphId(2)), (0x22, GlyphId(3))]);
    }

    #[test]
    fn later_subtables_take_precedence() {
        let sub12 = format12(&[(0x40, 0x41, 30)]);
        let sub4 = format4();

        // format 4 after format 12
        let mut data = header(&[(3, 10, 20), (3, 1, 20 + sub12.len() as u32)]);
        data.extend(&sub12);
        data.extend(&sub4);
        let cmap = parse_cmap(&data).unwrap();
        assert_eq!(cmap.get_codepoint(0x40), Some(30));
        assert_eq!(cmap.get_codepoint(0x41), Some(10));
        assert_eq!(cmap.len(), 5);

        // format 12 after format 4
        let mut data = header(&[(3, 1, 20), (3, 10, 20 + sub4.len() as u32)]);
        data.extend(&sub4);
        data.extend(&sub12);
        let cmap = parse_cmap(&data).unwrap();
        assert_eq!(cmap.get_codepoint(0x41), Some(31));
        assert_eq!(cmap.get_codepoint(0x42), Some(11));
        assert_eq!(cmap.len(), 5);
        let mut items: Vec<_> = cmap.items().collect();
        items.sort();
        assert_eq!(items, vec![
            (0x40, GlyphId(30)), (0x41, GlyphId(31)), (0x42, GlyphId(11)), (0x43, GlyphId(12)), (0x61, GlyphId(20)),
        ]);
    }

    #[test]
    fn variation_sequences() {
        let mut data = header(&[(0, 3, 20), (0, 5, 20 + 16)]);
        // format 6: 'x' -> 3
        push_u16s(&mut data, &[6, 12, 0, 0x78, 1, 3]);
        data.extend_from_slice(&[0; 4]);
        assert_eq!(data.len(), 36);
        let mut sub = Vec::new();
        push_u16s(&mut sub, &[14]);
        sub.extend_from_slice(&0u32.to_be_bytes()); // length, patched below
        sub.extend_from_slice(&1u32.to_be_bytes());
        sub.extend_from_slice(&[0x00, 0xFE, 0x0F]);
        sub.extend_from_slice(&21u32.to_be_bytes());
        sub.extend_from_slice(&29u32.to_be_bytes());
        // default UVS: 'x'
        sub.extend_from_slice(&1u32.to_be_bytes());
        sub.extend_from_slice(&[0, 0, 0x78, 0]);
        // non-default UVS: 'y' -> 9
        sub.extend_from_slice(&1u32.to_be_bytes());
        sub.extend_from_slice(&[0, 0, 0x79, 0, 9]);
        let len = sub.len() as u32;
        sub[2 .. 6].copy_from_slice(&len.to_be_bytes());
        data.extend(sub);

        let cmap = parse_cmap(&data).unwrap();
        assert_eq!(cmap.get_codepoint(0x78), Some(3));
        assert_eq!(cmap.get_pair(0x78, 0xFE0F), Some(3));
        assert_eq!(cmap.get_pair(0x79, 0xFE0F), Some(9));
        assert_eq!(cmap.get_pair(0x78, 0xFE00), None);
    }

    #[test]
    fn mac_roman_only_without_unicode() {
        let mut data = header(&[(1, 0, 12)]);
        push_u16s(&mut data, &[0, 262, 0]);
        let mut glyphs = [0u8; 256];
        glyphs[0x41] = 7;
        glyphs[0xA5] = 8;
        data.extend_from_slice(&glyphs);
        let cmap = parse_cmap(&data).unwrap();
        assert_eq!(cmap.get_codepoint(0x41), Some(7));
        assert_eq!(cmap.get_codepoint(0xA5), None);
    }

    #[test]
    fn truncated_records() {
        let data = header(&[(3, 1, 12)]);
        assert_eq!(parse_cmap(&data[.. 10]).unwrap_err(), FontError::UnexpectedEof);
        assert_eq!(parse_cmap(&data).unwrap_err(), FontError::UnexpectedEof);
    }
}
