//! The offset table and table records at the start of every sfnt, and
//! the `ttcf` header that points at several of them.

use std::ops::Range;
use indexmap::IndexMap;
use nom::{
    number::complete::{be_u16, be_u32},
    bytes::complete::take,
    sequence::tuple,
};
use crate::{FontError, ParseOptions, DuplicateTagPolicy, Tag, R};
use crate::parsers::{parse, iterator_n};
use crate::tag::HEAD;

const OFFSET_TABLE_SIZE: usize = 12;
const TABLE_RECORD_SIZE: usize = 16;
const COLLECTION_HEADER_SIZE: usize = 12;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Flavor {
    /// 0x00010000
    TrueType,
    /// `OTTO`, CFF outlines
    OpenType,
    /// `true`, Apple's TrueType signature
    AppleTrueType,
}
impl Flavor {
    fn from_magic(magic: &[u8; 4]) -> Option<Flavor> {
        match magic {
            [0, 1, 0, 0] => Some(Flavor::TrueType),
            b"OTTO" => Some(Flavor::OpenType),
            b"true" => Some(Flavor::AppleTrueType),
            _ => None
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TableRecord {
    pub tag: Tag,
    pub checksum: u32,
    pub offset: u32,
    pub length: u32,
}
impl TableRecord {
    pub fn range(&self) -> Range<usize> {
        self.offset as usize .. self.offset as usize + self.length as usize
    }
}

#[derive(Clone, Debug)]
pub struct TableDirectory {
    flavor: Flavor,
    /// where the offset table starts; non-zero inside collections
    offset: usize,
    records: IndexMap<Tag, TableRecord>,
}
impl TableDirectory {
    pub fn flavor(&self) -> Flavor {
        self.flavor
    }
    pub fn offset(&self) -> usize {
        self.offset
    }
    pub fn get(&self, tag: Tag) -> Option<&TableRecord> {
        self.records.get(&tag)
    }
    pub fn contains(&self, tag: Tag) -> bool {
        self.records.contains_key(&tag)
    }
    /// records in directory order
    pub fn records(&self) -> impl Iterator<Item=&TableRecord> {
        self.records.values()
    }
    pub fn len(&self) -> usize {
        self.records.len()
    }
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
    /// The bytes of `tag`. Ranges were validated when the directory was read.
    pub fn data<'a>(&self, font: &'a [u8], tag: Tag) -> Option<&'a [u8]> {
        self.records.get(&tag).and_then(|record| font.get(record.range()))
    }
}

fn magic(data: &[u8]) -> Result<[u8; 4], FontError> {
    match data.get(.. 4) {
        Some(bytes) => Ok([bytes[0], bytes[1], bytes[2], bytes[3]]),
        None => Err(FontError::TruncatedBuffer { needed: 4, available: data.len() })
    }
}

fn collection_offsets(data: &[u8]) -> Result<Vec<u32>, FontError> {
    require!(data.len() >= COLLECTION_HEADER_SIZE, FontError::TruncatedBuffer {
        needed: COLLECTION_HEADER_SIZE,
        available: data.len()
    });
    let (i, (major, minor, num_fonts)) = collection_header(data)?;
    debug!("collection version {}.{} with {} fonts", major, minor, num_fonts);

    let needed = COLLECTION_HEADER_SIZE as u64 + 4 * num_fonts as u64;
    require!(needed <= data.len() as u64, FontError::TruncatedBuffer {
        needed: needed as usize,
        available: data.len()
    });
    Ok(iterator_n(i, be_u32, num_fonts as usize).collect())
}

/// Number of fonts in `data`: 1 for a plain sfnt, the font count for a collection.
pub fn num_fonts(data: &[u8]) -> Result<u32, FontError> {
    match &magic(data)? {
        b"ttcf" => Ok(collection_offsets(data)?.len() as u32),
        m if Flavor::from_magic(m).is_some() => Ok(1),
        m => Err(FontError::MalformedHeader(format!("unknown magic {:?}", m)))
    }
}

pub fn parse_directory(data: &[u8], options: &ParseOptions) -> Result<TableDirectory, FontError> {
    let magic = magic(data)?;
    info!("font magic: {:?}", Tag(magic));

    let start = match &magic {
        b"ttcf" => {
            let offsets = collection_offsets(data)?;
            match offsets.get(options.collection_index as usize) {
                Some(&offset) => offset as usize,
                None => return Err(FontError::CollectionIndexOutOfRange {
                    index: options.collection_index,
                    num_fonts: offsets.len() as u32
                })
            }
        }
        _ => 0
    };
    parse_offset_table(data, start, options)
}

fn parse_offset_table(data: &[u8], start: usize, options: &ParseOptions) -> Result<TableDirectory, FontError> {
    let header = match data.get(start ..) {
        Some(header) if header.len() >= OFFSET_TABLE_SIZE => header,
        _ => return Err(FontError::TruncatedBuffer {
            needed: start + OFFSET_TABLE_SIZE,
            available: data.len()
        })
    };
    let (i, (magic, num_tables, search_range, entry_selector, range_shift)) = offset_table(header)?;

    let flavor = match Flavor::from_magic(&magic) {
        Some(flavor) => flavor,
        None => return Err(FontError::MalformedHeader(format!("unknown magic {:?} at offset {}", Tag(magic), start)))
    };
    check_search_fields(num_tables, search_range, entry_selector, range_shift);

    let needed = start + OFFSET_TABLE_SIZE + TABLE_RECORD_SIZE * num_tables as usize;
    require!(needed <= data.len(), FontError::TruncatedBuffer { needed, available: data.len() });

    let mut records = IndexMap::with_capacity(num_tables as usize);
    for record in iterator_n(i, table_record, num_tables) {
        debug!("tag: {} offset={} length={}", record.tag, record.offset, record.length);
        require!(record.offset as u64 + record.length as u64 <= data.len() as u64, FontError::InvalidTableRange {
            tag: record.tag,
            offset: record.offset,
            length: record.length
        });
        if options.verify_checksums {
            verify_checksum(data, &record)?;
        }
        if records.contains_key(&record.tag) {
            match options.duplicate_tags {
                DuplicateTagPolicy::Reject => return Err(FontError::MalformedHeader(
                    format!("duplicate table record '{}'", record.tag)
                )),
                DuplicateTagPolicy::LastWins => warn!("duplicate table record '{}', keeping the later one", record.tag)
            }
        }
        records.insert(record.tag, record);
    }

    Ok(TableDirectory {
        flavor,
        offset: start,
        records
    })
}

fn collection_header(i: &[u8]) -> R<(u16, u16, u32)> {
    let (i, _ttcf) = take(4usize)(i)?;
    tuple((be_u16, be_u16, be_u32))(i)
}

fn offset_table(i: &[u8]) -> R<([u8; 4], u16, u16, u16, u16)> {
    let (i, magic) = be_u32(i)?;
    let (i, (num_tables, search_range, entry_selector, range_shift)) = tuple((be_u16, be_u16, be_u16, be_u16))(i)?;
    Ok((i, (magic.to_be_bytes(), num_tables, search_range, entry_selector, range_shift)))
}

fn table_record(i: &[u8]) -> R<TableRecord> {
    let mut i = i;
    let tag = parse(&mut i, be_u32)?;
    let (checksum, offset, length) = parse(&mut i, tuple((be_u32, be_u32, be_u32)))?;
    Ok((i, TableRecord {
        tag: Tag(tag.to_be_bytes()),
        checksum,
        offset,
        length
    }))
}

fn check_search_fields(num_tables: u16, search_range: u16, entry_selector: u16, range_shift: u16) {
    if num_tables == 0 {
        return;
    }
    let entry_selector_expected = 15 - num_tables.leading_zeros() as u16;
    let search_range_expected = (1u32 << entry_selector_expected) * 16;
    let range_shift_expected = num_tables as u32 * 16 - search_range_expected;
    if (search_range as u32, entry_selector, range_shift as u32) != (search_range_expected, entry_selector_expected, range_shift_expected) {
        warn!(
            "inconsistent search fields: searchRange={} entrySelector={} rangeShift={} for {} tables",
            search_range, entry_selector, range_shift, num_tables
        );
    }
}

/// Sum of the table as big endian u32 words, the last one zero padded.
pub fn table_checksum(data: &[u8]) -> u32 {
    data.chunks(4).fold(0u32, |sum, chunk| {
        let mut word = [0; 4];
        word[.. chunk.len()].copy_from_slice(chunk);
        sum.wrapping_add(u32::from_be_bytes(word))
    })
}

fn verify_checksum(data: &[u8], record: &TableRecord) -> Result<(), FontError> {
    let table = &data[record.range()];
    let mut actual = table_checksum(table);
    if record.tag == HEAD && table.len() >= 12 {
        // checkSumAdjustment is excluded from the head checksum
        actual = actual.wrapping_sub(u32::from_be_bytes([table[8], table[9], table[10], table[11]]));
    }
    if actual != record.checksum {
        return Err(FontError::ChecksumMismatch { tag: record.tag, expected: record.checksum, actual });
    }
    Ok(())
}
