use nom::{
    number::complete::be_u16,
    bytes::complete::take,
    sequence::tuple,
};
use crate::{FontError, parsers::{iterator, utf16_be}};

const LANGUAGE_EN_US: u16 = 0x0409;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Name {
    pub family: Option<String>,
    pub subfamily: Option<String>,
    pub unique_id: Option<String>,
    pub full_name: Option<String>,
    pub version: Option<String>,
    pub postscript_name: Option<String>,
}

/// Higher wins when several records carry the same name id.
fn rank(platform_id: u16, encoding_id: u16, language_id: u16) -> Option<u8> {
    match (platform_id, encoding_id) {
        (3, 1) | (3, 10) if language_id == LANGUAGE_EN_US => Some(4),
        (3, 1) | (3, 10) => Some(3),
        (0, _) => Some(2),
        (1, 0) => Some(1),
        _ => None
    }
}

fn decode(platform_id: u16, encoded: &[u8]) -> Option<String> {
    match platform_id {
        // Mac Roman agrees with ASCII in the lower half
        1 => Some(encoded.iter().map(|&b| if b < 0x80 { b as char } else { char::REPLACEMENT_CHARACTER }).collect()),
        _ => utf16_be(encoded).ok()
    }
}

pub fn parse_name(data: &[u8]) -> Result<Name, FontError> {
    let mut name = Name::default();
    let mut ranks = [0u8; 7];

    let (i, format) = be_u16(data)?;
    if format > 1 {
        warn!("name table format {}", format);
        return Ok(name);
    }
    let (i, count) = be_u16(i)?;
    let (i, string_offset) = be_u16(i)?;
    let (_, records) = take(count as usize * 12)(i)?;
    let string_data = offset!(data, string_offset);

    for name_record in iterator(records, tuple((be_u16, be_u16, be_u16, be_u16, be_u16, be_u16))) {
        let (platform_id, encoding_id, language_id, name_id, length, offset) = name_record;
        let field = match name_id {
            1 => &mut name.family,
            2 => &mut name.subfamily,
            3 => &mut name.unique_id,
            4 => &mut name.full_name,
            5 => &mut name.version,
            6 => &mut name.postscript_name,
            _ => continue,
        };
        let record_rank = match rank(platform_id, encoding_id, language_id) {
            Some(r) if r > ranks[name_id as usize] => r,
            _ => continue
        };
        let encoded = slice!(string_data, offset as usize .. offset as usize + length as usize);
        if let Some(s) = decode(platform_id, encoded) {
            *field = Some(s);
            ranks[name_id as usize] = record_rank;
        }
    }
    Ok(name)
}
