use nom::{
    number::complete::{be_u16, be_i16, be_u32},
    bytes::complete::take,
    sequence::tuple,
};
use crate::{FontError, Tag, R};

/// Vertical metrics from the version 0 tail of the table. Some old Apple
/// fonts stop before them.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TypoMetrics {
    pub ascender: i16,
    pub descender: i16,
    pub line_gap: i16,
    pub win_ascent: u16,
    pub win_descent: u16,
}

#[derive(Clone, Debug)]
pub struct Os2 {
    pub version: u16,
    pub x_avg_char_width: i16,
    pub weight: u16,
    pub width: u16,
    pub fs_type: u16,
    pub strikeout_size: i16,
    pub strikeout_position: i16,
    pub family_class: i16,
    pub panose: [u8; 10],
    pub vendor_id: Tag,
    pub fs_selection: u16,
    pub first_char_index: u16,
    pub last_char_index: u16,
    pub typo: Option<TypoMetrics>,
    pub x_height: Option<i16>,
    pub cap_height: Option<i16>,
}

pub fn parse_os2(data: &[u8]) -> Result<Os2, FontError> {
    let (i, version) = be_u16(data)?;
    let (i, x_avg_char_width) = be_i16(i)?;
    let (i, weight) = be_u16(i)?;
    let (i, width) = be_u16(i)?;
    let (i, fs_type) = be_u16(i)?;
    // sub- and superscript size and offset
    let (i, _) = take(16usize)(i)?;
    let (i, strikeout_size) = be_i16(i)?;
    let (i, strikeout_position) = be_i16(i)?;
    let (i, family_class) = be_i16(i)?;
    let (i, panose) = take(10usize)(i)?;
    let (i, _unicode_range) = tuple((be_u32, be_u32, be_u32, be_u32))(i)?;
    let (i, vendor_id) = take(4usize)(i)?;
    let (i, fs_selection) = be_u16(i)?;
    let (i, first_char_index) = be_u16(i)?;
    let (i, last_char_index) = be_u16(i)?;

    let typo_fields: R<(i16, i16, i16, u16, u16)> = tuple((be_i16, be_i16, be_i16, be_u16, be_u16))(i);
    let (i, typo) = match typo_fields {
        Ok((i, (ascender, descender, line_gap, win_ascent, win_descent))) => (i, Some(TypoMetrics {
            ascender, descender, line_gap, win_ascent, win_descent
        })),
        Err(_) => {
            debug!("OS/2 table ends before the typo metrics");
            (i, None)
        }
    };

    let (mut x_height, mut cap_height) = (None, None);
    if version >= 2 {
        // skip ulCodePageRange1 and 2
        if let Some(i) = i.get(8 ..) {
            let heights: R<(i16, i16)> = tuple((be_i16, be_i16))(i);
            if let Ok((_, (x, cap))) = heights {
                x_height = Some(x);
                cap_height = Some(cap);
            }
        }
    }

    let mut panose_bytes = [0; 10];
    panose_bytes.copy_from_slice(panose);
    let mut vendor = [0; 4];
    vendor.copy_from_slice(vendor_id);

    Ok(Os2 {
        version,
        x_avg_char_width,
        weight,
        width,
        fs_type,
        strikeout_size,
        strikeout_position,
        family_class,
        panose: panose_bytes,
        vendor_id: Tag(vendor),
        fs_selection,
        first_char_index,
        last_char_index,
        typo,
        x_height,
        cap_height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn os2(version: u16, len: usize) -> Vec<u8> {
        let mut data = vec![0; len];
        data[0 .. 2].copy_from_slice(&version.to_be_bytes());
        data[4 .. 6].copy_from_slice(&700u16.to_be_bytes());
        if len >= 62 {
            data[58 .. 62].copy_from_slice(b"TEST");
        }
        if len >= 78 {
            data[68 .. 70].copy_from_slice(&800i16.to_be_bytes());
            data[70 .. 72].copy_from_slice(&(-200i16).to_be_bytes());
        }
        if len >= 90 {
            data[86 .. 88].copy_from_slice(&500i16.to_be_bytes());
            data[88 .. 90].copy_from_slice(&700i16.to_be_bytes());
        }
        data
    }

    #[test]
    fn version_dependent_fields() {
        let v4 = parse_os2(&os2(4, 96)).unwrap();
        assert_eq!(v4.weight, 700);
        assert_eq!(v4.vendor_id, Tag(*b"TEST"));
        let typo = v4.typo.unwrap();
        assert_eq!((typo.ascender, typo.descender), (800, -200));
        assert_eq!((v4.x_height, v4.cap_height), (Some(500), Some(700)));

        let v0 = parse_os2(&os2(0, 78)).unwrap();
        assert!(v0.typo.is_some());
        assert_eq!(v0.x_height, None);

        // version 2 cut off before sxHeight keeps the typo metrics
        let short_v2 = parse_os2(&os2(2, 80)).unwrap();
        assert!(short_v2.typo.is_some());
        assert_eq!((short_v2.x_height, short_v2.cap_height), (None, None));

        let apple = parse_os2(&os2(0, 68)).unwrap();
        assert!(apple.typo.is_none());

        assert_eq!(parse_os2(&os2(0, 60)).unwrap_err(), FontError::UnexpectedEof);
    }
}
