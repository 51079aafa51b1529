use nom::number::complete::{be_i16, be_u32};
use crate::{FontError, parsers::fixed};

#[derive(Clone, Debug)]
pub struct Post {
    /// 0x00010000, 0x00020000, 0x00025000 or 0x00030000
    pub version: u32,
    /// degrees counter-clockwise from vertical
    pub italic_angle: f32,
    pub underline_position: i16,
    pub underline_thickness: i16,
    pub is_fixed_pitch: bool,
}

pub fn parse_post(i: &[u8]) -> Result<Post, FontError> {
    let (i, version) = be_u32(i)?;
    let (i, italic_angle) = fixed(i)?;
    let (i, underline_position) = be_i16(i)?;
    let (i, underline_thickness) = be_i16(i)?;
    let (_, is_fixed_pitch) = be_u32(i)?;
    Ok(Post {
        version,
        italic_angle,
        underline_position,
        underline_thickness,
        is_fixed_pitch: is_fixed_pitch != 0,
    })
}

#[test]
fn test_post_header() {
    let data = [0, 3, 0, 0, 0xff, 0xf4, 0, 0, 0xff, 0x9c, 0, 50, 0, 0, 0, 1];
    let post = parse_post(&data).unwrap();
    assert_eq!(post.version, 0x0003_0000);
    assert_eq!(post.italic_angle, -12.0);
    assert_eq!((post.underline_position, post.underline_thickness), (-100, 50));
    assert!(post.is_fixed_pitch);
    assert!(parse_post(&data[.. 12]).is_err());
}
