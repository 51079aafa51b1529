use std::fmt;

/// Four byte table identifier.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(pub [u8; 4]);

impl Tag {
    pub const fn new(bytes: &[u8; 4]) -> Tag {
        Tag(*bytes)
    }
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

pub const HEAD: Tag = Tag(*b"head");
pub const MAXP: Tag = Tag(*b"maxp");
pub const HHEA: Tag = Tag(*b"hhea");
pub const HMTX: Tag = Tag(*b"hmtx");
pub const LOCA: Tag = Tag(*b"loca");
pub const GLYF: Tag = Tag(*b"glyf");
pub const CMAP: Tag = Tag(*b"cmap");
pub const NAME: Tag = Tag(*b"name");
pub const OS2: Tag = Tag(*b"OS/2");
pub const POST: Tag = Tag(*b"post");

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in self.0.iter() {
            if b.is_ascii_graphic() || b == b' ' {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{:02x}", b)?;
            }
        }
        Ok(())
    }
}
impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({})", self)
    }
}
impl From<[u8; 4]> for Tag {
    fn from(bytes: [u8; 4]) -> Tag {
        Tag(bytes)
    }
}

#[test]
fn test_display() {
    assert_eq!(OS2.to_string(), "OS/2");
    assert_eq!(Tag([0, b'a', b'b', 0xff]).to_string(), "\\x00ab\\xff");
    assert_eq!(format!("{:?}", CMAP), "Tag(cmap)");
}
