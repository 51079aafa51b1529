use std::marker::PhantomData;
use nom::number::complete::{be_i16, be_i32};
use crate::R;

pub struct ParserIterator<'a, T, F> {
    parser: F,
    input: &'a [u8],
    _m: PhantomData<T>
}
pub fn iterator<'a, T, F>(input: &'a [u8], parser: F) -> ParserIterator<'a, T, F> where
    F: Fn(&'a [u8]) -> R<'a, T>
{
    ParserIterator { parser, input, _m: PhantomData }
}
impl<'a, T, F> Iterator for ParserIterator<'a, T, F> where
    F: Fn(&'a [u8]) -> R<'a, T>
{
    type Item = T;
    #[inline(always)]
    fn next(&mut self) -> Option<T> {
        match (self.parser)(self.input) {
            Ok((i, t)) => {
                self.input = i;
                Some(t)
            }
            Err(_) => None
        }
    }
}
pub fn iterator_n<'a, T, F>(input: &'a [u8], parser: F, n: impl Into<usize>) -> impl Iterator<Item=T> + 'a where
    F: 'a + Fn(&'a [u8]) -> R<'a, T>, T: 'a
{
    ParserIterator { parser, input, _m: PhantomData }.take(n.into())
}

#[inline(always)]
pub fn parse<'a, T, E>(input: &mut &'a [u8], parser: impl Fn(&'a [u8]) -> Result<(&'a [u8], T), E>) -> Result<T, E> {
    let (i, t) = parser(*input)?;
    *input = i;
    Ok(t)
}

/// 2.14 signed fixed point
#[inline]
pub fn f2dot14(i: &[u8]) -> R<f32> {
    let (i, s) = be_i16(i)?;
    Ok((i, s as f32 / 16384.0))
}

/// 16.16 signed fixed point
#[inline]
pub fn fixed(i: &[u8]) -> R<f32> {
    let (i, s) = be_i32(i)?;
    Ok((i, s as f32 / 65536.0))
}

pub fn utf16_be(data: &[u8]) -> Result<String, std::string::FromUtf16Error> {
    let wide: Vec<u16> = data.chunks_exact(2)
        .map(|c| u16::from_be_bytes([c[0], c[1]]))
        .collect();
    String::from_utf16(&wide)
}

#[test]
fn test_fixed_point() {
    assert_eq!(f2dot14(&[0x40, 0x00]).ok().map(|(_, v)| v), Some(1.0));
    assert_eq!(f2dot14(&[0xc0, 0x00]).ok().map(|(_, v)| v), Some(-1.0));
    assert_eq!(f2dot14(&[0x20, 0x00]).ok().map(|(_, v)| v), Some(0.5));
    assert_eq!(fixed(&[0xff, 0xf1, 0x80, 0x00]).ok().map(|(_, v)| v), Some(-14.5));
}

#[test]
fn test_iterator_n_stops_on_short_input() {
    use nom::number::complete::be_u16;
    let data = [0, 1, 0, 2, 0];
    let values: Vec<u16> = iterator_n(&data[..], be_u16, 5usize).collect();
    assert_eq!(values, vec![1, 2]);
}
