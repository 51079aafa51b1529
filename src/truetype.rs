//! Decoding of `glyf` records and resolution of composite glyphs.

use std::iter;
use nom::{
    number::complete::{be_u8, be_i8, be_i16, be_u16},
    bytes::complete::take,
    multi::count,
    sequence::tuple,
};
use pathfinder_geometry::{vector::Vector2F, transform2d::Matrix2x2F};
use itertools::Itertools;
use crate::{FontError, R};
use crate::parsers::{parse, f2dot14};
use crate::opentype::{Tables, Loca};
use crate::outline::{GlyphOutline, Contour, Point, BBox};
use crate::tag::{LOCA, GLYF, MAXP};

// simple glyph flags
const ON_CURVE_POINT: u8 = 0x01;
const X_SHORT_VECTOR: u8 = 0x02;
const Y_SHORT_VECTOR: u8 = 0x04;
const REPEAT_FLAG: u8 = 0x08;
const X_IS_SAME_OR_POSITIVE: u8 = 0x10;
const Y_IS_SAME_OR_POSITIVE: u8 = 0x20;

// component flags
pub const ARG_1_AND_2_ARE_WORDS: u16 = 0x0001;
pub const ARGS_ARE_XY_VALUES: u16 = 0x0002;
pub const ROUND_XY_TO_GRID: u16 = 0x0004;
pub const WE_HAVE_A_SCALE: u16 = 0x0008;
pub const MORE_COMPONENTS: u16 = 0x0020;
pub const WE_HAVE_AN_X_AND_Y_SCALE: u16 = 0x0040;
pub const WE_HAVE_A_TWO_BY_TWO: u16 = 0x0080;
pub const WE_HAVE_INSTRUCTIONS: u16 = 0x0100;
pub const USE_MY_METRICS: u16 = 0x0200;
pub const SCALED_COMPONENT_OFFSET: u16 = 0x0800;
pub const UNSCALED_COMPONENT_OFFSET: u16 = 0x1000;

/// Upper bound on the points one `assemble` call may copy, summed over
/// every nesting level. Each placed component counts as one more point.
pub const MAX_ASSEMBLED_POINTS: usize = 1 << 16;

/// How a component is positioned inside its parent.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Anchor {
    Offset(Vector2F),
    /// point `child` of the component lands on point `parent` of the
    /// outline assembled so far
    Points { parent: u16, child: u16 },
}

#[derive(Clone, Debug)]
pub struct Component {
    pub gid: u32,
    pub flags: u16,
    pub matrix: Matrix2x2F,
    pub anchor: Anchor,
}

/// One glyph record, decoded but not yet resolved.
#[derive(Clone, Debug)]
pub enum Shape {
    Empty,
    Simple(GlyphOutline),
    Compound { bounds: BBox, components: Vec<Component> },
}

fn bbox(i: &[u8]) -> R<BBox> {
    let (i, (x_min, y_min, x_max, y_max)) = tuple((be_i16, be_i16, be_i16, be_i16))(i)?;
    Ok((i, BBox {
        x_min: x_min as i32,
        y_min: y_min as i32,
        x_max: x_max as i32,
        y_max: y_max as i32,
    }))
}

pub fn parse_glyph_shape(gid: u32, data: &[u8]) -> Result<Shape, FontError> {
    if data.is_empty() {
        debug!("gid {}: empty glyph", gid);
        return Ok(Shape::Empty);
    }
    let (i, number_of_contours) = be_i16(data)?;
    let (i, bounds) = bbox(i)?;
    debug!("gid {}: {} contours", gid, number_of_contours);

    if number_of_contours >= 0 {
        simple(gid, i, number_of_contours as usize, bounds).map(Shape::Simple)
    } else {
        let components = compound(i)?;
        Ok(Shape::Compound { bounds, components })
    }
}

fn parse_coord(short: bool, same_or_pos: bool) -> impl Fn(&[u8]) -> R<i16> {
    move |i| match (short, same_or_pos) {
        (true, true) => {
            let (i, dx) = be_u8(i)?;
            Ok((i, dx as i16))
        }
        (true, false) => {
            let (i, dx) = be_u8(i)?;
            Ok((i, - (dx as i16)))
        }
        (false, false) => be_i16(i),
        (false, true) => Ok((i, 0))
    }
}

fn simple(gid: u32, i: &[u8], number_of_contours: usize, bounds: BBox) -> Result<GlyphOutline, FontError> {
    let (i, end_points) = count(be_u16, number_of_contours)(i)?;
    for (&a, &b) in end_points.iter().tuple_windows() {
        require!(b > a, FontError::CorruptOutlineData { gid, reason: "contour end points not increasing" });
    }
    let (i, num_instructions) = be_u16(i)?;
    let (mut i, _instructions) = take(num_instructions)(i)?;

    // total number of points
    let n = end_points.last().map_or(0, |&end| end as usize + 1);

    let mut flags = Vec::with_capacity(n);
    while flags.len() < n {
        let flag = parse(&mut i, be_u8)?;
        if flag & REPEAT_FLAG != 0 {
            let repeat = parse(&mut i, be_u8)? as usize;
            require!(flags.len() + 1 + repeat <= n, FontError::CorruptOutlineData {
                gid,
                reason: "flag repeat overruns the point count"
            });
            flags.extend(iter::repeat(flag).take(repeat + 1));
        } else {
            flags.push(flag);
        }
    }

    // deltas accumulate over all points of the glyph, not per contour
    let mut xs = Vec::with_capacity(n);
    let mut x: i32 = 0;
    for &flag in &flags {
        x += parse(&mut i, parse_coord(flag & X_SHORT_VECTOR != 0, flag & X_IS_SAME_OR_POSITIVE != 0))? as i32;
        xs.push(x);
    }
    let mut points = Vec::with_capacity(n);
    let mut y: i32 = 0;
    for (&flag, &x) in flags.iter().zip(&xs) {
        y += parse(&mut i, parse_coord(flag & Y_SHORT_VECTOR != 0, flag & Y_IS_SAME_OR_POSITIVE != 0))? as i32;
        points.push(Point::new(x, y, flag & ON_CURVE_POINT != 0));
    }

    let mut contours = Vec::with_capacity(number_of_contours);
    let mut points = points.into_iter();
    let mut start = 0;
    for end in end_points {
        let n_points = end as usize + 1 - start;
        start += n_points;
        contours.push(Contour { points: (&mut points).take(n_points).collect() });
    }

    Ok(GlyphOutline { contours, bounds: Some(bounds) })
}

pub fn compound(mut input: &[u8]) -> Result<Vec<Component>, FontError> {
    let mut parts = Vec::new();
    loop {
        let (flags, gid) = parse(&mut input, tuple((be_u16, be_u16)))?;
        let words = flags & ARG_1_AND_2_ARE_WORDS != 0;
        let anchor = if flags & ARGS_ARE_XY_VALUES != 0 {
            let (dx, dy) = if words {
                parse(&mut input, tuple((be_i16, be_i16)))?
            } else {
                let (dx, dy) = parse(&mut input, tuple((be_i8, be_i8)))?;
                (dx as i16, dy as i16)
            };
            Anchor::Offset(Vector2F::new(dx as f32, dy as f32))
        } else {
            let (parent, child) = if words {
                parse(&mut input, tuple((be_u16, be_u16)))?
            } else {
                let (parent, child) = parse(&mut input, tuple((be_u8, be_u8)))?;
                (parent as u16, child as u16)
            };
            Anchor::Points { parent, child }
        };

        let matrix = if flags & WE_HAVE_A_SCALE != 0 {
            let scale = parse(&mut input, f2dot14)?;
            Matrix2x2F::from_scale(Vector2F::splat(scale))
        } else if flags & WE_HAVE_AN_X_AND_Y_SCALE != 0 {
            let (sx, sy) = parse(&mut input, tuple((f2dot14, f2dot14)))?;
            Matrix2x2F::from_scale(Vector2F::new(sx, sy))
        } else if flags & WE_HAVE_A_TWO_BY_TWO != 0 {
            // stored as xscale, scale01, scale10, yscale:
            // x' = a x + c y, y' = b x + d y
            let (a, b, c, d) = parse(&mut input, tuple((f2dot14, f2dot14, f2dot14, f2dot14)))?;
            Matrix2x2F::row_major(a, c, b, d)
        } else {
            identity()
        };

        parts.push(Component { gid: gid as u32, flags, matrix, anchor });
        if flags & MORE_COMPONENTS == 0 {
            if flags & WE_HAVE_INSTRUCTIONS != 0 {
                trace!("skipping composite instructions");
            }
            break;
        }
    }
    Ok(parts)
}

fn identity() -> Matrix2x2F {
    Matrix2x2F::from_scale(Vector2F::splat(1.0))
}

fn round(v: Vector2F) -> (i32, i32) {
    (v.x().round() as i32, v.y().round() as i32)
}

/// Resolves glyph ids to fully assembled outlines.
pub struct Assembler<'a> {
    loca: &'a Loca,
    glyf: &'a [u8],
    num_glyphs: u32,
    max_depth: usize,
}
impl<'a> Assembler<'a> {
    pub fn new(tables: &'a Tables, max_depth: usize) -> Result<Assembler<'a>, FontError> {
        let maxp = tables.maxp().ok_or(FontError::RequiredTableMissing(MAXP))?;
        let loca = tables.loca().ok_or(FontError::RequiredTableMissing(LOCA))?;
        let glyf = tables.glyf().ok_or(FontError::RequiredTableMissing(GLYF))?;
        Ok(Assembler {
            loca,
            glyf: glyf.data(),
            num_glyphs: maxp.num_glyphs as u32,
            max_depth,
        })
    }

    pub fn assemble(&self, gid: u32) -> Result<GlyphOutline, FontError> {
        require!(gid < self.num_glyphs, FontError::GlyphIndexOutOfRange { gid, num_glyphs: self.num_glyphs });
        let mut stack = Vec::new();
        let mut copied = 0;
        self.resolve(gid, &mut stack, &mut copied)
    }

    pub fn shape(&self, gid: u32) -> Result<Shape, FontError> {
        let range = match self.loca.glyph_range(gid) {
            Some(range) => range,
            None => return Err(FontError::GlyphIndexOutOfRange { gid, num_glyphs: self.num_glyphs })
        };
        debug!("gid {}: glyf[{} .. {}]", gid, range.start, range.end);
        require!(range.start <= range.end, FontError::CorruptOutlineData { gid, reason: "loca offsets decrease" });
        let data = match self.glyf.get(range.start as usize .. range.end as usize) {
            Some(data) => data,
            None => return Err(FontError::CorruptOutlineData { gid, reason: "glyph lies outside glyf" })
        };
        parse_glyph_shape(gid, data).map_err(|e| e.in_glyph(gid))
    }

    fn resolve(&self, gid: u32, stack: &mut Vec<u32>, copied: &mut usize) -> Result<GlyphOutline, FontError> {
        require!(!stack.contains(&gid), FontError::CompositeCycleDetected { gid });
        require!(stack.len() <= self.max_depth, FontError::CompositeDepthExceeded { gid, limit: self.max_depth });

        let outline = match self.shape(gid)? {
            Shape::Empty => GlyphOutline::default(),
            Shape::Simple(outline) => outline,
            Shape::Compound { bounds, components } => {
                stack.push(gid);
                let mut outline = GlyphOutline { contours: vec![], bounds: Some(bounds) };
                for component in &components {
                    self.place(gid, component, &mut outline, stack, copied)?;
                }
                stack.pop();
                outline
            }
        };
        check_bounds(gid, &outline);
        Ok(outline)
    }

    fn place(&self, gid: u32, component: &Component, outline: &mut GlyphOutline, stack: &mut Vec<u32>, copied: &mut usize) -> Result<(), FontError> {
        require!(component.gid < self.num_glyphs, FontError::CorruptOutlineData {
            gid,
            reason: "component glyph out of range"
        });
        let child = self.resolve(component.gid, stack, copied)?;
        *copied += child.num_points() + 1;
        require!(*copied <= MAX_ASSEMBLED_POINTS, FontError::CorruptOutlineData {
            gid,
            reason: "composite expands to too many points"
        });

        let matrix = component.matrix;
        let transformed: Vec<Vec<(Vector2F, bool)>> = child.contours.iter()
            .map(|c| c.points.iter().map(|p| (matrix * p.to_vector(), p.on_curve)).collect())
            .collect();

        let offset = match component.anchor {
            Anchor::Offset(v) => {
                let scaled = component.flags & SCALED_COMPONENT_OFFSET != 0
                    && component.flags & UNSCALED_COMPONENT_OFFSET == 0;
                let v = if scaled { matrix * v } else { v };
                if component.flags & ROUND_XY_TO_GRID != 0 {
                    Vector2F::new(v.x().round(), v.y().round())
                } else {
                    v
                }
            }
            Anchor::Points { parent, child: child_point } => {
                let parent = match outline.points().nth(parent as usize) {
                    Some(p) => p.to_vector(),
                    None => return Err(FontError::CorruptOutlineData { gid, reason: "anchor point not in parent" })
                };
                let child = match transformed.iter().flatten().nth(child_point as usize) {
                    Some(&(p, _)) => p,
                    None => return Err(FontError::CorruptOutlineData { gid, reason: "anchor point not in component" })
                };
                parent - child
            }
        };

        for contour in transformed {
            let points = contour.into_iter()
                .map(|(p, on_curve)| {
                    let (x, y) = round(p + offset);
                    Point::new(x, y, on_curve)
                })
                .collect();
            outline.contours.push(Contour { points });
        }
        Ok(())
    }
}

fn check_bounds(gid: u32, outline: &GlyphOutline) {
    if let Some(bounds) = outline.bounds {
        if let Some(p) = outline.points().find(|&p| !bounds.contains(p)) {
            warn!("gid {}: point ({}, {}) lies outside the declared bounds {:?}", gid, p.x, p.y, bounds);
        }
    }
}
