//! Glyph outlines in font design units.

use pathfinder_geometry::{vector::Vector2F, rect::RectF};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
    /// false for quadratic control points
    pub on_curve: bool,
}
impl Point {
    pub fn new(x: i32, y: i32, on_curve: bool) -> Point {
        Point { x, y, on_curve }
    }
    #[inline]
    pub fn to_vector(self) -> Vector2F {
        Vector2F::new(self.x as f32, self.y as f32)
    }
}

/// A closed sequence of points. Never empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Contour {
    pub points: Vec<Point>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BBox {
    pub x_min: i32,
    pub y_min: i32,
    pub x_max: i32,
    pub y_max: i32,
}
impl BBox {
    pub fn contains(&self, p: Point) -> bool {
        (self.x_min ..= self.x_max).contains(&p.x) && (self.y_min ..= self.y_max).contains(&p.y)
    }
    pub fn to_rect(&self) -> RectF {
        RectF::from_points(
            Vector2F::new(self.x_min as f32, self.y_min as f32),
            Vector2F::new(self.x_max as f32, self.y_max as f32)
        )
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GlyphOutline {
    pub contours: Vec<Contour>,
    /// as declared in the glyph header, `None` for glyphs without data
    pub bounds: Option<BBox>,
}
impl GlyphOutline {
    pub fn is_empty(&self) -> bool {
        self.contours.is_empty()
    }
    pub fn num_points(&self) -> usize {
        self.contours.iter().map(|c| c.points.len()).sum()
    }
    pub fn points(&self) -> impl Iterator<Item=Point> + '_ {
        self.contours.iter().flat_map(|c| c.points.iter().cloned())
    }
    /// The box actually spanned by the points, which may differ from `bounds`.
    pub fn compute_bounds(&self) -> Option<BBox> {
        let mut points = self.points();
        let first = points.next()?;
        let init = BBox { x_min: first.x, y_min: first.y, x_max: first.x, y_max: first.y };
        Some(points.fold(init, |b, p| BBox {
            x_min: b.x_min.min(p.x),
            y_min: b.y_min.min(p.y),
            x_max: b.x_max.max(p.x),
            y_max: b.y_max.max(p.y),
        }))
    }
    pub fn segments(&self) -> impl Iterator<Item=Segment> + '_ {
        self.contours.iter().flat_map(|c| c.segments())
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Segment {
    Line(Vector2F, Vector2F),
    /// start, control, end
    Quad(Vector2F, Vector2F, Vector2F),
}

struct SegmentSink {
    segments: Vec<Segment>,
    last: Vector2F,
}
impl SegmentSink {
    fn line_to(&mut self, p: Vector2F) {
        if p != self.last {
            self.segments.push(Segment::Line(self.last, p));
        }
        self.last = p;
    }
    fn quad_to(&mut self, c: Vector2F, p: Vector2F) {
        self.segments.push(Segment::Quad(self.last, c, p));
        self.last = p;
    }
}

fn mid(a: Vector2F, b: Vector2F) -> Vector2F {
    (a + b) * 0.5
}

impl Contour {
    /// Lines and quadratic curves of the closed contour. Two off-curve
    /// points in a row imply an on-curve point halfway between them.
    pub fn segments(&self) -> Vec<Segment> {
        let mut points = self.points.iter().map(|p| (p.on_curve, p.to_vector())).peekable();

        let (start_on, p) = match points.next() {
            Some(t) => t,
            None => return vec![]
        };
        // when the contour starts off-curve, start at the next on-curve
        // point (real or implied) and remember the control point for the end
        let (s, sc) = if start_on {
            (p, None)
        } else {
            let (next_on, next_p) = match points.peek() {
                Some(&t) => t,
                None => return vec![],
            };
            if next_on {
                let _ = points.next();
                (next_p, Some(p))
            } else {
                (mid(p, next_p), Some(p))
            }
        };

        let mut sink = SegmentSink { segments: vec![], last: s };
        let mut c = None;
        for (on_curve, p) in points {
            if on_curve {
                match c.take() {
                    Some(c) => sink.quad_to(c, p),
                    None => sink.line_to(p)
                }
            } else {
                if let Some(c) = c {
                    sink.quad_to(c, mid(c, p));
                }
                c = Some(p);
            }
        }

        match (sc, c) {
            (Some(sc), Some(c)) => {
                sink.quad_to(c, mid(c, sc));
                sink.quad_to(sc, s);
            }
            (Some(sc), None) => sink.quad_to(sc, s),
            (None, Some(c)) => sink.quad_to(c, s),
            (None, None) => sink.line_to(s),
        }
        sink.segments
    }
}
