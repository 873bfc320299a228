use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use super::{ModelError, Result};

/// A point in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point2) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn lerp(&self, other: &Point2, fraction: f64) -> Point2 {
        Point2::new(
            self.x + (other.x - self.x) * fraction,
            self.y + (other.y - self.y) * fraction,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Point2,
    pub max: Point2,
}

impl Bounds {
    fn of(points: impl IntoIterator<Item = Point2>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bounds = Bounds {
            min: first,
            max: first,
        };
        for point in iter {
            bounds.min.x = bounds.min.x.min(point.x);
            bounds.min.y = bounds.min.y.min(point.y);
            bounds.max.x = bounds.max.x.max(point.x);
            bounds.max.y = bounds.max.y.max(point.y);
        }
        Some(bounds)
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FigureKind {
    Point,
    Line,
    Polyline,
    Polygon,
    Ellipse,
    Rectangle,
    Text,
    Mask,
}

/// The figure drawn by a shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Geometry {
    Point {
        at: Point2,
    },
    Line {
        start: Point2,
        end: Point2,
    },
    Polyline {
        points: Vec<Point2>,
        closed: bool,
    },
    Ellipse {
        center: Point2,
        radius_x: f64,
        radius_y: f64,
    },
    Rectangle {
        origin: Point2,
        width: f64,
        height: f64,
    },
    Text {
        at: Point2,
        text: String,
    },
    /// Row-major bitmap anchored at `origin`, one entry per pixel.
    Mask {
        origin: Point2,
        width: usize,
        height: usize,
        bits: Vec<bool>,
    },
}

impl Geometry {
    pub fn point(x: f64, y: f64) -> Self {
        Geometry::Point {
            at: Point2::new(x, y),
        }
    }

    pub fn line(start: Point2, end: Point2) -> Self {
        Geometry::Line { start, end }
    }

    pub fn rectangle(x: f64, y: f64, width: f64, height: f64) -> Self {
        Geometry::Rectangle {
            origin: Point2::new(x, y),
            width,
            height,
        }
    }

    pub fn ellipse(cx: f64, cy: f64, radius_x: f64, radius_y: f64) -> Self {
        Geometry::Ellipse {
            center: Point2::new(cx, cy),
            radius_x,
            radius_y,
        }
    }

    pub fn polyline(points: Vec<Point2>) -> Self {
        Geometry::Polyline {
            points,
            closed: false,
        }
    }

    pub fn polygon(points: Vec<Point2>) -> Self {
        Geometry::Polyline {
            points,
            closed: true,
        }
    }

    pub fn kind(&self) -> FigureKind {
        match self {
            Geometry::Point { .. } => FigureKind::Point,
            Geometry::Line { .. } => FigureKind::Line,
            Geometry::Polyline { closed: false, .. } => FigureKind::Polyline,
            Geometry::Polyline { closed: true, .. } => FigureKind::Polygon,
            Geometry::Ellipse { .. } => FigureKind::Ellipse,
            Geometry::Rectangle { .. } => FigureKind::Rectangle,
            Geometry::Text { .. } => FigureKind::Text,
            Geometry::Mask { .. } => FigureKind::Mask,
        }
    }

    /// Lines and unclosed polylines whose two endpoints differ. Samples taken
    /// over these figures are kept in path order for line profiles.
    pub fn is_open_path(&self) -> bool {
        match self {
            Geometry::Line { start, end } => start != end,
            Geometry::Polyline {
                points,
                closed: false,
            } => match (points.first(), points.last()) {
                (Some(first), Some(last)) => points.len() >= 2 && first != last,
                _ => false,
            },
            _ => false,
        }
    }

    pub fn is_area(&self) -> bool {
        matches!(
            self,
            Geometry::Ellipse { .. }
                | Geometry::Rectangle { .. }
                | Geometry::Polyline { closed: true, .. }
                | Geometry::Mask { .. }
        )
    }

    pub fn validate(&self) -> Result<()> {
        let finite = |value: f64| value.is_finite();
        let extent = |value: f64| value.is_finite() && value >= 0.0;
        match self {
            Geometry::Point { at } | Geometry::Text { at, .. } => {
                if !finite(at.x) || !finite(at.y) {
                    return Err(ModelError::InvalidGeometry(
                        "point coordinates must be finite".to_string(),
                    ));
                }
            }
            Geometry::Line { start, end } => {
                if ![start.x, start.y, end.x, end.y].into_iter().all(finite) {
                    return Err(ModelError::InvalidGeometry(
                        "line endpoints must be finite".to_string(),
                    ));
                }
            }
            Geometry::Polyline { points, closed } => {
                let required = if *closed { 3 } else { 2 };
                if points.len() < required {
                    return Err(ModelError::InvalidGeometry(format!(
                        "polyline needs at least {required} points, got {}",
                        points.len()
                    )));
                }
                if !points.iter().all(|p| finite(p.x) && finite(p.y)) {
                    return Err(ModelError::InvalidGeometry(
                        "polyline vertices must be finite".to_string(),
                    ));
                }
            }
            Geometry::Ellipse {
                center,
                radius_x,
                radius_y,
            } => {
                if !finite(center.x) || !finite(center.y) {
                    return Err(ModelError::InvalidGeometry(
                        "ellipse center must be finite".to_string(),
                    ));
                }
                if !extent(*radius_x) || !extent(*radius_y) {
                    return Err(ModelError::InvalidGeometry(
                        "ellipse radii must be finite and non-negative".to_string(),
                    ));
                }
            }
            Geometry::Rectangle {
                origin,
                width,
                height,
            } => {
                if !finite(origin.x) || !finite(origin.y) {
                    return Err(ModelError::InvalidGeometry(
                        "rectangle origin must be finite".to_string(),
                    ));
                }
                if !extent(*width) || !extent(*height) {
                    return Err(ModelError::InvalidGeometry(
                        "rectangle extent must be finite and non-negative".to_string(),
                    ));
                }
            }
            Geometry::Mask {
                origin,
                width,
                height,
                bits,
            } => {
                if !finite(origin.x) || !finite(origin.y) {
                    return Err(ModelError::InvalidGeometry(
                        "mask origin must be finite".to_string(),
                    ));
                }
                let Some(pixels) = width.checked_mul(*height) else {
                    return Err(ModelError::InvalidGeometry(format!(
                        "mask of {width}x{height} is too large"
                    )));
                };
                if bits.len() != pixels {
                    return Err(ModelError::InvalidGeometry(format!(
                        "mask of {width}x{height} needs {pixels} bits, got {}",
                        bits.len()
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn area(&self) -> Option<f64> {
        match self {
            Geometry::Rectangle { width, height, .. } => Some(width * height),
            Geometry::Ellipse {
                radius_x, radius_y, ..
            } => Some(PI * radius_x * radius_y),
            Geometry::Polyline {
                points,
                closed: true,
            } => Some(shoelace(points).abs()),
            Geometry::Mask { bits, .. } => Some(bits.iter().filter(|bit| **bit).count() as f64),
            _ => None,
        }
    }

    pub fn perimeter(&self) -> Option<f64> {
        match self {
            Geometry::Rectangle { width, height, .. } => Some(2.0 * (width + height)),
            Geometry::Ellipse {
                radius_x, radius_y, ..
            } => {
                // Ramanujan's second approximation.
                let (a, b) = (*radius_x, *radius_y);
                if a + b == 0.0 {
                    return Some(0.0);
                }
                let h = ((a - b) * (a - b)) / ((a + b) * (a + b));
                Some(PI * (a + b) * (1.0 + 3.0 * h / (10.0 + (4.0 - 3.0 * h).sqrt())))
            }
            Geometry::Polyline {
                points,
                closed: true,
            } => {
                let open = path_length(points);
                let closing = match (points.first(), points.last()) {
                    (Some(first), Some(last)) => last.distance_to(first),
                    _ => 0.0,
                };
                Some(open + closing)
            }
            Geometry::Mask {
                width,
                height,
                bits,
                ..
            } => Some(mask_edge_count(*width, *height, bits) as f64),
            _ => None,
        }
    }

    pub fn length(&self) -> Option<f64> {
        match self {
            Geometry::Line { start, end } => Some(start.distance_to(end)),
            Geometry::Polyline {
                points,
                closed: false,
            } => Some(path_length(points)),
            _ => None,
        }
    }

    pub fn centroid(&self) -> Option<Point2> {
        match self {
            Geometry::Point { at } | Geometry::Text { at, .. } => Some(*at),
            Geometry::Line { start, end } => Some(start.lerp(end, 0.5)),
            Geometry::Ellipse { center, .. } => Some(*center),
            Geometry::Rectangle {
                origin,
                width,
                height,
            } => Some(Point2::new(origin.x + width / 2.0, origin.y + height / 2.0)),
            Geometry::Polyline { points, closed } => {
                if *closed {
                    let area = shoelace(points);
                    if area.abs() > f64::EPSILON {
                        return Some(polygon_centroid(points, area));
                    }
                }
                vertex_mean(points)
            }
            Geometry::Mask {
                origin,
                width,
                bits,
                ..
            } => {
                let mut count = 0usize;
                let mut sum_x = 0.0;
                let mut sum_y = 0.0;
                for (index, _) in bits.iter().enumerate().filter(|(_, bit)| **bit) {
                    sum_x += (index % width) as f64 + 0.5;
                    sum_y += (index / width) as f64 + 0.5;
                    count += 1;
                }
                (count > 0).then(|| {
                    Point2::new(
                        origin.x + sum_x / count as f64,
                        origin.y + sum_y / count as f64,
                    )
                })
            }
        }
    }

    pub fn bounds(&self) -> Option<Bounds> {
        match self {
            Geometry::Point { at } | Geometry::Text { at, .. } => Bounds::of([*at]),
            Geometry::Line { start, end } => Bounds::of([*start, *end]),
            Geometry::Polyline { points, .. } => Bounds::of(points.iter().copied()),
            Geometry::Ellipse {
                center,
                radius_x,
                radius_y,
            } => Bounds::of([
                Point2::new(center.x - radius_x, center.y - radius_y),
                Point2::new(center.x + radius_x, center.y + radius_y),
            ]),
            Geometry::Rectangle {
                origin,
                width,
                height,
            } => Bounds::of([*origin, Point2::new(origin.x + width, origin.y + height)]),
            Geometry::Mask {
                origin,
                width,
                height,
                ..
            } => Bounds::of([
                *origin,
                Point2::new(origin.x + *width as f64, origin.y + *height as f64),
            ]),
        }
    }

    /// Whether `point` lies inside an area figure. Always false for paths,
    /// points and text.
    pub fn contains(&self, point: Point2) -> bool {
        match self {
            Geometry::Rectangle {
                origin,
                width,
                height,
            } => {
                point.x >= origin.x
                    && point.x < origin.x + width
                    && point.y >= origin.y
                    && point.y < origin.y + height
            }
            Geometry::Ellipse {
                center,
                radius_x,
                radius_y,
            } => {
                if *radius_x <= 0.0 || *radius_y <= 0.0 {
                    return false;
                }
                let dx = (point.x - center.x) / radius_x;
                let dy = (point.y - center.y) / radius_y;
                dx * dx + dy * dy <= 1.0
            }
            Geometry::Polyline {
                points,
                closed: true,
            } => polygon_contains(points, point),
            Geometry::Mask {
                origin,
                width,
                height,
                bits,
            } => {
                let local_x = point.x - origin.x;
                let local_y = point.y - origin.y;
                if local_x < 0.0 || local_y < 0.0 {
                    return false;
                }
                let (column, row) = (local_x as usize, local_y as usize);
                column < *width
                    && row < *height
                    && bits.get(row * width + column).copied().unwrap_or(false)
            }
            _ => false,
        }
    }

    /// Vertices of an open path in drawing order.
    pub fn path_vertices(&self) -> Option<Vec<Point2>> {
        match self {
            Geometry::Line { start, end } => Some(vec![*start, *end]),
            Geometry::Polyline {
                points,
                closed: false,
            } => Some(points.clone()),
            _ => None,
        }
    }
}

fn path_length(points: &[Point2]) -> f64 {
    points
        .windows(2)
        .map(|pair| pair[0].distance_to(&pair[1]))
        .sum()
}

/// Signed area, positive for counter-clockwise vertices.
fn shoelace(points: &[Point2]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut twice_area = 0.0;
    for (index, current) in points.iter().enumerate() {
        let next = &points[(index + 1) % points.len()];
        twice_area += current.x * next.y - next.x * current.y;
    }
    twice_area / 2.0
}

fn polygon_centroid(points: &[Point2], signed_area: f64) -> Point2 {
    let mut cx = 0.0;
    let mut cy = 0.0;
    for (index, current) in points.iter().enumerate() {
        let next = &points[(index + 1) % points.len()];
        let cross = current.x * next.y - next.x * current.y;
        cx += (current.x + next.x) * cross;
        cy += (current.y + next.y) * cross;
    }
    let factor = 1.0 / (6.0 * signed_area);
    Point2::new(cx * factor, cy * factor)
}

fn vertex_mean(points: &[Point2]) -> Option<Point2> {
    if points.is_empty() {
        return None;
    }
    let count = points.len() as f64;
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    Some(Point2::new(sx / count, sy / count))
}

fn polygon_contains(points: &[Point2], point: Point2) -> bool {
    let mut inside = false;
    let mut previous = match points.last() {
        Some(last) => *last,
        None => return false,
    };
    for current in points {
        if (current.y > point.y) != (previous.y > point.y) {
            let crossing_x = (previous.x - current.x) * (point.y - current.y)
                / (previous.y - current.y)
                + current.x;
            if point.x < crossing_x {
                inside = !inside;
            }
        }
        previous = *current;
    }
    inside
}

fn mask_edge_count(width: usize, height: usize, bits: &[bool]) -> usize {
    let set = |column: isize, row: isize| {
        column >= 0
            && row >= 0
            && (column as usize) < width
            && (row as usize) < height
            && bits
                .get(row as usize * width + column as usize)
                .copied()
                .unwrap_or(false)
    };
    let mut edges = 0;
    for row in 0..height as isize {
        for column in 0..width as isize {
            if !set(column, row) {
                continue;
            }
            for (dx, dy) in [(-1, 0), (1, 0), (0, -1), (0, 1)] {
                if !set(column + dx, row + dy) {
                    edges += 1;
                }
            }
        }
    }
    edges
}
