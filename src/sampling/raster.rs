use ndarray::{Array5, ArrayView2, s};
use rayon::prelude::*;

use crate::model::{Geometry, Point2, RoiShape};

use super::{ChannelSamples, PixelSampler, Result, SampleError};

/// In-memory image planes laid out as `(t, z, c, y, x)`.
#[derive(Debug, Clone)]
pub struct PlaneStack {
    data: Array5<f32>,
}

impl PlaneStack {
    pub fn new(data: Array5<f32>) -> Self {
        Self { data }
    }

    pub fn from_fn(
        (t, z, c, y, x): (usize, usize, usize, usize, usize),
        value: impl Fn((usize, usize, usize, usize, usize)) -> f32,
    ) -> Self {
        Self {
            data: Array5::from_shape_fn((t, z, c, y, x), value),
        }
    }

    pub fn size_t(&self) -> usize {
        self.data.shape()[0]
    }

    pub fn size_z(&self) -> usize {
        self.data.shape()[1]
    }

    pub fn size_c(&self) -> usize {
        self.data.shape()[2]
    }

    pub fn height(&self) -> usize {
        self.data.shape()[3]
    }

    pub fn width(&self) -> usize {
        self.data.shape()[4]
    }

    /// Pixels `(y, x)` covered by `geometry`, in sampling order.
    pub fn footprint(&self, geometry: &Geometry) -> Vec<(usize, usize)> {
        match geometry {
            Geometry::Text { .. } => Vec::new(),
            Geometry::Point { at } => self.pixel_at(*at).into_iter().collect(),
            _ if geometry.is_area() => self.area_footprint(geometry),
            _ => match geometry.path_vertices() {
                Some(vertices) => self.path_footprint(&vertices),
                None => Vec::new(),
            },
        }
    }

    fn pixel_at(&self, point: Point2) -> Option<(usize, usize)> {
        if point.x < 0.0 || point.y < 0.0 {
            return None;
        }
        let (x, y) = (point.x.floor() as usize, point.y.floor() as usize);
        (x < self.width() && y < self.height()).then_some((y, x))
    }

    /// Pixel centres inside the figure, row-major.
    fn area_footprint(&self, geometry: &Geometry) -> Vec<(usize, usize)> {
        let Some(bounds) = geometry.bounds() else {
            return Vec::new();
        };
        let clamp = |value: f64, limit: usize| value.max(0.0).min(limit as f64) as usize;
        let (x0, x1) = (
            clamp(bounds.min.x.floor(), self.width()),
            clamp(bounds.max.x.ceil(), self.width()),
        );
        let (y0, y1) = (
            clamp(bounds.min.y.floor(), self.height()),
            clamp(bounds.max.y.ceil(), self.height()),
        );
        let mut pixels = Vec::new();
        for y in y0..y1 {
            for x in x0..x1 {
                if geometry.contains(Point2::new(x as f64 + 0.5, y as f64 + 0.5)) {
                    pixels.push((y, x));
                }
            }
        }
        pixels
    }

    /// Unit steps along the part of each segment that crosses the image, first
    /// vertex to last.
    fn path_footprint(&self, vertices: &[Point2]) -> Vec<(usize, usize)> {
        let (width, height) = (self.width() as f64, self.height() as f64);
        let max_steps = (width + height).max(1.0);
        let mut pixels: Vec<(usize, usize)> = Vec::new();
        let mut visit = |point: Point2| {
            if let Some(pixel) = self.pixel_at(point) {
                if pixels.last() != Some(&pixel) {
                    pixels.push(pixel);
                }
            }
        };
        for segment in vertices.windows(2) {
            let Some((start, end)) = clip_segment(segment[0], segment[1], width, height) else {
                continue;
            };
            let steps = start.distance_to(&end).ceil().clamp(1.0, max_steps) as usize;
            for step in 0..steps {
                visit(start.lerp(&end, step as f64 / steps as f64));
            }
        }
        if let Some(last) = vertices.last() {
            visit(*last);
        }
        pixels
    }

    fn plane(&self, t: usize, z: usize, channel: usize) -> ArrayView2<'_, f32> {
        self.data.slice(s![t, z, channel, .., ..])
    }
}

impl PixelSampler for PlaneStack {
    fn sample(&self, shape: &RoiShape, channels: &[usize]) -> Result<ChannelSamples> {
        let coord = shape.coord;
        if coord.t >= self.size_t() || coord.z >= self.size_z() {
            return Err(SampleError::PlaneOutOfRange(coord));
        }
        if let Some(missing) = channels.iter().find(|c| **c >= self.size_c()) {
            return Err(SampleError::UnknownChannel(*missing));
        }
        let pixels = self.footprint(&shape.geometry);
        if pixels.is_empty() {
            return Err(SampleError::EmptyFootprint);
        }
        Ok(channels
            .par_iter()
            .map(|channel| {
                let plane = self.plane(coord.t, coord.z, *channel);
                let values = pixels
                    .iter()
                    .map(|(y, x)| f64::from(plane[[*y, *x]]))
                    .collect::<Vec<_>>();
                (*channel, values)
            })
            .collect())
    }
}

/// Portion of `start -> end` inside `[0, width] x [0, height]`. Each clipped
/// endpoint is measured from its own end of the segment, so a far-away vertex
/// does not swallow the precision of the near one.
fn clip_segment(start: Point2, end: Point2, width: f64, height: f64) -> Option<(Point2, Point2)> {
    let exit = exit_fraction(start, end, width, height)?;
    let entry = exit_fraction(end, start, width, height)?;
    if exit < 0.0 || entry < 0.0 || exit + entry < 1.0 {
        return None;
    }
    let clipped_start = if entry < 1.0 { end.lerp(&start, entry) } else { start };
    let clipped_end = if exit < 1.0 { start.lerp(&end, exit) } else { end };
    Some((clipped_start, clipped_end))
}

/// Fraction of `from -> to` at which the segment leaves the rectangle, capped
/// at 1. `None` for a segment running parallel to an edge outside it.
fn exit_fraction(from: Point2, to: Point2, width: f64, height: f64) -> Option<f64> {
    let (dx, dy) = (to.x - from.x, to.y - from.y);
    if !dx.is_finite() || !dy.is_finite() {
        return None;
    }
    let mut exit = 1.0_f64;
    for (p, q) in [
        (-dx, from.x),
        (dx, width - from.x),
        (-dy, from.y),
        (dy, height - from.y),
    ] {
        if p == 0.0 && q < 0.0 {
            return None;
        }
        if p > 0.0 {
            exit = exit.min(q / p);
        }
    }
    Some(exit)
}
