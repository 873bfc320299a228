use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use super::{ModelError, Result};

/// Upper bound on the planes a single range edit may span.
pub const MAX_RANGE_PLANES: usize = 1 << 20;

/// Plane coordinate of a shape: Z-section and time-point.
///
/// The channel travels with the coordinate as shape metadata but does not take
/// part in plane identity. Two coordinates on the same `(z, t)` plane compare
/// equal whatever their channel, so an ROI keyed by `Coord3D` holds at most one
/// shape per plane.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Coord3D {
    pub z: usize,
    pub t: usize,
    /// `None` means "all channels".
    #[serde(default)]
    pub channel: Option<usize>,
}

impl Coord3D {
    pub fn new(z: usize, t: usize) -> Self {
        Self {
            z,
            t,
            channel: None,
        }
    }

    pub fn with_channel(z: usize, t: usize, channel: usize) -> Self {
        Self {
            z,
            t,
            channel: Some(channel),
        }
    }

    /// Same plane, different channel tag.
    pub fn on_channel(self, channel: Option<usize>) -> Self {
        Self { channel, ..self }
    }

    /// Number of planes in the inclusive `(z, t)` rectangle spanned by `from`
    /// and `to`, or `None` when it does not fit in a `usize`.
    pub fn plane_count(from: Coord3D, to: Coord3D) -> Option<usize> {
        let depth = from.z.abs_diff(to.z).checked_add(1)?;
        let span = from.t.abs_diff(to.t).checked_add(1)?;
        depth.checked_mul(span)
    }

    /// Every plane of the axis-aligned `(z, t)` rectangle spanned by `from` and
    /// `to`, inclusive, z-major. Channel tags are taken from `from`.
    ///
    /// Returns `None` when the rectangle holds more than [`MAX_RANGE_PLANES`]
    /// planes.
    pub fn range(from: Coord3D, to: Coord3D) -> Option<Vec<Coord3D>> {
        let count = Self::plane_count(from, to)
            .filter(|count| *count <= MAX_RANGE_PLANES)?;
        let (z_lo, z_hi) = (from.z.min(to.z), from.z.max(to.z));
        let (t_lo, t_hi) = (from.t.min(to.t), from.t.max(to.t));
        let mut planes = Vec::with_capacity(count);
        for z in z_lo..=z_hi {
            for t in t_lo..=t_hi {
                planes.push(Coord3D {
                    z,
                    t,
                    channel: from.channel,
                });
            }
        }
        Some(planes)
    }

    /// Parses `z,t` or `z,t,c`.
    pub fn parse(text: &str) -> Result<Self> {
        let parts = text
            .split(',')
            .map(|part| part.trim().parse::<usize>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| ModelError::InvalidCoordinate(text.to_string()))?;
        match parts.as_slice() {
            [z, t] => Ok(Self::new(*z, *t)),
            [z, t, c] => Ok(Self::with_channel(*z, *t, *c)),
            _ => Err(ModelError::InvalidCoordinate(text.to_string())),
        }
    }

    fn plane(&self) -> (usize, usize) {
        (self.z, self.t)
    }
}

impl PartialEq for Coord3D {
    fn eq(&self, other: &Self) -> bool {
        self.plane() == other.plane()
    }
}

impl Eq for Coord3D {}

impl Hash for Coord3D {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.plane().hash(state);
    }
}

impl PartialOrd for Coord3D {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Coord3D {
    fn cmp(&self, other: &Self) -> Ordering {
        self.plane().cmp(&other.plane())
    }
}

impl fmt::Display for Coord3D {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.channel {
            Some(channel) => write!(formatter, "z={} t={} c={}", self.z, self.t, channel),
            None => write!(formatter, "z={} t={}", self.z, self.t),
        }
    }
}
