use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Coord3D, ModelError, Result, ShapeId};

/// ROI identity. Negative ids are client-side and have not been persisted yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoiId(pub i64);

impl RoiId {
    pub fn is_client_side(self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for RoiId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "roi#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FolderRef {
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

/// A region of interest: metadata plus a plane index into the shape arena.
#[derive(Debug, Clone, PartialEq)]
pub struct Roi {
    pub id: RoiId,
    pub owner_id: Option<i64>,
    pub folders: BTreeSet<FolderRef>,
    pub client_side: bool,
    pub deletable: bool,
    pub namespace: String,
    shapes: BTreeMap<Coord3D, ShapeId>,
}

impl Roi {
    pub fn new(id: RoiId, namespace: impl Into<String>) -> Self {
        Self {
            id,
            owner_id: None,
            folders: BTreeSet::new(),
            client_side: id.is_client_side(),
            deletable: true,
            namespace: namespace.into(),
            shapes: BTreeMap::new(),
        }
    }

    /// Copies everything except the shapes into a new client-side ROI.
    pub fn clone_metadata(&self, id: RoiId) -> Self {
        Self {
            id,
            owner_id: self.owner_id,
            folders: self.folders.clone(),
            client_side: true,
            deletable: self.deletable,
            namespace: self.namespace.clone(),
            shapes: BTreeMap::new(),
        }
    }

    pub fn shape_at(&self, coord: &Coord3D) -> Option<ShapeId> {
        self.shapes.get(coord).copied()
    }

    pub fn contains_plane(&self, coord: &Coord3D) -> bool {
        self.shapes.contains_key(coord)
    }

    /// Shapes in plane order.
    pub fn planes(&self) -> impl Iterator<Item = (&Coord3D, &ShapeId)> {
        self.shapes.iter()
    }

    pub fn shape_ids(&self) -> impl Iterator<Item = ShapeId> + '_ {
        self.shapes.values().copied()
    }

    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub(crate) fn insert_plane(&mut self, coord: Coord3D, shape: ShapeId) -> Option<ShapeId> {
        self.shapes.insert(coord, shape)
    }

    pub(crate) fn remove_plane(&mut self, coord: &Coord3D) -> Option<ShapeId> {
        self.shapes.remove(coord)
    }
}

/// Parses a `roi:z,t` shape selector used by the command line.
pub fn parse_selector(text: &str) -> Result<(RoiId, Coord3D)> {
    let (roi, plane) = text
        .split_once(':')
        .ok_or_else(|| ModelError::InvalidSelector(text.to_string()))?;
    let roi = roi
        .trim()
        .parse::<i64>()
        .map_err(|_| ModelError::InvalidSelector(text.to_string()))?;
    let coord = Coord3D::parse(plane).map_err(|_| ModelError::InvalidSelector(text.to_string()))?;
    Ok((RoiId(roi), coord))
}
