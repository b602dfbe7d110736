//! Voronoi cells, cell layers, and the refinement hierarchy
//!
//! Cells are spherical polygons identified by stable integer ids. A
//! [`CellLayer`] is an arena: the id of a cell is its index in the layer,
//! and all cross-level references go through ids rather than object
//! identity. Layers are stacked coarse-first into a [`CellHierarchy`]
//! (coarse, biome, area, walking).

use crate::spatial::{angular_distance, SphereIndex};
use glam::Vec3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Terrain classification of a cell
///
/// Assigned at the coarse level from one seeded draw and inherited down the
/// hierarchy together with the color.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    /// Above sea level; seeds height diffusion at band 0
    Land,
    /// Below sea level; seeds height diffusion at band -1
    Water,
}

impl CellKind {
    /// Check if this kind is water
    #[inline]
    pub fn is_water(self) -> bool {
        matches!(self, CellKind::Water)
    }

    /// Check if this kind is land
    #[inline]
    pub fn is_land(self) -> bool {
        !self.is_water()
    }
}

/// A single Voronoi cell on the unit sphere
///
/// The centroid and boundary vertices are unit vectors. The boundary is
/// ordered around the centroid so consecutive pairs form the polygon edges.
/// Color and kind start at placeholder values and are assigned by the
/// pipeline (coarse draw or inheritance from the enclosing coarser cell).
#[derive(Debug, Clone)]
pub struct Cell {
    /// Stable id; equals the cell's index within its layer
    pub id: usize,
    /// Center point on the unit sphere
    pub centroid: Vec3,
    /// Boundary polygon vertices, ordered around the centroid
    pub vertices: Vec<Vec3>,
    /// RGB color of the cell surface
    pub color: [f32; 3],
    /// Land/water classification
    pub kind: CellKind,
}

impl Cell {
    /// Create a cell with placeholder color and kind
    pub fn new(id: usize, centroid: Vec3, vertices: Vec<Vec3>) -> Self {
        Self {
            id,
            centroid,
            vertices,
            color: [1.0, 1.0, 1.0],
            kind: CellKind::Water,
        }
    }

    /// Test whether a direction falls inside this cell's spherical polygon
    ///
    /// A point is inside when it lies on the centroid's side of every
    /// boundary edge's great circle. Works for either winding direction
    /// because the centroid fixes the reference side. Cells with fewer than
    /// three boundary vertices contain nothing.
    pub fn contains(&self, point: Vec3) -> bool {
        if self.vertices.len() < 3 {
            return false;
        }
        const EDGE_EPSILON: f32 = -1e-6;
        for i in 0..self.vertices.len() {
            let a = self.vertices[i];
            let b = self.vertices[(i + 1) % self.vertices.len()];
            let normal = a.cross(b);
            let side = self.centroid.dot(normal).signum();
            if point.dot(normal) * side < EDGE_EPSILON {
                return false;
            }
        }
        true
    }
}

/// An arena of cells at one refinement level
///
/// Owns the cells and a centroid index for radius and nearest queries.
/// Cell ids are indices into the arena, so lookups never go through object
/// identity and the same geometry can be shared across hierarchy levels
/// without aliasing hazards.
pub struct CellLayer {
    cells: Vec<Cell>,
    index: SphereIndex<usize>,
}

impl CellLayer {
    /// Build a layer from cells, reassigning ids to match arena order
    pub fn new(mut cells: Vec<Cell>) -> Self {
        let mut index = SphereIndex::new();
        for (id, cell) in cells.iter_mut().enumerate() {
            cell.id = id;
            index.insert(cell.centroid, id);
        }
        Self { cells, index }
    }

    /// Number of cells in the layer
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Check whether the layer holds no cells
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// All cells in id order
    #[inline]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Mutable access to the cells
    ///
    /// Centroids must not be moved; the centroid index is built once.
    #[inline]
    pub fn cells_mut(&mut self) -> &mut [Cell] {
        &mut self.cells
    }

    /// Get a cell by id
    #[inline]
    pub fn get(&self, id: usize) -> Option<&Cell> {
        self.cells.get(id)
    }

    /// Ids of all cells whose centroid lies within `angular_radius` of `point`
    ///
    /// Includes the cell whose centroid is `point` itself, matching the
    /// neighbor-oracle contract of height diffusion.
    pub fn neighbors_within(&self, point: Vec3, angular_radius: f32) -> Vec<usize> {
        self.index
            .query_radius(point, angular_radius)
            .into_iter()
            .copied()
            .collect()
    }

    /// Ids of cells near `point`, ordered by angular centroid distance
    ///
    /// Falls back to the single nearest centroid when the radius captures
    /// nothing. Ties break by id. Used by surface sampling to try the most
    /// plausible supporting cells first.
    pub fn candidates_near(&self, point: Vec3, search_radius: f32) -> Vec<usize> {
        let mut ids = self.neighbors_within(point, search_radius);
        if ids.is_empty() {
            if let Some((&id, _)) = self.index.nearest(point) {
                ids.push(id);
            }
        }
        ids.sort_by(|&a, &b| {
            let da = angular_distance(self.cells[a].centroid, point);
            let db = angular_distance(self.cells[b].centroid, point);
            da.partial_cmp(&db)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.cmp(&b))
        });
        ids
    }

    /// Find the cell a direction belongs to
    ///
    /// Containment test first over nearby candidates in centroid-distance
    /// order, then nearest-centroid-by-angular-distance fallback, so every
    /// point maps to exactly one cell. The layer must be non-empty.
    pub fn locate(&self, point: Vec3, search_radius: f32) -> usize {
        debug_assert!(!self.cells.is_empty(), "locate on empty layer");
        let candidates = self.candidates_near(point, search_radius);
        for &id in &candidates {
            if self.cells[id].contains(point) {
                return id;
            }
        }
        candidates[0]
    }
}

/// Refinement hierarchy, coarse layer first
///
/// Layer order is coarse, biome, area, walking. A hierarchy may hold fewer
/// layers when only a coarser mesh is requested.
pub struct CellHierarchy {
    layers: Vec<CellLayer>,
}

impl CellHierarchy {
    /// Build a hierarchy from layers ordered coarse-first
    pub fn new(layers: Vec<CellLayer>) -> Self {
        Self { layers }
    }

    /// Number of layers
    #[inline]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Check whether the hierarchy holds no layers
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Get a layer by depth (0 = coarse)
    #[inline]
    pub fn layer(&self, depth: usize) -> Option<&CellLayer> {
        self.layers.get(depth)
    }

    /// Layers as a mutable slice, coarse-first
    #[inline]
    pub fn layers_mut(&mut self) -> &mut [CellLayer] {
        &mut self.layers
    }
}

/// Copy color and kind from the enclosing parent cell onto each child cell
///
/// Containment first, nearest-centroid fallback; no child is ever left
/// unmapped. Returns the parent id chosen for each child, in child id order.
pub fn inherit_from_parent(
    parent: &CellLayer,
    child: &mut CellLayer,
    search_radius: f32,
) -> Vec<usize> {
    let mut parents = Vec::with_capacity(child.len());
    for cell in child.cells_mut() {
        let parent_id = parent.locate(cell.centroid, search_radius);
        let source = &parent.cells()[parent_id];
        cell.color = source.color;
        cell.kind = source.kind;
        parents.push(parent_id);
    }
    parents
}
