//! Elevation bands: diffusion, shading, and height-to-vertex resolution
//!
//! Elevation is a signed integer band per area cell, produced by a fixed
//! number of synchronous relaxation passes over the cell graph. Land bands
//! grow one step per pass while every nearby cell keeps up; water bands
//! deepen one step per pass while bordered only by shallower water,
//! saturating at -3. Bands then shade cell colors and drive per-vertex
//! displacement through the [`SurfaceSampler`].

use crate::cell::CellLayer;
use crate::error::{MeshError, Result};
use crate::spatial::{angular_distance, SphereIndex};
use glam::Vec3;
use log::debug;

/// Water bands never deepen past this many steps below sea level.
const MAX_DEPTH_STEPS: i32 = 2;

/// Final elevation band per cell of one layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeightField {
    bands: Vec<i32>,
}

impl HeightField {
    /// Band of a cell; panics when the cell id is out of range
    #[inline]
    pub fn band(&self, cell: usize) -> i32 {
        self.bands[cell]
    }

    /// All bands in cell id order
    #[inline]
    pub fn bands(&self) -> &[i32] {
        &self.bands
    }

    /// Number of cells covered
    #[inline]
    pub fn len(&self) -> usize {
        self.bands.len()
    }

    /// Check whether the field covers no cells
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }
}

/// Relax elevation bands across a cell layer
///
/// Seeds land cells at 0 and water cells at -1, then runs exactly `passes`
/// synchronous passes. Each pass reads only the previous pass's values
/// (double-buffered, so cell order cannot leak into the result):
///
/// - land (`prev >= 0`): `1 + min(neighbor bands)`, or `1 + (-1)` when the
///   oracle returns nothing;
/// - water (`prev < 0`): `-(1 + min(2, shallowest neighbor depth))`, or -1
///   when the oracle returns nothing.
///
/// The neighbor oracle is "all cells whose centroid lies within
/// `neighbor_radius`", which includes the queried cell itself.
pub fn diffuse_heights(layer: &CellLayer, passes: usize, neighbor_radius: f32) -> HeightField {
    let mut bands: Vec<i32> = layer
        .cells()
        .iter()
        .map(|cell| if cell.kind.is_land() { 0 } else { -1 })
        .collect();

    for pass in 0..passes {
        let mut next = vec![0i32; bands.len()];
        for (id, cell) in layer.cells().iter().enumerate() {
            let neighbors = layer.neighbors_within(cell.centroid, neighbor_radius);
            next[id] = if bands[id] >= 0 {
                let lowest = neighbors.iter().map(|&n| bands[n]).min();
                match lowest {
                    Some(lowest) => lowest + 1,
                    None => 0,
                }
            } else {
                let shallowest = neighbors
                    .iter()
                    .map(|&n| (-bands[n]).max(0))
                    .min();
                match shallowest {
                    Some(depth) => -(depth.min(MAX_DEPTH_STEPS) + 1),
                    None => -1,
                }
            };
        }
        bands = next;
        debug!("height diffusion pass {} complete", pass + 1);
    }

    HeightField { bands }
}

/// Shade cell colors by elevation band
///
/// Land darkens toward its peak band, water lightens toward the shore:
/// land subtracts `band/5 * 0.66` from green; water adds
/// `(3 + band)/10 * 0.66` to red and green.
pub fn shade_cell_colors(layer: &mut CellLayer, field: &HeightField) {
    for cell in layer.cells_mut() {
        let band = field.band(cell.id);
        if band >= 0 {
            cell.color[1] -= band as f32 / 5.0 * 0.66;
        } else {
            let lift = (3.0 + band as f32) / 10.0 * 0.66;
            cell.color[0] += lift;
            cell.color[1] += lift;
        }
    }
}

/// Position-keyed registry resolving one finalized band per vertex
///
/// Cells contribute their band to each boundary vertex in three tiers:
/// an existing vertex record within the angular tolerance max-merges with
/// the contribution; otherwise an existing edge record whose great-circle
/// segment brackets the position derives a record from its endpoints;
/// otherwise a fresh record is created. After every cell has contributed,
/// each referenced vertex has exactly one record and one band.
pub struct VertexBandResolver {
    records: Vec<VertexRecord>,
    index: SphereIndex<usize>,
    edges: Vec<(usize, usize)>,
    tolerance: f32,
}

struct VertexRecord {
    position: Vec3,
    band: i32,
}

impl VertexBandResolver {
    /// Create an empty resolver with the given angular merge tolerance
    pub fn new(tolerance: f32) -> Self {
        Self {
            records: Vec::new(),
            index: SphereIndex::new(),
            edges: Vec::new(),
            tolerance,
        }
    }

    /// Number of distinct vertex records
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check whether no vertex has been resolved yet
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Finalized band of a record
    #[inline]
    pub fn band(&self, record: usize) -> i32 {
        self.records[record].band
    }

    /// Contribute a band at a position, returning the record id
    pub fn resolve(&mut self, position: Vec3, band: i32) -> usize {
        // Tier 1: existing vertex record within tolerance.
        if let Some((&record, _)) = self.index.nearest(position) {
            if angular_distance(self.records[record].position, position) < self.tolerance {
                self.records[record].band = self.records[record].band.max(band);
                return record;
            }
        }

        // Tier 2: an edge record whose segment brackets the position.
        for &(a, b) in &self.edges {
            let pa = self.records[a].position;
            let pb = self.records[b].position;
            let span = angular_distance(pa, pb);
            if span <= self.tolerance * 2.0 {
                continue;
            }
            let through = angular_distance(pa, position) + angular_distance(position, pb);
            if (through - span).abs() < self.tolerance {
                let derived = band.max(self.records[a].band).max(self.records[b].band);
                return self.push_record(position, derived);
            }
        }

        // Tier 3: fresh record.
        self.push_record(position, band)
    }

    /// Register the segment between two records as an edge record
    pub fn register_edge(&mut self, a: usize, b: usize) {
        let key = (a.min(b), a.max(b));
        if key.0 != key.1 && !self.edges.contains(&key) {
            self.edges.push(key);
        }
    }

    fn push_record(&mut self, position: Vec3, band: i32) -> usize {
        let record = self.records.len();
        self.index.insert(position, record);
        self.records.push(VertexRecord { position, band });
        record
    }
}

/// Samples the banded surface built over one cell layer
///
/// Construction resolves every cell's boundary vertices through a
/// [`VertexBandResolver`] (so shared corners carry the max of all
/// contributing cells) and registers the polygon edges. Sampling locates
/// candidate cells around a direction and intersects the origin ray with
/// each candidate's displaced fan triangles; the first supporting triangle
/// yields the surface radius. Fan triangles whose plane is nearly parallel
/// to the ray are non-supporting; when no candidate supports the point the
/// query fails with [`MeshError::UnresolvedHeightQuery`].
pub struct SurfaceSampler<'a> {
    layer: &'a CellLayer,
    resolver: VertexBandResolver,
    corner_records: Vec<Vec<usize>>,
    centroid_bands: Vec<i32>,
    elevation_step: f32,
    locate_radius: f32,
}

impl<'a> SurfaceSampler<'a> {
    /// Build the sampler over a layer and its diffused height field
    pub fn new(
        layer: &'a CellLayer,
        field: &HeightField,
        elevation_step: f32,
        merge_tolerance: f32,
        locate_radius: f32,
    ) -> Self {
        let mut resolver = VertexBandResolver::new(merge_tolerance);
        let mut corner_records = Vec::with_capacity(layer.len());
        for cell in layer.cells() {
            let band = field.band(cell.id);
            let records: Vec<usize> = cell
                .vertices
                .iter()
                .map(|&vertex| resolver.resolve(vertex, band))
                .collect();
            for i in 0..records.len() {
                resolver.register_edge(records[i], records[(i + 1) % records.len()]);
            }
            corner_records.push(records);
        }
        debug!(
            "surface sampler over {} cells, {} vertex records",
            layer.len(),
            resolver.len()
        );

        Self {
            layer,
            resolver,
            corner_records,
            centroid_bands: field.bands().to_vec(),
            elevation_step,
            locate_radius,
        }
    }

    /// Radius of a band's shell
    #[inline]
    pub fn band_radius(&self, band: i32) -> f32 {
        1.0 + band as f32 * self.elevation_step
    }

    /// The vertex record registry built during construction
    #[inline]
    pub fn resolver(&self) -> &VertexBandResolver {
        &self.resolver
    }

    /// Surface radius along the ray from the origin through `point`
    pub fn sample_radius(&self, point: Vec3) -> Result<f32> {
        let dir = point.normalize();
        let candidates = self.layer.candidates_near(dir, self.locate_radius);
        for &cell in &candidates {
            if let Some(radius) = self.fan_radius(cell, dir) {
                return Ok(radius);
            }
        }
        Err(MeshError::UnresolvedHeightQuery {
            point,
            cell: candidates.first().copied().unwrap_or(0),
        })
    }

    /// Project a point onto the banded surface
    pub fn displace(&self, point: Vec3) -> Result<Vec3> {
        Ok(point.normalize() * self.sample_radius(point)?)
    }

    fn fan_radius(&self, cell_id: usize, dir: Vec3) -> Option<f32> {
        let cell = &self.layer.cells()[cell_id];
        let corners = &self.corner_records[cell_id];
        if corners.len() < 3 {
            return None;
        }
        let apex = cell.centroid.normalize() * self.band_radius(self.centroid_bands[cell_id]);
        for i in 0..corners.len() {
            let j = (i + 1) % corners.len();
            let a = cell.vertices[i] * self.band_radius(self.resolver.band(corners[i]));
            let b = cell.vertices[j] * self.band_radius(self.resolver.band(corners[j]));
            if let Some(radius) = ray_fan_hit(dir, apex, a, b) {
                return Some(radius);
            }
        }
        None
    }
}

/// Intersect the origin ray `dir` with triangle (a, b, c)
///
/// Returns the hit distance, which equals the surface radius for a unit
/// direction. Near-parallel planes and hits behind the origin return None.
fn ray_fan_hit(dir: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Option<f32> {
    let normal = (b - a).cross(c - a);
    let den = dir.dot(normal);
    if den.abs() < 1e-9 {
        return None;
    }
    let t = a.dot(normal) / den;
    if t <= 0.0 {
        return None;
    }
    if barycentric_inside(dir * t, a, b, c) {
        Some(t)
    } else {
        None
    }
}

fn barycentric_inside(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> bool {
    let v0 = b - a;
    let v1 = c - a;
    let v2 = p - a;
    let d00 = v0.dot(v0);
    let d01 = v0.dot(v1);
    let d11 = v1.dot(v1);
    let d20 = v2.dot(v0);
    let d21 = v2.dot(v1);
    let denom = d00 * d11 - d01 * d01;
    if denom.abs() < 1e-12 {
        return false;
    }
    let v = (d11 * d20 - d01 * d21) / denom;
    let w = (d00 * d21 - d01 * d20) / denom;
    let u = 1.0 - v - w;
    const EPSILON: f32 = -1e-4;
    u >= EPSILON && v >= EPSILON && w >= EPSILON
}
