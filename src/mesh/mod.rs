//! Role-tagged mesh buffer assembly
//!
//! Turns a stream of colored, positioned triangles into engine-agnostic
//! buffer sets. Flat-shaded roles (render, collidable land) carry
//! position + color + face normal per corner and are chunked so no single
//! buffer crosses the vertex limit downstream index widths assume.
//! Navigation-type roles (navmesh, ocean, ocean navmesh) carry positions
//! only and collapse near-identical positions through a spatial index.

use crate::spatial::SphereIndex;
use glam::Vec3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// What a buffer set is for
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshRole {
    /// Visible surface: position + color + flat normal, chunked
    Render,
    /// Collidable land surface: same layout as render, separate pass
    Collision,
    /// Walkable-land navigation mesh: position only, deduplicated
    Navigation,
    /// Sea surface: position only, deduplicated
    Ocean,
    /// Sailable-water navigation mesh: position only, deduplicated
    OceanNavigation,
}

impl MeshRole {
    /// Roles that collapse near-identical vertices
    #[inline]
    pub fn deduplicates(self) -> bool {
        matches!(
            self,
            MeshRole::Navigation | MeshRole::Ocean | MeshRole::OceanNavigation
        )
    }

    /// Roles that split output into vertex-bounded chunks
    #[inline]
    pub fn chunked(self) -> bool {
        !self.deduplicates()
    }

    /// Human-readable role name
    pub fn name(self) -> &'static str {
        match self {
            MeshRole::Render => "render",
            MeshRole::Collision => "collision",
            MeshRole::Navigation => "navigation",
            MeshRole::Ocean => "ocean",
            MeshRole::OceanNavigation => "ocean-navigation",
        }
    }
}

/// One output buffer set
///
/// Colors and normals are present exactly for flat-shaded roles. Suitable
/// for any engine: Bevy meshes, Godot arrays, raw wgpu vertex buffers.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    /// Buffer role
    pub role: MeshRole,
    /// Vertex positions
    pub positions: Vec<[f32; 3]>,
    /// Vertex colors (flat-shaded roles only)
    pub colors: Option<Vec<[f32; 3]>>,
    /// Face normals replicated per corner (flat-shaded roles only)
    pub normals: Option<Vec<[f32; 3]>>,
    /// Triangle indices
    pub indices: Vec<u32>,
}

impl MeshData {
    fn empty(role: MeshRole) -> Self {
        let shaded = !role.deduplicates();
        Self {
            role,
            positions: Vec::new(),
            colors: shaded.then(Vec::new),
            normals: shaded.then(Vec::new),
            indices: Vec::new(),
        }
    }

    /// Number of vertices
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of triangles
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Check whether the buffer holds no geometry
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Accumulates triangles into role-tagged, size-bounded buffers
///
/// Flat-shaded roles flush the current chunk before a triangle would push
/// its vertex count past the limit, so no emitted chunk ever exceeds it.
/// Deduplicating roles grow a single buffer, collapsing positions within
/// the angular tolerance to one vertex.
pub struct MeshAssembler {
    role: MeshRole,
    chunk_vertex_limit: usize,
    dedup_tolerance: f32,
    chunks: Vec<MeshData>,
    current: MeshData,
    dedup: SphereIndex<u32>,
}

impl MeshAssembler {
    /// Create an assembler for one role
    pub fn new(role: MeshRole, chunk_vertex_limit: usize, dedup_tolerance: f32) -> Self {
        Self {
            role,
            chunk_vertex_limit,
            dedup_tolerance,
            chunks: Vec::new(),
            current: MeshData::empty(role),
            dedup: SphereIndex::new(),
        }
    }

    /// The role this assembler emits
    #[inline]
    pub fn role(&self) -> MeshRole {
        self.role
    }

    /// Append one colored triangle (flat-shaded roles)
    ///
    /// Emits three fresh vertices carrying the color and the face normal
    /// from the cross product of two edge vectors.
    pub fn push_shaded_triangle(&mut self, corners: [Vec3; 3], color: [f32; 3]) {
        debug_assert!(self.role.chunked(), "shaded push on a deduplicating role");
        if self.current.vertex_count() + 3 > self.chunk_vertex_limit {
            self.flush();
        }

        let normal = (corners[1] - corners[0])
            .cross(corners[2] - corners[0])
            .normalize_or_zero();
        let base = self.current.vertex_count() as u32;
        for corner in corners {
            self.current.positions.push([corner.x, corner.y, corner.z]);
            if let Some(colors) = self.current.colors.as_mut() {
                colors.push(color);
            }
            if let Some(normals) = self.current.normals.as_mut() {
                normals.push([normal.x, normal.y, normal.z]);
            }
        }
        self.current.indices.extend([base, base + 1, base + 2]);
    }

    /// Append one triangle (deduplicating roles)
    ///
    /// Each corner within the angular tolerance of an existing vertex
    /// reuses that vertex's index; others append a fresh vertex.
    pub fn push_triangle(&mut self, corners: [Vec3; 3]) {
        debug_assert!(self.role.deduplicates(), "plain push on a flat-shaded role");
        for corner in corners {
            let index = self.dedup_index(corner);
            self.current.indices.push(index);
        }
    }

    fn dedup_index(&mut self, corner: Vec3) -> u32 {
        let tolerance = 2.0 * (self.dedup_tolerance * 0.5).sin();
        if let Some((&index, distance)) = self.dedup.nearest(corner) {
            if distance <= tolerance {
                return index;
            }
        }
        let index = self.current.vertex_count() as u32;
        self.current.positions.push([corner.x, corner.y, corner.z]);
        self.dedup.insert(corner, index);
        index
    }

    fn flush(&mut self) {
        if !self.current.is_empty() {
            let chunk = std::mem::replace(&mut self.current, MeshData::empty(self.role));
            self.chunks.push(chunk);
        }
    }

    /// Close out the final chunk and return all buffers in emission order
    pub fn finish(mut self) -> Vec<MeshData> {
        self.flush();
        self.chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle(offset: f32) -> [Vec3; 3] {
        [
            Vec3::new(offset, 0.0, 1.0).normalize(),
            Vec3::new(offset + 0.01, 0.0, 1.0).normalize(),
            Vec3::new(offset, 0.01, 1.0).normalize(),
        ]
    }

    #[test]
    fn test_shaded_layout() {
        let mut assembler = MeshAssembler::new(MeshRole::Render, 8000, 1e-4);
        assembler.push_shaded_triangle(triangle(0.0), [0.33, 1.0, 0.33]);
        let meshes = assembler.finish();

        assert_eq!(meshes.len(), 1);
        let mesh = &meshes[0];
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(mesh.colors.as_ref().unwrap().len(), 3);
        assert_eq!(mesh.normals.as_ref().unwrap().len(), 3);
        assert_eq!(mesh.indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_flat_normal_from_edge_cross() {
        let mut assembler = MeshAssembler::new(MeshRole::Render, 8000, 1e-4);
        assembler.push_shaded_triangle(
            [Vec3::ZERO, Vec3::X, Vec3::Y],
            [1.0, 1.0, 1.0],
        );
        let meshes = assembler.finish();
        let normals = meshes[0].normals.as_ref().unwrap();
        for normal in normals {
            assert_eq!(*normal, [0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn test_chunk_bound_never_exceeded() {
        let limit = 90;
        let mut assembler = MeshAssembler::new(MeshRole::Collision, limit, 1e-4);
        for i in 0..100 {
            assembler.push_shaded_triangle(triangle(i as f32 * 0.02), [0.5, 0.5, 0.5]);
        }
        let meshes = assembler.finish();

        assert!(meshes.len() > 1);
        let mut total = 0;
        for mesh in &meshes {
            assert!(mesh.vertex_count() <= limit, "{}", mesh.vertex_count());
            assert_eq!(mesh.vertex_count(), mesh.indices.len());
            total += mesh.triangle_count();
        }
        assert_eq!(total, 100);
    }

    #[test]
    fn test_dedup_collapses_repeated_corners() {
        let mut assembler = MeshAssembler::new(MeshRole::Navigation, 8000, 1e-4);
        let corners = triangle(0.0);
        assembler.push_triangle(corners);
        assembler.push_triangle(corners);
        // A third triangle sharing one corner.
        assembler.push_triangle([corners[0], triangle(0.1)[1], triangle(0.1)[2]]);
        let meshes = assembler.finish();

        assert_eq!(meshes.len(), 1);
        let mesh = &meshes[0];
        assert_eq!(mesh.vertex_count(), 5);
        assert_eq!(mesh.triangle_count(), 3);
        assert_eq!(mesh.indices[0..3], mesh.indices[3..6]);
        assert!(mesh.colors.is_none());
        assert!(mesh.normals.is_none());
    }

    #[test]
    fn test_dedup_roles_never_chunk() {
        let mut assembler = MeshAssembler::new(MeshRole::OceanNavigation, 12, 1e-4);
        for i in 0..50 {
            assembler.push_triangle(triangle(i as f32 * 0.05));
        }
        let meshes = assembler.finish();
        assert_eq!(meshes.len(), 1);
        assert_eq!(meshes[0].triangle_count(), 50);
    }

    #[test]
    fn test_empty_assembler_emits_nothing() {
        let assembler = MeshAssembler::new(MeshRole::Render, 8000, 1e-4);
        assert!(assembler.finish().is_empty());
    }
}
