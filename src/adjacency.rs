//! Substrate triangulation and triangle adjacency
//!
//! The substrate is a fixed, read-only triangulated sphere surface:
//! vertices, edges as vertex-index pairs, and triangles as edge-index
//! triples. Adjacency is derived by recording each edge's owning triangles
//! while iterating the triangle array once, then looking up the opposite
//! owner of every edge. This is linear in the triangle count, symmetric by
//! construction, and free of duplicates.

use crate::error::{MeshError, Result};
use glam::Vec3;
use parry3d::math::Point;
use parry3d::transformation;
use std::collections::HashMap;

/// Fixed triangulated substrate over the sphere
///
/// All indices must be in range; [`TriangleAdjacency::build`] validates them
/// and rejects non-manifold input.
#[derive(Debug, Clone)]
pub struct Substrate {
    /// Vertex positions on the unit sphere
    pub vertices: Vec<Vec3>,
    /// Edges as unordered vertex-index pairs
    pub edges: Vec<[usize; 2]>,
    /// Triangles as edge-index triples
    pub triangles: Vec<[usize; 3]>,
}

impl Substrate {
    /// Bundle pre-built topology arrays into a substrate
    pub fn new(vertices: Vec<Vec3>, edges: Vec<[usize; 2]>, triangles: Vec<[usize; 3]>) -> Self {
        Self {
            vertices,
            edges,
            triangles,
        }
    }

    /// Triangulate a sphere point cloud into a substrate
    ///
    /// For points on a sphere the Delaunay triangulation equals the 3D
    /// convex hull, so this wraps parry3d's hull and rewrites the resulting
    /// vertex-index triangles into the edge-indexed form the core consumes.
    pub fn from_points(points: &[Vec3]) -> Result<Self> {
        if points.len() < 4 {
            return Err(MeshError::GeometryInconsistency(format!(
                "substrate needs at least 4 points (got {})",
                points.len()
            )));
        }

        let hull_input: Vec<Point<f32>> = points.iter().map(|p| Point::new(p.x, p.y, p.z)).collect();
        let (hull_vertices, hull_triangles) = transformation::convex_hull(&hull_input);
        if hull_triangles.is_empty() {
            return Err(MeshError::GeometryInconsistency(
                "degenerate point cloud: convex hull has no faces".to_string(),
            ));
        }

        let vertices: Vec<Vec3> = hull_vertices
            .iter()
            .map(|p| Vec3::new(p.x, p.y, p.z))
            .collect();

        let mut edges: Vec<[usize; 2]> = Vec::new();
        let mut edge_ids: HashMap<(usize, usize), usize> = HashMap::new();
        let mut triangles = Vec::with_capacity(hull_triangles.len());

        for tri in &hull_triangles {
            let corners = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let mut edge_triple = [0usize; 3];
            for (slot, (&a, &b)) in corners
                .iter()
                .zip(corners.iter().cycle().skip(1))
                .take(3)
                .enumerate()
            {
                let key = (a.min(b), a.max(b));
                let id = *edge_ids.entry(key).or_insert_with(|| {
                    edges.push([key.0, key.1]);
                    edges.len() - 1
                });
                edge_triple[slot] = id;
            }
            triangles.push(edge_triple);
        }

        Ok(Self {
            vertices,
            edges,
            triangles,
        })
    }

    /// Number of vertices
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// The three distinct vertices of a triangle, derived from its edges
    ///
    /// Walks the triangle's edge triple; a well-formed triangle touches
    /// exactly three vertices, each appearing in exactly two of its edges.
    pub fn triangle_vertices(&self, triangle: usize) -> Result<[usize; 3]> {
        let edge_triple = self.triangles.get(triangle).ok_or_else(|| {
            MeshError::GeometryInconsistency(format!("triangle {} out of range", triangle))
        })?;

        let mut corners: Vec<usize> = Vec::with_capacity(3);
        let mut counts: Vec<u32> = Vec::with_capacity(3);
        for &edge in edge_triple {
            let pair = self.edges.get(edge).ok_or_else(|| {
                MeshError::GeometryInconsistency(format!(
                    "triangle {} references edge {} out of range",
                    triangle, edge
                ))
            })?;
            for &vertex in pair {
                if vertex >= self.vertices.len() {
                    return Err(MeshError::GeometryInconsistency(format!(
                        "edge {} references vertex {} out of range",
                        edge, vertex
                    )));
                }
                match corners.iter().position(|&c| c == vertex) {
                    Some(slot) => counts[slot] += 1,
                    None => {
                        corners.push(vertex);
                        counts.push(1);
                    }
                }
            }
        }

        if corners.len() != 3 || counts.iter().any(|&c| c != 2) {
            return Err(MeshError::GeometryInconsistency(format!(
                "triangle {} edges do not close a triangle",
                triangle
            )));
        }
        Ok([corners[0], corners[1], corners[2]])
    }
}

/// Edge-adjacency graph over substrate triangles
///
/// Immutable once built; traversal never mutates the relation.
pub struct TriangleAdjacency {
    neighbors: Vec<Vec<usize>>,
}

impl TriangleAdjacency {
    /// Build the adjacency graph from a substrate
    ///
    /// Each edge records the triangles that reference it: interior edges
    /// two, boundary edges one. A third owner means the surface is not
    /// manifold and the build fails. Neighbors of a triangle are the
    /// opposite owners of its three edges.
    pub fn build(substrate: &Substrate) -> Result<Self> {
        let mut edge_owners: Vec<[Option<usize>; 2]> = vec![[None; 2]; substrate.edges.len()];

        for (tri_idx, edge_triple) in substrate.triangles.iter().enumerate() {
            // Validates edge and vertex references as a side effect.
            substrate.triangle_vertices(tri_idx)?;
            for &edge in edge_triple {
                let owners = &mut edge_owners[edge];
                if owners[0].is_none() {
                    owners[0] = Some(tri_idx);
                } else if owners[1].is_none() {
                    owners[1] = Some(tri_idx);
                } else {
                    return Err(MeshError::GeometryInconsistency(format!(
                        "edge {} owned by more than two triangles",
                        edge
                    )));
                }
            }
        }

        let neighbors = substrate
            .triangles
            .iter()
            .enumerate()
            .map(|(tri_idx, edge_triple)| {
                let mut list = Vec::with_capacity(3);
                for &edge in edge_triple {
                    for owner in edge_owners[edge].iter().flatten() {
                        if *owner != tri_idx && !list.contains(owner) {
                            list.push(*owner);
                        }
                    }
                }
                list
            })
            .collect();

        Ok(Self { neighbors })
    }

    /// Number of triangles in the graph
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.neighbors.len()
    }

    /// Edge-adjacent neighbors of a triangle, in edge order
    #[inline]
    pub fn neighbors(&self, triangle: usize) -> &[usize] {
        self.neighbors
            .get(triangle)
            .map(|n| n.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Regular tetrahedron: 4 vertices, 6 edges, 4 triangles
    pub(crate) fn tetrahedron() -> Substrate {
        let vertices = vec![
            Vec3::new(1.0, 1.0, 1.0).normalize(),
            Vec3::new(1.0, -1.0, -1.0).normalize(),
            Vec3::new(-1.0, 1.0, -1.0).normalize(),
            Vec3::new(-1.0, -1.0, 1.0).normalize(),
        ];
        let edges = vec![[0, 1], [0, 2], [0, 3], [1, 2], [1, 3], [2, 3]];
        let triangles = vec![[0, 1, 3], [0, 2, 4], [1, 2, 5], [3, 4, 5]];
        Substrate::new(vertices, edges, triangles)
    }

    #[test]
    fn test_triangle_vertices() {
        let substrate = tetrahedron();
        let mut corners = substrate.triangle_vertices(0).unwrap();
        corners.sort();
        assert_eq!(corners, [0, 1, 2]);

        let mut corners = substrate.triangle_vertices(3).unwrap();
        corners.sort();
        assert_eq!(corners, [1, 2, 3]);
    }

    #[test]
    fn test_tetrahedron_adjacency() {
        let substrate = tetrahedron();
        let adjacency = TriangleAdjacency::build(&substrate).unwrap();

        // Every tetrahedron face borders the other three.
        for tri in 0..4 {
            let mut neighbors = adjacency.neighbors(tri).to_vec();
            neighbors.sort();
            let expected: Vec<usize> = (0..4).filter(|&t| t != tri).collect();
            assert_eq!(neighbors, expected, "triangle {}", tri);
        }
    }

    #[test]
    fn test_adjacency_is_symmetric() {
        let substrate = tetrahedron();
        let adjacency = TriangleAdjacency::build(&substrate).unwrap();

        for tri in 0..adjacency.triangle_count() {
            for &other in adjacency.neighbors(tri) {
                assert!(
                    adjacency.neighbors(other).contains(&tri),
                    "adjacency must be symmetric ({} <-> {})",
                    tri,
                    other
                );
            }
        }
    }

    #[test]
    fn test_non_manifold_edge_rejected() {
        let mut substrate = tetrahedron();
        // A fifth triangle reusing edges 0, 1, 3 gives each a third owner.
        substrate.triangles.push([0, 1, 3]);
        let result = TriangleAdjacency::build(&substrate);
        assert!(matches!(
            result,
            Err(MeshError::GeometryInconsistency(_))
        ));
    }

    #[test]
    fn test_dangling_edge_reference_rejected() {
        let mut substrate = tetrahedron();
        substrate.triangles[0] = [0, 1, 99];
        assert!(TriangleAdjacency::build(&substrate).is_err());
    }

    #[test]
    fn test_from_points_tetrahedron() {
        let points = vec![
            Vec3::new(1.0, 1.0, 1.0).normalize(),
            Vec3::new(1.0, -1.0, -1.0).normalize(),
            Vec3::new(-1.0, 1.0, -1.0).normalize(),
            Vec3::new(-1.0, -1.0, 1.0).normalize(),
        ];
        let substrate = Substrate::from_points(&points).unwrap();

        assert_eq!(substrate.vertex_count(), 4);
        assert_eq!(substrate.edges.len(), 6);
        assert_eq!(substrate.triangle_count(), 4);

        let adjacency = TriangleAdjacency::build(&substrate).unwrap();
        for tri in 0..4 {
            assert_eq!(adjacency.neighbors(tri).len(), 3);
        }
    }

    #[test]
    fn test_from_points_too_few() {
        let points = vec![Vec3::X, Vec3::Y, Vec3::Z];
        assert!(Substrate::from_points(&points).is_err());
    }
}
