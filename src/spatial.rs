//! Spatial indexing over sphere points
//!
//! A mutable KD-tree wrapper used as the neighbor oracle for height
//! diffusion, for cell location during hierarchy inheritance, and for
//! positional deduplication of navigation buffers.

use glam::Vec3;
use kiddo::float::kdtree::KdTree;
use kiddo::SquaredEuclidean;

/// Squared chord length subtended by an angle on the unit sphere
///
/// Converts an angular radius into the squared Euclidean distance the
/// KD-tree understands. Monotonic in the angle, so a chord query returns
/// exactly the points within the angular radius for unit vectors.
fn chord_sq(angle: f32) -> f32 {
    let chord = 2.0 * (angle * 0.5).sin();
    chord * chord
}

/// Angular distance between two directions in radians
///
/// Inputs are normalized first, so points slightly off the unit sphere
/// (e.g. band-displaced vertices) compare by direction.
pub fn angular_distance(a: Vec3, b: Vec3) -> f32 {
    a.normalize().dot(b.normalize()).clamp(-1.0, 1.0).acos()
}

/// KD-tree keyed by 3D position with an arbitrary payload per point
///
/// Payloads are stored in insertion order; queries return payloads sorted by
/// insertion order so results are deterministic regardless of tree shape.
pub struct SphereIndex<P> {
    tree: KdTree<f32, usize, 3, 32, u32>,
    entries: Vec<(Vec3, P)>,
}

impl<P> SphereIndex<P> {
    /// Create an empty index
    pub fn new() -> Self {
        Self {
            tree: KdTree::new(),
            entries: Vec::new(),
        }
    }

    /// Number of indexed points
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether the index is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert a point with its payload
    pub fn insert(&mut self, point: Vec3, payload: P) {
        let slot = self.entries.len();
        self.tree.add(&[point.x, point.y, point.z], slot);
        self.entries.push((point, payload));
    }

    /// All payloads whose point lies within `angular_radius` of `point`
    ///
    /// The KD-tree is queried by chord distance, then hits are filtered by
    /// exact angular distance and returned in insertion order. The queried
    /// point itself is included when it was inserted.
    pub fn query_radius(&self, point: Vec3, angular_radius: f32) -> Vec<&P> {
        let query = [point.x, point.y, point.z];
        let mut slots: Vec<usize> = self
            .tree
            .within_unsorted::<SquaredEuclidean>(&query, chord_sq(angular_radius))
            .into_iter()
            .map(|hit| hit.item)
            .collect();
        slots.sort_unstable();

        slots
            .into_iter()
            .filter(|&slot| angular_distance(self.entries[slot].0, point) < angular_radius)
            .map(|slot| &self.entries[slot].1)
            .collect()
    }

    /// The payload nearest to `point`, with its Euclidean distance
    ///
    /// Returns `None` on an empty index.
    pub fn nearest(&self, point: Vec3) -> Option<(&P, f32)> {
        if self.entries.is_empty() {
            return None;
        }
        let query = [point.x, point.y, point.z];
        let hit = self.tree.nearest_one::<SquaredEuclidean>(&query);
        Some((&self.entries[hit.item].1, hit.distance.sqrt()))
    }
}

impl<P> Default for SphereIndex<P> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_nearest() {
        let mut index = SphereIndex::new();
        index.insert(Vec3::new(1.0, 0.0, 0.0), "x");
        index.insert(Vec3::new(0.0, 1.0, 0.0), "y");
        index.insert(Vec3::new(0.0, 0.0, 1.0), "z");

        let (payload, _) = index.nearest(Vec3::new(0.9, 0.1, 0.0)).unwrap();
        assert_eq!(*payload, "x");

        let (payload, _) = index.nearest(Vec3::new(0.0, 0.1, 0.9)).unwrap();
        assert_eq!(*payload, "z");
    }

    #[test]
    fn test_nearest_on_empty() {
        let index: SphereIndex<usize> = SphereIndex::new();
        assert!(index.nearest(Vec3::X).is_none());
    }

    #[test]
    fn test_query_radius_includes_self_and_filters() {
        let mut index = SphereIndex::new();
        let base = Vec3::new(0.0, 0.0, 1.0);
        index.insert(base, 0usize);
        // ~0.05 rad away
        index.insert(Vec3::new(0.05f32.sin(), 0.0, 0.05f32.cos()), 1usize);
        // ~0.2 rad away, outside the query radius
        index.insert(Vec3::new(0.2f32.sin(), 0.0, 0.2f32.cos()), 2usize);

        let hits: Vec<usize> = index
            .query_radius(base, 0.075)
            .into_iter()
            .copied()
            .collect();
        assert_eq!(hits, vec![0, 1]);
    }

    #[test]
    fn test_query_radius_deterministic_order() {
        let mut index = SphereIndex::new();
        for i in 0..8 {
            let theta = i as f32 * 0.005;
            index.insert(Vec3::new(theta.sin(), 0.0, theta.cos()), i);
        }
        let hits: Vec<usize> = index
            .query_radius(Vec3::new(0.0, 0.0, 1.0), 0.075)
            .into_iter()
            .copied()
            .collect();
        assert_eq!(hits, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn test_angular_distance_normalizes() {
        let d = angular_distance(Vec3::new(2.0, 0.0, 0.0), Vec3::new(0.0, 3.0, 0.0));
        assert!((d - std::f32::consts::FRAC_PI_2).abs() < 1e-5);
    }
}
