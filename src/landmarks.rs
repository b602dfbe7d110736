//! Heuristic landmark placement from region and elevation data
//!
//! Ports sit on the most exposed coastal triangle of each shoreline region;
//! houses and temples sit on band-uniform triangles of each island region.
//! Placement is a pure function of the regions, the displaced geometry, and
//! the single threaded random generator, so an identical seed and region
//! set reproduces the identical ordered output. Regions without candidates
//! are skipped silently.

use glam::Vec3;
use rand::Rng;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Highest elevation band considered for building placement
pub const BUILDING_BAND_MAX: i32 = 5;

/// Fraction denominator for the per-region building budget
const CANDIDATES_PER_BUILDING: usize = 20;

/// Kind of a placed landmark
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandmarkKind {
    /// Harbor on the most exposed coastal triangle of a shoreline region
    Port,
    /// Common building on an island triangle
    House,
    /// Rare building favoring high elevation bands
    Temple,
}

/// A generated point of interest
///
/// Not persisted source-of-truth: regenerated per run from the seed.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landmark {
    /// What was placed
    pub kind: LandmarkKind,
    /// Anchor point of the placement
    pub anchor: Vec3,
    /// Facing direction (unit vector)
    pub facing: Vec3,
}

/// All landmarks of one run
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Landmarks {
    /// Ports, houses, and temples in placement order
    pub buildings: Vec<Landmark>,
    /// Just-offshore spawn points, one per placed port
    pub spawn_points: Vec<Vec3>,
}

/// Place ports, buildings, and spawn points
///
/// # Arguments
///
/// * `shoreline_regions` - components of shoreline-touching triangles
/// * `island_regions` - components of fully-above-water triangles
/// * `triangle_vertices` - vertex-index triple per substrate triangle
/// * `vertex_bands` - elevation band per substrate vertex
/// * `displaced` - band-displaced position per substrate vertex
/// * `rng` - the run's single threaded generator
pub fn place_landmarks(
    shoreline_regions: &[Vec<usize>],
    island_regions: &[Vec<usize>],
    triangle_vertices: &[[usize; 3]],
    vertex_bands: &[i32],
    displaced: &[Vec3],
    rng: &mut impl Rng,
) -> Landmarks {
    let mut landmarks = Landmarks::default();

    for region in shoreline_regions {
        if let Some((anchor, facing)) = place_port(region, triangle_vertices, vertex_bands, displaced)
        {
            landmarks.buildings.push(Landmark {
                kind: LandmarkKind::Port,
                anchor,
                facing,
            });
            // Reflect the anchor outward along anchor->facing: just offshore.
            landmarks
                .spawn_points
                .push((anchor * 2.0 - facing).normalize());
        }
    }

    for region in island_regions {
        place_buildings(
            region,
            triangle_vertices,
            vertex_bands,
            displaced,
            rng,
            &mut landmarks.buildings,
        );
    }

    landmarks
}

/// Pick the port site of one shoreline region
///
/// Eligible triangles have exactly two vertices in the sea-level band and
/// one in the next band inland; the largest perimeter wins (a proxy for the
/// most exposed coastal triangle), ties keeping the earlier triangle.
/// Anchor is the renormalized average of the two sea-level vertices, facing
/// the inland vertex.
fn place_port(
    region: &[usize],
    triangle_vertices: &[[usize; 3]],
    vertex_bands: &[i32],
    displaced: &[Vec3],
) -> Option<(Vec3, Vec3)> {
    let mut best: Option<(f32, Vec3, Vec3)> = None;

    for &triangle in region {
        let corners = triangle_vertices[triangle];
        let bands = corners.map(|v| vertex_bands[v]);
        let shore: Vec<usize> = corners
            .iter()
            .zip(bands.iter())
            .filter(|(_, &b)| b == 0)
            .map(|(&v, _)| v)
            .collect();
        let inland: Vec<usize> = corners
            .iter()
            .zip(bands.iter())
            .filter(|(_, &b)| b == 1)
            .map(|(&v, _)| v)
            .collect();
        if shore.len() != 2 || inland.len() != 1 {
            continue;
        }

        let [pa, pb, pc] = corners.map(|v| displaced[v]);
        let perimeter =
            pa.distance(pb) + pb.distance(pc) + pc.distance(pa);
        if best.as_ref().is_some_and(|(b, _, _)| perimeter <= *b) {
            continue;
        }

        let anchor = ((displaced[shore[0]] + displaced[shore[1]]) * 0.5).normalize();
        let facing = displaced[inland[0]].normalize();
        best = Some((perimeter, anchor, facing));
    }

    best.map(|(_, anchor, facing)| (anchor, facing))
}

/// Place the building budget of one island region
///
/// Candidates are triangles whose three vertices share one band in
/// `0..=BUILDING_BAND_MAX`, ordered by band descending then triangle id.
/// The top ceil(candidates/20) are kept; each becomes a temple when the
/// seeded draw scaled by band/max-band exceeds 0.8, else a house. Anchor is
/// the displaced centroid; facing is the first vertex direction, a
/// documented simplification rather than a true surface normal.
fn place_buildings(
    region: &[usize],
    triangle_vertices: &[[usize; 3]],
    vertex_bands: &[i32],
    displaced: &[Vec3],
    rng: &mut impl Rng,
    out: &mut Vec<Landmark>,
) {
    let mut candidates: Vec<(i32, usize)> = region
        .iter()
        .filter_map(|&triangle| {
            let bands = triangle_vertices[triangle].map(|v| vertex_bands[v]);
            let band = bands[0];
            if (0..=BUILDING_BAND_MAX).contains(&band) && bands[1] == band && bands[2] == band {
                Some((band, triangle))
            } else {
                None
            }
        })
        .collect();
    if candidates.is_empty() {
        return;
    }

    candidates.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    let budget = (candidates.len() + CANDIDATES_PER_BUILDING - 1) / CANDIDATES_PER_BUILDING;

    for &(band, triangle) in candidates.iter().take(budget) {
        let corners = triangle_vertices[triangle].map(|v| displaced[v]);
        let draw: f64 = rng.gen();
        let kind = if draw * band as f64 / BUILDING_BAND_MAX as f64 > 0.8 {
            LandmarkKind::Temple
        } else {
            LandmarkKind::House
        };
        out.push(Landmark {
            kind,
            anchor: (corners[0] + corners[1] + corners[2]) / 3.0,
            facing: corners[0].normalize(),
        });
    }
}
