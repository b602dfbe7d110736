//! Deterministic mesh synthesis pipeline
//!
//! Orchestrates one batch run: seed the generator, color the hierarchy,
//! diffuse elevation bands, displace geometry, segment regions, assemble
//! role buffers, and place landmarks. Single-threaded and synchronous; a
//! run either completes deterministically for its seed and parameters or
//! fails fast on malformed geometry. One random generator is threaded by
//! reference through every stage - helpers never seed their own.

use crate::adjacency::{Substrate, TriangleAdjacency};
use crate::cell::{inherit_from_parent, CellHierarchy, CellKind, CellLayer};
use crate::config::{DetailLevel, MeshConfig};
use crate::error::{MeshError, Result};
use crate::heightmap::{diffuse_heights, shade_cell_colors, HeightField, SurfaceSampler};
use crate::landmarks::{place_landmarks, Landmarks};
use crate::mesh::{MeshAssembler, MeshData, MeshRole};
use crate::regions::{
    fully_above_water, fully_below_water, segment_regions, touches_shoreline, vertex_band,
};
use glam::Vec3;
use log::{debug, info};
use rand::Rng;

/// Color of a coarse water cell
const WATER_COLOR: [f32; 3] = [0.33, 0.33, 1.0];
/// Color of a coarse land cell
const LAND_COLOR: [f32; 3] = [0.33, 1.0, 0.33];
/// Fraction of coarse draws that come up land
const LAND_THRESHOLD: f64 = 0.33;

/// Everything one synthesis run produces
#[derive(Debug, Clone, PartialEq)]
pub struct PlanetMeshOutput {
    /// Role-tagged buffers: render chunks, then collision chunks, then
    /// navigation, ocean, and ocean-navigation
    pub meshes: Vec<MeshData>,
    /// Elevation band per area cell (levels Area and Walking)
    pub height_map: Option<Vec<(usize, i32)>>,
    /// Shaded color per area cell (levels Area and Walking)
    pub color_data: Option<Vec<(usize, [f32; 3])>>,
    /// Placed landmarks and spawn points (level Walking)
    pub landmarks: Landmarks,
}

/// Synthesize a planet mesh from a cell hierarchy and substrate
///
/// The hierarchy must carry at least `config.level.layer_count()` non-empty
/// layers, coarse-first; colors and kinds are assigned in place. The
/// substrate is only consulted at [`DetailLevel::Walking`], where regions
/// and navigation buffers live on its triangulation.
pub fn generate_planet_mesh(
    hierarchy: &mut CellHierarchy,
    substrate: &Substrate,
    config: &MeshConfig,
) -> Result<PlanetMeshOutput> {
    let needed = config.level.layer_count();
    if hierarchy.len() < needed {
        return Err(MeshError::InvalidConfig(format!(
            "{} level needs {} hierarchy layers (got {})",
            config.level.name(),
            needed,
            hierarchy.len()
        )));
    }
    for depth in 0..needed {
        if hierarchy.layer(depth).is_some_and(CellLayer::is_empty) {
            return Err(MeshError::GeometryInconsistency(format!(
                "hierarchy layer {} is empty",
                depth
            )));
        }
    }

    info!(
        "synthesizing planet mesh: seed={:?} level={}",
        config.seed,
        config.level.name()
    );
    let mut rng = config.rng();
    let layers = hierarchy.layers_mut();

    // Coarse land/water split from one draw per cell.
    for cell in layers[0].cells_mut() {
        let draw: f64 = rng.gen();
        if draw > LAND_THRESHOLD {
            cell.color = WATER_COLOR;
            cell.kind = CellKind::Water;
        } else {
            cell.color = LAND_COLOR;
            cell.kind = CellKind::Land;
        }
    }

    // Color inheritance down to the area layer.
    for depth in 1..needed.min(3) {
        let (coarser, finer) = layers.split_at_mut(depth);
        inherit_from_parent(&coarser[depth - 1], &mut finer[0], config.locate_radius);
        debug!("layer {} inherited colors", depth);
    }

    let mut height_map = None;
    let mut color_data = None;
    let mut field = None;
    if config.level >= DetailLevel::Area {
        let bands = diffuse_heights(&layers[2], config.diffusion_passes, config.neighbor_radius);
        shade_cell_colors(&mut layers[2], &bands);
        height_map = Some(
            bands
                .bands()
                .iter()
                .enumerate()
                .map(|(cell, &band)| (cell, band))
                .collect(),
        );
        color_data = Some(
            layers[2]
                .cells()
                .iter()
                .map(|cell| (cell.id, cell.color))
                .collect(),
        );
        field = Some(bands);
    }

    if config.level < DetailLevel::Walking {
        let depth = needed - 1;
        let meshes = assemble_flat_layer(&layers[depth], config);
        return Ok(PlanetMeshOutput {
            meshes,
            height_map,
            color_data,
            landmarks: Landmarks::default(),
        });
    }

    // Walking colors: shaded area color with per-channel jitter.
    {
        let (coarser, finer) = layers.split_at_mut(3);
        inherit_from_parent(&coarser[2], &mut finer[0], config.locate_radius);
        for cell in finer[0].cells_mut() {
            for channel in cell.color.iter_mut() {
                let draw: f64 = rng.gen();
                *channel *= (draw * 0.1 + 0.9) as f32;
            }
        }
    }

    let field = field.expect("walking level implies area heights");
    let (meshes, landmarks) =
        assemble_walking(&layers[2], &layers[3], &field, substrate, config, &mut rng)?;

    Ok(PlanetMeshOutput {
        meshes,
        height_map,
        color_data,
        landmarks,
    })
}

/// Fan-triangulate a layer onto the unit sphere (no displacement)
fn assemble_flat_layer(layer: &CellLayer, config: &MeshConfig) -> Vec<MeshData> {
    let mut render = MeshAssembler::new(
        MeshRole::Render,
        config.chunk_vertex_limit,
        config.dedup_tolerance,
    );
    for cell in layer.cells() {
        if cell.vertices.len() < 3 {
            continue;
        }
        for i in 0..cell.vertices.len() {
            let j = (i + 1) % cell.vertices.len();
            render.push_shaded_triangle(
                [cell.centroid, cell.vertices[i], cell.vertices[j]],
                cell.color,
            );
        }
    }
    render.finish()
}

/// Walking-level assembly: displaced fans, regions, roles, landmarks
fn assemble_walking(
    area: &CellLayer,
    walking: &CellLayer,
    field: &HeightField,
    substrate: &Substrate,
    config: &MeshConfig,
    rng: &mut impl Rng,
) -> Result<(Vec<MeshData>, Landmarks)> {
    let sampler = SurfaceSampler::new(
        area,
        field,
        config.elevation_step,
        config.dedup_tolerance,
        config.locate_radius,
    );

    // Displaced walking fans feed the flat-shaded roles; water fans also
    // leave a sea-surface copy at unit radius.
    let mut render = MeshAssembler::new(
        MeshRole::Render,
        config.chunk_vertex_limit,
        config.dedup_tolerance,
    );
    let mut collision = MeshAssembler::new(
        MeshRole::Collision,
        config.chunk_vertex_limit,
        config.dedup_tolerance,
    );
    let mut ocean = MeshAssembler::new(
        MeshRole::Ocean,
        config.chunk_vertex_limit,
        config.dedup_tolerance,
    );

    for cell in walking.cells() {
        if cell.vertices.len() < 3 {
            continue;
        }
        let apex = sampler.displace(cell.centroid)?;
        let rim: Vec<Vec3> = cell
            .vertices
            .iter()
            .map(|&vertex| sampler.displace(vertex))
            .collect::<Result<_>>()?;
        for i in 0..rim.len() {
            let j = (i + 1) % rim.len();
            let corners = [apex, rim[i], rim[j]];
            render.push_shaded_triangle(corners, cell.color);
            if cell.kind.is_land() {
                collision.push_shaded_triangle(corners, cell.color);
            } else {
                ocean.push_triangle([
                    cell.centroid.normalize(),
                    cell.vertices[i].normalize(),
                    cell.vertices[j].normalize(),
                ]);
            }
        }
    }
    debug!("walking fans assembled over {} cells", walking.len());

    // Substrate displacement and banding for regions and navigation.
    let adjacency = TriangleAdjacency::build(substrate)?;
    let mut displaced = Vec::with_capacity(substrate.vertex_count());
    let mut vertex_bands = Vec::with_capacity(substrate.vertex_count());
    for &vertex in &substrate.vertices {
        let radius = sampler.sample_radius(vertex)?;
        displaced.push(vertex.normalize() * radius);
        vertex_bands.push(vertex_band(radius, config.elevation_step));
    }
    let triangle_vertices: Vec<[usize; 3]> = (0..substrate.triangle_count())
        .map(|tri| substrate.triangle_vertices(tri))
        .collect::<Result<_>>()?;
    let triangle_bands: Vec<[i32; 3]> = triangle_vertices
        .iter()
        .map(|corners| corners.map(|v| vertex_bands[v]))
        .collect();

    let shoreline_mask: Vec<bool> = triangle_bands
        .iter()
        .map(|&bands| touches_shoreline(bands))
        .collect();
    let island_mask: Vec<bool> = triangle_bands
        .iter()
        .map(|&bands| fully_above_water(bands))
        .collect();
    let shoreline_regions = segment_regions(&shoreline_mask, &adjacency);
    let island_regions = segment_regions(&island_mask, &adjacency);
    debug!(
        "{} shoreline regions, {} island regions",
        shoreline_regions.len(),
        island_regions.len()
    );

    // Navigation over island regions, displaced; ocean navigation over
    // open-water triangles at the sea surface.
    let mut navigation = MeshAssembler::new(
        MeshRole::Navigation,
        config.chunk_vertex_limit,
        config.dedup_tolerance,
    );
    for region in &island_regions {
        for &tri in region {
            navigation.push_triangle(triangle_vertices[tri].map(|v| displaced[v]));
        }
    }
    let mut ocean_navigation = MeshAssembler::new(
        MeshRole::OceanNavigation,
        config.chunk_vertex_limit,
        config.dedup_tolerance,
    );
    for (tri, &bands) in triangle_bands.iter().enumerate() {
        if fully_below_water(bands) {
            ocean_navigation
                .push_triangle(triangle_vertices[tri].map(|v| substrate.vertices[v].normalize()));
        }
    }

    let landmarks = place_landmarks(
        &shoreline_regions,
        &island_regions,
        &triangle_vertices,
        &vertex_bands,
        &displaced,
        rng,
    );
    info!(
        "placed {} landmarks, {} spawn points",
        landmarks.buildings.len(),
        landmarks.spawn_points.len()
    );

    let mut meshes = render.finish();
    meshes.extend(collision.finish());
    meshes.extend(navigation.finish());
    meshes.extend(ocean.finish());
    meshes.extend(ocean_navigation.finish());
    Ok((meshes, landmarks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Cell;
    use crate::config::MeshConfigBuilder;

    /// One layer of six cube-face cells whose corners are the cube corners
    ///
    /// Corner positions are built from the same literals for every face, so
    /// shared corners are bit-identical across cells and layers.
    fn cube_layer() -> CellLayer {
        let c = |x: f32, y: f32, z: f32| Vec3::new(x, y, z).normalize();
        let faces = vec![
            (Vec3::Z, [c(1., 1., 1.), c(1., -1., 1.), c(-1., -1., 1.), c(-1., 1., 1.)]),
            (Vec3::NEG_Z, [c(1., 1., -1.), c(1., -1., -1.), c(-1., -1., -1.), c(-1., 1., -1.)]),
            (Vec3::X, [c(1., 1., 1.), c(1., 1., -1.), c(1., -1., -1.), c(1., -1., 1.)]),
            (Vec3::NEG_X, [c(-1., 1., 1.), c(-1., 1., -1.), c(-1., -1., -1.), c(-1., -1., 1.)]),
            (Vec3::Y, [c(1., 1., 1.), c(1., 1., -1.), c(-1., 1., -1.), c(-1., 1., 1.)]),
            (Vec3::NEG_Y, [c(1., -1., 1.), c(1., -1., -1.), c(-1., -1., -1.), c(-1., -1., 1.)]),
        ];
        CellLayer::new(
            faces
                .into_iter()
                .enumerate()
                .map(|(id, (center, corners))| Cell::new(id, center, corners.to_vec()))
                .collect(),
        )
    }

    fn cube_hierarchy() -> CellHierarchy {
        CellHierarchy::new(vec![cube_layer(), cube_layer(), cube_layer(), cube_layer()])
    }

    /// Substrate over the six face centers and eight cube corners
    fn cube_substrate() -> Substrate {
        let c = |x: f32, y: f32, z: f32| Vec3::new(x, y, z).normalize();
        let points = vec![
            Vec3::Z,
            Vec3::NEG_Z,
            Vec3::X,
            Vec3::NEG_X,
            Vec3::Y,
            Vec3::NEG_Y,
            c(1., 1., 1.),
            c(1., 1., -1.),
            c(1., -1., 1.),
            c(1., -1., -1.),
            c(-1., 1., 1.),
            c(-1., 1., -1.),
            c(-1., -1., 1.),
            c(-1., -1., -1.),
        ];
        Substrate::from_points(&points).unwrap()
    }

    #[test]
    fn test_coarse_level_renders_flat() {
        let mut hierarchy = CellHierarchy::new(vec![cube_layer()]);
        let substrate = cube_substrate();
        let config = MeshConfigBuilder::new()
            .seed("flat")
            .level(DetailLevel::Coarse)
            .build()
            .unwrap();

        let output = generate_planet_mesh(&mut hierarchy, &substrate, &config).unwrap();
        assert!(!output.meshes.is_empty());
        assert!(output
            .meshes
            .iter()
            .all(|mesh| mesh.role == MeshRole::Render));
        assert!(output.height_map.is_none());
        assert!(output.color_data.is_none());
        assert!(output.landmarks.buildings.is_empty());

        // 6 cells * 4 fan triangles * 3 vertices each.
        let vertices: usize = output.meshes.iter().map(|m| m.vertex_count()).sum();
        assert_eq!(vertices, 72);
    }

    #[test]
    fn test_missing_layers_rejected() {
        let mut hierarchy = CellHierarchy::new(vec![cube_layer()]);
        let substrate = cube_substrate();
        let config = MeshConfigBuilder::new()
            .level(DetailLevel::Walking)
            .build()
            .unwrap();

        let result = generate_planet_mesh(&mut hierarchy, &substrate, &config);
        assert!(matches!(result, Err(MeshError::InvalidConfig(_))));
    }

    #[test]
    fn test_area_level_emits_height_and_color_data() {
        let mut hierarchy =
            CellHierarchy::new(vec![cube_layer(), cube_layer(), cube_layer()]);
        let substrate = cube_substrate();
        let config = MeshConfigBuilder::new()
            .seed("banded")
            .level(DetailLevel::Area)
            .build()
            .unwrap();

        let output = generate_planet_mesh(&mut hierarchy, &substrate, &config).unwrap();
        let height_map = output.height_map.unwrap();
        assert_eq!(height_map.len(), 6);
        // Isolated cells rise to 5 or sink to the -3 saturation depth.
        for &(_, band) in &height_map {
            assert!(band == 5 || band == -3, "band {}", band);
        }
        assert_eq!(output.color_data.unwrap().len(), 6);
    }

    #[test]
    fn test_walking_level_produces_all_roles() {
        let mut hierarchy = cube_hierarchy();
        let substrate = cube_substrate();
        let config = MeshConfigBuilder::new()
            .seed("full")
            .level(DetailLevel::Walking)
            .build()
            .unwrap();

        let output = generate_planet_mesh(&mut hierarchy, &substrate, &config).unwrap();
        let roles: Vec<MeshRole> = output.meshes.iter().map(|m| m.role).collect();
        assert!(roles.contains(&MeshRole::Render));

        // Role ordering: render chunks first, collision after, navigation
        // types last.
        let first_render = roles.iter().position(|&r| r == MeshRole::Render);
        assert_eq!(first_render, Some(0));

        // Navigation-type buffers never appear with colors or normals.
        for mesh in &output.meshes {
            if mesh.role.deduplicates() {
                assert!(mesh.colors.is_none());
                assert!(mesh.normals.is_none());
            } else {
                assert!(mesh.colors.is_some());
                assert!(mesh.normals.is_some());
            }
        }
    }

    #[test]
    fn test_chunk_bound_holds_in_pipeline() {
        let mut hierarchy = cube_hierarchy();
        let substrate = cube_substrate();
        let config = MeshConfigBuilder::new()
            .seed("chunky")
            .level(DetailLevel::Walking)
            .chunk_vertex_limit(9)
            .unwrap()
            .build()
            .unwrap();

        let output = generate_planet_mesh(&mut hierarchy, &substrate, &config).unwrap();
        for mesh in &output.meshes {
            if mesh.role.chunked() {
                assert!(mesh.vertex_count() <= 9, "{}", mesh.vertex_count());
            }
        }
    }

    #[test]
    fn test_identical_seed_reproduces_buffers() {
        let substrate = cube_substrate();
        let config = MeshConfigBuilder::new()
            .seed("determinism")
            .level(DetailLevel::Walking)
            .build()
            .unwrap();

        let mut first_hierarchy = cube_hierarchy();
        let first = generate_planet_mesh(&mut first_hierarchy, &substrate, &config).unwrap();
        let mut second_hierarchy = cube_hierarchy();
        let second = generate_planet_mesh(&mut second_hierarchy, &substrate, &config).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_landmarks_reproduce_for_identical_seed() {
        let substrate = cube_substrate();
        let config = MeshConfigBuilder::new()
            .seed("landmark-run")
            .level(DetailLevel::Walking)
            .build()
            .unwrap();

        let mut hierarchy_a = cube_hierarchy();
        let a = generate_planet_mesh(&mut hierarchy_a, &substrate, &config).unwrap();
        let mut hierarchy_b = cube_hierarchy();
        let b = generate_planet_mesh(&mut hierarchy_b, &substrate, &config).unwrap();

        assert_eq!(a.landmarks, b.landmarks);
    }
}
