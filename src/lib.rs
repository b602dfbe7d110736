//! Textured, navigable planet mesh synthesis
//!
//! Builds role-tagged mesh buffers from a hierarchical spherical Voronoi
//! partition (coarse, biome, area, walking refinement layers) and a fixed
//! triangulated substrate. The pipeline colors the hierarchy from one
//! seeded draw per coarse cell, relaxes an integer elevation band over the
//! area cells, displaces geometry through the banded surface, extracts
//! shoreline and island regions, and places ports, houses, temples, and
//! spawn points.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use voronoi_planet_mesh::*;
//!
//! # fn hierarchy() -> CellHierarchy { unimplemented!() }
//! # fn sphere_points() -> Vec<glam::Vec3> { unimplemented!() }
//! let mut hierarchy: CellHierarchy = hierarchy();
//! let substrate = Substrate::from_points(&sphere_points()).unwrap();
//!
//! let config = MeshConfigBuilder::new()
//!     .seed("my-planet")
//!     .level(DetailLevel::Walking)
//!     .build()
//!     .unwrap();
//!
//! let output = generate_planet_mesh(&mut hierarchy, &substrate, &config).unwrap();
//! println!(
//!     "{} buffers, {} landmarks",
//!     output.meshes.len(),
//!     output.landmarks.buildings.len()
//! );
//! ```
//!
//! # Determinism
//!
//! Everything flows from the seed string: one `ChaCha8Rng` is threaded by
//! reference through coarse coloring, walking jitter, and landmark
//! classification. Two runs with the same seed, level, and inputs produce
//! byte-identical buffers.
//!
//! # Features
//!
//! - `serde`: serialization support for configuration and output types

// Modules
pub mod adjacency;
pub mod cell;
pub mod config;
pub mod error;
pub mod heightmap;
pub mod landmarks;
pub mod mesh;
pub mod pipeline;
pub mod regions;
pub mod spatial;

// Re-export core types for convenience
pub use adjacency::{Substrate, TriangleAdjacency};
pub use cell::{Cell, CellHierarchy, CellKind, CellLayer};
pub use config::{rng_from_seed, DetailLevel, MeshConfig, MeshConfigBuilder};
pub use error::{MeshError, Result};
pub use heightmap::{diffuse_heights, shade_cell_colors, HeightField, SurfaceSampler, VertexBandResolver};
pub use landmarks::{place_landmarks, Landmark, LandmarkKind, Landmarks};
pub use mesh::{MeshAssembler, MeshData, MeshRole};
pub use pipeline::{generate_planet_mesh, PlanetMeshOutput};
pub use regions::{segment_regions, vertex_band};
pub use spatial::{angular_distance, SphereIndex};

// Re-export glam::Vec3 for convenience
pub use glam::Vec3;
