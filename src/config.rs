//! Mesh synthesis configuration and builder
//!
//! Every tunable of the pipeline is an explicit, validated parameter: no
//! global defaults are read at call sites. The same configuration always
//! produces the identical planet mesh.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{MeshError, Result};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Refinement depth of the generated mesh
///
/// Each level consumes one more hierarchy layer. Heights, regions, role
/// buffers, and landmarks only exist from [`DetailLevel::Area`] and
/// [`DetailLevel::Walking`] respectively.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DetailLevel {
    /// Coarse cells only, flat sphere
    Coarse,
    /// Biome refinement, flat sphere
    Biome,
    /// Area refinement with elevation bands and height shading
    Area,
    /// Walking refinement with displaced geometry, regions, and landmarks
    Walking,
}

impl DetailLevel {
    /// Number of hierarchy layers this level consumes
    #[inline]
    pub fn layer_count(self) -> usize {
        self as usize + 1
    }

    /// Human-readable level name
    pub fn name(self) -> &'static str {
        match self {
            DetailLevel::Coarse => "coarse",
            DetailLevel::Biome => "biome",
            DetailLevel::Area => "area",
            DetailLevel::Walking => "walking",
        }
    }
}

/// Configuration for one deterministic mesh synthesis run
///
/// # Example
///
/// ```rust
/// use voronoi_planet_mesh::{MeshConfigBuilder, DetailLevel};
///
/// let config = MeshConfigBuilder::new()
///     .seed("my-planet")
///     .level(DetailLevel::Walking)
///     .diffusion_passes(5)
///     .unwrap()
///     .build()
///     .unwrap();
/// assert_eq!(config.seed, "my-planet");
/// ```
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct MeshConfig {
    /// Seed string for the run's single random generator
    pub seed: String,

    /// Refinement depth to generate
    pub level: DetailLevel,

    /// Number of synchronous height relaxation passes
    ///
    /// Five passes bound land bands at 5 and let water saturate at -3.
    pub diffusion_passes: usize,

    /// Angular radius of the height-diffusion neighbor oracle, radians
    pub neighbor_radius: f32,

    /// Vertex budget per flat-shaded chunk
    ///
    /// Chunks flush before a triangle would exceed this, keeping every
    /// emitted chunk within 16-bit-friendly index ranges downstream.
    pub chunk_vertex_limit: usize,

    /// Angular tolerance for vertex merging and dedup, radians
    pub dedup_tolerance: f32,

    /// Radial shell thickness of one elevation band
    pub elevation_step: f32,

    /// Angular search radius for locating a point's enclosing cell, radians
    pub locate_radius: f32,
}

impl Default for MeshConfig {
    fn default() -> Self {
        MeshConfigBuilder::new().build().unwrap()
    }
}

impl MeshConfig {
    /// The run's random generator, derived from the seed string
    ///
    /// One generator instance is threaded through the whole pipeline;
    /// helpers never re-seed their own.
    pub fn rng(&self) -> ChaCha8Rng {
        rng_from_seed(&self.seed)
    }
}

/// Fold a seed string into a generator
///
/// FNV-1a over the seed bytes, so the mapping is stable across platforms
/// and releases.
pub fn rng_from_seed(seed: &str) -> ChaCha8Rng {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut hash = FNV_OFFSET;
    for &byte in seed.as_bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    ChaCha8Rng::seed_from_u64(hash)
}

/// Builder for [`MeshConfig`] with validation
///
/// Defaults match the original generator's constants:
/// - seed: `"0"`
/// - level: Walking
/// - diffusion_passes: 5
/// - neighbor_radius: 0.075 rad
/// - chunk_vertex_limit: 8000
/// - dedup_tolerance: 1e-4 rad
/// - elevation_step: 0.01
/// - locate_radius: 0.25 rad
#[derive(Debug, Clone)]
pub struct MeshConfigBuilder {
    seed: String,
    level: DetailLevel,
    diffusion_passes: usize,
    neighbor_radius: f32,
    chunk_vertex_limit: usize,
    dedup_tolerance: f32,
    elevation_step: f32,
    locate_radius: f32,
}

impl MeshConfigBuilder {
    /// Create a builder with default values
    pub fn new() -> Self {
        Self {
            seed: "0".to_string(),
            level: DetailLevel::Walking,
            diffusion_passes: 5,
            neighbor_radius: 0.075,
            chunk_vertex_limit: 8000,
            dedup_tolerance: 1e-4,
            elevation_step: 0.01,
            locate_radius: 0.25,
        }
    }

    /// Set the seed string
    pub fn seed(mut self, seed: impl Into<String>) -> Self {
        self.seed = seed.into();
        self
    }

    /// Set the refinement depth
    pub fn level(mut self, level: DetailLevel) -> Self {
        self.level = level;
        self
    }

    /// Set the number of relaxation passes
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for 0 or for more than 32 passes.
    pub fn diffusion_passes(mut self, passes: usize) -> Result<Self> {
        if passes == 0 || passes > 32 {
            return Err(MeshError::InvalidConfig(format!(
                "diffusion passes must be in 1..=32 (got {})",
                passes
            )));
        }
        self.diffusion_passes = passes;
        Ok(self)
    }

    /// Set the neighbor oracle radius in radians
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` when the radius is not positive.
    pub fn neighbor_radius(mut self, radius: f32) -> Result<Self> {
        if radius <= 0.0 {
            return Err(MeshError::InvalidConfig(format!(
                "neighbor radius must be positive (got {})",
                radius
            )));
        }
        self.neighbor_radius = radius;
        Ok(self)
    }

    /// Set the per-chunk vertex budget
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` when the budget cannot hold one triangle.
    pub fn chunk_vertex_limit(mut self, limit: usize) -> Result<Self> {
        if limit < 3 {
            return Err(MeshError::InvalidConfig(format!(
                "chunk vertex limit must hold at least one triangle (got {})",
                limit
            )));
        }
        self.chunk_vertex_limit = limit;
        Ok(self)
    }

    /// Set the vertex merge/dedup tolerance in radians
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` when the tolerance is not positive.
    pub fn dedup_tolerance(mut self, tolerance: f32) -> Result<Self> {
        if tolerance <= 0.0 {
            return Err(MeshError::InvalidConfig(format!(
                "dedup tolerance must be positive (got {})",
                tolerance
            )));
        }
        self.dedup_tolerance = tolerance;
        Ok(self)
    }

    /// Set the radial thickness of one elevation band
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` when the step is not positive.
    pub fn elevation_step(mut self, step: f32) -> Result<Self> {
        if step <= 0.0 {
            return Err(MeshError::InvalidConfig(format!(
                "elevation step must be positive (got {})",
                step
            )));
        }
        self.elevation_step = step;
        Ok(self)
    }

    /// Set the cell-location search radius in radians
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` when the radius is not positive.
    pub fn locate_radius(mut self, radius: f32) -> Result<Self> {
        if radius <= 0.0 {
            return Err(MeshError::InvalidConfig(format!(
                "locate radius must be positive (got {})",
                radius
            )));
        }
        self.locate_radius = radius;
        Ok(self)
    }

    /// Build the configuration
    pub fn build(self) -> Result<MeshConfig> {
        Ok(MeshConfig {
            seed: self.seed,
            level: self.level,
            diffusion_passes: self.diffusion_passes,
            neighbor_radius: self.neighbor_radius,
            chunk_vertex_limit: self.chunk_vertex_limit,
            dedup_tolerance: self.dedup_tolerance,
            elevation_step: self.elevation_step,
            locate_radius: self.locate_radius,
        })
    }
}

impl Default for MeshConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_builder_defaults() {
        let config = MeshConfigBuilder::new().build().unwrap();
        assert_eq!(config.seed, "0");
        assert_eq!(config.level, DetailLevel::Walking);
        assert_eq!(config.diffusion_passes, 5);
        assert_eq!(config.chunk_vertex_limit, 8000);
        assert!((config.neighbor_radius - 0.075).abs() < f32::EPSILON);
    }

    #[test]
    fn test_builder_custom() {
        let config = MeshConfigBuilder::new()
            .seed("archipelago-7")
            .level(DetailLevel::Area)
            .diffusion_passes(3)
            .unwrap()
            .chunk_vertex_limit(600)
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(config.seed, "archipelago-7");
        assert_eq!(config.level, DetailLevel::Area);
        assert_eq!(config.diffusion_passes, 3);
        assert_eq!(config.chunk_vertex_limit, 600);
    }

    #[test]
    fn test_builder_rejects_invalid() {
        assert!(MeshConfigBuilder::new().diffusion_passes(0).is_err());
        assert!(MeshConfigBuilder::new().diffusion_passes(33).is_err());
        assert!(MeshConfigBuilder::new().neighbor_radius(-0.1).is_err());
        assert!(MeshConfigBuilder::new().chunk_vertex_limit(2).is_err());
        assert!(MeshConfigBuilder::new().dedup_tolerance(0.0).is_err());
        assert!(MeshConfigBuilder::new().elevation_step(0.0).is_err());
        assert!(MeshConfigBuilder::new().locate_radius(0.0).is_err());
    }

    #[test]
    fn test_layer_counts() {
        assert_eq!(DetailLevel::Coarse.layer_count(), 1);
        assert_eq!(DetailLevel::Biome.layer_count(), 2);
        assert_eq!(DetailLevel::Area.layer_count(), 3);
        assert_eq!(DetailLevel::Walking.layer_count(), 4);
    }

    #[test]
    fn test_seed_string_determinism() {
        let mut a = rng_from_seed("planet-1");
        let mut b = rng_from_seed("planet-1");
        let mut c = rng_from_seed("planet-2");

        let draws_a: Vec<f64> = (0..8).map(|_| a.gen()).collect();
        let draws_b: Vec<f64> = (0..8).map(|_| b.gen()).collect();
        let draws_c: Vec<f64> = (0..8).map(|_| c.gen()).collect();

        assert_eq!(draws_a, draws_b);
        assert_ne!(draws_a, draws_c);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_config_serialization() {
        let config = MeshConfigBuilder::new()
            .seed("roundtrip")
            .level(DetailLevel::Biome)
            .build()
            .unwrap();

        let json = serde_json::to_string(&config).unwrap();
        let restored: MeshConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(config, restored);
    }
}
