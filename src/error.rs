//! Error types for planet mesh synthesis

use glam::Vec3;
use std::fmt;

/// Errors that can occur while synthesizing a planet mesh
#[derive(Debug, Clone, PartialEq)]
pub enum MeshError {
    /// Configuration validation failed
    InvalidConfig(String),
    /// Dangling index or malformed topology in the supplied geometry
    GeometryInconsistency(String),
    /// A point could not be projected onto any banded surface region
    UnresolvedHeightQuery {
        /// The point whose elevation could not be resolved
        point: Vec3,
        /// Id of the nearest candidate cell that was searched
        cell: usize,
    },
}

impl fmt::Display for MeshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeshError::InvalidConfig(msg) => write!(f, "invalid configuration: {}", msg),
            MeshError::GeometryInconsistency(msg) => {
                write!(f, "geometry inconsistency: {}", msg)
            }
            MeshError::UnresolvedHeightQuery { point, cell } => write!(
                f,
                "unresolved height query at ({}, {}, {}) near cell {}",
                point.x, point.y, point.z, cell
            ),
        }
    }
}

impl std::error::Error for MeshError {}

/// Result type alias for mesh synthesis operations
pub type Result<T> = std::result::Result<T, MeshError>;
