//! Error types for stlweld.
//!
//! Only conditions that leave the caller with nothing usable are errors.
//! Ambiguous format detection, malformed trailing blocks and cancellation are
//! absorbed by the parser and reported through [`Completion`](crate::io::Completion)
//! instead.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`MeshError`].
pub type Result<T> = std::result::Result<T, MeshError>;

/// Errors that can occur while loading or processing a mesh.
#[derive(Error, Debug)]
pub enum MeshError {
    /// The stream ended before a header could be read.
    #[error("stream too short to contain an STL header ({len} bytes)")]
    TruncatedHeader {
        /// Number of bytes available.
        len: usize,
    },

    /// Too many edge occurrences to pack into the 64-bit sort keys.
    #[error("mesh too large for edge extraction: {indices} triangle indices (limit {limit})")]
    OversizedInput {
        /// Number of triangle indices supplied.
        indices: usize,
        /// The maximum accepted number of indices.
        limit: usize,
    },

    /// A triangle references the same vertex more than once.
    #[error("face {face} is degenerate (has duplicate vertices)")]
    DegenerateFace {
        /// The face index.
        face: usize,
    },

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error loading mesh from file.
    #[error("failed to load mesh from {path}: {message}")]
    LoadError {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Error saving mesh to file.
    #[error("failed to save mesh to {path}: {message}")]
    SaveError {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Invalid parameter value.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The invalid value (as string).
        value: String,
        /// Reason the value is invalid.
        reason: &'static str,
    },
}

impl MeshError {
    /// Create an invalid parameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        MeshError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }

    /// Whether the error only affects edge extraction, leaving the indexed
    /// mesh usable.
    pub fn is_topology_only(&self) -> bool {
        matches!(
            self,
            MeshError::OversizedInput { .. } | MeshError::DegenerateFace { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let e = MeshError::TruncatedHeader { len: 3 };
        assert_eq!(e.to_string(), "stream too short to contain an STL header (3 bytes)");

        let e = MeshError::DegenerateFace { face: 7 };
        assert_eq!(e.to_string(), "face 7 is degenerate (has duplicate vertices)");
    }

    #[test]
    fn test_topology_only() {
        assert!(MeshError::DegenerateFace { face: 0 }.is_topology_only());
        assert!(MeshError::OversizedInput { indices: 1, limit: 0 }.is_topology_only());
        assert!(!MeshError::TruncatedHeader { len: 0 }.is_topology_only());
    }

    #[test]
    fn test_invalid_param() {
        let e = MeshError::invalid_param("header", 120, "must fit in 80 bytes");
        assert_eq!(
            e.to_string(),
            "invalid parameter: header = 120 (must fit in 80 bytes)"
        );
    }
}
