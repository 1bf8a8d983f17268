//! # stlweld
//!
//! STL loading and mesh indexing.
//!
//! stlweld reads binary and text STL (including files made of several
//! concatenated payloads), welds the triangle soup into a shared vertex
//! buffer and derives the unique edges of the resulting mesh.
//!
//! ## Features
//!
//! - **Content-based detection**: binary or text is decided from the bytes
//! - **Damage tolerant**: malformed text keeps every facet read before it
//! - **Progress and cancellation**: long reads can be observed and stopped
//! - **Exact welding**: vertices merge only on bit-identical coordinates
//! - **Edge topology**: unique edges plus per-triangle edge adjacency
//!
//! ## Quick Start
//!
//! ```no_run
//! use stlweld::prelude::*;
//!
//! let loaded = load_mesh("model.stl", &LoadOptions::default()).unwrap();
//!
//! println!("Facets: {}", loaded.stl.num_facets());
//! println!("Vertices: {}", loaded.mesh.num_vertices());
//! if let Some(edges) = &loaded.edges {
//!     println!("Edges: {}", edges.num_edges());
//! }
//! ```
//!
//! ## Working Step by Step
//!
//! ```
//! use stlweld::prelude::*;
//! use stlweld::io;
//! use nalgebra::Point3;
//!
//! let facets = vec![
//!     Facet::from_corners(
//!         Point3::new(0.0, 0.0, 0.0),
//!         Point3::new(1.0, 0.0, 0.0),
//!         Point3::new(0.0, 1.0, 0.0),
//!     ),
//!     Facet::from_corners(
//!         Point3::new(1.0, 0.0, 0.0),
//!         Point3::new(1.0, 1.0, 0.0),
//!         Point3::new(0.0, 1.0, 0.0),
//!     ),
//! ];
//!
//! // Write and read back a text payload
//! let mut buf = Vec::new();
//! io::write_ascii(&mut buf, "solid quad", &facets).unwrap();
//! let stl = io::parse(&buf, &ParseOptions::default()).unwrap();
//! assert_eq!(stl.facets, facets);
//!
//! // Weld and extract edges
//! let options = BuildOptions::default();
//! let mesh = build_indexed(&stl.facets, &options);
//! let edges = extract_edges(&mesh.triangles, &options).unwrap();
//! assert_eq!(mesh.num_vertices(), 4);
//! assert_eq!(edges.num_edges(), 5);
//! assert_eq!(edges.boundary_edge_count(), 4);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod io;
pub mod mesh;
pub mod pipeline;
pub mod progress;

/// Prelude module for convenient imports.
///
/// ```
/// use stlweld::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{MeshError, Result};
    pub use crate::io::{Completion, Encoding, ParseOptions, StlFile};
    pub use crate::mesh::{
        build_indexed, extract_edges, BuildOptions, EdgeId, EdgeTopology, FaceId, Facet,
        IndexedMesh, VertexId,
    };
    pub use crate::pipeline::{load_mesh, LoadOptions, LoadedMesh};
    pub use crate::progress::{CancelToken, Progress};
}

// Re-export nalgebra types for convenience
pub use nalgebra;
