//! Indexed mesh data structures.
//!
//! This module turns the triangle soup read from an STL file into shared
//! geometry and topology.
//!
//! # Overview
//!
//! - [`Facet`] is one raw triangle record: a normal and three corners.
//! - [`build_indexed`] welds corners with identical positions into a vertex
//!   buffer and returns an [`IndexedMesh`].
//! - [`extract_edges`] derives the unique undirected edges of the indexed
//!   triangles and, for every triangle, its three bounding edges
//!   ([`EdgeTopology`]).
//!
//! Elements are addressed by the typed indices [`VertexId`], [`EdgeId`] and
//! [`FaceId`].
//!
//! # Example
//!
//! ```
//! use stlweld::mesh::{build_indexed, extract_edges, BuildOptions, Facet};
//! use nalgebra::Point3;
//!
//! let p = |x, y, z| Point3::new(x, y, z);
//! let facets = vec![
//!     Facet::from_corners(p(0.0, 0.0, 0.0), p(0.0, 1.0, 0.0), p(1.0, 0.0, 0.0)),
//!     Facet::from_corners(p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 0.0, 1.0)),
//!     Facet::from_corners(p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0), p(0.0, 0.0, 1.0)),
//!     Facet::from_corners(p(0.0, 1.0, 0.0), p(0.0, 0.0, 0.0), p(0.0, 0.0, 1.0)),
//! ];
//!
//! let options = BuildOptions::default();
//! let mesh = build_indexed(&facets, &options);
//! let topo = extract_edges(&mesh.triangles, &options).unwrap();
//!
//! assert_eq!(mesh.num_vertices(), 4);
//! assert_eq!(topo.num_edges(), 6);
//! assert!(topo.is_closed());
//! ```

mod builder;
mod edges;
mod facet;
mod index;

pub use builder::{build_indexed, BuildOptions, IndexedMesh};
pub use edges::{extract_edges, EdgeTopology, MAX_EDGE_OCCURRENCES};
pub use facet::Facet;
pub use index::{EdgeId, FaceId, VertexId, MAX_INDEX};
