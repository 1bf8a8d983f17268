//! End-to-end loading: parse, weld, extract edges.
//!
//! ```no_run
//! use stlweld::pipeline::{load_mesh, LoadOptions};
//!
//! let loaded = load_mesh("part.stl", &LoadOptions::default()).unwrap();
//! println!(
//!     "{} facets -> {} vertices",
//!     loaded.stl.num_facets(),
//!     loaded.mesh.num_vertices()
//! );
//! if let Some(edges) = &loaded.edges {
//!     println!("{} edges, closed: {}", edges.num_edges(), edges.is_closed());
//! }
//! ```

use std::path::Path;

use crate::error::Result;
use crate::io::{self, ParseOptions, StlFile};
use crate::mesh::{build_indexed, extract_edges, BuildOptions, EdgeTopology, IndexedMesh};

/// Options for [`load_mesh`].
#[derive(Debug, Default)]
pub struct LoadOptions {
    /// Reader options (progress and cancellation).
    pub parse: ParseOptions,
    /// Welding and edge extraction options.
    pub build: BuildOptions,
}

impl LoadOptions {
    /// Set the reader options.
    pub fn with_parse(mut self, parse: ParseOptions) -> Self {
        self.parse = parse;
        self
    }

    /// Set the build options.
    pub fn with_build(mut self, build: BuildOptions) -> Self {
        self.build = build;
        self
    }
}

/// A parsed STL file together with its indexed mesh and edge topology.
#[derive(Debug, Clone)]
pub struct LoadedMesh {
    /// Raw facets and payload information.
    pub stl: StlFile,
    /// Welded vertices and triangles.
    pub mesh: IndexedMesh,
    /// Edge topology, or `None` if it could not be derived from the triangles.
    pub edges: Option<EdgeTopology>,
}

/// Index parsed facets and derive their edges.
///
/// Edge extraction failures (degenerate triangles, oversized input) do not
/// fail the whole load; they are logged and leave [`LoadedMesh::edges`] empty.
pub fn process(stl: StlFile, options: &BuildOptions) -> Result<LoadedMesh> {
    let mesh = build_indexed(&stl.facets, options);
    let edges = match extract_edges(&mesh.triangles, options) {
        Ok(edges) => Some(edges),
        Err(e) if e.is_topology_only() => {
            log::warn!("skipping edge topology: {}", e);
            None
        }
        Err(e) => return Err(e),
    };

    log::info!(
        "{} facets, {} vertices, {} edges",
        stl.num_facets(),
        mesh.num_vertices(),
        edges.as_ref().map_or(0, EdgeTopology::num_edges)
    );

    Ok(LoadedMesh { stl, mesh, edges })
}

/// Load an STL file and build its indexed mesh and edge topology.
pub fn load_mesh<P: AsRef<Path>>(path: P, options: &LoadOptions) -> Result<LoadedMesh> {
    let stl = io::load(path, &options.parse)?;
    if !stl.is_complete() {
        log::warn!("STL input ended early ({:?})", stl.completion);
    }
    process(stl, &options.build)
}
