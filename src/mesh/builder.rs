//! Indexed mesh construction from triangle soup.
//!
//! STL stores every corner of every triangle separately. This module welds
//! corners that share an exact position into a single vertex and rewrites each
//! facet as a triple of vertex indices.
//!
//! Welding is sort-based rather than hash-based: a permutation of all corners
//! is sorted lexicographically by `(x, y, z)` and equal neighbours are folded
//! into one group. That keeps the cost at O(M log M) for M corners and makes
//! the output independent of hashing or insertion order.

use std::cmp::Ordering;

use nalgebra::Point3;
use rayon::prelude::*;

use super::facet::Facet;
use super::index::{FaceId, VertexId};

/// Options shared by the builder and the edge extractor.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Whether to sort with rayon's parallel stable sort (default: true).
    ///
    /// Output is bit-identical either way.
    pub parallel: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self { parallel: true }
    }
}

impl BuildOptions {
    /// Set whether to use parallel execution.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Create options for single-threaded execution.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }
}

/// A deduplicated vertex buffer plus one index triple per input facet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexedMesh {
    /// Unique positions, in sorted `(x, y, z)` order.
    pub vertices: Vec<Point3<f32>>,
    /// One entry per facet, in file order.
    pub triangles: Vec<[VertexId; 3]>,
}

impl IndexedMesh {
    /// Number of unique vertices.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles (always equal to the number of input facets).
    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    /// Whether the mesh has no triangles.
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Iterate over all triangle ids.
    pub fn face_ids(&self) -> impl Iterator<Item = FaceId> {
        (0..self.triangles.len()).map(FaceId::new)
    }

    /// Position of a vertex.
    #[inline]
    pub fn position(&self, v: VertexId) -> Point3<f32> {
        self.vertices[v.index()]
    }

    /// Resolve a triangle back to its three corner positions.
    pub fn triangle_positions(&self, f: FaceId) -> [Point3<f32>; 3] {
        let [a, b, c] = self.triangles[f.index()];
        [self.position(a), self.position(b), self.position(c)]
    }

    /// Whether a triangle references the same vertex more than once.
    pub fn is_degenerate(&self, f: FaceId) -> bool {
        let [a, b, c] = self.triangles[f.index()];
        a == b || b == c || a == c
    }

    /// Number of triangles with a repeated vertex.
    pub fn degenerate_triangle_count(&self) -> usize {
        self.face_ids().filter(|&f| self.is_degenerate(f)).count()
    }

    /// Triangle indices shifted to 1-based ids, for consumers that reserve 0
    /// as a null reference.
    pub fn one_based_triangles(&self) -> Vec<[u32; 3]> {
        self.triangles
            .iter()
            .map(|t| [t[0].raw() + 1, t[1].raw() + 1, t[2].raw() + 1])
            .collect()
    }

    /// Vertex buffer flattened to `x, y, z, x, y, z, ...`.
    pub fn flat_vertices(&self) -> Vec<f32> {
        self.vertices.iter().flat_map(|p| [p.x, p.y, p.z]).collect()
    }

    /// Axis-aligned bounding box, or `None` for an empty vertex buffer.
    pub fn bounding_box(&self) -> Option<(Point3<f32>, Point3<f32>)> {
        let first = *self.vertices.first()?;
        Some(self.vertices.iter().fold((first, first), |(lo, hi), p| {
            (lo.inf(p), hi.sup(p))
        }))
    }
}

/// Lexicographic `(x, y, z)` order using IEEE total ordering per component.
///
/// For non-NaN values `total_cmp` reports `Equal` exactly when the bit
/// patterns match, so equal runs in the sorted order are exactly the weld
/// groups.
#[inline]
fn compare_positions(a: &Point3<f32>, b: &Point3<f32>) -> Ordering {
    a.x.total_cmp(&b.x)
        .then_with(|| a.y.total_cmp(&b.y))
        .then_with(|| a.z.total_cmp(&b.z))
}

/// Bit-for-bit position equality. A NaN component never matches, not even
/// an identical NaN.
#[inline]
fn same_position(a: &Point3<f32>, b: &Point3<f32>) -> bool {
    [(a.x, b.x), (a.y, b.y), (a.z, b.z)]
        .iter()
        .all(|(p, q)| !p.is_nan() && p.to_bits() == q.to_bits())
}

/// Weld a facet list into an indexed mesh.
///
/// Every facet produces exactly one triangle, degenerate ones included; the
/// vertex buffer holds one entry per distinct corner position, ordered by
/// position. Among corners sharing a position the lowest flat corner index is
/// the group representative (the sort is stable).
///
/// # Example
///
/// ```
/// use stlweld::mesh::{build_indexed, BuildOptions, Facet};
/// use nalgebra::Point3;
///
/// let a = Point3::new(0.0, 0.0, 0.0);
/// let b = Point3::new(1.0, 0.0, 0.0);
/// let c = Point3::new(0.0, 1.0, 0.0);
/// let d = Point3::new(1.0, 1.0, 0.0);
/// let facets = [Facet::from_corners(a, b, c), Facet::from_corners(b, d, c)];
///
/// let mesh = build_indexed(&facets, &BuildOptions::default());
/// assert_eq!(mesh.num_vertices(), 4);
/// assert_eq!(mesh.num_triangles(), 2);
/// ```
pub fn build_indexed(facets: &[Facet], options: &BuildOptions) -> IndexedMesh {
    let corners: Vec<Point3<f32>> = facets.iter().flat_map(|f| f.vertices).collect();

    let mut order: Vec<usize> = (0..corners.len()).collect();
    let by_position = |a: &usize, b: &usize| compare_positions(&corners[*a], &corners[*b]);
    if options.parallel {
        order.par_sort_by(by_position);
    } else {
        order.sort_by(by_position);
    }

    let mut slot_of = vec![VertexId::new(0); corners.len()];
    let mut vertices: Vec<Point3<f32>> = Vec::new();
    let mut previous: Option<&Point3<f32>> = None;
    for &corner in &order {
        let p = &corners[corner];
        if !previous.is_some_and(|q| same_position(q, p)) {
            vertices.push(*p);
        }
        slot_of[corner] = VertexId::new(vertices.len() - 1);
        previous = Some(p);
    }

    let triangles: Vec<[VertexId; 3]> = slot_of
        .chunks_exact(3)
        .map(|c| [c[0], c[1], c[2]])
        .collect();

    log::debug!(
        "welded {} corners into {} vertices ({} triangles)",
        corners.len(),
        vertices.len(),
        triangles.len()
    );

    IndexedMesh {
        vertices,
        triangles,
    }
}
