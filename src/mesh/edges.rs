//! Undirected edge extraction and triangle-to-edge adjacency.
//!
//! Each triangle contributes three edge occurrences `(v0,v1)`, `(v1,v2)`,
//! `(v2,v0)`. Occurrences are canonicalized (smaller vertex first), packed
//! into a `u64` key and sorted; equal keys form one edge. Edge slots are then
//! handed out in the order their first occurrence appears when walking the
//! triangles front to back, which makes the edge buffer reproducible for a
//! given triangle list.

use rayon::prelude::*;

use super::builder::BuildOptions;
use super::index::{EdgeId, FaceId, VertexId};
use crate::error::{MeshError, Result};

/// Maximum number of triangle indices (3 per triangle) accepted by
/// [`extract_edges`].
pub const MAX_EDGE_OCCURRENCES: usize = 0x7FFF_FFFF;

/// Deduplicated edges plus the three edges bounding every triangle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeTopology {
    /// Unique edges as `[low, high]` vertex pairs, in discovery order.
    pub edges: Vec<[VertexId; 2]>,
    /// Per triangle, the edges `(v0,v1)`, `(v1,v2)`, `(v2,v0)` in that order.
    pub triangle_edges: Vec<[EdgeId; 3]>,
}

impl EdgeTopology {
    /// Number of unique edges.
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// The two endpoints of an edge, smaller index first.
    #[inline]
    pub fn edge_vertices(&self, e: EdgeId) -> [VertexId; 2] {
        self.edges[e.index()]
    }

    /// The three edges of a triangle.
    #[inline]
    pub fn face_edges(&self, f: FaceId) -> [EdgeId; 3] {
        self.triangle_edges[f.index()]
    }

    /// How many triangles reference each edge.
    pub fn edge_face_counts(&self) -> Vec<u32> {
        let mut counts = vec![0u32; self.edges.len()];
        for tri in &self.triangle_edges {
            for e in tri {
                counts[e.index()] += 1;
            }
        }
        counts
    }

    /// Number of edges used by exactly one triangle.
    pub fn boundary_edge_count(&self) -> usize {
        self.edge_face_counts().iter().filter(|&&c| c == 1).count()
    }

    /// Number of edges used by more than two triangles.
    pub fn non_manifold_edge_count(&self) -> usize {
        self.edge_face_counts().iter().filter(|&&c| c > 2).count()
    }

    /// Whether every edge is shared by exactly two triangles.
    pub fn is_closed(&self) -> bool {
        !self.edges.is_empty() && self.edge_face_counts().iter().all(|&c| c == 2)
    }
}

/// Where an occurrence currently points during slot resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Link {
    /// Points at the representative occurrence of its group.
    Unresolved(u32),
    /// Final edge-buffer slot.
    Resolved(u32),
}

#[inline]
fn edge_key(a: VertexId, b: VertexId) -> u64 {
    let (lo, hi) = if a < b { (a, b) } else { (b, a) };
    (u64::from(lo.raw()) << 32) | u64::from(hi.raw())
}

#[inline]
fn unpack_key(key: u64) -> [VertexId; 2] {
    [
        VertexId::from((key >> 32) as u32),
        VertexId::from((key & 0xFFFF_FFFF) as u32),
    ]
}

/// Reject edge-occurrence counts that do not fit the `u32` occurrence indices.
fn check_occurrences(count: usize) -> Result<()> {
    if count > MAX_EDGE_OCCURRENCES {
        return Err(MeshError::OversizedInput {
            indices: count,
            limit: MAX_EDGE_OCCURRENCES,
        });
    }
    Ok(())
}

/// Extract the unique undirected edges of a triangle list.
///
/// # Errors
///
/// - [`MeshError::OversizedInput`] if `3 * triangles.len()` exceeds
///   [`MAX_EDGE_OCCURRENCES`].
/// - [`MeshError::DegenerateFace`] if a triangle repeats a vertex index.
///
/// # Example
///
/// ```
/// use stlweld::mesh::{extract_edges, BuildOptions, VertexId};
///
/// let v = |i| VertexId::new(i);
/// let triangles = [[v(0), v(1), v(2)], [v(0), v(2), v(3)]];
///
/// let topo = extract_edges(&triangles, &BuildOptions::default()).unwrap();
/// assert_eq!(topo.num_edges(), 5);
/// assert_eq!(topo.boundary_edge_count(), 4);
/// ```
pub fn extract_edges(triangles: &[[VertexId; 3]], options: &BuildOptions) -> Result<EdgeTopology> {
    let occurrences = triangles.len().saturating_mul(3);
    check_occurrences(occurrences)?;

    let mut keys: Vec<u64> = Vec::with_capacity(occurrences);
    for (face, &[v0, v1, v2]) in triangles.iter().enumerate() {
        if v0 == v1 || v1 == v2 || v0 == v2 {
            return Err(MeshError::DegenerateFace { face });
        }
        keys.push(edge_key(v0, v1));
        keys.push(edge_key(v1, v2));
        keys.push(edge_key(v2, v0));
    }

    // Stable sort: the first occurrence of each key is its representative.
    let mut order: Vec<u32> = (0..occurrences as u32).collect();
    if options.parallel {
        order.par_sort_by_key(|&i| keys[i as usize]);
    } else {
        order.sort_by_key(|&i| keys[i as usize]);
    }

    let mut links = vec![Link::Unresolved(0); occurrences];
    let mut previous: Option<u64> = None;
    let mut representative = 0u32;
    for &occ in &order {
        let key = keys[occ as usize];
        if previous != Some(key) {
            representative = occ;
            previous = Some(key);
        }
        links[occ as usize] = Link::Unresolved(representative);
    }
    drop(order);

    let mut edges: Vec<[VertexId; 2]> = Vec::new();
    let mut slots: Vec<EdgeId> = Vec::with_capacity(occurrences);
    for occ in 0..occurrences {
        let slot = match links[occ] {
            Link::Resolved(slot) => slot,
            Link::Unresolved(rep) => match links[rep as usize] {
                Link::Resolved(slot) => slot,
                Link::Unresolved(_) => {
                    let slot = edges.len() as u32;
                    edges.push(unpack_key(keys[rep as usize]));
                    links[rep as usize] = Link::Resolved(slot);
                    slot
                }
            },
        };
        links[occ] = Link::Resolved(slot);
        slots.push(EdgeId::from(slot));
    }

    let triangle_edges: Vec<[EdgeId; 3]> = slots
        .chunks_exact(3)
        .map(|c| [c[0], c[1], c[2]])
        .collect();

    log::debug!(
        "extracted {} unique edges from {} triangles",
        edges.len(),
        triangle_edges.len()
    );

    Ok(EdgeTopology {
        edges,
        triangle_edges,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tri(a: usize, b: usize, c: usize) -> [VertexId; 3] {
        [VertexId::new(a), VertexId::new(b), VertexId::new(c)]
    }

    fn tetrahedron() -> Vec<[VertexId; 3]> {
        vec![tri(0, 2, 1), tri(0, 1, 3), tri(1, 2, 3), tri(2, 0, 3)]
    }

    #[test]
    fn test_empty() {
        let topo = extract_edges(&[], &BuildOptions::default()).unwrap();
        assert_eq!(topo.num_edges(), 0);
        assert!(topo.triangle_edges.is_empty());
        assert!(!topo.is_closed());
    }

    #[test]
    fn test_single_triangle() {
        let topo = extract_edges(&[tri(4, 1, 7)], &BuildOptions::default()).unwrap();
        assert_eq!(topo.num_edges(), 3);
        assert_eq!(topo.edge_vertices(EdgeId::new(0)), [VertexId::new(1), VertexId::new(4)]);
        assert_eq!(topo.edge_vertices(EdgeId::new(1)), [VertexId::new(1), VertexId::new(7)]);
        assert_eq!(topo.edge_vertices(EdgeId::new(2)), [VertexId::new(4), VertexId::new(7)]);
        assert_eq!(
            topo.face_edges(FaceId::new(0)),
            [EdgeId::new(0), EdgeId::new(1), EdgeId::new(2)]
        );
        assert_eq!(topo.boundary_edge_count(), 3);
    }

    #[test]
    fn test_tetrahedron_is_closed() {
        let topo = extract_edges(&tetrahedron(), &BuildOptions::default()).unwrap();
        assert_eq!(topo.num_edges(), 6);
        assert!(topo.edge_face_counts().iter().all(|&c| c == 2));
        assert!(topo.is_closed());
        assert_eq!(topo.boundary_edge_count(), 0);
        assert_eq!(topo.non_manifold_edge_count(), 0);
    }

    #[test]
    fn test_slots_follow_discovery_order() {
        let topo = extract_edges(&tetrahedron(), &BuildOptions::default()).unwrap();
        let v = VertexId::new;
        // Triangle 0 = (0,2,1) introduces {0,2}, {1,2}, {0,1} in that order.
        assert_eq!(topo.edges[0], [v(0), v(2)]);
        assert_eq!(topo.edges[1], [v(1), v(2)]);
        assert_eq!(topo.edges[2], [v(0), v(1)]);
        // Triangle 1 = (0,1,3) reuses {0,1} then adds {1,3}, {0,3}.
        assert_eq!(
            topo.triangle_edges[1],
            [EdgeId::new(2), EdgeId::new(3), EdgeId::new(4)]
        );
        assert_eq!(topo.edges[5], [v(2), v(3)]);
    }

    #[test]
    fn test_adjacency_matches_triangle_corners() {
        let triangles = tetrahedron();
        let topo = extract_edges(&triangles, &BuildOptions::default()).unwrap();
        for (t, edges) in triangles.iter().zip(&topo.triangle_edges) {
            for corner in 0..3 {
                let a = t[corner];
                let b = t[(corner + 1) % 3];
                let expected = if a < b { [a, b] } else { [b, a] };
                assert_eq!(topo.edge_vertices(edges[corner]), expected);
            }
        }
    }

    #[test]
    fn test_large_vertex_ids_survive_packing() {
        let big = u32::MAX as usize;
        let topo = extract_edges(&[tri(big, 0, big - 1)], &BuildOptions::default()).unwrap();
        assert_eq!(
            topo.edges[0],
            [VertexId::new(0), VertexId::new(big)]
        );
        assert_eq!(
            topo.edges[2],
            [VertexId::new(big - 1), VertexId::new(big)]
        );
    }

    #[test]
    fn test_occurrence_budget() {
        assert!(check_occurrences(0).is_ok());
        assert!(check_occurrences(MAX_EDGE_OCCURRENCES).is_ok());

        let err = check_occurrences(MAX_EDGE_OCCURRENCES + 1).unwrap_err();
        assert!(matches!(
            err,
            MeshError::OversizedInput {
                indices,
                limit: MAX_EDGE_OCCURRENCES,
            } if indices == MAX_EDGE_OCCURRENCES + 1
        ));
        assert!(err.is_topology_only());
    }

    #[test]
    fn test_degenerate_face_rejected() {
        let err = extract_edges(&[tri(0, 1, 2), tri(3, 3, 4)], &BuildOptions::default())
            .unwrap_err();
        assert!(matches!(err, MeshError::DegenerateFace { face: 1 }));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let mut triangles = Vec::new();
        let n = 20;
        for j in 0..n {
            for i in 0..n {
                let v00 = j * (n + 1) + i;
                let v10 = v00 + 1;
                let v01 = v00 + n + 1;
                let v11 = v01 + 1;
                triangles.push(tri(v00, v10, v11));
                triangles.push(tri(v00, v11, v01));
            }
        }

        let seq = extract_edges(&triangles, &BuildOptions::default().sequential()).unwrap();
        let par = extract_edges(&triangles, &BuildOptions::default()).unwrap();
        assert_eq!(seq, par);
        // Grid: n*(n+1) horizontal + n*(n+1) vertical + n*n diagonals.
        assert_eq!(seq.num_edges(), 2 * n * (n + 1) + n * n);
    }
}
