//! Index types for indexed-mesh buffers.
//!
//! Vertex, edge and face slots are addressed by distinct `u32` newtypes so a
//! triangle's vertex ids cannot be mixed up with its edge ids. All indices are
//! 0-based; see [`IndexedMesh::one_based_triangles`](super::IndexedMesh::one_based_triangles)
//! for consumers that reserve 0 as a null reference.

use std::fmt::{self, Debug};

/// Largest number of elements addressable by a 32-bit slot index.
pub const MAX_INDEX: usize = u32::MAX as usize;

/// A vertex-buffer slot.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct VertexId(u32);

/// An edge-buffer slot.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct EdgeId(u32);

/// A triangle (face) slot, equal to the facet's position in the file.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct FaceId(u32);

macro_rules! impl_index_type {
    ($name:ident, $display:literal) => {
        impl $name {
            /// Create a new index from a raw value.
            #[inline]
            pub fn new(index: usize) -> Self {
                debug_assert!(index <= MAX_INDEX, "index {} too large for u32", index);
                Self(index as u32)
            }

            /// Get the index as `usize`.
            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }

            /// Get the raw `u32` value.
            #[inline]
            pub fn raw(self) -> u32 {
                self.0
            }
        }

        impl Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", $display, self.0)
            }
        }

        impl From<u32> for $name {
            fn from(v: u32) -> Self {
                Self(v)
            }
        }

        impl From<$name> for u32 {
            fn from(id: $name) -> u32 {
                id.0
            }
        }
    };
}

impl_index_type!(VertexId, "V");
impl_index_type!(EdgeId, "E");
impl_index_type!(FaceId, "F");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_id() {
        let v = VertexId::new(42);
        assert_eq!(v.index(), 42);
        assert_eq!(v.raw(), 42u32);
        assert_eq!(u32::from(v), 42);
    }

    #[test]
    fn test_ordering_follows_raw_value() {
        assert!(VertexId::new(1) < VertexId::new(2));
        assert_eq!(EdgeId::from(5u32), EdgeId::new(5));
    }

    #[test]
    fn test_debug_format() {
        assert_eq!(format!("{:?}", VertexId::new(42)), "V(42)");
        assert_eq!(format!("{:?}", EdgeId::new(0)), "E(0)");
        assert_eq!(format!("{:?}", FaceId::new(9)), "F(9)");
    }
}
