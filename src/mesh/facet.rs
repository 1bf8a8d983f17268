//! Raw STL triangle records.

use nalgebra::{Point3, Vector3};

/// One triangle exactly as stored in an STL file.
///
/// The normal is carried through unchanged. It may be zero, unnormalized or
/// disagree with the winding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Facet {
    /// Facet normal as stored in the file.
    pub normal: Vector3<f32>,
    /// The three corner positions in file order.
    pub vertices: [Point3<f32>; 3],
}

impl Facet {
    /// Create a facet from a stored normal and three corners.
    pub fn new(normal: Vector3<f32>, vertices: [Point3<f32>; 3]) -> Self {
        Self { normal, vertices }
    }

    /// Create a facet whose normal is derived from the counter-clockwise
    /// winding of its corners.
    ///
    /// Degenerate corners produce a zero normal.
    pub fn from_corners(a: Point3<f32>, b: Point3<f32>, c: Point3<f32>) -> Self {
        let n = (b - a).cross(&(c - a));
        let normal = n.try_normalize(0.0).unwrap_or_else(Vector3::zeros);
        Self::new(normal, [a, b, c])
    }

    /// Whether two corners share an exact position.
    pub fn is_degenerate(&self) -> bool {
        let [a, b, c] = &self.vertices;
        a == b || b == c || a == c
    }

    /// Returns the facet normal recomputed from its corners.
    pub fn geometric_normal(&self) -> Vector3<f32> {
        let [a, b, c] = self.vertices;
        (b - a).cross(&(c - a))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_corners_normal() {
        let f = Facet::from_corners(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        );
        assert_eq!(f.normal, Vector3::new(0.0, 0.0, 1.0));
        assert!(!f.is_degenerate());
    }

    #[test]
    fn test_degenerate_has_zero_normal() {
        let p = Point3::new(1.0, 2.0, 3.0);
        let f = Facet::from_corners(p, p, Point3::new(0.0, 0.0, 0.0));
        assert!(f.is_degenerate());
        assert_eq!(f.normal, Vector3::zeros());
        assert_eq!(f.geometric_normal(), Vector3::zeros());
    }
}
