//! Axis-aligned bounding box

use crate::core::types::Vec3;

/// Axis-aligned bounding box defined by min and max corners
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Aabb {
    /// Inverted box that any `expand` call replaces.
    pub const EMPTY: Aabb = Aabb {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    /// Create AABB from min and max corners
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Smallest box containing every point, or `EMPTY` for no points
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vec3>) -> Self {
        let mut aabb = Self::EMPTY;
        for p in points {
            aabb.expand(*p);
        }
        aabb
    }

    /// True until a point has been added
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Get center point
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get size (max - min)
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Expand AABB to include point
    pub fn expand(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Smallest box containing both. Empty boxes contribute nothing.
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_until_expanded() {
        let mut aabb = Aabb::EMPTY;
        assert!(aabb.is_empty());
        aabb.expand(Vec3::ONE);
        assert!(!aabb.is_empty());
        assert_eq!(aabb.size(), Vec3::ZERO);
    }

    #[test]
    fn test_from_points() {
        let points = [Vec3::new(1.0, 2.0, 3.0), Vec3::new(-1.0, 0.0, 5.0)];
        let aabb = Aabb::from_points(&points);
        assert_eq!(aabb.min, Vec3::new(-1.0, 0.0, 3.0));
        assert_eq!(aabb.max, Vec3::new(1.0, 2.0, 5.0));
        assert_eq!(aabb.center(), Vec3::new(0.0, 1.0, 4.0));
    }

    #[test]
    fn test_union_ignores_empty() {
        let a = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let b = Aabb::new(Vec3::splat(2.0), Vec3::splat(3.0));
        assert_eq!(a.union(&Aabb::EMPTY), a);
        assert_eq!(Aabb::EMPTY.union(&Aabb::EMPTY), Aabb::EMPTY);
        assert_eq!(a.union(&b), Aabb::new(Vec3::ZERO, Vec3::splat(3.0)));
    }
}
