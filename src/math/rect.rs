//! Inclusive integer rectangle over grid cells

/// Inclusive `(x, z)` cell rectangle. Used to bound per-layer work.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellRect {
    pub min_x: i32,
    pub min_z: i32,
    pub max_x: i32,
    pub max_z: i32,
}

impl CellRect {
    /// Rectangle covering exactly one cell
    pub fn point(x: i32, z: i32) -> Self {
        Self { min_x: x, min_z: z, max_x: x, max_z: z }
    }

    /// Rectangle from inclusive corners
    pub fn new(min_x: i32, min_z: i32, max_x: i32, max_z: i32) -> Self {
        Self { min_x, min_z, max_x, max_z }
    }

    /// True when min exceeds max on either axis
    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_z > self.max_z
    }

    /// Grow to include a cell
    pub fn include(&mut self, x: i32, z: i32) {
        self.min_x = self.min_x.min(x);
        self.min_z = self.min_z.min(z);
        self.max_x = self.max_x.max(x);
        self.max_z = self.max_z.max(z);
    }

    /// Smallest rectangle containing both
    pub fn union(&self, other: &CellRect) -> CellRect {
        CellRect {
            min_x: self.min_x.min(other.min_x),
            min_z: self.min_z.min(other.min_z),
            max_x: self.max_x.max(other.max_x),
            max_z: self.max_z.max(other.max_z),
        }
    }

    /// Grow by `n` cells on every side
    pub fn inflate(&self, n: i32) -> CellRect {
        CellRect {
            min_x: self.min_x - n,
            min_z: self.min_z - n,
            max_x: self.max_x + n,
            max_z: self.max_z + n,
        }
    }

    /// Intersect with another rectangle; `None` when they do not overlap
    pub fn clamp_to(&self, bounds: &CellRect) -> Option<CellRect> {
        let clamped = CellRect {
            min_x: self.min_x.max(bounds.min_x),
            min_z: self.min_z.max(bounds.min_z),
            max_x: self.max_x.min(bounds.max_x),
            max_z: self.max_z.min(bounds.max_z),
        };
        (!clamped.is_empty()).then_some(clamped)
    }

    /// Check if a cell lies inside
    pub fn contains(&self, x: i32, z: i32) -> bool {
        x >= self.min_x && x <= self.max_x && z >= self.min_z && z <= self.max_z
    }

    /// Number of cells covered
    pub fn area(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            ((self.max_x - self.min_x + 1) * (self.max_z - self.min_z + 1)) as usize
        }
    }

    /// Iterate cells row by row (z outer, x inner)
    pub fn cells(&self) -> impl Iterator<Item = (i32, i32)> + use<> {
        let (min_x, max_x) = (self.min_x, self.max_x);
        (self.min_z..=self.max_z).flat_map(move |z| (min_x..=max_x).map(move |x| (x, z)))
    }
}
