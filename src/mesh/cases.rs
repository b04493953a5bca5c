//! Marching-squares case table.
//!
//! A marching cell spans four density samples. Each sample at or above the
//! iso level sets one bit of the 4-bit case code:
//!
//! ```text
//!   LF(8) ---F--- RF(4)        +z
//!     |             |           ^
//!     L             R           |
//!     |             |           +--> +x
//!   LN(1) ---N--- RN(2)
//! ```
//!
//! Every case maps to zero or more convex polygons over the eight
//! [`CellPoint`]s. Polygon points are listed in the winding that yields a
//! `+y` facing fan.

/// Corner bit: sample `(x, z)`.
pub const LEFT_NEAR: u8 = 1;
/// Corner bit: sample `(x + 1, z)`.
pub const RIGHT_NEAR: u8 = 2;
/// Corner bit: sample `(x + 1, z + 1)`.
pub const RIGHT_FAR: u8 = 4;
/// Corner bit: sample `(x, z + 1)`.
pub const LEFT_FAR: u8 = 8;

/// Code of a cell with every corner filled.
pub const FULL: u8 = 15;

/// Corner or edge-crossing point of a marching cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CellPoint {
    LeftNear,
    /// Crossing on the `LeftNear - LeftFar` edge.
    Left,
    LeftFar,
    /// Crossing on the `LeftFar - RightFar` edge.
    Far,
    RightFar,
    /// Crossing on the `RightNear - RightFar` edge.
    Right,
    RightNear,
    /// Crossing on the `LeftNear - RightNear` edge.
    Near,
}

impl CellPoint {
    /// All points in winding order.
    pub const RING: [CellPoint; 8] = [
        CellPoint::LeftNear,
        CellPoint::Left,
        CellPoint::LeftFar,
        CellPoint::Far,
        CellPoint::RightFar,
        CellPoint::Right,
        CellPoint::RightNear,
        CellPoint::Near,
    ];

    pub fn is_corner(self) -> bool {
        self.corner_bit().is_some()
    }

    /// Case-code bit of a corner, `None` for edge points.
    pub fn corner_bit(self) -> Option<u8> {
        match self {
            CellPoint::LeftNear => Some(LEFT_NEAR),
            CellPoint::RightNear => Some(RIGHT_NEAR),
            CellPoint::RightFar => Some(RIGHT_FAR),
            CellPoint::LeftFar => Some(LEFT_FAR),
            _ => None,
        }
    }

    /// Endpoints of an edge point, ordered towards `+x` / `+z`.
    pub fn edge_corners(self) -> Option<(CellPoint, CellPoint)> {
        match self {
            CellPoint::Near => Some((CellPoint::LeftNear, CellPoint::RightNear)),
            CellPoint::Far => Some((CellPoint::LeftFar, CellPoint::RightFar)),
            CellPoint::Left => Some((CellPoint::LeftNear, CellPoint::LeftFar)),
            CellPoint::Right => Some((CellPoint::RightNear, CellPoint::RightFar)),
            _ => None,
        }
    }

    /// Sample offset `(dx, dz)` of a corner from the cell origin.
    pub fn corner_offset(self) -> Option<(i32, i32)> {
        match self {
            CellPoint::LeftNear => Some((0, 0)),
            CellPoint::RightNear => Some((1, 0)),
            CellPoint::RightFar => Some((1, 1)),
            CellPoint::LeftFar => Some((0, 1)),
            _ => None,
        }
    }
}

type Polygons = &'static [&'static [CellPoint]];

const LN: CellPoint = CellPoint::LeftNear;
const L: CellPoint = CellPoint::Left;
const LF: CellPoint = CellPoint::LeftFar;
const F: CellPoint = CellPoint::Far;
const RF: CellPoint = CellPoint::RightFar;
const R: CellPoint = CellPoint::Right;
const RN: CellPoint = CellPoint::RightNear;
const N: CellPoint = CellPoint::Near;

/// Polygons per case code. Saddles (5 and 10) hold the split variant.
const CASES: [Polygons; 16] = [
    &[],
    &[&[LN, L, N]],
    &[&[R, RN, N]],
    &[&[LN, L, R, RN]],
    &[&[F, RF, R]],
    &[&[LN, L, N], &[F, RF, R]],
    &[&[F, RF, RN, N]],
    &[&[LN, L, F, RF, RN]],
    &[&[L, LF, F]],
    &[&[LN, LF, F, N]],
    &[&[L, LF, F], &[R, RN, N]],
    &[&[LN, LF, F, R, RN]],
    &[&[L, LF, RF, R]],
    &[&[LN, LF, RF, R, N]],
    &[&[L, LF, RF, RN, N]],
    &[&[LN, LF, RF, RN]],
];

/// Saddle 5 with the filled corners joined across the center.
const SADDLE_5_JOINED: Polygons = &[&[LN, L, F, RF, R, N]];
/// Saddle 10 with the filled corners joined across the center.
const SADDLE_10_JOINED: Polygons = &[&[L, LF, F, R, RN, N]];

/// Case code from the four corner samples.
pub fn case_code(left_near: f32, right_near: f32, right_far: f32, left_far: f32, iso: f32) -> u8 {
    let mut code = 0;
    if left_near >= iso {
        code |= LEFT_NEAR;
    }
    if right_near >= iso {
        code |= RIGHT_NEAR;
    }
    if right_far >= iso {
        code |= RIGHT_FAR;
    }
    if left_far >= iso {
        code |= LEFT_FAR;
    }
    code
}

pub fn is_saddle(code: u8) -> bool {
    code == 5 || code == 10
}

/// Polygons for a case. `joined` picks the connected variant of a saddle and
/// is ignored otherwise.
pub fn polygons(code: u8, joined: bool) -> Polygons {
    match (code & FULL, joined) {
        (5, true) => SADDLE_5_JOINED,
        (10, true) => SADDLE_10_JOINED,
        (c, _) => CASES[c as usize],
    }
}

/// Consecutive polygon points that both lie on cell edges: the outline
/// between filled and empty space. Interior is to the left walking `a -> b`
/// in the `+y` winding.
pub fn silhouette_edges(polygon: &[CellPoint]) -> impl Iterator<Item = (CellPoint, CellPoint)> + '_ {
    let n = polygon.len();
    (0..n)
        .map(move |i| (polygon[i], polygon[(i + 1) % n]))
        .filter(|(a, b)| !a.is_corner() && !b.is_corner())
}
