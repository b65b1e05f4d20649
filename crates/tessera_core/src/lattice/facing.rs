//! Direction encodings between a cell and its faced neighbor.
//!
//! The 3-bit facing code is laid out so loops over facings are easy:
//!
//! ```text
//! 110 N   111 NE   101 E   100 SE
//! 000 S   001 SW   011 W   010 NW
//! ```
//!
//! Wrap-around is inferred from coordinates, so on a 2x2 torus left and
//! right (and up and down) cannot be told apart; the answer there is
//! deterministic but arbitrary.

/// Neighbor offsets in clockwise order starting north. Up is `y - 1`.
pub const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
];

pub const FACING_N: i32 = 0;
pub const FACING_NW: i32 = 1;
pub const FACING_SW: i32 = 2;
pub const FACING_W: i32 = 3;
pub const FACING_NE: i32 = 4;
pub const FACING_E: i32 = 5;
pub const FACING_S: i32 = 6;
pub const FACING_SE: i32 = 7;

fn axis(from: i32, to: i32) -> i32 {
    if to == from - 1 || to > from + 1 {
        -1
    } else if to == from + 1 || to < from - 1 {
        1
    } else {
        0
    }
}

/// Facing code from `from` towards `to`; `None` when they coincide.
#[must_use]
pub fn facing_code(from: (i32, i32), to: (i32, i32)) -> Option<i32> {
    let code = match (axis(from.0, to.0), axis(from.1, to.1)) {
        (0, -1) => FACING_N,
        (-1, -1) => FACING_NW,
        (-1, 0) => FACING_W,
        (-1, 1) => FACING_SW,
        (0, 1) => FACING_S,
        (1, 1) => FACING_SE,
        (1, 0) => FACING_E,
        (1, -1) => FACING_NE,
        _ => return None,
    };
    Some(code)
}

/// Clockwise direction index (0 = north) for a facing code.
#[must_use]
pub fn faced_dir(code: i32) -> i32 {
    match code {
        FACING_NW => 7,
        FACING_W => 6,
        FACING_SW => 5,
        FACING_S => 4,
        FACING_SE => 3,
        FACING_E => 2,
        FACING_NE => 1,
        _ => 0,
    }
}
