// Copyright 2026 the Swarmspace Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Incremental voxel traversal shared by both backends.

use glam::{DVec3, IVec3};

/// Walk the cells a segment passes through, in order from start to end.
///
/// Positions must already be in the caller's mapping frame (the dense grid
/// passes minimum-corner-relative positions, the hashed index raw ones).
/// Visited coordinates follow the round-toward-zero convention of
/// [`CellMapper`][crate::CellMapper].
///
/// The walk itself runs in floor-convention space, where every cell is a
/// uniform box, and converts each cell on visit. The round-toward-zero
/// convention makes cell 0 twice as wide on each axis; the conversion visits
/// it once.
///
/// `visit` returns `false` to stop the traversal early.
pub(crate) fn for_cells_along_segment<F: FnMut(IVec3) -> bool>(
    inv_cell_size: DVec3,
    start: DVec3,
    end: DVec3,
    mut visit: F,
) {
    let s = (start * inv_cell_size).to_array();
    let e = (end * inv_cell_size).to_array();

    #[allow(
        clippy::cast_possible_truncation,
        reason = "Cell coordinates are intentionally i32; the float-to-int cast saturates."
    )]
    fn floor_cells(v: [f64; 3]) -> [i32; 3] {
        [
            v[0].floor() as i32,
            v[1].floor() as i32,
            v[2].floor() as i32,
        ]
    }

    let mut cur = floor_cells(s);
    let goal = floor_cells(e);

    // Per-axis step direction and parametric distances: `t_max` is the
    // distance (in units of segment length) to the next axis-aligned cell
    // boundary, `t_delta` the distance between consecutive boundaries.
    let mut step = [0_i32; 3];
    let mut t_max = [f64::INFINITY; 3];
    let mut t_delta = [f64::INFINITY; 3];
    for axis in 0..3 {
        let d = e[axis] - s[axis];
        if d > 0.0 {
            step[axis] = 1;
            t_max[axis] = (f64::from(cur[axis] + 1) - s[axis]) / d;
            t_delta[axis] = 1.0 / d;
        } else if d < 0.0 {
            step[axis] = -1;
            t_max[axis] = (s[axis] - f64::from(cur[axis])) / -d;
            t_delta[axis] = 1.0 / -d;
        }
    }

    let mut last: Option<IVec3> = None;
    loop {
        let cell = to_trunc_convention(cur);
        if last != Some(cell) {
            if !visit(cell) {
                return;
            }
            last = Some(cell);
        }
        if cur == goal {
            return;
        }

        let axis = min_axis(&t_max);
        cur[axis] += step[axis];
        t_max[axis] += t_delta[axis];

        // Floating-point drift can step past the goal cell without ever
        // matching it exactly; treat overshoot as arrival.
        if (step[axis] > 0 && cur[axis] > goal[axis])
            || (step[axis] < 0 && cur[axis] < goal[axis])
        {
            return;
        }
    }
}

/// Index of the smallest `t_max` component; ties favor the lowest axis.
fn min_axis(t_max: &[f64; 3]) -> usize {
    let mut axis = 0;
    if t_max[1] < t_max[axis] {
        axis = 1;
    }
    if t_max[2] < t_max[axis] {
        axis = 2;
    }
    axis
}

/// Convert a floor-convention cell coordinate to the round-toward-zero one.
fn to_trunc_convention(floor_cell: [i32; 3]) -> IVec3 {
    #[inline]
    fn axis(f: i32) -> i32 {
        if f < 0 { f + 1 } else { f }
    }
    IVec3::new(axis(floor_cell[0]), axis(floor_cell[1]), axis(floor_cell[2]))
}
