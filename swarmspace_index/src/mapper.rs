// Copyright 2026 the Swarmspace Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! World-space to cell-coordinate conversion.

use glam::{DVec3, IVec3};

use crate::error::IndexError;

/// Converts world-space positions to integer cell coordinates and back.
///
/// The mapper owns the per-axis cell size and its precomputed inverse. The
/// position it receives is already expressed in the backend's reference
/// frame: the dense grid feeds positions relative to its minimum corner, the
/// hashed index feeds raw world positions (origin-relative).
///
/// The forward mapping divides by the cell size and rounds toward zero.
/// Range queries size their cell-coordinate search windows with this exact
/// convention, so it must not drift; `position_to_cell` is the single place
/// it is implemented.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CellMapper {
    cell_size: DVec3,
    inv_cell_size: DVec3,
}

impl CellMapper {
    /// Create a mapper with the given per-axis cell size.
    ///
    /// # Errors
    ///
    /// [`IndexError::Configuration`] if any component is not strictly
    /// positive.
    pub fn new(cell_size: DVec3) -> Result<Self, IndexError> {
        if !(cell_size.x > 0.0 && cell_size.y > 0.0 && cell_size.z > 0.0) {
            return Err(IndexError::configuration(format!(
                "cell size {cell_size} must be strictly positive on every axis"
            )));
        }
        Ok(Self {
            cell_size,
            inv_cell_size: DVec3::ONE / cell_size,
        })
    }

    /// The per-axis cell size.
    #[inline]
    pub fn cell_size(&self) -> DVec3 {
        self.cell_size
    }

    /// The per-axis inverse cell size.
    #[inline]
    pub fn inv_cell_size(&self) -> DVec3 {
        self.inv_cell_size
    }

    /// Map a position to the coordinate of the cell containing it.
    ///
    /// Each axis is divided by the cell size and rounded toward zero; values
    /// out of `i32` range are saturated.
    #[allow(
        clippy::cast_possible_truncation,
        reason = "Cell coordinates are intentionally i32; the float-to-int cast saturates."
    )]
    #[inline]
    pub fn position_to_cell(&self, position: DVec3) -> IVec3 {
        let scaled = position * self.inv_cell_size;
        IVec3::new(
            scaled.x.trunc() as i32,
            scaled.y.trunc() as i32,
            scaled.z.trunc() as i32,
        )
    }

    /// Map a cell coordinate back to its reference corner in world space.
    #[inline]
    pub fn cell_to_position(&self, coord: IVec3) -> DVec3 {
        coord.as_dvec3() * self.cell_size
    }
}
