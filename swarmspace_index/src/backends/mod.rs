// Copyright 2026 the Swarmspace Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backend implementations for different spatial strategies.
//!
//! - `grid`: bounded dense grid; a pre-allocated cell array over a fixed
//!   volume, constant-time cell addressing, out-of-bounds positions are
//!   errors.
//! - `space_hash`: unbounded hashed sparse grid; cell coordinates hash into
//!   a fixed-size bucket table, any position is valid, colliding cells share
//!   a bucket and are told apart by exact coordinate.
//!
//! Both implement [`PositionalIndex`][crate::PositionalIndex] with identical
//! query semantics; pick by whether the arena has known bounds.

pub(crate) mod grid;
pub(crate) mod space_hash;

pub use grid::{Grid, GridCell};
pub use space_hash::SpaceHash;
