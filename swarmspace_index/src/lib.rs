// Copyright 2026 the Swarmspace Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Swarmspace Index: positional indexing for multi-robot simulation.
//!
//! A positional index answers "which entities are here?" in a simulated
//! arena: point lookups, box/sphere/circle/rectangle range queries, and
//! ordered ray traversals, all over entities whose positions change every
//! simulation tick.
//!
//! - Entities live in the simulation's own registry; the index stores only
//!   cheap copyable handles and a [`Placement`] callback that bins each
//!   handle into the cell(s) it occupies.
//! - Rebinning is wholesale: one [`update`][PositionalIndex::update] per
//!   tick re-places every tracked entity, and timestamped cells make stale
//!   placements invisible without any per-cell clearing (lazy
//!   invalidation).
//! - Backends are pluggable via the [`PositionalIndex`] trait: a bounded
//!   dense [`Grid`] for arenas with known extents, an unbounded
//!   [`SpaceHash`] for open worlds. Queries behave identically on both.
//!
//! Queries are *cell-granular*: they report entities whose cells overlap
//! the query region's bounding box. Callers needing exact geometric
//! containment post-filter the visits.
//!
//! # Example
//!
//! ```rust
//! use glam::DVec3;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use swarmspace_index::{Grid, Placement, PositionalIndex};
//!
//! // Robot positions live in the simulation's registry; the index only
//! // holds handles into it.
//! let positions: Rc<RefCell<Vec<DVec3>>> = Rc::new(RefCell::new(vec![
//!     DVec3::new(0.25, 0.25, 0.25),
//!     DVec3::new(0.75, 0.75, 0.25),
//! ]));
//!
//! let placement: Placement<usize> = {
//!     let positions = positions.clone();
//!     Box::new(move |robot, writer| {
//!         let cell = writer.position_to_cell(positions.borrow()[*robot]);
//!         writer.update_cell(cell, *robot)
//!     })
//! };
//!
//! // A 10x10x10 grid over the unit cube.
//! let mut index = Grid::new(DVec3::ZERO, DVec3::ONE, 10, 10, 10, placement)?;
//! index.add_entity(0);
//! index.add_entity(1);
//! index.update()?;
//!
//! // Who is near robot 0?
//! let mut neighbors = Vec::new();
//! index.for_entities_in_sphere_range(positions.borrow()[0], 0.2, |robot| {
//!     neighbors.push(*robot);
//!     true
//! });
//! assert_eq!(neighbors, vec![0]);
//! # Ok::<(), swarmspace_index::IndexError>(())
//! ```
//!
//! ## Choosing a backend
//!
//! - [`Grid`]: pre-allocates its whole cell array and addresses cells with
//!   a multiply and an add. Use it when the arena's extents are fixed and
//!   known; positions outside the covered volume are hard errors.
//! - [`SpaceHash`]: hashes cell coordinates into a fixed-size bucket table.
//!   Use it when entities roam without bounds; memory scales with occupied
//!   cells, not with world size, at the cost of hashing and chain walks.
//!
//! Everything is single-threaded; the simulation loop serializes updates
//! against queries.

mod error;
mod index;
mod mapper;
mod types;
pub(crate) mod util;

pub mod backends;

pub use backends::{Grid, GridCell, SpaceHash};
pub use error::IndexError;
pub use index::{CellWriter, Placement, PositionalIndex};
pub use mapper::CellMapper;
pub use types::{EntityRef, EntitySet, Ray3};
