// Copyright 2026 the Swarmspace Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The unified index interface and the placement-injection contract.

use glam::{DVec2, DVec3};

use crate::error::IndexError;
use crate::types::{EntityRef, EntitySet, Ray3};

/// The write surface handed to a [`Placement`] callback during
/// [`update`][PositionalIndex::update].
///
/// A placement callback computes the cell coordinate(s) an entity occupies
/// and reports each one with [`update_cell`][Self::update_cell]. Point
/// entities call it once; entities with spatial extent call it once per
/// covered cell. The coordinate mapping is exposed here rather than done by
/// the index so the index stays agnostic of entity shape.
pub trait CellWriter<E: EntityRef> {
    /// Map a world position to a cell coordinate in this backend's frame.
    ///
    /// The dense grid maps relative to its minimum corner; the hashed index
    /// maps relative to the origin.
    fn position_to_cell(&self, position: DVec3) -> glam::IVec3;

    /// Record that `entity` occupies the cell at `coord` this tick.
    ///
    /// # Errors
    ///
    /// [`IndexError::OutOfBounds`] from the dense grid when `coord` lies
    /// outside its extents; the hashed index never fails.
    fn update_cell(&mut self, coord: glam::IVec3, entity: E) -> Result<(), IndexError>;
}

/// Per-entity placement callback invoked by [`update`][PositionalIndex::update].
///
/// The callback owns all position knowledge: typically it captures a handle
/// to the entity registry, looks the entity up, and bins it. Errors abort the
/// running update and propagate to its caller.
pub type Placement<E> = Box<dyn FnMut(&E, &mut dyn CellWriter<E>) -> Result<(), IndexError>>;

/// A positional index over entities living in an external registry.
///
/// Both backends — the bounded dense [`Grid`][crate::Grid] and the unbounded
/// [`SpaceHash`][crate::SpaceHash] — implement this trait with identical
/// semantics, so sensors, broad-phase checks, and cameras can be generic
/// over the backend.
///
/// # Query semantics
///
/// Every query is *cell-granular*: an entity is reported when it occupies a
/// cell overlapping the query region's bounding box, not when it is proven
/// to lie inside the exact sphere/circle geometry. Callers needing exact
/// containment post-filter the visits.
///
/// Query operations are plain closures `FnMut(&E) -> bool`; returning
/// `false` stops the traversal early. Within a single range or ray query an
/// entity spanning several visited cells is reported once.
///
/// # Tick protocol
///
/// The simulation loop calls [`update`][Self::update] exactly once per tick,
/// before any query runs that tick. A cell written on an earlier tick is
/// logically empty until rewritten, so stale placements are never visible
/// (lazy invalidation). Everything here is single-threaded; the caller
/// serializes mutation against queries.
pub trait PositionalIndex<E: EntityRef> {
    /// Start tracking an entity. Adding an already-tracked entity is a
    /// no-op; the master set holds each handle once.
    fn add_entity(&mut self, entity: E);

    /// Stop tracking an entity.
    ///
    /// # Errors
    ///
    /// [`IndexError::NotFound`] if the entity is not currently tracked.
    fn remove_entity(&mut self, entity: E) -> Result<(), IndexError>;

    /// Advance the tick counter and re-bin every tracked entity through the
    /// injected placement callback.
    ///
    /// # Errors
    ///
    /// Whatever the placement callback reports, typically
    /// [`IndexError::OutOfBounds`] from the dense grid.
    fn update(&mut self) -> Result<(), IndexError>;

    /// Return the index to its just-constructed state without forgetting
    /// tracked entities, then run one [`update`][Self::update].
    ///
    /// # Errors
    ///
    /// As [`update`][Self::update].
    fn reset(&mut self) -> Result<(), IndexError>;

    /// Collect the entities in the cell containing `position` into `out`.
    ///
    /// `out` is cleared first and then receives the cell's set verbatim —
    /// no extent test against the entities themselves.
    ///
    /// # Errors
    ///
    /// [`IndexError::OutOfBounds`] from the dense grid when the position
    /// lies outside the covered volume.
    fn entities_at(&self, position: DVec3, out: &mut EntitySet<E>) -> Result<(), IndexError>;

    /// Number of entities currently tracked.
    fn tracked_len(&self) -> usize;

    /// Visit every tracked entity, stopping early when `op` returns `false`.
    fn for_all_entities<F: FnMut(&E) -> bool>(&self, op: F);

    /// Visit entities in cells overlapping the axis-aligned box centered at
    /// `center` with the given half-size.
    fn for_entities_in_box_range<F: FnMut(&E) -> bool>(
        &self,
        center: DVec3,
        half_size: DVec3,
        op: F,
    );

    /// Visit entities in cells overlapping the bounding box of the sphere
    /// centered at `center` with the given radius.
    fn for_entities_in_sphere_range<F: FnMut(&E) -> bool>(
        &self,
        center: DVec3,
        radius: f64,
        op: F,
    );

    /// Visit entities in cells overlapping the circle parallel to the XY
    /// plane at `center.z`, covering a single cell layer on the z axis.
    fn for_entities_in_circle_range<F: FnMut(&E) -> bool>(
        &self,
        center: DVec3,
        radius: f64,
        op: F,
    );

    /// Visit entities in cells overlapping the axis-aligned rectangle
    /// parallel to the XY plane at `center.z`, covering a single cell layer
    /// on the z axis.
    fn for_entities_in_rectangle_range<F: FnMut(&E) -> bool>(
        &self,
        center: DVec3,
        half_size: DVec2,
        op: F,
    );

    /// Visit entities in the cells the ray passes through, in order from
    /// start to end.
    ///
    /// With `stop_at_closest_match`, traversal ends at the first cell
    /// holding any up-to-date entity, after visiting that whole cell; the
    /// cell may hold several equally-close matches and all of them are
    /// visited.
    fn for_entities_along_ray<F: FnMut(&E) -> bool>(
        &self,
        ray: &Ray3,
        op: F,
        stop_at_closest_match: bool,
    );
}
