// Copyright 2026 the Swarmspace Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Entity handles, entity sets, and the ray segment type.

use core::fmt::Debug;
use core::hash::Hash;

use glam::DVec3;

/// A non-owning handle to an entity living in an external registry.
///
/// The index never allocates, frees, or dereferences an entity; it only
/// stores and compares handles. Any small copyable id type qualifies. The
/// registry that owns the entities is responsible for calling
/// [`remove_entity`][crate::PositionalIndex::remove_entity] before an entity
/// is destroyed, so a handle held by the index can never dangle.
pub trait EntityRef: Copy + Eq + Hash + Debug {}

impl<T: Copy + Eq + Hash + Debug> EntityRef for T {}

/// Set of entity handles, as held per cell and returned by point lookups.
///
/// Duplicates are impossible by construction.
pub type EntitySet<E> = hashbrown::HashSet<E>;

/// A finite ray in 3D space, described by its start and end points.
///
/// Ray queries treat this as a segment: traversal runs from the cell
/// containing `start` to the cell containing `end` and no further.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Ray3 {
    /// Start point of the ray.
    pub start: DVec3,
    /// End point of the ray.
    pub end: DVec3,
}

impl Ray3 {
    /// Create a ray from its start and end points.
    #[inline]
    pub const fn new(start: DVec3, end: DVec3) -> Self {
        Self { start, end }
    }

    /// The (unnormalized) direction from start to end.
    #[inline]
    pub fn direction(&self) -> DVec3 {
        self.end - self.start
    }

    /// The length of the segment.
    #[inline]
    pub fn length(&self) -> f64 {
        self.direction().length()
    }
}
