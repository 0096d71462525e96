// Copyright 2026 the Swarmspace Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error taxonomy for the positional index.

use glam::IVec3;
use thiserror::Error;

/// Errors reported by index construction and per-call operations.
///
/// All failures are deterministic functions of caller input; nothing in this
/// crate is transient, retried, or logged-and-swallowed.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum IndexError {
    /// Rejected construction geometry: a non-positive cell size component,
    /// a zero grid dimension, or a zero hash table size.
    #[error("invalid index configuration: {reason}")]
    Configuration {
        /// Human-readable description of the rejected value.
        reason: String,
    },

    /// [`remove_entity`][crate::PositionalIndex::remove_entity] was called
    /// for an entity the index is not tracking.
    #[error("entity is not tracked by this index")]
    NotFound,

    /// A cell coordinate outside the dense grid's extents was used for
    /// direct cell access or placement.
    ///
    /// This is always an error, in every build profile; coordinates are
    /// never silently clamped.
    #[error("cell coordinate {coord} outside grid extents {extents}")]
    OutOfBounds {
        /// The offending cell coordinate.
        coord: IVec3,
        /// The grid's per-axis cell counts.
        extents: IVec3,
    },
}

impl IndexError {
    pub(crate) fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }
}
