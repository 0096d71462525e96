// Copyright 2026 the Swarmspace Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Unbounded hashed sparse grid backend.
//!
//! Cell coordinates from the whole `i32³` space are hashed into a fixed-size
//! bucket table, so entities can roam anywhere without the index knowing any
//! bounds up front. Distinct cells may share a bucket; every per-cell
//! operation disambiguates by comparing exact coordinates.

use core::fmt::{Debug, Write};

use glam::{DVec2, DVec3, IVec3};
use log::{debug, trace};

use crate::error::IndexError;
use crate::index::{CellWriter, Placement, PositionalIndex};
use crate::mapper::CellMapper;
use crate::types::{EntityRef, EntitySet, Ray3};
use crate::util::for_cells_along_segment;

/// Sentinel for "no entry" in bucket chains and the free list.
const NIL: u32 = u32::MAX;

/// One entity binned into one exact cell, linked into its bucket's chain.
struct Entry<E> {
    entity: E,
    coord: IVec3,
    next: u32,
}

/// A bucket: chain head plus the tick at which it was last written.
///
/// Like the dense grid's cells, a bucket older than the current tick is
/// logically empty; its chain is recycled when the bucket is next written.
struct Bucket {
    head: u32,
    timestamp: u64,
}

impl Default for Bucket {
    fn default() -> Self {
        Self {
            head: NIL,
            timestamp: 0,
        }
    }
}

/// The bucket table plus the entry arena; the placement callback's write
/// surface during [`update`][PositionalIndex::update].
///
/// Entries live in one growable arena and are reused through a free list,
/// so steady-state updates allocate nothing.
struct BucketTable<E> {
    buckets: Vec<Bucket>,
    entries: Vec<Entry<E>>,
    free: Vec<u32>,
    cur_tick: u64,
}

impl<E: EntityRef> BucketTable<E> {
    /// Bucket index for a cell coordinate.
    ///
    /// The classic three-prime spatial hash: coordinates reinterpreted as
    /// two's-complement `u32`, multiplied with wraparound, XOR-combined,
    /// reduced modulo the table size.
    fn bucket_of(&self, coord: IVec3) -> usize {
        #[allow(
            clippy::cast_sign_loss,
            reason = "Two's-complement reinterpretation is the hash's input convention."
        )]
        let hash = 73_856_093_u32
            .wrapping_mul(coord.x as u32)
            ^ 19_349_663_u32.wrapping_mul(coord.y as u32)
            ^ 83_492_791_u32.wrapping_mul(coord.z as u32);
        hash as usize % self.buckets.len()
    }

    fn alloc(&mut self, entity: E, coord: IVec3, next: u32) -> u32 {
        let entry = Entry {
            entity,
            coord,
            next,
        };
        if let Some(idx) = self.free.pop() {
            self.entries[idx as usize] = entry;
            idx
        } else {
            self.entries.push(entry);
            u32::try_from(self.entries.len() - 1).expect("entry arena outgrew u32 handles")
        }
    }

    /// Push a whole chain onto the free list.
    fn recycle_chain(&mut self, head: u32) {
        let mut idx = head;
        while idx != NIL {
            let next = self.entries[idx as usize].next;
            self.free.push(idx);
            idx = next;
        }
    }

    fn update_cell(&mut self, coord: IVec3, entity: E) {
        let b = self.bucket_of(coord);
        if self.buckets[b].timestamp < self.cur_tick {
            let head = self.buckets[b].head;
            self.recycle_chain(head);
            self.buckets[b].head = NIL;
            self.buckets[b].timestamp = self.cur_tick;
        }
        // Suppress duplicates: a placement callback may legitimately report
        // the same (cell, entity) pair more than once per tick.
        let mut idx = self.buckets[b].head;
        while idx != NIL {
            let entry = &self.entries[idx as usize];
            if entry.coord == coord && entry.entity == entity {
                return;
            }
            idx = entry.next;
        }
        let head = self.buckets[b].head;
        let new_head = self.alloc(entity, coord, head);
        self.buckets[b].head = new_head;
    }

    /// Iterate the up-to-date entries binned into exactly `coord`.
    fn entries_at(&self, coord: IVec3, mut each: impl FnMut(&E) -> bool) -> bool {
        let bucket = &self.buckets[self.bucket_of(coord)];
        if bucket.timestamp < self.cur_tick {
            return true;
        }
        let mut idx = bucket.head;
        while idx != NIL {
            let entry = &self.entries[idx as usize];
            if entry.coord == coord && !each(&entry.entity) {
                return false;
            }
            idx = entry.next;
        }
        true
    }
}

/// Write surface handed to the placement callback while the table updates.
struct HashWriter<'a, E> {
    mapper: &'a CellMapper,
    table: &'a mut BucketTable<E>,
}

impl<E: EntityRef> CellWriter<E> for HashWriter<'_, E> {
    #[inline]
    fn position_to_cell(&self, position: DVec3) -> IVec3 {
        self.mapper.position_to_cell(position)
    }

    #[inline]
    fn update_cell(&mut self, coord: IVec3, entity: E) -> Result<(), IndexError> {
        self.table.update_cell(coord, entity);
        Ok(())
    }
}

/// Unbounded hashed sparse grid index.
///
/// Constructed with a cell size and a bucket table size; positions map
/// relative to the world origin and are never bounds-checked. The table
/// size is fixed for the index's lifetime — occupancy beyond roughly the
/// bucket count degrades to longer chains, not to failure.
pub struct SpaceHash<E: EntityRef> {
    mapper: CellMapper,
    table: BucketTable<E>,
    entities: EntitySet<E>,
    placement: Placement<E>,
}

impl<E: EntityRef> Debug for SpaceHash<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SpaceHash")
            .field("cell_size", &self.mapper.cell_size())
            .field("table_size", &self.table.buckets.len())
            .field("entries", &self.table.entries.len())
            .field("tracked", &self.entities.len())
            .field("cur_tick", &self.table.cur_tick)
            .finish_non_exhaustive()
    }
}

impl<E: EntityRef> SpaceHash<E> {
    /// Create a hashed index with the given cell size, bucket count, and
    /// placement callback.
    ///
    /// # Errors
    ///
    /// [`IndexError::Configuration`] when `table_size` is zero or any cell
    /// size component is not strictly positive.
    pub fn new(
        cell_size: DVec3,
        table_size: usize,
        placement: Placement<E>,
    ) -> Result<Self, IndexError> {
        if table_size == 0 {
            return Err(IndexError::configuration(
                "hash table size must be strictly positive",
            ));
        }
        let mapper = CellMapper::new(cell_size)?;
        let mut buckets = Vec::new();
        buckets.resize_with(table_size, Bucket::default);
        debug!("space hash index: {table_size} buckets, cells of {cell_size}");
        Ok(Self {
            mapper,
            table: BucketTable {
                buckets,
                entries: Vec::new(),
                free: Vec::new(),
                cur_tick: 0,
            },
            entities: EntitySet::default(),
            placement,
        })
    }

    /// Number of buckets in the table.
    #[inline]
    pub fn table_size(&self) -> usize {
        self.table.buckets.len()
    }

    /// The coordinate mapper (positions relative to the origin).
    #[inline]
    pub fn mapper(&self) -> &CellMapper {
        &self.mapper
    }

    /// The current tick, as advanced by [`update`][PositionalIndex::update].
    #[inline]
    pub fn current_tick(&self) -> u64 {
        self.table.cur_tick
    }

    /// Insert into `out` every up-to-date entity binned into exactly
    /// `coord`; returns whether anything was inserted.
    ///
    /// Bucket sharing is invisible here: an entity in a different cell that
    /// happens to hash to the same bucket is skipped by the exact-coordinate
    /// comparison. `out` is not cleared, so callers can accumulate over
    /// several cells.
    pub fn check_cell(&self, coord: IVec3, out: &mut EntitySet<E>) -> bool {
        let mut any = false;
        self.table.entries_at(coord, |entity| {
            any |= out.insert(*entity);
            true
        });
        any
    }

    /// Write a human-readable listing of every live bucket chain.
    ///
    /// # Errors
    ///
    /// Propagates formatting errors from the sink.
    pub fn dump<W: Write>(&self, out: &mut W) -> core::fmt::Result {
        writeln!(
            out,
            "space hash: {} buckets, tick {}",
            self.table.buckets.len(),
            self.table.cur_tick
        )?;
        for (b, bucket) in self.table.buckets.iter().enumerate() {
            if bucket.timestamp < self.table.cur_tick || bucket.head == NIL {
                continue;
            }
            write!(out, "  bucket {b}:")?;
            let mut idx = bucket.head;
            while idx != NIL {
                let entry = &self.table.entries[idx as usize];
                write!(out, " {:?}@{}", entry.entity, entry.coord)?;
                idx = entry.next;
            }
            writeln!(out)?;
        }
        Ok(())
    }

    /// Visit the up-to-date entities of one cell, deduplicated per query.
    fn visit_cell<F: FnMut(&E) -> bool>(
        &self,
        coord: IVec3,
        seen: &mut EntitySet<E>,
        op: &mut F,
    ) -> bool {
        self.table
            .entries_at(coord, |entity| !seen.insert(*entity) || op(entity))
    }

    /// Visit every cell in the inclusive coordinate range `[lo, hi]`.
    fn visit_cell_range<F: FnMut(&E) -> bool>(&self, lo: IVec3, hi: IVec3, op: &mut F) {
        let mut seen = EntitySet::default();
        for k in lo.z..=hi.z {
            for j in lo.y..=hi.y {
                for i in lo.x..=hi.x {
                    if !self.visit_cell(IVec3::new(i, j, k), &mut seen, op) {
                        return;
                    }
                }
            }
        }
    }
}

impl<E: EntityRef> PositionalIndex<E> for SpaceHash<E> {
    fn add_entity(&mut self, entity: E) {
        self.entities.insert(entity);
    }

    fn remove_entity(&mut self, entity: E) -> Result<(), IndexError> {
        if self.entities.remove(&entity) {
            Ok(())
        } else {
            Err(IndexError::NotFound)
        }
    }

    fn update(&mut self) -> Result<(), IndexError> {
        self.table.cur_tick += 1;
        trace!(
            "space hash update: tick {}, re-binning {} entities",
            self.table.cur_tick,
            self.entities.len()
        );
        let mut writer = HashWriter {
            mapper: &self.mapper,
            table: &mut self.table,
        };
        for entity in &self.entities {
            (self.placement)(entity, &mut writer)?;
        }
        Ok(())
    }

    fn reset(&mut self) -> Result<(), IndexError> {
        self.table.cur_tick = 0;
        self.table.entries.clear();
        self.table.free.clear();
        for bucket in &mut self.table.buckets {
            *bucket = Bucket::default();
        }
        self.update()
    }

    fn entities_at(&self, position: DVec3, out: &mut EntitySet<E>) -> Result<(), IndexError> {
        out.clear();
        let coord = self.mapper.position_to_cell(position);
        self.table.entries_at(coord, |entity| {
            out.insert(*entity);
            true
        });
        Ok(())
    }

    fn tracked_len(&self) -> usize {
        self.entities.len()
    }

    fn for_all_entities<F: FnMut(&E) -> bool>(&self, mut op: F) {
        for entity in &self.entities {
            if !op(entity) {
                return;
            }
        }
    }

    fn for_entities_in_box_range<F: FnMut(&E) -> bool>(
        &self,
        center: DVec3,
        half_size: DVec3,
        mut op: F,
    ) {
        let lo = self.mapper.position_to_cell(center - half_size);
        let hi = self.mapper.position_to_cell(center + half_size);
        self.visit_cell_range(lo, hi, &mut op);
    }

    fn for_entities_in_sphere_range<F: FnMut(&E) -> bool>(
        &self,
        center: DVec3,
        radius: f64,
        op: F,
    ) {
        self.for_entities_in_box_range(center, DVec3::splat(radius), op);
    }

    fn for_entities_in_circle_range<F: FnMut(&E) -> bool>(
        &self,
        center: DVec3,
        radius: f64,
        mut op: F,
    ) {
        let lo = self
            .mapper
            .position_to_cell(center - DVec3::new(radius, radius, 0.0));
        let hi = self
            .mapper
            .position_to_cell(center + DVec3::new(radius, radius, 0.0));
        self.visit_cell_range(lo, hi, &mut op);
    }

    fn for_entities_in_rectangle_range<F: FnMut(&E) -> bool>(
        &self,
        center: DVec3,
        half_size: DVec2,
        mut op: F,
    ) {
        let lo = self
            .mapper
            .position_to_cell(center - DVec3::new(half_size.x, half_size.y, 0.0));
        let hi = self
            .mapper
            .position_to_cell(center + DVec3::new(half_size.x, half_size.y, 0.0));
        self.visit_cell_range(lo, hi, &mut op);
    }

    fn for_entities_along_ray<F: FnMut(&E) -> bool>(
        &self,
        ray: &Ray3,
        mut op: F,
        stop_at_closest_match: bool,
    ) {
        let mut seen = EntitySet::default();
        for_cells_along_segment(self.mapper.inv_cell_size(), ray.start, ray.end, |coord| {
            let mut hit = false;
            let keep_going = self.table.entries_at(coord, |entity| {
                hit = true;
                !seen.insert(*entity) || op(entity)
            });
            keep_going && !(stop_at_closest_match && hit)
        });
    }
}
