// Copyright 2026 the Swarmspace Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bounded dense grid backend.
//!
//! A pre-allocated `I×J×K` array of cells covering a fixed axis-aligned
//! volume with uniform cell size. Indexing is a multiply and an add, which
//! makes this the backend of choice when the simulated arena has known,
//! bounded extents.

use core::fmt::Debug;

use glam::{DVec2, DVec3, IVec3};
use log::{debug, trace};

use crate::error::IndexError;
use crate::index::{CellWriter, Placement, PositionalIndex};
use crate::mapper::CellMapper;
use crate::types::{EntityRef, EntitySet, Ray3};
use crate::util::for_cells_along_segment;

/// Offset applied when clamping ray endpoints just inside the covered
/// volume, so the derived cell coordinates stay in range.
const CLAMP_EPSILON: f64 = 1e-6;

/// One cell of the dense grid: an entity set plus the tick at which it was
/// last written.
///
/// A cell whose timestamp is older than the grid's current tick is
/// logically empty regardless of its stored contents; the set is only
/// physically cleared when the cell is next written (lazy invalidation).
#[derive(Clone, Debug)]
pub struct GridCell<E> {
    entities: EntitySet<E>,
    timestamp: u64,
}

impl<E> Default for GridCell<E> {
    fn default() -> Self {
        Self {
            entities: EntitySet::default(),
            timestamp: 0,
        }
    }
}

impl<E: EntityRef> GridCell<E> {
    /// The entities stored in this cell, valid only when
    /// [`timestamp`][Self::timestamp] equals the grid's current tick.
    #[inline]
    pub fn entities(&self) -> &EntitySet<E> {
        &self.entities
    }

    /// The tick at which this cell was last written.
    #[inline]
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }
}

/// Flat cell storage plus the tick counter; the placement callback's write
/// surface during [`update`][PositionalIndex::update].
struct CellArray<E> {
    extents: IVec3,
    cells: Vec<GridCell<E>>,
    cur_tick: u64,
}

impl<E: EntityRef> CellArray<E> {
    fn index_of(&self, coord: IVec3) -> Option<usize> {
        if coord.x < 0
            || coord.x >= self.extents.x
            || coord.y < 0
            || coord.y >= self.extents.y
            || coord.z < 0
            || coord.z >= self.extents.z
        {
            return None;
        }
        #[allow(
            clippy::cast_sign_loss,
            reason = "Components are non-negative after the range check."
        )]
        Some(
            (self.extents.x * self.extents.y * coord.z + self.extents.x * coord.y + coord.x)
                as usize,
        )
    }

    fn cell_at(&self, coord: IVec3) -> Result<&GridCell<E>, IndexError> {
        self.index_of(coord)
            .map(|i| &self.cells[i])
            .ok_or(IndexError::OutOfBounds {
                coord,
                extents: self.extents,
            })
    }

    fn update_cell(&mut self, coord: IVec3, entity: E) -> Result<(), IndexError> {
        let extents = self.extents;
        let cur_tick = self.cur_tick;
        let idx = self.index_of(coord).ok_or(IndexError::OutOfBounds {
            coord,
            extents,
        })?;
        let cell = &mut self.cells[idx];
        if cell.timestamp < cur_tick {
            cell.entities.clear();
            cell.timestamp = cur_tick;
        }
        cell.entities.insert(entity);
        Ok(())
    }
}

/// Write surface handed to the placement callback while the grid updates.
struct GridWriter<'a, E> {
    min_corner: DVec3,
    mapper: &'a CellMapper,
    store: &'a mut CellArray<E>,
}

impl<E: EntityRef> CellWriter<E> for GridWriter<'_, E> {
    #[inline]
    fn position_to_cell(&self, position: DVec3) -> IVec3 {
        self.mapper.position_to_cell(position - self.min_corner)
    }

    #[inline]
    fn update_cell(&mut self, coord: IVec3, entity: E) -> Result<(), IndexError> {
        self.store.update_cell(coord, entity)
    }
}

/// Bounded dense grid index.
///
/// Constructed once with the covered volume and per-axis cell counts; cell
/// size is derived from the two. Positions are mapped relative to the
/// volume's minimum corner.
pub struct Grid<E: EntityRef> {
    min_corner: DVec3,
    max_corner: DVec3,
    mapper: CellMapper,
    store: CellArray<E>,
    entities: EntitySet<E>,
    placement: Placement<E>,
}

impl<E: EntityRef> Debug for Grid<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Grid")
            .field("min_corner", &self.min_corner)
            .field("max_corner", &self.max_corner)
            .field("extents", &self.store.extents)
            .field("cell_size", &self.mapper.cell_size())
            .field("tracked", &self.entities.len())
            .field("cur_tick", &self.store.cur_tick)
            .finish_non_exhaustive()
    }
}

impl<E: EntityRef> Grid<E> {
    /// Create a grid covering `[min_corner, max_corner]` with
    /// `size_i × size_j × size_k` cells and the given placement callback.
    ///
    /// # Errors
    ///
    /// [`IndexError::Configuration`] when any dimension is zero or the
    /// derived cell size is not strictly positive on every axis.
    pub fn new(
        min_corner: DVec3,
        max_corner: DVec3,
        size_i: u32,
        size_j: u32,
        size_k: u32,
        placement: Placement<E>,
    ) -> Result<Self, IndexError> {
        if size_i == 0 || size_j == 0 || size_k == 0 {
            return Err(IndexError::configuration(format!(
                "grid dimensions {size_i}x{size_j}x{size_k} must be strictly positive"
            )));
        }
        let extents = IVec3::new(
            i32::try_from(size_i)
                .map_err(|_| IndexError::configuration("grid dimension exceeds i32 range"))?,
            i32::try_from(size_j)
                .map_err(|_| IndexError::configuration("grid dimension exceeds i32 range"))?,
            i32::try_from(size_k)
                .map_err(|_| IndexError::configuration("grid dimension exceeds i32 range"))?,
        );
        let cell_size = (max_corner - min_corner)
            / DVec3::new(f64::from(size_i), f64::from(size_j), f64::from(size_k));
        let mapper = CellMapper::new(cell_size)?;
        let cell_count = (size_i as usize)
            .checked_mul(size_j as usize)
            .and_then(|n| n.checked_mul(size_k as usize))
            .ok_or_else(|| IndexError::configuration("grid cell count overflows usize"))?;
        let mut cells = Vec::new();
        cells.resize_with(cell_count, GridCell::default);
        debug!(
            "grid index over [{min_corner}, {max_corner}]: {size_i}x{size_j}x{size_k} cells of {cell_size}"
        );
        Ok(Self {
            min_corner,
            max_corner,
            mapper,
            store: CellArray {
                extents,
                cells,
                cur_tick: 0,
            },
            entities: EntitySet::default(),
            placement,
        })
    }

    /// The covered volume's minimum corner.
    #[inline]
    pub fn min_corner(&self) -> DVec3 {
        self.min_corner
    }

    /// The covered volume's maximum corner.
    #[inline]
    pub fn max_corner(&self) -> DVec3 {
        self.max_corner
    }

    /// Per-axis cell counts.
    #[inline]
    pub fn extents(&self) -> IVec3 {
        self.store.extents
    }

    /// The coordinate mapper (positions relative to the minimum corner).
    #[inline]
    pub fn mapper(&self) -> &CellMapper {
        &self.mapper
    }

    /// The current tick, as advanced by [`update`][PositionalIndex::update].
    #[inline]
    pub fn current_tick(&self) -> u64 {
        self.store.cur_tick
    }

    /// Direct access to the cell at `coord`.
    ///
    /// The returned cell's contents are only meaningful when its
    /// [`timestamp`][GridCell::timestamp] equals
    /// [`current_tick`][Self::current_tick].
    ///
    /// # Errors
    ///
    /// [`IndexError::OutOfBounds`] when `coord` lies outside the grid's
    /// extents — in every build profile, never clamped.
    pub fn cell_at(&self, coord: IVec3) -> Result<&GridCell<E>, IndexError> {
        self.store.cell_at(coord)
    }

    /// Cell coordinate of a position, unclamped; may fall outside the grid.
    #[inline]
    fn relative_cell(&self, position: DVec3) -> IVec3 {
        self.mapper.position_to_cell(position - self.min_corner)
    }

    /// Cell coordinate of a position, clamped into the grid's extents.
    #[inline]
    fn clamped_cell(&self, position: DVec3) -> IVec3 {
        self.relative_cell(position)
            .clamp(IVec3::ZERO, self.store.extents - IVec3::ONE)
    }

    /// Move a position strictly inside the covered volume.
    fn clamp_position(&self, position: DVec3) -> DVec3 {
        let mut p = position.to_array();
        let lo = self.min_corner.to_array();
        let hi = self.max_corner.to_array();
        for axis in 0..3 {
            if p[axis] <= lo[axis] {
                p[axis] = lo[axis] + CLAMP_EPSILON;
            } else if p[axis] >= hi[axis] {
                p[axis] = hi[axis] - CLAMP_EPSILON;
            }
        }
        DVec3::from_array(p)
    }

    /// Visit the up-to-date entities of one in-range cell.
    ///
    /// Returns `false` when the operation requested an early stop.
    fn visit_cell<F: FnMut(&E) -> bool>(
        &self,
        coord: IVec3,
        seen: &mut EntitySet<E>,
        op: &mut F,
    ) -> bool {
        let cell = self
            .store
            .cell_at(coord)
            .expect("grid invariant violated: clamped cell range left the grid");
        if cell.timestamp == self.store.cur_tick && !cell.entities.is_empty() {
            for entity in &cell.entities {
                if seen.insert(*entity) && !op(entity) {
                    return false;
                }
            }
        }
        true
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

impl<E: EntityRef> PositionalIndex<E> for Grid<E> {
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
        self.store.cur_tick += 1;
        trace!(
            "grid update: tick {}, re-binning {} entities",
            self.store.cur_tick,
            self.entities.len()
        );
        let mut writer = GridWriter {
            min_corner: self.min_corner,
            mapper: &self.mapper,
            store: &mut self.store,
        };
        for entity in &self.entities {
            (self.placement)(entity, &mut writer)?;
        }
        Ok(())
    }

    fn reset(&mut self) -> Result<(), IndexError> {
        self.store.cur_tick = 0;
        for cell in &mut self.store.cells {
            cell.entities.clear();
            cell.timestamp = 0;
        }
        self.update()
    }

    fn entities_at(&self, position: DVec3, out: &mut EntitySet<E>) -> Result<(), IndexError> {
        out.clear();
        let cell = self.store.cell_at(self.relative_cell(position))?;
        if cell.timestamp == self.store.cur_tick {
            out.extend(cell.entities.iter().copied());
        }
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
        let lo = self.clamped_cell(center - half_size);
        let hi = self.clamped_cell(center + half_size);
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
        if center.z < self.min_corner.z || center.z > self.max_corner.z {
            return;
        }
        let lo = self.clamped_cell(center - DVec3::new(radius, radius, 0.0));
        let hi = self.clamped_cell(center + DVec3::new(radius, radius, 0.0));
        self.visit_cell_range(lo, hi, &mut op);
    }

    fn for_entities_in_rectangle_range<F: FnMut(&E) -> bool>(
        &self,
        center: DVec3,
        half_size: DVec2,
        mut op: F,
    ) {
        let lo = self.clamped_cell(center - DVec3::new(half_size.x, half_size.y, 0.0));
        let hi = self.clamped_cell(center + DVec3::new(half_size.x, half_size.y, 0.0));
        self.visit_cell_range(lo, hi, &mut op);
    }

    fn for_entities_along_ray<F: FnMut(&E) -> bool>(
        &self,
        ray: &Ray3,
        mut op: F,
        stop_at_closest_match: bool,
    ) {
        let start = self.clamp_position(ray.start) - self.min_corner;
        let end = self.clamp_position(ray.end) - self.min_corner;
        let mut seen = EntitySet::default();
        for_cells_along_segment(self.mapper.inv_cell_size(), start, end, |coord| {
            let cell = self
                .store
                .cell_at(coord)
                .expect("grid invariant violated: clamped ray left the grid");
            let live = cell.timestamp == self.store.cur_tick && !cell.entities.is_empty();
            if live {
                for entity in &cell.entities {
                    if seen.insert(*entity) && !op(entity) {
                        return false;
                    }
                }
                if stop_at_closest_match {
                    return false;
                }
            }
            true
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Registry = Rc<RefCell<Vec<DVec3>>>;

    fn point_placement(registry: Registry) -> Placement<usize> {
        Box::new(move |entity, writer| {
            let position = registry.borrow()[*entity];
            let coord = writer.position_to_cell(position);
            writer.update_cell(coord, *entity)
        })
    }

    fn unit_grid(registry: Registry) -> Grid<usize> {
        Grid::new(
            DVec3::ZERO,
            DVec3::ONE,
            10,
            10,
            10,
            point_placement(registry),
        )
        .unwrap()
    }

    fn tracked(grid: &mut Grid<usize>, registry: &Registry, positions: &[DVec3]) {
        for (id, p) in positions.iter().enumerate() {
            registry.borrow_mut().push(*p);
            grid.add_entity(id);
        }
    }

    #[test]
    fn rejects_bad_geometry() {
        let reg: Registry = Rc::default();
        assert!(matches!(
            Grid::<usize>::new(DVec3::ZERO, DVec3::ONE, 0, 10, 10, point_placement(reg.clone())),
            Err(IndexError::Configuration { .. })
        ));
        assert!(matches!(
            Grid::<usize>::new(DVec3::ONE, DVec3::ZERO, 10, 10, 10, point_placement(reg)),
            Err(IndexError::Configuration { .. })
        ));
    }

    #[test]
    fn point_lookup_finds_the_entity() {
        let reg: Registry = Rc::default();
        let mut grid = unit_grid(reg.clone());
        tracked(&mut grid, &reg, &[DVec3::new(0.05, 0.05, 0.05)]);
        grid.update().unwrap();

        let mut out = EntitySet::default();
        grid.entities_at(DVec3::new(0.05, 0.05, 0.05), &mut out)
            .unwrap();
        assert_eq!(out.len(), 1);
        assert!(out.contains(&0));
    }

    #[test]
    fn moving_an_entity_rebins_it() {
        let reg: Registry = Rc::default();
        let mut grid = unit_grid(reg.clone());
        tracked(&mut grid, &reg, &[DVec3::new(0.05, 0.05, 0.05)]);
        grid.update().unwrap();

        reg.borrow_mut()[0] = DVec3::new(0.95, 0.05, 0.05);
        grid.update().unwrap();

        let mut out = EntitySet::default();
        grid.entities_at(DVec3::new(0.05, 0.05, 0.05), &mut out)
            .unwrap();
        assert!(out.is_empty(), "stale cell must not retain the entity");
        grid.entities_at(DVec3::new(0.95, 0.05, 0.05), &mut out)
            .unwrap();
        assert!(out.contains(&0));
        // And the backing cells agree: cell (0,0,0) is stale, (9,0,0) is live.
        assert!(grid.cell_at(IVec3::new(0, 0, 0)).unwrap().timestamp() < grid.current_tick());
        assert_eq!(
            grid.cell_at(IVec3::new(9, 0, 0)).unwrap().timestamp(),
            grid.current_tick()
        );
    }

    #[test]
    fn stale_cells_stay_invisible_two_ticks_later() {
        let reg: Registry = Rc::default();
        let mut grid = unit_grid(reg.clone());
        tracked(&mut grid, &reg, &[DVec3::new(0.05, 0.05, 0.05)]);
        grid.update().unwrap();

        // The entity disappears from the registry; its old cell's backing
        // memory is never explicitly cleared.
        grid.remove_entity(0).unwrap();
        grid.update().unwrap();
        grid.update().unwrap();

        let mut out = EntitySet::default();
        grid.entities_at(DVec3::new(0.05, 0.05, 0.05), &mut out)
            .unwrap();
        assert!(out.is_empty());
        // The stale set physically still holds the handle.
        assert!(
            grid.cell_at(IVec3::new(0, 0, 0))
                .unwrap()
                .entities()
                .contains(&0)
        );
    }

    #[test]
    fn removing_unknown_entity_is_an_error() {
        let reg: Registry = Rc::default();
        let mut grid = unit_grid(reg);
        assert_eq!(grid.remove_entity(7), Err(IndexError::NotFound));
    }

    #[test]
    fn removing_everything_leaves_no_visits() {
        let reg: Registry = Rc::default();
        let mut grid = unit_grid(reg.clone());
        tracked(
            &mut grid,
            &reg,
            &[
                DVec3::new(0.15, 0.15, 0.15),
                DVec3::new(0.55, 0.55, 0.55),
                DVec3::new(0.95, 0.95, 0.95),
            ],
        );
        grid.update().unwrap();
        for id in 0..3 {
            grid.remove_entity(id).unwrap();
        }
        let mut visits = 0;
        grid.for_all_entities(|_| {
            visits += 1;
            true
        });
        assert_eq!(visits, 0);
        assert_eq!(grid.tracked_len(), 0);
    }

    #[test]
    fn box_range_covers_exactly_its_cells() {
        let reg: Registry = Rc::default();
        let mut grid = unit_grid(reg.clone());
        // One entity each in cells (0,0,0), (1,0,0), (2,0,0).
        tracked(
            &mut grid,
            &reg,
            &[
                DVec3::new(0.05, 0.05, 0.05),
                DVec3::new(0.15, 0.05, 0.05),
                DVec3::new(0.25, 0.05, 0.05),
            ],
        );
        grid.update().unwrap();

        // A box over cells 0 and 1 on the x axis only.
        let mut hits: Vec<usize> = Vec::new();
        grid.for_entities_in_box_range(
            DVec3::new(0.1, 0.05, 0.05),
            DVec3::new(0.08, 0.04, 0.04),
            |e| {
                hits.push(*e);
                true
            },
        );
        hits.sort_unstable();
        assert_eq!(hits, vec![0, 1]);
    }

    #[test]
    fn range_queries_are_cell_granular() {
        let reg: Registry = Rc::default();
        let mut grid = unit_grid(reg.clone());
        // In the corner of cell (3,3,3), far from the sphere surface but
        // inside the sphere's bounding box.
        tracked(&mut grid, &reg, &[DVec3::new(0.31, 0.31, 0.31)]);
        grid.update().unwrap();

        let mut hits = 0;
        grid.for_entities_in_sphere_range(DVec3::new(0.39, 0.39, 0.39), 0.05, |_| {
            hits += 1;
            true
        });
        assert_eq!(hits, 1, "cell granularity reports bounding-box overlap");
    }

    #[test]
    fn circle_range_outside_z_extent_visits_nothing() {
        let reg: Registry = Rc::default();
        let mut grid = unit_grid(reg.clone());
        tracked(&mut grid, &reg, &[DVec3::new(0.5, 0.5, 0.5)]);
        grid.update().unwrap();

        let mut hits = 0;
        grid.for_entities_in_circle_range(DVec3::new(0.5, 0.5, 2.0), 1.0, |_| {
            hits += 1;
            true
        });
        assert_eq!(hits, 0);
    }

    #[test]
    fn rectangle_range_covers_one_z_layer() {
        let reg: Registry = Rc::default();
        let mut grid = unit_grid(reg.clone());
        tracked(
            &mut grid,
            &reg,
            &[
                DVec3::new(0.5, 0.5, 0.55), // same layer as the query center
                DVec3::new(0.5, 0.5, 0.95), // different layer
            ],
        );
        grid.update().unwrap();

        let mut hits: Vec<usize> = Vec::new();
        grid.for_entities_in_rectangle_range(
            DVec3::new(0.5, 0.5, 0.55),
            DVec2::new(0.2, 0.2),
            |e| {
                hits.push(*e);
                true
            },
        );
        assert_eq!(hits, vec![0]);
    }

    #[test]
    fn extended_entity_is_reported_once_per_query() {
        let reg: Registry = Rc::default();
        reg.borrow_mut().push(DVec3::new(0.15, 0.05, 0.05));
        // Extent of one extra cell on +x: the placement callback bins the
        // entity into two adjacent cells.
        let placement: Placement<usize> = {
            let reg = reg.clone();
            Box::new(move |entity, writer| {
                let position = reg.borrow()[*entity];
                let coord = writer.position_to_cell(position);
                writer.update_cell(coord, *entity)?;
                writer.update_cell(coord + IVec3::new(1, 0, 0), *entity)
            })
        };
        let mut grid = Grid::new(DVec3::ZERO, DVec3::ONE, 10, 10, 10, placement).unwrap();
        grid.add_entity(0);
        grid.update().unwrap();

        let mut hits = 0;
        grid.for_entities_in_box_range(DVec3::new(0.2, 0.05, 0.05), DVec3::splat(0.15), |_| {
            hits += 1;
            true
        });
        assert_eq!(hits, 1, "multi-cell entity deduplicated within one query");
    }

    #[test]
    fn ray_visits_cells_in_order_and_stops_at_closest() {
        let reg: Registry = Rc::default();
        let mut grid = unit_grid(reg.clone());
        // One entity per cell (i, 0, 0), i = 0..10.
        let positions: Vec<DVec3> = (0..10)
            .map(|i| DVec3::new(0.05 + 0.1 * f64::from(i), 0.05, 0.05))
            .collect();
        tracked(&mut grid, &reg, &positions);
        grid.update().unwrap();

        let ray = Ray3::new(DVec3::new(0.0, 0.05, 0.05), DVec3::new(1.0, 0.05, 0.05));
        let mut order: Vec<usize> = Vec::new();
        grid.for_entities_along_ray(&ray, |e| {
            order.push(*e);
            true
        }, false);
        assert_eq!(order, (0..10).collect::<Vec<_>>());

        let mut first: Vec<usize> = Vec::new();
        grid.for_entities_along_ray(&ray, |e| {
            first.push(*e);
            true
        }, true);
        assert_eq!(first, vec![0], "stop_at_closest ends at the first hit cell");
    }

    #[test]
    fn diagonal_ray_visits_cells_in_traversal_order() {
        let reg: Registry = Rc::default();
        let mut grid = Grid::new(
            DVec3::ZERO,
            DVec3::splat(10.0),
            10,
            10,
            10,
            point_placement(reg.clone()),
        )
        .unwrap();
        // The cells a ray from (0.1, 0.1, 0.1) to (5.5, 2.5, 1.5) passes
        // through, in boundary-crossing order, one entity per cell, plus a
        // tenth entity in the off-path cell (1,1,0).
        let path = [
            (0, 0, 0),
            (1, 0, 0),
            (2, 0, 0),
            (2, 1, 0),
            (3, 1, 0),
            (3, 1, 1),
            (4, 1, 1),
            (4, 2, 1),
            (5, 2, 1),
        ];
        let mut positions: Vec<DVec3> = path
            .iter()
            .map(|&(i, j, k)| IVec3::new(i, j, k).as_dvec3() + DVec3::splat(0.5))
            .collect();
        positions.push(DVec3::new(1.5, 1.5, 0.5));
        tracked(&mut grid, &reg, &positions);
        grid.update().unwrap();

        let ray = Ray3::new(DVec3::new(0.1, 0.1, 0.1), DVec3::new(5.5, 2.5, 1.5));
        let mut order: Vec<usize> = Vec::new();
        grid.for_entities_along_ray(&ray, |e| {
            order.push(*e);
            true
        }, false);
        assert_eq!(order, (0..9).collect::<Vec<_>>());

        let mut first: Vec<usize> = Vec::new();
        grid.for_entities_along_ray(&ray, |e| {
            first.push(*e);
            true
        }, true);
        assert_eq!(first, vec![0]);
    }

    #[test]
    fn ray_skips_empty_cells_between_hits() {
        let reg: Registry = Rc::default();
        let mut grid = unit_grid(reg.clone());
        tracked(
            &mut grid,
            &reg,
            &[DVec3::new(0.35, 0.05, 0.05), DVec3::new(0.75, 0.05, 0.05)],
        );
        grid.update().unwrap();

        let ray = Ray3::new(DVec3::new(0.0, 0.05, 0.05), DVec3::new(1.0, 0.05, 0.05));
        let mut order: Vec<usize> = Vec::new();
        grid.for_entities_along_ray(&ray, |e| {
            order.push(*e);
            true
        }, false);
        assert_eq!(order, vec![0, 1]);

        let mut first: Vec<usize> = Vec::new();
        grid.for_entities_along_ray(&ray, |e| {
            first.push(*e);
            true
        }, true);
        assert_eq!(first, vec![0]);
    }

    #[test]
    fn out_of_bounds_access_is_an_error() {
        let reg: Registry = Rc::default();
        let grid = unit_grid(reg);
        assert!(matches!(
            grid.cell_at(IVec3::new(10, 0, 0)),
            Err(IndexError::OutOfBounds { .. })
        ));
        let mut out = EntitySet::default();
        assert!(matches!(
            grid.entities_at(DVec3::new(2.0, 2.0, 2.0), &mut out),
            Err(IndexError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn update_propagates_out_of_bounds_placement() {
        let reg: Registry = Rc::default();
        let mut grid = unit_grid(reg.clone());
        tracked(&mut grid, &reg, &[DVec3::new(5.0, 5.0, 5.0)]);
        assert!(matches!(
            grid.update(),
            Err(IndexError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn reset_restarts_the_clock_and_rebins() {
        let reg: Registry = Rc::default();
        let mut grid = unit_grid(reg.clone());
        tracked(&mut grid, &reg, &[DVec3::new(0.45, 0.45, 0.45)]);
        for _ in 0..5 {
            grid.update().unwrap();
        }
        assert_eq!(grid.current_tick(), 5);

        grid.reset().unwrap();
        assert_eq!(grid.current_tick(), 1);
        let mut out = EntitySet::default();
        grid.entities_at(DVec3::new(0.45, 0.45, 0.45), &mut out)
            .unwrap();
        assert!(out.contains(&0));
    }
}
