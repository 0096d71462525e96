// Copyright 2026 the Swarmspace Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A minimal simulation loop over both index backends.
//!
//! This example shows the intended wiring:
//! - robot positions live in the simulation's registry,
//! - a placement callback bins each robot by looking it up there,
//! - one `update` per tick, queries after it,
//! - sensing code stays generic over the backend.
//!
//! Run:
//! - `RUST_LOG=info cargo run -p swarmspace_demos --example swarm_tick`

use std::cell::RefCell;
use std::rc::Rc;

use glam::DVec3;
use log::info;
use rand::Rng;
use swarmspace_index::{
    Grid, IndexError, Placement, PositionalIndex, Ray3, SpaceHash,
};

const ROBOTS: usize = 32;
const TICKS: u64 = 50;
const ARENA_HALF: f64 = 10.0;
const SENSOR_RADIUS: f64 = 1.5;

type Registry = Rc<RefCell<Vec<DVec3>>>;

fn point_placement(registry: Registry) -> Placement<usize> {
    Box::new(move |robot, writer| {
        let position = registry.borrow()[*robot];
        let cell = writer.position_to_cell(position);
        writer.update_cell(cell, *robot)
    })
}

/// Random starting positions inside the arena.
fn spawn_robots(rng: &mut impl Rng) -> Registry {
    let positions = (0..ROBOTS)
        .map(|_| {
            DVec3::new(
                rng.gen_range(-ARENA_HALF..ARENA_HALF),
                rng.gen_range(-ARENA_HALF..ARENA_HALF),
                rng.gen_range(-ARENA_HALF..ARENA_HALF),
            )
        })
        .collect();
    Rc::new(RefCell::new(positions))
}

/// One random-walk step per robot, kept inside the arena so the same
/// registry also works with the bounded grid.
fn walk(registry: &Registry, rng: &mut impl Rng) {
    for position in registry.borrow_mut().iter_mut() {
        let step = DVec3::new(
            rng.gen_range(-0.1..0.1),
            rng.gen_range(-0.1..0.1),
            rng.gen_range(-0.1..0.1),
        );
        *position = (*position + step).clamp(
            DVec3::splat(-ARENA_HALF + 0.1),
            DVec3::splat(ARENA_HALF - 0.1),
        );
    }
}

/// The sensing side of the loop, generic over the backend.
fn run(
    label: &str,
    index: &mut impl PositionalIndex<usize>,
    registry: &Registry,
    rng: &mut impl Rng,
) -> Result<(), IndexError> {
    for robot in 0..ROBOTS {
        index.add_entity(robot);
    }

    for tick in 1..=TICKS {
        walk(registry, rng);
        index.update()?;

        // Proximity sensing around robot 0.
        let center = registry.borrow()[0];
        let mut neighbors = 0_usize;
        index.for_entities_in_sphere_range(center, SENSOR_RADIUS, |robot| {
            if *robot != 0 {
                neighbors += 1;
            }
            true
        });

        // Communication range on the robot's own z layer.
        let mut in_comm_range = 0_usize;
        index.for_entities_in_circle_range(center, 2.0 * SENSOR_RADIUS, |robot| {
            if *robot != 0 {
                in_comm_range += 1;
            }
            true
        });

        // A forward-looking distance sensor: first robot hit along +x.
        let ray = Ray3::new(center, center + DVec3::new(5.0, 0.0, 0.0));
        let mut blocked_by = None;
        index.for_entities_along_ray(
            &ray,
            |robot| {
                if *robot != 0 {
                    blocked_by = Some(*robot);
                    false
                } else {
                    true
                }
            },
            false,
        );

        if tick % 10 == 0 {
            info!(
                "[{label}] tick {tick}: robot 0 at {center}, \
                 {neighbors} neighbor(s) in range, {in_comm_range} in comm \
                 range, ray hit: {blocked_by:?}"
            );
        }
    }
    Ok(())
}

fn main() -> Result<(), IndexError> {
    env_logger::init();
    let mut rng = rand::thread_rng();

    let arena_min = DVec3::splat(-ARENA_HALF);
    let arena_max = DVec3::splat(ARENA_HALF);

    let registry = spawn_robots(&mut rng);
    let mut grid = Grid::new(
        arena_min,
        arena_max,
        20,
        20,
        20,
        point_placement(registry.clone()),
    )?;
    run("grid", &mut grid, &registry, &mut rng)?;

    let registry = spawn_robots(&mut rng);
    let mut hash = SpaceHash::new(DVec3::ONE, 4093, point_placement(registry.clone()))?;
    run("space_hash", &mut hash, &registry, &mut rng)?;

    println!("done: both backends ran {TICKS} ticks with {ROBOTS} robots");
    Ok(())
}
