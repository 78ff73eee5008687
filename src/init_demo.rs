//! Synthetic initializer for benchmarking.
//!
//! Populates a square grid with a power-law cell population distribution:
//! 1000 log-spaced population bins with cell counts proportional to
//! `pop^-1.5`, shuffled over the grid, with the heaviest cells biased toward
//! a border band so roughly a third of the population sits near the domain
//! edge. A small fraction of agents is seeded infected, 30% of them with the
//! second strain.

use crate::agents::{AgentAttrs, AgentStore, Status};
use crate::geometry::Geometry;
use crate::params::DiseaseParm;
use crate::rng::{StreamSeeds, Usage};
use rand::seq::SliceRandom;
use rand::Rng;

/// Fraction of agents seeded infected.
pub const DEMO_SEED_FRACTION: f64 = 1e-6;
/// Fraction of seeded infections carrying strain 1.
pub const STRAIN1_FRACTION: f64 = 0.3;

const NUM_POP_BINS: usize = 1000;
const LOG_MIN_POP: f64 = 1.062;
const LOG_MAX_POP: f64 = 4.0;

/// Per-cell populations: log-spaced bins weighted by `pop^-1.5`, scaled to
/// the cell count and scattered over the grid, with the heaviest cells
/// preferentially placed in the border band.
fn compute_initial_distribution(geom: &Geometry, seeds: &StreamSeeds) -> Vec<i64> {
    let ncell = geom.nx();
    let total_cells = geom.ncells();
    let mut rng = seeds.stream(0, Usage::DemoLayout);

    let mut bin_pops = [0i64; NUM_POP_BINS];
    let mut weights = [0f64; NUM_POP_BINS];
    for i in 0..NUM_POP_BINS {
        let pop = 10f64
            .powf(LOG_MIN_POP + i as f64 * (LOG_MAX_POP - LOG_MIN_POP) / (NUM_POP_BINS - 1) as f64);
        bin_pops[i] = pop.round() as i64;
        weights[i] = pop.powf(-1.5);
    }
    let norm: f64 = weights.iter().sum();

    let mut cells_per_bin = [0i64; NUM_POP_BINS];
    let mut assigned = 0;
    for i in 0..NUM_POP_BINS {
        // Floor keeps the running total under the cell count; the slack all
        // lands in the lightest bin.
        cells_per_bin[i] = (weights[i] * total_cells as f64 / norm).floor() as i64;
        assigned += cells_per_bin[i];
    }
    cells_per_bin[0] += total_cells as i64 - assigned;

    let mut perm: Vec<usize> = (0..total_cells).collect();
    perm.shuffle(&mut rng);

    let mut cell_pops = vec![0i64; total_cells];
    let mut next = 0usize;
    for (bin, count) in cells_per_bin.iter().enumerate() {
        for _ in 0..*count {
            cell_pops[perm[next]] = bin_pops[bin];
            next += 1;
        }
    }

    // Split the cells into a border band and an interior pool, walking the
    // populations from heaviest to lightest so the border band reaches a
    // third of the total population.
    let border_width = (ncell / 15).max(1).min(ncell / 2);
    let interior_edge = ncell - 2 * border_width;
    let interior_size = interior_edge * interior_edge;
    let border_size = total_cells - interior_size;
    let total_pop: i64 = cell_pops.iter().sum();
    let border_target = total_pop / 3;

    cell_pops.sort_unstable();
    let mut border_pops: Vec<i64> = Vec::with_capacity(border_size);
    let mut interior_pops: Vec<i64> = Vec::with_capacity(interior_size);
    let mut border_pop = 0i64;
    let mut next_heaviest = cell_pops.len();
    while border_pop < border_target && next_heaviest > 0 {
        next_heaviest -= 1;
        let pop = cell_pops[next_heaviest];
        if rng.gen::<f64>() < 0.5 {
            border_pops.push(pop);
            border_pop += pop;
        } else {
            interior_pops.push(pop);
        }
    }
    while interior_pops.len() < interior_size && next_heaviest > 0 {
        next_heaviest -= 1;
        interior_pops.push(cell_pops[next_heaviest]);
    }
    while next_heaviest > 0 {
        next_heaviest -= 1;
        border_pops.push(cell_pops[next_heaviest]);
    }
    // On small grids the coin-flip phase can overfill one pool; rebalance
    // with the lightest entries of the other.
    while interior_pops.len() < interior_size {
        interior_pops.push(border_pops.pop().unwrap());
    }
    while border_pops.len() < border_size {
        border_pops.push(interior_pops.pop().unwrap());
    }
    assert_eq!(interior_pops.len(), interior_size);
    assert_eq!(border_pops.len(), border_size);

    border_pops.shuffle(&mut rng);
    interior_pops.shuffle(&mut rng);

    let in_border = |i: usize, j: usize| {
        i < border_width || i >= ncell - border_width || j < border_width || j >= ncell - border_width
    };
    let mut placed = vec![0i64; total_cells];
    for cell in 0..total_cells {
        let (i, j) = geom.cell_coords(cell);
        placed[cell] = if in_border(i as usize, j as usize) {
            border_pops.pop().unwrap()
        } else {
            interior_pops.pop().unwrap()
        };
    }
    assert!(border_pops.is_empty() && interior_pops.is_empty());
    placed
}

/// Populates the grid with the synthetic distribution and seeds infections at
/// `seed_fraction` ([`DEMO_SEED_FRACTION`] for a production run).
pub fn init_agents_demo(
    geom: &Geometry,
    parm: &DiseaseParm,
    seeds: &StreamSeeds,
    seed_fraction: f64,
) -> AgentStore {
    assert_eq!(geom.nx(), geom.ny(), "the synthetic layout expects a square grid");
    let cell_pops = compute_initial_distribution(geom, seeds);

    let total: i64 = cell_pops.iter().sum();
    let mut store = AgentStore::new();
    store.reserve(total as usize);
    log::info!("synthetic layout: {total} agents over {} cells", geom.ncells());

    for (cell, pop) in cell_pops.iter().enumerate() {
        let (i, j) = geom.cell_coords(cell);
        let center = geom.cell_center(i, j);
        let mut rng = seeds.stream(cell as u64, Usage::DemoSeeding);
        for _ in 0..*pop {
            let mut attrs = AgentAttrs::resident(i, j, 0, 0, 0);
            if rng.gen::<f64>() < seed_fraction {
                attrs.status = Status::Infected;
                if rng.gen::<f64>() < STRAIN1_FRACTION {
                    attrs.strain = 1;
                }
            }
            let index = store.push(center, attrs) as usize;
            if store.attrs[index].status == Status::Infected {
                let (incubation, infectious, symptomdev) = parm.sample_periods(&mut rng);
                let timers = &mut store.timers[index];
                timers.incubation_period = incubation;
                timers.infectious_period = infectious;
                timers.symptomdev_period = symptomdev;
            }
        }
    }
    store
}
