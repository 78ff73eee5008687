//! Daily movement passes.
//!
//! Each primitive is an embarrassingly parallel pass over all agents. The
//! caller owns bin invalidation: `move_to_home`/`move_to_work` restore the
//! canonical phase positions, while `random_walk` and `random_travel` perturb
//! cell membership and require a rebuild before the next contact pass.

use crate::agents::AgentStore;
use crate::geometry::{Geometry, Position};
use crate::rng::{StreamSeeds, Usage};
use rand::Rng;
use rayon::prelude::*;

/// Fraction of agents performing a long-distance jump per travel pass.
pub const RANDOM_TRAVEL_PROB: f64 = 1e-4;

/// Places every agent at the center of its home cell.
pub fn move_to_home(store: &mut AgentStore, geom: &Geometry) {
    let dx = geom.dx();
    store
        .pos
        .par_iter_mut()
        .zip(&store.attrs)
        .for_each(|(pos, attrs)| {
            *pos = Position {
                x: (f64::from(attrs.home_i) + 0.5) * dx,
                y: (f64::from(attrs.home_j) + 0.5) * dx,
            };
        });
}

/// Places every agent at the center of its work cell.
pub fn move_to_work(store: &mut AgentStore, geom: &Geometry) {
    let dx = geom.dx();
    store
        .pos
        .par_iter_mut()
        .zip(&store.attrs)
        .for_each(|(pos, attrs)| {
            *pos = Position {
                x: (f64::from(attrs.work_i) + 0.5) * dx,
                y: (f64::from(attrs.work_j) + 0.5) * dx,
            };
        });
}

/// Perturbs every agent by up to one cell size per axis.
pub fn random_walk(store: &mut AgentStore, geom: &Geometry, seeds: &StreamSeeds) {
    let dx = geom.dx();
    store.pos.par_iter_mut().enumerate().for_each(|(i, pos)| {
        let mut rng = seeds.stream(i as u64, Usage::RandomWalk);
        pos.x += (2.0 * rng.gen::<f64>() - 1.0) * dx;
        pos.y += (2.0 * rng.gen::<f64>() - 1.0) * dx;
    });
}

/// Long-distance travel: with probability [`RANDOM_TRAVEL_PROB`], an agent
/// jumps to a uniformly random point of the domain.
pub fn random_travel(store: &mut AgentStore, geom: &Geometry, seeds: &StreamSeeds) {
    let (lx, ly) = (geom.length_x(), geom.length_y());
    store.pos.par_iter_mut().enumerate().for_each(|(i, pos)| {
        let mut rng = seeds.stream(i as u64, Usage::RandomTravel);
        if rng.gen::<f64>() < RANDOM_TRAVEL_PROB {
            pos.x = lx * rng.gen::<f64>();
            pos.y = ly * rng.gen::<f64>();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{AgentAttrs, Status};

    fn store_on(geom: &Geometry, n: usize) -> AgentStore {
        let mut store = AgentStore::new();
        for k in 0..n {
            let home = (k % geom.nx()) as i64;
            let mut attrs = AgentAttrs::resident(home, 0, 3, k as i32, 0);
            attrs.work_i = ((k + 1) % geom.nx()) as i32;
            attrs.work_j = (geom.ny() - 1) as i32;
            attrs.status = Status::Never;
            store.push(geom.cell_center(home, 0), attrs);
        }
        store
    }

    #[test]
    fn home_cells_match_home_attrs() {
        let geom = Geometry::square(5, 1.0);
        let mut store = store_on(&geom, 20);
        move_to_work(&mut store, &geom);
        move_to_home(&mut store, &geom);
        for (pos, attrs) in store.pos.iter().zip(&store.attrs) {
            let (i, j) = geom.cell_of(*pos);
            assert_eq!((i as i32, j as i32), (attrs.home_i, attrs.home_j));
        }
    }

    #[test]
    fn work_cells_match_work_attrs() {
        let geom = Geometry::square(5, 1.0);
        let mut store = store_on(&geom, 20);
        move_to_work(&mut store, &geom);
        for (pos, attrs) in store.pos.iter().zip(&store.attrs) {
            let (i, j) = geom.cell_of(*pos);
            assert_eq!((i as i32, j as i32), (attrs.work_i, attrs.work_j));
        }
    }

    #[test]
    fn move_to_home_is_idempotent() {
        let geom = Geometry::square(5, 1.0);
        let mut store = store_on(&geom, 20);
        move_to_home(&mut store, &geom);
        let first = store.pos.clone();
        move_to_home(&mut store, &geom);
        assert_eq!(store.pos, first);
    }

    #[test]
    fn work_home_roundtrip_preserves_positions() {
        let geom = Geometry::square(5, 1.0);
        let mut store = store_on(&geom, 20);
        move_to_home(&mut store, &geom);
        let before = store.pos.clone();
        move_to_work(&mut store, &geom);
        move_to_home(&mut store, &geom);
        for (a, b) in before.iter().zip(&store.pos) {
            assert!((a.x - b.x).abs() < 1e-12 && (a.y - b.y).abs() < 1e-12);
        }
    }

    #[test]
    fn travel_frequency_is_near_nominal() {
        // One agent over 10_000 steps; jump count within 4 sigma of the
        // 1e-4 rate, i.e. at most 5 jumps.
        let geom = Geometry::square(100, 1.0);
        let mut store = store_on(&geom, 1);
        move_to_home(&mut store, &geom);
        let seeds = StreamSeeds::new(42);
        let mut jumps = 0;
        for step in 0..10_000u64 {
            let before = store.pos[0];
            random_travel(&mut store, &geom, &seeds.at_step(step));
            if store.pos[0] != before {
                jumps += 1;
                move_to_home(&mut store, &geom);
            }
        }
        assert!(jumps <= 5, "observed {jumps} jumps in 10000 steps");
    }

    #[test]
    fn walk_stays_within_one_cell() {
        let geom = Geometry::square(5, 1.0);
        let mut store = store_on(&geom, 20);
        move_to_home(&mut store, &geom);
        let before = store.pos.clone();
        random_walk(&mut store, &geom, &StreamSeeds::new(7));
        for (a, b) in before.iter().zip(&store.pos) {
            assert!((a.x - b.x).abs() <= geom.dx());
            assert!((a.y - b.y).abs() <= geom.dx());
        }
    }
}
