//! Per-cell agent bins.
//!
//! A bin build produces a permutation of agent indices grouped by cell plus an
//! offsets array, so the agents currently in cell `c` are
//! `perm[offsets[c]..offsets[c + 1]]`. The build is a counting sort over the
//! owning cell, deterministic for a given input ordering: within a cell,
//! agents appear in store order.
//!
//! Two bin sets are cached by the simulation, one per day phase (home and
//! work), and rebuilt whenever positions change cell membership.

use crate::geometry::{Geometry, Position};

#[derive(Clone, Debug)]
pub struct Bins {
    offsets: Vec<usize>,
    perm: Vec<u32>,
}

impl Bins {
    /// Bins every position into its owning cell.
    pub fn build(geom: &Geometry, pos: &[Position]) -> Bins {
        assert!(
            pos.len() < u32::MAX as usize,
            "bin permutation indices are 32-bit"
        );
        let ncells = geom.ncells();
        let mut offsets = vec![0usize; ncells + 1];
        for p in pos {
            offsets[geom.bin_cell(*p) + 1] += 1;
        }
        for c in 0..ncells {
            offsets[c + 1] += offsets[c];
        }
        let mut cursor = offsets.clone();
        let mut perm = vec![0u32; pos.len()];
        for (index, p) in pos.iter().enumerate() {
            let cell = geom.bin_cell(*p);
            perm[cursor[cell]] = index as u32;
            cursor[cell] += 1;
        }
        Bins { offsets, perm }
    }

    pub fn num_cells(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn num_items(&self) -> usize {
        self.perm.len()
    }

    /// Agent indices currently located in `cell`.
    pub fn cell_agents(&self, cell: usize) -> &[u32] {
        &self.perm[self.offsets[cell]..self.offsets[cell + 1]]
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    pub fn perm(&self) -> &[u32] {
        &self.perm
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn positions() -> Vec<Position> {
        vec![
            Position { x: 2.5, y: 0.5 },
            Position { x: 0.5, y: 0.5 },
            Position { x: 2.5, y: 0.5 },
            Position { x: 1.5, y: 2.5 },
            Position { x: 0.5, y: 0.5 },
        ]
    }

    #[test]
    fn offsets_are_monotonic_and_complete() {
        let geom = Geometry::square(3, 1.0);
        let bins = Bins::build(&geom, &positions());
        let offsets = bins.offsets();
        assert_eq!(offsets.len(), geom.ncells() + 1);
        assert!(offsets.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(offsets[geom.ncells()], 5);
    }

    #[test]
    fn perm_is_a_permutation() {
        let geom = Geometry::square(3, 1.0);
        let bins = Bins::build(&geom, &positions());
        let mut seen = vec![false; 5];
        for &index in bins.perm() {
            assert!(!seen[index as usize]);
            seen[index as usize] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn cells_group_their_agents_in_store_order() {
        let geom = Geometry::square(3, 1.0);
        let bins = Bins::build(&geom, &positions());
        assert_eq!(bins.cell_agents(geom.cell_index(0, 0)), &[1, 4]);
        assert_eq!(bins.cell_agents(geom.cell_index(2, 0)), &[0, 2]);
        assert_eq!(bins.cell_agents(geom.cell_index(1, 2)), &[3]);
        assert!(bins.cell_agents(geom.cell_index(1, 1)).is_empty());
    }

    #[test]
    fn build_is_deterministic() {
        let geom = Geometry::square(3, 1.0);
        let a = Bins::build(&geom, &positions());
        let b = Bins::build(&geom, &positions());
        assert_eq!(a.perm(), b.perm());
        assert_eq!(a.offsets(), b.offsets());
    }
}
