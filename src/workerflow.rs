//! Commuter flows and work assignment.
//!
//! The workerflow file is a binary stream of `(from_id, to_id, n_workers)`
//! triplets of little-endian unsigned 32-bit integers, where the ids are the
//! census-tract ids from the first column of the census file. Flows touching
//! units outside the loaded census are skipped.
//!
//! Assignment gives each working-age agent (18-64) a chance of being a day
//! worker proportional to its unit's `day_workers` count, picks a destination
//! unit weighted by the outbound flows, and places the agent in a random
//! community of that unit with a community-wide workgroup of about
//! [`WORKGROUP_SIZE`] coworkers.

use crate::agents::AgentStore;
use crate::demographics::{DemographicData, COMMUNITY_SIZE};
use crate::error::EpiError;
use crate::geometry::Geometry;
use crate::init_census::CommunityMaps;
use crate::rng::{StreamSeeds, Usage};
use rand::Rng;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::fs;
use std::path::Path;

/// Nominal workgroup size; a standard community hosts
/// `COMMUNITY_SIZE / WORKGROUP_SIZE` workgroups.
pub const WORKGROUP_SIZE: i64 = 20;

/// Outbound commuter flows per unit.
#[derive(Clone, Debug, Default)]
pub struct WorkerFlow {
    /// `flows[from_unit]` lists `(to_unit, n_workers)` with `n_workers > 0`.
    flows: Vec<Vec<(usize, u32)>>,
}

impl WorkerFlow {
    pub fn from_file(path: &Path, demo: &DemographicData) -> Result<Self, EpiError> {
        let bytes = fs::read(path).map_err(|e| {
            EpiError::EpiError(format!(
                "cannot read workerflow file {}: {e}",
                path.display()
            ))
        })?;
        if bytes.len() % 12 != 0 {
            return Err(EpiError::EpiError(format!(
                "workerflow file {} is not a whole number of u32 triplets",
                path.display()
            )));
        }
        let triplets = bytes.chunks_exact(12).map(|chunk| {
            (
                u32::from_le_bytes(chunk[0..4].try_into().unwrap()),
                u32::from_le_bytes(chunk[4..8].try_into().unwrap()),
                u32::from_le_bytes(chunk[8..12].try_into().unwrap()),
            )
        });
        Ok(Self::from_triplets(triplets, demo))
    }

    /// Builds the per-unit flow lists from raw `(from, to, workers)` triplets.
    pub fn from_triplets(
        triplets: impl IntoIterator<Item = (u32, u32, u32)>,
        demo: &DemographicData,
    ) -> Self {
        let unit_by_id: FxHashMap<i64, usize> = demo
            .my_id
            .iter()
            .enumerate()
            .map(|(unit, id)| (*id, unit))
            .collect();
        let mut flows = vec![Vec::new(); demo.nunits()];
        for (from, to, workers) in triplets {
            if workers == 0 {
                continue;
            }
            let (Some(&from_unit), Some(&to_unit)) = (
                unit_by_id.get(&i64::from(from)),
                unit_by_id.get(&i64::from(to)),
            ) else {
                // Flow crosses the boundary of the loaded census; skip.
                continue;
            };
            flows[from_unit].push((to_unit, workers));
        }
        WorkerFlow { flows }
    }

    pub fn outbound(&self, unit: usize) -> &[(usize, u32)] {
        &self.flows[unit]
    }
}

/// Assigns work locations, workgroups, and work neighborhoods.
///
/// Agents left unassigned keep working in their home community with
/// workgroup 0 (non-worker).
pub fn assign_workers(
    store: &mut AgentStore,
    geom: &Geometry,
    demo: &DemographicData,
    maps: &CommunityMaps,
    flow: &WorkerFlow,
    seeds: &StreamSeeds,
) {
    // Working-age head count per unit, to turn the census day-worker totals
    // into a per-agent probability.
    let mut candidates = vec![0i64; demo.nunits()];
    for attrs in &store.attrs {
        if attrs.age_group == 2 || attrs.age_group == 3 {
            let cell = geom.cell_index(i64::from(attrs.home_i), i64::from(attrs.home_j));
            if maps.unit[cell] >= 0 {
                candidates[maps.unit[cell] as usize] += 1;
            }
        }
    }
    let p_worker: Vec<f64> = (0..demo.nunits())
        .map(|u| {
            if candidates[u] == 0 || flow.outbound(u).is_empty() {
                0.0
            } else {
                (demo.day_workers[u] as f64 / candidates[u] as f64).min(1.0)
            }
        })
        .collect();
    let flow_totals: Vec<u64> = (0..demo.nunits())
        .map(|u| flow.outbound(u).iter().map(|(_, w)| u64::from(*w)).sum())
        .collect();

    let workgroups_per_community = (COMMUNITY_SIZE / WORKGROUP_SIZE).max(1) as i32;
    let maps_unit = &maps.unit;

    store
        .attrs
        .par_iter_mut()
        .enumerate()
        .for_each(|(i, attrs)| {
            if attrs.age_group != 2 && attrs.age_group != 3 {
                return;
            }
            let cell = geom.cell_index(i64::from(attrs.home_i), i64::from(attrs.home_j));
            if maps_unit[cell] < 0 {
                return;
            }
            let unit = maps_unit[cell] as usize;
            if p_worker[unit] == 0.0 {
                return;
            }
            let mut rng = seeds.stream(i as u64, Usage::Workerflow);
            if rng.gen::<f64>() >= p_worker[unit] {
                return;
            }

            // Destination unit weighted by the outbound flows.
            let mut pick = rng.gen_range(0..flow_totals[unit]);
            let mut to_unit = flow.outbound(unit)[0].0;
            for (to, workers) in flow.outbound(unit) {
                if pick < u64::from(*workers) {
                    to_unit = *to;
                    break;
                }
                pick -= u64::from(*workers);
            }

            // Random community of the destination unit.
            let ncomm = demo.communities_in_unit(to_unit);
            let community = demo.start[to_unit] + rng.gen_range(0..ncomm);
            let (wi, wj) = geom.cell_coords(community as usize);
            attrs.work_i = wi as i32;
            attrs.work_j = wj as i32;
            attrs.workgroup = 1 + rng.gen_range(0..workgroups_per_community);
            attrs.work_nborhood = rng.gen_range(0..4);
        });
}
