//! Initial case data.
//!
//! ASCII file with three whitespace-separated columns per row: FIPS code,
//! current number of cases, and cumulative cases to date. Each row describes
//! one disease hub whose current cases are seeded over the communities of the
//! matching census units.

use crate::agents::{AgentStore, Status};
use crate::error::EpiError;
use crate::geometry::Geometry;
use crate::init_census::CommunityMaps;
use crate::params::DiseaseParm;
use crate::rng::{StreamSeeds, Usage};
use rand::Rng;
use rustc_hash::FxHashMap;
use std::fs;
use std::path::Path;

#[derive(Clone, Debug, Default)]
pub struct CaseData {
    pub fips_hubs: Vec<i64>,
    pub num_cases: Vec<i64>,
    pub num_cases2date: Vec<i64>,
}

impl CaseData {
    pub fn from_file(path: &Path) -> Result<Self, EpiError> {
        let text = fs::read_to_string(path).map_err(|e| {
            EpiError::EpiError(format!("cannot read case file {}: {e}", path.display()))
        })?;
        Self::from_text(&text)
    }

    pub fn from_text(text: &str) -> Result<Self, EpiError> {
        let mut cases = CaseData::default();
        for (row, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<i64> = line
                .split_whitespace()
                .map(str::parse)
                .collect::<Result<_, _>>()?;
            if fields.len() != 3 {
                return Err(EpiError::EpiError(format!(
                    "case file row {row}: expected 3 fields, got {}",
                    fields.len()
                )));
            }
            cases.fips_hubs.push(fields[0]);
            cases.num_cases.push(fields[1]);
            cases.num_cases2date.push(fields[2]);
        }
        Ok(cases)
    }

    pub fn num_hubs(&self) -> usize {
        self.fips_hubs.len()
    }
}

/// Seeds each hub's current cases over the communities sharing its FIPS code:
/// picks that many distinct never-infected residents at random and infects
/// them with freshly sampled period lengths. Returns the number of agents
/// actually infected (a hub can run out of residents).
pub fn set_initial_cases(
    store: &mut AgentStore,
    geom: &Geometry,
    maps: &CommunityMaps,
    cases: &CaseData,
    parm: &DiseaseParm,
    seeds: &StreamSeeds,
) -> u64 {
    // Never-infected residents bucketed by the FIPS code of their home cell.
    let mut residents: FxHashMap<i64, Vec<u32>> = FxHashMap::default();
    for (index, attrs) in store.attrs.iter().enumerate() {
        if attrs.status != Status::Never {
            continue;
        }
        let cell = geom.cell_index(i64::from(attrs.home_i), i64::from(attrs.home_j));
        let fips = maps.fips[cell];
        if fips >= 0 {
            residents
                .entry(i64::from(fips))
                .or_default()
                .push(index as u32);
        }
    }

    let mut infected = 0u64;
    for hub in 0..cases.num_hubs() {
        let target = cases.num_cases[hub].max(0) as usize;
        let Some(pool) = residents.get_mut(&cases.fips_hubs[hub]) else {
            log::warn!(
                "case hub FIPS {} has no residents on this domain",
                cases.fips_hubs[hub]
            );
            continue;
        };
        let mut rng = seeds.stream(hub as u64, Usage::CaseSeeding);
        let chosen = target.min(pool.len());
        // Partial Fisher-Yates: the first `chosen` entries become the sample.
        for k in 0..chosen {
            let swap = rng.gen_range(k..pool.len());
            pool.swap(k, swap);
            let index = pool[k] as usize;
            let attrs = &mut store.attrs[index];
            attrs.status = Status::Infected;
            attrs.strain = 0;
            let timers = &mut store.timers[index];
            timers.disease_counter = 0.0;
            let (incubation, infectious, symptomdev) = parm.sample_periods(&mut rng);
            timers.incubation_period = incubation;
            timers.infectious_period = infectious;
            timers.symptomdev_period = symptomdev;
            infected += 1;
        }
    }
    infected
}
