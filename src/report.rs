//! Model-level reports.
//!
//! CSV outputs with serde-serialized rows: a per-step totals file, periodic
//! per-FIPS aggregated counts, and a per-cell status table for snapshot
//! consumers. Rendering plotfiles from the cell table is left to external
//! tooling.

use crate::agents::{AgentStore, Status, NUM_STATUSES};
use crate::error::EpiError;
use crate::geometry::Geometry;
use crate::init_census::CommunityMaps;
use csv::Writer;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
struct TotalsRow {
    step: u64,
    never: u64,
    infected: u64,
    immune: u64,
    susceptible: u64,
    dead: u64,
}

/// Appends one row per step to `<name>.csv` with the five status totals.
pub struct TotalsReport {
    writer: Writer<File>,
}

impl TotalsReport {
    pub fn create(path: &Path) -> Result<Self, EpiError> {
        let file = File::create(path)?;
        Ok(TotalsReport {
            writer: Writer::from_writer(file),
        })
    }

    pub fn append(&mut self, step: u64, totals: &[u64; NUM_STATUSES]) -> Result<(), EpiError> {
        self.writer.serialize(TotalsRow {
            step,
            never: totals[Status::Never as usize],
            infected: totals[Status::Infected as usize],
            immune: totals[Status::Immune as usize],
            susceptible: totals[Status::Susceptible as usize],
            dead: totals[Status::Dead as usize],
        })?;
        self.writer.flush()?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct FipsRow {
    #[serde(rename = "FIPS")]
    fips: i32,
    never: u64,
    infected: u64,
    immune: u64,
    susceptible: u64,
    dead: u64,
}

/// Writes per-FIPS aggregated status counts to `"{prefix}_{step:05}.csv"`,
/// keyed by each agent's home community. Returns the written path.
pub fn write_fips_data(
    prefix: &Path,
    step: u64,
    store: &AgentStore,
    geom: &Geometry,
    maps: &CommunityMaps,
) -> Result<PathBuf, EpiError> {
    let mut by_fips: FxHashMap<i32, [u64; NUM_STATUSES]> = FxHashMap::default();
    for attrs in &store.attrs {
        let cell = geom.cell_index(i64::from(attrs.home_i), i64::from(attrs.home_j));
        let fips = maps.fips[cell];
        if fips >= 0 {
            let counts = by_fips.entry(fips).or_insert([0u64; NUM_STATUSES]);
            counts[attrs.status as usize] += 1;
        }
    }

    let path = PathBuf::from(format!("{}_{step:05}.csv", prefix.display()));
    let mut writer = Writer::from_writer(File::create(&path)?);
    let mut codes: Vec<i32> = by_fips.keys().copied().collect();
    codes.sort_unstable();
    for fips in codes {
        let counts = by_fips[&fips];
        writer.serialize(FipsRow {
            fips,
            never: counts[Status::Never as usize],
            infected: counts[Status::Infected as usize],
            immune: counts[Status::Immune as usize],
            susceptible: counts[Status::Susceptible as usize],
            dead: counts[Status::Dead as usize],
        })?;
    }
    writer.flush()?;
    Ok(path)
}

/// Per-cell status table keyed by current positions: for every cell,
/// `[total, never, infected, immune, susceptible]`.
pub fn generate_cell_data(store: &AgentStore, geom: &Geometry) -> Vec<[i64; 5]> {
    let mut cells = vec![[0i64; 5]; geom.ncells()];
    for (pos, attrs) in store.pos.iter().zip(&store.attrs) {
        let cell = geom.bin_cell(*pos);
        cells[cell][0] += 1;
        match attrs.status {
            Status::Never => cells[cell][1] += 1,
            Status::Infected => cells[cell][2] += 1,
            Status::Immune => cells[cell][3] += 1,
            Status::Susceptible => cells[cell][4] += 1,
            Status::Dead => {}
        }
    }
    cells
}

/// Writes the per-cell status table to `"{prefix}_cells_{step:05}.csv"`.
pub fn write_cell_data(
    prefix: &Path,
    step: u64,
    store: &AgentStore,
    geom: &Geometry,
) -> Result<PathBuf, EpiError> {
    #[derive(Serialize)]
    struct CellRow {
        i: i64,
        j: i64,
        total: i64,
        never: i64,
        infected: i64,
        immune: i64,
        susceptible: i64,
    }

    let cells = generate_cell_data(store, geom);
    let path = PathBuf::from(format!("{}_cells_{step:05}.csv", prefix.display()));
    let mut writer = Writer::from_writer(File::create(&path)?);
    for (cell, counts) in cells.iter().enumerate() {
        if counts[0] == 0 {
            continue;
        }
        let (i, j) = geom.cell_coords(cell);
        writer.serialize(CellRow {
            i,
            j,
            total: counts[0],
            never: counts[1],
            infected: counts[2],
            immune: counts[3],
            susceptible: counts[4],
        })?;
    }
    writer.flush()?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::AgentAttrs;
    use crate::geometry::Position;

    fn store_with(statuses: &[Status]) -> (AgentStore, Geometry) {
        let geom = Geometry::square(2, 1.0);
        let mut store = AgentStore::new();
        for (k, status) in statuses.iter().enumerate() {
            let mut attrs = AgentAttrs::resident(0, 0, 3, k as i32, 0);
            attrs.status = *status;
            store.push(geom.cell_center(0, 0), attrs);
        }
        (store, geom)
    }

    #[test]
    fn totals_report_writes_a_row_per_step() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("totals.csv");
        let mut report = TotalsReport::create(&path).unwrap();
        report.append(0, &[10, 1, 0, 0, 0]).unwrap();
        report.append(1, &[9, 2, 0, 0, 0]).unwrap();
        drop(report);

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "step,never,infected,immune,susceptible,dead");
        assert_eq!(lines[1], "0,10,1,0,0,0");
        assert_eq!(lines[2], "1,9,2,0,0,0");
    }

    #[test]
    fn cell_data_counts_by_current_cell() {
        let (mut store, geom) = store_with(&[
            Status::Never,
            Status::Infected,
            Status::Immune,
            Status::Dead,
        ]);
        // Move one agent to another cell.
        store.pos[1] = geom.cell_center(1, 1);
        let cells = generate_cell_data(&store, &geom);
        let home = geom.cell_index(0, 0);
        let away = geom.cell_index(1, 1);
        assert_eq!(cells[home], [3, 1, 0, 1, 0]);
        assert_eq!(cells[away], [1, 0, 1, 0, 0]);
        let total: i64 = cells.iter().map(|c| c[0]).sum();
        assert_eq!(total, 4);
    }

    #[test]
    fn fips_report_aggregates_by_home() {
        let (store, geom) = store_with(&[Status::Never, Status::Infected, Status::Never]);
        let mut maps = CommunityMaps::empty(geom.ncells());
        maps.fips[geom.cell_index(0, 0)] = 6001;

        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("agg");
        let path = write_fips_data(&prefix, 7, &store, &geom, &maps).unwrap();
        assert!(path.to_string_lossy().ends_with("agg_00007.csv"));
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "FIPS,never,infected,immune,susceptible,dead");
        assert_eq!(lines[1], "6001,2,1,0,0,0");
    }
}
