//! Census-derived demographic tables.
//!
//! One row per census "unit" (an administrative region spanning one or more
//! communities). The tables are loaded once at startup and shared read-only by
//! the initializer and the workerflow assignment.
//!
//! File format: ASCII, the first line holds the number of units, then one unit
//! per line with whitespace-separated fields
//! `ID population day_workers FIPS tract N<5 N5-17 N18-29 N30-64 N65+ H1..H7`.

use crate::error::EpiError;
use std::fs;
use std::path::Path;

/// Standard community size in residents.
pub const COMMUNITY_SIZE: i64 = 2000;

/// Number of fields in one census row.
const NUM_FIELDS: usize = 17;

#[derive(Clone, Debug, Default)]
pub struct DemographicData {
    /// US-wide census tract id, referenced by the workerflow file.
    pub my_id: Vec<i64>,
    pub population: Vec<i64>,
    pub day_workers: Vec<i64>,
    pub fips: Vec<i64>,
    pub tract: Vec<i64>,
    /// Residents per age group (<5, 5-17, 18-29, 30-64, 65+).
    pub age_pop: Vec<[i64; 5]>,
    /// Household counts by size 1-7.
    pub households: Vec<[i64; 7]>,
    /// Exclusive prefix over per-unit community counts; length `nunits + 1`.
    pub start: Vec<i64>,
    /// Total number of communities across all units.
    pub ncommunity: i64,
}

impl DemographicData {
    pub fn from_file(path: &Path) -> Result<Self, EpiError> {
        let text = fs::read_to_string(path).map_err(|e| {
            EpiError::EpiError(format!("cannot read census file {}: {e}", path.display()))
        })?;
        Self::from_text(&text)
    }

    pub fn from_text(text: &str) -> Result<Self, EpiError> {
        let mut lines = text.lines().filter(|l| !l.trim().is_empty());
        let nunits: usize = lines
            .next()
            .ok_or_else(|| EpiError::from("census file is empty"))?
            .trim()
            .parse()?;

        let mut demo = DemographicData::default();
        for (row, line) in lines.enumerate() {
            if row >= nunits {
                return Err(EpiError::EpiError(format!(
                    "census file has more than the declared {nunits} units"
                )));
            }
            let fields: Vec<i64> = line
                .split_whitespace()
                .map(str::parse)
                .collect::<Result<_, _>>()?;
            if fields.len() != NUM_FIELDS {
                return Err(EpiError::EpiError(format!(
                    "census unit {row}: expected {NUM_FIELDS} fields, got {}",
                    fields.len()
                )));
            }
            demo.my_id.push(fields[0]);
            demo.population.push(fields[1]);
            demo.day_workers.push(fields[2]);
            demo.fips.push(fields[3]);
            demo.tract.push(fields[4]);
            demo.age_pop.push([
                fields[5], fields[6], fields[7], fields[8], fields[9],
            ]);
            demo.households.push([
                fields[10], fields[11], fields[12], fields[13], fields[14], fields[15], fields[16],
            ]);
        }
        if demo.nunits() != nunits {
            return Err(EpiError::EpiError(format!(
                "census file declares {nunits} units but contains {}",
                demo.nunits()
            )));
        }
        demo.compute_community_starts();
        Ok(demo)
    }

    pub fn nunits(&self) -> usize {
        self.population.len()
    }

    /// Unit owning a community, or `None` past the last community.
    pub fn unit_of_community(&self, community: i64) -> Option<usize> {
        if community < 0 || community >= self.ncommunity {
            return None;
        }
        // start is sorted; the partition point is the first unit starting
        // beyond the community.
        let unit = self.start.partition_point(|s| *s <= community);
        Some(unit - 1)
    }

    /// Number of communities assigned to `unit`.
    pub fn communities_in_unit(&self, unit: usize) -> i64 {
        self.start[unit + 1] - self.start[unit]
    }

    /// Communities hold [`COMMUNITY_SIZE`] residents; a unit gets one
    /// community per started block of that size, and always at least one.
    fn compute_community_starts(&mut self) {
        self.start.clear();
        self.start.push(0);
        for pop in &self.population {
            let ncomm = ((pop + COMMUNITY_SIZE - 1) / COMMUNITY_SIZE).max(1);
            self.start.push(self.start.last().unwrap() + ncomm);
        }
        self.ncommunity = *self.start.last().unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) const SAMPLE: &str = "\
3
100100 5000 1200 6001 400100 300 900 800 2200 800 400 600 300 200 60 30 10
100200 2500 600 6001 400200 150 450 400 1100 400 200 300 150 100 30 15 5
100300 900 200 6003 400300 50 150 150 400 150 80 100 50 40 10 5 2
";

    #[test]
    fn parses_sample() {
        let demo = DemographicData::from_text(SAMPLE).unwrap();
        assert_eq!(demo.nunits(), 3);
        assert_eq!(demo.population, vec![5000, 2500, 900]);
        assert_eq!(demo.fips, vec![6001, 6001, 6003]);
        assert_eq!(demo.age_pop[0], [300, 900, 800, 2200, 800]);
        assert_eq!(demo.households[2], [80, 100, 50, 40, 10, 5, 2]);
    }

    #[test]
    fn community_starts() {
        let demo = DemographicData::from_text(SAMPLE).unwrap();
        // 5000 -> 3 communities, 2500 -> 2, 900 -> 1.
        assert_eq!(demo.start, vec![0, 3, 5, 6]);
        assert_eq!(demo.ncommunity, 6);
        assert_eq!(demo.communities_in_unit(0), 3);
    }

    #[test]
    fn unit_lookup() {
        let demo = DemographicData::from_text(SAMPLE).unwrap();
        assert_eq!(demo.unit_of_community(0), Some(0));
        assert_eq!(demo.unit_of_community(2), Some(0));
        assert_eq!(demo.unit_of_community(3), Some(1));
        assert_eq!(demo.unit_of_community(5), Some(2));
        assert_eq!(demo.unit_of_community(6), None);
    }

    #[test]
    fn rejects_short_rows() {
        let text = "1\n100100 5000 1200 6001\n";
        assert!(DemographicData::from_text(text).is_err());
    }

    #[test]
    fn rejects_extra_rows() {
        let mut text = String::from("2\n");
        for _ in 0..3 {
            text.push_str(
                "100100 5000 1200 6001 400100 300 900 800 2200 800 400 600 300 200 60 30 10\n",
            );
        }
        assert!(DemographicData::from_text(&text).is_err());
    }

    #[test]
    fn reads_from_file() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{SAMPLE}").unwrap();
        let demo = DemographicData::from_file(file.path()).unwrap();
        assert_eq!(demo.nunits(), 3);
    }
}
