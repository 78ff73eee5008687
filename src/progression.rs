//! Daily disease progression.
//!
//! Advances every infected agent one day: counts down incubation, decides
//! hospitalization/ICU/ventilator at symptom onset with age-stratified risks,
//! walks the treatment timer through the ventilator (20), ICU (10) and ward
//! (0) milestones with tiered mortality, and recovers the non-hospitalized
//! once they stop being infectious. Per-community occupancy and death
//! counters are updated with atomic adds keyed by the agent's home cell.

use crate::agents::{AgentAttrs, AgentStore, AgentTimers, Status};
use crate::geometry::Geometry;
use crate::rng::{StreamSeeds, Usage};
use rand::rngs::StdRng;
use rand::Rng;
use rayon::prelude::*;
use std::sync::atomic::{AtomicI64, Ordering};

/// Symptomatic-to-hospital probability by age group.
pub const CHR: [f64; 5] = [0.0104, 0.0104, 0.070, 0.28, 1.0];
/// Hospital-to-ICU probability by age group.
pub const CIC: [f64; 5] = [0.24, 0.24, 0.24, 0.36, 0.35];
/// ICU-to-ventilator probability by age group.
pub const CVE: [f64; 5] = [0.12, 0.12, 0.12, 0.22, 0.22];
/// Ventilator-stage death probability by age group. Values above 1 encode
/// tiered mortality: the excess over 1 (over 2) is drawn again at the ICU
/// (ward) milestone. Each individual draw is clamped to [0, 1].
pub const CVF: [f64; 5] = [0.20, 0.20, 0.20, 0.45, 1.26];

/// Components of the per-community disease statistics.
pub mod stat {
    pub const HOSPITALIZATION: usize = 0;
    pub const ICU: usize = 1;
    pub const VENTILATOR: usize = 2;
    pub const DEATH: usize = 3;
    pub const NUM_COMPONENTS: usize = 4;
}

/// Per-cell hospitalization/ICU/ventilator occupancy and cumulative deaths.
#[derive(Debug)]
pub struct DiseaseStats {
    counts: Vec<AtomicI64>,
    ncells: usize,
}

impl DiseaseStats {
    pub fn new(ncells: usize) -> Self {
        DiseaseStats {
            counts: (0..ncells * stat::NUM_COMPONENTS)
                .map(|_| AtomicI64::new(0))
                .collect(),
            ncells,
        }
    }

    fn add(&self, cell: usize, component: usize, delta: i64) {
        self.counts[component * self.ncells + cell].fetch_add(delta, Ordering::Relaxed);
    }

    pub fn get(&self, cell: usize, component: usize) -> i64 {
        self.counts[component * self.ncells + cell].load(Ordering::Relaxed)
    }

    /// Totals over all cells, `(hospitalization, ICU, ventilator, death)`.
    pub fn totals(&self) -> [i64; stat::NUM_COMPONENTS] {
        let mut totals = [0i64; stat::NUM_COMPONENTS];
        for (component, total) in totals.iter_mut().enumerate() {
            *total = self.counts[component * self.ncells..(component + 1) * self.ncells]
                .iter()
                .map(|c| c.load(Ordering::Relaxed))
                .sum();
        }
        totals
    }
}

fn die(attrs: &mut AgentAttrs, timers: &mut AgentTimers, stats: &DiseaseStats, cell: usize) {
    attrs.status = Status::Dead;
    attrs.symptomatic = false;
    timers.treatment_timer = 0.0;
    stats.add(cell, stat::DEATH, 1);
}

/// Hospital stay length at admission, by age group. The 30-64 group splits
/// between the shorter under-50 stay and the longer 50-64 stay.
fn hospital_stay(age_group: u8, rng: &mut StdRng) -> f64 {
    match age_group {
        0..=2 => 3.0,
        4 => 7.0,
        _ => {
            if rng.gen::<f64>() < 0.57 {
                3.0
            } else {
                8.0
            }
        }
    }
}

/// Daily update of every agent's disease state. Also resets the per-step
/// non-infection probabilities ahead of the day's contact passes.
pub fn update_status(
    store: &mut AgentStore,
    geom: &Geometry,
    stats: &DiseaseStats,
    seeds: &StreamSeeds,
) {
    let prob = &store.prob;
    store
        .attrs
        .par_iter_mut()
        .zip(store.timers.par_iter_mut())
        .enumerate()
        .for_each(|(i, (attrs, timers))| {
            prob[i].store(1.0);
            if attrs.status != Status::Infected {
                return;
            }
            let age = attrs.age_group as usize;
            let cell = geom.cell_index(i64::from(attrs.home_i), i64::from(attrs.home_j));

            timers.disease_counter += 1.0;
            if timers.disease_counter < timers.incubation_period {
                return;
            }
            let mut rng = seeds.stream(i as u64, Usage::Progression);
            if timers.disease_counter == timers.incubation_period.ceil() {
                // Symptom onset: decide the hospital course once.
                attrs.symptomatic = true;
                if rng.gen::<f64>() < CHR[age] {
                    timers.treatment_timer = hospital_stay(attrs.age_group, &mut rng);
                    stats.add(cell, stat::HOSPITALIZATION, 1);
                    if rng.gen::<f64>() < CIC[age] {
                        timers.treatment_timer += 10.0;
                        stats.add(cell, stat::ICU, 1);
                        if rng.gen::<f64>() < CVE[age] {
                            timers.treatment_timer += 10.0;
                            stats.add(cell, stat::VENTILATOR, 1);
                        }
                    }
                }
            } else if timers.treatment_timer > 0.0 {
                timers.treatment_timer -= 1.0;
                if timers.treatment_timer == 20.0 {
                    // End of ventilator stage.
                    if rng.gen::<f64>() < CVF[age].min(1.0) {
                        die(attrs, timers, stats, cell);
                    }
                    stats.add(cell, stat::VENTILATOR, -1);
                } else if timers.treatment_timer == 10.0 {
                    // End of ICU stage.
                    if CVF[age] > 1.0 && rng.gen::<f64>() < (CVF[age] - 1.0).min(1.0) {
                        die(attrs, timers, stats, cell);
                    }
                    stats.add(cell, stat::ICU, -1);
                } else if timers.treatment_timer == 0.0 {
                    // End of ward stay.
                    if CVF[age] > 2.0 && rng.gen::<f64>() < (CVF[age] - 2.0).min(1.0) {
                        die(attrs, timers, stats, cell);
                    }
                    stats.add(cell, stat::HOSPITALIZATION, -1);
                    if attrs.status != Status::Dead {
                        attrs.status = Status::Immune;
                        attrs.symptomatic = false;
                    }
                }
            } else if timers.disease_counter >= timers.incubation_period + timers.infectious_period
            {
                // Never hospitalized; recover once no longer infectious.
                attrs.status = Status::Immune;
                attrs.symptomatic = false;
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Geometry;

    fn infected_store(n: usize, age_group: u8, incubation: f64, infectious: f64) -> AgentStore {
        let mut store = AgentStore::new();
        let geom = Geometry::square(1, 1.0);
        for k in 0..n {
            let mut attrs = AgentAttrs::resident(0, 0, age_group, k as i32, 0);
            attrs.status = Status::Infected;
            let index = store.push(geom.cell_center(0, 0), attrs) as usize;
            store.timers[index].incubation_period = incubation;
            store.timers[index].infectious_period = infectious;
            store.timers[index].symptomdev_period = incubation;
        }
        store
    }

    fn run_days(store: &mut AgentStore, stats: &DiseaseStats, days: u64) {
        let geom = Geometry::square(1, 1.0);
        let seeds = StreamSeeds::new(42);
        for step in 0..days {
            update_status(store, &geom, stats, &seeds.at_step(step));
        }
    }

    #[test]
    fn elderly_progression_marginals() {
        // 2000 agents aged 65+ with fixed periods: everyone is hospitalized
        // on the symptom-onset day, about 35% reach the ICU, about 22% of
        // those are ventilated, and the clamped ventilator-stage mortality
        // kills every ventilated patient.
        let n = 2000usize;
        let mut store = infected_store(n, 4, 3.0, 6.0);
        let stats = DiseaseStats::new(1);
        run_days(&mut store, &stats, 3);

        assert_eq!(stats.get(0, stat::HOSPITALIZATION), n as i64);
        let icu = stats.get(0, stat::ICU) as f64;
        let vent = stats.get(0, stat::VENTILATOR) as f64;
        let sigma_icu = (0.35f64 * 0.65 / n as f64).sqrt() * n as f64;
        assert!((icu - 0.35 * n as f64).abs() < 4.0 * sigma_icu);
        let sigma_vent = (0.22f64 * 0.78 / icu).sqrt() * icu;
        assert!((vent - 0.22 * icu).abs() < 4.0 * sigma_vent);

        // Walk far past every discharge milestone.
        run_days(&mut store, &stats, 40);
        let deaths = stats.totals()[stat::DEATH];
        assert!(deaths >= vent as i64, "all ventilated patients die");
        assert_eq!(stats.get(0, stat::VENTILATOR), 0);
        // Ventilator-stage deaths freeze before the ICU milestone, so the
        // ICU occupancy is left holding exactly those patients.
        assert_eq!(stats.get(0, stat::ICU), vent as i64);
    }

    #[test]
    fn treatment_timer_implies_infected() {
        let mut store = infected_store(500, 3, 3.0, 6.0);
        let stats = DiseaseStats::new(1);
        let geom = Geometry::square(1, 1.0);
        let seeds = StreamSeeds::new(42);
        for step in 0..40u64 {
            update_status(&mut store, &geom, &stats, &seeds.at_step(step));
            for (attrs, timers) in store.attrs.iter().zip(&store.timers) {
                if timers.treatment_timer > 0.0 {
                    assert_eq!(attrs.status, Status::Infected);
                }
            }
        }
    }

    #[test]
    fn death_is_terminal_and_conserves_totals() {
        let n = 2000usize;
        let mut store = infected_store(n, 4, 2.0, 5.0);
        let stats = DiseaseStats::new(1);
        let geom = Geometry::square(1, 1.0);
        let seeds = StreamSeeds::new(42);
        let mut dead_ids: std::collections::HashSet<u64> = std::collections::HashSet::new();
        for step in 0..45u64 {
            update_status(&mut store, &geom, &stats, &seeds.at_step(step));
            for (attrs, id) in store.attrs.iter().zip(&store.ids) {
                if dead_ids.contains(id) {
                    assert_eq!(attrs.status, Status::Dead);
                }
                if attrs.status == Status::Dead {
                    dead_ids.insert(*id);
                }
            }
            assert_eq!(store.status_totals().iter().sum::<u64>(), n as u64);
        }
        assert_eq!(
            store.status_totals()[Status::Dead as usize] as i64,
            stats.totals()[stat::DEATH]
        );
    }

    #[test]
    fn mild_cases_recover_after_infectious_period() {
        // Age group 0 with a 1% hospitalization risk: the non-hospitalized
        // turn immune exactly at incubation + infectious days.
        let n = 400usize;
        let mut store = infected_store(n, 0, 3.0, 6.0);
        let stats = DiseaseStats::new(1);
        run_days(&mut store, &stats, 3);
        // Admissions all happen on the onset day; remember who went in.
        let hospitalized: Vec<bool> = store
            .timers
            .iter()
            .map(|t| t.treatment_timer > 0.0)
            .collect();
        run_days(&mut store, &stats, 5);
        for (k, attrs) in store.attrs.iter().enumerate() {
            if !hospitalized[k] {
                assert_eq!(attrs.status, Status::Infected);
            }
        }
        run_days(&mut store, &stats, 20);
        for (k, attrs) in store.attrs.iter().enumerate() {
            if !hospitalized[k] {
                assert_eq!(attrs.status, Status::Immune);
                assert!(!attrs.symptomatic);
            }
        }
    }

    #[test]
    fn incubating_agents_do_not_progress() {
        let mut store = infected_store(10, 2, 5.0, 6.0);
        let stats = DiseaseStats::new(1);
        run_days(&mut store, &stats, 3);
        for (attrs, timers) in store.attrs.iter().zip(&store.timers) {
            assert_eq!(attrs.status, Status::Infected);
            assert_eq!(timers.treatment_timer, 0.0);
            assert!(!attrs.symptomatic);
            assert_eq!(timers.disease_counter, 3.0);
        }
        assert_eq!(stats.totals()[stat::HOSPITALIZATION], 0);
    }

    #[test]
    fn update_resets_probabilities() {
        let mut store = infected_store(5, 2, 5.0, 6.0);
        store.prob[0].store(0.3);
        let stats = DiseaseStats::new(1);
        run_days(&mut store, &stats, 1);
        assert!((store.prob[0].load() - 1.0).abs() < f64::EPSILON);
    }
}
