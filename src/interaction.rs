//! Contact and transmission kernels.
//!
//! The full kernel walks every ordered pair of agents sharing a cell and
//! multiplies the receiver's running non-infection probability by one factor
//! per active mixing group (household, neighborhood cluster, community,
//! workgroup, neighborhood, school). Cells are processed in parallel; within a
//! cell the pair loop is sequential, so the per-agent product is independent
//! of scheduling. The commit pass then flips the probability and draws the
//! actual infections.
//!
//! A simplified strain-counting kernel serves the synthetic benchmark mode.

use crate::agents::{school, AgentAttrs, AgentStore, Status};
use crate::bins::Bins;
use crate::params::DiseaseParm;
use crate::rng::{StreamSeeds, Usage};
use rand::Rng;
use rayon::prelude::*;

/// Day phase; selects the bin set and the phase-gated transmission terms.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Night: household, cluster and neighborhood terms apply.
    Home,
    /// Day: workgroup and school terms apply.
    Work,
}

/// Per-strain infection rates of the simplified kernel. Deliberately fixed
/// rather than derived from `DiseaseParm::p_trans`: the benchmark mode keeps
/// its own calibration.
pub const DEMO_BETA: [f64; 2] = [1e-4, 2e-4];

/// True when the agent can still pass through the transmission checks: alive,
/// not immune, and not sitting in the incubation window.
fn participates(attrs: &AgentAttrs, counter: f64, incubation: f64) -> bool {
    match attrs.status {
        Status::Immune | Status::Dead => false,
        Status::Infected => counter >= incubation,
        _ => true,
    }
}

/// Non-infection factor contributed by transmitter `j` to receiver `i`
/// across every mixing group the pair shares. Transmission vectors are
/// indexed by the receiver's age group; the `_sc` tables apply when the
/// transmitter's school attribute is negative.
#[allow(clippy::too_many_arguments)]
fn pair_factor(
    a_i: &AgentAttrs,
    a_j: &AgentAttrs,
    parm: &DiseaseParm,
    infect: f64,
    daytime: bool,
    social_scale: f64,
    work_scale: f64,
) -> f64 {
    let receiver_age = a_i.age_group as usize;
    let school_closed = a_j.school < 0;
    let mut prob = 1.0;

    if a_i.nborhood == a_j.nborhood && a_i.family == a_j.family && !daytime {
        // Household.
        let table = if a_j.is_child() {
            if school_closed {
                &parm.xmit_child_sc
            } else {
                &parm.xmit_child
            }
        } else if school_closed {
            &parm.xmit_adult_sc
        } else {
            &parm.xmit_adult
        };
        prob *= 1.0 - infect * table[receiver_age];
    } else if a_i.nborhood == a_j.nborhood
        && !a_i.withdrawn
        && !a_j.withdrawn
        && a_i.family / 4 == a_j.family / 4
        && !daytime
    {
        // Neighborhood cluster of four adjacent families.
        let table = if a_j.is_child() {
            if school_closed {
                &parm.xmit_nc_child_sc
            } else {
                &parm.xmit_nc_child
            }
        } else if school_closed {
            &parm.xmit_nc_adult_sc
        } else {
            &parm.xmit_nc_adult
        };
        prob *= 1.0 - infect * table[receiver_age] * social_scale;
    }

    if !a_i.withdrawn && !a_j.withdrawn {
        // Community: both agents share this cell by construction.
        let table = if school_closed {
            &parm.xmit_comm_sc
        } else {
            &parm.xmit_comm
        };
        prob *= 1.0 - infect * table[receiver_age] * social_scale;

        if daytime
            && a_j.workgroup != 0
            && a_j.work_i >= 0
            && a_i.work_i >= 0
            && a_i.workgroup == a_j.workgroup
        {
            prob *= 1.0 - infect * parm.xmit_work * work_scale;
        }

        if a_i.nborhood == a_j.nborhood {
            let table = if school_closed {
                &parm.xmit_hood_sc
            } else {
                &parm.xmit_hood
            };
            prob *= 1.0 - infect * table[receiver_age] * social_scale;

            if a_i.school == a_j.school && daytime {
                if a_i.school > school::DAYCARE {
                    prob *= 1.0 - infect * parm.xmit_school[6] * social_scale;
                } else if a_i.school == school::DAYCARE {
                    prob *= 1.0 - infect * parm.xmit_school[5] * social_scale;
                }
            }
        }

        if a_i.school == a_j.school
            && daytime
            && a_i.school > school::NONE
            && a_i.school < school::DAYCARE
        {
            let s = a_i.school as usize;
            if a_i.is_child() {
                if a_j.is_child() {
                    prob *= 1.0 - infect * parm.xmit_school[s] * social_scale;
                } else {
                    // Teacher/staff to student.
                    prob *= 1.0 - infect * parm.xmit_sch_a2c[s] * social_scale;
                }
            } else if a_j.is_child() {
                // Student to teacher/staff.
                prob *= 1.0 - infect * parm.xmit_sch_c2a[s] * social_scale;
            }
        }
    }
    prob
}

/// Contact pass for one phase: folds every transmitter's contribution into
/// each susceptible receiver's `prob`. Bins must reflect the current
/// positions.
pub fn interact_home_work(store: &AgentStore, bins: &Bins, parm: &DiseaseParm, phase: Phase) {
    let daytime = phase == Phase::Work;
    let attrs = &store.attrs;
    let timers = &store.timers;
    let prob = &store.prob;
    let infect = parm.infect * parm.vac_eff;

    (0..bins.num_cells()).into_par_iter().for_each(|cell| {
        let members = bins.cell_agents(cell);
        if members.len() < 2 {
            return;
        }
        // Per-cell hooks; constant for now.
        let social_scale = 1.0;
        let work_scale = 1.0;

        for &i in members {
            let i = i as usize;
            let a_i = &attrs[i];
            if !participates(a_i, timers[i].disease_counter, timers[i].incubation_period) {
                continue;
            }
            let mut factor = 1.0;
            for &j in members {
                let j = j as usize;
                if i == j {
                    continue;
                }
                let a_j = &attrs[j];
                if !participates(a_j, timers[j].disease_counter, timers[j].incubation_period) {
                    continue;
                }
                if a_j.status == Status::Infected && a_i.status != Status::Infected {
                    factor *= pair_factor(a_i, a_j, parm, infect, daytime, social_scale, work_scale);
                }
            }
            if factor < 1.0 {
                prob[i].fetch_mul(factor);
            }
        }
    });
}

/// Commit pass: flips each agent's accumulated non-infection probability,
/// draws the infection, and samples the disease period lengths for the
/// newly infected.
pub fn infect_agents(store: &mut AgentStore, parm: &DiseaseParm, seeds: &StreamSeeds) {
    let prob = &store.prob;
    store
        .attrs
        .par_iter_mut()
        .zip(store.timers.par_iter_mut())
        .enumerate()
        .for_each(|(i, (attrs, timers))| {
            if !attrs.status.is_susceptible() {
                return;
            }
            let p_infect = 1.0 - prob[i].load();
            if p_infect <= 0.0 {
                return;
            }
            let mut rng = seeds.stream(i as u64, Usage::Infection);
            if rng.gen::<f64>() < p_infect {
                attrs.status = Status::Infected;
                timers.disease_counter = 0.0;
                let (incubation, infectious, symptomdev) = parm.sample_periods(&mut rng);
                timers.incubation_period = incubation;
                timers.infectious_period = infectious;
                timers.symptomdev_period = symptomdev;
            }
        });
}

/// Simplified per-cell kernel for the synthetic benchmark: counts the
/// infected per strain in each cell and infects everyone else at
/// `DEMO_BETA[strain] * count`, first strain checked first.
pub fn interact_cells(store: &mut AgentStore, bins: &Bins, parm: &DiseaseParm, seeds: &StreamSeeds) {
    let new_infections: Vec<(usize, u8)> = {
        let attrs = &store.attrs;
        (0..bins.num_cells())
            .into_par_iter()
            .flat_map_iter(|cell| {
                let members = bins.cell_agents(cell);
                let mut num_infected = [0usize; 2];
                for &p in members {
                    let a = &attrs[p as usize];
                    if a.status == Status::Infected {
                        num_infected[a.strain as usize] += 1;
                    }
                }
                let mut hits = Vec::new();
                if num_infected[0] + num_infected[1] > 0 {
                    let mut rng = seeds.stream(cell as u64, Usage::Contact);
                    for &p in members {
                        let index = p as usize;
                        let a = &attrs[index];
                        if a.status == Status::Infected
                            || a.status == Status::Immune
                            || a.status == Status::Dead
                        {
                            continue;
                        }
                        if rng.gen::<f64>() < DEMO_BETA[0] * num_infected[0] as f64 {
                            hits.push((index, 0u8));
                        } else if rng.gen::<f64>() < DEMO_BETA[1] * num_infected[1] as f64 {
                            hits.push((index, 1u8));
                        }
                    }
                }
                hits.into_iter()
            })
            .collect()
    };

    for (index, strain) in new_infections {
        let mut rng = seeds.stream(index as u64, Usage::Infection);
        let attrs = &mut store.attrs[index];
        attrs.status = Status::Infected;
        attrs.strain = strain;
        let timers = &mut store.timers[index];
        timers.disease_counter = 0.0;
        let (incubation, infectious, symptomdev) = parm.sample_periods(&mut rng);
        timers.incubation_period = incubation;
        timers.infectious_period = infectious;
        timers.symptomdev_period = symptomdev;
    }
}
