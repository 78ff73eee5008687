//! The agent store.
//!
//! Agents live in a structure-of-arrays collection: one record of integer
//! attributes, one record of real-valued timers, plus the position and the
//! per-step non-infection probability. The probability is an atomic f64 so the
//! contact kernel can combine factors from concurrent workers; everything else
//! is updated by embarrassingly parallel per-agent passes.

use crate::geometry::Position;
use rayon::prelude::*;
use std::sync::atomic::{AtomicU64, Ordering};

/// Disease status. `Dead` is terminal; the record persists but no kernel
/// transitions it further.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Status {
    /// Never infected.
    Never = 0,
    Infected,
    /// No longer infected, immune.
    Immune,
    /// No longer infected, no longer immune.
    Susceptible,
    Dead,
}

pub const NUM_STATUSES: usize = 5;

impl Status {
    /// A susceptible agent can acquire infection.
    pub fn is_susceptible(self) -> bool {
        matches!(self, Status::Never | Status::Susceptible)
    }
}

/// School attribute encoding. Also doubles as "not attending" marker: any
/// negative value selects the school-closed contact tables.
pub mod school {
    /// Child not enrolled anywhere (or adult not working at a school when
    /// negative).
    pub const NONE: i32 = 0;
    pub const HIGH: i32 = 1;
    pub const MIDDLE: i32 = 2;
    /// Elementary school for neighborhoods 0 and 1.
    pub const ELEM_A: i32 = 3;
    /// Elementary school for neighborhoods 2 and 3.
    pub const ELEM_B: i32 = 4;
    /// Neighborhood daycare center.
    pub const DAYCARE: i32 = 5;
    /// Neighborhood playgroups start here.
    pub const PLAYGROUP: i32 = 6;
    /// Adults carry this unless they work at a school.
    pub const NOT_ASSIGNED: i32 = -1;
}

/// Integer attributes of one agent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AgentAttrs {
    pub status: Status,
    /// Virus strain carried while infected.
    pub strain: u8,
    /// Age group: 0 under 5, 1 is 5-17, 2 is 18-29, 3 is 30-64, 4 is 65+.
    pub age_group: u8,
    /// Family id, unique across the tile; `family / 4` is the neighborhood
    /// cluster.
    pub family: i32,
    pub home_i: i32,
    pub home_j: i32,
    pub work_i: i32,
    pub work_j: i32,
    /// Home neighborhood, 0-3.
    pub nborhood: i32,
    pub work_nborhood: i32,
    /// See [`school`].
    pub school: i32,
    /// Community-wide workgroup tag; 0 marks a non-worker.
    pub workgroup: i32,
    /// Isolation/quarantine flag; suppresses cluster and community mixing.
    pub withdrawn: bool,
    pub symptomatic: bool,
}

impl AgentAttrs {
    /// A resident of cell `(i, j)` before any workerflow assignment: home and
    /// work coincide, no workgroup, never infected.
    pub fn resident(i: i64, j: i64, age_group: u8, family: i32, nborhood: i32) -> Self {
        AgentAttrs {
            status: Status::Never,
            strain: 0,
            age_group,
            family,
            home_i: i as i32,
            home_j: j as i32,
            work_i: i as i32,
            work_j: j as i32,
            nborhood,
            work_nborhood: 5 * nborhood,
            school: school::NOT_ASSIGNED,
            workgroup: 0,
            withdrawn: false,
            symptomatic: false,
        }
    }

    pub fn is_child(&self) -> bool {
        self.age_group <= 1
    }
}

/// Real-valued per-agent disease state. The three period fields are sampled
/// at infection time; `disease_counter` counts days since infection and
/// `treatment_timer` counts down a hospital stay.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AgentTimers {
    pub disease_counter: f64,
    pub treatment_timer: f64,
    pub incubation_period: f64,
    pub infectious_period: f64,
    pub symptomdev_period: f64,
}

/// f64 with an atomic multiplicative combine, stored as the bit pattern in an
/// `AtomicU64` and updated with a compare-exchange loop.
#[derive(Debug)]
pub struct AtomicF64(AtomicU64);

impl AtomicF64 {
    pub fn new(value: f64) -> Self {
        AtomicF64(AtomicU64::new(value.to_bits()))
    }

    pub fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    pub fn store(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }

    /// Atomically multiplies the stored value by `factor`.
    pub fn fetch_mul(&self, factor: f64) {
        let mut current = self.0.load(Ordering::Relaxed);
        loop {
            let next = (f64::from_bits(current) * factor).to_bits();
            match self
                .0
                .compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => return,
                Err(observed) => current = observed,
            }
        }
    }
}

/// Grid-partitioned structure-of-arrays agent collection.
#[derive(Debug, Default)]
pub struct AgentStore {
    pub ids: Vec<u64>,
    pub pos: Vec<Position>,
    pub attrs: Vec<AgentAttrs>,
    pub timers: Vec<AgentTimers>,
    /// Per-step probability of *not* being infected; reset to 1 daily.
    pub prob: Vec<AtomicF64>,
    next_id: u64,
}

impl AgentStore {
    pub fn new() -> Self {
        AgentStore::default()
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    pub fn reserve(&mut self, additional: usize) {
        self.ids.reserve(additional);
        self.pos.reserve(additional);
        self.attrs.reserve(additional);
        self.timers.reserve(additional);
        self.prob.reserve(additional);
    }

    /// Creates one agent. Ids are assigned once and never reused; death only
    /// flips the status.
    pub fn push(&mut self, pos: Position, attrs: AgentAttrs) -> u64 {
        let id = self.next_id;
        self.next_id = self
            .next_id
            .checked_add(1)
            .expect("overflow on agent id numbers");
        self.ids.push(id);
        self.pos.push(pos);
        self.attrs.push(attrs);
        self.timers.push(AgentTimers::default());
        self.prob.push(AtomicF64::new(1.0));
        id
    }

    /// Per-status totals `(never, infected, immune, susceptible, dead)`.
    pub fn status_totals(&self) -> [u64; NUM_STATUSES] {
        self.attrs
            .par_iter()
            .fold(
                || [0u64; NUM_STATUSES],
                |mut acc, attrs| {
                    acc[attrs.status as usize] += 1;
                    acc
                },
            )
            .reduce(
                || [0u64; NUM_STATUSES],
                |mut a, b| {
                    for (slot, n) in a.iter_mut().zip(b) {
                        *slot += n;
                    }
                    a
                },
            )
    }

    /// Resets every agent's running non-infection probability to 1.
    pub fn reset_transmission_probs(&self) {
        self.prob.par_iter().for_each(|p| p.store(1.0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn any_attrs(status: Status) -> AgentAttrs {
        let mut attrs = AgentAttrs::resident(0, 0, 3, 0, 0);
        attrs.status = status;
        attrs
    }

    #[test]
    fn ids_are_unique_and_sequential() {
        let mut store = AgentStore::new();
        for expected in 0..10u64 {
            let id = store.push(Position::default(), any_attrs(Status::Never));
            assert_eq!(id, expected);
        }
        assert_eq!(store.len(), 10);
    }

    #[test]
    fn status_totals_count_every_agent() {
        let mut store = AgentStore::new();
        for status in [
            Status::Never,
            Status::Never,
            Status::Infected,
            Status::Immune,
            Status::Dead,
        ] {
            store.push(Position::default(), any_attrs(status));
        }
        let totals = store.status_totals();
        assert_eq!(totals, [2, 1, 1, 0, 1]);
        assert_eq!(totals.iter().sum::<u64>(), store.len() as u64);
    }

    #[test]
    fn atomic_f64_multiplies() {
        let prob = AtomicF64::new(1.0);
        prob.fetch_mul(0.5);
        prob.fetch_mul(0.5);
        assert!((prob.load() - 0.25).abs() < 1e-15);
    }

    #[test]
    fn atomic_f64_concurrent_product() {
        let prob = AtomicF64::new(1.0);
        let factors: Vec<f64> = (0..1000).map(|i| 1.0 - 1e-5 * f64::from(i % 7)).collect();
        factors.par_iter().for_each(|f| prob.fetch_mul(*f));
        let expected: f64 = factors.iter().product();
        assert!((prob.load() - expected).abs() < 1e-9);
    }

    #[test]
    fn reset_probs() {
        let mut store = AgentStore::new();
        store.push(Position::default(), any_attrs(Status::Never));
        store.prob[0].store(0.25);
        store.reset_transmission_probs();
        assert!((store.prob[0].load() - 1.0).abs() < f64::EPSILON);
    }
}
