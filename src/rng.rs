//! Reproducible random number streams for data-parallel kernels.
//!
//! Every stochastic kernel draws from a short-lived [`rand::rngs::StdRng`]
//! seeded from `(global_seed, step, index, usage)`. The index is whatever the
//! kernel fans out over (an agent, a cell, or a `(cell, component)` slot), so
//! two runs with the same seed produce identical draws regardless of thread
//! count or scheduling order. Thread-local generators are never used.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};

/// Identifies which kernel a stream belongs to, so that different kernels
/// visiting the same `(step, index)` get independent draws.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum Usage {
    Households,
    Ages,
    DemoLayout,
    DemoSeeding,
    CaseSeeding,
    Workerflow,
    RandomWalk,
    RandomTravel,
    Contact,
    Infection,
    Progression,
}

/// Stream factory carrying the run-wide seed and the current step.
#[derive(Clone, Copy, Debug)]
pub struct StreamSeeds {
    seed: u64,
    step: u64,
}

impl StreamSeeds {
    pub fn new(seed: u64) -> Self {
        StreamSeeds { seed, step: 0 }
    }

    /// Returns a copy keyed to the given step.
    #[must_use]
    pub fn at_step(&self, step: u64) -> Self {
        StreamSeeds {
            seed: self.seed,
            step,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// An independent stream for one unit of parallel work. `FxHasher` is
    /// deterministic across platforms and runs, unlike the std `RandomState`.
    pub fn stream(&self, index: u64, usage: Usage) -> StdRng {
        let mut hasher = FxHasher::default();
        (self.step, index, usage).hash(&mut hasher);
        StdRng::seed_from_u64(self.seed ^ hasher.finish())
    }
}
