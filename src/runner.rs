//! Simulation driver.
//!
//! Composes the per-day cycle over the engine kernels. A census-mode day is:
//! disease progression (which also resets the transmission probabilities),
//! move to work and run the work-phase contact pass, move home and run the
//! home-phase pass, commit infections, and periodically send a small fraction
//! of agents on random long-distance travel. The synthetic benchmark mode
//! replaces the structured contact passes with a random walk and the
//! strain-counting cell kernel.
//!
//! Progression runs before the contact passes so that the disease counter of
//! a fresh infection starts advancing the day after the commit.

use crate::agents::{AgentStore, NUM_STATUSES};
use crate::bins::Bins;
use crate::cases::{set_initial_cases, CaseData};
use crate::demographics::DemographicData;
use crate::error::EpiError;
use crate::geometry::Geometry;
use crate::init_census::{init_agents_census, CommunityMaps};
use crate::init_demo::{init_agents_demo, DEMO_SEED_FRACTION};
use crate::interaction::{infect_agents, interact_cells, interact_home_work, Phase};
use crate::movement::{move_to_home, move_to_work, random_travel, random_walk};
use crate::params::{DiseaseParm, IcType, SimConfig};
use crate::progression::{update_status, DiseaseStats};
use crate::rng::StreamSeeds;
use crate::workerflow::{assign_workers, WorkerFlow};

pub struct Simulation {
    config: SimConfig,
    geom: Geometry,
    store: AgentStore,
    maps: CommunityMaps,
    parm: DiseaseParm,
    stats: DiseaseStats,
    seeds: StreamSeeds,
    step: u64,
    bins_home: Option<Bins>,
    bins_work: Option<Bins>,
}

impl Simulation {
    /// Builds the initial population for the configured initial condition.
    pub fn from_config(config: SimConfig, seed: u64) -> Result<Self, EpiError> {
        config.validate()?;
        let parm = DiseaseParm::from_config(&config.contact, &config.disease);
        let seeds = StreamSeeds::new(seed);

        let (geom, store, maps) = match config.ic_type {
            IcType::Demo => {
                let geom = Geometry::square(config.size, 1.0);
                let store = init_agents_demo(&geom, &parm, &seeds, DEMO_SEED_FRACTION);
                let maps = CommunityMaps::empty(geom.ncells());
                (geom, store, maps)
            }
            IcType::Census => {
                let census = config
                    .census_filename
                    .as_ref()
                    .ok_or_else(|| EpiError::from("census initial condition needs a census file"))?;
                let demo = DemographicData::from_file(census)?;
                let geom = Geometry::for_communities(demo.ncommunity as usize);
                let (mut store, maps) = init_agents_census(&geom, &demo, &seeds);

                if let Some(path) = &config.workerflow_filename {
                    let flow = WorkerFlow::from_file(path, &demo)?;
                    assign_workers(&mut store, &geom, &demo, &maps, &flow, &seeds);
                }
                if let Some(path) = &config.case_filename {
                    let cases = CaseData::from_file(path)?;
                    let infected =
                        set_initial_cases(&mut store, &geom, &maps, &cases, &parm, &seeds);
                    log::info!("seeded {infected} initial cases");
                }
                (geom, store, maps)
            }
        };
        log::info!(
            "initialized {} agents on a {}x{} grid",
            store.len(),
            geom.nx(),
            geom.ny()
        );

        let stats = DiseaseStats::new(geom.ncells());
        Ok(Simulation {
            config,
            geom,
            store,
            maps,
            parm,
            stats,
            seeds,
            step: 0,
            bins_home: None,
            bins_work: None,
        })
    }

    /// Advances the simulation one day.
    pub fn step(&mut self) {
        let seeds = self.seeds.at_step(self.step);
        update_status(&mut self.store, &self.geom, &self.stats, &seeds);

        match self.config.ic_type {
            IcType::Demo => {
                random_walk(&mut self.store, &self.geom, &seeds);
                let bins = Bins::build(&self.geom, &self.store.pos);
                interact_cells(&mut self.store, &bins, &self.parm, &seeds);
                self.bins_home = None;
                self.bins_work = None;
            }
            IcType::Census => {
                move_to_work(&mut self.store, &self.geom);
                let work_bins = self
                    .bins_work
                    .get_or_insert_with(|| Bins::build(&self.geom, &self.store.pos));
                interact_home_work(&self.store, work_bins, &self.parm, Phase::Work);

                move_to_home(&mut self.store, &self.geom);
                let home_bins = self
                    .bins_home
                    .get_or_insert_with(|| Bins::build(&self.geom, &self.store.pos));
                interact_home_work(&self.store, home_bins, &self.parm, Phase::Home);

                infect_agents(&mut self.store, &self.parm, &seeds);
            }
        }

        let travel_int = self.config.random_travel_int;
        if travel_int > 0 && (self.step + 1) % travel_int as u64 == 0 {
            random_travel(&mut self.store, &self.geom, &seeds);
            // Travel perturbs cell membership; both bin sets are stale.
            self.bins_home = None;
            self.bins_work = None;
        }
        self.step += 1;
    }

    pub fn run(&mut self, nsteps: usize) {
        for _ in 0..nsteps {
            self.step();
        }
    }

    pub fn current_step(&self) -> u64 {
        self.step
    }

    pub fn totals(&self) -> [u64; NUM_STATUSES] {
        self.store.status_totals()
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geom
    }

    pub fn store(&self) -> &AgentStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut AgentStore {
        &mut self.store
    }

    pub fn community_maps(&self) -> &CommunityMaps {
        &self.maps
    }

    pub fn disease_stats(&self) -> &DiseaseStats {
        &self.stats
    }

    pub fn disease_parm(&self) -> &DiseaseParm {
        &self.parm
    }

    /// Mutable parameter access for calibration and experiments.
    pub fn disease_parm_mut(&mut self) -> &mut DiseaseParm {
        &mut self.parm
    }
}
