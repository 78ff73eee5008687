//! An agent-based epidemic simulator over a gridded population.
//!
//! The simulator advances a population of individual agents across a 2D grid
//! of "communities" through a daily cycle of movement, contact, transmission,
//! and disease progression. Each agent carries demographic attributes
//! (household, age group, neighborhood, school, workgroup, home and work
//! locations) and disease attributes (status, infection timers, sampled
//! incubation/infectious/symptom-development lengths).
//!
//! The engine is organized as data-parallel kernels over a
//! structure-of-arrays agent store:
//! * a demographic initializer that synthesizes household, age, and school
//!   structure from census tables (or a synthetic power-law layout for
//!   benchmarking),
//! * a binned spatial contact kernel computing per-agent infection
//!   probabilities from a multi-mixing-group transmission model,
//! * a stochastic disease-progression state machine with age-stratified
//!   hospitalization, ICU, ventilator, and death risks.
//!
//! All stochastic kernels draw from counter-based random streams keyed by
//! `(seed, step, index, usage)`, so runs replay bit-for-bit regardless of
//! thread count.

pub mod agents;
pub use agents::{AgentAttrs, AgentStore, AgentTimers, Status};

pub mod bins;
pub use bins::Bins;

pub mod cases;
pub use cases::{set_initial_cases, CaseData};

pub mod demographics;
pub use demographics::DemographicData;

pub mod error;
pub use error::EpiError;

pub mod geometry;
pub use geometry::{Geometry, Position};

pub mod init_census;
pub use init_census::{init_agents_census, CommunityMaps};

pub mod init_demo;
pub use init_demo::init_agents_demo;

pub mod interaction;
pub use interaction::{infect_agents, interact_cells, interact_home_work, Phase};

pub mod log;
pub use log::{disable_logging, enable_logging, set_log_level, LevelFilter};

pub mod movement;

pub mod params;
pub use params::{ContactParams, DiseaseConfig, DiseaseParm, IcType, SimConfig};

pub mod progression;
pub use progression::{update_status, DiseaseStats};

pub mod report;

pub mod rng;
pub use rng::StreamSeeds;

pub mod runner;
pub use runner::Simulation;

pub mod workerflow;
pub use workerflow::WorkerFlow;
