//! Run configuration and disease parameters.
//!
//! Configuration is a JSON document deserialized into [`SimConfig`]. The raw
//! per-venue contact multipliers and per-strain transmission inputs are folded
//! into an immutable [`DiseaseParm`] table once at startup; kernels share it
//! by reference and never mutate it.

use crate::error::EpiError;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Lower clamp for Normal-sampled period lengths, in days. Guards against
/// instant-infectious agents from negative samples.
pub const MIN_PERIOD_LENGTH: f64 = 0.5;

/// Per-venue contact multipliers applied to the transmission tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactParams {
    /// School contact multiplier.
    pub p_sc: f64,
    /// Community contact multiplier.
    pub p_co: f64,
    /// Neighborhood contact multiplier.
    pub p_nh: f64,
    /// Workplace contact multiplier.
    pub p_wo: f64,
    /// Household (family) contact multiplier.
    pub p_fa: f64,
    /// Bar/restaurant contact multiplier; negative disables the venue.
    pub p_bar: f64,
}

impl Default for ContactParams {
    fn default() -> Self {
        ContactParams {
            p_sc: 1.0,
            p_co: 1.0,
            p_nh: 1.0,
            p_wo: 1.0,
            p_fa: 1.0,
            p_bar: -1.0,
        }
    }
}

/// Raw disease inputs as they appear in the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiseaseConfig {
    pub nstrain: usize,
    pub reinfect_prob: f64,
    pub vac_eff: f64,
    /// Per-strain transmission probability.
    pub p_trans: Vec<f64>,
    /// Per-strain probability of an asymptomatic course.
    pub p_asymp: Vec<f64>,
    /// Per-strain infectiousness reduction while asymptomatic.
    pub reduced_inf: Vec<f64>,
    pub incubation_length_mean: f64,
    pub incubation_length_std: f64,
    pub infectious_length_mean: f64,
    pub infectious_length_std: f64,
    pub symptomdev_length_mean: f64,
    pub symptomdev_length_std: f64,
}

impl Default for DiseaseConfig {
    fn default() -> Self {
        DiseaseConfig {
            nstrain: 2,
            reinfect_prob: 0.0,
            vac_eff: 1.0,
            p_trans: vec![0.20, 0.30],
            p_asymp: vec![0.40, 0.40],
            reduced_inf: vec![0.75, 0.75],
            incubation_length_mean: 3.0,
            incubation_length_std: 1.0,
            infectious_length_mean: 6.0,
            infectious_length_std: 1.0,
            symptomdev_length_mean: 5.0,
            symptomdev_length_std: 1.0,
        }
    }
}

/// Initial-condition flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IcType {
    /// Synthetic power-law population for benchmarking.
    Demo,
    /// Population synthesized from census tables.
    Census,
}

/// Top-level run configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub contact: ContactParams,
    pub disease: DiseaseConfig,
    /// Grid edge length in cells; used only for `IcType::Demo`.
    pub size: usize,
    /// Box edge for domain decomposition; accepted for compatibility with
    /// external partitioners, unused by the single-worker engine.
    pub max_grid_size: usize,
    pub nsteps: usize,
    /// Interval between cell-data snapshots; non-positive disables them.
    pub plot_int: i64,
    /// Interval between random long-distance travel passes; non-positive
    /// disables travel.
    pub random_travel_int: i64,
    pub ic_type: IcType,
    pub census_filename: Option<PathBuf>,
    pub workerflow_filename: Option<PathBuf>,
    pub case_filename: Option<PathBuf>,
    /// Interval between aggregated per-FIPS reports; non-positive disables them.
    pub aggregated_diag_int: i64,
    pub aggregated_diag_prefix: String,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            contact: ContactParams::default(),
            disease: DiseaseConfig::default(),
            size: 3000,
            max_grid_size: 16,
            nsteps: 120,
            plot_int: -1,
            random_travel_int: -1,
            ic_type: IcType::Demo,
            census_filename: None,
            workerflow_filename: None,
            case_filename: None,
            aggregated_diag_int: -1,
            aggregated_diag_prefix: "cases".to_string(),
        }
    }
}

impl SimConfig {
    /// Reads and validates a configuration file.
    pub fn from_file(path: &Path) -> Result<Self, EpiError> {
        let text = fs::read_to_string(path)?;
        let config: SimConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Fails fast on inconsistent input rather than surfacing it later as a
    /// kernel assertion.
    pub fn validate(&self) -> Result<(), EpiError> {
        let d = &self.disease;
        if d.nstrain < 1 || d.nstrain > 2 {
            return Err(EpiError::EpiError(format!(
                "disease.nstrain must be 1 or 2, got {}",
                d.nstrain
            )));
        }
        for (name, v) in [
            ("p_trans", &d.p_trans),
            ("p_asymp", &d.p_asymp),
            ("reduced_inf", &d.reduced_inf),
        ] {
            if v.len() < d.nstrain {
                return Err(EpiError::EpiError(format!(
                    "disease.{name} must have {} entries, got {}",
                    d.nstrain,
                    v.len()
                )));
            }
            if v.iter().any(|p| !(0.0..=1.0).contains(p)) {
                return Err(EpiError::EpiError(format!(
                    "disease.{name} entries must lie in [0, 1]"
                )));
            }
        }
        if !(0.0..=1.0).contains(&d.reinfect_prob) {
            return Err(EpiError::EpiError(
                "disease.reinfect_prob must lie in [0, 1]".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&d.vac_eff) {
            return Err(EpiError::EpiError(
                "disease.vac_eff must lie in [0, 1]".to_string(),
            ));
        }
        for (name, mean, std) in [
            (
                "incubation_length",
                d.incubation_length_mean,
                d.incubation_length_std,
            ),
            (
                "infectious_length",
                d.infectious_length_mean,
                d.infectious_length_std,
            ),
            (
                "symptomdev_length",
                d.symptomdev_length_mean,
                d.symptomdev_length_std,
            ),
        ] {
            if mean <= 0.0 || std < 0.0 {
                return Err(EpiError::EpiError(format!(
                    "disease.{name} mean must be positive and std non-negative"
                )));
            }
        }
        if self.ic_type == IcType::Census && self.census_filename.is_none() {
            return Err(EpiError::EpiError(
                "ic_type is Census but no census_filename was given".to_string(),
            ));
        }
        if self.ic_type == IcType::Demo && self.size == 0 {
            return Err(EpiError::EpiError(
                "size must be positive for the Demo initial condition".to_string(),
            ));
        }
        Ok(())
    }
}

/// Number of age groups (<5, 5-17, 18-29, 30-64, 65+).
pub const NUM_AGE_GROUPS: usize = 5;
/// Number of school slots indexed by the school attribute (0 unused).
pub const NUM_SCHOOLS: usize = 7;

/// Immutable transmission table shared by the contact and infection kernels.
///
/// All `xmit_*` vectors are indexed by the age group of the *receiver*; the
/// `_sc` variants apply when the transmitter's school attribute is negative
/// (a student kept out of school, or an adult not working at one).
#[derive(Debug, Clone)]
pub struct DiseaseParm {
    pub nstrain: usize,
    pub p_trans: [f64; 2],
    pub p_asymp: [f64; 2],
    pub reduced_inf: [f64; 2],
    pub reinfect_prob: f64,
    pub vac_eff: f64,
    /// Base transmission coefficient; `p_trans` of the reference strain.
    pub infect: f64,

    pub incubation_length_mean: f64,
    pub incubation_length_std: f64,
    pub infectious_length_mean: f64,
    pub infectious_length_std: f64,
    pub symptomdev_length_mean: f64,
    pub symptomdev_length_std: f64,

    pub xmit_comm: [f64; NUM_AGE_GROUPS],
    pub xmit_comm_sc: [f64; NUM_AGE_GROUPS],
    pub xmit_hood: [f64; NUM_AGE_GROUPS],
    pub xmit_hood_sc: [f64; NUM_AGE_GROUPS],
    pub xmit_nc_child: [f64; NUM_AGE_GROUPS],
    pub xmit_nc_child_sc: [f64; NUM_AGE_GROUPS],
    pub xmit_nc_adult: [f64; NUM_AGE_GROUPS],
    pub xmit_nc_adult_sc: [f64; NUM_AGE_GROUPS],
    pub xmit_child: [f64; NUM_AGE_GROUPS],
    pub xmit_child_sc: [f64; NUM_AGE_GROUPS],
    pub xmit_adult: [f64; NUM_AGE_GROUPS],
    pub xmit_adult_sc: [f64; NUM_AGE_GROUPS],
    pub xmit_work: f64,
    pub xmit_school: [f64; NUM_SCHOOLS],
    pub xmit_sch_c2a: [f64; NUM_SCHOOLS],
    pub xmit_sch_a2c: [f64; NUM_SCHOOLS],
}

impl Default for DiseaseParm {
    fn default() -> Self {
        DiseaseParm {
            nstrain: 2,
            p_trans: [0.20, 0.30],
            p_asymp: [0.40, 0.40],
            reduced_inf: [0.75, 0.75],
            reinfect_prob: 0.0,
            vac_eff: 1.0,
            infect: 0.20,

            incubation_length_mean: 3.0,
            incubation_length_std: 1.0,
            infectious_length_mean: 6.0,
            infectious_length_std: 1.0,
            symptomdev_length_mean: 5.0,
            symptomdev_length_std: 1.0,

            xmit_comm: [0.0000125, 0.0000375, 0.0001, 0.0001, 0.0001],
            xmit_comm_sc: [0.00001813, 0.00005438, 0.000145, 0.000145, 0.000145],
            xmit_hood: [0.00005, 0.00015, 0.0004, 0.0004, 0.0004],
            xmit_hood_sc: [0.0000725, 0.0002175, 0.00058, 0.00058, 0.00058],
            xmit_nc_child: [0.075, 0.075, 0.04, 0.04, 0.04],
            xmit_nc_child_sc: [0.1125, 0.1125, 0.06, 0.06, 0.06],
            xmit_nc_adult: [0.04, 0.04, 0.05, 0.05, 0.05],
            xmit_nc_adult_sc: [0.06, 0.06, 0.075, 0.075, 0.075],
            xmit_child: [0.6, 0.6, 0.3, 0.3, 0.3],
            xmit_child_sc: [0.9, 0.9, 0.45, 0.45, 0.45],
            xmit_adult: [0.3, 0.3, 0.4, 0.4, 0.4],
            xmit_adult_sc: [0.45, 0.45, 0.6, 0.6, 0.6],
            xmit_work: 0.115,
            xmit_school: [0.0, 0.105, 0.125, 0.145, 0.145, 0.15, 0.35],
            xmit_sch_c2a: [0.0, 0.045, 0.045, 0.045, 0.045, 0.15, 0.35],
            xmit_sch_a2c: [0.0, 0.105, 0.105, 0.105, 0.105, 0.15, 0.35],
        }
    }
}

impl DiseaseParm {
    /// Folds the raw configuration into the shared table: copies the strain
    /// inputs and scales each transmission vector by its venue multiplier.
    pub fn from_config(contact: &ContactParams, disease: &DiseaseConfig) -> Self {
        let mut parm = DiseaseParm {
            nstrain: disease.nstrain,
            reinfect_prob: disease.reinfect_prob,
            vac_eff: disease.vac_eff,
            incubation_length_mean: disease.incubation_length_mean,
            incubation_length_std: disease.incubation_length_std,
            infectious_length_mean: disease.infectious_length_mean,
            infectious_length_std: disease.infectious_length_std,
            symptomdev_length_mean: disease.symptomdev_length_mean,
            symptomdev_length_std: disease.symptomdev_length_std,
            ..DiseaseParm::default()
        };
        for s in 0..disease.nstrain {
            parm.p_trans[s] = disease.p_trans[s];
            parm.p_asymp[s] = disease.p_asymp[s];
            parm.reduced_inf[s] = disease.reduced_inf[s];
        }
        parm.infect = parm.p_trans[0];

        for a in 0..NUM_AGE_GROUPS {
            parm.xmit_comm[a] *= contact.p_co;
            parm.xmit_comm_sc[a] *= contact.p_co;
            parm.xmit_hood[a] *= contact.p_nh;
            parm.xmit_hood_sc[a] *= contact.p_nh;
            parm.xmit_nc_child[a] *= contact.p_nh;
            parm.xmit_nc_child_sc[a] *= contact.p_nh;
            parm.xmit_nc_adult[a] *= contact.p_nh;
            parm.xmit_nc_adult_sc[a] *= contact.p_nh;
            parm.xmit_child[a] *= contact.p_fa;
            parm.xmit_child_sc[a] *= contact.p_fa;
            parm.xmit_adult[a] *= contact.p_fa;
            parm.xmit_adult_sc[a] *= contact.p_fa;
        }
        parm.xmit_work *= contact.p_wo;
        for s in 0..NUM_SCHOOLS {
            parm.xmit_school[s] *= contact.p_sc;
            parm.xmit_sch_c2a[s] *= contact.p_sc;
            parm.xmit_sch_a2c[s] *= contact.p_sc;
        }
        parm
    }

    /// Samples `(incubation, infectious, symptomdev)` period lengths for a new
    /// infection, clamped to [`MIN_PERIOD_LENGTH`].
    pub fn sample_periods<R: Rng>(&self, rng: &mut R) -> (f64, f64, f64) {
        let mut draw = |mean: f64, std: f64| -> f64 {
            let normal: f64 = rng.sample(StandardNormal);
            (mean + std * normal).max(MIN_PERIOD_LENGTH)
        };
        (
            draw(self.incubation_length_mean, self.incubation_length_std),
            draw(self.infectious_length_mean, self.infectious_length_std),
            draw(self.symptomdev_length_mean, self.symptomdev_length_std),
        )
    }
}
