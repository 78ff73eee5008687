//! End-to-end scenarios over the full daily cycle.

use epigrid::agents::Status;
use epigrid::{IcType, SimConfig, Simulation};
use std::io::Write;

const CENSUS: &str = "\
2
100100 2000 600 6001 400100 120 360 320 880 320 160 240 120 80 24 12 4
100200 2000 400 6003 400200 120 360 320 880 320 160 240 120 80 24 12 4
";

struct Fixture {
    _census: tempfile::NamedTempFile,
    _workerflow: tempfile::NamedTempFile,
    _cases: tempfile::NamedTempFile,
    config: SimConfig,
}

fn fixture() -> Fixture {
    let mut census = tempfile::NamedTempFile::new().unwrap();
    write!(census, "{CENSUS}").unwrap();

    let mut workerflow = tempfile::NamedTempFile::new().unwrap();
    for triplet in [[100100u32, 100200, 300], [100200, 100100, 200]] {
        for value in triplet {
            workerflow.write_all(&value.to_le_bytes()).unwrap();
        }
    }
    workerflow.flush().unwrap();

    let mut cases = tempfile::NamedTempFile::new().unwrap();
    write!(cases, "6001 8 8\n6003 4 4\n").unwrap();

    let config = SimConfig {
        ic_type: IcType::Census,
        census_filename: Some(census.path().to_path_buf()),
        workerflow_filename: Some(workerflow.path().to_path_buf()),
        case_filename: Some(cases.path().to_path_buf()),
        random_travel_int: 4,
        ..SimConfig::default()
    };
    Fixture {
        _census: census,
        _workerflow: workerflow,
        _cases: cases,
        config,
    }
}

#[test]
fn identical_runs_replay_bit_for_bit() {
    let fixture = fixture();
    let mut a = Simulation::from_config(fixture.config.clone(), 42).unwrap();
    let mut b = Simulation::from_config(fixture.config.clone(), 42).unwrap();
    a.run(10);
    b.run(10);

    assert_eq!(a.store().ids, b.store().ids);
    assert_eq!(a.store().attrs, b.store().attrs);
    assert_eq!(a.store().timers, b.store().timers);
    assert_eq!(a.store().pos, b.store().pos);
}

#[test]
fn different_seeds_diverge() {
    let fixture = fixture();
    let mut a = Simulation::from_config(fixture.config.clone(), 42).unwrap();
    let mut b = Simulation::from_config(fixture.config.clone(), 43).unwrap();
    a.run(3);
    b.run(3);
    assert_ne!(a.store().attrs, b.store().attrs);
}

#[test]
fn universal_invariants_hold_after_every_step() {
    let fixture = fixture();
    let mut sim = Simulation::from_config(fixture.config, 42).unwrap();
    let n: u64 = sim.totals().iter().sum();
    let mut dead_before = 0;

    for _ in 0..5 {
        sim.step();

        // Status conservation.
        let totals = sim.totals();
        assert_eq!(totals.iter().sum::<u64>(), n);

        // Death is terminal, so the count never shrinks.
        let dead = totals[Status::Dead as usize];
        assert!(dead >= dead_before);
        dead_before = dead;

        for (attrs, timers) in sim.store().attrs.iter().zip(&sim.store().timers) {
            assert!(attrs.age_group <= 4);
            assert!(attrs.strain <= 1);
            if timers.treatment_timer > 0.0 {
                assert_eq!(attrs.status, Status::Infected);
            }
            if attrs.status == Status::Infected {
                assert!(timers.disease_counter >= 0.0);
                assert!(timers.incubation_period > 0.0);
                assert!(timers.infectious_period > 0.0);
                assert!(timers.symptomdev_period > 0.0);
            }
        }
    }
}

#[test]
fn epidemic_grows_under_strong_transmission() {
    let mut fixture = fixture();
    fixture.config.disease.p_trans = vec![1.0, 1.0];
    let mut sim = Simulation::from_config(fixture.config, 42).unwrap();
    let seeded = sim.totals()[Status::Infected as usize];
    assert_eq!(seeded, 12);
    sim.run(8);
    let totals = sim.totals();
    let touched: u64 = totals[Status::Infected as usize]
        + totals[Status::Immune as usize]
        + totals[Status::Dead as usize];
    assert!(
        touched > seeded,
        "community transmission should produce new cases"
    );
}
