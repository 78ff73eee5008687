use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;
use epigrid::report::{write_cell_data, write_fips_data, TotalsReport};
use epigrid::{set_log_level, LevelFilter, SimConfig, Simulation};

/// Agent-based epidemic simulator over a gridded population.
#[derive(Parser, Debug)]
#[command(name = "epigrid", version, about)]
struct Cli {
    /// Path to a JSON configuration file; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Random seed.
    #[arg(short = 's', long, default_value = "0")]
    random_seed: u64,

    /// Directory for report output.
    #[arg(short, long = "output")]
    output_dir: Option<PathBuf>,

    /// Override the configured number of steps.
    #[arg(short, long)]
    nsteps: Option<usize>,

    /// Log level (off, error, warn, info, debug, trace).
    #[arg(short, long)]
    log_level: Option<String>,
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Cli::parse();
    if let Some(level) = &args.log_level {
        set_log_level(LevelFilter::from_str(level)?);
    }

    let mut config = match &args.config {
        Some(path) => SimConfig::from_file(path)?,
        None => SimConfig::default(),
    };
    if let Some(nsteps) = args.nsteps {
        config.nsteps = nsteps;
    }
    let nsteps = config.nsteps;
    let plot_int = config.plot_int;
    let aggregated_diag_int = config.aggregated_diag_int;

    let output_dir = args.output_dir.unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&output_dir)?;
    let diag_prefix = output_dir.join(&config.aggregated_diag_prefix);

    let mut sim = Simulation::from_config(config, args.random_seed)?;
    let mut totals = TotalsReport::create(&output_dir.join("totals.csv"))?;
    totals.append(0, &sim.totals())?;

    for _ in 0..nsteps {
        sim.step();
        let step = sim.current_step();
        totals.append(step, &sim.totals())?;
        if plot_int > 0 && step % plot_int as u64 == 0 {
            write_cell_data(&diag_prefix, step, sim.store(), sim.geometry())?;
        }
        if aggregated_diag_int > 0 && step % aggregated_diag_int as u64 == 0 {
            write_fips_data(
                &diag_prefix,
                step,
                sim.store(),
                sim.geometry(),
                sim.community_maps(),
            )?;
        }
    }

    let [never, infected, immune, susceptible, dead] = sim.totals();
    println!("Never infected: {never}");
    println!("Infected: {infected}");
    println!("Immune: {immune}");
    println!("Previously infected: {susceptible}");
    println!("Deaths: {dead}");
    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}
