use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::path::PathBuf;

use city_traffic::simulation::{
    load_city, parse_city, CongestionPolicy, LightPhase, MapDictionary, SimConfig, SimWorld,
    SpawnConfig, SpawnPolicy, DEFAULT_CONGESTION_FACTOR, DEMO_CITY,
};

#[derive(Parser)]
#[command(name = "city_traffic")]
#[command(about = "Grid city traffic simulation")]
struct Cli {
    /// City map text file; the bundled demo city is used when omitted
    #[arg(long)]
    map: Option<PathBuf>,

    /// JSON dictionary resolving map symbols
    #[arg(long)]
    dictionary: Option<PathBuf>,

    /// Number of simulation steps to run
    #[arg(long, default_value = "200")]
    steps: u64,

    /// Seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Steps between spawn waves (0 disables periodic spawning)
    #[arg(long, default_value = "10")]
    spawn_interval: u64,

    /// Keep spawns owed to occupied entry points instead of dropping them
    #[arg(long)]
    queue_spawns: bool,

    /// Weight multiplier for edges entering a traffic light
    #[arg(long, default_value_t = DEFAULT_CONGESTION_FACTOR)]
    congestion_factor: f32,

    /// Apply the congestion factor to lights in the pass state instead of stop
    #[arg(long)]
    congest_on_pass: bool,

    /// Print a JSON snapshot of the world after every step
    #[arg(long)]
    json: bool,

    /// Print a summary every this many steps
    #[arg(long, default_value = "50")]
    report_every: u64,
}

impl Cli {
    fn sim_config(&self) -> SimConfig {
        SimConfig {
            seed: self.seed,
            congestion: CongestionPolicy {
                factor: self.congestion_factor,
                applies_when: if self.congest_on_pass {
                    LightPhase::Pass
                } else {
                    LightPhase::Stop
                },
            },
            spawn: SpawnConfig {
                entry_points: None,
                interval: (self.spawn_interval > 0).then_some(self.spawn_interval),
                policy: if self.queue_spawns {
                    SpawnPolicy::Queue
                } else {
                    SpawnPolicy::Skip
                },
            },
            ..SimConfig::default()
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let grid = match &cli.map {
        Some(path) => load_city(path, cli.dictionary.as_deref())?,
        None => {
            let dictionary = match &cli.dictionary {
                Some(path) => MapDictionary::load(path)?,
                None => MapDictionary::builtin(),
            };
            parse_city(DEMO_CITY, &dictionary).context("Invalid demo city")?
        }
    };

    let mut world = SimWorld::initialize(grid, cli.sim_config())?;
    run_headless(&mut world, &cli)?;
    world.log_statistics();
    Ok(())
}

/// Run the simulation in headless mode (no graphics)
fn run_headless(world: &mut SimWorld, cli: &Cli) -> Result<()> {
    info!("Running city traffic simulation for {} steps", cli.steps);

    if !cli.json {
        println!("Initial state:");
        world.print_summary();
        println!();
    }

    for _ in 0..cli.steps {
        world.step()?;

        if cli.json {
            println!("{}", world.snapshot().to_json()?);
        } else if cli.report_every > 0 && world.step_count() % cli.report_every == 0 {
            println!("--- After step {} ---", world.step_count());
            world.print_summary();
            println!();
        }
    }
    Ok(())
}
