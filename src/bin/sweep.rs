// Sweep CLI — run the published experiments against a network snapshot
//
// Usage:
//   cargo run --release --bin sweep -- results --version v1 --attack
//   cargo run --release --bin sweep -- results --version v2 --mode full-path --attack --mini
//   cargo run --release --bin sweep -- epochs --runs 1000

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use framing_sim::config::SimConfig;
use framing_sim::snapshot::load_snapshot;
use framing_sim::sweep::{
    build_tasks, epoch_sweep_combos, run_epoch_sweep, run_sweep, Scale,
};
use framing_sim::topology::{build_target_population, Topology};
use framing_sim::types::{AttackMode, MonitorVersion};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

// ─── CLI ────────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "sweep")]
#[command(about = "Mixnet framing-attack Monte Carlo sweeps")]
struct Cli {
    /// CSV snapshot of the live network (declared_role, uptime, total_stake).
    #[arg(long, global = true, default_value = "snapshot.csv")]
    snapshot: PathBuf,

    /// Output directory for result files.
    #[arg(long, global = true, default_value = "results")]
    out: PathBuf,

    /// Base seed; trial i runs with seed base + i.
    #[arg(long, global = true, default_value_t = 0)]
    seed: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one capture-fraction experiment over its parameter grid.
    Results {
        /// Which path positions the attacker fields nodes for.
        #[arg(long, value_enum, default_value_t = ModeArg::Endpoints)]
        mode: ModeArg,
        /// Network monitor dropping strategy under attack.
        #[arg(long, value_enum, default_value_t = VersionArg::V1)]
        version: VersionArg,
        /// Simulate the framing attack; otherwise the pure staking baseline.
        #[arg(long)]
        attack: bool,
        /// Cut-down grid and repetition count for smoke runs.
        #[arg(long)]
        mini: bool,
    },
    /// Run the attack-length experiment (v1, endpoints, fixed stakes).
    Epochs {
        /// Repetitions per (B, A, epoch) point.
        #[arg(long, default_value_t = 1000)]
        runs: u32,
        /// Longest attack to simulate, in epochs.
        #[arg(long, default_value_t = 24)]
        max_epochs: u32,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Endpoints,
    FullPath,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum VersionArg {
    V1,
    V2,
    V3,
}

impl From<ModeArg> for AttackMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Endpoints => AttackMode::Endpoints,
            ModeArg::FullPath => AttackMode::FullPath,
        }
    }
}

impl From<VersionArg> for MonitorVersion {
    fn from(arg: VersionArg) -> Self {
        match arg {
            VersionArg::V1 => MonitorVersion::V1,
            VersionArg::V2 => MonitorVersion::V2,
            VersionArg::V3 => MonitorVersion::V3,
        }
    }
}

// ─── Entry point ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = SimConfig::default();

    let records = load_snapshot(&cli.snapshot)
        .with_context(|| format!("loading snapshot {}", cli.snapshot.display()))?;
    info!(nodes = records.len(), "snapshot loaded");

    // The target population is seeded once and shared by every trial.
    let mut rng = ChaCha8Rng::seed_from_u64(cli.seed);
    let base: Topology = build_target_population(&records, &config, &mut rng);

    match cli.command {
        Commands::Results {
            mode,
            version,
            attack,
            mini,
        } => {
            let mode = AttackMode::from(mode);
            let version = MonitorVersion::from(version);
            let scale = if mini { Scale::Mini } else { Scale::Full };
            let n_runs = scale.runs_per_config();

            let tasks = build_tasks(mode, version, attack, scale);
            let results = run_sweep(&base, &tasks, n_runs, &config, cli.seed)?;

            let name = format!(
                "{}_{}_{}_{}.json",
                match version {
                    MonitorVersion::V1 => "v1",
                    MonitorVersion::V2 => "v2",
                    MonitorVersion::V3 => "v3",
                },
                match mode {
                    AttackMode::Endpoints => "endpoints",
                    AttackMode::FullPath => "fullpath",
                },
                if attack { "attack" } else { "baseline" },
                n_runs,
            );
            write_results(&cli.out, &name, &results)?;
        }
        Commands::Epochs { runs, max_epochs } => {
            let combos = epoch_sweep_combos();
            let results =
                run_epoch_sweep(&base, &combos, max_epochs, runs, &config, cli.seed)?;
            let name = format!("epochs_v1_endpoints_{runs}.json");
            write_results(&cli.out, &name, &results)?;
        }
    }

    Ok(())
}

fn write_results<T: Serialize>(out: &PathBuf, name: &str, results: &[T]) -> anyhow::Result<()> {
    fs::create_dir_all(out).with_context(|| format!("creating {}", out.display()))?;
    let path = out.join(name);
    let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), results)?;
    info!(path = %path.display(), records = results.len(), "results written");
    Ok(())
}
