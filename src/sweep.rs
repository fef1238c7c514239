// Sweep Driver — parameter grids and parallel trial execution
// A sweep expands one experiment's Cartesian grid into independent seeded
// trials, runs them on the rayon pool and averages per configuration.

use std::collections::HashSet;

use rayon::prelude::*;
use tracing::info;

use crate::aggregate::{
    aggregate_epoch_outcomes, aggregate_outcomes, AggregatedEpochResult, AggregatedResult,
    AggregationError, ConfigKey,
};
use crate::config::SimConfig;
use crate::topology::Topology;
use crate::trial::{run_epoch_trial, run_trial, TrialError, TrialParams};
use crate::types::{AttackMode, MonitorVersion};

// ─── Errors ─────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    #[error(transparent)]
    Trial(#[from] TrialError),

    #[error(transparent)]
    Aggregation(#[from] AggregationError),
}

// ─── Grids ──────────────────────────────────────────────────────────────────

/// Mini runs a cut-down grid with few repetitions for quick smoke sweeps;
/// full is the publication-scale grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scale {
    Mini,
    Full,
}

impl Scale {
    pub fn runs_per_config(self) -> u32 {
        match self {
            Scale::Mini => 10,
            Scale::Full => 100,
        }
    }

    /// Stake grid, whole powers of ten.
    fn stakes(self) -> Vec<f64> {
        let max_exp = match self {
            Scale::Mini => 5,
            Scale::Full => 6,
        };
        (2..=max_exp).map(|e| 10f64.powi(e)).collect()
    }

    fn attacker_stakes_baseline(self) -> Vec<f64> {
        let max_exp = match self {
            Scale::Mini => 5,
            Scale::Full => 6,
        };
        (3..=max_exp).map(|e| 10f64.powi(e)).collect()
    }
}

fn step_range(start: u32, end: u32, step: u32) -> Vec<u32> {
    (start..=end).step_by(step as usize).collect()
}

/// Expand one experiment into its per-configuration parameter list.
///
/// The grids mirror the published experiments: v1/v3 vary both node counts
/// and both stakes; v2 pins the sacrifice stake to the 100 unit minimum
/// (sacrifice nodes are burned either way, cheap ones suffice); the baseline
/// fields attackers only.
pub fn build_tasks(
    mode: AttackMode,
    version: MonitorVersion,
    attack: bool,
    scale: Scale,
) -> Vec<TrialParams> {
    let mut tasks = Vec::new();

    if !attack {
        for &attacker_stake in &scale.attacker_stakes_baseline() {
            for attacker_nodes in step_range(100, 10_000, 50) {
                tasks.push(TrialParams {
                    sacrifice_nodes: 0,
                    attacker_nodes,
                    sacrifice_stake: 0.0,
                    attacker_stake,
                    mode,
                    version,
                    attack: false,
                });
            }
        }
        return tasks;
    }

    let (sacrifice_grid, attacker_grid): (Vec<u32>, Vec<u32>) = match (version, mode, scale) {
        (MonitorVersion::V1, _, Scale::Mini) => (
            vec![10, 20, 30, 60, 70, 80, 90, 120, 130, 140],
            vec![10, 20, 30],
        ),
        (MonitorVersion::V2, AttackMode::FullPath, _) => {
            (step_range(10, 300, 10), step_range(10, 300, 10))
        }
        _ => (step_range(10, 200, 10), step_range(10, 200, 10)),
    };

    let sacrifice_stakes = match version {
        MonitorVersion::V2 => vec![100.0],
        _ => scale.stakes(),
    };
    let attacker_stakes = scale.stakes();

    for &sacrifice_stake in &sacrifice_stakes {
        for &attacker_stake in &attacker_stakes {
            for &sacrifice_nodes in &sacrifice_grid {
                for &attacker_nodes in &attacker_grid {
                    tasks.push(TrialParams {
                        sacrifice_nodes,
                        attacker_nodes,
                        sacrifice_stake,
                        attacker_stake,
                        mode,
                        version,
                        attack: true,
                    });
                }
            }
        }
    }
    tasks
}

/// The epoch experiment's (B, A) combinations.
pub fn epoch_sweep_combos() -> Vec<TrialParams> {
    [(60, 30), (80, 30), (100, 30)]
        .into_iter()
        .map(|(sacrifice_nodes, attacker_nodes)| TrialParams {
            sacrifice_nodes,
            attacker_nodes,
            sacrifice_stake: 100.0,
            attacker_stake: 1000.0,
            mode: AttackMode::Endpoints,
            version: MonitorVersion::V1,
            attack: true,
        })
        .collect()
}

// ─── Parallel execution ─────────────────────────────────────────────────────

/// Run every task `n_runs` times in parallel and average per configuration.
///
/// Seeds are `base_seed + flat index`, so the whole sweep is reproducible
/// and no two trials share a PRNG stream. Any trial error aborts the sweep.
pub fn run_sweep(
    base: &Topology,
    tasks: &[TrialParams],
    n_runs: u32,
    config: &SimConfig,
    base_seed: u64,
) -> Result<Vec<AggregatedResult>, SweepError> {
    let expected: HashSet<ConfigKey> = tasks.iter().map(ConfigKey::of_params).collect();
    info!(
        tasks = tasks.len(),
        n_runs,
        trials = tasks.len() * n_runs as usize,
        "starting sweep"
    );

    let outcomes = tasks
        .iter()
        .flat_map(|params| (0..n_runs).map(move |run| (*params, run)))
        .enumerate()
        .collect::<Vec<_>>()
        .into_par_iter()
        .map(|(index, (params, _run))| {
            run_trial(base, &params, config, base_seed + index as u64)
        })
        .collect::<Result<Vec<_>, _>>()?;

    info!(outcomes = outcomes.len(), "sweep finished, aggregating");
    Ok(aggregate_outcomes(&outcomes, &expected)?)
}

/// Run the epoch experiment: every (B, A) combination at every attack length
/// from one epoch up to `max_epochs`, `n_runs` repetitions each.
pub fn run_epoch_sweep(
    base: &Topology,
    combos: &[TrialParams],
    max_epochs: u32,
    n_runs: u32,
    config: &SimConfig,
    base_seed: u64,
) -> Result<Vec<AggregatedEpochResult>, SweepError> {
    let tasks: Vec<(TrialParams, u32)> = combos
        .iter()
        .flat_map(|params| (1..=max_epochs).map(move |epochs| (*params, epochs)))
        .collect();
    info!(
        combos = combos.len(),
        max_epochs,
        trials = tasks.len() * n_runs as usize,
        "starting epoch sweep"
    );

    let outcomes = tasks
        .iter()
        .flat_map(|&(params, epochs)| (0..n_runs).map(move |_| (params, epochs)))
        .enumerate()
        .collect::<Vec<_>>()
        .into_par_iter()
        .map(|(index, (params, epochs))| {
            run_epoch_trial(base, &params, epochs, config, base_seed + index as u64)
        })
        .collect::<Result<Vec<_>, _>>()?;

    info!(outcomes = outcomes.len(), "epoch sweep finished, aggregating");
    Ok(aggregate_epoch_outcomes(&outcomes))
}

// ─── Tests ──────────────────────────────────────────────────────────────────
