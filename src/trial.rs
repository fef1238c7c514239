// Trial Orchestrator — one full simulated run, topology to metrics
// Attack trials interleave testing rounds with per-epoch reselection; the
// baseline skips the dropping machinery entirely.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::SimConfig;
use crate::metrics::{
    count_active_classes, gateway_fraction, mixnode_fraction, path_probabilities,
    PathProbabilities,
};
use crate::monitor::{self, MonitorError};
use crate::selection::{draw_active_set, ActiveSet, SelectionError};
use crate::topology::{augment_with_attack_nodes, Topology};
use crate::types::{AttackMode, MonitorVersion};

// ─── Parameters ─────────────────────────────────────────────────────────────

/// One trial's attack configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrialParams {
    /// Number of B sacrifice nodes.
    pub sacrifice_nodes: u32,
    /// Number of A attacker nodes.
    pub attacker_nodes: u32,
    /// Stake on each sacrifice node.
    pub sacrifice_stake: f64,
    /// Stake on each attacker node.
    pub attacker_stake: f64,
    pub mode: AttackMode,
    pub version: MonitorVersion,
    /// False runs the pure staking baseline: no sacrifice nodes, no dropping.
    pub attack: bool,
}

// ─── Outcomes ───────────────────────────────────────────────────────────────

/// Immutable record of one trial. Serialized field names follow the result
/// file contract consumed downstream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrialOutcome {
    /// Attacker-controlled fraction of the gateway active set.
    #[serde(rename = "f_gw")]
    pub gateway_fraction: f64,
    /// Attacker-controlled fraction of the mixnode active set.
    #[serde(rename = "f_mix")]
    pub mixnode_fraction: f64,
    #[serde(rename = "path_prob")]
    pub path_prob: PathProbabilities,
    #[serde(rename = "B_gw")]
    pub sacrifice_gateways: u32,
    #[serde(rename = "A_gw")]
    pub attacker_gateways: u32,
    #[serde(rename = "B_mix")]
    pub sacrifice_mixnodes: u32,
    #[serde(rename = "A_mix")]
    pub attacker_mixnodes: u32,
    #[serde(rename = "B")]
    pub sacrifice_nodes: u32,
    #[serde(rename = "A")]
    pub attacker_nodes: u32,
    #[serde(rename = "B_stake")]
    pub sacrifice_stake: f64,
    #[serde(rename = "A_stake")]
    pub attacker_stake: f64,
}

/// One epoch-sweep trial's record: attacker-class gateway fraction after a
/// truncated attack of `epochs` epochs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochOutcome {
    #[serde(rename = "f_A")]
    pub attacker_gateway_fraction: f64,
    #[serde(rename = "B")]
    pub sacrifice_nodes: u32,
    #[serde(rename = "A")]
    pub attacker_nodes: u32,
    #[serde(rename = "epochs")]
    pub epochs: u32,
}

/// Anything that can abort a trial. All variants are fatal to the whole run;
/// trials have no transient failure modes worth retrying.
#[derive(Debug, thiserror::Error)]
pub enum TrialError {
    #[error(transparent)]
    Monitor(#[from] MonitorError),

    #[error(transparent)]
    Selection(#[from] SelectionError),
}

// ─── Trial driver ───────────────────────────────────────────────────────────

/// Run one trial against the shared base topology.
///
/// The base is cloned (never mutated); the trial owns its copy for its whole
/// lifetime. Each trial gets its own seeded PRNG so runs are independent and
/// reproducible from `seed`.
pub fn run_trial(
    base: &Topology,
    params: &TrialParams,
    config: &SimConfig,
    seed: u64,
) -> Result<TrialOutcome, TrialError> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    // The baseline fields no sacrifice nodes at all.
    let (sacrifice_nodes, sacrifice_stake) = if params.attack {
        (params.sacrifice_nodes, params.sacrifice_stake)
    } else {
        (0, 0.0)
    };

    let mut topology = augment_with_attack_nodes(
        base,
        sacrifice_nodes,
        params.attacker_nodes,
        sacrifice_stake,
        params.attacker_stake,
        params.mode,
        params.version,
        config,
        &mut rng,
    );

    let active = if params.attack {
        run_attack_epochs(&mut topology, params.version, config.epochs, config, &mut rng)?
    } else {
        for node in &mut topology.nodes {
            node.recompute_selection_weight(config.stake_saturation, config.uptime_exponent);
        }
        draw_active_set(&mut topology, config, &mut rng)?
    };

    let counts = count_active_classes(&topology, &active);
    Ok(TrialOutcome {
        gateway_fraction: gateway_fraction(&counts, config),
        mixnode_fraction: mixnode_fraction(&counts, config),
        path_prob: path_probabilities(&topology, &active),
        sacrifice_gateways: counts.sacrifice_gateways,
        attacker_gateways: counts.attacker_gateways,
        sacrifice_mixnodes: counts.sacrifice_mixnodes,
        attacker_mixnodes: counts.attacker_mixnodes,
        sacrifice_nodes,
        attacker_nodes: params.attacker_nodes,
        sacrifice_stake,
        attacker_stake: params.attacker_stake,
    })
}

/// The attack epoch loop: each epoch runs the configured testing rounds and
/// then redraws the active set. The per-epoch redraw feeds v3's refusal rule
/// for nodes currently in the active set; the last epoch's draw is the
/// trial's final snapshot.
fn run_attack_epochs<R: rand::Rng>(
    topology: &mut Topology,
    version: MonitorVersion,
    epochs: u32,
    config: &SimConfig,
    rng: &mut R,
) -> Result<ActiveSet, TrialError> {
    let mut active: Option<ActiveSet> = None;
    for _ in 0..epochs {
        for _ in 0..config.rounds_per_epoch {
            monitor::run_round(version, topology, config, rng)?;
            monitor::record_round_scores(topology, config);
        }
        active = Some(draw_active_set(topology, config, rng)?);
    }
    match active {
        Some(active) => Ok(active),
        // Degenerate zero-epoch schedule: fall back to a single draw.
        None => Ok(draw_active_set(topology, config, rng)?),
    }
}

/// Run one epoch-sweep trial: a v1-style attack truncated to `epochs` epochs
/// with a single active-set draw at the end, recording only the
/// attacker-class gateway share.
pub fn run_epoch_trial(
    base: &Topology,
    params: &TrialParams,
    epochs: u32,
    config: &SimConfig,
    seed: u64,
) -> Result<EpochOutcome, TrialError> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut topology = augment_with_attack_nodes(
        base,
        params.sacrifice_nodes,
        params.attacker_nodes,
        params.sacrifice_stake,
        params.attacker_stake,
        params.mode,
        params.version,
        config,
        &mut rng,
    );

    for _ in 0..epochs * config.rounds_per_epoch {
        monitor::run_round(params.version, &mut topology, config, &mut rng)?;
        monitor::record_round_scores(&mut topology, config);
    }
    let active = draw_active_set(&mut topology, config, &mut rng)?;

    let counts = count_active_classes(&topology, &active);
    Ok(EpochOutcome {
        attacker_gateway_fraction: counts.attacker_gateways as f64
            / config.gateway_slots() as f64,
        sacrifice_nodes: params.sacrifice_nodes,
        attacker_nodes: params.attacker_nodes,
        epochs,
    })
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{DeclaredRole, SnapshotRecord};
    use crate::topology::build_target_population;

    fn base_topology(config: &SimConfig) -> Topology {
        let mut records = Vec::new();
        for _ in 0..400 {
            records.push(SnapshotRecord {
                declared_role: DeclaredRole::Mixnode,
                uptime: 0.95,
                total_stake: 5_000_000_000.0,
            });
        }
        for _ in 0..300 {
            records.push(SnapshotRecord {
                declared_role: DeclaredRole::Gateway,
                uptime: 0.92,
                total_stake: 3_000_000_000.0,
            });
        }
        let mut rng = ChaCha8Rng::seed_from_u64(1234);
        build_target_population(&records, config, &mut rng)
    }

    #[test]
    fn baseline_trial_skips_sacrifice_nodes() {
        let config = SimConfig::default();
        let base = base_topology(&config);
        let params = TrialParams {
            sacrifice_nodes: 40,
            attacker_nodes: 50,
            sacrifice_stake: 100.0,
            attacker_stake: 10_000.0,
            mode: AttackMode::Endpoints,
            version: MonitorVersion::V2,
            attack: false,
        };
        let outcome = run_trial(&base, &params, &config, 7).expect("trial");
        // Sacrifice nodes are dropped from the baseline entirely.
        assert_eq!(outcome.sacrifice_nodes, 0);
        assert_eq!(outcome.sacrifice_stake, 0.0);
        assert_eq!(outcome.sacrifice_gateways, 0);
        assert_eq!(outcome.sacrifice_mixnodes, 0);
    }

    #[test]
    fn baseline_attacker_gateway_fraction_bounded() {
        let config = SimConfig::default();
        let base = base_topology(&config);
        let params = TrialParams {
            sacrifice_nodes: 0,
            attacker_nodes: 50,
            sacrifice_stake: 0.0,
            attacker_stake: 100_000.0,
            mode: AttackMode::Endpoints,
            version: MonitorVersion::V2,
            attack: false,
        };
        for seed in 0..5 {
            let outcome = run_trial(&base, &params, &config, seed).expect("trial");
            // All 50 attackers are gateways; they can fill at most 50 of the
            // 120 gateway slots.
            assert!(outcome.gateway_fraction >= 0.0);
            assert!(outcome.gateway_fraction <= 50.0 / 120.0 + 1e-12);
            assert_eq!(outcome.attacker_mixnodes, 0);
        }
    }

    #[test]
    fn trial_is_reproducible_from_seed() {
        let config = SimConfig {
            epochs: 2,
            ..SimConfig::default()
        };
        let base = base_topology(&config);
        let params = TrialParams {
            sacrifice_nodes: 20,
            attacker_nodes: 10,
            sacrifice_stake: 100.0,
            attacker_stake: 1000.0,
            mode: AttackMode::Endpoints,
            version: MonitorVersion::V2,
            attack: true,
        };
        let a = run_trial(&base, &params, &config, 99).expect("trial");
        let b = run_trial(&base, &params, &config, 99).expect("trial");
        assert_eq!(a, b);
    }

    #[test]
    fn attack_trial_leaves_base_clean() {
        let config = SimConfig {
            epochs: 1,
            ..SimConfig::default()
        };
        let base = base_topology(&config);
        let len_before = base.len();
        let params = TrialParams {
            sacrifice_nodes: 30,
            attacker_nodes: 10,
            sacrifice_stake: 100.0,
            attacker_stake: 1000.0,
            mode: AttackMode::Endpoints,
            version: MonitorVersion::V3,
            attack: true,
        };
        let _ = run_trial(&base, &params, &config, 5).expect("trial");
        assert_eq!(base.len(), len_before);
        assert!(base.nodes.iter().all(|n| n.completed == 0.0));
        assert!(base.nodes.iter().all(|n| !n.is_active));
    }

    #[test]
    fn epoch_trial_reports_requested_epoch() {
        let config = SimConfig::default();
        let base = base_topology(&config);
        let params = TrialParams {
            sacrifice_nodes: 60,
            attacker_nodes: 30,
            sacrifice_stake: 100.0,
            attacker_stake: 1000.0,
            mode: AttackMode::Endpoints,
            version: MonitorVersion::V1,
            attack: true,
        };
        let outcome = run_epoch_trial(&base, &params, 1, &config, 3).expect("trial");
        assert_eq!(outcome.epochs, 1);
        assert!(outcome.attacker_gateway_fraction >= 0.0);
        assert!(outcome.attacker_gateway_fraction <= 1.0);
    }
}
