// Result Aggregation — keyed sum-then-divide averaging across trials
// Every numeric field, nested path probabilities included, is averaged over
// all trials sharing one (B, A, B_stake, A_stake) configuration.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::metrics::PathProbabilities;
use crate::trial::{EpochOutcome, TrialOutcome, TrialParams};

// ─── Keys ───────────────────────────────────────────────────────────────────

/// Aggregation key for one attack configuration.
///
/// Stakes are keyed by their f64 bit patterns: sweep grids use exact values
/// (powers of ten), so the bit pattern is a stable identity and keeps floats
/// out of the hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConfigKey {
    pub sacrifice_nodes: u32,
    pub attacker_nodes: u32,
    sacrifice_stake_bits: u64,
    attacker_stake_bits: u64,
}

impl ConfigKey {
    pub fn new(
        sacrifice_nodes: u32,
        attacker_nodes: u32,
        sacrifice_stake: f64,
        attacker_stake: f64,
    ) -> Self {
        Self {
            sacrifice_nodes,
            attacker_nodes,
            sacrifice_stake_bits: sacrifice_stake.to_bits(),
            attacker_stake_bits: attacker_stake.to_bits(),
        }
    }

    pub fn of_outcome(outcome: &TrialOutcome) -> Self {
        Self::new(
            outcome.sacrifice_nodes,
            outcome.attacker_nodes,
            outcome.sacrifice_stake,
            outcome.attacker_stake,
        )
    }

    /// Key of the outcomes this parameter set will produce. Baseline trials
    /// report zero sacrifice nodes and stake regardless of the grid values.
    pub fn of_params(params: &TrialParams) -> Self {
        if params.attack {
            Self::new(
                params.sacrifice_nodes,
                params.attacker_nodes,
                params.sacrifice_stake,
                params.attacker_stake,
            )
        } else {
            Self::new(0, params.attacker_nodes, 0.0, params.attacker_stake)
        }
    }

    pub fn sacrifice_stake(&self) -> f64 {
        f64::from_bits(self.sacrifice_stake_bits)
    }

    pub fn attacker_stake(&self) -> f64 {
        f64::from_bits(self.attacker_stake_bits)
    }
}

/// Aggregation key for the epoch-sweep experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EpochKey {
    pub sacrifice_nodes: u32,
    pub attacker_nodes: u32,
    pub epochs: u32,
}

impl EpochKey {
    pub fn of_outcome(outcome: &EpochOutcome) -> Self {
        Self {
            sacrifice_nodes: outcome.sacrifice_nodes,
            attacker_nodes: outcome.attacker_nodes,
            epochs: outcome.epochs,
        }
    }
}

// ─── Errors ─────────────────────────────────────────────────────────────────

/// A result keyed outside the expected configuration set indicates a task
/// generation defect; aggregation fails loudly rather than dropping data.
#[derive(Debug, thiserror::Error)]
pub enum AggregationError {
    #[error(
        "trial result for unexpected configuration \
         (B={sacrifice_nodes}, A={attacker_nodes})"
    )]
    UnexpectedKey {
        sacrifice_nodes: u32,
        attacker_nodes: u32,
    },
}

// ─── Averaged records ───────────────────────────────────────────────────────

/// Mean of every [`TrialOutcome`] field across one configuration's trials.
/// Serialized field names follow the result file contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedResult {
    #[serde(rename = "f_gw")]
    pub gateway_fraction: f64,
    #[serde(rename = "f_mix")]
    pub mixnode_fraction: f64,
    #[serde(rename = "path_prob")]
    pub path_prob: PathProbabilities,
    #[serde(rename = "B_gw")]
    pub sacrifice_gateways: f64,
    #[serde(rename = "A_gw")]
    pub attacker_gateways: f64,
    #[serde(rename = "B_mix")]
    pub sacrifice_mixnodes: f64,
    #[serde(rename = "A_mix")]
    pub attacker_mixnodes: f64,
    #[serde(rename = "B")]
    pub sacrifice_nodes: u32,
    #[serde(rename = "A")]
    pub attacker_nodes: u32,
    #[serde(rename = "B_stake")]
    pub sacrifice_stake: f64,
    #[serde(rename = "A_stake")]
    pub attacker_stake: f64,
}

/// Averaged attacker gateway share per (B, A, epoch) point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedEpochResult {
    #[serde(rename = "f_A")]
    pub attacker_gateway_fraction: f64,
    #[serde(rename = "B")]
    pub sacrifice_nodes: u32,
    #[serde(rename = "A")]
    pub attacker_nodes: u32,
    #[serde(rename = "epochs")]
    pub epochs: u32,
}

// ─── Accumulators ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
struct Accumulator {
    count: u64,
    gateway_fraction: f64,
    mixnode_fraction: f64,
    endpoints: f64,
    middle: f64,
    sacrifice_gateways: f64,
    attacker_gateways: f64,
    sacrifice_mixnodes: f64,
    attacker_mixnodes: f64,
}

impl Accumulator {
    fn add(&mut self, outcome: &TrialOutcome) {
        self.count += 1;
        self.gateway_fraction += outcome.gateway_fraction;
        self.mixnode_fraction += outcome.mixnode_fraction;
        self.endpoints += outcome.path_prob.endpoints;
        self.middle += outcome.path_prob.middle;
        self.sacrifice_gateways += outcome.sacrifice_gateways as f64;
        self.attacker_gateways += outcome.attacker_gateways as f64;
        self.sacrifice_mixnodes += outcome.sacrifice_mixnodes as f64;
        self.attacker_mixnodes += outcome.attacker_mixnodes as f64;
    }

    fn finish(&self, key: &ConfigKey) -> AggregatedResult {
        let n = self.count.max(1) as f64;
        AggregatedResult {
            gateway_fraction: self.gateway_fraction / n,
            mixnode_fraction: self.mixnode_fraction / n,
            path_prob: PathProbabilities {
                endpoints: self.endpoints / n,
                middle: self.middle / n,
            },
            sacrifice_gateways: self.sacrifice_gateways / n,
            attacker_gateways: self.attacker_gateways / n,
            sacrifice_mixnodes: self.sacrifice_mixnodes / n,
            attacker_mixnodes: self.attacker_mixnodes / n,
            sacrifice_nodes: key.sacrifice_nodes,
            attacker_nodes: key.attacker_nodes,
            sacrifice_stake: key.sacrifice_stake(),
            attacker_stake: key.attacker_stake(),
        }
    }
}

// ─── Aggregation ────────────────────────────────────────────────────────────

/// Average all outcomes per configuration key, sorted by gateway fraction
/// ascending (result file contract).
///
/// `expected` is the key set implied by the generated task list; an outcome
/// outside it fails the whole aggregation.
pub fn aggregate_outcomes(
    outcomes: &[TrialOutcome],
    expected: &HashSet<ConfigKey>,
) -> Result<Vec<AggregatedResult>, AggregationError> {
    let mut accumulators: HashMap<ConfigKey, Accumulator> = HashMap::new();
    for outcome in outcomes {
        let key = ConfigKey::of_outcome(outcome);
        if !expected.contains(&key) {
            return Err(AggregationError::UnexpectedKey {
                sacrifice_nodes: key.sacrifice_nodes,
                attacker_nodes: key.attacker_nodes,
            });
        }
        accumulators.entry(key).or_default().add(outcome);
    }

    let mut averaged: Vec<AggregatedResult> = accumulators
        .iter()
        .map(|(key, acc)| acc.finish(key))
        .collect();
    averaged.sort_by(|a, b| {
        a.gateway_fraction
            .partial_cmp(&b.gateway_fraction)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    Ok(averaged)
}

/// Average the epoch-sweep outcomes per (B, A, epoch), sorted by epoch.
pub fn aggregate_epoch_outcomes(outcomes: &[EpochOutcome]) -> Vec<AggregatedEpochResult> {
    let mut sums: HashMap<EpochKey, (u64, f64)> = HashMap::new();
    for outcome in outcomes {
        let entry = sums.entry(EpochKey::of_outcome(outcome)).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += outcome.attacker_gateway_fraction;
    }

    let mut averaged: Vec<AggregatedEpochResult> = sums
        .into_iter()
        .map(|(key, (count, sum))| AggregatedEpochResult {
            attacker_gateway_fraction: sum / count.max(1) as f64,
            sacrifice_nodes: key.sacrifice_nodes,
            attacker_nodes: key.attacker_nodes,
            epochs: key.epochs,
        })
        .collect();
    averaged.sort_by_key(|r| (r.sacrifice_nodes, r.attacker_nodes, r.epochs));
    averaged
}

// ─── Tests ──────────────────────────────────────────────────────────────────
