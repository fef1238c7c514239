// Metrics Extractor — attacker presence in a realized active set
// Counts adversarial nodes per (class, role) and derives the compromise
// probabilities for the two tracked path patterns.

use serde::{Deserialize, Serialize};

use crate::config::SimConfig;
use crate::selection::ActiveSet;
use crate::topology::Topology;
use crate::types::{NodeClass, NodeRole};

// ─── Class/role counts ──────────────────────────────────────────────────────

/// Attacker-side node counts within one active set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassCounts {
    pub sacrifice_gateways: u32,
    pub sacrifice_mixnodes: u32,
    pub attacker_gateways: u32,
    pub attacker_mixnodes: u32,
}

/// Count sacrifice/attacker nodes by role across the whole active set.
pub fn count_active_classes(topology: &Topology, active: &ActiveSet) -> ClassCounts {
    let mut counts = ClassCounts::default();
    for layer in &active.layers {
        for &idx in layer {
            let node = &topology.nodes[idx];
            match (node.class, node.role) {
                (NodeClass::Sacrifice, NodeRole::Gateway) => counts.sacrifice_gateways += 1,
                (NodeClass::Sacrifice, NodeRole::Mixnode) => counts.sacrifice_mixnodes += 1,
                (NodeClass::Attacker, NodeRole::Gateway) => counts.attacker_gateways += 1,
                (NodeClass::Attacker, NodeRole::Mixnode) => counts.attacker_mixnodes += 1,
                (NodeClass::Target, _) => {}
            }
        }
    }
    counts
}

// ─── Path compromise probabilities ──────────────────────────────────────────

/// Compromise probability of the two tracked path patterns, given one active
/// set. Both sacrifice and attacker nodes count as attacker-controlled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PathProbabilities {
    /// Both endpoint gateways compromised.
    #[serde(rename = "A***A")]
    pub endpoints: f64,
    /// All three middle hops compromised.
    #[serde(rename = "*AAA*")]
    pub middle: f64,
}

/// Fraction of a layer's active nodes that are attacker-controlled.
/// An empty layer contributes zero rather than dividing by zero.
fn adversarial_fraction(topology: &Topology, active: &ActiveSet, layer: usize) -> f64 {
    let nodes = &active.layers[layer];
    if nodes.is_empty() {
        return 0.0;
    }
    let adversarial = nodes
        .iter()
        .filter(|&&idx| topology.nodes[idx].class.is_adversarial())
        .count();
    adversarial as f64 / nodes.len() as f64
}

/// Path-compromise probabilities as the product of per-layer fractions.
pub fn path_probabilities(topology: &Topology, active: &ActiveSet) -> PathProbabilities {
    let frac: Vec<f64> = (0..5)
        .map(|layer| adversarial_fraction(topology, active, layer))
        .collect();
    PathProbabilities {
        endpoints: frac[0] * frac[4],
        middle: frac[1] * frac[2] * frac[3],
    }
}

// ─── Controlled fractions ───────────────────────────────────────────────────

/// Attacker-controlled fraction of the gateway active set (entry + exit).
pub fn gateway_fraction(counts: &ClassCounts, config: &SimConfig) -> f64 {
    (counts.sacrifice_gateways + counts.attacker_gateways) as f64
        / config.gateway_slots() as f64
}

/// Attacker-controlled fraction of the mixnode active set.
pub fn mixnode_fraction(counts: &ClassCounts, config: &SimConfig) -> f64 {
    (counts.sacrifice_mixnodes + counts.attacker_mixnodes) as f64
        / config.mixnode_slots() as f64
}

// ─── Tests ──────────────────────────────────────────────────────────────────
