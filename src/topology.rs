// Topology Builder — target population from a snapshot, plus attacker augmentation
// Nodes live in a flat arena; layers hold indices into it. Cloning the whole
// struct is the per-trial deep copy.

use rand::Rng;

use crate::config::SimConfig;
use crate::snapshot::{DeclaredRole, SnapshotRecord};
use crate::types::{AttackMode, MonitorVersion, NodeClass, NodeRole, SimNode};

/// The mixnode layers a new mixnode can land on.
pub const MIX_LAYERS: [usize; 3] = [1, 2, 3];

// ─── Topology ───────────────────────────────────────────────────────────────

/// All nodes of one simulated network, partitioned into five ordered layers.
///
/// `layers[l]` holds indices into `nodes`; every node belongs to exactly one
/// layer. The base topology built from a snapshot is shared read-only across
/// trials; each trial clones it before mutating anything.
#[derive(Debug, Clone)]
pub struct Topology {
    pub nodes: Vec<SimNode>,
    pub layers: [Vec<usize>; 5],
}

impl Topology {
    pub fn empty() -> Self {
        Self {
            nodes: Vec::new(),
            layers: Default::default(),
        }
    }

    /// Append a node, registering it on its layer.
    pub fn push(&mut self, node: SimNode) -> usize {
        let idx = self.nodes.len();
        self.layers[node.layer].push(idx);
        self.nodes.push(node);
        idx
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Indices of every gateway (layers 0 and 4, entry first).
    pub fn gateway_indices(&self) -> Vec<usize> {
        let mut out = self.layers[0].clone();
        out.extend_from_slice(&self.layers[4]);
        out
    }

    /// Indices of every mixnode (layers 1..=3 in order).
    pub fn mixnode_indices(&self) -> Vec<usize> {
        let mut out = Vec::new();
        for layer in MIX_LAYERS {
            out.extend_from_slice(&self.layers[layer]);
        }
        out
    }
}

// ─── Layer placement ────────────────────────────────────────────────────────

fn random_mix_layer<R: Rng>(rng: &mut R) -> usize {
    MIX_LAYERS[rng.gen_range(0..MIX_LAYERS.len())]
}

fn random_gateway_layer<R: Rng>(rng: &mut R, config: &SimConfig) -> usize {
    if rng.gen_bool(config.entry_gateway_probability) {
        0
    } else {
        4
    }
}

// ─── Target population ──────────────────────────────────────────────────────

/// Build the honest base population mirroring a network snapshot.
///
/// Mixnode rows land uniformly on layers 1..=3; gateway rows split 0.4/0.6
/// between entry and exit. Each node starts fully warmed with the row's
/// observed uptime, and the row's micro-unit stake is converted to stake.
pub fn build_target_population<R: Rng>(
    records: &[SnapshotRecord],
    config: &SimConfig,
    rng: &mut R,
) -> Topology {
    let mut topology = Topology::empty();
    for record in records {
        let (role, layer) = match record.declared_role {
            DeclaredRole::Mixnode => (NodeRole::Mixnode, random_mix_layer(rng)),
            DeclaredRole::Gateway => (NodeRole::Gateway, random_gateway_layer(rng, config)),
        };
        topology.push(SimNode::new(
            role,
            layer,
            NodeClass::Target,
            record.uptime,
            record.total_stake / config.stake_unit_divisor,
            config.score_window,
        ));
    }
    topology
}

// ─── Attack augmentation ────────────────────────────────────────────────────

/// How many of the A attacker nodes take the mixnode role.
///
/// Under v1 and v3 the attacker only fields gateways: sacrifice mixnodes can
/// damage others without implicating adjacent attacker nodes, so attacker
/// mixnodes buy nothing. Under v2 the full-path objective moves 3/5 of A
/// into the mix layers.
fn attacker_mixnode_count(a: u32, mode: AttackMode, version: MonitorVersion) -> u32 {
    match (version, mode) {
        (MonitorVersion::V1, _) | (MonitorVersion::V3, _) => 0,
        (MonitorVersion::V2, AttackMode::Endpoints) => 0,
        (MonitorVersion::V2, AttackMode::FullPath) => (a as f64 * 3.0 / 5.0) as u32,
    }
}

/// Deep-copy `base` and add the attacker's B sacrifice and A attacker nodes.
///
/// Sacrifice nodes are always mixnodes on a uniform random layer; attacker
/// nodes split between roles per [`attacker_mixnode_count`]. All start at
/// the configured high uptime, fully warmed.
#[allow(clippy::too_many_arguments)]
pub fn augment_with_attack_nodes<R: Rng>(
    base: &Topology,
    sacrifice_nodes: u32,
    attacker_nodes: u32,
    sacrifice_stake: f64,
    attacker_stake: f64,
    mode: AttackMode,
    version: MonitorVersion,
    config: &SimConfig,
    rng: &mut R,
) -> Topology {
    let mut topology = base.clone();

    for _ in 0..sacrifice_nodes {
        let layer = random_mix_layer(rng);
        topology.push(SimNode::new(
            NodeRole::Mixnode,
            layer,
            NodeClass::Sacrifice,
            config.attack_node_uptime,
            sacrifice_stake,
            config.score_window,
        ));
    }

    let num_mix = attacker_mixnode_count(attacker_nodes, mode, version);
    let num_gw = attacker_nodes - num_mix;

    for _ in 0..num_mix {
        let layer = random_mix_layer(rng);
        topology.push(SimNode::new(
            NodeRole::Mixnode,
            layer,
            NodeClass::Attacker,
            config.attack_node_uptime,
            attacker_stake,
            config.score_window,
        ));
    }

    for _ in 0..num_gw {
        let layer = random_gateway_layer(rng, config);
        topology.push(SimNode::new(
            NodeRole::Gateway,
            layer,
            NodeClass::Attacker,
            config.attack_node_uptime,
            attacker_stake,
            config.score_window,
        ));
    }

    topology
}

// ─── Tests ──────────────────────────────────────────────────────────────────
