// Network-Monitor Dropping Strategies — the three protocol variants under attack
// A round forms synthetic 5-hop test paths [gw, l1, l2, l3, gw] and decides,
// per path, whether the probe completes; sacrifice nodes drop probes to frame
// the honest nodes around them.

use rand::seq::index::{sample_weighted, IndexVec};
use rand::Rng;

use crate::config::SimConfig;
use crate::topology::Topology;
use crate::types::{MonitorVersion, NodeClass, SimNode};

/// A test path: node indices for [gateway, layer1, layer2, layer3, gateway].
/// The same gateway index sits at both ends.
pub type TestPath = [usize; 5];

/// Additive constant keeping zero-uptime nodes sampleable on validated paths.
const WEIGHT_EPS: f64 = 1e-10;

/// Errors raised while forming test paths.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("layer {0} has no nodes to form test paths from")]
    EmptyLayer(usize),

    #[error("cannot sample {needed} validated-path nodes from a pool of {available}")]
    ValidatedPathPool { needed: usize, available: usize },
}

// ─── Round driver ───────────────────────────────────────────────────────────

/// Run one full round of testing under the given monitor version.
pub fn run_round<R: Rng>(
    version: MonitorVersion,
    topology: &mut Topology,
    config: &SimConfig,
    rng: &mut R,
) -> Result<(), MonitorError> {
    match version {
        MonitorVersion::V1 => run_v1(topology, config, rng),
        MonitorVersion::V2 => {
            for path in form_test_paths(topology, config, rng)? {
                for _ in 0..config.probes_per_path {
                    apply_v2(topology, &path);
                }
            }
            Ok(())
        }
        MonitorVersion::V3 => {
            for path in form_test_paths(topology, config, rng)? {
                for _ in 0..config.probes_per_path {
                    apply_v3(topology, &path);
                }
            }
            Ok(())
        }
    }
}

/// Push every node's round score into its history and refresh its selection
/// weight. Nodes that saw no probes record a gap.
pub fn record_round_scores(topology: &mut Topology, config: &SimConfig) {
    for node in &mut topology.nodes {
        let score = node.round_score();
        node.record_round_score(score);
        node.recompute_selection_weight(config.stake_saturation, config.uptime_exponent);
    }
}

// ─── Path formation (v2/v3) ─────────────────────────────────────────────────

/// Form one round's worth of random test paths: `total_nodes * paths_per_node`
/// of them, gateways pooled across both gateway layers.
fn form_test_paths<R: Rng>(
    topology: &Topology,
    config: &SimConfig,
    rng: &mut R,
) -> Result<Vec<TestPath>, MonitorError> {
    let gateways = topology.gateway_indices();
    if gateways.is_empty() {
        return Err(MonitorError::EmptyLayer(0));
    }
    for layer in 1..=3 {
        if topology.layers[layer].is_empty() {
            return Err(MonitorError::EmptyLayer(layer));
        }
    }

    let num_paths = topology.len() * config.paths_per_node;
    let mut paths = Vec::with_capacity(num_paths);
    for _ in 0..num_paths {
        let gw = gateways[rng.gen_range(0..gateways.len())];
        let l1 = topology.layers[1][rng.gen_range(0..topology.layers[1].len())];
        let l2 = topology.layers[2][rng.gen_range(0..topology.layers[2].len())];
        let l3 = topology.layers[3][rng.gen_range(0..topology.layers[3].len())];
        paths.push([gw, l1, l2, l3, gw]);
    }
    Ok(paths)
}

// ─── Strategy v2: drop unless adjacent to an attacker ───────────────────────

/// Completion rule for v2: a sacrifice hop drops the probe unless its
/// previous or next hop is attacker-class (dropping there would implicate
/// the attacker node itself).
fn v2_path_completes(nodes: &[SimNode], path: &TestPath) -> bool {
    let mut complete = true;
    for (i, &idx) in path.iter().enumerate() {
        if nodes[idx].class == NodeClass::Sacrifice {
            if attacker_adjacent(nodes, path, i) {
                return true;
            }
            complete = false;
        }
    }
    complete
}

fn apply_v2(topology: &mut Topology, path: &TestPath) {
    if v2_path_completes(&topology.nodes, path) {
        for &idx in path {
            topology.nodes[idx].completed += 1.0;
        }
    } else {
        for &idx in path {
            topology.nodes[idx].incomplete += 1.0;
        }
    }
}

// ─── Strategy v3: guarded drop with guilt detection ─────────────────────────

/// Completion rule for v3: a sacrifice hop refuses to drop when it is in the
/// active set, already sits at exactly two consecutive failures, or has an
/// attacker-class neighbour. A path without any sacrifice hop always
/// completes.
fn v3_path_completes(nodes: &[SimNode], path: &TestPath) -> bool {
    let mut complete = true;
    let mut has_sacrifice = false;
    for (i, &idx) in path.iter().enumerate() {
        let node = &nodes[idx];
        if node.class == NodeClass::Sacrifice {
            has_sacrifice = true;
            if node.is_active || node.consecutive_failures == 2 {
                return true;
            }
            if attacker_adjacent(nodes, path, i) {
                return true;
            }
            complete = false;
        }
    }
    if !has_sacrifice {
        return true;
    }
    complete
}

fn apply_v3(topology: &mut Topology, path: &TestPath) {
    if v3_path_completes(&topology.nodes, path) {
        for &idx in path {
            let node = &mut topology.nodes[idx];
            node.completed += 1.0;
            node.consecutive_failures = 0;
        }
    } else {
        // Blame whoever crosses the failure threshold; if nobody does,
        // penalize the whole path. The shared gateway takes both of its
        // slots' increments, same as every other hop position.
        let mut any_guilty = false;
        for &idx in path {
            let node = &mut topology.nodes[idx];
            node.consecutive_failures += 1;
            if node.consecutive_failures > 2 {
                node.incomplete += 1.0;
                any_guilty = true;
            }
        }
        if !any_guilty {
            for &idx in path {
                topology.nodes[idx].incomplete += 1.0;
            }
        }
    }
}

fn attacker_adjacent(nodes: &[SimNode], path: &TestPath, position: usize) -> bool {
    let prev = position > 0 && nodes[path[position - 1]].class == NodeClass::Attacker;
    let next =
        position + 1 < path.len() && nodes[path[position + 1]].class == NodeClass::Attacker;
    prev || next
}

// ─── Strategy v1: validated-path substitution ───────────────────────────────

/// Run one v1 round: sample 3 validated paths, then probe every node in the
/// network by swapping it into each validated path at a slot matching its
/// role. Only the swapped-in test node's counters are updated per probe.
fn run_v1<R: Rng>(
    topology: &mut Topology,
    config: &SimConfig,
    rng: &mut R,
) -> Result<(), MonitorError> {
    let validated = sample_validated_paths(topology, config, rng)?;

    let mixnodes = topology.mixnode_indices();
    let gateways = topology.gateway_indices();

    // Each mixnode gets a fresh random test slot for this round.
    for &idx in &mixnodes {
        topology.nodes[idx].test_layer = rng.gen_range(1..=3);
    }

    for vpath in &validated {
        for &mix in &mixnodes {
            let mut path = *vpath;
            path[topology.nodes[mix].test_layer] = mix;
            for _ in 0..config.probes_per_path {
                probe_substitute(topology, &path, mix);
            }
        }
        for &gw in &gateways {
            let mut path = *vpath;
            path[0] = gw;
            path[4] = gw;
            for _ in 0..config.probes_per_path {
                probe_substitute(topology, &path, gw);
            }
        }
    }
    Ok(())
}

/// Sample the round's validated paths: per layer class, a weighted draw
/// without replacement over `uptime + eps`, one node per path. Every node on
/// a validated path is flagged validated.
fn sample_validated_paths<R: Rng>(
    topology: &mut Topology,
    config: &SimConfig,
    rng: &mut R,
) -> Result<Vec<TestPath>, MonitorError> {
    let gateways = topology.gateway_indices();
    let gws = weighted_pick(&topology.nodes, &gateways, config.validated_paths, rng)?;
    let l1 = weighted_pick(&topology.nodes, &topology.layers[1], config.validated_paths, rng)?;
    let l2 = weighted_pick(&topology.nodes, &topology.layers[2], config.validated_paths, rng)?;
    let l3 = weighted_pick(&topology.nodes, &topology.layers[3], config.validated_paths, rng)?;

    let mut paths = Vec::with_capacity(config.validated_paths);
    for i in 0..config.validated_paths {
        let path = [gws[i], l1[i], l2[i], l3[i], gws[i]];
        for &idx in &path {
            topology.nodes[idx].is_validated = true;
        }
        paths.push(path);
    }
    Ok(paths)
}

/// Weighted sample without replacement from `pool`, by uptime.
fn weighted_pick<R: Rng>(
    nodes: &[SimNode],
    pool: &[usize],
    amount: usize,
    rng: &mut R,
) -> Result<Vec<usize>, MonitorError> {
    if pool.len() < amount {
        return Err(MonitorError::ValidatedPathPool {
            needed: amount,
            available: pool.len(),
        });
    }
    let chosen: IndexVec = sample_weighted(
        rng,
        pool.len(),
        |i| nodes[pool[i]].uptime + WEIGHT_EPS,
        amount,
    )
    .map_err(|_| MonitorError::ValidatedPathPool {
        needed: amount,
        available: pool.len(),
    })?;
    Ok(chosen.into_iter().map(|i| pool[i]).collect())
}

/// Completion rule for v1 substitute paths: fails only when a *validated*
/// sacrifice hop sits next to an attacker-or-sacrifice hop. Unlike v2/v3,
/// the adjacency check covers both adversarial classes.
fn v1_path_completes(nodes: &[SimNode], path: &TestPath) -> bool {
    let mut complete = true;
    for (i, &idx) in path.iter().enumerate() {
        let node = &nodes[idx];
        if node.is_validated && node.class == NodeClass::Sacrifice {
            let prev = i > 0 && nodes[path[i - 1]].class.is_adversarial();
            let next = i + 1 < path.len() && nodes[path[i + 1]].class.is_adversarial();
            if prev || next {
                return true;
            }
            complete = false;
        }
    }
    complete
}

fn probe_substitute(topology: &mut Topology, path: &TestPath, test_node: usize) {
    if v1_path_completes(&topology.nodes, path) {
        topology.nodes[test_node].completed += 1.0;
    } else {
        topology.nodes[test_node].incomplete += 1.0;
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NodeRole, SimNode};

    fn node(layer: usize, class: NodeClass) -> SimNode {
        let role = if layer == 0 || layer == 4 {
            NodeRole::Gateway
        } else {
            NodeRole::Mixnode
        };
        SimNode::new(role, layer, class, 0.95, 1000.0, 96)
    }

    /// Topology holding exactly one path's worth of nodes:
    /// [gw, l1, l2, l3] with the given classes, gateway reused at both ends.
    fn path_topology(classes: [NodeClass; 4]) -> (Topology, TestPath) {
        let mut topo = Topology::empty();
        let gw = topo.push(node(0, classes[0]));
        let l1 = topo.push(node(1, classes[1]));
        let l2 = topo.push(node(2, classes[2]));
        let l3 = topo.push(node(3, classes[3]));
        (topo, [gw, l1, l2, l3, gw])
    }

    #[test]
    fn v2_sacrifice_adjacent_to_attacker_completes() {
        // [gw, B, A, honest, gw]: B at position 1 has an attacker next hop.
        let (topo, path) = path_topology([
            NodeClass::Target,
            NodeClass::Sacrifice,
            NodeClass::Attacker,
            NodeClass::Target,
        ]);
        assert!(v2_path_completes(&topo.nodes, &path));
    }

    #[test]
    fn v2_isolated_sacrifice_drops() {
        let (mut topo, path) = path_topology([
            NodeClass::Target,
            NodeClass::Sacrifice,
            NodeClass::Target,
            NodeClass::Attacker,
        ]);
        // B at position 1, attacker at position 3: not adjacent, path drops.
        assert!(!v2_path_completes(&topo.nodes, &path));
        apply_v2(&mut topo, &path);
        // Gateway occupies both end slots so it is penalized twice.
        assert_eq!(topo.nodes[path[0]].incomplete, 2.0);
        for &idx in &path[1..4] {
            assert_eq!(topo.nodes[idx].incomplete, 1.0);
            assert_eq!(topo.nodes[idx].completed, 0.0);
        }
    }

    #[test]
    fn v3_two_failures_forces_completion() {
        let (mut topo, path) = path_topology([
            NodeClass::Target,
            NodeClass::Sacrifice,
            NodeClass::Target,
            NodeClass::Target,
        ]);
        topo.nodes[path[1]].consecutive_failures = 2;
        assert!(v3_path_completes(&topo.nodes, &path));
        apply_v3(&mut topo, &path);
        assert_eq!(topo.nodes[path[1]].consecutive_failures, 0);
        assert_eq!(topo.nodes[path[1]].completed, 1.0);
    }

    #[test]
    fn v3_active_sacrifice_refuses_to_drop() {
        let (topo_base, path) = path_topology([
            NodeClass::Target,
            NodeClass::Sacrifice,
            NodeClass::Target,
            NodeClass::Target,
        ]);
        let mut topo = topo_base;
        topo.nodes[path[1]].is_active = true;
        assert!(v3_path_completes(&topo.nodes, &path));
    }

    #[test]
    fn v3_broad_penalty_when_no_guilt() {
        let (mut topo, path) = path_topology([
            NodeClass::Target,
            NodeClass::Sacrifice,
            NodeClass::Target,
            NodeClass::Target,
        ]);
        // Fresh nodes: the drop raises everyone to 1 failure, nobody crosses
        // the threshold, so the whole path is penalized.
        assert!(!v3_path_completes(&topo.nodes, &path));
        apply_v3(&mut topo, &path);
        for &idx in &path[1..4] {
            assert_eq!(topo.nodes[idx].incomplete, 1.0);
            assert_eq!(topo.nodes[idx].consecutive_failures, 1);
        }
        // Gateway hit twice (both slots).
        assert_eq!(topo.nodes[path[0]].consecutive_failures, 2);
    }

    #[test]
    fn v3_pins_guilt_after_threshold() {
        let (mut topo, path) = path_topology([
            NodeClass::Target,
            NodeClass::Sacrifice,
            NodeClass::Target,
            NodeClass::Target,
        ]);
        // The l2 node is one failure away from the threshold.
        topo.nodes[path[2]].consecutive_failures = 2;
        apply_v3(&mut topo, &path);
        assert_eq!(topo.nodes[path[2]].incomplete, 1.0);
        // Guilt was pinned, so nobody else is penalized.
        assert_eq!(topo.nodes[path[1]].incomplete, 0.0);
        assert_eq!(topo.nodes[path[3]].incomplete, 0.0);
    }

    #[test]
    fn v1_only_validated_sacrifice_drops() {
        let (mut topo, path) = path_topology([
            NodeClass::Target,
            NodeClass::Sacrifice,
            NodeClass::Sacrifice,
            NodeClass::Target,
        ]);
        // Not validated: path completes regardless of adjacency.
        assert!(v1_path_completes(&topo.nodes, &path));

        // Validate the l1 sacrifice; its next hop is sacrifice-class, which
        // counts as adjacency under v1's wider rule, so it must not drop.
        topo.nodes[path[1]].is_validated = true;
        assert!(v1_path_completes(&topo.nodes, &path));

        // An isolated validated sacrifice does drop.
        let (mut topo2, path2) = path_topology([
            NodeClass::Target,
            NodeClass::Sacrifice,
            NodeClass::Target,
            NodeClass::Target,
        ]);
        topo2.nodes[path2[1]].is_validated = true;
        assert!(!v1_path_completes(&topo2.nodes, &path2));
    }

    #[test]
    fn v1_probe_updates_only_test_node() {
        let (mut topo, path) = path_topology([
            NodeClass::Target,
            NodeClass::Sacrifice,
            NodeClass::Target,
            NodeClass::Target,
        ]);
        topo.nodes[path[1]].is_validated = true;
        probe_substitute(&mut topo, &path, path[2]);
        assert_eq!(topo.nodes[path[2]].incomplete, 1.0);
        assert_eq!(topo.nodes[path[1]].incomplete, 0.0);
        assert_eq!(topo.nodes[path[0]].incomplete, 0.0);
    }

    #[test]
    fn record_round_scores_pushes_gap_for_unprobed() {
        let config = SimConfig::default();
        let (mut topo, path) = path_topology([
            NodeClass::Target,
            NodeClass::Target,
            NodeClass::Target,
            NodeClass::Target,
        ]);
        topo.nodes[path[1]].completed = 3.0;
        topo.nodes[path[1]].incomplete = 1.0;
        record_round_scores(&mut topo, &config);
        // Probed node's uptime moves toward 0.75; unprobed nodes hold 0.95.
        assert!(topo.nodes[path[1]].uptime < 0.95);
        assert!((topo.nodes[path[2]].uptime - 0.95).abs() < 1e-12);
        // Weights were refreshed for everyone.
        assert!(topo.nodes[path[2]].selection_weight > 0.0);
    }
}
