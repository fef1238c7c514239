// Simulation Configuration — network constants and trial schedule
// Passed explicitly into every component; there is no ambient global config.

/// Network and schedule parameters for one simulation campaign.
///
/// Defaults mirror the modelled network's published values (June 2025
/// snapshot): a 5-layer topology with gateway layers at 0 and 4, a 240-node
/// active set, and stake saturation at 1,034,081 units.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Total number of topology layers.
    pub total_layers: usize,
    /// Number of mixnode layers (1..=3).
    pub mixnode_layers: usize,
    /// Active-set capacity of each mixnode layer.
    pub mixnodes_per_layer: usize,
    /// Active-set capacity of the entry gateway layer (layer 0).
    pub entry_gateways: usize,
    /// Active-set capacity of the exit gateway layer (layer 4).
    pub exit_gateways: usize,
    /// Stake amount at which selection weight saturates.
    pub stake_saturation: f64,
    /// Minimum stake required to run a node.
    pub min_stake: f64,
    /// Snapshot stake figures are reported in units of 10^-6 stake.
    pub stake_unit_divisor: f64,
    /// Exponent applied to uptime when deriving selection weight.
    pub uptime_exponent: i32,
    /// Rolling score history length (epochs * rounds per epoch).
    pub score_window: usize,
    /// Probability that a new gateway lands on the entry layer (else exit).
    pub entry_gateway_probability: f64,
    /// Starting uptime for freshly created attacker-side nodes.
    pub attack_node_uptime: f64,
    /// Attack duration in epochs.
    pub epochs: u32,
    /// Testing rounds within one epoch.
    pub rounds_per_epoch: u32,
    /// Test paths formed per node per round (v2/v3 path budget).
    pub paths_per_node: usize,
    /// Duplicate probes sent down each test path.
    pub probes_per_path: usize,
    /// Number of validated paths sampled per round (v1).
    pub validated_paths: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            total_layers: 5,
            mixnode_layers: 3,
            mixnodes_per_layer: 40,
            entry_gateways: 50,
            exit_gateways: 70,
            stake_saturation: 1_034_081.0,
            min_stake: 100.0,
            stake_unit_divisor: 1_000_000.0,
            uptime_exponent: 20,
            score_window: 24 * 4,
            entry_gateway_probability: 0.4,
            attack_node_uptime: 0.98,
            epochs: 24,
            rounds_per_epoch: 4,
            paths_per_node: 4,
            probes_per_path: 3,
            validated_paths: 3,
        }
    }
}

impl SimConfig {
    /// Active-set capacity required for `layer`.
    pub fn layer_capacity(&self, layer: usize) -> usize {
        match layer {
            0 => self.entry_gateways,
            4 => self.exit_gateways,
            _ => self.mixnodes_per_layer,
        }
    }

    /// Total gateway slots across entry and exit layers.
    pub fn gateway_slots(&self) -> usize {
        self.entry_gateways + self.exit_gateways
    }

    /// Total mixnode slots across the three middle layers.
    pub fn mixnode_slots(&self) -> usize {
        self.mixnode_layers * self.mixnodes_per_layer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_capacities() {
        let config = SimConfig::default();
        assert_eq!(config.layer_capacity(0), 50);
        assert_eq!(config.layer_capacity(4), 70);
        assert_eq!(config.layer_capacity(2), 40);
        assert_eq!(config.gateway_slots(), 120);
        assert_eq!(config.mixnode_slots(), 120);
    }

    #[test]
    fn score_window_covers_full_attack() {
        let config = SimConfig::default();
        assert_eq!(
            config.score_window as u32,
            config.epochs * config.rounds_per_epoch
        );
    }
}
