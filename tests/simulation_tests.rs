#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use framing_sim::aggregate::{aggregate_outcomes, AggregationError, ConfigKey};
    use framing_sim::config::SimConfig;
    use framing_sim::snapshot::{DeclaredRole, SnapshotRecord};
    use framing_sim::sweep::{run_epoch_sweep, run_sweep};
    use framing_sim::topology::{build_target_population, Topology};
    use framing_sim::trial::{run_trial, TrialParams};
    use framing_sim::types::{AttackMode, MonitorVersion};

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
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        build_target_population(&records, config, &mut rng)
    }

    fn short_config() -> SimConfig {
        SimConfig {
            epochs: 1,
            ..SimConfig::default()
        }
    }

    fn attack_params(sacrifice_nodes: u32) -> TrialParams {
        TrialParams {
            sacrifice_nodes,
            attacker_nodes: 10,
            sacrifice_stake: 100.0,
            attacker_stake: 1000.0,
            mode: AttackMode::Endpoints,
            version: MonitorVersion::V2,
            attack: true,
        }
    }

    #[test]
    fn test_sweep_averages_per_configuration_and_sorts() {
        let config = short_config();
        let base = base_topology(&config);
        let tasks = vec![attack_params(10), attack_params(20)];

        let results = run_sweep(&base, &tasks, 2, &config, 42).expect("sweep");
        assert_eq!(results.len(), 2);
        assert!(results[0].gateway_fraction <= results[1].gateway_fraction);
        for r in &results {
            assert!((0.0..=1.0).contains(&r.gateway_fraction));
            assert!((0.0..=1.0).contains(&r.mixnode_fraction));
            assert!((0.0..=1.0).contains(&r.path_prob.endpoints));
        }
    }

    #[test]
    fn test_sweep_is_reproducible_from_seed() {
        let config = short_config();
        let base = base_topology(&config);
        let tasks = vec![attack_params(10)];

        let first = run_sweep(&base, &tasks, 2, &config, 42).expect("first sweep");
        let second = run_sweep(&base, &tasks, 2, &config, 42).expect("second sweep");
        assert_eq!(first, second);
    }

    #[test]
    fn test_baseline_sweep_bounded_by_gateway_capacity() {
        let config = SimConfig::default();
        let base = base_topology(&config);
        let tasks = vec![TrialParams {
            sacrifice_nodes: 0,
            attacker_nodes: 100,
            sacrifice_stake: 0.0,
            attacker_stake: 1000.0,
            mode: AttackMode::Endpoints,
            version: MonitorVersion::V1,
            attack: false,
        }];

        let results = run_sweep(&base, &tasks, 3, &config, 11).expect("baseline sweep");
        assert_eq!(results.len(), 1);
        // Attackers only hold entry gateways, so at most 50 of the 120 slots.
        assert!(results[0].gateway_fraction <= 50.0 / 120.0 + 1e-12);
        assert_eq!(results[0].sacrifice_nodes, 0);
    }

    #[test]
    fn test_epoch_sweep_sorted_by_attack_length() {
        let config = SimConfig::default();
        let base = base_topology(&config);
        let combos = vec![TrialParams {
            sacrifice_nodes: 20,
            attacker_nodes: 10,
            sacrifice_stake: 100.0,
            attacker_stake: 1000.0,
            mode: AttackMode::Endpoints,
            version: MonitorVersion::V1,
            attack: true,
        }];

        let results = run_epoch_sweep(&base, &combos, 2, 2, &config, 5).expect("epoch sweep");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].epochs, 1);
        assert_eq!(results[1].epochs, 2);
        for r in &results {
            assert!((0.0..=1.0).contains(&r.attacker_gateway_fraction));
        }
    }

    #[test]
    fn test_unexpected_configuration_fails_aggregation() {
        let config = short_config();
        let base = base_topology(&config);
        let params = attack_params(10);

        let outcome = run_trial(&base, &params, &config, 3).expect("trial");
        let expected = [ConfigKey::new(99, 10, 100.0, 1000.0)].into_iter().collect();
        let result = aggregate_outcomes(&[outcome], &expected);
        assert!(matches!(
            result,
            Err(AggregationError::UnexpectedKey { .. })
        ));
    }
}
