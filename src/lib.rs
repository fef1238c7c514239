// Framing Simulation Suite — active-set capture under adversarial monitoring
// Monte Carlo engine for mixnet reward-set selection with network monitors
// that drop underperforming nodes, and attackers gaming the drop rules.

pub mod aggregate;
pub mod config;
pub mod metrics;
pub mod monitor;
pub mod selection;
pub mod snapshot;
pub mod sweep;
pub mod topology;
pub mod trial;
pub mod types;

pub use aggregate::{AggregatedEpochResult, AggregatedResult};
pub use config::SimConfig;
pub use snapshot::load_snapshot;
pub use sweep::{build_tasks, epoch_sweep_combos, run_epoch_sweep, run_sweep, Scale};
pub use topology::{build_target_population, Topology};
pub use trial::{run_trial, TrialOutcome, TrialParams};
pub use types::{AttackMode, MonitorVersion, NodeClass, NodeRole, SimNode};
