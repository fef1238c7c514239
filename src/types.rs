// Node Model — roles, classes, rolling score history, selection weight
// One SimNode per simulated participant; all mutable reputation state lives here.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

// ─── Node Role ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NodeRole {
    Mixnode,
    Gateway,
}

// ─── Node Class ─────────────────────────────────────────────────────────────

/// Economic role of a node from the attacker's point of view.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NodeClass {
    /// Mirrors a real, honest network participant from snapshot data.
    Target,
    /// Attacker-funded node that absorbs reputation damage ("B" nodes).
    Sacrifice,
    /// Attacker-funded node the adversary wants in the active set ("A" nodes).
    Attacker,
}

impl NodeClass {
    /// Sacrifice and attacker nodes both count as attacker-controlled.
    pub fn is_adversarial(&self) -> bool {
        matches!(self, Self::Sacrifice | Self::Attacker)
    }
}

// ─── Attack Mode ────────────────────────────────────────────────────────────

/// The path pattern the adversary is optimizing for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AttackMode {
    /// Compromise both endpoint gateways ("A***A").
    Endpoints,
    /// Compromise every hop ("AAAAA").
    FullPath,
}

// ─── Monitor Version ────────────────────────────────────────────────────────

/// Which network-monitor protocol variant the trial is attacking.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MonitorVersion {
    V1,
    V2,
    V3,
}

// ─── Score History ──────────────────────────────────────────────────────────

/// Fixed-length sliding window of per-round performance scores.
///
/// Newest entries are pushed to the front, the oldest entry falls off the
/// back; the window length never changes after construction. `None` marks a
/// round in which the node received no probes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreHistory {
    entries: VecDeque<Option<f64>>,
}

impl ScoreHistory {
    /// A window of `len` entries, all primed with `score`.
    pub fn warmed(score: f64, len: usize) -> Self {
        Self {
            entries: std::iter::repeat(Some(score)).take(len).collect(),
        }
    }

    /// Push the newest score, dropping the oldest entry.
    pub fn record(&mut self, score: Option<f64>) {
        self.entries.pop_back();
        self.entries.push_front(score);
    }

    /// Mean over non-gap entries; `None` when every entry is a gap.
    pub fn mean(&self) -> Option<f64> {
        let mut sum = 0.0;
        let mut n = 0usize;
        for entry in self.entries.iter().flatten() {
            sum += entry;
            n += 1;
        }
        if n == 0 {
            None
        } else {
            Some(sum / n as f64)
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ─── SimNode ────────────────────────────────────────────────────────────────

/// One simulated participant and its mutable reputation state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimNode {
    pub role: NodeRole,
    /// Topology layer, 0..=4; fixed at creation.
    pub layer: usize,
    pub class: NodeClass,

    /// Probes that made it back to the monitor (cumulative over a trial).
    pub completed: f64,
    /// Probes that never returned (cumulative over a trial).
    pub incomplete: f64,
    /// Consecutive dropped-probe events; reset whenever a path completes.
    pub consecutive_failures: i32,

    /// Rolling average of `score_history`; the performance reputation.
    pub uptime: f64,
    pub score_history: ScoreHistory,

    /// Economic stake backing the node (self bond plus delegations).
    pub stake: f64,
    /// Derived selection weight; recomputed every round.
    pub selection_weight: f64,

    /// Whether the node is in the current active set.
    pub is_active: bool,
    /// Whether the node has been picked onto a validated path (v1 only).
    pub is_validated: bool,
    /// Layer this mixnode is probed at during v1 testing.
    pub test_layer: usize,
}

impl SimNode {
    /// A fresh node with a fully warmed score history.
    pub fn new(
        role: NodeRole,
        layer: usize,
        class: NodeClass,
        uptime: f64,
        stake: f64,
        window: usize,
    ) -> Self {
        Self {
            role,
            layer,
            class,
            completed: 0.0,
            incomplete: 0.0,
            consecutive_failures: 0,
            uptime,
            score_history: ScoreHistory::warmed(uptime, window),
            stake,
            selection_weight: 0.0,
            is_active: false,
            is_validated: false,
            test_layer: 0,
        }
    }

    /// Recompute the active-set selection weight from stake and uptime.
    ///
    /// `weight = uptime^exponent * min(stake / saturation, 1)`. The high
    /// exponent makes the weight extremely sensitive to small uptime drops,
    /// which is exactly the leverage a dropping strategy exploits.
    pub fn recompute_selection_weight(&mut self, stake_saturation: f64, uptime_exponent: i32) {
        let stake_fraction = (self.stake / stake_saturation).min(1.0);
        self.selection_weight = self.uptime.powi(uptime_exponent) * stake_fraction;
    }

    /// Record one round's score and refresh the rolling uptime average.
    ///
    /// An all-gap window holds the previous uptime rather than producing a
    /// zero or NaN.
    pub fn record_round_score(&mut self, score: Option<f64>) {
        self.score_history.record(score);
        if let Some(mean) = self.score_history.mean() {
            self.uptime = mean;
        }
    }

    /// The node's completion ratio for the round, or `None` if it saw no
    /// probes.
    pub fn round_score(&self) -> Option<f64> {
        let total = self.completed + self.incomplete;
        if total == 0.0 {
            None
        } else {
            Some(self.completed / total)
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
