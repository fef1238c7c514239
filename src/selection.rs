// Active-Set Selector — weighted draw per layer, honoring capacity constraints
// Selection probability is each node's weight normalized within its layer;
// zero-weight nodes only enter as uniform filler when the weighted pool runs dry.

use rand::seq::index::{sample, sample_weighted};
use rand::Rng;

use crate::config::SimConfig;
use crate::topology::Topology;

/// A realized active set: per layer, the indices of the selected nodes.
/// Lifetime is one selection cycle; a fresh draw replaces it entirely.
#[derive(Debug, Clone, Default)]
pub struct ActiveSet {
    pub layers: [Vec<usize>; 5],
}

impl ActiveSet {
    pub fn total(&self) -> usize {
        self.layers.iter().map(Vec::len).sum()
    }
}

/// Errors raised during the active-set draw.
#[derive(Debug, thiserror::Error)]
pub enum SelectionError {
    #[error(
        "layer {layer} cannot be filled: need {required} nodes, \
         {weighted} weighted and {zero_weight} zero-weight available"
    )]
    LayerUnderfilled {
        layer: usize,
        required: usize,
        weighted: usize,
        zero_weight: usize,
    },
}

/// Draw a fresh active set from the current selection weights.
///
/// Per layer: a weighted sample without replacement from the weight>0 nodes,
/// topped up with a uniform sample from the weight==0 nodes if the weighted
/// pool is smaller than the layer capacity. Under-filling past that is a
/// population misconfiguration and aborts the run.
///
/// The `is_active` flags across the whole topology are rewritten once, after
/// all five layers are drawn.
pub fn draw_active_set<R: Rng>(
    topology: &mut Topology,
    config: &SimConfig,
    rng: &mut R,
) -> Result<ActiveSet, SelectionError> {
    let mut active = ActiveSet::default();

    for layer in 0..config.total_layers {
        let required = config.layer_capacity(layer);
        let selected = draw_layer(topology, layer, required, rng)?;
        active.layers[layer] = selected;
    }

    // Atomic flag rewrite: reset everyone, then mark the selected.
    for node in &mut topology.nodes {
        node.is_active = false;
    }
    for layer in &active.layers {
        for &idx in layer {
            topology.nodes[idx].is_active = true;
        }
    }

    Ok(active)
}

fn draw_layer<R: Rng>(
    topology: &Topology,
    layer: usize,
    required: usize,
    rng: &mut R,
) -> Result<Vec<usize>, SelectionError> {
    let mut weighted: Vec<usize> = Vec::new();
    let mut zero_weight: Vec<usize> = Vec::new();
    for &idx in &topology.layers[layer] {
        if topology.nodes[idx].selection_weight > 0.0 {
            weighted.push(idx);
        } else {
            zero_weight.push(idx);
        }
    }

    let from_weighted = required.min(weighted.len());
    let mut selected: Vec<usize> = Vec::with_capacity(required);
    if from_weighted > 0 {
        let chosen = sample_weighted(
            rng,
            weighted.len(),
            |i| topology.nodes[weighted[i]].selection_weight,
            from_weighted,
        )
        .map_err(|_| SelectionError::LayerUnderfilled {
            layer,
            required,
            weighted: weighted.len(),
            zero_weight: zero_weight.len(),
        })?;
        selected.extend(chosen.into_iter().map(|i| weighted[i]));
    }

    let shortfall = required - selected.len();
    if shortfall > 0 {
        if zero_weight.len() < shortfall {
            return Err(SelectionError::LayerUnderfilled {
                layer,
                required,
                weighted: weighted.len(),
                zero_weight: zero_weight.len(),
            });
        }
        let filler = sample(rng, zero_weight.len(), shortfall);
        selected.extend(filler.into_iter().map(|i| zero_weight[i]));
    }

    Ok(selected)
}

// ─── Tests ──────────────────────────────────────────────────────────────────
