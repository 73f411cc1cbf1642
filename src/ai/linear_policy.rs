// Linear policy - exported model weights applied to the observation

use std::fs;
use std::path::Path;
use std::sync::Arc;

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::{ObservationLayout, Policy};
use crate::error::PolicyError;
use crate::network::Direction;

/// Number of discrete actions (stop, up, down)
const ACTIONS: usize = 3;

/// Weights of a linear action head exported from a trained agent
///
/// On disk this is JSON:
/// `{"layout": "full", "weights": [[..], [..], [..]], "bias": [..], "obs_scale": [..]}`
/// with one weight row per action in index order (stop, up, down).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub layout: ObservationLayout,
    pub weights: Vec<Vec<f32>>,
    pub bias: Vec<f32>,
    /// Per-feature multiplier applied before the weights (normalization)
    #[serde(default)]
    pub obs_scale: Option<Vec<f32>>,
}

impl LinearModel {
    /// Read and validate a model file
    pub fn load(path: &Path) -> Result<Self, PolicyError> {
        if !path.exists() {
            return Err(PolicyError::NotFound(path.to_path_buf()));
        }
        let contents = fs::read_to_string(path)?;
        let model: LinearModel = serde_json::from_str(&contents)?;
        model.validate()?;
        Ok(model)
    }

    /// Check that every dimension agrees with the declared layout
    pub fn validate(&self) -> Result<(), PolicyError> {
        let features = self.layout.size();

        if self.weights.len() != ACTIONS {
            return Err(PolicyError::Shape(format!(
                "expected {} weight rows, found {}",
                ACTIONS,
                self.weights.len()
            )));
        }
        if let Some(row) = self.weights.iter().position(|row| row.len() != features) {
            return Err(PolicyError::Shape(format!(
                "weight row {} has {} entries, layout {:?} needs {}",
                row,
                self.weights[row].len(),
                self.layout,
                features
            )));
        }
        if self.bias.len() != ACTIONS {
            return Err(PolicyError::Shape(format!(
                "expected {} bias entries, found {}",
                ACTIONS,
                self.bias.len()
            )));
        }
        if let Some(scale) = &self.obs_scale {
            if scale.len() != features {
                return Err(PolicyError::Shape(format!(
                    "obs_scale has {} entries, layout {:?} needs {}",
                    scale.len(),
                    self.layout,
                    features
                )));
            }
        }
        Ok(())
    }

    /// Action logits for one observation.
    ///
    /// Missing rows or entries count as zero weight, so an unvalidated
    /// model degrades instead of panicking.
    pub fn logits(&self, observation: &[f32]) -> [f32; ACTIONS] {
        let mut logits = [0.0; ACTIONS];
        for (action, logit) in logits.iter_mut().enumerate() {
            let row = self.weights.get(action).map_or(&[][..], Vec::as_slice);
            let dot: f32 = row
                .iter()
                .zip(observation)
                .enumerate()
                .map(|(i, (w, x))| {
                    let scale = self
                        .obs_scale
                        .as_ref()
                        .and_then(|s| s.get(i).copied())
                        .unwrap_or(1.0);
                    w * x * scale
                })
                .sum();
            *logit = dot + self.bias.get(action).copied().unwrap_or(0.0);
        }
        logits
    }
}

/// Index of the largest logit; ties resolve to the lowest index
fn argmax(logits: &[f32; ACTIONS]) -> usize {
    let mut best = 0;
    for (i, value) in logits.iter().enumerate().skip(1) {
        if *value > logits[best] {
            best = i;
        }
    }
    best
}

fn softmax(logits: &[f32; ACTIONS]) -> [f32; ACTIONS] {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut probs = logits.map(|l| (l - max).exp());
    let total: f32 = probs.iter().sum();
    for p in probs.iter_mut() {
        *p /= total;
    }
    probs
}

/// Policy backed by a [`LinearModel`]
///
/// Deterministic mode takes the best action; stochastic mode samples from
/// the softmax of the logits.
pub struct LinearPolicy {
    model: Arc<LinearModel>,
    deterministic: bool,
    rng: StdRng,
}

impl LinearPolicy {
    pub fn new(model: Arc<LinearModel>, deterministic: bool) -> Self {
        Self {
            model,
            deterministic,
            rng: StdRng::from_entropy(),
        }
    }

    /// Stochastic policy with a reproducible random stream
    pub fn with_seed(model: Arc<LinearModel>, seed: u64) -> Self {
        Self {
            model,
            deterministic: false,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn sample(&mut self, logits: &[f32; ACTIONS]) -> usize {
        let probs = softmax(logits);
        match WeightedIndex::new(probs) {
            Ok(dist) => dist.sample(&mut self.rng),
            // NaN or degenerate logits
            Err(_) => argmax(logits),
        }
    }
}

impl Policy for LinearPolicy {
    fn decide(&mut self, observation: &[f32]) -> Direction {
        let logits = self.model.logits(observation);
        let action = if self.deterministic {
            argmax(&logits)
        } else {
            self.sample(&logits)
        };
        Direction::from_index(action).unwrap_or(Direction::Stop)
    }

    fn layout(&self) -> ObservationLayout {
        self.model.layout
    }

    fn name(&self) -> &str {
        "linear"
    }
}
