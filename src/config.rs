use serde::{Deserialize, Serialize};

use crate::{ActFn, NetErr, Result};

/// How the weights of the connections are drawn when the network is built.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightInit {
    /// Uniformly distributed over `[low, high)`.
    Uniform { low: f64, high: f64 },
    Const { value: f64 },
}

impl Default for WeightInit {
    fn default() -> Self {
        Self::Uniform { low: -1., high: 1. }
    }
}

/// Hyper-parameters shared by every neuron of a network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Learning rate.
    pub eta: f64,
    /// Momentum, the fraction of the previous weight change carried into the next one.
    pub alpha: f64,
    /// Smoothing factor of the recent average error.
    pub smoothing: f64,
    pub init: WeightInit,
    pub initial_delta_weight: f64,
    /// Whether input values go through the activation function before being fanned out.
    pub apply_activation_to_input: bool,
    pub act_fn: ActFn,
    pub seed: Option<u64>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            eta: 0.15,
            alpha: 0.5,
            smoothing: 0.05,
            init: WeightInit::default(),
            initial_delta_weight: 0.,
            apply_activation_to_input: false,
            act_fn: ActFn::default(),
            seed: None,
        }
    }
}

impl NetworkConfig {
    /// Checks the hyper-parameters are usable.
    ///
    /// # Returns
    /// An error describing the first invalid field found.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("eta", self.eta), ("alpha", self.alpha)] {
            if !value.is_finite() || value < 0. {
                return Err(NetErr::InvalidConfig(format!(
                    "{name} must be finite and non negative, got {value}"
                )));
            }
        }

        if !(self.smoothing > 0. && self.smoothing <= 1.) {
            return Err(NetErr::InvalidConfig(format!(
                "smoothing must lie in (0, 1], got {}",
                self.smoothing
            )));
        }

        if !self.initial_delta_weight.is_finite() {
            return Err(NetErr::InvalidConfig(format!(
                "initial_delta_weight must be finite, got {}",
                self.initial_delta_weight
            )));
        }

        match self.init {
            WeightInit::Uniform { low, high } if !(low < high) || !(high - low).is_finite() => Err(
                NetErr::InvalidConfig(format!("empty weight range [{low}, {high})")),
            ),
            WeightInit::Const { value } if !value.is_finite() => Err(NetErr::InvalidConfig(
                format!("constant weight must be finite, got {value}"),
            )),
            _ => Ok(()),
        }
    }
}
