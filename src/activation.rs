use serde::{Deserialize, Serialize};

/// The nonlinearity applied by every neuron to the sum of its inputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActFn {
    #[default]
    Tanh,
}

use ActFn::*;

impl ActFn {
    pub fn f(&self, x: f64) -> f64 {
        match self {
            Tanh => x.tanh(),
        }
    }

    /// The derivative expressed in terms of the activation's own output, `f(x)`, instead of `x`.
    ///
    /// Neurons cache their last output, so this avoids recomputing it from the weighted sum.
    pub fn df(&self, output: f64) -> f64 {
        match self {
            Tanh => 1. - output * output,
        }
    }
}
