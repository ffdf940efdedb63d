use std::{error::Error, fmt};

use rand::distr::uniform::Error as UniformError;

/// The result type used across the network.
pub type Result<T> = std::result::Result<T, NetErr>;

/// The network's error type.
#[derive(Debug, Clone, PartialEq)]
pub enum NetErr {
    TopologyTooShort {
        got: usize,
    },
    EmptyLayer {
        layer: usize,
    },
    InvalidConfig(String),
    WeightGenExhausted {
        layer: usize,
        neuron: usize,
    },
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    BarrierOverflow {
        pending: usize,
        more: usize,
    },
    NoRuntime,
    NotStarted,
    AlreadyStarted,
    Poisoned,
    Disconnected {
        layer: usize,
        neuron: usize,
    },
}

impl fmt::Display for NetErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetErr::TopologyTooShort { got } => write!(
                f,
                "a network needs at least an input, a hidden and an output layer, got {got} layers"
            ),
            NetErr::EmptyLayer { layer } => write!(f, "layer {layer} has no neurons"),
            NetErr::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            NetErr::WeightGenExhausted { layer, neuron } => write!(
                f,
                "weight generator exhausted while building neuron {neuron} of layer {layer}"
            ),
            NetErr::SizeMismatch {
                what,
                got,
                expected,
            } => write!(f, "{what} size mismatch: got {got}, expected {expected}"),
            NetErr::BarrierOverflow { pending, more } => write!(
                f,
                "can't wait for {more} more completion signals on top of {pending}"
            ),
            NetErr::NoRuntime => write!(f, "neurons can only be started within a tokio runtime"),
            NetErr::NotStarted => write!(f, "the network was not started"),
            NetErr::AlreadyStarted => write!(f, "the network was already started"),
            NetErr::Poisoned => write!(
                f,
                "a previous pass was interrupted, the network state is no longer consistent"
            ),
            NetErr::Disconnected { layer, neuron } => {
                write!(f, "neuron {neuron} of layer {layer} is no longer running")
            }
        }
    }
}

impl Error for NetErr {}

impl From<UniformError> for NetErr {
    fn from(value: UniformError) -> Self {
        Self::InvalidConfig(value.to_string())
    }
}
