mod connection;
mod layer;
mod network;
mod neuron;

pub use connection::{Connection, Weight};
pub use layer::Layer;
pub use network::Network;
pub use neuron::Neuron;
