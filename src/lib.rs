//! A fully connected feed-forward neural network trained with backpropagation and momentum,
//! where every neuron is an independent task joined to its neighbours by per-connection
//! channels.
//!
//! ```
//! use neural_dataflow::{Network, NetworkConfig, Topology};
//!
//! # tokio_test::block_on(async {
//! let config = NetworkConfig { seed: Some(7), ..Default::default() };
//! let mut net = Network::with_config(Topology::new([2, 3, 1])?, config)?;
//! net.start()?;
//!
//! net.feed_forward(&[0.5, -0.5]).await?;
//! net.backpropagate(&[0.25]).await?;
//!
//! assert_eq!(net.get_results().len(), 1);
//! # Ok::<(), neural_dataflow::NetErr>(())
//! # }).unwrap();
//! ```

pub mod activation;
pub mod config;
pub mod error;
pub mod initialization;
pub mod net;
pub mod synchronization;
pub mod topology;

pub use activation::ActFn;
pub use config::{NetworkConfig, WeightInit};
pub use error::{NetErr, Result};
pub use net::{Connection, Layer, Network, Neuron, Weight};
pub use topology::{Data, Topology};
