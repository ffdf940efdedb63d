use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, Receiver, Sender};

/// Every connection carries at most one value per pass and direction.
const CHANNEL_CAPACITY: usize = 1;

/// The weight of a connection and the momentum term of its last update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weight {
    pub value: f64,
    pub delta: f64,
}

/// A weight shared between the connection's source and destination neurons.
pub(crate) type SharedWeight = Arc<Mutex<Weight>>;

/// The endpoints of a connection that belong to its destination neuron.
pub(crate) struct Terminal {
    /// Where the forward signals arrive.
    pub(crate) signal: Receiver<f64>,
    /// Where the weighted gradients are sent back through.
    pub(crate) gradient: Sender<f64>,
}

/// A directed, weighted edge between two neurons, owned by its source neuron.
///
/// Each connection has its own forward and backward channels, so the destination neuron reads
/// its inputs in a fixed order and the two directions never share a queue.
pub struct Connection {
    weight: SharedWeight,
    signal: Option<Sender<f64>>,
    gradient: Option<Receiver<f64>>,
    terminal: Option<Terminal>,
}

impl Connection {
    /// Creates a new unwired `Connection`.
    ///
    /// # Arguments
    /// * `weight` - The initial weight.
    /// * `delta_weight` - The initial momentum term.
    ///
    /// # Returns
    /// A new `Connection` instance.
    pub(crate) fn new(weight: f64, delta_weight: f64) -> Self {
        let (signal_tx, signal_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (gradient_tx, gradient_rx) = mpsc::channel(CHANNEL_CAPACITY);

        Self {
            weight: Arc::new(Mutex::new(Weight {
                value: weight,
                delta: delta_weight,
            })),
            signal: Some(signal_tx),
            gradient: Some(gradient_rx),
            terminal: Some(Terminal {
                signal: signal_rx,
                gradient: gradient_tx,
            }),
        }
    }

    pub fn weight(&self) -> f64 {
        self.weight.lock().value
    }

    pub fn delta_weight(&self) -> f64 {
        self.weight.lock().delta
    }

    /// Returns whether the destination end was handed to a neuron.
    pub fn is_wired(&self) -> bool {
        self.terminal.is_none()
    }

    /// Overrides the weight and momentum term of this connection.
    pub fn set_weight(&self, weight: Weight) {
        *self.weight.lock() = weight;
    }

    pub(crate) fn shared_weight(&self) -> SharedWeight {
        Arc::clone(&self.weight)
    }

    /// Hands over the destination's endpoints, this happens once when wiring the network.
    pub(crate) fn take_terminal(&mut self) -> Option<Terminal> {
        self.terminal.take()
    }

    /// Hands over the forward sender, the neuron's forward task takes it when started.
    pub(crate) fn take_signal(&mut self) -> Option<Sender<f64>> {
        self.signal.take()
    }

    /// Hands over the backward receiver, the neuron's backward task takes it when started.
    pub(crate) fn take_gradient(&mut self) -> Option<Receiver<f64>> {
        self.gradient.take()
    }

    /// Sends `output` weighted by this connection to its destination.
    ///
    /// # Returns
    /// `false` if the sender was already taken or the destination stopped listening.
    pub(crate) async fn send(&self, output: f64) -> bool {
        let Some(signal) = &self.signal else {
            return false;
        };

        let value = output * self.weight();
        signal.send(value).await.is_ok()
    }
}
