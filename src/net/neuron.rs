use std::sync::Arc;

use log::{debug, trace};
use parking_lot::Mutex;
use tokio::{
    sync::mpsc::{Receiver, Sender},
    task::JoinSet,
};

use super::connection::{Connection, SharedWeight, Weight};
use crate::{ActFn, NetErr, Result, synchronization::Signal};

/// The scalars a neuron computes on each pass.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct NeuronState {
    pub(crate) output: f64,
    pub(crate) gradient: f64,
}

pub(crate) type SharedState = Arc<Mutex<NeuronState>>;

/// The fixed scalars every neuron of a network shares.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Params {
    pub(crate) eta: f64,
    pub(crate) alpha: f64,
    pub(crate) act_fn: ActFn,
}

/// An incoming connection as seen from its destination neuron.
struct Synapse {
    weight: SharedWeight,
    upstream: SharedState,
    signal: Option<Receiver<f64>>,
    gradient: Option<Sender<f64>>,
}

/// A computational unit of the network.
///
/// Once started, a non input neuron runs a forward task that waits for a value from every
/// incoming connection before firing, and hidden neurons also run a backward task that waits for
/// a weighted gradient from every outgoing connection.
pub struct Neuron {
    layer: usize,
    index: usize,
    incoming: usize,
    outgoing: usize,
    params: Params,
    state: SharedState,
    connections_out: Vec<Connection>,
    connections_in: Vec<Synapse>,
}

impl Neuron {
    /// Creates a new `Neuron` with one unwired outgoing connection per weight.
    ///
    /// # Arguments
    /// * `layer` - The position of the neuron's layer in the network.
    /// * `index` - The position of the neuron in its layer.
    /// * `incoming` - The size of the previous layer.
    /// * `weights` - The initial weight of each outgoing connection.
    /// * `delta_weight` - The initial momentum term of each outgoing connection.
    /// * `params` - The network's hyper-parameters.
    ///
    /// # Returns
    /// A new `Neuron` instance.
    pub(crate) fn new(
        layer: usize,
        index: usize,
        incoming: usize,
        weights: Vec<f64>,
        delta_weight: f64,
        params: Params,
    ) -> Self {
        let connections_out: Vec<_> = weights
            .into_iter()
            .map(|weight| Connection::new(weight, delta_weight))
            .collect();

        Self {
            layer,
            index,
            incoming,
            outgoing: connections_out.len(),
            params,
            state: SharedState::default(),
            connections_out,
            connections_in: Vec::with_capacity(incoming),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns the fan-in of this neuron.
    pub fn incoming(&self) -> usize {
        self.incoming
    }

    /// Returns the fan-out of this neuron.
    pub fn outgoing(&self) -> usize {
        self.outgoing
    }

    /// Returns the last computed activation.
    pub fn output(&self) -> f64 {
        self.state.lock().output
    }

    /// Returns the last computed local gradient.
    pub fn gradient(&self) -> f64 {
        self.state.lock().gradient
    }

    /// Returns the outgoing connections, indexed by the destination neuron's index.
    pub fn connections(&self) -> &[Connection] {
        &self.connections_out
    }

    /// Returns the weights of the incoming connections, indexed by the source neuron's index.
    pub fn input_weights(&self) -> Vec<Weight> {
        self.connections_in
            .iter()
            .map(|synapse| *synapse.weight.lock())
            .collect()
    }

    /// Returns the amount of incoming connections wired into this neuron.
    pub fn wired_inputs(&self) -> usize {
        self.connections_in.len()
    }

    /// Wires into this neuron the outgoing connection of `sender` addressed by this neuron's index.
    ///
    /// # Returns
    /// An error if the connection doesn't exist or was already wired.
    pub(crate) fn connect_from(&mut self, sender: &mut Neuron) -> Result<()> {
        let disconnected = NetErr::Disconnected {
            layer: sender.layer,
            neuron: sender.index,
        };

        let connection = sender
            .connections_out
            .get_mut(self.index)
            .ok_or(disconnected.clone())?;

        let terminal = connection.take_terminal().ok_or(disconnected)?;

        self.connections_in.push(Synapse {
            weight: connection.shared_weight(),
            upstream: Arc::clone(&sender.state),
            signal: Some(terminal.signal),
            gradient: Some(terminal.gradient),
        });

        Ok(())
    }

    /// Sets the output of an input neuron and fans it out over every outgoing connection.
    ///
    /// # Arguments
    /// * `value` - The raw input value.
    /// * `activate` - Whether `value` goes through the activation function first.
    ///
    /// # Returns
    /// An error if a downstream neuron stopped running.
    pub(crate) async fn feed_initial(&self, value: f64, activate: bool) -> Result<()> {
        let output = if activate {
            self.params.act_fn.f(value)
        } else {
            value
        };

        self.state.lock().output = output;

        for (index, connection) in self.connections_out.iter().enumerate() {
            if !connection.send(output).await {
                return Err(NetErr::Disconnected {
                    layer: self.layer + 1,
                    neuron: index,
                });
            }
        }

        Ok(())
    }

    /// Computes the gradient of an output neuron and sends it back through every incoming
    /// connection.
    ///
    /// # Arguments
    /// * `target` - The expected output of this neuron.
    ///
    /// # Returns
    /// An error if an upstream neuron stopped running.
    pub(crate) async fn set_output_gradient(&self, target: f64) -> Result<()> {
        let gradient = {
            let mut state = self.state.lock();
            state.gradient = (target - state.output) * self.params.act_fn.df(state.output);
            state.gradient
        };

        for (index, synapse) in self.connections_in.iter().enumerate() {
            let value = gradient * synapse.weight.lock().value;
            let sent = match &synapse.gradient {
                Some(tx) => tx.send(value).await.is_ok(),
                None => false,
            };

            if !sent {
                return Err(NetErr::Disconnected {
                    layer: self.layer - 1,
                    neuron: index,
                });
            }
        }

        Ok(())
    }

    /// Applies the momentum update to the weight of every incoming connection.
    ///
    /// Must only run once both passes settled, it reads the outputs of the previous layer.
    pub(crate) fn update_input_weights(&self) {
        let gradient = self.state.lock().gradient;
        let Params { eta, alpha, .. } = self.params;

        for synapse in &self.connections_in {
            let upstream = synapse.upstream.lock().output;
            let mut weight = synapse.weight.lock();

            weight.delta = eta * upstream * gradient + alpha * weight.delta;
            weight.value += weight.delta;
        }
    }

    /// Spawns the forward task of this neuron.
    ///
    /// # Arguments
    /// * `tasks` - Where to spawn the task.
    /// * `done` - The completion handle, only output neurons signal it.
    pub(crate) fn spawn_forward(&mut self, tasks: &mut JoinSet<()>, done: Signal) {
        let inputs = self
            .connections_in
            .iter_mut()
            .filter_map(|synapse| synapse.signal.take())
            .collect();

        let outputs = self
            .connections_out
            .iter_mut()
            .filter_map(|connection| Some((connection.take_signal()?, connection.shared_weight())))
            .collect();

        let task = Forward {
            layer: self.layer,
            index: self.index,
            act_fn: self.params.act_fn,
            state: Arc::clone(&self.state),
            inputs,
            outputs,
            done: (self.outgoing == 0).then_some(done),
        };

        tasks.spawn(task.run());
    }

    /// Spawns the backward task of a hidden neuron.
    ///
    /// # Arguments
    /// * `tasks` - Where to spawn the task.
    /// * `done` - The completion handle, given only to the first hidden layer since there's no
    ///   hidden layer before it to notify.
    pub(crate) fn spawn_backward(&mut self, tasks: &mut JoinSet<()>, done: Option<Signal>) {
        let inputs = self
            .connections_out
            .iter_mut()
            .filter_map(Connection::take_gradient)
            .collect();

        let outputs = match done {
            Some(_) => Vec::new(),
            None => self
                .connections_in
                .iter_mut()
                .filter_map(|synapse| Some((synapse.gradient.take()?, Arc::clone(&synapse.weight))))
                .collect(),
        };

        let task = Backward {
            layer: self.layer,
            index: self.index,
            act_fn: self.params.act_fn,
            state: Arc::clone(&self.state),
            inputs,
            outputs,
            done,
        };

        tasks.spawn(task.run());
    }
}

/// Sums one value from every receiver, in order.
///
/// # Returns
/// `None` if any of the receivers was closed.
async fn join(receivers: &mut [Receiver<f64>]) -> Option<f64> {
    let mut sum = 0.;

    for rx in receivers {
        sum += rx.recv().await?;
    }

    Some(sum)
}

/// Sends `value` weighted by each connection.
///
/// # Returns
/// `false` if any destination stopped listening.
async fn fan_out(value: f64, outputs: &[(Sender<f64>, SharedWeight)]) -> bool {
    for (tx, weight) in outputs {
        let weighted = value * weight.lock().value;

        if tx.send(weighted).await.is_err() {
            return false;
        }
    }

    true
}

struct Forward {
    layer: usize,
    index: usize,
    act_fn: ActFn,
    state: SharedState,
    inputs: Vec<Receiver<f64>>,
    outputs: Vec<(Sender<f64>, SharedWeight)>,
    done: Option<Signal>,
}

impl Forward {
    async fn run(mut self) {
        let (layer, index) = (self.layer, self.index);
        debug!(layer = layer, index = index; "forward task started");

        while let Some(sum) = join(&mut self.inputs).await {
            let output = self.act_fn.f(sum);
            self.state.lock().output = output;
            trace!(layer = layer, index = index, output = output; "fired");

            if let Some(done) = &self.done {
                done.done();
            } else if !fan_out(output, &self.outputs).await {
                break;
            }
        }

        debug!(layer = layer, index = index; "forward task stopped");
    }
}

struct Backward {
    layer: usize,
    index: usize,
    act_fn: ActFn,
    state: SharedState,
    inputs: Vec<Receiver<f64>>,
    outputs: Vec<(Sender<f64>, SharedWeight)>,
    done: Option<Signal>,
}

impl Backward {
    async fn run(mut self) {
        let (layer, index) = (self.layer, self.index);
        debug!(layer = layer, index = index; "backward task started");

        while let Some(sum) = join(&mut self.inputs).await {
            let gradient = {
                let mut state = self.state.lock();
                state.gradient = sum * self.act_fn.df(state.output);
                state.gradient
            };
            trace!(layer = layer, index = index, gradient = gradient; "gradient set");

            if let Some(done) = &self.done {
                done.done();
            } else if !fan_out(gradient, &self.outputs).await {
                break;
            }
        }

        debug!(layer = layer, index = index; "backward task stopped");
    }
}
