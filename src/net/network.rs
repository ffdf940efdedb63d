use futures::future;
use log::{debug, info, trace};
use rand::{SeedableRng, rngs::StdRng};
use tokio::{runtime::Handle, task::JoinSet};

use super::{Layer, neuron::Params};
use crate::{
    Data, NetErr, NetworkConfig, Result, Topology, WeightInit,
    initialization::{ConstWeightGen, RandWeightGen, WeightGen},
    synchronization::CompletionBarrier,
};

/// A fully connected feed-forward network trained with backpropagation and momentum.
///
/// Every neuron past the input layer runs as its own task once the network is started, passes
/// are driven by `feed_forward` and `backpropagate`, which return only once every neuron involved
/// has settled.
pub struct Network {
    topology: Topology,
    config: NetworkConfig,
    layers: Vec<Layer>,
    barrier: CompletionBarrier,
    tasks: Option<JoinSet<()>>,
    poisoned: bool,

    error: f64,
    recent_avg_err: f64,
    first_run_complete: bool,
}

impl Network {
    /// Creates a new `Network` with the default configuration.
    ///
    /// # Arguments
    /// * `topology` - The amount of neurons of each layer, input layer first.
    ///
    /// # Returns
    /// An error if the topology has less than three layers or an empty one.
    pub fn new(topology: &[usize]) -> Result<Self> {
        Self::with_config(Topology::try_from(topology)?, NetworkConfig::default())
    }

    /// Creates a new `Network` drawing its weights as described by `config.init`.
    ///
    /// # Arguments
    /// * `topology` - The amount of neurons of each layer.
    /// * `config` - The network's hyper-parameters.
    ///
    /// # Returns
    /// An error if the configuration is invalid.
    pub fn with_config(topology: Topology, config: NetworkConfig) -> Result<Self> {
        let limit = topology.connections();

        match config.init {
            WeightInit::Uniform { low, high } => {
                let rng = match config.seed {
                    Some(seed) => StdRng::seed_from_u64(seed),
                    None => StdRng::from_os_rng(),
                };

                let mut weight_gen = RandWeightGen::uniform(rng, limit, low, high)?;
                Self::with_weight_gen(topology, config, &mut weight_gen)
            }
            WeightInit::Const { value } => {
                let mut weight_gen = ConstWeightGen::new(value, limit);
                Self::with_weight_gen(topology, config, &mut weight_gen)
            }
        }
    }

    /// Creates a new `Network` drawing its weights from `weight_gen`, layer by layer and neuron
    /// by neuron, `config.init` is ignored.
    ///
    /// # Arguments
    /// * `topology` - The amount of neurons of each layer.
    /// * `config` - The network's hyper-parameters.
    /// * `weight_gen` - The source of the initial weights.
    ///
    /// # Returns
    /// An error if the configuration is invalid or `weight_gen` runs out of weights.
    pub fn with_weight_gen<W>(
        topology: Topology,
        config: NetworkConfig,
        weight_gen: &mut W,
    ) -> Result<Self>
    where
        W: WeightGen + ?Sized,
    {
        config.validate()?;

        let params = Params {
            eta: config.eta,
            alpha: config.alpha,
            act_fn: config.act_fn,
        };

        let layers = (0..topology.len())
            .map(|position| {
                Layer::new(
                    position,
                    topology.neighbourhood(position),
                    config.initial_delta_weight,
                    params,
                    &mut *weight_gen,
                )
            })
            .collect::<Result<Vec<_>>>()?;

        let mut net = Self {
            topology,
            config,
            layers,
            barrier: CompletionBarrier::new(),
            tasks: None,
            poisoned: false,
            error: 0.,
            recent_avg_err: 0.,
            first_run_complete: false,
        };

        net.wire()?;
        info!(
            "network built: topology={:?} connections={}",
            &*net.topology,
            net.topology.connections()
        );

        Ok(net)
    }

    /// Connects every neuron to every neuron of the next layer.
    fn wire(&mut self) -> Result<()> {
        for position in 1..self.layers.len() {
            let (previous, rest) = self.layers.split_at_mut(position);
            let senders = previous[position - 1].neurons_mut();

            for receiver in rest[0].neurons_mut() {
                for sender in senders.iter_mut() {
                    receiver.connect_from(sender)?;
                }
            }
        }

        Ok(())
    }

    /// Spawns the tasks of every non input neuron in the current tokio runtime.
    ///
    /// # Returns
    /// An error if the network was already started or there's no runtime to spawn onto.
    pub fn start(&mut self) -> Result<()> {
        if self.tasks.is_some() {
            return Err(NetErr::AlreadyStarted);
        }

        Handle::try_current().map_err(|_| NetErr::NoRuntime)?;

        let mut tasks = JoinSet::new();
        let signal = self.barrier.signal();
        let last = self.layers.len() - 1;

        for (position, layer) in self.layers.iter_mut().enumerate().skip(1) {
            for neuron in layer.neurons_mut() {
                neuron.spawn_forward(&mut tasks, signal.clone());

                if position < last {
                    let done = (position == 1).then(|| signal.clone());
                    neuron.spawn_backward(&mut tasks, done);
                }
            }
        }

        debug!("network started: tasks={}", tasks.len());
        self.tasks = Some(tasks);
        Ok(())
    }

    /// Runs a forward pass, returns once every output neuron has fired.
    ///
    /// # Arguments
    /// * `input` - One value per input neuron.
    ///
    /// # Returns
    /// An error if the network can't run a pass or `input` has the wrong size, in which case
    /// the network is left untouched.
    pub async fn feed_forward(&mut self, input: &[f64]) -> Result<()> {
        self.ensure_ready()?;

        if input.len() != self.topology.input_size() {
            return Err(NetErr::SizeMismatch {
                what: "input",
                got: input.len(),
                expected: self.topology.input_size(),
            });
        }

        self.barrier.arm(self.topology.output_size())?;
        self.poisoned = true;

        let activate = self.config.apply_activation_to_input;
        for (neuron, &value) in self.layers[0].iter().zip(input) {
            neuron.feed_initial(value, activate).await?;
        }

        self.barrier.wait().await?;
        self.poisoned = false;

        trace!("forward pass complete");
        Ok(())
    }

    /// Runs a backward pass towards `target` and then updates every weight.
    ///
    /// Also refreshes the pass error and its smoothed average.
    ///
    /// # Arguments
    /// * `target` - The expected value of each output neuron.
    ///
    /// # Returns
    /// An error if the network can't run a pass or `target` has the wrong size, in which case
    /// the network is left untouched.
    pub async fn backpropagate(&mut self, target: &[f64]) -> Result<()> {
        self.ensure_ready()?;

        if target.len() != self.topology.output_size() {
            return Err(NetErr::SizeMismatch {
                what: "target",
                got: target.len(),
                expected: self.topology.output_size(),
            });
        }

        let squared: f64 = self
            .output_layer()
            .iter()
            .zip(target)
            .map(|(neuron, t)| (t - neuron.output()).powi(2))
            .sum();

        let error = (squared / target.len() as f64).sqrt();
        let recent_avg_err = if self.first_run_complete {
            let smoothing = self.config.smoothing;
            (1. - smoothing) * self.recent_avg_err + smoothing * error
        } else {
            error
        };

        self.barrier.arm(self.layers[1].len())?;
        self.poisoned = true;

        let gradients = self
            .output_layer()
            .iter()
            .zip(target)
            .map(|(neuron, &t)| neuron.set_output_gradient(t));

        future::try_join_all(gradients).await?;
        self.barrier.wait().await?;

        for layer in self.layers[1..].iter().rev() {
            for neuron in layer {
                neuron.update_input_weights();
            }
        }

        // Only a completed pass counts towards the error statistics.
        self.error = error;
        self.recent_avg_err = recent_avg_err;
        self.first_run_complete = true;
        self.poisoned = false;

        trace!(error = self.error, recent_avg_err = self.recent_avg_err; "backward pass complete");
        Ok(())
    }

    /// Returns the output of every output neuron.
    pub fn get_results(&self) -> Data {
        self.output_layer().iter().map(|neuron| neuron.output()).collect()
    }

    /// Returns the root mean square error of the last backward pass.
    pub fn error(&self) -> f64 {
        self.error
    }

    /// Returns the exponentially smoothed error.
    pub fn recent_average_error(&self) -> f64 {
        self.recent_avg_err
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn input_layer(&self) -> &Layer {
        &self.layers[0]
    }

    pub fn output_layer(&self) -> &Layer {
        &self.layers[self.layers.len() - 1]
    }

    pub fn input_size(&self) -> usize {
        self.topology.input_size()
    }

    pub fn output_size(&self) -> usize {
        self.topology.output_size()
    }

    pub fn is_started(&self) -> bool {
        self.tasks.is_some()
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.tasks.is_none() {
            return Err(NetErr::NotStarted);
        }

        if self.poisoned {
            return Err(NetErr::Poisoned);
        }

        Ok(())
    }
}
