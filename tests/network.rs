use std::{future::Future, time::Duration};

use futures::FutureExt;
use rand::{Rng, SeedableRng, rngs::StdRng};
use tokio::time::timeout;

use neural_dataflow::{
    Data, NetErr, Network, NetworkConfig, Topology, Weight, WeightInit,
    initialization::ConstWeightGen,
};

const PATIENCE: Duration = Duration::from_secs(10);

const TOPOLOGIES: [&[usize]; 5] = [
    &[1, 1, 1],
    &[3, 4, 2, 5],
    &[2, 1, 3],
    &[4, 3, 3, 3, 2],
    &[1, 5, 1, 5, 1],
];

/// Fails instead of hanging if the network deadlocks.
async fn settle<F: Future<Output = neural_dataflow::Result<()>>>(pass: F) {
    timeout(PATIENCE, pass)
        .await
        .expect("the pass deadlocked")
        .expect("the pass failed");
}

fn seeded(seed: u64) -> NetworkConfig {
    NetworkConfig {
        seed: Some(seed),
        ..Default::default()
    }
}

fn started(sizes: &[usize], config: NetworkConfig) -> Network {
    let mut net = Network::with_config(Topology::try_from(sizes).unwrap(), config).unwrap();
    net.start().unwrap();
    net
}

fn weights(net: &Network) -> Vec<f64> {
    net.layers()
        .iter()
        .flat_map(|layer| layer.iter())
        .flat_map(|neuron| neuron.connections().iter().map(|c| c.weight()))
        .collect()
}

fn outputs(net: &Network) -> Vec<f64> {
    net.layers()
        .iter()
        .flat_map(|layer| layer.iter().map(|neuron| neuron.output()))
        .collect()
}

#[test]
fn rejects_short_topology() {
    assert!(matches!(
        Network::new(&[4, 2]),
        Err(NetErr::TopologyTooShort { got: 2 })
    ));
    assert!(matches!(
        Network::new(&[4, 0, 2]),
        Err(NetErr::EmptyLayer { layer: 1 })
    ));
}

#[test]
fn fully_connected() {
    for (seed, &sizes) in TOPOLOGIES.iter().enumerate() {
        let net =
            Network::with_config(Topology::try_from(sizes).unwrap(), seeded(seed as u64)).unwrap();

        assert_eq!(net.layers().len(), sizes.len());

        for (i, layer) in net.layers().iter().enumerate() {
            assert_eq!(layer.len(), sizes[i], "layer {i} of {sizes:?}");

            let next = sizes.get(i + 1).copied().unwrap_or(0);
            let previous = if i == 0 { 0 } else { sizes[i - 1] };

            for neuron in layer {
                assert_eq!(neuron.outgoing(), next);
                assert_eq!(neuron.connections().len(), next);
                assert!(neuron.connections().iter().all(|c| c.is_wired()));
                assert_eq!(neuron.incoming(), previous);
                assert_eq!(neuron.wired_inputs(), previous);
            }
        }
    }
}

#[test]
fn incoming_weights_are_the_senders_connections() {
    for (seed, &sizes) in TOPOLOGIES.iter().enumerate() {
        let net =
            Network::with_config(Topology::try_from(sizes).unwrap(), seeded(seed as u64)).unwrap();

        for (position, pair) in net.layers().windows(2).enumerate() {
            let (senders, receivers) = (&pair[0], &pair[1]);

            for receiver in receivers {
                let incoming = receiver.input_weights();
                assert_eq!(incoming.len(), senders.len());

                for (s, sender) in senders.iter().enumerate() {
                    assert_eq!(
                        incoming[s].value,
                        sender.connections()[receiver.index()].weight(),
                        "neuron {} of layer {} in {sizes:?}",
                        receiver.index(),
                        position + 1
                    );
                }
            }
        }
    }
}

#[test]
fn start_needs_runtime() {
    let mut net = Network::new(&[1, 1, 1]).unwrap();
    assert!(matches!(net.start(), Err(NetErr::NoRuntime)));
    assert!(!net.is_started());
}

#[tokio::test]
async fn start_once() {
    let mut net = Network::new(&[2, 2, 2]).unwrap();

    assert!(matches!(
        net.feed_forward(&[0., 0.]).await,
        Err(NetErr::NotStarted)
    ));

    net.start().unwrap();
    assert!(matches!(net.start(), Err(NetErr::AlreadyStarted)));
}

#[tokio::test]
async fn results_have_output_size() {
    let mut net = started(&[4, 3, 2], seeded(3));

    settle(net.feed_forward(&[0.1, 0.2, 0.3, 0.4])).await;

    let results = net.get_results();
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|y| y.abs() < 1.));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn seeded_results_are_reproducible() {
    let input = [0.3, -0.7, 0.9];
    let mut results = Vec::new();

    for _ in 0..2 {
        let mut net = started(&[3, 8, 8, 2], seeded(42));
        settle(net.feed_forward(&input)).await;
        results.push(net.get_results());
    }

    assert_eq!(results[0], results[1]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn training_reduces_error() {
    const SIZE: usize = 10;
    const ITERATIONS: usize = 1000;

    let mut rng = StdRng::seed_from_u64(1234);
    let input: Data = (0..SIZE).map(|_| rng.random()).collect();
    let target: Data = input.iter().map(|x| x * x).collect();

    let mut net = started(&[SIZE, SIZE, SIZE], seeded(99));
    let mut first_error = None;

    for _ in 0..ITERATIONS {
        settle(net.feed_forward(&input)).await;
        settle(net.backpropagate(&target)).await;
        first_error.get_or_insert(net.error());
    }

    let first_error = first_error.unwrap();
    assert!(
        net.error() < first_error,
        "error went from {first_error} to {}",
        net.error()
    );
}

#[tokio::test]
async fn recent_average_error_is_smoothed() {
    let mut net = started(&[2, 3, 2], seeded(5));
    let input = [0.5, 0.25];
    let target = [0.1, 0.9];

    settle(net.feed_forward(&input)).await;
    settle(net.backpropagate(&target)).await;
    assert_eq!(net.recent_average_error(), net.error());

    for _ in 0..5 {
        let previous = net.recent_average_error();

        settle(net.feed_forward(&input)).await;
        settle(net.backpropagate(&target)).await;

        let expected = (1. - 0.05) * previous + 0.05 * net.error();
        assert!((net.recent_average_error() - expected).abs() < 1e-12);
    }
}

#[tokio::test]
async fn error_is_rms() {
    let mut net = started(&[2, 2, 3], seeded(6));
    let target = [0.2, -0.4, 0.6];

    settle(net.feed_forward(&[1., -1.])).await;
    let results = net.get_results();
    settle(net.backpropagate(&target)).await;

    let mse = results
        .iter()
        .zip(target)
        .map(|(y, t)| (t - y).powi(2))
        .sum::<f64>()
        / 3.;
    assert!((net.error() - mse.sqrt()).abs() < 1e-12);
}

#[tokio::test]
async fn wrong_input_size_changes_nothing() {
    let mut net = started(&[3, 2, 2], seeded(7));
    settle(net.feed_forward(&[0.1, 0.2, 0.3])).await;

    let (weights_before, outputs_before) = (weights(&net), outputs(&net));

    assert_eq!(
        net.feed_forward(&[1., 2.]).await,
        Err(NetErr::SizeMismatch {
            what: "input",
            got: 2,
            expected: 3
        })
    );
    assert!(matches!(
        net.backpropagate(&[1., 2., 3.]).await,
        Err(NetErr::SizeMismatch { what: "target", .. })
    ));

    assert_eq!(weights(&net), weights_before);
    assert_eq!(outputs(&net), outputs_before);

    // The network is still usable afterwards.
    settle(net.feed_forward(&[0.1, 0.2, 0.3])).await;
    assert_eq!(outputs(&net), outputs_before);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn one_cycle_moves_every_delta_weight() {
    let mut net = started(&[3, 2, 2, 1], seeded(8));
    let initial = net.config().initial_delta_weight;

    settle(net.feed_forward(&[1., 2., 3.])).await;
    settle(net.backpropagate(&[36.])).await;

    for layer in net.layers() {
        for neuron in layer {
            for connection in neuron.connections() {
                assert_ne!(connection.delta_weight(), initial);
            }
        }
    }

    assert_eq!(net.get_results().len(), 1);
}

#[tokio::test]
async fn zero_propagates_as_zero() {
    let config = NetworkConfig {
        alpha: 0.,
        ..Default::default()
    };
    let mut weight_gen = ConstWeightGen::new(1., 2);
    let mut net =
        Network::with_weight_gen(Topology::new([1, 1, 1]).unwrap(), config, &mut weight_gen)
            .unwrap();
    net.start().unwrap();

    settle(net.feed_forward(&[0.])).await;

    assert_eq!(outputs(&net), [0., 0., 0.]);
    assert_eq!(net.get_results(), [0.]);
}

#[tokio::test]
async fn manually_fixed_weights() {
    let config = NetworkConfig {
        init: WeightInit::Const { value: 0.5 },
        ..Default::default()
    };
    let mut net = started(&[1, 1, 1], config);

    for neuron in net.layers()[1].iter() {
        for connection in neuron.connections() {
            connection.set_weight(Weight {
                value: 1.,
                delta: 0.,
            });
        }
    }

    settle(net.feed_forward(&[2.])).await;

    let expected = (0.5f64 * 2.).tanh().tanh();
    assert_eq!(net.get_results(), [expected]);
}

#[tokio::test]
async fn activation_on_input_is_configurable() {
    let config = NetworkConfig {
        init: WeightInit::Const { value: 1. },
        apply_activation_to_input: true,
        ..Default::default()
    };
    let mut net = started(&[1, 1, 1], config);

    settle(net.feed_forward(&[0.5])).await;

    assert_eq!(net.input_layer()[0].output(), 0.5f64.tanh());
    assert_eq!(net.get_results(), [0.5f64.tanh().tanh().tanh()]);
}

#[tokio::test]
async fn hand_computed_update() {
    let config = NetworkConfig {
        eta: 0.1,
        alpha: 0.5,
        init: WeightInit::Const { value: 0.5 },
        initial_delta_weight: 0.2,
        ..Default::default()
    };
    let mut net = started(&[1, 1, 1], config);

    settle(net.feed_forward(&[1.])).await;

    let hidden = 0.5f64.tanh();
    let output = (0.5 * hidden).tanh();
    assert_eq!(net.get_results(), [output]);

    settle(net.backpropagate(&[1.])).await;

    let output_gradient = (1. - output) * (1. - output * output);
    let hidden_gradient = output_gradient * 0.5 * (1. - hidden * hidden);

    let top = &net.layers()[1][0].connections()[0];
    let bottom = &net.layers()[0][0].connections()[0];

    let top_delta = 0.1 * hidden * output_gradient + 0.5 * 0.2;
    let bottom_delta = 0.1 * 1. * hidden_gradient + 0.5 * 0.2;

    assert!((top.delta_weight() - top_delta).abs() < 1e-12);
    assert!((top.weight() - (0.5 + top_delta)).abs() < 1e-12);
    assert!((bottom.delta_weight() - bottom_delta).abs() < 1e-12);
    assert!((bottom.weight() - (0.5 + bottom_delta)).abs() < 1e-12);
}

#[tokio::test]
async fn deep_network_settles() {
    let mut net = started(&[3, 4, 4, 4, 4, 2], seeded(11));

    for _ in 0..50 {
        settle(net.feed_forward(&[0.2, 0.4, 0.6])).await;
        settle(net.backpropagate(&[0.5, -0.5])).await;
    }

    assert!(net.error().is_finite());
}

#[test]
fn exhausted_weight_gen() {
    let mut weight_gen = ConstWeightGen::new(1., 3);
    let res = Network::with_weight_gen(
        Topology::new([2, 2, 1]).unwrap(),
        NetworkConfig::default(),
        &mut weight_gen,
    );

    assert!(matches!(
        res,
        Err(NetErr::WeightGenExhausted {
            layer: 0,
            neuron: 1
        })
    ));
}

#[tokio::test]
async fn interrupted_pass_poisons_the_network() {
    let mut net = started(&[2, 2, 1], seeded(12));

    // Polled once and dropped, the neuron tasks never get to run on this thread.
    assert!(net.feed_forward(&[0.5, 0.5]).now_or_never().is_none());

    assert_eq!(net.feed_forward(&[0.5, 0.5]).await, Err(NetErr::Poisoned));
    assert_eq!(net.backpropagate(&[0.5]).await, Err(NetErr::Poisoned));
}

#[tokio::test]
async fn interrupted_backpropagation_keeps_the_error() {
    let mut net = started(&[2, 3, 2], seeded(13));
    let input = [0.5, -0.5];

    settle(net.feed_forward(&input)).await;
    settle(net.backpropagate(&[0.9, -0.9])).await;
    settle(net.feed_forward(&input)).await;

    let (error, recent_avg_err) = (net.error(), net.recent_average_error());

    assert!(net.backpropagate(&[-0.9, 0.9]).now_or_never().is_none());

    assert_eq!(net.error(), error);
    assert_eq!(net.recent_average_error(), recent_avg_err);
    assert_eq!(net.backpropagate(&[-0.9, 0.9]).await, Err(NetErr::Poisoned));
}
