use std::{env, fs};

use anyhow::{Context, Result};
use log::info;
use rand::Rng;

use neural_dataflow::{Data, Network, NetworkConfig, Topology};

const DEFAULT_TOPOLOGY: [usize; 3] = [10, 10, 10];
const DEFAULT_EPOCHS: usize = 1000;
const REPORT_EVERY: usize = 100;

/// Trains a network to square its inputs.
///
/// Usage: `train [layer sizes...]`, with `EPOCHS` and `NET_CONFIG` (path to a JSON
/// `NetworkConfig`) read from the environment.
#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let sizes: Vec<usize> = env::args()
        .skip(1)
        .map(|arg| arg.parse().with_context(|| format!("invalid layer size {arg:?}")))
        .collect::<Result<_>>()?;

    let topology = if sizes.is_empty() {
        Topology::new(DEFAULT_TOPOLOGY)?
    } else {
        Topology::new(sizes)?
    };

    if topology.input_size() != topology.output_size() {
        anyhow::bail!("the squaring task needs as many outputs as inputs, got {topology:?}");
    }

    let epochs = match env::var("EPOCHS") {
        Ok(epochs) => epochs.parse().context("invalid EPOCHS")?,
        Err(_) => DEFAULT_EPOCHS,
    };

    let config = match env::var("NET_CONFIG") {
        Ok(path) => {
            let content = fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
            serde_json::from_str(&content).with_context(|| format!("parsing {path}"))?
        }
        Err(_) => NetworkConfig::default(),
    };

    let mut net = Network::with_config(topology, config)?;
    net.start()?;

    let input = sample_input(net.input_size());
    let target: Data = input.iter().map(|x| x * x).collect();

    for epoch in 1..=epochs {
        net.feed_forward(&input).await?;
        net.backpropagate(&target).await?;

        if epoch % REPORT_EVERY == 0 || epoch == 1 {
            info!(
                "epoch={epoch} error={:.6} recent_avg_err={:.6}",
                net.error(),
                net.recent_average_error()
            );
        }
    }

    net.feed_forward(&input).await?;
    let results = net.get_results();

    println!("{:>8} | {:>8} | {:>8}", "input", "target", "result");
    for ((x, t), y) in input.iter().zip(&target).zip(&results) {
        println!("{x:>8.3} | {t:>8.3} | {y:>8.3}");
    }
    println!("recent average error: {:.6}", net.recent_average_error());

    Ok(())
}

fn sample_input(size: usize) -> Data {
    let mut rng = rand::rng();
    (0..size).map(|_| rng.random()).collect()
}
