use std::{ops::Index, slice};

use super::neuron::{Neuron, Params};
use crate::{NetErr, Result, initialization::WeightGen};

/// An ordered group of neurons, a neuron's position in it addresses its connection in every
/// neuron of the previous layer.
pub struct Layer {
    neurons: Vec<Neuron>,
}

impl Layer {
    /// Creates a new `Layer` with `size` neurons, each with `next_size` unwired connections.
    ///
    /// # Arguments
    /// * `position` - The position of this layer in the network.
    /// * `(previous_size, size, next_size)` - The sizes of this layer and its neighbours.
    /// * `delta_weight` - The initial momentum term of every connection.
    /// * `params` - The network's hyper-parameters.
    /// * `weight_gen` - The source of the connections' initial weights.
    ///
    /// # Returns
    /// An error if `weight_gen` runs out of weights.
    pub(crate) fn new<W: WeightGen + ?Sized>(
        position: usize,
        (previous_size, size, next_size): (usize, usize, usize),
        delta_weight: f64,
        params: Params,
        weight_gen: &mut W,
    ) -> Result<Self> {
        let neurons = (0..size)
            .map(|index| {
                let weights = sample_exact(&mut *weight_gen, next_size).ok_or(
                    NetErr::WeightGenExhausted {
                        layer: position,
                        neuron: index,
                    },
                )?;

                Ok(Neuron::new(
                    position,
                    index,
                    previous_size,
                    weights,
                    delta_weight,
                    params,
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { neurons })
    }

    pub fn neurons(&self) -> &[Neuron] {
        &self.neurons
    }

    pub(crate) fn neurons_mut(&mut self) -> &mut [Neuron] {
        &mut self.neurons
    }

    pub fn len(&self) -> usize {
        self.neurons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neurons.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Neuron> {
        self.neurons.get(index)
    }

    pub fn iter(&self) -> slice::Iter<'_, Neuron> {
        self.neurons.iter()
    }
}

impl Index<usize> for Layer {
    type Output = Neuron;

    fn index(&self, index: usize) -> &Self::Output {
        &self.neurons[index]
    }
}

impl<'a> IntoIterator for &'a Layer {
    type Item = &'a Neuron;
    type IntoIter = slice::Iter<'a, Neuron>;

    fn into_iter(self) -> Self::IntoIter {
        self.neurons.iter()
    }
}

/// Samples exactly `n` weights, gathering them over several calls if the generator hands them
/// in chunks.
fn sample_exact<W: WeightGen + ?Sized>(weight_gen: &mut W, n: usize) -> Option<Vec<f64>> {
    let mut weights = Vec::with_capacity(n);

    while weights.len() < n {
        let chunk = weight_gen.sample(n - weights.len())?;
        if chunk.is_empty() {
            return None;
        }

        weights.extend(chunk);
    }

    Some(weights)
}
