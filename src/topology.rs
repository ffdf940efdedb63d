use std::ops::Deref;

use crate::{NetErr, Result};

/// A signal vector, used both as network input and as training target.
pub type Data = Vec<f64>;

/// The amount of neurons of each layer, from input to output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology(Vec<usize>);

impl Topology {
    /// Creates a new `Topology`.
    ///
    /// # Arguments
    /// * `sizes` - The neuron count of every layer, input layer first.
    ///
    /// # Returns
    /// An error if there are less than three layers or any of them is empty.
    pub fn new<I>(sizes: I) -> Result<Self>
    where
        I: IntoIterator<Item = usize>,
    {
        let sizes: Vec<_> = sizes.into_iter().collect();

        if sizes.len() < 3 {
            return Err(NetErr::TopologyTooShort { got: sizes.len() });
        }

        if let Some(layer) = sizes.iter().position(|&size| size == 0) {
            return Err(NetErr::EmptyLayer { layer });
        }

        Ok(Self(sizes))
    }

    /// Returns the size of the input layer.
    pub fn input_size(&self) -> usize {
        self.0[0]
    }

    /// Returns the size of the output layer.
    pub fn output_size(&self) -> usize {
        self.0[self.0.len() - 1]
    }

    /// Returns the total amount of connections of a fully connected network with this topology.
    pub fn connections(&self) -> usize {
        self.0.windows(2).map(|pair| pair[0] * pair[1]).sum()
    }

    /// Returns the size of the layers around `layer` as `(previous, size, next)`, where the
    /// missing neighbours of the input and output layers count as zero.
    pub(crate) fn neighbourhood(&self, layer: usize) -> (usize, usize, usize) {
        let previous = layer.checked_sub(1).map_or(0, |i| self.0[i]);
        let next = self.0.get(layer + 1).copied().unwrap_or(0);
        (previous, self.0[layer], next)
    }
}

impl Deref for Topology {
    type Target = [usize];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TryFrom<&[usize]> for Topology {
    type Error = NetErr;

    fn try_from(value: &[usize]) -> Result<Self> {
        Self::new(value.iter().copied())
    }
}
