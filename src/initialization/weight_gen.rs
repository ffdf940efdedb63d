/// A `WeightGen` generates the initial weights of the network's connections.
pub trait WeightGen {
    /// Should sample at most `n` weights.
    ///
    /// # Arguments
    /// * `n` - The upper limit of samples to generate.
    ///
    /// # Returns
    /// `None` if the generator is exhausted.
    fn sample(&mut self, n: usize) -> Option<Vec<f64>>;
}

impl<W: WeightGen + ?Sized> WeightGen for &mut W {
    fn sample(&mut self, n: usize) -> Option<Vec<f64>> {
        (**self).sample(n)
    }
}
