use ndarray::Array2;
use rand_distr::{Distribution, StandardNormal};

/// A `ParamGen` generates values for the initial state of the weights and biases.
pub trait ParamGen {
    /// Samples exactly `n` values.
    ///
    /// # Arguments
    /// * `n` - The amount of values to generate.
    fn sample(&mut self, n: usize) -> Vec<f64>;
}

/// Any closure producing one value per call is a generator, this is how plain elementwise
/// functors get passed to `initialize_weight` and `initialize_bias`.
impl<F> ParamGen for F
where
    F: FnMut() -> f64,
{
    fn sample(&mut self, n: usize) -> Vec<f64> {
        (0..n).map(|_| self()).collect()
    }
}

/// Samples a `[rows × cols]` matrix from the standard normal distribution.
///
/// This is the fallback used whenever no generator is given to an initialization method.
pub fn standard_normal(rows: usize, cols: usize) -> Array2<f64> {
    let mut rng = rand::rng();
    Array2::from_shape_simple_fn((rows, cols), || StandardNormal.sample(&mut rng))
}
