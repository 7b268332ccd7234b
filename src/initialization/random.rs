use std::{cell::RefCell, rc::Rc};

use rand::Rng;
use rand_distr::{Distribution, Normal, Uniform};

use super::{ParamGen, Result};

/// A parameter generator that follows a certain probabilistic distribution.
///
/// The random number generator is shared so that the edges of a chain built from a single seed
/// draw from one reproducible stream.
pub struct RandParamGen<R: Rng, D: Distribution<f64>> {
    rng: Rc<RefCell<R>>,
    distribution: D,
}

impl<R: Rng, D: Distribution<f64>> RandParamGen<R, D> {
    /// Creates a new `RandParamGen` parameter generator.
    ///
    /// # Arguments
    /// * `rng` - A random number generator.
    /// * `distribution` - The distribution to sample the random numbers from.
    pub fn new(rng: Rc<RefCell<R>>, distribution: D) -> Self {
        Self { rng, distribution }
    }
}

impl<R: Rng> RandParamGen<R, Uniform<f64>> {
    /// Creates a new `RandParamGen` parameter generator with a uniform distribution.
    ///
    /// # Arguments
    /// * `rng` - A random number generator.
    /// * `low` - The inclusive lower limit.
    /// * `high` - The exclusive upper limit.
    ///
    /// # Returns
    /// An error if the range is invalid (low >= high).
    pub fn uniform(rng: Rc<RefCell<R>>, low: f64, high: f64) -> Result<Self> {
        Ok(Self::new(rng, Uniform::new(low, high)?))
    }

    /// Creates a new `RandParamGen` parameter generator using Xavier uniform initialization.
    ///
    /// # Arguments
    /// * `rng` - A random number generator.
    /// * `fan_in` - The number of input units in the weight matrix.
    /// * `fan_out` - The number of output units in the weight matrix.
    ///
    /// # Returns
    /// An error if the calculated range is invalid.
    pub fn xavier_uniform(rng: Rc<RefCell<R>>, fan_in: usize, fan_out: usize) -> Result<Self> {
        let range = (6. / (fan_in + fan_out) as f64).sqrt();
        Self::uniform(rng, -range, range)
    }

    /// Creates a new `RandParamGen` parameter generator using LeCun uniform initialization.
    ///
    /// # Arguments
    /// * `rng` - A random number generator.
    /// * `fan_in` - The number of input units in the weight matrix.
    ///
    /// # Returns
    /// An error if the calculated range is invalid.
    pub fn lecun_uniform(rng: Rc<RefCell<R>>, fan_in: usize) -> Result<Self> {
        let range = (3. / fan_in as f64).sqrt();
        Self::uniform(rng, -range, range)
    }
}

impl<R: Rng> RandParamGen<R, Normal<f64>> {
    /// Creates a new `RandParamGen` parameter generator with a normal distribution.
    ///
    /// # Arguments
    /// * `rng` - A random number generator.
    /// * `mean` - The mean of the distribution.
    /// * `std_dev` - The standard deviation of the distribution.
    ///
    /// # Returns
    /// An error if `std_dev` is not finite (Nan or infinite).
    pub fn normal(rng: Rc<RefCell<R>>, mean: f64, std_dev: f64) -> Result<Self> {
        Ok(Self::new(rng, Normal::new(mean, std_dev)?))
    }

    /// Creates a new `RandParamGen` parameter generator using Kaiming normal initialization.
    pub fn kaiming(rng: Rc<RefCell<R>>, fan_in: usize) -> Result<Self> {
        let std_dev = (2. / fan_in as f64).sqrt();
        Self::normal(rng, 0., std_dev)
    }

    /// Creates a new `RandParamGen` parameter generator using Xavier normal initialization.
    pub fn xavier(rng: Rc<RefCell<R>>, fan_in: usize, fan_out: usize) -> Result<Self> {
        Self::kaiming(rng, fan_in + fan_out)
    }

    /// Creates a new `RandParamGen` parameter generator using LeCun normal initialization.
    pub fn lecun(rng: Rc<RefCell<R>>, fan_in: usize) -> Result<Self> {
        let std_dev = (1. / fan_in as f64).sqrt();
        Self::normal(rng, 0., std_dev)
    }
}

impl<R: Rng, D: Distribution<f64>> ParamGen for RandParamGen<R, D> {
    fn sample(&mut self, n: usize) -> Vec<f64> {
        let mut rng = self.rng.borrow_mut();
        (0..n).map(|_| self.distribution.sample(&mut *rng)).collect()
    }
}
