use super::ParamGen;

/// A parameter generator that always generates the same value.
pub struct ConstParamGen {
    value: f64,
}

impl ConstParamGen {
    /// Creates a new `ConstParamGen` parameter generator.
    ///
    /// # Arguments
    /// * `value` - The value to always generate.
    ///
    /// # Returns
    /// A new `ConstParamGen` instance.
    pub fn new(value: f64) -> Self {
        Self { value }
    }
}

impl ParamGen for ConstParamGen {
    fn sample(&mut self, n: usize) -> Vec<f64> {
        vec![self.value; n]
    }
}
