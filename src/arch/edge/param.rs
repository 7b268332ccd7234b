use crate::{NetErr, Result};

/// Describes an edge: its identity and the dims of the nodes it connects.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EdgeParameter {
    id: usize,
    name: String,
    dims_in: Vec<usize>,
    dims_out: Vec<usize>,
}

impl EdgeParameter {
    /// Creates a new `EdgeParameter`.
    ///
    /// # Arguments
    /// * `id` - The edge's identifier, used in diagnostics.
    /// * `name` - A human readable name.
    /// * `dims_in` - The dims of the input node, only the feature count is used.
    /// * `dims_out` - The dims of the output node, only the feature count is used.
    pub fn new(id: usize, name: impl Into<String>, dims_in: &[usize], dims_out: &[usize]) -> Self {
        Self {
            id,
            name: name.into(),
            dims_in: dims_in.to_vec(),
            dims_out: dims_out.to_vec(),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dims_in(&self) -> &[usize] {
        &self.dims_in
    }

    pub fn dims_out(&self) -> &[usize] {
        &self.dims_out
    }

    /// Returns the shape of the weight matrix, `(in_features, out_features)`.
    ///
    /// # Returns
    /// An error if either side declares no features.
    pub fn shape(&self) -> Result<(usize, usize)> {
        let features = |what, dims: &[usize]| match dims.first() {
            Some(&features) if features > 0 => Ok(features),
            _ => Err(NetErr::SizeMismatch {
                what,
                got: 0,
                expected: 1,
            }),
        };

        Ok((
            features("edge input features", &self.dims_in)?,
            features("edge output features", &self.dims_out)?,
        ))
    }

    pub fn with_id(mut self, id: usize) -> Self {
        self.id = id;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}
