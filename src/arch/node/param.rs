use crate::{
    NetErr, Result,
    arch::{
        activations::{Activation, UnaryFxn},
        loss::{Loss, LossFxn, LossPrimeFxn},
    },
};

/// Describes a node: its identity, its dimensions and the strategy functions it evaluates.
///
/// A node clones the parameter it is built from, so changing a parameter afterwards never
/// reaches a live node.
#[derive(Clone, Debug, Default)]
pub struct NodeParameter {
    id: usize,
    name: String,
    dims: Vec<usize>,

    act_fxn: Option<UnaryFxn>,
    act_prime: Option<UnaryFxn>,
    loss_fxn: Option<LossFxn>,
    loss_prime: Option<LossPrimeFxn>,
}

impl NodeParameter {
    /// Creates a new `NodeParameter` without any strategy configured.
    ///
    /// # Arguments
    /// * `id` - The node's identifier, used in diagnostics and errors.
    /// * `name` - A human readable name.
    /// * `dims` - `[features]` or `[features, batch]`.
    pub fn new(id: usize, name: impl Into<String>, dims: &[usize]) -> Self {
        Self {
            id,
            name: name.into(),
            dims: dims.to_vec(),
            ..Default::default()
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn act_fxn(&self) -> Option<UnaryFxn> {
        self.act_fxn
    }

    pub fn act_prime(&self) -> Option<UnaryFxn> {
        self.act_prime
    }

    pub fn loss_fxn(&self) -> Option<LossFxn> {
        self.loss_fxn
    }

    pub fn loss_prime(&self) -> Option<LossPrimeFxn> {
        self.loss_prime
    }

    /// Returns the feature count and the initial batch size.
    ///
    /// # Returns
    /// An error if the dims are empty, have more than two entries or declare zero features or a
    /// zero batch.
    pub fn shape(&self) -> Result<(usize, usize)> {
        match self.dims[..] {
            [0] | [0, _] => Err(NetErr::SizeMismatch {
                what: "node features",
                got: 0,
                expected: 1,
            }),
            [_, 0] => Err(NetErr::SizeMismatch {
                what: "batch",
                got: 0,
                expected: 1,
            }),
            [features] => Ok((features, 1)),
            [features, batch] => Ok((features, batch)),
            _ => Err(NetErr::InvalidConfig(format!(
                "node {} dims must be [features] or [features, batch], got {:?}",
                self.id, self.dims
            ))),
        }
    }

    pub fn with_id(mut self, id: usize) -> Self {
        self.id = id;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_dims(mut self, dims: &[usize]) -> Self {
        self.dims = dims.to_vec();
        self
    }

    pub fn with_act_fxn(mut self, fxn: UnaryFxn) -> Self {
        self.act_fxn = Some(fxn);
        self
    }

    pub fn with_act_prime(mut self, fxn: UnaryFxn) -> Self {
        self.act_prime = Some(fxn);
        self
    }

    pub fn with_loss_fxn(mut self, fxn: LossFxn) -> Self {
        self.loss_fxn = Some(fxn);
        self
    }

    pub fn with_loss_prime(mut self, fxn: LossPrimeFxn) -> Self {
        self.loss_prime = Some(fxn);
        self
    }

    /// Sets both the activation function and its derivative from a preset.
    pub fn with_activation(self, activation: Activation) -> Self {
        self.with_act_fxn(activation.fxn())
            .with_act_prime(activation.prime())
    }

    /// Sets both the loss function and its derivative from a preset.
    pub fn with_loss(self, loss: Loss) -> Self {
        self.with_loss_fxn(loss.fxn()).with_loss_prime(loss.prime())
    }
}
