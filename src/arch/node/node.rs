use log::{debug, warn};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use super::{ActState, NodeParameter};
use crate::{
    NetErr, Result,
    arch::activations::UnaryFxn,
    initialization::{ParamGen, standard_normal},
};

/// One layer of a chain: its activation buffer, bias and delta, plus the state machine that says
/// what the activation buffer currently holds.
///
/// The activation buffer is reused in place: it holds the raw weighted sums right after the
/// incoming edges write to it (`Init`), `f(z)` after `call_act_fxn` (`Activated`) and `f'(a)`
/// after `calc_act_prime` (`Derivative`). Going to `Derivative` is lossy, the activated values
/// are gone until the next forward write.
#[derive(Clone, Debug)]
pub struct Node {
    param: NodeParameter,

    activation: Array2<f64>,
    bias: Array1<f64>,
    delta: Array2<f64>,
    nabla_bias: Array1<f64>,

    state: ActState,
}

impl Node {
    /// Creates a new `Node` with zeroed buffers in the `Init` state.
    ///
    /// # Arguments
    /// * `param` - The node parameter, it gets cloned into the node.
    ///
    /// # Returns
    /// An error if the parameter's dims are invalid.
    pub fn new(param: &NodeParameter) -> Result<Self> {
        let (features, batch) = param.shape()?;

        Ok(Self {
            param: param.clone(),
            activation: Array2::zeros((features, batch)),
            bias: Array1::zeros(features),
            delta: Array2::zeros((features, batch)),
            nabla_bias: Array1::zeros(features),
            state: ActState::Init,
        })
    }

    pub fn id(&self) -> usize {
        self.param.id()
    }

    pub fn name(&self) -> &str {
        self.param.name()
    }

    pub fn param(&self) -> &NodeParameter {
        &self.param
    }

    pub fn features(&self) -> usize {
        self.activation.nrows()
    }

    pub fn batch(&self) -> usize {
        self.activation.ncols()
    }

    pub fn state(&self) -> ActState {
        self.state
    }

    /// Whether the activation buffer holds exactly the activated values.
    pub fn is_activated(&self) -> bool {
        self.state == ActState::Activated
    }

    pub fn activation(&self) -> ArrayView2<'_, f64> {
        self.activation.view()
    }

    pub fn delta(&self) -> ArrayView2<'_, f64> {
        self.delta.view()
    }

    pub fn bias(&self) -> ArrayView1<'_, f64> {
        self.bias.view()
    }

    /// Gives mutable access to the bias for the optimizer.
    pub fn bias_mut(&mut self) -> &mut Array1<f64> {
        &mut self.bias
    }

    /// The batch mean of the delta, written by the backward step of the edge feeding this node.
    pub fn nabla_bias(&self) -> ArrayView1<'_, f64> {
        self.nabla_bias.view()
    }

    /// Replaces the activation buffer with a fresh raw value, the batch may change.
    ///
    /// # Returns
    /// An error if the amount of rows is not the node's feature count or there are no columns.
    pub fn set_activation(&mut self, activation: Array2<f64>) -> Result<()> {
        self.check_shape("activation", activation.nrows(), activation.ncols())?;

        if activation.ncols() != self.batch() {
            self.delta = Array2::zeros(activation.raw_dim());
        }

        self.activation = activation;
        self.to_init();
        Ok(())
    }

    /// Sets every entry of the activation buffer to `value`.
    pub fn fill_activation(&mut self, value: f64) {
        self.activation.fill(value);
        self.to_init();
    }

    /// Zeroes the activation buffer for a batch of `batch` columns, so the incoming edges can
    /// accumulate into it.
    pub fn reset(&mut self, batch: usize) -> Result<()> {
        if batch == 0 {
            return Err(NetErr::SizeMismatch {
                what: "batch",
                got: 0,
                expected: 1,
            });
        }

        if batch == self.batch() {
            self.activation.fill(0.);
        } else {
            self.activation = Array2::zeros((self.features(), batch));
            self.delta = Array2::zeros((self.features(), batch));
        }

        self.to_init();
        Ok(())
    }

    /// Applies an arbitrary elementwise functor to the activation buffer, the result is
    /// considered a raw value.
    pub fn apply_unary<F>(&mut self, functor: F)
    where
        F: FnMut(f64) -> f64,
    {
        self.activation.mapv_inplace(functor);
        self.to_init();
    }

    /// Replaces the bias.
    ///
    /// # Returns
    /// An error if its length is not the node's feature count.
    pub fn set_bias(&mut self, bias: Array1<f64>) -> Result<()> {
        if bias.len() != self.features() {
            return Err(NetErr::SizeMismatch {
                what: "bias",
                got: bias.len(),
                expected: self.features(),
            });
        }

        self.bias = bias;
        Ok(())
    }

    /// Fills the bias with values from `param_gen`, or from a standard normal distribution if
    /// there is none.
    pub fn initialize_bias(&mut self, param_gen: Option<&mut dyn ParamGen>) -> Result<()> {
        let features = self.features();

        let bias = match param_gen {
            Some(param_gen) => Array1::from(param_gen.sample(features)),
            None => {
                warn!(
                    "no generator for the bias of node {}, sampling a standard normal",
                    self.id()
                );
                standard_normal(features, 1).remove_axis(Axis(1))
            }
        };

        self.set_bias(bias)
    }

    /// Applies the activation function, moving to `Activated`.
    pub fn call_act_fxn(&mut self) -> Result<()> {
        self.transition(ActState::Activated)
    }

    /// Applies the activation derivative, moving to `Derivative`. Calling it on a node in `Init`
    /// applies the activation function first.
    pub fn calc_act_prime(&mut self) -> Result<()> {
        self.transition(ActState::Derivative)
    }

    /// Moves the node to `state`.
    ///
    /// Going to `Init` always succeeds and only relabels the buffer. Going to the current state
    /// is a no-op. Going forward applies every intermediate step in order. Every strategy needed
    /// is checked before touching the buffer, so a failed transition changes nothing.
    ///
    /// # Returns
    /// An error if `state` is behind the current one or a needed strategy is missing.
    pub fn transition(&mut self, state: ActState) -> Result<()> {
        if state == ActState::Init {
            self.to_init();
            return Ok(());
        }

        self.check_transition(state)?;

        while let Some(next) = self.state.next().filter(|&next| next <= state) {
            let fxn = self.step_fxn(next)?;
            self.activation.mapv_inplace(fxn);

            debug!("node {}: {:?} -> {:?}", self.id(), self.state, next);
            self.state = next;
        }

        Ok(())
    }

    /// Checks whether `transition(state)` would succeed without running it.
    pub fn check_transition(&self, state: ActState) -> Result<()> {
        if state == ActState::Init {
            return Ok(());
        }

        if self.state > state {
            return Err(NetErr::IllegalTransition {
                node: self.id(),
                from: self.state,
                to: state,
            });
        }

        let mut curr = self.state;
        while let Some(next) = curr.next().filter(|&next| next <= state) {
            self.step_fxn(next)?;
            curr = next;
        }

        Ok(())
    }

    /// Evaluates the loss of the activated buffer against `target`.
    ///
    /// # Returns
    /// An error if the node isn't `Activated`, the target's shape differs or there is no loss
    /// function.
    pub fn calc_loss(&self, target: ArrayView2<f64>) -> Result<f64> {
        self.check_activated()?;
        self.check_target(&target)?;

        let loss_fxn = self.param.loss_fxn().ok_or_else(|| self.missing("loss"))?;
        Ok(loss_fxn(self.activation.view(), target))
    }

    /// Computes the delta of a terminal node: the loss derivative against `target` times the
    /// activation derivative. The node ends up in `Derivative`.
    ///
    /// # Returns
    /// An error if the node isn't `Activated`, the target's shape differs or a strategy is
    /// missing.
    pub fn calc_delta(&mut self, target: ArrayView2<f64>) -> Result<()> {
        self.check_activated()?;
        self.check_target(&target)?;

        let loss_prime = self
            .param
            .loss_prime()
            .ok_or_else(|| self.missing("loss derivative"))?;
        self.check_transition(ActState::Derivative)?;

        loss_prime(self.activation.view(), target, self.delta.view_mut());
        self.apply_chain_rule()
    }

    /// Logs the activation buffer.
    pub fn log_activation(&self) {
        debug!(
            "node {} activation ({:?}):\n{}",
            self.id(),
            self.state,
            self.activation
        );
    }

    /// Logs the delta.
    pub fn log_delta(&self) {
        debug!("node {} delta:\n{}", self.id(), self.delta);
    }

    /// Logs the bias.
    pub fn log_bias(&self) {
        debug!("node {} bias:\n{}", self.id(), self.bias);
    }

    pub(crate) fn activation_mut(&mut self) -> &mut Array2<f64> {
        &mut self.activation
    }

    pub(crate) fn delta_mut(&mut self) -> &mut Array2<f64> {
        &mut self.delta
    }

    /// Broadcasts the bias over the batch columns and adds it to the activation buffer.
    pub(crate) fn add_bias(&mut self) {
        self.activation += &self.bias.view().insert_axis(Axis(1));
        self.to_init();
    }

    /// Averages the delta over the batch into `nabla_bias`.
    pub(crate) fn calc_nabla_bias(&mut self) {
        let batch = self.batch() as f64;
        self.nabla_bias = self.delta.sum_axis(Axis(1)) / batch;
    }

    /// `δ ← δ ⊙ f'(a)`, turning the activation buffer into the derivative first.
    pub(crate) fn apply_chain_rule(&mut self) -> Result<()> {
        self.transition(ActState::Derivative)?;
        self.delta
            .zip_mut_with(&self.activation, |d, &prime| *d *= prime);

        Ok(())
    }

    fn to_init(&mut self) {
        self.state = ActState::Init;
    }

    /// The strategy that moves the buffer into `next`.
    fn step_fxn(&self, next: ActState) -> Result<UnaryFxn> {
        match next {
            ActState::Activated => self
                .param
                .act_fxn()
                .ok_or_else(|| self.missing("activation")),
            ActState::Derivative => self
                .param
                .act_prime()
                .ok_or_else(|| self.missing("activation derivative")),
            ActState::Init => Err(NetErr::IllegalTransition {
                node: self.id(),
                from: self.state,
                to: next,
            }),
        }
    }

    fn missing(&self, strategy: &'static str) -> NetErr {
        NetErr::MissingStrategy {
            node: self.id(),
            strategy,
        }
    }

    fn check_shape(&self, what: &'static str, rows: usize, cols: usize) -> Result<()> {
        if rows != self.features() {
            return Err(NetErr::SizeMismatch {
                what,
                got: rows,
                expected: self.features(),
            });
        }

        if cols == 0 {
            return Err(NetErr::SizeMismatch {
                what: "batch",
                got: 0,
                expected: 1,
            });
        }

        Ok(())
    }

    fn check_activated(&self) -> Result<()> {
        if !self.is_activated() {
            return Err(NetErr::InvalidState {
                node: self.id(),
                expected: ActState::Activated,
                got: self.state,
            });
        }

        Ok(())
    }

    fn check_target(&self, target: &ArrayView2<f64>) -> Result<()> {
        self.check_shape("target", target.nrows(), target.ncols())?;

        if target.ncols() != self.batch() {
            return Err(NetErr::SizeMismatch {
                what: "target batch",
                got: target.ncols(),
                expected: self.batch(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;
    use crate::{
        arch::{activations::Activation, loss::Loss},
        initialization::ConstParamGen,
    };

    fn sigmoid_node(features: usize, batch: usize) -> Node {
        let param = NodeParameter::new(0, "sigmoid", &[features, batch])
            .with_activation(Activation::Sigmoid);
        Node::new(&param).unwrap()
    }

    fn output_node() -> Node {
        let param = NodeParameter::new(1, "out", &[2, 2])
            .with_activation(Activation::Sigmoid)
            .with_loss(Loss::SquaredError);
        Node::new(&param).unwrap()
    }

    #[test]
    fn new_is_zeroed_and_init() {
        let node = sigmoid_node(3, 2);

        assert_eq!(node.activation().dim(), (3, 2));
        assert_eq!(node.delta().dim(), (3, 2));
        assert_eq!(node.bias().len(), 3);
        assert_eq!(node.state(), ActState::Init);
        assert!(!node.is_activated());
    }

    #[test]
    fn call_act_fxn_activates() {
        let mut node = sigmoid_node(2, 1);
        node.call_act_fxn().unwrap();

        assert!(node.is_activated());
        assert_eq!(node.activation(), array![[0.5], [0.5]]);
    }

    #[test]
    fn same_state_is_noop() {
        let mut node = sigmoid_node(2, 1);
        node.call_act_fxn().unwrap();
        node.call_act_fxn().unwrap();

        assert_eq!(node.activation(), array![[0.5], [0.5]]);
    }

    #[test]
    fn init_is_always_legal() {
        let mut node = sigmoid_node(2, 1);

        for state in [ActState::Init, ActState::Activated, ActState::Derivative] {
            node.transition(state).unwrap();
            node.transition(ActState::Init).unwrap();
            assert_eq!(node.state(), ActState::Init);
        }
    }

    #[test]
    fn advancing_applies_every_step() {
        let z = array![[-1.], [0.3]];

        let mut direct = sigmoid_node(2, 1);
        direct.set_activation(z.clone()).unwrap();
        direct.transition(ActState::Derivative).unwrap();

        let mut stepped = sigmoid_node(2, 1);
        stepped.set_activation(z).unwrap();
        stepped.call_act_fxn().unwrap();
        stepped.calc_act_prime().unwrap();

        assert_eq!(direct.state(), ActState::Derivative);
        assert_eq!(direct.activation(), stepped.activation());
    }

    #[test]
    fn going_backwards_fails() {
        let mut node = sigmoid_node(2, 1);
        node.calc_act_prime().unwrap();
        let before = node.activation().to_owned();

        let err = node.call_act_fxn().unwrap_err();

        assert_eq!(
            err,
            NetErr::IllegalTransition {
                node: 0,
                from: ActState::Derivative,
                to: ActState::Activated
            }
        );
        assert_eq!(node.state(), ActState::Derivative);
        assert_eq!(node.activation(), before);
    }

    #[test]
    fn missing_activation_fails_without_side_effects() {
        let mut node = Node::new(&NodeParameter::new(4, "bare", &[2])).unwrap();
        node.fill_activation(3.);

        let err = node.call_act_fxn().unwrap_err();

        assert_eq!(
            err,
            NetErr::MissingStrategy {
                node: 4,
                strategy: "activation"
            }
        );
        assert_eq!(node.state(), ActState::Init);
        assert_eq!(node.activation(), array![[3.], [3.]]);
    }

    #[test]
    fn missing_prime_fails_atomically() {
        let param = NodeParameter::new(5, "half", &[1]).with_act_fxn(Activation::Sigmoid.fxn());
        let mut node = Node::new(&param).unwrap();

        assert!(node.calc_act_prime().is_err());
        assert_eq!(node.state(), ActState::Init);
        assert_eq!(node.activation(), array![[0.]]);
    }

    #[test]
    fn set_activation_checks_rows_and_resets() {
        let mut node = sigmoid_node(2, 1);
        node.call_act_fxn().unwrap();

        assert!(node.set_activation(Array2::zeros((3, 1))).is_err());
        assert!(node.set_activation(Array2::zeros((2, 0))).is_err());

        node.set_activation(Array2::ones((2, 5))).unwrap();
        assert_eq!(node.state(), ActState::Init);
        assert_eq!(node.batch(), 5);
        assert_eq!(node.delta().dim(), (2, 5));
    }

    #[test]
    fn reset_zeroes_and_resizes() {
        let mut node = sigmoid_node(2, 1);
        node.fill_activation(1.);
        node.call_act_fxn().unwrap();

        node.reset(1).unwrap();
        assert_eq!(node.activation(), Array2::<f64>::zeros((2, 1)));
        assert_eq!(node.state(), ActState::Init);

        node.reset(3).unwrap();
        assert_eq!(node.activation().dim(), (2, 3));
        assert!(node.reset(0).is_err());
    }

    #[test]
    fn apply_unary_resets_state() {
        let mut node = sigmoid_node(2, 1);
        node.call_act_fxn().unwrap();
        node.apply_unary(|x| x * 4.);

        assert_eq!(node.state(), ActState::Init);
        assert_eq!(node.activation(), array![[2.], [2.]]);
    }

    #[test]
    fn bias_is_broadcast() {
        let mut node = sigmoid_node(2, 3);
        node.set_bias(array![1., -1.]).unwrap();
        node.add_bias();

        assert_eq!(node.activation(), array![[1., 1., 1.], [-1., -1., -1.]]);
        assert!(node.set_bias(array![1.]).is_err());
    }

    #[test]
    fn initialize_bias_uses_generator() {
        let mut node = sigmoid_node(3, 1);

        node.initialize_bias(Some(&mut ConstParamGen::new(0.25)))
            .unwrap();
        assert_eq!(node.bias(), array![0.25, 0.25, 0.25]);

        node.initialize_bias(None).unwrap();
        assert_eq!(node.bias().len(), 3);
    }

    #[test]
    fn loss_requires_activated_state() {
        let node = output_node();
        let target = Array2::zeros((2, 2));

        assert!(matches!(
            node.calc_loss(target.view()),
            Err(NetErr::InvalidState { .. })
        ));
    }

    #[test]
    fn loss_and_delta() {
        let mut node = output_node();
        let target = array![[1., 0.], [0., 1.]];
        node.call_act_fxn().unwrap();

        // every prediction is 0.5, so each squared error is 0.25
        let loss = node.calc_loss(target.view()).unwrap();
        assert!((loss - 0.25).abs() < 1e-12);

        node.calc_delta(target.view()).unwrap();
        assert_eq!(node.state(), ActState::Derivative);
        assert_eq!(node.delta(), array![[-0.125, 0.125], [0.125, -0.125]]);
    }

    #[test]
    fn delta_checks_target_shape() {
        let mut node = output_node();
        node.call_act_fxn().unwrap();

        assert!(node.calc_delta(Array2::zeros((2, 3)).view()).is_err());
        assert!(node.calc_delta(Array2::zeros((1, 2)).view()).is_err());
        assert!(node.is_activated());
    }

    #[test]
    fn delta_without_loss_strategy_fails() {
        let mut node = sigmoid_node(1, 1);
        node.call_act_fxn().unwrap();

        assert_eq!(
            node.calc_delta(array![[1.]].view()),
            Err(NetErr::MissingStrategy {
                node: 0,
                strategy: "loss derivative"
            })
        );
    }
}
