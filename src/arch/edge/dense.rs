use log::{debug, warn};
use ndarray::{Array2, ArrayView2, linalg};

use super::EdgeParameter;
use crate::{
    NetErr, Result,
    arch::node::{ActState, Node},
    initialization::{ParamGen, standard_normal},
};

/// A fully connected edge.
///
/// The weight is stored `[in_features × out_features]`, so the forward step multiplies by its
/// transpose and the backward step by the weight itself.
#[derive(Clone, Debug)]
pub struct DenseEdge {
    param: EdgeParameter,
    weight: Array2<f64>,
    nabla_weight: Array2<f64>,
}

impl DenseEdge {
    /// Creates a new `DenseEdge` with zeroed weights.
    ///
    /// # Arguments
    /// * `param` - The edge parameter, it gets cloned into the edge.
    ///
    /// # Returns
    /// An error if the parameter declares no features on either side.
    pub fn new(param: &EdgeParameter) -> Result<Self> {
        let shape = param.shape()?;

        Ok(Self {
            param: param.clone(),
            weight: Array2::zeros(shape),
            nabla_weight: Array2::zeros(shape),
        })
    }

    /// Creates a new `DenseEdge` with the given weight.
    ///
    /// # Returns
    /// An error if the weight's shape doesn't match the dims declared by `param`.
    pub fn with_weight(param: &EdgeParameter, weight: Array2<f64>) -> Result<Self> {
        let mut edge = Self::new(param)?;
        edge.set_weight(weight)?;
        Ok(edge)
    }

    pub fn id(&self) -> usize {
        self.param.id()
    }

    pub fn param(&self) -> &EdgeParameter {
        &self.param
    }

    pub fn in_features(&self) -> usize {
        self.weight.nrows()
    }

    pub fn out_features(&self) -> usize {
        self.weight.ncols()
    }

    pub fn weight(&self) -> ArrayView2<'_, f64> {
        self.weight.view()
    }

    /// Gives mutable access to the weight for the optimizer.
    pub fn weight_mut(&mut self) -> &mut Array2<f64> {
        &mut self.weight
    }

    pub fn nabla_weight(&self) -> ArrayView2<'_, f64> {
        self.nabla_weight.view()
    }

    /// Replaces the weight.
    ///
    /// # Returns
    /// An error if its shape differs from the current one.
    pub fn set_weight(&mut self, weight: Array2<f64>) -> Result<()> {
        check("weight rows", weight.nrows(), self.in_features())?;
        check("weight cols", weight.ncols(), self.out_features())?;

        self.weight = weight;
        Ok(())
    }

    /// Overwrites the weight with values sampled from `param_gen`, or from a standard normal
    /// distribution if there is none.
    pub fn initialize_weight(&mut self, param_gen: Option<&mut dyn ParamGen>) -> Result<()> {
        let shape = self.weight.dim();

        let weight = match param_gen {
            Some(param_gen) => {
                let values = param_gen.sample(shape.0 * shape.1);
                let got = values.len();

                Array2::from_shape_vec(shape, values).map_err(|_| NetErr::SizeMismatch {
                    what: "sampled weights",
                    got,
                    expected: shape.0 * shape.1,
                })?
            }
            None => {
                warn!(
                    "no generator for the weight of edge {}, sampling a standard normal",
                    self.id()
                );
                standard_normal(shape.0, shape.1)
            }
        };

        self.set_weight(weight)
    }

    /// Checks that the weight connects nodes with these feature counts.
    pub fn check_nodes(&self, input: &Node, output: &Node) -> Result<()> {
        check("edge input features", input.features(), self.in_features())?;
        check("edge output features", output.features(), self.out_features())
    }

    /// `output.activation += weightᵗ · input.activation + bias`, leaving `output` in `Init`.
    ///
    /// The result is accumulated, whoever drives the edges must zero `output` before the first
    /// edge writes to it in a batch. Every edge adds the output's bias, so a node fed by `k`
    /// edges gets it `k` times, while `nabla_bias` is the gradient of a single bias term.
    ///
    /// # Returns
    /// An error if the weight doesn't fit the nodes or their batches differ.
    pub fn forward(&self, input: &Node, output: &mut Node) -> Result<()> {
        self.check_nodes(input, output)?;
        check("output batch", output.batch(), input.batch())?;

        linalg::general_mat_mul(
            1.,
            &self.weight.t(),
            &input.activation(),
            1.,
            output.activation_mut(),
        );
        output.add_bias();

        debug!(
            "edge {}: forward {} -> {}",
            self.id(),
            input.id(),
            output.id()
        );
        Ok(())
    }

    /// Backpropagates the delta of `output` through this edge:
    /// 1. `nabla_weight = input.activation · output.deltaᵗ / batch`, and the bias gradient of
    ///    `output`.
    /// 2. `input.delta = weight · output.delta`.
    /// 3. `input.delta *= f'(input.activation)`, leaving `input` in `Derivative`.
    ///
    /// `input` must still hold its activated values (or raw ones for an input layer), calling
    /// this twice on the same input node without a forward step in between gives wrong
    /// gradients.
    ///
    /// # Returns
    /// An error if the weight doesn't fit the nodes, their batches differ or `input` can't reach
    /// `Derivative`.
    pub fn backward(&mut self, input: &mut Node, output: &mut Node) -> Result<()> {
        self.check_nodes(input, output)?;
        check("output batch", output.batch(), input.batch())?;
        input.check_transition(ActState::Derivative)?;

        let batch = input.batch() as f64;
        linalg::general_mat_mul(
            1. / batch,
            &input.activation(),
            &output.delta().t(),
            0.,
            &mut self.nabla_weight,
        );
        output.calc_nabla_bias();

        linalg::general_mat_mul(
            1.,
            &self.weight,
            &output.delta(),
            0.,
            input.delta_mut(),
        );
        input.apply_chain_rule()?;

        debug!(
            "edge {}: backward {} <- {}",
            self.id(),
            input.id(),
            output.id()
        );
        Ok(())
    }

    /// Logs the weight.
    pub fn log_weight(&self) {
        debug!("edge {} weight:\n{}", self.id(), self.weight);
    }

    /// Logs the weight gradient.
    pub fn log_nabla_weight(&self) {
        debug!("edge {} nabla weight:\n{}", self.id(), self.nabla_weight);
    }
}

fn check(what: &'static str, got: usize, expected: usize) -> Result<()> {
    if got != expected {
        return Err(NetErr::SizeMismatch {
            what,
            got,
            expected,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;
    use crate::{
        arch::{activations::Activation, loss::Loss, node::NodeParameter},
        initialization::ConstParamGen,
    };

    fn node(id: usize, features: usize, batch: usize, activation: Activation) -> Node {
        let param = NodeParameter::new(id, "node", &[features, batch])
            .with_activation(activation)
            .with_loss(Loss::SquaredError);
        Node::new(&param).unwrap()
    }

    fn edge(weight: Array2<f64>) -> DenseEdge {
        let (rows, cols) = weight.dim();
        let param = EdgeParameter::new(0, "dense", &[rows], &[cols]);
        DenseEdge::with_weight(&param, weight).unwrap()
    }

    #[test]
    fn new_is_zeroed() {
        let edge = DenseEdge::new(&EdgeParameter::new(0, "dense", &[3], &[2])).unwrap();

        assert_eq!(edge.weight(), Array2::<f64>::zeros((3, 2)));
        assert_eq!(edge.nabla_weight(), Array2::<f64>::zeros((3, 2)));
    }

    #[test]
    fn with_weight_rejects_wrong_shape() {
        let param = EdgeParameter::new(0, "dense", &[3], &[2]);

        let err = DenseEdge::with_weight(&param, Array2::zeros((2, 3))).unwrap_err();
        assert_eq!(
            err,
            NetErr::SizeMismatch {
                what: "weight rows",
                got: 2,
                expected: 3
            }
        );
    }

    #[test]
    fn forward_computes_weighted_sum() {
        let mut input = node(0, 2, 1, Activation::Identity);
        let mut output = node(1, 2, 1, Activation::Identity);
        input.set_activation(array![[1.], [2.]]).unwrap();
        output.set_bias(array![0.5, -0.5]).unwrap();
        output.call_act_fxn().unwrap();

        let edge = edge(array![[1., 2.], [3., 4.]]);
        edge.forward(&input, &mut output).unwrap();

        // wᵗ · [1, 2] = [1 + 6, 2 + 8], and the buffer started at zero
        assert_eq!(output.activation(), array![[7.5], [9.5]]);
        assert_eq!(output.state(), ActState::Init);
    }

    #[test]
    fn forward_keeps_shapes() {
        let mut input = node(0, 3, 4, Activation::Sigmoid);
        let mut output = node(1, 2, 4, Activation::Sigmoid);
        input.fill_activation(1.);

        let edge = edge(Array2::from_elem((3, 2), 0.1));
        edge.forward(&input, &mut output).unwrap();
        output.call_act_fxn().unwrap();
        output.call_act_fxn().unwrap();

        assert_eq!(output.activation().dim(), (2, 4));
        assert_eq!(output.delta().dim(), (2, 4));
    }

    #[test]
    fn forward_accumulates_fan_in() {
        let mut a = node(0, 2, 1, Activation::Identity);
        let mut b = node(1, 2, 1, Activation::Identity);
        let mut out = node(2, 1, 1, Activation::Identity);
        a.set_activation(array![[1.], [2.]]).unwrap();
        b.set_activation(array![[1.], [2.]]).unwrap();

        let first = edge(array![[1.], [1.]]);
        let second = edge(array![[1.], [1.]]);
        first.forward(&a, &mut out).unwrap();
        second.forward(&b, &mut out).unwrap();

        assert_eq!(out.activation(), array![[6.]]);
    }

    #[test]
    fn fan_in_adds_the_bias_per_edge() {
        let mut a = node(0, 1, 1, Activation::Identity);
        let mut b = node(1, 1, 1, Activation::Identity);
        let mut out = node(2, 1, 1, Activation::Identity);
        a.set_activation(array![[1.]]).unwrap();
        b.set_activation(array![[2.]]).unwrap();
        out.set_bias(array![0.5]).unwrap();

        edge(array![[1.]]).forward(&a, &mut out).unwrap();
        edge(array![[1.]]).forward(&b, &mut out).unwrap();

        assert_eq!(out.activation(), array![[4.]]);
    }

    #[test]
    fn forward_rejects_mismatched_nodes() {
        let input = node(0, 3, 1, Activation::Identity);
        let mut output = node(1, 2, 1, Activation::Identity);
        let edge = edge(Array2::zeros((2, 2)));

        assert!(edge.forward(&input, &mut output).is_err());
    }

    #[test]
    fn forward_rejects_mismatched_batches() {
        let input = node(0, 2, 3, Activation::Identity);
        let mut output = node(1, 2, 1, Activation::Identity);
        let edge = edge(Array2::zeros((2, 2)));

        assert!(edge.forward(&input, &mut output).is_err());
        assert_eq!(output.activation(), Array2::<f64>::zeros((2, 1)));
    }

    #[test]
    fn backward_gradients() {
        let mut input = node(0, 2, 2, Activation::Identity);
        let mut output = node(1, 1, 2, Activation::Identity);
        input.set_activation(array![[1., 3.], [2., 4.]]).unwrap();

        let mut edge = edge(array![[2.], [-1.]]);
        edge.forward(&input, &mut output).unwrap();
        output.call_act_fxn().unwrap();

        // predictions [0, 2] against targets [1, 1] give the deltas [-1, 1]
        output.calc_delta(array![[1., 1.]].view()).unwrap();
        edge.backward(&mut input, &mut output).unwrap();

        assert_eq!(edge.nabla_weight(), array![[1.], [1.]]);
        assert_eq!(output.nabla_bias(), array![0.]);
        assert_eq!(input.delta(), array![[-2., 2.], [1., -1.]]);
        assert_eq!(input.state(), ActState::Derivative);
    }

    #[test]
    fn backward_applies_input_derivative() {
        let mut input = node(0, 1, 1, Activation::Sigmoid);
        let mut output = node(1, 1, 1, Activation::Identity);
        input.call_act_fxn().unwrap();

        let mut edge = edge(array![[4.]]);
        edge.forward(&input, &mut output).unwrap();
        output.call_act_fxn().unwrap();
        output.calc_delta(array![[0.]].view()).unwrap();
        edge.backward(&mut input, &mut output).unwrap();

        // output = 4 * 0.5, delta_out = 2, delta_in = 4 * 2 * 0.25
        assert_eq!(edge.nabla_weight(), array![[1.]]);
        assert_eq!(input.delta(), array![[2.]]);
    }

    #[test]
    fn backward_without_input_derivative_changes_nothing() {
        let mut input = Node::new(&NodeParameter::new(0, "bare", &[1])).unwrap();
        let mut output = node(1, 1, 1, Activation::Identity);

        let mut edge = edge(array![[1.]]);
        edge.forward(&input, &mut output).unwrap();
        output.call_act_fxn().unwrap();
        output.calc_delta(array![[1.]].view()).unwrap();

        assert!(edge.backward(&mut input, &mut output).is_err());
        assert_eq!(edge.nabla_weight(), array![[0.]]);
        assert_eq!(input.state(), ActState::Init);
    }

    #[test]
    fn initialize_weight_overwrites() {
        let mut edge = DenseEdge::new(&EdgeParameter::new(0, "dense", &[2], &[3])).unwrap();

        edge.initialize_weight(Some(&mut ConstParamGen::new(0.5)))
            .unwrap();
        assert_eq!(edge.weight(), Array2::from_elem((2, 3), 0.5));

        edge.initialize_weight(None).unwrap();
        assert_eq!(edge.weight().dim(), (2, 3));
    }

    #[test]
    fn initialize_weight_rejects_short_samples() {
        let mut edge = DenseEdge::new(&EdgeParameter::new(0, "dense", &[2], &[2])).unwrap();
        let mut short = ShortGen;

        assert!(edge.initialize_weight(Some(&mut short)).is_err());
    }

    struct ShortGen;

    impl ParamGen for ShortGen {
        fn sample(&mut self, n: usize) -> Vec<f64> {
            vec![0.; n - 1]
        }
    }
}
