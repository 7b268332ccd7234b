use std::collections::HashMap;

use crate::{
    NetErr, Result,
    arch::{
        activations::Activation,
        edge::{Edge, EdgeParameter},
        loss::Loss,
        node::{Node, NodeParameter},
    },
};

/// Builds a node out of its parameter.
pub type NodeCtor = fn(&NodeParameter) -> Result<Node>;

/// Builds an edge out of its parameter.
pub type EdgeCtor = fn(&EdgeParameter) -> Result<Edge>;

/// Maps the kind of a node to the way of building it.
#[derive(Clone, Default)]
pub struct NodeRegistry {
    ctors: HashMap<String, NodeCtor>,
}

impl NodeRegistry {
    /// Creates an empty `NodeRegistry`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a `NodeRegistry` holding every built-in node kind.
    ///
    /// The preset kinds only overwrite the strategies they name, so e.g. a `sigmoid` node keeps
    /// whatever loss the parameter carries.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        registry.register("activation", Node::new);
        registry.register("act_loss", act_loss);
        registry.register("input", |p| with_activation(p, Activation::Identity));
        registry.register("identity", |p| with_activation(p, Activation::Identity));
        registry.register("sigmoid", |p| with_activation(p, Activation::Sigmoid));
        registry.register("tanh", |p| with_activation(p, Activation::Tanh));
        registry.register("relu", |p| with_activation(p, Activation::Relu));
        registry.register("sigmoid_l2", |p| {
            Node::new(
                &p.clone()
                    .with_activation(Activation::Sigmoid)
                    .with_loss(Loss::SquaredError),
            )
        });
        registry.register("sigmoid_cross_entropy", |p| {
            Node::new(
                &p.clone()
                    .with_activation(Activation::Sigmoid)
                    .with_loss(Loss::CrossEntropy),
            )
        });

        registry
    }

    /// Registers `ctor` under `kind`.
    ///
    /// # Returns
    /// The constructor previously registered under `kind`, if any.
    pub fn register(&mut self, kind: impl Into<String>, ctor: NodeCtor) -> Option<NodeCtor> {
        self.ctors.insert(kind.into(), ctor)
    }

    /// Builds a node of the given kind.
    ///
    /// # Returns
    /// An error if nothing is registered under `kind` or the constructor fails.
    pub fn create(&self, kind: &str, param: &NodeParameter) -> Result<Node> {
        let ctor = self
            .ctors
            .get(kind)
            .ok_or_else(|| NetErr::UnknownKind(kind.to_string()))?;

        ctor(param)
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.ctors.contains_key(kind)
    }
}

/// Maps the kind of an edge to the way of building it.
#[derive(Clone, Default)]
pub struct EdgeRegistry {
    ctors: HashMap<String, EdgeCtor>,
}

impl EdgeRegistry {
    /// Creates an empty `EdgeRegistry`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an `EdgeRegistry` holding every built-in edge kind.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("dense", Edge::dense);
        registry
    }

    /// Registers `ctor` under `kind`, returning the one it replaces.
    pub fn register(&mut self, kind: impl Into<String>, ctor: EdgeCtor) -> Option<EdgeCtor> {
        self.ctors.insert(kind.into(), ctor)
    }

    /// Builds an edge of the given kind.
    pub fn create(&self, kind: &str, param: &EdgeParameter) -> Result<Edge> {
        let ctor = self
            .ctors
            .get(kind)
            .ok_or_else(|| NetErr::UnknownKind(kind.to_string()))?;

        ctor(param)
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.ctors.contains_key(kind)
    }
}

fn with_activation(param: &NodeParameter, activation: Activation) -> Result<Node> {
    Node::new(&param.clone().with_activation(activation))
}

fn act_loss(param: &NodeParameter) -> Result<Node> {
    if param.loss_fxn().is_none() {
        return Err(NetErr::MissingStrategy {
            node: param.id(),
            strategy: "loss",
        });
    }

    if param.loss_prime().is_none() {
        return Err(NetErr::MissingStrategy {
            node: param.id(),
            strategy: "loss derivative",
        });
    }

    Node::new(param)
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn defaults_are_registered() {
        let nodes = NodeRegistry::with_defaults();
        let edges = EdgeRegistry::with_defaults();

        for kind in ["input", "sigmoid", "tanh", "relu", "sigmoid_l2", "act_loss"] {
            assert!(nodes.contains(kind), "{kind} is missing");
        }
        assert!(edges.contains("dense"));
        assert!(!NodeRegistry::new().contains("sigmoid"));
    }

    #[test]
    fn unknown_kind() {
        let nodes = NodeRegistry::with_defaults();
        let param = NodeParameter::new(0, "n", &[1]);

        assert_eq!(
            nodes.create("softmax", &param).unwrap_err(),
            NetErr::UnknownKind("softmax".into())
        );
    }

    #[test]
    fn presets_set_strategies() {
        let nodes = NodeRegistry::with_defaults();
        let param = NodeParameter::new(3, "out", &[1]);

        let mut node = nodes.create("sigmoid_l2", &param).unwrap();
        node.call_act_fxn().unwrap();
        assert_eq!(node.activation(), array![[0.5]]);
        assert!(node.calc_loss(array![[0.5]].view()).is_ok());

        // the parameter itself stays untouched
        assert!(param.act_fxn().is_none());
    }

    #[test]
    fn bare_activation_keeps_given_strategies() {
        let nodes = NodeRegistry::with_defaults();
        let param = NodeParameter::new(0, "n", &[1]);

        let mut node = nodes.create("activation", &param).unwrap();
        assert!(node.call_act_fxn().is_err());
    }

    #[test]
    fn act_loss_requires_loss() {
        let nodes = NodeRegistry::with_defaults();
        let param = NodeParameter::new(2, "out", &[1]).with_activation(Activation::Tanh);

        assert!(nodes.create("act_loss", &param).is_err());
        assert!(
            nodes
                .create("act_loss", &param.with_loss(Loss::SquaredError))
                .is_ok()
        );
    }

    #[test]
    fn register_replaces() {
        let mut edges = EdgeRegistry::new();
        assert!(edges.register("dense", Edge::dense).is_none());
        assert!(edges.register("dense", Edge::dense).is_some());

        let edge = edges
            .create("dense", &EdgeParameter::new(0, "e", &[2], &[3]))
            .unwrap();
        assert_eq!((edge.in_features(), edge.out_features()), (2, 3));
    }
}
