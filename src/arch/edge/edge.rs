use ndarray::{Array2, ArrayView2};

use super::{DenseEdge, EdgeParameter};
use crate::{Result, arch::node::Node, initialization::ParamGen};

/// Every kind of edge a chain can hold.
#[derive(Clone, Debug)]
pub enum Edge {
    Dense(DenseEdge),
}
use Edge::*;

impl Edge {
    pub fn dense(param: &EdgeParameter) -> Result<Self> {
        Ok(Dense(DenseEdge::new(param)?))
    }

    pub fn id(&self) -> usize {
        match self {
            Dense(e) => e.id(),
        }
    }

    pub fn in_features(&self) -> usize {
        match self {
            Dense(e) => e.in_features(),
        }
    }

    pub fn out_features(&self) -> usize {
        match self {
            Dense(e) => e.out_features(),
        }
    }

    pub fn weight(&self) -> ArrayView2<'_, f64> {
        match self {
            Dense(e) => e.weight(),
        }
    }

    pub fn weight_mut(&mut self) -> &mut Array2<f64> {
        match self {
            Dense(e) => e.weight_mut(),
        }
    }

    pub fn nabla_weight(&self) -> ArrayView2<'_, f64> {
        match self {
            Dense(e) => e.nabla_weight(),
        }
    }

    pub fn check_nodes(&self, input: &Node, output: &Node) -> Result<()> {
        match self {
            Dense(e) => e.check_nodes(input, output),
        }
    }

    pub fn forward(&self, input: &Node, output: &mut Node) -> Result<()> {
        match self {
            Dense(e) => e.forward(input, output),
        }
    }

    pub fn backward(&mut self, input: &mut Node, output: &mut Node) -> Result<()> {
        match self {
            Dense(e) => e.backward(input, output),
        }
    }

    pub fn initialize_weight(&mut self, param_gen: Option<&mut dyn ParamGen>) -> Result<()> {
        match self {
            Dense(e) => e.initialize_weight(param_gen),
        }
    }

    pub fn log_weight(&self) {
        match self {
            Dense(e) => e.log_weight(),
        }
    }

    pub fn log_nabla_weight(&self) {
        match self {
            Dense(e) => e.log_nabla_weight(),
        }
    }
}

impl From<DenseEdge> for Edge {
    fn from(value: DenseEdge) -> Self {
        Dense(value)
    }
}
