use log::debug;
use ndarray::{Array2, ArrayView2};

use super::{edge::Edge, node::Node};
use crate::{NetErr, Result};

/// One step of a chain: `edges[edge]` connects `nodes[input]` to `nodes[output]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Link {
    pub input: usize,
    pub edge: usize,
    pub output: usize,
}

impl Link {
    pub fn new(input: usize, edge: usize, output: usize) -> Self {
        Self {
            input,
            edge,
            output,
        }
    }
}

/// Where a chain is within a batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loaded,
    Forwarded,
    Backwarded,
}

impl Phase {
    fn name(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Loaded => "loaded",
            Phase::Forwarded => "forwarded",
            Phase::Backwarded => "backwarded",
        }
    }
}

/// A strict path of nodes connected by edges: information flows forward through the links when
/// computing an output and backward when computing the deltas and gradients.
///
/// The chain is the only place that knows the link order, and it refuses to run the sweeps out
/// of order: the backward sweep turns every activation buffer into a derivative, so a new input
/// must be loaded before the next forward sweep.
#[derive(Clone, Debug)]
pub struct Chain {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    links: Vec<Link>,
    phase: Phase,
}

impl Chain {
    /// Creates a new `Chain` where `edges[i]` connects `nodes[i]` to `nodes[i + 1]`.
    ///
    /// # Returns
    /// An error if there isn't exactly one more node than edges, there are no edges or an edge's
    /// weight doesn't fit its nodes.
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Result<Self> {
        if nodes.len() != edges.len() + 1 {
            return Err(NetErr::SizeMismatch {
                what: "chain nodes",
                got: nodes.len(),
                expected: edges.len() + 1,
            });
        }

        let links = (0..edges.len()).map(|i| Link::new(i, i, i + 1)).collect();
        Self::from_links(nodes, edges, links)
    }

    /// Creates a new `Chain` from explicit links.
    ///
    /// # Returns
    /// An error if the links don't form a single path through every node using every edge once,
    /// or an edge's weight doesn't fit its nodes.
    pub fn from_links(nodes: Vec<Node>, edges: Vec<Edge>, links: Vec<Link>) -> Result<Self> {
        let Some(first) = links.first() else {
            return Err(NetErr::InvalidConfig(
                "a chain needs at least one link".into(),
            ));
        };

        if links.len() != edges.len() {
            return Err(NetErr::SizeMismatch {
                what: "chain links",
                got: links.len(),
                expected: edges.len(),
            });
        }

        if nodes.len() != links.len() + 1 {
            return Err(NetErr::SizeMismatch {
                what: "chain nodes",
                got: nodes.len(),
                expected: links.len() + 1,
            });
        }

        let mut seen_nodes = vec![false; nodes.len()];
        let mut seen_edges = vec![false; edges.len()];
        let visit = |seen: &mut Vec<bool>, i: usize, what: &str| {
            match seen.get_mut(i) {
                Some(seen) if !*seen => *seen = true,
                Some(_) => {
                    return Err(NetErr::InvalidConfig(format!(
                        "{what} {i} appears twice in the chain"
                    )));
                }
                None => return Err(NetErr::InvalidConfig(format!("there's no {what} {i}"))),
            }

            Ok(())
        };

        visit(&mut seen_nodes, first.input, "node")?;
        for (i, link) in links.iter().enumerate() {
            if i > 0 && links[i - 1].output != link.input {
                return Err(NetErr::BrokenChain {
                    link: i,
                    expected: links[i - 1].output,
                    got: link.input,
                });
            }

            visit(&mut seen_edges, link.edge, "edge")?;
            visit(&mut seen_nodes, link.output, "node")?;

            edges[link.edge].check_nodes(&nodes[link.input], &nodes[link.output])?;
        }

        Ok(Self {
            nodes,
            edges,
            links,
            phase: Phase::Idle,
        })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Gives mutable access to the edges, so an optimizer can update their weights.
    pub fn edges_mut(&mut self) -> &mut [Edge] {
        &mut self.edges
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The node the chain starts at.
    pub fn input(&self) -> &Node {
        &self.nodes[self.input_idx()]
    }

    /// The terminal node, which owns the loss.
    pub fn output(&self) -> &Node {
        &self.nodes[self.output_idx()]
    }

    /// Loads a batch, `[input features × batch]`, into the input node. The values are taken as
    /// already activated.
    pub fn set_input(&mut self, x: Array2<f64>) -> Result<()> {
        let idx = self.input_idx();
        self.nodes[idx].set_activation(x)?;
        self.phase = Phase::Loaded;
        Ok(())
    }

    /// Makes a forward pass through the chain.
    ///
    /// Zeroes every node but the input one, then runs the edges in link order, activating each
    /// output node before any later edge reads it.
    ///
    /// # Returns
    /// The activated output, or an error if no fresh input was loaded or a step failed.
    pub fn forward(&mut self) -> Result<ArrayView2<'_, f64>> {
        self.expect_phase("forward", Phase::Loaded)?;

        let batch = self.input().batch();
        debug!("forward sweep over a batch of {batch}");

        for link in &self.links {
            self.nodes[link.output].reset(batch)?;
        }

        for link in &self.links {
            let (input, output) = pair_mut(&mut self.nodes, link.input, link.output);
            self.edges[link.edge].forward(input, output)?;
            output.call_act_fxn()?;
        }

        self.phase = Phase::Forwarded;
        Ok(self.output().activation())
    }

    /// Evaluates the terminal node's loss against `target`, it doesn't affect any state.
    pub fn calc_loss(&self, target: ArrayView2<f64>) -> Result<f64> {
        self.expect_phase("calc_loss", Phase::Forwarded)?;
        self.output().calc_loss(target)
    }

    /// Makes a backward pass through the chain.
    ///
    /// Computes the terminal delta against `target` and then runs every edge in reverse link
    /// order, leaving the weight gradients in the edges and the bias gradients in the nodes.
    ///
    /// # Returns
    /// An error if the chain wasn't just forwarded or a step failed.
    pub fn backward(&mut self, target: ArrayView2<f64>) -> Result<()> {
        self.expect_phase("backward", Phase::Forwarded)?;

        let idx = self.output_idx();
        self.nodes[idx].calc_delta(target)?;
        self.phase = Phase::Backwarded;
        debug!("backward sweep");

        for link in self.links.iter().rev() {
            let (input, output) = pair_mut(&mut self.nodes, link.input, link.output);
            self.edges[link.edge].backward(input, output)?;
        }

        Ok(())
    }

    /// Runs a whole training step on one batch: load, forward, loss and backward.
    ///
    /// # Returns
    /// The batch loss, it's only informative.
    pub fn train_batch(&mut self, x: Array2<f64>, y: ArrayView2<f64>) -> Result<f64> {
        self.set_input(x)?;
        self.forward()?;

        let loss = self.calc_loss(y)?;
        self.backward(y)?;

        debug!("batch loss: {loss}");
        Ok(loss)
    }

    /// Computes the chain's output for `x`.
    pub fn predict(&mut self, x: Array2<f64>) -> Result<Array2<f64>> {
        self.set_input(x)?;
        Ok(self.forward()?.to_owned())
    }

    /// Logs every matrix in the chain.
    pub fn log_state(&self) {
        for node in &self.nodes {
            node.log_activation();
            node.log_delta();
            node.log_bias();
        }

        for edge in &self.edges {
            edge.log_weight();
            edge.log_nabla_weight();
        }
    }

    fn input_idx(&self) -> usize {
        self.links[0].input
    }

    fn output_idx(&self) -> usize {
        self.links[self.links.len() - 1].output
    }

    fn expect_phase(&self, op: &'static str, phase: Phase) -> Result<()> {
        if self.phase != phase {
            return Err(NetErr::OutOfOrder {
                op,
                phase: self.phase.name(),
            });
        }

        Ok(())
    }
}

/// Borrows two different nodes mutably at once.
fn pair_mut(nodes: &mut [Node], a: usize, b: usize) -> (&mut Node, &mut Node) {
    if a < b {
        let (lo, hi) = nodes.split_at_mut(b);
        (&mut lo[a], &mut hi[0])
    } else {
        let (lo, hi) = nodes.split_at_mut(a);
        (&mut hi[0], &mut lo[b])
    }
}
