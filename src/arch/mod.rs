pub mod activations;
pub mod edge;
pub mod loss;
pub mod node;
mod chain;

pub use chain::{Chain, Link, Phase};
