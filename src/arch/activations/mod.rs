mod activation;

pub use activation::{Activation, UnaryFxn};
