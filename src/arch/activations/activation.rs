use serde::{Deserialize, Serialize};

/// An elementwise strategy function, either an activation or its derivative.
pub type UnaryFxn = fn(f64) -> f64;

/// The built-in activation strategies.
///
/// Every derivative is written in terms of the *activated* value `a = f(z)`, never in terms of
/// the raw weighted sum, since that's what a node holds by the time it computes it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Identity,
    Sigmoid,
    Tanh,
    Relu,
}
use Activation::*;

impl Activation {
    /// Returns the activation function.
    pub fn fxn(self) -> UnaryFxn {
        match self {
            Identity => identity,
            Sigmoid => sigmoid,
            Tanh => tanh,
            Relu => relu,
        }
    }

    /// Returns the derivative of the activation function, evaluated on the activated value.
    pub fn prime(self) -> UnaryFxn {
        match self {
            Identity => identity_prime,
            Sigmoid => sigmoid_prime,
            Tanh => tanh_prime,
            Relu => relu_prime,
        }
    }
}

fn identity(z: f64) -> f64 {
    z
}

fn identity_prime(_a: f64) -> f64 {
    1.
}

fn sigmoid(z: f64) -> f64 {
    1. / (1. + (-z).exp())
}

// $df/dz = f(z)(1 - f(z))$
fn sigmoid_prime(a: f64) -> f64 {
    a * (1. - a)
}

fn tanh(z: f64) -> f64 {
    z.tanh()
}

fn tanh_prime(a: f64) -> f64 {
    1. - a * a
}

fn relu(z: f64) -> f64 {
    z.max(0.)
}

fn relu_prime(a: f64) -> f64 {
    if a > 0. { 1. } else { 0. }
}
