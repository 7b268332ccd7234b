use ndarray::{ArrayView2, ArrayViewMut2, Zip};
use serde::{Deserialize, Serialize};

/// Reduces a prediction and its target, both `[features × batch]`, to the batch loss.
pub type LossFxn = fn(ArrayView2<f64>, ArrayView2<f64>) -> f64;

/// Writes the per-sample derivative of the loss with respect to the prediction into the last
/// argument, which has the same shape as the prediction.
pub type LossPrimeFxn = fn(ArrayView2<f64>, ArrayView2<f64>, ArrayViewMut2<f64>);

/// Keeps the cross entropy's logarithms finite.
const CLAMP: f64 = 1e-12;

/// The built-in loss strategies.
///
/// Losses are averaged over the batch columns while their derivatives are not, the edges divide
/// by the batch size themselves when accumulating `nabla_weight`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Loss {
    SquaredError,
    CrossEntropy,
}

impl Loss {
    pub fn fxn(self) -> LossFxn {
        match self {
            Loss::SquaredError => squared_error,
            Loss::CrossEntropy => cross_entropy,
        }
    }

    pub fn prime(self) -> LossPrimeFxn {
        match self {
            Loss::SquaredError => squared_error_prime,
            Loss::CrossEntropy => cross_entropy_prime,
        }
    }
}

fn batch_size(y_pred: &ArrayView2<f64>) -> f64 {
    y_pred.ncols().max(1) as f64
}

fn squared_error(y_pred: ArrayView2<f64>, y: ArrayView2<f64>) -> f64 {
    let sum = Zip::from(&y_pred)
        .and(&y)
        .fold(0., |acc, &a, &t| acc + (a - t).powi(2));

    sum / (2. * batch_size(&y_pred))
}

fn squared_error_prime(y_pred: ArrayView2<f64>, y: ArrayView2<f64>, out: ArrayViewMut2<f64>) {
    Zip::from(out)
        .and(&y_pred)
        .and(&y)
        .for_each(|d, &a, &t| *d = a - t);
}

fn cross_entropy(y_pred: ArrayView2<f64>, y: ArrayView2<f64>) -> f64 {
    let sum = Zip::from(&y_pred).and(&y).fold(0., |acc, &a, &t| {
        let a = a.clamp(CLAMP, 1. - CLAMP);
        acc - (t * a.ln() + (1. - t) * (1. - a).ln())
    });

    sum / batch_size(&y_pred)
}

fn cross_entropy_prime(y_pred: ArrayView2<f64>, y: ArrayView2<f64>, out: ArrayViewMut2<f64>) {
    Zip::from(out).and(&y_pred).and(&y).for_each(|d, &a, &t| {
        let a = a.clamp(CLAMP, 1. - CLAMP);
        *d = (a - t) / (a * (1. - a));
    });
}
