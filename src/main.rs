use std::env;

use anyhow::{Context, bail};
use log::{info, warn};
use ndarray::{Array2, array};

use tubenet::{
    Chain,
    config::{ChainConfig, EdgeConfig, InitConfig, NodeConfig},
    registry::{EdgeRegistry, NodeRegistry},
};

const DEFAULT_EPOCHS: usize = 10000;
const DEFAULT_LEARNING_RATE: f64 = 2.0;
const LOG_EVERY: usize = 1000;

fn xor_config() -> ChainConfig {
    let node = |kind: &str, features| NodeConfig {
        kind: kind.to_string(),
        features,
        batch: None,
        name: None,
        bias: Some(InitConfig::Const { value: 0. }),
    };
    let edge = || EdgeConfig {
        kind: "dense".to_string(),
        name: None,
        init: Some(InitConfig::Xavier),
    };

    ChainConfig {
        nodes: vec![node("input", 2), node("sigmoid", 4), node("sigmoid_l2", 1)],
        edges: vec![edge(), edge()],
        seed: Some(42),
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> anyhow::Result<T> {
    match env::var(key) {
        Ok(value) => value
            .parse()
            .map_err(|_| anyhow::anyhow!("{key} must be a number, got '{value}'")),
        Err(_) => Ok(default),
    }
}

/// One plain gradient descent step, `w -= η ∇w` and `b -= η ∇b`.
fn descend(chain: &mut Chain, learning_rate: f64) {
    for edge in chain.edges_mut() {
        let nabla = edge.nabla_weight().to_owned();
        edge.weight_mut().scaled_add(-learning_rate, &nabla);
    }

    for node in chain.nodes_mut().iter_mut().skip(1) {
        let nabla = node.nabla_bias().to_owned();
        node.bias_mut().scaled_add(-learning_rate, &nabla);
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = match env::args().nth(1) {
        Some(path) => ChainConfig::load(&path).with_context(|| format!("loading {path}"))?,
        None => xor_config(),
    };

    let epochs = env_or("EPOCHS", DEFAULT_EPOCHS)?;
    let learning_rate = env_or("LEARNING_RATE", DEFAULT_LEARNING_RATE)?;

    let mut chain = config.build(&NodeRegistry::with_defaults(), &EdgeRegistry::with_defaults())?;
    if chain.input().features() != 2 || chain.output().features() != 1 {
        bail!("the XOR demo needs a chain with 2 input and 1 output features");
    }

    let x: Array2<f64> = array![[0., 0., 1., 1.], [0., 1., 0., 1.]];
    let y: Array2<f64> = array![[0., 1., 1., 0.]];

    info!("training for {epochs} epochs with a learning rate of {learning_rate}");
    for epoch in 0..epochs {
        let loss = chain.train_batch(x.clone(), y.view())?;
        if !loss.is_finite() {
            warn!("loss diverged at epoch {epoch}");
            break;
        }

        descend(&mut chain, learning_rate);

        if epoch % LOG_EVERY == 0 {
            info!("epoch {epoch}: loss {loss:.6}");
        }
    }

    chain.log_state();

    let prediction = chain.predict(x.clone())?;
    for (sample, (input, out)) in x.columns().into_iter().zip(prediction.row(0)).enumerate() {
        println!(
            "{sample}: {} xor {} -> {out:.4} (expected {})",
            input[0],
            input[1],
            y[[0, sample]]
        );
    }

    Ok(())
}
