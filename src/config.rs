use std::{cell::RefCell, fs, path::Path, rc::Rc};

use log::debug;
use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::{
    NetErr, Result,
    arch::{Chain, edge::EdgeParameter, node::NodeParameter},
    initialization::{ConstParamGen, ParamGen, RandParamGen},
    registry::{EdgeRegistry, NodeRegistry},
};

/// How to generate the initial values of an edge's weights or a node's bias.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitConfig {
    Const { value: f64 },
    Normal { mean: f64, std_dev: f64 },
    Uniform { low: f64, high: f64 },
    Xavier,
    XavierUniform,
    Kaiming,
    Lecun,
    LecunUniform,
}

impl InitConfig {
    /// Builds the generator described by this config.
    ///
    /// # Arguments
    /// * `rng` - The random number generator shared by every random generator of a chain.
    /// * `fan_in` - The number of input units of the parameter being initialized.
    /// * `fan_out` - The number of output units of the parameter being initialized.
    ///
    /// # Returns
    /// An error if the distribution can't be built out of the given values.
    pub fn param_gen(
        &self,
        rng: Rc<RefCell<StdRng>>,
        fan_in: usize,
        fan_out: usize,
    ) -> Result<Box<dyn ParamGen>> {
        let param_gen: Box<dyn ParamGen> = match *self {
            InitConfig::Const { value } => Box::new(ConstParamGen::new(value)),
            InitConfig::Normal { mean, std_dev } => {
                Box::new(RandParamGen::normal(rng, mean, std_dev)?)
            }
            InitConfig::Uniform { low, high } => Box::new(RandParamGen::uniform(rng, low, high)?),
            InitConfig::Xavier => Box::new(RandParamGen::xavier(rng, fan_in, fan_out)?),
            InitConfig::XavierUniform => {
                Box::new(RandParamGen::xavier_uniform(rng, fan_in, fan_out)?)
            }
            InitConfig::Kaiming => Box::new(RandParamGen::kaiming(rng, fan_in)?),
            InitConfig::Lecun => Box::new(RandParamGen::lecun(rng, fan_in)?),
            InitConfig::LecunUniform => Box::new(RandParamGen::lecun_uniform(rng, fan_in)?),
        };

        Ok(param_gen)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    pub kind: String,
    pub features: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bias: Option<InitConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeConfig {
    #[serde(default = "default_edge_kind")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init: Option<InitConfig>,
}

/// The description of a whole chain, `edges[i]` connects `nodes[i]` to `nodes[i + 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    pub nodes: Vec<NodeConfig>,
    pub edges: Vec<EdgeConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl ChainConfig {
    /// Parses a `ChainConfig` out of a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| NetErr::InvalidConfig(format!("invalid JSON: {e}")))
    }

    /// Loads a `ChainConfig` from a JSON file.
    ///
    /// # Errors
    /// Returns `InvalidConfig` if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            NetErr::InvalidConfig(format!("cannot read '{}': {e}", path.display()))
        })?;

        Self::from_json(&content)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| NetErr::InvalidConfig(e.to_string()))
    }

    /// Builds the described chain.
    ///
    /// Every node gets its position as id, every edge is shaped after the nodes it connects.
    /// All the random initializers draw from a single generator, seeded with `seed` when given.
    ///
    /// # Arguments
    /// * `node_registry` - Where to look up the node kinds.
    /// * `edge_registry` - Where to look up the edge kinds.
    ///
    /// # Returns
    /// An error if a kind is unknown, a size is invalid or an initializer can't be built.
    pub fn build(
        &self,
        node_registry: &NodeRegistry,
        edge_registry: &EdgeRegistry,
    ) -> Result<Chain> {
        if self.nodes.len() != self.edges.len() + 1 {
            return Err(NetErr::InvalidConfig(format!(
                "{} edges can't connect {} nodes",
                self.edges.len(),
                self.nodes.len()
            )));
        }

        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        let rng = Rc::new(RefCell::new(rng));

        let mut nodes = Vec::with_capacity(self.nodes.len());
        for (i, conf) in self.nodes.iter().enumerate() {
            let name = conf.name.clone().unwrap_or_else(|| format!("{}_{i}", conf.kind));
            let dims = match conf.batch {
                Some(batch) => vec![conf.features, batch],
                None => vec![conf.features],
            };

            let param = NodeParameter::new(i, name, &dims);
            let mut node = node_registry.create(&conf.kind, &param)?;

            if let Some(init) = conf.bias {
                let mut param_gen = init.param_gen(rng.clone(), conf.features, conf.features)?;
                node.initialize_bias(Some(param_gen.as_mut()))?;
            }

            nodes.push(node);
        }

        let mut edges = Vec::with_capacity(self.edges.len());
        for (i, conf) in self.edges.iter().enumerate() {
            let fan_in = self.nodes[i].features;
            let fan_out = self.nodes[i + 1].features;
            let name = conf.name.clone().unwrap_or_else(|| format!("{}_{i}", conf.kind));

            let param = EdgeParameter::new(i, name, &[fan_in], &[fan_out]);
            let mut edge = edge_registry.create(&conf.kind, &param)?;

            if let Some(init) = conf.init {
                let mut param_gen = init.param_gen(rng.clone(), fan_in, fan_out)?;
                edge.initialize_weight(Some(param_gen.as_mut()))?;
            }

            edges.push(edge);
        }

        debug!(
            "built a chain of {} nodes and {} edges",
            nodes.len(),
            edges.len()
        );

        Chain::new(nodes, edges)
    }
}

fn default_edge_kind() -> String {
    "dense".into()
}
