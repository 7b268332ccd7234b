mod dense;
mod edge;
mod param;

pub use dense::DenseEdge;
pub use edge::Edge;
pub use param::EdgeParameter;
