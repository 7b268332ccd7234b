mod node;
mod param;
mod state;

pub use node::Node;
pub use param::NodeParameter;
pub use state::ActState;
