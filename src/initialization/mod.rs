mod constant;
mod error;
mod param_gen;
mod random;

pub use constant::ConstParamGen;
pub use error::{RandErr, Result};
pub use param_gen::{ParamGen, standard_normal};
pub use random::RandParamGen;
