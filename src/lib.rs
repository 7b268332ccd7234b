pub mod arch;
pub mod config;
mod error;
pub mod initialization;
pub mod registry;

pub use arch::{Chain, Link, Phase};
pub use error::{NetErr, Result};
