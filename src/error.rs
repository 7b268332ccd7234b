use std::{
    error::Error,
    fmt::{self, Display},
};

use crate::arch::node::ActState;

/// The result type used in the entire crate.
pub type Result<T> = std::result::Result<T, NetErr>;

/// The crate's error type.
#[derive(Debug, Clone, PartialEq)]
pub enum NetErr {
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    MissingStrategy {
        node: usize,
        strategy: &'static str,
    },
    IllegalTransition {
        node: usize,
        from: ActState,
        to: ActState,
    },
    InvalidState {
        node: usize,
        expected: ActState,
        got: ActState,
    },
    BrokenChain {
        link: usize,
        expected: usize,
        got: usize,
    },
    OutOfOrder {
        op: &'static str,
        phase: &'static str,
    },
    UnknownKind(String),
    InvalidConfig(String),
    Init(String),
}

impl Display for NetErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NetErr::SizeMismatch {
                what,
                got,
                expected,
            } => format!("There's a size mismatch in {what}, got {got} and expected {expected}"),
            NetErr::MissingStrategy { node, strategy } => {
                format!("Node {node} has no {strategy} function configured")
            }
            NetErr::IllegalTransition { node, from, to } => {
                format!("Node {node} can't transition backwards from {from:?} to {to:?}")
            }
            NetErr::InvalidState {
                node,
                expected,
                got,
            } => format!("Node {node} must be in state {expected:?}, but it is in {got:?}"),
            NetErr::BrokenChain {
                link,
                expected,
                got,
            } => format!(
                "Link {link} must start at node {expected} to continue the chain, it starts at {got}"
            ),
            NetErr::OutOfOrder { op, phase } => {
                format!("Can't run {op} while the chain is in the {phase} phase")
            }
            NetErr::UnknownKind(kind) => format!("There's nothing registered under '{kind}'"),
            NetErr::InvalidConfig(msg) => format!("Invalid configuration: {msg}"),
            NetErr::Init(msg) => format!("Failed to build the initializer: {msg}"),
        };

        write!(f, "{s}")
    }
}

impl Error for NetErr {}
