/// What the activation buffer of a node currently holds.
///
/// States are ordered, a node only ever advances `Init -> Activated -> Derivative` unless it is
/// reset back to `Init` by a fresh write.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ActState {
    /// Raw weighted sums, as written by the incoming edges.
    #[default]
    Init,
    /// `f(z)` for the node's activation function `f`.
    Activated,
    /// `f'` evaluated on the activated value.
    Derivative,
}

impl ActState {
    /// Returns the state right after this one, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            ActState::Init => Some(ActState::Activated),
            ActState::Activated => Some(ActState::Derivative),
            ActState::Derivative => None,
        }
    }
}
