use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderedSetError {
    #[error("ordered set modified during iteration")]
    ModifiedDuringIteration,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    /// Two cycles of the basis could not be joined along a shared path.
    #[error("Invalid graph: cycles share fewer than two nodes")]
    InvalidGraph,
    #[error("graph has no cycle")]
    NoCycle,
    #[error(transparent)]
    OrderedSet(#[from] OrderedSetError),
}
