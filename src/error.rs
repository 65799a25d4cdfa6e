/// Errors returned by layered sketch construction and composition.
///
/// Every error is raised before the receiver is mutated, so a failed call leaves
/// the structure exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, Hash, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A layer count, filter parameter or estimator precision is out of range,
    /// or two sketches with different layer counts were merged.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
