//! Registry error types

use thiserror::Error;

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// All subscriber slots are taken
    #[error("subscriber capacity of {capacity} reached")]
    AtCapacity { capacity: usize },

    /// The broadcast has ended; no new subscribers are accepted
    #[error("registry is closed")]
    Closed,
}
