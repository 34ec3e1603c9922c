//! MORODAS error types.

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, MorodasError>;

/// Top-level error for MORODAS subsystems.
#[derive(Debug, thiserror::Error)]
pub enum MorodasError {
    /// Configuration loading/parsing failure.
    #[error("Config error: {0}")]
    Config(String),

    /// SQLite store failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Workflow-engine dispatch failure.
    #[error("Dispatch error: {0}")]
    Dispatch(String),

    /// Referenced row does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
