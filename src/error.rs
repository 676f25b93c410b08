//! Error types for liveconfig.

/// Result type alias for liveconfig operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur when working with configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required parameter was not set before `parse`.
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    /// Registering the remote provider connection failed (e.g. malformed endpoint).
    #[error("Failed to register remote provider: {0}")]
    ProviderRegistration(String),

    /// Failed to read configuration bytes from a source.
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    /// Loaded bytes do not decode into the expected fields.
    #[error("Failed to decode configuration: {0}")]
    DecodeError(String),

    /// Watching a source for changes failed to start.
    #[error("Watch error: {0}")]
    WatchError(String),

    /// IO error occurred.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
