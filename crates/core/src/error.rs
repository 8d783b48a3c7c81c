use std::path::PathBuf;

/// Result alias that carries the custom [`LedVizError`] type.
pub type Result<T> = std::result::Result<T, LedVizError>;

/// Common error type for the core crate.
///
/// Every variant represents a startup-time failure. The per-tick render path
/// never returns one of these: transient transport failures are logged and
/// the next frame supersedes the lost one.
#[derive(Debug, thiserror::Error)]
pub enum LedVizError {
    /// The settings file describes a state the pipeline cannot start from.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// A board was configured with an LED count the hardware cannot have.
    #[error("board `{board}` has invalid LED count {count}")]
    InvalidLedCount { board: String, count: usize },
    /// The persisted gamma lookup table could not be loaded.
    #[error("gamma table `{path}`: {reason}")]
    GammaTable { path: PathBuf, reason: String },
    /// A device address from the settings file did not resolve.
    #[error("cannot resolve device address `{address}`")]
    AddressResolve { address: String },
    /// A caller handed the pipeline a structurally invalid value.
    #[error("{0}")]
    InvalidInput(&'static str),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Wrapper around JSON (de)serialisation errors.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl LedVizError {
    /// Creates a configuration error from the provided message.
    pub fn config<T: Into<String>>(msg: T) -> Self {
        Self::Config(msg.into())
    }
}
