use thiserror::Error;

/// Library error type for labnag setup and configuration.
#[derive(Debug, Error)]
pub enum Error {
    /// No message text was supplied.
    #[error("no message passed; provide --message/-m")]
    MissingMessage,

    /// A command-line or config value could not be interpreted.
    #[error("invalid value for {option}: {reason}")]
    InvalidOption { option: String, reason: String },

    /// The requested message type is neither built in nor in the config file.
    #[error("unknown message type '{0}'")]
    UnknownType(String),

    /// The requested output name did not match any connected monitor.
    #[error("output '{0}' not found")]
    OutputNotFound(String),

    /// No face in the system font database could be loaded.
    #[error("no usable font for '{0}'")]
    NoFont(String),

    /// The display host could not be brought up.
    #[error("display setup failed: {0}")]
    Setup(anyhow::Error),

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// YAML/serde configuration error.
    #[error(transparent)]
    Config(#[from] serde_yaml::Error),
}

impl Error {
    pub fn invalid(option: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidOption {
            option: option.into(),
            reason: reason.to_string(),
        }
    }
}
