//! Error types shared by every module of the crate.

use thiserror::Error;

/// Result type with [`Error`] as the default error.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised while building datasets, configuring, training or
/// (de)serializing extractors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// An argument violates a documented precondition.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A configuration value could not be recognized.
    #[error("unknown {kind}: {value}")]
    UnknownConfigValue {
        /// Which setting was being parsed.
        kind: &'static str,
        /// The rejected value.
        value: String,
    },

    /// A configuration parameter name is not known.
    #[error("unknown parameter: {0}")]
    UnknownParameter(String),

    /// The training data cannot support the requested model.
    #[error("degenerate dataset: {0}")]
    DegenerateDataset(String),

    /// A serialized model is malformed.
    #[error("invalid model format: {0}")]
    InvalidFormat(String),

    /// The extractor was used for inference before training or loading.
    #[error("the extractor has not been trained")]
    NotTrained,

    /// Standard I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A serialized string is not valid UTF-8.
    #[error(transparent)]
    Utf8(#[from] bstr::Utf8Error),
}

impl Error {
    pub(crate) fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub(crate) fn invalid_format<S: Into<String>>(msg: S) -> Self {
        Self::InvalidFormat(msg.into())
    }

    pub(crate) fn degenerate<S: Into<String>>(msg: S) -> Self {
        Self::DegenerateDataset(msg.into())
    }

    pub(crate) fn unknown_value<S: Into<String>>(kind: &'static str, value: S) -> Self {
        Self::UnknownConfigValue {
            kind,
            value: value.into(),
        }
    }
}
