//! Error taxonomy for node invocations.
//!
//! Every variant is terminal for the invocation that raised it: nothing is
//! retried and no partial audio is returned.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used by every node operation.
pub type NodeResult<T> = Result<T, NodeError>;

#[derive(Debug, Error)]
pub enum NodeError {
    /// The synthesis engine dependency is not available in this process.
    #[error("{dependency} is not available; install it and restart the host")]
    Configuration { dependency: String },

    /// A reference audio file does not exist in the input directory.
    #[error("audio file not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// Malformed input: bad audio shape, too few samples, unknown choice, …
    #[error("invalid input: {0}")]
    Validation(String),

    /// A required input was empty.
    #[error("missing input: {0}")]
    MissingInput(&'static str),

    /// The reference buffer could not be written to a temporary WAV file.
    #[error("failed to stage reference audio")]
    Staging(#[source] anyhow::Error),

    /// Raised by the engine itself; passed through untouched.
    #[error(transparent)]
    Engine(anyhow::Error),
}

impl NodeError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_message_names_dependency() {
        let err = NodeError::Configuration { dependency: "pocket-tts".into() };
        assert!(err.to_string().contains("pocket-tts"));
    }

    #[test]
    fn test_engine_error_is_transparent() {
        let err = NodeError::Engine(anyhow::anyhow!("decoder exploded"));
        assert_eq!(err.to_string(), "decoder exploded");
    }

    #[test]
    fn test_not_found_shows_path() {
        let err = NodeError::NotFound { path: PathBuf::from("/in/voice.wav") };
        assert_eq!(err.to_string(), "audio file not found: /in/voice.wav");
    }
}
